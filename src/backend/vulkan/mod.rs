//! Vulkan realization of the device interface, built on ash.
//!
//! Headless by design: the graph renders into its own attachments, so no
//! surface or swapchain is created. Object storage sits behind mutexes
//! because the device interface is `&self` all the way through.

mod conversion;

use std::collections::HashMap;
use std::ffi::CStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ash::vk;
use gpu_allocator::vulkan::{
    Allocation, AllocationCreateDesc, AllocationScheme, Allocator, AllocatorCreateDesc,
};
use gpu_allocator::MemoryLocation;
use parking_lot::Mutex;

use crate::types::{BufferDescriptor, ClearValue, ImageDescriptor, PipelineStages};

use super::{
    BufferHandle, CommandList, Device, DeviceError, EventHandle, FramebufferDescriptor,
    FramebufferHandle, ImageBarrier, ImageHandle, ImageViewHandle, MemoryBarrier,
    RenderPassDescriptor, RenderPassHandle,
};

struct VkImage {
    image: vk::Image,
    view: vk::ImageView,
    allocation: Option<Allocation>,
}

struct VkBuffer {
    buffer: vk::Buffer,
    allocation: Option<Allocation>,
}

struct VkFramebuffer {
    framebuffer: vk::Framebuffer,
    extent: vk::Extent2D,
}

/// Vulkan device. Created without a window, suitable for offscreen
/// rendering and compute-style frame graphs.
pub struct VulkanDevice {
    _entry: ash::Entry,
    instance: ash::Instance,
    _physical_device: vk::PhysicalDevice,
    device: ash::Device,
    queue: Mutex<vk::Queue>,
    submit_fence: vk::Fence,
    command_pool: Mutex<vk::CommandPool>,
    allocator: Option<Arc<Mutex<Allocator>>>,

    next_handle: AtomicU64,
    images: Mutex<HashMap<u64, VkImage>>,
    buffers: Mutex<HashMap<u64, VkBuffer>>,
    render_passes: Mutex<HashMap<u64, vk::RenderPass>>,
    framebuffers: Mutex<HashMap<u64, VkFramebuffer>>,
    events: Mutex<HashMap<u64, vk::Event>>,
    command_buffers: Mutex<HashMap<u64, vk::CommandBuffer>>,
}

impl VulkanDevice {
    /// Create a Vulkan device on the first adapter with a graphics queue.
    pub fn new() -> Result<Self, DeviceError> {
        unsafe {
            let entry = ash::Entry::load()
                .map_err(|e| DeviceError::InitializationFailed(e.to_string()))?;

            let app_name = CStr::from_bytes_with_nul(b"framegraph\0")
                .map_err(|e| DeviceError::InitializationFailed(e.to_string()))?;
            let app_info = vk::ApplicationInfo {
                p_application_name: app_name.as_ptr(),
                application_version: vk::make_api_version(0, 0, 1, 0),
                p_engine_name: app_name.as_ptr(),
                engine_version: vk::make_api_version(0, 0, 1, 0),
                api_version: vk::API_VERSION_1_2,
                ..Default::default()
            };
            let instance_info = vk::InstanceCreateInfo {
                p_application_info: &app_info,
                ..Default::default()
            };
            let instance = entry
                .create_instance(&instance_info, None)
                .map_err(|e| DeviceError::InitializationFailed(e.to_string()))?;

            let physical_devices = instance
                .enumerate_physical_devices()
                .map_err(|e| DeviceError::InitializationFailed(e.to_string()))?;
            let (physical_device, queue_family) = physical_devices
                .into_iter()
                .find_map(|candidate| {
                    Self::find_graphics_queue_family(&instance, candidate)
                        .map(|family| (candidate, family))
                })
                .ok_or_else(|| {
                    DeviceError::InitializationFailed("no device with a graphics queue".into())
                })?;

            let properties = instance.get_physical_device_properties(physical_device);
            let device_name = CStr::from_ptr(properties.device_name.as_ptr());
            log::info!("VulkanDevice: using adapter {:?}", device_name);

            let queue_priorities = [1.0f32];
            let queue_info = vk::DeviceQueueCreateInfo {
                queue_family_index: queue_family,
                queue_count: 1,
                p_queue_priorities: queue_priorities.as_ptr(),
                ..Default::default()
            };
            let device_features = vk::PhysicalDeviceFeatures::default();
            let device_info = vk::DeviceCreateInfo {
                queue_create_info_count: 1,
                p_queue_create_infos: &queue_info,
                p_enabled_features: &device_features,
                ..Default::default()
            };
            let device = instance
                .create_device(physical_device, &device_info, None)
                .map_err(|e| DeviceError::InitializationFailed(e.to_string()))?;
            let queue = device.get_device_queue(queue_family, 0);

            let allocator = Allocator::new(&AllocatorCreateDesc {
                instance: instance.clone(),
                device: device.clone(),
                physical_device,
                debug_settings: Default::default(),
                buffer_device_address: false,
                allocation_sizes: Default::default(),
            })
            .map_err(|e| DeviceError::InitializationFailed(e.to_string()))?;

            let pool_info = vk::CommandPoolCreateInfo {
                queue_family_index: queue_family,
                flags: vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER,
                ..Default::default()
            };
            let command_pool = device
                .create_command_pool(&pool_info, None)
                .map_err(|e| DeviceError::InitializationFailed(e.to_string()))?;

            let fence_info = vk::FenceCreateInfo::default();
            let submit_fence = device
                .create_fence(&fence_info, None)
                .map_err(|e| DeviceError::InitializationFailed(e.to_string()))?;

            Ok(Self {
                _entry: entry,
                instance,
                _physical_device: physical_device,
                device,
                queue: Mutex::new(queue),
                submit_fence,
                command_pool: Mutex::new(command_pool),
                allocator: Some(Arc::new(Mutex::new(allocator))),
                next_handle: AtomicU64::new(0),
                images: Mutex::new(HashMap::new()),
                buffers: Mutex::new(HashMap::new()),
                render_passes: Mutex::new(HashMap::new()),
                framebuffers: Mutex::new(HashMap::new()),
                events: Mutex::new(HashMap::new()),
                command_buffers: Mutex::new(HashMap::new()),
            })
        }
    }

    /// Whether a Vulkan implementation is present on this machine.
    pub fn is_available() -> bool {
        unsafe { ash::Entry::load().is_ok() }
    }

    fn find_graphics_queue_family(
        instance: &ash::Instance,
        physical_device: vk::PhysicalDevice,
    ) -> Option<u32> {
        let properties =
            unsafe { instance.get_physical_device_queue_family_properties(physical_device) };
        properties
            .iter()
            .position(|family| family.queue_flags.contains(vk::QueueFlags::GRAPHICS))
            .map(|index| index as u32)
    }

    fn next_handle(&self) -> u64 {
        self.next_handle.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn allocator(&self) -> &Arc<Mutex<Allocator>> {
        // Set in new(), taken only in drop().
        self.allocator.as_ref().unwrap()
    }

    fn command_buffer(&self, cmd: CommandList) -> vk::CommandBuffer {
        *self
            .command_buffers
            .lock()
            .get(&cmd.raw())
            .unwrap_or_else(|| panic!("unknown command list {:?}", cmd))
    }

    fn vk_image(&self, handle: ImageHandle) -> vk::Image {
        self.images
            .lock()
            .get(&handle.raw())
            .map(|image| image.image)
            .unwrap_or_else(|| panic!("unknown image {:?}", handle))
    }

    fn image_barrier_to_vk(&self, barrier: &ImageBarrier) -> vk::ImageMemoryBarrier<'static> {
        vk::ImageMemoryBarrier {
            src_access_mask: conversion::access_to_vk(barrier.src_access),
            dst_access_mask: conversion::access_to_vk(barrier.dst_access),
            old_layout: conversion::layout_to_vk(barrier.old_layout),
            new_layout: conversion::layout_to_vk(barrier.new_layout),
            src_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
            dst_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
            image: self.vk_image(barrier.image),
            subresource_range: vk::ImageSubresourceRange {
                aspect_mask: conversion::aspect_to_vk(barrier.aspect),
                base_mip_level: 0,
                level_count: vk::REMAINING_MIP_LEVELS,
                base_array_layer: 0,
                layer_count: vk::REMAINING_ARRAY_LAYERS,
            },
            ..Default::default()
        }
    }
}

impl Device for VulkanDevice {
    fn name(&self) -> &'static str {
        "Vulkan"
    }

    fn create_image(
        &self,
        descriptor: &ImageDescriptor,
    ) -> Result<(ImageHandle, ImageViewHandle), DeviceError> {
        unsafe {
            let format = conversion::format_to_vk(descriptor.format);
            let image_info = vk::ImageCreateInfo {
                image_type: vk::ImageType::TYPE_2D,
                extent: vk::Extent3D {
                    width: descriptor.size.width,
                    height: descriptor.size.height,
                    depth: descriptor.size.depth,
                },
                mip_levels: 1,
                array_layers: descriptor.layers,
                format,
                tiling: vk::ImageTiling::OPTIMAL,
                initial_layout: vk::ImageLayout::UNDEFINED,
                usage: conversion::image_usage_to_vk(descriptor.usage, descriptor.format),
                sharing_mode: vk::SharingMode::EXCLUSIVE,
                samples: vk::SampleCountFlags::TYPE_1,
                ..Default::default()
            };
            let image = self
                .device
                .create_image(&image_info, None)
                .map_err(|e| DeviceError::ResourceCreationFailed(e.to_string()))?;

            let requirements = self.device.get_image_memory_requirements(image);
            let allocation = self
                .allocator()
                .lock()
                .allocate(&AllocationCreateDesc {
                    name: descriptor.label.as_deref().unwrap_or("image"),
                    requirements,
                    location: MemoryLocation::GpuOnly,
                    linear: false,
                    allocation_scheme: AllocationScheme::GpuAllocatorManaged,
                })
                .map_err(|e| DeviceError::ResourceCreationFailed(e.to_string()))?;
            self.device
                .bind_image_memory(image, allocation.memory(), allocation.offset())
                .map_err(|e| DeviceError::ResourceCreationFailed(e.to_string()))?;

            let aspect = super::ImageAspect::from_format(descriptor.format);
            let view_info = vk::ImageViewCreateInfo {
                image,
                view_type: if descriptor.layers > 1 {
                    vk::ImageViewType::TYPE_2D_ARRAY
                } else {
                    vk::ImageViewType::TYPE_2D
                },
                format,
                subresource_range: vk::ImageSubresourceRange {
                    aspect_mask: conversion::aspect_to_vk(aspect),
                    base_mip_level: 0,
                    level_count: 1,
                    base_array_layer: 0,
                    layer_count: descriptor.layers,
                },
                ..Default::default()
            };
            let view = self
                .device
                .create_image_view(&view_info, None)
                .map_err(|e| DeviceError::ResourceCreationFailed(e.to_string()))?;

            let id = self.next_handle();
            self.images.lock().insert(
                id,
                VkImage {
                    image,
                    view,
                    allocation: Some(allocation),
                },
            );
            // The view shares the image id, views are never looked up alone.
            Ok((ImageHandle::from_raw(id), ImageViewHandle::from_raw(id)))
        }
    }

    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<BufferHandle, DeviceError> {
        unsafe {
            let buffer_info = vk::BufferCreateInfo {
                size: descriptor.size,
                usage: conversion::buffer_usage_to_vk(descriptor.usage),
                sharing_mode: vk::SharingMode::EXCLUSIVE,
                ..Default::default()
            };
            let buffer = self
                .device
                .create_buffer(&buffer_info, None)
                .map_err(|e| DeviceError::ResourceCreationFailed(e.to_string()))?;

            let requirements = self.device.get_buffer_memory_requirements(buffer);
            let location = if descriptor.usage.contains(crate::types::BufferUsage::UNIFORM) {
                MemoryLocation::CpuToGpu
            } else {
                MemoryLocation::GpuOnly
            };
            let allocation = self
                .allocator()
                .lock()
                .allocate(&AllocationCreateDesc {
                    name: descriptor.label.as_deref().unwrap_or("buffer"),
                    requirements,
                    location,
                    linear: true,
                    allocation_scheme: AllocationScheme::GpuAllocatorManaged,
                })
                .map_err(|e| DeviceError::ResourceCreationFailed(e.to_string()))?;
            self.device
                .bind_buffer_memory(buffer, allocation.memory(), allocation.offset())
                .map_err(|e| DeviceError::ResourceCreationFailed(e.to_string()))?;

            let id = self.next_handle();
            self.buffers.lock().insert(
                id,
                VkBuffer {
                    buffer,
                    allocation: Some(allocation),
                },
            );
            Ok(BufferHandle::from_raw(id))
        }
    }

    fn create_render_pass(
        &self,
        descriptor: &RenderPassDescriptor,
    ) -> Result<RenderPassHandle, DeviceError> {
        unsafe {
            let attachments: Vec<vk::AttachmentDescription> = descriptor
                .attachments
                .iter()
                .map(|attachment| vk::AttachmentDescription {
                    format: conversion::format_to_vk(attachment.format),
                    samples: vk::SampleCountFlags::TYPE_1,
                    load_op: conversion::load_op_to_vk(&attachment.load_op),
                    store_op: conversion::store_op_to_vk(attachment.store_op),
                    stencil_load_op: vk::AttachmentLoadOp::DONT_CARE,
                    stencil_store_op: vk::AttachmentStoreOp::DONT_CARE,
                    initial_layout: conversion::layout_to_vk(attachment.initial_layout),
                    final_layout: conversion::layout_to_vk(attachment.final_layout),
                    ..Default::default()
                })
                .collect();

            let color_references: Vec<Vec<vk::AttachmentReference>> = descriptor
                .subpasses
                .iter()
                .map(|subpass| {
                    subpass
                        .color_attachments
                        .iter()
                        .map(|reference| vk::AttachmentReference {
                            attachment: reference.attachment,
                            layout: conversion::layout_to_vk(reference.layout),
                        })
                        .collect()
                })
                .collect();
            let depth_references: Vec<Option<vk::AttachmentReference>> = descriptor
                .subpasses
                .iter()
                .map(|subpass| {
                    subpass
                        .depth_stencil_attachment
                        .as_ref()
                        .map(|reference| vk::AttachmentReference {
                            attachment: reference.attachment,
                            layout: conversion::layout_to_vk(reference.layout),
                        })
                })
                .collect();

            let subpasses: Vec<vk::SubpassDescription> = (0..descriptor.subpasses.len())
                .map(|index| {
                    let mut subpass = vk::SubpassDescription {
                        pipeline_bind_point: vk::PipelineBindPoint::GRAPHICS,
                        color_attachment_count: color_references[index].len() as u32,
                        p_color_attachments: color_references[index].as_ptr(),
                        ..Default::default()
                    };
                    if let Some(depth) = &depth_references[index] {
                        subpass.p_depth_stencil_attachment = depth;
                    }
                    subpass
                })
                .collect();

            let dependencies: Vec<vk::SubpassDependency> = descriptor
                .dependencies
                .iter()
                .map(|dependency| vk::SubpassDependency {
                    src_subpass: dependency.src_subpass,
                    dst_subpass: dependency.dst_subpass,
                    src_stage_mask: conversion::stages_to_vk(dependency.src_stages),
                    dst_stage_mask: conversion::stages_to_vk(dependency.dst_stages),
                    src_access_mask: conversion::access_to_vk(dependency.src_access),
                    dst_access_mask: conversion::access_to_vk(dependency.dst_access),
                    dependency_flags: if dependency.by_region {
                        vk::DependencyFlags::BY_REGION
                    } else {
                        vk::DependencyFlags::empty()
                    },
                })
                .collect();

            let render_pass_info = vk::RenderPassCreateInfo {
                attachment_count: attachments.len() as u32,
                p_attachments: attachments.as_ptr(),
                subpass_count: subpasses.len() as u32,
                p_subpasses: subpasses.as_ptr(),
                dependency_count: dependencies.len() as u32,
                p_dependencies: dependencies.as_ptr(),
                ..Default::default()
            };
            let render_pass = self
                .device
                .create_render_pass(&render_pass_info, None)
                .map_err(|e| DeviceError::ResourceCreationFailed(e.to_string()))?;

            let id = self.next_handle();
            self.render_passes.lock().insert(id, render_pass);
            Ok(RenderPassHandle::from_raw(id))
        }
    }

    fn create_framebuffer(
        &self,
        descriptor: &FramebufferDescriptor,
    ) -> Result<FramebufferHandle, DeviceError> {
        unsafe {
            let render_pass = *self
                .render_passes
                .lock()
                .get(&descriptor.render_pass.raw())
                .ok_or_else(|| {
                    DeviceError::InvalidParameter(format!(
                        "unknown render pass {:?}",
                        descriptor.render_pass
                    ))
                })?;
            let images = self.images.lock();
            let views: Vec<vk::ImageView> = descriptor
                .attachments
                .iter()
                .map(|view| {
                    images
                        .get(&view.raw())
                        .map(|image| image.view)
                        .ok_or_else(|| {
                            DeviceError::InvalidParameter(format!("unknown image view {view:?}"))
                        })
                })
                .collect::<Result<_, _>>()?;
            drop(images);

            let framebuffer_info = vk::FramebufferCreateInfo {
                render_pass,
                attachment_count: views.len() as u32,
                p_attachments: views.as_ptr(),
                width: descriptor.extent.width,
                height: descriptor.extent.height,
                layers: descriptor.layers,
                ..Default::default()
            };
            let framebuffer = self
                .device
                .create_framebuffer(&framebuffer_info, None)
                .map_err(|e| DeviceError::ResourceCreationFailed(e.to_string()))?;

            let id = self.next_handle();
            self.framebuffers.lock().insert(
                id,
                VkFramebuffer {
                    framebuffer,
                    extent: vk::Extent2D {
                        width: descriptor.extent.width,
                        height: descriptor.extent.height,
                    },
                },
            );
            Ok(FramebufferHandle::from_raw(id))
        }
    }

    fn create_event(&self) -> Result<EventHandle, DeviceError> {
        unsafe {
            let event_info = vk::EventCreateInfo::default();
            let event = self
                .device
                .create_event(&event_info, None)
                .map_err(|e| DeviceError::ResourceCreationFailed(e.to_string()))?;
            let id = self.next_handle();
            self.events.lock().insert(id, event);
            Ok(EventHandle::from_raw(id))
        }
    }

    fn begin_commands(&self) -> CommandList {
        unsafe {
            let pool = self.command_pool.lock();
            let alloc_info = vk::CommandBufferAllocateInfo {
                command_pool: *pool,
                level: vk::CommandBufferLevel::PRIMARY,
                command_buffer_count: 1,
                ..Default::default()
            };
            let cmd = self
                .device
                .allocate_command_buffers(&alloc_info)
                .unwrap_or_else(|e| panic!("failed to allocate command buffer: {e}"))[0];
            drop(pool);

            let begin_info = vk::CommandBufferBeginInfo {
                flags: vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT,
                ..Default::default()
            };
            self.device
                .begin_command_buffer(cmd, &begin_info)
                .unwrap_or_else(|e| panic!("failed to begin command buffer: {e}"));

            let id = self.next_handle();
            self.command_buffers.lock().insert(id, cmd);
            CommandList::from_raw(id)
        }
    }

    fn submit_commands(&self, cmd: CommandList) {
        unsafe {
            let buffer = match self.command_buffers.lock().remove(&cmd.raw()) {
                Some(buffer) => buffer,
                None => panic!("unknown command list {:?}", cmd),
            };
            self.device
                .end_command_buffer(buffer)
                .unwrap_or_else(|e| panic!("failed to end command buffer: {e}"));

            let queue = self.queue.lock();
            let submit_info = vk::SubmitInfo {
                command_buffer_count: 1,
                p_command_buffers: &buffer,
                ..Default::default()
            };
            self.device
                .queue_submit(*queue, &[submit_info], self.submit_fence)
                .unwrap_or_else(|e| panic!("failed to submit commands: {e}"));
            self.device
                .wait_for_fences(&[self.submit_fence], true, u64::MAX)
                .unwrap_or_else(|e| panic!("failed to wait for submit: {e}"));
            self.device
                .reset_fences(&[self.submit_fence])
                .unwrap_or_else(|e| panic!("failed to reset submit fence: {e}"));
            drop(queue);

            let pool = self.command_pool.lock();
            self.device.free_command_buffers(*pool, &[buffer]);
        }
    }

    fn cmd_begin_render_pass(
        &self,
        cmd: CommandList,
        render_pass: RenderPassHandle,
        framebuffer: FramebufferHandle,
        clears: &[ClearValue],
    ) {
        unsafe {
            let buffer = self.command_buffer(cmd);
            let pass = *self
                .render_passes
                .lock()
                .get(&render_pass.raw())
                .unwrap_or_else(|| panic!("unknown render pass {:?}", render_pass));
            let (vk_framebuffer, extent) = {
                let framebuffers = self.framebuffers.lock();
                let entry = framebuffers
                    .get(&framebuffer.raw())
                    .unwrap_or_else(|| panic!("unknown framebuffer {:?}", framebuffer));
                (entry.framebuffer, entry.extent)
            };

            let clear_values: Vec<vk::ClearValue> = clears
                .iter()
                .map(|clear| conversion::clear_value_to_vk(*clear))
                .collect();
            let begin_info = vk::RenderPassBeginInfo {
                render_pass: pass,
                framebuffer: vk_framebuffer,
                render_area: vk::Rect2D {
                    offset: vk::Offset2D { x: 0, y: 0 },
                    extent,
                },
                clear_value_count: clear_values.len() as u32,
                p_clear_values: clear_values.as_ptr(),
                ..Default::default()
            };
            self.device
                .cmd_begin_render_pass(buffer, &begin_info, vk::SubpassContents::INLINE);
        }
    }

    fn cmd_next_subpass(&self, cmd: CommandList) {
        unsafe {
            self.device
                .cmd_next_subpass(self.command_buffer(cmd), vk::SubpassContents::INLINE);
        }
    }

    fn cmd_end_render_pass(&self, cmd: CommandList) {
        unsafe {
            self.device.cmd_end_render_pass(self.command_buffer(cmd));
        }
    }

    fn cmd_signal_event(&self, cmd: CommandList, event: EventHandle, stages: PipelineStages) {
        unsafe {
            let vk_event = *self
                .events
                .lock()
                .get(&event.raw())
                .unwrap_or_else(|| panic!("unknown event {:?}", event));
            self.device.cmd_set_event(
                self.command_buffer(cmd),
                vk_event,
                conversion::stages_to_vk(stages),
            );
        }
    }

    fn cmd_wait_events(
        &self,
        cmd: CommandList,
        events: &[EventHandle],
        src_stages: PipelineStages,
        dst_stages: PipelineStages,
        image_barriers: &[ImageBarrier],
        memory_barriers: &[MemoryBarrier],
    ) {
        unsafe {
            let vk_events: Vec<vk::Event> = {
                let stored = self.events.lock();
                events
                    .iter()
                    .map(|event| {
                        *stored
                            .get(&event.raw())
                            .unwrap_or_else(|| panic!("unknown event {:?}", event))
                    })
                    .collect()
            };
            let vk_image_barriers: Vec<vk::ImageMemoryBarrier> = image_barriers
                .iter()
                .map(|barrier| self.image_barrier_to_vk(barrier))
                .collect();
            let vk_memory_barriers: Vec<vk::MemoryBarrier> = memory_barriers
                .iter()
                .map(|barrier| vk::MemoryBarrier {
                    src_access_mask: conversion::access_to_vk(barrier.src_access),
                    dst_access_mask: conversion::access_to_vk(barrier.dst_access),
                    ..Default::default()
                })
                .collect();

            self.device.cmd_wait_events(
                self.command_buffer(cmd),
                &vk_events,
                conversion::stages_to_vk(src_stages),
                conversion::stages_to_vk(dst_stages),
                &vk_memory_barriers,
                &[],
                &vk_image_barriers,
            );
        }
    }
}

impl Drop for VulkanDevice {
    fn drop(&mut self) {
        unsafe {
            let _ = self.device.device_wait_idle();

            for (_, entry) in self.framebuffers.lock().drain() {
                self.device.destroy_framebuffer(entry.framebuffer, None);
            }
            for (_, render_pass) in self.render_passes.lock().drain() {
                self.device.destroy_render_pass(render_pass, None);
            }
            for (_, event) in self.events.lock().drain() {
                self.device.destroy_event(event, None);
            }
            for (_, mut image) in self.images.lock().drain() {
                self.device.destroy_image_view(image.view, None);
                self.device.destroy_image(image.image, None);
                if let Some(allocation) = image.allocation.take() {
                    let _ = self.allocator().lock().free(allocation);
                }
            }
            for (_, mut buffer) in self.buffers.lock().drain() {
                self.device.destroy_buffer(buffer.buffer, None);
                if let Some(allocation) = buffer.allocation.take() {
                    let _ = self.allocator().lock().free(allocation);
                }
            }

            self.device.destroy_fence(self.submit_fence, None);
            self.device
                .destroy_command_pool(*self.command_pool.lock(), None);

            // The allocator must go before the device it was created from.
            self.allocator = None;
            self.device.destroy_device(None);
            self.instance.destroy_instance(None);
        }
    }
}

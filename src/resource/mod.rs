//! Graph resources and their tracked state.
//!
//! Every attachment, buffer and plain value that flows between task groups is
//! registered in a [`ResourceTable`] and addressed by a [`ResourceHandle`].
//! The table owns the GPU objects backing each resource and tracks the image
//! layout each attachment was left in, so cross-group barriers can be derived
//! from recorded state instead of guesswork.

use bytemuck::Pod;

use crate::backend::{
    BufferHandle, Device, DeviceError, ImageAspect, ImageBarrier, ImageHandle, ImageViewHandle,
};
use crate::graph::GroupHandle;
use crate::types::{
    Access, BufferDescriptor, BufferUsage, ClearValue, Extent3d, ImageDescriptor, ImageLayout,
    PipelineStages, TextureFormat, TextureUsage,
};

// ============================================================================
// Handles
// ============================================================================

/// Identifies a resource within a [`ResourceTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceHandle(u32);

impl ResourceHandle {
    /// Create a handle from a raw index.
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Get the raw index.
    pub fn raw(&self) -> u32 {
        self.0
    }
}

// ============================================================================
// Resources
// ============================================================================

/// What kind of data a resource carries.
#[derive(Debug)]
pub enum ResourceKind {
    /// A render target image, usable as attachment and shader input.
    Image {
        format: TextureFormat,
        extent: Extent3d,
        layers: u32,
        usage: TextureUsage,
        clear: ClearValue,
        image: Option<ImageHandle>,
        view: Option<ImageViewHandle>,
    },
    /// A GPU buffer.
    Buffer {
        size: u64,
        usage: BufferUsage,
        buffer: Option<BufferHandle>,
    },
    /// A CPU-side value passed between groups, stored as plain bytes.
    Value { bytes: Vec<u8> },
}

/// A single graph resource with its tracked layout state.
#[derive(Debug)]
pub struct Resource {
    name: String,
    kind: ResourceKind,
    first_producer: Option<GroupHandle>,
    layout: ImageLayout,
}

impl Resource {
    /// Resource name, used for lookup and log output.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The kind of data this resource carries.
    pub fn kind(&self) -> &ResourceKind {
        &self.kind
    }

    /// Whether this resource is an image.
    pub fn is_image(&self) -> bool {
        matches!(self.kind, ResourceKind::Image { .. })
    }

    /// Image format, if this resource is an image.
    pub fn format(&self) -> Option<TextureFormat> {
        match &self.kind {
            ResourceKind::Image { format, .. } => Some(*format),
            _ => None,
        }
    }

    /// Image extent, if this resource is an image.
    pub fn extent(&self) -> Option<Extent3d> {
        match &self.kind {
            ResourceKind::Image { extent, .. } => Some(*extent),
            _ => None,
        }
    }

    /// Number of array layers, if this resource is an image.
    pub fn layers(&self) -> Option<u32> {
        match &self.kind {
            ResourceKind::Image { layers, .. } => Some(*layers),
            _ => None,
        }
    }

    /// Clear value used when this image is first produced.
    pub fn clear_value(&self) -> ClearValue {
        match &self.kind {
            ResourceKind::Image { clear, .. } => *clear,
            _ => ClearValue::None,
        }
    }

    /// GPU image handle, if realized.
    pub fn image_handle(&self) -> Option<ImageHandle> {
        match &self.kind {
            ResourceKind::Image { image, .. } => *image,
            _ => None,
        }
    }

    /// GPU image view handle, if realized.
    pub fn view_handle(&self) -> Option<ImageViewHandle> {
        match &self.kind {
            ResourceKind::Image { view, .. } => *view,
            _ => None,
        }
    }

    /// The group that first writes this resource, once assigned.
    pub fn first_producer(&self) -> Option<GroupHandle> {
        self.first_producer
    }

    /// Record the first producing group. Later assignments are ignored, the
    /// earliest group in sorted order wins.
    pub fn assign_first_producer(&mut self, group: GroupHandle) {
        if self.first_producer.is_none() {
            self.first_producer = Some(group);
        }
    }

    /// The layout this image was last left in.
    pub fn layout(&self) -> ImageLayout {
        self.layout
    }

    /// Record the layout an image ends up in after a render pass, without
    /// emitting a barrier. Used for transitions the render pass itself
    /// performs through its attachment descriptions.
    pub fn commit_layout(&mut self, layout: ImageLayout) {
        debug_assert!(self.is_image(), "layout tracked for images only");
        self.layout = layout;
    }

    /// Build a barrier transitioning this image to `new_layout` and commit
    /// the new state. Source masks are derived from the tracked layout.
    /// Returns `None` when the image already is in the requested layout.
    pub fn barrier_to(
        &mut self,
        new_layout: ImageLayout,
        dst_stages: PipelineStages,
        dst_access: Access,
    ) -> Option<ImageBarrier> {
        let (image, format) = match &self.kind {
            ResourceKind::Image { image, format, .. } => (
                image.unwrap_or_else(|| panic!("image '{}' not realized", self.name)),
                *format,
            ),
            _ => panic!("barrier requested for non-image resource '{}'", self.name),
        };
        if self.layout == new_layout {
            return None;
        }
        let old_layout = self.layout;
        self.layout = new_layout;
        Some(ImageBarrier {
            image,
            old_layout,
            new_layout,
            src_stages: old_layout.src_stage(),
            dst_stages,
            src_access: old_layout.src_access_mask(),
            dst_access,
            aspect: ImageAspect::from_format(format),
        })
    }
}

// ============================================================================
// Resource table
// ============================================================================

/// Owns every resource of a render graph.
#[derive(Debug, Default)]
pub struct ResourceTable {
    resources: Vec<Resource>,
}

impl ResourceTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an image resource.
    pub fn add_image(&mut self, descriptor: ImageDescriptor) -> ResourceHandle {
        let handle = ResourceHandle(self.resources.len() as u32);
        let name = descriptor
            .label
            .unwrap_or_else(|| format!("image{}", handle.0));
        self.resources.push(Resource {
            name,
            kind: ResourceKind::Image {
                format: descriptor.format,
                extent: descriptor.size,
                layers: descriptor.layers,
                usage: descriptor.usage,
                clear: descriptor.clear,
                image: None,
                view: None,
            },
            first_producer: None,
            layout: ImageLayout::Undefined,
        });
        handle
    }

    /// Register a buffer resource.
    pub fn add_buffer(&mut self, descriptor: BufferDescriptor) -> ResourceHandle {
        let handle = ResourceHandle(self.resources.len() as u32);
        let name = descriptor
            .label
            .unwrap_or_else(|| format!("buffer{}", handle.0));
        self.resources.push(Resource {
            name,
            kind: ResourceKind::Buffer {
                size: descriptor.size,
                usage: descriptor.usage,
                buffer: None,
            },
            first_producer: None,
            layout: ImageLayout::Undefined,
        });
        handle
    }

    /// Register a plain value resource with an initial value.
    pub fn add_value<T: Pod>(&mut self, name: &str, value: &T) -> ResourceHandle {
        let handle = ResourceHandle(self.resources.len() as u32);
        self.resources.push(Resource {
            name: name.to_string(),
            kind: ResourceKind::Value {
                bytes: bytemuck::bytes_of(value).to_vec(),
            },
            first_producer: None,
            layout: ImageLayout::Undefined,
        });
        handle
    }

    /// Access a resource. Panics on a stale handle.
    pub fn get(&self, handle: ResourceHandle) -> &Resource {
        &self.resources[handle.0 as usize]
    }

    /// Mutably access a resource. Panics on a stale handle.
    pub fn get_mut(&mut self, handle: ResourceHandle) -> &mut Resource {
        &mut self.resources[handle.0 as usize]
    }

    /// Look up a resource by name.
    pub fn handle_by_name(&self, name: &str) -> Option<ResourceHandle> {
        self.resources
            .iter()
            .position(|r| r.name == name)
            .map(|i| ResourceHandle(i as u32))
    }

    /// Overwrite a value resource.
    pub fn write_value<T: Pod>(&mut self, handle: ResourceHandle, value: &T) {
        let resource = self.get_mut(handle);
        match &mut resource.kind {
            ResourceKind::Value { bytes } => {
                bytes.clear();
                bytes.extend_from_slice(bytemuck::bytes_of(value));
            }
            _ => panic!("resource '{}' is not a value", resource.name),
        }
    }

    /// Read a value resource back.
    pub fn read_value<T: Pod>(&self, handle: ResourceHandle) -> T {
        let resource = self.get(handle);
        match &resource.kind {
            ResourceKind::Value { bytes } => bytemuck::pod_read_unaligned(bytes),
            _ => panic!("resource '{}' is not a value", resource.name),
        }
    }

    /// Create the GPU objects backing every image and buffer that has none
    /// yet. Safe to call more than once.
    pub fn realize(&mut self, device: &dyn Device) -> Result<(), DeviceError> {
        for resource in &mut self.resources {
            match &mut resource.kind {
                ResourceKind::Image {
                    format,
                    extent,
                    layers,
                    usage,
                    clear,
                    image,
                    view,
                } if image.is_none() => {
                    let descriptor = ImageDescriptor {
                        label: Some(resource.name.clone()),
                        size: *extent,
                        layers: *layers,
                        format: *format,
                        usage: *usage,
                        clear: *clear,
                    };
                    let (new_image, new_view) = device.create_image(&descriptor)?;
                    *image = Some(new_image);
                    *view = Some(new_view);
                }
                ResourceKind::Buffer {
                    size,
                    usage,
                    buffer,
                } if buffer.is_none() => {
                    let descriptor = BufferDescriptor {
                        label: Some(resource.name.clone()),
                        size: *size,
                        usage: *usage,
                    };
                    *buffer = Some(device.create_buffer(&descriptor)?);
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Number of registered resources.
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

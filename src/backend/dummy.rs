//! Dummy device for testing and development.
//!
//! Performs no GPU work. Every created object gets a fresh handle and every
//! recorded command is appended to an inspectable log, so tests can assert
//! the exact command stream the graph produced without GPU hardware.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::types::{BufferDescriptor, ClearValue, ImageDescriptor, PipelineStages};

use super::{
    BufferHandle, CommandList, Device, DeviceError, EventHandle, FramebufferDescriptor,
    FramebufferHandle, ImageBarrier, ImageHandle, ImageViewHandle, MemoryBarrier,
    RenderPassDescriptor, RenderPassHandle,
};

/// One recorded command.
#[derive(Debug, Clone, PartialEq)]
pub enum DummyCommand {
    /// A render pass instance was begun.
    BeginRenderPass {
        render_pass: RenderPassHandle,
        framebuffer: FramebufferHandle,
        clears: Vec<ClearValue>,
    },
    /// Advanced to the next subpass.
    NextSubpass,
    /// The render pass instance was ended.
    EndRenderPass,
    /// An event was signaled.
    SignalEvent {
        event: EventHandle,
        stages: PipelineStages,
    },
    /// Events were waited on, applying barriers.
    WaitEvents {
        events: Vec<EventHandle>,
        src_stages: PipelineStages,
        dst_stages: PipelineStages,
        image_barriers: Vec<ImageBarrier>,
        memory_barriers: Vec<MemoryBarrier>,
    },
    /// A command list was submitted.
    Submit,
}

/// Dummy device recording commands instead of executing them.
#[derive(Debug, Default)]
pub struct DummyDevice {
    next_handle: AtomicU64,
    commands: Mutex<Vec<DummyCommand>>,
    render_passes: Mutex<HashMap<u64, RenderPassDescriptor>>,
    framebuffers: Mutex<HashMap<u64, FramebufferDescriptor>>,
}

impl DummyDevice {
    /// Create a new dummy device.
    pub fn new() -> Self {
        Self::default()
    }

    fn next_handle(&self) -> u64 {
        // Start at 1 so 0 never aliases a live object.
        self.next_handle.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Snapshot of all recorded commands.
    pub fn commands(&self) -> Vec<DummyCommand> {
        self.commands.lock().clone()
    }

    /// Discard all recorded commands.
    pub fn clear_commands(&self) {
        self.commands.lock().clear();
    }

    /// Get the descriptor a render pass was constructed from.
    pub fn render_pass_descriptor(&self, handle: RenderPassHandle) -> Option<RenderPassDescriptor> {
        self.render_passes.lock().get(&handle.raw()).cloned()
    }

    /// Get the descriptor a framebuffer was constructed from.
    pub fn framebuffer_descriptor(
        &self,
        handle: FramebufferHandle,
    ) -> Option<FramebufferDescriptor> {
        self.framebuffers.lock().get(&handle.raw()).cloned()
    }

    fn record(&self, command: DummyCommand) {
        self.commands.lock().push(command);
    }
}

impl Device for DummyDevice {
    fn name(&self) -> &'static str {
        "Dummy"
    }

    fn create_image(
        &self,
        descriptor: &ImageDescriptor,
    ) -> Result<(ImageHandle, ImageViewHandle), DeviceError> {
        log::trace!(
            "DummyDevice: creating image {:?} ({}x{}, {:?})",
            descriptor.label,
            descriptor.size.width,
            descriptor.size.height,
            descriptor.format
        );
        Ok((
            ImageHandle::from_raw(self.next_handle()),
            ImageViewHandle::from_raw(self.next_handle()),
        ))
    }

    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<BufferHandle, DeviceError> {
        log::trace!(
            "DummyDevice: creating buffer {:?} (size: {})",
            descriptor.label,
            descriptor.size
        );
        Ok(BufferHandle::from_raw(self.next_handle()))
    }

    fn create_render_pass(
        &self,
        descriptor: &RenderPassDescriptor,
    ) -> Result<RenderPassHandle, DeviceError> {
        log::trace!(
            "DummyDevice: creating render pass {:?} ({} attachments, {} subpasses, {} dependencies)",
            descriptor.label,
            descriptor.attachments.len(),
            descriptor.subpasses.len(),
            descriptor.dependencies.len()
        );
        let handle = RenderPassHandle::from_raw(self.next_handle());
        self.render_passes
            .lock()
            .insert(handle.raw(), descriptor.clone());
        Ok(handle)
    }

    fn create_framebuffer(
        &self,
        descriptor: &FramebufferDescriptor,
    ) -> Result<FramebufferHandle, DeviceError> {
        log::trace!(
            "DummyDevice: creating framebuffer {:?} ({} attachments, {}x{})",
            descriptor.label,
            descriptor.attachments.len(),
            descriptor.extent.width,
            descriptor.extent.height
        );
        let handle = FramebufferHandle::from_raw(self.next_handle());
        self.framebuffers
            .lock()
            .insert(handle.raw(), descriptor.clone());
        Ok(handle)
    }

    fn create_event(&self) -> Result<EventHandle, DeviceError> {
        Ok(EventHandle::from_raw(self.next_handle()))
    }

    fn begin_commands(&self) -> CommandList {
        CommandList::from_raw(self.next_handle())
    }

    fn submit_commands(&self, _cmd: CommandList) {
        log::trace!("DummyDevice: submit");
        self.record(DummyCommand::Submit);
    }

    fn cmd_begin_render_pass(
        &self,
        _cmd: CommandList,
        render_pass: RenderPassHandle,
        framebuffer: FramebufferHandle,
        clears: &[ClearValue],
    ) {
        log::trace!(
            "DummyDevice: begin render pass {:?} ({} clears)",
            render_pass,
            clears.len()
        );
        self.record(DummyCommand::BeginRenderPass {
            render_pass,
            framebuffer,
            clears: clears.to_vec(),
        });
    }

    fn cmd_next_subpass(&self, _cmd: CommandList) {
        log::trace!("DummyDevice: next subpass");
        self.record(DummyCommand::NextSubpass);
    }

    fn cmd_end_render_pass(&self, _cmd: CommandList) {
        log::trace!("DummyDevice: end render pass");
        self.record(DummyCommand::EndRenderPass);
    }

    fn cmd_signal_event(&self, _cmd: CommandList, event: EventHandle, stages: PipelineStages) {
        log::trace!("DummyDevice: signal event {:?} at {:?}", event, stages);
        self.record(DummyCommand::SignalEvent { event, stages });
    }

    fn cmd_wait_events(
        &self,
        _cmd: CommandList,
        events: &[EventHandle],
        src_stages: PipelineStages,
        dst_stages: PipelineStages,
        image_barriers: &[ImageBarrier],
        memory_barriers: &[MemoryBarrier],
    ) {
        log::trace!(
            "DummyDevice: wait {} events ({} image barriers, {} memory barriers)",
            events.len(),
            image_barriers.len(),
            memory_barriers.len()
        );
        self.record(DummyCommand::WaitEvents {
            events: events.to_vec(),
            src_stages,
            dst_stages,
            image_barriers: image_barriers.to_vec(),
            memory_barriers: memory_barriers.to_vec(),
        });
    }
}

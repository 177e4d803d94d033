//! GPU device abstraction layer.
//!
//! The graph synthesizes backend-neutral artifacts (render pass descriptors,
//! subpass dependencies, barriers) and hands them to a [`Device`]
//! implementation. Two implementations exist:
//!
//! - `dummy` (default): records every command into an inspectable log, used
//!   by tests and for development without GPU hardware
//! - `vulkan-backend`: native Vulkan via ash

#[cfg(feature = "dummy")]
pub mod dummy;

#[cfg(feature = "vulkan-backend")]
pub mod vulkan;

use std::fmt;

use static_assertions::assert_impl_all;

use crate::types::{
    Access, BufferDescriptor, ClearValue, Extent3d, ImageDescriptor, ImageLayout, LoadOp,
    PipelineStages, StoreOp, TextureFormat,
};

// ============================================================================
// Handles
// ============================================================================

macro_rules! define_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(u64);

        impl $name {
            /// Create a handle from a raw value.
            pub fn from_raw(raw: u64) -> Self {
                Self(raw)
            }

            /// Get the raw handle value.
            pub fn raw(&self) -> u64 {
                self.0
            }
        }
    };
}

define_handle!(
    /// Handle to a device image.
    ImageHandle
);
define_handle!(
    /// Handle to a device image view.
    ImageViewHandle
);
define_handle!(
    /// Handle to a device buffer.
    BufferHandle
);
define_handle!(
    /// Handle to a constructed render pass.
    RenderPassHandle
);
define_handle!(
    /// Handle to a constructed framebuffer.
    FramebufferHandle
);
define_handle!(
    /// Handle to a device event used for cross-pass synchronization.
    EventHandle
);
define_handle!(
    /// Handle to an open command list.
    CommandList
);

assert_impl_all!(ImageHandle: Copy, Send, Sync);
assert_impl_all!(EventHandle: Copy, Send, Sync);

// ============================================================================
// Render pass artifacts
// ============================================================================

/// Description of one attachment within a render pass.
#[derive(Debug, Clone, PartialEq)]
pub struct AttachmentDescription {
    /// Format of the attachment image.
    pub format: TextureFormat,
    /// Operation at render pass begin.
    pub load_op: LoadOp,
    /// Operation at render pass end.
    pub store_op: StoreOp,
    /// Layout the image is in when the pass begins.
    pub initial_layout: ImageLayout,
    /// Layout the image is left in when the pass ends.
    pub final_layout: ImageLayout,
}

/// Reference to an attachment from a subpass, by index into the render
/// pass's attachment list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachmentReference {
    /// Index into [`RenderPassDescriptor::attachments`].
    pub attachment: u32,
    /// Layout the attachment is used in during the subpass.
    pub layout: ImageLayout,
}

/// Description of one subpass.
#[derive(Debug, Clone, Default)]
pub struct SubpassDescription {
    /// Color attachment references, in declaration order.
    pub color_attachments: Vec<AttachmentReference>,
    /// Optional depth/stencil attachment reference.
    pub depth_stencil_attachment: Option<AttachmentReference>,
}

/// Execution and memory dependency between two subpasses of one render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubpassDependency {
    /// Source subpass index.
    pub src_subpass: u32,
    /// Destination subpass index.
    pub dst_subpass: u32,
    /// Stages that must complete in the source subpass.
    pub src_stages: PipelineStages,
    /// Stages that wait in the destination subpass.
    pub dst_stages: PipelineStages,
    /// Source access scope.
    pub src_access: Access,
    /// Destination access scope.
    pub dst_access: Access,
    /// Restrict the dependency to framebuffer-local regions.
    pub by_region: bool,
}

impl SubpassDependency {
    /// Merge another dependency's masks into this one.
    ///
    /// Used when two attachments produce a dependency for the same
    /// (src, dst) subpass pair: the union covers both.
    pub fn merge_masks(&mut self, other: &SubpassDependency) {
        debug_assert_eq!(self.src_subpass, other.src_subpass);
        debug_assert_eq!(self.dst_subpass, other.dst_subpass);
        self.src_stages |= other.src_stages;
        self.dst_stages |= other.dst_stages;
        self.src_access |= other.src_access;
        self.dst_access |= other.dst_access;
        self.by_region &= other.by_region;
    }
}

/// Descriptor for constructing a render pass.
#[derive(Debug, Clone, Default)]
pub struct RenderPassDescriptor {
    /// Debug label.
    pub label: Option<String>,
    /// All attachments used by the pass.
    pub attachments: Vec<AttachmentDescription>,
    /// One subpass per task, in task order.
    pub subpasses: Vec<SubpassDescription>,
    /// Subpass-to-subpass dependencies.
    pub dependencies: Vec<SubpassDependency>,
}

/// Descriptor for constructing a framebuffer.
#[derive(Debug, Clone)]
pub struct FramebufferDescriptor {
    /// Debug label.
    pub label: Option<String>,
    /// The render pass this framebuffer is compatible with.
    pub render_pass: RenderPassHandle,
    /// Image views, one per attachment, matching the render pass order.
    pub attachments: Vec<ImageViewHandle>,
    /// Render area dimensions.
    pub extent: Extent3d,
    /// Number of layers.
    pub layers: u32,
}

// ============================================================================
// Barriers
// ============================================================================

/// Aspect of an image a barrier applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageAspect {
    /// Color aspect.
    Color,
    /// Depth aspect only.
    Depth,
    /// Depth and stencil aspects.
    DepthStencil,
}

impl ImageAspect {
    /// Derive the aspect from an image format.
    pub fn from_format(format: TextureFormat) -> Self {
        if !format.is_depth_stencil() {
            Self::Color
        } else if format.has_stencil() {
            Self::DepthStencil
        } else {
            Self::Depth
        }
    }
}

/// Layout transition and memory dependency for one image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageBarrier {
    /// The image to transition.
    pub image: ImageHandle,
    /// Layout before the barrier.
    pub old_layout: ImageLayout,
    /// Layout after the barrier.
    pub new_layout: ImageLayout,
    /// Stages that must complete before the transition.
    pub src_stages: PipelineStages,
    /// Stages that wait for the transition.
    pub dst_stages: PipelineStages,
    /// Source access scope.
    pub src_access: Access,
    /// Destination access scope.
    pub dst_access: Access,
    /// Image aspect the barrier applies to.
    pub aspect: ImageAspect,
}

impl ImageBarrier {
    /// Merge another barrier's masks into this one.
    ///
    /// The same image may become a dependency through more than one upstream
    /// path; the merged masks cover the union of all of them.
    pub fn merge_masks(&mut self, other: &ImageBarrier) {
        debug_assert_eq!(self.image, other.image);
        self.src_stages |= other.src_stages;
        self.dst_stages |= other.dst_stages;
        self.src_access |= other.src_access;
        self.dst_access |= other.dst_access;
    }
}

/// Global memory dependency with no layout transition (buffers, values).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryBarrier {
    /// Stages that must complete before the barrier.
    pub src_stages: PipelineStages,
    /// Stages that wait for the barrier.
    pub dst_stages: PipelineStages,
    /// Source access scope.
    pub src_access: Access,
    /// Destination access scope.
    pub dst_access: Access,
}

impl MemoryBarrier {
    /// Merge another barrier's masks into this one.
    pub fn merge_masks(&mut self, other: &MemoryBarrier) {
        self.src_stages |= other.src_stages;
        self.dst_stages |= other.dst_stages;
        self.src_access |= other.src_access;
        self.dst_access |= other.dst_access;
    }
}

// ============================================================================
// Device trait
// ============================================================================

/// Errors that can occur in device operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// Failed to initialize the device.
    InitializationFailed(String),
    /// Failed to create a resource.
    ResourceCreationFailed(String),
    /// An invalid parameter was provided.
    InvalidParameter(String),
    /// Out of GPU memory.
    OutOfMemory,
    /// An internal device error occurred.
    Internal(String),
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InitializationFailed(msg) => write!(f, "device initialization failed: {msg}"),
            Self::ResourceCreationFailed(msg) => write!(f, "resource creation failed: {msg}"),
            Self::InvalidParameter(msg) => write!(f, "invalid parameter: {msg}"),
            Self::OutOfMemory => write!(f, "out of GPU memory"),
            Self::Internal(msg) => write!(f, "internal device error: {msg}"),
        }
    }
}

impl std::error::Error for DeviceError {}

/// GPU device abstraction consumed by the graph.
///
/// Object creation returns opaque handles; command recording is expressed
/// against an open [`CommandList`]. Implementations are free to defer or
/// batch work as long as recorded order is preserved.
pub trait Device: Send + Sync {
    /// Get the device name.
    fn name(&self) -> &'static str;

    /// Create an image and its default view.
    fn create_image(
        &self,
        descriptor: &ImageDescriptor,
    ) -> Result<(ImageHandle, ImageViewHandle), DeviceError>;

    /// Create a buffer.
    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<BufferHandle, DeviceError>;

    /// Construct a render pass from synthesized descriptions.
    fn create_render_pass(
        &self,
        descriptor: &RenderPassDescriptor,
    ) -> Result<RenderPassHandle, DeviceError>;

    /// Construct a framebuffer for a render pass.
    fn create_framebuffer(
        &self,
        descriptor: &FramebufferDescriptor,
    ) -> Result<FramebufferHandle, DeviceError>;

    /// Create an event for cross-pass synchronization.
    fn create_event(&self) -> Result<EventHandle, DeviceError>;

    /// Open a command list for recording.
    fn begin_commands(&self) -> CommandList;

    /// Close and submit a command list.
    fn submit_commands(&self, cmd: CommandList);

    /// Begin a render pass instance, applying the configured clears.
    fn cmd_begin_render_pass(
        &self,
        cmd: CommandList,
        render_pass: RenderPassHandle,
        framebuffer: FramebufferHandle,
        clears: &[ClearValue],
    );

    /// Advance to the next subpass.
    fn cmd_next_subpass(&self, cmd: CommandList);

    /// End the current render pass instance.
    fn cmd_end_render_pass(&self, cmd: CommandList);

    /// Signal an event once the given stages have completed.
    fn cmd_signal_event(&self, cmd: CommandList, event: EventHandle, stages: PipelineStages);

    /// Wait for events and apply the given barriers as part of the wait.
    #[allow(clippy::too_many_arguments)]
    fn cmd_wait_events(
        &self,
        cmd: CommandList,
        events: &[EventHandle],
        src_stages: PipelineStages,
        dst_stages: PipelineStages,
        image_barriers: &[ImageBarrier],
        memory_barriers: &[MemoryBarrier],
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_error_display() {
        let err = DeviceError::OutOfMemory;
        assert_eq!(err.to_string(), "out of GPU memory");

        let err = DeviceError::InitializationFailed("no adapter".to_string());
        assert_eq!(err.to_string(), "device initialization failed: no adapter");
    }

    #[test]
    fn test_handle_roundtrip() {
        let handle = ImageHandle::from_raw(42);
        assert_eq!(handle.raw(), 42);
    }

    #[test]
    fn test_aspect_from_format() {
        assert_eq!(
            ImageAspect::from_format(TextureFormat::Rgba8Unorm),
            ImageAspect::Color
        );
        assert_eq!(
            ImageAspect::from_format(TextureFormat::Depth32Float),
            ImageAspect::Depth
        );
        assert_eq!(
            ImageAspect::from_format(TextureFormat::Depth24PlusStencil8),
            ImageAspect::DepthStencil
        );
    }

    #[test]
    fn test_dependency_merge() {
        let mut dep = SubpassDependency {
            src_subpass: 0,
            dst_subpass: 1,
            src_stages: PipelineStages::COLOR_ATTACHMENT_OUTPUT,
            dst_stages: PipelineStages::FRAGMENT_SHADER,
            src_access: Access::COLOR_ATTACHMENT_WRITE,
            dst_access: Access::SHADER_READ,
            by_region: true,
        };
        let other = SubpassDependency {
            src_stages: PipelineStages::LATE_FRAGMENT_TESTS,
            src_access: Access::DEPTH_STENCIL_ATTACHMENT_WRITE,
            ..dep
        };
        dep.merge_masks(&other);

        assert!(dep.src_stages.contains(PipelineStages::COLOR_ATTACHMENT_OUTPUT));
        assert!(dep.src_stages.contains(PipelineStages::LATE_FRAGMENT_TESTS));
        assert!(dep.src_access.contains(Access::DEPTH_STENCIL_ATTACHMENT_WRITE));
    }
}

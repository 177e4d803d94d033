//! Synchronization vocabulary: pipeline stages, access masks, image layouts
//! and attachment load/store policies.
//!
//! These mirror the explicit API's synchronization scopes but stay
//! backend-neutral so the graph can be built and inspected without a GPU.

use bitflags::bitflags;

use super::ClearValue;

bitflags! {
    /// Pipeline stage mask.
    ///
    /// Bit positions follow the explicit API's stage flags so backend
    /// conversion is a direct mapping.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PipelineStages: u32 {
        /// Before any work.
        const TOP_OF_PIPE = 1 << 0;
        /// Indirect parameter reads.
        const DRAW_INDIRECT = 1 << 1;
        /// Vertex/index buffer reads.
        const VERTEX_INPUT = 1 << 2;
        /// Vertex shader execution.
        const VERTEX_SHADER = 1 << 3;
        /// Fragment shader execution.
        const FRAGMENT_SHADER = 1 << 7;
        /// Early depth/stencil tests.
        const EARLY_FRAGMENT_TESTS = 1 << 8;
        /// Late depth/stencil tests and depth writes.
        const LATE_FRAGMENT_TESTS = 1 << 9;
        /// Color attachment writes.
        const COLOR_ATTACHMENT_OUTPUT = 1 << 10;
        /// Compute shader execution.
        const COMPUTE_SHADER = 1 << 11;
        /// Copy operations.
        const TRANSFER = 1 << 12;
        /// After all work.
        const BOTTOM_OF_PIPE = 1 << 13;
    }
}

bitflags! {
    /// Memory access mask.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Access: u32 {
        /// Indirect parameter read.
        const INDIRECT_COMMAND_READ = 1 << 0;
        /// Index buffer read.
        const INDEX_READ = 1 << 1;
        /// Vertex attribute read.
        const VERTEX_ATTRIBUTE_READ = 1 << 2;
        /// Uniform buffer read.
        const UNIFORM_READ = 1 << 3;
        /// Input attachment read.
        const INPUT_ATTACHMENT_READ = 1 << 4;
        /// Any shader read (sampled images, storage).
        const SHADER_READ = 1 << 5;
        /// Any shader write (storage).
        const SHADER_WRITE = 1 << 6;
        /// Color attachment read (blending).
        const COLOR_ATTACHMENT_READ = 1 << 7;
        /// Color attachment write.
        const COLOR_ATTACHMENT_WRITE = 1 << 8;
        /// Depth/stencil attachment read.
        const DEPTH_STENCIL_ATTACHMENT_READ = 1 << 9;
        /// Depth/stencil attachment write.
        const DEPTH_STENCIL_ATTACHMENT_WRITE = 1 << 10;
        /// Transfer read.
        const TRANSFER_READ = 1 << 11;
        /// Transfer write.
        const TRANSFER_WRITE = 1 << 12;
    }
}

/// Image layout states an image can be in.
///
/// These correspond to the explicit API's image layouts but are abstracted
/// so the graph can track and transition state without touching a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ImageLayout {
    /// Initial state, contents undefined. Can transition to any layout.
    #[default]
    Undefined,
    /// Optimal for color attachment writes.
    ColorAttachment,
    /// Optimal for depth/stencil attachment writes.
    DepthStencilAttachment,
    /// Optimal for depth read-only (sampling + depth testing).
    DepthStencilReadOnly,
    /// Optimal for shader sampling.
    ShaderReadOnly,
    /// Optimal for transfer source operations.
    TransferSrc,
    /// Optimal for transfer destination operations.
    TransferDst,
    /// Optimal for presentation.
    PresentSrc,
    /// General layout (least optimal but most flexible).
    General,
}

impl ImageLayout {
    /// Access mask for work that produced this layout (as barrier source).
    pub fn src_access_mask(self) -> Access {
        match self {
            Self::Undefined => Access::empty(),
            Self::ColorAttachment => Access::COLOR_ATTACHMENT_WRITE,
            Self::DepthStencilAttachment => Access::DEPTH_STENCIL_ATTACHMENT_WRITE,
            Self::DepthStencilReadOnly => Access::DEPTH_STENCIL_ATTACHMENT_READ,
            Self::ShaderReadOnly => Access::SHADER_READ,
            Self::TransferSrc => Access::TRANSFER_READ,
            Self::TransferDst => Access::TRANSFER_WRITE,
            Self::PresentSrc => Access::empty(),
            Self::General => Access::SHADER_READ | Access::SHADER_WRITE,
        }
    }

    /// Access mask for work consuming this layout (as barrier destination).
    pub fn dst_access_mask(self) -> Access {
        match self {
            Self::Undefined => Access::empty(),
            Self::ColorAttachment => Access::COLOR_ATTACHMENT_WRITE,
            Self::DepthStencilAttachment => Access::DEPTH_STENCIL_ATTACHMENT_WRITE,
            Self::DepthStencilReadOnly => Access::DEPTH_STENCIL_ATTACHMENT_READ,
            Self::ShaderReadOnly => Access::SHADER_READ,
            Self::TransferSrc => Access::TRANSFER_READ,
            Self::TransferDst => Access::TRANSFER_WRITE,
            Self::PresentSrc => Access::empty(),
            Self::General => Access::SHADER_READ | Access::SHADER_WRITE,
        }
    }

    /// Pipeline stage producing this layout (as barrier source).
    pub fn src_stage(self) -> PipelineStages {
        match self {
            Self::Undefined => PipelineStages::TOP_OF_PIPE,
            Self::ColorAttachment => PipelineStages::COLOR_ATTACHMENT_OUTPUT,
            Self::DepthStencilAttachment => PipelineStages::LATE_FRAGMENT_TESTS,
            Self::DepthStencilReadOnly => PipelineStages::EARLY_FRAGMENT_TESTS,
            Self::ShaderReadOnly => PipelineStages::FRAGMENT_SHADER,
            Self::TransferSrc | Self::TransferDst => PipelineStages::TRANSFER,
            Self::PresentSrc => PipelineStages::BOTTOM_OF_PIPE,
            Self::General => PipelineStages::COMPUTE_SHADER,
        }
    }

    /// Pipeline stage consuming this layout (as barrier destination).
    pub fn dst_stage(self) -> PipelineStages {
        match self {
            Self::Undefined => PipelineStages::TOP_OF_PIPE,
            Self::ColorAttachment => PipelineStages::COLOR_ATTACHMENT_OUTPUT,
            Self::DepthStencilAttachment | Self::DepthStencilReadOnly => {
                PipelineStages::EARLY_FRAGMENT_TESTS
            }
            Self::ShaderReadOnly => PipelineStages::FRAGMENT_SHADER,
            Self::TransferSrc | Self::TransferDst => PipelineStages::TRANSFER,
            Self::PresentSrc => PipelineStages::BOTTOM_OF_PIPE,
            Self::General => PipelineStages::COMPUTE_SHADER,
        }
    }

    /// Check if this is a depth/stencil layout.
    pub fn is_depth_stencil(self) -> bool {
        matches!(
            self,
            Self::DepthStencilAttachment | Self::DepthStencilReadOnly
        )
    }
}

/// Operation performed on an attachment at the start of a render pass.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum LoadOp {
    /// Clear the attachment with a specified value.
    Clear(ClearValue),
    /// Load the existing contents of the attachment.
    #[default]
    Load,
    /// Don't care about the existing contents (may be undefined).
    DontCare,
}

impl LoadOp {
    /// Create a clear operation with a color value.
    pub fn clear_color(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self::Clear(ClearValue::color(r, g, b, a))
    }

    /// Create a clear operation with a depth value.
    pub fn clear_depth(depth: f32) -> Self {
        Self::Clear(ClearValue::depth(depth))
    }

    /// Returns true for any `Clear` variant.
    pub fn is_clear(&self) -> bool {
        matches!(self, Self::Clear(_))
    }
}

/// Operation performed on an attachment at the end of a render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StoreOp {
    /// Store the attachment contents for later use.
    #[default]
    Store,
    /// Don't care about the contents after the pass (may be discarded).
    DontCare,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_masks_color() {
        let layout = ImageLayout::ColorAttachment;
        assert_eq!(layout.src_access_mask(), Access::COLOR_ATTACHMENT_WRITE);
        assert_eq!(layout.src_stage(), PipelineStages::COLOR_ATTACHMENT_OUTPUT);
        assert!(!layout.is_depth_stencil());
    }

    #[test]
    fn test_layout_masks_depth() {
        let layout = ImageLayout::DepthStencilAttachment;
        assert_eq!(
            layout.src_access_mask(),
            Access::DEPTH_STENCIL_ATTACHMENT_WRITE
        );
        assert_eq!(layout.src_stage(), PipelineStages::LATE_FRAGMENT_TESTS);
        assert_eq!(layout.dst_stage(), PipelineStages::EARLY_FRAGMENT_TESTS);
        assert!(layout.is_depth_stencil());
    }

    #[test]
    fn test_shader_read_layout() {
        let layout = ImageLayout::ShaderReadOnly;
        assert_eq!(layout.dst_access_mask(), Access::SHADER_READ);
        assert_eq!(layout.dst_stage(), PipelineStages::FRAGMENT_SHADER);
    }

    #[test]
    fn test_load_op_default() {
        assert_eq!(LoadOp::default(), LoadOp::Load);
        assert!(LoadOp::clear_depth(1.0).is_clear());
    }

    #[test]
    fn test_stage_mask_union() {
        let merged = PipelineStages::COLOR_ATTACHMENT_OUTPUT | PipelineStages::LATE_FRAGMENT_TESTS;
        assert!(merged.contains(PipelineStages::COLOR_ATTACHMENT_OUTPUT));
        assert!(merged.contains(PipelineStages::LATE_FRAGMENT_TESTS));
    }
}

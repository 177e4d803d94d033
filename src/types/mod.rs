//! Backend-neutral vocabulary shared by the graph and the device layer.

mod buffer;
mod common;
mod sync;
mod texture;

pub use buffer::{BufferDescriptor, BufferUsage};
pub use common::{ClearValue, Extent3d};
pub use sync::{Access, ImageLayout, LoadOp, PipelineStages, StoreOp};
pub use texture::{ImageDescriptor, TextureFormat, TextureUsage};

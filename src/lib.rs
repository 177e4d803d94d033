//! A declarative render graph for explicit graphics APIs.
//!
//! A frame is declared as task groups with named resource inputs and
//! outputs. From those declarations alone the graph derives everything the
//! explicit API wants spelled out:
//! - execution order of the groups (topological, cycle-checked)
//! - clear-versus-load decisions for every attachment
//! - render passes whose subpasses mirror the tasks of a group
//! - subpass dependencies for reads within a group
//! - image layout transitions and event waits for reads across groups
//!
//! After a one-time [`RenderGraph::prepare`] the schedule replays every
//! frame through [`RenderGraph::execute`].
//!
//! # Backends
//! - `dummy` (default feature): records commands into an inspectable log,
//!   no GPU required
//! - `vulkan-backend`: native Vulkan via ash

pub mod backend;
pub mod graph;
pub mod resource;
pub mod schedule;
pub mod types;

pub use backend::{Device, DeviceError};
pub use graph::{
    GraphError, GroupContext, GroupHandle, PostInitContext, RenderGraph, RenderTaskGroup, Task,
    TaskGroup,
};
pub use resource::{ResourceHandle, ResourceTable};
pub use types::{
    Access, BufferUsage, ClearValue, Extent3d, ImageLayout, PipelineStages, TextureFormat,
    TextureUsage,
};

#[cfg(feature = "dummy")]
pub use backend::dummy::DummyDevice;

#[cfg(feature = "vulkan-backend")]
pub use backend::vulkan::VulkanDevice;

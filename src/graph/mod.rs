//! The render graph.
//!
//! A [`RenderGraph`] owns the resource table and a set of task groups. After
//! all groups are added, [`RenderGraph::prepare`] orders them by their
//! declared IO, assigns first producers, and lets every group synthesize its
//! GPU state. [`RenderGraph::execute`] then records one frame in the
//! prepared order.

pub mod group;
pub mod render_group;
pub mod task;

pub use group::{GroupContext, PostInitContext, TaskGroup, TaskList};
pub use render_group::RenderTaskGroup;
pub use task::Task;

use std::collections::HashMap;
use std::fmt;

use bytemuck::Pod;

use crate::backend::{Device, DeviceError};
use crate::resource::{ResourceHandle, ResourceTable};
use crate::schedule::DependencyGraph;
use crate::types::{BufferDescriptor, ImageDescriptor};

// ============================================================================
// Handles and errors
// ============================================================================

/// Identifies a task group within a [`RenderGraph`]. The raw value is the
/// group's declaration index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupHandle(u32);

impl GroupHandle {
    /// Create a handle from a raw index.
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Get the raw index.
    pub fn raw(&self) -> u32 {
        self.0
    }
}

/// Errors produced while preparing a render graph.
#[derive(Debug)]
pub enum GraphError {
    /// The group IO declarations form a cycle, no execution order exists.
    CyclicDependency {
        /// Names of the groups that could not be ordered.
        groups: Vec<String>,
    },
    /// The device failed to create an object the graph needs.
    Device(DeviceError),
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphError::CyclicDependency { groups } => {
                write!(
                    f,
                    "cyclic dependency between task groups: {}",
                    groups.join(", ")
                )
            }
            GraphError::Device(error) => write!(f, "device error: {error}"),
        }
    }
}

impl std::error::Error for GraphError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GraphError::Device(error) => Some(error),
            _ => None,
        }
    }
}

impl From<DeviceError> for GraphError {
    fn from(error: DeviceError) -> Self {
        GraphError::Device(error)
    }
}

// ============================================================================
// Render graph
// ============================================================================

/// Declarative frame description: resources plus task groups, compiled into
/// an ordered, synchronized command stream.
#[derive(Default)]
pub struct RenderGraph {
    resources: ResourceTable,
    groups: Vec<Box<dyn TaskGroup>>,
    producers: HashMap<ResourceHandle, Vec<GroupHandle>>,
    /// Declaration indices in execution order, filled by `prepare`.
    sorted: Vec<usize>,
    prepared: bool,
}

impl RenderGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an image resource.
    pub fn add_image(&mut self, descriptor: ImageDescriptor) -> ResourceHandle {
        self.resources.add_image(descriptor)
    }

    /// Register a buffer resource.
    pub fn add_buffer(&mut self, descriptor: BufferDescriptor) -> ResourceHandle {
        self.resources.add_buffer(descriptor)
    }

    /// Register a plain value resource.
    pub fn add_value<T: Pod>(&mut self, name: &str, value: &T) -> ResourceHandle {
        self.resources.add_value(name, value)
    }

    /// Look up a resource by name.
    pub fn handle_by_name(&self, name: &str) -> Option<ResourceHandle> {
        self.resources.handle_by_name(name)
    }

    /// Overwrite a value resource, typically once per frame.
    pub fn write_value<T: Pod>(&mut self, handle: ResourceHandle, value: &T) {
        self.resources.write_value(handle, value);
    }

    /// Read a value resource back.
    pub fn read_value<T: Pod>(&self, handle: ResourceHandle) -> T {
        self.resources.read_value(handle)
    }

    /// The resource table.
    pub fn resources(&self) -> &ResourceTable {
        &self.resources
    }

    /// The resource table, mutably.
    pub fn resources_mut(&mut self) -> &mut ResourceTable {
        &mut self.resources
    }

    /// Add a task group. Groups can be added in any order, dependencies are
    /// derived from their task IO during [`RenderGraph::prepare`].
    pub fn add_task_group(&mut self, group: impl TaskGroup + 'static) -> GroupHandle {
        assert!(
            !self.prepared,
            "cannot add group '{}' to an already prepared graph",
            group.name()
        );
        let handle = GroupHandle(self.groups.len() as u32);
        let mut group = Box::new(group);
        group.assign_handle(handle);
        self.groups.push(group);
        handle
    }

    /// Access a group by handle.
    pub fn group(&self, handle: GroupHandle) -> &dyn TaskGroup {
        self.groups[handle.0 as usize].as_ref()
    }

    /// Number of task groups.
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Whether [`RenderGraph::prepare`] already ran.
    pub fn is_prepared(&self) -> bool {
        self.prepared
    }

    /// Compile the graph: realize resources, initialize all groups, derive
    /// the execution order from the declared IO, assign first producers and
    /// let every group synthesize its render pass, barriers and setup state.
    ///
    /// Fails with [`GraphError::CyclicDependency`] when the group IO forms a
    /// cycle. Preparing an already prepared graph is a warned no-op.
    pub fn prepare(&mut self, device: &dyn Device) -> Result<(), GraphError> {
        if self.prepared {
            log::warn!("render graph is already prepared, ignoring prepare()");
            return Ok(());
        }

        self.resources.realize(device)?;

        for group in &mut self.groups {
            group.init(device, &mut self.resources)?;
        }

        self.producers.clear();
        for group in &self.groups {
            for &output in group.outputs() {
                self.producers
                    .entry(output)
                    .or_default()
                    .push(group.handle());
            }
        }

        let mut schedule = DependencyGraph::new();
        for index in 0..self.groups.len() {
            schedule.add_node(index);
        }
        for (index, group) in self.groups.iter().enumerate() {
            for &input in group.inputs() {
                if let Some(producers) = self.producers.get(&input) {
                    for &producer in producers {
                        let producer_index = producer.raw() as usize;
                        if producer_index != index {
                            schedule.add_edge(producer_index, index);
                        }
                    }
                }
            }
        }

        let order = schedule
            .topological_order()
            .map_err(|error| GraphError::CyclicDependency {
                groups: error
                    .involved
                    .iter()
                    .map(|&index| self.groups[index].name().to_string())
                    .collect(),
            })?;
        log::debug!(
            "render graph order: {:?}",
            order
                .iter()
                .map(|&index| self.groups[index].name())
                .collect::<Vec<_>>()
        );

        for &index in &order {
            let handle = self.groups[index].handle();
            for &output in self.groups[index].outputs() {
                self.resources.get_mut(output).assign_first_producer(handle);
            }
        }

        for &index in &order {
            let (left, rest) = self.groups.split_at_mut(index);
            // index addresses into these exact groups, rest is never empty
            let (current, right) = rest.split_first_mut().unwrap();
            let mut context = PostInitContext::new(
                device,
                &mut self.resources,
                &self.producers,
                left,
                right,
                index,
            );
            current.post_init(&mut context)?;
        }

        self.sorted = order;
        self.prepared = true;
        log::info!(
            "render graph prepared: {} groups, {} resources",
            self.groups.len(),
            self.resources.len()
        );
        Ok(())
    }

    /// Record and submit one frame: every group in the prepared order, in a
    /// single command list. Panics when the graph was not prepared.
    pub fn execute(&mut self, device: &dyn Device) {
        assert!(
            self.prepared,
            "render graph executed before prepare() was called"
        );
        let cmd = device.begin_commands();
        for &index in &self.sorted {
            self.groups[index].execute(device, cmd);
        }
        device.submit_commands(cmd);
    }

    /// Human-readable summary of the graph, in execution order when
    /// prepared.
    pub fn dump(&self) -> String {
        use std::fmt::Write;

        let mut out = String::new();
        let _ = writeln!(
            out,
            "render graph: {} groups, {} resources, {}",
            self.groups.len(),
            self.resources.len(),
            if self.prepared {
                "prepared"
            } else {
                "not prepared"
            }
        );
        let order: Vec<usize> = if self.prepared {
            self.sorted.clone()
        } else {
            (0..self.groups.len()).collect()
        };
        for index in order {
            let group = &self.groups[index];
            let inputs: Vec<&str> = group
                .inputs()
                .iter()
                .map(|&handle| self.resources.get(handle).name())
                .collect();
            let outputs: Vec<&str> = group
                .outputs()
                .iter()
                .map(|&handle| self.resources.get(handle).name())
                .collect();
            let _ = writeln!(
                out,
                "  [{}] {}: inputs={:?} outputs={:?}",
                index,
                group.name(),
                inputs,
                outputs
            );
        }
        out
    }
}

impl fmt::Debug for RenderGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderGraph")
            .field("groups", &self.groups.len())
            .field("resources", &self.resources.len())
            .field("prepared", &self.prepared)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::dummy::{DummyCommand, DummyDevice};
    use crate::types::{TextureFormat, TextureUsage};

    fn image(graph: &mut RenderGraph, name: &str, format: TextureFormat) -> ResourceHandle {
        graph.add_image(
            ImageDescriptor::new_2d(
                64,
                64,
                format,
                TextureUsage::RENDER_ATTACHMENT | TextureUsage::SAMPLED,
            )
            .with_label(name),
        )
    }

    fn single_task_group(name: &str, inputs: &[ResourceHandle], output: ResourceHandle) -> RenderTaskGroup {
        let mut task = Task::new(name).with_output(output);
        for &input in inputs {
            task = task.with_input(input);
        }
        RenderTaskGroup::new(name).with_task(task)
    }

    #[test]
    fn test_prepare_orders_groups_by_io() {
        let device = DummyDevice::new();
        let mut graph = RenderGraph::new();
        let shadow = image(&mut graph, "shadow", TextureFormat::Depth32Float);
        let lit = image(&mut graph, "lit", TextureFormat::Rgba16Float);

        // Declared consumer first, producer second.
        let lighting = graph.add_task_group(single_task_group("lighting", &[shadow], lit));
        let shadows = graph.add_task_group(single_task_group("shadow", &[], shadow));
        graph.prepare(&device).unwrap();
        graph.execute(&device);

        let shadow_done = graph.group(shadows).done_signal().unwrap();
        let lighting_done = graph.group(lighting).done_signal().unwrap();
        let signals: Vec<_> = device
            .commands()
            .into_iter()
            .filter_map(|command| match command {
                DummyCommand::SignalEvent { event, .. } => Some(event),
                _ => None,
            })
            .collect();
        assert_eq!(signals, vec![shadow_done, lighting_done]);
    }

    #[test]
    fn test_cycle_is_rejected() {
        let device = DummyDevice::new();
        let mut graph = RenderGraph::new();
        let ping = image(&mut graph, "ping", TextureFormat::Rgba8Unorm);
        let pong = image(&mut graph, "pong", TextureFormat::Rgba8Unorm);

        graph.add_task_group(single_task_group("forward", &[pong], ping));
        graph.add_task_group(single_task_group("backward", &[ping], pong));

        match graph.prepare(&device) {
            Err(GraphError::CyclicDependency { groups }) => {
                assert!(groups.contains(&"forward".to_string()));
                assert!(groups.contains(&"backward".to_string()));
            }
            other => panic!("expected cycle error, got {other:?}"),
        }
        assert!(!graph.is_prepared());
    }

    #[test]
    fn test_prepare_twice_is_a_noop() {
        let device = DummyDevice::new();
        let mut graph = RenderGraph::new();
        let color = image(&mut graph, "color", TextureFormat::Rgba8Unorm);
        graph.add_task_group(single_task_group("main", &[], color));

        graph.prepare(&device).unwrap();
        graph.prepare(&device).unwrap();
        graph.execute(&device);

        let begins = device
            .commands()
            .iter()
            .filter(|command| matches!(command, DummyCommand::BeginRenderPass { .. }))
            .count();
        assert_eq!(begins, 1);
    }

    #[test]
    #[should_panic(expected = "before prepare()")]
    fn test_execute_before_prepare_panics() {
        let device = DummyDevice::new();
        let mut graph = RenderGraph::new();
        let color = image(&mut graph, "color", TextureFormat::Rgba8Unorm);
        graph.add_task_group(single_task_group("main", &[], color));
        graph.execute(&device);
    }

    #[test]
    #[should_panic(expected = "already prepared")]
    fn test_add_group_after_prepare_panics() {
        let device = DummyDevice::new();
        let mut graph = RenderGraph::new();
        let color = image(&mut graph, "color", TextureFormat::Rgba8Unorm);
        graph.add_task_group(single_task_group("main", &[], color));
        graph.prepare(&device).unwrap();

        let late = image(&mut graph, "late", TextureFormat::Rgba8Unorm);
        graph.add_task_group(single_task_group("late", &[], late));
    }

    #[test]
    fn test_value_resources_roundtrip_through_graph() {
        let mut graph = RenderGraph::new();
        let time = graph.add_value("time", &0.0f32);
        graph.write_value(time, &0.016f32);
        assert_eq!(graph.read_value::<f32>(time), 0.016f32);
        assert_eq!(graph.handle_by_name("time"), Some(time));
    }

    #[test]
    fn test_dump_lists_groups_in_execution_order() {
        let device = DummyDevice::new();
        let mut graph = RenderGraph::new();
        let shadow = image(&mut graph, "shadow", TextureFormat::Depth32Float);
        let lit = image(&mut graph, "lit", TextureFormat::Rgba16Float);
        graph.add_task_group(single_task_group("lighting", &[shadow], lit));
        graph.add_task_group(single_task_group("shadow", &[], shadow));
        graph.prepare(&device).unwrap();

        let dump = graph.dump();
        let shadow_at = dump.find("] shadow:").unwrap();
        let lighting_at = dump.find("] lighting:").unwrap();
        assert!(shadow_at < lighting_at, "dump:\n{dump}");
    }
}

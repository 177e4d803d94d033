//! Task groups and the contexts they are prepared in.

use std::collections::{BTreeSet, HashMap};

use crate::backend::{CommandList, Device, DeviceError, EventHandle, RenderPassHandle};
use crate::resource::{ResourceHandle, ResourceTable};
use crate::types::Extent3d;

use super::task::Task;
use super::GroupHandle;

// ============================================================================
// Group trait
// ============================================================================

/// A node of the render graph, owning an ordered list of tasks.
///
/// Groups declare their combined inputs and outputs, get topologically
/// ordered by the graph, and synthesize whatever GPU state they need while
/// being prepared. [`RenderTaskGroup`](super::render_group::RenderTaskGroup)
/// is the render pass realization; other group kinds can implement this
/// trait as long as they keep the same contract.
pub trait TaskGroup {
    /// Group name, used in logs and error reports.
    fn name(&self) -> &str;

    /// Handle assigned when the group was added to a graph.
    fn handle(&self) -> GroupHandle;

    /// Called by the graph when the group is added. A group belongs to at
    /// most one graph.
    fn assign_handle(&mut self, handle: GroupHandle);

    /// First preparation step. Derives the group IO sets from its tasks and
    /// creates the done event other groups can wait on.
    fn init(&mut self, device: &dyn Device, resources: &mut ResourceTable)
        -> Result<(), DeviceError>;

    /// Resources read by any task of this group.
    fn inputs(&self) -> &BTreeSet<ResourceHandle>;

    /// Resources written by any task of this group.
    fn outputs(&self) -> &BTreeSet<ResourceHandle>;

    /// Second preparation step, run in sorted order after every group was
    /// initialized. Synthesizes internal dependencies, GPU objects and
    /// cross-group barriers, then runs the tasks' setup callbacks.
    fn post_init(&mut self, context: &mut PostInitContext<'_>) -> Result<(), DeviceError>;

    /// Record this group's work for one frame.
    fn execute(&mut self, device: &dyn Device, cmd: CommandList);

    /// Event signaled when this group's recorded work finishes on the GPU.
    /// `None` until [`TaskGroup::init`] ran.
    fn done_signal(&self) -> Option<EventHandle>;

    /// Make `task` wait for this group without any memory effect. Used for
    /// plain value dependencies and explicit ordering.
    fn precede_task(&self, task: &mut Task);

    /// Make `task` wait for this group and insert barriers for every
    /// resource the task reads and this group writes. Images transition to
    /// shader-read-only, buffers get a memory barrier. Called by downstream
    /// groups while they are prepared.
    fn add_external_dependency_to_task(&self, task: &mut Task, resources: &mut ResourceTable);
}

// ============================================================================
// Shared group state
// ============================================================================

/// State every group implementation carries: the ordered tasks, derived IO
/// sets and the done event.
#[derive(Debug, Default)]
pub struct TaskList {
    name: String,
    handle: Option<GroupHandle>,
    tasks: Vec<Task>,
    inputs: BTreeSet<ResourceHandle>,
    outputs: BTreeSet<ResourceHandle>,
    done: Option<EventHandle>,
}

impl TaskList {
    /// Create an empty list with the given group name.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Group name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Assigned group handle. Panics until the group was added to a graph.
    pub fn handle(&self) -> GroupHandle {
        self.handle
            .unwrap_or_else(|| panic!("group '{}' was not added to a graph", self.name))
    }

    /// Record the handle the graph assigned. A group belongs to at most one
    /// graph, a second assignment panics.
    pub fn assign_handle(&mut self, handle: GroupHandle) {
        assert!(
            self.handle.is_none(),
            "group '{}' was already added to a graph",
            self.name
        );
        self.handle = Some(handle);
        for (index, task) in self.tasks.iter_mut().enumerate() {
            task.assign_group(handle, index);
        }
    }

    /// Append a task. Its index within the group doubles as its subpass
    /// index later on.
    pub fn add_task(&mut self, task: Task) {
        let index = self.tasks.len();
        let mut task = task;
        if let Some(handle) = self.handle {
            task.assign_group(handle, index);
        }
        self.tasks.push(task);
    }

    /// Tasks in execution order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Tasks in execution order, mutably.
    pub fn tasks_mut(&mut self) -> &mut [Task] {
        &mut self.tasks
    }

    /// Number of tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether no tasks were added yet.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Resources read by any task.
    pub fn inputs(&self) -> &BTreeSet<ResourceHandle> {
        &self.inputs
    }

    /// Resources written by any task.
    pub fn outputs(&self) -> &BTreeSet<ResourceHandle> {
        &self.outputs
    }

    /// Done event, once created by [`TaskList::init`].
    pub fn done(&self) -> Option<EventHandle> {
        self.done
    }

    /// Derive the IO sets from the tasks and create the done event.
    pub fn init(&mut self, device: &dyn Device) -> Result<(), DeviceError> {
        assert!(!self.tasks.is_empty(), "group '{}' has no tasks", self.name);
        self.inputs.clear();
        self.outputs.clear();
        for task in &self.tasks {
            self.inputs.extend(task.inputs().iter().copied());
            self.outputs.extend(task.outputs().iter().copied());
        }
        if self.done.is_none() {
            self.done = Some(device.create_event()?);
        }
        Ok(())
    }
}

// ============================================================================
// Contexts
// ============================================================================

/// Everything a task's setup callback may need: the device, the prepared
/// resources and the render pass the task will record into.
pub struct GroupContext<'a> {
    pub device: &'a dyn Device,
    pub resources: &'a ResourceTable,
    /// Render pass of the owning group, `None` for group kinds that do not
    /// render.
    pub render_pass: Option<RenderPassHandle>,
    /// Framebuffer extent of the owning group.
    pub extent: Extent3d,
}

#[cfg(test)]
impl GroupContext<'static> {
    pub(crate) fn for_tests() -> Self {
        use std::sync::OnceLock;
        static DEVICE: OnceLock<crate::backend::dummy::DummyDevice> = OnceLock::new();
        static RESOURCES: OnceLock<ResourceTable> = OnceLock::new();
        Self {
            device: DEVICE.get_or_init(Default::default),
            resources: RESOURCES.get_or_init(Default::default),
            render_pass: None,
            extent: Extent3d::new_2d(1, 1),
        }
    }
}

/// View of the graph handed to a group while it runs
/// [`TaskGroup::post_init`].
///
/// Splits the group list around the group being prepared so the group can
/// delegate to any other group without aliasing itself.
pub struct PostInitContext<'a> {
    pub device: &'a dyn Device,
    pub resources: &'a mut ResourceTable,
    producers: &'a HashMap<ResourceHandle, Vec<GroupHandle>>,
    left: &'a mut [Box<dyn TaskGroup>],
    right: &'a mut [Box<dyn TaskGroup>],
    /// Declaration index of the group being prepared.
    position: usize,
}

impl<'a> PostInitContext<'a> {
    pub(crate) fn new(
        device: &'a dyn Device,
        resources: &'a mut ResourceTable,
        producers: &'a HashMap<ResourceHandle, Vec<GroupHandle>>,
        left: &'a mut [Box<dyn TaskGroup>],
        right: &'a mut [Box<dyn TaskGroup>],
        position: usize,
    ) -> Self {
        Self {
            device,
            resources,
            producers,
            left,
            right,
            position,
        }
    }

    /// Groups producing `resource`, in declaration order. Empty for
    /// resources only written by the CPU.
    pub fn producers_of(&self, resource: ResourceHandle) -> &[GroupHandle] {
        self.producers
            .get(&resource)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Let `producer` attach its external dependency to `task`: a wait on
    /// the producer's done event plus barriers for every shared resource.
    pub fn delegate_external_dependency(&mut self, producer: GroupHandle, task: &mut Task) {
        let index = producer.raw() as usize;
        let group: &dyn TaskGroup = if index < self.position {
            self.left[index].as_ref()
        } else if index > self.position {
            self.right[index - self.position - 1].as_ref()
        } else {
            panic!("group cannot declare an external dependency on itself");
        };
        group.add_external_dependency_to_task(task, self.resources);
    }
}

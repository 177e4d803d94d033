//! A single unit of recorded GPU work.

use std::collections::BTreeMap;

use crate::backend::{CommandList, Device, EventHandle, ImageBarrier, MemoryBarrier};
use crate::resource::ResourceHandle;
use crate::types::PipelineStages;

use super::group::GroupContext;
use super::GroupHandle;

/// Setup callback invoked once while the owning group is prepared.
pub type SetupFn = Box<dyn FnOnce(&GroupContext<'_>, u32)>;

/// Recording callback invoked every frame.
pub type ExecuteFn = Box<dyn FnMut()>;

/// A task records draw commands inside one subpass of its owning group.
///
/// Tasks declare the resources they read and write up front. The graph uses
/// those declarations to synthesize subpass dependencies between tasks of the
/// same group and event waits plus barriers against other groups. The task
/// index within its group doubles as its subpass index.
pub struct Task {
    name: String,
    inputs: Vec<ResourceHandle>,
    outputs: Vec<ResourceHandle>,
    execute: ExecuteFn,
    setup: Option<SetupFn>,
    group: Option<GroupHandle>,
    index: usize,
    /// Cross-group barriers keyed by resource, merged until flattened.
    pending_barriers: BTreeMap<ResourceHandle, ImageBarrier>,
    memory_barrier: Option<MemoryBarrier>,
    waits: Vec<EventHandle>,
    image_barriers: Vec<ImageBarrier>,
}

impl Task {
    /// Create a task with the given name. Inputs, outputs and callbacks are
    /// attached with the `with_*` builders.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            execute: Box::new(|| {}),
            setup: None,
            group: None,
            index: 0,
            pending_barriers: BTreeMap::new(),
            memory_barrier: None,
            waits: Vec::new(),
            image_barriers: Vec::new(),
        }
    }

    /// Declare a resource this task reads.
    pub fn with_input(mut self, resource: ResourceHandle) -> Self {
        self.inputs.push(resource);
        self
    }

    /// Declare a resource this task writes.
    pub fn with_output(mut self, resource: ResourceHandle) -> Self {
        self.outputs.push(resource);
        self
    }

    /// Attach the per-frame recording callback.
    pub fn with_execute(mut self, execute: impl FnMut() + 'static) -> Self {
        self.execute = Box::new(execute);
        self
    }

    /// Attach the one-time setup callback. It runs during preparation, after
    /// the owning group constructed its render pass, and receives the group
    /// context and this task's subpass index.
    pub fn with_setup(mut self, setup: impl FnOnce(&GroupContext<'_>, u32) + 'static) -> Self {
        self.setup = Some(Box::new(setup));
        self
    }

    /// Task name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resources this task reads, in declaration order.
    pub fn inputs(&self) -> &[ResourceHandle] {
        &self.inputs
    }

    /// Resources this task writes, in declaration order.
    pub fn outputs(&self) -> &[ResourceHandle] {
        &self.outputs
    }

    /// The group this task belongs to, once added to one.
    pub fn group(&self) -> Option<GroupHandle> {
        self.group
    }

    /// Subpass index within the owning group.
    pub fn index(&self) -> usize {
        self.index
    }

    pub(crate) fn assign_group(&mut self, group: GroupHandle, index: usize) {
        assert!(
            self.group.is_none(),
            "task '{}' already belongs to a group",
            self.name
        );
        self.group = Some(group);
        self.index = index;
    }

    /// Record a cross-group image dependency. A second dependency on the same
    /// resource is merged into the existing barrier by OR-ing its masks.
    pub fn add_external_dependency(&mut self, resource: ResourceHandle, barrier: ImageBarrier) {
        match self.pending_barriers.get_mut(&resource) {
            Some(existing) => existing.merge_masks(&barrier),
            None => {
                self.pending_barriers.insert(resource, barrier);
            }
        }
    }

    /// Record a cross-group buffer or memory dependency. All memory
    /// dependencies collapse into one barrier with OR-ed masks.
    pub fn add_memory_dependency(&mut self, barrier: MemoryBarrier) {
        match &mut self.memory_barrier {
            Some(existing) => existing.merge_masks(&barrier),
            None => self.memory_barrier = Some(barrier),
        }
    }

    /// Record an event this task must wait on. Duplicates are ignored.
    pub fn add_wait(&mut self, event: EventHandle) {
        if !self.waits.contains(&event) {
            self.waits.push(event);
        }
    }

    /// Events this task waits on.
    pub fn waits(&self) -> &[EventHandle] {
        &self.waits
    }

    /// Flattened image barriers, available after [`Task::setup`] ran.
    pub fn image_barriers(&self) -> &[ImageBarrier] {
        &self.image_barriers
    }

    /// Flatten the accumulated dependency map into the barrier list and run
    /// the setup callback, if any.
    pub(crate) fn setup(&mut self, context: &GroupContext<'_>, subpass_index: u32) {
        self.image_barriers = std::mem::take(&mut self.pending_barriers)
            .into_values()
            .collect();
        if let Some(setup) = self.setup.take() {
            setup(context, subpass_index);
        }
    }

    /// Wait for external dependencies, then record this task's commands.
    ///
    /// All waits are issued as a single `cmd_wait_events` whose stage masks
    /// are the union over the flattened barriers. Producing groups signal
    /// their done event at the bottom of the pipe, so that stage is always
    /// part of the source mask.
    pub(crate) fn execute(&mut self, device: &dyn Device, cmd: CommandList) {
        if !self.waits.is_empty() {
            let mut src_stages = PipelineStages::BOTTOM_OF_PIPE;
            let mut dst_stages = PipelineStages::empty();
            for barrier in &self.image_barriers {
                src_stages |= barrier.src_stages;
                dst_stages |= barrier.dst_stages;
            }
            if let Some(memory) = &self.memory_barrier {
                src_stages |= memory.src_stages;
                dst_stages |= memory.dst_stages;
            }
            if dst_stages.is_empty() {
                dst_stages = PipelineStages::TOP_OF_PIPE;
            }
            let memory_barriers = match &self.memory_barrier {
                Some(barrier) => std::slice::from_ref(barrier),
                None => &[],
            };
            device.cmd_wait_events(
                cmd,
                &self.waits,
                src_stages,
                dst_stages,
                &self.image_barriers,
                memory_barriers,
            );
        }
        (self.execute)();
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .field("group", &self.group)
            .field("index", &self.index)
            .field("waits", &self.waits)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::dummy::{DummyCommand, DummyDevice};
    use crate::backend::{ImageAspect, ImageHandle};
    use crate::types::{Access, ImageLayout};
    use std::cell::Cell;
    use std::rc::Rc;

    fn shader_read_barrier(image: u64) -> ImageBarrier {
        ImageBarrier {
            image: ImageHandle::from_raw(image),
            old_layout: ImageLayout::ColorAttachment,
            new_layout: ImageLayout::ShaderReadOnly,
            src_stages: PipelineStages::COLOR_ATTACHMENT_OUTPUT,
            dst_stages: PipelineStages::FRAGMENT_SHADER,
            src_access: Access::COLOR_ATTACHMENT_WRITE,
            dst_access: Access::SHADER_READ,
            aspect: ImageAspect::Color,
        }
    }

    #[test]
    fn test_io_declaration_order() {
        let a = ResourceHandle::from_raw(0);
        let b = ResourceHandle::from_raw(1);
        let c = ResourceHandle::from_raw(2);
        let task = Task::new("gbuffer")
            .with_input(c)
            .with_input(a)
            .with_output(b);

        assert_eq!(task.inputs(), &[c, a]);
        assert_eq!(task.outputs(), &[b]);
    }

    #[test]
    fn test_external_dependency_merges_masks() {
        let resource = ResourceHandle::from_raw(0);
        let mut task = Task::new("lighting");

        task.add_external_dependency(resource, shader_read_barrier(1));
        let mut second = shader_read_barrier(1);
        second.src_stages = PipelineStages::LATE_FRAGMENT_TESTS;
        second.dst_stages = PipelineStages::VERTEX_SHADER;
        task.add_external_dependency(resource, second);

        let context = GroupContext::for_tests();
        task.setup(&context, 0);

        let barriers = task.image_barriers();
        assert_eq!(barriers.len(), 1);
        assert!(barriers[0]
            .src_stages
            .contains(PipelineStages::COLOR_ATTACHMENT_OUTPUT | PipelineStages::LATE_FRAGMENT_TESTS));
        assert!(barriers[0]
            .dst_stages
            .contains(PipelineStages::FRAGMENT_SHADER | PipelineStages::VERTEX_SHADER));
    }

    #[test]
    fn test_wait_deduplication() {
        let mut task = Task::new("lighting");
        let event = EventHandle::from_raw(3);
        task.add_wait(event);
        task.add_wait(event);
        task.add_wait(EventHandle::from_raw(4));

        assert_eq!(task.waits().len(), 2);
    }

    #[test]
    #[should_panic(expected = "already belongs to a group")]
    fn test_double_group_assignment_panics() {
        let mut task = Task::new("gbuffer");
        task.assign_group(GroupHandle::from_raw(0), 0);
        task.assign_group(GroupHandle::from_raw(1), 0);
    }

    #[test]
    fn test_setup_runs_callback_with_subpass_index() {
        let seen = Rc::new(Cell::new(None));
        let seen_in_callback = seen.clone();
        let mut task = Task::new("post").with_setup(move |_, subpass| {
            seen_in_callback.set(Some(subpass));
        });

        let context = GroupContext::for_tests();
        task.setup(&context, 2);
        assert_eq!(seen.get(), Some(2));
    }

    #[test]
    fn test_execute_waits_then_records() {
        let device = DummyDevice::new();
        let cmd = device.begin_commands();

        let ran = Rc::new(Cell::new(false));
        let ran_in_callback = ran.clone();
        let mut task = Task::new("lighting").with_execute(move || {
            ran_in_callback.set(true);
        });
        task.add_wait(device.create_event().unwrap());
        task.add_external_dependency(ResourceHandle::from_raw(0), shader_read_barrier(1));

        let context = GroupContext::for_tests();
        task.setup(&context, 0);
        task.execute(&device, cmd);

        assert!(ran.get());
        let commands = device.commands();
        assert_eq!(commands.len(), 1);
        match &commands[0] {
            DummyCommand::WaitEvents {
                events,
                src_stages,
                dst_stages,
                image_barriers,
                ..
            } => {
                assert_eq!(events.len(), 1);
                assert!(src_stages.contains(PipelineStages::BOTTOM_OF_PIPE));
                assert!(src_stages.contains(PipelineStages::COLOR_ATTACHMENT_OUTPUT));
                assert_eq!(*dst_stages, PipelineStages::FRAGMENT_SHADER);
                assert_eq!(image_barriers.len(), 1);
            }
            other => panic!("expected WaitEvents, got {other:?}"),
        }
    }

    #[test]
    fn test_execute_without_waits_skips_wait_command() {
        let device = DummyDevice::new();
        let cmd = device.begin_commands();

        let mut task = Task::new("gbuffer");
        let context = GroupContext::for_tests();
        task.setup(&context, 0);
        task.execute(&device, cmd);

        assert!(device.commands().is_empty());
    }
}

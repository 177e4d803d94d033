//! Render pass realization of a task group.
//!
//! Every task of a [`RenderTaskGroup`] becomes one subpass of a single
//! render pass. Dependencies between tasks of the same group turn into
//! subpass dependencies, reads from other groups turn into event waits with
//! image barriers. All of that is synthesized from the declared task IO
//! while the graph is prepared, nothing is specified by hand.

use std::collections::{BTreeSet, HashMap};

use crate::backend::{
    AttachmentDescription, AttachmentReference, CommandList, Device, DeviceError, EventHandle,
    FramebufferDescriptor, FramebufferHandle, MemoryBarrier, RenderPassDescriptor,
    RenderPassHandle, SubpassDependency, SubpassDescription,
};
use crate::resource::{ResourceHandle, ResourceKind, ResourceTable};
use crate::types::{
    Access, ClearValue, Extent3d, ImageLayout, LoadOp, PipelineStages, StoreOp,
};

use super::group::{GroupContext, PostInitContext, TaskGroup, TaskList};
use super::task::Task;
use super::GroupHandle;

/// A task group that records its tasks as subpasses of one render pass.
pub struct RenderTaskGroup {
    list: TaskList,
    /// Image outputs in first-touch order; the index in this list is the
    /// attachment index in the render pass.
    attachments: Vec<ResourceHandle>,
    descriptions: Vec<AttachmentDescription>,
    subpasses: Vec<SubpassDescription>,
    dependencies: Vec<SubpassDependency>,
    clears: Vec<ClearValue>,
    render_pass: Option<RenderPassHandle>,
    framebuffer: Option<FramebufferHandle>,
    extent: Extent3d,
}

impl RenderTaskGroup {
    /// Create an empty render group with the given name.
    pub fn new(name: &str) -> Self {
        Self {
            list: TaskList::new(name),
            attachments: Vec::new(),
            descriptions: Vec::new(),
            subpasses: Vec::new(),
            dependencies: Vec::new(),
            clears: Vec::new(),
            render_pass: None,
            framebuffer: None,
            extent: Extent3d::new_2d(0, 0),
        }
    }

    /// Append a task. Task order is subpass order.
    pub fn add_task(&mut self, task: Task) {
        self.list.add_task(task);
    }

    /// Builder form of [`RenderTaskGroup::add_task`].
    pub fn with_task(mut self, task: Task) -> Self {
        self.add_task(task);
        self
    }

    /// Tasks in subpass order.
    pub fn tasks(&self) -> &[Task] {
        self.list.tasks()
    }

    /// Image resources attached to the render pass, in attachment order.
    pub fn attachments(&self) -> &[ResourceHandle] {
        &self.attachments
    }

    /// Synthesized attachment descriptions, available after preparation.
    pub fn attachment_descriptions(&self) -> &[AttachmentDescription] {
        &self.descriptions
    }

    /// Synthesized subpass descriptions, one per task.
    pub fn subpass_descriptions(&self) -> &[SubpassDescription] {
        &self.subpasses
    }

    /// Synthesized subpass dependencies.
    pub fn subpass_dependencies(&self) -> &[SubpassDependency] {
        &self.dependencies
    }

    /// The constructed render pass, available after preparation.
    pub fn render_pass(&self) -> Option<RenderPassHandle> {
        self.render_pass
    }

    /// Per-attachment clear values used when the render pass begins.
    pub fn clear_values(&self) -> &[ClearValue] {
        &self.clears
    }

    /// Collect image outputs into the attachment list and describe each one.
    ///
    /// An attachment is cleared when this group is its first producer and
    /// loaded otherwise. Loaded attachments start in the layout the previous
    /// group left them in, which the resource table tracked for us.
    fn create_subpass_descriptions(&mut self, resources: &ResourceTable) {
        self.attachments.clear();
        self.descriptions.clear();
        self.clears.clear();
        self.subpasses.clear();

        for task in self.list.tasks() {
            for &output in task.outputs() {
                if resources.get(output).is_image() && !self.attachments.contains(&output) {
                    self.attachments.push(output);
                }
            }
        }

        for &handle in &self.attachments {
            let resource = resources.get(handle);
            let format = resource
                .format()
                .unwrap_or_else(|| panic!("attachment '{}' must be an image", resource.name()));
            let final_layout = if format.is_depth_stencil() {
                ImageLayout::DepthStencilAttachment
            } else {
                ImageLayout::ColorAttachment
            };
            let clearing = resource.first_producer() == Some(self.list.handle());
            let (load_op, initial_layout, clear) = if clearing {
                (
                    LoadOp::Clear(resource.clear_value()),
                    ImageLayout::Undefined,
                    resource.clear_value(),
                )
            } else {
                (LoadOp::Load, resource.layout(), ClearValue::None)
            };
            self.descriptions.push(AttachmentDescription {
                format,
                load_op,
                store_op: StoreOp::Store,
                initial_layout,
                final_layout,
            });
            self.clears.push(clear);
        }

        for task in self.list.tasks() {
            let mut subpass = SubpassDescription::default();
            for &output in task.outputs() {
                let position = match self.attachments.iter().position(|&a| a == output) {
                    Some(position) => position,
                    // Buffer and value outputs are not attachments.
                    None => continue,
                };
                let reference = AttachmentReference {
                    attachment: position as u32,
                    layout: self.descriptions[position].final_layout,
                };
                if self.descriptions[position].format.is_depth_stencil() {
                    assert!(
                        subpass.depth_stencil_attachment.is_none(),
                        "task '{}' declares more than one depth attachment",
                        task.name()
                    );
                    subpass.depth_stencil_attachment = Some(reference);
                } else {
                    subpass.color_attachments.push(reference);
                }
            }
            self.subpasses.push(subpass);
        }
    }

    /// Walk the tasks in order, turning reads of earlier tasks' outputs into
    /// subpass dependencies and reads of other groups' outputs into event
    /// waits with barriers.
    ///
    /// A task's outputs are registered only after its inputs were handled,
    /// so a task never depends on itself. Dependencies between the same two
    /// subpasses are merged by OR-ing their masks.
    fn detect_task_dependencies(&mut self, context: &mut PostInitContext<'_>) {
        self.dependencies.clear();
        let mut writers: HashMap<ResourceHandle, BTreeSet<usize>> = HashMap::new();

        for i in 0..self.list.len() {
            let inputs: Vec<ResourceHandle> = self.list.tasks()[i].inputs().to_vec();
            for input in inputs {
                if let Some(writer_set) = writers.get(&input) {
                    let resource = context.resources.get(input);
                    let depth_write = resource
                        .format()
                        .map(|format| format.is_depth_stencil())
                        .unwrap_or(false);
                    let (src_stages, src_access, by_region) = if !resource.is_image() {
                        (PipelineStages::FRAGMENT_SHADER, Access::SHADER_WRITE, false)
                    } else if depth_write {
                        (
                            PipelineStages::LATE_FRAGMENT_TESTS,
                            Access::DEPTH_STENCIL_ATTACHMENT_WRITE,
                            true,
                        )
                    } else {
                        (
                            PipelineStages::COLOR_ATTACHMENT_OUTPUT,
                            Access::COLOR_ATTACHMENT_WRITE,
                            true,
                        )
                    };
                    for &writer in writer_set {
                        self.push_or_merge_dependency(SubpassDependency {
                            src_subpass: writer as u32,
                            dst_subpass: i as u32,
                            src_stages,
                            dst_stages: PipelineStages::FRAGMENT_SHADER,
                            src_access,
                            dst_access: Access::SHADER_READ,
                            by_region,
                        });
                    }
                } else {
                    self.delegate_unsatisfied_input(context, i, input);
                }
            }
            for &output in self.list.tasks()[i].outputs().iter() {
                writers.entry(output).or_default().insert(i);
            }
        }
    }

    /// Handle an input no earlier task of this group wrote: find the groups
    /// producing it and let each of them attach its dependency to the task.
    fn delegate_unsatisfied_input(
        &mut self,
        context: &mut PostInitContext<'_>,
        task_index: usize,
        input: ResourceHandle,
    ) {
        let own_handle = self.list.handle();
        let producers: Vec<GroupHandle> = context
            .producers_of(input)
            .iter()
            .copied()
            .filter(|&producer| producer != own_handle)
            .collect();

        if producers.is_empty() {
            let produced_by_self = context.producers_of(input).contains(&own_handle);
            let own_output = self.list.tasks()[task_index].outputs().contains(&input);
            if produced_by_self && !own_output {
                panic!(
                    "task '{}' in group '{}' reads '{}' before any task writes it",
                    self.list.tasks()[task_index].name(),
                    self.list.name(),
                    context.resources.get(input).name(),
                );
            }
            if !produced_by_self && context.resources.get(input).is_image() {
                panic!(
                    "no group produces image '{}' read by task '{}'",
                    context.resources.get(input).name(),
                    self.list.tasks()[task_index].name(),
                );
            }
            // CPU-written buffers and values need no GPU dependency.
            return;
        }

        for producer in producers {
            context.delegate_external_dependency(producer, &mut self.list.tasks_mut()[task_index]);
        }
    }

    fn push_or_merge_dependency(&mut self, dependency: SubpassDependency) {
        let existing = self.dependencies.iter_mut().find(|candidate| {
            candidate.src_subpass == dependency.src_subpass
                && candidate.dst_subpass == dependency.dst_subpass
        });
        match existing {
            Some(existing) => existing.merge_masks(&dependency),
            None => self.dependencies.push(dependency),
        }
    }

    /// Create the render pass and framebuffer from the synthesized
    /// descriptions and record the layout each attachment ends up in.
    fn construct_render_pass(
        &mut self,
        context: &mut PostInitContext<'_>,
    ) -> Result<(), DeviceError> {
        let descriptor = RenderPassDescriptor {
            label: Some(self.list.name().to_string()),
            attachments: self.descriptions.clone(),
            subpasses: self.subpasses.clone(),
            dependencies: self.dependencies.clone(),
        };
        let render_pass = context.device.create_render_pass(&descriptor)?;

        let mut views = Vec::with_capacity(self.attachments.len());
        let mut extent: Option<Extent3d> = None;
        let mut layers = 1;
        for &handle in &self.attachments {
            let resource = context.resources.get(handle);
            let view = resource
                .view_handle()
                .unwrap_or_else(|| panic!("image '{}' was not realized", resource.name()));
            views.push(view);
            let image_extent = resource
                .extent()
                .unwrap_or_else(|| panic!("attachment '{}' must be an image", resource.name()));
            match extent {
                Some(current) => assert_eq!(
                    current,
                    image_extent,
                    "attachments of group '{}' disagree on extent",
                    self.list.name()
                ),
                None => {
                    extent = Some(image_extent);
                    layers = resource.layers().unwrap_or(1);
                }
            }
        }
        let extent = match extent {
            Some(extent) => extent,
            None => panic!("render group '{}' has no attachments", self.list.name()),
        };

        let framebuffer = context.device.create_framebuffer(&FramebufferDescriptor {
            label: Some(self.list.name().to_string()),
            render_pass,
            attachments: views,
            extent,
            layers,
        })?;

        self.render_pass = Some(render_pass);
        self.framebuffer = Some(framebuffer);
        self.extent = extent;

        for (handle, description) in self.attachments.iter().zip(&self.descriptions) {
            context
                .resources
                .get_mut(*handle)
                .commit_layout(description.final_layout);
        }
        Ok(())
    }
}

impl TaskGroup for RenderTaskGroup {
    fn name(&self) -> &str {
        self.list.name()
    }

    fn handle(&self) -> GroupHandle {
        self.list.handle()
    }

    fn assign_handle(&mut self, handle: GroupHandle) {
        self.list.assign_handle(handle);
    }

    fn init(
        &mut self,
        device: &dyn Device,
        resources: &mut ResourceTable,
    ) -> Result<(), DeviceError> {
        self.list.init(device)?;
        // Stale handles fail here, with the group name at hand, instead of
        // somewhere deep in preparation.
        for &handle in self.list.inputs().union(self.list.outputs()) {
            assert!(
                (handle.raw() as usize) < resources.len(),
                "group '{}' references an unknown resource handle {:?}",
                self.list.name(),
                handle
            );
        }
        Ok(())
    }

    fn inputs(&self) -> &BTreeSet<ResourceHandle> {
        self.list.inputs()
    }

    fn outputs(&self) -> &BTreeSet<ResourceHandle> {
        self.list.outputs()
    }

    fn post_init(&mut self, context: &mut PostInitContext<'_>) -> Result<(), DeviceError> {
        self.create_subpass_descriptions(context.resources);
        self.detect_task_dependencies(context);
        self.construct_render_pass(context)?;

        let group_context = GroupContext {
            device: context.device,
            resources: &*context.resources,
            render_pass: self.render_pass,
            extent: self.extent,
        };
        for (index, task) in self.list.tasks_mut().iter_mut().enumerate() {
            task.setup(&group_context, index as u32);
        }
        Ok(())
    }

    fn execute(&mut self, device: &dyn Device, cmd: CommandList) {
        let render_pass = self.render_pass.unwrap_or_else(|| {
            panic!(
                "group '{}' executed before the graph was prepared",
                self.list.name()
            )
        });
        let framebuffer = self.framebuffer.unwrap_or_else(|| {
            panic!(
                "group '{}' executed before the graph was prepared",
                self.list.name()
            )
        });

        device.cmd_begin_render_pass(cmd, render_pass, framebuffer, &self.clears);
        for (index, task) in self.list.tasks_mut().iter_mut().enumerate() {
            if index > 0 {
                device.cmd_next_subpass(cmd);
            }
            task.execute(device, cmd);
        }
        device.cmd_end_render_pass(cmd);

        let done = self
            .list
            .done()
            .unwrap_or_else(|| panic!("group '{}' was not initialized", self.list.name()));
        device.cmd_signal_event(cmd, done, PipelineStages::BOTTOM_OF_PIPE);
    }

    fn done_signal(&self) -> Option<EventHandle> {
        self.list.done()
    }

    fn precede_task(&self, task: &mut Task) {
        let done = self
            .list
            .done()
            .unwrap_or_else(|| panic!("group '{}' was not initialized", self.list.name()));
        task.add_wait(done);
    }

    fn add_external_dependency_to_task(&self, task: &mut Task, resources: &mut ResourceTable) {
        let shared: Vec<ResourceHandle> = task
            .inputs()
            .iter()
            .copied()
            .filter(|handle| self.list.outputs().contains(handle))
            .collect();
        if shared.is_empty() {
            return;
        }

        self.precede_task(task);

        for handle in shared {
            // A resource the task also writes stays an attachment; ordering
            // through the wait is all it needs.
            if task.outputs().contains(&handle) {
                continue;
            }
            let is_image = resources.get(handle).is_image();
            if is_image {
                if let Some(barrier) = resources.get_mut(handle).barrier_to(
                    ImageLayout::ShaderReadOnly,
                    PipelineStages::FRAGMENT_SHADER,
                    Access::SHADER_READ,
                ) {
                    task.add_external_dependency(handle, barrier);
                }
            } else if matches!(resources.get(handle).kind(), ResourceKind::Buffer { .. }) {
                task.add_memory_dependency(MemoryBarrier {
                    src_stages: PipelineStages::FRAGMENT_SHADER,
                    dst_stages: PipelineStages::VERTEX_SHADER | PipelineStages::FRAGMENT_SHADER,
                    src_access: Access::SHADER_WRITE,
                    dst_access: Access::SHADER_READ,
                });
            }
            // Plain values need only the wait.
        }
    }
}

impl std::fmt::Debug for RenderTaskGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderTaskGroup")
            .field("name", &self.list.name())
            .field("tasks", &self.list.len())
            .field("attachments", &self.attachments)
            .field("dependencies", &self.dependencies.len())
            .field("render_pass", &self.render_pass)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::dummy::{DummyCommand, DummyDevice};
    use crate::types::{ImageDescriptor, TextureFormat, TextureUsage};

    fn image(table: &mut ResourceTable, name: &str, format: TextureFormat) -> ResourceHandle {
        table.add_image(
            ImageDescriptor::new_2d(
                256,
                256,
                format,
                TextureUsage::RENDER_ATTACHMENT | TextureUsage::SAMPLED,
            )
            .with_label(name),
        )
    }

    fn prepared_table(device: &DummyDevice, table: &mut ResourceTable) {
        table.realize(device).unwrap();
    }

    fn empty_producers() -> HashMap<ResourceHandle, Vec<GroupHandle>> {
        HashMap::new()
    }

    #[test]
    fn test_first_producer_clears_others_load() {
        let device = DummyDevice::new();
        let mut table = ResourceTable::new();
        let color = image(&mut table, "color", TextureFormat::Rgba8Unorm);
        prepared_table(&device, &mut table);
        table
            .get_mut(color)
            .assign_first_producer(GroupHandle::from_raw(0));

        let mut first = RenderTaskGroup::new("first");
        first.add_task(Task::new("draw").with_output(color));
        first.assign_handle(GroupHandle::from_raw(0));
        first.create_subpass_descriptions(&table);
        assert!(matches!(
            first.attachment_descriptions()[0].load_op,
            LoadOp::Clear(_)
        ));
        assert_eq!(
            first.attachment_descriptions()[0].initial_layout,
            ImageLayout::Undefined
        );

        // Pretend the first group ran its preparation.
        table
            .get_mut(color)
            .commit_layout(ImageLayout::ColorAttachment);

        let mut second = RenderTaskGroup::new("second");
        second.add_task(Task::new("draw_more").with_input(color).with_output(color));
        second.assign_handle(GroupHandle::from_raw(1));
        second.create_subpass_descriptions(&table);
        assert_eq!(second.attachment_descriptions()[0].load_op, LoadOp::Load);
        assert_eq!(
            second.attachment_descriptions()[0].initial_layout,
            ImageLayout::ColorAttachment
        );
    }

    #[test]
    fn test_depth_attachment_reference() {
        let device = DummyDevice::new();
        let mut table = ResourceTable::new();
        let color = image(&mut table, "color", TextureFormat::Rgba8Unorm);
        let depth = image(&mut table, "depth", TextureFormat::Depth32Float);
        prepared_table(&device, &mut table);

        let mut group = RenderTaskGroup::new("gbuffer");
        group.add_task(Task::new("opaque").with_output(color).with_output(depth));
        group.assign_handle(GroupHandle::from_raw(0));
        group.create_subpass_descriptions(&table);

        let subpass = &group.subpass_descriptions()[0];
        assert_eq!(subpass.color_attachments.len(), 1);
        assert_eq!(
            subpass.color_attachments[0].layout,
            ImageLayout::ColorAttachment
        );
        let depth_reference = subpass.depth_stencil_attachment.as_ref().unwrap();
        assert_eq!(depth_reference.layout, ImageLayout::DepthStencilAttachment);
        assert_eq!(
            group.attachment_descriptions()[depth_reference.attachment as usize].final_layout,
            ImageLayout::DepthStencilAttachment
        );
    }

    #[test]
    #[should_panic(expected = "more than one depth attachment")]
    fn test_two_depth_attachments_panic() {
        let device = DummyDevice::new();
        let mut table = ResourceTable::new();
        let depth_a = image(&mut table, "depth_a", TextureFormat::Depth32Float);
        let depth_b = image(&mut table, "depth_b", TextureFormat::Depth16Unorm);
        prepared_table(&device, &mut table);

        let mut group = RenderTaskGroup::new("broken");
        group.add_task(Task::new("draw").with_output(depth_a).with_output(depth_b));
        group.assign_handle(GroupHandle::from_raw(0));
        group.create_subpass_descriptions(&table);
    }

    #[test]
    fn test_internal_read_becomes_subpass_dependency() {
        let device = DummyDevice::new();
        let mut table = ResourceTable::new();
        let albedo = image(&mut table, "albedo", TextureFormat::Rgba8Unorm);
        let lit = image(&mut table, "lit", TextureFormat::Rgba16Float);
        prepared_table(&device, &mut table);

        let mut group = RenderTaskGroup::new("deferred");
        group.add_task(Task::new("gbuffer").with_output(albedo));
        group.add_task(Task::new("lighting").with_input(albedo).with_output(lit));
        group.assign_handle(GroupHandle::from_raw(0));

        let producers = empty_producers();
        let mut left: Vec<Box<dyn TaskGroup>> = Vec::new();
        let mut right: Vec<Box<dyn TaskGroup>> = Vec::new();
        let mut context =
            PostInitContext::new(&device, &mut table, &producers, &mut left, &mut right, 0);
        group.create_subpass_descriptions(context.resources);
        group.detect_task_dependencies(&mut context);

        assert_eq!(group.subpass_dependencies().len(), 1);
        let dependency = &group.subpass_dependencies()[0];
        assert_eq!(dependency.src_subpass, 0);
        assert_eq!(dependency.dst_subpass, 1);
        assert_eq!(
            dependency.src_stages,
            PipelineStages::COLOR_ATTACHMENT_OUTPUT
        );
        assert_eq!(dependency.dst_stages, PipelineStages::FRAGMENT_SHADER);
        assert_eq!(dependency.src_access, Access::COLOR_ATTACHMENT_WRITE);
        assert_eq!(dependency.dst_access, Access::SHADER_READ);
        assert!(dependency.by_region);
    }

    #[test]
    fn test_dependencies_between_same_subpasses_merge() {
        let device = DummyDevice::new();
        let mut table = ResourceTable::new();
        let albedo = image(&mut table, "albedo", TextureFormat::Rgba8Unorm);
        let depth = image(&mut table, "depth", TextureFormat::Depth32Float);
        let lit = image(&mut table, "lit", TextureFormat::Rgba16Float);
        prepared_table(&device, &mut table);

        let mut group = RenderTaskGroup::new("deferred");
        group.add_task(Task::new("gbuffer").with_output(albedo).with_output(depth));
        group.add_task(
            Task::new("lighting")
                .with_input(albedo)
                .with_input(depth)
                .with_output(lit),
        );
        group.assign_handle(GroupHandle::from_raw(0));

        let producers = empty_producers();
        let mut left: Vec<Box<dyn TaskGroup>> = Vec::new();
        let mut right: Vec<Box<dyn TaskGroup>> = Vec::new();
        let mut context =
            PostInitContext::new(&device, &mut table, &producers, &mut left, &mut right, 0);
        group.create_subpass_descriptions(context.resources);
        group.detect_task_dependencies(&mut context);

        assert_eq!(group.subpass_dependencies().len(), 1);
        let dependency = &group.subpass_dependencies()[0];
        assert!(dependency
            .src_stages
            .contains(PipelineStages::COLOR_ATTACHMENT_OUTPUT | PipelineStages::LATE_FRAGMENT_TESTS));
        assert!(dependency
            .src_access
            .contains(Access::COLOR_ATTACHMENT_WRITE | Access::DEPTH_STENCIL_ATTACHMENT_WRITE));
    }

    #[test]
    fn test_output_only_tasks_have_no_dependencies() {
        let device = DummyDevice::new();
        let mut table = ResourceTable::new();
        let shadow = image(&mut table, "shadow", TextureFormat::Depth32Float);
        prepared_table(&device, &mut table);

        let mut group = RenderTaskGroup::new("shadow");
        group.add_task(Task::new("cascade").with_output(shadow));
        group.assign_handle(GroupHandle::from_raw(0));

        let producers = empty_producers();
        let mut left: Vec<Box<dyn TaskGroup>> = Vec::new();
        let mut right: Vec<Box<dyn TaskGroup>> = Vec::new();
        let mut context =
            PostInitContext::new(&device, &mut table, &producers, &mut left, &mut right, 0);
        group.create_subpass_descriptions(context.resources);
        group.detect_task_dependencies(&mut context);

        assert!(group.subpass_dependencies().is_empty());
        assert!(group.tasks()[0].waits().is_empty());
    }

    #[test]
    fn test_cross_group_read_waits_and_transitions() {
        let device = DummyDevice::new();
        let mut table = ResourceTable::new();
        let shadow = image(&mut table, "shadow", TextureFormat::Depth32Float);
        let lit = image(&mut table, "lit", TextureFormat::Rgba16Float);
        prepared_table(&device, &mut table);

        let producer_handle = GroupHandle::from_raw(0);
        let consumer_handle = GroupHandle::from_raw(1);
        table.get_mut(shadow).assign_first_producer(producer_handle);
        table.get_mut(lit).assign_first_producer(consumer_handle);

        let mut producer = RenderTaskGroup::new("shadow");
        producer.add_task(Task::new("cascade").with_output(shadow));
        producer.assign_handle(producer_handle);
        producer.init(&device, &mut table).unwrap();
        // The producer's pass leaves the map in attachment layout.
        table
            .get_mut(shadow)
            .commit_layout(ImageLayout::DepthStencilAttachment);

        let mut consumer = RenderTaskGroup::new("lighting");
        consumer.add_task(Task::new("shade").with_input(shadow).with_output(lit));
        consumer.assign_handle(consumer_handle);
        consumer.init(&device, &mut table).unwrap();

        let mut producers = empty_producers();
        producers.insert(shadow, vec![producer_handle]);
        producers.insert(lit, vec![consumer_handle]);

        let producer_done = producer.done_signal().unwrap();
        let mut left: Vec<Box<dyn TaskGroup>> = vec![Box::new(producer)];
        let mut right: Vec<Box<dyn TaskGroup>> = Vec::new();
        let mut context =
            PostInitContext::new(&device, &mut table, &producers, &mut left, &mut right, 1);
        consumer.post_init(&mut context).unwrap();

        let task = &consumer.tasks()[0];
        assert_eq!(task.waits(), &[producer_done]);
        assert_eq!(task.image_barriers().len(), 1);
        let barrier = &task.image_barriers()[0];
        assert_eq!(barrier.old_layout, ImageLayout::DepthStencilAttachment);
        assert_eq!(barrier.new_layout, ImageLayout::ShaderReadOnly);
        assert_eq!(barrier.src_stages, PipelineStages::LATE_FRAGMENT_TESTS);
        assert_eq!(barrier.dst_stages, PipelineStages::FRAGMENT_SHADER);
        assert_eq!(table.get(shadow).layout(), ImageLayout::ShaderReadOnly);
    }

    #[test]
    fn test_precede_task_waits_without_barriers() {
        let device = DummyDevice::new();
        let mut table = ResourceTable::new();
        let color = image(&mut table, "color", TextureFormat::Rgba8Unorm);
        prepared_table(&device, &mut table);

        let mut group = RenderTaskGroup::new("producer");
        group.add_task(Task::new("draw").with_output(color));
        group.assign_handle(GroupHandle::from_raw(0));
        group.init(&device, &mut table).unwrap();

        let mut task = Task::new("reader");
        group.precede_task(&mut task);
        assert_eq!(task.waits(), &[group.done_signal().unwrap()]);

        let context = GroupContext::for_tests();
        task.setup(&context, 0);
        let cmd = device.begin_commands();
        task.execute(&device, cmd);

        let commands = device.commands();
        assert_eq!(commands.len(), 1);
        match &commands[0] {
            DummyCommand::WaitEvents {
                events,
                src_stages,
                dst_stages,
                image_barriers,
                memory_barriers,
            } => {
                assert_eq!(events, &[group.done_signal().unwrap()]);
                assert_eq!(*src_stages, PipelineStages::BOTTOM_OF_PIPE);
                assert_eq!(*dst_stages, PipelineStages::TOP_OF_PIPE);
                assert!(image_barriers.is_empty());
                assert!(memory_barriers.is_empty());
            }
            other => panic!("expected WaitEvents, got {other:?}"),
        }
    }

    #[test]
    #[should_panic(expected = "was not initialized")]
    fn test_precede_task_before_init_panics() {
        let group = RenderTaskGroup::new("producer");
        let mut task = Task::new("reader");
        group.precede_task(&mut task);
    }

    #[test]
    fn test_execute_records_subpass_sequence() {
        let device = DummyDevice::new();
        let mut table = ResourceTable::new();
        let albedo = image(&mut table, "albedo", TextureFormat::Rgba8Unorm);
        let lit = image(&mut table, "lit", TextureFormat::Rgba16Float);
        prepared_table(&device, &mut table);

        let handle = GroupHandle::from_raw(0);
        table.get_mut(albedo).assign_first_producer(handle);
        table.get_mut(lit).assign_first_producer(handle);

        let mut group = RenderTaskGroup::new("deferred");
        group.add_task(Task::new("gbuffer").with_output(albedo));
        group.add_task(Task::new("lighting").with_input(albedo).with_output(lit));
        group.assign_handle(handle);
        group.init(&device, &mut table).unwrap();

        let producers = empty_producers();
        let mut left: Vec<Box<dyn TaskGroup>> = Vec::new();
        let mut right: Vec<Box<dyn TaskGroup>> = Vec::new();
        let mut context =
            PostInitContext::new(&device, &mut table, &producers, &mut left, &mut right, 0);
        group.post_init(&mut context).unwrap();

        let cmd = device.begin_commands();
        group.execute(&device, cmd);

        let commands = device.commands();
        assert!(matches!(
            commands[0],
            DummyCommand::BeginRenderPass { .. }
        ));
        assert!(matches!(commands[1], DummyCommand::NextSubpass));
        assert!(matches!(commands[2], DummyCommand::EndRenderPass));
        assert!(matches!(commands[3], DummyCommand::SignalEvent { .. }));
    }

    #[test]
    #[should_panic(expected = "executed before the graph was prepared")]
    fn test_execute_before_preparation_panics() {
        let device = DummyDevice::new();
        let mut group = RenderTaskGroup::new("unprepared");
        group.add_task(Task::new("draw"));
        let cmd = device.begin_commands();
        group.execute(&device, cmd);
    }
}

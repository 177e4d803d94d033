//! Shared helpers for render graph integration tests.
//!
//! All tests drive the graph through the dummy device and assert on the
//! command stream it recorded, so they run without GPU hardware.

use framegraph::backend::dummy::{DummyCommand, DummyDevice};
use framegraph::backend::{EventHandle, RenderPassDescriptor};
use framegraph::types::ImageDescriptor;
use framegraph::{
    ClearValue, RenderGraph, RenderTaskGroup, ResourceHandle, Task, TextureFormat, TextureUsage,
};

/// Extent shared by every test attachment. Attachments of one group must
/// agree on their extent, so the helpers never vary it.
pub const TEST_SIZE: u32 = 256;

// ============================================================================
// Resource helpers
// ============================================================================

/// Register a color render target that can also be sampled.
pub fn color_target(graph: &mut RenderGraph, name: &str) -> ResourceHandle {
    attachment(graph, name, TextureFormat::Rgba8Unorm)
}

/// Register an HDR render target that can also be sampled.
#[allow(dead_code)]
pub fn hdr_target(graph: &mut RenderGraph, name: &str) -> ResourceHandle {
    attachment(graph, name, TextureFormat::Rgba16Float)
}

/// Register a depth render target that can also be sampled.
pub fn depth_target(graph: &mut RenderGraph, name: &str) -> ResourceHandle {
    attachment(graph, name, TextureFormat::Depth32Float)
}

/// Register a render target with the given format.
pub fn attachment(graph: &mut RenderGraph, name: &str, format: TextureFormat) -> ResourceHandle {
    let clear = if format.is_depth_stencil() {
        ClearValue::depth(1.0)
    } else {
        ClearValue::color(0.0, 0.0, 0.0, 1.0)
    };
    graph.add_image(
        ImageDescriptor::new_2d(
            TEST_SIZE,
            TEST_SIZE,
            format,
            TextureUsage::RENDER_ATTACHMENT | TextureUsage::SAMPLED,
        )
        .with_label(name)
        .with_clear(clear),
    )
}

// ============================================================================
// Group helpers
// ============================================================================

/// Build a group with a single task reading `inputs` and writing `outputs`.
pub fn pass(name: &str, inputs: &[ResourceHandle], outputs: &[ResourceHandle]) -> RenderTaskGroup {
    let mut task = Task::new(name);
    for &input in inputs {
        task = task.with_input(input);
    }
    for &output in outputs {
        task = task.with_output(output);
    }
    RenderTaskGroup::new(name).with_task(task)
}

// ============================================================================
// Command stream inspection
// ============================================================================

/// Events signaled by the recorded frame, in recording order.
pub fn signaled_events(device: &DummyDevice) -> Vec<EventHandle> {
    device
        .commands()
        .into_iter()
        .filter_map(|command| match command {
            DummyCommand::SignalEvent { event, .. } => Some(event),
            _ => None,
        })
        .collect()
}

/// All `WaitEvents` commands of the recorded frame, in recording order.
pub fn wait_commands(device: &DummyDevice) -> Vec<DummyCommand> {
    device
        .commands()
        .into_iter()
        .filter(|command| matches!(command, DummyCommand::WaitEvents { .. }))
        .collect()
}

/// Descriptors of the render passes begun by the recorded frame, in
/// recording order. The dummy device retains the descriptor every render
/// pass was constructed from.
pub fn begun_render_passes(device: &DummyDevice) -> Vec<RenderPassDescriptor> {
    device
        .commands()
        .into_iter()
        .filter_map(|command| match command {
            DummyCommand::BeginRenderPass { render_pass, .. } => Some(
                device
                    .render_pass_descriptor(render_pass)
                    .unwrap_or_else(|| panic!("no descriptor retained for {render_pass:?}")),
            ),
            _ => None,
        })
        .collect()
}

/// Index of the `n`-th command matching `predicate`, panicking when absent.
pub fn command_index(
    device: &DummyDevice,
    n: usize,
    predicate: impl Fn(&DummyCommand) -> bool,
) -> usize {
    device
        .commands()
        .iter()
        .enumerate()
        .filter(|(_, command)| predicate(command))
        .map(|(index, _)| index)
        .nth(n)
        .unwrap_or_else(|| panic!("no command #{n} matching the predicate"))
}

//! # Deferred Renderer Demo
//!
//! Declares the frame of a small deferred renderer and runs it on the dummy
//! device:
//! - a shadow group rendering a cascade into a depth map
//! - a gbuffer-plus-lighting group whose two tasks fold into subpasses
//! - a post group reading the lit image and a per-frame exposure value
//!
//! Groups are added out of order on purpose; the graph derives the execution
//! order from the declared IO. Run with `RUST_LOG=trace` to watch every
//! recorded command.

use framegraph::types::ImageDescriptor;
use framegraph::{
    ClearValue, DummyDevice, RenderGraph, RenderTaskGroup, Task, TextureFormat, TextureUsage,
};

const FRAMES_TO_RENDER: u32 = 3;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let device = DummyDevice::new();
    let mut graph = RenderGraph::new();

    let attachment_usage = TextureUsage::RENDER_ATTACHMENT | TextureUsage::SAMPLED;
    let shadow = graph.add_image(
        ImageDescriptor::new_2d(2048, 2048, TextureFormat::Depth32Float, attachment_usage)
            .with_label("shadow")
            .with_clear(ClearValue::depth(1.0)),
    );
    let albedo = graph.add_image(
        ImageDescriptor::new_2d(1280, 720, TextureFormat::Rgba8Unorm, attachment_usage)
            .with_label("albedo")
            .with_clear(ClearValue::color(0.0, 0.0, 0.0, 1.0)),
    );
    let normal = graph.add_image(
        ImageDescriptor::new_2d(1280, 720, TextureFormat::Rgb10a2Unorm, attachment_usage)
            .with_label("normal"),
    );
    let depth = graph.add_image(
        ImageDescriptor::new_2d(1280, 720, TextureFormat::Depth32Float, attachment_usage)
            .with_label("depth")
            .with_clear(ClearValue::depth(1.0)),
    );
    let lit = graph.add_image(
        ImageDescriptor::new_2d(1280, 720, TextureFormat::Rgba16Float, attachment_usage)
            .with_label("lit")
            .with_clear(ClearValue::color(0.0, 0.0, 0.0, 1.0)),
    );
    let ldr = graph.add_image(
        ImageDescriptor::new_2d(1280, 720, TextureFormat::Rgba8Unorm, attachment_usage)
            .with_label("ldr")
            .with_clear(ClearValue::color(0.0, 0.0, 0.0, 1.0)),
    );
    let exposure = graph.add_value("exposure", &1.0f32);

    // Declared first although it runs last.
    graph.add_task_group(
        RenderTaskGroup::new("post").with_task(
            Task::new("tonemap")
                .with_input(lit)
                .with_input(exposure)
                .with_output(ldr)
                .with_setup(|context, subpass| {
                    log::info!(
                        "tonemap set up: render pass {:?}, subpass {subpass}, {}x{}",
                        context.render_pass,
                        context.extent.width,
                        context.extent.height
                    );
                })
                .with_execute(|| log::debug!("tonemap: fullscreen quad")),
        ),
    );

    // The gbuffer and lighting tasks share one group, so the lighting read
    // of the gbuffer becomes a subpass dependency instead of a barrier.
    graph.add_task_group(
        RenderTaskGroup::new("deferred")
            .with_task(
                Task::new("gbuffer")
                    .with_output(albedo)
                    .with_output(normal)
                    .with_output(depth)
                    .with_execute(|| log::debug!("gbuffer: draw opaque geometry")),
            )
            .with_task(
                Task::new("lighting")
                    .with_input(albedo)
                    .with_input(normal)
                    .with_input(depth)
                    .with_input(shadow)
                    .with_output(lit)
                    .with_execute(|| log::debug!("lighting: accumulate lights")),
            ),
    );

    graph.add_task_group(
        RenderTaskGroup::new("shadow").with_task(
            Task::new("cascade")
                .with_output(shadow)
                .with_execute(|| log::debug!("shadow: draw casters")),
        ),
    );

    graph.prepare(&device).expect("graph preparation failed");
    print!("{}", graph.dump());

    for frame in 0..FRAMES_TO_RENDER {
        graph.write_value(exposure, &(1.0f32 + frame as f32 * 0.1));
        graph.execute(&device);
        log::info!(
            "frame {frame}: {} commands recorded",
            device.commands().len()
        );
        device.clear_commands();
    }
}

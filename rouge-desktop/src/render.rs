use anyhow::Result;
use image::RgbaImage;
use rouge_core::imggpu::gpu::{GpuExecutor, TARGET_FORMAT};
use rouge_core::imggpu::overlay::OverlayRenderer;
use rouge_core::pipeline::Session;
use tracing::{Level, span};

/// Renders the session's current overlays on top of `background` offscreen.
pub fn snapshot(session: &Session, background: &RgbaImage) -> Result<RgbaImage> {
    let span = span!(Level::DEBUG, "snapshot");
    let _guard = span.enter();

    let mut gpu = GpuExecutor::new()?;
    let mut renderer = OverlayRenderer::new(&mut gpu, TARGET_FORMAT);
    renderer.sync(&gpu, session);

    let (width, height) = background.dimensions();
    let video = gpu.rgba_buffer_to_texture(background.as_raw(), width, height);
    let target = gpu.render_target(width, height);

    renderer.render_to(&gpu, &video, &target)?;
    gpu.texture_to_rgba(&target)
}

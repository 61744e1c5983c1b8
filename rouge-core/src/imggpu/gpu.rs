use anyhow::Result;
use std::collections::HashMap;
use tracing::{Level, span};
use wgpu::ShaderModuleDescriptor;
#[cfg(not(target_arch = "wasm32"))]
use {
    super::util::padded_bytes_per_row, anyhow::Error, image::RgbaImage, pollster::FutureExt,
};

/// Format of textures from [`GpuExecutor::render_target`].
pub const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

pub struct GpuExecutor {
    pub queue: wgpu::Queue,
    pub device: wgpu::Device,
    shaders: HashMap<String, wgpu::ShaderModule>,
}

impl GpuExecutor {
    pub async fn init() -> Result<Self> {
        let backends = if cfg!(target_arch = "wasm32") {
            wgpu::Backends::BROWSER_WEBGPU
        } else {
            wgpu::Backends::all()
        };

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends,
            flags: wgpu::InstanceFlags::VALIDATION,
            backend_options: wgpu::BackendOptions::default(),
            memory_budget_thresholds: Default::default(),
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions::default())
            .await?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::Performance,
                label: Some("device"),
                trace: Default::default(),
            })
            .await?;

        Ok(Self::from_parts(device, queue))
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn new() -> Result<Self> {
        let span = span!(Level::DEBUG, "GpuExecutor#new");
        let _guard = span.enter();
        Self::init().block_on()
    }

    /// Wraps a device the host application already owns.
    pub fn from_parts(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self {
            device,
            queue,
            shaders: HashMap::new(),
        }
    }

    pub fn load_shader(&mut self, name: &str, desc: ShaderModuleDescriptor) -> wgpu::ShaderModule {
        let device = &self.device;
        self.shaders
            .entry(name.to_string())
            .or_insert_with(|| device.create_shader_module(desc))
            .clone()
    }

    fn rgba_texture(
        &self,
        label: &str,
        width: u32,
        height: u32,
        usage: wgpu::TextureUsages,
    ) -> wgpu::Texture {
        self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TARGET_FORMAT,
            view_formats: &[TARGET_FORMAT],
            usage,
        })
    }

    pub fn rgba_buffer_to_texture(
        &self,
        rgba_bytes: &[u8],
        width: u32,
        height: u32,
    ) -> wgpu::Texture {
        let span = span!(Level::DEBUG, "rgba_buffer_to_texture");
        let _guard = span.enter();

        let texture = self.rgba_texture(
            "video_frame",
            width,
            height,
            wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        );
        self.queue.write_texture(
            texture.as_image_copy(),
            rgba_bytes,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * 4),
                rows_per_image: Some(height),
            },
            texture.size(),
        );

        texture
    }

    /// Offscreen texture the overlay renderer can draw into and read back.
    pub fn render_target(&self, width: u32, height: u32) -> wgpu::Texture {
        self.rgba_texture(
            "overlay_target",
            width,
            height,
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        )
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn texture_to_rgba(&self, texture: &wgpu::Texture) -> Result<RgbaImage> {
        let span = span!(Level::DEBUG, "texture_to_rgba");
        let _guard = span.enter();

        let (width, height) = (texture.width(), texture.height());
        let row_stride = padded_bytes_per_row(width);

        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("readback"),
            size: (row_stride * height as usize) as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("readback_encoder"),
            });
        encoder.copy_texture_to_buffer(
            texture.as_image_copy(),
            wgpu::TexelCopyBufferInfo {
                buffer: &staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(row_stride as u32),
                    rows_per_image: Some(height),
                },
            },
            texture.size(),
        );
        self.queue.submit(std::iter::once(encoder.finish()));

        let pixels = self.read_rows(&staging, row_stride, width as usize * 4)?;
        RgbaImage::from_raw(width, height, pixels)
            .ok_or_else(|| Error::msg("readback size does not match the texture"))
    }

    /// Maps `staging` and strips the row padding wgpu requires for copies.
    #[cfg(not(target_arch = "wasm32"))]
    fn read_rows(&self, staging: &wgpu::Buffer, stride: usize, row_len: usize) -> Result<Vec<u8>> {
        let (tx, rx) = futures::channel::oneshot::channel();
        let slice = staging.slice(..);
        slice.map_async(wgpu::MapMode::Read, move |r| {
            let _ = tx.send(r);
        });

        self.device.poll(wgpu::PollType::Wait)?;
        rx.block_on()??;

        let pixels = slice
            .get_mapped_range()
            .chunks_exact(stride)
            .flat_map(|row| row[..row_len].iter().copied())
            .collect();
        staging.unmap();
        Ok(pixels)
    }
}

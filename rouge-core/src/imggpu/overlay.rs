use super::gpu::GpuExecutor;
use super::mesh::GpuMesh;
use super::vertex::OverlayVertex;
use crate::config::{MeshKind, ShadingTarget};
use crate::pipeline::Session;
use crate::shading::{LipUniforms, SkinUniforms};
use anyhow::Result;
use std::collections::HashMap;
use tracing::{Level, debug, span};

struct DrawSlot {
    shading: ShadingTarget,
    render_order: u32,
    mesh: GpuMesh,
    visible: bool,
}

/// Draws the video background and the session's overlay meshes.
pub struct OverlayRenderer {
    bg_layout: wgpu::BindGroupLayout,
    background_pipeline: wgpu::RenderPipeline,
    lip_pipeline: wgpu::RenderPipeline,
    lip_wire_pipeline: wgpu::RenderPipeline,
    skin_pipeline: wgpu::RenderPipeline,
    skin_wire_pipeline: wgpu::RenderPipeline,
    sampler: wgpu::Sampler,
    lip_uniforms: wgpu::Buffer,
    skin_uniforms: wgpu::Buffer,
    video_bind_groups: Option<(wgpu::BindGroup, wgpu::BindGroup)>,
    slots: HashMap<MeshKind, DrawSlot>,
    wireframe: bool,
}

impl OverlayRenderer {
    pub fn new(gpu: &mut GpuExecutor, format: wgpu::TextureFormat) -> Self {
        let span = span!(Level::DEBUG, "OverlayRenderer#new");
        let _guard = span.enter();

        let lip_shader = gpu.load_shader("lip", wgpu::include_wgsl!("lip.wgsl"));
        let skin_shader = gpu.load_shader("skin", wgpu::include_wgsl!("skin.wgsl"));
        let background_shader = gpu.load_shader("composite", wgpu::include_wgsl!("composite.wgsl"));

        let bg_layout = gpu
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("overlay bind group layout"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: Default::default(),
                            view_dimension: Default::default(),
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 2,
                        visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                ],
            });

        let pipeline_layout = gpu
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: None,
                bind_group_layouts: &[&bg_layout],
                push_constant_ranges: &[],
            });

        let build = |label: &str,
                     shader: &wgpu::ShaderModule,
                     fragment: &str,
                     topology: wgpu::PrimitiveTopology,
                     blend: wgpu::BlendState,
                     with_vertices: bool| {
            let buffers = [OverlayVertex::desc()];
            gpu.device
                .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                    label: Some(label),
                    layout: Some(&pipeline_layout),
                    vertex: wgpu::VertexState {
                        module: shader,
                        entry_point: Some("vert_main"),
                        compilation_options: Default::default(),
                        buffers: if with_vertices { &buffers } else { &[] },
                    },
                    primitive: wgpu::PrimitiveState {
                        topology,
                        ..Default::default()
                    },
                    fragment: Some(wgpu::FragmentState {
                        module: shader,
                        entry_point: Some(fragment),
                        compilation_options: Default::default(),
                        targets: &[Some(wgpu::ColorTargetState {
                            format,
                            blend: Some(blend),
                            write_mask: wgpu::ColorWrites::ALL,
                        })],
                    }),
                    depth_stencil: None,
                    multisample: Default::default(),
                    multiview: None,
                    cache: None,
                })
        };

        let tris = wgpu::PrimitiveTopology::TriangleList;
        let lines = wgpu::PrimitiveTopology::LineList;
        let background_pipeline = build(
            "background_pipeline",
            &background_shader,
            "frag_main",
            tris,
            wgpu::BlendState::REPLACE,
            false,
        );
        let lip_pipeline = build(
            "lip_pipeline",
            &lip_shader,
            "frag_main",
            tris,
            wgpu::BlendState::ALPHA_BLENDING,
            true,
        );
        let lip_wire_pipeline = build(
            "lip_wire_pipeline",
            &lip_shader,
            "wire_main",
            lines,
            wgpu::BlendState::REPLACE,
            true,
        );
        let skin_pipeline = build(
            "skin_pipeline",
            &skin_shader,
            "frag_main",
            tris,
            wgpu::BlendState::REPLACE,
            true,
        );
        let skin_wire_pipeline = build(
            "skin_wire_pipeline",
            &skin_shader,
            "wire_main",
            lines,
            wgpu::BlendState::REPLACE,
            true,
        );

        let sampler = gpu.device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let lip_uniforms = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("lip_uniforms"),
            size: std::mem::size_of::<LipUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let skin_uniforms = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("skin_uniforms"),
            size: std::mem::size_of::<SkinUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            bg_layout,
            background_pipeline,
            lip_pipeline,
            lip_wire_pipeline,
            skin_pipeline,
            skin_wire_pipeline,
            sampler,
            lip_uniforms,
            skin_uniforms,
            video_bind_groups: None,
            slots: HashMap::new(),
            wireframe: false,
        }
    }

    /// Uploads shading uniforms and any mesh that changed since the last
    /// sync. A replaced mesh's buffers are released here.
    pub fn sync(&mut self, gpu: &GpuExecutor, session: &Session) {
        let span = span!(Level::DEBUG, "OverlayRenderer#sync");
        let _guard = span.enter();

        let config = session.config();
        let aspect = config.aspect();
        let shading = session.shading();

        let lip = shading.lip.uniforms(aspect);
        let skin = shading
            .skin
            .uniforms(aspect, [config.video_width, config.video_height]);
        gpu.queue
            .write_buffer(&self.lip_uniforms, 0, bytemuck::bytes_of(&lip));
        gpu.queue
            .write_buffer(&self.skin_uniforms, 0, bytemuck::bytes_of(&skin));

        self.wireframe = session.debug();

        for slot in session.slots() {
            let Some(mesh) = slot.mesh() else {
                continue;
            };

            let stale = self
                .slots
                .get(&slot.kind())
                .is_none_or(|d| d.mesh.generation != slot.generation());

            if stale {
                debug!("Replacing {} mesh on the GPU", slot.kind());
                self.slots.insert(
                    slot.kind(),
                    DrawSlot {
                        shading: slot.spec().shading,
                        render_order: slot.spec().render_order,
                        mesh: GpuMesh::upload(gpu, mesh, slot.generation()),
                        visible: slot.is_visible(),
                    },
                );
            } else if let Some(d) = self.slots.get_mut(&slot.kind()) {
                d.visible = slot.is_visible();
            }
        }
    }

    pub fn bind_video(&mut self, gpu: &GpuExecutor, video: &wgpu::Texture) {
        let view = video.create_view(&Default::default());
        let bind = |label: &str, uniforms: &wgpu::Buffer| {
            gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout: &self.bg_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&self.sampler),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: uniforms.as_entire_binding(),
                    },
                ],
            })
        };

        let lip = bind("lip_bind_group", &self.lip_uniforms);
        let skin = bind("skin_bind_group", &self.skin_uniforms);
        self.video_bind_groups = Some((lip, skin));
    }

    /// Records the background and every visible mesh, lowest render order
    /// first. Does nothing until a video frame is bound.
    pub fn draw(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        let Some((lip_bg, skin_bg)) = &self.video_bind_groups else {
            return;
        };

        render_pass.set_pipeline(&self.background_pipeline);
        render_pass.set_bind_group(0, skin_bg, &[]);
        render_pass.draw(0..3, 0..1);

        let mut slots: Vec<&DrawSlot> = self.slots.values().filter(|s| s.visible).collect();
        slots.sort_by_key(|s| s.render_order);

        for slot in slots {
            let (pipeline, bind_group) = match (slot.shading, self.wireframe) {
                (ShadingTarget::Lip, false) => (&self.lip_pipeline, lip_bg),
                (ShadingTarget::Lip, true) => (&self.lip_wire_pipeline, lip_bg),
                (ShadingTarget::Skin, false) => (&self.skin_pipeline, skin_bg),
                (ShadingTarget::Skin, true) => (&self.skin_wire_pipeline, skin_bg),
            };
            render_pass.set_pipeline(pipeline);
            render_pass.set_bind_group(0, bind_group, &[]);
            slot.mesh.draw(render_pass, self.wireframe);
        }
    }

    pub fn render_to(
        &mut self,
        gpu: &GpuExecutor,
        video: &wgpu::Texture,
        target: &wgpu::Texture,
    ) -> Result<()> {
        let span = span!(Level::DEBUG, "OverlayRenderer#render_to");
        let _guard = span.enter();

        self.bind_video(gpu, video);

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("encoder"),
            });

        let view = target.create_view(&Default::default());
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("overlay_pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &view,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            ..Default::default()
        });

        self.draw(&mut render_pass);
        drop(render_pass);

        gpu.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }
}

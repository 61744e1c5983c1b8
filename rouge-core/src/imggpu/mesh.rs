use super::gpu::GpuExecutor;
use super::vertex::OverlayVertex;
use crate::mesh::OverlayMesh;
use tracing::trace;
use wgpu::util::DeviceExt;

/// GPU buffers for one overlay mesh. Buffers are destroyed as soon as the
/// mesh is dropped, which is when a newer mesh replaces it.
pub struct GpuMesh {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub wire_buffer: wgpu::Buffer,
    pub index_count: u32,
    pub wire_count: u32,
    pub generation: u64,
}

impl GpuMesh {
    pub fn upload(gpu: &GpuExecutor, mesh: &OverlayMesh, generation: u64) -> Self {
        let vertices = OverlayVertex::from_mesh(mesh);
        let wire = mesh.edge_indices();

        let vertex_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("overlay_vertex_buffer"),
                contents: bytemuck::cast_slice(&vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });

        let index_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("overlay_index_buffer"),
                contents: bytemuck::cast_slice(&mesh.indices),
                usage: wgpu::BufferUsages::INDEX,
            });

        let wire_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("overlay_wire_buffer"),
                contents: bytemuck::cast_slice(&wire),
                usage: wgpu::BufferUsages::INDEX,
            });

        trace!(
            "Uploaded mesh generation {generation}: {} vertices",
            vertices.len()
        );

        Self {
            vertex_buffer,
            index_buffer,
            wire_buffer,
            index_count: mesh.indices.len() as u32,
            wire_count: wire.len() as u32,
            generation,
        }
    }

    pub fn draw(&self, render_pass: &mut wgpu::RenderPass<'_>, wireframe: bool) {
        render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        if wireframe {
            render_pass.set_index_buffer(self.wire_buffer.slice(..), wgpu::IndexFormat::Uint32);
            render_pass.draw_indexed(0..self.wire_count, 0, 0..1);
        } else {
            render_pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            render_pass.draw_indexed(0..self.index_count, 0, 0..1);
        }
    }
}

impl Drop for GpuMesh {
    fn drop(&mut self) {
        self.vertex_buffer.destroy();
        self.index_buffer.destroy();
        self.wire_buffer.destroy();
    }
}

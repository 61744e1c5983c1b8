use crate::mesh::OverlayMesh;

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable, PartialEq)]
pub struct OverlayVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
    pub mask: f32,
    pub normal: [f32; 3],
}

impl OverlayVertex {
    const ATTRIBS: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
        0 => Float32x3,
        1 => Float32x2,
        2 => Float32,
        3 => Float32x3
    ];

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;

        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBS,
        }
    }

    pub fn from_mesh(mesh: &OverlayMesh) -> Vec<Self> {
        mesh.positions
            .iter()
            .zip(&mesh.uvs)
            .zip(&mesh.masks)
            .zip(&mesh.normals)
            .map(|(((position, uv), mask), normal)| Self {
                position: *position,
                uv: *uv,
                mask: *mask,
                normal: *normal,
            })
            .collect()
    }
}

#[test]
fn test_layout() {
    assert_eq!(std::mem::size_of::<OverlayVertex>(), 36);
    assert_eq!(OverlayVertex::ATTRIBS[2].offset, 20);
    assert_eq!(OverlayVertex::ATTRIBS[3].offset, 24);
}

#[test]
fn test_from_mesh() {
    let mesh = OverlayMesh {
        positions: vec![[0., 0., 0.], [1., 0., 0.], [0., 1., 0.]],
        uvs: vec![[0.5, 0.5], [0., 0.5], [0.5, 1.]],
        masks: vec![1., 0.5, 0.],
        normals: vec![[0., 0., 1.]; 3],
        indices: vec![0, 1, 2],
    };
    let verts = OverlayVertex::from_mesh(&mesh);
    assert_eq!(verts.len(), 3);
    assert_eq!(verts[1].mask, 0.5);
    assert_eq!(verts[2].uv, [0.5, 1.]);
}

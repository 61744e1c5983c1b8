use crate::contour::to_uv;
use crate::error::{GeometryError, Result};
use crate::shapes::point::{Point, orient};
use crate::shapes::polygon::Polygon;
use crate::triangulate::Triangulate;
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{Level, debug, span};

/// A renderable triangle mesh for one overlay region.
///
/// Every per-vertex array has the same length and every index refers to a
/// vertex. Triangles wind counter-clockwise in render space.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OverlayMesh {
    pub positions: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub masks: Vec<f32>,
    pub normals: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
}

impl OverlayMesh {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_consistent(&self) -> bool {
        let n = self.positions.len();
        self.uvs.len() == n
            && self.masks.len() == n
            && self.normals.len() == n
            && self.indices.len() % 3 == 0
            && self.indices.iter().all(|i| (*i as usize) < n)
    }

    pub fn edge_indices(&self) -> Vec<u32> {
        let edges: BTreeSet<(u32, u32)> = self
            .indices
            .chunks_exact(3)
            .flat_map(|t| [(t[0], t[1]), (t[1], t[2]), (t[2], t[0])])
            .map(|(a, b)| (a.min(b), a.max(b)))
            .collect();

        edges.into_iter().flat_map(|(a, b)| [a, b]).collect()
    }
}

/// Triangulates `polygon` and derives the per-vertex attributes. Masks
/// start fully opaque.
pub fn assemble(
    polygon: &Polygon,
    aspect: f32,
    triangulator: &dyn Triangulate,
) -> Result<OverlayMesh> {
    let span = span!(Level::DEBUG, "assemble_mesh");
    let _guard = span.enter();

    let tri = triangulator.triangulate(polygon)?;
    let n = tri.vertices.len();

    let mut indices = Vec::with_capacity(tri.indices.len());
    for t in tri.indices.chunks_exact(3) {
        if t.iter().any(|i| *i as usize >= n) {
            return Err(GeometryError::Triangulation(format!(
                "{} produced index out of range for {n} vertices",
                triangulator.name()
            )));
        }

        let [a, b, c] = [t[0], t[1], t[2]].map(|i| tri.vertices[i as usize]);
        let o = orient(&a, &b, &c);
        if o > 0. {
            indices.extend_from_slice(t);
        } else if o < 0. {
            indices.extend([t[0], t[2], t[1]]);
        }
    }

    if indices.is_empty() {
        return Err(GeometryError::Triangulation(format!(
            "{} produced no triangles",
            triangulator.name()
        )));
    }

    let normals = vertex_normals(&tri.vertices, &indices);
    let mesh = OverlayMesh {
        positions: tri.vertices.iter().map(|p| [p.x, p.y, 0.]).collect(),
        uvs: tri.vertices.iter().map(|p| to_uv(p, aspect)).collect(),
        masks: vec![1.; n],
        normals,
        indices,
    };

    debug!(
        "Assembled {} vertices, {} triangles with {}",
        mesh.vertex_count(),
        mesh.triangle_count(),
        triangulator.name()
    );

    Ok(mesh)
}

// Area weighted face normals summed per vertex. On a planar z = 0 mesh
// this is +z everywhere a vertex touches a triangle.
fn vertex_normals(vertices: &[Point], indices: &[u32]) -> Vec<[f32; 3]> {
    let mut acc = vec![[0f32; 3]; vertices.len()];
    for t in indices.chunks_exact(3) {
        let [a, b, c] = [t[0], t[1], t[2]].map(|i| vertices[i as usize]);
        let e1 = [b.x - a.x, b.y - a.y, 0.];
        let e2 = [c.x - a.x, c.y - a.y, 0.];
        let n = cross(e1, e2);
        for i in t {
            for k in 0..3 {
                acc[*i as usize][k] += n[k];
            }
        }
    }

    acc.into_iter().map(normalize).collect()
}

fn cross(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn normalize(v: [f32; 3]) -> [f32; 3] {
    let len = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
    if len > f32::EPSILON {
        [v[0] / len, v[1] / len, v[2] / len]
    } else {
        [0., 0., 1.]
    }
}

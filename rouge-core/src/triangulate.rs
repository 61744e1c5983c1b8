use crate::config::TriangulatorKind;
use crate::error::Result;
use crate::shapes::point::Point;
use crate::shapes::polygon::Polygon;

mod ear_clip;
mod earcut;

pub use ear_clip::EarClipper;
pub use earcut::Earcut;

/// An indexed triangle list over a polygon's vertices.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Triangulation {
    pub vertices: Vec<Point>,
    pub indices: Vec<u32>,
}

impl Triangulation {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Polygon-with-hole in, indexed triangles out.
pub trait Triangulate: Send + Sync {
    fn triangulate(&self, polygon: &Polygon) -> Result<Triangulation>;

    fn name(&self) -> &str;
}

pub fn for_kind(kind: TriangulatorKind) -> Box<dyn Triangulate> {
    match kind {
        TriangulatorKind::EarClip => Box::new(EarClipper),
        TriangulatorKind::Earcut => Box::new(Earcut),
    }
}

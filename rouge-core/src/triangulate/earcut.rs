use super::{Triangulate, Triangulation};
use crate::error::{GeometryError, Result};
use crate::shapes::polygon::Polygon;
use tracing::{Level, span};

#[derive(Debug, Clone, Copy, Default)]
pub struct Earcut;

impl Triangulate for Earcut {
    fn triangulate(&self, polygon: &Polygon) -> Result<Triangulation> {
        let span = span!(Level::DEBUG, "Earcut#triangulate");
        let _guard = span.enter();

        let vertices = polygon.vertices();
        let coords: Vec<f64> = vertices
            .iter()
            .flat_map(|p| [p.x as f64, p.y as f64])
            .collect();

        let hole_starts: Vec<usize> = match polygon.hole() {
            Some(_) => vec![polygon.outer().len()],
            None => Vec::new(),
        };

        let idx = earcutr::earcut(&coords, &hole_starts, 2)
            .map_err(|e| GeometryError::Triangulation(format!("earcut: {e:?}")))?;
        if idx.len() % 3 != 0 {
            return Err(GeometryError::Triangulation(format!(
                "earcut returned {} indices",
                idx.len()
            )));
        }

        Ok(Triangulation {
            vertices,
            indices: idx.into_iter().map(|i| i as u32).collect(),
        })
    }

    fn name(&self) -> &str {
        "Earcut"
    }
}

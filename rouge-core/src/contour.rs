use crate::error::{GeometryError, Result};
use crate::landmarks::Landmark;
use crate::regions::Region;
use crate::shapes::point::Point;
use tracing::trace;

/// Maps a normalized landmark into mirrored, aspect-corrected render space.
pub fn to_render_space(lm: &Landmark, aspect: f32) -> Point {
    Point {
        x: aspect * (1. - 2. * lm.x),
        y: (1. - lm.y) * 2. - 1.,
    }
}

/// Inverse of [`to_render_space`], clamped to the unit square. The result
/// is a texture coordinate with v pointing up.
pub fn to_uv(p: &Point, aspect: f32) -> [f32; 2] {
    let u = (1. - p.x / aspect) * 0.5;
    let v = (1. + p.y) * 0.5;
    [u.clamp(0., 1.), v.clamp(0., 1.)]
}

/// Render space points for every landmark of `region`, in the region's
/// order. Indices past the end of `landmarks` and non-finite landmarks are
/// skipped.
pub fn extract_points(region: Region, landmarks: &[Landmark], aspect: f32) -> Result<Vec<Point>> {
    let points: Vec<Point> = region
        .indices()
        .iter()
        .filter_map(|i| landmarks.get(*i))
        .filter(|lm| lm.is_finite())
        .map(|lm| to_render_space(lm, aspect))
        .collect();

    let skipped = region.indices().len() - points.len();
    if skipped > 0 {
        trace!("Skipped {skipped} missing landmarks in {region}");
    }

    if points.len() < 3 {
        return Err(GeometryError::InsufficientPoints {
            region: region.to_string(),
            found: points.len(),
        });
    }

    Ok(points)
}

/// UV coordinates of a region's boundary, used as the soft mask reference.
pub fn boundary_uvs(region: Region, landmarks: &[Landmark], aspect: f32) -> Result<Vec<[f32; 2]>> {
    Ok(extract_points(region, landmarks, aspect)?
        .iter()
        .map(|p| to_uv(p, aspect))
        .collect())
}

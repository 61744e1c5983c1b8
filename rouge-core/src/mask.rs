use crate::mesh::OverlayMesh;

/// Cubic Hermite ease between `e0` and `e1`, as in GLSL.
pub fn smoothstep(e0: f32, e1: f32, x: f32) -> f32 {
    let t = ((x - e0) / (e1 - e0)).clamp(0., 1.);
    t * t * (3. - 2. * t)
}

pub fn point_segment_distance(p: [f32; 2], a: [f32; 2], b: [f32; 2]) -> f32 {
    let ab = [b[0] - a[0], b[1] - a[1]];
    let ap = [p[0] - a[0], p[1] - a[1]];
    let len_sq = ab[0] * ab[0] + ab[1] * ab[1];

    let t = if len_sq > 0. {
        ((ap[0] * ab[0] + ap[1] * ab[1]) / len_sq).clamp(0., 1.)
    } else {
        0.
    };

    let closest = [a[0] + ab[0] * t, a[1] + ab[1] * t];
    (p[0] - closest[0]).hypot(p[1] - closest[1])
}

/// Distance from `p` to the closed polyline through `boundary`.
pub fn ring_distance(p: [f32; 2], boundary: &[[f32; 2]]) -> f32 {
    match boundary {
        [] => f32::INFINITY,
        [only] => point_segment_distance(p, *only, *only),
        _ => (0..boundary.len())
            .map(|i| point_segment_distance(p, boundary[i], boundary[(i + 1) % boundary.len()]))
            .fold(f32::INFINITY, f32::min),
    }
}

/// Mask value for a vertex `distance` away from the boundary: 1 on the
/// boundary, easing to 0 at `falloff` and beyond.
pub fn mask_value(distance: f32, falloff: f32) -> f32 {
    if falloff <= 0. {
        return if distance <= 0. { 1. } else { 0. };
    }

    let raw = 1. - (distance / falloff).clamp(0., 1.);
    smoothstep(0., 1., raw)
}

/// One mask value per vertex of `mesh`, measured in UV space against the
/// closed `boundary` ring. An empty boundary leaves the mesh opaque.
pub fn compute_mask(mesh: &OverlayMesh, boundary: &[[f32; 2]], falloff: f32) -> Vec<f32> {
    if boundary.is_empty() {
        return vec![1.; mesh.vertex_count()];
    }

    mesh.uvs
        .iter()
        .map(|uv| mask_value(ring_distance(*uv, boundary), falloff))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_smoothstep() {
        assert_eq!(smoothstep(0., 1., -1.), 0.);
        assert_eq!(smoothstep(0., 1., 0.5), 0.5);
        assert_eq!(smoothstep(0., 1., 2.), 1.);
        assert!((smoothstep(0.2, 0.6, 0.4) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_segment_distance() {
        let a = [0., 0.];
        let b = [1., 0.];
        assert_eq!(point_segment_distance([0.5, 0.5], a, b), 0.5);
        assert_eq!(point_segment_distance([2., 0.], a, b), 1.);
        assert_eq!(point_segment_distance([0., 3.], a, a), 3.);
    }

    #[test]
    fn test_mask_endpoints() {
        assert_eq!(mask_value(0., 0.06), 1.);
        assert_eq!(mask_value(0.06, 0.06), 0.);
        assert_eq!(mask_value(1., 0.06), 0.);
    }

    #[test]
    fn test_mask_non_increasing_and_bounded() {
        let mut last = f32::INFINITY;
        for i in 0..=200 {
            let d = i as f32 * 0.0005;
            let m = mask_value(d, 0.06);
            assert!((0. ..=1.).contains(&m));
            assert!(m <= last, "mask increased at distance {d}");
            last = m;
        }
    }

    #[test]
    fn test_compute_mask_against_ring() {
        let mesh = OverlayMesh {
            positions: vec![[0.; 3]; 3],
            uvs: vec![[0.5, 0.5], [0.5, 0.55], [0.9, 0.9]],
            masks: vec![1.; 3],
            normals: vec![[0., 0., 1.]; 3],
            indices: vec![0, 1, 2],
        };
        let boundary = [[0.4, 0.5], [0.6, 0.5], [0.6, 0.52], [0.4, 0.52]];
        let masks = compute_mask(&mesh, &boundary, 0.06);

        assert_eq!(masks.len(), 3);
        assert!(masks[0] > 0.999);
        assert!(masks[1] > 0. && masks[1] < 1.);
        assert_eq!(masks[2], 0.);

        assert_eq!(compute_mask(&mesh, &[], 0.06), vec![1.; 3]);
    }
}

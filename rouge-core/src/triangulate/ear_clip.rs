use super::{Triangulate, Triangulation};
use crate::error::{GeometryError, Result};
use crate::shapes::point::{Point, orient, segments_touch};
use crate::shapes::polygon::Polygon;
use tracing::{Level, span, trace, warn};

/// Ear clipping triangulator. A hole is first joined to the outer ring by a
/// bridge edge, turning the polygon into a single weakly simple ring.
#[derive(Debug, Clone, Copy, Default)]
pub struct EarClipper;

impl Triangulate for EarClipper {
    fn triangulate(&self, polygon: &Polygon) -> Result<Triangulation> {
        let span = span!(Level::DEBUG, "EarClipper#triangulate");
        let _guard = span.enter();

        let vertices = polygon.vertices();
        let outer_len = polygon.outer().len();

        let ring = match polygon.hole() {
            None => (0..outer_len).collect(),
            Some(hole) => bridge_hole(polygon.outer(), hole, outer_len)?,
        };

        let indices = clip_ears(&vertices, ring);
        trace!("Clipped {} triangles", indices.len() / 3);

        Ok(Triangulation { vertices, indices })
    }

    fn name(&self) -> &str {
        "EarClip"
    }
}

/// Splices the hole into the outer ring. Returns vertex ids where hole
/// vertex `k` has id `hole_offset + k`.
fn bridge_hole(outer: &[Point], hole: &[Point], hole_offset: usize) -> Result<Vec<usize>> {
    let (m, h) = hole
        .iter()
        .enumerate()
        .fold((0, hole[0]), |best, (i, p)| if p.x > best.1.x { (i, *p) } else { best });

    let mut candidates: Vec<usize> = (0..outer.len()).collect();
    candidates.sort_by(|a, b| outer[*a].dist(&h).total_cmp(&outer[*b].dist(&h)));

    let vi = candidates
        .into_iter()
        .find(|vi| bridge_visible(outer, hole, *vi, m))
        .ok_or_else(|| GeometryError::Triangulation("no visible bridge to hole".to_string()))?;

    trace!("Bridging hole vertex {m} to outer vertex {vi}");

    let mut ring = Vec::with_capacity(outer.len() + hole.len() + 2);
    ring.extend(0..=vi);
    ring.extend((m..hole.len()).map(|k| hole_offset + k));
    ring.extend((0..=m).map(|k| hole_offset + k));
    ring.extend(vi..outer.len());
    Ok(ring)
}

fn bridge_visible(outer: &[Point], hole: &[Point], vi: usize, m: usize) -> bool {
    let p = outer[vi];
    let h = hole[m];

    let crosses_ring = |ring: &[Point], skip: usize| {
        (0..ring.len()).any(|i| {
            let j = (i + 1) % ring.len();
            i != skip && j != skip && segments_touch(&p, &h, &ring[i], &ring[j])
        })
    };

    if crosses_ring(outer, vi) || crosses_ring(hole, m) {
        return false;
    }

    let on = outer.len();
    let hn = hole.len();
    locally_inside(&outer[(vi + on - 1) % on], &p, &outer[(vi + 1) % on], &h)
        && locally_inside(&hole[(m + hn - 1) % hn], &h, &hole[(m + 1) % hn], &p)
}

/// Whether `target` lies in the interior wedge at `at`, the interior being
/// left of prev -> at -> next.
fn locally_inside(prev: &Point, at: &Point, next: &Point, target: &Point) -> bool {
    if orient(prev, at, next) >= 0. {
        orient(prev, at, target) > 0. && orient(at, next, target) > 0.
    } else {
        orient(prev, at, target) > 0. || orient(at, next, target) > 0.
    }
}

fn clip_ears(vertices: &[Point], mut ring: Vec<usize>) -> Vec<u32> {
    let mut indices = Vec::with_capacity(ring.len().saturating_sub(2) * 3);

    let mut i = 0;
    let mut misses = 0;
    while ring.len() > 3 {
        let n = ring.len();
        let (prev, cur, next) = (ring[(i + n - 1) % n], ring[i % n], ring[(i + 1) % n]);
        let o = orient(&vertices[prev], &vertices[cur], &vertices[next]);

        if o == 0. {
            // collinear or a zero width spike; dropping it loses no area
            ring.remove(i % n);
            misses = 0;
        } else if o > 0. && is_ear(vertices, &ring, prev, cur, next) {
            indices.extend([prev as u32, cur as u32, next as u32]);
            ring.remove(i % n);
            misses = 0;
        } else {
            i += 1;
            misses += 1;
        }

        if misses >= ring.len() {
            warn!("Ear clipping stalled with {} vertices left", ring.len());
            force_clip(vertices, &mut ring, &mut indices);
            misses = 0;
        }

        if !ring.is_empty() {
            i %= ring.len();
        }
    }

    if let [a, b, c] = ring[..] {
        if orient(&vertices[a], &vertices[b], &vertices[c]) > 0. {
            indices.extend([a as u32, b as u32, c as u32]);
        }
    }

    indices
}

fn is_ear(vertices: &[Point], ring: &[usize], prev: usize, cur: usize, next: usize) -> bool {
    let (a, b, c) = (vertices[prev], vertices[cur], vertices[next]);

    !ring.iter().any(|id| {
        if *id == prev || *id == cur || *id == next {
            return false;
        }
        let p = vertices[*id];
        if p == a || p == b || p == c {
            return false;
        }
        orient(&a, &b, &p) >= 0. && orient(&b, &c, &p) >= 0. && orient(&c, &a, &p) >= 0.
    })
}

// Clips the first convex vertex, or drops one vertex outright if the ring
// has none left.
fn force_clip(vertices: &[Point], ring: &mut Vec<usize>, indices: &mut Vec<u32>) {
    let n = ring.len();
    let convex = (0..n).find(|i| {
        let (prev, cur, next) = (ring[(i + n - 1) % n], ring[*i], ring[(i + 1) % n]);
        orient(&vertices[prev], &vertices[cur], &vertices[next]) > 0.
    });

    match convex {
        Some(i) => {
            indices.extend([
                ring[(i + n - 1) % n] as u32,
                ring[i] as u32,
                ring[(i + 1) % n] as u32,
            ]);
            ring.remove(i);
        }
        None => {
            ring.remove(0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locally_inside_convex_corner() {
        let prev = Point::new(0., 0.);
        let at = Point::new(1., 0.);
        let next = Point::new(1., 1.);
        assert!(locally_inside(&prev, &at, &next, &Point::new(0.5, 0.5)));
        assert!(!locally_inside(&prev, &at, &next, &Point::new(2., 0.5)));
    }

    #[test]
    fn test_locally_inside_reflex_corner() {
        let prev = Point::new(0., 0.);
        let at = Point::new(1., 0.);
        let next = Point::new(1., -1.);
        assert!(locally_inside(&prev, &at, &next, &Point::new(2., 0.5)));
        assert!(!locally_inside(&prev, &at, &next, &Point::new(0.5, -0.5)));
    }

    #[test]
    fn test_bridge_ring_layout() {
        let outer = vec![
            Point::new(-2., -2.),
            Point::new(2., -2.),
            Point::new(2., 2.),
            Point::new(-2., 2.),
        ];
        let hole = vec![
            Point::new(-1., -1.),
            Point::new(-1., 1.),
            Point::new(1., 1.),
            Point::new(1., -1.),
        ];
        let ring = bridge_hole(&outer, &hole, 4).unwrap();
        assert_eq!(ring.len(), 10);
        // hole vertex 2 is rightmost and bridges to the nearest corner
        assert_eq!(&ring[..4], &[0, 1, 2, 6]);
        assert_eq!(ring.iter().filter(|id| **id == 6).count(), 2);
    }

    #[test]
    fn test_square_with_hole_area() {
        let outer = vec![
            Point::new(-2., -2.),
            Point::new(2., -2.),
            Point::new(2., 2.),
            Point::new(-2., 2.),
        ];
        let hole = vec![
            Point::new(-1., -1.),
            Point::new(1., -1.),
            Point::new(1., 1.),
            Point::new(-1., 1.),
        ];
        let poly = Polygon::build(outer, Some(hole)).unwrap();
        let t = EarClipper.triangulate(&poly).unwrap();
        assert!(t.triangle_count() <= 8);

        let area: f64 = t
            .indices
            .chunks_exact(3)
            .map(|tri| {
                let [a, b, c] = [0, 1, 2].map(|k| t.vertices[tri[k] as usize]);
                orient(&a, &b, &c) / 2.
            })
            .sum();
        assert!((area - 12.).abs() < 1e-9);
    }
}

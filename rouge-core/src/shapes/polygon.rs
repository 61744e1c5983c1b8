use super::point::{Point, segments_touch};
use crate::error::{GeometryError, Result};
use tracing::trace;

// Rings with less absolute area than this (render space units) are treated
// as collapsed.
const MIN_RING_AREA: f64 = 1e-7;

/// A simple polygon with an optional single hole.
///
/// The outer ring is always counter-clockwise and the hole, when present,
/// always clockwise. Neither ring repeats its first point at the end.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    outer: Vec<Point>,
    hole: Option<Vec<Point>>,
}

impl Polygon {
    /// Builds a polygon from two ordered rings, reversing either ring if its
    /// winding is wrong. A hole that has collapsed, as with a closed mouth,
    /// is dropped: either its area is (near) zero or jitter has folded it
    /// across itself.
    pub fn build(outer: Vec<Point>, hole: Option<Vec<Point>>) -> Result<Polygon> {
        let mut outer = dedup_ring(outer);
        if outer.len() < 3 {
            return Err(GeometryError::InsufficientPoints {
                region: "outer ring".to_string(),
                found: outer.len(),
            });
        }

        let area = signed_area(&outer);
        if area.abs() < MIN_RING_AREA {
            return Err(GeometryError::DegenerateRing {
                region: "outer".to_string(),
            });
        }
        if area < 0. {
            outer.reverse();
        }

        let hole = match hole {
            None => None,
            Some(hole) => {
                let mut hole = dedup_ring(hole);
                if hole.len() < 3 {
                    return Err(GeometryError::InsufficientPoints {
                        region: "inner ring".to_string(),
                        found: hole.len(),
                    });
                }

                let area = signed_area(&hole);
                if area.abs() < MIN_RING_AREA {
                    trace!("Dropping collapsed hole (area {area:e})");
                    None
                } else if !is_simple(&hole) {
                    trace!("Dropping self-intersecting hole (area {area:e})");
                    None
                } else {
                    if area > 0. {
                        hole.reverse();
                    }
                    Some(hole)
                }
            }
        };

        Ok(Polygon { outer, hole })
    }

    pub fn outer(&self) -> &[Point] {
        &self.outer
    }

    pub fn hole(&self) -> Option<&[Point]> {
        self.hole.as_deref()
    }

    pub fn vertices(&self) -> Vec<Point> {
        let mut v = self.outer.clone();
        if let Some(hole) = &self.hole {
            v.extend_from_slice(hole);
        }
        v
    }

    /// Filled area: outer area minus hole area.
    pub fn area(&self) -> f64 {
        signed_area(&self.outer) + self.hole.as_deref().map(signed_area).unwrap_or(0.)
    }
}

/// Shoelace area of a closed ring. Positive for counter-clockwise rings.
pub fn signed_area(ring: &[Point]) -> f64 {
    if ring.len() < 3 {
        return 0.;
    }

    let mut sum = 0.;
    for (i, a) in ring.iter().enumerate() {
        let b = &ring[(i + 1) % ring.len()];
        sum += a.x as f64 * b.y as f64 - b.x as f64 * a.y as f64;
    }
    sum / 2.
}

/// No two non-adjacent edges of the ring cross or touch.
pub fn is_simple(ring: &[Point]) -> bool {
    let n = ring.len();
    for i in 0..n {
        let (a, b) = (&ring[i], &ring[(i + 1) % n]);
        // skip the neighbours that share an endpoint with edge i
        for j in i + 2..n {
            if i == 0 && j == n - 1 {
                continue;
            }
            if segments_touch(a, b, &ring[j], &ring[(j + 1) % n]) {
                return false;
            }
        }
    }
    true
}

fn dedup_ring(mut ring: Vec<Point>) -> Vec<Point> {
    ring.dedup();
    while ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }
    ring
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pts(coords: &[(f32, f32)]) -> Vec<Point> {
        coords.iter().map(|(x, y)| Point::new(*x, *y)).collect()
    }

    #[test]
    fn test_clockwise_square_is_reversed() {
        let cw = pts(&[(0., 0.), (0., 1.), (1., 1.), (1., 0.)]);
        assert!(signed_area(&cw) < 0.);

        let poly = Polygon::build(cw.clone(), None).unwrap();
        assert!(signed_area(poly.outer()) > 0.);
        let mut expected = cw;
        expected.reverse();
        assert_eq!(poly.outer(), expected.as_slice());
        assert!(poly.hole().is_none());
    }

    #[test]
    fn test_winding_normalized_for_every_orientation() {
        let outer = pts(&[(-2., -2.), (2., -2.), (2., 2.), (-2., 2.)]);
        let inner = pts(&[(-1., -1.), (1., -1.), (1., 1.), (-1., 1.)]);

        for flip_outer in [false, true] {
            for flip_inner in [false, true] {
                let mut o = outer.clone();
                let mut h = inner.clone();
                if flip_outer {
                    o.reverse();
                }
                if flip_inner {
                    h.reverse();
                }

                let poly = Polygon::build(o, Some(h)).unwrap();
                assert!(signed_area(poly.outer()) > 0.);
                assert!(signed_area(poly.hole().unwrap()) < 0.);
                assert!((poly.area() - 12.).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_insufficient_points() {
        let outer = pts(&[(0., 0.), (1., 0.)]);
        assert!(matches!(
            Polygon::build(outer, None),
            Err(GeometryError::InsufficientPoints { found: 2, .. })
        ));

        let outer = pts(&[(0., 0.), (1., 0.), (0., 1.)]);
        let hole = pts(&[(0.1, 0.1), (0.2, 0.1)]);
        assert!(matches!(
            Polygon::build(outer, Some(hole)),
            Err(GeometryError::InsufficientPoints { found: 2, .. })
        ));
    }

    #[test]
    fn test_repeated_points_collapse() {
        let outer = pts(&[(0., 0.), (0., 0.), (1., 0.), (0., 1.), (0., 0.)]);
        let poly = Polygon::build(outer, None).unwrap();
        assert_eq!(poly.outer().len(), 3);
    }

    #[test]
    fn test_collinear_outer_is_degenerate() {
        let outer = pts(&[(0., 0.), (1., 1.), (2., 2.)]);
        assert!(matches!(
            Polygon::build(outer, None),
            Err(GeometryError::DegenerateRing { .. })
        ));
    }

    #[test]
    fn test_folded_hole_is_dropped() {
        let outer = pts(&[(-2., -1.), (2., -1.), (2., 1.), (-2., 1.)]);
        // unequal lobes crossing at the origin, so the net area is not zero
        let hole = pts(&[(-1., -0.2), (-1., 0.2), (0.5, -0.1), (0.5, 0.1)]);
        assert!(signed_area(&hole).abs() > 0.1);
        assert!(!is_simple(&hole));

        let poly = Polygon::build(outer, Some(hole)).unwrap();
        assert!(poly.hole().is_none());
        assert!((poly.area() - 8.).abs() < 1e-9);
    }

    #[test]
    fn test_is_simple() {
        assert!(is_simple(&pts(&[(0., 0.), (1., 0.), (0., 1.)])));
        assert!(is_simple(&pts(&[(0., 0.), (1., 0.), (1., 1.), (0., 1.)])));
        assert!(!is_simple(&pts(&[(0., 0.), (1., 1.), (1., 0.), (0., 1.)])));
    }

    #[test]
    fn test_closed_hole_is_dropped() {
        let outer = pts(&[(-2., -1.), (2., -1.), (2., 1.), (-2., 1.)]);
        let hole = pts(&[(-1., 0.), (0., 0.), (1., 0.), (0., 0.)]);
        let poly = Polygon::build(outer, Some(hole)).unwrap();
        assert!(poly.hole().is_none());
    }
}

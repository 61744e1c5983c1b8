use serde::{Deserialize, Serialize};
use tracing::trace;

pub const FACE_MESH_POINTS: usize = 468;

/// A single detected facial point. `x` and `y` are normalized image
/// coordinates in [0, 1] with the origin at the top left; `z` is relative
/// depth.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Builds landmarks from a flat `[x0, y0, z0, x1, ...]` buffer. A
    /// trailing partial triple is ignored.
    pub fn from_flat(coords: &[f32]) -> Vec<Self> {
        coords
            .chunks_exact(3)
            .map(|c| Self::new(c[0], c[1], c[2]))
            .collect()
    }
}

/// Exponential moving average over every landmark coordinate.
///
/// The filtered set persists for the life of the smoother. The first frame,
/// or any frame whose point count differs from the stored state, seeds the
/// state with an exact copy of the input. A non-finite input coordinate
/// leaves the stored one as it was, and a non-finite stored coordinate is
/// reseeded from the next finite input.
#[derive(Debug, Clone)]
pub struct LandmarkSmoother {
    alpha: f32,
    state: Option<Vec<Landmark>>,
}

impl LandmarkSmoother {
    pub fn new(alpha: f32) -> Self {
        Self { alpha, state: None }
    }

    pub fn smooth(&mut self, latest: &[Landmark]) -> &[Landmark] {
        match self.state.as_mut() {
            Some(state) if state.len() == latest.len() => {
                for (s, l) in state.iter_mut().zip(latest) {
                    s.x = blend(s.x, l.x, self.alpha);
                    s.y = blend(s.y, l.y, self.alpha);
                    s.z = blend(s.z, l.z, self.alpha);
                }
            }
            _ => {
                trace!("Seeding smoothed landmarks with {} points", latest.len());
                self.state = Some(latest.to_vec());
            }
        }

        self.state.as_deref().unwrap_or_default()
    }

    pub fn current(&self) -> Option<&[Landmark]> {
        self.state.as_deref()
    }

    pub fn reset(&mut self) {
        self.state = None;
    }
}

fn blend(held: f32, latest: f32, alpha: f32) -> f32 {
    if !latest.is_finite() {
        held
    } else if !held.is_finite() {
        latest
    } else {
        held * (1. - alpha) + latest * alpha
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(x: f32) -> Vec<Landmark> {
        vec![Landmark::new(x, x, x)]
    }

    #[test]
    fn test_first_frame_is_copied() {
        let mut smoother = LandmarkSmoother::new(0.4);
        let input = vec![Landmark::new(0.1, 0.2, 0.3), Landmark::new(0.9, 0.8, -0.1)];
        assert_eq!(smoother.smooth(&input), input.as_slice());
    }

    #[test]
    fn test_blend_sequence() {
        let mut smoother = LandmarkSmoother::new(0.4);
        smoother.smooth(&single(0.));

        let expected = [0.4, 0.64, 0.784, 0.8704];
        for e in expected {
            let x = smoother.smooth(&single(1.))[0].x;
            assert!((x - e).abs() < 1e-5, "{x} != {e}");
        }
    }

    #[test]
    fn test_converges_without_overshoot() {
        let alpha: f32 = 0.4;
        let mut smoother = LandmarkSmoother::new(alpha);
        smoother.smooth(&single(0.));

        let eps: f32 = 1e-3;
        let bound = (eps.ln() / (1. - alpha).ln()).ceil() as usize;
        let mut last = 0.;
        for _ in 0..bound {
            let x = smoother.smooth(&single(1.))[0].x;
            assert!(x <= 1.);
            assert!(x >= last);
            last = x;
        }
        assert!((1. - last) <= eps);
    }

    #[test]
    fn test_length_change_reseeds() {
        let mut smoother = LandmarkSmoother::new(0.4);
        smoother.smooth(&single(0.));
        let longer = vec![Landmark::new(1., 1., 1.); 2];
        assert_eq!(smoother.smooth(&longer), longer.as_slice());
    }

    #[test]
    fn test_non_finite_input_does_not_stick() {
        let mut smoother = LandmarkSmoother::new(0.4);
        smoother.smooth(&single(0.5));

        let held = smoother.smooth(&single(f32::NAN))[0];
        assert_eq!(held, Landmark::new(0.5, 0.5, 0.5));

        let x = smoother.smooth(&single(1.))[0].x;
        assert!((x - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_non_finite_seed_is_replaced() {
        let mut smoother = LandmarkSmoother::new(0.4);
        smoother.smooth(&[Landmark::new(f32::INFINITY, 0., 0.)]);
        let l = smoother.smooth(&single(0.25))[0];
        assert_eq!(l.x, 0.25);
        assert!(l.is_finite());
    }

    #[test]
    fn test_reset() {
        let mut smoother = LandmarkSmoother::new(0.4);
        smoother.smooth(&single(0.));
        smoother.reset();
        assert!(smoother.current().is_none());
        assert_eq!(smoother.smooth(&single(1.))[0].x, 1.);
    }

    #[test]
    fn test_from_flat() {
        let lms = Landmark::from_flat(&[0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7]);
        assert_eq!(lms.len(), 2);
        assert_eq!(lms[1], Landmark::new(0.4, 0.5, 0.6));
    }
}

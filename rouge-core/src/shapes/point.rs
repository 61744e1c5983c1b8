use serde::Serialize;

/// A 2D point in render space: x in [-aspect, aspect], y in [-1, 1], y up.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Point {
        Point { x, y }
    }

    pub fn dist(&self, o: &Point) -> f32 {
        (self.x - o.x).hypot(self.y - o.y)
    }

    pub fn rotate(&self, origin: Point, theta: f32) -> Point {
        let x = self.x - origin.x;
        let y = self.y - origin.y;

        Point {
            x: x * theta.cos() - y * theta.sin() + origin.x,
            y: x * theta.sin() + y * theta.cos() + origin.y,
        }
    }

    fn coord(&self) -> robust::Coord<f32> {
        robust::Coord {
            x: self.x,
            y: self.y,
        }
    }
}

/// Twice the signed area of triangle abc. Positive when a, b, c turn
/// counter-clockwise.
pub fn orient(a: &Point, b: &Point, c: &Point) -> f64 {
    robust::orient2d(a.coord(), b.coord(), c.coord())
}

/// Segments ab and cd cross or touch.
pub fn segments_touch(a: &Point, b: &Point, c: &Point, d: &Point) -> bool {
    let o1 = orient(a, b, c);
    let o2 = orient(a, b, d);
    let o3 = orient(c, d, a);
    let o4 = orient(c, d, b);

    if o1 * o2 < 0. && o3 * o4 < 0. {
        return true;
    }

    (o1 == 0. && on_segment(a, b, c))
        || (o2 == 0. && on_segment(a, b, d))
        || (o3 == 0. && on_segment(c, d, a))
        || (o4 == 0. && on_segment(c, d, b))
}

// p is collinear with ab; is it within the segment's bounds
fn on_segment(a: &Point, b: &Point, p: &Point) -> bool {
    p.x >= a.x.min(b.x) && p.x <= a.x.max(b.x) && p.y >= a.y.min(b.y) && p.y <= a.y.max(b.y)
}

#[test]
fn test_orient() {
    let a = Point::new(0., 0.);
    let b = Point::new(1., 0.);
    let c = Point::new(0., 1.);
    assert!(orient(&a, &b, &c) > 0.);
    assert!(orient(&a, &c, &b) < 0.);
    assert_eq!(orient(&a, &b, &Point::new(2., 0.)), 0.);
}

#[test]
fn test_rotate() {
    let p = Point::new(1., 0.).rotate(Point::default(), std::f32::consts::FRAC_PI_2);
    assert!(p.x.abs() < 1e-6);
    assert!((p.y - 1.).abs() < 1e-6);
}

#[test]
fn test_segments_touch() {
    let a = Point::new(0., 0.);
    let b = Point::new(2., 2.);
    assert!(segments_touch(&a, &b, &Point::new(0., 2.), &Point::new(2., 0.)));
    assert!(segments_touch(&a, &b, &Point::new(1., 1.), &Point::new(3., 0.)));
    assert!(!segments_touch(&a, &b, &Point::new(3., 0.), &Point::new(4., 1.)));
}

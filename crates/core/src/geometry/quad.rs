//! Oriented bounding quadrilaterals.
//!
//! A [`Quad`] keeps its four corners explicitly so rotated text keeps its
//! reading direction: the baseline runs from `bottom_left` to `bottom_right`
//! and the glyph rises from `bottom_left` towards `top_left`.

use serde::{Deserialize, Serialize};

use super::{Point, Rect};
use crate::utils::{DEFAULT_EPSILON, approx_eq, bound_angle_180};

/// Reading orientation of a quad's baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Orientation {
    /// Anything that is not axis aligned.
    #[default]
    Other,
    Horizontal,
    Rotate90,
    Rotate180,
    Rotate270,
}

impl Orientation {
    pub fn is_axis_aligned(self) -> bool {
        !matches!(self, Orientation::Other)
    }

    /// Unit baseline direction for axis-aligned orientations.
    pub fn direction(self) -> Option<Point> {
        match self {
            Orientation::Horizontal => Some(Point::new(1.0, 0.0)),
            Orientation::Rotate90 => Some(Point::new(0.0, 1.0)),
            Orientation::Rotate180 => Some(Point::new(-1.0, 0.0)),
            Orientation::Rotate270 => Some(Point::new(0.0, -1.0)),
            Orientation::Other => None,
        }
    }
}

/// Four-corner oriented bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Quad {
    pub bottom_left: Point,
    pub top_left: Point,
    pub top_right: Point,
    pub bottom_right: Point,
}

impl Quad {
    pub fn new(bottom_left: Point, top_left: Point, top_right: Point, bottom_right: Point) -> Self {
        Self {
            bottom_left,
            top_left,
            top_right,
            bottom_right,
        }
    }

    /// Axis-aligned quad with an upright (y-up) baseline.
    pub fn from_ltrb(left: f64, bottom: f64, right: f64, top: f64) -> Self {
        Self::new(
            Point::new(left, bottom),
            Point::new(left, top),
            Point::new(right, top),
            Point::new(right, bottom),
        )
    }

    pub fn from_rect(r: &Rect) -> Self {
        Self::from_ltrb(r.x.min, r.y.min, r.x.max, r.y.max)
    }

    pub fn corners(&self) -> [Point; 4] {
        [self.bottom_left, self.top_left, self.top_right, self.bottom_right]
    }

    pub fn left(&self) -> f64 {
        self.corners().iter().fold(f64::INFINITY, |acc, p| acc.min(p.x))
    }

    pub fn right(&self) -> f64 {
        self.corners().iter().fold(f64::NEG_INFINITY, |acc, p| acc.max(p.x))
    }

    pub fn bottom(&self) -> f64 {
        self.corners().iter().fold(f64::INFINITY, |acc, p| acc.min(p.y))
    }

    pub fn top(&self) -> f64 {
        self.corners().iter().fold(f64::NEG_INFINITY, |acc, p| acc.max(p.y))
    }

    /// Width of the axis-aligned envelope.
    pub fn width(&self) -> f64 {
        self.right() - self.left()
    }

    /// Height of the axis-aligned envelope.
    pub fn height(&self) -> f64 {
        self.top() - self.bottom()
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_corners(self.left(), self.bottom(), self.right(), self.top())
    }

    /// Baseline angle in radians. A zero-length baseline falls back to the
    /// left edge rotated by -90 degrees.
    pub fn t(&self) -> f64 {
        if self.bottom_right == self.bottom_left {
            let d = self.top_left - self.bottom_left;
            return d.y.atan2(d.x) - std::f64::consts::FRAC_PI_2;
        }
        let d = self.bottom_right - self.bottom_left;
        d.y.atan2(d.x)
    }

    /// Baseline angle in degrees.
    pub fn rotation(&self) -> f64 {
        self.t().to_degrees()
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation_eps(DEFAULT_EPSILON)
    }

    pub fn orientation_eps(&self, epsilon: f64) -> Orientation {
        let (bl, br) = (self.bottom_left, self.bottom_right);
        if approx_eq(bl.y, br.y, epsilon) {
            if bl.x > br.x {
                return Orientation::Rotate180;
            }
            return Orientation::Horizontal;
        }
        if approx_eq(bl.x, br.x, epsilon) {
            if bl.y > br.y {
                return Orientation::Rotate270;
            }
            return Orientation::Rotate90;
        }
        Orientation::Other
    }

    pub fn centroid(&self) -> Point {
        let sum = self.bottom_left + self.top_left + self.top_right + self.bottom_right;
        sum * 0.25
    }

    pub fn baseline_length(&self) -> f64 {
        self.bottom_left.distance(self.bottom_right)
    }

    /// Length of the left edge.
    pub fn glyph_height(&self) -> f64 {
        self.bottom_left.distance(self.top_left)
    }

    pub fn approx_eq(&self, other: &Quad, epsilon: f64) -> bool {
        self.corners()
            .iter()
            .zip(other.corners().iter())
            .all(|(a, b)| a.approx_eq(*b, epsilon))
    }
}

/// Operations over a collection of quads.
pub trait Quads {
    /// Common orientation, or `Other` when empty or mixed.
    fn orientation(&self) -> Orientation {
        self.orientation_eps(DEFAULT_EPSILON)
    }

    fn orientation_eps(&self, epsilon: f64) -> Orientation;

    /// Axis-aligned envelope of every quad.
    fn normalize(&self) -> Quad;

    /// Smallest quad in the collection's reading frame containing every quad.
    ///
    /// Same-orientation axis-aligned quads get their envelope in that frame.
    /// Anything else gets a least-squares baseline direction fitted through
    /// the baseline endpoints; of the four labelings of the fitted box, the one
    /// closest to the first-to-last baseline angle is kept.
    fn union(&self) -> Quad {
        self.union_eps(DEFAULT_EPSILON)
    }

    /// [`Quads::union`] with orientations classified within `epsilon`.
    fn union_eps(&self, epsilon: f64) -> Quad;
}

impl Quads for [Quad] {
    fn orientation_eps(&self, epsilon: f64) -> Orientation {
        let Some(first) = self.first() else {
            return Orientation::Other;
        };
        let orientation = first.orientation_eps(epsilon);
        if self[1..].iter().any(|q| q.orientation_eps(epsilon) != orientation) {
            return Orientation::Other;
        }
        orientation
    }

    fn normalize(&self) -> Quad {
        if self.is_empty() {
            return Quad::default();
        }
        let (mut l, mut b, mut r, mut t) = (
            f64::INFINITY,
            f64::INFINITY,
            f64::NEG_INFINITY,
            f64::NEG_INFINITY,
        );
        for q in self {
            l = l.min(q.left());
            b = b.min(q.bottom());
            r = r.max(q.right());
            t = t.max(q.top());
        }
        Quad::from_ltrb(l, b, r, t)
    }

    fn union_eps(&self, epsilon: f64) -> Quad {
        match self {
            [] => Quad::default(),
            [q] => *q,
            _ => {
                let dir = self
                    .orientation_eps(epsilon)
                    .direction()
                    .unwrap_or_else(|| fitted_direction(self));
                project_envelope(self, dir)
            }
        }
    }
}

/// Least-squares baseline direction, relabeled to best match the reading
/// direction from the first quad's start to the last quad's end.
fn fitted_direction(quads: &[Quad]) -> Point {
    let n = (quads.len() * 2) as f64;
    let (mut sx, mut sy) = (0.0, 0.0);
    for q in quads {
        sx += q.bottom_left.x + q.bottom_right.x;
        sy += q.bottom_left.y + q.bottom_right.y;
    }
    let (mx, my) = (sx / n, sy / n);

    let (mut sxy, mut sxx) = (0.0, 0.0);
    for q in quads {
        for p in [q.bottom_left, q.bottom_right] {
            let (dx, dy) = (p.x - mx, p.y - my);
            sxy += dx * dy;
            sxx += dx * dx;
        }
    }

    let fitted = if sxx > 1e-3 {
        let angle = (sxy / sxx).atan();
        Point::new(angle.cos(), angle.sin())
    } else {
        Point::new(0.0, 1.0)
    };

    let first = quads[0];
    let last = quads[quads.len() - 1];
    let reading = last.bottom_right - first.bottom_left;
    let target = if reading.norm() > 0.0 {
        reading.y.atan2(reading.x).to_degrees()
    } else {
        first.rotation()
    };

    let candidates = [fitted, fitted.ortho(), -fitted, -fitted.ortho()];
    let mut best = candidates[0];
    let mut best_delta = f64::INFINITY;
    for c in candidates {
        let delta = bound_angle_180(c.y.atan2(c.x).to_degrees() - target).abs();
        if delta < best_delta {
            best_delta = delta;
            best = c;
        }
    }
    best
}

/// Envelope of all corners in the frame spanned by `dir` and its normal. The
/// normal points from baseline to top as seen on the first quad, so the
/// result is correct for both y-up and y-down coordinate systems.
fn project_envelope(quads: &[Quad], dir: Point) -> Quad {
    let rise = quads[0].top_left - quads[0].bottom_left;
    let normal = if dir.cross(rise) < 0.0 {
        -dir.ortho()
    } else {
        dir.ortho()
    };

    let (mut umin, mut umax) = (f64::INFINITY, f64::NEG_INFINITY);
    let (mut vmin, mut vmax) = (f64::INFINITY, f64::NEG_INFINITY);
    for p in quads.iter().flat_map(|q| q.corners()) {
        let u = p.dot(dir);
        let v = p.dot(normal);
        umin = umin.min(u);
        umax = umax.max(u);
        vmin = vmin.min(v);
        vmax = vmax.max(v);
    }

    let at = |u: f64, v: f64| dir * u + normal * v;
    Quad::new(at(umin, vmin), at(umin, vmax), at(umax, vmax), at(umax, vmin))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orientation_classes() {
        assert_eq!(Quad::from_ltrb(0.0, 0.0, 5.0, 2.0).orientation(), Orientation::Horizontal);
        let upside_down = Quad::new(
            Point::new(5.0, 2.0),
            Point::new(5.0, 0.0),
            Point::new(0.0, 0.0),
            Point::new(0.0, 2.0),
        );
        assert_eq!(upside_down.orientation(), Orientation::Rotate180);
        let up = Quad::new(
            Point::new(2.0, 0.0),
            Point::new(0.0, 0.0),
            Point::new(0.0, 5.0),
            Point::new(2.0, 5.0),
        );
        assert_eq!(up.orientation(), Orientation::Rotate90);
        let skew = Quad::new(
            Point::new(0.0, 0.0),
            Point::new(-1.0, 2.0),
            Point::new(3.0, 4.0),
            Point::new(4.0, 2.0),
        );
        assert_eq!(skew.orientation(), Orientation::Other);
    }

    #[test]
    fn rotation_of_degenerate_baseline_uses_left_edge() {
        let q = Quad::new(
            Point::new(1.0, 1.0),
            Point::new(1.0, 3.0),
            Point::new(1.0, 3.0),
            Point::new(1.0, 1.0),
        );
        assert!(q.rotation().abs() < 1e-9);
    }

    #[test]
    fn horizontal_union_is_envelope() {
        let quads = [
            Quad::from_ltrb(0.0, 0.0, 3.0, 5.0),
            Quad::from_ltrb(3.0, -1.0, 6.0, 4.0),
        ];
        assert!(quads.union().approx_eq(&Quad::from_ltrb(0.0, -1.0, 6.0, 5.0), 1e-9));
    }

    #[test]
    fn rotated_180_union_keeps_reading_direction() {
        let flip = |l: f64, b: f64, r: f64, t: f64| {
            Quad::new(
                Point::new(r, t),
                Point::new(r, b),
                Point::new(l, b),
                Point::new(l, t),
            )
        };
        let quads = [flip(6.0, 0.0, 9.0, 5.0), flip(3.0, 0.0, 6.0, 5.0)];
        let u = quads.union();
        assert!(u.approx_eq(&flip(3.0, 0.0, 9.0, 5.0), 1e-9));
        assert_eq!(u.orientation(), Orientation::Rotate180);
    }
}

use serde::{Deserialize, Serialize};

use super::{Point, Quad, Rect};

/// A 2D affine transform.
///
/// Maps `(x, y)` to `(a*x + c*y + e, b*x + d*y + f)`. Composition follows the
/// row-vector convention: `m1.concat(&m2)` applies `m1` first, then `m2`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0);

    pub const fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub const fn translate(tx: f64, ty: f64) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    pub const fn scale(sx: f64, sy: f64) -> Self {
        Self::new(sx, 0.0, 0.0, sy, 0.0, 0.0)
    }

    /// Counter-clockwise rotation by `degrees`.
    pub fn rotate(degrees: f64) -> Self {
        let (s, c) = degrees.to_radians().sin_cos();
        Self::new(c, s, -s, c, 0.0, 0.0)
    }

    /// Applies `self`, then `other`.
    pub fn concat(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    /// Same linear part with the translation replaced.
    pub fn with_translation(&self, e: f64, f: f64) -> Matrix {
        Matrix { e, f, ..*self }
    }

    pub fn determinant(&self) -> f64 {
        self.a * self.d - self.b * self.c
    }

    /// Inverse transform, `None` for singular matrices.
    pub fn invert(&self) -> Option<Matrix> {
        let det = self.determinant();
        if det.abs() < f64::EPSILON || !det.is_finite() {
            return None;
        }
        Some(Matrix {
            a: self.d / det,
            b: -self.b / det,
            c: -self.c / det,
            d: self.a / det,
            e: (self.c * self.f - self.d * self.e) / det,
            f: (self.b * self.e - self.a * self.f) / det,
        })
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// Average scale factor of the linear part.
    pub fn expansion(&self) -> f64 {
        self.determinant().abs().sqrt()
    }

    pub fn transform_point(&self, p: Point) -> Point {
        Point::new(
            self.a * p.x + self.c * p.y + self.e,
            self.b * p.x + self.d * p.y + self.f,
        )
    }

    /// Transforms a direction; translation is ignored.
    pub fn transform_vector(&self, v: Point) -> Point {
        Point::new(self.a * v.x + self.c * v.y, self.b * v.x + self.d * v.y)
    }

    /// Bounding box of the transformed corners. Empty stays empty.
    pub fn transform_rect(&self, r: &Rect) -> Rect {
        if r.x.is_empty() || r.y.is_empty() {
            return Rect::empty();
        }
        Rect::from_points(r.corners().map(|p| self.transform_point(p)))
    }

    pub fn transform_quad(&self, q: &Quad) -> Quad {
        Quad {
            bottom_left: self.transform_point(q.bottom_left),
            top_left: self.transform_point(q.top_left),
            top_right: self.transform_point(q.top_right),
            bottom_right: self.transform_point(q.bottom_right),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concat_applies_left_first() {
        let m = Matrix::scale(2.0, 3.0).concat(&Matrix::translate(10.0, 20.0));
        assert_eq!(m.transform_point(Point::new(1.0, 1.0)), Point::new(12.0, 23.0));
    }

    #[test]
    fn invert_round_trips() {
        let m = Matrix::rotate(30.0)
            .concat(&Matrix::scale(2.0, 0.5))
            .concat(&Matrix::translate(-4.0, 7.0));
        let inv = m.invert().unwrap();
        let p = Point::new(3.5, -1.25);
        let back = inv.transform_point(m.transform_point(p));
        assert!(back.approx_eq(p, 1e-9));
    }

    #[test]
    fn singular_has_no_inverse() {
        assert!(Matrix::scale(0.0, 1.0).invert().is_none());
    }
}

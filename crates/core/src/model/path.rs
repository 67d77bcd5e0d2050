//! Vector paths and stroke styles.

use serde::{Deserialize, Serialize};

use crate::geometry::{Matrix, Point, Rect};

/// Path segment for graphics operations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PathSegment {
    /// Start a new subpath at the point
    MoveTo(Point),
    /// Straight line to the point
    LineTo(Point),
    /// Quadratic bezier (control, end)
    QuadTo(Point, Point),
    /// Cubic bezier (control 1, control 2, end)
    CurveTo(Point, Point, Point),
    /// Close the current subpath
    Close,
}

impl PathSegment {
    /// Number of points carried by the segment.
    pub fn point_count(&self) -> usize {
        match self {
            PathSegment::MoveTo(_) | PathSegment::LineTo(_) => 1,
            PathSegment::QuadTo(..) => 2,
            PathSegment::CurveTo(..) => 3,
            PathSegment::Close => 0,
        }
    }
}

/// A sequence of path segments in user space.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Path {
    pub segments: Vec<PathSegment>,
}

impl Path {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn move_to(&mut self, x: f64, y: f64) -> &mut Self {
        self.segments.push(PathSegment::MoveTo(Point::new(x, y)));
        self
    }

    pub fn line_to(&mut self, x: f64, y: f64) -> &mut Self {
        self.segments.push(PathSegment::LineTo(Point::new(x, y)));
        self
    }

    pub fn quad_to(&mut self, cx: f64, cy: f64, x: f64, y: f64) -> &mut Self {
        self.segments
            .push(PathSegment::QuadTo(Point::new(cx, cy), Point::new(x, y)));
        self
    }

    pub fn curve_to(&mut self, c1: Point, c2: Point, end: Point) -> &mut Self {
        self.segments.push(PathSegment::CurveTo(c1, c2, end));
        self
    }

    pub fn close(&mut self) -> &mut Self {
        self.segments.push(PathSegment::Close);
        self
    }

    /// Closed rectangle path.
    pub fn from_rect(r: &Rect) -> Self {
        let mut p = Path::new();
        p.move_to(r.x.min, r.y.min)
            .line_to(r.x.max, r.y.min)
            .line_to(r.x.max, r.y.max)
            .line_to(r.x.min, r.y.max)
            .close();
        p
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn points(&self) -> impl Iterator<Item = Point> + '_ {
        self.segments.iter().flat_map(|s| {
            let pts: smallvec::SmallVec<[Point; 3]> = match *s {
                PathSegment::MoveTo(p) | PathSegment::LineTo(p) => smallvec::smallvec![p],
                PathSegment::QuadTo(c, p) => smallvec::smallvec![c, p],
                PathSegment::CurveTo(c1, c2, p) => smallvec::smallvec![c1, c2, p],
                PathSegment::Close => smallvec::SmallVec::new(),
            };
            pts
        })
    }

    /// Bounds of all points including curve control points.
    pub fn bounds(&self) -> Rect {
        Rect::from_points(self.points())
    }

    pub fn transform(&self, m: &Matrix) -> Path {
        let t = |p: Point| m.transform_point(p);
        Path {
            segments: self
                .segments
                .iter()
                .map(|s| match *s {
                    PathSegment::MoveTo(p) => PathSegment::MoveTo(t(p)),
                    PathSegment::LineTo(p) => PathSegment::LineTo(t(p)),
                    PathSegment::QuadTo(c, p) => PathSegment::QuadTo(t(c), t(p)),
                    PathSegment::CurveTo(c1, c2, p) => PathSegment::CurveTo(t(c1), t(c2), t(p)),
                    PathSegment::Close => PathSegment::Close,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FillRule {
    EvenOdd,
    #[default]
    Winding,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LineJoin {
    #[default]
    Miter,
    Round,
    Bevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LineCap {
    #[default]
    Butt,
    Round,
    Square,
    Triangle,
}

/// Stroke style.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub start_cap: LineCap,
    pub dash_cap: LineCap,
    pub end_cap: LineCap,
    pub line_join: LineJoin,
    pub line_width: f64,
    pub miter_limit: f64,
    pub dash_phase: f64,
    pub dashes: Vec<f64>,
}

impl Default for Stroke {
    fn default() -> Self {
        Self {
            start_cap: LineCap::Butt,
            dash_cap: LineCap::Butt,
            end_cap: LineCap::Butt,
            line_join: LineJoin::Miter,
            line_width: 1.0,
            miter_limit: 10.0,
            dash_phase: 0.0,
            dashes: Vec::new(),
        }
    }
}

impl Stroke {
    pub fn with_width(line_width: f64) -> Self {
        Self {
            line_width,
            ..Self::default()
        }
    }

    /// Half the line width, the distance strokes extend beyond the path.
    pub fn half_width(&self) -> f64 {
        self.line_width.abs() * 0.5
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_include_control_points() {
        let mut p = Path::new();
        p.move_to(0.0, 0.0)
            .curve_to(Point::new(1.0, 5.0), Point::new(2.0, -3.0), Point::new(4.0, 0.0));
        let b = p.bounds();
        assert_eq!(b, Rect::from_corners(0.0, -3.0, 4.0, 5.0));
    }

    #[test]
    fn transform_moves_every_point() {
        let p = Path::from_rect(&Rect::from_xywh(0.0, 0.0, 1.0, 1.0));
        let moved = p.transform(&Matrix::translate(2.0, 3.0));
        assert_eq!(moved.bounds(), Rect::from_xywh(2.0, 3.0, 1.0, 1.0));
        assert_eq!(moved.segments.len(), 5);
    }
}

//! Axis-aligned ranges and rectangles.
//!
//! A [`Range`] is empty when its length is at most `DEFAULT_EPSILON`, which
//! covers both inverted and zero-length ranges. A [`Rect`] is empty when
//! either axis is; operations that produce an empty axis collapse the whole
//! rectangle to [`Rect::empty`].

use serde::{Deserialize, Serialize};

use super::Point;
use crate::utils::DEFAULT_EPSILON;

/// A closed 1D interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Default for Range {
    fn default() -> Self {
        Self::empty()
    }
}

impl Range {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub const fn empty() -> Self {
        Self { min: 1.0, max: 0.0 }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.length() <= DEFAULT_EPSILON
    }

    /// `max - min`; negative for empty ranges.
    #[inline]
    pub fn length(&self) -> f64 {
        self.max - self.min
    }

    pub fn center(&self) -> f64 {
        (self.min + self.max) * 0.5
    }

    pub fn contains(&self, v: f64) -> bool {
        self.min <= v && v <= self.max
    }

    pub fn interior_contains(&self, v: f64) -> bool {
        self.min < v && v < self.max
    }

    pub fn contains_range(&self, other: &Range) -> bool {
        if other.is_empty() {
            return true;
        }
        self.min <= other.min && other.max <= self.max
    }

    pub fn interior_contains_range(&self, other: &Range) -> bool {
        if other.is_empty() {
            return true;
        }
        self.min < other.min && other.max < self.max
    }

    pub fn intersects(&self, other: &Range) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        self.min.max(other.min) <= self.max.min(other.max)
    }

    pub fn interior_intersects(&self, other: &Range) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        other.min < self.max && self.min < other.max
    }

    /// Empty ranges are neutral.
    pub fn union(&self, other: &Range) -> Range {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Range::new(self.min.min(other.min), self.max.max(other.max))
    }

    pub fn intersection(&self, other: &Range) -> Range {
        let r = Range::new(self.min.max(other.min), self.max.min(other.max));
        if r.is_empty() { Range::empty() } else { r }
    }

    /// Widens both ends by `margin` (shrinks for negative margins). Empty
    /// ranges stay empty.
    pub fn expanded(&self, margin: f64) -> Range {
        if self.is_empty() {
            return *self;
        }
        let r = Range::new(self.min - margin, self.max + margin);
        if r.is_empty() { Range::empty() } else { r }
    }
}

/// Axis-aligned rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: Range,
    pub y: Range,
}

impl Rect {
    pub const fn empty() -> Self {
        Self {
            x: Range::empty(),
            y: Range::empty(),
        }
    }

    /// Builds a rectangle from two opposite corners in any order.
    pub fn from_corners(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self {
            x: Range::new(x0.min(x1), x0.max(x1)),
            y: Range::new(y0.min(y1), y0.max(y1)),
        }
    }

    pub fn from_xywh(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self::from_corners(x, y, x + w, y + h)
    }

    /// Smallest rectangle containing every point, empty for no points.
    ///
    /// Collinear points give a zero-width side, which [`Rect::is_valid`]
    /// rejects.
    pub fn from_points<I: IntoIterator<Item = Point>>(points: I) -> Self {
        let mut points = points.into_iter();
        let Some(first) = points.next() else {
            return Rect::empty();
        };
        let (mut x, mut y) = (Range::new(first.x, first.x), Range::new(first.y, first.y));
        for p in points {
            x = Range::new(x.min.min(p.x), x.max.max(p.x));
            y = Range::new(y.min.min(p.y), y.max.max(p.y));
        }
        Rect { x, y }
    }

    /// Width is empty iff height is empty.
    pub fn is_valid(&self) -> bool {
        self.x.is_empty() == self.y.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty() || self.y.is_empty()
    }

    pub fn width(&self) -> f64 {
        self.x.length()
    }

    pub fn height(&self) -> f64 {
        self.y.length()
    }

    pub fn size(&self) -> Point {
        Point::new(self.width(), self.height())
    }

    pub fn min(&self) -> Point {
        Point::new(self.x.min, self.y.min)
    }

    pub fn max(&self) -> Point {
        Point::new(self.x.max, self.y.max)
    }

    pub fn center(&self) -> Point {
        Point::new(self.x.center(), self.y.center())
    }

    /// Rectangles are closed: the boundary is contained.
    pub fn contains_point(&self, p: Point) -> bool {
        self.x.contains(p.x) && self.y.contains(p.y)
    }

    pub fn interior_contains_point(&self, p: Point) -> bool {
        self.x.interior_contains(p.x) && self.y.interior_contains(p.y)
    }

    pub fn contains(&self, other: &Rect) -> bool {
        self.x.contains_range(&other.x) && self.y.contains_range(&other.y)
    }

    pub fn interior_contains(&self, other: &Rect) -> bool {
        self.x.interior_contains_range(&other.x) && self.y.interior_contains_range(&other.y)
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.x.intersects(&other.x) && self.y.intersects(&other.y)
    }

    pub fn interior_intersects(&self, other: &Rect) -> bool {
        self.x.interior_intersects(&other.x) && self.y.interior_intersects(&other.y)
    }

    /// Axis-wise union; an empty rectangle is neutral.
    pub fn union(&self, other: &Rect) -> Rect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Rect {
            x: self.x.union(&other.x),
            y: self.y.union(&other.y),
        }
    }

    pub fn intersection(&self, other: &Rect) -> Rect {
        let x = self.x.intersection(&other.x);
        let y = self.y.intersection(&other.y);
        if x.is_empty() || y.is_empty() {
            return Rect::empty();
        }
        Rect { x, y }
    }

    /// Expands each axis by the matching margin component. If either axis
    /// becomes empty the whole rectangle is empty.
    pub fn expanded(&self, margin: Point) -> Rect {
        let x = self.x.expanded(margin.x);
        let y = self.y.expanded(margin.y);
        if x.is_empty() || y.is_empty() {
            return Rect::empty();
        }
        Rect { x, y }
    }

    pub fn expanded_by_margin(&self, margin: f64) -> Rect {
        self.expanded(Point::new(margin, margin))
    }

    /// Corners in bottom-left, top-left, top-right, bottom-right order.
    pub fn corners(&self) -> [Point; 4] {
        [
            Point::new(self.x.min, self.y.min),
            Point::new(self.x.min, self.y.max),
            Point::new(self.x.max, self.y.max),
            Point::new(self.x.max, self.y.min),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_range_absorbs_in_union() {
        let r = Range::new(2.0, 5.0);
        assert_eq!(Range::empty().union(&r), r);
        assert_eq!(r.union(&Range::empty()), r);
    }

    #[test]
    fn shrinking_past_zero_collapses_rect() {
        let r = Rect::from_xywh(0.0, 0.0, 10.0, 2.0);
        let shrunk = r.expanded(Point::new(-1.0, -2.0));
        assert!(shrunk.is_empty());
        assert!(shrunk.is_valid());
        assert_eq!(shrunk, Rect::empty());
    }

    #[test]
    fn zero_length_range_is_empty() {
        assert!(Range::new(5.0, 5.0).is_empty());
        assert!(Range::new(5.0, 5.0 + DEFAULT_EPSILON / 2.0).is_empty());
        assert!(!Range::new(5.0, 5.1).is_empty());
        assert_eq!(Range::new(0.0, 4.0).expanded(-2.0), Range::empty());
    }

    #[test]
    fn squeezing_one_axis_collapses_rect() {
        let r = Rect::from_xywh(0.0, 0.0, 10.0, 2.0).expanded(Point::new(-5.0, 0.0));
        assert_eq!(r, Rect::empty());
        assert!(r.is_empty());
        assert!(r.is_valid());

        let half = Rect::from_xywh(5.0, 0.0, 0.0, 2.0);
        assert!(half.is_empty());
        assert!(!half.is_valid());
        assert_eq!(half.intersection(&Rect::from_xywh(0.0, 0.0, 10.0, 10.0)), Rect::empty());
        assert_eq!(half.expanded_by_margin(1.0), Rect::empty());
    }

    #[test]
    fn from_points_keeps_extremes() {
        let r = Rect::from_points([Point::new(3.0, 1.0), Point::new(-1.0, 4.0), Point::new(2.0, 2.0)]);
        assert_eq!(r, Rect::from_corners(-1.0, 1.0, 3.0, 4.0));
        assert_eq!(Rect::from_points([]), Rect::empty());
    }

    #[test]
    fn from_corners_normalizes() {
        let r = Rect::from_corners(5.0, 7.0, 1.0, 2.0);
        assert_eq!(r.min(), Point::new(1.0, 2.0));
        assert_eq!(r.max(), Point::new(5.0, 7.0));
    }
}

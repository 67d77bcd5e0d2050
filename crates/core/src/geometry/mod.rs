//! Geometry kernel: points, ranges, rectangles, affine matrices and oriented
//! quads.

mod matrix;
mod point;
mod quad;
mod rect;

pub use matrix::Matrix;
pub use point::{Line, Point};
pub use quad::{Orientation, Quad, Quads};
pub use rect::{Range, Rect};

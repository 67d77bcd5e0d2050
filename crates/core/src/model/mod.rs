//! Drawing payloads passed to devices: paths, colors, images, fonts, text,
//! shadings and groups.

pub mod color;
pub mod font;
pub mod graphics;
pub mod image;
pub mod path;
pub mod text;

pub use color::{Colorspace, ColorspaceKind, Rgba};
pub use font::{Font, FontCache, FontFamily, FontStyle};
pub use graphics::{BlendMode, ColorStop, GroupParams, Shade, ShadeKind, Tile};
pub use image::Image;
pub use path::{FillRule, LineCap, LineJoin, Path, PathSegment, Stroke};
pub use text::{Letter, Text, TextSpan, WritingMode};

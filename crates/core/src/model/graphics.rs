//! Shadings, transparency groups, tiles and blend modes.

use serde::{Deserialize, Serialize};

use super::color::{Colorspace, Rgba};
use crate::geometry::{Matrix, Point, Rect};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BlendMode {
    #[default]
    Normal,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
    ColorDodge,
    ColorBurn,
    HardLight,
    SoftLight,
    Difference,
    Exclusion,
    Hue,
    Saturation,
    Color,
    Luminosity,
}

/// Geometry of a shading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ShadeKind {
    /// Axial gradient between two points.
    Linear { start: Point, end: Point },
    /// Radial gradient between two circles.
    Radial {
        start: Point,
        start_radius: f64,
        end: Point,
        end_radius: f64,
    },
    /// Triangle/patch mesh, flattened to its bounds.
    Mesh,
    /// Function-based shading, flattened to its bounds.
    Function,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorStop {
    pub offset: f32,
    pub color: Rgba,
}

/// A smooth shading in shading space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shade {
    pub kind: ShadeKind,
    /// Shading space to user space.
    pub matrix: Matrix,
    /// Area painted, in shading space.
    pub bounds: Rect,
    pub stops: Vec<ColorStop>,
}

impl Shade {
    /// First stop color, used when the shading cannot be rasterized exactly.
    pub fn fallback_color(&self) -> Rgba {
        self.stops.first().map(|s| s.color).unwrap_or(Rgba::BLACK)
    }
}

/// Parameters of a transparency group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupParams {
    pub colorspace: Option<Colorspace>,
    pub isolated: bool,
    pub knockout: bool,
    pub blend_mode: BlendMode,
    pub alpha: f64,
}

impl Default for GroupParams {
    fn default() -> Self {
        Self {
            colorspace: None,
            isolated: false,
            knockout: false,
            blend_mode: BlendMode::Normal,
            alpha: 1.0,
        }
    }
}

/// A tiling pattern cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    pub id: i32,
    /// Area to fill, in device space.
    pub area: Rect,
    /// Cell bounds, in pattern space.
    pub view: Rect,
    pub xstep: f64,
    pub ystep: f64,
    pub matrix: Matrix,
}

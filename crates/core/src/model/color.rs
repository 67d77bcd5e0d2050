//! Colors and color space descriptors.
//!
//! Colors reach the devices already converted to RGB; [`Colorspace`] only
//! describes the group/mask blending space.

use serde::{Deserialize, Serialize};

/// Non-premultiplied RGBA color with components in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Default for Rgba {
    fn default() -> Self {
        Self::BLACK
    }
}

impl Rgba {
    pub const BLACK: Rgba = Rgba::new(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Rgba = Rgba::new(1.0, 1.0, 1.0, 1.0);
    pub const TRANSPARENT: Rgba = Rgba::new(0.0, 0.0, 0.0, 0.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn from_rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::new(
            r as f32 / 255.0,
            g as f32 / 255.0,
            b as f32 / 255.0,
            a as f32 / 255.0,
        )
    }

    /// Gray level to opaque RGB.
    pub fn gray(level: f32) -> Self {
        Self::new(level, level, level, 1.0)
    }

    /// Naive CMYK conversion without a color profile.
    pub fn from_cmyk(c: f32, m: f32, y: f32, k: f32) -> Self {
        Self::new(
            (1.0 - c) * (1.0 - k),
            (1.0 - m) * (1.0 - k),
            (1.0 - y) * (1.0 - k),
            1.0,
        )
    }

    pub fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }

    pub fn to_rgba8(self) -> [u8; 4] {
        let q = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b), q(self.a)]
    }

    /// Rec. 601 luma.
    pub fn luminance(self) -> f32 {
        0.299 * self.r + 0.587 * self.g + 0.114 * self.b
    }
}

/// Family of a color space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColorspaceKind {
    #[default]
    None,
    Gray,
    Rgb,
    Bgr,
    Cmyk,
    Lab,
    Indexed,
    Separation,
}

/// Named color space with its component count.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Colorspace {
    pub kind: ColorspaceKind,
    pub name: String,
    pub colorant_count: usize,
}

impl Colorspace {
    pub fn new(kind: ColorspaceKind, name: &str, colorant_count: usize) -> Self {
        Self {
            kind,
            name: name.to_string(),
            colorant_count,
        }
    }

    pub fn device_rgb() -> Self {
        Self::new(ColorspaceKind::Rgb, "DeviceRGB", 3)
    }

    pub fn device_gray() -> Self {
        Self::new(ColorspaceKind::Gray, "DeviceGray", 1)
    }

    pub fn is_subtractive(&self) -> bool {
        matches!(self.kind, ColorspaceKind::Cmyk | ColorspaceKind::Separation)
    }
}

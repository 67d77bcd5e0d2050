//! Devices - sinks for page drawing operations.
//!
//! The rendering collaborator calls one [`Device`] method per drawable
//! element. Concrete devices record the calls ([`ListDevice`]), fan them out
//! ([`CompositeDevice`]), rasterize them ([`DrawDevice`]), extract text from
//! them ([`ContentDevice`]) or log them ([`TraceDevice`]).

pub mod composite;
pub mod content;
pub mod draw;
pub mod list;
pub mod trace;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::error::DeviceError;
use crate::geometry::{Matrix, Rect};
use crate::model::{FillRule, GroupParams, Image, Path, Rgba, Shade, Stroke, Text, Tile};

pub use composite::CompositeDevice;
pub use content::{ContentDevice, ContentOptions, PageContent, PlacedImage, SegmenterKind};
pub use draw::DrawDevice;
pub use list::{Command, DisplayList, ListDevice};
pub use trace::TraceDevice;

bitflags! {
    /// Operation kinds a device wants to receive.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct CommandKinds: u32 {
        const FILL_PATH = 1 << 0;
        const STROKE_PATH = 1 << 1;
        const FILL_SHADE = 1 << 2;
        const FILL_IMAGE = 1 << 3;
        const FILL_IMAGE_MASK = 1 << 4;
        const CLIP_PATH = 1 << 5;
        const CLIP_STROKE_PATH = 1 << 6;
        const CLIP_IMAGE_MASK = 1 << 7;
        const FILL_TEXT = 1 << 8;
        const STROKE_TEXT = 1 << 9;
        const CLIP_TEXT = 1 << 10;
        const CLIP_STROKE_TEXT = 1 << 11;
        const IGNORE_TEXT = 1 << 12;
        const POP_CLIP = 1 << 13;
        const BEGIN_MASK = 1 << 14;
        const BEGIN_GROUP = 1 << 15;
        const END_MASK = 1 << 16;
        const END_GROUP = 1 << 17;
        const BEGIN_TILE = 1 << 18;
        const END_TILE = 1 << 19;
        const BEGIN_LAYER = 1 << 20;
        const END_LAYER = 1 << 21;
        const CLOSE = 1 << 22;

        /// Every operation that pushes a clip.
        const CLIPS = Self::CLIP_PATH.bits()
            | Self::CLIP_STROKE_PATH.bits()
            | Self::CLIP_IMAGE_MASK.bits()
            | Self::CLIP_TEXT.bits()
            | Self::CLIP_STROKE_TEXT.bits();
    }
}

impl CommandKinds {
    /// Parses a snake_case kind name such as `fill_text`.
    pub fn parse_kind(name: &str) -> Option<CommandKinds> {
        Self::from_name(&name.to_ascii_uppercase())
    }
}

/// Device trait - receives page drawing operations.
///
/// Every method has a no-op default so implementations override only what
/// they consume. Methods never fail individually: a device that hits a fatal
/// condition stores it and reports it through [`Device::error`], and should
/// ignore every call after that.
///
/// Matrices map the operand's own space (path space, unit image square,
/// text space) to page space. Scissor rectangles are in page space.
pub trait Device {
    /// Terminal error, if any.
    fn error(&self) -> Option<&DeviceError> {
        None
    }

    /// Operation kinds this device wants. Callers may skip the rest.
    fn interests(&self) -> CommandKinds {
        CommandKinds::all()
    }

    fn fill_path(&mut self, _path: &Path, _fill_rule: FillRule, _ctm: &Matrix, _color: Rgba) {}

    fn stroke_path(&mut self, _path: &Path, _stroke: &Stroke, _ctm: &Matrix, _color: Rgba) {}

    fn fill_shade(&mut self, _shade: &Shade, _ctm: &Matrix, _alpha: f32) {}

    fn fill_image(&mut self, _image: &Image, _ctm: &Matrix, _alpha: f32) {}

    fn fill_image_mask(&mut self, _image: &Image, _ctm: &Matrix, _color: Rgba) {}

    fn clip_path(&mut self, _path: &Path, _fill_rule: FillRule, _ctm: &Matrix, _scissor: Rect) {}

    fn clip_stroke_path(&mut self, _path: &Path, _stroke: &Stroke, _ctm: &Matrix, _scissor: Rect) {}

    fn clip_image_mask(&mut self, _image: &Image, _ctm: &Matrix, _scissor: Rect) {}

    fn fill_text(&mut self, _text: &Text, _ctm: &Matrix, _color: Rgba) {}

    fn stroke_text(&mut self, _text: &Text, _stroke: &Stroke, _ctm: &Matrix, _color: Rgba) {}

    fn clip_text(&mut self, _text: &Text, _ctm: &Matrix, _scissor: Rect) {}

    fn clip_stroke_text(&mut self, _text: &Text, _stroke: &Stroke, _ctm: &Matrix, _scissor: Rect) {}

    /// Invisible text (render mode 3), still useful for extraction.
    fn ignore_text(&mut self, _text: &Text, _ctm: &Matrix) {}

    /// Ends the innermost clip pushed by any of the `clip_*` methods.
    fn pop_clip(&mut self) {}

    fn begin_mask(&mut self, _area: Rect, _color: Rgba, _luminosity: bool) {}

    fn end_mask(&mut self) {}

    fn begin_group(&mut self, _area: Rect, _params: &GroupParams) {}

    fn end_group(&mut self) {}

    /// Starts a tiling pattern cell. Returns a cached tile id, or 0 when the
    /// cell must be drawn.
    fn begin_tile(&mut self, _tile: &Tile) -> i32 {
        0
    }

    fn end_tile(&mut self) {}

    fn begin_layer(&mut self, _name: &str) {}

    fn end_layer(&mut self) {}

    /// Flushes the device. Calls after close are ignored.
    fn close(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_parse_from_names() {
        assert_eq!(CommandKinds::parse_kind("fill_text"), Some(CommandKinds::FILL_TEXT));
        assert_eq!(CommandKinds::parse_kind("pop_clip"), Some(CommandKinds::POP_CLIP));
        assert_eq!(CommandKinds::parse_kind("nope"), None);
    }

    #[test]
    fn clips_group_contains_every_clip_kind() {
        assert!(CommandKinds::CLIPS.contains(CommandKinds::CLIP_TEXT));
        assert!(!CommandKinds::CLIPS.contains(CommandKinds::POP_CLIP));
    }

    struct Nothing;
    impl Device for Nothing {}

    #[test]
    fn default_device_accepts_everything() {
        let mut dev = Nothing;
        dev.pop_clip();
        dev.close();
        assert!(dev.error().is_none());
        assert_eq!(dev.interests(), CommandKinds::all());
    }
}

use tracing::trace;

use super::{CommandKinds, Device};
use crate::error::DeviceError;
use crate::geometry::{Matrix, Rect};
use crate::model::{FillRule, GroupParams, Image, Path, Rgba, Shade, Stroke, Text, Tile};

/// Logs every call at `trace` level, indented by nesting depth.
///
/// Clips, masks, groups, tiles and layers open a level; their matching
/// end/pop closes it. Unbalanced closes saturate at zero.
#[derive(Debug)]
pub struct TraceDevice {
    depth: usize,
    calls: usize,
    interests: CommandKinds,
}

impl Default for TraceDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl TraceDevice {
    pub fn new() -> Self {
        Self::with_interests(CommandKinds::all())
    }

    pub fn with_interests(interests: CommandKinds) -> Self {
        Self {
            depth: 0,
            calls: 0,
            interests,
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Number of calls logged.
    pub fn calls(&self) -> usize {
        self.calls
    }

    fn log(&mut self, op: &str, detail: std::fmt::Arguments<'_>) {
        self.calls += 1;
        let indent = self.depth * 2;
        trace!("{:indent$}{op} {detail}", "");
    }

    fn open(&mut self, op: &str, detail: std::fmt::Arguments<'_>) {
        self.log(op, detail);
        self.depth += 1;
    }

    fn shut(&mut self, op: &str) {
        self.depth = self.depth.saturating_sub(1);
        self.log(op, format_args!(""));
    }
}

impl Device for TraceDevice {
    fn error(&self) -> Option<&DeviceError> {
        None
    }

    fn interests(&self) -> CommandKinds {
        self.interests
    }

    fn fill_path(&mut self, path: &Path, fill_rule: FillRule, ctm: &Matrix, color: Rgba) {
        self.log(
            "fill_path",
            format_args!("{fill_rule:?} bounds={:?} ctm={ctm:?} color={color:?}", path.bounds()),
        );
    }

    fn stroke_path(&mut self, path: &Path, stroke: &Stroke, ctm: &Matrix, color: Rgba) {
        self.log(
            "stroke_path",
            format_args!(
                "width={} bounds={:?} ctm={ctm:?} color={color:?}",
                stroke.line_width,
                path.bounds()
            ),
        );
    }

    fn fill_shade(&mut self, shade: &Shade, ctm: &Matrix, alpha: f32) {
        self.log(
            "fill_shade",
            format_args!("{:?} ctm={ctm:?} alpha={alpha}", shade.kind),
        );
    }

    fn fill_image(&mut self, image: &Image, ctm: &Matrix, alpha: f32) {
        self.log(
            "fill_image",
            format_args!("{}x{} ctm={ctm:?} alpha={alpha}", image.width, image.height),
        );
    }

    fn fill_image_mask(&mut self, image: &Image, ctm: &Matrix, color: Rgba) {
        self.log(
            "fill_image_mask",
            format_args!("{}x{} ctm={ctm:?} color={color:?}", image.width, image.height),
        );
    }

    fn clip_path(&mut self, path: &Path, fill_rule: FillRule, ctm: &Matrix, scissor: Rect) {
        self.open(
            "clip_path",
            format_args!("{fill_rule:?} bounds={:?} ctm={ctm:?} scissor={scissor:?}", path.bounds()),
        );
    }

    fn clip_stroke_path(&mut self, path: &Path, stroke: &Stroke, ctm: &Matrix, scissor: Rect) {
        self.open(
            "clip_stroke_path",
            format_args!(
                "width={} bounds={:?} ctm={ctm:?} scissor={scissor:?}",
                stroke.line_width,
                path.bounds()
            ),
        );
    }

    fn clip_image_mask(&mut self, image: &Image, ctm: &Matrix, scissor: Rect) {
        self.open(
            "clip_image_mask",
            format_args!("{}x{} ctm={ctm:?} scissor={scissor:?}", image.width, image.height),
        );
    }

    fn fill_text(&mut self, text: &Text, ctm: &Matrix, color: Rgba) {
        self.log(
            "fill_text",
            format_args!("{:?} ctm={ctm:?} color={color:?}", text.text()),
        );
    }

    fn stroke_text(&mut self, text: &Text, stroke: &Stroke, ctm: &Matrix, color: Rgba) {
        self.log(
            "stroke_text",
            format_args!(
                "{:?} width={} ctm={ctm:?} color={color:?}",
                text.text(),
                stroke.line_width
            ),
        );
    }

    fn clip_text(&mut self, text: &Text, ctm: &Matrix, scissor: Rect) {
        self.open(
            "clip_text",
            format_args!("{:?} ctm={ctm:?} scissor={scissor:?}", text.text()),
        );
    }

    fn clip_stroke_text(&mut self, text: &Text, stroke: &Stroke, ctm: &Matrix, scissor: Rect) {
        self.open(
            "clip_stroke_text",
            format_args!(
                "{:?} width={} ctm={ctm:?} scissor={scissor:?}",
                text.text(),
                stroke.line_width
            ),
        );
    }

    fn ignore_text(&mut self, text: &Text, ctm: &Matrix) {
        self.log("ignore_text", format_args!("{:?} ctm={ctm:?}", text.text()));
    }

    fn pop_clip(&mut self) {
        self.shut("pop_clip");
    }

    fn begin_mask(&mut self, area: Rect, color: Rgba, luminosity: bool) {
        self.open(
            "begin_mask",
            format_args!("area={area:?} color={color:?} luminosity={luminosity}"),
        );
    }

    fn end_mask(&mut self) {
        self.shut("end_mask");
    }

    fn begin_group(&mut self, area: Rect, params: &GroupParams) {
        self.open("begin_group", format_args!("area={area:?} {params:?}"));
    }

    fn end_group(&mut self) {
        self.shut("end_group");
    }

    fn begin_tile(&mut self, tile: &Tile) -> i32 {
        self.open("begin_tile", format_args!("{tile:?}"));
        0
    }

    fn end_tile(&mut self) {
        self.shut("end_tile");
    }

    fn begin_layer(&mut self, name: &str) {
        self.open("begin_layer", format_args!("{name:?}"));
    }

    fn end_layer(&mut self) {
        self.shut("end_layer");
    }

    fn close(&mut self) {
        let calls = self.calls;
        self.log("close", format_args!("calls={calls}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nesting_saturates() {
        let mut dev = TraceDevice::new();
        dev.pop_clip();
        assert_eq!(dev.depth(), 0);
        dev.begin_layer("a");
        dev.begin_group(Rect::from_xywh(0.0, 0.0, 1.0, 1.0), &GroupParams::default());
        assert_eq!(dev.depth(), 2);
        dev.end_group();
        dev.end_layer();
        dev.end_layer();
        assert_eq!(dev.depth(), 0);
        assert_eq!(dev.calls(), 6);
    }
}

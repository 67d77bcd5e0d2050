use tracing::warn;

use super::{CommandKinds, Device};
use crate::error::DeviceError;
use crate::geometry::{Matrix, Rect};
use crate::model::{FillRule, GroupParams, Image, Path, Rgba, Shade, Stroke, Text, Tile};

/// Forwards every call to a set of devices.
///
/// A call reaches a child only when the child is interested in the operation
/// kind and has no terminal error. By default a failing child is dropped from
/// the fan-out while its siblings keep receiving calls. With `fail_fast` the
/// first child error becomes the composite's own terminal error and stops all
/// further dispatch.
pub struct CompositeDevice<'a> {
    devices: Vec<&'a mut dyn Device>,
    fail_fast: bool,
    err: Option<DeviceError>,
}

impl<'a> CompositeDevice<'a> {
    pub fn new(devices: Vec<&'a mut dyn Device>) -> Self {
        Self {
            devices,
            fail_fast: false,
            err: None,
        }
    }

    pub fn fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    pub fn push(&mut self, device: &'a mut dyn Device) {
        self.devices.push(device);
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    fn dispatch<F>(&mut self, kind: CommandKinds, mut call: F)
    where
        F: FnMut(&mut dyn Device),
    {
        if self.err.is_some() {
            return;
        }
        for (i, device) in self.devices.iter_mut().enumerate() {
            if device.error().is_some() || !device.interests().intersects(kind) {
                continue;
            }
            call(&mut **device);
            if let Some(err) = device.error() {
                warn!(child = i, %err, "composite child failed");
                if self.fail_fast {
                    self.err = Some(err.clone());
                    return;
                }
            }
        }
    }
}

impl Device for CompositeDevice<'_> {
    fn error(&self) -> Option<&DeviceError> {
        self.err.as_ref()
    }

    fn interests(&self) -> CommandKinds {
        self.devices
            .iter()
            .fold(CommandKinds::empty(), |acc, d| acc | d.interests())
    }

    fn fill_path(&mut self, path: &Path, fill_rule: FillRule, ctm: &Matrix, color: Rgba) {
        self.dispatch(CommandKinds::FILL_PATH, |d| d.fill_path(path, fill_rule, ctm, color));
    }

    fn stroke_path(&mut self, path: &Path, stroke: &Stroke, ctm: &Matrix, color: Rgba) {
        self.dispatch(CommandKinds::STROKE_PATH, |d| d.stroke_path(path, stroke, ctm, color));
    }

    fn fill_shade(&mut self, shade: &Shade, ctm: &Matrix, alpha: f32) {
        self.dispatch(CommandKinds::FILL_SHADE, |d| d.fill_shade(shade, ctm, alpha));
    }

    fn fill_image(&mut self, image: &Image, ctm: &Matrix, alpha: f32) {
        self.dispatch(CommandKinds::FILL_IMAGE, |d| d.fill_image(image, ctm, alpha));
    }

    fn fill_image_mask(&mut self, image: &Image, ctm: &Matrix, color: Rgba) {
        self.dispatch(CommandKinds::FILL_IMAGE_MASK, |d| d.fill_image_mask(image, ctm, color));
    }

    fn clip_path(&mut self, path: &Path, fill_rule: FillRule, ctm: &Matrix, scissor: Rect) {
        self.dispatch(CommandKinds::CLIP_PATH, |d| d.clip_path(path, fill_rule, ctm, scissor));
    }

    fn clip_stroke_path(&mut self, path: &Path, stroke: &Stroke, ctm: &Matrix, scissor: Rect) {
        self.dispatch(CommandKinds::CLIP_STROKE_PATH, |d| {
            d.clip_stroke_path(path, stroke, ctm, scissor)
        });
    }

    fn clip_image_mask(&mut self, image: &Image, ctm: &Matrix, scissor: Rect) {
        self.dispatch(CommandKinds::CLIP_IMAGE_MASK, |d| d.clip_image_mask(image, ctm, scissor));
    }

    fn fill_text(&mut self, text: &Text, ctm: &Matrix, color: Rgba) {
        self.dispatch(CommandKinds::FILL_TEXT, |d| d.fill_text(text, ctm, color));
    }

    fn stroke_text(&mut self, text: &Text, stroke: &Stroke, ctm: &Matrix, color: Rgba) {
        self.dispatch(CommandKinds::STROKE_TEXT, |d| d.stroke_text(text, stroke, ctm, color));
    }

    fn clip_text(&mut self, text: &Text, ctm: &Matrix, scissor: Rect) {
        self.dispatch(CommandKinds::CLIP_TEXT, |d| d.clip_text(text, ctm, scissor));
    }

    fn clip_stroke_text(&mut self, text: &Text, stroke: &Stroke, ctm: &Matrix, scissor: Rect) {
        self.dispatch(CommandKinds::CLIP_STROKE_TEXT, |d| {
            d.clip_stroke_text(text, stroke, ctm, scissor)
        });
    }

    fn ignore_text(&mut self, text: &Text, ctm: &Matrix) {
        self.dispatch(CommandKinds::IGNORE_TEXT, |d| d.ignore_text(text, ctm));
    }

    fn pop_clip(&mut self) {
        self.dispatch(CommandKinds::POP_CLIP, |d| d.pop_clip());
    }

    fn begin_mask(&mut self, area: Rect, color: Rgba, luminosity: bool) {
        self.dispatch(CommandKinds::BEGIN_MASK, |d| d.begin_mask(area, color, luminosity));
    }

    fn end_mask(&mut self) {
        self.dispatch(CommandKinds::END_MASK, |d| d.end_mask());
    }

    fn begin_group(&mut self, area: Rect, params: &GroupParams) {
        self.dispatch(CommandKinds::BEGIN_GROUP, |d| d.begin_group(area, params));
    }

    fn end_group(&mut self) {
        self.dispatch(CommandKinds::END_GROUP, |d| d.end_group());
    }

    /// Returns the first non-zero id any child reports.
    fn begin_tile(&mut self, tile: &Tile) -> i32 {
        let mut id = 0;
        self.dispatch(CommandKinds::BEGIN_TILE, |d| {
            let child = d.begin_tile(tile);
            if id == 0 {
                id = child;
            }
        });
        id
    }

    fn end_tile(&mut self) {
        self.dispatch(CommandKinds::END_TILE, |d| d.end_tile());
    }

    fn begin_layer(&mut self, name: &str) {
        self.dispatch(CommandKinds::BEGIN_LAYER, |d| d.begin_layer(name));
    }

    fn end_layer(&mut self) {
        self.dispatch(CommandKinds::END_LAYER, |d| d.end_layer());
    }

    fn close(&mut self) {
        self.dispatch(CommandKinds::CLOSE, |d| d.close());
    }
}

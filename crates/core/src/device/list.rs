//! Display lists: recorded, replayable device calls.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{CommandKinds, Device};
use crate::error::{DeviceError, Result};
use crate::geometry::{Matrix, Rect};
use crate::model::{FillRule, GroupParams, Image, Path, Rgba, Shade, Stroke, Text, Tile};

/// One recorded device call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Command {
    FillPath {
        path: Path,
        fill_rule: FillRule,
        ctm: Matrix,
        color: Rgba,
    },
    StrokePath {
        path: Path,
        stroke: Stroke,
        ctm: Matrix,
        color: Rgba,
    },
    FillShade {
        shade: Shade,
        ctm: Matrix,
        alpha: f32,
    },
    FillImage {
        image: Image,
        ctm: Matrix,
        alpha: f32,
    },
    FillImageMask {
        image: Image,
        ctm: Matrix,
        color: Rgba,
    },
    ClipPath {
        path: Path,
        fill_rule: FillRule,
        ctm: Matrix,
        scissor: Rect,
    },
    ClipStrokePath {
        path: Path,
        stroke: Stroke,
        ctm: Matrix,
        scissor: Rect,
    },
    ClipImageMask {
        image: Image,
        ctm: Matrix,
        scissor: Rect,
    },
    FillText {
        text: Text,
        ctm: Matrix,
        color: Rgba,
    },
    StrokeText {
        text: Text,
        stroke: Stroke,
        ctm: Matrix,
        color: Rgba,
    },
    ClipText {
        text: Text,
        ctm: Matrix,
        scissor: Rect,
    },
    ClipStrokeText {
        text: Text,
        stroke: Stroke,
        ctm: Matrix,
        scissor: Rect,
    },
    IgnoreText {
        text: Text,
        ctm: Matrix,
    },
    PopClip,
    BeginMask {
        area: Rect,
        color: Rgba,
        luminosity: bool,
    },
    EndMask,
    BeginGroup {
        area: Rect,
        params: GroupParams,
    },
    EndGroup,
    BeginTile {
        tile: Tile,
    },
    EndTile,
    BeginLayer {
        name: String,
    },
    EndLayer,
    /// The recording device was closed; nothing follows.
    Close,
}

impl Command {
    pub fn kind(&self) -> CommandKinds {
        match self {
            Command::FillPath { .. } => CommandKinds::FILL_PATH,
            Command::StrokePath { .. } => CommandKinds::STROKE_PATH,
            Command::FillShade { .. } => CommandKinds::FILL_SHADE,
            Command::FillImage { .. } => CommandKinds::FILL_IMAGE,
            Command::FillImageMask { .. } => CommandKinds::FILL_IMAGE_MASK,
            Command::ClipPath { .. } => CommandKinds::CLIP_PATH,
            Command::ClipStrokePath { .. } => CommandKinds::CLIP_STROKE_PATH,
            Command::ClipImageMask { .. } => CommandKinds::CLIP_IMAGE_MASK,
            Command::FillText { .. } => CommandKinds::FILL_TEXT,
            Command::StrokeText { .. } => CommandKinds::STROKE_TEXT,
            Command::ClipText { .. } => CommandKinds::CLIP_TEXT,
            Command::ClipStrokeText { .. } => CommandKinds::CLIP_STROKE_TEXT,
            Command::IgnoreText { .. } => CommandKinds::IGNORE_TEXT,
            Command::PopClip => CommandKinds::POP_CLIP,
            Command::BeginMask { .. } => CommandKinds::BEGIN_MASK,
            Command::EndMask => CommandKinds::END_MASK,
            Command::BeginGroup { .. } => CommandKinds::BEGIN_GROUP,
            Command::EndGroup => CommandKinds::END_GROUP,
            Command::BeginTile { .. } => CommandKinds::BEGIN_TILE,
            Command::EndTile => CommandKinds::END_TILE,
            Command::BeginLayer { .. } => CommandKinds::BEGIN_LAYER,
            Command::EndLayer => CommandKinds::END_LAYER,
            Command::Close => CommandKinds::CLOSE,
        }
    }

    /// Snake-case operation name, as used in serialized lists.
    pub fn name(&self) -> &'static str {
        match self {
            Command::FillPath { .. } => "fill_path",
            Command::StrokePath { .. } => "stroke_path",
            Command::FillShade { .. } => "fill_shade",
            Command::FillImage { .. } => "fill_image",
            Command::FillImageMask { .. } => "fill_image_mask",
            Command::ClipPath { .. } => "clip_path",
            Command::ClipStrokePath { .. } => "clip_stroke_path",
            Command::ClipImageMask { .. } => "clip_image_mask",
            Command::FillText { .. } => "fill_text",
            Command::StrokeText { .. } => "stroke_text",
            Command::ClipText { .. } => "clip_text",
            Command::ClipStrokeText { .. } => "clip_stroke_text",
            Command::IgnoreText { .. } => "ignore_text",
            Command::PopClip => "pop_clip",
            Command::BeginMask { .. } => "begin_mask",
            Command::EndMask => "end_mask",
            Command::BeginGroup { .. } => "begin_group",
            Command::EndGroup => "end_group",
            Command::BeginTile { .. } => "begin_tile",
            Command::EndTile => "end_tile",
            Command::BeginLayer { .. } => "begin_layer",
            Command::EndLayer => "end_layer",
            Command::Close => "close",
        }
    }

    /// Invokes the matching method on `device`.
    pub fn apply(&self, device: &mut dyn Device) {
        match self {
            Command::FillPath {
                path,
                fill_rule,
                ctm,
                color,
            } => device.fill_path(path, *fill_rule, ctm, *color),
            Command::StrokePath {
                path,
                stroke,
                ctm,
                color,
            } => device.stroke_path(path, stroke, ctm, *color),
            Command::FillShade { shade, ctm, alpha } => device.fill_shade(shade, ctm, *alpha),
            Command::FillImage { image, ctm, alpha } => device.fill_image(image, ctm, *alpha),
            Command::FillImageMask { image, ctm, color } => {
                device.fill_image_mask(image, ctm, *color)
            }
            Command::ClipPath {
                path,
                fill_rule,
                ctm,
                scissor,
            } => device.clip_path(path, *fill_rule, ctm, *scissor),
            Command::ClipStrokePath {
                path,
                stroke,
                ctm,
                scissor,
            } => device.clip_stroke_path(path, stroke, ctm, *scissor),
            Command::ClipImageMask {
                image,
                ctm,
                scissor,
            } => device.clip_image_mask(image, ctm, *scissor),
            Command::FillText { text, ctm, color } => device.fill_text(text, ctm, *color),
            Command::StrokeText {
                text,
                stroke,
                ctm,
                color,
            } => device.stroke_text(text, stroke, ctm, *color),
            Command::ClipText { text, ctm, scissor } => device.clip_text(text, ctm, *scissor),
            Command::ClipStrokeText {
                text,
                stroke,
                ctm,
                scissor,
            } => device.clip_stroke_text(text, stroke, ctm, *scissor),
            Command::IgnoreText { text, ctm } => device.ignore_text(text, ctm),
            Command::PopClip => device.pop_clip(),
            Command::BeginMask {
                area,
                color,
                luminosity,
            } => device.begin_mask(*area, *color, *luminosity),
            Command::EndMask => device.end_mask(),
            Command::BeginGroup { area, params } => device.begin_group(*area, params),
            Command::EndGroup => device.end_group(),
            Command::BeginTile { tile } => {
                device.begin_tile(tile);
            }
            Command::EndTile => device.end_tile(),
            Command::BeginLayer { name } => device.begin_layer(name),
            Command::EndLayer => device.end_layer(),
            Command::Close => device.close(),
        }
    }
}

/// The recorded draw operations of one page.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DisplayList {
    pub page_number: usize,
    /// Page area in page space.
    pub bounds: Rect,
    pub commands: Vec<Command>,
}

impl DisplayList {
    pub fn new(page_number: usize, bounds: Rect) -> Self {
        Self {
            page_number,
            bounds,
            commands: Vec::new(),
        }
    }

    pub fn push(&mut self, command: Command) {
        self.commands.push(command);
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Command> {
        self.commands.iter()
    }

    /// Union of all kinds present in the list.
    pub fn kinds(&self) -> CommandKinds {
        self.commands
            .iter()
            .fold(CommandKinds::empty(), |acc, c| acc | c.kind())
    }

    /// True when the list was recorded up to a `close`.
    pub fn is_closed(&self) -> bool {
        matches!(self.commands.last(), Some(Command::Close))
    }

    /// Replays, in order, every command `device` is interested in, a
    /// recorded `close` included. An open list leaves the device open.
    ///
    /// Replay stops at the first command after which the device reports a
    /// terminal error; that error is returned.
    pub fn replay(&self, device: &mut dyn Device) -> Result<()> {
        let interests = device.interests();
        for (i, command) in self.commands.iter().enumerate() {
            if !interests.intersects(command.kind()) {
                continue;
            }
            command.apply(device);
            if let Some(err) = device.error() {
                warn!(page = self.page_number, index = i, op = command.name(), %err, "device stopped replay");
                return Err(err.clone().into());
            }
        }
        debug!(page = self.page_number, commands = self.commands.len(), "replayed display list");
        Ok(())
    }

    /// [`replay`](Self::replay), then closes the device if the list itself
    /// was left open.
    pub fn run(&self, device: &mut dyn Device) -> Result<()> {
        self.replay(device)?;
        if !self.is_closed() && device.interests().contains(CommandKinds::CLOSE) {
            device.close();
            if let Some(err) = device.error() {
                return Err(err.clone().into());
            }
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(data: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(data)?)
    }
}

impl<'a> IntoIterator for &'a DisplayList {
    type Item = &'a Command;
    type IntoIter = std::slice::Iter<'a, Command>;

    fn into_iter(self) -> Self::IntoIter {
        self.commands.iter()
    }
}

/// Records every call into a [`DisplayList`].
#[derive(Debug, Default)]
pub struct ListDevice {
    list: DisplayList,
    closed: bool,
    err: Option<DeviceError>,
}

impl ListDevice {
    pub fn new(page_number: usize, bounds: Rect) -> Self {
        Self {
            list: DisplayList::new(page_number, bounds),
            closed: false,
            err: None,
        }
    }

    pub fn list(&self) -> &DisplayList {
        &self.list
    }

    pub fn into_list(self) -> DisplayList {
        self.list
    }

    fn record(&mut self, command: Command) {
        if self.err.is_some() {
            return;
        }
        if self.closed {
            self.err = Some(DeviceError::Closed);
            return;
        }
        self.list.push(command);
    }
}

impl Device for ListDevice {
    fn error(&self) -> Option<&DeviceError> {
        self.err.as_ref()
    }

    fn fill_path(&mut self, path: &Path, fill_rule: FillRule, ctm: &Matrix, color: Rgba) {
        self.record(Command::FillPath {
            path: path.clone(),
            fill_rule,
            ctm: *ctm,
            color,
        });
    }

    fn stroke_path(&mut self, path: &Path, stroke: &Stroke, ctm: &Matrix, color: Rgba) {
        self.record(Command::StrokePath {
            path: path.clone(),
            stroke: stroke.clone(),
            ctm: *ctm,
            color,
        });
    }

    fn fill_shade(&mut self, shade: &Shade, ctm: &Matrix, alpha: f32) {
        self.record(Command::FillShade {
            shade: shade.clone(),
            ctm: *ctm,
            alpha,
        });
    }

    fn fill_image(&mut self, image: &Image, ctm: &Matrix, alpha: f32) {
        self.record(Command::FillImage {
            image: image.clone(),
            ctm: *ctm,
            alpha,
        });
    }

    fn fill_image_mask(&mut self, image: &Image, ctm: &Matrix, color: Rgba) {
        self.record(Command::FillImageMask {
            image: image.clone(),
            ctm: *ctm,
            color,
        });
    }

    fn clip_path(&mut self, path: &Path, fill_rule: FillRule, ctm: &Matrix, scissor: Rect) {
        self.record(Command::ClipPath {
            path: path.clone(),
            fill_rule,
            ctm: *ctm,
            scissor,
        });
    }

    fn clip_stroke_path(&mut self, path: &Path, stroke: &Stroke, ctm: &Matrix, scissor: Rect) {
        self.record(Command::ClipStrokePath {
            path: path.clone(),
            stroke: stroke.clone(),
            ctm: *ctm,
            scissor,
        });
    }

    fn clip_image_mask(&mut self, image: &Image, ctm: &Matrix, scissor: Rect) {
        self.record(Command::ClipImageMask {
            image: image.clone(),
            ctm: *ctm,
            scissor,
        });
    }

    fn fill_text(&mut self, text: &Text, ctm: &Matrix, color: Rgba) {
        self.record(Command::FillText {
            text: text.clone(),
            ctm: *ctm,
            color,
        });
    }

    fn stroke_text(&mut self, text: &Text, stroke: &Stroke, ctm: &Matrix, color: Rgba) {
        self.record(Command::StrokeText {
            text: text.clone(),
            stroke: stroke.clone(),
            ctm: *ctm,
            color,
        });
    }

    fn clip_text(&mut self, text: &Text, ctm: &Matrix, scissor: Rect) {
        self.record(Command::ClipText {
            text: text.clone(),
            ctm: *ctm,
            scissor,
        });
    }

    fn clip_stroke_text(&mut self, text: &Text, stroke: &Stroke, ctm: &Matrix, scissor: Rect) {
        self.record(Command::ClipStrokeText {
            text: text.clone(),
            stroke: stroke.clone(),
            ctm: *ctm,
            scissor,
        });
    }

    fn ignore_text(&mut self, text: &Text, ctm: &Matrix) {
        self.record(Command::IgnoreText {
            text: text.clone(),
            ctm: *ctm,
        });
    }

    fn pop_clip(&mut self) {
        self.record(Command::PopClip);
    }

    fn begin_mask(&mut self, area: Rect, color: Rgba, luminosity: bool) {
        self.record(Command::BeginMask {
            area,
            color,
            luminosity,
        });
    }

    fn end_mask(&mut self) {
        self.record(Command::EndMask);
    }

    fn begin_group(&mut self, area: Rect, params: &GroupParams) {
        self.record(Command::BeginGroup {
            area,
            params: params.clone(),
        });
    }

    fn end_group(&mut self) {
        self.record(Command::EndGroup);
    }

    fn begin_tile(&mut self, tile: &Tile) -> i32 {
        self.record(Command::BeginTile { tile: tile.clone() });
        0
    }

    fn end_tile(&mut self) {
        self.record(Command::EndTile);
    }

    fn begin_layer(&mut self, name: &str) {
        self.record(Command::BeginLayer {
            name: name.to_string(),
        });
    }

    fn end_layer(&mut self) {
        self.record(Command::EndLayer);
    }

    fn close(&mut self) {
        if self.closed || self.err.is_some() {
            return;
        }
        self.list.push(Command::Close);
        self.closed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_in_call_order() {
        let mut dev = ListDevice::new(1, Rect::from_xywh(0.0, 0.0, 100.0, 100.0));
        dev.begin_layer("ink");
        dev.pop_clip();
        dev.end_layer();
        let kinds: Vec<_> = dev.list().iter().map(Command::kind).collect();
        assert_eq!(
            kinds,
            vec![CommandKinds::BEGIN_LAYER, CommandKinds::POP_CLIP, CommandKinds::END_LAYER]
        );
    }

    #[test]
    fn recording_after_close_is_an_error() {
        let mut dev = ListDevice::default();
        dev.close();
        dev.close();
        assert_eq!(dev.error(), None);
        dev.end_group();
        assert_eq!(dev.error(), Some(&DeviceError::Closed));
        assert_eq!(dev.list().commands, vec![Command::Close]);
        assert!(dev.list().is_closed());
    }

    #[derive(Default)]
    struct Closes(usize);

    impl Device for Closes {
        fn close(&mut self) {
            self.0 += 1;
        }
    }

    #[test]
    fn replay_keeps_open_lists_open() {
        let mut open = DisplayList::default();
        open.push(Command::EndLayer);
        let mut dev = Closes::default();
        open.replay(&mut dev).unwrap();
        assert_eq!(dev.0, 0);
        open.run(&mut dev).unwrap();
        assert_eq!(dev.0, 1);
    }

    #[test]
    fn recorded_close_replays_once() {
        let mut rec = ListDevice::default();
        rec.end_layer();
        rec.close();
        let list = rec.into_list();
        assert!(list.is_closed());
        assert!(list.kinds().contains(CommandKinds::CLOSE));

        let mut dev = Closes::default();
        list.run(&mut dev).unwrap();
        assert_eq!(dev.0, 1);

        let json = list.to_json().unwrap();
        assert!(json.ends_with(r#"{"op":"close"}]}"#));
        assert_eq!(DisplayList::from_json(json.as_bytes()).unwrap(), list);
    }

    #[test]
    fn json_uses_op_tags() {
        let mut list = DisplayList::new(3, Rect::from_xywh(0.0, 0.0, 10.0, 10.0));
        list.push(Command::BeginLayer { name: "a".into() });
        list.push(Command::PopClip);
        let json = list.to_json().unwrap();
        assert!(json.contains(r#""op":"begin_layer""#));
        assert!(json.contains(r#""op":"pop_clip""#));
        assert_eq!(DisplayList::from_json(json.as_bytes()).unwrap(), list);
    }
}

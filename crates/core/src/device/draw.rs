//! Draw device - rasterizes page operations with tiny-skia.

use tiny_skia::{
    Color, ColorU8, FilterQuality, GradientStop, LinearGradient, Mask, MaskType, Paint, PathBuilder,
    Pixmap, PixmapPaint, RadialGradient, Shader, SpreadMode, StrokeDash, Transform,
};
use tracing::{trace, warn};

use super::Device;
use crate::error::{DeviceError, Result, VellumError};
use crate::geometry::{Matrix, Rect};
use crate::model::{
    FillRule, GroupParams, Image, LineCap, LineJoin, Path, PathSegment, Rgba, Shade, ShadeKind,
    Stroke, Text, Tile,
};

/// Rasterizes into an RGBA pixmap.
///
/// `transform` maps page space to pixel space. Each clip operation pushes a
/// coverage mask (intersected with the enclosing clip); `pop_clip` pops it.
/// Popping with no clip pushed is a terminal [`DeviceError::ClipUnderflow`].
pub struct DrawDevice {
    pixmap: Pixmap,
    transform: Matrix,
    clips: Vec<Mask>,
    err: Option<DeviceError>,
    closed: bool,
}

impl DrawDevice {
    pub fn new(width: u32, height: u32, transform: Matrix, background: Rgba) -> Result<Self> {
        let mut pixmap =
            Pixmap::new(width, height).ok_or(VellumError::InvalidRaster { width, height })?;
        pixmap.fill(skia_color(background));
        Ok(Self {
            pixmap,
            transform,
            clips: Vec::new(),
            err: None,
            closed: false,
        })
    }

    /// A device covering `bounds` at `scale` pixels per unit, top edge at
    /// pixel row 0.
    pub fn for_page(bounds: Rect, scale: f64, background: Rgba) -> Result<Self> {
        let width = (bounds.width() * scale).ceil().max(0.0) as u32;
        let height = (bounds.height() * scale).ceil().max(0.0) as u32;
        let transform = Matrix::translate(-bounds.x.min, -bounds.y.max)
            .concat(&Matrix::scale(scale, -scale));
        Self::new(width, height, transform, background)
    }

    pub fn transform(&self) -> &Matrix {
        &self.transform
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    /// Number of clips currently pushed.
    pub fn clip_depth(&self) -> usize {
        self.clips.len()
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    pub fn into_pixmap(self) -> Pixmap {
        self.pixmap
    }

    pub fn encode_png(&self) -> Result<Vec<u8>> {
        self.pixmap
            .encode_png()
            .map_err(|e| VellumError::Encode(e.to_string()))
    }

    /// Current raster as a straight-alpha RGBA image.
    pub fn to_image(&self) -> Result<Image> {
        let data = self
            .pixmap
            .pixels()
            .iter()
            .flat_map(|p| {
                let c = p.demultiply();
                [c.red(), c.green(), c.blue(), c.alpha()]
            })
            .collect();
        Image::new(self.pixmap.width(), self.pixmap.height(), 4, data)
    }

    fn active(&self) -> bool {
        self.err.is_none() && !self.closed
    }

    fn device_transform(&self, ctm: &Matrix) -> Transform {
        skia_transform(&ctm.concat(&self.transform))
    }

    fn draw_image_pixmap(&mut self, img: &Pixmap, image: &Image, ctm: &Matrix, opacity: f32) {
        let ts = self.device_transform(&image.pixel_matrix().concat(ctm));
        let paint = PixmapPaint {
            opacity,
            quality: FilterQuality::Bilinear,
            ..PixmapPaint::default()
        };
        self.pixmap
            .draw_pixmap(0, 0, img.as_ref(), &paint, ts, self.clips.last());
    }

    /// Pushes `path` (under `ts`) intersected with the scissor and the current
    /// clip. A degenerate path pushes an empty clip so push/pop stay balanced.
    fn push_clip(
        &mut self,
        path: Option<tiny_skia::Path>,
        rule: tiny_skia::FillRule,
        ts: Transform,
        scissor: Rect,
    ) {
        let Some(mut mask) = self.new_mask() else {
            return;
        };
        match path {
            Some(path) => {
                if self.clips.is_empty() {
                    mask.fill_path(&path, rule, true, ts);
                } else {
                    mask.intersect_path(&path, rule, true, ts);
                }
            }
            None => mask.data_mut().fill(0),
        }
        self.intersect_scissor(&mut mask, scissor);
        self.clips.push(mask);
    }

    /// A mask equal to the current clip, or fully open.
    fn new_mask(&mut self) -> Option<Mask> {
        if let Some(top) = self.clips.last() {
            return Some(top.clone());
        }
        match Mask::new(self.pixmap.width(), self.pixmap.height()) {
            Some(mask) => Some(mask),
            None => {
                self.fail(DeviceError::Raster("cannot allocate clip mask".into()));
                None
            }
        }
    }

    fn intersect_scissor(&self, mask: &mut Mask, scissor: Rect) {
        if !scissor.is_valid() {
            return;
        }
        if let Some(path) = rect_path(&scissor) {
            mask.intersect_path(&path, tiny_skia::FillRule::Winding, false, skia_transform(&self.transform));
        }
    }

    fn fail(&mut self, err: DeviceError) {
        warn!(%err, "draw device failed");
        self.err = Some(err);
    }
}

impl Device for DrawDevice {
    fn error(&self) -> Option<&DeviceError> {
        self.err.as_ref()
    }

    fn fill_path(&mut self, path: &Path, fill_rule: FillRule, ctm: &Matrix, color: Rgba) {
        if !self.active() {
            return;
        }
        let Some(p) = skia_path(path) else { return };
        let ts = self.device_transform(ctm);
        self.pixmap
            .fill_path(&p, &solid_paint(color), skia_fill_rule(fill_rule), ts, self.clips.last());
    }

    fn stroke_path(&mut self, path: &Path, stroke: &Stroke, ctm: &Matrix, color: Rgba) {
        if !self.active() {
            return;
        }
        let Some(p) = skia_path(path) else { return };
        let ts = self.device_transform(ctm);
        self.pixmap
            .stroke_path(&p, &solid_paint(color), &skia_stroke(stroke), ts, self.clips.last());
    }

    fn fill_shade(&mut self, shade: &Shade, ctm: &Matrix, alpha: f32) {
        if !self.active() {
            return;
        }
        let full = shade.matrix.concat(ctm).concat(&self.transform);
        let area = if shade.bounds.is_valid() && !shade.bounds.is_empty() {
            shade.bounds
        } else {
            // Unbounded shading covers the whole raster.
            let Some(inv) = full.invert() else { return };
            let raster = Rect::from_xywh(0.0, 0.0, self.pixmap.width() as f64, self.pixmap.height() as f64);
            inv.transform_rect(&raster)
        };
        let Some(p) = rect_path(&area) else { return };

        let mut paint = Paint {
            anti_alias: true,
            ..Paint::default()
        };
        paint.shader = shade_shader(shade, alpha)
            .unwrap_or_else(|| Shader::SolidColor(skia_color(shade.fallback_color().with_alpha(alpha))));
        self.pixmap.fill_path(
            &p,
            &paint,
            tiny_skia::FillRule::Winding,
            skia_transform(&full),
            self.clips.last(),
        );
    }

    fn fill_image(&mut self, image: &Image, ctm: &Matrix, alpha: f32) {
        if !self.active() {
            return;
        }
        let rgba = image.to_rgba8();
        let pixels = rgba.chunks_exact(4).map(|c| [c[0], c[1], c[2], c[3]]);
        let Some(img) = premultiplied_pixmap(image.width, image.height, pixels) else {
            return;
        };
        self.draw_image_pixmap(&img, image, ctm, alpha.clamp(0.0, 1.0));
    }

    fn fill_image_mask(&mut self, image: &Image, ctm: &Matrix, color: Rgba) {
        if !self.active() {
            return;
        }
        let [r, g, b, a] = color.to_rgba8();
        let coverage = image.coverage();
        let tinted = coverage
            .iter()
            .map(|&c| [r, g, b, ((c as u16 * a as u16) / 255) as u8]);
        let Some(img) = premultiplied_pixmap(image.width, image.height, tinted) else {
            return;
        };
        self.draw_image_pixmap(&img, image, ctm, 1.0);
    }

    fn clip_path(&mut self, path: &Path, fill_rule: FillRule, ctm: &Matrix, scissor: Rect) {
        if !self.active() {
            return;
        }
        let ts = self.device_transform(ctm);
        self.push_clip(skia_path(path), skia_fill_rule(fill_rule), ts, scissor);
    }

    fn clip_stroke_path(&mut self, path: &Path, stroke: &Stroke, ctm: &Matrix, scissor: Rect) {
        if !self.active() {
            return;
        }
        let ts = self.device_transform(ctm);
        let outline = skia_path(path).and_then(|p| p.stroke(&skia_stroke(stroke), 1.0));
        self.push_clip(outline, tiny_skia::FillRule::Winding, ts, scissor);
    }

    fn clip_image_mask(&mut self, image: &Image, ctm: &Matrix, scissor: Rect) {
        if !self.active() {
            return;
        }
        let coverage = image.coverage();
        let shaped = coverage.iter().map(|&c| [0, 0, 0, c]);
        let Some(img) = premultiplied_pixmap(image.width, image.height, shaped) else {
            self.push_clip(None, tiny_skia::FillRule::Winding, Transform::identity(), scissor);
            return;
        };
        let Some(mut layer) = Pixmap::new(self.pixmap.width(), self.pixmap.height()) else {
            self.fail(DeviceError::Raster("cannot allocate clip layer".into()));
            return;
        };
        let ts = self.device_transform(&image.pixel_matrix().concat(ctm));
        let paint = PixmapPaint {
            quality: FilterQuality::Bilinear,
            ..PixmapPaint::default()
        };
        layer.draw_pixmap(0, 0, img.as_ref(), &paint, ts, self.clips.last());
        let mut mask = Mask::from_pixmap(layer.as_ref(), MaskType::Alpha);
        self.intersect_scissor(&mut mask, scissor);
        self.clips.push(mask);
    }

    fn fill_text(&mut self, text: &Text, ctm: &Matrix, color: Rgba) {
        if !self.active() {
            return;
        }
        let Some(p) = glyph_path(text, false) else { return };
        let ts = self.device_transform(ctm);
        self.pixmap.fill_path(
            &p,
            &solid_paint(color),
            tiny_skia::FillRule::Winding,
            ts,
            self.clips.last(),
        );
    }

    fn stroke_text(&mut self, text: &Text, stroke: &Stroke, ctm: &Matrix, color: Rgba) {
        if !self.active() {
            return;
        }
        let Some(p) = glyph_path(text, false) else { return };
        let ts = self.device_transform(ctm);
        self.pixmap
            .stroke_path(&p, &solid_paint(color), &skia_stroke(stroke), ts, self.clips.last());
    }

    fn clip_text(&mut self, text: &Text, ctm: &Matrix, scissor: Rect) {
        if !self.active() {
            return;
        }
        let ts = self.device_transform(ctm);
        self.push_clip(glyph_path(text, true), tiny_skia::FillRule::Winding, ts, scissor);
    }

    fn clip_stroke_text(&mut self, text: &Text, stroke: &Stroke, ctm: &Matrix, scissor: Rect) {
        if !self.active() {
            return;
        }
        let ts = self.device_transform(ctm);
        let outline = glyph_path(text, true).and_then(|p| p.stroke(&skia_stroke(stroke), 1.0));
        self.push_clip(outline, tiny_skia::FillRule::Winding, ts, scissor);
    }

    fn pop_clip(&mut self) {
        if !self.active() {
            return;
        }
        if self.clips.pop().is_none() {
            self.fail(DeviceError::ClipUnderflow);
        }
    }

    fn begin_mask(&mut self, area: Rect, _color: Rgba, luminosity: bool) {
        trace!(?area, luminosity, "draw device: soft mask not composited");
    }

    fn begin_group(&mut self, area: Rect, params: &GroupParams) {
        trace!(?area, blend = ?params.blend_mode, knockout = params.knockout, "draw device: group");
    }

    fn begin_tile(&mut self, tile: &Tile) -> i32 {
        trace!(id = tile.id, area = ?tile.area, "draw device: tile drawn once");
        0
    }

    fn begin_layer(&mut self, name: &str) {
        trace!(name, "draw device: layer");
    }

    fn close(&mut self) {
        if !self.clips.is_empty() {
            warn!(depth = self.clips.len(), "draw device closed with open clips");
        }
        self.closed = true;
    }
}

fn skia_transform(m: &Matrix) -> Transform {
    Transform::from_row(
        m.a as f32, m.b as f32, m.c as f32, m.d as f32, m.e as f32, m.f as f32,
    )
}

fn skia_color(c: Rgba) -> Color {
    Color::from_rgba(
        c.r.clamp(0.0, 1.0),
        c.g.clamp(0.0, 1.0),
        c.b.clamp(0.0, 1.0),
        c.a.clamp(0.0, 1.0),
    )
    .unwrap_or(Color::BLACK)
}

fn solid_paint(c: Rgba) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color(skia_color(c));
    paint.anti_alias = true;
    paint
}

fn skia_fill_rule(rule: FillRule) -> tiny_skia::FillRule {
    match rule {
        FillRule::EvenOdd => tiny_skia::FillRule::EvenOdd,
        FillRule::Winding => tiny_skia::FillRule::Winding,
    }
}

fn skia_stroke(s: &Stroke) -> tiny_skia::Stroke {
    let line_cap = match s.start_cap {
        LineCap::Butt => tiny_skia::LineCap::Butt,
        // tiny-skia has no triangle cap; round is the closest shape.
        LineCap::Round | LineCap::Triangle => tiny_skia::LineCap::Round,
        LineCap::Square => tiny_skia::LineCap::Square,
    };
    let line_join = match s.line_join {
        LineJoin::Miter => tiny_skia::LineJoin::Miter,
        LineJoin::Round => tiny_skia::LineJoin::Round,
        LineJoin::Bevel => tiny_skia::LineJoin::Bevel,
    };
    let dash = if s.dashes.is_empty() {
        None
    } else {
        StrokeDash::new(s.dashes.iter().map(|&d| d as f32).collect(), s.dash_phase as f32)
    };
    tiny_skia::Stroke {
        width: s.line_width as f32,
        miter_limit: s.miter_limit as f32,
        line_cap,
        line_join,
        dash,
    }
}

fn skia_path(path: &Path) -> Option<tiny_skia::Path> {
    let mut pb = PathBuilder::new();
    append_path(&mut pb, path, None);
    pb.finish()
}

fn append_path(pb: &mut PathBuilder, path: &Path, m: Option<&Matrix>) {
    let t = |p: crate::geometry::Point| {
        let p = m.map_or(p, |m| m.transform_point(p));
        (p.x as f32, p.y as f32)
    };
    for seg in &path.segments {
        match *seg {
            PathSegment::MoveTo(p) => {
                let (x, y) = t(p);
                pb.move_to(x, y);
            }
            PathSegment::LineTo(p) => {
                let (x, y) = t(p);
                pb.line_to(x, y);
            }
            PathSegment::QuadTo(c, p) => {
                let (cx, cy) = t(c);
                let (x, y) = t(p);
                pb.quad_to(cx, cy, x, y);
            }
            PathSegment::CurveTo(c1, c2, p) => {
                let (x1, y1) = t(c1);
                let (x2, y2) = t(c2);
                let (x, y) = t(p);
                pb.cubic_to(x1, y1, x2, y2, x, y);
            }
            PathSegment::Close => pb.close(),
        }
    }
}

fn rect_path(r: &Rect) -> Option<tiny_skia::Path> {
    let rect = tiny_skia::Rect::from_ltrb(r.x.min as f32, r.y.min as f32, r.x.max as f32, r.y.max as f32)?;
    Some(PathBuilder::from_rect(rect))
}

/// Glyph outlines of `text` in text space. With `quads_fallback`, letters
/// without an outline contribute their quad.
fn glyph_path(text: &Text, quads_fallback: bool) -> Option<tiny_skia::Path> {
    let mut pb = PathBuilder::new();
    for (span, letter) in text.letters() {
        match span.font.outline(letter.glyph_id) {
            Some(outline) => append_path(&mut pb, outline, Some(&span.glyph_matrix(letter))),
            None if quads_fallback => {
                let q = &letter.quad;
                let [a, b, c, d] = q.corners().map(|p| (p.x as f32, p.y as f32));
                pb.move_to(a.0, a.1);
                pb.line_to(b.0, b.1);
                pb.line_to(c.0, c.1);
                pb.line_to(d.0, d.1);
                pb.close();
            }
            None => {}
        }
    }
    pb.finish()
}

fn premultiplied_pixmap<I>(width: u32, height: u32, rgba: I) -> Option<Pixmap>
where
    I: Iterator<Item = [u8; 4]>,
{
    let mut pixmap = Pixmap::new(width, height)?;
    for (dst, [r, g, b, a]) in pixmap.pixels_mut().iter_mut().zip(rgba) {
        *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
    }
    Some(pixmap)
}

fn shade_shader(shade: &Shade, alpha: f32) -> Option<Shader<'static>> {
    let stops: Vec<GradientStop> = shade
        .stops
        .iter()
        .map(|s| GradientStop::new(s.offset, skia_color(s.color.with_alpha(s.color.a * alpha))))
        .collect();
    if stops.len() < 2 {
        return None;
    }
    let pt = |p: crate::geometry::Point| tiny_skia::Point::from_xy(p.x as f32, p.y as f32);
    match shade.kind {
        ShadeKind::Linear { start, end } => LinearGradient::new(
            pt(start),
            pt(end),
            stops,
            SpreadMode::Pad,
            Transform::identity(),
        ),
        ShadeKind::Radial { start, end, end_radius, .. } => RadialGradient::new(
            pt(start),
            pt(end),
            end_radius as f32,
            stops,
            SpreadMode::Pad,
            Transform::identity(),
        ),
        ShadeKind::Mesh | ShadeKind::Function => None,
    }
}

//! Content device - extracts segmented text and drawn elements from a page.

use std::io::Cursor;

use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::draw::DrawDevice;
use super::{CommandKinds, Device};
use crate::error::{DeviceError, Result, VellumError};
use crate::geometry::{Matrix, Rect};
use crate::layout::{
    BasicPageSegmenter, Char, DocstrumParams, DocstrumSegmenter, NearestNeighborWordExtractor,
    PageSegmenter, PageSegmenterParams, TextBlock, TextWord, WordExtractor,
    WordExtractorParams, remove_overlapping_letters,
};
use crate::model::{FillRule, Image, Path, Rgba, Stroke, Text};
use crate::ocr::{OcrEngine, OcrParams, OcrWord};

/// Which page segmenter turns words into blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmenterKind {
    #[default]
    Docstrum,
    Basic,
}

/// Options for text extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentOptions {
    pub segmenter: SegmenterKind,
    pub docstrum: DocstrumParams,
    pub basic: PageSegmenterParams,
    pub words: WordExtractorParams,
    /// Recognize images (and optional page areas) when an engine is supplied.
    pub ocr: Option<OcrParams>,
    /// Drop glyphs painted twice at nearly the same place.
    pub remove_overlaps: bool,
}

impl Default for ContentOptions {
    fn default() -> Self {
        Self {
            segmenter: SegmenterKind::Docstrum,
            docstrum: DocstrumParams::default(),
            basic: PageSegmenterParams::default(),
            words: WordExtractorParams::default(),
            ocr: None,
            remove_overlaps: true,
        }
    }
}

impl ContentOptions {
    pub fn segment(&self, words: &[TextWord]) -> Vec<TextBlock> {
        match self.segmenter {
            SegmenterKind::Docstrum => DocstrumSegmenter::new(self.docstrum.clone()).blocks(words),
            SegmenterKind::Basic => BasicPageSegmenter::new(self.basic.clone()).blocks(words),
        }
    }

    /// Full letters-to-blocks pipeline. `extra` words (from OCR) join after
    /// word extraction.
    pub fn blocks(&self, chars: &[Char], extra: Vec<TextWord>) -> Vec<TextBlock> {
        let kept;
        let chars = if self.remove_overlaps {
            kept = remove_overlapping_letters(chars);
            &kept[..]
        } else {
            chars
        };
        let mut words = NearestNeighborWordExtractor::new(self.words.clone()).words(chars);
        words.extend(extra);
        self.segment(&words)
    }
}

/// An image as placed on the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedImage {
    pub image: Image,
    /// Unit square to page space.
    pub ctm: Matrix,
}

/// Everything a [`ContentDevice`] extracted from one page.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PageContent {
    pub blocks: Vec<TextBlock>,
    /// Filled paths, in page space.
    pub paths: Vec<Path>,
    /// Stroked paths, in page space.
    pub strokes: Vec<Path>,
    pub images: Vec<PlacedImage>,
}

impl PageContent {
    pub fn text(&self) -> String {
        crate::layout::blocks_text(&self.blocks, "\n\n")
    }
}

/// Collects letters, paths and images, and segments the letters (plus any
/// OCR words) into blocks on close.
pub struct ContentDevice {
    bounds: Rect,
    options: ContentOptions,
    ocr: Option<Box<dyn OcrEngine>>,
    canvas: Option<DrawDevice>,
    chars: Vec<Char>,
    ocr_words: Vec<TextWord>,
    content: PageContent,
    closed: bool,
}

impl ContentDevice {
    /// `ocr` is used only when `options.ocr` is set.
    pub fn new(bounds: Rect, options: ContentOptions, ocr: Option<Box<dyn OcrEngine>>) -> Self {
        let ocr = if options.ocr.is_some() { ocr } else { None };
        let wants_areas = options.ocr.as_ref().is_some_and(|o| !o.areas.is_empty());
        let canvas = if ocr.is_some() && wants_areas {
            match DrawDevice::for_page(bounds, 1.0, Rgba::WHITE) {
                Ok(canvas) => Some(canvas),
                Err(err) => {
                    warn!(%err, "area OCR disabled");
                    None
                }
            }
        } else {
            None
        };
        Self {
            bounds,
            options,
            ocr,
            canvas,
            chars: Vec::new(),
            ocr_words: Vec::new(),
            content: PageContent::default(),
            closed: false,
        }
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// Letters collected so far, in page space.
    pub fn chars(&self) -> &[Char] {
        &self.chars
    }

    pub fn content(&self) -> &PageContent {
        &self.content
    }

    pub fn into_content(self) -> PageContent {
        self.content
    }

    fn recognize(&mut self, encoded: &[u8]) -> Result<Vec<OcrWord>> {
        let engine = self
            .ocr
            .as_mut()
            .ok_or_else(|| VellumError::Ocr("no engine".into()))?;
        engine.set_image(encoded)?;
        engine.words()
    }

    fn recognize_image(&mut self, image: &Image, ctm: &Matrix) {
        let Some(params) = self.options.ocr.clone() else {
            return;
        };
        if !params.accepts_image(image.width, image.height) {
            return;
        }
        let words = image
            .png_bytes()
            .and_then(|png| self.recognize(&png));
        match words {
            Ok(words) => {
                let m = image.pixel_matrix().concat(ctm);
                let before = self.ocr_words.len();
                self.ocr_words.extend(
                    words
                        .iter()
                        .filter(|w| params.accepts(w))
                        .map(|w| w.to_text_word(&m)),
                );
                debug!(found = words.len(), kept = self.ocr_words.len() - before, "image OCR");
            }
            Err(err) => warn!(%err, width = image.width, height = image.height, "image OCR failed"),
        }
    }

    fn recognize_areas(&mut self) {
        let Some(mut canvas) = self.canvas.take() else {
            return;
        };
        let Some(params) = self.options.ocr.clone() else {
            return;
        };
        canvas.close();

        let page = match canvas.to_image().and_then(|img| img.to_dynamic()) {
            Ok(page) => page,
            Err(err) => {
                warn!(%err, "cannot rasterize page for area OCR");
                return;
            }
        };
        let Some(to_page) = canvas.transform().invert() else {
            return;
        };
        let raster = Rect::from_xywh(0.0, 0.0, canvas.width() as f64, canvas.height() as f64);

        for area in &params.areas {
            let px = canvas.transform().transform_rect(area).intersection(&raster);
            if px.is_empty() {
                continue;
            }
            let (x0, y0) = (px.x.min.floor() as u32, px.y.min.floor() as u32);
            let w = px.x.max.ceil() as u32 - x0;
            let h = px.y.max.ceil() as u32 - y0;

            let result = encode_upscaled(&page, x0, y0, w, h, params.upscale)
                .and_then(|png| self.recognize(&png));
            let words = match result {
                Ok(words) => words,
                Err(err) => {
                    warn!(%err, ?area, "area OCR failed");
                    continue;
                }
            };

            let up = params.upscale.max(1) as f64;
            let m = Matrix::scale(1.0 / up, 1.0 / up)
                .concat(&Matrix::translate(x0 as f64, y0 as f64))
                .concat(&to_page);
            self.ocr_words.extend(
                words
                    .iter()
                    .filter(|w| params.accepts(w))
                    .map(|w| w.to_text_word(&m)),
            );
        }
    }
}

/// Crops `w x h` at `(x0, y0)`, upscales with Lanczos3 and encodes PNG.
///
/// Fails when the upscaled size or its pixel count does not fit a `u32`.
fn encode_upscaled(page: &DynamicImage, x0: u32, y0: u32, w: u32, h: u32, upscale: u32) -> Result<Vec<u8>> {
    let up = upscale.max(1);
    let (Some(width), Some(height)) = (w.checked_mul(up), h.checked_mul(up)) else {
        return Err(VellumError::InvalidRaster { width: w, height: h });
    };
    if width.checked_mul(height).is_none() {
        return Err(VellumError::InvalidRaster { width, height });
    }
    let crop = page.crop_imm(x0, y0, w, h);
    let resized = imageops::resize(&crop, width, height, FilterType::Lanczos3);
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(resized).write_to(&mut out, ImageFormat::Png)?;
    Ok(out.into_inner())
}

impl Device for ContentDevice {
    fn error(&self) -> Option<&DeviceError> {
        None
    }

    fn interests(&self) -> CommandKinds {
        CommandKinds::FILL_TEXT
            | CommandKinds::FILL_IMAGE
            | CommandKinds::FILL_PATH
            | CommandKinds::STROKE_PATH
            | CommandKinds::CLOSE
    }

    fn fill_path(&mut self, path: &Path, fill_rule: FillRule, ctm: &Matrix, color: Rgba) {
        if self.closed {
            return;
        }
        if let Some(canvas) = self.canvas.as_mut() {
            canvas.fill_path(path, fill_rule, ctm, color);
        }
        self.content.paths.push(path.transform(ctm));
    }

    fn stroke_path(&mut self, path: &Path, stroke: &Stroke, ctm: &Matrix, color: Rgba) {
        if self.closed {
            return;
        }
        if let Some(canvas) = self.canvas.as_mut() {
            canvas.stroke_path(path, stroke, ctm, color);
        }
        self.content.strokes.push(path.transform(ctm));
    }

    fn fill_image(&mut self, image: &Image, ctm: &Matrix, _alpha: f32) {
        if self.closed {
            return;
        }
        if self.ocr.is_some() {
            self.recognize_image(image, ctm);
        }
        self.content.images.push(PlacedImage {
            image: image.clone(),
            ctm: *ctm,
        });
    }

    fn fill_text(&mut self, text: &Text, ctm: &Matrix, _color: Rgba) {
        if self.closed {
            return;
        }
        self.chars
            .extend(text.letters().map(|(_, letter)| Char::from_letter(letter, ctm)));
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.recognize_areas();

        let ocr_words = std::mem::take(&mut self.ocr_words);
        let n_ocr = ocr_words.len();
        self.content.blocks = self.options.blocks(&self.chars, ocr_words);
        self.ocr = None;
        debug!(
            letters = self.chars.len(),
            ocr_words = n_ocr,
            blocks = self.content.blocks.len(),
            "page content"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upscaled_crop_is_png() {
        let page = DynamicImage::new_rgba8(20, 10);
        let png = encode_upscaled(&page, 2, 2, 4, 3, 2).unwrap();
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (8, 6));
    }

    #[test]
    fn oversized_upscale_is_rejected() {
        let page = DynamicImage::new_rgba8(20, 10);
        let err = encode_upscaled(&page, 0, 0, 20, 10, u32::MAX).unwrap_err();
        assert!(matches!(err, VellumError::InvalidRaster { width: 20, height: 10 }));

        let err = encode_upscaled(&page, 0, 0, 20, 10, 100_000).unwrap_err();
        assert!(matches!(err, VellumError::InvalidRaster { .. }));
    }
}

//! Per-page pipeline: replay a recorded display list into the content or
//! draw device, and fan independent pages out over the rayon pool.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::device::{Command, ContentDevice, ContentOptions, DisplayList, DrawDevice, PageContent};
use crate::error::Result;
use crate::geometry::{Matrix, Point, Rect};
use crate::model::{Font, FontCache, Rgba, Text, TextSpan, WritingMode};
use crate::ocr::{OcrEngine, OcrFactory};

/// Rasterization options.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Pixels per page unit.
    pub scale: f64,
    pub background: Rgba,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            scale: 1.0,
            background: Rgba::WHITE,
        }
    }
}

/// A run of glyphs on one baseline, as accepted by [`Page::from_runs`].
///
/// Glyphs advance by `advance` em each; `font` names an entry of the
/// [`FontCache`], created with default metrics when missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlyphRun {
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub size: f64,
    #[serde(default)]
    pub font: String,
    #[serde(default = "GlyphRun::default_advance")]
    pub advance: f64,
}

impl GlyphRun {
    fn default_advance() -> f64 {
        0.5
    }

    fn to_text(&self, fonts: &FontCache) -> Text {
        let font = fonts.get_or_insert_with(&self.font, || Font::new(&self.font, 0.8, -0.2));
        let mut span = TextSpan::new(font, Matrix::scale(self.size, self.size), WritingMode::Horizontal);
        let step = self.advance * self.size;
        for (i, rune) in self.text.chars().enumerate() {
            let origin = Point::new(self.x + i as f64 * step, self.y);
            span.push_glyph(rune, rune as u32, origin, self.advance);
        }
        Text { spans: vec![span] }
    }
}

/// One page: its number, bounds and recorded drawing.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Page {
    pub number: usize,
    pub bounds: Rect,
    pub list: DisplayList,
}

impl From<DisplayList> for Page {
    fn from(list: DisplayList) -> Self {
        Self {
            number: list.page_number,
            bounds: list.bounds,
            list,
        }
    }
}

impl Page {
    pub fn new(number: usize, bounds: Rect) -> Self {
        Self {
            number,
            bounds,
            list: DisplayList::new(number, bounds),
        }
    }

    /// Builds a page whose display list fills each run in black.
    pub fn from_runs(number: usize, bounds: Rect, runs: &[GlyphRun], fonts: &FontCache) -> Self {
        let mut page = Self::new(number, bounds);
        for run in runs {
            page.list.push(Command::FillText {
                text: run.to_text(fonts),
                ctm: Matrix::IDENTITY,
                color: Rgba::BLACK,
            });
        }
        page
    }

    /// Replays the page into a [`ContentDevice`].
    ///
    /// When `options.ocr` is set and a factory is given, the page gets its
    /// own engine. A factory failure disables OCR for this page only.
    pub fn content(&self, options: &ContentOptions, ocr: Option<&dyn OcrFactory>) -> Result<PageContent> {
        let engine: Option<Box<dyn OcrEngine>> = match (options.ocr.as_ref(), ocr) {
            (Some(_), Some(factory)) => match factory.create() {
                Ok(engine) => Some(engine),
                Err(err) => {
                    warn!(page = self.number, %err, "OCR engine unavailable");
                    None
                }
            },
            _ => None,
        };
        let mut device = ContentDevice::new(self.bounds, options.clone(), engine);
        self.list.run(&mut device)?;
        let content = device.into_content();
        debug!(page = self.number, blocks = content.blocks.len(), "extracted page");
        Ok(content)
    }

    /// Replays the page into a fresh [`DrawDevice`].
    pub fn render(&self, options: &RenderOptions) -> Result<DrawDevice> {
        let mut device = DrawDevice::for_page(self.bounds, options.scale, options.background)?;
        self.list.run(&mut device)?;
        Ok(device)
    }
}

/// Extracts every page on the rayon pool. Results keep page order; the first
/// failing page (in page order) is returned as the error.
pub fn extract_pages(
    pages: &[Page],
    options: &ContentOptions,
    ocr: Option<&dyn OcrFactory>,
) -> Result<Vec<PageContent>> {
    let results: Vec<Result<PageContent>> = pages
        .par_iter()
        .map(|page| page.content(options, ocr))
        .collect();
    results.into_iter().collect()
}

//! OCR collaborator interface.
//!
//! The engine itself lives outside this crate. It receives an encoded image
//! and returns word boxes in that image's pixel space (row 0 at the top).

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::geometry::{Matrix, Point, Quad, Rect};
use crate::layout::TextWord;

/// A word box reported by an OCR engine, in pixel space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrWord {
    pub text: String,
    pub quad: Quad,
    pub start_baseline: Point,
    pub end_baseline: Point,
    /// 0..=100
    pub confidence: f64,
}

impl OcrWord {
    /// Maps the word through `m` (pixel space to page space).
    pub fn to_text_word(&self, m: &Matrix) -> TextWord {
        TextWord::from_parts(
            self.text.clone(),
            m.transform_quad(&self.quad),
            m.transform_point(self.start_baseline),
            m.transform_point(self.end_baseline),
            self.confidence,
        )
    }
}

/// An OCR engine session. One session handles one image at a time.
pub trait OcrEngine {
    /// Loads an encoded (PNG) image, replacing any previous one.
    fn set_image(&mut self, encoded: &[u8]) -> Result<()>;

    /// Recognizes the current image.
    fn words(&mut self) -> Result<Vec<OcrWord>>;
}

/// Creates engines. Pages processed in parallel each get their own engine.
pub trait OcrFactory: Sync {
    fn create(&self) -> Result<Box<dyn OcrEngine>>;
}

impl<F> OcrFactory for F
where
    F: Fn() -> Result<Box<dyn OcrEngine>> + Sync,
{
    fn create(&self) -> Result<Box<dyn OcrEngine>> {
        self()
    }
}

/// OCR filtering and region options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrParams {
    /// Images must be strictly larger than this (pixels) to be recognized.
    pub min_image_size: Point,

    /// Words below this confidence are dropped.
    pub min_confidence: f64,

    /// Words narrower than this (pixels, before mapping) are dropped.
    pub min_word_width: f64,

    /// Page-space areas whose rendered vector content is recognized too.
    pub areas: Vec<Rect>,

    /// Upscale factor applied to area crops before recognition.
    pub upscale: u32,
}

impl Default for OcrParams {
    fn default() -> Self {
        Self {
            min_image_size: Point::ZERO,
            min_confidence: 70.0,
            min_word_width: 5.0,
            areas: Vec::new(),
            upscale: 4,
        }
    }
}

impl OcrParams {
    pub fn accepts(&self, word: &OcrWord) -> bool {
        word.confidence >= self.min_confidence && word.quad.width() >= self.min_word_width
    }

    pub fn accepts_image(&self, width: u32, height: u32) -> bool {
        width as f64 > self.min_image_size.x && height as f64 > self.min_image_size.y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(conf: f64, width: f64) -> OcrWord {
        OcrWord {
            text: "x".into(),
            quad: Quad::from_ltrb(0.0, 0.0, width, 10.0),
            start_baseline: Point::ZERO,
            end_baseline: Point::new(width, 0.0),
            confidence: conf,
        }
    }

    #[test]
    fn default_filters() {
        let p = OcrParams::default();
        assert!(p.accepts(&word(70.0, 5.0)));
        assert!(!p.accepts(&word(69.9, 50.0)));
        assert!(!p.accepts(&word(99.0, 4.0)));
        assert!(p.accepts_image(1, 1));
        assert!(!p.accepts_image(0, 1));
    }

    #[test]
    fn mapped_word_keeps_confidence() {
        let w = word(88.0, 20.0).to_text_word(&Matrix::translate(100.0, 0.0));
        assert_eq!(w.confidence, 88.0);
        assert_eq!(w.quad.left(), 100.0);
        assert!(w.chars.is_empty());
    }
}

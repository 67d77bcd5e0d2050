//! Positioned glyph runs as delivered to devices.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::font::Font;
use crate::geometry::{Matrix, Point, Quad, Quads};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WritingMode {
    #[default]
    Horizontal,
    Vertical,
}

/// One rendered glyph in user space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Letter {
    pub rune: char,
    pub glyph_id: u32,
    pub origin: Point,
    pub quad: Quad,
    pub start_baseline: Point,
    pub end_baseline: Point,
}

impl Letter {
    pub fn is_whitespace(&self) -> bool {
        self.rune.is_whitespace()
    }
}

/// A run of letters sharing one font and text matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextSpan {
    pub font: Arc<Font>,
    /// Glyph space to user space, translation excluded.
    pub trm: Matrix,
    pub wmode: WritingMode,
    pub letters: Vec<Letter>,
}

impl TextSpan {
    pub fn new(font: Arc<Font>, trm: Matrix, wmode: WritingMode) -> Self {
        Self {
            font,
            trm,
            wmode,
            letters: Vec::new(),
        }
    }

    /// Appends a glyph placed at `origin` with the given advance (in em).
    ///
    /// The letter quad spans the advance along the writing direction and the
    /// font's descender to ascender across it, both mapped through `trm`.
    /// Vertical text spans the font bbox horizontally and ends at `origin`.
    pub fn push_glyph(&mut self, rune: char, glyph_id: u32, origin: Point, advance: f64) {
        let (dir, asc, desc) = match self.wmode {
            WritingMode::Horizontal => (
                Point::new(1.0, 0.0),
                Point::new(0.0, self.font.ascender),
                Point::new(0.0, self.font.descender),
            ),
            WritingMode::Vertical => (
                Point::new(0.0, -1.0),
                Point::new(self.font.bbox.x.max, 0.0),
                Point::new(self.font.bbox.x.min, 0.0),
            ),
        };
        let dir = self.trm.transform_vector(dir);
        let asc = self.trm.transform_vector(asc);
        let desc = self.trm.transform_vector(desc);

        let (p, q) = match self.wmode {
            WritingMode::Horizontal => (origin, origin + dir * advance),
            WritingMode::Vertical => (origin - dir * advance, origin),
        };

        self.letters.push(Letter {
            rune,
            glyph_id,
            origin,
            quad: Quad::new(p + desc, p + asc, q + asc, q + desc),
            start_baseline: p,
            end_baseline: q,
        });
    }

    /// Union of the letter quads.
    pub fn quad(&self) -> Quad {
        let quads: Vec<Quad> = self.letters.iter().map(|l| l.quad).collect();
        quads.union()
    }

    pub fn text(&self) -> String {
        self.letters.iter().map(|l| l.rune).collect()
    }

    /// Glyph space to user space for one letter.
    pub fn glyph_matrix(&self, letter: &Letter) -> Matrix {
        self.trm.with_translation(letter.origin.x, letter.origin.y)
    }
}

/// A text object: one or more spans.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Text {
    pub spans: Vec<TextSpan>,
}

impl Text {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn letters(&self) -> impl Iterator<Item = (&TextSpan, &Letter)> {
        self.spans
            .iter()
            .flat_map(|s| s.letters.iter().map(move |l| (s, l)))
    }

    pub fn len(&self) -> usize {
        self.spans.iter().map(|s| s.letters.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn text(&self) -> String {
        self.spans.iter().map(TextSpan::text).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn horizontal_glyph_quad_spans_ascender_to_descender() {
        let font = Arc::new(Font::new("Test", 0.75, -0.25));
        let mut span = TextSpan::new(font, Matrix::scale(12.0, 12.0), WritingMode::Horizontal);
        span.push_glyph('H', 43, Point::new(100.0, 200.0), 0.5);
        let l = &span.letters[0];
        assert_eq!(l.start_baseline, Point::new(100.0, 200.0));
        assert_eq!(l.end_baseline, Point::new(106.0, 200.0));
        assert!(l.quad.approx_eq(&Quad::from_ltrb(100.0, 197.0, 106.0, 209.0), 1e-9));
    }

    #[test]
    fn vertical_glyph_ends_at_origin() {
        let font = Arc::new(Font::new("Test", 0.8, -0.2));
        let mut span = TextSpan::new(font, Matrix::scale(10.0, 10.0), WritingMode::Vertical);
        span.push_glyph('A', 1, Point::new(0.0, 50.0), 1.0);
        let l = &span.letters[0];
        assert_eq!(l.end_baseline, Point::new(0.0, 50.0));
        assert_eq!(l.start_baseline, Point::new(0.0, 60.0));
    }
}

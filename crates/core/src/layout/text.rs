//! Segmentation output: characters, words, lines and blocks.

use std::fmt;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::geometry::{Matrix, Orientation, Point, Quad, Quads};
use crate::model::Letter;
use crate::utils::DEFAULT_EPSILON;

/// Confidence assigned to glyphs that come from vector text.
pub const VECTOR_CONFIDENCE: f64 = 100.0;

/// One glyph prepared for segmentation, in page space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Char {
    pub rune: char,
    pub quad: Quad,
    pub start_baseline: Point,
    pub end_baseline: Point,
    /// 0..=100; 100 for vector glyphs, the engine's score for OCR.
    pub confidence: f64,
    pub orientation: Orientation,
    /// Baseline angle in radians.
    pub deskew_angle: f64,
}

impl Char {
    pub fn new(rune: char, quad: Quad, start_baseline: Point, end_baseline: Point) -> Self {
        Self {
            rune,
            quad,
            start_baseline,
            end_baseline,
            confidence: VECTOR_CONFIDENCE,
            orientation: quad.orientation(),
            deskew_angle: quad.t(),
        }
    }

    /// Reclassifies the orientation, treating coordinates within `epsilon`
    /// as equal.
    pub fn reorient(&mut self, epsilon: f64) {
        self.orientation = self.quad.orientation_eps(epsilon);
    }

    /// Builds a char from a recorded letter, mapped through `ctm`.
    pub fn from_letter(letter: &Letter, ctm: &Matrix) -> Self {
        Self::new(
            letter.rune,
            ctm.transform_quad(&letter.quad),
            ctm.transform_point(letter.start_baseline),
            ctm.transform_point(letter.end_baseline),
        )
    }

    pub fn is_whitespace(&self) -> bool {
        self.rune.is_whitespace()
    }
}

/// A cluster of characters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextWord {
    pub text: String,
    pub chars: Vec<Char>,
    pub quad: Quad,
    pub start_baseline: Point,
    pub end_baseline: Point,
    pub confidence: f64,
    pub orientation: Orientation,
}

impl TextWord {
    /// Orders `chars` by reading order and derives the word geometry.
    pub fn new(chars: Vec<Char>) -> Self {
        Self::with_epsilon(chars, DEFAULT_EPSILON)
    }

    /// [`TextWord::new`] with orientations classified within `epsilon`.
    pub fn with_epsilon(mut chars: Vec<Char>, epsilon: f64) -> Self {
        order_by_reading_direction(&mut chars, |c| &c.quad);
        let quads: Vec<Quad> = chars.iter().map(|c| c.quad).collect();
        let quad = quads.union_eps(epsilon);
        let text = chars.iter().map(|c| c.rune).collect();
        let confidence = if chars.is_empty() {
            0.0
        } else {
            chars.iter().map(|c| c.confidence).sum::<f64>() / chars.len() as f64
        };
        let start_baseline = chars.first().map(|c| c.start_baseline).unwrap_or_default();
        let end_baseline = chars.last().map(|c| c.end_baseline).unwrap_or_default();
        Self {
            text,
            chars,
            quad,
            start_baseline,
            end_baseline,
            confidence,
            orientation: quad.orientation_eps(epsilon),
        }
    }

    /// A word without per-character geometry, as returned by OCR.
    pub fn from_parts(
        text: String,
        quad: Quad,
        start_baseline: Point,
        end_baseline: Point,
        confidence: f64,
    ) -> Self {
        Self {
            text,
            chars: Vec::new(),
            quad,
            start_baseline,
            end_baseline,
            confidence,
            orientation: quad.orientation(),
        }
    }

    pub fn is_whitespace(&self) -> bool {
        self.text.chars().all(char::is_whitespace)
    }

    /// Maps the word's geometry through `m`.
    pub fn transform(&mut self, m: &Matrix) {
        self.quad = m.transform_quad(&self.quad);
        self.start_baseline = m.transform_point(self.start_baseline);
        self.end_baseline = m.transform_point(self.end_baseline);
        for c in &mut self.chars {
            c.quad = m.transform_quad(&c.quad);
            c.start_baseline = m.transform_point(c.start_baseline);
            c.end_baseline = m.transform_point(c.end_baseline);
            c.orientation = c.quad.orientation();
            c.deskew_angle = c.quad.t();
        }
        self.orientation = self.quad.orientation();
    }
}

/// Words sharing a baseline, in reading order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextLine {
    pub words: Vec<TextWord>,
    pub quad: Quad,
    pub text: String,
}

impl TextLine {
    pub fn new(mut words: Vec<TextWord>, separator: &str) -> Self {
        order_by_reading_direction(&mut words, |w| &w.quad);
        let quads: Vec<Quad> = words.iter().map(|w| w.quad).collect();
        let text = words
            .iter()
            .map(|w| w.text.as_str())
            .join(separator);
        Self {
            quad: quads.union(),
            words,
            text,
        }
    }
}

/// Lines of one paragraph or region, top to bottom.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    pub lines: Vec<TextLine>,
    pub quad: Quad,
    pub text: String,
}

impl TextBlock {
    pub fn new(mut lines: Vec<TextLine>, separator: &str) -> Self {
        order_top_down(&mut lines, |l| &l.quad);
        let quads: Vec<Quad> = lines.iter().map(|l| l.quad).collect();
        let text = lines
            .iter()
            .map(|l| l.text.as_str())
            .join(separator);
        Self {
            quad: quads.union(),
            lines,
            text,
        }
    }

    pub fn words(&self) -> impl Iterator<Item = &TextWord> {
        self.lines.iter().flat_map(|l| l.words.iter())
    }
}

impl fmt::Display for TextWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl fmt::Display for TextLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl fmt::Display for TextBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Joins block texts, e.g. with a blank line between paragraphs.
pub fn blocks_text(blocks: &[TextBlock], separator: &str) -> String {
    blocks
        .iter()
        .map(|b| b.text.as_str())
        .join(separator)
}

/// Dominant baseline direction and "up" vector of a set of quads.
fn reading_frame<'a, I>(quads: I) -> (Point, Point)
where
    I: IntoIterator<Item = &'a Quad>,
{
    let mut dir = Point::ZERO;
    let mut up = Point::ZERO;
    for q in quads {
        dir = dir + (q.bottom_right - q.bottom_left).normalize();
        up = up + (q.top_left - q.bottom_left).normalize();
    }
    let dir = if dir.norm() > 0.0 {
        dir.normalize()
    } else {
        Point::new(1.0, 0.0)
    };
    let up = if up.norm() > 0.0 {
        up.normalize()
    } else {
        dir.ortho()
    };
    (dir, up)
}

/// Sorts items along their common baseline direction.
pub fn order_by_reading_direction<T, F>(items: &mut [T], quad: F)
where
    F: Fn(&T) -> &Quad,
{
    let (dir, _) = reading_frame(items.iter().map(&quad));
    items.sort_by(|a, b| {
        let (qa, qb) = (quad(a), quad(b));
        qa.bottom_left
            .dot(dir)
            .total_cmp(&qb.bottom_left.dot(dir))
            .then(qa.top_left.dot(dir).total_cmp(&qb.top_left.dot(dir)))
    });
}

/// Sorts items from the top of the reading frame down, then along the
/// baseline direction.
pub fn order_top_down<T, F>(items: &mut [T], quad: F)
where
    F: Fn(&T) -> &Quad,
{
    let (dir, up) = reading_frame(items.iter().map(&quad));
    items.sort_by(|a, b| {
        let (qa, qb) = (quad(a), quad(b));
        qb.bottom_left
            .dot(up)
            .total_cmp(&qa.bottom_left.dot(up))
            .then(qa.bottom_left.dot(dir).total_cmp(&qb.bottom_left.dot(dir)))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ch(rune: char, l: f64, r: f64) -> Char {
        Char::new(
            rune,
            Quad::from_ltrb(l, 0.0, r, 5.0),
            Point::new(l, 0.0),
            Point::new(r, 0.0),
        )
    }

    #[test]
    fn word_orders_chars_left_to_right() {
        let w = TextWord::new(vec![ch('t', 6.0, 9.0), ch('c', 0.0, 3.0), ch('a', 3.0, 6.0)]);
        assert_eq!(w.text, "cat");
        assert_eq!(w.start_baseline, Point::new(0.0, 0.0));
        assert_eq!(w.end_baseline, Point::new(9.0, 0.0));
        assert_eq!(w.orientation, Orientation::Horizontal);
        assert_eq!(w.confidence, VECTOR_CONFIDENCE);
    }

    #[test]
    fn block_orders_lines_top_down() {
        let line = |text: char, y: f64| {
            let c = Char::new(
                text,
                Quad::from_ltrb(0.0, y, 4.0, y + 5.0),
                Point::new(0.0, y),
                Point::new(4.0, y),
            );
            TextLine::new(vec![TextWord::new(vec![c])], " ")
        };
        let block = TextBlock::new(vec![line('b', 0.0), line('a', 10.0)], "\n");
        assert_eq!(block.to_string(), "a\nb");
    }

    #[test]
    fn whitespace_word() {
        assert!(TextWord::new(vec![ch(' ', 0.0, 1.0)]).is_whitespace());
        assert!(!TextWord::new(vec![ch('x', 0.0, 1.0)]).is_whitespace());
    }
}

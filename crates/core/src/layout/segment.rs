//! Page segmenters turn words into blocks.

use super::params::PageSegmenterParams;
use super::text::{TextBlock, TextLine, TextWord};

/// Groups the words of one page into blocks.
pub trait PageSegmenter {
    fn blocks(&self, words: &[TextWord]) -> Vec<TextBlock>;
}

/// Puts every word sharing a bottom edge on one line and all lines in a
/// single block. Suitable for simple single-column pages.
#[derive(Debug, Clone, Default)]
pub struct BasicPageSegmenter {
    params: PageSegmenterParams,
}

impl BasicPageSegmenter {
    pub fn new(params: PageSegmenterParams) -> Self {
        Self { params }
    }
}

impl PageSegmenter for BasicPageSegmenter {
    fn blocks(&self, words: &[TextWord]) -> Vec<TextBlock> {
        let words: Vec<&TextWord> = words.iter().filter(|w| !w.is_whitespace()).collect();
        if words.is_empty() {
            return Vec::new();
        }

        // A new line starts wherever consecutive bottoms differ by more than
        // epsilon.
        let mut words = words;
        words.sort_by(|a, b| a.quad.bottom().total_cmp(&b.quad.bottom()));
        let mut rows: Vec<Vec<TextWord>> = Vec::new();
        let mut last = f64::NEG_INFINITY;
        for w in words {
            let bottom = w.quad.bottom();
            if bottom - last <= self.params.epsilon
                && let Some(row) = rows.last_mut()
            {
                row.push(w.clone());
            } else {
                rows.push(vec![w.clone()]);
            }
            last = bottom;
        }

        let lines: Vec<TextLine> = rows
            .into_iter()
            .map(|row| TextLine::new(row, &self.params.word_separator))
            .collect();
        vec![TextBlock::new(lines, &self.params.line_separator)]
    }
}

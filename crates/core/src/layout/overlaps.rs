use rustc_hash::FxHashMap;

use super::text::Char;

/// Drops letters drawn on top of an identical earlier letter.
///
/// Some producers fake bold text by painting every glyph twice with a small
/// offset. A letter is dropped when an already kept letter has the same rune
/// and their bounds overlap in their interiors; letters that merely touch
/// (as in "ll") are kept. Order of the kept letters is preserved.
pub fn remove_overlapping_letters(chars: &[Char]) -> Vec<Char> {
    let mut kept: Vec<Char> = Vec::with_capacity(chars.len());
    let mut by_rune: FxHashMap<char, Vec<usize>> = FxHashMap::default();

    for c in chars {
        let bounds = c.quad.bounds();
        let slots = by_rune.entry(c.rune).or_default();
        let duplicate = slots
            .iter()
            .any(|&k| kept[k].quad.bounds().interior_intersects(&bounds));
        if !duplicate {
            slots.push(kept.len());
            kept.push(c.clone());
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Point, Quad};

    fn ch(rune: char, l: f64) -> Char {
        Char::new(
            rune,
            Quad::from_ltrb(l, 0.0, l + 3.0, 5.0),
            Point::new(l, 0.0),
            Point::new(l + 3.0, 0.0),
        )
    }

    #[test]
    fn fake_bold_duplicates_are_removed() {
        let chars = [ch('b', 0.0), ch('b', 0.3), ch('o', 3.0), ch('o', 3.3)];
        let kept = remove_overlapping_letters(&chars);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].quad.left(), 0.0);
        assert_eq!(kept[1].rune, 'o');
    }

    #[test]
    fn touching_repeats_survive() {
        let chars = [ch('l', 0.0), ch('l', 3.0)];
        assert_eq!(remove_overlapping_letters(&chars).len(), 2);
    }

    #[test]
    fn different_runes_may_overlap() {
        let chars = [ch('f', 0.0), ch('i', 1.0)];
        assert_eq!(remove_overlapping_letters(&chars).len(), 2);
    }
}

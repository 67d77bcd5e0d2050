//! Font descriptors and the shared font cache.

use std::sync::{Arc, Mutex};

use bitflags::bitflags;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::path::Path;
use crate::geometry::Rect;

bitflags! {
    /// Style bits reported by the rendering collaborator.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct FontStyle: u8 {
        const BOLD = 1 << 0;
        const ITALIC = 1 << 1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FontFamily {
    #[default]
    Sans,
    Serif,
    Mono,
}

/// Metrics and outlines of one font, in glyph space (1 unit = 1 em).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Font {
    pub name: String,
    pub family: FontFamily,
    pub style: FontStyle,
    /// Distance from baseline to the top of the tallest glyph, positive.
    pub ascender: f64,
    /// Distance from baseline to the bottom of descenders, negative.
    pub descender: f64,
    pub bbox: Rect,
    /// Glyph outlines keyed by glyph id. Optional; devices that rasterize
    /// text skip glyphs without an outline.
    #[serde(default)]
    pub outlines: FxHashMap<u32, Path>,
}

impl Default for Font {
    fn default() -> Self {
        Self {
            name: String::new(),
            family: FontFamily::Sans,
            style: FontStyle::empty(),
            ascender: 0.8,
            descender: -0.2,
            bbox: Rect::from_corners(0.0, -0.2, 1.0, 0.8),
            outlines: FxHashMap::default(),
        }
    }
}

impl Font {
    pub fn new(name: &str, ascender: f64, descender: f64) -> Self {
        Self {
            name: name.to_string(),
            ascender,
            descender,
            bbox: Rect::from_corners(0.0, descender, 1.0, ascender),
            ..Self::default()
        }
    }

    pub fn is_bold(&self) -> bool {
        self.style.contains(FontStyle::BOLD)
    }

    pub fn is_italic(&self) -> bool {
        self.style.contains(FontStyle::ITALIC)
    }

    pub fn outline(&self, glyph_id: u32) -> Option<&Path> {
        self.outlines.get(&glyph_id)
    }
}

/// Read-mostly cache of fonts shared between pages.
///
/// Cloning the cache clones the handle, not the fonts; pass it explicitly to
/// whatever builds [`super::TextSpan`]s.
#[derive(Debug, Clone, Default)]
pub struct FontCache {
    fonts: Arc<Mutex<FxHashMap<String, Arc<Font>>>>,
}

impl FontCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<Arc<Font>> {
        let fonts = self.fonts.lock().unwrap_or_else(|e| e.into_inner());
        fonts.get(name).cloned()
    }

    /// Stores a font, replacing any previous font with the same name.
    pub fn insert(&self, font: Font) -> Arc<Font> {
        let font = Arc::new(font);
        let mut fonts = self.fonts.lock().unwrap_or_else(|e| e.into_inner());
        fonts.insert(font.name.clone(), Arc::clone(&font));
        font
    }

    pub fn get_or_insert_with<F>(&self, name: &str, load: F) -> Arc<Font>
    where
        F: FnOnce() -> Font,
    {
        let mut fonts = self.fonts.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(
            fonts
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(load())),
        )
    }

    pub fn len(&self) -> usize {
        self.fonts.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

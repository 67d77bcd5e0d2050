//! vellum - page content recording, rasterization and Docstrum text
//! segmentation.
//!
//! A rendering collaborator drives a [`device::Device`] with drawing
//! operations. Recorded into a [`device::DisplayList`], a page can be replayed
//! into any device: the [`device::DrawDevice`] rasterizes it, the
//! [`device::ContentDevice`] turns its glyphs (and optional OCR words) into
//! words, lines and blocks.

pub mod device;
pub mod error;
pub mod geometry;
pub mod layout;
pub mod model;
pub mod ocr;
pub mod page;
pub mod utils;

pub use device::{
    CompositeDevice, ContentDevice, ContentOptions, Device, DisplayList, DrawDevice, ListDevice,
    PageContent, TraceDevice,
};
pub use error::{DeviceError, Result, VellumError};
pub use page::{GlyphRun, Page, RenderOptions, extract_pages};

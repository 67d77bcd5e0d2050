//! Decoded raster images handed to devices.

use std::io::Cursor;
use std::sync::Arc;

use image::{DynamicImage, ImageBuffer, ImageFormat, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::error::{Result, VellumError};
use crate::geometry::{Matrix, Rect};

/// Decoded image samples, 8 bits per component, row-major.
///
/// `components` is 1 (gray or mask coverage), 3 (RGB) or 4 (RGBA). Samples are
/// shared so recording an image into a display list does not copy it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub width: u32,
    pub height: u32,
    pub components: u8,
    pub data: Arc<[u8]>,
}

impl Image {
    pub fn new(width: u32, height: u32, components: u8, data: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * components as usize;
        if width == 0 || height == 0 || !matches!(components, 1 | 3 | 4) || data.len() != expected {
            return Err(VellumError::InvalidRaster { width, height });
        }
        Ok(Self {
            width,
            height,
            components,
            data: data.into(),
        })
    }

    pub fn from_dynamic(img: &DynamicImage) -> Self {
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        Self {
            width,
            height,
            components: 4,
            data: rgba.into_raw().into(),
        }
    }

    /// Pixel-space bounds `0..width x 0..height`.
    pub fn rect(&self) -> Rect {
        Rect::from_xywh(0.0, 0.0, self.width as f64, self.height as f64)
    }

    /// Pixel space (row 0 at the top) to the unit square (y up). Concatenated
    /// with an image's fill matrix this maps pixels to page space.
    pub fn pixel_matrix(&self) -> Matrix {
        Matrix::scale(1.0 / self.width as f64, -1.0 / self.height as f64)
            .concat(&Matrix::translate(0.0, 1.0))
    }

    /// Expands samples to straight-alpha RGBA.
    pub fn to_rgba8(&self) -> Vec<u8> {
        match self.components {
            4 => self.data.to_vec(),
            3 => self
                .data
                .chunks_exact(3)
                .flat_map(|c| [c[0], c[1], c[2], 255])
                .collect(),
            _ => self.data.iter().flat_map(|&g| [g, g, g, 255]).collect(),
        }
    }

    /// Per-pixel coverage for image masks: the gray sample, or alpha for RGBA.
    pub fn coverage(&self) -> Vec<u8> {
        match self.components {
            4 => self.data.chunks_exact(4).map(|c| c[3]).collect(),
            3 => self
                .data
                .chunks_exact(3)
                .map(|c| ((c[0] as u16 + c[1] as u16 + c[2] as u16) / 3) as u8)
                .collect(),
            _ => self.data.to_vec(),
        }
    }

    pub fn to_dynamic(&self) -> Result<DynamicImage> {
        let buffer: RgbaImage = ImageBuffer::<Rgba<u8>, Vec<u8>>::from_raw(
            self.width,
            self.height,
            self.to_rgba8(),
        )
        .ok_or(VellumError::InvalidRaster {
            width: self.width,
            height: self.height,
        })?;
        Ok(DynamicImage::ImageRgba8(buffer))
    }

    pub fn png_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Cursor::new(Vec::new());
        self.to_dynamic()?.write_to(&mut out, ImageFormat::Png)?;
        Ok(out.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;

    #[test]
    fn rejects_mismatched_sample_count() {
        assert!(Image::new(2, 2, 3, vec![0; 11]).is_err());
        assert!(Image::new(2, 2, 3, vec![0; 12]).is_ok());
    }

    #[test]
    fn gray_expands_to_opaque_rgba() {
        let img = Image::new(1, 1, 1, vec![7]).unwrap();
        assert_eq!(img.to_rgba8(), vec![7, 7, 7, 255]);
    }

    #[test]
    fn pixel_matrix_flips_rows() {
        let img = Image::new(4, 2, 1, vec![0; 8]).unwrap();
        let m = img.pixel_matrix();
        assert_eq!(m.transform_point(Point::new(0.0, 0.0)), Point::new(0.0, 1.0));
        assert_eq!(m.transform_point(Point::new(4.0, 2.0)), Point::new(1.0, 0.0));
    }

    #[test]
    fn png_has_signature() {
        let img = Image::new(2, 1, 4, vec![255; 8]).unwrap();
        let png = img.png_bytes().unwrap();
        assert_eq!(&png[..4], &[0x89, b'P', b'N', b'G']);
    }
}

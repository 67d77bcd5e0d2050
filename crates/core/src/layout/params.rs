//! Segmentation parameters.
//!
//! Contains the tunables for word extraction and Docstrum page segmentation.

use serde::{Deserialize, Serialize};

use crate::geometry::Range;
use crate::utils::DEFAULT_EPSILON;

/// Parameters for Docstrum page segmentation.
///
/// Angles are in degrees, distances in page units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocstrumParams {
    /// Tolerance for geometric equality checks.
    pub epsilon: f64,

    /// Allowed angle between a word's baseline and the segment joining its
    /// end to a neighbour's start for the two to share a line.
    pub within_line_bounds: Range,

    /// Maximum within-line link distance, relative to the estimated
    /// within-line spacing.
    pub within_line_multiplier: f64,

    /// Histogram bin width used when estimating within-line spacing.
    pub within_line_bin_size: usize,

    /// Allowed angle between a word's baseline and the segment joining its
    /// centroid to a neighbour's for the two to be on adjacent lines.
    pub between_line_bounds: Range,

    /// Maximum line-to-line link distance, relative to the estimated
    /// between-line spacing.
    pub between_line_multiplier: f64,

    /// Histogram bin width used when estimating between-line spacing.
    pub between_line_bin_size: usize,

    /// Allowed angle between two line baselines for them to join a block.
    pub angular_difference_bounds: Range,

    /// Inserted between words of a line.
    pub word_separator: String,

    /// Inserted between lines of a block.
    pub line_separator: String,
}

impl Default for DocstrumParams {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_EPSILON,
            within_line_bounds: Range::new(-30.0, 30.0),
            within_line_multiplier: 3.0,
            within_line_bin_size: 10,
            between_line_bounds: Range::new(45.0, 135.0),
            between_line_multiplier: 1.3,
            between_line_bin_size: 10,
            angular_difference_bounds: Range::new(-30.0, 30.0),
            word_separator: " ".to_string(),
            line_separator: "\n".to_string(),
        }
    }
}

/// Distance metric used when linking letters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistanceMetric {
    Euclidean,
    Manhattan,
}

impl DistanceMetric {
    pub fn measure(self) -> fn(crate::geometry::Point, crate::geometry::Point) -> f64 {
        match self {
            DistanceMetric::Euclidean => super::cluster::euclidean_distance,
            DistanceMetric::Manhattan => super::cluster::manhattan_distance,
        }
    }
}

/// Parameters for nearest-neighbour word extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WordExtractorParams {
    /// Tolerance for classifying letter orientation.
    pub epsilon: f64,

    /// Extract each orientation separately.
    pub group_by_orientation: bool,

    /// Two letters join when the gap is below this fraction of the wider
    /// letter's width.
    pub max_distance_factor: f64,

    /// Metric for horizontal and right-angle rotated letters.
    pub axis_aligned_metric: DistanceMetric,

    /// Metric for letters at any other angle.
    pub metric: DistanceMetric,
}

impl Default for WordExtractorParams {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_EPSILON,
            group_by_orientation: true,
            max_distance_factor: 0.2,
            axis_aligned_metric: DistanceMetric::Manhattan,
            metric: DistanceMetric::Euclidean,
        }
    }
}

/// Separators used by the basic segmenter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageSegmenterParams {
    pub epsilon: f64,
    pub word_separator: String,
    pub line_separator: String,
}

impl Default for PageSegmenterParams {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_EPSILON,
            word_separator: " ".to_string(),
            line_separator: "\n".to_string(),
        }
    }
}

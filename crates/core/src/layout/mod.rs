//! Text segmentation.
//!
//! This module contains:
//! - The segmentation model (chars, words, lines, blocks)
//! - A 2-d tree with tie-keeping k-nearest-neighbour queries
//! - Nearest-neighbour clustering
//! - Word extraction and overlapping-letter removal
//! - Basic and Docstrum page segmenters

pub mod cluster;
pub mod docstrum;
pub mod kdtree;
pub mod overlaps;
pub mod params;
pub mod segment;
pub mod text;
pub mod words;

pub use cluster::{
    NeighborRule, cluster_by_rule, euclidean_distance, group_indices_nn, manhattan_distance,
    nearest_neighbor_edges,
};
pub use docstrum::{DocstrumSegmenter, SpacingEstimate, StructuralRelation};
pub use kdtree::{KdResult, KdTree};
pub use overlaps::remove_overlapping_letters;
pub use params::{DistanceMetric, DocstrumParams, PageSegmenterParams, WordExtractorParams};
pub use segment::{BasicPageSegmenter, PageSegmenter};
pub use text::{Char, TextBlock, TextLine, TextWord, VECTOR_CONFIDENCE, blocks_text};
pub use words::{NearestNeighborWordExtractor, WordExtractor};

//! Letters to words.

use tracing::debug;

use super::cluster::{NeighborRule, cluster_by_rule};
use super::params::{DistanceMetric, WordExtractorParams};
use super::text::{Char, TextWord};
use crate::geometry::{Orientation, Point};

/// Groups characters into words.
pub trait WordExtractor {
    fn words(&self, chars: &[Char]) -> Vec<TextWord>;
}

/// Links each letter to the letter whose baseline starts closest to where
/// its own baseline ends.
#[derive(Debug, Clone, Default)]
pub struct NearestNeighborWordExtractor {
    params: WordExtractorParams,
}

impl NearestNeighborWordExtractor {
    pub fn new(params: WordExtractorParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &WordExtractorParams {
        &self.params
    }

    fn extract(&self, chars: &[Char], metric: DistanceMetric) -> Vec<TextWord> {
        if chars.is_empty() {
            return Vec::new();
        }
        let rule = LetterRule {
            factor: self.params.max_distance_factor,
            measure: metric.measure(),
        };
        cluster_by_rule(chars, &rule)
            .into_iter()
            .map(|group| {
                let members = group.into_iter().map(|i| chars[i].clone()).collect();
                TextWord::with_epsilon(members, self.params.epsilon)
            })
            .collect()
    }
}

impl WordExtractor for NearestNeighborWordExtractor {
    fn words(&self, chars: &[Char]) -> Vec<TextWord> {
        let chars: Vec<Char> = chars
            .iter()
            .map(|c| {
                let mut c = c.clone();
                c.reorient(self.params.epsilon);
                c
            })
            .collect();
        if !self.params.group_by_orientation {
            return self.extract(&chars, self.params.metric);
        }

        let mut words = Vec::new();
        for orientation in [
            Orientation::Horizontal,
            Orientation::Rotate90,
            Orientation::Rotate270,
            Orientation::Rotate180,
            Orientation::Other,
        ] {
            let group: Vec<Char> = chars
                .iter()
                .filter(|c| c.orientation == orientation)
                .cloned()
                .collect();
            let metric = if orientation.is_axis_aligned() {
                self.params.axis_aligned_metric
            } else {
                self.params.metric
            };
            let found = self.extract(&group, metric);
            if !found.is_empty() {
                debug!(?orientation, letters = group.len(), words = found.len(), "extracted words");
            }
            words.extend(found);
        }
        words
    }
}

struct LetterRule {
    factor: f64,
    measure: fn(Point, Point) -> f64,
}

impl NeighborRule<Char> for LetterRule {
    fn candidate_point(&self, item: &Char) -> Point {
        item.start_baseline
    }

    fn pivot_point(&self, item: &Char) -> Point {
        item.end_baseline
    }

    fn distance(&self, a: Point, b: Point) -> f64 {
        (self.measure)(a, b)
    }

    fn accept_pivot(&self, pivot: &Char) -> bool {
        !pivot.is_whitespace()
    }

    fn accept(&self, pivot: &Char, candidate: &Char, distance: f64) -> bool {
        if candidate.is_whitespace() {
            return false;
        }
        distance < self.factor * pivot.quad.width().max(candidate.quad.width())
    }
}

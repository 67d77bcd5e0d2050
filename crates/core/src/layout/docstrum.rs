//! Docstrum page segmentation.
//!
//! Three passes over the non-whitespace words of a page:
//!
//! 1. Estimate the typical within-line and between-line spacing from the
//!    2 nearest neighbours of every word. Each estimate is the mean of the
//!    most populated histogram bin, which ignores outliers like wide
//!    punctuation gaps or superscripts.
//! 2. Link every word to its nearest neighbour along the baseline that is
//!    within a multiple of the within-line spacing; connected components
//!    become lines.
//! 3. Link every line to the closest line below it whose extent overlaps and
//!    whose baseline is nearly parallel, within a multiple of the between-line
//!    spacing; connected components become blocks.

use rustc_hash::FxHashMap;
use tracing::debug;

use super::cluster::{NeighborRule, cluster_by_rule, euclidean_distance, group_indices_nn};
use super::kdtree::KdTree;
use super::params::DocstrumParams;
use super::segment::PageSegmenter;
use super::text::{TextBlock, TextLine, TextWord, order_top_down};
use crate::geometry::{Line, Point, Quad, Range};
use crate::utils::{approx_zero, bound_angle_180, line_angle};

/// Docstrum bounding-box page segmenter.
#[derive(Debug, Clone, Default)]
pub struct DocstrumSegmenter {
    params: DocstrumParams,
}

impl PageSegmenter for DocstrumSegmenter {
    fn blocks(&self, words: &[TextWord]) -> Vec<TextBlock> {
        let words: Vec<TextWord> = words.iter().filter(|w| !w.is_whitespace()).cloned().collect();
        if words.is_empty() {
            return Vec::new();
        }

        let spacing = self.spacing_estimate(&words);
        let max_within = self.params.within_line_multiplier * spacing.within_line;
        let max_between = self.params.between_line_multiplier * spacing.between_line;
        debug!(
            words = words.len(),
            within_line = spacing.within_line,
            between_line = spacing.between_line,
            "docstrum spacing"
        );

        let lines = self.lines(&words, max_within);
        let mut blocks = self.structural_blocks(lines, max_between);
        order_top_down(&mut blocks, |b| &b.quad);
        debug!(blocks = blocks.len(), "docstrum blocks");
        blocks
    }
}

/// Estimated page spacing; zero when no neighbour pair qualified.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SpacingEstimate {
    pub within_line: f64,
    pub between_line: f64,
}

/// How two line segments relate for block linking.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StructuralRelation {
    /// Angle from the first line's direction to the second's, in degrees.
    pub angular_difference: f64,
    /// Overlap (negative) or gap (positive) of the projected extents,
    /// relative to the second line's length.
    pub normalized_overlap: f64,
    /// Signed offset of the overlap midpoint from the first line.
    pub perpendicular_distance: f64,
    pub overlapping: bool,
}

impl DocstrumSegmenter {
    pub fn new(params: DocstrumParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &DocstrumParams {
        &self.params
    }

    pub fn spacing_estimate(&self, words: &[TextWord]) -> SpacingEstimate {
        let tree = KdTree::new(words, |w| w.quad.bottom_left);
        let mut within = Vec::new();
        let mut between = Vec::new();

        for (i, word) in words.iter().enumerate() {
            for res in tree.nearest_neighbors(i, 2, |w| w.quad.bottom_right, euclidean_distance) {
                let candidate = &words[res.index].quad;
                if self.params.within_line_bounds.contains(within_line_angle(&word.quad, candidate)) {
                    within.push(res.distance);
                }
            }

            for res in tree.nearest_neighbors(i, 2, |w| w.quad.top_left, euclidean_distance) {
                let candidate = &words[res.index].quad;
                let angle = between_line_angle(&word.quad, candidate);
                if !self.params.between_line_bounds.contains(angle) {
                    continue;
                }
                let hypotenuse = word.quad.centroid().distance(candidate.centroid());
                let angle = if angle > 90.0 { angle - 180.0 } else { angle };
                let dist = (hypotenuse * (90.0 - angle).to_radians().cos()).abs()
                    - word.quad.glyph_height() / 2.0
                    - candidate.glyph_height() / 2.0;
                if dist >= 0.0 {
                    between.push(dist);
                }
            }
        }

        SpacingEstimate {
            within_line: peak_average(&within, self.params.within_line_bin_size).unwrap_or(0.0),
            between_line: peak_average(&between, self.params.between_line_bin_size).unwrap_or(0.0),
        }
    }

    fn lines(&self, words: &[TextWord], max_distance: f64) -> Vec<TextLine> {
        let rule = LineRule {
            bounds: self.params.within_line_bounds,
            max_distance,
        };
        cluster_by_rule(words, &rule)
            .into_iter()
            .map(|group| {
                let members = group.into_iter().map(|i| words[i].clone()).collect();
                TextLine::new(members, &self.params.word_separator)
            })
            .collect()
    }

    fn structural_blocks(&self, lines: Vec<TextLine>, max_distance: f64) -> Vec<TextBlock> {
        let pivots: Vec<Line> = lines
            .iter()
            .map(|l| Line::new(l.quad.bottom_left, l.quad.bottom_right))
            .collect();
        let candidates: Vec<Line> = lines
            .iter()
            .map(|l| Line::new(l.quad.top_left, l.quad.top_right))
            .collect();

        let edges: Vec<Option<usize>> = pivots
            .iter()
            .enumerate()
            .map(|(i, pivot)| {
                let mut closest = None;
                let mut best = f64::INFINITY;
                for (j, candidate) in candidates.iter().enumerate() {
                    if j == i {
                        continue;
                    }
                    let d = self.perpendicular_overlapping_distance(pivot, candidate);
                    if d < best {
                        best = d;
                        closest = Some(j);
                    }
                }
                closest.filter(|_| best < max_distance)
            })
            .collect();

        let mut slots: Vec<Option<TextLine>> = lines.into_iter().map(Some).collect();
        group_indices_nn(&edges)
            .into_iter()
            .map(|group| {
                let members = group.into_iter().filter_map(|i| slots[i].take()).collect();
                TextBlock::new(members, &self.params.line_separator)
            })
            .collect()
    }

    /// Perpendicular distance between two overlapping, nearly parallel
    /// lines; infinite otherwise.
    pub fn perpendicular_overlapping_distance(&self, a: &Line, b: &Line) -> f64 {
        match self.structural_relation(a, b) {
            Some(rel) if rel.overlapping => {
                let theta = fold_90(rel.angular_difference);
                if self.params.angular_difference_bounds.contains(theta) {
                    rel.perpendicular_distance.abs()
                } else {
                    f64::INFINITY
                }
            }
            _ => f64::INFINITY,
        }
    }

    /// Projects `a`'s endpoints onto `b` and measures the overlap of the
    /// projected segment with `b`. `None` when the lines are perpendicular or
    /// too short to project.
    pub fn structural_relation(&self, a: &Line, b: &Line) -> Option<StructuralRelation> {
        let eps = self.params.epsilon;
        if a.approx_eq(b, eps) {
            return Some(StructuralRelation {
                angular_difference: 0.0,
                normalized_overlap: 1.0,
                perpendicular_distance: 0.0,
                overlapping: true,
            });
        }

        let di = a.delta();
        let dj = b.delta();
        let angular_difference = bound_angle_180((dj.y.atan2(dj.x) - di.y.atan2(di.x)).to_degrees());

        let aj = self.translated_point(a.p1, b.p1, di, dj)?;
        let bj = self.translated_point(a.p2, b.p2, di, dj)?;

        let mut ps = [b.p1, b.p2, aj, bj];
        if dj.x != 0.0 {
            ps.sort_by(|p, q| p.x.total_cmp(&q.x).then(p.y.total_cmp(&q.y)));
        } else if dj.y != 0.0 {
            ps.sort_by(|p, q| p.y.total_cmp(&q.y));
        }
        let (c, d) = (ps[1], ps[2]);

        let overlapping = point_in_segment(b.p1, b.p2, c)
            && point_in_segment(b.p1, b.p2, d)
            && point_in_segment(aj, bj, c)
            && point_in_segment(aj, bj, d);

        let pj = c.distance(d);
        let signed = if overlapping { -pj } else { pj };
        let length = b.length();
        let normalized_overlap = if length > 0.0 { signed / length } else { 0.0 };

        let mid = (c + d) * 0.5;
        let perpendicular_distance = if !approx_zero(di.x, eps) && !approx_zero(di.y, eps) {
            ((mid.x - a.p1.x) - (mid.y - a.p1.y) * di.x / di.y)
                / (di.x * di.x / (di.y * di.y) + 1.0).sqrt()
        } else if approx_zero(di.x, eps) {
            mid.x - a.p1.x
        } else {
            mid.y - a.p1.y
        };

        Some(StructuralRelation {
            angular_difference,
            normalized_overlap,
            perpendicular_distance,
            overlapping,
        })
    }

    /// Point on line `j` (through `pj` with direction `dj`) reached from `pi`
    /// by moving perpendicular to direction `di`.
    fn translated_point(&self, pi: Point, pj: Point, di: Point, dj: Point) -> Option<Point> {
        let eps = self.params.epsilon;
        let dyi_dyj = di.y * dj.y;
        let dxi_dxj = di.x * dj.x;
        let denominator = dyi_dyj + dxi_dxj;
        if approx_zero(denominator, eps) {
            return None;
        }

        if !approx_zero(dj.x, eps) {
            let x = (pi.x * dxi_dxj + pj.x * dyi_dyj + dj.x * di.y * (pi.y - pj.y)) / denominator;
            let y = dj.y / dj.x * (x - pj.x) + pj.y;
            Some(Point::new(x, y))
        } else {
            let y = (pi.y * dyi_dyj + pj.y * dxi_dxj + dj.y * di.x * (pi.x - pj.x)) / denominator;
            Some(Point::new(pj.x, y))
        }
    }
}

struct LineRule {
    bounds: Range,
    max_distance: f64,
}

impl NeighborRule<TextWord> for LineRule {
    fn candidate_point(&self, item: &TextWord) -> Point {
        item.quad.bottom_left
    }

    fn pivot_point(&self, item: &TextWord) -> Point {
        item.quad.bottom_right
    }

    fn k(&self) -> usize {
        2
    }

    fn accept(&self, pivot: &TextWord, candidate: &TextWord, distance: f64) -> bool {
        distance < self.max_distance
            && self.bounds.contains(within_line_angle(&pivot.quad, &candidate.quad))
    }
}

/// Angle of the gap from `pivot`'s end to `candidate`'s start, relative to
/// `pivot`'s baseline, folded into [-90, 90].
pub fn within_line_angle(pivot: &Quad, candidate: &Quad) -> f64 {
    fold_90(bound_angle_180(
        line_angle(pivot.bottom_right, candidate.bottom_left) - pivot.rotation(),
    ))
}

/// Angle between centroids relative to `pivot`'s baseline, in [0, 180].
pub fn between_line_angle(pivot: &Quad, candidate: &Quad) -> f64 {
    let angle = bound_angle_180(line_angle(pivot.centroid(), candidate.centroid()) - pivot.rotation());
    if angle < 0.0 { angle + 180.0 } else { angle }
}

fn fold_90(angle: f64) -> f64 {
    if angle > 90.0 {
        angle - 180.0
    } else if angle < -90.0 {
        angle + 180.0
    } else {
        angle
    }
}

fn point_in_segment(start: Point, end: Point, p: Point) -> bool {
    let a = p - start;
    let b = end - start;
    let dot = a.dot(b);
    dot >= 0.0 && dot <= b.dot(b)
}

/// Mean of the most populated histogram bin, `None` without finite data.
///
/// The bin width shrinks to the largest distance when that is smaller, and
/// ties between bins resolve to the lowest bin. Only occupied bins are
/// stored, so a far outlier costs one entry.
pub fn peak_average(distances: &[f64], bin_size: usize) -> Option<f64> {
    let max = distances
        .iter()
        .copied()
        .filter(|d| d.is_finite())
        .fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return None;
    }

    let max = max.ceil();
    let mut bin = bin_size.max(1) as f64;
    if max > 0.0 && bin > max {
        bin = max;
    }

    let mut bins: FxHashMap<u64, (usize, f64)> = FxHashMap::default();
    for &d in distances.iter().filter(|d| d.is_finite()) {
        let entry = bins.entry((d / bin).floor().max(0.0) as u64).or_default();
        entry.0 += 1;
        entry.1 += d;
    }

    let (_, (count, sum)) = bins
        .into_iter()
        .min_by(|(ka, (na, _)), (kb, (nb, _))| nb.cmp(na).then(ka.cmp(kb)))?;
    Some(sum / count as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peak_average_ignores_outliers() {
        let d = [4.0, 4.2, 3.8, 4.0, 25.0, 31.0];
        let avg = peak_average(&d, 10).unwrap();
        assert!((avg - 4.0).abs() < 1e-9);
    }

    #[test]
    fn peak_average_without_data() {
        assert_eq!(peak_average(&[], 10), None);
    }

    #[test]
    fn peak_average_survives_far_outlier() {
        let d = [1.0, 1.2, 1.1, 1e300, f64::INFINITY];
        let avg = peak_average(&d, 1).unwrap();
        assert!((avg - 1.1).abs() < 1e-9);
    }

    #[test]
    fn peak_average_ties_pick_lowest_bin() {
        let avg = peak_average(&[25.0, 27.0, 3.0, 5.0], 10).unwrap();
        assert!((avg - 4.0).abs() < 1e-9);
    }

    #[test]
    fn peak_average_all_zero() {
        assert_eq!(peak_average(&[0.0, 0.0], 10), Some(0.0));
    }

    #[test]
    fn parallel_lines_relation() {
        let seg = DocstrumSegmenter::default();
        let a = Line::new(Point::new(0.0, 10.0), Point::new(50.0, 10.0));
        let b = Line::new(Point::new(10.0, 6.0), Point::new(60.0, 6.0));
        let rel = seg.structural_relation(&a, &b).unwrap();
        assert!(rel.overlapping);
        assert_eq!(rel.angular_difference, 0.0);
        assert!((rel.perpendicular_distance + 4.0).abs() < 1e-9);
        assert!((rel.normalized_overlap + 0.8).abs() < 1e-9);
        assert!((seg.perpendicular_overlapping_distance(&a, &b) - 4.0).abs() < 1e-9);
    }

    #[test]
    fn perpendicular_lines_cannot_relate() {
        let seg = DocstrumSegmenter::default();
        let a = Line::new(Point::new(0.0, 0.0), Point::new(10.0, 0.0));
        let b = Line::new(Point::new(5.0, -5.0), Point::new(5.0, 5.0));
        assert!(seg.structural_relation(&a, &b).is_none());
        assert_eq!(seg.perpendicular_overlapping_distance(&a, &b), f64::INFINITY);
    }

    #[test]
    fn disjoint_extents_do_not_overlap() {
        let seg = DocstrumSegmenter::default();
        let a = Line::new(Point::new(0.0, 10.0), Point::new(10.0, 10.0));
        let b = Line::new(Point::new(20.0, 6.0), Point::new(30.0, 6.0));
        let rel = seg.structural_relation(&a, &b).unwrap();
        assert!(!rel.overlapping);
        assert_eq!(seg.perpendicular_overlapping_distance(&a, &b), f64::INFINITY);
    }

    #[test]
    fn angles_relative_to_baseline() {
        let a = Quad::from_ltrb(0.0, 0.0, 10.0, 10.0);
        let right = Quad::from_ltrb(14.0, 0.0, 24.0, 10.0);
        let above = Quad::from_ltrb(0.0, 14.0, 10.0, 24.0);
        assert!(within_line_angle(&a, &right).abs() < 1e-9);
        assert!((between_line_angle(&a, &above) - 90.0).abs() < 1e-9);
    }
}

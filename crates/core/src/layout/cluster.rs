//! Nearest-neighbour clustering.
//!
//! Every grouping level (letters into words, words into lines, lines into
//! blocks) reduces to the same two steps: pick at most one neighbour per
//! element, then take connected components of the resulting edges.

use smallvec::SmallVec;

use super::kdtree::KdTree;
use crate::geometry::Point;

pub fn euclidean_distance(a: Point, b: Point) -> f64 {
    a.distance(b)
}

pub fn manhattan_distance(a: Point, b: Point) -> f64 {
    (a.x - b.x).abs() + (a.y - b.y).abs()
}

/// Connected components of a "points to" edge array.
///
/// `edges[i]` is the neighbour chosen for element `i`, if any. Edges are
/// treated as undirected. Every index in `0..edges.len()` lands in exactly one
/// group; groups are sorted and ordered by their smallest member.
pub fn group_indices_nn(edges: &[Option<usize>]) -> Vec<Vec<usize>> {
    let n = edges.len();
    let mut adjacency: Vec<SmallVec<[usize; 2]>> = vec![SmallVec::new(); n];
    for (i, edge) in edges.iter().enumerate() {
        if let Some(j) = *edge
            && j < n
            && j != i
        {
            adjacency[i].push(j);
            adjacency[j].push(i);
        }
    }

    let mut done = vec![false; n];
    let mut groups = Vec::new();
    let mut stack = Vec::new();
    for start in 0..n {
        if done[start] {
            continue;
        }
        let mut group = Vec::new();
        stack.push(start);
        while let Some(u) = stack.pop() {
            if done[u] {
                continue;
            }
            done[u] = true;
            group.push(u);
            stack.extend(adjacency[u].iter().copied().filter(|&v| !done[v]));
        }
        group.sort_unstable();
        groups.push(group);
    }
    groups
}

/// How one grouping level chooses neighbours.
///
/// The tree is built on `candidate_point`, queried from `pivot_point` with
/// `distance`, and the nearest of the `k` results that passes `accept`
/// becomes the pivot's edge.
pub trait NeighborRule<T> {
    /// Where an element sits in the tree.
    fn candidate_point(&self, item: &T) -> Point;

    /// Where a query for an element starts.
    fn pivot_point(&self, item: &T) -> Point;

    fn distance(&self, a: Point, b: Point) -> f64 {
        euclidean_distance(a, b)
    }

    fn k(&self) -> usize {
        1
    }

    fn accept_pivot(&self, _pivot: &T) -> bool {
        true
    }

    fn accept(&self, pivot: &T, candidate: &T, distance: f64) -> bool;
}

/// One optional edge per element according to `rule`.
pub fn nearest_neighbor_edges<T, R>(items: &[T], rule: &R) -> Vec<Option<usize>>
where
    R: NeighborRule<T> + ?Sized,
{
    let tree = KdTree::new(items, |item| rule.candidate_point(item));
    items
        .iter()
        .enumerate()
        .map(|(i, pivot)| {
            if !rule.accept_pivot(pivot) {
                return None;
            }
            tree.nearest_neighbors(i, rule.k(), |item| rule.pivot_point(item), |a, b| {
                rule.distance(a, b)
            })
            .into_iter()
            .find(|res| rule.accept(pivot, &items[res.index], res.distance))
            .map(|res| res.index)
        })
        .collect()
}

/// Groups of indices linked by `rule`.
pub fn cluster_by_rule<T, R>(items: &[T], rule: &R) -> Vec<Vec<usize>>
where
    R: NeighborRule<T> + ?Sized,
{
    group_indices_nn(&nearest_neighbor_edges(items, rule))
}

//! Static 2D k-d tree with k-nearest-neighbour queries.
//!
//! The tree borrows the element slice and stores indices into it; points are
//! extracted once at build time by a caller-supplied projection. Nodes live in
//! a flat arena and split on X at even depths and Y at odd depths.
//!
//! Queries return every element tied with the k-th best distance, so more than
//! `k` results can come back. Callers filter afterwards.

use ordered_float::OrderedFloat;
use smallvec::SmallVec;

use crate::geometry::Point;

/// Node in the tree arena. Leaves have no children.
#[derive(Debug, Clone)]
struct KdNode {
    index: usize,
    point: Point,
    depth: usize,
    left: Option<usize>,
    right: Option<usize>,
}

impl KdNode {
    fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }

    fn axis_value(&self, p: Point) -> f64 {
        if self.depth % 2 == 0 { p.x } else { p.y }
    }

    fn split_value(&self) -> f64 {
        self.axis_value(self.point)
    }
}

/// One neighbour returned by a query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KdResult {
    /// Index into the slice the tree was built from.
    pub index: usize,
    /// The neighbour's tree point.
    pub point: Point,
    pub distance: f64,
}

/// A k-d tree over a borrowed slice.
#[derive(Debug)]
pub struct KdTree<'a, T> {
    elements: &'a [T],
    nodes: Vec<KdNode>,
    root: Option<usize>,
}

impl<'a, T> KdTree<'a, T> {
    /// Builds the tree, placing each element at `point_fn(element)`.
    pub fn new<F>(elements: &'a [T], point_fn: F) -> Self
    where
        F: Fn(&T) -> Point,
    {
        let points: Vec<Point> = elements.iter().map(&point_fn).collect();
        let mut nodes = Vec::with_capacity(elements.len());
        let root = Self::build_range(&points, (0..elements.len()).collect(), 0, &mut nodes);
        Self {
            elements,
            nodes,
            root,
        }
    }

    fn build_range(
        points: &[Point],
        mut indices: Vec<usize>,
        depth: usize,
        arena: &mut Vec<KdNode>,
    ) -> Option<usize> {
        let leaf = |index: usize, depth: usize, arena: &mut Vec<KdNode>| {
            arena.push(KdNode {
                index,
                point: points[index],
                depth,
                left: None,
                right: None,
            });
            arena.len() - 1
        };

        match indices.len() {
            0 => return None,
            1 => return Some(leaf(indices[0], depth, arena)),
            _ => {}
        }

        let axis = |p: Point| if depth % 2 == 0 { p.x } else { p.y };
        indices.sort_by(|&a, &b| {
            axis(points[a])
                .total_cmp(&axis(points[b]))
                .then(a.cmp(&b))
        });

        if indices.len() == 2 {
            let left = leaf(indices[0], depth + 1, arena);
            arena.push(KdNode {
                index: indices[1],
                point: points[indices[1]],
                depth,
                left: Some(left),
                right: None,
            });
            return Some(arena.len() - 1);
        }

        let median = indices.len() / 2;
        let right_indices = indices.split_off(median + 1);
        let pivot = indices[median];
        indices.truncate(median);

        let left = Self::build_range(points, indices, depth + 1, arena);
        let right = Self::build_range(points, right_indices, depth + 1, arena);
        arena.push(KdNode {
            index: pivot,
            point: points[pivot],
            depth,
            left,
            right,
        });
        Some(arena.len() - 1)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn element(&self, index: usize) -> &'a T {
        &self.elements[index]
    }

    /// The `k` nearest neighbours of `elements[pivot]`, excluding the pivot
    /// itself.
    ///
    /// # Arguments
    /// * `pivot` - index of the query element in the tree's slice
    /// * `k` - number of neighbours wanted; ties at the k-th distance are kept
    /// * `pivot_point` - query point for the pivot (may differ from its tree point)
    /// * `distance` - metric; must be at least the per-axis coordinate gap
    ///   (Euclidean and Manhattan both qualify)
    pub fn nearest_neighbors<F, D>(
        &self,
        pivot: usize,
        k: usize,
        pivot_point: F,
        distance: D,
    ) -> Vec<KdResult>
    where
        F: Fn(&T) -> Point,
        D: Fn(Point, Point) -> f64,
    {
        let point = pivot_point(&self.elements[pivot]);
        self.nearest_to_point(point, k, Some(pivot), distance)
    }

    /// Single nearest neighbour; ties resolve to the lowest index.
    pub fn nearest_neighbor<F, D>(&self, pivot: usize, pivot_point: F, distance: D) -> Option<KdResult>
    where
        F: Fn(&T) -> Point,
        D: Fn(Point, Point) -> f64,
    {
        self.nearest_neighbors(pivot, 1, pivot_point, distance)
            .into_iter()
            .next()
    }

    /// k-NN query around an arbitrary point, optionally skipping one element.
    pub fn nearest_to_point<D>(
        &self,
        point: Point,
        k: usize,
        exclude: Option<usize>,
        distance: D,
    ) -> Vec<KdResult>
    where
        D: Fn(Point, Point) -> f64,
    {
        let Some(root) = self.root else {
            return Vec::new();
        };
        if k == 0 {
            return Vec::new();
        }

        let mut queue = NnQueue::new(k);
        self.search(root, point, exclude, &distance, &mut queue);
        queue.into_results(|i| self.nodes[i].index, |i| self.nodes[i].point)
    }

    fn search<D>(
        &self,
        node_idx: usize,
        point: Point,
        exclude: Option<usize>,
        distance: &D,
        queue: &mut NnQueue,
    ) where
        D: Fn(Point, Point) -> f64,
    {
        let node = &self.nodes[node_idx];
        if exclude != Some(node.index) {
            queue.insert(distance(node.point, point), node_idx);
        }
        if node.is_leaf() {
            return;
        }

        let value = node.axis_value(point);
        let split = node.split_value();
        let (near, far) = if value < split {
            (node.left, node.right)
        } else {
            (node.right, node.left)
        };

        if let Some(near) = near {
            self.search(near, point, exclude, distance, queue);
        }
        if let Some(far) = far
            && (!queue.is_full() || (value - split).abs() <= queue.worst())
        {
            self.search(far, point, exclude, distance, queue);
        }
    }
}

/// Bounded best-result queue. Entries are bucketed by distance so that every
/// entry tied with the k-th distance survives.
struct NnQueue {
    k: usize,
    count: usize,
    buckets: SmallVec<[(OrderedFloat<f64>, SmallVec<[usize; 2]>); 4]>,
}

impl NnQueue {
    fn new(k: usize) -> Self {
        Self {
            k,
            count: 0,
            buckets: SmallVec::new(),
        }
    }

    fn is_full(&self) -> bool {
        self.count >= self.k
    }

    /// Largest retained distance, infinite while not full.
    fn worst(&self) -> f64 {
        match self.buckets.last() {
            Some((d, _)) if self.is_full() => d.0,
            _ => f64::INFINITY,
        }
    }

    fn insert(&mut self, distance: f64, node: usize) {
        if distance.is_nan() || (self.is_full() && distance > self.worst()) {
            return;
        }
        let key = OrderedFloat(distance);
        match self.buckets.binary_search_by(|(d, _)| d.cmp(&key)) {
            Ok(pos) => self.buckets[pos].1.push(node),
            Err(pos) => {
                let mut items = SmallVec::new();
                items.push(node);
                self.buckets.insert(pos, (key, items));
            }
        }
        self.count += 1;

        while let Some((_, last)) = self.buckets.last() {
            if self.count - last.len() >= self.k {
                self.count -= last.len();
                self.buckets.pop();
            } else {
                break;
            }
        }
    }

    fn into_results(
        self,
        index_of: impl Fn(usize) -> usize,
        point_of: impl Fn(usize) -> Point,
    ) -> Vec<KdResult> {
        let mut out = Vec::with_capacity(self.count);
        for (d, items) in self.buckets {
            let start = out.len();
            out.extend(items.into_iter().map(|n| KdResult {
                index: index_of(n),
                point: point_of(n),
                distance: d.0,
            }));
            out[start..].sort_by_key(|r| r.index);
        }
        out
    }
}

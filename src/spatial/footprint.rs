//! R-tree over laid-out node footprints using the rstar crate.
//!
//! Provides O(log n) queries for:
//! - Hit testing a point
//! - Rectangle intersection
//! - Nearest footprint
//! - Overlap detection between footprints

use rstar::{AABB, PointDistance, RTree, RTreeObject};

use crate::tree::{Node, NodeId};

/// Axis-aligned footprint of one laid-out node.
///
/// Horizontally centered on the node's `x`; vertically spanning from its
/// `y` (top edge) down to `y + height`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Footprint {
    /// Pre-order id of the node in the tree the index was built from.
    pub id: NodeId,
    /// Top-left corner.
    pub min: [f64; 2],
    /// Bottom-right corner.
    pub max: [f64; 2],
}

impl Footprint {
    /// Footprint of a node placed at `(x, y)` with the given size.
    pub fn new(id: NodeId, x: f64, y: f64, [width, height]: [f64; 2]) -> Self {
        Self {
            id,
            min: [x - width / 2.0, y],
            max: [x + width / 2.0, y + height],
        }
    }

    /// The footprint with every edge pulled inward by `by`. Collapses onto
    /// the center along an axis narrower than `2 * by`.
    fn shrunk(&self, by: f64) -> AABB<[f64; 2]> {
        let axis = |k: usize| {
            let (lo, hi) = (self.min[k] + by, self.max[k] - by);
            if lo <= hi {
                (lo, hi)
            } else {
                let mid = (self.min[k] + self.max[k]) / 2.0;
                (mid, mid)
            }
        };
        let ((x0, x1), (y0, y1)) = (axis(0), axis(1));
        AABB::from_corners([x0, y0], [x1, y1])
    }
}

impl RTreeObject for Footprint {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.min, self.max)
    }
}

impl PointDistance for Footprint {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = (self.min[0] - point[0]).max(point[0] - self.max[0]).max(0.0);
        let dy = (self.min[1] - point[1]).max(point[1] - self.max[1]).max(0.0);
        dx * dx + dy * dy
    }

    fn contains_point(&self, point: &[f64; 2]) -> bool {
        (self.min[0]..=self.max[0]).contains(&point[0])
            && (self.min[1]..=self.max[1]).contains(&point[1])
    }
}

/// Spatial index over the footprints of a laid-out tree.
///
/// Uses an R*-tree, bulk loaded once per layout.
pub struct FootprintIndex {
    tree: RTree<Footprint>,
}

impl FootprintIndex {
    /// Index every node of `root` with the footprint `sizes` gives it.
    ///
    /// Ids are pre-order positions, the same ids the layout hands to its
    /// callbacks.
    pub fn from_tree<T>(root: &Node<T>, sizes: impl Fn(&Node<T>) -> [f64; 2]) -> Self {
        let footprints: Vec<_> = root
            .iter()
            .enumerate()
            .map(|(index, node)| Footprint::new(NodeId(index as u32), node.x, node.y, sizes(node)))
            .collect();
        Self::bulk_load(footprints)
    }

    /// Index a tree laid out with size reporting on, reading each node's
    /// `x_size`/`y_size`.
    pub fn from_reported<T>(root: &Node<T>) -> Self {
        Self::from_tree(root, |node| [node.x_size, node.y_size])
    }

    /// Build directly from footprints.
    pub fn bulk_load(footprints: Vec<Footprint>) -> Self {
        Self {
            tree: RTree::bulk_load(footprints),
        }
    }

    /// All footprints containing the point, edges included.
    pub fn at_point(&self, x: f64, y: f64) -> Vec<NodeId> {
        self.tree
            .locate_all_at_point(&[x, y])
            .map(|footprint| footprint.id)
            .collect()
    }

    /// All footprints intersecting the rectangle.
    pub fn in_rect(&self, min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Vec<NodeId> {
        let envelope = AABB::from_corners([min_x, min_y], [max_x, max_y]);
        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|footprint| footprint.id)
            .collect()
    }

    /// The footprint closest to a point, zero distance when inside one.
    pub fn nearest(&self, x: f64, y: f64) -> Option<NodeId> {
        self.tree
            .nearest_neighbor(&[x, y])
            .map(|footprint| footprint.id)
    }

    /// Pairs of footprints overlapping by more than `tolerance` on both
    /// axes, each reported once with the smaller id first.
    ///
    /// Footprints that only share an edge (a parent and the child stacked
    /// right under it, or siblings packed edge to edge) are not reported
    /// for any positive tolerance.
    pub fn overlapping_pairs(&self, tolerance: f64) -> Vec<(NodeId, NodeId)> {
        let mut pairs: Vec<_> = self
            .tree
            .iter()
            .flat_map(|a| {
                self.tree
                    .locate_in_envelope_intersecting(&a.shrunk(tolerance))
                    .filter(move |b| a.id < b.id)
                    .map(move |b| (a.id, b.id))
            })
            .collect();
        pairs.sort_unstable();
        pairs.dedup();
        pairs
    }

    /// Get the number of footprints in the index.
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// Check if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

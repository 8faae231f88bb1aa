//! Layout engine configuration and entry point.
//!
//! A [`Flextree`] holds two mutually exclusive option pairs:
//! - [`Gap`]: center-to-center `separation` or edge-to-edge `spacing`
//! - [`Sizing`]: a fixed output frame (`size`) or per-node footprints
//!   (`node_size`)
//!
//! Each pair is an enum, so setting one member replaces the other. The
//! engine holds no state between invocations; everything an invocation
//! needs (including the root's footprint width used as the separation unit)
//! lives on that invocation's shadow tree.

use std::fmt;
use std::rc::Rc;

use super::shadow::{Placement, ShadowTree};
use super::{contour, modifier, renormalize};
use crate::error::Result;
use crate::tree::{Node, NodeId};

/// Gap callback: receives the two contour nodes being compared, left first.
pub type GapFn<T> = Rc<dyn Fn(&NodeRef<'_, T>, &NodeRef<'_, T>) -> f64>;

/// Node-size callback returning `[width, height]`, or a failure reason.
pub type SizeFn<T> = Rc<dyn Fn(&Node<T>) -> std::result::Result<[f64; 2], String>>;

/// Read-only view of a node handed to gap callbacks.
pub struct NodeRef<'a, T> {
    pub(crate) node: &'a Node<T>,
    pub(crate) id: NodeId,
    pub(crate) parent: Option<NodeId>,
    pub(crate) depth: usize,
    pub(crate) size: [f64; 2],
    pub(crate) root_x_size: f64,
}

impl<'a, T> NodeRef<'a, T> {
    /// The caller's node.
    #[inline]
    pub fn node(&self) -> &'a Node<T> {
        self.node
    }

    /// The caller's data on this node.
    #[inline]
    pub fn data(&self) -> &'a T {
        &self.node.data
    }

    /// Pre-order id of this node within the current invocation.
    #[inline]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Pre-order id of the parent, `None` for the root.
    #[inline]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Tree depth (root = 0).
    #[inline]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Resolved footprint width.
    #[inline]
    pub fn x_size(&self) -> f64 {
        self.size[0]
    }

    /// Resolved footprint height.
    #[inline]
    pub fn y_size(&self) -> f64 {
        self.size[1]
    }

    /// Footprint width of the tree's root, the unit separation values are
    /// multiplied by.
    #[inline]
    pub fn root_x_size(&self) -> f64 {
        self.root_x_size
    }

    /// True when both nodes share a parent. The root counts as its own
    /// sibling.
    #[inline]
    pub fn is_sibling_of(&self, other: &NodeRef<'_, T>) -> bool {
        self.parent == other.parent
    }
}

impl<T> Clone for NodeRef<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for NodeRef<'_, T> {}

impl<T> fmt::Debug for NodeRef<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("id", &self.id)
            .field("parent", &self.parent)
            .field("depth", &self.depth)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

/// Horizontal gap model.
pub enum Gap<T> {
    /// Center-to-center distance, in units of the root's footprint width.
    Separation(GapFn<T>),
    /// Edge-to-edge distance, in the same units as footprints.
    Spacing(GapFn<T>),
}

impl<T> Gap<T> {
    /// Center-to-center distance required between two contour nodes.
    pub(crate) fn required(&self, left: &NodeRef<'_, T>, right: &NodeRef<'_, T>) -> f64 {
        match self {
            Self::Separation(f) => f(left, right) * left.root_x_size,
            Self::Spacing(f) => left.x_size() / 2.0 + right.x_size() / 2.0 + f(left, right),
        }
    }
}

impl<T: 'static> Gap<T> {
    /// Default separation: 1 between siblings, 2 between cousins.
    pub fn default_separation() -> Self {
        Self::Separation(Rc::new(sibling_separation::<T>))
    }
}

fn sibling_separation<T>(a: &NodeRef<'_, T>, b: &NodeRef<'_, T>) -> f64 {
    if a.is_sibling_of(b) { 1.0 } else { 2.0 }
}

impl<T> Clone for Gap<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Separation(f) => Self::Separation(Rc::clone(f)),
            Self::Spacing(f) => Self::Spacing(Rc::clone(f)),
        }
    }
}

impl<T> fmt::Debug for Gap<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Separation(_) => f.write_str("Separation(..)"),
            Self::Spacing(_) => f.write_str("Spacing(..)"),
        }
    }
}

/// Per-node footprint source.
pub enum NodeSize<T> {
    /// The same `[width, height]` for every node.
    Fixed([f64; 2]),
    /// Computed per node.
    Computed(SizeFn<T>),
}

impl<T> Clone for NodeSize<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Fixed(size) => Self::Fixed(*size),
            Self::Computed(f) => Self::Computed(Rc::clone(f)),
        }
    }
}

impl<T> fmt::Debug for NodeSize<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(size) => f.debug_tuple("Fixed").field(size).finish(),
            Self::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

/// Output frame model.
pub enum Sizing<T> {
    /// Scale the finished layout into `[width, height]`. Every footprint is
    /// treated as 1 × 1 and `y` is derived from depth alone.
    Size([f64; 2]),
    /// Use real footprints and translate so the root sits at `x = 0`.
    NodeSize(NodeSize<T>),
}

impl<T> Clone for Sizing<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Size(size) => Self::Size(*size),
            Self::NodeSize(node_size) => Self::NodeSize(node_size.clone()),
        }
    }
}

impl<T> fmt::Debug for Sizing<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Size(size) => f.debug_tuple("Size").field(size).finish(),
            Self::NodeSize(node_size) => f.debug_tuple("NodeSize").field(node_size).finish(),
        }
    }
}

/// The flextree layout engine.
///
/// ```
/// use flextree_wasm::layout::Flextree;
/// use flextree_wasm::tree::Node;
///
/// let mut root = Node::new("root")
///     .push_child(Node::new("a"))
///     .push_child(Node::new("b"));
///
/// Flextree::new().size([2.0, 1.0]).layout(&mut root).unwrap();
///
/// assert_eq!(root.x, 1.0);
/// assert_eq!(root.children[0].x, 0.5);
/// assert_eq!(root.children[1].x, 1.5);
/// assert_eq!(root.children[1].y, 1.0);
/// ```
pub struct Flextree<T> {
    gap: Gap<T>,
    sizing: Sizing<T>,
    report_node_sizes: bool,
}

impl<T: 'static> Default for Flextree<T> {
    fn default() -> Self {
        Self {
            gap: Gap::default_separation(),
            sizing: Sizing::Size([1.0, 1.0]),
            report_node_sizes: false,
        }
    }
}

impl<T> Clone for Flextree<T> {
    fn clone(&self) -> Self {
        Self {
            gap: self.gap.clone(),
            sizing: self.sizing.clone(),
            report_node_sizes: self.report_node_sizes,
        }
    }
}

impl<T> fmt::Debug for Flextree<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Flextree")
            .field("gap", &self.gap)
            .field("sizing", &self.sizing)
            .field("report_node_sizes", &self.report_node_sizes)
            .finish()
    }
}

impl<T: 'static> Flextree<T> {
    /// Create an engine with default separation and a `[1, 1]` frame.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a center-to-center separation function. Clears `spacing`.
    pub fn separation(
        mut self,
        f: impl Fn(&NodeRef<'_, T>, &NodeRef<'_, T>) -> f64 + 'static,
    ) -> Self {
        self.gap = Gap::Separation(Rc::new(f));
        self
    }

    /// Use an edge-to-edge spacing function. Clears `separation`.
    pub fn spacing(mut self, f: impl Fn(&NodeRef<'_, T>, &NodeRef<'_, T>) -> f64 + 'static) -> Self {
        self.gap = Gap::Spacing(Rc::new(f));
        self
    }

    /// Scale the layout into a fixed `[width, height]` frame. Clears
    /// `node_size`.
    pub fn size(mut self, size: [f64; 2]) -> Self {
        self.sizing = Sizing::Size(size);
        self
    }

    /// Give every node the same footprint. Clears `size`.
    pub fn node_size(mut self, size: [f64; 2]) -> Self {
        self.sizing = Sizing::NodeSize(NodeSize::Fixed(size));
        self
    }

    /// Compute each node's footprint. Clears `size`.
    pub fn node_size_fn(mut self, f: impl Fn(&Node<T>) -> [f64; 2] + 'static) -> Self {
        self.sizing = Sizing::NodeSize(NodeSize::Computed(Rc::new(move |node: &Node<T>| Ok(f(node)))));
        self
    }

    /// Compute each node's footprint with a callback that may fail. A
    /// failure aborts the layout before anything is written back.
    pub fn try_node_size_fn(
        mut self,
        f: impl Fn(&Node<T>) -> std::result::Result<[f64; 2], String> + 'static,
    ) -> Self {
        self.sizing = Sizing::NodeSize(NodeSize::Computed(Rc::new(f)));
        self
    }

    /// Write each node's footprint to `x_size`/`y_size` after layout. In a
    /// fixed frame the reported footprint is the 1 × 1 unit after scaling.
    pub fn report_node_sizes(mut self, report: bool) -> Self {
        self.report_node_sizes = report;
        self
    }

    /// Current gap model.
    pub fn gap(&self) -> &Gap<T> {
        &self.gap
    }

    /// Current sizing model.
    pub fn sizing(&self) -> &Sizing<T> {
        &self.sizing
    }

    /// Whether footprints are written back after layout.
    pub fn reports_node_sizes(&self) -> bool {
        self.report_node_sizes
    }

    /// Lay out the tree rooted at `root`.
    ///
    /// Writes `x`, `y` and `depth` on every node of the subtree (and the
    /// footprint when size reporting is on), then returns `root`. If a
    /// node-size callback fails, the tree is left untouched.
    pub fn layout<'n>(&self, root: &'n mut Node<T>) -> Result<&'n mut Node<T>> {
        let placements = self.compute(root)?;
        write_back(root, &placements, self.report_node_sizes);
        Ok(root)
    }

    /// Run every pass on a shadow of `root` and return the final per-node
    /// placements in pre-order.
    fn compute(&self, root: &Node<T>) -> Result<Vec<Placement>> {
        let mut tree = ShadowTree::build(root, &self.sizing)?;
        tree.assign_depths();

        let root_x_size = tree.root_x_size();
        tracing::debug!(
            nodes = tree.len(),
            root_x_size,
            gap = ?self.gap,
            sizing = ?self.sizing,
            "laying out tree"
        );

        contour::first_walk(&mut tree, &self.gap, root_x_size);
        modifier::second_walk(&mut tree);
        renormalize::renormalize(
            &mut tree,
            &self.gap,
            &self.sizing,
            root_x_size,
            self.report_node_sizes,
        );

        Ok(tree.into_placements())
    }
}

/// Copy placements onto the caller's nodes, visiting them in the same
/// pre-order the shadow tree was built in.
fn write_back<T>(root: &mut Node<T>, placements: &[Placement], report_sizes: bool) {
    let mut stack = vec![root];
    let mut placements = placements.iter();
    while let Some(node) = stack.pop() {
        let Some(placement) = placements.next() else {
            break;
        };
        node.x = placement.x;
        node.y = placement.y;
        node.depth = placement.depth;
        if report_sizes {
            node.x_size = placement.x_size;
            node.y_size = placement.y_size;
        }
        stack.extend(node.children.iter_mut().rev());
    }
}

//! Shadow tree: per-invocation layout records for every input node.
//!
//! The shadow tree is an arena in pre-order, so a node's index is also its
//! [`NodeId`], every parent index is smaller than its children's, and the
//! first child of node `i` (if any) is node `i + 1`. Extreme-node pointers
//! and threads are indices into the same arena. The arena is dropped as
//! soon as the final placements have been copied out.

use super::flextree::{NodeRef, NodeSize, Sizing};
use crate::error::{LayoutError, Result};
use crate::tree::{Node, NodeId};

/// Layout bookkeeping for one input node.
#[derive(Debug, Clone)]
pub(crate) struct LayoutNode {
    /// Parent index (None for root).
    pub parent: Option<usize>,
    /// Children in input order.
    pub children: Vec<usize>,
    /// Resolved footprint width.
    pub x_size: f64,
    /// Resolved footprint height.
    pub y_size: f64,
    /// Horizontal position, absolute once the second walk has run.
    pub x: f64,
    /// Top edge of the footprint.
    pub y: f64,
    /// Depth in the tree (root = 0).
    pub depth: usize,
    /// Position relative to the subtree's own frame.
    pub prelim: f64,
    /// Deferred offset for this node and its whole subtree.
    pub modifier: f64,
    /// Deferred per-sibling correction, folded into `modifier` top-down.
    pub shift: f64,
    /// Companion of `shift`, see [`super::modifier`].
    pub change: f64,
    /// Sum of modifiers along the left contour down to `el`.
    pub msel: f64,
    /// Sum of modifiers along the right contour down to `er`.
    pub mser: f64,
    /// Extreme (deepest) node of the left contour of this subtree.
    pub el: usize,
    /// Extreme (deepest) node of the right contour of this subtree.
    pub er: usize,
    /// Left thread.
    pub tl: Option<usize>,
    /// Right thread.
    pub tr: Option<usize>,
}

impl LayoutNode {
    fn new(index: usize, parent: Option<usize>, [x_size, y_size]: [f64; 2]) -> Self {
        Self {
            parent,
            children: Vec::new(),
            x_size,
            y_size,
            x: 0.0,
            y: 0.0,
            depth: 0,
            prelim: 0.0,
            modifier: 0.0,
            shift: 0.0,
            change: 0.0,
            msel: 0.0,
            mser: 0.0,
            el: index,
            er: index,
            tl: None,
            tr: None,
        }
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Final values copied back onto an input node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Placement {
    pub x: f64,
    pub y: f64,
    pub depth: usize,
    pub x_size: f64,
    pub y_size: f64,
}

/// Arena of layout nodes, parallel to the caller's nodes.
pub(crate) struct ShadowTree<'a, T> {
    pub nodes: Vec<LayoutNode>,
    inputs: Vec<&'a Node<T>>,
}

impl<'a, T> ShadowTree<'a, T> {
    /// Build the arena for `root`, resolving every footprint.
    ///
    /// This is the only place footprints are read. In a fixed output frame
    /// every node is 1 × 1.
    pub fn build(root: &'a Node<T>, sizing: &Sizing<T>) -> Result<Self> {
        let mut nodes: Vec<LayoutNode> = Vec::new();
        let mut inputs: Vec<&'a Node<T>> = Vec::new();
        let mut stack: Vec<(&'a Node<T>, Option<usize>)> = vec![(root, None)];

        while let Some((input, parent)) = stack.pop() {
            let index = nodes.len();
            let size = match sizing {
                Sizing::Size(_) => [1.0, 1.0],
                Sizing::NodeSize(NodeSize::Fixed(size)) => *size,
                Sizing::NodeSize(NodeSize::Computed(f)) => {
                    f(input).map_err(|reason| LayoutError::NodeSize {
                        node: NodeId(index as u32),
                        reason,
                    })?
                }
            };

            nodes.push(LayoutNode::new(index, parent, size));
            inputs.push(input);
            if let Some(parent) = parent {
                nodes[parent].children.push(index);
            }
            stack.extend(input.children.iter().rev().map(|child| (child, Some(index))));
        }

        Ok(Self { nodes, inputs })
    }

    /// Assign depth and the footprint-stacked baseline: each child starts
    /// where its parent's footprint ends.
    pub fn assign_depths(&mut self) {
        // Pre-order indices: parents are always finished before children.
        for index in 1..self.nodes.len() {
            let Some(parent) = self.nodes[index].parent else {
                continue;
            };
            let (y, depth) = {
                let parent = &self.nodes[parent];
                (parent.y + parent.y_size, parent.depth + 1)
            };
            self.nodes[index].y = y;
            self.nodes[index].depth = depth;
        }
    }

    /// Number of nodes in the arena.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Footprint width of the root: the separation unit for this invocation.
    #[inline]
    pub fn root_x_size(&self) -> f64 {
        self.nodes[0].x_size
    }

    /// Lowest vertical extent of a node's footprint.
    #[inline]
    pub fn bottom(&self, index: usize) -> f64 {
        let node = &self.nodes[index];
        node.y + node.y_size
    }

    /// Callback view of a node.
    pub fn node_ref(&self, index: usize, root_x_size: f64) -> NodeRef<'a, T> {
        let node = &self.nodes[index];
        NodeRef {
            node: self.inputs[index],
            id: NodeId(index as u32),
            parent: node.parent.map(|p| NodeId(p as u32)),
            depth: node.depth,
            size: [node.x_size, node.y_size],
            root_x_size,
        }
    }

    /// Final placements in pre-order. Consumes the arena.
    pub fn into_placements(self) -> Vec<Placement> {
        self.nodes
            .into_iter()
            .map(|node| Placement {
                x: node.x,
                y: node.y,
                depth: node.depth,
                x_size: node.x_size,
                y_size: node.y_size,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;

    fn sample() -> Node<u32> {
        Node::sized(0, 2.0, 3.0)
            .push_child(Node::sized(1, 1.0, 1.0).push_child(Node::sized(2, 1.0, 5.0)))
            .push_child(Node::sized(3, 4.0, 2.0))
    }

    fn from_fields() -> Sizing<u32> {
        Sizing::NodeSize(NodeSize::Computed(Rc::new(|n: &Node<u32>| {
            Ok::<_, String>([n.x_size, n.y_size])
        })))
    }

    #[test]
    fn test_arena_is_pre_order() {
        let root = sample();
        let tree = ShadowTree::build(&root, &from_fields()).unwrap();
        assert_eq!(tree.len(), 4);
        assert_eq!(tree.nodes[0].children, vec![1, 3]);
        assert_eq!(tree.nodes[1].children, vec![2]);
        assert_eq!(tree.nodes[2].parent, Some(1));
        assert_eq!(tree.nodes[3].parent, Some(0));
        for (index, node) in tree.nodes.iter().enumerate() {
            assert_eq!(node.el, index, "Extremes start at the node itself");
            assert_eq!(node.er, index);
        }
    }

    #[test]
    fn test_size_resolution() {
        let root = sample();

        let tree = ShadowTree::build(&root, &Sizing::Size([100.0, 50.0])).unwrap();
        assert!(tree.nodes.iter().all(|n| n.x_size == 1.0 && n.y_size == 1.0));

        let tree = ShadowTree::build(&root, &Sizing::NodeSize(NodeSize::Fixed([7.0, 8.0]))).unwrap();
        assert!(tree.nodes.iter().all(|n| n.x_size == 7.0 && n.y_size == 8.0));

        let tree = ShadowTree::build(&root, &from_fields()).unwrap();
        assert_eq!(tree.root_x_size(), 2.0);
        assert_eq!(tree.nodes[3].x_size, 4.0);
    }

    #[test]
    fn test_stacked_baselines() {
        let root = sample();
        let mut tree = ShadowTree::build(&root, &from_fields()).unwrap();
        tree.assign_depths();

        let depths: Vec<_> = tree.nodes.iter().map(|n| n.depth).collect();
        let ys: Vec<_> = tree.nodes.iter().map(|n| n.y).collect();
        assert_eq!(depths, vec![0, 1, 2, 1]);
        assert_eq!(ys, vec![0.0, 3.0, 4.0, 3.0]);
        assert_eq!(tree.bottom(2), 9.0);
    }

    #[test]
    fn test_node_ref() {
        let root = sample();
        let mut tree = ShadowTree::build(&root, &from_fields()).unwrap();
        tree.assign_depths();

        let a = tree.node_ref(1, 2.0);
        let b = tree.node_ref(3, 2.0);
        assert_eq!(*a.data(), 1);
        assert_eq!(a.parent(), Some(NodeId(0)));
        assert!(a.is_sibling_of(&b));
        assert!(!a.is_sibling_of(&tree.node_ref(2, 2.0)));
        assert_eq!(b.x_size(), 4.0);
        assert_eq!(b.depth(), 1);
    }
}

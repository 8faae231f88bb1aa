//! Input tree type and per-invocation node identifiers.
//!
//! A [`Node`] is owned by the caller. The layout engine only reads its
//! structure and writes the output fields:
//! - `x`, `y`: position of the node's anchor (horizontal center, top edge)
//! - `depth`: distance from the root (root = 0)
//! - `x_size`, `y_size`: reported footprint, only when size reporting is on

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a node within one layout invocation.
///
/// Ids are pre-order indices: the root is `NodeId(0)`, and a node's first
/// child always directly follows it. They are only stable for as long as
/// the tree's shape does not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Create a new NodeId from a raw u32.
    #[inline]
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw u32 value.
    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({})", self.0)
    }
}

impl From<u32> for NodeId {
    #[inline]
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl From<NodeId> for u32 {
    #[inline]
    fn from(id: NodeId) -> Self {
        id.0
    }
}

/// A node of the caller's ordered, rooted tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node<T> {
    /// Application data carried through the layout untouched.
    #[serde(flatten)]
    pub data: T,
    /// Ordered children. An absent list deserializes as a leaf.
    #[serde(default = "Vec::new")]
    pub children: Vec<Node<T>>,
    /// Horizontal center, written by the layout.
    #[serde(default)]
    pub x: f64,
    /// Top edge, written by the layout.
    #[serde(default)]
    pub y: f64,
    /// Tree depth, written by the layout.
    #[serde(default)]
    pub depth: usize,
    /// Footprint width. Read by node-size callbacks that choose to, written
    /// by the layout when size reporting is enabled.
    #[serde(default)]
    pub x_size: f64,
    /// Footprint height, see `x_size`.
    #[serde(default)]
    pub y_size: f64,
}

impl<T> Node<T> {
    /// Create a leaf node.
    pub fn new(data: T) -> Self {
        Self::with_children(data, Vec::new())
    }

    /// Create a node with the given ordered children.
    pub fn with_children(data: T, children: Vec<Node<T>>) -> Self {
        Self {
            data,
            children,
            x: 0.0,
            y: 0.0,
            depth: 0,
            x_size: 0.0,
            y_size: 0.0,
        }
    }

    /// Create a leaf node that carries its own footprint, for use with
    /// node-size callbacks that read `x_size`/`y_size`.
    pub fn sized(data: T, x_size: f64, y_size: f64) -> Self {
        Self {
            x_size,
            y_size,
            ..Self::new(data)
        }
    }

    /// Append a child and return `self`, for building trees inline.
    pub fn push_child(mut self, child: Node<T>) -> Self {
        self.children.push(child);
        self
    }

    /// True when the node has no children.
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Always false: a subtree contains at least its own root.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Pre-order iterator over this subtree. The n-th item has `NodeId(n)`
    /// in a layout rooted at `self`.
    pub fn iter(&self) -> PreOrder<'_, T> {
        PreOrder { stack: vec![self] }
    }

    /// Look up a node by its pre-order id.
    pub fn get(&self, id: NodeId) -> Option<&Node<T>> {
        self.iter().nth(id.index())
    }
}

/// Pre-order iterator returned by [`Node::iter`].
#[derive(Debug)]
pub struct PreOrder<'a, T> {
    stack: Vec<&'a Node<T>>,
}

impl<'a, T> Iterator for PreOrder<'a, T> {
    type Item = &'a Node<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

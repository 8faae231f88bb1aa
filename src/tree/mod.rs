//! Input tree model.
//!
//! The caller owns the tree: an ordered, rooted hierarchy of [`Node`]
//! values. Layout writes coordinates back onto it in place.

mod hierarchy;
mod node;

pub use hierarchy::Hierarchy;
pub use node::{Node, NodeId, PreOrder};

//! Second walk: fold deferred modifiers into absolute positions.
//!
//! Separation leaves each node with a `prelim` relative to its subtree and a
//! `modifier` that applies to the whole subtree. Shifts owed to siblings
//! between two conflicting subtrees are stored as `shift`/`change` pairs and
//! only expanded here, one parent at a time, so the total work stays linear.

use super::shadow::{LayoutNode, ShadowTree};

/// Top-down pass setting `x = prelim + sum of modifiers from the root`.
pub(crate) fn second_walk<T>(tree: &mut ShadowTree<'_, T>) {
    let mut stack = vec![(0usize, 0.0f64)];
    while let Some((v, mut modsum)) = stack.pop() {
        modsum += tree.nodes[v].modifier;
        tree.nodes[v].x = tree.nodes[v].prelim + modsum;
        add_child_spacing(&mut tree.nodes, v);
        stack.extend(tree.nodes[v].children.iter().rev().map(|&child| (child, modsum)));
    }
}

/// Expand the children's `shift`/`change` into their modifiers.
///
/// A child's extra offset is the running sum of all `shift` values up to and
/// including it, plus its own `change`, accumulated left to right.
fn add_child_spacing(nodes: &mut [LayoutNode], v: usize) {
    let mut d = 0.0;
    let mut modsum_delta = 0.0;
    for k in 0..nodes[v].children.len() {
        let child = nodes[v].children[k];
        let node = &mut nodes[child];
        d += node.shift;
        modsum_delta += d + node.change;
        node.modifier += modsum_delta;
    }
}

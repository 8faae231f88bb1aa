//! Map finished coordinates into the requested output frame.
//!
//! - Fixed frame (`size`): scale the horizontal extent plus a margin into
//!   `[0, width]`, and place levels by depth alone in `[0, height]`.
//! - Node sizes (`node_size`): translate so the root sits at `x = 0`.

use super::flextree::{Gap, Sizing};
use super::shadow::ShadowTree;

/// Margin used on each side in a fixed frame when gaps are edge-to-edge,
/// since spacing has no unit to derive one from.
const SPACING_MARGIN: f64 = 0.5;

pub(crate) fn renormalize<T>(
    tree: &mut ShadowTree<'_, T>,
    gap: &Gap<T>,
    sizing: &Sizing<T>,
    root_x_size: f64,
    report_sizes: bool,
) {
    match sizing {
        Sizing::Size(size) => scale_into(tree, gap, *size, root_x_size, report_sizes),
        Sizing::NodeSize(_) => {
            let root_x = tree.nodes[0].x;
            for node in &mut tree.nodes {
                node.x -= root_x;
            }
            tracing::debug!(root_x, "translated tree to root");
        }
    }
}

fn scale_into<T>(
    tree: &mut ShadowTree<'_, T>,
    gap: &Gap<T>,
    [width, height]: [f64; 2],
    root_x_size: f64,
    report_sizes: bool,
) {
    let (left, right, bottom) = extremes(tree);

    let margin = match gap {
        Gap::Separation(f) => {
            f(&tree.node_ref(left, root_x_size), &tree.node_ref(right, root_x_size)) / 2.0
        }
        Gap::Spacing(_) => SPACING_MARGIN,
    };
    let tx = margin - tree.nodes[left].x;
    let kx = width / (tree.nodes[right].x + margin + tx);
    let max_depth = tree.nodes[bottom].depth;
    let ky = height / if max_depth > 0 { max_depth as f64 } else { 1.0 };

    for node in &mut tree.nodes {
        node.x = (node.x + tx) * kx;
        node.y = node.depth as f64 * ky;
        if report_sizes {
            node.x_size *= kx;
            node.y_size *= ky;
        }
    }
    tracing::debug!(margin, kx, ky, max_depth, "scaled tree into frame");
}

/// Leftmost, rightmost and deepest node. Ties keep the node found first,
/// visiting later siblings before earlier ones.
fn extremes<T>(tree: &ShadowTree<'_, T>) -> (usize, usize, usize) {
    let nodes = &tree.nodes;
    let (mut left, mut right, mut bottom) = (0, 0, 0);
    let mut stack = vec![0];
    while let Some(v) = stack.pop() {
        let node = &nodes[v];
        if node.x < nodes[left].x {
            left = v;
        }
        if node.x > nodes[right].x {
            right = v;
        }
        if node.depth > nodes[bottom].depth {
            bottom = v;
        }
        stack.extend(node.children.iter().copied());
    }
    (left, right, bottom)
}

//! Contour separation: the bottom-up first walk.
//!
//! Positions every subtree relative to its left siblings, following
//! van der Ploeg's "Drawing Non-layered Tidy Trees in Linear Time" (2013),
//! which extends Buchheim, Junger and Leipert's linear-time Walker algorithm
//! to nodes of different sizes.
//!
//! Each parent places its children left to right. A new child is compared
//! against the combined right contour of all earlier siblings by walking
//! both contours downward in lock-step. Conflicts shift the new subtree by
//! bumping its `modifier`; siblings in between receive an even share of the
//! shift lazily through `shift`/`change`, which the second walk folds in.
//! When one contour runs out, a thread splices it onto the deeper one so
//! later comparisons never revisit the interior of a subtree.
//!
//! Traversal uses an explicit stack, so tree depth is not limited by the
//! call stack.

use super::flextree::Gap;
use super::shadow::ShadowTree;

/// Earlier sibling that is still visible to the right contour, with the
/// lowest vertical extent its right contour reaches.
#[derive(Debug, Clone, Copy, PartialEq)]
struct IylEntry {
    low_y: f64,
    index: usize,
}

/// Visible left siblings, newest (shallowest) last. Entries are strictly
/// increasing in `low_y` from last to first.
#[derive(Debug, Default)]
struct Iyl {
    entries: Vec<IylEntry>,
}

impl Iyl {
    /// Record child `index` whose right contour reaches `min_y`, dropping
    /// earlier siblings it hides completely.
    fn update(&mut self, min_y: f64, index: usize) {
        while self.entries.last().is_some_and(|entry| min_y >= entry.low_y) {
            self.entries.pop();
        }
        self.entries.push(IylEntry { low_y: min_y, index });
    }

    /// Position of the newest entry.
    fn head(&self) -> usize {
        self.entries.len().saturating_sub(1)
    }
}

/// Stack frame of the post-order walk.
struct Frame {
    node: usize,
    next_child: usize,
    iyl: Iyl,
}

impl Frame {
    fn new(node: usize) -> Self {
        Self {
            node,
            next_child: 0,
            iyl: Iyl::default(),
        }
    }
}

/// Bottom-up pass assigning `prelim`, `modifier`, `shift`/`change`, extreme
/// nodes and threads to every node of `tree`.
///
/// `root_x_size` is the unit separation values are multiplied by.
pub(crate) fn first_walk<T>(tree: &mut ShadowTree<'_, T>, gap: &Gap<T>, root_x_size: f64) {
    let mut stack = vec![Frame::new(0)];

    while let Some(frame) = stack.last_mut() {
        let v = frame.node;
        if let Some(&child) = tree.nodes[v].children.get(frame.next_child) {
            stack.push(Frame::new(child));
            continue;
        }

        stack.pop();
        if !tree.nodes[v].is_leaf() {
            position_root(tree, v);
        }
        set_extremes(tree, v);

        // Hand the finished subtree back to its parent.
        let Some(parent) = stack.last_mut() else {
            break;
        };
        let (p, i) = (parent.node, parent.next_child);
        if i == 0 {
            let el = tree.nodes[v].el;
            parent.iyl.update(tree.bottom(el), 0);
        } else {
            // Lowest extent while the extreme nodes still point into this
            // subtree; separating may redirect them.
            let min_y = tree.bottom(tree.nodes[v].er);
            separate(tree, gap, root_x_size, p, i, &parent.iyl);
            parent.iyl.update(min_y, i);
        }
        parent.next_child += 1;
    }
}

/// Leaves are their own extremes; internal nodes inherit from their first
/// and last child.
fn set_extremes<T>(tree: &mut ShadowTree<'_, T>, v: usize) {
    let node = &tree.nodes[v];
    let (el, msel, er, mser) = match (node.children.first(), node.children.last()) {
        (Some(&first), Some(&last)) => {
            let (first, last) = (&tree.nodes[first], &tree.nodes[last]);
            (first.el, first.msel, last.er, last.mser)
        }
        _ => (v, 0.0, v, 0.0),
    };
    let node = &mut tree.nodes[v];
    node.el = el;
    node.msel = msel;
    node.er = er;
    node.mser = mser;
}

/// Center a parent between the outer edges of its first and last child.
fn position_root<T>(tree: &mut ShadowTree<'_, T>, v: usize) {
    let children = &tree.nodes[v].children;
    let (Some(&first), Some(&last)) = (children.first(), children.last()) else {
        return;
    };
    let (first, last) = (&tree.nodes[first], &tree.nodes[last]);
    let prelim = (first.prelim + first.modifier - first.x_size / 2.0
        + last.modifier
        + last.prelim
        + last.x_size / 2.0)
        / 2.0;
    tree.nodes[v].prelim = prelim;
}

fn next_left_contour<T>(tree: &ShadowTree<'_, T>, v: usize) -> Option<usize> {
    let node = &tree.nodes[v];
    node.children.first().copied().or(node.tl)
}

fn next_right_contour<T>(tree: &ShadowTree<'_, T>, v: usize) -> Option<usize> {
    let node = &tree.nodes[v];
    node.children.last().copied().or(node.tr)
}

/// Push child `i` of `p` (and its whole subtree) right of the combined
/// contour of children `0..i`.
fn separate<T>(
    tree: &mut ShadowTree<'_, T>,
    gap: &Gap<T>,
    root_x_size: f64,
    p: usize,
    i: usize,
    iyl: &Iyl,
) {
    let current = tree.nodes[p].children[i];
    let previous = tree.nodes[p].children[i - 1];

    // Right contour node of the left siblings and its sum of modifiers.
    let mut sr = Some(previous);
    let mut mssr = tree.nodes[previous].modifier;
    // Left contour node of the current subtree and its sum of modifiers.
    let mut cl = Some(current);
    let mut mscl = tree.nodes[current].modifier;

    let mut ih = iyl.head();

    while let (Some(r), Some(l)) = (sr, cl) {
        if tree.bottom(r) > iyl.entries[ih].low_y && ih > 0 {
            ih -= 1;
        }

        let left = tree.node_ref(r, root_x_size);
        let right = tree.node_ref(l, root_x_size);
        let dist = (mssr + tree.nodes[r].prelim) - (mscl + tree.nodes[l].prelim)
            + gap.required(&left, &right);

        if dist > 0.0 {
            mscl += dist;
            move_subtree(tree, p, i, iyl.entries[ih].index, dist);
            tracing::trace!(parent = p, child = i, deficit = dist, "moved subtree");
        } else if i == 1
            && mscl == 0.0
            && tree.nodes[r].is_leaf()
            && tree.nodes[l].children.len() > 1
            && dist < 0.0
        {
            // A second child whose own children spread it wider than a leaf
            // first sibling is pulled back to exactly the required gap.
            mscl += dist;
            move_subtree(tree, p, i, iyl.entries[ih].index, dist);
            tracing::trace!(parent = p, child = i, deficit = dist, "pulled subtree back");
        }

        let sy = tree.bottom(r);
        let cy = tree.bottom(l);

        // Advance the higher contour, or both on a tie.
        if sy <= cy {
            sr = next_right_contour(tree, r);
            if let Some(next) = sr {
                mssr += tree.nodes[next].modifier;
            }
        }
        if sy >= cy {
            cl = next_left_contour(tree, l);
            if let Some(next) = cl {
                mscl += tree.nodes[next].modifier;
            }
        }
    }

    match (sr, cl) {
        // The current subtree is taller than its left siblings.
        (None, Some(l)) => set_left_thread(tree, p, i, l, mscl),
        // The left siblings are taller than the current subtree.
        (Some(r), None) => set_right_thread(tree, p, i, r, mssr),
        _ => {}
    }
}

/// Shift child `i` by `dist`, spreading the same shift over the children
/// strictly between `si` and `i`.
fn move_subtree<T>(tree: &mut ShadowTree<'_, T>, p: usize, i: usize, si: usize, dist: f64) {
    let child = tree.nodes[p].children[i];
    let node = &mut tree.nodes[child];
    node.modifier += dist;
    node.msel += dist;
    node.mser += dist;
    distribute_extra(tree, p, i, si, dist);
}

fn distribute_extra<T>(tree: &mut ShadowTree<'_, T>, p: usize, i: usize, si: usize, dist: f64) {
    if si + 1 == i {
        return;
    }
    let nr = (i - si) as f64;
    let (first, current) = (tree.nodes[p].children[si + 1], tree.nodes[p].children[i]);
    tree.nodes[first].shift += dist / nr;
    let current = &mut tree.nodes[current];
    current.shift -= dist / nr;
    current.change -= dist - dist / nr;
}

/// Thread the left contour of children `0..i` onto `cl`, a left contour node
/// of child `i` whose modifier sum is `modsum_cl`.
fn set_left_thread<T>(tree: &mut ShadowTree<'_, T>, p: usize, i: usize, cl: usize, modsum_cl: f64) {
    let first = tree.nodes[p].children[0];
    let current = tree.nodes[p].children[i];
    let li = tree.nodes[first].el;

    // Keep the sum of modifiers after following the thread correct without
    // moving `li` itself.
    let diff = (modsum_cl - tree.nodes[cl].modifier) - tree.nodes[first].msel;
    let node = &mut tree.nodes[li];
    node.tl = Some(cl);
    node.modifier += diff;
    node.prelim -= diff;

    let (el, msel) = (tree.nodes[current].el, tree.nodes[current].msel);
    tree.nodes[first].el = el;
    tree.nodes[first].msel = msel;
    tracing::trace!(from = li, to = cl, "left thread");
}

/// Mirror of [`set_left_thread`] for the right contour.
fn set_right_thread<T>(tree: &mut ShadowTree<'_, T>, p: usize, i: usize, sr: usize, modsum_sr: f64) {
    let current = tree.nodes[p].children[i];
    let previous = tree.nodes[p].children[i - 1];
    let ri = tree.nodes[current].er;

    let diff = (modsum_sr - tree.nodes[sr].modifier) - tree.nodes[current].mser;
    let node = &mut tree.nodes[ri];
    node.tr = Some(sr);
    node.modifier += diff;
    node.prelim -= diff;

    let (er, mser) = (tree.nodes[previous].er, tree.nodes[previous].mser);
    tree.nodes[current].er = er;
    tree.nodes[current].mser = mser;
    tracing::trace!(from = ri, to = sr, "right thread");
}

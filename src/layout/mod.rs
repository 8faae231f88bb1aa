//! Tidy tree layout with variable node sizes.
//!
//! The engine runs a fixed sequence of passes over a shadow of the caller's
//! tree, then copies the results back:
//!
//! 1. `shadow`: resolve footprints and stack baselines by depth
//! 2. `contour`: bottom-up separation of sibling subtrees along their
//!    contours, with deferred moves
//! 3. `modifier`: top-down fold of deferred moves into absolute `x`
//! 4. `renormalize`: fit into a fixed frame or anchor the root at `x = 0`
//!
//! Every pass is linear in the number of nodes and uses explicit stacks, so
//! arbitrarily deep trees never recurse.

mod contour;
mod flextree;
mod modifier;
mod renormalize;
mod shadow;

pub use flextree::{Flextree, Gap, GapFn, NodeRef, NodeSize, SizeFn, Sizing};

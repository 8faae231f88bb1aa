//! Spatial indexing of laid-out footprints.
//!
//! This module provides an R-tree over the rectangles a layout assigns to
//! nodes, for hit testing and overlap checks.

mod footprint;

pub use footprint::{Footprint, FootprintIndex};

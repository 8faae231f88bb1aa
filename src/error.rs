//! Error type shared by the layout engine, the hierarchy builder and the
//! WebAssembly bridge.

use thiserror::Error;

use crate::tree::NodeId;

/// Errors surfaced by a layout invocation.
///
/// Well-formed input never fails. These variants only describe caller
/// contract violations that can be observed without extra validation work.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LayoutError {
    /// A node-size callback failed or produced something that is not a
    /// `[width, height]` pair.
    #[error("Node size for {node} could not be resolved: {reason}")]
    NodeSize {
        /// Pre-order id of the node whose size was requested.
        node: NodeId,
        /// Callback-provided description of the failure.
        reason: String,
    },
    /// A gap callback failed. Gap callbacks cannot abort the walk, so the
    /// first failure is recorded and reported once the walk is over.
    #[error("Gap callback failed: {0}")]
    Callback(String),
    /// The hierarchy builder was asked to start from a node that is not in
    /// the graph.
    #[error("Root node {0} is not part of the graph")]
    MissingRoot(u32),
    /// A JS tree could not be converted into a layout tree.
    #[error("Failed to read tree: {0}")]
    Deserialize(String),
    /// A laid-out tree could not be converted back into a JS value.
    #[error("Failed to write tree: {0}")]
    Serialize(String),
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, LayoutError>;

//! Build an input tree from a petgraph graph.
//!
//! The layout engine works on nested [`Node`] values. Graph-shaped data
//! (parent → child edges in a `StableGraph`) is converted here: child order
//! follows edge insertion order, and every graph node is placed at most once,
//! so cycles and shared children cannot make the conversion loop.

use petgraph::Direction;
use petgraph::stable_graph::{NodeIndex, StableGraph};
use petgraph::visit::{VisitMap, Visitable};

use super::node::Node;
use crate::error::{LayoutError, Result};

/// Converter from graph topology to an ordered tree.
#[derive(Debug, Default, Clone, Copy)]
pub struct Hierarchy;

impl Hierarchy {
    /// Build the tree reachable from `root` along outgoing edges.
    ///
    /// `map` turns each graph node weight into the tree node's data. Nodes
    /// reachable through more than one path are attached under the first
    /// parent that reaches them in pre-order; back-edges are ignored.
    pub fn from_graph<N, E, T>(
        graph: &StableGraph<N, E>,
        root: NodeIndex,
        map: impl Fn(&N) -> T,
    ) -> Result<Node<T>> {
        if !graph.contains_node(root) {
            return Err(LayoutError::MissingRoot(root.index() as u32));
        }

        // Pre-order placement: (graph node, parent position in `order`).
        let mut order: Vec<(NodeIndex, Option<usize>)> = Vec::new();
        let mut visited = graph.visit_map();
        let mut stack = vec![(root, None)];

        while let Some((index, parent)) = stack.pop() {
            if !visited.visit(index) {
                continue;
            }
            let position = order.len();
            order.push((index, parent));
            // Neighbors come back newest edge first; pushing them in that
            // order pops the oldest edge first.
            for child in graph.neighbors_directed(index, Direction::Outgoing) {
                if !visited.is_visited(&child) {
                    stack.push((child, Some(position)));
                }
            }
        }

        let mut slots: Vec<Option<Node<T>>> = order
            .iter()
            .map(|&(index, _)| Some(Node::new(map(&graph[index]))))
            .collect();

        // Later pre-order positions are descendants or later siblings, so
        // walking backwards completes every subtree before its parent.
        for position in (1..order.len()).rev() {
            let Some(mut node) = slots[position].take() else {
                continue;
            };
            node.children.reverse();
            if let Some(Some(parent)) = order[position].1.map(|p| slots[p].as_mut()) {
                parent.children.push(node);
            }
        }

        let mut tree = slots
            .first_mut()
            .and_then(Option::take)
            .ok_or(LayoutError::MissingRoot(root.index() as u32))?;
        tree.children.reverse();
        Ok(tree)
    }
}

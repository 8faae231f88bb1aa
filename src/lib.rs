//! Flextree - WASM Module
//!
//! Linear-time tidy tree layout for nodes of variable size. The engine runs
//! natively on any `Node<T>` tree and is also compiled to WebAssembly,
//! exposing a JavaScript-friendly API via wasm-bindgen.
//!
//! # Architecture
//!
//! - `tree`: the caller's ordered tree, and conversion from petgraph graphs
//! - `layout`: the flextree engine (contour separation, modifier fold,
//!   renormalization)
//! - `spatial`: R-tree indexing of laid-out footprints for hit testing
//! - `error`: the crate's error type

use std::cell::RefCell;
use std::rc::Rc;

use js_sys::Function;
use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

pub mod error;
pub mod layout;
pub mod spatial;
pub mod tree;

pub use error::{LayoutError, Result};
pub use layout::{Flextree, Gap, NodeRef, NodeSize, Sizing};
pub use spatial::{Footprint, FootprintIndex};
pub use tree::{Hierarchy, Node, NodeId};

/// Initialize the WASM module.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// Tree shape exchanged with JavaScript.
///
/// Every field is optional on input. `data` is passed through untouched.
#[derive(Serialize, Deserialize)]
struct JsTree {
    #[serde(default, with = "serde_wasm_bindgen::preserve")]
    data: JsValue,
    #[serde(default)]
    children: Vec<JsTree>,
    #[serde(default)]
    x: f64,
    #[serde(default)]
    y: f64,
    #[serde(default)]
    depth: usize,
    #[serde(default)]
    x_size: f64,
    #[serde(default)]
    y_size: f64,
}

impl From<JsTree> for Node<JsValue> {
    fn from(tree: JsTree) -> Self {
        Node {
            data: tree.data,
            children: tree.children.into_iter().map(Node::from).collect(),
            x: tree.x,
            y: tree.y,
            depth: tree.depth,
            x_size: tree.x_size,
            y_size: tree.y_size,
        }
    }
}

impl From<Node<JsValue>> for JsTree {
    fn from(node: Node<JsValue>) -> Self {
        JsTree {
            data: node.data,
            children: node.children.into_iter().map(JsTree::from).collect(),
            x: node.x,
            y: node.y,
            depth: node.depth,
            x_size: node.x_size,
            y_size: node.y_size,
        }
    }
}

/// What a JS gap callback sees of each node.
#[derive(Serialize)]
struct JsNodeView {
    #[serde(with = "serde_wasm_bindgen::preserve")]
    data: JsValue,
    id: u32,
    parent: Option<u32>,
    depth: usize,
    x_size: f64,
    y_size: f64,
    root_x_size: f64,
}

impl JsNodeView {
    fn of(node: &NodeRef<'_, JsValue>) -> Self {
        Self {
            data: node.data().clone(),
            id: node.id().raw(),
            parent: node.parent().map(NodeId::raw),
            depth: node.depth(),
            x_size: node.x_size(),
            y_size: node.y_size(),
            root_x_size: node.root_x_size(),
        }
    }
}

/// What a JS node-size callback sees of each node: its data and any
/// footprint the caller put on it.
#[derive(Serialize)]
struct JsSizeView {
    #[serde(with = "serde_wasm_bindgen::preserve")]
    data: JsValue,
    x_size: f64,
    y_size: f64,
}

/// Main entry point for the layout engine.
///
/// This struct wraps a [`Flextree`] over JS data and provides the public
/// API exposed to JavaScript.
#[wasm_bindgen]
pub struct FlextreeWasm {
    engine: Flextree<JsValue>,
    /// First gap-callback failure of the running layout.
    failure: Rc<RefCell<Option<String>>>,
}

#[wasm_bindgen]
impl FlextreeWasm {
    /// Create an engine with default separation and a `[1, 1]` frame.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            engine: Flextree::new(),
            failure: Rc::new(RefCell::new(None)),
        }
    }

    // =========================================================================
    // Gap Model
    // =========================================================================

    /// Use a center-to-center separation callback `(a, b) => number`.
    ///
    /// The result is multiplied by the root's footprint width.
    pub fn separation(&mut self, f: Function) {
        let failure = Rc::clone(&self.failure);
        self.engine = std::mem::take(&mut self.engine)
            .separation(move |a, b| call_gap(&f, a, b, &failure));
    }

    /// Use an edge-to-edge spacing callback `(a, b) => number`.
    pub fn spacing(&mut self, f: Function) {
        let failure = Rc::clone(&self.failure);
        self.engine =
            std::mem::take(&mut self.engine).spacing(move |a, b| call_gap(&f, a, b, &failure));
    }

    // =========================================================================
    // Sizing Model
    // =========================================================================

    /// Scale the layout into a fixed `width` × `height` frame.
    pub fn size(&mut self, width: f64, height: f64) {
        self.engine = std::mem::take(&mut self.engine).size([width, height]);
    }

    /// Give every node the same footprint.
    #[wasm_bindgen(js_name = nodeSize)]
    pub fn node_size(&mut self, width: f64, height: f64) {
        self.engine = std::mem::take(&mut self.engine).node_size([width, height]);
    }

    /// Compute each node's footprint with `node => [width, height]`.
    ///
    /// The callback receives `{ data, x_size, y_size }`.
    #[wasm_bindgen(js_name = nodeSizeFn)]
    pub fn node_size_fn(&mut self, f: Function) {
        self.engine =
            std::mem::take(&mut self.engine).try_node_size_fn(move |node| call_size(&f, node));
    }

    /// Write each node's footprint to `x_size`/`y_size` after layout.
    #[wasm_bindgen(js_name = reportNodeSizes)]
    pub fn report_node_sizes(&mut self, report: bool) {
        self.engine = std::mem::take(&mut self.engine).report_node_sizes(report);
    }

    // =========================================================================
    // Layout
    // =========================================================================

    /// Lay out a tree of `{ data?, x_size?, y_size?, children? }` objects.
    ///
    /// Returns a new tree of the same shape with `x`, `y` and `depth` set on
    /// every node. Throws if the tree cannot be read or a callback fails.
    pub fn layout(&self, tree: JsValue) -> std::result::Result<JsValue, JsValue> {
        self.try_layout(tree).map_err(|err| {
            let message = err.to_string();
            web_sys::console::error_1(&JsValue::from_str(&message));
            js_sys::Error::new(&message).into()
        })
    }
}

impl FlextreeWasm {
    fn try_layout(&self, tree: JsValue) -> Result<JsValue> {
        let tree: JsTree = serde_wasm_bindgen::from_value(tree)
            .map_err(|err| LayoutError::Deserialize(err.to_string()))?;
        let mut root = Node::from(tree);

        self.failure.borrow_mut().take();
        self.engine.layout(&mut root)?;
        if let Some(reason) = self.failure.borrow_mut().take() {
            return Err(LayoutError::Callback(reason));
        }

        serde_wasm_bindgen::to_value(&JsTree::from(root))
            .map_err(|err| LayoutError::Serialize(err.to_string()))
    }
}

impl Default for FlextreeWasm {
    fn default() -> Self {
        Self::new()
    }
}

/// Run a JS gap callback. Failures are recorded in `failure` (first one
/// wins) and count as a zero gap so the walk can finish.
fn call_gap(
    f: &Function,
    a: &NodeRef<'_, JsValue>,
    b: &NodeRef<'_, JsValue>,
    failure: &RefCell<Option<String>>,
) -> f64 {
    try_call_gap(f, a, b).unwrap_or_else(|reason| {
        failure.borrow_mut().get_or_insert(reason);
        0.0
    })
}

fn try_call_gap(
    f: &Function,
    a: &NodeRef<'_, JsValue>,
    b: &NodeRef<'_, JsValue>,
) -> std::result::Result<f64, String> {
    let a = serde_wasm_bindgen::to_value(&JsNodeView::of(a)).map_err(|err| err.to_string())?;
    let b = serde_wasm_bindgen::to_value(&JsNodeView::of(b)).map_err(|err| err.to_string())?;
    let gap = f.call2(&JsValue::NULL, &a, &b).map_err(describe)?;
    gap.as_f64()
        .ok_or_else(|| format!("expected a number, got {gap:?}"))
}

/// Run a JS node-size callback and read back its `[width, height]`.
fn call_size(f: &Function, node: &Node<JsValue>) -> std::result::Result<[f64; 2], String> {
    let view = JsSizeView {
        data: node.data.clone(),
        x_size: node.x_size,
        y_size: node.y_size,
    };
    let view = serde_wasm_bindgen::to_value(&view).map_err(|err| err.to_string())?;
    let size = f.call1(&JsValue::NULL, &view).map_err(describe)?;
    serde_wasm_bindgen::from_value(size).map_err(|err| err.to_string())
}

/// Message of a thrown JS value.
fn describe(err: JsValue) -> String {
    match err.dyn_ref::<js_sys::Error>() {
        Some(err) => String::from(err.message()),
        None => err.as_string().unwrap_or_else(|| format!("{err:?}")),
    }
}

#[cfg(test)]
mod integration_tests {
    use super::*;
    use petgraph::stable_graph::StableGraph;

    const EPS: f64 = 1e-9;

    /// Deterministic generator so every run sees the same corpus.
    struct Lcg(u64);

    impl Lcg {
        fn next(&mut self) -> u64 {
            self.0 = self
                .0
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            self.0 >> 33
        }

        fn below(&mut self, n: usize) -> usize {
            (self.next() % n as u64) as usize
        }
    }

    /// Random tree of `size` nodes labelled `0..size` in creation order.
    ///
    /// Half the parents are drawn uniformly (bushy trees), half from the
    /// last few nodes (long, narrow branches).
    fn random_tree(seed: u64, size: usize) -> Node<u32> {
        let mut rng = Lcg(seed);
        let parents: Vec<usize> = (0..size)
            .map(|i| match i {
                0 => 0,
                _ if rng.below(2) == 0 => rng.below(i),
                _ => i - 1 - rng.below(i.min(4)),
            })
            .collect();

        let mut slots: Vec<Option<Node<u32>>> =
            (0..size as u32).map(|label| Some(Node::new(label))).collect();
        // Parents precede children, so walking backwards finishes every
        // subtree before it is attached.
        for i in (1..size).rev() {
            let mut node = slots[i].take().unwrap();
            node.children.reverse();
            slots[parents[i]].as_mut().unwrap().children.push(node);
        }
        let mut root = slots[0].take().unwrap();
        root.children.reverse();
        root
    }

    fn corpus() -> Vec<Node<u32>> {
        (0..24u64)
            .map(|seed| random_tree(seed, 1 + (seed as usize * 37) % 160))
            .collect()
    }

    fn mirrored(node: &Node<u32>) -> Node<u32> {
        Node::with_children(node.data, node.children.iter().rev().map(mirrored).collect())
    }

    /// Every (parent, child) pair of the tree.
    fn edges(root: &Node<u32>) -> Vec<(&Node<u32>, &Node<u32>)> {
        root.iter()
            .flat_map(|parent| parent.children.iter().map(move |child| (parent, child)))
            .collect()
    }

    fn xs_by_label(root: &Node<u32>) -> Vec<f64> {
        let mut xs = vec![f64::NAN; root.len()];
        for node in root.iter() {
            xs[node.data as usize] = node.x;
        }
        xs
    }

    #[test]
    fn test_generator_covers_shapes() {
        let trees = corpus();
        assert_eq!(trees[0].len(), 1, "Single-node tree is part of the corpus");
        for (seed, tree) in trees.iter().enumerate() {
            assert_eq!(tree.len(), 1 + (seed * 37) % 160, "Every node is attached");
            let mut labels: Vec<_> = tree.iter().map(|n| n.data).collect();
            labels.sort_unstable();
            assert!(labels.iter().enumerate().all(|(i, &label)| label == i as u32));
        }
    }

    #[test]
    fn test_no_overlap_with_uniform_sizes() {
        let engines: Vec<Flextree<u32>> = vec![
            Flextree::new().node_size([1.0, 1.0]),
            Flextree::new().node_size([3.0, 2.0]),
            Flextree::new().spacing(|_, _| 0.0).node_size([1.0, 1.0]),
            Flextree::new().spacing(|_, _| 0.5).node_size([2.0, 1.0]),
        ];

        for (e, engine) in engines.iter().enumerate() {
            for mut tree in corpus() {
                engine
                    .clone()
                    .report_node_sizes(true)
                    .layout(&mut tree)
                    .unwrap();
                let index = FootprintIndex::from_reported(&tree);
                assert_eq!(index.len(), tree.len());
                let overlaps = index.overlapping_pairs(EPS);
                assert!(
                    overlaps.is_empty(),
                    "Engine {} overlaps in a tree of {} nodes: {:?}",
                    e,
                    tree.len(),
                    overlaps
                );
            }
        }
    }

    #[test]
    fn test_depth_and_stacked_baselines() {
        let engine = Flextree::new()
            .node_size_fn(|node: &Node<u32>| {
                [1.0 + (node.data % 3) as f64, 1.0 + (node.data % 2) as f64]
            })
            .report_node_sizes(true);

        for mut tree in corpus() {
            engine.layout(&mut tree).unwrap();
            assert_eq!(tree.depth, 0);
            assert_eq!(tree.y, 0.0);
            assert!(tree.x.abs() < EPS, "Root should sit at x = 0, got {}", tree.x);
            for (parent, child) in edges(&tree) {
                assert_eq!(child.depth, parent.depth + 1);
                assert!(
                    (child.y - (parent.y + parent.y_size)).abs() < EPS,
                    "Child y {} should start below parent footprint ({} + {})",
                    child.y,
                    parent.y,
                    parent.y_size
                );
                assert!(child.x.is_finite());
            }
        }
    }

    #[test]
    fn test_fixed_frame_margins() {
        let (width, height) = (50.0, 20.0);
        let engine = Flextree::new()
            .spacing(|_, _| 0.0)
            .size([width, height])
            .report_node_sizes(true);

        for mut tree in corpus() {
            engine.layout(&mut tree).unwrap();
            // The unit footprint after scaling is the scale itself.
            let (kx, ky) = (tree.x_size, tree.y_size);
            let min = tree.iter().map(|n| n.x).fold(f64::INFINITY, f64::min);
            let max = tree.iter().map(|n| n.x).fold(f64::NEG_INFINITY, f64::max);
            assert!((min - 0.5 * kx).abs() < EPS * width, "min x = {min}, kx = {kx}");
            assert!((max - (width - 0.5 * kx)).abs() < EPS * width, "max x = {max}");
            for node in tree.iter() {
                assert!((node.y - node.depth as f64 * ky).abs() < EPS * height);
                assert!(node.y <= height + EPS);
            }
        }
    }

    #[test]
    fn test_mirrored_trees_mirror_x() {
        let leaf = Node::new;
        let trees = vec![
            // Uneven pair.
            Node::with_children(0, vec![Node::with_children(1, vec![leaf(2)]), leaf(3)]),
            // Wide subtrees around a leaf.
            Node::with_children(
                0,
                vec![
                    Node::with_children(1, (2..6).map(leaf).collect()),
                    leaf(6),
                    Node::with_children(7, (8..12).map(leaf).collect()),
                ],
            ),
            // Two leaves squeezed between small subtrees.
            Node::with_children(
                0,
                vec![
                    Node::with_children(1, vec![leaf(2), leaf(3)]),
                    leaf(4),
                    leaf(5),
                    Node::with_children(6, vec![leaf(7), leaf(8)]),
                ],
            ),
        ];

        let engine = Flextree::new().node_size([1.0, 1.0]);
        for tree in trees {
            let mut forward = tree.clone();
            let mut backward = mirrored(&tree);
            engine.layout(&mut forward).unwrap();
            engine.layout(&mut backward).unwrap();

            let (xs, mirrored_xs) = (xs_by_label(&forward), xs_by_label(&backward));
            for (label, (x, m)) in xs.iter().zip(&mirrored_xs).enumerate() {
                assert!((x + m).abs() < EPS, "Node {label}: x = {x}, mirrored x = {m}");
            }
            let ys: Vec<_> = forward.iter().map(|n| (n.data, n.y)).collect();
            for (label, y) in ys {
                let m = backward.iter().find(|n| n.data == label).unwrap();
                assert_eq!(m.y, y);
            }
        }
    }

    #[test]
    fn test_relayout_with_reported_sizes_keeps_structure() {
        for tree in corpus() {
            // Pick a frame whose scale factors come out as exact powers of two.
            let mut probe = tree.clone();
            Flextree::new()
                .spacing(|_, _| 0.0)
                .node_size([1.0, 1.0])
                .layout(&mut probe)
                .unwrap();
            let min = probe.iter().map(|n| n.x).fold(f64::INFINITY, f64::min);
            let max = probe.iter().map(|n| n.x).fold(f64::NEG_INFINITY, f64::max);
            let max_depth = probe.iter().map(|n| n.depth).max().unwrap_or(0).max(1);
            let frame = [(max - min + 1.0) * 4.0, max_depth as f64 * 2.0];

            let mut fixed = tree.clone();
            Flextree::new()
                .spacing(|_, _| 0.0)
                .size(frame)
                .report_node_sizes(true)
                .layout(&mut fixed)
                .unwrap();
            assert!((fixed.x_size - 4.0).abs() < EPS, "kx = {}", fixed.x_size);
            assert!((fixed.y_size - 2.0).abs() < EPS, "ky = {}", fixed.y_size);

            let mut relaid = fixed.clone();
            Flextree::new()
                .spacing(|_, _| 0.0)
                .node_size_fn(|node: &Node<u32>| [node.x_size, node.y_size])
                .layout(&mut relaid)
                .unwrap();

            for (a, b) in fixed.iter().zip(relaid.iter()) {
                assert!(
                    ((a.x - fixed.x) - b.x).abs() < EPS * frame[0],
                    "Node {}: {} vs {}",
                    a.data,
                    a.x - fixed.x,
                    b.x
                );
                assert!((a.y - b.y).abs() < EPS * frame[1]);
            }
            let overlaps = FootprintIndex::from_reported(&relaid).overlapping_pairs(EPS);
            assert!(overlaps.is_empty(), "Relayout overlaps: {overlaps:?}");
        }
    }

    #[test]
    fn test_graph_to_layout_pipeline() {
        let mut graph: StableGraph<&str, ()> = StableGraph::new();
        let root = graph.add_node("root");
        let a = graph.add_node("a");
        let b = graph.add_node("b");
        let c = graph.add_node("c");
        graph.add_edge(root, a, ());
        graph.add_edge(root, b, ());
        graph.add_edge(a, c, ());

        let mut tree = Hierarchy::from_graph(&graph, root, |name| *name).unwrap();
        Flextree::new().node_size([2.0, 1.0]).layout(&mut tree).unwrap();

        let placed: Vec<_> = tree.iter().map(|n| (n.data, n.x, n.y)).collect();
        assert_eq!(
            placed,
            vec![
                ("root", 0.0, 0.0),
                ("a", -1.0, 1.0),
                ("c", -1.0, 2.0),
                ("b", 1.0, 1.0)
            ]
        );

        // Hit test the laid-out footprints.
        let index = FootprintIndex::from_tree(&tree, |_| [2.0, 1.0]);
        assert_eq!(index.at_point(1.0, 1.5), vec![NodeId(3)]);
        assert_eq!(index.at_point(-1.0, 2.5), vec![NodeId(2)]);
        assert!(index.overlapping_pairs(EPS).is_empty());
    }
}

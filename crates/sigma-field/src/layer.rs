//! Layers: ordered node collections behind a shared freeze gate.

use crate::aggregate::AggregationMode;
use crate::node::{Node, NodeCoord};

/// An ordered collection of nodes.
///
/// Insertion order is index order. While `frozen` is set the layer is skipped
/// by every stepping operation and its nodes stay byte-identical.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Layer {
    pub(crate) index: i64,
    pub(crate) name: Option<String>,
    pub(crate) nodes: Vec<Node>,
    pub(crate) frozen: bool,
}

impl Layer {
    /// Create an empty, unfrozen layer.
    pub fn new(index: i64) -> Self {
        Self {
            index,
            ..Self::default()
        }
    }

    /// Append a node and return its coordinate.
    pub(crate) fn push(
        &mut self,
        center: f64,
        neighbors: Vec<f64>,
        mode: AggregationMode,
        weights: Option<Vec<f64>>,
    ) -> NodeCoord {
        let coord = NodeCoord::new(self.index, self.nodes.len());
        self.nodes.push(Node::new(coord, center, neighbors, mode, weights));
        coord
    }

    /// Step every node in insertion order. Returns how many were stepped.
    pub(crate) fn step_all(&mut self) -> usize {
        if self.frozen {
            return 0;
        }
        for node in &mut self.nodes {
            node.step();
        }
        self.nodes.len()
    }

    pub fn index(&self) -> i64 {
        self.index
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, index: usize) -> Option<&Node> {
        self.nodes.get(index)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }
}

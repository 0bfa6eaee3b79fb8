//! Field nodes and the per-node diffusion step.
//!
//! A node holds a scalar center and an ordered, circular neighborhood. Each
//! diffusion step doubles the neighborhood by inserting the midpoint of every
//! adjacent pair, recomputes the aggregate, and appends it to the history.
//!
//! # Invariants
//!
//! - `neighbors.len() == k * 2^stage` where `k` is the initial count
//! - `history.len() == stage + 1`

use std::fmt;

use tracing::trace;

use crate::aggregate::{self, AggregationMode};

/// Address of a node inside a [`Space`](crate::Space).
///
/// Ordering is layer first, then position, which is the canonical visiting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeCoord {
    /// Layer index
    pub layer: i64,
    /// Position within the layer
    pub index: usize,
}

impl NodeCoord {
    /// Create a new coordinate.
    pub const fn new(layer: i64, index: usize) -> Self {
        Self { layer, index }
    }
}

impl fmt::Display for NodeCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.layer, self.index)
    }
}

/// Coarse trend classification of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Momentum {
    /// Never stepped
    #[default]
    Rest,
    /// Stepped at least once and not yet converged
    Expanding,
    /// Marked converged by the convergence driver
    Converged,
}

impl Momentum {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Rest => "rest",
            Self::Expanding => "expanding",
            Self::Converged => "converged",
        }
    }
}

impl fmt::Display for Momentum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded evaluation of a node.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HistoryEntry {
    pub stage: u32,
    pub result: f64,
}

/// A single evolving field point.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Node {
    pub(crate) center: f64,
    pub(crate) neighbors: Vec<f64>,
    pub(crate) mode: AggregationMode,
    pub(crate) weights: Option<Vec<f64>>,
    pub(crate) stage: u32,
    pub(crate) momentum: Momentum,
    pub(crate) history: Vec<HistoryEntry>,
    pub(crate) coord: NodeCoord,
}

impl Node {
    /// Create a node at rest with its initial evaluation recorded as stage 0.
    ///
    /// Weights are fitted to the neighbor count: missing entries become 1 and
    /// surplus entries are dropped, so doubling keeps them aligned.
    pub(crate) fn new(
        coord: NodeCoord,
        center: f64,
        neighbors: Vec<f64>,
        mode: AggregationMode,
        weights: Option<Vec<f64>>,
    ) -> Self {
        let weights = weights.map(|mut w| {
            w.resize(neighbors.len(), 1.0);
            w
        });
        let mut node = Self {
            center,
            neighbors,
            mode,
            weights,
            stage: 0,
            momentum: Momentum::Rest,
            history: Vec::new(),
            coord,
        };
        let result = node.compute();
        node.history.push(HistoryEntry { stage: 0, result });
        node
    }

    /// Aggregate the current neighborhood with the node's own mode.
    pub fn compute(&self) -> f64 {
        self.compute_with(self.mode)
    }

    /// Aggregate the current neighborhood with an arbitrary mode.
    pub fn compute_with(&self, mode: AggregationMode) -> f64 {
        aggregate::compute(self.center, &self.neighbors, mode, self.weights.as_deref())
    }

    /// Advance one diffusion stage.
    ///
    /// Not idempotent: every call doubles the neighborhood.
    pub fn step(&mut self) {
        let first_step = self.stage == 0;
        let new_stage = self.stage + 1;

        self.neighbors = double_circular(&self.neighbors);
        if let Some(weights) = self.weights.take() {
            self.weights = Some(double_circular(&weights));
        }

        let result = self.compute();
        self.history.push(HistoryEntry {
            stage: new_stage,
            result,
        });

        if first_step {
            self.momentum = Momentum::Expanding;
        }
        self.stage = new_stage;

        trace!(
            node = %self.coord,
            stage = new_stage,
            directions = self.neighbors.len(),
            result,
            "Stepped node"
        );
    }

    /// Absolute change between the last two history entries, if there are two.
    pub fn last_delta(&self) -> Option<f64> {
        match self.history.as_slice() {
            [.., prev, last] => Some((last.result - prev.result).abs()),
            _ => None,
        }
    }

    pub fn center(&self) -> f64 {
        self.center
    }

    pub fn neighbors(&self) -> &[f64] {
        &self.neighbors
    }

    pub fn mode(&self) -> AggregationMode {
        self.mode
    }

    pub fn weights(&self) -> Option<&[f64]> {
        self.weights.as_deref()
    }

    pub fn stage(&self) -> u32 {
        self.stage
    }

    pub fn momentum(&self) -> Momentum {
        self.momentum
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn coord(&self) -> NodeCoord {
        self.coord
    }

    pub fn layer_index(&self) -> i64 {
        self.coord.layer
    }

    pub fn node_index(&self) -> usize {
        self.coord.index
    }
}

/// Double a circular sequence by inserting the midpoint after every element.
///
/// Originals land at even positions, midpoints of `(xᵢ, xᵢ₊₁ mod n)` at odd ones.
pub fn double_circular(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let mut out = Vec::with_capacity(n * 2);
    for (i, &x) in values.iter().enumerate() {
        let next = values[(i + 1) % n];
        out.push(x);
        out.push((x + next) / 2.0);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn node(center: f64, neighbors: &[f64], mode: AggregationMode) -> Node {
        Node::new(NodeCoord::new(0, 0), center, neighbors.to_vec(), mode, None)
    }

    #[test]
    fn new_node_records_stage_zero() {
        let n = node(5.0, &[1.0, 2.0, 3.0, 4.0], AggregationMode::Weighted);
        assert_eq!(n.stage(), 0);
        assert_eq!(n.momentum(), Momentum::Rest);
        assert_eq!(n.history(), &[HistoryEntry { stage: 0, result: 7.5 }]);
        assert_eq!(n.last_delta(), None);
    }

    #[test]
    fn doubling_interleaves_midpoints() {
        assert_eq!(
            double_circular(&[1.0, 2.0, 3.0, 4.0]),
            vec![1.0, 1.5, 2.0, 2.5, 3.0, 3.5, 4.0, 2.5]
        );
        assert_eq!(double_circular(&[7.0]), vec![7.0, 7.0]);
        assert!(double_circular(&[]).is_empty());
    }

    #[test]
    fn first_step_sets_expanding() {
        let mut n = node(5.0, &[1.0, 2.0, 3.0, 4.0], AggregationMode::Weighted);
        n.step();

        assert_eq!(n.stage(), 1);
        assert_eq!(n.neighbors().len(), 8);
        assert_eq!(n.momentum(), Momentum::Expanding);
        assert_eq!(n.history().len(), 2);
    }

    #[test]
    fn step_keeps_converged_momentum() {
        let mut n = node(1.0, &[1.0], AggregationMode::Weighted);
        n.step();
        n.momentum = Momentum::Converged;
        n.step();
        assert_eq!(n.momentum(), Momentum::Converged);
    }

    #[test]
    fn weights_stay_aligned() {
        let mut n = Node::new(
            NodeCoord::new(0, 0),
            0.0,
            vec![1.0, 3.0],
            AggregationMode::Weighted,
            Some(vec![1.0, 3.0]),
        );
        n.step();
        assert_eq!(n.weights().map(<[f64]>::len), Some(4));
        assert_eq!(n.weights(), Some(&[1.0, 2.0, 3.0, 2.0][..]));
    }

    #[test]
    fn short_weights_are_padded_before_doubling() {
        let mut n = Node::new(
            NodeCoord::new(0, 0),
            0.0,
            vec![1.0, 2.0, 3.0, 4.0],
            AggregationMode::Weighted,
            Some(vec![3.0]),
        );
        assert_eq!(n.weights(), Some(&[3.0, 1.0, 1.0, 1.0][..]));

        n.step();
        assert_eq!(
            n.weights(),
            Some(&[3.0, 2.0, 1.0, 1.0, 1.0, 1.0, 1.0, 2.0][..])
        );
        // neighbors [1, 1.5, 2, 2.5, 3, 3.5, 4, 2.5]: Σw·x = 26, Σw = 12
        assert!((n.compute() - 26.0 / 12.0).abs() < 1e-12);
    }

    #[test]
    fn surplus_weights_are_dropped() {
        let n = Node::new(
            NodeCoord::new(0, 0),
            0.0,
            vec![2.0, 4.0],
            AggregationMode::Weighted,
            Some(vec![1.0, 3.0, 100.0]),
        );
        assert_eq!(n.weights(), Some(&[1.0, 3.0][..]));
        assert_eq!(n.compute(), 3.5);
    }

    #[test]
    fn empty_neighborhood_stays_empty() {
        let mut n = node(2.0, &[], AggregationMode::Harmonic);
        for _ in 0..3 {
            n.step();
        }
        assert!(n.neighbors().is_empty());
        assert_eq!(n.stage(), 3);
        assert!(n.history().iter().all(|h| h.result == 2.0));
    }

    #[test]
    fn stepping_is_deterministic() {
        let mut a = node(0.3, &[0.1, -0.7, 2.2], AggregationMode::Entropy);
        let mut b = a.clone();
        for _ in 0..4 {
            a.step();
            b.step();
        }
        assert_eq!(a, b);
    }

    proptest! {
        #[test]
        fn neighbor_count_doubles(
            neighbors in prop::collection::vec(-100.0f64..100.0, 0..6),
            steps in 0u32..6,
        ) {
            let k = neighbors.len();
            let mut n = node(1.0, &neighbors, AggregationMode::Weighted);
            for _ in 0..steps {
                n.step();
                prop_assert_eq!(n.history().len(), n.stage() as usize + 1);
            }
            prop_assert_eq!(n.neighbors().len(), k * 2usize.pow(steps));
        }

        #[test]
        fn originals_survive_at_even_positions(
            neighbors in prop::collection::vec(-100.0f64..100.0, 1..8),
        ) {
            let doubled = double_circular(&neighbors);
            for (i, x) in neighbors.iter().enumerate() {
                prop_assert_eq!(doubled[2 * i], *x);
            }
        }
    }
}

//! Sigma Field
//!
//! A layered graph of scalar field nodes that evolve by deterministic diffusion.
//!
//! # Model
//!
//! A [`Space`] owns layers keyed by integer index; each [`Layer`] owns nodes in
//! insertion order. Nodes are addressed by [`NodeCoord`] rather than by
//! reference, so the space is the single owner of all state.
//!
//! # Diffusion
//!
//! Every step doubles a node's circular neighborhood by inserting midpoints
//! between adjacent values, recomputes its aggregate and appends it to the
//! node's history:
//!
//! - `neighbors.len() == k * 2^stage`
//! - `history.len() == stage + 1`
//!
//! Frozen layers are skipped by every stepping operation.
//!
//! # Convergence and resonance
//!
//! [`Space::diffuse`] drives stepping under a [`ConvergenceCriteria`].
//! [`Space::find_resonances`] scans all node pairs for similar centers and
//! neighbor patterns.
//!
//! # Usage
//!
//! ```
//! use sigma_field::{ConvergenceCriteria, Space, Topology};
//!
//! let mut space = Space::new(Topology::Flat);
//! let coord = space.add_node(0, 5.0, vec![1.0, 2.0, 3.0, 4.0], None, None);
//! assert_eq!(space.node(coord).unwrap().compute(), 7.5);
//!
//! space.diffuse(ConvergenceCriteria::Steps(1), None, None);
//! assert_eq!(space.node(coord).unwrap().neighbors().len(), 8);
//! ```

mod aggregate;
mod config;
mod convergence;
mod error;
mod introspect;
mod layer;
mod node;
mod resonance;
mod space;

pub use aggregate::{compute, median, shannon_entropy, AggregationMode, UnknownMode, DEFAULT_MINKOWSKI_P};
pub use config::{EngineConfig, ResonanceWeights, DEFAULT_CONVERGENCE_THRESHOLD, DEFAULT_MAX_ITERATIONS};
pub use convergence::ConvergenceCriteria;
pub use error::{Error, Result};
pub use introspect::{
    tendency_of, FieldPosition, Flow, SpaceSummary, Tendency, Trend, Will, WILL_SATURATION_STAGE,
    WILL_WINDOW,
};
pub use layer::Layer;
pub use node::{double_circular, HistoryEntry, Momentum, Node, NodeCoord};
pub use resonance::{center_proximity, pattern_similarity, similarity, Resonance};
pub use space::{Space, Topology};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weighted_scenario() {
        let mut space = Space::new(Topology::Flat);
        let coord = space.add_node(0, 5.0, vec![1.0, 2.0, 3.0, 4.0], Some(AggregationMode::Weighted), None);
        assert_eq!(space.node(coord).map(Node::compute), Ok(7.5));

        space.step_node(coord).unwrap();
        let node = space.node(coord).unwrap();
        assert_eq!(node.neighbors().len(), 8);
        assert_eq!(node.momentum(), Momentum::Expanding);
        assert_eq!(node.stage(), 1);

        for _ in 0..3 {
            space.step_node(coord).unwrap();
        }
        assert_eq!(space.node(coord).unwrap().neighbors().len(), 64);
    }
}

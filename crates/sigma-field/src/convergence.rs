//! Convergence driver: repeated diffusion under a stopping policy.
//!
//! # Policies
//!
//! - `Steps(n)`: exactly `n` space-wide steps, regardless of value change
//! - `Epsilon(e)`: each node steps until its last delta drops below `e`
//! - `Converged`: `Epsilon` with the configured default threshold
//! - `Fixed`: no stepping, report current values
//!
//! Epsilon-driven runs proceed in rounds. Each round steps every node that is
//! still active once, in canonical order, and advances the global stage.
//! Nodes converge independently and leave the active set as they do. A node
//! that reaches the configured iteration bound without converging leaves the
//! active set with its momentum still `Expanding`.

use tracing::{debug, warn};

use crate::aggregate::AggregationMode;
use crate::node::{Momentum, NodeCoord};
use crate::space::Space;

/// Stopping policy for [`Space::diffuse`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ConvergenceCriteria {
    /// Apply exactly this many space-wide steps.
    Steps(u32),
    /// Step each node until `|Δresult| < epsilon`.
    Epsilon(f64),
    /// Epsilon with the engine's configured threshold.
    Converged,
    /// Do not step; report current values.
    Fixed,
}

impl Space {
    /// Run diffusion under `criteria` and report the final value of every
    /// targeted node, ordered by layer then node index.
    ///
    /// Targeted nodes are those in unfrozen layers, restricted to `target`
    /// when given. A missing target yields an empty result. When
    /// `contraction` is set, reported values are aggregated with that mode
    /// instead of each node's own; nodes are not modified by it.
    pub fn diffuse(
        &mut self,
        criteria: ConvergenceCriteria,
        target: Option<i64>,
        contraction: Option<AggregationMode>,
    ) -> Vec<f64> {
        let targets = self.targets(target);
        debug!(?criteria, ?target, nodes = targets.len(), "Starting diffusion");

        match criteria {
            ConvergenceCriteria::Steps(n) => {
                for _ in 0..n {
                    self.step(target);
                }
            }
            ConvergenceCriteria::Epsilon(epsilon) => self.run_until(&targets, epsilon),
            ConvergenceCriteria::Converged => {
                let epsilon = self.config.convergence_threshold;
                self.run_until(&targets, epsilon);
            }
            ConvergenceCriteria::Fixed => {}
        }

        targets
            .iter()
            .filter_map(|&coord| self.node(coord).ok())
            .map(|node| node.compute_with(contraction.unwrap_or(node.mode)))
            .collect()
    }

    fn targets(&self, target: Option<i64>) -> Vec<NodeCoord> {
        self.layers
            .values()
            .filter(|layer| !layer.frozen)
            .filter(|layer| target.map_or(true, |t| layer.index == t))
            .flat_map(|layer| layer.nodes.iter().map(|node| node.coord))
            .collect()
    }

    fn run_until(&mut self, targets: &[NodeCoord], epsilon: f64) {
        let max_iterations = self.config.max_iterations;

        let mut active: Vec<(NodeCoord, u32)> = targets
            .iter()
            .filter(|&&coord| {
                self.node(coord)
                    .map_or(false, |node| node.momentum != Momentum::Converged)
            })
            .map(|&coord| (coord, 0))
            .collect();

        let mut rounds = 0u32;
        while !active.is_empty() {
            active.retain_mut(|(coord, iterations)| {
                let Ok(node) = self.node_mut(*coord) else {
                    return false;
                };

                node.step();
                *iterations += 1;

                if node.last_delta().is_some_and(|delta| delta < epsilon) {
                    node.momentum = Momentum::Converged;
                    debug!(node = %coord, iterations = *iterations, "Node converged");
                    return false;
                }

                if *iterations >= max_iterations {
                    warn!(
                        node = %coord,
                        iterations = *iterations,
                        delta = ?node.last_delta(),
                        "Node hit iteration bound without converging"
                    );
                    return false;
                }

                true
            });

            self.global_stage += 1;
            rounds += 1;
        }

        debug!(rounds, epsilon, "Diffusion finished");
    }
}

//! Read-only introspection ("sigma") accessors.
//!
//! Nothing here mutates a node or a space.

use std::fmt;

use crate::error::Result;
use crate::node::{HistoryEntry, Momentum, Node, NodeCoord};
use crate::space::Space;

/// Number of most recent deltas considered by [`Node::sigma_will`].
pub const WILL_WINDOW: usize = 5;

/// Stage at which [`Will::strength`] saturates.
pub const WILL_SATURATION_STAGE: u32 = 5;

/// Motion summary of a node.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Flow {
    pub stage: u32,
    /// Current neighbor count
    pub directions: usize,
    pub momentum: Momentum,
    /// Absolute change of the last step, zero before the first
    pub velocity: f64,
}

/// Where a node sits in its space.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FieldPosition {
    pub center: f64,
    pub layer_index: i64,
    pub node_index: usize,
}

/// Direction of a single history delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Trend {
    Rising,
    Falling,
    Flat,
}

impl Trend {
    fn of(delta: f64) -> Self {
        if delta > 0.0 {
            Self::Rising
        } else if delta < 0.0 {
            Self::Falling
        } else {
            Self::Flat
        }
    }
}

/// Overall tendency read from recent trends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Tendency {
    /// Successive deltas alternate in sign
    Spiral,
    /// More than half the deltas rise
    Expand,
    /// More than half the deltas fall
    Contract,
    Rest,
}

impl fmt::Display for Tendency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Spiral => "spiral",
            Self::Expand => "expand",
            Self::Contract => "contract",
            Self::Rest => "rest",
        })
    }
}

/// Directional intent of a node.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Will {
    pub tendency: Tendency,
    /// `min(stage / 5, 1)`
    pub strength: f64,
    /// Trend of each delta in the window, oldest first
    pub trends: Vec<Trend>,
}

/// Population summary of a space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpaceSummary {
    pub layer_count: usize,
    pub total_nodes: usize,
    /// Nodes in unfrozen layers
    pub active_nodes: usize,
    pub converged_nodes: usize,
    pub expanding_nodes: usize,
    pub global_stage: u64,
}

impl Node {
    pub fn sigma_flow(&self) -> Flow {
        Flow {
            stage: self.stage,
            directions: self.neighbors.len(),
            momentum: self.momentum,
            velocity: self.last_delta().unwrap_or(0.0),
        }
    }

    pub fn sigma_memory(&self) -> &[HistoryEntry] {
        &self.history
    }

    /// Read the node's tendency from its last few history deltas.
    pub fn sigma_will(&self) -> Will {
        let deltas: Vec<f64> = self
            .history
            .windows(2)
            .map(|pair| pair[1].result - pair[0].result)
            .collect();
        let window = &deltas[deltas.len().saturating_sub(WILL_WINDOW)..];
        let trends: Vec<Trend> = window.iter().copied().map(Trend::of).collect();

        Will {
            tendency: tendency_of(&trends),
            strength: (f64::from(self.stage) / f64::from(WILL_SATURATION_STAGE)).min(1.0),
            trends,
        }
    }
}

/// Classify a run of trends.
///
/// Alternation is judged on the non-flat trends and needs at least two of them.
pub fn tendency_of(trends: &[Trend]) -> Tendency {
    let moving: Vec<Trend> = trends
        .iter()
        .copied()
        .filter(|t| *t != Trend::Flat)
        .collect();

    if moving.len() >= 2 && moving.windows(2).all(|w| w[0] != w[1]) {
        return Tendency::Spiral;
    }

    let rising = trends.iter().filter(|t| **t == Trend::Rising).count();
    let falling = trends.iter().filter(|t| **t == Trend::Falling).count();
    let half = trends.len() / 2;

    if rising > half {
        Tendency::Expand
    } else if falling > half {
        Tendency::Contract
    } else {
        Tendency::Rest
    }
}

impl Space {
    pub fn sigma_field(&self, coord: NodeCoord) -> Result<FieldPosition> {
        let node = self.node(coord)?;
        Ok(FieldPosition {
            center: node.center,
            layer_index: node.coord.layer,
            node_index: node.coord.index,
        })
    }

    pub fn sigma_space(&self) -> SpaceSummary {
        let count = |momentum: Momentum| self.nodes().filter(|n| n.momentum == momentum).count();

        SpaceSummary {
            layer_count: self.layers.len(),
            total_nodes: self.node_count(),
            active_nodes: self
                .layers
                .values()
                .filter(|layer| !layer.frozen)
                .map(|layer| layer.nodes.len())
                .sum(),
            converged_nodes: count(Momentum::Converged),
            expanding_nodes: count(Momentum::Expanding),
            global_stage: self.global_stage,
        }
    }
}

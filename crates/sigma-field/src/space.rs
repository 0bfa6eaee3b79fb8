//! The layered field space and space-wide stepping.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::aggregate::AggregationMode;
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::layer::Layer;
use crate::node::{Node, NodeCoord};

/// Opaque topology tag. The engine never interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Topology {
    #[default]
    Flat,
    Torus,
    Named(String),
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flat => f.write_str("flat"),
            Self::Torus => f.write_str("torus"),
            Self::Named(name) => f.write_str(name),
        }
    }
}

impl FromStr for Topology {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let tag = s.trim();
        Ok(match tag.to_ascii_lowercase().as_str() {
            "flat" => Self::Flat,
            "torus" => Self::Torus,
            _ => Self::Named(tag.to_string()),
        })
    }
}

/// A layered graph of field nodes.
///
/// The space exclusively owns its layers and their nodes. Layers are visited
/// in ascending index order and nodes in insertion order, so identical
/// initial states evolve bit-for-bit identically.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Space {
    pub(crate) layers: BTreeMap<i64, Layer>,
    pub(crate) topology: Topology,
    pub(crate) global_stage: u64,
    pub(crate) config: EngineConfig,
}

impl Space {
    /// Create an empty space with the default engine config.
    pub fn new(topology: Topology) -> Self {
        Self::with_config(topology, EngineConfig::default())
    }

    /// Create an empty space with an explicit config.
    pub fn with_config(topology: Topology, config: EngineConfig) -> Self {
        Self {
            layers: BTreeMap::new(),
            topology,
            global_stage: 0,
            config,
        }
    }

    /// Insert a node, creating the layer if it does not exist yet.
    ///
    /// `mode` defaults to [`AggregationMode::Weighted`].
    pub fn add_node(
        &mut self,
        layer: i64,
        center: f64,
        neighbors: Vec<f64>,
        mode: Option<AggregationMode>,
        weights: Option<Vec<f64>>,
    ) -> NodeCoord {
        let coord = self
            .layers
            .entry(layer)
            .or_insert_with(|| Layer::new(layer))
            .push(center, neighbors, mode.unwrap_or_default(), weights);
        debug!(node = %coord, center, "Added node");
        coord
    }

    /// Step every unfrozen layer, or only `target` when given.
    ///
    /// A missing target touches no nodes. The global stage advances either way.
    pub fn step(&mut self, target: Option<i64>) {
        let stepped: usize = match target {
            Some(index) => self.layers.get_mut(&index).map_or(0, Layer::step_all),
            None => self.layers.values_mut().map(Layer::step_all).sum(),
        };
        self.global_stage += 1;
        debug!(
            global_stage = self.global_stage,
            target = ?target,
            stepped,
            "Stepped space"
        );
    }

    /// Step a single node.
    ///
    /// Returns `Ok(false)` without touching the node when its layer is frozen.
    /// A missing layer or node is an error even when the layer is frozen.
    pub fn step_node(&mut self, coord: NodeCoord) -> Result<bool> {
        let layer = self.layer_mut(coord.layer)?;
        let frozen = layer.frozen;
        let node = layer.nodes.get_mut(coord.index).ok_or(Error::NodeNotFound {
            layer: coord.layer,
            index: coord.index,
        })?;
        if frozen {
            return Ok(false);
        }
        node.step();
        Ok(true)
    }

    /// Exclude a layer from stepping.
    pub fn freeze_layer(&mut self, index: i64) -> Result<()> {
        self.layer_mut(index)?.frozen = true;
        debug!(layer = index, "Froze layer");
        Ok(())
    }

    /// Re-admit a frozen layer to stepping.
    pub fn thaw_layer(&mut self, index: i64) -> Result<()> {
        self.layer_mut(index)?.frozen = false;
        debug!(layer = index, "Thawed layer");
        Ok(())
    }

    /// Attach a human-readable label to a layer.
    pub fn name_layer(&mut self, index: i64, name: impl Into<String>) -> Result<()> {
        self.layer_mut(index)?.name = Some(name.into());
        Ok(())
    }

    pub fn layer(&self, index: i64) -> Result<&Layer> {
        self.layers.get(&index).ok_or(Error::LayerNotFound(index))
    }

    fn layer_mut(&mut self, index: i64) -> Result<&mut Layer> {
        self.layers.get_mut(&index).ok_or(Error::LayerNotFound(index))
    }

    /// Look up a node by coordinate.
    pub fn node(&self, coord: NodeCoord) -> Result<&Node> {
        self.layer(coord.layer)?
            .node(coord.index)
            .ok_or(Error::NodeNotFound {
                layer: coord.layer,
                index: coord.index,
            })
    }

    pub(crate) fn node_mut(&mut self, coord: NodeCoord) -> Result<&mut Node> {
        self.layer_mut(coord.layer)?
            .nodes
            .get_mut(coord.index)
            .ok_or(Error::NodeNotFound {
                layer: coord.layer,
                index: coord.index,
            })
    }

    /// Layers in ascending index order.
    pub fn layers(&self) -> impl Iterator<Item = &Layer> {
        self.layers.values()
    }

    /// Every node, layer by layer, in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.layers.values().flat_map(|layer| layer.nodes.iter())
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn node_count(&self) -> usize {
        self.layers.values().map(Layer::len).sum()
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn global_stage(&self) -> u64 {
        self.global_stage
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Digest of the complete numeric state, hex encoded.
    ///
    /// Floats are hashed by bit pattern, so two spaces share a fingerprint
    /// only when they are bit-for-bit identical.
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.topology.to_string().as_bytes());
        hasher.update(&self.global_stage.to_le_bytes());

        for (index, layer) in &self.layers {
            hasher.update(&index.to_le_bytes());
            hasher.update(&[u8::from(layer.frozen)]);
            hasher.update(&(layer.nodes.len() as u64).to_le_bytes());
            for node in &layer.nodes {
                hash_node(&mut hasher, node);
            }
        }

        hex::encode(hasher.finalize().as_bytes())
    }
}

fn hash_node(hasher: &mut blake3::Hasher, node: &Node) {
    let floats = |hasher: &mut blake3::Hasher, values: &[f64]| {
        hasher.update(&(values.len() as u64).to_le_bytes());
        for v in values {
            hasher.update(&v.to_bits().to_le_bytes());
        }
    };

    hasher.update(&node.center.to_bits().to_le_bytes());
    floats(hasher, &node.neighbors);
    hasher.update(node.mode.to_string().as_bytes());
    match &node.weights {
        Some(weights) => {
            hasher.update(&[1]);
            floats(hasher, weights);
        }
        None => {
            hasher.update(&[0]);
        }
    }
    hasher.update(&node.stage.to_le_bytes());
    hasher.update(node.momentum.as_str().as_bytes());
    for entry in &node.history {
        hasher.update(&entry.stage.to_le_bytes());
        hasher.update(&entry.result.to_bits().to_le_bytes());
    }
}

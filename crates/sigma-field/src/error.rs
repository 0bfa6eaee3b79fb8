//! Error types for sigma-field.

use thiserror::Error;

/// Result type for sigma-field operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when addressing or configuring a field space.
///
/// Numeric edge cases never surface here: aggregation substitutes safe
/// defaults instead of failing.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// No layer exists at the given index.
    #[error("layer {0} not found")]
    LayerNotFound(i64),

    /// The layer exists but has no node at the given position.
    #[error("node {index} not found in layer {layer}")]
    NodeNotFound { layer: i64, index: usize },

    /// A configuration value failed validation.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

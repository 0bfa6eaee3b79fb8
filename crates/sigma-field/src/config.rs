//! Engine configuration.
//!
//! Every knob has a default; `from_env` overlays `SIGMA_*` environment
//! variables on top of those defaults.

use std::str::FromStr;

use tracing::warn;

use crate::error::{Error, Result};

/// Threshold used by [`ConvergenceCriteria::Converged`](crate::ConvergenceCriteria::Converged).
pub const DEFAULT_CONVERGENCE_THRESHOLD: f64 = 1e-3;

/// Per-node iteration cap for epsilon-driven diffusion.
///
/// Neighborhoods double every step, so a node with `k` neighbors holds
/// `k * 2^16` values when it reaches this bound.
pub const DEFAULT_MAX_ITERATIONS: u32 = 16;

/// Blend weights for the resonance similarity score.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResonanceWeights {
    /// Weight of center proximity
    pub center: f64,
    /// Weight of neighbor-pattern cosine similarity
    pub pattern: f64,
}

impl Default for ResonanceWeights {
    fn default() -> Self {
        Self {
            center: 0.5,
            pattern: 0.5,
        }
    }
}

impl ResonanceWeights {
    /// Create a weight pair.
    pub const fn new(center: f64, pattern: f64) -> Self {
        Self { center, pattern }
    }
}

/// Configuration carried by a [`Space`](crate::Space).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EngineConfig {
    /// Delta below which a node counts as converged under `Converged`
    pub convergence_threshold: f64,

    /// Safety bound on steps per node during epsilon-driven diffusion
    pub max_iterations: u32,

    /// Resonance blend weights
    pub resonance: ResonanceWeights,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            convergence_threshold: DEFAULT_CONVERGENCE_THRESHOLD,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            resonance: ResonanceWeights::default(),
        }
    }
}

impl EngineConfig {
    /// Create config from environment variables with sensible defaults.
    ///
    /// Recognised variables:
    /// - `SIGMA_CONVERGENCE_THRESHOLD`
    /// - `SIGMA_MAX_ITERATIONS`
    /// - `SIGMA_RESONANCE_CENTER_WEIGHT`
    /// - `SIGMA_RESONANCE_PATTERN_WEIGHT`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup.
    ///
    /// Values that fail to parse are logged and replaced by the default.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Self {
            convergence_threshold: parse_or(
                &lookup,
                "SIGMA_CONVERGENCE_THRESHOLD",
                defaults.convergence_threshold,
            ),
            max_iterations: parse_or(&lookup, "SIGMA_MAX_ITERATIONS", defaults.max_iterations),
            resonance: ResonanceWeights {
                center: parse_or(
                    &lookup,
                    "SIGMA_RESONANCE_CENTER_WEIGHT",
                    defaults.resonance.center,
                ),
                pattern: parse_or(
                    &lookup,
                    "SIGMA_RESONANCE_PATTERN_WEIGHT",
                    defaults.resonance.pattern,
                ),
            },
        }
    }

    /// Check that every value is usable.
    pub fn validate(&self) -> Result<()> {
        if !self.convergence_threshold.is_finite() || self.convergence_threshold <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "convergence threshold must be positive and finite, got {}",
                self.convergence_threshold
            )));
        }

        if self.max_iterations == 0 {
            return Err(Error::InvalidConfig(
                "max iterations must be at least 1".to_string(),
            ));
        }

        let ResonanceWeights { center, pattern } = self.resonance;
        for (name, w) in [("center", center), ("pattern", pattern)] {
            if !w.is_finite() || w < 0.0 {
                return Err(Error::InvalidConfig(format!(
                    "resonance {name} weight must be non-negative and finite, got {w}"
                )));
            }
        }
        if center + pattern == 0.0 {
            return Err(Error::InvalidConfig(
                "resonance weights must not both be zero".to_string(),
            ));
        }

        Ok(())
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                warn!(key, value = %raw, fallback = %default, "Ignoring unparseable config value");
                default
            }
        },
        None => default,
    }
}

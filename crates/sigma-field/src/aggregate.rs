//! Aggregation of a node's neighborhood into a single scalar.
//!
//! Every mode maps `(center, neighbors, weights)` to a number. An empty
//! neighborhood always yields `center`. Degenerate inputs (zero sums, zero
//! magnitudes) substitute a divisor of 1 rather than producing an error.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Default exponent for [`AggregationMode::Minkowski`].
pub const DEFAULT_MINKOWSKI_P: f64 = 2.0;

/// How a node folds its neighbors into a result.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum AggregationMode {
    /// `center + Σ(wᵢ·xᵢ) / Σw`
    #[default]
    Weighted,
    /// `center · Π(1 + xᵢ)`
    Multiplicative,
    /// `center + n / Σ(1/|xᵢ|)`
    Harmonic,
    /// `center · mean(exp(xᵢ))`
    Exponential,
    /// `center · (Π|xᵢ|)^(1/n)`
    Geometric,
    /// `center + median(x)`
    Median,
    /// `center + (mean(|xᵢ|^p))^(1/p)`
    Minkowski { p: f64 },
    /// `center · (1 + H)` with H the Shannon entropy of normalized magnitudes
    Entropy,
    /// Returns `center` unchanged. Unrecognised mode names resolve here.
    Passthrough,
}

impl AggregationMode {
    /// Minkowski with the default exponent.
    pub const fn minkowski() -> Self {
        Self::Minkowski {
            p: DEFAULT_MINKOWSKI_P,
        }
    }

    /// Resolve a mode by name, falling back to [`AggregationMode::Passthrough`].
    pub fn from_name(name: &str) -> Self {
        name.parse().unwrap_or(Self::Passthrough)
    }

    /// Canonical lowercase name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Weighted => "weighted",
            Self::Multiplicative => "multiplicative",
            Self::Harmonic => "harmonic",
            Self::Exponential => "exponential",
            Self::Geometric => "geometric",
            Self::Median => "median",
            Self::Minkowski { .. } => "minkowski",
            Self::Entropy => "entropy",
            Self::Passthrough => "passthrough",
        }
    }

    /// All named modes, Minkowski at its default exponent.
    pub const ALL: [Self; 9] = [
        Self::Weighted,
        Self::Multiplicative,
        Self::Harmonic,
        Self::Exponential,
        Self::Geometric,
        Self::Median,
        Self::minkowski(),
        Self::Entropy,
        Self::Passthrough,
    ];
}

impl fmt::Display for AggregationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Minkowski { p } if *p != DEFAULT_MINKOWSKI_P => write!(f, "minkowski(p={p})"),
            other => f.write_str(other.name()),
        }
    }
}

/// Error returned when a mode name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown aggregation mode: {0}")]
pub struct UnknownMode(pub String);

impl FromStr for AggregationMode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "weighted" => Ok(Self::Weighted),
            "multiplicative" => Ok(Self::Multiplicative),
            "harmonic" => Ok(Self::Harmonic),
            "exponential" => Ok(Self::Exponential),
            "geometric" => Ok(Self::Geometric),
            "median" => Ok(Self::Median),
            "minkowski" => Ok(Self::minkowski()),
            "entropy" => Ok(Self::Entropy),
            "passthrough" => Ok(Self::Passthrough),
            _ => Err(UnknownMode(s.to_string())),
        }
    }
}

/// Aggregate a neighborhood around `center`.
///
/// Missing weights default to 1 and surplus weights are ignored.
pub fn compute(center: f64, neighbors: &[f64], mode: AggregationMode, weights: Option<&[f64]>) -> f64 {
    if neighbors.is_empty() {
        return center;
    }
    let n = neighbors.len() as f64;

    match mode {
        AggregationMode::Weighted => {
            let weight = |i: usize| weights.and_then(|w| w.get(i)).copied().unwrap_or(1.0);
            let (num, den) = neighbors
                .iter()
                .enumerate()
                .fold((0.0, 0.0), |(num, den), (i, &x)| {
                    let w = weight(i);
                    (num + w * x, den + w)
                });
            center + num / nonzero_or_one(den)
        }
        AggregationMode::Multiplicative => {
            center * neighbors.iter().map(|x| 1.0 + x).product::<f64>()
        }
        AggregationMode::Harmonic => {
            let inv_sum: f64 = neighbors.iter().map(|x| 1.0 / nonzero_or_one(x.abs())).sum();
            center + n / nonzero_or_one(inv_sum)
        }
        AggregationMode::Exponential => {
            center * (neighbors.iter().map(|x| x.exp()).sum::<f64>() / n)
        }
        AggregationMode::Geometric => {
            let product: f64 = neighbors.iter().map(|x| x.abs()).product();
            center * nonzero_or_one(product).powf(1.0 / n)
        }
        AggregationMode::Median => center + median(neighbors),
        AggregationMode::Minkowski { p } => {
            let p = if p.is_finite() && p > 0.0 { p } else { DEFAULT_MINKOWSKI_P };
            let mean = neighbors.iter().map(|x| x.abs().powf(p)).sum::<f64>() / n;
            center + mean.powf(1.0 / p)
        }
        AggregationMode::Entropy => center * (1.0 + shannon_entropy(neighbors)),
        AggregationMode::Passthrough => center,
    }
}

/// Median of a non-empty slice; mean of the middle pair for even lengths.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Shannon entropy, in bits, of `|xᵢ| / Σ|x|`. Zero when the total is zero.
pub fn shannon_entropy(values: &[f64]) -> f64 {
    let total: f64 = values.iter().map(|x| x.abs()).sum();
    if total == 0.0 || !total.is_finite() {
        return 0.0;
    }
    values
        .iter()
        .map(|x| x.abs() / total)
        .filter(|&p| p > 0.0)
        .map(|p| -p * p.log2())
        .sum()
}

#[inline]
fn nonzero_or_one(x: f64) -> f64 {
    if x == 0.0 {
        1.0
    } else {
        x
    }
}

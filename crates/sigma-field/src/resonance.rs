//! Cross-layer structural resonance.
//!
//! Two nodes resonate when their centers are close and their neighbor
//! patterns point the same way. The score blends:
//!
//! - center proximity: `1 - |a - b| / max(|a|, |b|, 1)`
//! - pattern similarity: cosine of the common neighbor prefix
//!
//! using [`ResonanceWeights`], clamped to `[0, 1]`.

use tracing::debug;

use crate::config::ResonanceWeights;
use crate::node::{Node, NodeCoord};
use crate::space::Space;

/// A resonating pair. `a` always precedes `b` in canonical order.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Resonance {
    pub a: NodeCoord,
    pub b: NodeCoord,
    pub similarity: f64,
}

/// `1 - |a - b| / max(|a|, |b|, 1)`.
pub fn center_proximity(a: f64, b: f64) -> f64 {
    1.0 - (a - b).abs() / a.abs().max(b.abs()).max(1.0)
}

/// Cosine similarity over the first `min(|a|, |b|)` entries.
///
/// Zero when either side is empty or has zero norm.
pub fn pattern_similarity(a: &[f64], b: &[f64]) -> f64 {
    let len = a.len().min(b.len());
    if len == 0 {
        return 0.0;
    }
    let (a, b) = (&a[..len], &b[..len]);

    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f64>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Blended similarity of two nodes, in `[0, 1]`.
pub fn similarity(a: &Node, b: &Node, weights: ResonanceWeights) -> f64 {
    let total = weights.center + weights.pattern;
    let total = if total > 0.0 { total } else { 1.0 };

    let score = (weights.center * center_proximity(a.center, b.center)
        + weights.pattern * pattern_similarity(&a.neighbors, &b.neighbors))
        / total;

    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 1.0)
    }
}

impl Space {
    /// Every unordered pair of distinct nodes whose similarity reaches
    /// `threshold`, in canonical pair order. Each pair appears once.
    pub fn find_resonances(&self, threshold: f64) -> Vec<Resonance> {
        let weights = self.config.resonance;
        let nodes: Vec<&Node> = self.nodes().collect();

        let mut found = Vec::new();
        for (i, a) in nodes.iter().enumerate() {
            for b in &nodes[i + 1..] {
                let score = similarity(a, b, weights);
                if score >= threshold {
                    found.push(Resonance {
                        a: a.coord,
                        b: b.coord,
                        similarity: score,
                    });
                }
            }
        }

        debug!(threshold, pairs = found.len(), "Resonance scan complete");
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::space::Topology;
    use proptest::prelude::*;

    #[test]
    fn identical_nodes_in_different_layers_resonate() {
        let mut space = Space::new(Topology::Flat);
        let a = space.add_node(0, 5.0, vec![1.0, 2.0, 3.0, 4.0], None, None);
        let b = space.add_node(3, 5.0, vec![1.0, 2.0, 3.0, 4.0], None, None);

        let found = space.find_resonances(0.8);

        assert_eq!(found.len(), 1);
        assert_eq!((found[0].a, found[0].b), (a, b));
        assert!(found[0].similarity > 0.8);
    }

    #[test]
    fn near_duplicates_outscore_dissimilar_nodes() {
        let mut space = Space::new(Topology::Flat);
        let base = space.add_node(0, 5.0, vec![1.0, 2.0, 3.0], None, None);
        let near = space.add_node(0, 5.1, vec![1.0, 2.1, 2.9], None, None);
        let far = space.add_node(1, -40.0, vec![-3.0, 0.0, 1.0], None, None);

        let weights = ResonanceWeights::default();
        let near_score = similarity(space.node(base).unwrap(), space.node(near).unwrap(), weights);
        let far_score = similarity(space.node(base).unwrap(), space.node(far).unwrap(), weights);
        assert!(near_score > far_score);

        let found = space.find_resonances(0.8);
        assert_eq!(found.len(), 1);
        assert_eq!((found[0].a, found[0].b), (base, near));
    }

    #[test]
    fn empty_patterns_score_center_only() {
        assert_eq!(pattern_similarity(&[], &[1.0]), 0.0);
        assert_eq!(pattern_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
        assert!((pattern_similarity(&[1.0, 2.0, 9.0], &[2.0, 4.0]) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn center_proximity_bounds() {
        assert_eq!(center_proximity(3.0, 3.0), 1.0);
        assert_eq!(center_proximity(0.0, 0.5), 0.5);
        assert_eq!(center_proximity(10.0, -10.0), -1.0);
    }

    #[test]
    fn single_node_has_no_pairs() {
        let mut space = Space::new(Topology::Flat);
        space.add_node(0, 1.0, vec![1.0], None, None);
        assert!(space.find_resonances(0.0).is_empty());
    }

    fn arb_space() -> impl Strategy<Value = Space> {
        let node = (-10.0f64..10.0, prop::collection::vec(-5.0f64..5.0, 0..5), 0i64..3);
        prop::collection::vec(node, 0..8).prop_map(|nodes| {
            let mut space = Space::new(Topology::Flat);
            for (center, neighbors, layer) in nodes {
                space.add_node(layer, center, neighbors, None, None);
            }
            space
        })
    }

    proptest! {
        #[test]
        fn pairs_are_unique_and_ordered(space in arb_space()) {
            let found = space.find_resonances(0.0);
            let n = space.node_count();
            prop_assert_eq!(found.len(), n * n.saturating_sub(1) / 2);
            for r in &found {
                prop_assert!(r.a < r.b);
                prop_assert!((0.0..=1.0).contains(&r.similarity));
            }
        }

        #[test]
        fn raising_threshold_never_adds_pairs(
            space in arb_space(),
            low in 0.0f64..1.0,
            bump in 0.0f64..1.0,
        ) {
            let loose = space.find_resonances(low);
            let strict = space.find_resonances(low + bump);
            prop_assert!(strict.len() <= loose.len());
            for r in &strict {
                prop_assert!(loose.iter().any(|l| l.a == r.a && l.b == r.b));
            }
        }

        #[test]
        fn similarity_is_symmetric(space in arb_space()) {
            let nodes: Vec<&Node> = space.nodes().collect();
            let weights = ResonanceWeights::default();
            for a in &nodes {
                for b in &nodes {
                    prop_assert_eq!(similarity(a, b, weights), similarity(b, a, weights));
                }
            }
        }
    }
}

//! Sigma Field simulation runner
//!
//! Builds a small layered space, diffuses it and reports resonances.
//!
//! Usage:
//!   sigma-sim [steps] [threshold]   (steps capped at 20)
//!
//! Environment:
//!   SIGMA_CONVERGENCE_THRESHOLD, SIGMA_MAX_ITERATIONS,
//!   SIGMA_RESONANCE_CENTER_WEIGHT, SIGMA_RESONANCE_PATTERN_WEIGHT
//!   RUST_LOG  Log filter (default: sigma_sim=info,sigma_field=info)

use serde::Serialize;
use sigma_field::{
    AggregationMode, ConvergenceCriteria, EngineConfig, Resonance, Space, SpaceSummary, Topology,
};
use std::env;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Upper bound on requested steps. Each step doubles every neighborhood.
const MAX_STEPS: u32 = 20;

/// Everything the runner prints, as one JSON document.
#[derive(Debug, Serialize)]
struct Report {
    config: EngineConfig,
    stepped: Vec<f64>,
    converged: Vec<f64>,
    resonances: Vec<Resonance>,
    summary: SpaceSummary,
    fingerprint: String,
}

/// Three layers: a reference layer, a near copy of it, and an unrelated one.
fn seed_space(config: EngineConfig) -> Space {
    let mut space = Space::with_config(Topology::Torus, config);

    space.add_node(0, 5.0, vec![1.0, 2.0, 3.0, 4.0], None, None);
    space.add_node(0, 2.0, vec![2.0, 2.0, 2.0], Some(AggregationMode::Harmonic), None);
    space.add_node(0, 1.0, vec![0.5, 1.5], Some(AggregationMode::Median), Some(vec![1.0, 2.0]));

    space.add_node(1, 5.0, vec![1.0, 2.0, 3.0, 4.0], None, None);
    space.add_node(1, 2.1, vec![2.0, 2.1, 1.9], Some(AggregationMode::Harmonic), None);

    space.add_node(2, -3.0, vec![0.2, 0.9, 0.4], Some(AggregationMode::Entropy), None);
    space.add_node(2, 0.5, vec![3.0, 4.0], Some(AggregationMode::minkowski()), None);

    space
}

/// Parse the step count argument, clamping it to [`MAX_STEPS`].
fn parse_steps(arg: Option<&str>) -> u32 {
    let steps = arg.and_then(|s| s.parse().ok()).unwrap_or(3);
    if steps > MAX_STEPS {
        tracing::warn!(requested = steps, max = MAX_STEPS, "Step count capped");
        return MAX_STEPS;
    }
    steps
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sigma_sim=info,sigma_field=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = env::args().collect();

    let steps = parse_steps(args.get(1).map(String::as_str));
    let threshold: f64 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(0.8);

    let config = EngineConfig::from_env();
    config.validate()?;
    tracing::info!(?config, steps, threshold, "Starting simulation");

    let mut space = seed_space(config.clone());
    space.name_layer(0, "reference")?;
    space.name_layer(1, "echo")?;
    space.name_layer(2, "noise")?;

    // The echo layer sits out the fixed-step phase.
    space.freeze_layer(1)?;
    let stepped = space.diffuse(ConvergenceCriteria::Steps(steps), None, None);
    space.thaw_layer(1)?;
    tracing::info!(nodes = stepped.len(), "Fixed-step phase complete");

    let converged = space.diffuse(ConvergenceCriteria::Converged, Some(1), None);
    tracing::info!(nodes = converged.len(), "Convergence phase complete");

    let resonances = space.find_resonances(threshold);
    for r in &resonances {
        tracing::info!(a = %r.a, b = %r.b, similarity = r.similarity, "Resonance");
    }

    let summary = space.sigma_space();
    for node in space.nodes() {
        let will = node.sigma_will();
        tracing::debug!(
            node = %node.coord(),
            momentum = %node.momentum(),
            tendency = %will.tendency,
            strength = will.strength,
            "Node state"
        );
    }

    let report = Report {
        config,
        stepped,
        converged,
        resonances,
        summary,
        fingerprint: space.fingerprint(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}

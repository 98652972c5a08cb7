use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::f64::consts::PI;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::info;
use valuation_core::stats::floor_percentile;
use valuation_core::{merge_assumptions, AssumptionOverlay, EngineConfig, ModelAssumptions, Valuator};

use crate::parameters::Parameter;

/// Sampling distribution for one parameter. Omitted fields are derived from
/// the parameter's base value; explicit values (including zero spread) are used as given.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Distribution {
    /// Defaults: mean = base, std_dev = 10% of base
    Normal {
        mean: Option<f64>,
        std_dev: Option<f64>,
    },
    /// Defaults: base ± 20%
    Uniform {
        min: Option<f64>,
        max: Option<f64>,
    },
}

impl Distribution {
    pub fn sample<R: Rng + ?Sized>(&self, base_value: f64, rng: &mut R) -> f64 {
        match *self {
            Distribution::Normal { mean, std_dev } => {
                let mean = mean.unwrap_or(base_value);
                let std_dev = std_dev.unwrap_or(base_value * 0.1);
                // gen() is in [0, 1); flip it so ln never sees 0
                let u1 = 1.0 - rng.gen::<f64>();
                let u2 = rng.gen::<f64>();
                mean + box_muller(u1, u2) * std_dev
            }
            Distribution::Uniform { min, max } => {
                let min = min.unwrap_or(base_value * 0.8);
                let max = max.unwrap_or(base_value * 1.2);
                min + rng.gen::<f64>() * (max - min)
            }
        }
    }
}

/// Standard normal draw from two uniforms, `u1` in (0, 1].
pub fn box_muller(u1: f64, u2: f64) -> f64 {
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloParameter {
    pub parameter: Parameter,
    pub distribution: Distribution,
}

/// Terminal growth, revenue growth and operating margin, each normal around its base.
pub fn default_monte_carlo_parameters() -> Vec<MonteCarloParameter> {
    [
        Parameter::TerminalGrowthRate,
        Parameter::RevenueGrowth,
        Parameter::OperatingMargin,
    ]
    .into_iter()
    .map(|parameter| MonteCarloParameter {
        parameter,
        distribution: Distribution::Normal { mean: None, std_dev: None },
    })
    .collect()
}

#[derive(Debug, Clone)]
pub struct MonteCarloConfig {
    pub iterations: usize,
    /// Draw `i` uses `seed + i`, so results do not depend on thread scheduling
    pub seed: Option<u64>,
    pub deadline: Option<Duration>,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            iterations: 1000,
            seed: None,
            deadline: None,
        }
    }
}

impl From<&EngineConfig> for MonteCarloConfig {
    fn from(config: &EngineConfig) -> Self {
        Self {
            iterations: config.monte_carlo_iterations,
            seed: config.monte_carlo_seed,
            deadline: config.deadline(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Percentiles {
    pub p10: f64,
    pub p25: f64,
    pub p75: f64,
    pub p90: f64,
}

/// Fraction of completed draws above the current price (x1.0, x1.1, x1.2).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpsideProbabilities {
    pub above_current: f64,
    pub above_10_percent: f64,
    pub above_20_percent: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloStatistics {
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub percentiles: Percentiles,
    pub probability: UpsideProbabilities,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloResult {
    /// Completed draws, ascending
    pub results: Vec<f64>,
    pub requested_iterations: usize,
    pub completed_iterations: usize,
    /// The deadline stopped sampling early
    pub truncated: bool,
    pub current_price: f64,
    pub statistics: MonteCarloStatistics,
}

/// Summary statistics over ascending `sorted` prices. Empty input is all zeros.
pub fn calculate_statistics(sorted: &[f64], current_price: f64) -> MonteCarloStatistics {
    if sorted.is_empty() {
        return MonteCarloStatistics::default();
    }
    let n = sorted.len() as f64;
    let mean = sorted.iter().mean();
    let variance = sorted.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    let share_above = |threshold: f64| sorted.iter().filter(|&&x| x > threshold).count() as f64 / n;

    MonteCarloStatistics {
        mean,
        median: sorted[sorted.len() / 2],
        std_dev: variance.sqrt(),
        percentiles: Percentiles {
            p10: floor_percentile(sorted, 0.1),
            p25: floor_percentile(sorted, 0.25),
            p75: floor_percentile(sorted, 0.75),
            p90: floor_percentile(sorted, 0.9),
        },
        probability: UpsideProbabilities {
            above_current: share_above(current_price),
            above_10_percent: share_above(current_price * 1.1),
            above_20_percent: share_above(current_price * 1.2),
        },
    }
}

/// Sample every parameter independently per draw and value the result.
///
/// Draws that fail or give a non-finite price are dropped and do not count
/// toward `completed_iterations`. Draws not started before the deadline are
/// skipped and mark the result truncated.
pub fn run_monte_carlo<V: Valuator + ?Sized>(
    valuator: &V,
    base: &ModelAssumptions,
    parameters: &[MonteCarloParameter],
    config: &MonteCarloConfig,
) -> MonteCarloResult {
    let started = Instant::now();
    let truncated = AtomicBool::new(false);
    let base_values: Vec<f64> = parameters.iter().map(|p| p.parameter.base_value(base)).collect();

    let mut results: Vec<f64> = (0..config.iterations)
        .into_par_iter()
        .filter_map(|i| {
            if config.deadline.is_some_and(|d| started.elapsed() >= d) {
                truncated.store(true, Ordering::Relaxed);
                return None;
            }
            let mut rng = match config.seed {
                Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(i as u64)),
                None => StdRng::from_entropy(),
            };
            let overlay = parameters
                .iter()
                .zip(&base_values)
                .fold(AssumptionOverlay::default(), |acc, (p, &base_value)| {
                    let value = p.distribution.sample(base_value, &mut rng);
                    acc.combine(p.parameter.overlay(base, value))
                });
            valuator
                .valuate(&merge_assumptions(base, &overlay))
                .ok()
                .map(|v| v.value_per_share)
                .filter(|price| price.is_finite())
        })
        .collect();

    results.sort_by(|a, b| a.total_cmp(b));
    let current_price = valuator.current_price();
    let statistics = calculate_statistics(&results, current_price);
    let truncated = truncated.load(Ordering::Relaxed);

    info!(
        requested = config.iterations,
        completed = results.len(),
        truncated,
        mean = statistics.mean,
        "monte carlo complete"
    );

    MonteCarloResult {
        requested_iterations: config.iterations,
        completed_iterations: results.len(),
        truncated,
        current_price,
        statistics,
        results,
    }
}

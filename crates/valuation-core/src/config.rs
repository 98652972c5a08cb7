use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::ValuationError;

/// Run-time knobs for the batch analyses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub monte_carlo_iterations: usize,  // 1000
    pub monte_carlo_seed: Option<u64>,  // None = entropy
    pub solver_tolerance: f64,          // $0.01
    pub solver_max_iterations: usize,   // 100
    pub deadline_ms: Option<u64>,       // None = no deadline
    pub tornado_variation: f64,         // 0.20
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            monte_carlo_iterations: 1000,
            monte_carlo_seed: None,
            solver_tolerance: 0.01,
            solver_max_iterations: 100,
            deadline_ms: None,
            tornado_variation: 0.2,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Result<Self, ValuationError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ValuationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Ok(Self {
            monte_carlo_iterations: parse_or(&lookup, "DCF_MC_ITERATIONS", defaults.monte_carlo_iterations)?,
            monte_carlo_seed: parse_optional(&lookup, "DCF_MC_SEED")?,
            solver_tolerance: parse_or(&lookup, "DCF_SOLVER_TOLERANCE", defaults.solver_tolerance)?,
            solver_max_iterations: parse_or(&lookup, "DCF_SOLVER_MAX_ITERATIONS", defaults.solver_max_iterations)?,
            deadline_ms: parse_optional(&lookup, "DCF_DEADLINE_MS")?,
            tornado_variation: parse_or(&lookup, "DCF_TORNADO_VARIATION", defaults.tornado_variation)?,
        })
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_ms.map(Duration::from_millis)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ValuationError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    Ok(parse_optional(lookup, key)?.unwrap_or(default))
}

fn parse_optional<F, T>(lookup: &F, key: &str) -> Result<Option<T>, ValuationError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ValuationError::ConfigError(format!("{key} has unparsable value '{raw}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_unset_keys_use_defaults() {
        let config = EngineConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, EngineConfig::default());
        assert!(config.deadline().is_none());
    }

    #[test]
    fn test_overrides_are_parsed() {
        let config = EngineConfig::from_lookup(lookup_from(&[
            ("DCF_MC_ITERATIONS", "250"),
            ("DCF_MC_SEED", "42"),
            ("DCF_DEADLINE_MS", "1500"),
        ]))
        .unwrap();
        assert_eq!(config.monte_carlo_iterations, 250);
        assert_eq!(config.monte_carlo_seed, Some(42));
        assert_eq!(config.deadline(), Some(Duration::from_millis(1500)));
        assert_eq!(config.solver_max_iterations, 100);
    }

    #[test]
    fn test_bad_value_is_config_error() {
        let err = EngineConfig::from_lookup(lookup_from(&[("DCF_SOLVER_TOLERANCE", "abc")])).unwrap_err();
        assert!(matches!(err, ValuationError::ConfigError(_)));
    }
}

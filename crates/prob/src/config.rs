//! Inference settings, loadable from JSON.

use crate::elimination::EliminationHeuristic;
use crate::error::{ArgumentError, Result};
use crate::network::{Network, ValidatedNetwork};
use crate::PROB_TOLERANCE;
use serde::{Deserialize, Serialize};

/// Settings shared by the exact and sampling engines.
///
/// Missing JSON fields take their defaults:
///
/// ```rust
/// use bayes_prob::{EliminationHeuristic, InferenceConfig};
///
/// let config = InferenceConfig::from_json(r#"{
///     "elimination": "min_degree",
///     "sampling": { "seed": 7, "workers": 4 }
/// }"#).unwrap();
///
/// assert_eq!(config.elimination, EliminationHeuristic::MinDegree);
/// assert_eq!(config.sampling.workers, 4);
/// assert_eq!(config.sampling.draw_limit_factor, 1000);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Tolerance for "sums to 1" checks.
    pub tolerance: f64,
    pub elimination: EliminationHeuristic,
    pub sampling: SamplingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    pub seed: u64,
    /// Chunks for parallel forward sampling.
    pub workers: usize,
    /// `max_draws = target * draw_limit_factor` for accepted-count budgets.
    pub draw_limit_factor: usize,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            tolerance: PROB_TOLERANCE,
            elimination: EliminationHeuristic::default(),
            sampling: SamplingConfig::default(),
        }
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            workers: 1,
            draw_limit_factor: 1000,
        }
    }
}

impl InferenceConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| ArgumentError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ArgumentError::InvalidConfig(e.to_string()).into())
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(ArgumentError::InvalidConfig(format!(
                "tolerance must be positive and finite, got {}",
                self.tolerance
            ))
            .into());
        }
        if self.sampling.workers == 0 {
            return Err(ArgumentError::InvalidConfig("workers must be at least 1".into()).into());
        }
        if self.sampling.draw_limit_factor == 0 {
            return Err(
                ArgumentError::InvalidConfig("draw_limit_factor must be at least 1".into()).into(),
            );
        }
        Ok(())
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_elimination(mut self, heuristic: EliminationHeuristic) -> Self {
        self.elimination = heuristic;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.sampling.seed = seed;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.sampling.workers = workers;
        self
    }

    pub fn with_draw_limit_factor(mut self, factor: usize) -> Self {
        self.sampling.draw_limit_factor = factor;
        self
    }

    /// Validate a network using this configuration's tolerance.
    pub fn validate_network(&self, network: Network) -> Result<ValidatedNetwork> {
        network.validate_with_tolerance(self.tolerance)
    }
}

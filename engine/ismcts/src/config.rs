//! Search configuration parameters.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when a configuration cannot produce a valid policy.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("iteration budget must be positive")]
    ZeroIterations,

    #[error("exploration constant must be finite and non-negative, got {0}")]
    BadExploration(f64),

    #[error("nu must be positive and finite, got {0}")]
    BadNu(f64),

    #[error("gamma must be finite and non-negative, got {0}")]
    BadGamma(f64),

    #[error("nu = {nu} cannot keep arm probabilities non-negative with {arms} arms")]
    NuTooSmall { nu: f64, arms: usize },
}

/// Which bandit policy drives node selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    /// UCB1/LCB1 confidence bound (Cowling et al.).
    #[default]
    ConfidenceBound,
    /// Contextual bandit with online ridge regression.
    Contextual,
}

/// Configuration for a search run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Number of search iterations per decision.
    pub iterations: u32,

    /// Which bandit policy selects among children.
    pub policy: PolicyKind,

    /// Exploration constant `k` of the confidence bound.
    /// 0.75 follows Cowling et al. (2012).
    pub exploration: f64,

    /// Ridge regularization scale of the contextual bandit. Defaults to the
    /// branching factor at the root when unset.
    pub nu: Option<f64>,

    /// Softmax sharpness of the contextual bandit's selection distribution.
    /// Defaults to `sqrt(2 K iter / sqrt(iter))` when unset.
    pub gamma: Option<f64>,

    /// Optional cap on how deep selection descends before expanding.
    pub max_select_depth: Option<u32>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            iterations: 1000,
            policy: PolicyKind::ConfidenceBound,
            exploration: 0.75,
            nu: None,
            gamma: None,
            max_select_depth: None,
        }
    }
}

impl SearchConfig {
    /// Create a fast config for testing.
    pub fn for_testing() -> Self {
        Self {
            iterations: 200,
            ..Self::default()
        }
    }

    /// Builder pattern: set the iteration budget.
    pub fn with_iterations(mut self, n: u32) -> Self {
        self.iterations = n;
        self
    }

    /// Builder pattern: set the selection policy.
    pub fn with_policy(mut self, policy: PolicyKind) -> Self {
        self.policy = policy;
        self
    }

    /// Builder pattern: set the exploration constant.
    pub fn with_exploration(mut self, k: f64) -> Self {
        self.exploration = k;
        self
    }

    /// Builder pattern: set the contextual bandit tunables.
    pub fn with_contextual(mut self, nu: f64, gamma: f64) -> Self {
        self.policy = PolicyKind::Contextual;
        self.nu = Some(nu);
        self.gamma = Some(gamma);
        self
    }

    /// Builder pattern: cap the selection depth.
    pub fn with_max_select_depth(mut self, depth: u32) -> Self {
        self.max_select_depth = Some(depth);
        self
    }

    /// Check the shared tunables. Policy constructors run their own
    /// additional checks against the root branching factor.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.iterations == 0 {
            return Err(ConfigError::ZeroIterations);
        }
        if !self.exploration.is_finite() || self.exploration < 0.0 {
            return Err(ConfigError::BadExploration(self.exploration));
        }
        if let Some(nu) = self.nu {
            if !nu.is_finite() || nu <= 0.0 {
                return Err(ConfigError::BadNu(nu));
            }
        }
        if let Some(gamma) = self.gamma {
            if !gamma.is_finite() || gamma < 0.0 {
                return Err(ConfigError::BadGamma(gamma));
            }
        }
        Ok(())
    }
}

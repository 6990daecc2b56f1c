//! Session configuration.
//!
//! A [ModelConfig] is handed to a [GraphicalModel](crate::graph::GraphicalModel)
//! on construction and is visible to every generator during evaluation.
//!
//! # Example
//! ```
//! use phylogen::config::{EmptyGroupPolicy, ModelConfig};
//!
//! let config = ModelConfig::default()
//!     .with_seed(777)
//!     .with_empty_group_policy(EmptyGroupPolicy::Reject)
//!     .with_equilibrium_branch_length(50.0);
//! assert_eq!(config.seed(), Some(777));
//! ```

/// Branch length used to approximate the stationary distribution of a rate matrix.
pub const DEFAULT_EQUILIBRIUM_BRANCH_LENGTH: f64 = 100.0;

/// Tolerance for rows of `P(100)` to agree before a warning is logged.
pub const DEFAULT_STATIONARITY_TOLERANCE: f64 = 1e-6;

/// Tolerance for probability vectors to sum to one.
pub const DEFAULT_PROBABILITY_TOLERANCE: f64 = 1e-6;

/// How a subsample group whose size rounds down to zero is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptyGroupPolicy {
    /// An empty group contributes no taxa.
    #[default]
    Allow,
    /// An empty group is an invalid argument.
    Reject,
}

// =#========================================================================#=
// MODEL CONFIG
// =#========================================================================#=
/// Configuration of a model session, built with chainable `with_*` methods.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    seed: Option<u64>,
    empty_group_policy: EmptyGroupPolicy,
    equilibrium_branch_length: f64,
    stationarity_tolerance: f64,
    probability_tolerance: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig {
            seed: None,
            empty_group_policy: EmptyGroupPolicy::default(),
            equilibrium_branch_length: DEFAULT_EQUILIBRIUM_BRANCH_LENGTH,
            stationarity_tolerance: DEFAULT_STATIONARITY_TOLERANCE,
            probability_tolerance: DEFAULT_PROBABILITY_TOLERANCE,
        }
    }
}

impl ModelConfig {
    /// Seeds the session's random source. Without a seed it is seeded from entropy.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Sets how zero-sized subsample groups are handled.
    pub fn with_empty_group_policy(mut self, policy: EmptyGroupPolicy) -> Self {
        self.empty_group_policy = policy;
        self
    }

    /// Sets the branch length at which `P(t)` is taken as the stationary distribution.
    ///
    /// # Panics
    /// Panics if `length` is not positive.
    pub fn with_equilibrium_branch_length(mut self, length: f64) -> Self {
        assert!(length > 0.0, "equilibrium branch length must be positive");
        self.equilibrium_branch_length = length;
        self
    }

    /// Sets the tolerance for rows of the equilibrium matrix to agree.
    pub fn with_stationarity_tolerance(mut self, tolerance: f64) -> Self {
        self.stationarity_tolerance = tolerance;
        self
    }

    /// Sets the tolerance for probability vectors to sum to one.
    pub fn with_probability_tolerance(mut self, tolerance: f64) -> Self {
        self.probability_tolerance = tolerance;
        self
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn empty_group_policy(&self) -> EmptyGroupPolicy {
        self.empty_group_policy
    }

    pub fn equilibrium_branch_length(&self) -> f64 {
        self.equilibrium_branch_length
    }

    pub fn stationarity_tolerance(&self) -> f64 {
        self.stationarity_tolerance
    }

    pub fn probability_tolerance(&self) -> f64 {
        self.probability_tolerance
    }
}

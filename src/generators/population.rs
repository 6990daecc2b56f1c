//! Effective population size functions for the coalescent.
//!
//! A [PopulationFunction] gives the population size `θ(t)` at time `t` before
//! the present, its intensity `∫₀ᵗ 1/θ(s) ds` and the inverse of the intensity.
//! Coalescent waiting times are drawn on the intensity scale and mapped back
//! with the inverse.

use crate::error::{ModelError, Result};
use crate::graph::{Arguments, DeterministicFunction, ParamSpec, Payload, PayloadKind};
use std::fmt;
use std::sync::Arc;

/// Population size as a function of time before the present.
pub trait PopulationFunction: fmt::Debug + Send + Sync {
    /// Short name for display.
    fn name(&self) -> &'static str;

    /// Population size at time `t`.
    fn theta(&self, t: f64) -> f64;

    /// Integral of `1/θ` from 0 to `t`.
    fn intensity(&self, t: f64) -> f64;

    /// Time `t` at which the intensity reaches `x`.
    fn inverse_intensity(&self, x: f64) -> f64;

    /// Whether [PopulationFunction::inverse_intensity] is exact rather than numerical.
    fn is_analytical(&self) -> bool {
        true
    }

    /// Indicator of the selected model if this function is a selection proxy.
    fn selection_indicator(&self) -> Option<usize> {
        None
    }
}

// =#========================================================================#=
// CONSTANT
// =#========================================================================#=
/// Constant population size `θ`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantPopulation {
    theta: f64,
}

impl ConstantPopulation {
    /// # Errors
    /// Fails unless `theta` is positive and finite.
    pub fn new(theta: f64) -> Result<Self> {
        if !(theta.is_finite() && theta > 0.0) {
            return Err(ModelError::invalid_argument(format!("theta must be positive, got {}", theta)));
        }
        Ok(ConstantPopulation { theta })
    }
}

impl PopulationFunction for ConstantPopulation {
    fn name(&self) -> &'static str {
        "constant"
    }

    fn theta(&self, _t: f64) -> f64 {
        self.theta
    }

    fn intensity(&self, t: f64) -> f64 {
        t / self.theta
    }

    fn inverse_intensity(&self, x: f64) -> f64 {
        x * self.theta
    }
}

// =#========================================================================#=
// EXPONENTIAL
// =#========================================================================#=
/// Exponentially growing population: `θ(t) = θ₀ e^(-r t)`, where `θ₀` is the
/// present-day size and `r` the growth rate (shrinking back in time for `r > 0`).
///
/// # Example
/// ```
/// use phylogen::generators::population::{ExponentialPopulation, PopulationFunction};
///
/// let f = ExponentialPopulation::new(10.0, 0.5).unwrap();
/// let t = f.inverse_intensity(f.intensity(2.0));
/// assert!((t - 2.0).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExponentialPopulation {
    theta0: f64,
    growth_rate: f64,
}

impl ExponentialPopulation {
    /// # Errors
    /// Fails unless `theta0` is positive and `growth_rate` finite.
    pub fn new(theta0: f64, growth_rate: f64) -> Result<Self> {
        if !(theta0.is_finite() && theta0 > 0.0) {
            return Err(ModelError::invalid_argument(format!("theta0 must be positive, got {}", theta0)));
        }
        if !growth_rate.is_finite() {
            return Err(ModelError::invalid_argument("growth rate must be finite"));
        }
        Ok(ExponentialPopulation { theta0, growth_rate })
    }

    pub fn growth_rate(&self) -> f64 {
        self.growth_rate
    }
}

impl PopulationFunction for ExponentialPopulation {
    fn name(&self) -> &'static str {
        "exponential"
    }

    fn theta(&self, t: f64) -> f64 {
        self.theta0 * (-self.growth_rate * t).exp()
    }

    fn intensity(&self, t: f64) -> f64 {
        let r = self.growth_rate;
        if r == 0.0 {
            t / self.theta0
        } else {
            (r * t).exp_m1() / (self.theta0 * r)
        }
    }

    fn inverse_intensity(&self, x: f64) -> f64 {
        let r = self.growth_rate;
        if r == 0.0 {
            x * self.theta0
        } else {
            // Infinite for declining populations whose total intensity is below x
            let arg = x * self.theta0 * r;
            if arg <= -1.0 { f64::INFINITY } else { arg.ln_1p() / r }
        }
    }
}

// =#========================================================================#=
// STOCHASTIC VARIABLE SELECTION PROXY
// =#========================================================================#=
/// Population function selected from a list by an indicator.
///
/// Every query delegates to the selected model; the proxy only adds the
/// indicator, so that selection is observable downstream.
#[derive(Debug, Clone)]
pub struct SvsPopulationFunction {
    indicator: usize,
    model: Arc<dyn PopulationFunction>,
}

impl SvsPopulationFunction {
    /// Selects `models[indicator]`.
    ///
    /// # Errors
    /// Returns [ModelError::InvalidArgument] if `indicator` is outside `[0, models.len())`.
    pub fn select(indicator: i64, models: &[Arc<dyn PopulationFunction>]) -> Result<Self> {
        usize::try_from(indicator)
            .ok()
            .and_then(|i| models.get(i).map(|model| (i, model)))
            .map(|(indicator, model)| SvsPopulationFunction {
                indicator,
                model: Arc::clone(model),
            })
            .ok_or_else(|| {
                ModelError::invalid_argument(format!(
                    "Invalid modelIndex value {}: must be in [0, {})",
                    indicator,
                    models.len()
                ))
            })
    }

    pub fn indicator(&self) -> usize {
        self.indicator
    }

    /// The selected model.
    pub fn model(&self) -> &Arc<dyn PopulationFunction> {
        &self.model
    }
}

impl PopulationFunction for SvsPopulationFunction {
    fn name(&self) -> &'static str {
        self.model.name()
    }

    fn theta(&self, t: f64) -> f64 {
        self.model.theta(t)
    }

    fn intensity(&self, t: f64) -> f64 {
        self.model.intensity(t)
    }

    fn inverse_intensity(&self, x: f64) -> f64 {
        self.model.inverse_intensity(x)
    }

    fn is_analytical(&self) -> bool {
        self.model.is_analytical()
    }

    fn selection_indicator(&self) -> Option<usize> {
        Some(self.indicator)
    }
}

// =#========================================================================#=
// DETERMINISTIC FUNCTIONS
// =#========================================================================#=
/// Selects one population function from `models` by `indicator`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SvsFunction;

const SVS_PARAMS: &[ParamSpec] = &[
    ParamSpec::required("indicator", PayloadKind::Integer, "index of the selected model"),
    ParamSpec::required("models", PayloadKind::PopulationFunctionArray, "candidate population functions"),
];

impl DeterministicFunction for SvsFunction {
    fn name(&self) -> &'static str {
        "svs"
    }

    fn params(&self) -> &'static [ParamSpec] {
        SVS_PARAMS
    }

    fn apply(&self, args: &Arguments<'_>) -> Result<Payload> {
        let indicator = args.integer("indicator")?;
        let models = args.population_functions("models")?;
        let selected: Arc<dyn PopulationFunction> = Arc::new(SvsPopulationFunction::select(indicator, models)?);
        Ok(Payload::PopulationFunction(selected))
    }
}

/// Builds a [ConstantPopulation] from `theta`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstantPopFunc;

const CONSTANT_PARAMS: &[ParamSpec] = &[ParamSpec::required("theta", PayloadKind::Number, "population size")];

impl DeterministicFunction for ConstantPopFunc {
    fn name(&self) -> &'static str {
        "constantPopFunc"
    }

    fn params(&self) -> &'static [ParamSpec] {
        CONSTANT_PARAMS
    }

    fn apply(&self, args: &Arguments<'_>) -> Result<Payload> {
        let function: Arc<dyn PopulationFunction> = Arc::new(ConstantPopulation::new(args.number("theta")?)?);
        Ok(Payload::PopulationFunction(function))
    }
}

/// Builds an [ExponentialPopulation] from `theta0` and `growthRate`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExponentialPopFunc;

const EXPONENTIAL_PARAMS: &[ParamSpec] = &[
    ParamSpec::required("theta0", PayloadKind::Number, "present-day population size"),
    ParamSpec::required("growthRate", PayloadKind::Number, "exponential growth rate"),
];

impl DeterministicFunction for ExponentialPopFunc {
    fn name(&self) -> &'static str {
        "exponentialPopFunc"
    }

    fn params(&self) -> &'static [ParamSpec] {
        EXPONENTIAL_PARAMS
    }

    fn apply(&self, args: &Arguments<'_>) -> Result<Payload> {
        let function: Arc<dyn PopulationFunction> = Arc::new(ExponentialPopulation::new(
            args.number("theta0")?,
            args.number("growthRate")?,
        )?);
        Ok(Payload::PopulationFunction(function))
    }
}

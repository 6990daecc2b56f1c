//! Generators: the function and distribution nodes of a graphical model.
//!
//! A generator declares an ordered parameter schema ([ParamSpec]) and turns
//! bound input payloads into an output payload:
//! - [DeterministicFunction]s compute it from their inputs alone,
//! - [GenerativeDistribution]s draw it using the session's [RandomSource].

use crate::config::ModelConfig;
use crate::error::{ModelError, Result};
use crate::generators::population::PopulationFunction;
use crate::graph::payload::{Payload, PayloadKind};
use crate::random::RandomSource;
use crate::tree::TimeTree;
use std::fmt;
use std::sync::Arc;

// =#========================================================================#=
// PARAMETER SCHEMA
// =#========================================================================#=
/// One entry of a generator's parameter schema.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: PayloadKind,
    pub optional: bool,
    pub description: &'static str,
}

impl ParamSpec {
    pub const fn required(name: &'static str, kind: PayloadKind, description: &'static str) -> Self {
        ParamSpec {
            name,
            kind,
            optional: false,
            description,
        }
    }

    pub const fn optional(name: &'static str, kind: PayloadKind, description: &'static str) -> Self {
        ParamSpec {
            name,
            kind,
            optional: true,
            description,
        }
    }
}

// =#========================================================================#=
// ARGUMENTS
// =#========================================================================#=
/// Input payloads of one evaluation, in schema order, with typed accessors.
///
/// Accessors for required parameters fail with [ModelError::MissingParameter]
/// when unbound and with [ModelError::TypeMismatch] on a payload of the wrong kind.
#[derive(Debug, Clone)]
pub struct Arguments<'a> {
    generator: &'static str,
    entries: Vec<(&'static str, &'a Payload)>,
}

impl<'a> Arguments<'a> {
    /// Creates arguments for the generator named `generator`.
    pub fn new(generator: &'static str, entries: Vec<(&'static str, &'a Payload)>) -> Self {
        Arguments { generator, entries }
    }

    /// Returns the payload bound to `name`, if any.
    pub fn get(&self, name: &str) -> Option<&'a Payload> {
        self.entries.iter().find(|(n, _)| *n == name).map(|(_, p)| *p)
    }

    /// Returns the bound names in order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(n, _)| *n)
    }

    fn require(&self, name: &str) -> Result<&'a Payload> {
        self.get(name).ok_or_else(|| ModelError::MissingParameter {
            generator: self.generator.to_string(),
            name: name.to_string(),
        })
    }

    fn mismatch(name: &str, expected: PayloadKind, found: &Payload) -> ModelError {
        ModelError::type_mismatch(name, expected.to_string(), found.kind().to_string())
    }

    pub fn number(&self, name: &str) -> Result<f64> {
        let payload = self.require(name)?;
        payload
            .as_number()
            .ok_or_else(|| Self::mismatch(name, PayloadKind::Number, payload))
    }

    pub fn opt_number(&self, name: &str) -> Result<Option<f64>> {
        self.get(name).map(|_| self.number(name)).transpose()
    }

    pub fn integer(&self, name: &str) -> Result<i64> {
        let payload = self.require(name)?;
        payload
            .as_integer()
            .ok_or_else(|| Self::mismatch(name, PayloadKind::Integer, payload))
    }

    pub fn opt_integer(&self, name: &str) -> Result<Option<i64>> {
        self.get(name).map(|_| self.integer(name)).transpose()
    }

    /// Number array; integer arrays are widened.
    pub fn number_array(&self, name: &str) -> Result<Vec<f64>> {
        match self.require(name)? {
            Payload::NumberArray(v) => Ok(v.clone()),
            Payload::IntegerArray(v) => Ok(v.iter().map(|&x| x as f64).collect()),
            other => Err(Self::mismatch(name, PayloadKind::NumberArray, other)),
        }
    }

    pub fn opt_number_array(&self, name: &str) -> Result<Option<Vec<f64>>> {
        self.get(name).map(|_| self.number_array(name)).transpose()
    }

    pub fn number_matrix(&self, name: &str) -> Result<&'a [Vec<f64>]> {
        match self.require(name)? {
            Payload::NumberMatrix(m) => Ok(m),
            other => Err(Self::mismatch(name, PayloadKind::NumberMatrix, other)),
        }
    }

    pub fn text_array(&self, name: &str) -> Result<&'a [String]> {
        match self.require(name)? {
            Payload::TextArray(v) => Ok(v),
            other => Err(Self::mismatch(name, PayloadKind::TextArray, other)),
        }
    }

    pub fn opt_text_array(&self, name: &str) -> Result<Option<&'a [String]>> {
        self.get(name).map(|_| self.text_array(name)).transpose()
    }

    pub fn text_matrix(&self, name: &str) -> Result<&'a [Vec<String>]> {
        match self.require(name)? {
            Payload::TextMatrix(m) => Ok(m),
            other => Err(Self::mismatch(name, PayloadKind::TextMatrix, other)),
        }
    }

    pub fn text(&self, name: &str) -> Result<&'a str> {
        match self.require(name)? {
            Payload::Text(v) => Ok(v),
            other => Err(Self::mismatch(name, PayloadKind::Text, other)),
        }
    }

    pub fn tree(&self, name: &str) -> Result<&'a TimeTree> {
        let payload = self.require(name)?;
        payload
            .as_tree()
            .ok_or_else(|| Self::mismatch(name, PayloadKind::Tree, payload))
    }

    pub fn population_function(&self, name: &str) -> Result<&'a Arc<dyn PopulationFunction>> {
        let payload = self.require(name)?;
        payload
            .as_population_function()
            .ok_or_else(|| Self::mismatch(name, PayloadKind::PopulationFunction, payload))
    }

    pub fn opt_population_function(&self, name: &str) -> Result<Option<&'a Arc<dyn PopulationFunction>>> {
        self.get(name).map(|_| self.population_function(name)).transpose()
    }

    pub fn population_functions(&self, name: &str) -> Result<&'a [Arc<dyn PopulationFunction>]> {
        match self.require(name)? {
            Payload::PopulationFunctionArray(v) => Ok(v),
            other => Err(Self::mismatch(name, PayloadKind::PopulationFunctionArray, other)),
        }
    }
}

// =#========================================================================#=
// GENERATOR TRAITS
// =#========================================================================#=
/// Session state visible to a stochastic evaluation.
pub struct SampleContext<'a> {
    pub rng: &'a mut RandomSource,
    pub config: &'a ModelConfig,
}

/// A generator whose output is a pure function of its inputs.
pub trait DeterministicFunction: fmt::Debug {
    /// Name used in the model and in error messages.
    fn name(&self) -> &'static str;

    /// Parameter schema in declaration order.
    fn params(&self) -> &'static [ParamSpec];

    /// Computes the output; identical inputs give identical outputs.
    fn apply(&self, args: &Arguments<'_>) -> Result<Payload>;
}

/// A generator that draws its output from a distribution.
pub trait GenerativeDistribution: fmt::Debug {
    /// Name used in the model and in error messages.
    fn name(&self) -> &'static str;

    /// Parameter schema in declaration order.
    fn params(&self) -> &'static [ParamSpec];

    /// Draws a fresh output using `ctx.rng`.
    fn sample(&self, args: &Arguments<'_>, ctx: &mut SampleContext<'_>) -> Result<Payload>;
}

/// A deterministic or stochastic generator.
#[derive(Debug)]
pub enum Generator {
    Deterministic(Box<dyn DeterministicFunction>),
    Stochastic(Box<dyn GenerativeDistribution>),
}

impl Generator {
    pub fn name(&self) -> &'static str {
        match self {
            Generator::Deterministic(f) => f.name(),
            Generator::Stochastic(d) => d.name(),
        }
    }

    pub fn params(&self) -> &'static [ParamSpec] {
        match self {
            Generator::Deterministic(f) => f.params(),
            Generator::Stochastic(d) => d.params(),
        }
    }

    pub fn is_stochastic(&self) -> bool {
        matches!(self, Generator::Stochastic(_))
    }

    /// Returns the schema entry for `name`.
    pub fn param_spec(&self, name: &str) -> Option<&'static ParamSpec> {
        self.params().iter().find(|spec| spec.name == name)
    }

    /// Applies the function or draws from the distribution.
    pub fn evaluate(&self, args: &Arguments<'_>, ctx: &mut SampleContext<'_>) -> Result<Payload> {
        match self {
            Generator::Deterministic(f) => f.apply(args),
            Generator::Stochastic(d) => d.sample(args, ctx),
        }
    }
}

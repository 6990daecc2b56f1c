//! The graphical model session: arena of values and generators.

use crate::config::ModelConfig;
use crate::error::{ModelError, Result};
use crate::graph::generator::{
    Arguments, DeterministicFunction, GenerativeDistribution, Generator, ParamSpec, SampleContext,
};
use crate::graph::payload::Payload;
use crate::graph::value::{GeneratorId, Value, ValueId};
use crate::random::RandomSource;
use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};
use tracing::{debug, instrument, trace};

// =#========================================================================#=
// GENERATOR NODE
// =#========================================================================#=
/// A generator placed in the model together with its bound inputs and its output.
#[derive(Debug)]
pub struct GeneratorNode {
    generator: Generator,
    /// Bound parameters in schema order
    params: Vec<(&'static str, ValueId)>,
    output: ValueId,
}

impl GeneratorNode {
    pub fn generator(&self) -> &Generator {
        &self.generator
    }

    pub fn name(&self) -> &'static str {
        self.generator.name()
    }

    pub fn is_stochastic(&self) -> bool {
        self.generator.is_stochastic()
    }

    /// Returns the bound parameters as ordered name/value pairs.
    pub fn params(&self) -> &[(&'static str, ValueId)] {
        &self.params
    }

    /// Returns the value bound to `name`.
    pub fn param(&self, name: &str) -> Option<ValueId> {
        self.params.iter().find(|(n, _)| *n == name).map(|(_, v)| *v)
    }

    pub fn output(&self) -> ValueId {
        self.output
    }
}

// =#========================================================================#=
// GRAPHICAL MODEL
// =#========================================================================#=
/// A caller-owned model session.
///
/// Owns all values and generators (arena pattern, addressed by [ValueId] and
/// [GeneratorId]), the dictionary of named values, the random source and the
/// [ModelConfig]. Generators are evaluated when added; [Sampler](crate::graph::Sampler)
/// re-evaluates them in dependency order.
///
/// # Example
/// ```
/// use phylogen::config::ModelConfig;
/// use phylogen::generators::{Coalescent, LogNormal};
/// use phylogen::graph::GraphicalModel;
///
/// let mut model = GraphicalModel::with_config(ModelConfig::default().with_seed(777));
/// let meanlog = model.constant(None, 3.0);
/// let sdlog = model.constant(None, 1.0);
/// let theta = model
///     .sample(Some("Θ"), LogNormal, &[("meanlog", meanlog), ("sdlog", sdlog)])
///     .unwrap();
/// let n = model.constant(None, 16);
/// let psi = model
///     .sample(Some("ψ"), Coalescent, &[("theta", theta), ("n", n)])
///     .unwrap();
///
/// assert_eq!(model.dictionary().len(), 2);
/// assert_eq!(model.value_count(), 5);
/// assert_eq!(model.payload(psi).as_tree().unwrap().leaf_count(), 16);
/// ```
#[derive(Debug)]
pub struct GraphicalModel {
    values: Vec<Value>,
    generators: Vec<GeneratorNode>,
    dictionary: BTreeMap<String, ValueId>,
    rng: RandomSource,
    config: ModelConfig,
}

impl Default for GraphicalModel {
    fn default() -> Self {
        GraphicalModel::with_config(ModelConfig::default())
    }
}

// ============================================================================
// New, Construction (pub)
// ============================================================================
impl GraphicalModel {
    /// Creates an empty model with default configuration and an entropy-seeded random source.
    pub fn new() -> Self {
        GraphicalModel::default()
    }

    /// Creates an empty model; the random source is seeded from `config` if it has a seed.
    pub fn with_config(config: ModelConfig) -> Self {
        let rng = match config.seed() {
            Some(seed) => RandomSource::seeded(seed),
            None => RandomSource::from_entropy(),
        };
        GraphicalModel {
            values: Vec::new(),
            generators: Vec::new(),
            dictionary: BTreeMap::new(),
            rng,
            config,
        }
    }

    /// Adds a constant value, registered under `id` if given.
    pub fn constant(&mut self, id: Option<&str>, payload: impl Into<Payload>) -> ValueId {
        let value_id = ValueId(self.values.len());
        self.values.push(Value::new(id.map(str::to_string), payload.into(), None));
        self.register(id, value_id);
        value_id
    }

    /// Adds a deterministic function, evaluates it and returns its output value.
    ///
    /// # Errors
    /// Fails on unknown, duplicate, missing or mistyped parameters, and with
    /// whatever the function's `apply` reports.
    pub fn apply<F>(&mut self, id: Option<&str>, function: F, args: &[(&str, ValueId)]) -> Result<ValueId>
    where
        F: DeterministicFunction + 'static,
    {
        self.add_generator(id, Generator::Deterministic(Box::new(function)), args)
    }

    /// Adds a generative distribution, samples it and returns the random variable.
    ///
    /// # Errors
    /// Fails on unknown, duplicate, missing or mistyped parameters, and with
    /// whatever the distribution's `sample` reports.
    pub fn sample<D>(&mut self, id: Option<&str>, distribution: D, args: &[(&str, ValueId)]) -> Result<ValueId>
    where
        D: GenerativeDistribution + 'static,
    {
        self.add_generator(id, Generator::Stochastic(Box::new(distribution)), args)
    }

    /// Adds any generator, evaluates it and returns its output value.
    #[instrument(level = "trace", skip(self, generator, args), fields(generator = generator.name()))]
    pub fn add_generator(&mut self, id: Option<&str>, generator: Generator, args: &[(&str, ValueId)]) -> Result<ValueId> {
        let params = self.bind(&generator, args)?;
        let payload = evaluate_generator(&generator, &params, &self.values, &mut self.rng, &self.config)?;

        let generator_id = GeneratorId(self.generators.len());
        let output = ValueId(self.values.len());
        self.values.push(Value::new(id.map(str::to_string), payload, Some(generator_id)));
        for &(_, input) in &params {
            self.values[input.0].add_output(generator_id);
        }
        self.generators.push(GeneratorNode {
            generator,
            params,
            output,
        });
        self.register(id, output);

        trace!(%generator_id, %output, "added generator");
        Ok(output)
    }

    fn register(&mut self, id: Option<&str>, value: ValueId) {
        if let Some(id) = id {
            if let Some(previous) = self.dictionary.insert(id.to_string(), value) {
                debug!(id, %previous, %value, "name rebound to new value");
            }
        }
    }

    /// Validates `args` against the schema and returns them in schema order.
    fn bind(&self, generator: &Generator, args: &[(&str, ValueId)]) -> Result<Vec<(&'static str, ValueId)>> {
        let schema = generator.params();
        let mut bound: Vec<Option<ValueId>> = vec![None; schema.len()];

        for &(name, value) in args {
            let position = schema.iter().position(|spec| spec.name == name).ok_or_else(|| {
                ModelError::UnknownParameter {
                    generator: generator.name().to_string(),
                    name: name.to_string(),
                }
            })?;
            if bound[position].is_some() {
                return Err(ModelError::DuplicateParameter {
                    generator: generator.name().to_string(),
                    name: name.to_string(),
                });
            }
            self.check_kind(&schema[position], value)?;
            bound[position] = Some(value);
        }

        let mut params = Vec::with_capacity(args.len());
        for (spec, value) in schema.iter().zip(bound) {
            match value {
                Some(value) => params.push((spec.name, value)),
                None if spec.optional => {}
                None => {
                    return Err(ModelError::MissingParameter {
                        generator: generator.name().to_string(),
                        name: spec.name.to_string(),
                    });
                }
            }
        }
        Ok(params)
    }

    fn check_kind(&self, spec: &ParamSpec, value: ValueId) -> Result<()> {
        let found = self.checked_value(value)?.value().kind();
        if spec.kind.accepts(found) {
            Ok(())
        } else {
            Err(ModelError::type_mismatch(spec.name, spec.kind.to_string(), found.to_string()))
        }
    }

    fn checked_value(&self, value: ValueId) -> Result<&Value> {
        self.values
            .get(value.0)
            .ok_or_else(|| ModelError::UnknownValue(value.to_string()))
    }
}

// ============================================================================
// Getters / Accessors (pub)
// ============================================================================
impl GraphicalModel {
    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn rng_mut(&mut self) -> &mut RandomSource {
        &mut self.rng
    }

    /// Restarts the session's random stream from `seed`.
    pub fn set_seed(&mut self, seed: u64) {
        self.rng.set_seed(seed);
    }

    /// Returns the value with the given handle.
    ///
    /// # Panics
    /// Panics if `id` does not belong to this model.
    pub fn value(&self, id: ValueId) -> &Value {
        &self.values[id.0]
    }

    /// Returns the payload of a value.
    ///
    /// # Panics
    /// Panics if `id` does not belong to this model.
    pub fn payload(&self, id: ValueId) -> &Payload {
        self.values[id.0].value()
    }

    /// Replaces the payload of a value, e.g. a constant the model depends on.
    /// Dependent values are updated on the next resample.
    pub fn set_value(&mut self, id: ValueId, payload: impl Into<Payload>) -> Result<()> {
        self.checked_value(id)?;
        self.values[id.0].set_payload(payload.into());
        Ok(())
    }

    /// Returns the handle registered under `name`.
    pub fn get(&self, name: &str) -> Option<ValueId> {
        self.dictionary.get(name).copied()
    }

    /// Like [get](Self::get), but fails with [ModelError::UnknownValue].
    pub fn lookup(&self, name: &str) -> Result<ValueId> {
        self.get(name).ok_or_else(|| ModelError::UnknownValue(name.to_string()))
    }

    /// Named values.
    pub fn dictionary(&self) -> &BTreeMap<String, ValueId> {
        &self.dictionary
    }

    /// All values, named and anonymous.
    pub fn values(&self) -> impl Iterator<Item = (ValueId, &Value)> + '_ {
        self.values.iter().enumerate().map(|(i, v)| (ValueId(i), v))
    }

    pub fn value_count(&self) -> usize {
        self.values.len()
    }

    pub fn generator(&self, id: GeneratorId) -> &GeneratorNode {
        &self.generators[id.0]
    }

    pub fn generators(&self) -> impl Iterator<Item = (GeneratorId, &GeneratorNode)> + '_ {
        self.generators.iter().enumerate().map(|(i, g)| (GeneratorId(i), g))
    }

    pub fn generator_count(&self) -> usize {
        self.generators.len()
    }

    /// Returns the ordered parameter bindings of a generator.
    pub fn get_params(&self, id: GeneratorId) -> &[(&'static str, ValueId)] {
        self.generators[id.0].params()
    }

    /// Values no generator consumes.
    pub fn sinks(&self) -> Vec<ValueId> {
        self.values()
            .filter(|(_, v)| !v.has_outputs())
            .map(|(id, _)| id)
            .collect()
    }

    /// Returns whether a value is random: drawn by a distribution, or computed from random inputs.
    pub fn is_random(&self, id: ValueId) -> bool {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(generator) = self.values[current.0].generator() {
                let node = &self.generators[generator.0];
                if node.is_stochastic() {
                    return true;
                }
                stack.extend(node.params().iter().map(|(_, v)| *v));
            }
        }
        false
    }
}

// ============================================================================
// Graph edits and evaluation (pub)
// ============================================================================
impl GraphicalModel {
    /// Rebinds parameter `name` of a generator to `value`.
    ///
    /// The output sets of the previously bound value and of `value` are
    /// updated. The generator is not re-evaluated; see [Sampler](crate::graph::Sampler).
    ///
    /// # Errors
    /// Fails if the parameter is not declared, the payload kind does not
    /// match, or the binding would create a cycle.
    pub fn set_param(&mut self, generator: GeneratorId, name: &str, value: ValueId) -> Result<()> {
        let node = &self.generators[generator.0];
        let spec = node.generator().param_spec(name).ok_or_else(|| ModelError::UnknownParameter {
            generator: node.name().to_string(),
            name: name.to_string(),
        })?;
        self.check_kind(spec, value)?;
        if self.depends_on(value, generator) {
            return Err(ModelError::CyclicDependency { name: name.to_string() });
        }

        let spec_name = spec.name;
        let previous = self.generators[generator.0].param(name);
        if let Some(previous) = previous {
            self.values[previous.0].remove_output(generator);
        }
        self.values[value.0].add_output(generator);

        let node = &mut self.generators[generator.0];
        match node.params.iter_mut().find(|(n, _)| *n == spec_name) {
            Some(entry) => entry.1 = value,
            None => {
                node.params.push((spec_name, value));
                let order: Vec<&'static str> = node.generator.params().iter().map(|s| s.name).collect();
                node.params
                    .sort_by_key(|(n, _)| order.iter().position(|o| o == n).unwrap_or(usize::MAX));
            }
        }
        debug!(%generator, name, %value, "rebound parameter");
        Ok(())
    }

    /// Returns whether `value` is (transitively) computed from the output of `generator`.
    fn depends_on(&self, value: ValueId, generator: GeneratorId) -> bool {
        let mut stack = vec![value];
        let mut seen = vec![false; self.values.len()];
        while let Some(current) = stack.pop() {
            if std::mem::replace(&mut seen[current.0], true) {
                continue;
            }
            if let Some(producer) = self.values[current.0].generator() {
                if producer == generator {
                    return true;
                }
                stack.extend(self.generators[producer.0].params().iter().map(|(_, v)| *v));
            }
        }
        false
    }

    /// Generators in dependency order: every generator after the producers of its inputs.
    /// Ties are broken by insertion order.
    pub fn topological_order(&self) -> Result<Vec<GeneratorId>> {
        let count = self.generators.len();
        let mut pending = vec![0usize; count];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); count];
        for (index, node) in self.generators.iter().enumerate() {
            for &(_, input) in node.params() {
                if let Some(producer) = self.values[input.0].generator() {
                    pending[index] += 1;
                    dependents[producer.0].push(index);
                }
            }
        }

        let mut ready: BinaryHeap<Reverse<usize>> =
            (0..count).filter(|&i| pending[i] == 0).map(Reverse).collect();
        let mut order = Vec::with_capacity(count);
        while let Some(Reverse(index)) = ready.pop() {
            order.push(GeneratorId(index));
            for &dependent in &dependents[index] {
                pending[dependent] -= 1;
                if pending[dependent] == 0 {
                    ready.push(Reverse(dependent));
                }
            }
        }

        if order.len() != count {
            return Err(ModelError::CyclicDependency {
                name: "model graph".to_string(),
            });
        }
        Ok(order)
    }

    /// Re-evaluates a single generator from the current payloads of its inputs,
    /// replacing the payload of its output value.
    pub fn evaluate(&mut self, id: GeneratorId) -> Result<()> {
        let node = &self.generators[id.0];
        let payload = evaluate_generator(&node.generator, &node.params, &self.values, &mut self.rng, &self.config)?;
        let output = node.output;
        self.values[output.0].set_payload(payload);
        Ok(())
    }
}

/// Runs `generator` on the payloads bound in `params`.
fn evaluate_generator(
    generator: &Generator,
    params: &[(&'static str, ValueId)],
    values: &[Value],
    rng: &mut RandomSource,
    config: &ModelConfig,
) -> Result<Payload> {
    let args = Arguments::new(
        generator.name(),
        params.iter().map(|&(name, v)| (name, values[v.0].value())).collect(),
    );
    let mut ctx = SampleContext { rng, config };
    generator.evaluate(&args, &mut ctx)
}

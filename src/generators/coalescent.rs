//! Kingman coalescent trees.

use crate::error::{ModelError, Result};
use crate::generators::population::{ConstantPopulation, PopulationFunction};
use crate::graph::{Arguments, GenerativeDistribution, ParamSpec, Payload, PayloadKind, SampleContext};
use crate::random::RandomSource;
use crate::tree::{NodeIndex, TimeTree};
use rand::Rng;
use rand_distr::Exp1;
use std::collections::HashSet;
use tracing::{debug, instrument};

/// Simulates a coalescent tree over `taxa` under `population`.
///
/// Leaves sit at age 0 with leaf indices in the order of `taxa`. While `k`
/// lineages remain, the next coalescence happens at the time where the
/// population intensity has grown by `E / (k (k - 1) / 2)` with `E ~ Exp(1)`;
/// for a constant size `θ` this is an exponential waiting time with rate
/// `k (k - 1) / (2 θ)`. Two lineages are then merged uniformly at random.
///
/// # Errors
/// Returns [ModelError::InvalidArgument] if `taxa` is empty or has duplicates,
/// or if a coalescence time is not finite.
///
/// # Example
/// ```
/// use phylogen::generators::coalescent::simulate_coalescent;
/// use phylogen::generators::population::ConstantPopulation;
/// use phylogen::random::RandomSource;
///
/// let taxa: Vec<String> = ["A", "B", "C"].iter().map(|s| s.to_string()).collect();
/// let population = ConstantPopulation::new(2.0).unwrap();
/// let tree = simulate_coalescent(&taxa, &population, &mut RandomSource::seeded(1)).unwrap();
/// assert_eq!(tree.leaf_count(), 3);
/// assert_eq!(tree.node_count(), 5);
/// assert!(tree.is_ultrametric());
/// ```
#[instrument(level = "trace", skip_all, fields(taxa = taxa.len(), population = population.name()))]
pub fn simulate_coalescent(
    taxa: &[String],
    population: &dyn PopulationFunction,
    rng: &mut RandomSource,
) -> Result<TimeTree> {
    if taxa.is_empty() {
        return Err(ModelError::invalid_argument("coalescent needs at least one taxon"));
    }
    let mut seen = HashSet::new();
    if let Some(duplicate) = taxa.iter().find(|t| !seen.insert(t.as_str())) {
        return Err(ModelError::invalid_argument(format!("duplicate taxon '{}'", duplicate)));
    }

    let mut tree = TimeTree::new();
    let mut active: Vec<NodeIndex> = taxa
        .iter()
        .enumerate()
        .map(|(i, id)| tree.add_indexed_leaf(id.as_str(), 0.0, i))
        .collect();

    let mut time = 0.0;
    while active.len() > 1 {
        let k = active.len() as f64;
        let pairs = k * (k - 1.0) / 2.0;
        let e: f64 = rng.sample(Exp1);

        let next = population.inverse_intensity(population.intensity(time) + e / pairs);
        if !next.is_finite() {
            return Err(ModelError::invalid_argument(format!(
                "coalescence time is not finite under the {} population function",
                population.name()
            )));
        }
        time = next.max(time);

        let first = active.swap_remove(rng.index(active.len()));
        let second = active.swap_remove(rng.index(active.len()));
        active.push(tree.add_internal(time, &[first, second]));
    }

    tree.set_root(active[0], false);
    debug!(leaves = taxa.len(), root_age = time, "simulated coalescent tree");
    Ok(tree)
}

/// Resolves leaf identifiers from `n` and/or `taxa`.
fn resolve_taxa(n: Option<i64>, taxa: Option<&[String]>) -> Result<Vec<String>> {
    match (n, taxa) {
        (Some(n), Some(taxa)) if usize::try_from(n).ok() != Some(taxa.len()) => Err(ModelError::invalid_argument(
            format!("n = {} does not match the {} taxa given", n, taxa.len()),
        )),
        (_, Some(taxa)) => Ok(taxa.to_vec()),
        (Some(n), None) => {
            let n = usize::try_from(n)
                .map_err(|_| ModelError::invalid_argument(format!("n must be positive, got {}", n)))?;
            Ok((0..n).map(|i| i.to_string()).collect())
        }
        (None, None) => Err(ModelError::invalid_argument("coalescent needs either n or taxa")),
    }
}

/// Coalescent tree distribution.
///
/// Parameters: exactly one of `theta` (constant population size) and
/// `popFunc`, plus `n` and/or `taxa`. Without `taxa`, leaves are named
/// `"0"` to `"n-1"`.
///
/// # Example
/// ```
/// use phylogen::config::ModelConfig;
/// use phylogen::generators::Coalescent;
/// use phylogen::graph::GraphicalModel;
///
/// let mut model = GraphicalModel::with_config(ModelConfig::default().with_seed(5));
/// let theta = model.constant(None, 2.0);
/// let n = model.constant(None, 6);
/// let psi = model.sample(Some("psi"), Coalescent, &[("theta", theta), ("n", n)]).unwrap();
/// let tree = model.payload(psi).as_tree().unwrap();
/// assert_eq!(tree.leaf_count(), 6);
/// assert_eq!(tree.leaves()[0].id(), Some("0"));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Coalescent;

const COALESCENT_PARAMS: &[ParamSpec] = &[
    ParamSpec::optional("theta", PayloadKind::Number, "constant effective population size"),
    ParamSpec::optional("popFunc", PayloadKind::PopulationFunction, "population size through time"),
    ParamSpec::optional("n", PayloadKind::Integer, "number of taxa"),
    ParamSpec::optional("taxa", PayloadKind::TextArray, "taxon names"),
];

impl GenerativeDistribution for Coalescent {
    fn name(&self) -> &'static str {
        "Coalescent"
    }

    fn params(&self) -> &'static [ParamSpec] {
        COALESCENT_PARAMS
    }

    fn sample(&self, args: &Arguments<'_>, ctx: &mut SampleContext<'_>) -> Result<Payload> {
        let taxa = resolve_taxa(args.opt_integer("n")?, args.opt_text_array("taxa")?)?;

        let tree = match (args.opt_number("theta")?, args.opt_population_function("popFunc")?) {
            (Some(theta), None) => simulate_coalescent(&taxa, &ConstantPopulation::new(theta)?, ctx.rng)?,
            (None, Some(function)) => simulate_coalescent(&taxa, function.as_ref(), ctx.rng)?,
            _ => {
                return Err(ModelError::invalid_argument(
                    "coalescent needs exactly one of theta and popFunc",
                ));
            }
        };
        Ok(Payload::Tree(tree))
    }
}

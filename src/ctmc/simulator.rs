//! Sequence simulation down a time tree.

use crate::config::ModelConfig;
use crate::ctmc::alignment::Alignment;
use crate::ctmc::eigen::{EigenSystem, matrix_from_rows};
use crate::error::{ModelError, Result};
use crate::graph::{Arguments, GenerativeDistribution, ParamSpec, Payload, PayloadKind, SampleContext};
use crate::random::RandomSource;
use crate::tree::{NodeIndex, TimeTree};
use nalgebra::DMatrix;
use tracing::{debug, instrument, trace};

// =#========================================================================#=
// SIMULATION OPTIONS
// =#========================================================================#=
/// Optional inputs of [simulate], built with chainable `with_*` methods.
///
/// The number of sites comes from [CtmcOptions::with_length] or from the
/// length of the site rates; one of them is required and they must agree.
#[derive(Debug, Clone, PartialEq)]
pub struct CtmcOptions {
    clock_rate: f64,
    root_frequencies: Option<Vec<f64>>,
    site_rates: Option<Vec<f64>>,
    branch_rates: Option<Vec<f64>>,
    length: Option<usize>,
}

impl Default for CtmcOptions {
    fn default() -> Self {
        CtmcOptions {
            clock_rate: 1.0,
            root_frequencies: None,
            site_rates: None,
            branch_rates: None,
            length: None,
        }
    }
}

impl CtmcOptions {
    /// Global multiplier of all branch lengths (default 1).
    pub fn with_clock_rate(mut self, clock_rate: f64) -> Self {
        self.clock_rate = clock_rate;
        self
    }

    /// Root state distribution; defaults to the equilibrium distribution of `Q`.
    pub fn with_root_frequencies(mut self, frequencies: Vec<f64>) -> Self {
        self.root_frequencies = Some(frequencies);
        self
    }

    /// Per-site rate multipliers.
    pub fn with_site_rates(mut self, site_rates: Vec<f64>) -> Self {
        self.site_rates = Some(site_rates);
        self
    }

    /// Per-branch rate multipliers, indexed by the node index of the child.
    pub fn with_branch_rates(mut self, branch_rates: Vec<f64>) -> Self {
        self.branch_rates = Some(branch_rates);
        self
    }

    /// Number of sites.
    pub fn with_length(mut self, length: usize) -> Self {
        self.length = Some(length);
        self
    }

    /// Resolves the number of sites.
    fn site_count(&self) -> Result<usize> {
        match (self.length, &self.site_rates) {
            (Some(length), Some(rates)) if length != rates.len() => Err(ModelError::invalid_argument(format!(
                "sequence length {} does not match {} site rates",
                length,
                rates.len()
            ))),
            (Some(length), _) => Ok(length),
            (None, Some(rates)) => Ok(rates.len()),
            (None, None) => Err(ModelError::invalid_argument(
                "either a sequence length or site rates are required",
            )),
        }
    }

    fn validate(&self, tree: &TimeTree) -> Result<()> {
        if !self.clock_rate.is_finite() || self.clock_rate < 0.0 {
            return Err(ModelError::invalid_argument(format!(
                "clock rate must be non-negative, got {}",
                self.clock_rate
            )));
        }
        if let Some(rates) = &self.site_rates {
            if rates.iter().any(|r| !r.is_finite() || *r < 0.0) {
                return Err(ModelError::invalid_argument("site rates must be non-negative"));
            }
        }
        if let Some(rates) = &self.branch_rates {
            let branches = tree.node_count() - 1;
            if rates.len() < branches {
                return Err(ModelError::invalid_argument(format!(
                    "{} branch rates given for {} branches",
                    rates.len(),
                    branches
                )));
            }
            if rates.iter().any(|r| !r.is_finite() || *r < 0.0) {
                return Err(ModelError::invalid_argument("branch rates must be non-negative"));
            }
        }
        Ok(())
    }
}

// =#========================================================================#=
// SIMULATION
// =#========================================================================#=
/// Simulates an alignment by evolving states from the root down `tree` under
/// the rate matrix `q`.
///
/// For every site the root state is drawn from the root frequencies, then each
/// child's state is drawn from the row of `P(t)` selected by its parent's
/// state, where `t = siteRate * clockRate * (parentAge - childAge) * branchRate`.
/// Nodes are visited in pre-order. Row `i` of the alignment holds the leaf
/// with leaf index `i`.
///
/// Transition matrices are cached per node and recomputed only when the site
/// rate changes from one site to the next.
///
/// # Errors
/// - [ModelError::InvalidArgument] for an invalid rate matrix, mismatched
///   lengths, or root frequencies that are not a probability vector
/// - [ModelError::SingularMatrix] if `q` cannot be diagonalised
///
/// # Example
/// ```
/// use nalgebra::DMatrix;
/// use phylogen::config::ModelConfig;
/// use phylogen::ctmc::{CtmcOptions, simulate};
/// use phylogen::newick;
/// use phylogen::random::RandomSource;
///
/// let tree = newick::parse_str("((A:1,B:1):1,C:2);").unwrap();
/// let q = DMatrix::from_row_slice(2, 2, &[-1.0, 1.0, 1.0, -1.0]);
/// let mut rng = RandomSource::seeded(3);
/// let options = CtmcOptions::default().with_length(20);
/// let alignment = simulate(&tree, &q, &options, &mut rng, &ModelConfig::default()).unwrap();
/// assert_eq!(alignment.num_taxa(), 3);
/// assert_eq!(alignment.num_sites(), 20);
/// ```
#[instrument(level = "trace", skip_all, fields(states = q.nrows()))]
pub fn simulate(
    tree: &TimeTree,
    q: &DMatrix<f64>,
    options: &CtmcOptions,
    rng: &mut RandomSource,
    config: &ModelConfig,
) -> Result<Alignment> {
    if !tree.is_indexed() {
        return Err(ModelError::invalid_argument("tree must be rooted and indexed"));
    }
    let num_sites = options.site_count()?;
    options.validate(tree)?;

    let eigen = EigenSystem::decompose(q)?;
    let num_states = eigen.num_states();
    let tolerance = config.probability_tolerance();

    let root_frequencies = match &options.root_frequencies {
        Some(frequencies) => {
            check_probabilities(frequencies, num_states, tolerance)?;
            frequencies.clone()
        }
        None => eigen.equilibrium_frequencies(config.equilibrium_branch_length(), config.stationarity_tolerance()),
    };

    let mut alignment = Alignment::for_tree(tree, num_sites, num_states)?;
    let order: Vec<NodeIndex> = tree.pre_order_iter().map(|node| node.index()).collect();
    let mut states = vec![0usize; tree.node_count()];
    let mut cached_rate: Option<f64> = None;
    let mut matrices: Vec<Vec<Vec<f64>>> = Vec::new();

    for site in 0..num_sites {
        let site_rate = options.site_rates.as_ref().map_or(1.0, |rates| rates[site]);
        if cached_rate != Some(site_rate) {
            trace!(site, site_rate, "computing transition matrices");
            matrices = transition_matrices(tree, &eigen, options, site_rate, tolerance);
            cached_rate = Some(site_rate);
        }

        for &node in &order {
            let probabilities = match tree[node].parent() {
                None => &root_frequencies,
                Some(parent) => &matrices[node][states[parent]],
            };
            let state = draw_state(probabilities, rng.uniform(), tolerance)?;
            states[node] = state;
            if let Some(row) = tree[node].leaf_index() {
                alignment.set_state(row, site, state as u8);
            }
        }
    }

    debug!(
        taxa = alignment.num_taxa(),
        sites = num_sites,
        states = num_states,
        "simulated alignment"
    );
    Ok(alignment)
}

/// Computes the rows of `P(t)` for the branch above every non-root node.
fn transition_matrices(
    tree: &TimeTree,
    eigen: &EigenSystem,
    options: &CtmcOptions,
    site_rate: f64,
    tolerance: f64,
) -> Vec<Vec<Vec<f64>>> {
    tree.nodes()
        .iter()
        .map(|node| match node.parent() {
            None => Vec::new(),
            Some(_) => {
                let branch_rate = options.branch_rates.as_ref().map_or(1.0, |rates| rates[node.index()]);
                let length = site_rate * options.clock_rate * tree.branch_length(node.index()) * branch_rate;
                eigen.transition_rows(length, tolerance)
            }
        })
        .collect()
}

/// Draws a state from `probabilities` by cumulative inversion of the uniform `u`.
///
/// If rounding leaves `u` above the final cumulative sum, the last state with
/// positive probability is returned as long as the vector sums to 1 within
/// `tolerance`.
///
/// # Errors
/// Returns [ModelError::InvalidArgument] if no state was selected and the
/// probabilities do not sum to 1.
///
/// # Example
/// ```
/// use phylogen::ctmc::draw_state;
///
/// assert_eq!(draw_state(&[0.2, 0.3, 0.5], 0.1, 1e-6).unwrap(), 0);
/// assert_eq!(draw_state(&[0.2, 0.3, 0.5], 0.45, 1e-6).unwrap(), 1);
/// assert_eq!(draw_state(&[0.2, 0.3, 0.5], 0.99, 1e-6).unwrap(), 2);
/// assert!(draw_state(&[0.2, 0.3], 0.9, 1e-6).is_err());
/// ```
pub fn draw_state(probabilities: &[f64], u: f64, tolerance: f64) -> Result<usize> {
    let mut total = 0.0;
    for (state, &p) in probabilities.iter().enumerate() {
        total += p;
        if u < total {
            return Ok(state);
        }
    }

    if (total - 1.0).abs() <= tolerance {
        if let Some(state) = probabilities.iter().rposition(|&p| p > 0.0) {
            return Ok(state);
        }
    }
    Err(ModelError::invalid_argument(format!(
        "probabilities sum to {} instead of 1",
        total
    )))
}

/// Checks that `probabilities` has `len` non-negative entries summing to 1.
fn check_probabilities(probabilities: &[f64], len: usize, tolerance: f64) -> Result<()> {
    if probabilities.len() != len {
        return Err(ModelError::invalid_argument(format!(
            "{} root frequencies given for {} states",
            probabilities.len(),
            len
        )));
    }
    if probabilities.iter().any(|p| !p.is_finite() || *p < 0.0) {
        return Err(ModelError::invalid_argument("root frequencies must be non-negative"));
    }
    let sum: f64 = probabilities.iter().sum();
    if (sum - 1.0).abs() > tolerance {
        return Err(ModelError::invalid_argument(format!(
            "root frequencies sum to {} instead of 1",
            sum
        )));
    }
    Ok(())
}

// =#========================================================================#=
// GENERATIVE DISTRIBUTION
// =#========================================================================#=
/// Phylogenetic continuous-time Markov chain: an alignment evolved down a tree.
///
/// Parameters: `tree`, `mu` (clock rate), `freq` (root frequencies), `Q`,
/// `siteRates`, `branchRates` and `L` (number of sites); see [simulate].
#[derive(Debug, Clone, Copy, Default)]
pub struct PhyloCtmc;

const PHYLO_CTMC_PARAMS: &[ParamSpec] = &[
    ParamSpec::required("tree", PayloadKind::Tree, "time tree the sequences evolve along"),
    ParamSpec::optional("mu", PayloadKind::Number, "clock rate, default 1"),
    ParamSpec::optional("freq", PayloadKind::NumberArray, "root frequencies, default the equilibrium of Q"),
    ParamSpec::required("Q", PayloadKind::NumberMatrix, "instantaneous rate matrix"),
    ParamSpec::optional("siteRates", PayloadKind::NumberArray, "rate multiplier of each site"),
    ParamSpec::optional("branchRates", PayloadKind::NumberArray, "rate multiplier of each branch by node index"),
    ParamSpec::optional("L", PayloadKind::Integer, "number of sites"),
];

impl GenerativeDistribution for PhyloCtmc {
    fn name(&self) -> &'static str {
        "PhyloCTMC"
    }

    fn params(&self) -> &'static [ParamSpec] {
        PHYLO_CTMC_PARAMS
    }

    fn sample(&self, args: &Arguments<'_>, ctx: &mut SampleContext<'_>) -> Result<Payload> {
        let tree = args.tree("tree")?;
        let q = matrix_from_rows(args.number_matrix("Q")?)?;

        let mut options = CtmcOptions::default();
        if let Some(mu) = args.opt_number("mu")? {
            options = options.with_clock_rate(mu);
        }
        if let Some(freq) = args.opt_number_array("freq")? {
            options = options.with_root_frequencies(freq);
        }
        if let Some(rates) = args.opt_number_array("siteRates")? {
            options = options.with_site_rates(rates);
        }
        if let Some(rates) = args.opt_number_array("branchRates")? {
            options = options.with_branch_rates(rates);
        }
        if let Some(length) = args.opt_integer("L")? {
            let length = usize::try_from(length)
                .map_err(|_| ModelError::invalid_argument(format!("L must be non-negative, got {}", length)))?;
            options = options.with_length(length);
        }

        simulate(tree, &q, &options, ctx.rng, ctx.config).map(Payload::Alignment)
    }
}

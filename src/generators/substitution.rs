//! Nucleotide substitution models producing instantaneous rate matrices.
//!
//! States are ordered `A, C, G, T`. Every matrix is scaled so that the
//! expected number of substitutions per unit time, `-Σ πᵢ Qᵢᵢ`, equals the
//! optional `meanRate` (default 1).

use crate::error::{ModelError, Result};
use crate::graph::{Arguments, DeterministicFunction, ParamSpec, Payload, PayloadKind};

const NUM_NUCLEOTIDES: usize = 4;

/// Tolerance for base frequencies to sum to one.
const FREQUENCY_TOLERANCE: f64 = 1e-6;

/// Builds `Q` with `Qᵢⱼ = exchangeability(i, j) πⱼ` off the diagonal, rows
/// summing to zero, scaled to `mean_rate`.
///
/// # Errors
/// Fails if `mean_rate` is not positive or all rates are zero.
///
/// # Example
/// ```
/// use phylogen::generators::substitution::rate_matrix;
///
/// let q = rate_matrix(|_, _| 1.0, &[0.25; 4], 1.0).unwrap();
/// assert!((q[0][0] + 1.0).abs() < 1e-12);
/// assert!((q[0][1] - 1.0 / 3.0).abs() < 1e-12);
/// ```
pub fn rate_matrix<F>(exchangeability: F, frequencies: &[f64], mean_rate: f64) -> Result<Vec<Vec<f64>>>
where
    F: Fn(usize, usize) -> f64,
{
    if !(mean_rate.is_finite() && mean_rate > 0.0) {
        return Err(ModelError::invalid_argument(format!("meanRate must be positive, got {}", mean_rate)));
    }

    let n = frequencies.len();
    let mut q = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in 0..n {
            if i != j {
                q[i][j] = exchangeability(i.min(j), i.max(j)) * frequencies[j];
            }
        }
        q[i][i] = -q[i].iter().sum::<f64>();
    }

    let total: f64 = (0..n).map(|i| -frequencies[i] * q[i][i]).sum();
    if total <= 0.0 {
        return Err(ModelError::invalid_argument("substitution model has no positive rate"));
    }
    let scale = mean_rate / total;
    for row in &mut q {
        for x in row.iter_mut() {
            *x *= scale;
        }
    }
    Ok(q)
}

fn check_frequencies(frequencies: &[f64]) -> Result<()> {
    if frequencies.len() != NUM_NUCLEOTIDES {
        return Err(ModelError::invalid_argument(format!(
            "expected {} base frequencies, got {}",
            NUM_NUCLEOTIDES,
            frequencies.len()
        )));
    }
    if frequencies.iter().any(|f| !f.is_finite() || *f < 0.0) {
        return Err(ModelError::invalid_argument("base frequencies must be non-negative"));
    }
    let sum: f64 = frequencies.iter().sum();
    if (sum - 1.0).abs() > FREQUENCY_TOLERANCE {
        return Err(ModelError::invalid_argument(format!("base frequencies sum to {} instead of 1", sum)));
    }
    Ok(())
}

/// A <-> G and C <-> T.
fn is_transition(i: usize, j: usize) -> bool {
    (i, j) == (0, 2) || (i, j) == (1, 3)
}

// =#========================================================================#=
// MODELS
// =#========================================================================#=
/// Jukes-Cantor: equal rates and equal base frequencies.
#[derive(Debug, Clone, Copy, Default)]
pub struct JukesCantor;

const JC_PARAMS: &[ParamSpec] = &[ParamSpec::optional("meanRate", PayloadKind::Number, "total rate, default 1")];

impl DeterministicFunction for JukesCantor {
    fn name(&self) -> &'static str {
        "jukesCantor"
    }

    fn params(&self) -> &'static [ParamSpec] {
        JC_PARAMS
    }

    fn apply(&self, args: &Arguments<'_>) -> Result<Payload> {
        let mean_rate = args.opt_number("meanRate")?.unwrap_or(1.0);
        rate_matrix(|_, _| 1.0, &[0.25; NUM_NUCLEOTIDES], mean_rate).map(Payload::NumberMatrix)
    }
}

/// Hasegawa-Kishino-Yano: transition/transversion ratio `kappa` and base frequencies.
#[derive(Debug, Clone, Copy, Default)]
pub struct Hky;

const HKY_PARAMS: &[ParamSpec] = &[
    ParamSpec::required("kappa", PayloadKind::Number, "transition/transversion rate ratio"),
    ParamSpec::required("freq", PayloadKind::NumberArray, "base frequencies"),
    ParamSpec::optional("meanRate", PayloadKind::Number, "total rate, default 1"),
];

impl DeterministicFunction for Hky {
    fn name(&self) -> &'static str {
        "hky"
    }

    fn params(&self) -> &'static [ParamSpec] {
        HKY_PARAMS
    }

    fn apply(&self, args: &Arguments<'_>) -> Result<Payload> {
        let kappa = args.number("kappa")?;
        let freq = args.number_array("freq")?;
        let mean_rate = args.opt_number("meanRate")?.unwrap_or(1.0);
        if !(kappa.is_finite() && kappa > 0.0) {
            return Err(ModelError::invalid_argument(format!("kappa must be positive, got {}", kappa)));
        }
        check_frequencies(&freq)?;

        let exchangeability = |i, j| if is_transition(i, j) { kappa } else { 1.0 };
        rate_matrix(exchangeability, &freq, mean_rate).map(Payload::NumberMatrix)
    }
}

/// General time-reversible model.
///
/// `rates` are the six exchangeabilities in the order AC, AG, AT, CG, CT, GT.
#[derive(Debug, Clone, Copy, Default)]
pub struct Gtr;

const GTR_PARAMS: &[ParamSpec] = &[
    ParamSpec::required("rates", PayloadKind::NumberArray, "exchangeabilities AC, AG, AT, CG, CT, GT"),
    ParamSpec::required("freq", PayloadKind::NumberArray, "base frequencies"),
    ParamSpec::optional("meanRate", PayloadKind::Number, "total rate, default 1"),
];

impl DeterministicFunction for Gtr {
    fn name(&self) -> &'static str {
        "gtr"
    }

    fn params(&self) -> &'static [ParamSpec] {
        GTR_PARAMS
    }

    fn apply(&self, args: &Arguments<'_>) -> Result<Payload> {
        let rates = args.number_array("rates")?;
        let freq = args.number_array("freq")?;
        let mean_rate = args.opt_number("meanRate")?.unwrap_or(1.0);
        if rates.len() != 6 || rates.iter().any(|r| !r.is_finite() || *r < 0.0) {
            return Err(ModelError::invalid_argument(
                "gtr needs six non-negative exchangeabilities",
            ));
        }
        check_frequencies(&freq)?;

        // Upper triangle (i < j) in row-major order
        let exchangeability = |i: usize, j: usize| {
            let offset = match i {
                0 => 0,
                1 => 3,
                _ => 5,
            };
            rates[offset + j - i - 1]
        };
        rate_matrix(exchangeability, &freq, mean_rate).map(Payload::NumberMatrix)
    }
}

//! Scalar distributions.

use crate::error::{ModelError, Result};
use crate::graph::{Arguments, GenerativeDistribution, ParamSpec, Payload, PayloadKind, SampleContext};
use rand::Rng;

/// Log-normal distribution on `(offset, ∞)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNormal;

const LOG_NORMAL_PARAMS: &[ParamSpec] = &[
    ParamSpec::required("meanlog", PayloadKind::Number, "mean in log space"),
    ParamSpec::required("sdlog", PayloadKind::Number, "standard deviation in log space"),
    ParamSpec::optional("offset", PayloadKind::Number, "shift added to every draw, default 0"),
];

impl GenerativeDistribution for LogNormal {
    fn name(&self) -> &'static str {
        "LogNormal"
    }

    fn params(&self) -> &'static [ParamSpec] {
        LOG_NORMAL_PARAMS
    }

    fn sample(&self, args: &Arguments<'_>, ctx: &mut SampleContext<'_>) -> Result<Payload> {
        let meanlog = args.number("meanlog")?;
        let sdlog = args.number("sdlog")?;
        let offset = args.opt_number("offset")?.unwrap_or(0.0);
        if !meanlog.is_finite() || !offset.is_finite() {
            return Err(ModelError::invalid_argument(format!(
                "LogNormal(meanlog={}, offset={}): parameters must be finite",
                meanlog, offset
            )));
        }

        let distribution = rand_distr::LogNormal::new(meanlog, sdlog).map_err(|e| {
            ModelError::invalid_argument(format!("LogNormal(meanlog={}, sdlog={}): {}", meanlog, sdlog, e))
        })?;
        Ok(Payload::Number(ctx.rng.sample(distribution) + offset))
    }
}

/// Normal distribution.
#[derive(Debug, Clone, Copy, Default)]
pub struct Normal;

const NORMAL_PARAMS: &[ParamSpec] = &[
    ParamSpec::required("mean", PayloadKind::Number, "mean"),
    ParamSpec::required("sd", PayloadKind::Number, "standard deviation"),
];

impl GenerativeDistribution for Normal {
    fn name(&self) -> &'static str {
        "Normal"
    }

    fn params(&self) -> &'static [ParamSpec] {
        NORMAL_PARAMS
    }

    fn sample(&self, args: &Arguments<'_>, ctx: &mut SampleContext<'_>) -> Result<Payload> {
        let mean = args.number("mean")?;
        let sd = args.number("sd")?;
        if !mean.is_finite() || !sd.is_finite() {
            return Err(ModelError::invalid_argument(format!("Normal(mean={}, sd={}): parameters must be finite", mean, sd)));
        }

        let distribution = rand_distr::Normal::new(mean, sd)
            .map_err(|e| ModelError::invalid_argument(format!("Normal(mean={}, sd={}): {}", mean, sd, e)))?;
        Ok(Payload::Number(ctx.rng.sample(distribution)))
    }
}

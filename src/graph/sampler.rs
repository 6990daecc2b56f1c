//! Resampling of a bound model.

use crate::error::Result;
use crate::graph::model::GraphicalModel;
use tracing::debug;

/// Re-runs all generators of a [GraphicalModel] in dependency order.
///
/// Every distribution draws exactly once per pass and every function is
/// re-applied, each from the freshly computed outputs upstream. Names, handles
/// and topology stay the same; only payloads change. Payloads set with
/// [GraphicalModel::set_value] propagate to everything depending on them.
///
/// # Example
/// ```
/// use phylogen::config::ModelConfig;
/// use phylogen::generators::LogNormal;
/// use phylogen::graph::{GraphicalModel, Sampler};
///
/// let mut model = GraphicalModel::with_config(ModelConfig::default().with_seed(1));
/// let meanlog = model.constant(None, 0.0);
/// let sdlog = model.constant(None, 1.0);
/// let x = model.sample(Some("x"), LogNormal, &[("meanlog", meanlog), ("sdlog", sdlog)]).unwrap();
///
/// let mut sampler = Sampler::new(&mut model);
/// sampler.sample(Some(5)).unwrap();
/// let first = sampler.model().payload(x).clone();
/// sampler.sample(Some(5)).unwrap();
/// assert_eq!(sampler.model().payload(x), &first);
/// ```
pub struct Sampler<'m> {
    model: &'m mut GraphicalModel,
}

impl<'m> Sampler<'m> {
    pub fn new(model: &'m mut GraphicalModel) -> Self {
        Sampler { model }
    }

    pub fn model(&self) -> &GraphicalModel {
        &*self.model
    }

    /// Performs one resampling pass. With `seed`, the random stream is
    /// restarted first; otherwise it continues.
    pub fn sample(&mut self, seed: Option<u64>) -> Result<()> {
        if let Some(seed) = seed {
            self.model.set_seed(seed);
        }

        let order = self.model.topological_order()?;
        for &generator in &order {
            self.model.evaluate(generator)?;
        }
        debug!(generators = order.len(), ?seed, "resampled model");
        Ok(())
    }

    /// Performs `replicates` passes and hands the model to `on_replicate`
    /// after each. `seed` restarts the stream before the first pass only.
    pub fn sample_replicates<F>(&mut self, replicates: usize, seed: Option<u64>, mut on_replicate: F) -> Result<()>
    where
        F: FnMut(usize, &GraphicalModel) -> Result<()>,
    {
        for replicate in 0..replicates {
            self.sample(if replicate == 0 { seed } else { None })?;
            on_replicate(replicate, &*self.model)?;
        }
        Ok(())
    }
}

impl GraphicalModel {
    /// Performs one resampling pass; see [Sampler::sample].
    pub fn resample(&mut self, seed: Option<u64>) -> Result<()> {
        Sampler::new(self).sample(seed)
    }
}

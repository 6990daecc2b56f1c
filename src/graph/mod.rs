//! Generative graphical models.
//!
//! A [GraphicalModel] is a DAG of [Value]s and generators. Each generator has
//! an ordered parameter mapping to input values and produces one output value:
//! - [DeterministicFunction]: output is a pure function of the inputs
//! - [GenerativeDistribution]: output is drawn from the session's random source
//!
//! Values and generators live in arenas of the model and are addressed by
//! [ValueId] and [GeneratorId]; payloads are the tagged sum type [Payload].
//! [Sampler] resamples a bound model, and [EngineTranslator] is the hook for
//! exporting it to an external inference engine.

mod generator;
mod model;
mod payload;
mod sampler;
mod translate;
mod value;

pub use generator::{
    Arguments, DeterministicFunction, GenerativeDistribution, Generator, ParamSpec, SampleContext,
};
pub use model::{GeneratorNode, GraphicalModel};
pub use payload::{Payload, PayloadKind};
pub use sampler::Sampler;
pub use translate::EngineTranslator;
pub use value::{GeneratorId, Value, ValueId};

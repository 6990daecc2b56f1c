//! Phylogen is a library to build and sample generative graphical models
//! for Bayesian phylogenetics.
//!
//! A model is a DAG of values and generators. Distributions draw random
//! variables, deterministic functions transform them, and resampling re-runs
//! the whole model in dependency order from a seedable random source.
//! Core functionality provided:
//! - Graphical models: [GraphicalModel](crate::graph::GraphicalModel) with a
//!   name dictionary, parameter rebinding, sinks, topological resampling and
//!   an [EngineTranslator](crate::graph::EngineTranslator) export hook.
//! - Time trees: [TimeTree](crate::tree::TimeTree) with canonical node
//!   indexing, pruning to a taxon subset, clade grafting and tree metrics.
//! - Newick: writing with or without single-child nodes, and parsing back.
//! - CTMC simulation: alignments evolved down a time tree under a rate
//!   matrix, see [crate::ctmc].
//! - Generators: coalescent, log-normal and normal distributions, population
//!   functions, substitution models, random subsampling and clade
//!   substitution, see [crate::generators].
//! - Trees and nodes use the arena pattern: nodes refer to each other by
//!   index only. The same holds for values and generators of a model.
//!
//! Limitations:
//! - No scripting language front-end; models are built in Rust
//! - Rate matrices with complex eigenvalues are rejected
//!
//! # Usage patterns
//! 1. Build a model with
//!    [GraphicalModel::constant](crate::graph::GraphicalModel::constant),
//!    [apply](crate::graph::GraphicalModel::apply) and
//!    [sample](crate::graph::GraphicalModel::sample), then call
//!    [resample](crate::graph::GraphicalModel::resample) for fresh draws.
//! 2. Use the building blocks directly, e.g.
//!    [simulate_coalescent](crate::generators::coalescent::simulate_coalescent)
//!    and [simulate](crate::ctmc::simulate).
//!
//! ## Example
//! ```
//! use phylogen::config::ModelConfig;
//! use phylogen::generators::{Coalescent, JukesCantor, PhyloCtmc};
//! use phylogen::graph::GraphicalModel;
//!
//! let mut model = GraphicalModel::with_config(ModelConfig::default().with_seed(42));
//! let theta = model.constant(Some("theta"), 5.0);
//! let n = model.constant(None, 8);
//! let psi = model.sample(Some("psi"), Coalescent, &[("theta", theta), ("n", n)]).unwrap();
//! let q = model.apply(Some("Q"), JukesCantor, &[]).unwrap();
//! let length = model.constant(None, 50);
//! let d = model
//!     .sample(Some("D"), PhyloCtmc, &[("tree", psi), ("Q", q), ("L", length)])
//!     .unwrap();
//!
//! let alignment = model.payload(d).as_alignment().unwrap();
//! assert_eq!(alignment.num_taxa(), 8);
//! assert_eq!(alignment.num_sites(), 50);
//!
//! model.resample(Some(43)).unwrap();
//! assert_eq!(model.sinks(), vec![d]);
//! ```

pub mod config;
pub mod ctmc;
pub mod error;
pub mod generators;
pub mod graph;
pub mod newick;
pub mod random;
pub mod tree;

pub use error::{ModelError, Result};

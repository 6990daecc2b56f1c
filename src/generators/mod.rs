//! Generators shipped with the crate.
//!
//! Distributions ([GenerativeDistribution](crate::graph::GenerativeDistribution)):
//! - [LogNormal], [Normal]
//! - [Coalescent]: Kingman coalescent under a constant size or a [PopulationFunction]
//! - [SubsampledTree]: random subsets of taxon groups
//! - [PhyloCtmc]: alignments evolved down a tree
//!
//! Functions ([DeterministicFunction](crate::graph::DeterministicFunction)):
//! - [JukesCantor], [Hky], [Gtr]: rate matrices
//! - [SubstituteClade]: subtree replacement
//! - [SvsFunction], [ConstantPopFunc], [ExponentialPopFunc]: population functions

pub mod coalescent;
pub mod distributions;
pub mod population;
pub mod subsample;
pub mod substitute_clade;
pub mod substitution;

pub use crate::ctmc::PhyloCtmc;
pub use coalescent::Coalescent;
pub use distributions::{LogNormal, Normal};
pub use population::{
    ConstantPopFunc, ConstantPopulation, ExponentialPopFunc, ExponentialPopulation, PopulationFunction, SvsFunction,
    SvsPopulationFunction,
};
pub use subsample::SubsampledTree;
pub use substitute_clade::SubstituteClade;
pub use substitution::{Gtr, Hky, JukesCantor};

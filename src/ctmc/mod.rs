//! Continuous-time Markov chain sequence simulation.
//!
//! - [EigenSystem]: eigendecomposition of a rate matrix `Q` and `P(t) = exp(Qt)`
//! - [simulate]: evolves discrete states from the root down a [TimeTree](crate::tree::TimeTree)
//! - [PhyloCtmc]: the same as a generative distribution of a graphical model
//! - [Alignment]: the simulated taxon x site matrix

mod alignment;
mod eigen;
mod simulator;

pub use alignment::{Alignment, MAX_STATES};
pub use eigen::{EigenSystem, matrix_from_rows, validate_rate_matrix};
pub use simulator::{CtmcOptions, PhyloCtmc, draw_state, simulate};

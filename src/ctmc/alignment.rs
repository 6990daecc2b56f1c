//! Simulated alignments: taxon x site matrices of discrete states.

use crate::error::{ModelError, Result};
use crate::tree::TimeTree;
use std::collections::BTreeMap;
use std::fmt;

/// Nucleotide alphabet used when displaying four-state alignments.
const NUCLEOTIDES: [char; 4] = ['A', 'C', 'G', 'T'];

/// Largest supported number of states.
pub const MAX_STATES: usize = u8::MAX as usize + 1;

// =#========================================================================#=
// ALIGNMENT
// =#========================================================================#=
/// A discrete-state alignment with one row per taxon.
///
/// Rows follow the leaf indices of the tree the alignment was simulated on,
/// and [Alignment::id_map] maps each taxon identifier to its row.
///
/// # Example
/// ```
/// use phylogen::ctmc::Alignment;
///
/// let mut alignment = Alignment::new(vec!["A".into(), "B".into()], 3, 4).unwrap();
/// alignment.set_state(1, 2, 3);
/// assert_eq!(alignment.row_of("B"), Some(1));
/// assert_eq!(alignment.sequence_string(1), "AAT");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Alignment {
    num_states: usize,
    num_sites: usize,
    /// Taxon identifiers in row order
    taxa: Vec<String>,
    id_map: BTreeMap<String, usize>,
    /// Row-major states
    states: Vec<u8>,
}

impl Alignment {
    /// Creates an alignment with all states 0.
    ///
    /// # Errors
    /// Fails if `num_states` is outside `1..=256` or taxon identifiers repeat.
    pub fn new(taxa: Vec<String>, num_sites: usize, num_states: usize) -> Result<Self> {
        if num_states == 0 || num_states > MAX_STATES {
            return Err(ModelError::invalid_argument(format!(
                "number of states must be between 1 and {}, got {}",
                MAX_STATES, num_states
            )));
        }

        let mut id_map = BTreeMap::new();
        for (row, id) in taxa.iter().enumerate() {
            if id_map.insert(id.clone(), row).is_some() {
                return Err(ModelError::invalid_argument(format!("duplicate taxon '{}'", id)));
            }
        }

        Ok(Alignment {
            num_states,
            num_sites,
            states: vec![0; taxa.len() * num_sites],
            taxa,
            id_map,
        })
    }

    /// Creates an alignment with one row per leaf of `tree`, in leaf-index order.
    pub fn for_tree(tree: &TimeTree, num_sites: usize, num_states: usize) -> Result<Self> {
        let taxa = tree
            .leaves()
            .iter()
            .map(|leaf| leaf.id().unwrap_or_default().to_string())
            .collect();
        Alignment::new(taxa, num_sites, num_states)
    }

    pub fn num_taxa(&self) -> usize {
        self.taxa.len()
    }

    pub fn num_sites(&self) -> usize {
        self.num_sites
    }

    pub fn num_states(&self) -> usize {
        self.num_states
    }

    /// Taxon identifiers in row order.
    pub fn taxa(&self) -> &[String] {
        &self.taxa
    }

    /// Mapping from taxon identifier to row.
    pub fn id_map(&self) -> &BTreeMap<String, usize> {
        &self.id_map
    }

    pub fn row_of(&self, id: &str) -> Option<usize> {
        self.id_map.get(id).copied()
    }

    /// Returns the state of taxon `row` at `site`.
    ///
    /// # Panics
    /// Panics if `row` or `site` is out of bounds.
    pub fn state(&self, row: usize, site: usize) -> u8 {
        assert!(site < self.num_sites, "Site {} out of bounds", site);
        self.states[row * self.num_sites + site]
    }

    /// Sets the state of taxon `row` at `site`.
    ///
    /// # Panics
    /// Panics if `row` or `site` is out of bounds or `state` is not a valid state.
    pub fn set_state(&mut self, row: usize, site: usize, state: u8) {
        assert!(site < self.num_sites, "Site {} out of bounds", site);
        assert!((state as usize) < self.num_states, "State {} out of range", state);
        self.states[row * self.num_sites + site] = state;
    }

    /// Returns the states of one taxon.
    pub fn sequence(&self, row: usize) -> &[u8] {
        &self.states[row * self.num_sites..(row + 1) * self.num_sites]
    }

    /// Returns one taxon's states as text: `ACGT` for four states, base-36 digits otherwise.
    pub fn sequence_string(&self, row: usize) -> String {
        self.sequence(row)
            .iter()
            .map(|&s| {
                if self.num_states == NUCLEOTIDES.len() {
                    NUCLEOTIDES[s as usize]
                } else {
                    char::from_digit(s as u32, 36).unwrap_or('?')
                }
            })
            .collect()
    }
}

impl fmt::Display for Alignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.taxa.iter().map(String::len).max().unwrap_or(0);
        for (row, id) in self.taxa.iter().enumerate() {
            writeln!(f, "{:width$}  {}", id, self.sequence_string(row), width = width)?;
        }
        Ok(())
    }
}

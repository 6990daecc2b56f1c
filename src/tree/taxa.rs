//! Taxa: ordered, deduplicated taxon names.

use std::collections::HashMap;
use std::fmt;

// =#========================================================================#=
// TAXA
// =#========================================================================#=
/// Ordered set of taxon names with index lookup.
///
/// A [TimeTree](crate::tree::TimeTree) may be bound to a fixed [Taxa];
/// otherwise its taxa are inferred from its leaves.
///
/// # Example
/// ```
/// use phylogen::tree::Taxa;
///
/// let mut taxa = Taxa::new();
/// let kea = taxa.get_or_insert("Nestor notabilis");
/// let kaka = taxa.get_or_insert("Nestor meridionalis");
/// assert_eq!(taxa.get_or_insert("Nestor notabilis"), kea);
/// assert_eq!(taxa.name(kaka), Some("Nestor meridionalis"));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Taxa {
    names: Vec<String>,
    map: HashMap<String, usize>,
}

impl Taxa {
    pub fn new() -> Self {
        Taxa::default()
    }

    /// Creates `n` taxa named `"0"` to `"n-1"`.
    pub fn numbered(n: usize) -> Self {
        Taxa::from_names((0..n).map(|i| i.to_string()))
    }

    /// Creates taxa from names in order, skipping duplicates.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut taxa = Taxa::new();
        for name in names {
            taxa.get_or_insert(name.as_ref());
        }
        taxa
    }

    /// Gets the index for a name, inserting it if it doesn't exist.
    pub fn get_or_insert(&mut self, name: &str) -> usize {
        if let Some(&index) = self.map.get(name) {
            return index;
        }
        let index = self.names.len();
        self.names.push(name.to_string());
        self.map.insert(name.to_string(), index);
        index
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.map.get(name).copied()
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.map.contains_key(name)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl fmt::Display for Taxa {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} taxa: [{}]", self.names.len(), self.names.join(", "))
    }
}

/// Names in `all` that do not occur in `given`, in the order of `all`.
///
/// # Example
/// ```
/// use phylogen::tree::different_taxa_names;
///
/// let all = ["1", "2", "3", "4"];
/// assert_eq!(different_taxa_names(&all, &["2", "4"]), vec!["1", "3"]);
/// ```
pub fn different_taxa_names<S: AsRef<str>, T: AsRef<str>>(all: &[S], given: &[T]) -> Vec<String> {
    all.iter()
        .map(AsRef::as_ref)
        .filter(|name| !given.iter().any(|g| g.as_ref() == *name))
        .map(str::to_string)
        .collect()
}

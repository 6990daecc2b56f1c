//! Random subsampling of taxon groups from a tree.

use crate::config::EmptyGroupPolicy;
use crate::error::{ModelError, Result};
use crate::graph::{Arguments, GenerativeDistribution, ParamSpec, Payload, PayloadKind, SampleContext};
use crate::random::RandomSource;
use crate::tree::TimeTree;
use std::collections::HashSet;
use tracing::{debug, trace};

/// Concatenates two slices.
///
/// # Example
/// ```
/// use phylogen::generators::subsample::combine_two_array;
///
/// assert_eq!(combine_two_array(&["1", "2"], &["3", "4"]), vec!["1", "2", "3", "4"]);
/// ```
pub fn combine_two_array<T: Clone>(first: &[T], second: &[T]) -> Vec<T> {
    let mut combined = Vec::with_capacity(first.len() + second.len());
    combined.extend_from_slice(first);
    combined.extend_from_slice(second);
    combined
}

/// Returns the leaf identifiers of `tree` that appear in `names`, in leaf-index order.
pub fn leaf_list<S: AsRef<str>>(tree: &TimeTree, names: &[S]) -> Vec<String> {
    let names: HashSet<&str> = names.iter().map(AsRef::as_ref).collect();
    tree.leaves()
        .iter()
        .filter_map(|leaf| leaf.id())
        .filter(|id| names.contains(id))
        .map(str::to_string)
        .collect()
}

/// Draws `count` distinct names uniformly without replacement, in draw order.
///
/// Indices are drawn uniformly and redrawn while already taken.
///
/// # Panics
/// Panics if `count` exceeds the number of names.
pub fn sample_names(names: &[String], count: usize, rng: &mut RandomSource) -> Vec<String> {
    assert!(count <= names.len(), "Cannot draw {} of {} names", count, names.len());
    let mut taken = HashSet::with_capacity(count);
    let mut sampled = Vec::with_capacity(count);
    while sampled.len() < count {
        let index = rng.index(names.len());
        if taken.insert(index) {
            sampled.push(names[index].clone());
        }
    }
    sampled
}

/// Subsamples every taxon group of `tree` and prunes it to the sampled leaves.
///
/// Group `g` keeps `round(fractions[g] * m)` of its `m` taxa that are leaves of
/// the tree. A group whose count rounds to zero contributes nothing under
/// [EmptyGroupPolicy::Allow] and fails under [EmptyGroupPolicy::Reject].
///
/// # Errors
/// Returns [ModelError::InvalidArgument] if the number of groups and fractions
/// differ, a fraction lies outside `[0, 1]`, an empty group is rejected, or no
/// leaf at all is sampled.
pub fn subsample_tree(
    tree: &TimeTree,
    groups: &[Vec<String>],
    fractions: &[f64],
    policy: EmptyGroupPolicy,
    rng: &mut RandomSource,
) -> Result<TimeTree> {
    if groups.len() != fractions.len() {
        return Err(ModelError::invalid_argument(format!(
            "{} taxon groups but {} sample fractions",
            groups.len(),
            fractions.len()
        )));
    }

    let mut sampled: Vec<String> = Vec::new();
    for (group, (names, &fraction)) in groups.iter().zip(fractions).enumerate() {
        if !(0.0..=1.0).contains(&fraction) {
            return Err(ModelError::invalid_argument(format!(
                "sample fraction {} of group {} is outside [0, 1]",
                fraction, group
            )));
        }
        let leaves = leaf_list(tree, names);
        let count = (fraction * leaves.len() as f64).round() as usize;
        if count == 0 && policy == EmptyGroupPolicy::Reject {
            return Err(ModelError::invalid_argument(format!(
                "sample fraction {} of group {} with {} taxa selects no taxon",
                fraction,
                group,
                leaves.len()
            )));
        }
        trace!(group, available = leaves.len(), count, "subsampling group");
        sampled = combine_two_array(&sampled, &sample_names(&leaves, count, rng));
    }

    let mut subsampled = tree.clone();
    subsampled.retain_leaves(&sampled)?;
    debug!(leaves = subsampled.leaf_count(), "subsampled tree");
    Ok(subsampled)
}

/// Tree pruned to random subsets of taxon groups; see [subsample_tree].
///
/// Parameters: `tree`, `taxa` (one array of names per group) and
/// `sampleFraction` (one fraction per group). Zero-count groups follow the
/// model's [EmptyGroupPolicy].
#[derive(Debug, Clone, Copy, Default)]
pub struct SubsampledTree;

const SUBSAMPLED_TREE_PARAMS: &[ParamSpec] = &[
    ParamSpec::required("tree", PayloadKind::Tree, "full tree to subsample"),
    ParamSpec::required("taxa", PayloadKind::TextMatrix, "taxon names of each group"),
    ParamSpec::required("sampleFraction", PayloadKind::NumberArray, "fraction of each group to keep"),
];

impl GenerativeDistribution for SubsampledTree {
    fn name(&self) -> &'static str {
        "SubsampledTree"
    }

    fn params(&self) -> &'static [ParamSpec] {
        SUBSAMPLED_TREE_PARAMS
    }

    fn sample(&self, args: &Arguments<'_>, ctx: &mut SampleContext<'_>) -> Result<Payload> {
        let tree = args.tree("tree")?;
        let groups = args.text_matrix("taxa")?;
        let fractions = args.number_array("sampleFraction")?;
        let policy = ctx.config.empty_group_policy();
        subsample_tree(tree, groups, &fractions, policy, ctx.rng).map(Payload::Tree)
    }
}

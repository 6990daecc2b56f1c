//! Structural edits on a [TimeTree]: pruning leaves and grafting clades.
//!
//! Both operations end with [TimeTree::set_root] so that the node list is
//! canonical again and every index is reassigned.

use crate::error::{ModelError, Result};
use crate::tree::time_tree::{NodeIndex, TimeTree};
use std::collections::HashSet;
use tracing::{debug, trace};

/// Prefix given to leaf identifiers of a grafted clade.
pub const CLADE_LEAF_PREFIX: &str = "clade_";

impl TimeTree {
    /// Prunes a single leaf.
    ///
    /// The leaf is detached from its parent. A non-root parent left with one
    /// child is spliced out and its child takes its place under the
    /// grandparent, keeping its own age. A root left with one child is
    /// replaced by that child. A parent left without children is removed as
    /// well. The node list is stale afterwards until [TimeTree::set_root].
    ///
    /// # Panics
    /// Panics if `leaf` is not a leaf or is the last node of the tree.
    pub fn remove_leaf(&mut self, leaf: NodeIndex) {
        assert!(self.node(leaf).is_leaf(), "Node {} is not a leaf", leaf);
        self.node_mut(leaf).mark_for_removal();

        let mut current = leaf;
        loop {
            let parent = self
                .node(current)
                .parent()
                .unwrap_or_else(|| panic!("Cannot remove the last remaining node {}", current));
            self.remove_child(parent, current);

            match self.node(parent).child_count() {
                0 => {
                    self.node_mut(parent).mark_for_removal();
                    current = parent;
                }
                1 => {
                    let sole_child = self.node(parent).children()[0];
                    match self.node(parent).parent() {
                        Some(grandparent) => {
                            trace!(parent, sole_child, grandparent, "splicing out parent");
                            self.replace_child(grandparent, parent, sole_child);
                        }
                        None => {
                            trace!(sole_child, "child of root becomes new root");
                            self.remove_child(parent, sole_child);
                            self.set_root_handle(sole_child);
                        }
                    }
                    self.node_mut(parent).mark_for_removal();
                    break;
                }
                _ => break,
            }
        }
    }

    /// Prunes every leaf whose identifier is not in `ids`, then reindexes the tree.
    ///
    /// Leaves are taken from a snapshot of the leaf list before any removal.
    ///
    /// # Errors
    /// Returns [ModelError::InvalidArgument] if none of `ids` is a leaf of this tree.
    ///
    /// # Example
    /// ```
    /// use phylogen::tree::TimeTree;
    ///
    /// let mut tree = TimeTree::new();
    /// let a = tree.add_leaf("A", 0.0);
    /// let b = tree.add_leaf("B", 0.0);
    /// let c = tree.add_leaf("C", 0.0);
    /// let ab = tree.add_internal(1.0, &[a, b]);
    /// let root = tree.add_internal(2.0, &[ab, c]);
    /// tree.set_root(root, true);
    ///
    /// tree.retain_leaves(["A", "C"]).unwrap();
    /// assert_eq!(tree.leaf_count(), 2);
    /// assert_eq!(tree.to_newick(true), "(A:2,C:2):0.0;");
    /// ```
    pub fn retain_leaves<I, S>(&mut self, ids: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keep: HashSet<String> = ids.into_iter().map(|s| s.as_ref().to_string()).collect();
        let snapshot: Vec<(NodeIndex, bool)> = self
            .leaves()
            .iter()
            .map(|n| (n.index(), n.id().is_some_and(|id| keep.contains(id))))
            .collect();

        if !snapshot.iter().any(|&(_, kept)| kept) {
            return Err(ModelError::invalid_argument(
                "none of the taxa to retain is a leaf of the tree",
            ));
        }

        for (leaf, kept) in snapshot {
            if !kept {
                self.remove_leaf(leaf);
            }
        }

        let root = self.root_index();
        self.set_root(root, true);
        debug!(retained = self.num_leaves(), "pruned tree");
        Ok(())
    }

    /// Replaces the subtree below `node` by a copy of `clade`, whose root is
    /// placed at age `time` on the branch above `node`.
    ///
    /// All ages of the donor clade are shifted by the same amount so that its
    /// internal branch lengths are kept. Donor leaf identifiers get the
    /// [CLADE_LEAF_PREFIX], and the donor root gets `label` as identifier.
    /// The tree is reindexed afterwards.
    ///
    /// # Errors
    /// Returns [ModelError::InvalidArgument] if `node` is the root, if `time`
    /// is not strictly between the ages of `node` and its parent, or if the
    /// shifted clade would reach below age zero.
    pub fn graft_clade(&mut self, node: NodeIndex, clade: &TimeTree, time: f64, label: &str) -> Result<()> {
        let target = self.node_by_index(node);
        let Some(parent) = target.parent() else {
            return Err(ModelError::invalid_argument("cannot substitute a clade for the root"));
        };
        let node_age = target.age();
        let parent_age = self.node(parent).age();
        if !(time > node_age && time < parent_age) {
            return Err(ModelError::invalid_argument(format!(
                "time {} must lie strictly between node age {} and parent age {}",
                time, node_age, parent_age
            )));
        }

        let fraction = (time - parent_age) / (node_age - parent_age);
        let shift = time - clade.root_age();
        let youngest = clade.nodes().iter().map(|n| n.age()).fold(f64::INFINITY, f64::min);
        if youngest + shift < 0.0 {
            return Err(ModelError::invalid_argument(format!(
                "clade of height {} does not fit below time {}",
                clade.root_age() - youngest,
                time
            )));
        }
        trace!(fraction, shift, "grafting clade");

        let offset = self.num_arena_nodes();
        let mut donor_root = offset;
        for donor in clade.nodes() {
            let index = offset + donor.index();
            let mut copy = donor.clone();
            copy.set_index(index);
            copy.set_parent(donor.parent().map(|p| p + offset));
            for child in copy.children_mut().iter_mut() {
                *child += offset;
            }
            copy.set_age(donor.age() + shift);
            if copy.is_leaf() {
                if let Some(id) = donor.id() {
                    copy.set_id(format!("{}{}", CLADE_LEAF_PREFIX, id));
                }
            }
            if donor.is_root() {
                copy.set_id(label);
                donor_root = index;
            }
            self.push_node(copy);
        }

        self.replace_child(parent, node, donor_root);
        let root = self.root_index();
        self.set_root(root, true);
        debug!(label, time, "grafted clade");
        Ok(())
    }
}

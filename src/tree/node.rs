//! Node of a time tree.

use crate::tree::metadata::MetaValue;
use crate::tree::time_tree::NodeIndex;
use std::collections::BTreeMap;

// =#========================================================================#=
// TIME TREE NODE
// =#========================================================================#=
/// A node of a [TimeTree](crate::tree::TimeTree), stored in the tree's arena.
///
/// # Invariants
/// - `index` equals the node's position in the arena
/// - `parent` is `None` exactly for the root (and for nodes under construction)
/// - `age` is non-negative and not larger than the parent's age
/// - leaves have a `leaf_index` once the tree's root has been set
/// - a node with exactly one child is a direct ancestor
#[derive(Debug, Clone, PartialEq)]
pub struct TimeTreeNode {
    /// Identifier, always set for leaves
    id: Option<String>,
    /// Time before present
    age: f64,
    /// Position among the leaves, `None` for internal nodes
    leaf_index: Option<usize>,
    /// Position in the arena
    index: NodeIndex,
    parent: Option<NodeIndex>,
    children: Vec<NodeIndex>,
    metadata: BTreeMap<String, MetaValue>,
    marked_for_removal: bool,
}

impl TimeTreeNode {
    pub(crate) fn new(index: NodeIndex, id: Option<String>, age: f64) -> Self {
        assert!(age >= 0.0 && age.is_finite(), "Node age must be non-negative and finite, got {}", age);
        TimeTreeNode {
            id,
            age,
            leaf_index: None,
            index,
            parent: None,
            children: Vec::new(),
            metadata: BTreeMap::new(),
            marked_for_removal: false,
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = Some(id.into());
    }

    pub fn age(&self) -> f64 {
        self.age
    }

    pub(crate) fn set_age(&mut self, age: f64) {
        assert!(age >= 0.0 && age.is_finite(), "Node age must be non-negative and finite, got {}", age);
        self.age = age;
    }

    /// Returns the leaf index, `None` for internal nodes and unindexed leaves.
    pub fn leaf_index(&self) -> Option<usize> {
        self.leaf_index
    }

    pub(crate) fn set_leaf_index(&mut self, leaf_index: Option<usize>) {
        self.leaf_index = leaf_index;
    }

    pub fn index(&self) -> NodeIndex {
        self.index
    }

    pub(crate) fn set_index(&mut self, index: NodeIndex) {
        self.index = index;
    }

    pub fn parent(&self) -> Option<NodeIndex> {
        self.parent
    }

    pub(crate) fn set_parent(&mut self, parent: Option<NodeIndex>) {
        self.parent = parent;
    }

    pub fn children(&self) -> &[NodeIndex] {
        &self.children
    }

    pub(crate) fn children_mut(&mut self) -> &mut Vec<NodeIndex> {
        &mut self.children
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Returns `true` if this node has exactly one child.
    pub fn is_single_child_node(&self) -> bool {
        self.children.len() == 1
    }

    pub fn metadata(&self) -> &BTreeMap<String, MetaValue> {
        &self.metadata
    }

    pub fn get_metadata(&self, key: &str) -> Option<&MetaValue> {
        self.metadata.get(key)
    }

    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl Into<MetaValue>) {
        self.metadata.insert(key.into(), value.into());
    }

    pub fn remove_metadata(&mut self, key: &str) -> Option<MetaValue> {
        self.metadata.remove(key)
    }

    pub(crate) fn is_marked_for_removal(&self) -> bool {
        self.marked_for_removal
    }

    pub(crate) fn mark_for_removal(&mut self) {
        self.marked_for_removal = true;
    }
}

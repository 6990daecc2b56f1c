//! Time tree: a rooted tree whose nodes carry ages (time before present).
//!
//! [TimeTree] stores its [TimeTreeNode]s in an arena and addresses them by
//! [NodeIndex]. Calling [TimeTree::set_root] establishes the canonical node
//! list: leaves first (by leaf index), then internal nodes in post-order,
//! root last, with every node's index equal to its list position.

use crate::tree::node::TimeTreeNode;
use crate::tree::taxa::Taxa;
use std::fmt;
use tracing::trace;

/// Float comparison tolerance for ages
pub(crate) const EPSILON: f64 = 1e-7;

/// Index of a node in a tree (arena).
pub type NodeIndex = usize;

// =#========================================================================#=
// TIME TREE
// =#========================================================================#=
/// A rooted phylogenetic time tree represented using the arena pattern on [TimeTreeNode].
///
/// # Structure
/// - All nodes are stored in a contiguous vector and referenced by [NodeIndex]
/// - Nodes may have any number of children; a node with one child is a direct ancestor
/// - Branch length of a node is `parent.age - node.age`
///
/// # Construction
/// Add leaves and internal nodes bottom-up, then call [TimeTree::set_root].
/// Structural edits ([add_child](TimeTree::add_child), [remove_child](TimeTree::remove_child))
/// leave the node list stale until the next `set_root`; list-based queries panic on a stale tree.
///
/// # Example
/// ```
/// use phylogen::tree::TimeTree;
///
/// // ((A:1,B:1):1,C:2);
/// let mut tree = TimeTree::new();
/// let a = tree.add_leaf("A", 0.0);
/// let b = tree.add_leaf("B", 0.0);
/// let c = tree.add_leaf("C", 0.0);
/// let ab = tree.add_internal(1.0, &[a, b]);
/// let root = tree.add_internal(2.0, &[ab, c]);
/// tree.set_root(root, true);
///
/// assert!(tree.is_valid());
/// assert_eq!(tree.leaf_count(), 3);
/// assert_eq!(tree.tree_length(), 5.0);
/// assert_eq!(tree.root().index(), 4);
/// ```
///
/// Trees compare equal when their arenas match node by node, including
/// identifiers, ages, metadata and the root.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeTree {
    /// Nodes of this tree (arena pattern)
    nodes: Vec<TimeTreeNode>,

    /// Index of the root, `None` until set
    root: Option<NodeIndex>,

    /// Number of leaves, valid once indexed
    num_leaves: usize,

    /// Fixed taxa, if the tree is bound to any
    taxa: Option<Taxa>,

    /// Whether the node list is canonical
    indexed: bool,
}

// ============================================================================
// New, Construction (pub)
// ============================================================================
impl TimeTree {
    /// Creates a new empty tree.
    pub fn new() -> Self {
        TimeTree::default()
    }

    /// Creates a new empty tree bound to a fixed set of taxa.
    pub fn with_taxa(taxa: Taxa) -> Self {
        TimeTree {
            taxa: Some(taxa),
            ..TimeTree::default()
        }
    }

    /// Adds a leaf without leaf index and returns its index in the arena.
    ///
    /// # Panics
    /// Panics if `age` is negative or not finite.
    pub fn add_leaf(&mut self, id: impl Into<String>, age: f64) -> NodeIndex {
        let index = self.nodes.len();
        self.nodes.push(TimeTreeNode::new(index, Some(id.into()), age));
        self.indexed = false;
        index
    }

    /// Adds a leaf with a preset leaf index, kept by `set_root(.., false)`.
    pub fn add_indexed_leaf(&mut self, id: impl Into<String>, age: f64, leaf_index: usize) -> NodeIndex {
        let index = self.add_leaf(id, age);
        self.nodes[index].set_leaf_index(Some(leaf_index));
        index
    }

    /// Adds an internal node with the given children and returns its index.
    ///
    /// # Panics
    /// Panics if a child already has a parent or is older than `age`.
    pub fn add_internal(&mut self, age: f64, children: &[NodeIndex]) -> NodeIndex {
        let index = self.nodes.len();
        self.nodes.push(TimeTreeNode::new(index, None, age));
        for &child in children {
            self.add_child(index, child);
        }
        self.indexed = false;
        index
    }

    /// Attaches `child` as last child of `parent`.
    ///
    /// # Panics
    /// Panics if `child` already has a parent or is older than `parent`.
    pub fn add_child(&mut self, parent: NodeIndex, child: NodeIndex) {
        assert!(
            self.nodes[child].parent().is_none(),
            "Node {} already has parent {:?}",
            child,
            self.nodes[child].parent()
        );
        assert!(
            self.nodes[child].age() <= self.nodes[parent].age() + EPSILON,
            "Child age {} exceeds parent age {}",
            self.nodes[child].age(),
            self.nodes[parent].age()
        );
        self.nodes[parent].children_mut().push(child);
        self.nodes[child].set_parent(Some(parent));
        self.indexed = false;
    }

    /// Detaches `child` from `parent`, returning whether it was a child.
    pub fn remove_child(&mut self, parent: NodeIndex, child: NodeIndex) -> bool {
        let children = self.nodes[parent].children_mut();
        match children.iter().position(|&c| c == child) {
            Some(position) => {
                children.remove(position);
                self.nodes[child].set_parent(None);
                self.indexed = false;
                true
            }
            None => false,
        }
    }

    /// Puts `new_child` in the child slot of `old_child`, keeping child order.
    pub(crate) fn replace_child(&mut self, parent: NodeIndex, old_child: NodeIndex, new_child: NodeIndex) {
        let position = self.nodes[parent]
            .children()
            .iter()
            .position(|&c| c == old_child)
            .unwrap_or_else(|| panic!("Node {} is not a child of {}", old_child, parent));
        self.nodes[old_child].set_parent(None);
        if let Some(previous) = self.nodes[new_child].parent() {
            self.remove_child(previous, new_child);
        }
        self.nodes[parent].children_mut()[position] = new_child;
        self.nodes[new_child].set_parent(Some(parent));
        self.indexed = false;
    }

    /// Makes `root` the root and rebuilds the node list from it.
    ///
    /// Nodes are collected in post-order. With `reindex_leaves`, leaves get
    /// indices `0..n` in traversal order; otherwise preset leaf indices are kept
    /// and unset ones fill the free slots in traversal order. Internal nodes get
    /// indices from `n` in post-order, so the root comes last. Nodes not
    /// reachable from `root` are dropped.
    ///
    /// # Panics
    /// Panics if a reachable node is still marked for removal, or if kept leaf
    /// indices are out of range or duplicated.
    pub fn set_root(&mut self, root: NodeIndex, reindex_leaves: bool) {
        if let Some(parent) = self.nodes[root].parent() {
            self.remove_child(parent, root);
        }

        let order = self.collect_post_order(root);
        let leaves: Vec<NodeIndex> = order.iter().copied().filter(|&i| self.nodes[i].is_leaf()).collect();
        let num_leaves = leaves.len();

        // Leaf indices
        let mut slots: Vec<Option<NodeIndex>> = vec![None; num_leaves];
        if reindex_leaves {
            for (leaf_index, &leaf) in leaves.iter().enumerate() {
                slots[leaf_index] = Some(leaf);
            }
        } else {
            for &leaf in &leaves {
                if let Some(leaf_index) = self.nodes[leaf].leaf_index() {
                    assert!(
                        leaf_index < num_leaves && slots[leaf_index].is_none(),
                        "Leaf index {} of node {:?} is out of range or duplicated",
                        leaf_index,
                        self.nodes[leaf].id()
                    );
                    slots[leaf_index] = Some(leaf);
                }
            }
            let mut free = (0..num_leaves).filter(|&i| slots[i].is_none()).collect::<Vec<_>>().into_iter();
            for &leaf in &leaves {
                if self.nodes[leaf].leaf_index().is_none() {
                    let leaf_index = free.next().unwrap_or_else(|| panic!("No free leaf index left"));
                    slots[leaf_index] = Some(leaf);
                }
            }
        }

        // Old position -> new index
        let mut new_index = vec![usize::MAX; self.nodes.len()];
        for (leaf_index, slot) in slots.iter().enumerate() {
            let leaf = slot.unwrap_or_else(|| panic!("Leaf index {} not assigned", leaf_index));
            new_index[leaf] = leaf_index;
        }
        let mut next = num_leaves;
        for &node in &order {
            if !self.nodes[node].is_leaf() {
                new_index[node] = next;
                next += 1;
            }
        }

        // Rebuild arena sorted by index
        let mut old: Vec<Option<TimeTreeNode>> = std::mem::take(&mut self.nodes).into_iter().map(Some).collect();
        let mut rebuilt: Vec<Option<TimeTreeNode>> = vec![None; order.len()];
        for &position in &order {
            let mut node = old[position].take().unwrap_or_else(|| panic!("Node {} visited twice", position));
            let index = new_index[position];
            node.set_index(index);
            node.set_leaf_index(if node.is_leaf() { Some(index) } else { None });
            node.set_parent(node.parent().map(|p| new_index[p]));
            for child in node.children_mut().iter_mut() {
                *child = new_index[*child];
            }
            rebuilt[index] = Some(node);
        }
        self.nodes = rebuilt
            .into_iter()
            .enumerate()
            .map(|(i, node)| node.unwrap_or_else(|| panic!("Node index {} left empty", i)))
            .collect();

        self.root = Some(new_index[root]);
        self.num_leaves = num_leaves;
        self.indexed = true;
        trace!(num_leaves, num_nodes = self.nodes.len(), "rebuilt node list");
    }

    /// Moves the root handle without rebuilding the node list.
    pub(crate) fn set_root_handle(&mut self, root: NodeIndex) {
        self.nodes[root].set_parent(None);
        self.root = Some(root);
        self.indexed = false;
    }

    /// Number of nodes in the arena, including detached ones.
    pub(crate) fn num_arena_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Appends a node whose index already equals its future arena position.
    pub(crate) fn push_node(&mut self, node: TimeTreeNode) {
        assert_eq!(node.index(), self.nodes.len(), "Pushed node must carry its arena position");
        self.nodes.push(node);
        self.indexed = false;
    }

    /// Post-order handles of all nodes reachable from `start`.
    fn collect_post_order(&self, start: NodeIndex) -> Vec<NodeIndex> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![(start, false)];
        while let Some((index, children_visited)) = stack.pop() {
            let node = &self.nodes[index];
            if node.is_marked_for_removal() {
                panic!("Node {:?} is marked for removal but still attached", node.id());
            }
            if children_visited || node.is_leaf() {
                order.push(index);
            } else {
                stack.push((index, true));
                for &child in node.children().iter().rev() {
                    stack.push((child, false));
                }
            }
        }
        order
    }
}

// ============================================================================
// Getters / Accessors (pub)
// ============================================================================
impl TimeTree {
    /// Returns whether the node list is canonical, i.e. `set_root` ran after the last edit.
    pub fn is_indexed(&self) -> bool {
        self.indexed
    }

    /// Returns whether a root has been set.
    pub fn is_root_set(&self) -> bool {
        self.root.is_some()
    }

    /// Returns the index of the root.
    ///
    /// # Panics
    /// Panics if no root has been set.
    pub fn root_index(&self) -> NodeIndex {
        self.root.unwrap_or_else(|| panic!("Root of tree has not been set"))
    }

    /// Returns a reference to the root node.
    ///
    /// # Panics
    /// Panics if no root has been set.
    pub fn root(&self) -> &TimeTreeNode {
        &self.nodes[self.root_index()]
    }

    /// Returns the node at the given arena position; valid during construction too.
    pub fn node(&self, index: NodeIndex) -> &TimeTreeNode {
        &self.nodes[index]
    }

    /// Mutable access to a node, e.g. to set its identifier or metadata.
    pub fn node_mut(&mut self, index: NodeIndex) -> &mut TimeTreeNode {
        &mut self.nodes[index]
    }

    /// Returns the canonical node list: leaves, then internal nodes, root last.
    ///
    /// # Panics
    /// Panics if the tree was edited since the last `set_root`.
    pub fn nodes(&self) -> &[TimeTreeNode] {
        assert!(self.indexed, "Node list is stale; call set_root after structural edits");
        &self.nodes
    }

    /// Returns the node with tree-wide index `index`.
    ///
    /// # Panics
    /// Panics if the node list is stale or the node found does not carry that index.
    pub fn node_by_index(&self, index: NodeIndex) -> &TimeTreeNode {
        let node = &self.nodes()[index];
        assert_eq!(node.index(), index, "Node at position {} has index {}", index, node.index());
        node
    }

    /// Returns the leaves in leaf-index order.
    pub fn leaves(&self) -> &[TimeTreeNode] {
        &self.nodes()[..self.num_leaves]
    }

    /// Returns the internal nodes (including the root) in index order.
    pub fn internal_nodes(&self) -> &[TimeTreeNode] {
        &self.nodes()[self.num_leaves..]
    }

    /// Returns the leaves with age zero.
    pub fn extant_nodes(&self) -> Vec<&TimeTreeNode> {
        self.leaves().iter().filter(|n| n.age() == 0.0).collect()
    }

    /// Returns the leaf with the given identifier.
    pub fn leaf_by_id(&self, id: &str) -> Option<&TimeTreeNode> {
        self.leaves().iter().find(|n| n.id() == Some(id))
    }

    /// Returns the parent node, `None` for the root.
    pub fn parent_of(&self, index: NodeIndex) -> Option<&TimeTreeNode> {
        self.nodes[index].parent().map(|p| &self.nodes[p])
    }

    /// Returns `parent.age - node.age`, or 0 for the root.
    pub fn branch_length(&self, index: NodeIndex) -> f64 {
        match self.nodes[index].parent() {
            Some(parent) => self.nodes[parent].age() - self.nodes[index].age(),
            None => 0.0,
        }
    }

    /// Returns whether a node is a direct ancestor: it has exactly one child,
    /// or it is a leaf sitting on a zero-length branch.
    pub fn is_direct_ancestor(&self, index: NodeIndex) -> bool {
        let node = &self.nodes[index];
        node.is_single_child_node() || (node.is_leaf() && !node.is_root() && self.branch_length(index).abs() < EPSILON)
    }

    /// Returns the indices of all leaves below (or at) `index`.
    pub fn leaves_below(&self, index: NodeIndex) -> Vec<NodeIndex> {
        self.collect_post_order(index)
            .into_iter()
            .filter(|&i| self.nodes[i].is_leaf())
            .collect()
    }

    /// Returns the fixed taxa this tree is bound to, if any.
    pub fn taxa(&self) -> Option<&Taxa> {
        self.taxa.as_ref()
    }

    /// Returns the taxon names: the fixed taxa if bound, else leaf ids in leaf-index order.
    pub fn taxa_names(&self) -> Vec<String> {
        match &self.taxa {
            Some(taxa) => taxa.names().to_vec(),
            None => self
                .leaves()
                .iter()
                .map(|n| n.id().unwrap_or_default().to_string())
                .collect(),
        }
    }

    /// Validates the tree structure and all index references.
    ///
    /// Checks:
    /// - Root is set, has no parent and is the last node
    /// - Node list is canonical and every index matches its position
    /// - The first `n` nodes are exactly the leaves, each with matching leaf index
    /// - Parent and child references agree
    /// - Branch lengths are non-negative
    ///
    /// # Returns
    /// `true` if tree is valid, `false` otherwise
    pub fn is_valid(&self) -> bool {
        let Some(root) = self.root else {
            return false;
        };
        if !self.indexed || root + 1 != self.nodes.len() || self.nodes[root].parent().is_some() {
            return false;
        }

        for (index, node) in self.nodes.iter().enumerate() {
            if node.index() != index {
                return false;
            }

            let should_be_leaf = index < self.num_leaves;
            if node.is_leaf() != should_be_leaf {
                return false;
            }
            if should_be_leaf && node.leaf_index() != Some(index) {
                return false;
            }

            for &child in node.children() {
                if child >= self.nodes.len() || self.nodes[child].parent() != Some(index) {
                    return false;
                }
            }

            if index != root {
                match node.parent() {
                    None => return false,
                    Some(parent) => {
                        if parent >= self.nodes.len() || !self.nodes[parent].children().contains(&index) {
                            return false;
                        }
                        if self.branch_length(index) < -EPSILON {
                            return false;
                        }
                    }
                }
            }
        }

        true
    }
}

impl std::ops::Index<NodeIndex> for TimeTree {
    type Output = TimeTreeNode;

    fn index(&self, index: NodeIndex) -> &Self::Output {
        &self.nodes[index]
    }
}

// ============================================================================
// Metrics (pub)
// ============================================================================
impl TimeTree {
    /// Returns the number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes().len()
    }

    /// Returns the number of branches, one per non-root node.
    pub fn branch_count(&self) -> usize {
        self.node_count().saturating_sub(1)
    }

    /// Returns the number of leaves, including zero-branch-length ones.
    pub fn num_leaves(&self) -> usize {
        assert!(self.indexed, "Node list is stale; call set_root after structural edits");
        self.num_leaves
    }

    /// Returns the number of leaves that are not direct ancestors.
    pub fn leaf_count(&self) -> usize {
        (0..self.num_leaves()).filter(|&i| !self.is_direct_ancestor(i)).count()
    }

    /// Returns the number of leaves with age exactly zero.
    pub fn extant_count(&self) -> usize {
        self.leaves().iter().filter(|n| n.age() == 0.0).count()
    }

    /// Returns the number of direct ancestors (single-child nodes and zero-branch-length leaves).
    pub fn direct_ancestor_count(&self) -> usize {
        (0..self.node_count()).filter(|&i| self.is_direct_ancestor(i)).count()
    }

    /// Returns the number of nodes with exactly one child.
    pub fn single_child_node_count(&self) -> usize {
        self.nodes().iter().filter(|n| n.is_single_child_node()).count()
    }

    /// Returns whether the root has a single child, i.e. the tree starts with an origin branch.
    pub fn has_origin(&self) -> bool {
        self.root().is_single_child_node()
    }

    /// Returns the sum of all branch lengths.
    pub fn tree_length(&self) -> f64 {
        (0..self.node_count()).map(|i| self.branch_length(i)).sum()
    }

    /// Returns the age of the root.
    pub fn root_age(&self) -> f64 {
        self.root().age()
    }

    /// Returns whether every leaf is extant, i.e. has age 0.
    pub fn is_ultrametric(&self) -> bool {
        self.leaves().iter().all(|n| n.age() == 0.0)
    }

    /// Returns the oldest node with age at most `max_age`; the first in list
    /// order wins ties. `None` if no node qualifies.
    pub fn oldest_node(&self, max_age: f64) -> Option<&TimeTreeNode> {
        let mut oldest: Option<&TimeTreeNode> = None;
        for node in self.nodes() {
            if node.age() <= max_age && oldest.is_none_or(|o| node.age() > o.age()) {
                oldest = Some(node);
            }
        }
        oldest
    }

    /// Returns an iterator over the tree in post-order (children before parents).
    pub fn post_order_iter(&self) -> PostOrderIter<'_> {
        PostOrderIter::new(self)
    }

    /// Returns an iterator over the tree in pre-order (parents before children).
    ///
    /// # Example
    /// ```
    /// use phylogen::tree::TimeTree;
    ///
    /// let mut tree = TimeTree::new();
    /// let a = tree.add_leaf("A", 0.0);
    /// let b = tree.add_leaf("B", 0.0);
    /// let root = tree.add_internal(1.0, &[a, b]);
    /// tree.set_root(root, true);
    ///
    /// let ids: Vec<_> = tree.pre_order_iter().map(|n| n.index()).collect();
    /// assert_eq!(ids, vec![2, 0, 1]);
    /// ```
    pub fn pre_order_iter(&self) -> PreOrderIter<'_> {
        PreOrderIter::new(self)
    }
}

// ============================================================================
// Printing
// ============================================================================
impl TimeTree {
    /// Writes a node and its subtree, one line per node.
    fn fmt_node(&self, f: &mut fmt::Formatter<'_>, index: NodeIndex, prefix: &str, is_last: bool, is_top: bool) -> fmt::Result {
        let node = &self.nodes[index];
        let connector = if is_top { "" } else if is_last { "└─ " } else { "├─ " };

        if node.is_leaf() {
            writeln!(
                f,
                "{}{}[{}] Leaf \"{}\" (age: {:.3})",
                prefix,
                connector,
                index,
                node.id().unwrap_or("?"),
                node.age()
            )?;
        } else {
            let label = node.id().map(|id| format!(" \"{}\"", id)).unwrap_or_default();
            writeln!(f, "{}{}[{}] Internal{} (age: {:.3})", prefix, connector, index, label, node.age())?;

            let new_prefix = if is_top {
                "  ".to_string()
            } else {
                format!("{}{}  ", prefix, if is_last { " " } else { "│" })
            };
            let children = node.children();
            for (i, &child) in children.iter().enumerate() {
                self.fmt_node(f, child, &new_prefix, i + 1 == children.len(), false)?;
            }
        }
        Ok(())
    }
}

/// Visual representation of the tree.
///
/// # Example Output
/// ```text
/// Time tree with 3 leaves (5 nodes total):
/// [4] Internal (age: 2.000)
///   ├─ [3] Internal (age: 1.000)
///   │   ├─ [0] Leaf "A" (age: 0.000)
///   │   └─ [1] Leaf "B" (age: 0.000)
///   └─ [2] Leaf "C" (age: 0.000)
/// ```
impl fmt::Display for TimeTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.root {
            Some(root) => {
                writeln!(f, "Time tree with {} leaves ({} nodes total):", self.num_leaves, self.nodes.len())?;
                self.fmt_node(f, root, "", true, true)
            }
            None => writeln!(f, "(No root set)"),
        }
    }
}

// =#========================================================================#=
// ITERATORS
// =#========================================================================#=
/// Iterator for post-order traversal (children before parents).
///
/// Stack based; children are visited in child-list order.
pub struct PostOrderIter<'a> {
    tree: &'a TimeTree,
    stack: Vec<(NodeIndex, bool)>, // (index, children_visited)
}

impl<'a> PostOrderIter<'a> {
    fn new(tree: &'a TimeTree) -> Self {
        let mut stack = Vec::new();
        if let Some(root) = tree.root {
            stack.push((root, false));
        }
        PostOrderIter { tree, stack }
    }
}

impl<'a> Iterator for PostOrderIter<'a> {
    type Item = &'a TimeTreeNode;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((index, children_visited)) = self.stack.pop() {
            let node = &self.tree.nodes[index];

            if children_visited || node.is_leaf() {
                return Some(node);
            } else {
                self.stack.push((index, true));
                for &child in node.children().iter().rev() {
                    self.stack.push((child, false));
                }
            }
        }
        None
    }
}

/// Iterator for pre-order traversal (parents before children).
///
/// Stack based; children are visited in child-list order.
pub struct PreOrderIter<'a> {
    tree: &'a TimeTree,
    stack: Vec<NodeIndex>,
}

impl<'a> PreOrderIter<'a> {
    fn new(tree: &'a TimeTree) -> Self {
        let mut stack = Vec::new();
        if let Some(root) = tree.root {
            stack.push(root);
        }
        PreOrderIter { tree, stack }
    }
}

impl<'a> Iterator for PreOrderIter<'a> {
    type Item = &'a TimeTreeNode;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.stack.pop()?;
        let node = &self.tree.nodes[index];

        for &child in node.children().iter().rev() {
            self.stack.push(child);
        }

        Some(node)
    }
}

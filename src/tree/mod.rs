//! Time-tree data model.
//!
//! - [TimeTree]: arena of [TimeTreeNode]s addressed by [NodeIndex], with a
//!   canonical node list (leaves, internal nodes, root last) rebuilt by
//!   [TimeTree::set_root]
//! - [Taxa]: ordered taxon names a tree may be bound to
//! - [MetaValue]: metadata values attached to nodes
//!
//! Structural edits (pruning, grafting) live in [edit].

pub mod edit;
pub mod metadata;
pub mod node;
pub mod taxa;
pub mod time_tree;

pub use edit::CLADE_LEAF_PREFIX;
pub use metadata::MetaValue;
pub use node::TimeTreeNode;
pub use taxa::{Taxa, different_taxa_names};
pub use time_tree::{NodeIndex, PostOrderIter, PreOrderIter, TimeTree};

//! Newick writing for time trees.

use crate::tree::{MetaValue, NodeIndex, TimeTree, TimeTreeNode};

/// Extra buffer in Newick string length/capacity estimate
const BUFFER_CHARS: usize = 10;

/// Returns the Newick representation of a time tree with closing semicolon.
///
/// Leaves are written as their escaped identifier followed by their metadata
/// as `[&key=value,...]`. Internal nodes write their children in child-list
/// order inside parentheses. Every non-root node is followed by
/// `:<branch length>`, the root by `:0.0;`.
///
/// With `include_single_child_nodes == false`, nodes with a single child are
/// skipped in the output (the tree itself is unchanged). Their descendants
/// then measure their branch length against the nearest ancestor that is
/// written, i.e. the nearest ancestor with more than one child.
///
/// # Arguments
/// * `tree` - The [TimeTree] to convert; its root must be set
/// * `include_single_child_nodes` - Whether single-child nodes are written
///
/// # Example
/// ```
/// use phylogen::tree::TimeTree;
/// use phylogen::newick::to_newick;
///
/// let mut tree = TimeTree::new();
/// let a = tree.add_leaf("A", 0.0);
/// let b = tree.add_leaf("B", 0.5);
/// let ancestor = tree.add_internal(1.0, &[b]);
/// let root = tree.add_internal(2.0, &[a, ancestor]);
/// tree.set_root(root, true);
///
/// assert_eq!(to_newick(&tree, true), "(A:2,(B:0.5):1):0.0;");
/// assert_eq!(to_newick(&tree, false), "(A:2,B:1.5):0.0;");
/// ```
pub fn to_newick(tree: &TimeTree, include_single_child_nodes: bool) -> String {
    let mut newick = String::with_capacity(estimate_newick_len(tree));
    let top = resolve(tree, tree.root_index(), include_single_child_nodes);
    write_subtree(tree, &mut newick, top, include_single_child_nodes);
    newick.push_str(":0.0;");
    newick
}

/// First node at or below `index` that is written.
fn resolve(tree: &TimeTree, index: NodeIndex, include_single_child_nodes: bool) -> NodeIndex {
    let mut index = index;
    if !include_single_child_nodes {
        while tree[index].is_single_child_node() {
            index = tree[index].children()[0];
        }
    }
    index
}

// Recursive helper for building the Newick string
fn write_subtree(tree: &TimeTree, newick: &mut String, index: NodeIndex, include_single_child_nodes: bool) {
    let node = &tree[index];

    if node.is_leaf() {
        newick.push_str(&escape_label(node.id().unwrap_or_default()));
        write_metadata(newick, node);
        return;
    }

    newick.push('(');
    for (i, &child) in node.children().iter().enumerate() {
        if i > 0 {
            newick.push(',');
        }
        let written = resolve(tree, child, include_single_child_nodes);
        write_subtree(tree, newick, written, include_single_child_nodes);
        newick.push(':');
        newick.push_str(&format_length(node.age() - tree[written].age()));
    }
    newick.push(')');
}

fn write_metadata(newick: &mut String, node: &TimeTreeNode) {
    if node.metadata().is_empty() {
        return;
    }
    newick.push_str("[&");
    for (i, (key, value)) in node.metadata().iter().enumerate() {
        if i > 0 {
            newick.push(',');
        }
        newick.push_str(key);
        newick.push('=');
        newick.push_str(&format_meta_value(value));
    }
    newick.push(']');
}

/// Text values are quoted when they hold annotation punctuation or would
/// otherwise read back as a number.
fn format_meta_value(value: &MetaValue) -> String {
    match value {
        MetaValue::Text(text) => {
            let escaped = escape_label(text);
            if escaped == *text && (text.contains('=') || !matches!(MetaValue::parse(text), MetaValue::Text(_))) {
                format!("'{}'", text)
            } else {
                escaped
            }
        }
        numeric => numeric.to_string(),
    }
}

fn format_length(length: f64) -> String {
    length.to_string()
}

/// Estimates the length of the Newick string of the given tree.
pub(crate) fn estimate_newick_len(tree: &TimeTree) -> usize {
    // - Each internal node: "(,)" ~= 3 chars
    const INTERNAL_NODE_CHARS: usize = 3;
    // - Branch lengths: ~20 chars each (e.g., ":0.009529961339106089")
    const BRANCH_LENGTH_CHARS: usize = 20;

    let num_nodes = tree.node_count();
    let num_leaves = tree.num_leaves();
    let label_capacity: usize = tree.leaves().iter().map(|n| n.id().map_or(0, str::len)).sum();

    label_capacity
        + (num_nodes - num_leaves) * INTERNAL_NODE_CHARS
        + num_nodes * BRANCH_LENGTH_CHARS
        + BUFFER_CHARS
}

/// Escapes a label for safe use in Newick strings.
///
/// Labels containing whitespace or Newick punctuation are wrapped in single
/// quotes, with internal single quotes doubled. Other labels are returned as-is.
///
/// # Examples
/// ```
/// use phylogen::newick::escape_label;
///
/// assert_eq!(escape_label("Pukeko"), "Pukeko");
/// assert_eq!(escape_label("clade_3"), "clade_3");
/// assert_eq!(escape_label("Pu[ke]ko"), "'Pu[ke]ko'");
/// assert_eq!(escape_label("Australasian Swamphen"), "'Australasian Swamphen'");
/// assert_eq!(escape_label("Baillon's Crake"), "'Baillon''s Crake'");
/// ```
pub fn escape_label(label: &str) -> String {
    let needs_quotes = label.is_empty()
        || label.chars().any(|c| {
            matches!(
                c,
                ' ' | ',' | ';' | '\t' | '\n' | '\r' | '(' | ')' | ':' | '[' | ']' | '\''
            )
        });

    if needs_quotes {
        format!("'{}'", label.replace('\'', "''"))
    } else {
        label.to_string()
    }
}

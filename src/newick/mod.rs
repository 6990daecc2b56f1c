//! Newick format parser and writer for time trees.
//!
//! # Quick API
//! * [`parse_str`] - parses a single string, annotations kept as metadata
//! * [`to_newick`] / [`TimeTree::to_newick`] - writes a tree
//!
//! # Format
//! The Newick format has the following grammar:
//! * `tree ::= vertex ';'`
//! * `vertex ::= leaf | internal_vertex`
//! * `internal_vertex ::= '(' vertex (',' vertex)* ')' [label] [annotation] [branch_length]`
//! * `leaf ::= label [annotation] [branch_length]`
//! * `annotation ::= '[&' key '=' value (',' key '=' value)* ']'`
//! * `branch_length ::= ':' number`
//!
//! Furthermore:
//! * Whitespace can occur between elements,
//!   just not within an unquoted label or a branch length
//! * Labels with special characters are single quoted, internal quotes doubled
//! * Comments are square brackets not starting with `&` and are skipped
//!
//! Internal node labels are read but never written; the writer emits only
//! leaf identifiers and leaf metadata.

pub(crate) mod byte_parser;
mod parser;
mod parsing_error;
mod writer;

pub use self::parser::NewickParser;
pub use self::parsing_error::{ParsingError, ParsingErrorKind};
pub use self::writer::{escape_label, to_newick};

use crate::tree::TimeTree;

// ============================================================================
// QUICK API (pub)
// ============================================================================
/// Parses a single Newick string, keeping `[&key=value]` annotations as node metadata.
///
/// # Example
/// ```
/// use phylogen::newick::parse_str;
///
/// let tree = parse_str("((A:1,B:1):1,C:2);").unwrap();
/// assert_eq!(tree.num_leaves(), 3);
/// assert_eq!(tree.to_newick(true), "((A:1,B:1):1,C:2):0.0;");
/// ```
pub fn parse_str<S: AsRef<str>>(newick: S) -> Result<TimeTree, ParsingError> {
    NewickParser::new().with_annotations().parse_str(newick.as_ref())
}

impl TimeTree {
    /// Returns the Newick representation of this tree.
    ///
    /// See [`to_newick`] for the format and the meaning of `include_single_child_nodes`.
    pub fn to_newick(&self, include_single_child_nodes: bool) -> String {
        to_newick(self, include_single_child_nodes)
    }
}

//! Recursive-descent Newick parser producing [TimeTree]s.

use crate::newick::byte_parser::ByteParser;
use crate::newick::parsing_error::ParsingError;
use crate::tree::{MetaValue, NodeIndex, TimeTree};

/// Delimiters ending an unquoted label: parentheses, comma, colon, semicolon, brackets, whitespace
const NEWICK_LABEL_DELIMITERS: &[u8] = b"([,:; \n\t\r)]";

/// Node as read from the string, before ages are known.
#[derive(Debug, Default)]
struct ParsedNode {
    label: Option<String>,
    branch_length: Option<f64>,
    children: Vec<usize>,
    annotations: Vec<(String, MetaValue)>,
}

// =#========================================================================#=
// NEWICK PARSER
// =#========================================================================#=
/// Parser for single Newick strings into [TimeTree]s.
///
/// Ages are derived from branch lengths: the tip furthest from the root gets
/// age 0 and every other node the difference between that tip's depth and its
/// own. Missing branch lengths count as 0. Any number of children per node is
/// accepted, including single-child nodes.
///
/// # Configuration
/// * [`with_annotations()`](Self::with_annotations)
///     - Stores `[&key=value,...]` blocks as node metadata;
///       otherwise they are skipped like comments
///
/// # Example
/// ```
/// use phylogen::newick::NewickParser;
///
/// let tree = NewickParser::new()
///     .with_annotations()
///     .parse_str("((A[&group=tumour]:1,B:1):1,C:2);")
///     .unwrap();
/// assert_eq!(tree.num_leaves(), 3);
/// assert_eq!(tree.root_age(), 2.0);
/// assert_eq!(
///     tree.leaf_by_id("A").unwrap().get_metadata("group").unwrap().to_string(),
///     "tumour"
/// );
/// ```
#[derive(Debug, Clone, Default)]
pub struct NewickParser {
    parse_annotations: bool,
}

impl NewickParser {
    pub fn new() -> Self {
        NewickParser::default()
    }

    /// Configures the parser to keep node annotations as metadata.
    pub fn with_annotations(mut self) -> Self {
        self.parse_annotations = true;
        self
    }

    /// Parses a single Newick string terminated by `;`.
    ///
    /// # Errors
    /// Returns a [ParsingError] on malformed input, negative branch lengths,
    /// or trailing content after the terminating semicolon.
    pub fn parse_str(&self, newick: &str) -> Result<TimeTree, ParsingError> {
        let mut parser = ByteParser::from_str(newick);
        let mut parsed = Vec::new();

        let root = self.parse_vertex(&mut parser, &mut parsed)?;

        parser.skip_comment_and_whitespace()?;
        if !parser.consume_if(b';') {
            let next_char = parser.peek().map(char::from);
            return Err(ParsingError::invalid_newick_string(
                &parser,
                format!("Expected ';' at end of tree but found {:?}", next_char),
            ));
        }
        parser.skip_comment_and_whitespace()?;
        if !parser.is_eof() {
            return Err(ParsingError::invalid_newick_string(
                &parser,
                "Unexpected content after ';'".to_string(),
            ));
        }

        Ok(build_tree(&parsed, root))
    }
}

// ============================================================================
// Parsing
// ============================================================================
impl NewickParser {
    /// Parses a vertex (internal or leaf) with its label, annotations and
    /// branch length, and returns its position in `parsed`.
    fn parse_vertex(&self, parser: &mut ByteParser<'_>, parsed: &mut Vec<ParsedNode>) -> Result<usize, ParsingError> {
        parser.skip_comment_and_whitespace()?;
        if parser.is_eof() {
            return Err(ParsingError::unexpected_eof(parser));
        }

        let mut node = ParsedNode::default();
        if parser.peek_is(b'(') {
            node.children = self.parse_children(parser, parsed)?;
            parser.skip_comment_and_whitespace()?;
            if !parser.peek().is_some_and(|b| NEWICK_LABEL_DELIMITERS.contains(&b) && b != b'\'') {
                let label = parser.parse_label(NEWICK_LABEL_DELIMITERS)?;
                if !label.is_empty() {
                    node.label = Some(label);
                }
            }
        } else {
            let label = parser.parse_label(NEWICK_LABEL_DELIMITERS)?;
            if label.is_empty() {
                let next_char = parser.peek().map(char::from);
                return Err(ParsingError::invalid_newick_string(
                    parser,
                    format!("Expected leaf label but found {:?}", next_char),
                ));
            }
            node.label = Some(label);
        }

        parser.skip_comment_and_whitespace()?;
        node.annotations = self.parse_annotations(parser)?;
        node.branch_length = parse_branch_length(parser)?;

        parsed.push(node);
        Ok(parsed.len() - 1)
    }

    /// Parses `(vertex, vertex, ...)`; expects parser at the opening `(`.
    fn parse_children(&self, parser: &mut ByteParser<'_>, parsed: &mut Vec<ParsedNode>) -> Result<Vec<usize>, ParsingError> {
        parser.consume_if(b'(');
        let mut children = vec![self.parse_vertex(parser, parsed)?];

        loop {
            parser.skip_comment_and_whitespace()?;
            if parser.consume_if(b',') {
                children.push(self.parse_vertex(parser, parsed)?);
            } else if parser.consume_if(b')') {
                return Ok(children);
            } else {
                let next_char = parser.peek().map(char::from);
                return Err(ParsingError::invalid_newick_string(
                    parser,
                    format!("Expected ',' or ')' after child but found {:?}", next_char),
                ));
            }
        }
    }

    /// Parses an annotation block `[&key=value,...]` if present.
    /// Without annotation parsing configured, the block is skipped.
    fn parse_annotations(&self, parser: &mut ByteParser<'_>) -> Result<Vec<(String, MetaValue)>, ParsingError> {
        let mut annotations = Vec::new();
        if !parser.consume_if_sequence(b"[&") {
            return Ok(annotations);
        }

        loop {
            let key = parser.parse_unquoted_label(b"=]");
            if key.is_empty() || !parser.consume_if(b'=') {
                return Err(ParsingError::invalid_newick_string(
                    parser,
                    "Expected 'key=value' in annotation".to_string(),
                ));
            }

            // Quoted values are always text
            let value = if parser.peek_is(b'\'') {
                MetaValue::Text(parser.parse_quoted_label()?)
            } else {
                let raw = parser.parse_unquoted_label(b",]");
                if raw.trim().is_empty() {
                    return Err(ParsingError::invalid_newick_string(
                        parser,
                        format!("Empty annotation value for key '{}'", key),
                    ));
                }
                MetaValue::parse(raw.trim())
            };
            annotations.push((key.trim().to_string(), value));

            if parser.consume_if(b',') {
                continue;
            }
            if parser.consume_if(b']') {
                break;
            }
            return Err(if parser.is_eof() {
                ParsingError::unclosed_comment(parser)
            } else {
                ParsingError::invalid_newick_string(parser, "Expected ']' at end of annotation block".to_string())
            });
        }

        parser.skip_comment_and_whitespace()?;
        if self.parse_annotations {
            Ok(annotations)
        } else {
            Ok(Vec::new())
        }
    }
}

/// Parses optional branch length `:number`, scientific notation included.
fn parse_branch_length(parser: &mut ByteParser<'_>) -> Result<Option<f64>, ParsingError> {
    parser.skip_comment_and_whitespace()?;
    if !parser.consume_if(b':') {
        return Ok(None);
    }
    parser.skip_comment_and_whitespace()?;

    let mut raw = String::new();
    while let Some(b) = parser.peek() {
        if b.is_ascii_digit() || matches!(b, b'.' | b'-' | b'+' | b'e' | b'E') {
            raw.push(b as char);
            parser.next_byte();
        } else {
            break;
        }
    }

    match raw.parse::<f64>() {
        Ok(value) if value >= 0.0 && value.is_finite() => Ok(Some(value)),
        _ => Err(ParsingError::invalid_branch_length(parser, raw)),
    }
}

// ============================================================================
// Tree construction
// ============================================================================
/// Builds the [TimeTree]: depths from the root, ages relative to the deepest tip.
fn build_tree(parsed: &[ParsedNode], root: usize) -> TimeTree {
    let mut depth = vec![0.0; parsed.len()];
    let mut stack = vec![root];
    let mut max_depth: f64 = 0.0;
    while let Some(index) = stack.pop() {
        for &child in &parsed[index].children {
            depth[child] = depth[index] + parsed[child].branch_length.unwrap_or(0.0);
            stack.push(child);
        }
        if parsed[index].children.is_empty() {
            max_depth = max_depth.max(depth[index]);
        }
    }

    let mut tree = TimeTree::new();
    let mut handles: Vec<Option<NodeIndex>> = vec![None; parsed.len()];

    // Children are always parsed (and pushed) before their parent
    for (index, node) in parsed.iter().enumerate() {
        let age = (max_depth - depth[index]).max(0.0);
        let handle = if node.children.is_empty() {
            tree.add_leaf(node.label.clone().unwrap_or_default(), age)
        } else {
            let children: Vec<NodeIndex> = node
                .children
                .iter()
                .map(|&c| handles[c].unwrap_or_else(|| panic!("Child {} parsed after parent", c)))
                .collect();
            let handle = tree.add_internal(age, &children);
            if let Some(label) = &node.label {
                tree.node_mut(handle).set_id(label.clone());
            }
            handle
        };
        for (key, value) in &node.annotations {
            tree.node_mut(handle).set_metadata(key.clone(), value.clone());
        }
        handles[index] = Some(handle);
    }

    let root_handle = handles[root].unwrap_or_else(|| panic!("Root was not parsed"));
    tree.set_root(root_handle, true);
    tree
}

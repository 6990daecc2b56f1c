//! Error type of the Newick parser.
//!
//! [ParsingError] carries a [ParsingErrorKind] together with the byte
//! position and a snippet of the input following it.

use crate::newick::byte_parser::ByteParser;
use thiserror::Error;

/// Default length of context provided by error from parser
const DEFAULT_CONTEXT_LENGTH: usize = 50;

// =#========================================================================#=
// PARSING ERROR KIND
// =#========================================================================#=
/// Error kinds that can occur while parsing a Newick string.
#[derive(Error, PartialEq, Debug, Clone)]
pub enum ParsingErrorKind {
    #[error("unexpected end of input")]
    UnexpectedEof,
    #[error("unclosed comment")]
    UnclosedComment,
    #[error("invalid Newick string: {0}")]
    InvalidNewickString(String),
    #[error("invalid branch length '{0}'")]
    InvalidBranchLength(String),
}

// =#========================================================================#=
// PARSING ERROR
// =#========================================================================#=
/// Parsing error with contextual information (position and following bytes).
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{kind} at position {position} (near '{context}')")]
pub struct ParsingError {
    kind: ParsingErrorKind,
    position: usize,
    context: String,
}

impl ParsingError {
    /// Create a ParsingError from an error kind and parser state
    pub(crate) fn from_parser(kind: ParsingErrorKind, parser: &ByteParser<'_>) -> Self {
        Self {
            kind,
            position: parser.position(),
            context: parser.context(DEFAULT_CONTEXT_LENGTH),
        }
    }

    pub(crate) fn unexpected_eof(parser: &ByteParser<'_>) -> Self {
        Self::from_parser(ParsingErrorKind::UnexpectedEof, parser)
    }

    pub(crate) fn unclosed_comment(parser: &ByteParser<'_>) -> Self {
        Self::from_parser(ParsingErrorKind::UnclosedComment, parser)
    }

    pub(crate) fn invalid_newick_string(parser: &ByteParser<'_>, message: String) -> Self {
        Self::from_parser(ParsingErrorKind::InvalidNewickString(message), parser)
    }

    pub(crate) fn invalid_branch_length(parser: &ByteParser<'_>, raw: String) -> Self {
        Self::from_parser(ParsingErrorKind::InvalidBranchLength(raw), parser)
    }

    /// Get the error kind
    pub fn kind(&self) -> &ParsingErrorKind {
        &self.kind
    }

    /// Get the position where the error occurred
    pub fn position(&self) -> usize {
        self.position
    }

    /// Get the input following the error position
    pub fn context(&self) -> &str {
        &self.context
    }
}

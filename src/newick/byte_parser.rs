//! Low-level byte-by-byte reader for ASCII Newick text.

use crate::newick::parsing_error::ParsingError;

// =#========================================================================#=
// BYTE PARSER
// =#========================================================================#=
/// A byte-by-byte parser over an in-memory input with peeking, consuming,
/// comment skipping and quote-aware label parsing.
pub(crate) struct ByteParser<'a> {
    input: &'a [u8],
    position: usize,
}

impl<'a> ByteParser<'a> {
    pub fn from_str(input: &'a str) -> Self {
        ByteParser {
            input: input.as_bytes(),
            position: 0,
        }
    }

    /// Peeks at the current byte without consuming it.
    #[inline(always)]
    pub fn peek(&self) -> Option<u8> {
        self.input.get(self.position).copied()
    }

    /// Gets the current byte and advances the position.
    #[inline(always)]
    pub fn next_byte(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.position += 1;
        Some(byte)
    }

    pub fn peek_is(&self, ch: u8) -> bool {
        self.peek() == Some(ch)
    }

    pub fn peek_is_sequence(&self, sequence: &[u8]) -> bool {
        self.input[self.position..].starts_with(sequence)
    }

    /// Consumes `ch` if it is the current byte.
    pub fn consume_if(&mut self, ch: u8) -> bool {
        if self.peek_is(ch) {
            self.position += 1;
            true
        } else {
            false
        }
    }

    /// Consumes `sequence` if the input continues with it.
    pub fn consume_if_sequence(&mut self, sequence: &[u8]) -> bool {
        if self.peek_is_sequence(sequence) {
            self.position += sequence.len();
            true
        } else {
            false
        }
    }

    pub fn is_eof(&self) -> bool {
        self.position >= self.input.len()
    }

    pub fn position(&self) -> usize {
        self.position
    }

    /// Returns up to `k` bytes from the current position as string, for error context.
    pub fn context(&self, k: usize) -> String {
        let end = (self.position + k).min(self.input.len());
        String::from_utf8_lossy(&self.input[self.position.min(end)..end]).into_owned()
    }

    /// Skips whitespace: space, tab, newline and carriage return.
    pub fn skip_whitespace(&mut self) {
        while let Some(b) = self.peek() {
            if b == b' ' || b == b'\t' || b == b'\n' || b == b'\r' {
                self.position += 1;
            } else {
                break;
            }
        }
    }

    /// Skips whitespace and plain `[...]` comments, but stops at `[&` annotations.
    pub fn skip_comment_and_whitespace(&mut self) -> Result<(), ParsingError> {
        loop {
            self.skip_whitespace();
            if self.peek_is(b'[') && !self.peek_is_sequence(b"[&") {
                self.position += 1; // consume '['
                loop {
                    match self.next_byte() {
                        Some(b']') => break,
                        Some(_) => {}
                        None => return Err(ParsingError::unclosed_comment(self)),
                    }
                }
            } else {
                return Ok(());
            }
        }
    }

    /// Parses a label, quoted or unquoted.
    pub fn parse_label(&mut self, delimiters: &[u8]) -> Result<String, ParsingError> {
        self.skip_comment_and_whitespace()?;
        if self.peek_is(b'\'') {
            self.parse_quoted_label()
        } else {
            Ok(self.parse_unquoted_label(delimiters))
        }
    }

    /// Parses a label in single quotes; doubled quotes inside stand for one quote.
    pub fn parse_quoted_label(&mut self) -> Result<String, ParsingError> {
        self.next_byte(); // consume opening '

        let mut label = Vec::new();
        loop {
            match self.next_byte() {
                Some(b'\'') => {
                    if self.consume_if(b'\'') {
                        label.push(b'\'');
                    } else {
                        break;
                    }
                }
                Some(b) => label.push(b),
                None => return Err(ParsingError::unexpected_eof(self)),
            }
        }

        Ok(String::from_utf8_lossy(&label).into_owned())
    }

    /// Parses an unquoted label until any of the given delimiters.
    pub fn parse_unquoted_label(&mut self, delimiters: &[u8]) -> String {
        let start = self.position;
        while let Some(b) = self.peek() {
            if delimiters.contains(&b) {
                break;
            }
            self.position += 1;
        }
        String::from_utf8_lossy(&self.input[start..self.position]).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::ByteParser;

    #[test]
    fn test_skip_comments_stops_at_annotation() {
        let mut parser = ByteParser::from_str(" [one] \n[two]\t[&rate=1]A");
        parser.skip_comment_and_whitespace().unwrap();
        assert!(parser.peek_is_sequence(b"[&"));
        assert_eq!(parser.position(), 14);
    }

    #[test]
    fn test_unclosed_comment() {
        let mut parser = ByteParser::from_str("[never closed");
        assert!(parser.skip_comment_and_whitespace().is_err());
    }

    #[test]
    fn test_quoted_label_with_doubled_quote() {
        let mut parser = ByteParser::from_str("'Baillon''s Crake':1");
        assert_eq!(parser.parse_label(b":,)").unwrap(), "Baillon's Crake");
        assert_eq!(parser.next_byte(), Some(b':'));
    }

    #[test]
    fn test_unquoted_label_until_delimiter() {
        let mut parser = ByteParser::from_str("Kea_2[&x=1]:0.5");
        assert_eq!(parser.parse_unquoted_label(b"[:,)"), "Kea_2");
        assert!(parser.consume_if_sequence(b"[&"));
        assert_eq!(parser.context(3), "x=1");
    }
}

use crate::ParserError;

/// Parser that can parse a `&str`
///
/// Lines and columns are 1-based and counted in characters.
pub struct StrParser<'a> {
    pub line   : usize,
    pub column : usize,
    pub string : &'a str
}

impl<'a> StrParser<'a> {
    /// Create a new parser
    pub fn new(string: &'a str) -> Self {
        Self { line: 1, column: 1, string }
    }

    /// Peek at the next character
    pub fn peek(&self) -> Option<char> {
        self.string.chars().next()
    }

    /// Try to consume a given character
    pub fn consume_char(&mut self, ch: char) -> bool {
        if self.string.starts_with(ch) {
            self.consume_count(ch.len_utf8());
            true
        } else {
            false
        }
    }

    /// Try to consume a given string
    pub fn consume_str(&mut self, s: &str) -> bool {
        if self.string.starts_with(s) {
            self.consume_count(s.len());
            true
        } else {
            false
        }
    }

    /// Consume `count` bytes, `count` has to be on a char boundary
    pub fn consume_count(&mut self, count: usize) {
        let consumed = &self.string[..count];
        match consumed.rfind('\n') {
            Some(idx) => {
                self.line += consumed.matches('\n').count();
                self.column = consumed[idx + 1..].chars().count() + 1;
            },
            None => self.column += consumed.chars().count(),
        }
        self.string = &self.string[count..];
    }

    /// Skip past the next end-of-line
    pub fn consume_to_eol(&mut self) {
        let idx = self.string.find('\n').map_or(self.string.len(), |idx| idx + 1);
        self.consume_count(idx);
    }

    /// Skip whitespace, only crossing lines when `include_newline` is set
    pub fn consume_whitespace(&mut self, include_newline: bool) {
        let idx = self.string
            .find(|ch: char| !ch.is_whitespace() || (!include_newline && ch == '\n'))
            .unwrap_or(self.string.len());
        self.consume_count(idx);
    }

    /// Move the parser to the end (finish parsing)
    pub fn end(&mut self) {
        self.consume_count(self.string.len());
    }

    /// Check if there is still data to parse
    pub fn can_parse(&self) -> bool {
        !self.string.is_empty()
    }

    /// Check if only whitespace is left on the current line
    pub fn at_eol(&self) -> bool {
        let rest = self.string.split('\n').next().unwrap_or("");
        rest.trim().is_empty()
    }

    /// Create an error at the current line and column
    pub fn error(&self, msg: &'static str) -> ParserError {
        ParserError { line: self.line, column: self.column, msg }
    }

    /// Extract a string enclosed by `delimiter`, the delimiter itself can be escaped with a `\`.
    ///
    /// Returns the raw content (escapes are kept), or `None` when the string is not closed on the same line.
    pub fn extract_delimited(&mut self, delimiter: char) -> Option<&'a str> {
        let string = self.string;
        let rest = string.strip_prefix(delimiter)?;

        let mut escaped = false;
        for (idx, ch) in rest.char_indices() {
            match ch {
                '\n' => return None,
                '\\' if !escaped => escaped = true,
                ch if ch == delimiter && !escaped => {
                    let res = &rest[..idx];
                    self.consume_count(delimiter.len_utf8() * 2 + idx);
                    return Some(res);
                },
                _ => escaped = false,
            }
        }
        None
    }

    /// Extract until `stop` matches a character, or until the end of the input
    pub fn extract_until<F: Fn(char) -> bool>(&mut self, stop: F) -> &'a str {
        let string = self.string;
        let idx = string.find(stop).unwrap_or(string.len());
        let res = &string[..idx];
        self.consume_count(idx);
        res
    }
}

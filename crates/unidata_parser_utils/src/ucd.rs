//! Helpers for the line-oriented Unicode Character Database text files
use core::{ops::RangeInclusive, str::Utf8Error};
use std::{
    fs::File,
    io::{self, BufRead, BufReader},
    path::Path,
};

/// Highest valid codepoint
pub const MAX_CODEPOINT : u32 = 0x10FFFF;

/// Codepoint or inclusive codepoint range, as written in the first column of most UCD files
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CodepointRange {
    Single(u32),
    Range(u32, u32),
}

impl CodepointRange {
    /// Parse `XXXX` or `XXXX..YYYY`.
    ///
    /// Returns `None` for invalid hex, a codepoint above `MAX_CODEPOINT` or a range that ends before it begins.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        let range = match s.split_once("..") {
            Some((begin, end)) => Self::Range(parse_codepoint(begin)?, parse_codepoint(end)?),
            None => Self::Single(parse_codepoint(s)?),
        };
        (range.first() <= range.last()).then_some(range)
    }

    pub fn first(&self) -> u32 {
        match *self {
            Self::Single(code) => code,
            Self::Range(begin, _) => begin,
        }
    }

    pub fn last(&self) -> u32 {
        match *self {
            Self::Single(code) => code,
            Self::Range(_, end) => end,
        }
    }

    pub fn contains(&self, code: u32) -> bool {
        self.first() <= code && code <= self.last()
    }

    /// Iterate over all codepoints in the range
    pub fn iter(&self) -> RangeInclusive<u32> {
        self.first()..=self.last()
    }
}

/// Parse a single hexadecimal codepoint, without any prefix
pub fn parse_codepoint(s: &str) -> Option<u32> {
    let s = s.trim();
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u32::from_str_radix(s, 16).ok().filter(|&code| code <= MAX_CODEPOINT)
}

/// Remove a trailing `# comment` and surrounding whitespace
pub fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(idx) => line[..idx].trim(),
        None => line.trim(),
    }
}

/// Split a data line on `separator`, trimming each field
pub fn split_fields(line: &str, separator: char) -> Vec<&str> {
    line.split(separator).map(|field| field.trim()).collect()
}

/// Call `f` with the 1-based line number and content of every line which is not empty or a comment.
///
/// Line endings are removed, other whitespace is kept. A line which is not valid UTF-8 is passed as an error, reading
/// continues with the next line.
pub fn for_each_data_line<F: FnMut(usize, Result<&str, Utf8Error>)>(path: &Path, mut f: F) -> io::Result<()> {
    let file = File::open(path)?;
    let mut data_reader = BufReader::new(file);

    let mut line = Vec::new();
    let mut line_nr = 0;
    while data_reader.read_until(b'\n', &mut line)? != 0 {
        line_nr += 1;
        let content = trim_line_ending(&line);
        let trimmed = trim_ascii_start(content);
        if !trimmed.is_empty() && trimmed[0] != b'#' {
            f(line_nr, core::str::from_utf8(content));
        }
        line.clear();
    }
    Ok(())
}

fn trim_line_ending(mut line: &[u8]) -> &[u8] {
    while let [rest @ .., b'\r' | b'\n'] = line {
        line = rest;
    }
    line
}

fn trim_ascii_start(mut line: &[u8]) -> &[u8] {
    while let [first, rest @ ..] = line {
        if !first.is_ascii_whitespace() {
            break;
        }
        line = rest;
    }
    line
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use super::*;

    #[test]
    fn parses_single_and_range() {
        assert_eq!(CodepointRange::parse("0041"), Some(CodepointRange::Single(0x41)));
        assert_eq!(CodepointRange::parse(" 3400..4DBF "), Some(CodepointRange::Range(0x3400, 0x4DBF)));
    }

    #[test]
    fn rejects_bad_ranges() {
        assert_eq!(CodepointRange::parse("4DBF..3400"), None);
        assert_eq!(CodepointRange::parse("110000"), None);
        assert_eq!(CodepointRange::parse("U+0041"), None);
        assert_eq!(CodepointRange::parse(""), None);
        assert_eq!(CodepointRange::parse("+41"), None);
    }

    #[test]
    fn range_iterates_inclusive() {
        let range = CodepointRange::parse("0030..0039").unwrap();
        assert_eq!(range.iter().count(), 10);
        assert!(range.contains(0x39));
        assert!(!range.contains(0x3A));
    }

    #[test]
    fn strips_comments() {
        assert_eq!(strip_comment("1F600 ; Emoji_Presentation # grinning"), "1F600 ; Emoji_Presentation");
        assert_eq!(strip_comment("  plain  "), "plain");
    }

    #[test]
    fn reads_only_data_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "# header\r\n\r\n0041;A\r\n  # indented comment\n0042;B").unwrap();

        let mut lines = Vec::new();
        for_each_data_line(file.path(), |nr, line| lines.push((nr, line.unwrap().to_string()))).unwrap();
        assert_eq!(lines, vec![(3, "0041;A".to_string()), (5, "0042;B".to_string())]);
    }

    #[test]
    fn invalid_utf8_does_not_stop_reading() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"0041;A\n0042;\xFF\xFE\n# \xFF comment\n0043;C\n").unwrap();

        let mut lines = Vec::new();
        for_each_data_line(file.path(), |nr, line| lines.push((nr, line.ok().map(str::to_string)))).unwrap();
        assert_eq!(lines, vec![
            (1, Some("0041;A".to_string())),
            (2, None),
            (4, Some("0043;C".to_string())),
        ]);
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(for_each_data_line(&dir.path().join("nope.txt"), |_, _| {}).is_err());
    }
}

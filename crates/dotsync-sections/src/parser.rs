//! Section parsing for shared text files.
//!
//! Parses named sections delimited by marker lines:
//! ```text
//! # BEGIN <name>
//! body lines
//! # END <name>
//! ```
//!
//! Parsing works on raw bytes so that files which are not valid UTF-8
//! survive a round trip untouched. The parsed file is an ordered list of
//! [`Chunk`]s whose concatenation reproduces every input line.

use regex::bytes::Regex;
use std::sync::LazyLock;

use crate::error::{Error, Result};

/// Matches an opening marker; capture 1 is the section name.
static BEGIN_MARKER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?-u)^# BEGIN (.+)$").expect("Invalid begin marker regex"));

/// Matches a closing marker; capture 1 is the section name.
static END_MARKER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?-u)^# END (.+)$").expect("Invalid end marker regex"));

/// Returns the section name if `line` is an opening marker.
pub fn match_begin(line: &[u8]) -> Option<&[u8]> {
    BEGIN_MARKER_REGEX
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_bytes())
}

/// Returns the section name if `line` is a closing marker.
pub fn match_end(line: &[u8]) -> Option<&[u8]> {
    END_MARKER_REGEX
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_bytes())
}

/// Split content into lines on `\n`.
///
/// A trailing newline does not produce an extra empty line, so
/// `"a\nb\n"` and `"a\nb"` both yield two lines.
pub fn split_lines(content: &[u8]) -> Vec<&[u8]> {
    let mut lines: Vec<&[u8]> = content.split(|b| *b == b'\n').collect();
    if lines.last().is_some_and(|last| last.is_empty()) {
        lines.pop();
    }
    lines
}

/// Line indices of one well-formed BEGIN/END pair (both inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span<'a> {
    pub start: usize,
    pub end: usize,
    pub name: &'a [u8],
}

/// A run of lines that is either untouched raw text or one named section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk<'a> {
    /// `Some(name)` for a section, `None` for raw text.
    pub name: Option<&'a [u8]>,
    /// The lines of the chunk, markers included for sections.
    pub lines: Vec<&'a [u8]>,
}

impl<'a> Chunk<'a> {
    pub fn raw(lines: Vec<&'a [u8]>) -> Self {
        Self { name: None, lines }
    }

    pub fn section(name: &'a [u8], lines: Vec<&'a [u8]>) -> Self {
        Self {
            name: Some(name),
            lines,
        }
    }

    pub fn is_section(&self) -> bool {
        self.name.is_some()
    }

    /// Whether this chunk is the section called `name`.
    pub fn is_named(&self, name: &[u8]) -> bool {
        self.name == Some(name)
    }
}

/// Locate every well-formed section in `lines`.
///
/// Malformed markers belonging to `target` are an error: an opening marker
/// without its closing marker, or a closing marker without an opening one.
/// Malformed markers of any other section are left as raw text.
pub fn find_valid_spans<'a>(lines: &[&'a [u8]], target: &[u8]) -> Result<Vec<Span<'a>>> {
    let mut spans = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        let Some(name) = match_begin(line) else {
            if match_end(line) == Some(target) {
                return Err(Error::OrphanedEnd {
                    name: String::from_utf8_lossy(target).into_owned(),
                    line: i + 1,
                });
            }
            i += 1;
            continue;
        };

        match find_end_marker(lines, i + 1, name) {
            Some(end) => {
                spans.push(Span { start: i, end, name });
                i = end + 1;
            }
            None if name == target => {
                return Err(Error::UnclosedSection {
                    name: String::from_utf8_lossy(name).into_owned(),
                    line: i + 1,
                });
            }
            None => i += 1,
        }
    }

    Ok(spans)
}

/// Look ahead for the closing marker of `name`.
///
/// A repeated opening marker for the same name ends the search; the first
/// opening marker is then considered broken.
fn find_end_marker(lines: &[&[u8]], from: usize, name: &[u8]) -> Option<usize> {
    for (offset, line) in lines[from..].iter().enumerate() {
        if match_end(line) == Some(name) {
            return Some(from + offset);
        }
        if match_begin(line) == Some(name) {
            break;
        }
    }
    None
}

/// Group `lines` into raw and section chunks, validating `target`.
pub fn parse_chunks<'a>(lines: &[&'a [u8]], target: &[u8]) -> Result<Vec<Chunk<'a>>> {
    let spans = find_valid_spans(lines, target)?;
    let mut chunks = Vec::with_capacity(spans.len() * 2 + 1);
    let mut cursor = 0;

    for span in spans {
        if span.start > cursor {
            chunks.push(Chunk::raw(lines[cursor..span.start].to_vec()));
        }
        chunks.push(Chunk::section(span.name, lines[span.start..=span.end].to_vec()));
        cursor = span.end + 1;
    }

    if cursor < lines.len() {
        chunks.push(Chunk::raw(lines[cursor..].to_vec()));
    }

    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_markers() {
        assert_eq!(match_begin(b"# BEGIN disks"), Some(&b"disks"[..]));
        assert_eq!(match_end(b"# END disks"), Some(&b"disks"[..]));
        assert_eq!(match_begin(b" # BEGIN disks"), None);
        assert_eq!(match_begin(b"# BEGIN "), None);
        assert_eq!(match_end(b"# BEGIN disks"), None);
    }

    #[test]
    fn test_split_lines_drops_single_trailing_newline() {
        assert!(split_lines(b"").is_empty());
        assert_eq!(split_lines(b"a\nb\n"), vec![&b"a"[..], &b"b"[..]]);
        assert_eq!(split_lines(b"a\nb"), vec![&b"a"[..], &b"b"[..]]);
        assert_eq!(split_lines(b"a\n\n"), vec![&b"a"[..], &b""[..]]);
    }

    #[test]
    fn test_parse_raw_only() {
        let lines = split_lines(b"one\ntwo\n");
        let chunks = parse_chunks(&lines, b"x").unwrap();
        assert_eq!(chunks, vec![Chunk::raw(lines.clone())]);
    }

    #[test]
    fn test_parse_section_between_raw() {
        let lines = split_lines(b"head\n# BEGIN a\nbody\n# END a\ntail\n");
        let chunks = parse_chunks(&lines, b"a").unwrap();
        assert_eq!(chunks.len(), 3);
        assert!(!chunks[0].is_section());
        assert!(chunks[1].is_named(b"a"));
        assert_eq!(chunks[1].lines.len(), 3);
        assert!(!chunks[2].is_section());
    }

    #[test]
    fn test_unclosed_target_is_error() {
        let lines = split_lines(b"# BEGIN disks\nbody\n");
        let err = parse_chunks(&lines, b"disks").unwrap_err();
        assert!(matches!(err, Error::UnclosedSection { line: 1, .. }));
    }

    #[test]
    fn test_unclosed_other_section_is_raw() {
        let lines = split_lines(b"# BEGIN other\nbody\n");
        let chunks = parse_chunks(&lines, b"disks").unwrap();
        assert_eq!(chunks.len(), 1);
        assert!(!chunks[0].is_section());
    }

    #[test]
    fn test_orphaned_end_of_target_is_error() {
        let lines = split_lines(b"text\n# END disks\n");
        let err = parse_chunks(&lines, b"disks").unwrap_err();
        assert!(matches!(err, Error::OrphanedEnd { line: 2, .. }));
    }

    #[test]
    fn test_repeated_begin_breaks_first_opening() {
        let lines = split_lines(b"# BEGIN a\nx\n# BEGIN a\ny\n# END a\n");
        let spans = find_valid_spans(&lines, b"b").unwrap();
        assert_eq!(
            spans,
            vec![Span {
                start: 2,
                end: 4,
                name: b"a"
            }]
        );
    }
}

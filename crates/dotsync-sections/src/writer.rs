//! Section writing for shared text files.
//!
//! Provides in-memory merge and removal of one named section. Sections are
//! kept in ascending byte order of their names; raw text around them is
//! never reordered or rewritten.

use crate::error::Result;
use crate::parser::{Chunk, parse_chunks, split_lines};

/// Outcome of a merge or removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Merged {
    /// Full serialized file content.
    pub content: Vec<u8>,
    /// Whether `content` differs from the input bytes.
    pub changed: bool,
}

/// Creates the opening marker for a section.
pub fn begin_marker(name: &str) -> Vec<u8> {
    format!("# BEGIN {}", name).into_bytes()
}

/// Creates the closing marker for a section.
pub fn end_marker(name: &str) -> Vec<u8> {
    format!("# END {}", name).into_bytes()
}

/// Insert `section` into `chunks` at its sorted position.
///
/// An existing section of the same name is replaced in place. Otherwise the
/// section goes right before the first section whose name sorts after it,
/// or at the end. Later copies of the same name are dropped.
pub fn merge_chunks<'a>(chunks: Vec<Chunk<'a>>, section: Chunk<'a>) -> Vec<Chunk<'a>> {
    let Some(name) = section.name else {
        let mut chunks = chunks;
        chunks.push(section);
        return chunks;
    };

    let mut merged = Vec::with_capacity(chunks.len() + 1);
    let mut pending = Some(section);

    for chunk in chunks {
        match (chunk.name, pending.is_some()) {
            (Some(existing), _) if existing == name => {
                // First occurrence takes the new content, duplicates vanish.
                if let Some(section) = pending.take() {
                    merged.push(section);
                }
            }
            (Some(existing), true) if name < existing => {
                if let Some(section) = pending.take() {
                    merged.push(section);
                }
                merged.push(chunk);
            }
            _ => merged.push(chunk),
        }
    }

    if let Some(section) = pending {
        merged.push(section);
    }
    merged
}

/// Concatenate every chunk line, each followed by `\n`.
pub fn serialize(chunks: &[Chunk<'_>]) -> Vec<u8> {
    let size = chunks
        .iter()
        .flat_map(|chunk| chunk.lines.iter())
        .map(|line| line.len() + 1)
        .sum();
    let mut out = Vec::with_capacity(size);
    for line in chunks.iter().flat_map(|chunk| chunk.lines.iter()) {
        out.extend_from_slice(line);
        out.push(b'\n');
    }
    out
}

/// Merge the section `name` with body `section_lines` into `existing`.
///
/// # Errors
///
/// Returns a malformed-marker error if `existing` holds a broken opening or
/// closing marker for `name`. Nothing is produced in that case, so callers
/// leave the file untouched.
///
/// # Example
/// ```
/// use dotsync_sections::writer::merge;
///
/// let merged = merge(b"raw\n", &[&b"UUID=1 /mnt ext4"[..]], "disks").unwrap();
/// assert_eq!(merged.content, b"raw\n# BEGIN disks\nUUID=1 /mnt ext4\n# END disks\n");
/// assert!(merged.changed);
/// ```
pub fn merge(existing: &[u8], section_lines: &[&[u8]], name: &str) -> Result<Merged> {
    let lines = split_lines(existing);
    let chunks = parse_chunks(&lines, name.as_bytes())?;

    let begin = begin_marker(name);
    let end = end_marker(name);
    let mut wrapped: Vec<&[u8]> = Vec::with_capacity(section_lines.len() + 2);
    wrapped.push(&begin);
    wrapped.extend_from_slice(section_lines);
    wrapped.push(&end);

    let merged = merge_chunks(chunks, Chunk::section(name.as_bytes(), wrapped));
    let content = serialize(&merged);
    let changed = content != existing;
    Ok(Merged { content, changed })
}

/// Drop the section `name` from `existing`, keeping everything else.
///
/// Removing a section that is not present reports `changed = false` and
/// returns the input bytes unchanged.
pub fn remove(existing: &[u8], name: &str) -> Result<Merged> {
    let lines = split_lines(existing);
    let chunks = parse_chunks(&lines, name.as_bytes())?;

    if !chunks.iter().any(|chunk| chunk.is_named(name.as_bytes())) {
        return Ok(Merged {
            content: existing.to_vec(),
            changed: false,
        });
    }

    let kept: Vec<Chunk<'_>> = chunks
        .into_iter()
        .filter(|chunk| !chunk.is_named(name.as_bytes()))
        .collect();
    let content = serialize(&kept);
    let changed = content != existing;
    Ok(Merged { content, changed })
}

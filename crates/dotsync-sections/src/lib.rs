//! Named section merging for dotsync.
//!
//! dotsync owns whole files in the destination tree, but some system files
//! (`/etc/fstab`, `/etc/hosts`, ...) are shared with their distribution or
//! an administrator. For those, a source file named
//! `<target>.<name>-section` contributes one delimited section:
//!
//! ```text
//! # BEGIN <name>
//! lines from the section source
//! # END <name>
//! ```
//!
//! Sections are kept sorted by name; everything outside them is preserved
//! byte for byte. A broken marker pair of the section being written aborts
//! the update and leaves the file as it was.

pub mod error;
pub mod file;
pub mod naming;
pub mod parser;
pub mod writer;

pub use error::{Error, Result};
pub use file::{ModePolicy, merge_section_file, remove_section_file};
pub use naming::SectionSource;
pub use parser::{Chunk, Span, find_valid_spans, match_begin, match_end, parse_chunks, split_lines};
pub use writer::{Merged, merge, remove};

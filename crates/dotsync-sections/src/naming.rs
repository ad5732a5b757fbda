//! Section source file naming: `<target>.<name>-section`.

use regex::Regex;
use std::sync::LazyLock;

static SECTION_FILE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+)\.([^./]+)-section$").expect("Invalid section file regex"));

/// A source file that contributes one section to a shared target file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionSource {
    /// Relative key of the target file, e.g. `etc/fstab`.
    pub target: String,
    /// Section name, e.g. `external-disks`.
    pub name: String,
}

impl SectionSource {
    /// Recognize a section source from its relative key.
    ///
    /// # Example
    /// ```
    /// use dotsync_sections::SectionSource;
    ///
    /// let source = SectionSource::parse("etc/fstab.external-disks-section").unwrap();
    /// assert_eq!(source.target, "etc/fstab");
    /// assert_eq!(source.name, "external-disks");
    /// ```
    pub fn parse(key: &str) -> Option<Self> {
        let caps = SECTION_FILE_REGEX.captures(key)?;
        Some(Self {
            target: caps[1].to_string(),
            name: caps[2].to_string(),
        })
    }
}

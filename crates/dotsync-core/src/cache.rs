//! Per-source metadata cache for the watch loop

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use dotsync_fs::FileMeta;

/// Last seen metadata of every source file, keyed by absolute path.
///
/// An entry is removed whenever syncing its path fails, and the whole cache
/// is dropped periodically so destination drift gets noticed.
#[derive(Debug, Default, Clone)]
pub struct MetaCache {
    entries: HashMap<PathBuf, FileMeta>,
}

impl MetaCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `current` for `path` and report whether it equals the
    /// previously recorded snapshot.
    pub fn refresh(&mut self, path: &Path, current: FileMeta) -> bool {
        match self.entries.insert(path.to_path_buf(), current) {
            Some(previous) => previous == current,
            None => false,
        }
    }

    /// Forget `path` so that its next pass does a full comparison.
    pub fn invalidate(&mut self, path: &Path) {
        self.entries.remove(path);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};

    fn meta(size: u64) -> FileMeta {
        FileMeta {
            modified: SystemTime::UNIX_EPOCH + Duration::from_secs(1_000),
            size,
            mode: 0o100644,
        }
    }

    #[test]
    fn first_sighting_is_a_change() {
        let mut cache = MetaCache::new();
        assert!(!cache.refresh(Path::new("/a"), meta(1)));
        assert!(cache.refresh(Path::new("/a"), meta(1)));
    }

    #[test]
    fn differing_snapshot_is_a_change_and_replaces_entry() {
        let mut cache = MetaCache::new();
        cache.refresh(Path::new("/a"), meta(1));
        assert!(!cache.refresh(Path::new("/a"), meta(2)));
        assert!(cache.refresh(Path::new("/a"), meta(2)));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn invalidate_forces_change() {
        let mut cache = MetaCache::new();
        cache.refresh(Path::new("/a"), meta(1));
        cache.invalidate(Path::new("/a"));
        assert!(cache.is_empty());
        assert!(!cache.refresh(Path::new("/a"), meta(1)));
    }
}

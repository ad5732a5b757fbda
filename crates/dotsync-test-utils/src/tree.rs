//! [`TestTree`] fixture for sync scenarios.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use filetime::FileTime;
use tempfile::TempDir;

/// A temporary source tree and destination tree, each in its own directory.
///
/// # Example
///
/// ```rust,no_run
/// use dotsync_test_utils::TestTree;
///
/// let tree = TestTree::new();
/// tree.write_src("a.txt", "hi\n");
/// tree.set_src_mtime("a.txt", 1_000);
/// tree.assert_dst_not_exists("a.txt");
/// ```
pub struct TestTree {
    src: TempDir,
    dst: TempDir,
}

impl Default for TestTree {
    fn default() -> Self {
        Self::new()
    }
}

impl TestTree {
    /// Create two empty temporary directories.
    pub fn new() -> Self {
        Self {
            src: TempDir::new().unwrap(),
            dst: TempDir::new().unwrap(),
        }
    }

    pub fn src(&self) -> &Path {
        self.src.path()
    }

    pub fn dst(&self) -> &Path {
        self.dst.path()
    }

    pub fn src_path(&self, rel: &str) -> PathBuf {
        self.src().join(rel)
    }

    pub fn dst_path(&self, rel: &str) -> PathBuf {
        self.dst().join(rel)
    }

    /// Write `content` to `rel` under the source, creating parents.
    pub fn write_src(&self, rel: &str, content: impl AsRef<[u8]>) -> PathBuf {
        write_with_parents(&self.src_path(rel), content.as_ref())
    }

    /// Write `content` to `rel` under the destination, creating parents.
    pub fn write_dst(&self, rel: &str, content: impl AsRef<[u8]>) -> PathBuf {
        write_with_parents(&self.dst_path(rel), content.as_ref())
    }

    pub fn read_src(&self, rel: &str) -> String {
        read(&self.src_path(rel))
    }

    pub fn read_dst(&self, rel: &str) -> String {
        read(&self.dst_path(rel))
    }

    /// Set the modification time of a source file to `secs` after the epoch.
    pub fn set_src_mtime(&self, rel: &str, secs: u64) {
        set_mtime(&self.src_path(rel), secs);
    }

    /// Set the modification time of a destination file to `secs` after the epoch.
    pub fn set_dst_mtime(&self, rel: &str, secs: u64) {
        set_mtime(&self.dst_path(rel), secs);
    }

    pub fn dst_mtime(&self, rel: &str) -> SystemTime {
        fs::metadata(self.dst_path(rel))
            .and_then(|m| m.modified())
            .unwrap_or_else(|e| panic!("Could not stat {}: {}", rel, e))
    }

    /// Assert that `rel` exists in the destination.
    ///
    /// # Panics
    /// Panics with a descriptive message if the path does not exist.
    pub fn assert_dst_exists(&self, rel: &str) {
        let path = self.dst_path(rel);
        assert!(path.exists(), "Expected file to exist: {}", path.display());
    }

    /// Assert that `rel` does **not** exist in the destination.
    ///
    /// # Panics
    /// Panics with a descriptive message if the path exists.
    pub fn assert_dst_not_exists(&self, rel: &str) {
        let path = self.dst_path(rel);
        assert!(
            !path.exists(),
            "Expected file NOT to exist: {}",
            path.display()
        );
    }

    /// Assert that the destination file `rel` contains `content`.
    ///
    /// # Panics
    /// Panics if the file cannot be read or does not contain `content`.
    pub fn assert_dst_contains(&self, rel: &str, content: &str) {
        let actual = self.read_dst(rel);
        assert!(
            actual.contains(content),
            "File {} does not contain expected content.\nExpected: {}\nActual: {}",
            rel,
            content,
            actual
        );
    }
}

#[cfg(unix)]
impl TestTree {
    pub fn set_src_mode(&self, rel: &str, mode: u32) {
        set_mode(&self.src_path(rel), mode);
    }

    pub fn set_dst_mode(&self, rel: &str, mode: u32) {
        set_mode(&self.dst_path(rel), mode);
    }

    /// Permission bits (`& 0o777`) of a source file.
    pub fn src_mode(&self, rel: &str) -> u32 {
        mode(&self.src_path(rel))
    }

    /// Permission bits (`& 0o777`) of a destination file.
    pub fn dst_mode(&self, rel: &str) -> u32 {
        mode(&self.dst_path(rel))
    }
}

fn write_with_parents(path: &Path, content: &[u8]) -> PathBuf {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
    path.to_path_buf()
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_else(|_| panic!("Could not read file: {}", path.display()))
}

fn set_mtime(path: &Path, secs: u64) {
    let time = SystemTime::UNIX_EPOCH + Duration::from_secs(secs);
    filetime::set_file_mtime(path, FileTime::from_system_time(time)).unwrap();
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode)).unwrap();
}

#[cfg(unix)]
fn mode(path: &Path) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path).unwrap().permissions().mode() & 0o777
}

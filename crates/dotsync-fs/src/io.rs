//! Lock-guarded content transfer
//!
//! A destination file is never truncated before an exclusive advisory lock
//! is held on it, so cooperating readers that take a shared lock never see
//! a half-written file. After the handle is closed and the modification
//! time is copied, the content is compared against the source once more;
//! a mismatch means something wrote to the file in between, and the file's
//! mtime is bumped to "now" so the next pass notices it.
//!
//! The verification narrows the race between two concurrent writers of the
//! same file but does not close it.

use std::fs::{DirBuilder, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::time::SystemTime;

use filetime::FileTime;
use tracing::{debug, warn};

use crate::platform::Capabilities;
use crate::{Error, Result};

const VERIFY_CHUNK_SIZE: usize = 64 * 1024;

/// Result of comparing the destination with its source after a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    /// The destination holds exactly the source bytes.
    Matched,
    /// The destination changed after the write; its mtime was bumped.
    Mismatch,
}

/// Open `path` for reading and writing without truncating it, creating it
/// with `create_mode` if it does not exist.
pub fn open_for_update(path: &Path, create_mode: u32) -> Result<File> {
    let mut options = OpenOptions::new();
    options.read(true).write(true).create(true).truncate(false);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(create_mode);
    }
    #[cfg(not(unix))]
    let _ = create_mode;
    options.open(path).map_err(|e| Error::io(path, e))
}

/// Create `path` and any missing parents with `mode` (before the umask).
///
/// Succeeds if `path` already is a directory, including through a symlink.
pub fn create_dir_all(path: &Path, mode: u32) -> Result<()> {
    let mut builder = DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;
    builder.create(path).map_err(|e| Error::io(path, e))
}

/// Read everything from the current position of an already locked handle.
pub fn read_locked(file: &mut File, path: &Path) -> Result<Vec<u8>> {
    let mut content = Vec::new();
    file.read_to_end(&mut content)
        .map_err(|e| Error::io(path, e))?;
    Ok(content)
}

/// Replace the whole content of an already locked handle.
pub fn rewrite_locked(file: &mut File, path: &Path, data: &[u8]) -> Result<()> {
    file.set_len(0).map_err(|e| Error::io(path, e))?;
    file.seek(SeekFrom::Start(0))
        .map_err(|e| Error::io(path, e))?;
    file.write_all(data).map_err(|e| Error::io(path, e))?;
    Ok(())
}

/// Copy `src` over `dst` under the locking protocol.
///
/// `mode` is forced onto the destination and `modified` becomes its
/// modification time. Collecting a file back into the source uses the same
/// function with the roles swapped.
pub fn install_file(
    caps: &Capabilities,
    src: &Path,
    dst: &Path,
    modified: SystemTime,
    mode: u32,
) -> Result<Verification> {
    debug!(src = %src.display(), dst = %dst.display(), "Installing file");

    let mut source = File::open(src).map_err(|e| Error::io(src, e))?;
    caps.locker
        .lock(&source, false)
        .map_err(|e| Error::lock(src, e))?;

    {
        let mut dest = open_for_update(dst, mode)?;
        caps.locker
            .lock(&dest, true)
            .map_err(|e| Error::lock(dst, e))?;

        // Only safe to reset the size now that the lock is held.
        dest.set_len(0).map_err(|e| Error::io(dst, e))?;
        io::copy(&mut source, &mut dest).map_err(|e| Error::io(dst, e))?;

        // Through the handle, so a swapped-in symlink cannot redirect it.
        caps.permissions
            .apply(&dest, mode)
            .map_err(|e| Error::io(dst, e))?;
        // Dropping the handle releases the lock.
    }

    let stamp = FileTime::from_system_time(modified);
    if let Err(e) = filetime::set_file_times(dst, stamp, stamp) {
        warn!(path = %dst.display(), error = %e, "Failed to set mtime");
    }

    verify_content(caps, &mut source, dst)
}

/// Compare `dst` with `source` byte for byte under a shared lock.
///
/// On mismatch the destination's mtime is set to the current time instead
/// of failing, so the next staleness check picks the file up again.
pub fn verify_content(caps: &Capabilities, source: &mut File, dst: &Path) -> Result<Verification> {
    source
        .seek(SeekFrom::Start(0))
        .map_err(|e| Error::io(dst, e))?;

    let dest = File::open(dst).map_err(|e| Error::io(dst, e))?;
    caps.locker
        .lock(&dest, false)
        .map_err(|e| Error::lock(dst, e))?;

    if streams_equal(&mut *source, &dest).map_err(|e| Error::io(dst, e))? {
        return Ok(Verification::Matched);
    }

    warn!(path = %dst.display(), "Content mismatch detected, updating mtime to force sync");
    filetime::set_file_mtime(dst, FileTime::now()).map_err(|e| Error::io(dst, e))?;
    Ok(Verification::Mismatch)
}

/// Whether two readers yield identical byte streams.
pub fn streams_equal(mut a: impl Read, mut b: impl Read) -> io::Result<bool> {
    let mut buf_a = vec![0u8; VERIFY_CHUNK_SIZE];
    let mut buf_b = vec![0u8; VERIFY_CHUNK_SIZE];
    loop {
        let n = read_full(&mut a, &mut buf_a)?;
        let m = read_full(&mut b, &mut buf_b)?;
        if n != m || buf_a[..n] != buf_b[..m] {
            return Ok(false);
        }
        if n == 0 {
            return Ok(true);
        }
    }
}

fn read_full(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

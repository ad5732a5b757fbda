//! OS capabilities consumed by the reconciliation core
//!
//! The core never calls locking, chmod or chown primitives directly. It goes
//! through the three traits below, bundled as [`Capabilities`], so that
//! tests can substitute failing or recording implementations and other
//! platforms can plug in their own semantics.

use std::fs::{self, File};
use std::io;
use std::path::Path;

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::meta::{PERMISSION_MASK, mode_of};

/// Advisory file locking.
pub trait Locker: Send + Sync {
    /// Block until a shared or exclusive advisory lock is held on `file`.
    ///
    /// The lock is released when the handle is closed.
    fn lock(&self, file: &File, exclusive: bool) -> io::Result<()>;
}

/// Permission computation and enforcement.
pub trait PermissionPolicy: Send + Sync {
    /// Compute destination permission bits from a source mode.
    fn calculate_permissions(&self, source_mode: u32, umask: u32, everyone: bool) -> u32;

    /// Apply permission bits through an open handle.
    fn apply(&self, file: &File, mode: u32) -> io::Result<()>;

    /// Make sure every file below `dir` carries the executable bits allowed
    /// by `umask`. Returns the number of files that were modified.
    fn ensure_executable_bits(&self, dir: &Path, umask: u32) -> usize;
}

/// Ownership transfer for files created on behalf of another user.
pub trait OwnershipFixer: Send + Sync {
    /// Give `file` the owner and group of `reference_dir`, when permitted.
    fn ensure_ownership(&self, file: &File, reference_dir: &Path) -> io::Result<()>;
}

/// `flock`-style advisory locks via `fs2`.
#[derive(Debug, Default, Clone, Copy)]
pub struct AdvisoryLocker;

impl Locker for AdvisoryLocker {
    fn lock(&self, file: &File, exclusive: bool) -> io::Result<()> {
        if exclusive {
            fs2::FileExt::lock_exclusive(file)
        } else {
            fs2::FileExt::lock_shared(file)
        }
    }
}

/// Unix mode-bit semantics (no-ops elsewhere).
#[derive(Debug, Default, Clone, Copy)]
pub struct NativePermissions;

impl PermissionPolicy for NativePermissions {
    fn calculate_permissions(&self, source_mode: u32, umask: u32, everyone: bool) -> u32 {
        calculate_permissions(source_mode, umask, everyone)
    }

    #[cfg(unix)]
    fn apply(&self, file: &File, mode: u32) -> io::Result<()> {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(mode & PERMISSION_MASK))
    }

    #[cfg(not(unix))]
    fn apply(&self, file: &File, mode: u32) -> io::Result<()> {
        let mut perms = file.metadata()?.permissions();
        perms.set_readonly(mode & 0o200 == 0);
        file.set_permissions(perms)
    }

    #[cfg(unix)]
    fn ensure_executable_bits(&self, dir: &Path, umask: u32) -> usize {
        use std::os::unix::fs::PermissionsExt;

        let target_bits = 0o111 & !umask;
        if target_bits == 0 || !dir.is_dir() {
            return 0;
        }

        let mut updated = 0;
        for entry in WalkDir::new(dir) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(dir = %dir.display(), error = %e, "Error scanning bin directory");
                    continue;
                }
            };
            if entry.file_type().is_dir() {
                continue;
            }
            // Follow symlinks so the link target gets the bits.
            let Ok(meta) = fs::metadata(entry.path()) else {
                continue;
            };
            if !meta.is_file() {
                continue;
            }
            let mode = mode_of(&meta) & PERMISSION_MASK;
            if mode & target_bits == target_bits {
                continue;
            }
            match fs::set_permissions(entry.path(), fs::Permissions::from_mode(mode | target_bits)) {
                Ok(()) => {
                    debug!(path = %entry.path().display(), "Added executable bits");
                    updated += 1;
                }
                Err(e) => {
                    warn!(path = %entry.path().display(), error = %e, "Failed to set executable bits");
                }
            }
        }
        updated
    }

    #[cfg(not(unix))]
    fn ensure_executable_bits(&self, _dir: &Path, _umask: u32) -> usize {
        0
    }
}

/// Chown-to-parent when running as root.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeOwnership;

impl OwnershipFixer for NativeOwnership {
    #[cfg(unix)]
    fn ensure_ownership(&self, file: &File, reference_dir: &Path) -> io::Result<()> {
        use std::os::unix::fs::MetadataExt;

        if !is_root() {
            return Ok(());
        }
        let meta = fs::metadata(reference_dir)?;
        std::os::unix::fs::fchown(file, Some(meta.uid()), Some(meta.gid()))
    }

    #[cfg(not(unix))]
    fn ensure_ownership(&self, _file: &File, _reference_dir: &Path) -> io::Result<()> {
        Ok(())
    }
}

/// The full set of capabilities handed to the core.
pub struct Capabilities {
    pub locker: Box<dyn Locker>,
    pub permissions: Box<dyn PermissionPolicy>,
    pub ownership: Box<dyn OwnershipFixer>,
}

impl Capabilities {
    /// Capabilities backed by the running operating system.
    pub fn native() -> Self {
        Self {
            locker: Box::new(AdvisoryLocker),
            permissions: Box::new(NativePermissions),
            ownership: Box::new(NativeOwnership),
        }
    }

    /// Replace the locker, keeping the other capabilities.
    pub fn with_locker(mut self, locker: impl Locker + 'static) -> Self {
        self.locker = Box::new(locker);
        self
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::native()
    }
}

impl std::fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Capabilities").finish_non_exhaustive()
    }
}

/// Compute destination permission bits following Unix conventions.
///
/// Without `everyone` the source permission bits are masked by `umask`.
/// With `everyone`, read is granted to all, and the owner's write and
/// execute bits are mirrored onto group and other before masking.
#[cfg(unix)]
pub fn calculate_permissions(source_mode: u32, umask: u32, everyone: bool) -> u32 {
    if !everyone {
        return source_mode & 0o777 & !umask;
    }
    let mut bits = 0o444;
    if source_mode & 0o200 != 0 {
        bits |= 0o222;
    }
    if source_mode & 0o100 != 0 {
        bits |= 0o111;
    }
    bits & !umask
}

/// Compute destination permission bits. Source bits are kept as-is.
#[cfg(not(unix))]
pub fn calculate_permissions(source_mode: u32, _umask: u32, _everyone: bool) -> u32 {
    source_mode & 0o777
}

/// Set the process umask when `requested` is given, otherwise read the
/// current one without changing it. Returns the umask in effect.
#[cfg(unix)]
pub fn apply_umask(requested: Option<u32>) -> u32 {
    use nix::libc::mode_t;
    use nix::sys::stat::{Mode, umask};

    match requested {
        Some(value) => {
            umask(Mode::from_bits_truncate(value as mode_t));
            value & 0o777
        }
        None => {
            let current = umask(Mode::empty());
            umask(current);
            current.bits() as u32
        }
    }
}

/// Umask is not meaningful here; always 0.
#[cfg(not(unix))]
pub fn apply_umask(_requested: Option<u32>) -> u32 {
    0
}

/// Whether the process runs with an effective uid of 0.
#[cfg(unix)]
pub fn is_root() -> bool {
    nix::unistd::Uid::effective().is_root()
}

/// Whether the process runs with elevated privileges. Always false here.
#[cfg(not(unix))]
pub fn is_root() -> bool {
    false
}

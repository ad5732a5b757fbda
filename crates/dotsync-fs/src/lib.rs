//! Filesystem primitives for dotsync
//!
//! Provides metadata snapshots, relative path keys, the OS capability
//! interfaces (locking, permissions, ownership) and the locked write
//! protocol used to transfer file content.

pub mod error;
pub mod io;
pub mod meta;
pub mod path;
pub mod platform;

pub use error::{Error, Result};
pub use io::{Verification, create_dir_all, install_file};
pub use meta::{FileMeta, PERMISSION_MASK};
pub use path::{relative_key, resolve_key};
pub use platform::{
    AdvisoryLocker, Capabilities, Locker, NativeOwnership, NativePermissions, OwnershipFixer,
    PermissionPolicy, apply_umask, calculate_permissions, is_root,
};

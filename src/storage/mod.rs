//! Persisted client state.
//!
//! The browser front end keeps its session in local storage under a handful of
//! well-known keys. [`ClientStorage`] is that key/value surface: each entry is
//! independently readable and writable, and [`ClientStorage::remove_all`]
//! clears a set of keys in one operation so identity data never ends up half
//! deleted.
//!
//! - [`MemoryStorage`]: in-process map, for tests and embedding
//! - [`FileStorage`]: JSON document on disk, used by the CLI

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use crate::error::Result;

/// Well-known storage keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StorageKey {
    /// Session token.
    Token,
    /// Idle deadline, epoch milliseconds.
    SessionTimeout,
    UserId,
    UserEmail,
    UserRole,
    UserFirstName,
    UserLastName,
}

impl StorageKey {
    /// Every key that describes the signed-in identity.
    pub const IDENTITY: [StorageKey; 7] = [
        StorageKey::Token,
        StorageKey::SessionTimeout,
        StorageKey::UserId,
        StorageKey::UserEmail,
        StorageKey::UserRole,
        StorageKey::UserFirstName,
        StorageKey::UserLastName,
    ];

    /// Key name as persisted.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Token => "token",
            Self::SessionTimeout => "session_timeout",
            Self::UserId => "userId",
            Self::UserEmail => "userEmail",
            Self::UserRole => "userRole",
            Self::UserFirstName => "userFirstName",
            Self::UserLastName => "userLastName",
        }
    }
}

impl std::fmt::Display for StorageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key/value store for client session state.
pub trait ClientStorage: Send + Sync + std::fmt::Debug {
    /// Read one entry.
    fn get(&self, key: StorageKey) -> Result<Option<String>>;

    /// Write one entry.
    fn set(&self, key: StorageKey, value: &str) -> Result<()>;

    /// Remove one entry. Removing a missing key is not an error.
    fn remove(&self, key: StorageKey) -> Result<()>;

    /// Write several entries in one operation.
    fn set_all(&self, entries: &[(StorageKey, String)]) -> Result<()>;

    /// Remove several entries in one operation.
    fn remove_all(&self, keys: &[StorageKey]) -> Result<()>;
}

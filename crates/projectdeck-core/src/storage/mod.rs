//! Durable key-value storage for session data.
//!
//! Every backend implements `KeyValueStore`:
//! - `FileStore`: a JSON document in the user data directory
//! - `KeyringStore`: the OS keychain via the `keyring` crate
//! - `MemoryStore`: an in-process map, lost on exit

pub mod file;
pub mod keychain;
pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

pub use file::FileStore;
pub use keychain::KeyringStore;
pub use memory::MemoryStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage file is corrupt: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Keychain error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("Storage task failed: {0}")]
    Task(String),
}

/// Asynchronous, fallible string store.
///
/// Implementations serialize their own operations; callers share one
/// instance behind an `Arc` without extra locking.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a value. A missing key is `Ok(None)`, not an error.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove a value. Removing a missing key succeeds.
    async fn remove(&self, key: &str) -> Result<(), StoreError>;
}

use async_trait::async_trait;
use keyring::Entry;
use tracing::debug;

use super::{KeyValueStore, StoreError};

/// Keychain service name used when none is given
pub const DEFAULT_SERVICE: &str = "projectdeck";

/// Key-value store backed by the OS keychain.
///
/// Each key becomes one keychain entry under the store's service name.
/// Keychain calls block, so they run on Tokio's blocking pool.
#[derive(Debug, Clone)]
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    async fn with_entry<T, F>(&self, key: &str, op: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(Entry) -> Result<T, keyring::Error> + Send + 'static,
    {
        let service = self.service.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || {
            let entry = Entry::new(&service, &key)?;
            op(entry)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
        .map_err(StoreError::from)
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new(DEFAULT_SERVICE)
    }
}

#[async_trait]
impl KeyValueStore for KeyringStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.with_entry(key, |entry| match entry.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e),
        })
        .await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let value = value.to_string();
        self.with_entry(key, move |entry| entry.set_password(&value))
            .await?;
        debug!(service = %self.service, key, "Stored value in keychain");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.with_entry(key, |entry| match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e),
        })
        .await
    }
}

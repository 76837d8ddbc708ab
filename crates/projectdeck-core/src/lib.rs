//! Core library for projectdeck.
//!
//! - `auth`: the `SessionManager` that owns the login token's lifecycle
//! - `storage`: durable key-value backends the session is persisted to
//! - `api`: REST client for the login endpoint and the project list
//! - `config`: user configuration and backend selection
//! - `models`: data types returned by the API

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod storage;

pub use api::{ApiClient, ApiError};
pub use auth::{Persistence, SessionError, SessionManager, SessionPhase, SessionState};
pub use config::{Config, ConfigError, StorageBackend};
pub use models::Project;
pub use storage::{FileStore, KeyValueStore, KeyringStore, MemoryStore, StoreError};

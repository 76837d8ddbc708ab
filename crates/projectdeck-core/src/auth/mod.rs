//! Authentication session management.
//!
//! `SessionManager` owns the login token: it restores a saved token on
//! startup, applies `login`/`logout` to in-memory state immediately, and
//! mirrors every change to a durable `KeyValueStore` under the `"token"` key.
//!
//! Tokens are opaque. There is no expiry or refresh handling.

pub mod session;

pub use session::{Persistence, SessionError, SessionManager, SessionPhase, SessionState, TOKEN_KEY};

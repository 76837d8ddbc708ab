use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::stream::{self, Stream};
use serde::ser::{Serialize, SerializeStruct, Serializer};
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use crate::storage::KeyValueStore;

/// Storage key the token is saved under
pub const TOKEN_KEY: &str = "token";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Token must not be empty")]
    EmptyToken,
}

/// Where the session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Restoring,
    Unauthenticated,
    Authenticated,
}

/// Outcome of mirroring a login/logout to durable storage.
///
/// The in-memory session has already changed regardless of the outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persistence {
    /// The store now holds this change.
    Saved,
    /// A newer login/logout happened first; it writes its own state instead.
    Superseded,
    /// The store rejected the write. The session will not survive a restart.
    Failed,
}

/// Snapshot of the authentication state.
///
/// `is_logged_in` is always derived from `token`, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    token: Option<String>,
    is_loading: bool,
}

impl SessionState {
    fn restoring() -> Self {
        Self {
            token: None,
            is_loading: true,
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn is_logged_in(&self) -> bool {
        self.token.is_some()
    }

    /// True until the saved session has been read at startup
    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn phase(&self) -> SessionPhase {
        if self.is_logged_in() {
            SessionPhase::Authenticated
        } else if self.is_loading {
            SessionPhase::Restoring
        } else {
            SessionPhase::Unauthenticated
        }
    }
}

impl Serialize for SessionState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("SessionState", 3)?;
        s.serialize_field("token", &self.token)?;
        s.serialize_field("isLoggedIn", &self.is_logged_in())?;
        s.serialize_field("isLoading", &self.is_loading)?;
        s.end()
    }
}

struct Inner {
    store: Arc<dyn KeyValueStore>,
    state: watch::Sender<SessionState>,
    /// Bumped by every login/logout, always under the watch lock.
    generation: AtomicU64,
    /// Serializes durable writes so the newest generation lands last.
    write_gate: Mutex<()>,
}

/// Owner of the authentication token.
///
/// Cloning is cheap and every clone shares the same session. Construct one
/// at startup and hand clones to whatever needs to read or change it.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

impl SessionManager {
    /// Create the session and start restoring the saved token.
    ///
    /// Must be called from within a Tokio runtime. The session reports
    /// `is_loading` until the restore finishes; see [`SessionManager::ready`].
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        let (state, _) = watch::channel(SessionState::restoring());
        let inner = Arc::new(Inner {
            store,
            state,
            generation: AtomicU64::new(0),
            write_gate: Mutex::new(()),
        });

        tokio::spawn(Self::restore(inner.clone()));

        Self { inner }
    }

    async fn restore(inner: Arc<Inner>) {
        let _loading = LoadingGuard(&inner.state);

        let restored = match inner.store.get(TOKEN_KEY).await {
            Ok(Some(token)) if !token.trim().is_empty() => Some(token),
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "Failed to load saved session, starting logged out");
                None
            }
        };

        inner.state.send_modify(|state| {
            // Any login/logout issued while we were reading is newer than the store
            if inner.generation.load(Ordering::SeqCst) == 0 {
                state.token = restored;
            } else {
                debug!("Saved session superseded during restore");
            }
            state.is_loading = false;
        });

        let logged_in = inner.state.borrow().is_logged_in();
        info!(logged_in, "Session restored");
    }

    /// Log in with a token the server already issued.
    ///
    /// The session is authenticated as soon as this returns. The returned
    /// future writes the token to storage; a failed write is logged and
    /// reported, but never rolls the session back.
    pub fn login(
        &self,
        token: &str,
    ) -> Result<impl Future<Output = Persistence> + Send + 'static, SessionError> {
        if token.trim().is_empty() {
            return Err(SessionError::EmptyToken);
        }

        let generation = self.apply(Some(token.to_string()));
        info!("Logged in");
        Ok(Self::persist(self.inner.clone(), generation, Some(token.to_string())))
    }

    /// Log out.
    ///
    /// The session is unauthenticated as soon as this returns. The returned
    /// future removes the saved token, with the same failure policy as
    /// [`SessionManager::login`].
    pub fn logout(&self) -> impl Future<Output = Persistence> + Send + 'static {
        let generation = self.apply(None);
        info!("Logged out");
        Self::persist(self.inner.clone(), generation, None)
    }

    fn apply(&self, token: Option<String>) -> u64 {
        let mut generation = 0;
        self.inner.state.send_modify(|state| {
            generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
            state.token = token;
        });
        generation
    }

    async fn persist(inner: Arc<Inner>, generation: u64, token: Option<String>) -> Persistence {
        let _gate = inner.write_gate.lock().await;

        if inner.generation.load(Ordering::SeqCst) != generation {
            debug!(generation, "Skipping superseded session write");
            return Persistence::Superseded;
        }

        let result = match token {
            Some(ref token) => inner.store.set(TOKEN_KEY, token).await,
            None => inner.store.remove(TOKEN_KEY).await,
        };

        match result {
            Ok(()) => {
                debug!(generation, "Session persisted");
                Persistence::Saved
            }
            Err(e) => {
                warn!(error = %e, "Failed to persist session, it will not survive a restart");
                Persistence::Failed
            }
        }
    }

    /// Current session snapshot
    pub fn state(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    /// Receiver that is notified on every session change
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    /// Stream of session states, starting with the current one.
    ///
    /// Intermediate states may be skipped if the consumer falls behind.
    pub fn changes(&self) -> impl Stream<Item = SessionState> + Send + 'static {
        let rx = self.subscribe();
        stream::unfold((rx, true), |(mut rx, first)| async move {
            if !first {
                rx.changed().await.ok()?;
            }
            let state = rx.borrow_and_update().clone();
            Some((state, (rx, false)))
        })
    }

    /// Wait for the startup restore to finish
    pub async fn ready(&self) -> SessionState {
        let mut rx = self.subscribe();
        let ready = rx.wait_for(|state| !state.is_loading).await.map(|s| (*s).clone());
        ready.unwrap_or_else(|_| self.state())
    }
}

/// Clears `is_loading` when restore ends, even if the store panicked.
struct LoadingGuard<'a>(&'a watch::Sender<SessionState>);

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.send_if_modified(|state| {
            if !state.is_loading {
                return false;
            }
            warn!("Session restore aborted, starting logged out");
            state.is_loading = false;
            true
        });
    }
}

impl fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("SessionManager")
            .field("phase", &state.phase())
            .field("is_loading", &state.is_loading)
            .finish_non_exhaustive()
    }
}

//! Application state management for projectdeck.
//!
//! This module contains the `App` struct that holds all UI state, the
//! shared `SessionManager`, and the channel background requests report on.

use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use projectdeck_core::{ApiClient, Config, Persistence, Project, SessionManager, SessionState};

// ============================================================================
// Constants
// ============================================================================

/// Buffer size for the background task message channel.
const CHANNEL_BUFFER_SIZE: usize = 16;

/// Maximum length for email input.
const MAX_EMAIL_LENGTH: usize = 100;

/// Maximum length for password input.
/// 128 chars accommodates password managers and passphrases.
const MAX_PASSWORD_LENGTH: usize = 128;

// ============================================================================
// UI State Types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppState {
    Normal,
    ShowingHelp,
    Quitting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Projects,
    Profile,
}

impl Tab {
    pub fn next(self) -> Self {
        match self {
            Tab::Projects => Tab::Profile,
            Tab::Profile => Tab::Projects,
        }
    }

    pub fn prev(self) -> Self {
        // Two tabs, so stepping back is the same as stepping forward
        self.next()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginFocus {
    Email,
    Password,
    Button,
}

impl LoginFocus {
    pub fn next(self) -> Self {
        match self {
            LoginFocus::Email => LoginFocus::Password,
            LoginFocus::Password => LoginFocus::Button,
            LoginFocus::Button => LoginFocus::Email,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            LoginFocus::Email => LoginFocus::Button,
            LoginFocus::Password => LoginFocus::Email,
            LoginFocus::Button => LoginFocus::Password,
        }
    }
}

/// Project list load state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectsView {
    Loading,
    Failed(String),
    Loaded(Vec<Project>),
}

/// Results reported by background tasks
#[derive(Debug)]
pub enum RefreshResult {
    Projects(Result<Vec<Project>, String>),
    Login(Result<String, String>),
    Persisted(Persistence),
}

// ============================================================================
// App
// ============================================================================

pub struct App {
    pub config: Config,
    pub session: SessionManager,
    pub api: ApiClient,

    pub state: AppState,
    pub current_tab: Tab,

    /// Last session state seen on the subscription
    pub session_state: SessionState,
    session_rx: watch::Receiver<SessionState>,

    pub projects: ProjectsView,
    pub project_selection: usize,

    pub login_email: String,
    pub login_password: String,
    pub login_focus: LoginFocus,
    pub login_error: Option<String>,
    pub login_in_progress: bool,

    pub status_message: Option<String>,

    refresh_rx: mpsc::Receiver<RefreshResult>,
    refresh_tx: mpsc::Sender<RefreshResult>,

    /// Session writes still in flight. Dropping the set aborts them, so
    /// they are awaited with `finish_pending_writes` before exit.
    pending_writes: JoinSet<()>,
}

impl App {
    pub fn new(config: Config, session: SessionManager, api: ApiClient) -> Self {
        let mut session_rx = session.subscribe();
        let session_state = session_rx.borrow_and_update().clone();
        let (refresh_tx, refresh_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);

        let login_email = std::env::var("PROJECTDECK_EMAIL").unwrap_or_default();

        Self {
            config,
            session,
            api,

            state: AppState::Normal,
            current_tab: Tab::Projects,

            session_state,
            session_rx,

            projects: ProjectsView::Loading,
            project_selection: 0,

            login_email,
            login_password: String::new(),
            login_focus: LoginFocus::Email,
            login_error: None,
            login_in_progress: false,

            status_message: None,

            refresh_rx,
            refresh_tx,

            pending_writes: JoinSet::new(),
        }
    }

    /// True when keystrokes on the Profile tab go to the login form
    pub fn is_editing_login(&self) -> bool {
        self.current_tab == Tab::Profile
            && !self.session_state.is_loading()
            && !self.session_state.is_logged_in()
    }

    /// Fetch the project list in the background
    pub fn refresh_projects(&mut self) {
        self.projects = ProjectsView::Loading;
        let api = self.api.clone();
        let tx = self.refresh_tx.clone();

        tokio::spawn(async move {
            let result = api.fetch_projects().await.map_err(|e| {
                error!(error = %e, "Failed to fetch projects");
                e.user_message()
            });
            Self::send_result(&tx, RefreshResult::Projects(result)).await;
        });
    }

    /// Submit the login form. The request runs in the background.
    pub fn attempt_login(&mut self) {
        if self.login_in_progress {
            return;
        }

        let email = self.login_email.trim().to_string();
        let password = self.login_password.clone();

        if email.is_empty() || password.is_empty() {
            self.login_error = Some("Email and password required".to_string());
            return;
        }

        self.login_error = None;
        self.login_in_progress = true;

        let api = self.api.clone();
        let tx = self.refresh_tx.clone();

        tokio::spawn(async move {
            let result = api.authenticate(&email, &password).await.map_err(|e| {
                warn!(error = %e, "Login failed");
                e.user_message()
            });
            Self::send_result(&tx, RefreshResult::Login(result)).await;
        });
    }

    pub fn logout(&mut self) {
        let pending = self.session.logout();
        self.spawn_persist(pending);
        self.status_message = Some("Logged out".to_string());
    }

    fn spawn_persist<F>(&mut self, pending: F)
    where
        F: std::future::Future<Output = Persistence> + Send + 'static,
    {
        let tx = self.refresh_tx.clone();
        self.pending_writes.spawn(async move {
            let outcome = pending.await;
            Self::send_result(&tx, RefreshResult::Persisted(outcome)).await;
        });
    }

    /// Wait for every session write started so far
    pub async fn finish_pending_writes(&mut self) {
        let count = self.pending_writes.len();
        if count > 0 {
            debug!(count, "Waiting for session writes");
        }
        while let Some(result) = self.pending_writes.join_next().await {
            if let Err(e) = result {
                error!(error = %e, "Session write task failed");
            }
        }
    }

    /// Helper to send refresh results, logging any channel errors
    async fn send_result(tx: &mpsc::Sender<RefreshResult>, result: RefreshResult) {
        if let Err(e) = tx.send(result).await {
            warn!(error = %e, "Failed to send background result, receiver dropped");
        }
    }

    /// Drain finished background work and pick up session changes
    pub fn check_background_tasks(&mut self) {
        let mut results = Vec::new();
        while let Ok(result) = self.refresh_rx.try_recv() {
            results.push(result);
        }

        for result in results {
            self.process_refresh_result(result);
        }

        while let Some(result) = self.pending_writes.try_join_next() {
            if let Err(e) = result {
                error!(error = %e, "Session write task failed");
            }
        }

        // After the results, so a login applied above shows this frame
        if self.session_rx.has_changed().unwrap_or(false) {
            let state = self.session_rx.borrow_and_update().clone();
            self.on_session_change(state);
        }
    }

    fn on_session_change(&mut self, state: SessionState) {
        debug!(phase = ?state.phase(), "Session changed");
        if self.session_state.is_logged_in() && !state.is_logged_in() {
            self.login_focus = LoginFocus::Email;
        }
        self.session_state = state;
    }

    /// Apply a single background result to the app state
    pub fn process_refresh_result(&mut self, result: RefreshResult) {
        match result {
            RefreshResult::Projects(Ok(projects)) => {
                if self.project_selection >= projects.len() {
                    self.project_selection = projects.len().saturating_sub(1);
                }
                self.projects = ProjectsView::Loaded(projects);
            }
            RefreshResult::Projects(Err(message)) => {
                self.projects = ProjectsView::Failed(message);
            }
            RefreshResult::Login(Ok(token)) => {
                self.login_in_progress = false;
                match self.session.login(&token) {
                    Ok(pending) => {
                        self.spawn_persist(pending);
                        self.login_password.clear();
                        self.login_error = None;
                        self.status_message = Some("Logged in".to_string());
                        info!("Login successful");
                    }
                    Err(e) => {
                        self.login_error = Some(e.to_string());
                    }
                }
            }
            RefreshResult::Login(Err(message)) => {
                self.login_in_progress = false;
                self.login_error = Some(message);
            }
            RefreshResult::Persisted(Persistence::Failed) => {
                self.status_message =
                    Some("Session could not be saved - you will need to log in again next time".to_string());
            }
            RefreshResult::Persisted(_) => {}
        }
    }

    pub fn select_next_project(&mut self) {
        if let ProjectsView::Loaded(ref projects) = self.projects {
            if self.project_selection + 1 < projects.len() {
                self.project_selection += 1;
            }
        }
    }

    pub fn select_prev_project(&mut self) {
        self.project_selection = self.project_selection.saturating_sub(1);
    }
}

// ============================================================================
// Input Validation
// ============================================================================

fn is_valid_input_char(c: char) -> bool {
    !c.is_control()
}

/// Check if an email character should be accepted
pub fn can_add_email_char(current_len: usize, c: char) -> bool {
    current_len < MAX_EMAIL_LENGTH && is_valid_input_char(c) && !c.is_whitespace()
}

/// Check if a password character should be accepted
pub fn can_add_password_char(current_len: usize, c: char) -> bool {
    current_len < MAX_PASSWORD_LENGTH && is_valid_input_char(c)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use projectdeck_core::auth::TOKEN_KEY;
    use projectdeck_core::{FileStore, KeyValueStore, MemoryStore};
    use std::sync::Arc;

    async fn test_app() -> App {
        let session = SessionManager::new(Arc::new(MemoryStore::new()));
        session.ready().await;
        let api = ApiClient::new("http://127.0.0.1:9").unwrap();
        let mut app = App::new(Config::default(), session, api);
        app.check_background_tasks();
        app
    }

    fn project(id: &str) -> Project {
        Project {
            id: id.to_string(),
            title: format!("Project {}", id),
            description: String::new(),
        }
    }

    // -------------------------------------------------------------------------
    // Navigation
    // -------------------------------------------------------------------------

    #[test]
    fn test_tab_cycle() {
        assert_eq!(Tab::Projects.next(), Tab::Profile);
        assert_eq!(Tab::Profile.next(), Tab::Projects); // Wraps around
        assert_eq!(Tab::Projects.prev(), Tab::Profile);
    }

    #[test]
    fn test_login_focus_cycle() {
        assert_eq!(LoginFocus::Email.next(), LoginFocus::Password);
        assert_eq!(LoginFocus::Password.next(), LoginFocus::Button);
        assert_eq!(LoginFocus::Button.next(), LoginFocus::Email);
        assert_eq!(LoginFocus::Email.prev(), LoginFocus::Button);
        assert_eq!(LoginFocus::Button.prev(), LoginFocus::Password);
    }

    // -------------------------------------------------------------------------
    // Input Validation
    // -------------------------------------------------------------------------

    #[test]
    fn test_can_add_email_char() {
        assert!(can_add_email_char(0, 'a'));
        assert!(can_add_email_char(0, '@'));
        assert!(!can_add_email_char(0, ' '));
        assert!(!can_add_email_char(0, '\n'));
        assert!(!can_add_email_char(MAX_EMAIL_LENGTH, 'a'));
    }

    #[test]
    fn test_can_add_password_char() {
        assert!(can_add_password_char(0, ' '));
        assert!(can_add_password_char(127, '!'));
        assert!(!can_add_password_char(128, 'a'));
        assert!(!can_add_password_char(0, '\x00'));
    }

    // -------------------------------------------------------------------------
    // Background Results
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_projects_result_updates_view() {
        let mut app = test_app().await;
        app.project_selection = 5;

        app.process_refresh_result(RefreshResult::Projects(Ok(vec![project("1"), project("2")])));
        assert!(matches!(app.projects, ProjectsView::Loaded(ref p) if p.len() == 2));
        assert_eq!(app.project_selection, 1);

        app.process_refresh_result(RefreshResult::Projects(Err("offline".to_string())));
        assert_eq!(app.projects, ProjectsView::Failed("offline".to_string()));
    }

    #[tokio::test]
    async fn test_project_selection_bounds() {
        let mut app = test_app().await;
        app.process_refresh_result(RefreshResult::Projects(Ok(vec![project("1"), project("2")])));

        app.select_prev_project();
        assert_eq!(app.project_selection, 0);
        app.select_next_project();
        app.select_next_project();
        assert_eq!(app.project_selection, 1);
    }

    #[tokio::test]
    async fn test_login_result_logs_in() {
        let mut app = test_app().await;
        app.current_tab = Tab::Profile;
        app.login_password = "hunter2".to_string();
        app.login_in_progress = true;
        assert!(app.is_editing_login());

        app.process_refresh_result(RefreshResult::Login(Ok("abc123".to_string())));

        assert!(!app.login_in_progress);
        assert!(app.login_password.is_empty());
        assert_eq!(app.session.state().token(), Some("abc123"));

        app.check_background_tasks();
        assert!(app.session_state.is_logged_in());
        assert!(!app.is_editing_login());
    }

    #[tokio::test]
    async fn test_login_failure_shows_message() {
        let mut app = test_app().await;
        app.login_in_progress = true;

        app.process_refresh_result(RefreshResult::Login(Err("Credenciales inválidas".to_string())));

        assert!(!app.login_in_progress);
        assert_eq!(app.login_error.as_deref(), Some("Credenciales inválidas"));
        assert!(!app.session.state().is_logged_in());
    }

    #[tokio::test]
    async fn test_attempt_login_requires_fields() {
        let mut app = test_app().await;
        app.login_email.clear();

        app.attempt_login();

        assert!(!app.login_in_progress);
        assert_eq!(app.login_error.as_deref(), Some("Email and password required"));
    }

    #[tokio::test]
    async fn test_logout_returns_to_form() {
        let mut app = test_app().await;
        app.session.login("abc123").unwrap().await;
        app.check_background_tasks();
        app.login_focus = LoginFocus::Button;

        app.logout();
        app.check_background_tasks();

        assert!(!app.session_state.is_logged_in());
        assert_eq!(app.login_focus, LoginFocus::Email);
        assert_eq!(app.status_message.as_deref(), Some("Logged out"));
    }

    #[tokio::test]
    async fn test_login_result_visible_in_same_poll() {
        let mut app = test_app().await;
        app.login_in_progress = true;
        app.refresh_tx
            .send(RefreshResult::Login(Ok("abc123".to_string())))
            .await
            .unwrap();

        app.check_background_tasks();

        assert!(app.session_state.is_logged_in());
        assert_eq!(app.session_state.token(), Some("abc123"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_logout_then_quit_clears_saved_token() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileStore::in_dir(dir.path()));
        store.set(TOKEN_KEY, "abc123").await.unwrap();

        let session = SessionManager::new(store.clone());
        assert!(session.ready().await.is_logged_in());
        let api = ApiClient::new("http://127.0.0.1:9").unwrap();
        let mut app = App::new(Config::default(), session, api);

        app.logout();
        app.state = AppState::Quitting;
        app.finish_pending_writes().await;
        drop(app);

        assert_eq!(store.get(TOKEN_KEY).await.unwrap(), None);
        let restarted = SessionManager::new(store);
        assert!(!restarted.ready().await.is_logged_in());
    }

    #[tokio::test]
    async fn test_failed_persist_sets_status() {
        let mut app = test_app().await;
        app.process_refresh_result(RefreshResult::Persisted(Persistence::Failed));
        assert!(app.status_message.is_some());

        app.status_message = None;
        app.process_refresh_result(RefreshResult::Persisted(Persistence::Saved));
        assert!(app.status_message.is_none());
    }
}

//! API client for the projects backend.
//!
//! `ApiClient` wraps a pooled `reqwest::Client` with the backend base URL.
//! It performs the login exchange and fetches the project list; the token
//! it returns is handed to the `SessionManager` by the caller.

use std::time::Duration;

use reqwest::{header, Client, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::Project;

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Login endpoint, relative to the base URL
const LOGIN_PATH: &str = "/api/auth/login";

/// Project list endpoint, relative to the base URL
const PROJECTS_PATH: &str = "/api/proyectos";

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
}

/// API client for the projects backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a new API client for the server at `base_url`
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full URL of the project list, for display in error messages
    pub fn projects_url(&self) -> String {
        self.url(PROJECTS_PATH)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Exchange an email and password for a session token
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<String, ApiError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(ApiError::MissingCredentials);
        }

        let url = self.url(LOGIN_PATH);
        debug!(url = %url, "Sending login request");

        let response = self
            .client
            .post(&url)
            .header(header::ACCEPT, "application/json")
            .json(&LoginRequest {
                email: email.trim(),
                password,
            })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!(status = %status, "Login rejected");
            return Err(ApiError::from_login_failure(status, &body));
        }

        let login: LoginResponse = serde_json::from_str(&body)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse login response: {}", e)))?;

        if login.token.trim().is_empty() {
            return Err(ApiError::InvalidResponse(
                "Server returned an empty token".to_string(),
            ));
        }

        Ok(login.token)
    }

    /// Fetch all projects
    pub async fn fetch_projects(&self) -> Result<Vec<Project>, ApiError> {
        let url = self.projects_url();

        let response = self
            .client
            .get(&url)
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;

        let response = Self::check_response(response).await?;
        let text = response.text().await?;

        let projects: Vec<Project> = serde_json::from_str(&text)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse projects: {}", e)))?;

        debug!(count = projects.len(), "Projects fetched");
        Ok(projects)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: Response) -> Result<Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }
}

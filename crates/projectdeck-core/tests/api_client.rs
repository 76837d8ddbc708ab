//! Drives `ApiClient` against an in-process backend.

use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use projectdeck_core::{ApiClient, ApiError};

async fn login(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    let email = body["email"].as_str().unwrap_or_default();
    let password = body["password"].as_str().unwrap_or_default();

    match (email, password) {
        ("ana@example.com", "hunter2") => (StatusCode::OK, Json(json!({"token": "abc123"}))),
        ("blank@example.com", _) => (StatusCode::OK, Json(json!({"token": ""}))),
        _ => (
            StatusCode::BAD_REQUEST,
            Json(json!({"message": "Credenciales inválidas"})),
        ),
    }
}

async fn projects() -> Json<Value> {
    Json(json!([
        {"_id": "1", "title": "Portfolio", "description": "Personal site"},
        {"_id": "2", "title": "Tasks", "description": "Todo app"}
    ]))
}

/// Start a backend on an ephemeral port and return its base URL
async fn spawn_backend(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

fn backend() -> Router {
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/proyectos", get(projects))
}

#[tokio::test]
async fn test_authenticate_returns_token() {
    let base = spawn_backend(backend()).await;
    let client = ApiClient::new(&base).unwrap();

    let token = client.authenticate("ana@example.com", "hunter2").await.unwrap();
    assert_eq!(token, "abc123");
}

#[tokio::test]
async fn test_authenticate_surfaces_server_message() {
    let base = spawn_backend(backend()).await;
    let client = ApiClient::new(&base).unwrap();

    let err = client.authenticate("ana@example.com", "wrong").await.unwrap_err();
    assert!(matches!(err, ApiError::Rejected(ref m) if m == "Credenciales inválidas"));
}

#[tokio::test]
async fn test_authenticate_rejects_empty_token() {
    let base = spawn_backend(backend()).await;
    let client = ApiClient::new(&base).unwrap();

    let err = client.authenticate("blank@example.com", "x").await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_fetch_projects() {
    let base = spawn_backend(backend()).await;
    let client = ApiClient::new(&base).unwrap();

    let projects = client.fetch_projects().await.unwrap();
    assert_eq!(projects.len(), 2);
    assert_eq!(projects[0].id, "1");
    assert_eq!(projects[1].title, "Tasks");
}

#[tokio::test]
async fn test_fetch_projects_server_error() {
    let router = Router::new().route(
        "/api/proyectos",
        get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "database down") }),
    );
    let base = spawn_backend(router).await;
    let client = ApiClient::new(&base).unwrap();

    let err = client.fetch_projects().await.unwrap_err();
    assert!(matches!(err, ApiError::ServerError(ref b) if b == "database down"));
}

#[tokio::test]
async fn test_fetch_projects_malformed_body() {
    let router = Router::new().route("/api/proyectos", get(|| async { "not json" }));
    let base = spawn_backend(router).await;
    let client = ApiClient::new(&base).unwrap();

    let err = client.fetch_projects().await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_unreachable_server_is_network_error() {
    // Bind then drop to get a port nothing listens on
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = ApiClient::new(&format!("http://{}", addr)).unwrap();
    let err = client.fetch_projects().await.unwrap_err();
    assert!(matches!(err, ApiError::NetworkError(_)));
    assert!(err.user_message().contains("Unable to connect"));
}

//! REST API client for the projects backend.
//!
//! This module provides the `ApiClient` used to exchange an email and
//! password for a session token and to fetch the project list.
//!
//! Requests are sent once. Failures are returned to the caller as
//! `ApiError` without any retry.

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::ApiError;

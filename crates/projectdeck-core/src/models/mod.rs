//! Data models returned by the projects API.

pub mod project;

pub use project::Project;

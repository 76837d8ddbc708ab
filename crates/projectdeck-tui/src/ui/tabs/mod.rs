//! Tab content renderers.

pub mod profile;
pub mod projects;

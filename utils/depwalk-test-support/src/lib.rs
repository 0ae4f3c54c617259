//! Fixtures for testing Depwalk against a real HTTP registry.

pub mod document;
pub mod registry;
pub mod simple_http_server;

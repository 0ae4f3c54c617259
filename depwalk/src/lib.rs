//! Depwalk crawls an npm-style package registry and assembles the full transitive dependency
//! graph of a single package version.
//!
//! The crawl is driven by a fixed pool of workers sharing one task queue and one graph, see
//! [`walker`] for details.

#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]
#![warn(rust_2018_idioms)]

pub mod core;
mod internal;
pub mod ops;
pub mod resolver;
pub mod walker;

/// Environment variable overriding the logging filter of the binary.
pub const DEPWALK_LOG_ENV: &str = "DEPWALK_LOG";
pub const DEFAULT_REGISTRY_URL: &str = "https://registry.npmjs.org/";

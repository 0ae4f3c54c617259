//! Core datastructures describing a dependency walk.
//!
//! For the operations driving a walk, see [`crate::ops`] module.

pub use config::{Config, ConfigBuilder, FetchFailurePolicy};
pub use package::{NodeId, PackageName};
pub use registry::client::{RawDocument, RegistryClient, RegistryResource};
pub use registry::document::{DependencySpec, PackageDocument, VersionRecord};

pub mod config;
pub mod errors;
pub mod package;
pub mod registry;

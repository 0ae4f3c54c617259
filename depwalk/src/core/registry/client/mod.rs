use std::fmt;

use async_trait::async_trait;

use crate::core::PackageName;
use crate::core::errors::RegistryError;

pub mod http;

/// Result of looking up a resource in the registry.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RegistryResource<T> {
    /// The registry does not know the requested resource.
    NotFound,
    Found(T),
}

/// Raw body of a package document, as returned by the registry.
///
/// Deserialization is deferred to the caller, so that clients do not have to care about the
/// document schema.
#[derive(Clone, Eq, PartialEq)]
pub struct RawDocument(String);

impl RawDocument {
    pub fn new(body: impl Into<String>) -> Self {
        Self(body.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for RawDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RawDocument({} bytes)", self.0.len())
    }
}

#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// Fetch the full metadata document of a named package.
    ///
    /// Returns [`RegistryResource::NotFound`] if the package is not present in the registry.
    ///
    /// ## Retries and caching
    ///
    /// The walker never retries failed fetches and never caches documents across walks.
    /// Clients are free to do both internally.
    async fn fetch(
        &self,
        package: &PackageName,
    ) -> Result<RegistryResource<RawDocument>, RegistryError>;
}

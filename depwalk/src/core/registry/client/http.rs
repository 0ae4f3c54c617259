use anyhow::Result;
use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::{debug, trace};
use url::Url;

use crate::core::errors::RegistryError;
use crate::core::registry::client::{RawDocument, RegistryClient, RegistryResource};
use crate::core::{Config, PackageName};

/// Remote registry served by the npm-compatible HTTP API.
///
/// Documents are fetched from `<registry url>/<name>`, with the scope separator of scoped
/// package names percent-encoded.
pub struct HttpRegistryClient {
    registry_url: Url,
    http: reqwest::Client,
}

impl HttpRegistryClient {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            registry_url: config.registry_url().clone(),
            http: config.http()?.clone(),
        })
    }

    fn document_url(&self, package: &PackageName) -> Result<Url, RegistryError> {
        self.registry_url
            .join(&package.to_registry_path())
            .map_err(|err| RegistryError::Transport {
                name: package.clone(),
                source: err.into(),
            })
    }
}

#[async_trait]
impl RegistryClient for HttpRegistryClient {
    async fn fetch(
        &self,
        package: &PackageName,
    ) -> Result<RegistryResource<RawDocument>, RegistryError> {
        let url = self.document_url(package)?;
        debug!("fetching package document: {url}");

        let transport = |err: reqwest::Error| RegistryError::Transport {
            name: package.clone(),
            source: err.into(),
        };

        let response = self
            .http
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        trace!(%status, package = %package);

        if status == StatusCode::NOT_FOUND {
            return Ok(RegistryResource::NotFound);
        }
        if !status.is_success() {
            return Err(RegistryError::Status {
                name: package.clone(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(transport)?;
        Ok(RegistryResource::Found(RawDocument::new(body)))
    }
}

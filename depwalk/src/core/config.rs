use std::fmt;
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use once_cell::sync::OnceCell;
use tokio::runtime::{Builder, Handle, Runtime};
use tracing::trace;
use url::Url;

use crate::DEFAULT_REGISTRY_URL;
use crate::walker::WalkOptions;

pub const DEFAULT_CONCURRENCY: usize = 10;
pub const DEFAULT_IDLE_INTERVAL: Duration = Duration::from_millis(10);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// How the walker treats transport, HTTP status and deserialization failures of registry fetches.
///
/// Packages missing from the registry and unresolvable version ranges always prune just the
/// affected branch, regardless of this policy.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum FetchFailurePolicy {
    /// Log the failure and prune the affected branch.
    #[default]
    Prune,
    /// Abort the whole walk, reporting it as failed.
    Abort,
}

pub struct Config {
    registry_url: Url,
    concurrency: usize,
    idle_interval: Duration,
    request_timeout: Duration,
    fetch_failure_policy: FetchFailurePolicy,
    user_agent: String,
    http_client: OnceCell<reqwest::Client>,
    tokio_runtime: OnceCell<Runtime>,
    tokio_handle: OnceCell<Handle>,
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    pub fn registry_url(&self) -> &Url {
        &self.registry_url
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn idle_interval(&self) -> Duration {
        self.idle_interval
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn fetch_failure_policy(&self) -> FetchFailurePolicy {
        self.fetch_failure_policy
    }

    pub fn walk_options(&self) -> WalkOptions {
        WalkOptions {
            concurrency: self.concurrency,
            idle_interval: self.idle_interval,
            fetch_failure_policy: self.fetch_failure_policy,
        }
    }

    /// Shared, connection-pooling HTTP client used for all registry requests.
    pub fn http(&self) -> Result<&reqwest::Client> {
        self.http_client.get_or_try_init(|| {
            reqwest::Client::builder()
                .user_agent(&self.user_agent)
                .timeout(self.request_timeout)
                .build()
                .context("failed to create HTTP client")
        })
    }

    pub fn tokio_handle(&self) -> &Handle {
        self.tokio_handle.get_or_init(|| {
            // No need to create a runtime if we are already running inside one.
            Handle::try_current().unwrap_or_else(|_| {
                self.tokio_runtime
                    .get_or_init(|| {
                        Builder::new_multi_thread()
                            .thread_name("depwalk-worker")
                            .enable_all()
                            .build()
                            .expect("failed to start tokio runtime")
                    })
                    .handle()
                    .clone()
            })
        })
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("registry_url", &self.registry_url.as_str())
            .field("concurrency", &self.concurrency)
            .field("idle_interval", &self.idle_interval)
            .field("request_timeout", &self.request_timeout)
            .field("fetch_failure_policy", &self.fetch_failure_policy)
            .field("user_agent", &self.user_agent)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub struct ConfigBuilder {
    registry_url: Option<Url>,
    concurrency: usize,
    idle_interval: Duration,
    request_timeout: Duration,
    fetch_failure_policy: FetchFailurePolicy,
    user_agent: Option<String>,
}

impl ConfigBuilder {
    fn new() -> Self {
        Self {
            registry_url: None,
            concurrency: DEFAULT_CONCURRENCY,
            idle_interval: DEFAULT_IDLE_INTERVAL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            fetch_failure_policy: FetchFailurePolicy::default(),
            user_agent: None,
        }
    }

    pub fn build(self) -> Result<Config> {
        ensure!(self.concurrency > 0, "concurrency must be at least 1");

        let registry_url = match self.registry_url {
            Some(url) => url,
            None => Url::parse(DEFAULT_REGISTRY_URL)?,
        };
        ensure!(
            matches!(registry_url.scheme(), "http" | "https"),
            "unsupported registry url scheme: {registry_url}"
        );
        let registry_url = with_trailing_slash(registry_url);

        let user_agent = self
            .user_agent
            .unwrap_or_else(|| format!("depwalk/{}", env!("CARGO_PKG_VERSION")));

        let config = Config {
            registry_url,
            concurrency: self.concurrency,
            idle_interval: self.idle_interval,
            request_timeout: self.request_timeout,
            fetch_failure_policy: self.fetch_failure_policy,
            user_agent,
            http_client: OnceCell::new(),
            tokio_runtime: OnceCell::new(),
            tokio_handle: OnceCell::new(),
        };
        trace!(?config);
        Ok(config)
    }

    pub fn registry_url(mut self, registry_url: Url) -> Self {
        self.registry_url = Some(registry_url);
        self
    }

    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn idle_interval(mut self, idle_interval: Duration) -> Self {
        self.idle_interval = idle_interval;
        self
    }

    pub fn request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    pub fn fetch_failure_policy(mut self, fetch_failure_policy: FetchFailurePolicy) -> Self {
        self.fetch_failure_policy = fetch_failure_policy;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }
}

/// Document URLs are built by joining package names onto the registry URL, which drops the last
/// path segment unless the base ends with a slash.
fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

#[cfg(test)]
mod tests {
    use url::Url;

    use super::{Config, FetchFailurePolicy};

    #[test]
    fn defaults() {
        let config = Config::builder().build().unwrap();
        assert_eq!(config.registry_url().as_str(), "https://registry.npmjs.org/");
        assert_eq!(config.concurrency(), 10);
        assert_eq!(config.fetch_failure_policy(), FetchFailurePolicy::Prune);
    }

    #[test]
    fn registry_url_gets_trailing_slash() {
        let config = Config::builder()
            .registry_url(Url::parse("http://localhost:4873/npm").unwrap())
            .build()
            .unwrap();
        assert_eq!(config.registry_url().as_str(), "http://localhost:4873/npm/");
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let err = Config::builder().concurrency(0).build().unwrap_err();
        assert_eq!(err.to_string(), "concurrency must be at least 1");
    }

    #[test]
    fn unsupported_scheme_is_rejected() {
        let err = Config::builder()
            .registry_url(Url::parse("file:///tmp/registry").unwrap())
            .build()
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "unsupported registry url scheme: file:///tmp/registry"
        );
    }
}

//! Locator reachability probe
//!
//! A source swap only touches the player once the new locator answered.

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use reqwest::Client;

use crate::config::NegotiatorConfig;
use crate::error::NegotiationError;

/// Checks that a locator can be loaded before the player is pointed at it
pub trait LocatorProbe: Send + Sync {
    fn probe(&self, locator: &str) -> impl Future<Output = Result<(), NegotiationError>> + Send;
}

/// Probe for `http(s)`, `file://`, plain path and `data:` locators
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: Client,
    timeout: Duration,
}

impl HttpProbe {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            timeout,
        }
    }

    pub fn with_client(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Probe bounded by `probe_timeout_ms`
    pub fn from_config(config: &NegotiatorConfig) -> Self {
        Self::new(config.probe_timeout())
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn probe_http(&self, locator: &str) -> Result<(), NegotiationError> {
        let res = self
            .client
            .head(locator)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                tracing::debug!("probe {}: {}", locator, e);
                NegotiationError::UnreachableLocator(locator.to_string())
            })?;

        let status = res.status();
        if status.is_success() || status.is_redirection() {
            Ok(())
        } else {
            tracing::debug!("probe {}: status {}", locator, status);
            Err(NegotiationError::UnreachableLocator(locator.to_string()))
        }
    }

    async fn probe_file(&self, locator: &str) -> Result<(), NegotiationError> {
        let path = locator.strip_prefix("file://").unwrap_or(locator);
        let path = path.split(&['?', '#'][..]).next().unwrap_or(path);

        match tokio::fs::metadata(Path::new(path)).await {
            Ok(meta) if meta.is_file() => Ok(()),
            _ => Err(NegotiationError::UnreachableLocator(locator.to_string())),
        }
    }
}

impl Default for HttpProbe {
    fn default() -> Self {
        Self::new(Duration::from_secs(3))
    }
}

impl LocatorProbe for HttpProbe {
    async fn probe(&self, locator: &str) -> Result<(), NegotiationError> {
        let locator = locator.trim();
        if locator.is_empty() {
            return Err(NegotiationError::UnreachableLocator(String::new()));
        }

        if locator.starts_with("data:") {
            Ok(())
        } else if locator.starts_with("http://") || locator.starts_with("https://") {
            self.probe_http(locator).await
        } else if locator.contains("://") && !locator.starts_with("file://") {
            tracing::debug!("probe {}: unsupported scheme", locator);
            Err(NegotiationError::UnreachableLocator(locator.to_string()))
        } else {
            self.probe_file(locator).await
        }
    }
}

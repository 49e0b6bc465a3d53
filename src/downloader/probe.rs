// Existence probe run before transferring bytes

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::errors::DownloadError;
use super::models::NetworkConfig;

/// Status code meaning the source was removed for good
pub const GONE: u16 = 410;

/// Lightweight availability check against a source URL
#[async_trait]
pub trait SourceProbe: Send + Sync {
    /// HTTP status returned for `url`
    async fn status(&self, url: &str) -> Result<u16, DownloadError>;
}

/// Probe issuing an HTTP HEAD request
pub struct HttpProbe {
    client: reqwest::Client,
}

impl HttpProbe {
    pub fn new(network: &NetworkConfig) -> Result<Self, DownloadError> {
        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_secs(network.probe_timeout_secs))
            .user_agent(USER_AGENT);

        if let Some(proxy_url) = network.proxy.as_deref() {
            let proxy = reqwest::Proxy::all(proxy_url)
                .map_err(|e| DownloadError::Fetch(format!("Invalid proxy URL {}: {}", proxy_url, e)))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| DownloadError::Fetch(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl SourceProbe for HttpProbe {
    async fn status(&self, url: &str) -> Result<u16, DownloadError> {
        let response = self.client.head(url).send().await.map_err(|e| {
            if e.is_timeout() {
                DownloadError::Timeout(format!("HEAD {}: {}", url, e))
            } else {
                DownloadError::Transfer(format!("HEAD {}: {}", url, e))
            }
        })?;

        let status = response.status().as_u16();
        debug!(url, status, "probe response");
        Ok(status)
    }
}

const USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36";

//! HTTP client for the post-deploy health probe

use std::time::Duration;

use reqwest::Client;
use tracing::{debug, error};
use url::Url;

use crate::errors::DeployError;

/// Placeholder in the health URL template replaced by the application name
pub const NAME_PLACEHOLDER: &str = "{name}";

/// Result of one health probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthReport {
    pub url: String,
    pub status: u16,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP client for local health checks
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Create a new HTTP client
    pub fn new(timeout: Duration) -> Result<Self, DeployError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// Fill the application name into a health URL template
    pub fn health_url(template: &str, name: &str) -> Result<Url, DeployError> {
        let raw = template.replace(NAME_PLACEHOLDER, name);
        Url::parse(&raw).map_err(|e| DeployError::ConfigError(format!("Invalid health URL '{}': {}", raw, e)))
    }

    /// GET `url`, reporting whatever status comes back
    ///
    /// Only transport failures are errors; a 5xx is still a report.
    pub async fn probe(&self, url: Url) -> Result<HealthReport, DeployError> {
        debug!("GET {}", url);

        let response = self.client.get(url.clone()).send().await.map_err(|e| {
            error!("Health check failed: {} - {}", url, e);
            DeployError::HttpError(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Health check returned {} - {}", status, body);
        }

        Ok(HealthReport {
            url: url.to_string(),
            status: status.as_u16(),
        })
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self {
            client: Client::new(),
        }
    }
}

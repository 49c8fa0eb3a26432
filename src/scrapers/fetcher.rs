//! Listing page retrieval.
//!
//! [`DocumentSource`] is the seam the worker fetches through; [`HttpFetcher`]
//! is the production implementation, a single GET per call with a bounded
//! timeout and a descriptive `User-Agent`.

use crate::error::FetchError;
use crate::models::ResourceId;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

/// Something that can hand back the listing page of a resource.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Fetch the raw HTML listing of `resource`.
    async fn fetch(&self, resource: &ResourceId) -> Result<String, FetchError>;
}

/// Fetches `<base_url><resource>` over HTTP.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpFetcher {
    /// Build a fetcher.
    ///
    /// `base_url` must end with `/` so resource names are appended to its
    /// path rather than replacing the last segment.
    pub fn new(base_url: Url, user_agent: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(Self { client, base_url })
    }

    /// URL of the listing page of `resource`.
    pub fn listing_url(&self, resource: &ResourceId) -> Result<Url, FetchError> {
        self.base_url
            .join(resource.as_str())
            .map_err(|source| FetchError::InvalidUrl {
                resource: resource.to_string(),
                source,
            })
    }
}

#[async_trait]
impl DocumentSource for HttpFetcher {
    #[instrument(level = "info", skip_all, fields(%resource))]
    async fn fetch(&self, resource: &ResourceId) -> Result<String, FetchError> {
        let url = self.listing_url(resource)?;
        let transport = |source| FetchError::Transport {
            resource: resource.to_string(),
            source,
        };

        let response = self.client.get(url).send().await.map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            // Dropping the response here releases the connection.
            return Err(FetchError::Status {
                resource: resource.to_string(),
                status,
            });
        }

        let body = response.text().await.map_err(transport)?;
        debug!(bytes = body.len(), %status, "Fetched listing page");
        Ok(body)
    }
}

//! HTTP client for the catalog REST API

use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use crate::config::CatalogConfig;
use crate::error::{HarvestError, Result};

/// Route of the single-record endpoint
pub const RECORD_ROUTE: &str = "bib";

/// URI of one record, `{base}/bib/{id}`
pub fn record_uri(base_url: &str, id: &str) -> String {
    format!("{}/{}/{}", base_url.trim_end_matches('/'), RECORD_ROUTE, id.trim())
}

/// Credentialed JSON client for the catalog.
///
/// Basic credentials are attached to every request when a user is
/// configured.
#[derive(Clone)]
pub struct CatalogClient {
    client: Client,
    base_url: String,
    user: String,
    password: String,
}

impl CatalogClient {
    pub fn new(config: &CatalogConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(concat!("catalog-harvester/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            user: config.user.clone(),
            password: config.password.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn record_uri(&self, id: &str) -> String {
        record_uri(&self.base_url, id)
    }

    /// GET a URI and decode its JSON body
    pub async fn get_json<T: DeserializeOwned>(&self, uri: &str) -> Result<T> {
        debug!(uri, "GET catalog resource");

        let mut request = self.client.get(uri);
        if !self.user.is_empty() {
            request = request.basic_auth(&self.user, Some(&self.password));
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(HarvestError::Status {
                status: status.as_u16(),
                uri: uri.to_string(),
            });
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

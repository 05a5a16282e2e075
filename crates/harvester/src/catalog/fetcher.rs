//! Record fetcher: paginated listing walk

use serde::Deserialize;
use tracing::{debug, error, info};

use super::client::CatalogClient;
use crate::error::Result;
use crate::queue::QueueGateway;

/// Route of the listing endpoint
pub const LISTING_ROUTE: &str = "bibs";

/// One page of the listing endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListingPage {
    #[serde(default)]
    pub links: Vec<String>,
    #[serde(default)]
    pub next: Option<String>,
}

impl ListingPage {
    /// URI of the following page; an empty `next` ends the walk
    pub fn next_uri(&self) -> Option<&str> {
        self.next.as_deref().map(str::trim).filter(|n| !n.is_empty())
    }
}

/// Record identifiers are the trailing segment of each link
pub fn extract_record_ids(page: &ListingPage) -> Vec<String> {
    page.links
        .iter()
        .filter_map(|link| link.trim_end_matches('/').rsplit('/').next())
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

pub struct RecordFetcher {
    client: CatalogClient,
    gateway: QueueGateway,
}

impl RecordFetcher {
    pub fn new(client: CatalogClient, gateway: QueueGateway) -> Self {
        Self { client, gateway }
    }

    pub fn listing_uri(&self, size: usize, next_id: Option<&str>) -> String {
        let mut uri = format!(
            "{}/{}?all=true&batchSize={}",
            self.client.base_url(),
            LISTING_ROUTE,
            size
        );
        if let Some(next) = next_id.map(str::trim).filter(|n| !n.is_empty()) {
            uri.push_str("&next=");
            uri.push_str(next);
        }
        uri
    }

    /// Walk every listing page, queueing the identifiers of each.
    ///
    /// Returns the number of identifiers queued. The first failure aborts
    /// the walk.
    pub async fn walk(&self, size: usize, next_id: Option<&str>) -> Result<usize> {
        let mut uri = self.listing_uri(size, next_id);
        let mut count = 0;
        let mut pages = 0;

        loop {
            let page: ListingPage = self.client.get_json(&uri).await?;
            let ids = extract_record_ids(&page);
            pages += 1;

            debug!(page = pages, records = ids.len(), uri = %uri, "Listing page fetched");
            count += self.gateway.bulk_to_harvest(&ids).await?;

            match page.next_uri() {
                Some(next) => uri = next.to_string(),
                None => break,
            }
        }

        info!(pages, records = count, "Listing walk complete");
        Ok(count)
    }

    /// [`walk`](Self::walk), reporting zero records on any failure
    pub async fn queue_all(&self, size: usize, next_id: Option<&str>) -> usize {
        match self.walk(size, next_id).await {
            Ok(count) => count,
            Err(e) => {
                error!(error = %e, "Harvesting API error, no records reported");
                0
            }
        }
    }
}

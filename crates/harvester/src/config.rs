//! Configuration management
//!
//! Values come from the process environment (and an optional `.env` file)
//! once at startup. Components receive the section they need by value.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

// ============================================================================
// Catalog Constants
// ============================================================================

/// Default base URL of the catalog REST API.
pub const DEFAULT_CATALOG_BASE_URL: &str = "http://localhost:8080/rest";

/// Default HTTP request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Default number of identifiers requested per listing page.
pub const DEFAULT_PAGE_SIZE: usize = 1000;

// ============================================================================
// Queue Constants
// ============================================================================

/// Default exchange, queue and routing key name.
pub const DEFAULT_QUEUE_NAME: &str = "catalog_harvester";

/// Default delivery lease in seconds before an unacknowledged message is redelivered.
pub const DEFAULT_LEASE_SECS: u64 = 300;

// ============================================================================
// Ingest Constants
// ============================================================================

/// Default number of written documents between two commits.
pub const DEFAULT_BULK_SIZE: usize = 1000;

/// Default base URL used to build resource links.
pub const DEFAULT_APP_BASE_URL: &str = "http://localhost:5000";

// ============================================================================
// Database Constants
// ============================================================================

pub const DEFAULT_DATABASE_URL: &str = "postgresql://localhost/harvester";

pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 5;

pub const DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Harvester configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HarvesterConfig {
    pub catalog: CatalogConfig,
    pub queue: QueueConfig,
    pub ingest: IngestConfig,
    pub database: DatabaseConfig,
}

/// Catalog REST API access
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub base_url: String,
    pub user: String,
    pub password: String,
    pub request_timeout_secs: u64,
    pub page_size: usize,
}

/// Queue exchange/queue/routing-key triple
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    pub exchange: String,
    pub queue: String,
    pub routing_key: String,
    pub lease_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    pub bulk_size: usize,
    pub app_base_url: String,

    /// Authority service endpoint; author lookups are disabled when unset
    pub mef_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connect_timeout_secs: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_CATALOG_BASE_URL.to_string(),
            user: String::new(),
            password: String::new(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            exchange: DEFAULT_QUEUE_NAME.to_string(),
            queue: DEFAULT_QUEUE_NAME.to_string(),
            routing_key: DEFAULT_QUEUE_NAME.to_string(),
            lease_secs: DEFAULT_LEASE_SECS,
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            bulk_size: DEFAULT_BULK_SIZE,
            app_base_url: DEFAULT_APP_BASE_URL.to_string(),
            mef_url: None,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: DEFAULT_DATABASE_MAX_CONNECTIONS,
            connect_timeout_secs: DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
        }
    }
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

impl HarvesterConfig {
    /// Load configuration from environment and defaults
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = HarvesterConfig {
            catalog: CatalogConfig {
                base_url: env_string("HARVESTER_CATALOG_BASE_URL", DEFAULT_CATALOG_BASE_URL),
                user: env_string("HARVESTER_CATALOG_USER", ""),
                password: env_string("HARVESTER_CATALOG_PASSWORD", ""),
                request_timeout_secs: env_parse(
                    "HARVESTER_REQUEST_TIMEOUT_SECS",
                    DEFAULT_REQUEST_TIMEOUT_SECS,
                ),
                page_size: env_parse("HARVESTER_PAGE_SIZE", DEFAULT_PAGE_SIZE),
            },
            queue: QueueConfig {
                exchange: env_string("HARVESTER_MQ_EXCHANGE", DEFAULT_QUEUE_NAME),
                queue: env_string("HARVESTER_MQ_QUEUE", DEFAULT_QUEUE_NAME),
                routing_key: env_string("HARVESTER_MQ_ROUTING_KEY", DEFAULT_QUEUE_NAME),
                lease_secs: env_parse("HARVESTER_LEASE_SECS", DEFAULT_LEASE_SECS),
            },
            ingest: IngestConfig {
                bulk_size: env_parse("HARVESTER_BULK_SIZE", DEFAULT_BULK_SIZE),
                app_base_url: env_string("HARVESTER_APP_BASE_URL", DEFAULT_APP_BASE_URL),
                mef_url: std::env::var("HARVESTER_MEF_URL")
                    .ok()
                    .filter(|url| !url.trim().is_empty()),
            },
            database: DatabaseConfig {
                url: env_string("DATABASE_URL", DEFAULT_DATABASE_URL),
                max_connections: env_parse(
                    "DATABASE_MAX_CONNECTIONS",
                    DEFAULT_DATABASE_MAX_CONNECTIONS,
                ),
                connect_timeout_secs: env_parse(
                    "DATABASE_CONNECT_TIMEOUT",
                    DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
                ),
            },
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.catalog.base_url.trim().is_empty() {
            anyhow::bail!("Catalog base URL cannot be empty");
        }

        if !self.catalog.base_url.starts_with("http://")
            && !self.catalog.base_url.starts_with("https://")
        {
            anyhow::bail!(
                "Catalog base URL must be an http(s) URL: {}",
                self.catalog.base_url
            );
        }

        if self.catalog.page_size == 0 {
            anyhow::bail!("Listing page size must be greater than 0");
        }

        if self.ingest.bulk_size == 0 {
            anyhow::bail!("Bulk size must be greater than 0");
        }

        for (name, value) in [
            ("exchange", &self.queue.exchange),
            ("queue", &self.queue.queue),
            ("routing key", &self.queue.routing_key),
        ] {
            if value.trim().is_empty() {
                anyhow::bail!("Queue {} cannot be empty", name);
            }
        }

        if self.database.max_connections == 0 {
            anyhow::bail!("Database max_connections must be greater than 0");
        }

        Ok(())
    }
}

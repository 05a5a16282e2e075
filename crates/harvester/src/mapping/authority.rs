//! Name-authority resolution for contributor fields
//!
//! Lookups are done before the rule pass so the rule table stays a pure,
//! synchronous function of the record.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

use super::punctuation::remove_punctuation;
use crate::error::{HarvestError, Result};
use crate::marc::{DataField, MarcRecord};

/// Tags that carry a contributor name
pub const AUTHOR_TAGS: &[&str] = &["100", "700", "710", "711"];

/// How an author field is looked up in the authority service
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AuthorityKey {
    /// External authority identifier from `$0`
    Identifier(String),
    /// Normalized `$a` name
    Name(String),
}

impl AuthorityKey {
    /// Key for a contributor field; `None` when the field has no `$a`
    pub fn for_field(field: &DataField) -> Option<Self> {
        let name = field.first('a')?;
        if let Some(id) = field.first('0').map(str::trim).filter(|id| !id.is_empty()) {
            return Some(AuthorityKey::Identifier(id.to_string()));
        }

        let normalized = remove_punctuation(name.trim())
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        if normalized.is_empty() {
            None
        } else {
            Some(AuthorityKey::Name(normalized))
        }
    }
}

/// Links resolved for one record, keyed by [`AuthorityKey`]
#[derive(Debug, Clone, Default)]
pub struct ResolvedAuthorities {
    links: HashMap<AuthorityKey, String>,
}

impl ResolvedAuthorities {
    pub fn insert(&mut self, key: AuthorityKey, link: String) {
        self.links.insert(key, link);
    }

    pub fn link_for(&self, field: &DataField) -> Option<&str> {
        let key = AuthorityKey::for_field(field)?;
        self.links.get(&key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

#[async_trait]
pub trait AuthorityResolver: Send + Sync {
    /// Resolve a key to an authority record link, `Ok(None)` when unknown
    async fn resolve(&self, key: &AuthorityKey) -> Result<Option<String>>;
}

/// Resolve every contributor field of a record.
///
/// Lookup failures are logged and leave that author with literal data.
pub async fn resolve_authorities(
    record: &MarcRecord,
    resolver: &dyn AuthorityResolver,
) -> ResolvedAuthorities {
    let mut resolved = ResolvedAuthorities::default();
    let mut seen = Vec::new();

    for tag in AUTHOR_TAGS {
        for field in record.data_fields(tag) {
            let Some(key) = AuthorityKey::for_field(field) else {
                continue;
            };
            if seen.contains(&key) {
                continue;
            }
            seen.push(key.clone());

            match resolver.resolve(&key).await {
                Ok(Some(link)) => resolved.insert(key, link),
                Ok(None) => debug!(?key, "No authority record"),
                Err(e) => warn!(?key, error = %e, "Authority lookup failed"),
            }
        }
    }

    resolved
}

#[derive(Debug, Deserialize)]
struct MefResponse {
    #[serde(default)]
    hits: MefHits,
}

#[derive(Debug, Default, Deserialize)]
struct MefHits {
    #[serde(default)]
    hits: Vec<MefHit>,
}

#[derive(Debug, Deserialize)]
struct MefHit {
    #[serde(default)]
    links: MefLinks,
}

#[derive(Debug, Default, Deserialize)]
struct MefLinks {
    #[serde(rename = "self")]
    self_link: Option<String>,
}

/// Authority lookup against a MEF (multilingual entity file) search API.
///
/// Only identifier keys are resolvable; name keys always return `None`.
pub struct MefAuthorityResolver {
    client: Client,
    base_url: String,
}

impl MefAuthorityResolver {
    pub fn new(base_url: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("catalog-harvester/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl AuthorityResolver for MefAuthorityResolver {
    async fn resolve(&self, key: &AuthorityKey) -> Result<Option<String>> {
        let AuthorityKey::Identifier(id) = key else {
            return Ok(None);
        };

        let url = format!("{}/", self.base_url);
        let query = format!("viaf_pid:{id}");
        let response = self
            .client
            .get(&url)
            .query(&[("q", query.as_str()), ("size", "1")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(HarvestError::Status {
                status: response.status().as_u16(),
                uri: url,
            });
        }

        let body: MefResponse = response.json().await?;
        Ok(body
            .hits
            .hits
            .into_iter()
            .next()
            .and_then(|hit| hit.links.self_link))
    }
}

/// Fixed key-to-link table, for offline runs and tests
#[derive(Debug, Clone, Default)]
pub struct StaticAuthorityResolver {
    links: HashMap<AuthorityKey, String>,
}

impl StaticAuthorityResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_link(mut self, key: AuthorityKey, link: impl Into<String>) -> Self {
        self.links.insert(key, link.into());
        self
    }
}

#[async_trait]
impl AuthorityResolver for StaticAuthorityResolver {
    async fn resolve(&self, key: &AuthorityKey) -> Result<Option<String>> {
        Ok(self.links.get(key).cloned())
    }
}

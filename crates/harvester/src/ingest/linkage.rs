//! Holding and item construction and their composite-key linkage

use serde::Serialize;
use std::collections::HashMap;
use tracing::warn;

use super::link_tables::LinkResolver;
use crate::catalog::{CatalogCode, RawCatalogRecord, RawHolding, RawItem};
use crate::mapping::FieldMapper;
use crate::models::{Document, EntityKind, Holding, HoldingsType, Item, Link};

/// (location, circulation category) of a holding, or
/// (location, item type) of an item
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HoldingKey {
    pub location: Option<CatalogCode>,
    pub category: Option<CatalogCode>,
}

impl HoldingKey {
    pub fn for_holding(holding: &RawHolding) -> Self {
        Self {
            location: holding.location.clone(),
            category: holding.circulation_category.clone(),
        }
    }

    pub fn for_item(item: &RawItem) -> Self {
        Self {
            location: item.location.clone(),
            category: item.item_type.clone(),
        }
    }
}

impl std::fmt::Display for HoldingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let code = |c: &Option<CatalogCode>| c.as_ref().map_or("-", |c| c.as_str()).to_string();
        write!(f, "{}#{}", code(&self.location), code(&self.category))
    }
}

/// Holding pids of one document by composite key.
///
/// A later holding with the same key replaces the earlier entry.
#[derive(Debug, Clone, Default)]
pub struct HoldingMap {
    pids: HashMap<HoldingKey, String>,
}

impl HoldingMap {
    pub fn insert(&mut self, key: HoldingKey, pid: impl Into<String>) {
        self.pids.insert(key, pid.into());
    }

    pub fn get(&self, key: &HoldingKey) -> Option<&str> {
        self.pids.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.pids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pids.is_empty()
    }
}

pub(crate) fn holdings_type_for(document: &Document) -> HoldingsType {
    if document.is_journal() {
        HoldingsType::Serial
    } else {
        HoldingsType::Standard
    }
}

pub(crate) fn build_holding(
    raw: &RawHolding,
    document: &Link,
    holdings_type: HoldingsType,
    links: &LinkResolver,
    warnings: &mut Vec<String>,
) -> Holding {
    Holding {
        pid: None,
        holdings_type,
        document: document.clone(),
        location: links.location(raw.location.as_ref(), warnings),
        circulation_category: links.item_type(raw.circulation_category.as_ref(), warnings),
        extra: raw.extra.clone(),
    }
}

/// Link to the holding sharing the item's composite key.
///
/// An item matching no holding gets no link and a warning.
pub(crate) fn resolve_holding(
    raw: &RawItem,
    document: &Link,
    holdings: &HoldingMap,
    links: &LinkResolver,
    warnings: &mut Vec<String>,
) -> Option<Link> {
    let key = HoldingKey::for_item(raw);
    match holdings.get(&key) {
        Some(pid) => Some(Link::to_resource(
            links.app_base_url(),
            EntityKind::Holding.collection(),
            pid,
        )),
        None => {
            warn!(
                document = %document.reference,
                key = %key,
                holdings = holdings.len(),
                "No holding matches item"
            );
            warnings.push(format!("no holding for item key {key}"));
            None
        }
    }
}

pub(crate) fn build_item(
    raw: &RawItem,
    document: &Link,
    holding: Option<Link>,
    links: &LinkResolver,
    warnings: &mut Vec<String>,
) -> Item {
    Item {
        pid: None,
        document: document.clone(),
        holding,
        location: links.location(raw.location.as_ref(), warnings),
        item_type: links.item_type(raw.item_type.as_ref(), warnings),
        extra: raw.extra.clone(),
    }
}

/// Mapped document with the holdings and items it would be stored with
#[derive(Debug, Clone, Serialize)]
pub struct TransformPreview {
    pub document: Document,
    pub holdings: Vec<Holding>,
    pub items: Vec<Item>,
    pub warnings: Vec<String>,
}

/// Transform one record without writing anything.
///
/// Holdings have no pid yet: items link to their holding's position in
/// `holdings` instead, and unmatched items warn as they would on ingest.
pub async fn transform_record(
    record: &RawCatalogRecord,
    mapper: &FieldMapper,
    links: &LinkResolver,
) -> TransformPreview {
    let document = mapper.map(&record.marc).await;
    let pid = document.pid.clone().unwrap_or_default();
    let document_link =
        Link::to_resource(links.app_base_url(), EntityKind::Document.collection(), pid);
    let holdings_type = holdings_type_for(&document);

    let mut warnings = Vec::new();
    let mut holding_map = HoldingMap::default();
    let mut holdings = Vec::with_capacity(record.holdings.len());
    for (position, raw) in record.holdings.iter().enumerate() {
        holdings.push(build_holding(raw, &document_link, holdings_type, links, &mut warnings));
        holding_map.insert(HoldingKey::for_holding(raw), position.to_string());
    }

    let items = record
        .items
        .iter()
        .map(|raw| {
            let holding = resolve_holding(raw, &document_link, &holding_map, links, &mut warnings);
            build_item(raw, &document_link, holding, links, &mut warnings)
        })
        .collect();

    TransformPreview {
        document,
        holdings,
        items,
        warnings,
    }
}

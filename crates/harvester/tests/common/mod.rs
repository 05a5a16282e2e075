//! Shared fixtures for the integration tests

#![allow(dead_code)]

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use harvester::catalog::{CatalogCode, RawCatalogRecord, RawHolding, RawItem};
use harvester::config::CatalogConfig;
use harvester::marc::{DataField, MarcRecord};

pub const APP_BASE_URL: &str = "https://ils.example.org";

pub const BOOK_LEADER: &str = "00000nam a2200000 a 4500";
pub const JOURNAL_LEADER: &str = "00000nas a2200000 a 4500";

/// Legacy control number for a numeric pid, e.g. 7 -> `vtls000000007`
pub fn control_number(pid: u32) -> String {
    format!("vtls{pid:09}")
}

pub fn marc(leader: &str, pid: u32, title: Option<&str>) -> MarcRecord {
    let record = MarcRecord::new(leader).with_control("001", control_number(pid));
    match title {
        Some(title) => record.with_field(DataField::new("245", '1', '0').with_subfield('a', title)),
        None => record,
    }
}

pub fn book(pid: u32, title: &str) -> RawCatalogRecord {
    RawCatalogRecord {
        id: pid.to_string(),
        marc: marc(BOOK_LEADER, pid, Some(title)),
        ..Default::default()
    }
}

pub fn holding(location: &str, category: &str) -> RawHolding {
    RawHolding {
        location: Some(CatalogCode::new(location)),
        circulation_category: Some(CatalogCode::new(category)),
        ..Default::default()
    }
}

pub fn item(location: &str, item_type: &str) -> RawItem {
    RawItem {
        location: Some(CatalogCode::new(location)),
        item_type: Some(CatalogCode::new(item_type)),
        ..Default::default()
    }
}

pub fn catalog_config(base_url: &str) -> CatalogConfig {
    CatalogConfig {
        base_url: base_url.to_string(),
        ..Default::default()
    }
}

/// MARC-XML of a book, base64-encoded the way the record endpoint serves it
pub fn encoded_book_xml(pid: u32, title: &str) -> String {
    let xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<record xmlns="http://www.loc.gov/MARC21/slim">
  <leader>{BOOK_LEADER}</leader>
  <controlfield tag="001">{}</controlfield>
  <controlfield tag="008">190101s2018    sz            000 0 fre d</controlfield>
  <datafield tag="245" ind1="1" ind2="0">
    <subfield code="a">{title}</subfield>
  </datafield>
</record>"#,
        control_number(pid)
    );
    STANDARD.encode(xml)
}

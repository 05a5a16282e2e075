//! Source record loader

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::debug;

use super::client::CatalogClient;
use super::record::{RawCatalogRecord, RecordPayload};
use crate::error::{HarvestError, Result};
use crate::marc::MarcRecord;

/// Fetches single records and decodes their MARC payload
#[derive(Clone)]
pub struct SourceRecordLoader {
    client: CatalogClient,
}

impl SourceRecordLoader {
    pub fn new(client: CatalogClient) -> Self {
        Self { client }
    }

    pub async fn load_by_id(&self, id: &str) -> Result<RawCatalogRecord> {
        let uri = self.client.record_uri(id);
        self.load(id, &uri).await
    }

    /// Load the record at `uri`; `id` is carried along for reporting
    pub async fn load(&self, id: &str, uri: &str) -> Result<RawCatalogRecord> {
        let payload: RecordPayload = self.client.get_json(uri).await?;
        let record = decode_record(id, payload)?;

        debug!(
            record_id = id,
            holdings = record.holdings.len(),
            items = record.items.len(),
            frbr_group = record.is_frbr_group,
            masked = record.is_masked,
            "Record loaded"
        );

        Ok(record)
    }
}

/// Decode the base64 MARC-XML carried in `marcXmlData.raw`
pub fn decode_marc(raw: &str) -> Result<MarcRecord> {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD.decode(compact)?;
    let xml = String::from_utf8(bytes)?;
    MarcRecord::from_xml(&xml)
}

pub(crate) fn decode_record(id: &str, payload: RecordPayload) -> Result<RawCatalogRecord> {
    let is_frbr_group = payload.is_frbr_group();

    let raw = payload
        .marc_xml_data
        .as_ref()
        .and_then(|data| data.raw.as_deref())
        .filter(|raw| !raw.trim().is_empty());

    let marc = match raw {
        Some(raw) => decode_marc(raw)?,
        // group records carry no MARC of their own and are never materialized
        None if is_frbr_group => MarcRecord::default(),
        None => return Err(HarvestError::MissingPayload(id.to_string())),
    };

    Ok(RawCatalogRecord {
        id: id.to_string(),
        is_frbr_group,
        is_masked: payload.masked,
        marc,
        holdings: payload.holdings,
        items: payload.items,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const XML: &str = r#"<record><leader>00000nam a2200000 a 4500</leader><controlfield tag="001">vtls000000001</controlfield></record>"#;

    #[test]
    fn test_decode_marc_ignores_line_breaks() {
        let encoded = STANDARD.encode(XML);
        let (head, tail) = encoded.split_at(20);
        let wrapped = format!("{head}\n{tail}\n");

        let marc = decode_marc(&wrapped).unwrap();
        assert_eq!(marc.control("001"), Some("vtls000000001"));
    }

    #[test]
    fn test_missing_payload_is_an_error() {
        let payload: RecordPayload = serde_json::from_value(json!({"items": []})).unwrap();
        assert!(matches!(
            decode_record("7", payload),
            Err(HarvestError::MissingPayload(id)) if id == "7"
        ));
    }

    #[test]
    fn test_group_record_without_payload_is_accepted() {
        let payload: RecordPayload =
            serde_json::from_value(json!({"frbrType": "WORK"})).unwrap();
        let record = decode_record("8", payload).unwrap();
        assert!(record.is_frbr_group);
    }

    #[test]
    fn test_invalid_base64_is_an_error() {
        assert!(matches!(decode_marc("@@@"), Err(HarvestError::Base64(_))));
    }
}

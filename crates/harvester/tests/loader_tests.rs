//! Integration tests for the source record loader

mod common;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use common::{catalog_config, encoded_book_xml};
use harvester::catalog::{CatalogClient, SourceRecordLoader};
use harvester::config::CatalogConfig;
use harvester::HarvestError;
use serde_json::json;
use wiremock::{
    matchers::{header, method, path},
    Mock, MockServer, ResponseTemplate,
};

fn loader(config: &CatalogConfig) -> SourceRecordLoader {
    SourceRecordLoader::new(CatalogClient::new(config).unwrap())
}

#[tokio::test]
async fn test_load_decodes_marc_and_attachments() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/bib/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "marcXmlData": { "raw": encoded_book_xml(1, "Le petit prince") },
            "frbrType": null,
            "masked": false,
            "holdings": [{ "location": 100000, "circulation_category": "1", "call_number": "843 SAI" }],
            "items": [{ "location": "100000", "item_type": 1, "barcode": "0001" }]
        })))
        .mount(&server)
        .await;

    let record = loader(&catalog_config(&server.uri()))
        .load_by_id("1")
        .await
        .unwrap();

    assert_eq!(record.id, "1");
    assert!(!record.is_frbr_group);
    assert!(!record.is_masked);
    assert_eq!(record.marc.control("001"), Some("vtls000000001"));
    assert_eq!(record.holdings.len(), 1);
    assert_eq!(
        record.holdings[0].location.as_ref().map(|c| c.as_str()),
        Some("100000")
    );
    assert_eq!(record.holdings[0].extra["call_number"], json!("843 SAI"));
    assert_eq!(
        record.items[0].item_type.as_ref().map(|c| c.as_str()),
        Some("1")
    );
}

#[tokio::test]
async fn test_load_sends_basic_credentials() {
    let server = MockServer::start().await;
    let credentials = format!("Basic {}", STANDARD.encode("harvester:secret"));

    Mock::given(method("GET"))
        .and(path("/bib/2"))
        .and(header("authorization", credentials.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "marcXmlData": { "raw": encoded_book_xml(2, "Vol de nuit") }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = CatalogConfig {
        user: "harvester".to_string(),
        password: "secret".to_string(),
        ..catalog_config(&server.uri())
    };

    let record = loader(&config).load_by_id("2").await.unwrap();
    assert!(record.holdings.is_empty());
    assert!(record.items.is_empty());
}

#[tokio::test]
async fn test_masked_and_group_flags() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/bib/3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "frbrType": "WORK",
            "isMasked": "true",
            "holdings": null
        })))
        .mount(&server)
        .await;

    let record = loader(&catalog_config(&server.uri()))
        .load_by_id("3")
        .await
        .unwrap();

    assert!(record.is_frbr_group);
    assert!(record.is_masked);
    assert!(record.holdings.is_empty());
}

#[tokio::test]
async fn test_missing_payload_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/bib/4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] })))
        .mount(&server)
        .await;

    let result = loader(&catalog_config(&server.uri())).load_by_id("4").await;
    assert!(matches!(result, Err(HarvestError::MissingPayload(id)) if id == "4"));
}

#[tokio::test]
async fn test_http_error_is_reported_with_status() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/bib/5"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let result = loader(&catalog_config(&server.uri())).load_by_id("5").await;
    assert!(matches!(result, Err(HarvestError::Status { status: 404, .. })));
}

//! Integration tests for the batched ingestor
//!
//! These exercise the full record path against the in-memory store:
//! - bulk commits and identifier-sequence repair
//! - holding/item linkage by composite key
//! - replace-on-reharvest
//! - commit failure handling
//! - per-record failure isolation and retry counting
//! - skipped and rejected records

mod common;

use common::{book, holding, item, marc, APP_BASE_URL, JOURNAL_LEADER};
use harvester::catalog::RawCatalogRecord;
use harvester::ingest::{
    transform_record, IngestOptions, Ingestor, InMemoryIndexer, InMemoryStore, LinkResolver,
    RecordOutcome,
};
use harvester::mapping::FieldMapper;
use harvester::models::{EntityKind, HoldingsType, Link};
use harvester::HarvestError;
use std::sync::Arc;

fn ingestor(store: &Arc<InMemoryStore>, indexer: &Arc<InMemoryIndexer>, bulk_size: usize, initial_load: bool) -> Ingestor {
    Ingestor::new(
        store.clone(),
        indexer.clone(),
        FieldMapper::default(),
        IngestOptions {
            bulk_size,
            initial_load,
            app_base_url: APP_BASE_URL.to_string(),
        },
    )
}

fn setup() -> (Arc<InMemoryStore>, Arc<InMemoryIndexer>) {
    (Arc::new(InMemoryStore::new()), Arc::new(InMemoryIndexer::new()))
}

// ============================================================================
// Batching
// ============================================================================

#[tokio::test]
async fn test_commits_every_bulk_size_documents() {
    let (store, indexer) = setup();
    let mut ingestor = ingestor(&store, &indexer, 2, true);

    let records: Vec<RawCatalogRecord> = (1..=5).map(|pid| book(pid, "Title")).collect();
    let stats = ingestor.ingest_all(&records).await.unwrap();

    assert_eq!(stats.created, 5);
    assert_eq!(stats.commits, 3);
    assert_eq!(store.commit_count().await, 3);
    assert_eq!(store.pending_count().await, 0);
    assert_eq!(store.documents().await.len(), 5);
}

#[tokio::test]
async fn test_finish_repairs_document_sequence() {
    let (store, indexer) = setup();
    let mut ingestor = ingestor(&store, &indexer, 10, true);

    let records = vec![book(3, "Three"), book(12, "Twelve"), book(7, "Seven")];
    ingestor.ingest_all(&records).await.unwrap();

    assert_eq!(store.sequence(EntityKind::Document).await, 12);
    // sequence repair is not a commit
    assert_eq!(store.commit_count().await, 1);
}

#[tokio::test]
async fn test_item_sequence_follows_created_items() {
    let (store, indexer) = setup();
    let mut ingestor = ingestor(&store, &indexer, 10, true);

    let mut record = book(1, "Title");
    record.holdings = vec![holding("100000", "1")];
    record.items = vec![item("100000", "1"), item("100000", "1"), item("100000", "1")];
    ingestor.ingest_all(&[record]).await.unwrap();

    assert_eq!(store.sequence(EntityKind::Item).await, 3);
}

#[tokio::test]
async fn test_indexes_holdings_then_items_then_documents() {
    let (store, indexer) = setup();
    let mut ingestor = ingestor(&store, &indexer, 10, true);

    let mut record = book(1, "Title");
    record.holdings = vec![holding("100000", "1")];
    record.items = vec![item("100000", "1")];
    ingestor.ingest_all(&[record]).await.unwrap();

    let kinds: Vec<EntityKind> = indexer.indexed().await.into_iter().map(|(kind, _)| kind).collect();
    assert_eq!(kinds, vec![EntityKind::Holding, EntityKind::Item, EntityKind::Document]);
}

// ============================================================================
// Linkage
// ============================================================================

#[tokio::test]
async fn test_items_link_to_holding_with_same_composite_key() {
    let (store, indexer) = setup();
    let mut ingestor = ingestor(&store, &indexer, 10, true);

    let mut record = book(1, "Title");
    record.holdings = vec![holding("100000", "1"), holding("100001", "2")];
    record.items = vec![item("100001", "2"), item("100000", "2")];

    let outcome = ingestor.ingest(&record).await.unwrap();
    let RecordOutcome::Created { holdings, items, warnings, .. } = outcome else {
        panic!("expected a created record, got {outcome:?}");
    };
    assert_eq!(holdings, 2);
    assert_eq!(items, 2);
    assert!(warnings.iter().any(|w| w.contains("100000#2")));

    ingestor.finish().await.unwrap();

    let holdings = store.holdings().await;
    assert_eq!(holdings.len(), 2);
    assert_eq!(holdings[1].pid.as_deref(), Some("2"));
    assert_eq!(
        holdings[1].location,
        Some(Link::new(format!("{APP_BASE_URL}/api/locations/2")))
    );
    assert_eq!(holdings[0].document, Link::new(format!("{APP_BASE_URL}/api/documents/1")));

    let items = store.items().await;
    assert_eq!(items.len(), 2);
    assert_eq!(
        items[0].holding,
        Some(Link::new(format!("{APP_BASE_URL}/api/holdings/2")))
    );
    assert_eq!(items[1].holding, None);
    assert_eq!(ingestor.stats().warnings, 1);
}

#[tokio::test]
async fn test_preview_links_items_to_holding_positions() {
    let mut record = book(1, "Title");
    record.holdings = vec![holding("100000", "1"), holding("100001", "2")];
    record.items = vec![item("100001", "2"), item("300000", "9")];

    let links = LinkResolver::new(APP_BASE_URL);
    let preview = transform_record(&record, &FieldMapper::default(), &links).await;

    assert_eq!(preview.document.pid.as_deref(), Some("1"));
    assert_eq!(preview.holdings.len(), 2);
    assert_eq!(
        preview.items[0].holding,
        Some(Link::new(format!("{APP_BASE_URL}/api/holdings/1")))
    );
    assert_eq!(preview.items[1].holding, None);
    assert!(preview
        .warnings
        .iter()
        .any(|w| w == "no holding for item key 300000#9"));
}

#[tokio::test]
async fn test_duplicate_holding_keys_keep_last() {
    let (store, indexer) = setup();
    let mut ingestor = ingestor(&store, &indexer, 10, true);

    let mut record = book(1, "Title");
    record.holdings = vec![holding("100000", "1"), holding("100000", "1")];
    record.items = vec![item("100000", "1")];
    ingestor.ingest_all(&[record]).await.unwrap();

    let items = store.items().await;
    assert_eq!(
        items[0].holding,
        Some(Link::new(format!("{APP_BASE_URL}/api/holdings/2")))
    );
}

#[tokio::test]
async fn test_journal_holdings_are_serial() {
    let (store, indexer) = setup();
    let mut ingestor = ingestor(&store, &indexer, 10, true);

    let mut record = RawCatalogRecord {
        id: "9".to_string(),
        marc: marc(JOURNAL_LEADER, 9, Some("Annual report")),
        ..Default::default()
    };
    record.holdings = vec![holding("100000", "1")];
    ingestor.ingest_all(&[record]).await.unwrap();

    let holdings = store.holdings().await;
    assert_eq!(holdings[0].holdings_type, HoldingsType::Serial);
}

#[tokio::test]
async fn test_unmapped_code_warns_and_leaves_link_empty() {
    let (store, indexer) = setup();
    let mut ingestor = ingestor(&store, &indexer, 10, true);

    let mut record = book(1, "Title");
    record.holdings = vec![holding("nowhere", "1")];
    let outcome = ingestor.ingest(&record).await.unwrap();

    let RecordOutcome::Created { warnings, .. } = outcome else {
        panic!("expected a created record");
    };
    assert_eq!(warnings, vec!["unmapped location code nowhere".to_string()]);

    ingestor.finish().await.unwrap();
    assert_eq!(store.holdings().await[0].location, None);
}

// ============================================================================
// Re-harvest
// ============================================================================

#[tokio::test]
async fn test_reharvest_replaces_existing_document() {
    let (store, indexer) = setup();
    let mut ingestor = ingestor(&store, &indexer, 10, false);

    let first = ingestor.ingest(&book(7, "First edition")).await.unwrap();
    assert!(matches!(first, RecordOutcome::Created { .. }));
    ingestor.flush().await.unwrap();

    let second = ingestor.ingest(&book(7, "Second edition")).await.unwrap();
    assert_eq!(second, RecordOutcome::Replaced { pid: "7".to_string() });

    let stats = ingestor.finish().await.unwrap();
    assert_eq!(stats.created, 1);
    assert_eq!(stats.replaced, 1);

    let documents = store.documents().await;
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].title.as_deref(), Some("Second edition"));
}

#[tokio::test]
async fn test_initial_load_never_looks_up_existing_documents() {
    let (store, indexer) = setup();
    let mut ingestor = ingestor(&store, &indexer, 10, true);

    ingestor.ingest(&book(7, "First")).await.unwrap();
    let outcome = ingestor.ingest(&book(8, "Other")).await.unwrap();
    assert!(matches!(outcome, RecordOutcome::Created { .. }));
    assert_eq!(ingestor.stats().replaced, 0);
}

// ============================================================================
// Commit failures
// ============================================================================

#[tokio::test]
async fn test_failed_intermediate_commit_keeps_batch_for_retry() {
    let (store, indexer) = setup();
    let mut ingestor = ingestor(&store, &indexer, 2, true);
    store.fail_next_commit().await;

    ingestor.ingest(&book(1, "One")).await.unwrap();
    ingestor.ingest(&book(2, "Two")).await.unwrap();
    assert_eq!(store.commit_count().await, 0);
    assert_eq!(store.pending_count().await, 2);
    assert!(indexer.indexed().await.is_empty());

    ingestor.ingest(&book(3, "Three")).await.unwrap();
    assert_eq!(store.commit_count().await, 1);
    assert_eq!(indexer.indexed().await.len(), 3);

    let stats = ingestor.finish().await.unwrap();
    assert_eq!(stats.commits, 1);
    assert_eq!(store.documents().await.len(), 3);
}

#[tokio::test]
async fn test_failed_final_commit_is_an_error() {
    let (store, indexer) = setup();
    let mut ingestor = ingestor(&store, &indexer, 10, true);

    ingestor.ingest(&book(1, "One")).await.unwrap();
    store.fail_next_commit().await;

    let result = ingestor.finish().await;
    assert!(matches!(result, Err(HarvestError::Commit(_))));
    assert!(store.documents().await.is_empty());
}

// ============================================================================
// Per-record isolation
// ============================================================================

#[tokio::test]
async fn test_record_failing_halfway_leaves_nothing_behind() {
    let (store, indexer) = setup();
    let mut ingestor = ingestor(&store, &indexer, 10, true);

    let mut broken = book(1, "Broken");
    broken.holdings = vec![holding("100000", "1")];
    // the document write passes, the holding write fails
    store.fail_write_after(1).await;

    assert!(ingestor.ingest(&broken).await.is_err());
    assert_eq!(store.pending_count().await, 0);

    let outcome = ingestor.ingest(&book(2, "Fine")).await.unwrap();
    assert!(matches!(outcome, RecordOutcome::Created { .. }));

    let stats = ingestor.finish().await.unwrap();
    assert_eq!(stats.created, 1);
    assert_eq!(stats.failed, 1);

    let documents = store.documents().await;
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].pid.as_deref(), Some("2"));
    assert!(store.holdings().await.is_empty());
    assert_eq!(indexer.indexed().await.len(), 1);
}

#[tokio::test]
async fn test_duplicate_pid_in_initial_load_is_rejected_and_batch_survives() {
    let (store, indexer) = setup();
    let mut ingestor = ingestor(&store, &indexer, 10, true);
    ingestor.ingest(&book(1, "Existing")).await.unwrap();
    ingestor.flush().await.unwrap();

    let second = ingestor.ingest(&book(2, "Two")).await.unwrap();
    let duplicate = ingestor.ingest(&book(1, "Again")).await.unwrap();
    let third = ingestor.ingest(&book(3, "Three")).await.unwrap();

    assert!(matches!(second, RecordOutcome::Created { .. }));
    let RecordOutcome::Rejected(reason) = duplicate else {
        panic!("expected a rejected duplicate, got {duplicate:?}");
    };
    assert!(reason.contains("already exists"));
    assert!(matches!(third, RecordOutcome::Created { .. }));

    let stats = ingestor.finish().await.unwrap();
    assert_eq!(stats.created, 3);
    assert_eq!(stats.rejected, 1);

    let pids: Vec<String> = store
        .documents()
        .await
        .into_iter()
        .filter_map(|d| d.pid)
        .collect();
    assert_eq!(pids, vec!["1", "2", "3"]);
    assert_eq!(store.documents().await[0].title.as_deref(), Some("Existing"));
}

#[tokio::test]
async fn test_record_refused_at_commit_is_counted_and_not_indexed() {
    let (store, indexer) = setup();
    let mut ingestor = ingestor(&store, &indexer, 10, true);

    ingestor.ingest(&book(1, "One")).await.unwrap();
    let mut refused = book(2, "Two");
    refused.holdings = vec![holding("100000", "1")];
    ingestor.ingest(&refused).await.unwrap();
    store.refuse_on_commit("2").await;

    let stats = ingestor.finish().await.unwrap();
    assert_eq!(stats.dropped, 1);
    assert_eq!(stats.commits, 1);
    assert_eq!(store.documents().await.len(), 1);
    assert!(store.holdings().await.is_empty());

    let kinds: Vec<EntityKind> = indexer.indexed().await.into_iter().map(|(kind, _)| kind).collect();
    assert_eq!(kinds, vec![EntityKind::Document]);
}

#[tokio::test]
async fn test_failed_attempt_then_successful_retry_counts_one_record() {
    let (store, indexer) = setup();
    let mut ingestor = ingestor(&store, &indexer, 10, true);
    store.fail_write_after(0).await;

    assert!(ingestor.ingest(&book(5, "Retried")).await.is_err());
    let retry = ingestor.ingest(&book(5, "Retried")).await.unwrap();
    assert!(matches!(retry, RecordOutcome::Created { .. }));

    let stats = ingestor.finish().await.unwrap();
    assert_eq!(stats.total_records, 1);
    assert_eq!(stats.created, 1);
    assert_eq!(stats.rejected, 0);
    assert_eq!(stats.failed, 1);
}

// ============================================================================
// Skipped and rejected records
// ============================================================================

#[tokio::test]
async fn test_group_and_masked_records_are_skipped() {
    let (store, indexer) = setup();
    let mut ingestor = ingestor(&store, &indexer, 10, true);

    let group = RawCatalogRecord {
        is_frbr_group: true,
        ..book(1, "Work")
    };
    let masked = RawCatalogRecord {
        is_masked: true,
        ..book(2, "Hidden")
    };

    assert!(matches!(ingestor.ingest(&group).await.unwrap(), RecordOutcome::Skipped(_)));
    assert!(matches!(ingestor.ingest(&masked).await.unwrap(), RecordOutcome::Skipped(_)));

    let stats = ingestor.finish().await.unwrap();
    assert_eq!(stats.skipped, 2);
    assert_eq!(stats.total_records, 2);
    assert_eq!(store.commit_count().await, 0);
    assert!(store.documents().await.is_empty());
}

#[tokio::test]
async fn test_record_without_title_is_rejected() {
    let (store, indexer) = setup();
    let mut ingestor = ingestor(&store, &indexer, 10, true);

    let record = RawCatalogRecord {
        id: "4".to_string(),
        marc: marc(common::BOOK_LEADER, 4, None),
        ..Default::default()
    };

    let outcome = ingestor.ingest(&record).await.unwrap();
    let RecordOutcome::Rejected(reason) = outcome else {
        panic!("expected a rejected record");
    };
    assert!(reason.contains("title"));

    let stats = ingestor.finish().await.unwrap();
    assert_eq!(stats.rejected, 1);
    assert!(store.documents().await.is_empty());
}

//! Ingestion counters

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Counters for one ingestion run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestStats {
    /// Records seen, whatever their outcome
    pub total_records: u64,
    pub created: u64,
    pub replaced: u64,
    /// FRBR group and masked records
    pub skipped: u64,
    /// Records refused by validation or by a pid conflict
    pub rejected: u64,
    /// Attempts that failed to load or store and went back to the queue
    pub failed: u64,
    /// Records the store rolled back while committing their batch
    pub dropped: u64,
    pub holdings: u64,
    pub items: u64,
    /// Linkage warnings (unmapped codes, unmatched items)
    pub warnings: u64,
    pub commits: u64,
    pub duration_secs: f64,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl IngestStats {
    pub fn new() -> Self {
        Self {
            started_at: Some(Utc::now()),
            ..Default::default()
        }
    }

    pub fn complete(&mut self) {
        self.completed_at = Some(Utc::now());
        if let (Some(start), Some(end)) = (self.started_at, self.completed_at) {
            self.duration_secs = (end - start).num_milliseconds() as f64 / 1000.0;
        }
    }

    pub fn inc_created(&mut self) {
        self.created += 1;
        self.total_records += 1;
    }

    pub fn inc_replaced(&mut self) {
        self.replaced += 1;
        self.total_records += 1;
    }

    pub fn inc_skipped(&mut self) {
        self.skipped += 1;
        self.total_records += 1;
    }

    pub fn inc_rejected(&mut self) {
        self.rejected += 1;
        self.total_records += 1;
    }

    /// Not a record outcome: the retry will be counted again
    pub fn inc_failed(&mut self) {
        self.failed += 1;
    }

    pub fn inc_dropped(&mut self) {
        self.dropped += 1;
    }

    pub fn add_linked(&mut self, holdings: usize, items: usize, warnings: usize) {
        self.holdings += holdings as u64;
        self.items += items as u64;
        self.warnings += warnings as u64;
    }

    pub fn inc_commits(&mut self) {
        self.commits += 1;
    }

    pub fn records_per_second(&self) -> f64 {
        if self.duration_secs > 0.0 {
            self.total_records as f64 / self.duration_secs
        } else {
            0.0
        }
    }

    /// Merge the counters of another worker
    pub fn merge(self, other: Self) -> Self {
        Self {
            total_records: self.total_records + other.total_records,
            created: self.created + other.created,
            replaced: self.replaced + other.replaced,
            skipped: self.skipped + other.skipped,
            rejected: self.rejected + other.rejected,
            failed: self.failed + other.failed,
            dropped: self.dropped + other.dropped,
            holdings: self.holdings + other.holdings,
            items: self.items + other.items,
            warnings: self.warnings + other.warnings,
            commits: self.commits + other.commits,
            duration_secs: self.duration_secs.max(other.duration_secs),
            started_at: match (self.started_at, other.started_at) {
                (Some(a), Some(b)) => Some(a.min(b)),
                (a, b) => a.or(b),
            },
            completed_at: match (self.completed_at, other.completed_at) {
                (Some(a), Some(b)) => Some(a.max(b)),
                (a, b) => a.or(b),
            },
        }
    }
}

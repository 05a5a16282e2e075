//! JSON export of stored entities

use std::path::{Path, PathBuf};
use tracing::info;

use super::store::RecordStore;
use crate::error::Result;
use crate::models::EntityKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub path: PathBuf,
    pub count: usize,
}

/// Write every committed entity of `kind` to `{directory}/{pid_type}.json`
/// as one pretty-printed JSON array, creating the directory if needed
pub async fn export_records(
    store: &dyn RecordStore,
    kind: EntityKind,
    directory: &Path,
) -> Result<ExportSummary> {
    tokio::fs::create_dir_all(directory).await?;

    let records = store.all_entities(kind).await?;
    let path = directory.join(format!("{}.json", kind.pid_type()));
    tokio::fs::write(&path, serde_json::to_string_pretty(&records)?).await?;

    info!(kind = %kind, count = records.len(), path = %path.display(), "Records exported");
    Ok(ExportSummary {
        path,
        count: records.len(),
    })
}

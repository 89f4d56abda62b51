//! Batched item creation with per-batch failure isolation.

use crate::error::Result;
use crate::types::{CreateResponse, Stage, StageError, ZoteroItem};
use async_trait::async_trait;

/// Destination that creates items in one request.
#[async_trait]
pub trait ItemSink: Send + Sync {
    async fn create_items(&self, items: &[ZoteroItem]) -> Result<CreateResponse>;
}

/// Totals of a [`write_all`] run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteSummary {
    pub imported: usize,
    pub failures: usize,
    pub errors: Vec<StageError>,
}

/// Submit `items` in chunks of `batch_size`, one create request per chunk.
///
/// A chunk whose request fails outright contributes nothing to `imported`
/// and one `write` error; the remaining chunks are still sent.
pub async fn write_all<S>(sink: &S, items: &[ZoteroItem], batch_size: usize) -> WriteSummary
where
    S: ItemSink + ?Sized,
{
    let mut summary = WriteSummary::default();
    let batch_size = batch_size.max(1);

    for (index, chunk) in items.chunks(batch_size).enumerate() {
        let start = index * batch_size;
        let label = format!("batch {} (items {}-{})", index + 1, start + 1, start + chunk.len());

        match sink.create_items(chunk).await {
            Ok(response) => {
                tracing::debug!(
                    chunk = index + 1,
                    accepted = response.successful.len(),
                    rejected = response.unsuccessful.len(),
                    "Create request finished"
                );
                for (position, message) in &response.unsuccessful {
                    tracing::warn!(
                        chunk = index + 1,
                        item = start + position + 1,
                        "Zotero rejected item: {}",
                        message
                    );
                }
                summary.imported += response.successful.len();
                summary.failures += response.unsuccessful.len();
            }
            Err(e) => {
                tracing::warn!(chunk = index + 1, error = %e, "Create request failed");
                summary.errors.push(StageError {
                    subject_id: label,
                    stage: Stage::Write,
                    message: e.stage_message(),
                });
            }
        }
    }

    summary
}

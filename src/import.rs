//! The HAL-to-Zotero import pipeline.
//!
//! identifiers → normalize → (fetch → map → validate) per identifier →
//! translate → batched create. Per-identifier and per-batch failures end
//! up in the report; only a request with no usable identifier fails as a
//! whole.

use crate::catalog::{CatalogSource, HalClient};
use crate::client::ZoteroClient;
use crate::config::{Config, DEFAULT_BATCH_SIZE, MAX_BATCH_SIZE};
use crate::error::Result;
use crate::identifiers::normalize_identifiers;
use crate::parse::map_document;
use crate::translate::to_zotero_item;
use crate::types::{ImportReport, Stage, StageError, ZoteroItem};
use crate::validate::is_importable;
use crate::writer::{write_all, ItemSink};
use futures::stream::{self, StreamExt};

/// Import pipeline over a catalog source and an item sink.
pub struct Importer<C, S> {
    catalog: C,
    sink: S,
    collection: Option<String>,
    fetch_concurrency: usize,
    batch_size: usize,
}

impl Importer<HalClient, ZoteroClient> {
    /// Pipeline against the real HAL and Zotero services.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        Ok(Importer::new(HalClient::new(config)?, ZoteroClient::new(config)?).with_config(config))
    }
}

impl<C, S> Importer<C, S>
where
    C: CatalogSource,
    S: ItemSink,
{
    pub fn new(catalog: C, sink: S) -> Self {
        Self {
            catalog,
            sink,
            collection: None,
            fetch_concurrency: 4,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Take collection, concurrency and batch size from `config`.
    pub fn with_config(self, config: &Config) -> Self {
        let importer = self
            .with_fetch_concurrency(config.fetch_concurrency)
            .with_batch_size(config.batch_size);
        match &config.collection {
            Some(collection) => importer.with_collection(collection.clone()),
            None => importer,
        }
    }

    #[cfg(test)]
    pub(crate) fn sink(&self) -> &S {
        &self.sink
    }

    /// File every created item in this collection.
    pub fn with_collection(mut self, key: impl Into<String>) -> Self {
        self.collection = Some(key.into());
        self
    }

    pub fn with_fetch_concurrency(mut self, n: usize) -> Self {
        self.fetch_concurrency = n.max(1);
        self
    }

    /// Items per create request, clamped to what Zotero accepts.
    pub fn with_batch_size(mut self, n: usize) -> Self {
        self.batch_size = n.clamp(1, MAX_BATCH_SIZE);
        self
    }

    /// Run one import over raw, possibly messy identifiers.
    pub async fn run<T: AsRef<str>>(&self, raw_identifiers: &[T]) -> Result<ImportReport> {
        let identifiers = normalize_identifiers(raw_identifiers)?;
        let mut report = ImportReport {
            requested: identifiers.len(),
            ..Default::default()
        };

        // Lookups run concurrently; `buffered` keeps results in input order.
        let lookups: Vec<_> = stream::iter(identifiers.iter())
            .map(|id| async move { (id, self.catalog.fetch(id).await) })
            .buffered(self.fetch_concurrency)
            .collect()
            .await;

        let mut items: Vec<ZoteroItem> = Vec::new();
        for (id, lookup) in lookups {
            let doc = match lookup {
                Ok(Some(doc)) => doc,
                Ok(None) => {
                    tracing::debug!(identifier = %id, "No catalog match");
                    continue;
                }
                Err(e) => {
                    tracing::warn!(identifier = %id, error = %e, "Catalog lookup failed");
                    report.errors.push(StageError {
                        subject_id: id.clone(),
                        stage: Stage::Fetch,
                        message: e.stage_message(),
                    });
                    continue;
                }
            };
            report.fetched += 1;

            let Some(record) = map_document(&doc) else {
                tracing::debug!(
                    identifier = %id,
                    doc_type = doc.doc_type().unwrap_or(""),
                    "Unsupported document type"
                );
                continue;
            };
            if !is_importable(&record) {
                tracing::debug!(identifier = %id, record_type = %record.record_type, "Record incomplete");
                continue;
            }
            items.push(to_zotero_item(&record, self.collection.as_deref()));
        }

        report.importable = items.len();
        report.skipped = report.requested - report.importable;

        let written = write_all(&self.sink, &items, self.batch_size).await;
        report.imported = written.imported;
        report.failures = written.failures;
        report.errors.extend(written.errors);

        tracing::info!(
            requested = report.requested,
            fetched = report.fetched,
            importable = report.importable,
            imported = report.imported,
            skipped = report.skipped,
            failures = report.failures,
            errors = report.errors.len(),
            "Import finished"
        );
        Ok(report)
    }
}

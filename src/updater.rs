//! Version-checked flag updates on a single Zotero item.
//!
//! An update reads the item and its version, merges the requested flags
//! into `extra`, and writes the full item back on condition that the
//! version is unchanged. A conflict is reported to the caller and never
//! retried here: whoever asked must re-read and decide again.

use crate::error::{Error, Result};
use crate::flags::{self, FlagBlock};
use crate::types::{FlagUpdateOutcome, StoredItem, WriteOutcome};
use async_trait::async_trait;

/// Item storage with optimistic concurrency.
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Read one item. Fails with [`Error::NotFound`] for unknown keys.
    async fn get_item(&self, key: &str) -> Result<StoredItem>;

    /// Replace an item's data if its version is still `version`.
    async fn update_item(
        &self,
        key: &str,
        data: &serde_json::Map<String, serde_json::Value>,
        version: u64,
    ) -> Result<WriteOutcome>;
}

/// Apply flag `updates` to the item `key`.
///
/// Errors are reserved for a malformed request (including a key the store
/// refuses as malformed) and for a read that comes back without a version;
/// every other ending is a [`FlagUpdateOutcome`].
pub async fn update_flags<S, I, K, V>(store: &S, key: &str, updates: I) -> Result<FlagUpdateOutcome>
where
    S: ItemStore + ?Sized,
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let key = key.trim();
    if key.is_empty() {
        return Err(Error::InvalidInput("item key is empty".to_string()));
    }
    let updates: Vec<(K, V)> = updates.into_iter().collect();

    // Fetching
    let mut item = match store.get_item(key).await {
        Ok(item) => item,
        Err(Error::NotFound(_)) => {
            tracing::debug!(key = %key, "Item not found");
            return Ok(FlagUpdateOutcome::NotFound);
        }
        Err(e @ Error::InvalidInput(_)) => return Err(e),
        Err(e) => {
            tracing::warn!(key = %key, error = %e, "Item read failed");
            return Ok(FlagUpdateOutcome::Failed {
                message: e.stage_message(),
            });
        }
    };
    let version = item
        .version
        .ok_or_else(|| Error::MissingVersion(key.to_string()))?;

    // Merging
    let extra = flags::merge(
        item.extra(),
        updates.iter().map(|(k, v)| (k.as_ref(), v.as_ref())),
    );
    item.data
        .insert("extra".to_string(), serde_json::Value::String(extra));

    // Writing
    let outcome = match store.update_item(key, &item.data, version).await {
        Ok(WriteOutcome::Applied { version: new_version }) => {
            tracing::info!(key = %key, from = version, to = ?new_version, "Flags updated");
            FlagUpdateOutcome::Done
        }
        Ok(WriteOutcome::Conflict) => {
            tracing::info!(key = %key, version, "Item changed since it was read");
            FlagUpdateOutcome::Conflict { version }
        }
        Ok(WriteOutcome::Rejected { status, message }) => {
            tracing::warn!(key = %key, status, "Flag write rejected");
            FlagUpdateOutcome::Failed {
                message: Error::Upstream { status, message }.stage_message(),
            }
        }
        Err(e) => {
            tracing::warn!(key = %key, error = %e, "Flag write failed");
            FlagUpdateOutcome::Failed {
                message: e.stage_message(),
            }
        }
    };
    Ok(outcome)
}

/// Current flags of the item `key`.
pub async fn read_flags<S>(store: &S, key: &str) -> Result<FlagBlock>
where
    S: ItemStore + ?Sized,
{
    let item = store.get_item(key.trim()).await?;
    Ok(flags::parse(item.extra()))
}

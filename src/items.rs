//! Zotero item endpoints: create, read, conditional update.

use crate::client::{handle_response, version_header, ZoteroClient};
use crate::error::{Error, Result};
use crate::types::{CreateResponse, StoredItem, WriteOutcome, ZoteroItem};
use crate::updater::ItemStore;
use crate::writer::ItemSink;
use async_trait::async_trait;
use serde_json::Value;

impl ZoteroClient {
    /// Create items in one request.
    pub async fn create(&self, items: &[ZoteroItem]) -> Result<CreateResponse> {
        let body = serde_json::to_value(items)?;
        let response_body = self.post_json("/items", &body).await?;
        parse_create_response(&response_body)
    }

    /// Read one item with its version.
    pub async fn fetch_item(&self, key: &str) -> Result<StoredItem> {
        check_item_key(key)?;
        let response = self.get(&format!("/items/{}", key)).await?;
        if response.status().as_u16() == 404 {
            return Err(Error::NotFound(format!("item {}", key)));
        }
        let header_version = version_header(&response);
        let body = handle_response(response).await?;
        parse_item_response(key, &body, header_version)
    }

    /// Replace an item's data, conditioned on `version`.
    pub async fn replace_item(
        &self,
        key: &str,
        data: &serde_json::Map<String, Value>,
        version: u64,
    ) -> Result<WriteOutcome> {
        check_item_key(key)?;
        let body = Value::Object(data.clone());
        let response = self
            .put_json_if_version(&format!("/items/{}", key), &body, version)
            .await?;

        let status = response.status().as_u16();
        match status {
            200..=299 => Ok(WriteOutcome::Applied {
                version: version_header(&response),
            }),
            412 => Ok(WriteOutcome::Conflict),
            _ => {
                let message = response.text().await.unwrap_or_default();
                Ok(WriteOutcome::Rejected { status, message })
            }
        }
    }
}

#[async_trait]
impl ItemSink for ZoteroClient {
    async fn create_items(&self, items: &[ZoteroItem]) -> Result<CreateResponse> {
        self.create(items).await
    }
}

#[async_trait]
impl ItemStore for ZoteroClient {
    async fn get_item(&self, key: &str) -> Result<StoredItem> {
        self.fetch_item(key).await
    }

    async fn update_item(
        &self,
        key: &str,
        data: &serde_json::Map<String, Value>,
        version: u64,
    ) -> Result<WriteOutcome> {
        self.replace_item(key, data, version).await
    }
}

/// Alphabet of Zotero object keys: digits and capitals without 0, 1 and O.
const KEY_ALPHABET: &str = "23456789ABCDEFGHIJKLMNPQRSTUVWXYZ";

/// Reject anything that is not an 8-character Zotero key before it is put
/// into a request path.
pub fn check_item_key(key: &str) -> Result<()> {
    if key.len() == 8 && key.chars().all(|c| KEY_ALPHABET.contains(c)) {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!("'{}' is not a Zotero item key", key)))
    }
}

/// Parse the body of a multi-item create request.
///
/// Accepted items appear under `successful` (or the older `success` map of
/// keys); rejected ones under `unsuccessful` or `failed`.
pub fn parse_create_response(json: &str) -> Result<CreateResponse> {
    let parsed: Value = serde_json::from_str(json)
        .map_err(|e| Error::Parse(format!("Invalid create response: {}", e)))?;
    if !parsed.is_object() {
        return Err(Error::Parse("Create response is not an object".to_string()));
    }

    let mut response = CreateResponse::default();

    for field in ["successful", "success"] {
        for (index, entry) in indexed_entries(&parsed[field]) {
            let key = entry
                .as_str()
                .or_else(|| entry["key"].as_str())
                .or_else(|| entry["data"]["key"].as_str())
                .unwrap_or("")
                .to_string();
            response.successful.entry(index).or_insert(key);
        }
    }

    for field in ["unsuccessful", "failed"] {
        for (index, entry) in indexed_entries(&parsed[field]) {
            let message = match (entry["code"].as_u64(), entry["message"].as_str()) {
                (Some(code), Some(msg)) => format!("{}: {}", code, msg),
                (None, Some(msg)) => msg.to_string(),
                _ => entry.to_string(),
            };
            response.unsuccessful.entry(index).or_insert(message);
        }
    }

    Ok(response)
}

fn indexed_entries(map: &Value) -> Vec<(usize, &Value)> {
    map.as_object()
        .map(|m| {
            m.iter()
                .filter_map(|(k, v)| k.parse::<usize>().ok().map(|i| (i, v)))
                .collect()
        })
        .unwrap_or_default()
}

/// Parse a single-item read. The version comes from the body when present,
/// else from the `Last-Modified-Version` header.
pub fn parse_item_response(key: &str, json: &str, header_version: Option<u64>) -> Result<StoredItem> {
    let parsed: Value = serde_json::from_str(json)
        .map_err(|e| Error::Parse(format!("Invalid item response: {}", e)))?;

    let data = parsed["data"]
        .as_object()
        .cloned()
        .ok_or_else(|| Error::Parse(format!("Item {} has no data object", key)))?;

    let version = parsed["version"]
        .as_u64()
        .or_else(|| data.get("version").and_then(Value::as_u64))
        .or(header_version);

    Ok(StoredItem {
        key: parsed["key"].as_str().unwrap_or(key).to_string(),
        version,
        data,
    })
}

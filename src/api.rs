//! JSON entrypoints used by the CLI and the stdio server.
//!
//! Requests arrive as loose JSON; shape errors become
//! [`Error::InvalidInput`] before any remote call is made.

use crate::catalog::{CatalogSource, HalClient};
use crate::client::ZoteroClient;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::flags::FlagBlock;
use crate::import::Importer;
use crate::types::{FlagUpdateOutcome, ImportReport};
use crate::updater::{self, ItemStore};
use crate::writer::ItemSink;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Body of an import request.
#[derive(Debug, Clone, Deserialize)]
pub struct ImportRequest {
    pub identifiers: Vec<String>,
}

/// Body of a flag update request.
#[derive(Debug, Clone, Deserialize)]
pub struct FlagUpdateRequest {
    pub key: String,
    pub updates: BTreeMap<String, String>,
}

/// Error part of a [`FlagUpdateResponse`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponseError {
    pub kind: &'static str,
    pub message: String,
}

/// `{"ok": true}` or `{"ok": false, "error": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlagUpdateResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ResponseError>,
}

impl FlagUpdateResponse {
    fn ok() -> Self {
        Self {
            ok: true,
            error: None,
        }
    }

    fn error(kind: &'static str, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(ResponseError {
                kind,
                message: message.into(),
            }),
        }
    }

    fn from_outcome(key: &str, outcome: FlagUpdateOutcome) -> Self {
        match outcome {
            FlagUpdateOutcome::Done => Self::ok(),
            FlagUpdateOutcome::Conflict { version } => Self::error(
                "conflict",
                format!(
                    "Item {} changed after version {}; reload it and try again",
                    key, version
                ),
            ),
            FlagUpdateOutcome::NotFound => Self::error("notFound", format!("Item {} not found", key)),
            FlagUpdateOutcome::Failed { message } => Self::error("failed", message),
        }
    }

    fn from_error(err: &Error) -> Self {
        let kind = match err {
            Error::InvalidInput(_) => "invalidInput",
            Error::MissingVersion(_) => "missingVersion",
            Error::NotFound(_) => "notFound",
            Error::VersionConflict { .. } => "conflict",
            _ => "failed",
        };
        Self::error(kind, err.to_string())
    }
}

/// Decode an import request body.
pub fn parse_import_request(request: &Value) -> Result<ImportRequest> {
    serde_json::from_value(request.clone())
        .map_err(|e| Error::InvalidInput(format!("expected {{\"identifiers\": [string]}}: {}", e)))
}

/// Decode a flag update request body.
pub fn parse_flag_update_request(request: &Value) -> Result<FlagUpdateRequest> {
    serde_json::from_value(request.clone()).map_err(|e| {
        Error::InvalidInput(format!(
            "expected {{\"key\": string, \"updates\": {{string: string}}}}: {}",
            e
        ))
    })
}

/// The import pipeline plus the item store flag updates go through.
pub struct Api<C, S, T> {
    importer: Importer<C, S>,
    store: T,
}

impl Api<HalClient, ZoteroClient, ZoteroClient> {
    /// One Zotero client serves both imports and flag updates, so they
    /// share pacing.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let zotero = ZoteroClient::new(config)?;
        Ok(Self {
            importer: Importer::new(HalClient::new(config)?, zotero.clone()).with_config(config),
            store: zotero,
        })
    }
}

impl<C, S, T> Api<C, S, T>
where
    C: CatalogSource,
    S: ItemSink,
    T: ItemStore,
{
    pub fn new(importer: Importer<C, S>, store: T) -> Self {
        Self { importer, store }
    }

    /// Run an import from `{"identifiers": [...]}`.
    pub async fn import(&self, request: &Value) -> Result<ImportReport> {
        let request = parse_import_request(request)?;
        self.importer.run(&request.identifiers).await
    }

    /// Apply `{"key": ..., "updates": {...}}`. Never fails; every ending is
    /// encoded in the response.
    pub async fn update_flags(&self, request: &Value) -> FlagUpdateResponse {
        let request = match parse_flag_update_request(request) {
            Ok(r) => r,
            Err(e) => return FlagUpdateResponse::from_error(&e),
        };
        match updater::update_flags(&self.store, &request.key, &request.updates).await {
            Ok(outcome) => FlagUpdateResponse::from_outcome(request.key.trim(), outcome),
            Err(e) => FlagUpdateResponse::from_error(&e),
        }
    }

    /// Current flags of one item.
    pub async fn read_flags(&self, key: &str) -> Result<FlagBlock> {
        if key.trim().is_empty() {
            return Err(Error::InvalidInput("item key is empty".to_string()));
        }
        updater::read_flags(&self.store, key).await
    }
}

//! Public types shared by the pipeline stages.
//!
//! [`Record`] is the catalog- and service-agnostic shape every HAL document
//! is mapped into; [`ZoteroItem`] is what gets sent to Zotero.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The three item types the pipeline knows how to import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RecordType {
    Book,
    BookSection,
    JournalArticle,
}

impl RecordType {
    /// Zotero `itemType` string.
    pub fn as_api_str(&self) -> &'static str {
        match self {
            Self::Book => "book",
            Self::BookSection => "bookSection",
            Self::JournalArticle => "journalArticle",
        }
    }

    /// Resolve a HAL `docType_s` code. Unknown codes yield `None`.
    pub fn from_hal_doc_type(code: &str) -> Option<Self> {
        match code.trim().to_uppercase().as_str() {
            "ART" => Some(Self::JournalArticle),
            "OUV" | "DOUV" => Some(Self::Book),
            "COUV" => Some(Self::BookSection),
            _ => None,
        }
    }
}

impl std::fmt::Display for RecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_api_str())
    }
}

/// One author. Either part may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub first_name: String,
    pub last_name: String,
}

impl Author {
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
        }
    }

    /// Split a free-form full name.
    ///
    /// "Last, First" splits at the comma; otherwise the final word is the
    /// last name and everything before it the first name.
    pub fn from_full_name(name: &str) -> Self {
        let name = name.trim();
        if let Some((last, first)) = name.split_once(',') {
            return Self::new(first.trim(), last.trim());
        }
        let words: Vec<&str> = name.split_whitespace().collect();
        match words.split_last() {
            Some((last, rest)) => Self::new(rest.join(" "), *last),
            None => Self::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.first_name.is_empty() && self.last_name.is_empty()
    }
}

/// Normalized bibliographic record.
///
/// Optional fields are empty strings when the source had nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub record_type: RecordType,
    pub title: String,
    pub authors: Vec<Author>,
    pub date: String,
    pub publisher: String,
    pub place: String,
    pub pages: String,
    pub isbn: String,
    pub book_title: String,
    pub series: String,
    pub series_number: String,
    pub volume: String,
    pub edition: String,
    pub publication_name: String,
    pub article_volume: String,
    pub article_issue: String,
    pub doi: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub language: String,
    pub extra_text: String,
}

impl Record {
    /// Empty record of the given type.
    pub fn new(record_type: RecordType) -> Self {
        Self {
            record_type,
            title: String::new(),
            authors: Vec::new(),
            date: String::new(),
            publisher: String::new(),
            place: String::new(),
            pages: String::new(),
            isbn: String::new(),
            book_title: String::new(),
            series: String::new(),
            series_number: String::new(),
            volume: String::new(),
            edition: String::new(),
            publication_name: String::new(),
            article_volume: String::new(),
            article_issue: String::new(),
            doi: String::new(),
            abstract_text: String::new(),
            language: String::new(),
            extra_text: String::new(),
        }
    }
}

/// A Zotero creator entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Creator {
    pub creator_type: String,
    pub first_name: String,
    pub last_name: String,
}

impl Creator {
    pub fn author(author: &Author) -> Self {
        Self {
            creator_type: "author".to_string(),
            first_name: author.first_name.clone(),
            last_name: author.last_name.clone(),
        }
    }
}

/// An item in Zotero's write schema.
///
/// `fields` holds exactly the type-specific fields Zotero accepts for
/// `item_type`; Zotero rejects the whole item on an unknown field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoteroItem {
    pub item_type: RecordType,
    pub creators: Vec<Creator>,
    #[serde(flatten)]
    pub fields: BTreeMap<String, String>,
    pub tags: Vec<serde_json::Value>,
    pub collections: Vec<String>,
    pub relations: serde_json::Map<String, serde_json::Value>,
}

impl ZoteroItem {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// An existing Zotero item as returned by a single-item read.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredItem {
    pub key: String,
    /// Library version of the item, if the server sent one.
    pub version: Option<u64>,
    /// The full editable field set (`data` object).
    pub data: serde_json::Map<String, serde_json::Value>,
}

impl StoredItem {
    /// The item's free-text `extra` field, empty if absent.
    pub fn extra(&self) -> &str {
        self.data
            .get("extra")
            .and_then(|v| v.as_str())
            .unwrap_or("")
    }
}

/// Per-item and per-batch outcome of a Zotero create request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateResponse {
    /// Keys of accepted items, indexed by request position.
    pub successful: BTreeMap<usize, String>,
    /// Rejection messages, indexed by request position.
    pub unsuccessful: BTreeMap<usize, String>,
}

/// Result of a version-conditioned write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Applied; carries the new library version when reported.
    Applied { version: Option<u64> },
    /// The item changed since it was read (HTTP 412).
    Conflict,
    /// Any other refusal.
    Rejected { status: u16, message: String },
}

/// Pipeline stage an import error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Fetch,
    Write,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fetch => f.write_str("fetch"),
            Self::Write => f.write_str("write"),
        }
    }
}

/// One recorded failure in an import run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageError {
    /// Identifier (fetch) or batch label (write) the failure belongs to.
    pub subject_id: String,
    pub stage: Stage,
    pub message: String,
}

/// Aggregate result of one import run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    /// Distinct identifiers after normalization.
    pub requested: usize,
    /// Identifiers that resolved to a catalog document.
    pub fetched: usize,
    /// Records that passed mapping and validation.
    pub importable: usize,
    /// Items Zotero accepted.
    pub imported: usize,
    /// `requested - importable`.
    pub skipped: usize,
    /// Items Zotero rejected inside an accepted batch.
    pub failures: usize,
    pub errors: Vec<StageError>,
}

/// Terminal state of a flag update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlagUpdateOutcome {
    Done,
    /// Someone else wrote the item after it was read at `version`;
    /// re-read and decide again.
    Conflict { version: u64 },
    NotFound,
    Failed { message: String },
}

impl FlagUpdateOutcome {
    /// `Ok(())` for [`FlagUpdateOutcome::Done`], the matching error otherwise.
    pub fn into_result(self, key: &str) -> crate::error::Result<()> {
        use crate::error::Error;
        match self {
            Self::Done => Ok(()),
            Self::Conflict { version } => Err(Error::VersionConflict {
                key: key.to_string(),
                version,
            }),
            Self::NotFound => Err(Error::NotFound(format!("item {}", key))),
            Self::Failed { message } => Err(Error::WriteFailed(message)),
        }
    }
}

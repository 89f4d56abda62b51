//! Completeness gate applied before translation.
//!
//! A record that fails here is skipped silently and only counted.

use crate::types::{Record, RecordType};

/// Whether `record` carries enough data to be imported.
///
/// All types need a title, at least one author with a last name, and a
/// date. Books also need publisher and place; book sections additionally
/// need the containing book's title; journal articles need the journal name.
pub fn is_importable(record: &Record) -> bool {
    if blank(&record.title) || blank(&record.date) {
        return false;
    }
    if !record.authors.iter().any(|a| !blank(&a.last_name)) {
        return false;
    }

    match record.record_type {
        RecordType::Book => !blank(&record.publisher) && !blank(&record.place),
        RecordType::BookSection => {
            !blank(&record.book_title) && !blank(&record.publisher) && !blank(&record.place)
        }
        RecordType::JournalArticle => !blank(&record.publication_name),
    }
}

fn blank(s: &str) -> bool {
    s.trim().is_empty()
}

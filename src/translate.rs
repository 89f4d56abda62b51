//! [`Record`] to Zotero item translation.

use crate::types::{Creator, Record, RecordType, ZoteroItem};
use std::collections::BTreeMap;

/// Rename a validated record's fields into Zotero's schema for its type.
///
/// Every field Zotero defines for the type is emitted, empty or not.
/// `collection`, when given, files the item into that collection.
pub fn to_zotero_item(record: &Record, collection: Option<&str>) -> ZoteroItem {
    let mut fields = BTreeMap::new();
    let mut put = |name: &str, value: &str| {
        fields.insert(name.to_string(), value.trim().to_string());
    };

    put("title", &record.title);
    put("date", &record.date);
    put("abstractNote", &record.abstract_text);
    put("language", &record.language);
    put("extra", &record.extra_text);

    match record.record_type {
        RecordType::Book => {
            put("publisher", &record.publisher);
            put("place", &record.place);
            put("ISBN", &record.isbn);
            put("series", &record.series);
            put("seriesNumber", &record.series_number);
            put("volume", &record.volume);
            put("edition", &record.edition);
            put("numPages", &record.pages);
        }
        RecordType::BookSection => {
            put("bookTitle", &record.book_title);
            put("publisher", &record.publisher);
            put("place", &record.place);
            put("pages", &record.pages);
            put("ISBN", &record.isbn);
            put("series", &record.series);
            put("seriesNumber", &record.series_number);
            put("volume", &record.volume);
            put("edition", &record.edition);
        }
        RecordType::JournalArticle => {
            put("publicationTitle", &record.publication_name);
            put("volume", &record.article_volume);
            put("issue", &record.article_issue);
            put("pages", &record.pages);
            put("DOI", &record.doi);
        }
    }

    ZoteroItem {
        item_type: record.record_type,
        creators: record.authors.iter().map(Creator::author).collect(),
        fields,
        tags: Vec::new(),
        collections: collection.map(|c| vec![c.to_string()]).unwrap_or_default(),
        relations: serde_json::Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Author;

    fn record(record_type: RecordType) -> Record {
        let mut r = Record::new(record_type);
        r.title = "A Title".to_string();
        r.authors = vec![Author::new("Ada", "Lovelace"), Author::new("", "Babbage")];
        r.date = "1843".to_string();
        r.publisher = "Taylor".to_string();
        r.place = "London".to_string();
        r.pages = "666-731".to_string();
        r.book_title = "Scientific Memoirs".to_string();
        r.publication_name = "Memoirs".to_string();
        r.article_volume = "3".to_string();
        r.article_issue = "1".to_string();
        r.volume = "III".to_string();
        r.doi = "10.1000/x".to_string();
        r.extra_text = "HAL: hal-1".to_string();
        r
    }

    fn keys(item: &ZoteroItem) -> Vec<&str> {
        item.fields.keys().map(String::as_str).collect()
    }

    #[test]
    fn test_journal_article_fields() {
        let item = to_zotero_item(&record(RecordType::JournalArticle), None);
        assert_eq!(item.item_type, RecordType::JournalArticle);
        assert_eq!(item.field("publicationTitle"), Some("Memoirs"));
        assert_eq!(item.field("volume"), Some("3"));
        assert_eq!(item.field("issue"), Some("1"));
        assert_eq!(item.field("DOI"), Some("10.1000/x"));
        assert!(item.field("publisher").is_none());
        assert!(item.field("bookTitle").is_none());
        assert!(item.collections.is_empty());
    }

    #[test]
    fn test_book_maps_pages_to_num_pages() {
        let item = to_zotero_item(&record(RecordType::Book), Some("COLL1234"));
        assert_eq!(item.field("numPages"), Some("666-731"));
        assert_eq!(item.field("volume"), Some("III"));
        assert!(item.field("pages").is_none());
        assert!(item.field("DOI").is_none());
        assert_eq!(item.collections, vec!["COLL1234".to_string()]);
    }

    #[test]
    fn test_book_section_field_set() {
        let item = to_zotero_item(&record(RecordType::BookSection), None);
        assert_eq!(
            keys(&item),
            vec![
                "ISBN",
                "abstractNote",
                "bookTitle",
                "date",
                "edition",
                "extra",
                "language",
                "pages",
                "place",
                "publisher",
                "series",
                "seriesNumber",
                "title",
                "volume",
            ]
        );
    }

    #[test]
    fn test_creators_are_tagged_author_in_order() {
        let item = to_zotero_item(&record(RecordType::Book), None);
        assert_eq!(item.creators.len(), 2);
        assert!(item.creators.iter().all(|c| c.creator_type == "author"));
        assert_eq!(item.creators[0].last_name, "Lovelace");
        assert_eq!(item.creators[1].last_name, "Babbage");
        assert_eq!(item.field("extra"), Some("HAL: hal-1"));
    }
}

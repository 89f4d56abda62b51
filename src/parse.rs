//! HAL response decoding and mapping into [`Record`]s.
//!
//! HAL is loose about field shapes: the same field comes back as a string
//! for one document type and as an array for another, and year fields are
//! integers. Every field is therefore decoded into a list of strings and
//! resolved with a pick-first-non-empty policy over an alias list.

use crate::error::Error;
use crate::types::{Author, Record, RecordType};
use serde::Deserialize;
use std::collections::BTreeMap;

/// Fields requested for every lookup.
pub const CATALOG_FIELDS: &str = "halId_s,docType_s,title_s,authFullName_s,authLastName_s,\
authFirstName_s,producedDateY_i,producedDate_s,publicationDateY_i,publicationDate_s,\
publisher_s,journalPublisher_s,city_s,page_s,isbn_s,bookTitle_s,serie_s,volume_s,issue_s,\
journalTitle_s,doiId_s,abstract_s,language_s,edition_s";

const TITLE: &[&str] = &["title_s"];
const YEAR: &[&str] = &["producedDateY_i", "publicationDateY_i"];
const FULL_DATE: &[&str] = &["producedDate_s", "publicationDate_s"];
const PUBLISHER: &[&str] = &["publisher_s", "journalPublisher_s"];
const PLACE: &[&str] = &["city_s"];
const PAGES: &[&str] = &["page_s"];
const ISBN: &[&str] = &["isbn_s"];
const BOOK_TITLE: &[&str] = &["bookTitle_s"];
const SERIES: &[&str] = &["serie_s"];
const VOLUME: &[&str] = &["volume_s"];
const ISSUE: &[&str] = &["issue_s"];
const JOURNAL: &[&str] = &["journalTitle_s"];
const DOI: &[&str] = &["doiId_s"];
const ABSTRACT: &[&str] = &["abstract_s"];
const LANGUAGE: &[&str] = &["language_s"];
const EDITION: &[&str] = &["edition_s"];

/// HAL search response wrapper.
#[derive(Debug, Deserialize)]
pub(crate) struct HalResponse {
    pub response: HalResponseBody,
}

#[derive(Debug, Deserialize)]
pub(crate) struct HalResponseBody {
    #[serde(rename = "numFound")]
    pub num_found: Option<u64>,
    #[serde(default)]
    pub docs: Vec<RawDocument>,
}

/// Custom deserializer that accepts a scalar, an array of scalars, or null.
fn deserialize_values<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::{self, SeqAccess, Visitor};
    use std::fmt;

    struct ValuesVisitor;

    impl<'de> Visitor<'de> for ValuesVisitor {
        type Value = Vec<String>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string, number, array of those, or null")
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Vec::new())
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Vec::new())
        }

        fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
        where
            D: serde::Deserializer<'de>,
        {
            deserializer.deserialize_any(ValuesVisitor)
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(vec![v.to_string()])
        }

        fn visit_string<E>(self, v: String) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(vec![v])
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(vec![v.to_string()])
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(vec![v.to_string()])
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(vec![v.to_string()])
        }

        fn visit_bool<E>(self, v: bool) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(vec![v.to_string()])
        }

        fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
        where
            A: SeqAccess<'de>,
        {
            let mut out = Vec::new();
            while let Some(value) = seq.next_element::<serde_json::Value>()? {
                match value {
                    serde_json::Value::String(s) => out.push(s),
                    serde_json::Value::Number(n) => out.push(n.to_string()),
                    serde_json::Value::Bool(b) => out.push(b.to_string()),
                    _ => {}
                }
            }
            Ok(out)
        }
    }

    deserializer.deserialize_option(ValuesVisitor)
}

/// One HAL document, every field kept as a list of strings.
#[derive(Debug, Clone, Default)]
pub struct RawDocument {
    fields: BTreeMap<String, Vec<String>>,
}

impl<'de> Deserialize<'de> for RawDocument {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Values(#[serde(deserialize_with = "deserialize_values")] Vec<String>);

        let raw: BTreeMap<String, Values> = BTreeMap::deserialize(deserializer)?;
        Ok(Self {
            fields: raw.into_iter().map(|(k, v)| (k, v.0)).collect(),
        })
    }
}

impl RawDocument {
    /// Build a document from `(field, values)` pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: IntoIterator,
        V::Item: Into<String>,
    {
        Self {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into_iter().map(Into::into).collect()))
                .collect(),
        }
    }

    /// All values of a field.
    pub fn values(&self, field: &str) -> &[String] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// First non-empty trimmed value of the first alias that has one.
    pub fn pick(&self, aliases: &[&str]) -> Option<&str> {
        aliases.iter().find_map(|alias| {
            self.values(alias)
                .iter()
                .map(|v| v.trim())
                .find(|v| !v.is_empty())
        })
    }

    fn pick_or_empty(&self, aliases: &[&str]) -> String {
        self.pick(aliases).unwrap_or_default().to_string()
    }

    /// HAL identifier of the document, if present.
    pub fn hal_id(&self) -> Option<&str> {
        self.pick(&["halId_s"])
    }

    pub fn doc_type(&self) -> Option<&str> {
        self.pick(&["docType_s"])
    }
}

/// Parse a HAL search JSON response into its first document, if any.
pub fn parse_lookup_response(json: &str) -> crate::error::Result<Option<RawDocument>> {
    let response: HalResponse = serde_json::from_str(json)
        .map_err(|e| Error::Parse(format!("Invalid HAL JSON: {}", e)))?;

    if response.response.num_found == Some(0) {
        return Ok(None);
    }
    Ok(response.response.docs.into_iter().next())
}

/// Map a HAL document to a [`Record`].
///
/// Returns `None` for document types outside the type table. Missing
/// optional fields become empty strings.
pub fn map_document(doc: &RawDocument) -> Option<Record> {
    let record_type = RecordType::from_hal_doc_type(doc.doc_type()?)?;
    let mut record = Record::new(record_type);

    record.title = doc.pick_or_empty(TITLE);
    record.authors = parse_authors(doc);
    record.date = resolve_date(doc);
    record.publisher = doc.pick_or_empty(PUBLISHER);
    record.place = doc.pick_or_empty(PLACE);
    record.pages = doc.pick_or_empty(PAGES);
    record.isbn = doc.pick_or_empty(ISBN);
    record.series = doc.pick_or_empty(SERIES);
    record.edition = doc.pick_or_empty(EDITION);
    record.doi = normalize_doi(&doc.pick_or_empty(DOI));
    record.abstract_text = doc.pick_or_empty(ABSTRACT);
    record.language = doc.pick_or_empty(LANGUAGE);

    match record_type {
        RecordType::JournalArticle => {
            record.publication_name = doc.pick_or_empty(JOURNAL);
            record.article_volume = doc.pick_or_empty(VOLUME);
            record.article_issue = doc.pick_or_empty(ISSUE);
        }
        RecordType::BookSection => {
            record.book_title = doc.pick_or_empty(BOOK_TITLE);
            record.volume = doc.pick_or_empty(VOLUME);
        }
        RecordType::Book => {
            record.volume = doc.pick_or_empty(VOLUME);
        }
    }

    if let Some(id) = doc.hal_id() {
        record.extra_text = format!("HAL: {}", id);
    }

    Some(record)
}

/// Author list from parallel last/first arrays, or from full names.
fn parse_authors(doc: &RawDocument) -> Vec<Author> {
    let last_names = doc.values("authLastName_s");
    let first_names = doc.values("authFirstName_s");

    if !last_names.is_empty() && !first_names.is_empty() {
        return last_names
            .iter()
            .zip(first_names)
            .map(|(last, first)| Author::new(first.trim(), last.trim()))
            .filter(|a| !a.is_empty())
            .collect();
    }

    doc.values("authFullName_s")
        .iter()
        .map(|name| Author::from_full_name(name))
        .filter(|a| !a.is_empty())
        .collect()
}

/// Year field first, else the `YYYY-MM-DD` prefix of a full date.
fn resolve_date(doc: &RawDocument) -> String {
    if let Some(year) = doc.pick(YEAR) {
        return year.to_string();
    }
    doc.pick(FULL_DATE)
        .map(|d| d.chars().take(10).collect())
        .unwrap_or_default()
}

/// Strip a leading `https://doi.org/` or `doi:` (any case).
pub fn normalize_doi(raw: &str) -> String {
    let trimmed = raw.trim();
    for prefix in ["https://doi.org/", "doi:"] {
        if trimmed.len() >= prefix.len()
            && trimmed.is_char_boundary(prefix.len())
            && trimmed[..prefix.len()].eq_ignore_ascii_case(prefix)
        {
            return trimmed[prefix.len()..].trim().to_string();
        }
    }
    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARTICLE_RESPONSE: &str = r#"{
        "response": {
            "numFound": 1,
            "start": 0,
            "docs": [{
                "halId_s": "hal-01234567",
                "docType_s": "ART",
                "title_s": ["Les laboratoires et leurs bibliothèques"],
                "authFullName_s": ["Marie Curie", "Pierre Curie"],
                "authLastName_s": ["Curie", "Curie"],
                "authFirstName_s": ["Marie", "Pierre"],
                "producedDateY_i": 2021,
                "producedDate_s": "2021-03-04",
                "journalTitle_s": "Revue d'histoire des sciences",
                "volume_s": "74",
                "issue_s": ["2"],
                "page_s": "12-34",
                "doiId_s": "10.3917/rhs.742.0012",
                "language_s": ["fr"]
            }]
        }
    }"#;

    #[test]
    fn test_parse_lookup_response() {
        let doc = parse_lookup_response(ARTICLE_RESPONSE).unwrap().unwrap();
        assert_eq!(doc.hal_id(), Some("hal-01234567"));
        assert_eq!(doc.values("producedDateY_i"), &["2021".to_string()]);
        assert_eq!(doc.pick(&["journalTitle_s"]), Some("Revue d'histoire des sciences"));
    }

    #[test]
    fn test_parse_lookup_no_match() {
        let json = r#"{"response": {"numFound": 0, "start": 0, "docs": []}}"#;
        assert!(parse_lookup_response(json).unwrap().is_none());
    }

    #[test]
    fn test_parse_lookup_invalid_json() {
        assert!(matches!(parse_lookup_response("<html>"), Err(Error::Parse(_))));
    }

    #[test]
    fn test_map_journal_article() {
        let doc = parse_lookup_response(ARTICLE_RESPONSE).unwrap().unwrap();
        let record = map_document(&doc).unwrap();

        assert_eq!(record.record_type, RecordType::JournalArticle);
        assert_eq!(record.title, "Les laboratoires et leurs bibliothèques");
        assert_eq!(record.authors, vec![Author::new("Marie", "Curie"), Author::new("Pierre", "Curie")]);
        assert_eq!(record.date, "2021");
        assert_eq!(record.publication_name, "Revue d'histoire des sciences");
        assert_eq!(record.article_volume, "74");
        assert_eq!(record.article_issue, "2");
        assert_eq!(record.pages, "12-34");
        assert_eq!(record.language, "fr");
        assert_eq!(record.extra_text, "HAL: hal-01234567");
        assert!(record.volume.is_empty());
    }

    #[test]
    fn test_unmapped_type_yields_none() {
        for code in ["COMM", "THESE", "POSTER", "UNDEFINED"] {
            let doc = RawDocument::from_pairs([("docType_s", vec![code]), ("title_s", vec!["T"])]);
            assert!(map_document(&doc).is_none(), "{} should not map", code);
        }
        let doc = RawDocument::from_pairs([("title_s", vec!["No type"])]);
        assert!(map_document(&doc).is_none());
    }

    #[test]
    fn test_mapped_types_carry_table_value() {
        for (code, expected) in [
            ("ART", RecordType::JournalArticle),
            ("OUV", RecordType::Book),
            ("DOUV", RecordType::Book),
            ("COUV", RecordType::BookSection),
        ] {
            let doc = RawDocument::from_pairs([("docType_s", vec![code])]);
            assert_eq!(map_document(&doc).unwrap().record_type, expected);
        }
    }

    #[test]
    fn test_parallel_names_zip_to_shorter() {
        let doc = RawDocument::from_pairs([
            ("docType_s", vec!["OUV"]),
            ("authLastName_s", vec!["Dupont", "", "Martin"]),
            ("authFirstName_s", vec!["Anne", ""]),
            ("authFullName_s", vec!["Ignored Name"]),
        ]);
        let record = map_document(&doc).unwrap();
        assert_eq!(record.authors, vec![Author::new("Anne", "Dupont")]);
    }

    #[test]
    fn test_full_names_used_when_parallel_arrays_incomplete() {
        let doc = RawDocument::from_pairs([
            ("docType_s", vec!["OUV"]),
            ("authLastName_s", vec!["Dupont"]),
            ("authFullName_s", vec!["Dupont, Anne", "Jean Martin", "Platon"]),
        ]);
        let record = map_document(&doc).unwrap();
        assert_eq!(
            record.authors,
            vec![
                Author::new("Anne", "Dupont"),
                Author::new("Jean", "Martin"),
                Author::new("", "Platon"),
            ]
        );
    }

    #[test]
    fn test_date_falls_back_to_full_date_prefix() {
        let doc = RawDocument::from_pairs([
            ("docType_s", vec!["OUV"]),
            ("producedDate_s", vec!["2019-11-05 10:00:00"]),
        ]);
        assert_eq!(map_document(&doc).unwrap().date, "2019-11-05");

        let doc = RawDocument::from_pairs([
            ("docType_s", vec!["OUV"]),
            ("producedDateY_i", vec![""]),
            ("publicationDateY_i", vec!["2018"]),
            ("producedDate_s", vec!["2019-11-05"]),
        ]);
        assert_eq!(map_document(&doc).unwrap().date, "2018");
    }

    #[test]
    fn test_publisher_alias_pick_first_non_empty() {
        let doc = RawDocument::from_pairs([
            ("docType_s", vec!["COUV"]),
            ("publisher_s", vec!["", " "]),
            ("journalPublisher_s", vec!["CNRS Éditions"]),
            ("bookTitle_s", vec!["Mélanges"]),
        ]);
        let record = map_document(&doc).unwrap();
        assert_eq!(record.publisher, "CNRS Éditions");
        assert_eq!(record.book_title, "Mélanges");
    }

    #[test]
    fn test_normalize_doi() {
        assert_eq!(normalize_doi("https://doi.org/10.1000/xyz"), "10.1000/xyz");
        assert_eq!(normalize_doi("HTTPS://DOI.ORG/10.1000/xyz"), "10.1000/xyz");
        assert_eq!(normalize_doi("doi:10.1000/xyz"), "10.1000/xyz");
        assert_eq!(normalize_doi("DOI: 10.1000/xyz"), "10.1000/xyz");
        assert_eq!(normalize_doi("10.1000/xyz"), "10.1000/xyz");
        assert_eq!(normalize_doi(""), "");
    }

    #[test]
    fn test_scalar_and_null_fields_decode() {
        let json = r#"{"response": {"numFound": 1, "docs": [{
            "docType_s": "OUV",
            "title_s": "Scalar title",
            "city_s": null,
            "isbn_s": [9782271, "978-2-271"]
        }]}}"#;
        let doc = parse_lookup_response(json).unwrap().unwrap();
        assert_eq!(doc.pick(TITLE), Some("Scalar title"));
        assert!(doc.values("city_s").is_empty());
        assert_eq!(doc.values("isbn_s").len(), 2);
    }
}

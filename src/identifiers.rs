//! Catalog identifier cleanup.

use crate::error::{Error, Result};
use std::collections::HashSet;

/// Trim, drop empties and de-duplicate, keeping first-occurrence order.
///
/// Fails with [`Error::InvalidInput`] when nothing usable is left.
pub fn normalize_identifiers<S: AsRef<str>>(raw: &[S]) -> Result<Vec<String>> {
    let mut seen = HashSet::new();
    let ids: Vec<String> = raw
        .iter()
        .map(|s| s.as_ref().trim())
        .filter(|s| !s.is_empty())
        .filter(|s| seen.insert(*s))
        .map(String::from)
        .collect();

    if ids.is_empty() {
        return Err(Error::InvalidInput(
            "no usable identifiers in request".to_string(),
        ));
    }
    Ok(ids)
}

/// Split a text blob (file contents, form field) into candidate identifiers.
///
/// Accepts newlines, commas, semicolons and whitespace as separators.
pub fn split_identifier_list(text: &str) -> Vec<&str> {
    text.split(|c: char| c == ',' || c == ';' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .collect()
}

//! Workflow flags stored in an item's `extra` field.
//!
//! Zotero has no custom fields, so flags live in a delimited block inside
//! the free-text `extra` field:
//!
//! ```text
//! anything the user wrote
//!
//! [DLAB]
//! hal_create: yes
//! comms_publish: no
//! [/DLAB]
//!
//! more free text
//! ```
//!
//! Grammar of the block body, one entry per line:
//! - blank lines and lines starting with `#` are ignored
//! - `key: value`, split at the first colon, both sides trimmed
//! - lines without a colon are ignored
//!
//! The block is delimited by the first `[/DLAB]` that follows a `[DLAB]`,
//! paired with the nearest `[DLAB]` before it. Unpaired tags are plain
//! text. Values matching a truthy or falsy token are normalized to
//! `yes` / `no`.

pub const OPEN_TAG: &str = "[DLAB]";
pub const CLOSE_TAG: &str = "[/DLAB]";

/// Keys written first, in this order; other keys follow in encounter order.
pub const PREFERRED_ORDER: &[&str] = &["hal_create", "comms_publish"];

/// Ordered flag mapping. Equality ignores order.
#[derive(Debug, Clone, Default)]
pub struct FlagBlock {
    entries: Vec<(String, String)>,
}

impl PartialEq for FlagBlock {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|(k, v)| other.get(k) == Some(v))
    }
}

impl Eq for FlagBlock {}

impl FlagBlock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Insert or overwrite; an existing key keeps its position.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize with delimiters, preferred keys first.
    pub fn render(&self) -> String {
        let mut out = String::from(OPEN_TAG);
        out.push('\n');
        for (key, value) in self.ordered() {
            out.push_str(key);
            out.push_str(": ");
            out.push_str(value);
            out.push('\n');
        }
        out.push_str(CLOSE_TAG);
        out
    }

    fn ordered(&self) -> Vec<(&str, &str)> {
        let mut ordered: Vec<(&str, &str)> = PREFERRED_ORDER
            .iter()
            .filter_map(|key| self.get(key).map(|v| (*key, v)))
            .collect();
        ordered.extend(
            self.iter()
                .filter(|(k, _)| !PREFERRED_ORDER.iter().any(|p| p == k)),
        );
        ordered
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FlagBlock {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut block = FlagBlock::new();
        for (k, v) in iter {
            block.set(k, v);
        }
        block
    }
}

/// Map truthy/falsy tokens to `yes`/`no`; anything else is returned trimmed.
pub fn normalize_value(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed.to_lowercase().as_str() {
        "yes" | "true" | "oui" => "yes".to_string(),
        "no" | "false" | "non" => "no".to_string(),
        _ => trimmed.to_string(),
    }
}

/// Byte range of the first well-formed block, delimiters included.
///
/// A stray tag in the surrounding text never captures the block: a close
/// tag with no open tag before it is skipped, and of several open tags the
/// one nearest the close tag wins.
fn locate(extra: &str) -> Option<(usize, usize)> {
    extra.match_indices(CLOSE_TAG).find_map(|(close, _)| {
        extra[..close]
            .rfind(OPEN_TAG)
            .map(|open| (open, close + CLOSE_TAG.len()))
    })
}

/// Read the flag block out of an `extra` field.
///
/// Returns an empty block when there is no complete delimiter pair.
pub fn parse(extra: &str) -> FlagBlock {
    let Some((start, end)) = locate(extra) else {
        return FlagBlock::new();
    };
    let body = &extra[start + OPEN_TAG.len()..end - CLOSE_TAG.len()];

    let mut block = FlagBlock::new();
    for line in body.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        block.set(key, normalize_value(value));
    }
    block
}

/// Overlay `updates` on the existing block and rebuild the `extra` field.
///
/// Only updates whose value is exactly `yes` or `no` are applied. Text
/// outside the block is kept as is, apart from whitespace at the seams.
pub fn merge<'a, I>(extra: &str, updates: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut block = parse(extra);
    for (key, value) in updates {
        let key = key.trim();
        if key.is_empty() || key.contains(':') || key.contains('\n') {
            continue;
        }
        if value == "yes" || value == "no" {
            block.set(key, value);
        }
    }

    let (before, after) = match locate(extra) {
        Some((start, end)) => (&extra[..start], &extra[end..]),
        None => (extra, ""),
    };

    let rendered = block.render();
    [before.trim(), rendered.as_str(), after.trim()]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

//! Requested leaf keys

use ahash::AHashSet;
use serde::Serialize;

/// Deduplicated list of requested keys
///
/// Keys compare by exact string equality. The first occurrence wins and
/// keeps its position; later duplicates are dropped and counted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RequestedKeys {
    keys: Vec<String>,
    duplicates: usize,
}

impl RequestedKeys {
    pub fn new<I, S>(raw: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = AHashSet::new();
        let mut keys = Vec::new();
        let mut duplicates = 0;

        for key in raw {
            let key: String = key.into();
            if seen.insert(key.clone()) {
                keys.push(key);
            } else {
                duplicates += 1;
            }
        }

        Self { keys, duplicates }
    }

    /// Split a free-form list on `;`, `,`, `|` or whitespace
    pub fn parse(raw: &str) -> Self {
        Self::new(
            raw.split(|c: char| matches!(c, ';' | ',' | '|') || c.is_whitespace())
                .filter(|part| !part.is_empty()),
        )
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    /// Number of dropped duplicates
    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    /// Number of keys before deduplication
    pub fn requested(&self) -> usize {
        self.keys.len() + self.duplicates
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

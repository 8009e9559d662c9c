//! Output types: the card summary and per-run statistics.

use crate::schema::CardSchema;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A card summary: one plain string per schema key, in schema order.
///
/// Serialises as a JSON object whose key order follows the schema, so the
/// HTTP response reads top-to-bottom in the order the cards are swiped.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CardSummary {
    entries: Vec<(String, String)>,
}

impl CardSummary {
    /// A summary with every schema key set to the empty string.
    pub fn empty(schema: &CardSchema) -> Self {
        Self {
            entries: schema.keys().map(|k| (k.to_string(), String::new())).collect(),
        }
    }

    /// Build from `(key, value)` pairs; later duplicates overwrite earlier ones.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut summary = Self::default();
        for (k, v) in pairs {
            summary.set(k, v);
        }
        summary
    }

    /// Value for `key`, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Insert or overwrite `key`, keeping the original position on overwrite.
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

    /// Canonical two-space-indented JSON.
    pub fn to_pretty_json(&self) -> String {
        // Serialising a map of strings cannot fail.
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

impl Serialize for CardSummary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for CardSummary {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SummaryVisitor;

        impl<'de> Visitor<'de> for SummaryVisitor {
            type Value = CardSummary;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a JSON object of string values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<CardSummary, A::Error> {
                let mut summary = CardSummary::default();
                while let Some((k, v)) = access.next_entry::<String, String>()? {
                    summary.set(k, v);
                }
                Ok(summary)
            }
        }

        deserializer.deserialize_map(SummaryVisitor)
    }
}

/// Timing and size information for one chunk's completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkResult {
    /// 0-indexed position of the chunk in the document.
    pub index: usize,
    /// Characters of cleaned text sent in this chunk.
    pub chars: usize,
    /// Characters of raw model response before recovery.
    pub response_chars: usize,
    pub duration_ms: u64,
}

/// Whole-run statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationStats {
    /// Name of the extractor that produced the raw text.
    pub extractor: String,
    pub raw_chars: usize,
    pub cleaned_chars: usize,
    pub chunk_count: usize,
    pub extraction_ms: u64,
    pub completion_ms: u64,
    pub total_ms: u64,
}

/// Result of a successful card generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardOutput {
    pub cards: CardSummary,
    pub chunks: Vec<ChunkResult>,
    pub stats: GenerationStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialises_in_insertion_order() {
        let s = CardSummary::from_pairs([("zeta", "1"), ("alpha", "2")]);
        assert_eq!(serde_json::to_string(&s).unwrap(), r#"{"zeta":"1","alpha":"2"}"#);
    }

    #[test]
    fn set_overwrites_in_place() {
        let mut s = CardSummary::from_pairs([("a", "1"), ("b", "2")]);
        s.set("a", "3");
        let pairs: Vec<_> = s.iter().collect();
        assert_eq!(pairs, vec![("a", "3"), ("b", "2")]);
    }

    #[test]
    fn empty_has_every_schema_key() {
        let s = CardSummary::empty(&CardSchema::hook());
        assert_eq!(s.len(), 7);
        assert_eq!(s.get("closing"), Some(""));
    }

    #[test]
    fn deserialise_round_trips_order() {
        let s: CardSummary = serde_json::from_str(r#"{"b":"x","a":"y"}"#).unwrap();
        let keys: Vec<_> = s.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["b", "a"]);
    }

    #[test]
    fn pretty_json_is_indented() {
        let s = CardSummary::from_pairs([("hook", "Bees dance.")]);
        assert_eq!(s.to_pretty_json(), "{\n  \"hook\": \"Bees dance.\"\n}");
    }
}

//! Recovery: salvage the JSON object from a free-text model reply.
//!
//! Even when told to answer with JSON only, models wrap the object in
//! greetings ("Here are your cards:"), code fences, or trailing notes, and
//! occasionally emit a stray control character inside a string. Recovery
//! runs two stages, always in this order:
//!
//! 1. **Strict**: take everything from the first `{` to the last `}` and
//!    parse it as-is.
//! 2. **Filtered**: if that fails, drop every character that is not JSON
//!    punctuation (`{ } [ ] : , " .`), whitespace or a word character, and
//!    parse again.
//!
//! The filter is lossy: apostrophes, dashes, question marks and escape
//! backslashes inside string values are removed with the noise. It is a
//! last resort, not a JSON repairer.

use crate::error::Pdf2CardsError;
use crate::output::CardSummary;
use crate::schema::CardSchema;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, warn};

static RE_NON_JSON_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[^{}\[\]:,".\s\w]"#).unwrap());

/// Locate and parse the JSON object embedded in `response`.
///
/// # Errors
/// - [`Pdf2CardsError::NoJsonStructureFound`]: no `{` … `}` span exists.
/// - [`Pdf2CardsError::UnrecoverableJson`]: both parse stages failed.
pub fn recover_json(response: &str) -> Result<Map<String, Value>, Pdf2CardsError> {
    let candidate = locate_object(response)?;

    let strict_err = match parse_object(candidate) {
        Ok(map) => return Ok(map),
        Err(e) => e,
    };
    debug!("Strict JSON parse failed ({}); retrying with filtered text", strict_err);

    let filtered = RE_NON_JSON_CHARS.replace_all(candidate, "");
    parse_object(&filtered).map_err(|e| {
        warn!("Filtered JSON parse failed: {}", e);
        Pdf2CardsError::UnrecoverableJson {
            detail: e.to_string(),
        }
    })
}

/// [`recover_json`], then map the object onto `schema`.
pub fn recover_card(response: &str, schema: &CardSchema) -> Result<CardSummary, Pdf2CardsError> {
    recover_json(response).map(|obj| coerce_to_schema(obj, schema))
}

/// First `{` to last `}`, inclusive, trimmed.
fn locate_object(response: &str) -> Result<&str, Pdf2CardsError> {
    let start = response.find('{').ok_or(Pdf2CardsError::NoJsonStructureFound)?;
    let end = response.rfind('}').ok_or(Pdf2CardsError::NoJsonStructureFound)?;
    if end < start {
        return Err(Pdf2CardsError::NoJsonStructureFound);
    }
    Ok(response[start..=end].trim())
}

fn parse_object(text: &str) -> Result<Map<String, Value>, String> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(format!("expected a JSON object, got {}", type_name(&other))),
        Err(e) => Err(e.to_string()),
    }
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Force a recovered object into the schema's shape.
///
/// Every schema key ends up present with a plain string value; anything the
/// model added beyond the schema is dropped.
pub fn coerce_to_schema(obj: Map<String, Value>, schema: &CardSchema) -> CardSummary {
    for key in schema.keys().filter(|k| !obj.contains_key(*k)) {
        warn!("Model response is missing key '{}'", key);
    }
    let mut summary = CardSummary::empty(schema);
    for (key, value) in obj {
        if schema.contains(&key) {
            summary.set(key, flatten_value(value));
        } else {
            debug!("Dropping key '{}' not in the card schema", key);
        }
    }
    summary
}

fn flatten_value(v: Value) -> String {
    match v {
        Value::String(s) => s.trim().to_string(),
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items
            .into_iter()
            .map(flatten_value)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" "),
        Value::Object(map) => map
            .into_iter()
            .map(|(_, v)| flatten_value(v))
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" "),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plain_object() {
        let map = recover_json(r#"{"hook": "Bees dance."}"#).unwrap();
        assert_eq!(map["hook"], "Bees dance.");
    }

    #[test]
    fn object_with_prose_around_it() {
        let original = json!({"hook": "Bees dance!", "closing": "What do you think?"});
        let text = format!(
            "Sure! Here are your cards:\n```json\n{}\n```\nHope this helps.",
            serde_json::to_string_pretty(&original).unwrap()
        );
        let map = recover_json(&text).unwrap();
        assert_eq!(Value::Object(map), original);
    }

    #[test]
    fn no_braces() {
        assert!(matches!(
            recover_json("no braces here"),
            Err(Pdf2CardsError::NoJsonStructureFound)
        ));
    }

    #[test]
    fn only_opening_brace() {
        assert!(matches!(
            recover_json("{ never closed"),
            Err(Pdf2CardsError::NoJsonStructureFound)
        ));
    }

    #[test]
    fn closing_before_opening() {
        assert!(matches!(
            recover_json("} backwards {"),
            Err(Pdf2CardsError::NoJsonStructureFound)
        ));
    }

    #[test]
    fn stray_control_char_repaired_by_filter() {
        let text = "{\"hook\": \"Bees dance\u{0007} daily.\", \"closing\": \"Share this.\"}";
        assert!(serde_json::from_str::<Value>(text).is_err());
        let map = recover_json(text).unwrap();
        assert_eq!(map["hook"], "Bees dance daily.");
        assert_eq!(map["closing"], "Share this.");
    }

    #[test]
    fn stray_control_char_between_tokens_repaired() {
        let text = "{\u{0001}\"hook\": \"ok\"}";
        assert_eq!(recover_json(text).unwrap()["hook"], "ok");
    }

    #[test]
    fn filter_is_lossy() {
        // The trailing comma fails strict parsing; the filter cannot remove it
        // and strips the apostrophe from the value on the way.
        let text = r#"{"hook": "It's here", }"#;
        assert!(matches!(
            recover_json(text),
            Err(Pdf2CardsError::UnrecoverableJson { .. })
        ));
    }

    #[test]
    fn unbalanced_first_and_last_braces_unrecoverable() {
        let text = r#"{"a": "x"} and then {"b": "y"}"#;
        assert!(matches!(
            recover_json(text),
            Err(Pdf2CardsError::UnrecoverableJson { .. })
        ));
    }

    #[test]
    fn coerce_fills_and_flattens() {
        let schema = CardSchema::hook();
        let obj = json!({
            "hook": "  Bees dance.  ",
            "question": ["Why", "do they?"],
            "researcher": null,
            "method": 42,
            "extra": "dropped"
        });
        let Value::Object(map) = obj else { unreachable!() };
        let card = coerce_to_schema(map, &schema);
        assert_eq!(card.len(), schema.len());
        assert_eq!(card.get("hook"), Some("Bees dance."));
        assert_eq!(card.get("question"), Some("Why do they?"));
        assert_eq!(card.get("researcher"), Some(""));
        assert_eq!(card.get("method"), Some("42"));
        assert_eq!(card.get("findings"), Some(""));
        assert_eq!(card.get("extra"), None);
    }

    #[test]
    fn recover_card_follows_schema_order() {
        let schema = CardSchema::intro();
        let card = recover_card(r#"{"closing": "c", "intro": "i"}"#, &schema).unwrap();
        let keys: Vec<_> = card.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, schema.keys().collect::<Vec<_>>());
        assert_eq!(card.get("intro"), Some("i"));
    }
}

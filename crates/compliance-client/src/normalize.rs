//! Response normalization
//!
//! The backend answers some endpoints in more than one shape. Everything is
//! reduced to one canonical type here; nothing past this module sees the
//! raw variants.

use serde_json::{Map, Value};
use shared_types::{Document, DocumentId, RuleSet, RuleType};

/// Document listing: `[...]` or `{"documents": [...]}`
///
/// Entries are plain names or objects carrying `id` and/or `filename`.
pub fn documents(body: Value) -> Result<Vec<Document>, String> {
    let entries = match body {
        Value::Array(entries) => entries,
        Value::Object(mut fields) => match fields.remove("documents") {
            Some(Value::Array(entries)) => entries,
            Some(Value::Null) | None => {
                return Err("expected a `documents` array in listing".to_string())
            }
            Some(other) => {
                return Err(format!("`documents` is not an array: {}", kind(&other)))
            }
        },
        other => return Err(format!("document listing is {}", kind(&other))),
    };

    entries.into_iter().map(document).collect()
}

fn document(entry: Value) -> Result<Document, String> {
    match entry {
        Value::String(name) => Ok(Document::named(name)),
        Value::Object(fields) => {
            let filename = string_field(&fields, "filename");
            let id = string_field(&fields, "id")
                .or_else(|| filename.clone())
                .ok_or_else(|| "document entry has neither `id` nor `filename`".to_string())?;
            Ok(Document {
                id: DocumentId::new(id),
                filename,
                size: fields.get("size").and_then(Value::as_u64),
                kind: string_field(&fields, "type"),
                uploaded_at: string_field(&fields, "uploaded_at"),
            })
        }
        other => Err(format!("document entry is {}", kind(&other))),
    }
}

fn string_field(fields: &Map<String, Value>, key: &str) -> Option<String> {
    match fields.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Rules for `document`: scoped `{allowed, forbidden, required}` or a map of
/// every document's rule set keyed by [`DocumentId::rules_key`]
///
/// Either may be wrapped in `{"rules": ...}`. A map without an entry for the
/// document yields the empty rule set.
pub fn rules(document: &DocumentId, body: Value) -> Result<RuleSet, String> {
    let payload = match body {
        Value::Object(mut fields) if fields.contains_key("rules") => {
            fields.remove("rules").unwrap_or(Value::Null)
        }
        other => other,
    };

    match payload {
        Value::Null => Ok(RuleSet::empty()),
        Value::Object(fields) if is_scoped(&fields) => scoped_rules(fields),
        Value::Object(mut all) => match all.remove(&document.rules_key()) {
            Some(Value::Object(fields)) => scoped_rules(fields),
            Some(Value::Null) | None => Ok(RuleSet::empty()),
            Some(other) => Err(format!(
                "rules for {} are {}",
                document.rules_key(),
                kind(&other)
            )),
        },
        other => Err(format!("rules payload is {}", kind(&other))),
    }
}

fn is_scoped(fields: &Map<String, Value>) -> bool {
    fields.is_empty()
        || RuleType::ALL
            .iter()
            .any(|rule_type| fields.contains_key(rule_type.as_str()))
}

fn scoped_rules(mut fields: Map<String, Value>) -> Result<RuleSet, String> {
    let mut rules = RuleSet::empty();
    for rule_type in RuleType::ALL {
        let values = match fields.remove(rule_type.as_str()) {
            None | Some(Value::Null) => continue,
            Some(Value::Array(values)) => values,
            Some(other) => {
                return Err(format!("`{}` is not a list: {}", rule_type, kind(&other)))
            }
        };
        // Structured entries (conditions) are kept as their JSON text
        *rules.get_mut(rule_type) = values
            .into_iter()
            .filter(|v| !v.is_null())
            .map(|v| match v {
                Value::String(s) => s,
                other => other.to_string(),
            })
            .collect();
    }
    Ok(rules)
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

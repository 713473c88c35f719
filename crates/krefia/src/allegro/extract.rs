use serde_json::Value;

/// Outcome of normalizing a raw response envelope. Fetchers pattern-match on
/// this instead of probing keys; `Empty` and `Malformed` both read as "no
/// data" but are logged differently.
#[derive(Debug, Clone, PartialEq)]
pub enum Extract {
    Value(Value),
    Empty,
    Malformed,
}

impl Extract {
    pub fn into_value(self) -> Option<Value> {
        match self {
            Extract::Value(value) => Some(value),
            Extract::Empty | Extract::Malformed => None,
        }
    }
}

/// Reads `body.Result`, optionally descending one level into `path`.
/// Never panics; any shape surprise becomes `Malformed`.
pub fn extract(body: &Value, path: Option<&str>) -> Extract {
    let Some(result) = body.get("Result") else {
        return Extract::Malformed;
    };
    if result.is_null() {
        return Extract::Empty;
    }

    match path {
        None => Extract::Value(result.clone()),
        Some(key) => match result.get(key) {
            None => Extract::Malformed,
            Some(Value::Null) => Extract::Empty,
            Some(value) => Extract::Value(value.clone()),
        },
    }
}

/// List extraction with the XML coercion rule applied: exactly one child
/// element serializes as a scalar, so a present non-list value is wrapped in
/// a single-element list. "No data" uniformly becomes an empty list.
pub fn extract_list(body: &Value, path: &str) -> Vec<Value> {
    match extract(body, Some(path)) {
        Extract::Value(Value::Array(items)) => items,
        Extract::Value(single) => vec![single],
        Extract::Empty => Vec::new(),
        Extract::Malformed => {
            tracing::warn!(key = path, "unexpected result shape");
            Vec::new()
        }
    }
}

/// String field lookup tolerating null or absent keys.
pub(crate) fn field_str<'a>(value: &'a Value, key: &str) -> &'a str {
    value.get(key).and_then(Value::as_str).unwrap_or("")
}

/// Field rendered as text: XML-derived bodies carry numbers both as JSON
/// numbers and as strings depending on the decoder.
pub(crate) fn field_text(value: &Value, key: &str) -> String {
    match value.get(key) {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Number(number)) => number.to_string(),
        Some(Value::Bool(flag)) => flag.to_string(),
        _ => String::new(),
    }
}

/// Numeric field that may arrive as a JSON number or a decimal string.
pub(crate) fn field_f64(value: &Value, key: &str) -> Option<f64> {
    match value.get(key) {
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(text)) => text.trim().parse().ok(),
        _ => None,
    }
}

/// Python-style truthiness, matching how the original treated `Result`.
pub(crate) fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

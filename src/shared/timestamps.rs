use chrono::{DateTime, SecondsFormat};
use serde_json::{Map, Value};

/// Rewrite every `*_at` epoch-seconds field to RFC 3339, recursively.
///
/// The epoch value is kept next to it as `*_at_epoch`.
pub fn convert_timestamps(value: &Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.iter().map(convert_timestamps).collect()),
        Value::Object(fields) => {
            let mut out = Map::with_capacity(fields.len());
            for (key, field) in fields {
                if key.ends_with("_at") {
                    if let Some(iso) = epoch_to_rfc3339(field) {
                        out.insert(format!("{key}_epoch"), field.clone());
                        out.insert(key.clone(), Value::String(iso));
                        continue;
                    }
                }
                out.insert(key.clone(), convert_timestamps(field));
            }
            Value::Object(out)
        }
        other => other.clone(),
    }
}

fn epoch_to_rfc3339(value: &Value) -> Option<String> {
    let secs = match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64))?,
        _ => return None,
    };
    DateTime::from_timestamp(secs, 0).map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
}

/// Epoch seconds of a record's `created_at`, whether numeric or already converted.
pub fn created_epoch(record: &Value) -> i64 {
    if let Some(epoch) = record.get("created_at_epoch").and_then(Value::as_i64) {
        return epoch;
    }
    match record.get("created_at") {
        Some(Value::Number(n)) => n.as_i64().unwrap_or_default(),
        Some(Value::String(s)) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.timestamp())
            .unwrap_or_default(),
        _ => 0,
    }
}

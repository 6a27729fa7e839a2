//! Normalization of listing payloads.
//!
//! The agent service has shipped several envelope shapes over its versions, so
//! records are located by probing keys in a fixed order: the resource's own key,
//! then `data`, then `items`, then the payload itself.

use std::borrow::Cow;

use serde_json::Value;

const GENERIC_LIST_KEYS: [&str; 2] = ["data", "items"];

/// Unwrap the record list of a listing payload.
///
/// The first candidate key holding a non-null value wins, even when it is an empty
/// array. An array yields its elements, an object yields one record and null
/// yields nothing.
pub fn into_records(mut payload: Value, list_key: &str) -> Vec<Value> {
    let key = std::iter::once(list_key)
        .chain(GENERIC_LIST_KEYS)
        .find(|key| payload.get(key).is_some_and(|v| !v.is_null()));

    let list = match key {
        Some(key) => payload.get_mut(key).map(Value::take).unwrap_or_default(),
        None => payload,
    };

    match list {
        Value::Array(records) => records,
        Value::Null => Vec::new(),
        record => vec![record],
    }
}

/// Id of a record as text. Numeric ids count; empty strings do not.
pub fn record_id(record: &Value) -> Option<Cow<'_, str>> {
    match record.get("id")? {
        Value::String(id) if !id.is_empty() => Some(Cow::Borrowed(id.as_str())),
        Value::Number(id) => Some(Cow::Owned(id.to_string())),
        _ => None,
    }
}

/// One batch of records returned by a listing endpoint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub records: Vec<Value>,
    pub has_more: bool,
    pub first_id: Option<String>,
    pub last_id: Option<String>,
}

impl Page {
    pub fn from_payload(payload: Value, list_key: &str) -> Self {
        let has_more = payload
            .get("has_more")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let first_id = cursor_field(&payload, "first_id");
        let last_id = cursor_field(&payload, "last_id");

        Self {
            records: into_records(payload, list_key),
            has_more,
            first_id,
            last_id,
        }
    }

    /// `first_id` as reported, else the id of the first record.
    pub fn first_cursor(&self) -> Option<String> {
        self.first_id
            .clone()
            .or_else(|| self.records.first().and_then(record_id).map(Cow::into_owned))
    }

    /// `last_id` as reported, else the id of the last record.
    pub fn next_cursor(&self) -> Option<String> {
        self.last_id
            .clone()
            .or_else(|| self.records.last().and_then(record_id).map(Cow::into_owned))
    }
}

fn cursor_field(payload: &Value, key: &str) -> Option<String> {
    payload
        .get(key)
        .and_then(Value::as_str)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

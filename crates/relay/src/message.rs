//! Inbound payload normalization.
//!
//! The gateway hands this module a loosely-typed field map — decoded from a
//! JSON body or extracted from form fields — and gets back a strictly-typed
//! [`CanonicalMessage`] holding only the fields the webhook API understands.
//! Coercion happens exactly once, here: `tts` becomes a real boolean and
//! `embeds` a real list, or the field is absent.

use {
    serde::Serialize,
    serde_json::Value,
    tracing::debug,
};

use crate::{Error, Result};

/// Raw inbound fields, before normalization. Form values are plain strings;
/// JSON bodies keep their original value types.
pub type RawPayload = serde_json::Map<String, Value>;

/// The message shape forwarded to the webhook as `payload_json`.
///
/// Only fields that were present in the input are serialized.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct CanonicalMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tts: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embeds: Option<Vec<Value>>,
}

impl CanonicalMessage {
    /// Copy the recognized fields out of a raw payload. Unrecognized fields
    /// and values of the wrong shape are ignored, never errors. A JSON `null`
    /// counts as absent, not as a falsy value.
    #[must_use]
    pub fn from_raw(raw: &RawPayload) -> Self {
        Self {
            content: string_field(raw, "content"),
            username: string_field(raw, "username"),
            avatar_url: string_field(raw, "avatar_url"),
            tts: raw.get("tts").filter(|v| !v.is_null()).map(truthy),
            embeds: raw.get("embeds").and_then(extract_embeds),
        }
    }
}

fn string_field(raw: &RawPayload, key: &str) -> Option<String> {
    raw.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Loose boolean coercion, matching the original relay's semantics:
/// `"1"`, `"true"`, `"on"`, `"yes"` (trimmed, any case) and the integer 1
/// are true; everything else is false.
fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_i64() == Some(1),
        Value::String(s) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "on" | "yes"
        ),
        _ => false,
    }
}

/// Accept `embeds` as a list, or as a string that JSON-decodes to a list.
/// Anything else is dropped silently — a malformed embed must not fail the
/// whole request.
fn extract_embeds(value: &Value) -> Option<Vec<Value>> {
    match value {
        Value::Array(items) => Some(items.clone()),
        Value::String(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(Value::Array(items)) => Some(items),
            Ok(other) => {
                debug!(kind = json_kind(&other), "ignoring non-list embeds value");
                None
            },
            Err(e) => {
                debug!(error = %e, "ignoring undecodable embeds string");
                None
            },
        },
        _ => None,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Parse a declared-JSON body into a raw payload.
///
/// An empty body is an empty map, and a valid non-object body (say, a bare
/// number) is also an empty map; only syntactically invalid JSON is an error,
/// which fails the whole request with a 400.
pub fn parse_json_payload(body: &[u8]) -> Result<RawPayload> {
    if body.is_empty() {
        return Ok(RawPayload::new());
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Ok(RawPayload::new()),
        Err(e) => Err(Error::MalformedBody { source: e }),
    }
}

/// Parse a urlencoded form body into a raw payload. All values arrive as
/// strings; repeated keys keep the last value.
#[must_use]
pub fn parse_form_payload(body: &[u8]) -> RawPayload {
    let mut map = RawPayload::new();
    for (key, value) in url::form_urlencoded::parse(body) {
        map.insert(key.into_owned(), Value::String(value.into_owned()));
    }
    map
}

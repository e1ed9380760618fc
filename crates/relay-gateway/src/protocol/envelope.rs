//! Inbound envelope decoding
//!
//! Clients send loosely shaped JSON. Besides the flat form
//! `{"event":"message","to":"bob","text":"hi"}` the decoder accepts the older
//! nested form where `text`/`to` live under `data`, or `data` is the text itself.

use super::EventKind;
use serde_json::{Map, Value};
use thiserror::Error;

/// Why a frame could not be turned into an envelope
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// Frame is not valid JSON
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Frame is JSON but not an object
    #[error("payload is not a JSON object")]
    NotAnObject,

    /// A required field is absent or empty
    #[error("missing field `{0}`")]
    MissingField(&'static str),
}

/// A decoded client envelope
///
/// `from` is never read from the client; the router stamps it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEnvelope {
    pub event: EventKind,
    pub text: Option<String>,
    pub to: Option<String>,
    pub name: Option<String>,
    pub file_name: Option<String>,
    pub file_url: Option<String>,
}

impl InboundEnvelope {
    /// Decode a text frame
    pub fn from_json(frame: &str) -> Result<Self, EnvelopeError> {
        let value: Value = serde_json::from_str(frame)?;
        Self::from_value(&value)
    }

    /// Decode an already parsed JSON value
    pub fn from_value(value: &Value) -> Result<Self, EnvelopeError> {
        let Value::Object(map) = value else {
            return Err(EnvelopeError::NotAnObject);
        };

        let event = string_field(map, "event")
            .map(|tag| EventKind::parse(&tag))
            .ok_or(EnvelopeError::MissingField("event"))?;

        let data = map.get("data");
        let nested = data.and_then(Value::as_object);

        let text = string_field(map, "text").or_else(|| match data {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            _ => nested.and_then(|d| string_field(d, "text")),
        });

        let to = target_field(map).or_else(|| nested.and_then(target_field));

        Ok(Self {
            event,
            name: string_field(map, "name").or_else(|| text.clone()),
            text,
            to,
            file_name: string_field(map, "fileName"),
            file_url: string_field(map, "fileUrl"),
        })
    }

    /// Text body, or `MissingField("text")`
    pub fn require_text(&self) -> Result<&str, EnvelopeError> {
        self.text
            .as_deref()
            .ok_or(EnvelopeError::MissingField("text"))
    }
}

/// Non-empty string value of `key`
fn string_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

/// Trimmed `to` value; blank counts as absent
fn target_field(map: &Map<String, Value>) -> Option<String> {
    map.get("to")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

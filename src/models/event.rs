// Ingested events: one JSON object per datagram, {"type": 0|1, "name": ..., "value": ...}.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Closed set of event kinds. Wire discriminator: 0 = count, 1 = timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Count,
    Timing,
}

impl EventKind {
    pub fn from_wire(t: i64) -> Option<Self> {
        match t {
            0 => Some(EventKind::Count),
            1 => Some(EventKind::Timing),
            _ => None,
        }
    }

    pub fn wire(self) -> u8 {
        match self {
            EventKind::Count => 0,
            EventKind::Timing => 1,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("message is not a JSON object")]
    NotAnObject,
    #[error("missing or non-integer field `{0}`")]
    Field(&'static str),
    #[error("unknown event type {0}")]
    UnknownType(i64),
    #[error("empty metric name")]
    EmptyName,
}

/// One counter or timing observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub kind: EventKind,
    pub name: String,
    pub value: i64,
}

impl Event {
    pub fn count(name: impl Into<String>, value: i64) -> Self {
        Self {
            kind: EventKind::Count,
            name: name.into(),
            value,
        }
    }

    pub fn timing(name: impl Into<String>, value: i64) -> Self {
        Self {
            kind: EventKind::Timing,
            name: name.into(),
            value,
        }
    }

    /// Decode one datagram. Field names match case-insensitively ("Type", "NAME", ...).
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let value: Value = serde_json::from_slice(bytes)?;
        let Value::Object(obj) = value else {
            return Err(DecodeError::NotAnObject);
        };

        let t = field(&obj, "type")
            .and_then(Value::as_i64)
            .ok_or(DecodeError::Field("type"))?;
        let kind = EventKind::from_wire(t).ok_or(DecodeError::UnknownType(t))?;
        let name = field(&obj, "name")
            .and_then(Value::as_str)
            .ok_or(DecodeError::Field("name"))?;
        if name.is_empty() {
            return Err(DecodeError::EmptyName);
        }
        let value = field(&obj, "value")
            .and_then(Value::as_i64)
            .ok_or(DecodeError::Field("value"))?;

        Ok(Self {
            kind,
            name: name.to_string(),
            value,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        serde_json::json!({
            "type": self.kind.wire(),
            "name": self.name,
            "value": self.value,
        })
        .to_string()
        .into_bytes()
    }
}

fn field<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    obj.get(key).or_else(|| {
        obj.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    })
}

// ── Payload field access ──
//
// Typed lookups over a flat JSON object. A field is found under its
// canonical snake_case name first, then under each vendor spelling in
// order. JSON `null` counts as absent.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Map, Value};

use crate::error::DecodeError;

/// A logical field and the vendor spellings it may arrive under.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Field {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
}

impl Field {
    pub const fn new(name: &'static str, aliases: &'static [&'static str]) -> Self {
        Self { name, aliases }
    }

    fn keys(&self) -> impl Iterator<Item = &'static str> {
        std::iter::once(self.name).chain(self.aliases.iter().copied())
    }
}

pub(crate) struct PayloadReader<'a> {
    map: &'a Map<String, Value>,
}

impl<'a> PayloadReader<'a> {
    pub fn new(payload: &'a Value) -> Result<Self, DecodeError> {
        payload
            .as_object()
            .map(|map| Self { map })
            .ok_or_else(|| DecodeError::UnknownShape {
                field: "<payload>".into(),
                expected: "object",
            })
    }

    /// The first non-null value stored under any of the field's names.
    pub fn get(&self, field: &Field) -> Option<(&'static str, &'a Value)> {
        field
            .keys()
            .find_map(|key| self.map.get(key).filter(|v| !v.is_null()).map(|v| (key, v)))
    }

    // ── Scalars ──────────────────────────────────────────────────────

    pub fn bool(&self, field: &Field) -> Result<Option<bool>, DecodeError> {
        let Some((key, value)) = self.get(field) else {
            return Ok(None);
        };
        match value {
            Value::Bool(b) => Ok(Some(*b)),
            Value::Number(n) => match n.as_i64() {
                Some(0) => Ok(Some(false)),
                Some(1) => Ok(Some(true)),
                _ => Err(shape(key, "boolean")),
            },
            _ => Err(shape(key, "boolean")),
        }
    }

    pub fn i64(&self, field: &Field) -> Result<Option<i64>, DecodeError> {
        let Some((key, value)) = self.get(field) else {
            return Ok(None);
        };
        match value {
            Value::Number(n) => n.as_i64().map(Some).ok_or_else(|| shape(key, "integer")),
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(Some)
                .map_err(|_| shape(key, "integer")),
            _ => Err(shape(key, "integer")),
        }
    }

    /// Non-negative integer (percentages, counters, day counts).
    pub fn u32(&self, field: &Field) -> Result<Option<u32>, DecodeError> {
        let name = self.get(field).map_or(field.name, |(key, _)| key);
        self.i64(field)?
            .map(|v| u32::try_from(v).map_err(|_| shape(name, "non-negative integer")))
            .transpose()
    }

    pub fn f64(&self, field: &Field) -> Result<Option<f64>, DecodeError> {
        let Some((key, value)) = self.get(field) else {
            return Ok(None);
        };
        match value {
            Value::Number(n) => n.as_f64().map(Some).ok_or_else(|| shape(key, "number")),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map(Some)
                .map_err(|_| shape(key, "number")),
            _ => Err(shape(key, "number")),
        }
    }

    pub fn string(&self, field: &Field) -> Result<Option<String>, DecodeError> {
        let Some((key, value)) = self.get(field) else {
            return Ok(None);
        };
        match value {
            Value::String(s) if s.is_empty() => Ok(None),
            Value::String(s) => Ok(Some(s.clone())),
            _ => Err(shape(key, "string")),
        }
    }

    /// Identifiers the cloud sends as either strings or numbers.
    pub fn text_or_number(&self, field: &Field) -> Result<Option<String>, DecodeError> {
        let Some((key, value)) = self.get(field) else {
            return Ok(None);
        };
        match value {
            Value::String(s) if s.is_empty() => Ok(None),
            Value::String(s) => Ok(Some(s.clone())),
            Value::Number(n) => Ok(Some(n.to_string())),
            _ => Err(shape(key, "string or number")),
        }
    }

    /// RFC 3339 string or epoch milliseconds.
    pub fn timestamp(&self, field: &Field) -> Result<Option<DateTime<Utc>>, DecodeError> {
        let Some((key, value)) = self.get(field) else {
            return Ok(None);
        };
        parse_timestamp(value)
            .map(Some)
            .ok_or_else(|| shape(key, "RFC 3339 timestamp or epoch milliseconds"))
    }

    // ── Containers ───────────────────────────────────────────────────

    pub fn object(&self, field: &Field) -> Result<Option<&'a Value>, DecodeError> {
        match self.get(field) {
            None => Ok(None),
            Some((_, value @ Value::Object(_))) => Ok(Some(value)),
            Some((key, _)) => Err(shape(key, "object")),
        }
    }

    pub fn array(&self, field: &Field) -> Result<Option<&'a Vec<Value>>, DecodeError> {
        match self.get(field) {
            None => Ok(None),
            Some((_, Value::Array(items))) => Ok(Some(items)),
            Some((key, _)) => Err(shape(key, "array")),
        }
    }
}

/// Fail with `MissingField` when a required value is absent.
pub(crate) fn require<T>(field: &Field, value: Option<T>) -> Result<T, DecodeError> {
    value.ok_or(DecodeError::MissingField { field: field.name })
}

fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
                .or_else(|| s.parse::<i64>().ok().and_then(from_epoch_millis))
        }
        Value::Number(n) => n.as_i64().and_then(from_epoch_millis),
        _ => None,
    }
}

fn from_epoch_millis(ms: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms).single()
}

fn shape(field: &str, expected: &'static str) -> DecodeError {
    DecodeError::UnknownShape {
        field: field.to_owned(),
        expected,
    }
}

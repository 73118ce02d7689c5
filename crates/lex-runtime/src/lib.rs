//! # lex-runtime — Support for Generated Code
//!
//! Modules generated by `lexgen` read their fields out of a
//! `serde_json::Value` through the helpers in this crate. Every helper
//! reports failures as a [`FromValueError`] located at the offending field,
//! using the same path syntax as the validator (`reply.root.uri`,
//! `images[0]`).
//!
//! Generated code does not validate constraints; run the schema validator
//! first when the input is untrusted.

use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use base64::Engine;
use chrono::{DateTime, Utc};
use lex_core::ValueKind;
use serde_json::{Map, Value};
use thiserror::Error;

/// A generic value could not be converted into a generated type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FromValueError {
    /// A required field is absent.
    #[error("{path}: required field is missing")]
    MissingField {
        /// Location of the field.
        path: String,
    },

    /// A value has the wrong JSON kind.
    #[error("{path}: expected {expected}, found {found}")]
    WrongKind {
        /// Location of the value; empty for the root.
        path: String,
        /// Kind the generated type needs.
        expected: &'static str,
        /// Kind that was present.
        found: &'static str,
    },

    /// A value has the right kind but cannot be decoded.
    #[error("{path}: {reason}")]
    Invalid {
        /// Location of the value; empty for the root.
        path: String,
        /// Why decoding failed.
        reason: String,
    },
}

impl FromValueError {
    /// Prefix the error path with the field or index of the enclosing value.
    pub fn at(self, segment: &str) -> Self {
        let join = |path: String| match (path.is_empty(), path.starts_with('[')) {
            (true, _) => segment.to_string(),
            (false, true) => format!("{segment}{path}"),
            (false, false) => format!("{segment}.{path}"),
        };
        match self {
            Self::MissingField { path } => Self::MissingField { path: join(path) },
            Self::WrongKind { path, expected, found } => Self::WrongKind {
                path: join(path),
                expected,
                found,
            },
            Self::Invalid { path, reason } => Self::Invalid {
                path: join(path),
                reason,
            },
        }
    }

    fn wrong_kind(expected: &'static str, value: &Value) -> Self {
        Self::WrongKind {
            path: String::new(),
            expected,
            found: ValueKind::of(value).as_str(),
        }
    }

    fn invalid(reason: impl Into<String>) -> Self {
        Self::Invalid {
            path: String::new(),
            reason: reason.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Field access
// ---------------------------------------------------------------------------

/// The value as an object.
pub fn object(value: &Value) -> Result<&Map<String, Value>, FromValueError> {
    value
        .as_object()
        .ok_or_else(|| FromValueError::wrong_kind("object", value))
}

/// Read a field that must be present.
pub fn required<T>(
    map: &Map<String, Value>,
    field: &str,
    read: impl FnOnce(&Value) -> Result<T, FromValueError>,
) -> Result<T, FromValueError> {
    let value = map.get(field).ok_or_else(|| FromValueError::MissingField {
        path: field.to_string(),
    })?;
    read(value).map_err(|e| e.at(field))
}

/// Read a field that may be absent. `null` reads as absent.
pub fn optional<T>(
    map: &Map<String, Value>,
    field: &str,
    read: impl FnOnce(&Value) -> Result<T, FromValueError>,
) -> Result<Option<T>, FromValueError> {
    match map.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => read(value).map(Some).map_err(|e| e.at(field)),
    }
}

/// Read a value that may be `null`, for fields that are required but
/// nullable.
pub fn nullable<T>(
    value: &Value,
    read: impl FnOnce(&Value) -> Result<T, FromValueError>,
) -> Result<Option<T>, FromValueError> {
    match value {
        Value::Null => Ok(None),
        other => read(other).map(Some),
    }
}

// ---------------------------------------------------------------------------
// Readers
// ---------------------------------------------------------------------------

pub fn read_null(value: &Value) -> Result<(), FromValueError> {
    match value {
        Value::Null => Ok(()),
        other => Err(FromValueError::wrong_kind("null", other)),
    }
}

pub fn read_bool(value: &Value) -> Result<bool, FromValueError> {
    value
        .as_bool()
        .ok_or_else(|| FromValueError::wrong_kind("boolean", value))
}

pub fn read_integer(value: &Value) -> Result<i64, FromValueError> {
    value
        .as_i64()
        .ok_or_else(|| FromValueError::wrong_kind("integer", value))
}

pub fn read_string(value: &Value) -> Result<String, FromValueError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| FromValueError::wrong_kind("string", value))
}

pub fn read_datetime(value: &Value) -> Result<DateTime<Utc>, FromValueError> {
    let s = value
        .as_str()
        .ok_or_else(|| FromValueError::wrong_kind("string", value))?;
    parse_datetime(s).map_err(|e| FromValueError::invalid(format!("invalid datetime \"{s}\": {e}")))
}

/// Bytes as a base64 string or a `{"$bytes": "..."}` object.
pub fn read_bytes(value: &Value) -> Result<Vec<u8>, FromValueError> {
    let encoded = match value {
        Value::String(s) => s.as_str(),
        Value::Object(map) => map
            .get("$bytes")
            .and_then(Value::as_str)
            .ok_or_else(|| FromValueError::invalid("expected a {\"$bytes\": ...} object"))?,
        other => return Err(FromValueError::wrong_kind("bytes", other)),
    };
    decode_bytes(encoded).map_err(|e| FromValueError::invalid(format!("invalid base64: {e}")))
}

/// The CID string of a `{"$link": "..."}` object.
pub fn read_cid_link(value: &Value) -> Result<String, FromValueError> {
    object(value)?
        .get("$link")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| FromValueError::invalid("expected a {\"$link\": ...} object"))
}

pub fn read_blob(value: &Value) -> Result<BlobRef, FromValueError> {
    BlobRef::from_value(value)
}

/// An array whose elements are read with `item`.
pub fn read_array<T>(
    value: &Value,
    item: impl Fn(&Value) -> Result<T, FromValueError>,
) -> Result<Vec<T>, FromValueError> {
    let items = value
        .as_array()
        .ok_or_else(|| FromValueError::wrong_kind("array", value))?;
    items
        .iter()
        .enumerate()
        .map(|(i, v)| item(v).map_err(|e| e.at(&format!("[{i}]"))))
        .collect()
}

/// An inline object kept as a generic map.
pub fn read_map(value: &Value) -> Result<Map<String, Value>, FromValueError> {
    object(value).cloned()
}

/// Any value, kept as is.
pub fn read_unknown(value: &Value) -> Result<Value, FromValueError> {
    Ok(value.clone())
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decode standard base64, padded or unpadded.
pub fn decode_bytes(encoded: &str) -> Result<Vec<u8>, base64::DecodeError> {
    STANDARD
        .decode(encoded)
        .or_else(|_| STANDARD_NO_PAD.decode(encoded))
}

/// Parse an RFC 3339 timestamp into UTC.
pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc))
}

// ---------------------------------------------------------------------------
// Blob references
// ---------------------------------------------------------------------------

/// A reference to stored binary content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobRef {
    /// Content identifier of the stored bytes.
    pub cid: String,
    pub mime_type: String,
    /// Size in bytes.
    pub size: u64,
}

impl BlobRef {
    /// Read `{"$type": "blob", "ref": {"$link": cid}, "mimeType": .., "size": ..}`.
    pub fn from_value(value: &Value) -> Result<Self, FromValueError> {
        let map = object(value)?;
        if map.get("$type").and_then(Value::as_str) != Some("blob") {
            return Err(FromValueError::invalid("blob must carry $type \"blob\""));
        }
        Ok(Self {
            cid: required(map, "ref", read_cid_link)?,
            mime_type: required(map, "mimeType", read_string)?,
            size: required(map, "size", |v| {
                v.as_u64()
                    .ok_or_else(|| FromValueError::wrong_kind("integer", v))
            })?,
        })
    }

    /// The structural form of this reference.
    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "$type": "blob",
            "ref": {"$link": self.cid},
            "mimeType": self.mime_type,
            "size": self.size,
        })
    }
}

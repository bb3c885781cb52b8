//! Field payloads and member-type conversion

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

/// Result type for field conversions
pub type ConvertResult<T> = Result<T, ConvertError>;

/// Errors raised when a field payload cannot become the target member type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConvertError {
    /// The payload shape cannot represent the target type at all
    #[error("cannot convert a {found} field into {target}")]
    Incompatible {
        /// Target member type name
        target: &'static str,
        /// Payload shape that was found
        found: &'static str,
    },

    /// The payload is textual but does not parse as the target type
    #[error("cannot parse '{payload}' as {target}: {message}")]
    Unparseable {
        /// Target member type name
        target: &'static str,
        /// Offending payload text
        payload: String,
        /// Parser message
        message: String,
    },
}

/// Raw payload of one record field
///
/// Content repositories store most fields as text; structured fields (layout
/// definitions, link lists) come through as JSON. Conversion into member
/// types goes through [`FieldConvert`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Plain stored text
    Text(String),

    /// Structured payload
    Structured(Value),
}

impl FieldValue {
    /// Shape label used in conversion diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Structured(_) => "structured",
        }
    }

    /// Borrow the textual payload, if this is one
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Structured(Value::String(text)) => Some(text),
            Self::Structured(_) => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<String> for FieldValue {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        match value {
            Value::String(text) => Self::Text(text),
            other => Self::Structured(other),
        }
    }
}

/// Two-way conversion between a field payload and a member type
///
/// `from_field` is used while populating an instance, `into_field` while
/// exporting one back into a field map. Implementations exist for the member
/// types the mapping layer supports; custom bindings can implement it for
/// their own types.
pub trait FieldConvert: Sized {
    /// Convert a field payload into the member type
    fn from_field(value: &FieldValue) -> ConvertResult<Self>;

    /// Convert the member value back into a field payload
    fn into_field(self) -> FieldValue;
}

impl FieldConvert for String {
    fn from_field(value: &FieldValue) -> ConvertResult<Self> {
        value
            .as_text()
            .map(ToOwned::to_owned)
            .ok_or(ConvertError::Incompatible {
                target: "String",
                found: value.kind(),
            })
    }

    fn into_field(self) -> FieldValue {
        FieldValue::Text(self)
    }
}

impl FieldConvert for bool {
    fn from_field(value: &FieldValue) -> ConvertResult<Self> {
        if let FieldValue::Structured(Value::Bool(flag)) = value {
            return Ok(*flag);
        }
        // Checkbox fields are stored as "1" / "" in the source repositories.
        match value.as_text().map(str::trim) {
            Some("1") | Some("true") => Ok(true),
            Some("0") | Some("false") | Some("") => Ok(false),
            Some(other) => Err(ConvertError::Unparseable {
                target: "bool",
                payload: other.to_owned(),
                message: "expected 1/0, true/false or empty".to_owned(),
            }),
            None => Err(ConvertError::Incompatible {
                target: "bool",
                found: value.kind(),
            }),
        }
    }

    fn into_field(self) -> FieldValue {
        FieldValue::Text(if self { "1" } else { "0" }.to_owned())
    }
}

impl FieldConvert for i64 {
    fn from_field(value: &FieldValue) -> ConvertResult<Self> {
        if let FieldValue::Structured(Value::Number(number)) = value {
            return number.as_i64().ok_or(ConvertError::Incompatible {
                target: "i64",
                found: "structured",
            });
        }
        let text = value.as_text().ok_or(ConvertError::Incompatible {
            target: "i64",
            found: value.kind(),
        })?;
        text.trim()
            .parse()
            .map_err(|err: std::num::ParseIntError| ConvertError::Unparseable {
                target: "i64",
                payload: text.to_owned(),
                message: err.to_string(),
            })
    }

    fn into_field(self) -> FieldValue {
        FieldValue::Text(self.to_string())
    }
}

impl FieldConvert for f64 {
    fn from_field(value: &FieldValue) -> ConvertResult<Self> {
        if let FieldValue::Structured(Value::Number(number)) = value {
            return number.as_f64().ok_or(ConvertError::Incompatible {
                target: "f64",
                found: "structured",
            });
        }
        let text = value.as_text().ok_or(ConvertError::Incompatible {
            target: "f64",
            found: value.kind(),
        })?;
        text.trim()
            .parse()
            .map_err(|err: std::num::ParseFloatError| ConvertError::Unparseable {
                target: "f64",
                payload: text.to_owned(),
                message: err.to_string(),
            })
    }

    fn into_field(self) -> FieldValue {
        FieldValue::Text(self.to_string())
    }
}

impl FieldConvert for Uuid {
    fn from_field(value: &FieldValue) -> ConvertResult<Self> {
        let text = value.as_text().ok_or(ConvertError::Incompatible {
            target: "Uuid",
            found: value.kind(),
        })?;
        // Repository identifiers arrive both braced ({...}) and bare.
        let bare = text.trim().trim_start_matches('{').trim_end_matches('}');
        Uuid::parse_str(bare).map_err(|err| ConvertError::Unparseable {
            target: "Uuid",
            payload: text.to_owned(),
            message: err.to_string(),
        })
    }

    fn into_field(self) -> FieldValue {
        FieldValue::Text(self.to_string())
    }
}

impl<V: FieldConvert> FieldConvert for Option<V> {
    fn from_field(value: &FieldValue) -> ConvertResult<Self> {
        match value {
            FieldValue::Text(text) if text.is_empty() => Ok(None),
            FieldValue::Structured(Value::Null) => Ok(None),
            present => V::from_field(present).map(Some),
        }
    }

    fn into_field(self) -> FieldValue {
        match self {
            Some(inner) => inner.into_field(),
            None => FieldValue::Text(String::new()),
        }
    }
}

impl FieldConvert for Value {
    fn from_field(value: &FieldValue) -> ConvertResult<Self> {
        Ok(match value {
            FieldValue::Text(text) => Value::String(text.clone()),
            FieldValue::Structured(json) => json.clone(),
        })
    }

    fn into_field(self) -> FieldValue {
        FieldValue::Structured(self)
    }
}

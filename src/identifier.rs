//! Component identifiers as page authors write them and as the runtime sees
//! them on the wire.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

use crate::error::{NamespaceError, Result};

/// The discriminator field of a structured identifier, the only namespaced one.
pub const TYPE_FIELD: &str = "type";

// ═══════════════════════════════════════════════════════════════════════════════
// WILDCARDS
// ═══════════════════════════════════════════════════════════════════════════════

/// Pattern-matching selectors used in structured identifier fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wildcard {
    All,
    Match,
    AllSmaller,
}

impl Wildcard {
    pub fn token(self) -> &'static str {
        match self {
            Wildcard::All => "ALL",
            Wildcard::Match => "MATCH",
            Wildcard::AllSmaller => "ALLSMALLER",
        }
    }

    /// Wildcards travel as one-element arrays, e.g. `["ALL"]`.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value.as_array().map(Vec::as_slice) {
            Some([Value::String(token)]) => match token.as_str() {
                "ALL" => Some(Wildcard::All),
                "MATCH" => Some(Wildcard::Match),
                "ALLSMALLER" => Some(Wildcard::AllSmaller),
                _ => None,
            },
            _ => None,
        }
    }
}

impl From<Wildcard> for Value {
    fn from(wildcard: Wildcard) -> Self {
        Value::Array(vec![Value::String(wildcard.token().to_string())])
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// STRUCTURED IDENTIFIERS
// ═══════════════════════════════════════════════════════════════════════════════

/// Ordered multi-field identifier. Always carries a string `type` field.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredId {
    fields: Map<String, Value>,
}

impl StructuredId {
    pub fn new(type_name: impl Into<String>) -> Self {
        let mut fields = Map::new();
        fields.insert(TYPE_FIELD.to_string(), Value::String(type_name.into()));
        Self { fields }
    }

    /// Adds a non-`type` field. `type` is fixed by [`StructuredId::new`] and
    /// only changes through [`StructuredId::set_type`].
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        if key != TYPE_FIELD {
            self.fields.insert(key.to_string(), value.into());
        }
        self
    }

    pub fn from_map(fields: Map<String, Value>) -> Result<Self> {
        match fields.get(TYPE_FIELD) {
            Some(Value::String(_)) => Ok(Self { fields }),
            Some(other) => Err(NamespaceError::malformed(
                Value::Object(fields.clone()).to_string(),
                format!("`type` must be a string, found {}", other),
            )),
            None => Err(NamespaceError::malformed(
                Value::Object(fields).to_string(),
                "structured identifier has no `type` field",
            )),
        }
    }

    pub fn type_name(&self) -> &str {
        self.fields
            .get(TYPE_FIELD)
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    pub fn set_type(&mut self, type_name: String) {
        self.fields
            .insert(TYPE_FIELD.to_string(), Value::String(type_name));
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub(crate) fn fields_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.fields
    }

    /// Compact JSON with sorted keys, the form the runtime embeds in
    /// `prop_id` strings and response keys.
    pub fn to_wire(&self) -> String {
        let mut keys: Vec<&String> = self.fields.keys().collect();
        keys.sort();
        let mut sorted = Map::new();
        for key in keys {
            sorted.insert(key.clone(), self.fields[key.as_str()].clone());
        }
        Value::Object(sorted).to_string()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// IDENTIFIER
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub enum Identifier {
    Simple(String),
    Structured(StructuredId),
}

impl Identifier {
    /// Registry key: the string itself, or the `type` field.
    pub fn key(&self) -> &str {
        match self {
            Identifier::Simple(id) => id,
            Identifier::Structured(id) => id.type_name(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.key().is_empty()
    }

    pub fn to_wire(&self) -> String {
        match self {
            Identifier::Simple(id) => id.clone(),
            Identifier::Structured(id) => id.to_wire(),
        }
    }

    /// Parses the wire form. Text starting with `{` must be a JSON object
    /// with a string `type` field.
    pub fn from_wire(text: &str) -> Result<Self> {
        if !text.starts_with('{') {
            return Ok(Identifier::Simple(text.to_string()));
        }
        let fields: Map<String, Value> = serde_json::from_str(text)
            .map_err(|e| NamespaceError::malformed(text, e.to_string()))?;
        StructuredId::from_map(fields).map(Identifier::Structured)
    }

    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::String(id) => Ok(Identifier::Simple(id.clone())),
            Value::Object(fields) => {
                StructuredId::from_map(fields.clone()).map(Identifier::Structured)
            }
            other => Err(NamespaceError::malformed(
                other.to_string(),
                "expected a string or an object",
            )),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Identifier::Simple(id) => Value::String(id.clone()),
            Identifier::Structured(id) => Value::Object(id.fields.clone()),
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wire())
    }
}

impl From<&str> for Identifier {
    fn from(id: &str) -> Self {
        Identifier::Simple(id.to_string())
    }
}

impl From<String> for Identifier {
    fn from(id: String) -> Self {
        Identifier::Simple(id)
    }
}

impl From<StructuredId> for Identifier {
    fn from(id: StructuredId) -> Self {
        Identifier::Structured(id)
    }
}

impl Serialize for Identifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Identifier::Simple(id) => serializer.serialize_str(id),
            Identifier::Structured(id) => id.fields.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Identifier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Identifier::from_value(&value).map_err(D::Error::custom)
    }
}

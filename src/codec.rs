//! Bidirectional identifier encoding.
//!
//! `encode(ns, id)` prefixes the namespaced field with `ns + SEP`; `decode`
//! splits on the last `SEP`. Host-owned simple ids are never touched.

use serde_json::Value;
use std::collections::HashSet;

use crate::config::{validate_separator, IsolationConfig};
use crate::error::{NamespaceError, Result};
use crate::identifier::Identifier;
use crate::namespace::Namespace;

pub const DEFAULT_SEPARATOR: &str = "||";

/// Placeholder ids owned by the host runtime (routing, page content, store).
pub const HOST_OWNED_IDS: &[&str] = &[
    "url",
    "_pages_location",
    "_pages_content",
    "_pages_store",
    "_pages_dummy",
];

/// `prop_id` of a trigger context before anything fired.
pub const NO_TRIGGER_PROP_ID: &str = ".";

#[derive(Debug, Clone)]
pub struct IdentifierCodec {
    separator: String,
    skip_ids: HashSet<String>,
}

impl Default for IdentifierCodec {
    fn default() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR.to_string(),
            skip_ids: HOST_OWNED_IDS.iter().map(|id| id.to_string()).collect(),
        }
    }
}

impl IdentifierCodec {
    pub fn new(separator: &str, skip_ids: impl IntoIterator<Item = String>) -> Result<Self> {
        validate_separator(separator)?;
        Ok(Self {
            separator: separator.to_string(),
            skip_ids: skip_ids.into_iter().collect(),
        })
    }

    pub fn from_config(config: &IsolationConfig) -> Result<Self> {
        Self::new(&config.separator, config.skip_ids.iter().cloned())
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    pub fn is_host_owned(&self, id: &Identifier) -> bool {
        matches!(id, Identifier::Simple(id) if self.skip_ids.contains(id))
    }

    pub fn is_global(&self, value: &str) -> bool {
        value.contains(&self.separator)
    }

    fn prefix(&self, ns: &Namespace, local: &str) -> Result<String> {
        if self.is_global(local) {
            return Err(NamespaceError::SeparatorInLocalId {
                id: local.to_string(),
                separator: self.separator.clone(),
            });
        }
        Ok(format!("{}{}{}", ns, self.separator, local))
    }

    /// Splits `value` on the last separator into `(namespace, local)`.
    pub fn split<'a>(&self, value: &'a str) -> Option<(&'a str, &'a str)> {
        value.rsplit_once(self.separator.as_str())
    }

    pub fn encode(&self, ns: &Namespace, id: &Identifier) -> Result<Identifier> {
        match id {
            _ if self.is_host_owned(id) => Ok(id.clone()),
            Identifier::Simple(local) => self.prefix(ns, local).map(Identifier::Simple),
            Identifier::Structured(structured) => {
                let mut encoded = structured.clone();
                encoded.set_type(self.prefix(ns, structured.type_name())?);
                Ok(Identifier::Structured(encoded))
            }
        }
    }

    /// Inverse of [`IdentifierCodec::encode`]. An identifier without the
    /// separator comes back unchanged with no namespace.
    pub fn decode(&self, id: &Identifier) -> Result<(Option<Namespace>, Identifier)> {
        let Some((prefix, local)) = self.split(id.key()) else {
            return Ok((None, id.clone()));
        };
        let ns = Namespace::new(prefix)
            .map_err(|_| NamespaceError::malformed(id.to_wire(), "invalid namespace prefix"))?;
        let local = match id {
            Identifier::Simple(_) => Identifier::Simple(local.to_string()),
            Identifier::Structured(structured) => {
                let mut decoded = structured.clone();
                decoded.set_type(local.to_string());
                Identifier::Structured(decoded)
            }
        };
        Ok((Some(ns), local))
    }

    /// Strips namespaces from a wire id. Every string field of a structured
    /// id that carries the separator is stripped.
    pub fn decode_wire(&self, text: &str) -> Result<Identifier> {
        match Identifier::from_wire(text)? {
            Identifier::Simple(id) => {
                let local = self.split(&id).map_or(id.as_str(), |(_, local)| local);
                Ok(Identifier::Simple(local.to_string()))
            }
            Identifier::Structured(mut structured) => {
                for value in structured.fields_mut().values_mut() {
                    if let Value::String(field) = value {
                        if let Some((_, local)) = field.rsplit_once(self.separator.as_str()) {
                            *field = local.to_string();
                        }
                    }
                }
                Ok(Identifier::Structured(structured))
            }
        }
    }

    /// Rewrites `<global wire id>.<property>` to `<local wire id>.<property>`.
    pub fn decode_prop_id(&self, prop_id: &str) -> Result<String> {
        if prop_id == NO_TRIGGER_PROP_ID {
            return Ok(prop_id.to_string());
        }
        let (id_text, property) = prop_id.rsplit_once('.').ok_or_else(|| {
            NamespaceError::malformed(prop_id, "expected `<identifier>.<property>`")
        })?;
        let local = self.decode_wire(id_text)?;
        Ok(format!("{}.{}", local.to_wire(), property))
    }

    /// Namespace carried by a global wire id, if any.
    pub fn namespace_of_wire(&self, text: &str) -> Result<Option<Namespace>> {
        let id = Identifier::from_wire(text)?;
        Ok(self.decode(&id)?.0)
    }
}

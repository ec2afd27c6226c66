use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

use crate::codec::IdentifierCodec;
use crate::error::{NamespaceError, Result};
use crate::identifier::Identifier;
use crate::namespace::Namespace;

/// Out-of-band property updates issued from inside a callback body.
///
/// The target is not a declared output, so neither binding declaration nor
/// response rewriting sees it; the id is encoded here instead. One setter
/// lives per invocation.
#[derive(Debug)]
pub struct PropSetter {
    codec: Arc<IdentifierCodec>,
    namespace: Option<Namespace>,
    updates: Mutex<Map<String, Value>>,
}

impl PropSetter {
    pub fn new(codec: Arc<IdentifierCodec>, namespace: Option<Namespace>) -> Self {
        Self {
            codec,
            namespace,
            updates: Mutex::new(Map::new()),
        }
    }

    pub fn namespace(&self) -> Option<&Namespace> {
        self.namespace.as_ref()
    }

    /// Queues `props` for the component `id`, given in local terms.
    pub fn set_props(&self, id: impl Into<Identifier>, props: Map<String, Value>) -> Result<()> {
        let id = id.into();
        if id.is_empty() {
            return Err(NamespaceError::malformed(id.to_wire(), "set_props needs a target id"));
        }

        let target = match &self.namespace {
            Some(namespace) => self.codec.encode(namespace, &id)?,
            None => id,
        };
        let key = target.to_wire();
        debug!(target = %key, props = props.len(), "out-of-band prop set");

        let mut updates = self.updates.lock();
        match updates.get_mut(&key) {
            Some(Value::Object(existing)) => existing.extend(props),
            _ => {
                updates.insert(key, Value::Object(props));
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.updates.lock().is_empty()
    }

    /// Queued updates keyed by global wire id, or `None` when nothing was set.
    pub fn into_side_update(self) -> Option<Value> {
        let updates = self.updates.into_inner();
        (!updates.is_empty()).then(|| Value::Object(updates))
    }
}

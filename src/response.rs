//! Outgoing payload rewriting.
//!
//! Callback bodies build brand-new components with bare local ids. Those
//! never pass through binding declaration, so every `id` field found below a
//! namespaced response entry is re-encoded here, at the transport boundary.

use serde::Serialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::codec::IdentifierCodec;
use crate::config::RewritePolicy;
use crate::error::Result;
use crate::identifier::{Identifier, TYPE_FIELD};
use crate::namespace::Namespace;
use crate::registry::NamespaceRegistry;

/// Marker key and value of an incremental patch payload.
pub const PATCH_MARKER: &str = "__dash_patch_update";

/// Top-level payload sections keyed by global output ids.
pub const RESPONSE_SECTIONS: &[&str] = &["response", "sideUpdate"];

// ═══════════════════════════════════════════════════════════════════════════════
// PATCH PAYLOADS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatchOperation {
    pub operation: String,
    pub location: Vec<Value>,
    pub params: Map<String, Value>,
}

/// Incremental update of a property, applied client side.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Patch {
    operations: Vec<PatchOperation>,
}

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, operation: &str, location: Vec<Value>, params: Value) -> &mut Self {
        let params = match params {
            Value::Object(params) => params,
            _ => Map::new(),
        };
        self.operations.push(PatchOperation {
            operation: operation.to_string(),
            location,
            params,
        });
        self
    }

    pub fn append(&mut self, value: Value) -> &mut Self {
        self.push("Append", Vec::new(), json!({ "value": value }))
    }

    pub fn prepend(&mut self, value: Value) -> &mut Self {
        self.push("Prepend", Vec::new(), json!({ "value": value }))
    }

    pub fn extend(&mut self, values: Vec<Value>) -> &mut Self {
        self.push("Extend", Vec::new(), json!({ "value": values }))
    }

    pub fn insert(&mut self, index: i64, value: Value) -> &mut Self {
        self.push("Insert", Vec::new(), json!({ "index": index, "value": value }))
    }

    pub fn assign(&mut self, location: Vec<Value>, value: Value) -> &mut Self {
        self.push("Assign", location, json!({ "value": value }))
    }

    pub fn delete(&mut self, location: Vec<Value>) -> &mut Self {
        self.push("Delete", location, Value::Null)
    }

    pub fn clear(&mut self) -> &mut Self {
        self.push("Clear", Vec::new(), Value::Null)
    }

    pub fn operations(&self) -> &[PatchOperation] {
        &self.operations
    }

    pub fn to_value(&self) -> Value {
        json!({
            PATCH_MARKER: PATCH_MARKER,
            "operations": self.operations,
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RESPONSE REWRITER
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewriteReport {
    /// Response entries whose key carried a namespace.
    pub entries: usize,
    pub rewritten: usize,
    /// Ids left alone because the policy does not admit them.
    pub skipped: usize,
}

#[derive(Debug, Clone)]
pub struct ResponseRewriter {
    codec: Arc<IdentifierCodec>,
    registry: Arc<NamespaceRegistry>,
    policy: RewritePolicy,
}

impl ResponseRewriter {
    pub fn new(
        codec: Arc<IdentifierCodec>,
        registry: Arc<NamespaceRegistry>,
        policy: RewritePolicy,
    ) -> Self {
        Self {
            codec,
            registry,
            policy,
        }
    }

    pub fn rewrite(&self, payload: &mut Value) -> Result<RewriteReport> {
        let mut report = RewriteReport::default();
        for section in RESPONSE_SECTIONS {
            let Some(Value::Object(entries)) = payload.get_mut(*section) else {
                continue;
            };
            for (key, value) in entries.iter_mut() {
                let Some(namespace) = self.codec.namespace_of_wire(key)? else {
                    continue;
                };
                report.entries += 1;
                self.rewrite_value(value, &namespace, &mut report)?;
            }
        }
        Ok(report)
    }

    fn rewrite_value(&self, value: &mut Value, namespace: &Namespace, report: &mut RewriteReport) -> Result<()> {
        match value {
            Value::Object(fields) => {
                for (key, field) in fields.iter_mut() {
                    if key == "id" {
                        self.rewrite_id(field, namespace, report)?;
                    } else {
                        self.rewrite_value(field, namespace, report)?;
                    }
                }
            }
            Value::Array(items) => {
                for item in items {
                    self.rewrite_value(item, namespace, report)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn rewrite_id(&self, field: &mut Value, namespace: &Namespace, report: &mut RewriteReport) -> Result<()> {
        // Plain data rows also carry `id` fields; only component-shaped ids count.
        let component_shaped = match field {
            Value::String(_) => true,
            Value::Object(fields) => fields.get(TYPE_FIELD).is_some_and(Value::is_string),
            _ => false,
        };
        if !component_shaped {
            return Ok(());
        }

        let id = Identifier::from_value(field)?;
        if id.is_empty() || self.codec.is_host_owned(&id) || self.codec.is_global(id.key()) {
            return Ok(());
        }
        if !self.registry.admits(self.policy, &id) {
            warn!(namespace = %namespace, id = %id, "id created at invocation time was never bound; left unnamespaced");
            report.skipped += 1;
            return Ok(());
        }

        let encoded = self.codec.encode(namespace, &id)?;
        debug!(namespace = %namespace, id = %encoded, "namespaced response id");
        *field = encoded.to_value();
        report.rewritten += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::Component;
    use crate::identifier::StructuredId;

    fn rewriter(policy: RewritePolicy, keys: &[&str]) -> ResponseRewriter {
        let registry = Arc::new(NamespaceRegistry::new());
        for key in keys {
            registry.record(key);
        }
        ResponseRewriter::new(Arc::new(IdentifierCodec::default()), registry, policy)
    }

    #[test]
    fn test_appended_structured_component_is_namespaced() {
        let dropdown = Component::core("Dropdown")
            .with_id(StructuredId::new("filter").with("index", 3))
            .with_prop("options", json!(["NYC", "MTL"]))
            .into_ref();
        let mut patch = Patch::new();
        patch.append(dropdown.to_value().unwrap());

        let mut payload = json!({
            "multi": true,
            "response": {
                "pattern_dyn||dropdown-container-div": { "children": patch.to_value() }
            }
        });

        let report = rewriter(RewritePolicy::Registered, &["filter"])
            .rewrite(&mut payload)
            .unwrap();
        assert_eq!(report, RewriteReport { entries: 1, rewritten: 1, skipped: 0 });

        let op = &payload["response"]["pattern_dyn||dropdown-container-div"]["children"]["operations"][0];
        assert_eq!(op["operation"], json!("Append"));
        assert_eq!(
            op["params"]["value"]["props"]["id"],
            json!({ "type": "pattern_dyn||filter", "index": 3 })
        );
    }

    #[test]
    fn test_children_list_is_walked() {
        let mut payload = json!({
            "multi": true,
            "response": {
                "A||output": { "children": [
                    { "type": "Div", "namespace": "html", "props": { "id": "value" } },
                    { "type": "Div", "namespace": "html", "props": { "id": "unbound" } }
                ] }
            }
        });
        let report = rewriter(RewritePolicy::Registered, &["value"])
            .rewrite(&mut payload)
            .unwrap();
        assert_eq!(report.rewritten, 1);
        assert_eq!(report.skipped, 1);
        let children = &payload["response"]["A||output"]["children"];
        assert_eq!(children[0]["props"]["id"], json!("A||value"));
        assert_eq!(children[1]["props"]["id"], json!("unbound"));
    }

    #[test]
    fn test_unconditional_policy_rewrites_unbound_ids() {
        let mut payload = json!({
            "response": { "A||output": { "children": { "props": { "id": "fresh" } } } }
        });
        rewriter(RewritePolicy::Unconditional, &[])
            .rewrite(&mut payload)
            .unwrap();
        assert_eq!(
            payload["response"]["A||output"]["children"]["props"]["id"],
            json!("A||fresh")
        );
    }

    #[test]
    fn test_unnamespaced_entries_and_data_ids_untouched() {
        let mut payload = json!({
            "response": {
                "_pages_content": { "children": { "props": { "id": "value" } } },
                "A||table": { "data": [ { "id": 1, "name": "row" } ] }
            }
        });
        let before = payload.clone();
        let report = rewriter(RewritePolicy::Registered, &["value"])
            .rewrite(&mut payload)
            .unwrap();
        assert_eq!(report.entries, 1);
        assert_eq!(payload, before);
    }

    #[test]
    fn test_already_global_ids_not_double_encoded() {
        let mut payload = json!({
            "response": { "A||output": { "children": { "props": { "id": "A||value" } } } }
        });
        rewriter(RewritePolicy::Unconditional, &[])
            .rewrite(&mut payload)
            .unwrap();
        assert_eq!(
            payload["response"]["A||output"]["children"]["props"]["id"],
            json!("A||value")
        );
    }

    #[test]
    fn test_structured_response_key() {
        let mut payload = json!({
            "response": {
                r#"{"index":1,"type":"dyn||card"}"#: { "children": { "props": { "id": "value" } } }
            }
        });
        rewriter(RewritePolicy::Registered, &["value"])
            .rewrite(&mut payload)
            .unwrap();
        assert_eq!(
            payload["response"][r#"{"index":1,"type":"dyn||card"}"#]["children"]["props"]["id"],
            json!("dyn||value")
        );
    }

    #[test]
    fn test_patch_operations_shape() {
        let mut patch = Patch::new();
        patch
            .insert(0, json!("first"))
            .assign(vec![json!(1), json!("label")], json!("x"))
            .delete(vec![json!(2)])
            .clear()
            .prepend(json!("head"))
            .extend(vec![json!("x"), json!("y")]);
        let value = patch.to_value();
        assert_eq!(value["__dash_patch_update"], json!("__dash_patch_update"));
        assert_eq!(value.as_object().unwrap().len(), 2);
        assert_eq!(value["operations"][0]["params"], json!({ "index": 0, "value": "first" }));
        assert_eq!(value["operations"][1]["location"], json!([1, "label"]));
        assert_eq!(value["operations"][3]["params"], json!({}));
        assert_eq!(value["operations"][4]["operation"], json!("Prepend"));
        assert_eq!(value["operations"][4]["params"], json!({ "value": "head" }));
        assert_eq!(value["operations"][5]["operation"], json!("Extend"));
        assert_eq!(value["operations"][5]["params"], json!({ "value": ["x", "y"] }));
        assert_eq!(patch.operations().len(), 6);
    }
}

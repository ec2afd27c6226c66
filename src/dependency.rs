use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::codec::IdentifierCodec;
use crate::error::{NamespaceError, Result};
use crate::identifier::Identifier;
use crate::namespace::{Namespace, ResolutionContext};
use crate::registry::NamespaceRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
    Input,
    Output,
    State,
}

/// A property of a component bound to a callback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dependency {
    pub kind: DependencyKind,
    pub id: Identifier,
    pub property: String,
}

impl Dependency {
    pub fn new(kind: DependencyKind, id: impl Into<Identifier>, property: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            property: property.into(),
        }
    }

    /// `<wire id>.<property>`, as the runtime reports it in trigger contexts.
    pub fn prop_id(&self) -> String {
        format!("{}.{}", self.id.to_wire(), self.property)
    }
}

/// Namespaces identifiers as bindings are declared and records their keys.
#[derive(Debug, Clone)]
pub struct DependencyRegistrar {
    codec: Arc<IdentifierCodec>,
    registry: Arc<NamespaceRegistry>,
    pages_root: String,
}

impl DependencyRegistrar {
    pub fn new(
        codec: Arc<IdentifierCodec>,
        registry: Arc<NamespaceRegistry>,
        pages_root: impl Into<String>,
    ) -> Self {
        Self {
            codec,
            registry,
            pages_root: pages_root.into(),
        }
    }

    pub fn binding_for(
        &self,
        namespace: Option<&Namespace>,
        kind: DependencyKind,
        id: Identifier,
        property: &str,
    ) -> Result<Dependency> {
        if id.is_empty() {
            return Err(NamespaceError::malformed(
                id.to_wire(),
                "bindings need a non-empty identifier",
            ));
        }

        let namespace = match namespace {
            Some(ns) if !self.codec.is_host_owned(&id) => ns,
            _ => return Ok(Dependency::new(kind, id, property)),
        };

        let encoded = self.codec.encode(namespace, &id)?;
        self.registry.record_identifier(&id);
        debug!(namespace = %namespace, id = %encoded, property, "namespaced binding");
        Ok(Dependency::new(kind, encoded, property))
    }

    /// Declares a binding on behalf of whatever page module is innermost on
    /// `ctx`. Declarations from outside the pages root stay unnamespaced.
    pub fn binding_in(
        &self,
        ctx: &ResolutionContext,
        kind: DependencyKind,
        id: Identifier,
        property: &str,
    ) -> Result<Dependency> {
        let namespace = ctx.resolve(&self.pages_root);
        self.binding_for(namespace.as_ref(), kind, id, property)
    }

    /// Re-declares an already built binding, e.g. from a runtime hook.
    pub fn intercept(&self, namespace: Option<&Namespace>, dependency: Dependency) -> Result<Dependency> {
        let Dependency { kind, id, property } = dependency;
        self.binding_for(namespace, kind, id, &property)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::{StructuredId, Wildcard};
    use crate::namespace::ModuleFrame;

    fn registrar() -> (DependencyRegistrar, Arc<NamespaceRegistry>) {
        let registry = Arc::new(NamespaceRegistry::new());
        let registrar = DependencyRegistrar::new(
            Arc::new(IdentifierCodec::default()),
            Arc::clone(&registry),
            "pages",
        );
        (registrar, registry)
    }

    #[test]
    fn test_binding_is_encoded_and_recorded() {
        let (registrar, registry) = registrar();
        let ns = Namespace::new("pages_analytics").unwrap();
        let dep = registrar
            .binding_for(Some(&ns), DependencyKind::Input, "analytics-input".into(), "value")
            .unwrap();
        assert_eq!(dep.id, Identifier::from("pages_analytics||analytics-input"));
        assert_eq!(dep.prop_id(), "pages_analytics||analytics-input.value");
        assert!(registry.contains("analytics-input"));
    }

    #[test]
    fn test_no_namespace_leaves_binding_alone() {
        let (registrar, registry) = registrar();
        let dep = registrar
            .binding_for(None, DependencyKind::Output, "_pages_content".into(), "children")
            .unwrap();
        assert_eq!(dep.id, Identifier::from("_pages_content"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_host_owned_id_not_recorded() {
        let (registrar, registry) = registrar();
        let ns = Namespace::new("pages_home").unwrap();
        let dep = registrar
            .binding_for(Some(&ns), DependencyKind::Input, "url".into(), "pathname")
            .unwrap();
        assert_eq!(dep.id, Identifier::from("url"));
        assert!(!registry.contains("url"));
    }

    #[test]
    fn test_binding_in_resolves_from_context() {
        let (registrar, registry) = registrar();
        let mut ctx = ResolutionContext::new();
        let id: Identifier = StructuredId::new("city-filter-dropdown")
            .with("index", Wildcard::All)
            .into();
        let dep = ctx
            .scoped(ModuleFrame::module("pages.pattern.page"), |ctx| {
                registrar.binding_in(ctx, DependencyKind::Input, id, "value")
            })
            .unwrap();
        assert_eq!(dep.id.key(), "pages_pattern||city-filter-dropdown");
        assert_eq!(
            dep.prop_id(),
            r#"{"index":["ALL"],"type":"pages_pattern||city-filter-dropdown"}.value"#
        );
        assert!(registry.contains("city-filter-dropdown"));
    }

    #[test]
    fn test_empty_identifier_fails_fast() {
        let (registrar, _) = registrar();
        assert!(registrar
            .binding_for(None, DependencyKind::Input, "".into(), "value")
            .is_err());
    }
}

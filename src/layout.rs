use std::sync::Arc;
use tracing::{debug, warn};

use crate::codec::IdentifierCodec;
use crate::component::ComponentRef;
use crate::config::RewritePolicy;
use crate::error::{NamespaceError, Result};
use crate::identifier::Identifier;
use crate::namespace::Namespace;
use crate::registry::NamespaceRegistry;
use crate::visitor::{walk_component, LayoutVisitor, VisitedSet};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LayoutReport {
    pub visited: usize,
    pub rewritten: usize,
    /// Ids already carrying a namespace, e.g. a node shared with a page
    /// walked earlier.
    pub skipped: usize,
}

/// Rewrites the identifiers of a page layout into the page's namespace.
///
/// Must run after every binding of the page is declared: under the
/// registered policy a node is only rewritten when its key is known.
#[derive(Debug, Clone)]
pub struct LayoutNamespacer {
    codec: Arc<IdentifierCodec>,
    registry: Arc<NamespaceRegistry>,
    policy: RewritePolicy,
}

impl LayoutNamespacer {
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

    pub fn should_rewrite(&self, id: &Identifier) -> bool {
        if id.is_empty() || self.codec.is_host_owned(id) {
            return false;
        }
        self.registry.admits(self.policy, id)
    }

    pub fn namespace_layout(&self, root: &ComponentRef, namespace: &Namespace) -> Result<LayoutReport> {
        let mut visitor = NamespacingVisitor {
            namer: self,
            namespace,
            visited: VisitedSet::default(),
            rewritten: 0,
            skipped: 0,
            error: None,
        };
        visitor.visit_root(root);

        if let Some(err) = visitor.error {
            return Err(err);
        }
        Ok(LayoutReport {
            visited: visitor.visited.len(),
            rewritten: visitor.rewritten,
            skipped: visitor.skipped,
        })
    }
}

struct NamespacingVisitor<'a> {
    namer: &'a LayoutNamespacer,
    namespace: &'a Namespace,
    visited: VisitedSet,
    rewritten: usize,
    skipped: usize,
    error: Option<NamespaceError>,
}

impl NamespacingVisitor<'_> {
    fn rewrite(&mut self, node: &ComponentRef) -> Result<()> {
        let mut component = node.write();
        let Some(id) = component.id.as_ref() else {
            return Ok(());
        };
        if self.namer.codec.is_global(id.key()) {
            warn!(namespace = %self.namespace, id = %id, "layout node already namespaced; left as is");
            self.skipped += 1;
            return Ok(());
        }
        if !self.namer.should_rewrite(id) {
            return Ok(());
        }
        let encoded = self.namer.codec.encode(self.namespace, id)?;
        debug!(namespace = %self.namespace, id = %encoded, "namespaced layout node");
        component.id = Some(encoded);
        self.rewritten += 1;
        Ok(())
    }
}

impl LayoutVisitor for NamespacingVisitor<'_> {
    fn visited(&mut self) -> &mut VisitedSet {
        &mut self.visited
    }

    fn visit_component(&mut self, node: &ComponentRef) {
        if self.error.is_some() {
            return;
        }
        if let Err(err) = self.rewrite(node) {
            self.error = Some(err);
            return;
        }
        walk_component(self, node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::Component;
    use crate::identifier::StructuredId;
    use crate::visitor::collect_ids;

    fn namer(policy: RewritePolicy, keys: &[&str]) -> LayoutNamespacer {
        let registry = Arc::new(NamespaceRegistry::new());
        for key in keys {
            registry.record(key);
        }
        LayoutNamespacer::new(Arc::new(IdentifierCodec::default()), registry, policy)
    }

    #[test]
    fn test_only_registered_ids_are_rewritten() {
        let root = Component::html("Div")
            .with_children([
                Component::html("Button").with_id("login-button").into_ref(),
                Component::core("Dropdown").with_id("analytics-input").into_ref(),
                Component::core("Dropdown")
                    .with_id(StructuredId::new("city-filter-dropdown").with("index", 1))
                    .into_ref(),
            ])
            .into_ref();

        let ns = Namespace::new("pages_home").unwrap();
        let report = namer(
            RewritePolicy::Registered,
            &["analytics-input", "city-filter-dropdown"],
        )
        .namespace_layout(&root, &ns)
        .unwrap();

        assert_eq!(report, LayoutReport { visited: 4, rewritten: 2, skipped: 0 });
        let ids: Vec<String> = collect_ids(&root).iter().map(|id| id.to_wire()).collect();
        assert_eq!(
            ids,
            vec![
                "login-button",
                "pages_home||analytics-input",
                r#"{"index":1,"type":"pages_home||city-filter-dropdown"}"#,
            ]
        );
    }

    #[test]
    fn test_shared_node_rewritten_once() {
        let shared = Component::html("Div").with_id("value").into_ref();
        let root = Component::html("Div")
            .with_children([
                Component::html("Section").with_child(shared.clone()).into_ref(),
                Component::html("Aside").with_child(shared.clone()).into_ref(),
            ])
            .into_ref();

        let ns = Namespace::new("A").unwrap();
        let report = namer(RewritePolicy::Registered, &["value"])
            .namespace_layout(&root, &ns)
            .unwrap();

        assert_eq!(report.rewritten, 1);
        assert_eq!(shared.id(), Some(Identifier::from("A||value")));
    }

    #[test]
    fn test_unconditional_policy_skips_only_host_ids() {
        let root = Component::html("Div")
            .with_children([
                Component::html("Div").with_id("anything").into_ref(),
                Component::html("Div").with_id("_pages_content").into_ref(),
            ])
            .into_ref();

        let ns = Namespace::new("B").unwrap();
        let report = namer(RewritePolicy::Unconditional, &[])
            .namespace_layout(&root, &ns)
            .unwrap();
        assert_eq!(report.rewritten, 1);
        let ids: Vec<String> = collect_ids(&root).iter().map(|id| id.to_wire()).collect();
        assert_eq!(ids, vec!["B||anything", "_pages_content"]);
    }

    #[test]
    fn test_second_walk_leaves_global_ids_alone() {
        for policy in [RewritePolicy::Registered, RewritePolicy::Unconditional] {
            let root = Component::html("Div").with_id("x").into_ref();
            let namer = namer(policy, &["x"]);
            namer.namespace_layout(&root, &Namespace::new("B").unwrap()).unwrap();

            let report = namer
                .namespace_layout(&root, &Namespace::new("C").unwrap())
                .unwrap();
            assert_eq!(report, LayoutReport { visited: 1, rewritten: 0, skipped: 1 });
            assert_eq!(root.id(), Some(Identifier::from("B||x")));
        }
    }
}

use std::collections::HashSet;

use crate::component::ComponentRef;
use crate::identifier::Identifier;

/// Node identities already seen during one walk.
#[derive(Debug, Default)]
pub struct VisitedSet(HashSet<usize>);

impl VisitedSet {
    /// Returns true the first time `node` is offered.
    pub fn insert(&mut self, node: &ComponentRef) -> bool {
        self.0.insert(node.ptr_id())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The single traversal mechanism for component trees.
///
/// Rules:
/// 1. Every reachable node is visited at most once per walk, even when it hangs
///    below several parents or sits on a cycle.
/// 2. Implementers override `visit_*` methods to add behavior and call the
///    matching `walk_*` function to continue, unless pruning is intended.
/// 3. No lock on a node is held while its children are visited.
pub trait LayoutVisitor {
    fn visited(&mut self) -> &mut VisitedSet;

    fn visit_root(&mut self, root: &ComponentRef) {
        walk_node(self, root);
    }

    fn visit_component(&mut self, node: &ComponentRef) {
        walk_component(self, node);
    }

    fn visit_children(&mut self, children: &[ComponentRef]) {
        walk_children(self, children);
    }
}

pub fn walk_node<V: LayoutVisitor + ?Sized>(visitor: &mut V, node: &ComponentRef) {
    if visitor.visited().insert(node) {
        visitor.visit_component(node);
    }
}

pub fn walk_children<V: LayoutVisitor + ?Sized>(visitor: &mut V, children: &[ComponentRef]) {
    for child in children {
        walk_node(visitor, child);
    }
}

pub fn walk_component<V: LayoutVisitor + ?Sized>(visitor: &mut V, node: &ComponentRef) {
    let children = node.read().children.nodes();
    visitor.visit_children(&children);
}

#[derive(Default)]
struct IdCollector {
    visited: VisitedSet,
    ids: Vec<Identifier>,
}

impl LayoutVisitor for IdCollector {
    fn visited(&mut self) -> &mut VisitedSet {
        &mut self.visited
    }

    fn visit_component(&mut self, node: &ComponentRef) {
        if let Some(id) = node.id() {
            self.ids.push(id);
        }
        walk_component(self, node);
    }
}

/// Identifiers of every node reachable from `root`, in pre-order.
pub fn collect_ids(root: &ComponentRef) -> Vec<Identifier> {
    let mut collector = IdCollector::default();
    collector.visit_root(root);
    collector.ids
}

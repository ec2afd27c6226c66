//! Component tree nodes as page layouts and callbacks build them.
//!
//! Nodes are shared handles so one sub-tree may hang below several parents;
//! walkers key their visited sets on node identity ([`ComponentRef::ptr_id`]).

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::Arc;

use crate::error::{NamespaceError, Result};
use crate::identifier::Identifier;

pub const HTML_LIBRARY: &str = "html";
pub const CORE_LIBRARY: &str = "core";

#[derive(Debug, Clone)]
pub enum Child {
    Text(String),
    Node(ComponentRef),
}

#[derive(Debug, Clone, Default)]
pub enum Children {
    #[default]
    None,
    One(Child),
    Many(Vec<Child>),
}

impl Children {
    /// Node children in order, text skipped.
    pub fn nodes(&self) -> Vec<ComponentRef> {
        let node = |child: &Child| match child {
            Child::Node(node) => Some(node.clone()),
            Child::Text(_) => None,
        };
        match self {
            Children::None => Vec::new(),
            Children::One(child) => node(child).into_iter().collect(),
            Children::Many(children) => children.iter().filter_map(node).collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Component {
    pub kind: String,
    pub library: String,
    pub id: Option<Identifier>,
    pub props: Map<String, Value>,
    pub children: Children,
}

impl Component {
    pub fn new(library: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            library: library.into(),
            id: None,
            props: Map::new(),
            children: Children::None,
        }
    }

    pub fn html(kind: impl Into<String>) -> Self {
        Self::new(HTML_LIBRARY, kind)
    }

    pub fn core(kind: impl Into<String>) -> Self {
        Self::new(CORE_LIBRARY, kind)
    }

    pub fn with_id(mut self, id: impl Into<Identifier>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_prop(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.props.insert(key.to_string(), value.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children = Children::One(Child::Text(text.into()));
        self
    }

    pub fn with_child(mut self, child: ComponentRef) -> Self {
        self.children = Children::One(Child::Node(child));
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = ComponentRef>) -> Self {
        self.children = Children::Many(children.into_iter().map(Child::Node).collect());
        self
    }

    pub fn into_ref(self) -> ComponentRef {
        ComponentRef::new(self)
    }
}

/// Shared, lockable handle to a tree node.
#[derive(Debug, Clone)]
pub struct ComponentRef(Arc<RwLock<Component>>);

impl ComponentRef {
    pub fn new(component: Component) -> Self {
        Self(Arc::new(RwLock::new(component)))
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Component> {
        self.0.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, Component> {
        self.0.write()
    }

    /// Node identity, stable for the lifetime of the node.
    pub fn ptr_id(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }

    pub fn id(&self) -> Option<Identifier> {
        self.read().id.clone()
    }

    /// Serialized form: `{"type", "namespace", "props": {.., "id", "children"}}`.
    /// Shared sub-trees are written out at every position; a cycle is an error.
    pub fn to_value(&self) -> Result<Value> {
        let mut ancestors = HashSet::new();
        self.to_value_inner(&mut ancestors)
    }

    fn to_value_inner(&self, ancestors: &mut HashSet<usize>) -> Result<Value> {
        if !ancestors.insert(self.ptr_id()) {
            return Err(NamespaceError::malformed(
                self.read().kind.clone(),
                "component tree contains a cycle",
            ));
        }

        let node = self.read();
        let mut props = node.props.clone();
        if let Some(id) = &node.id {
            props.insert("id".to_string(), id.to_value());
        }

        let child_value = |child: &Child, ancestors: &mut HashSet<usize>| match child {
            Child::Text(text) => Ok(Value::String(text.clone())),
            Child::Node(child) => child.to_value_inner(ancestors),
        };
        match &node.children {
            Children::None => {}
            Children::One(child) => {
                props.insert("children".to_string(), child_value(child, ancestors)?);
            }
            Children::Many(children) => {
                let values = children
                    .iter()
                    .map(|child| child_value(child, ancestors))
                    .collect::<Result<Vec<_>>>()?;
                props.insert("children".to_string(), Value::Array(values));
            }
        }

        let mut out = Map::new();
        out.insert("props".to_string(), Value::Object(props));
        out.insert("type".to_string(), Value::String(node.kind.clone()));
        out.insert("namespace".to_string(), Value::String(node.library.clone()));

        drop(node);
        ancestors.remove(&self.ptr_id());
        Ok(Value::Object(out))
    }

    pub fn from_value(value: &Value) -> Result<Self> {
        let malformed = |reason: &str| NamespaceError::malformed(value.to_string(), reason);

        let object = value
            .as_object()
            .ok_or_else(|| malformed("component must be an object"))?;
        let kind = object
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| malformed("component needs a string `type`"))?;
        let library = object
            .get("namespace")
            .and_then(Value::as_str)
            .unwrap_or(HTML_LIBRARY);

        let mut component = Component::new(library, kind);
        if let Some(props) = object.get("props") {
            let props = props
                .as_object()
                .ok_or_else(|| malformed("`props` must be an object"))?;
            for (key, prop) in props {
                match key.as_str() {
                    "id" if !prop.is_null() => component.id = Some(Identifier::from_value(prop)?),
                    "id" => {}
                    "children" => component.children = children_from_value(prop)?,
                    _ => {
                        component.props.insert(key.clone(), prop.clone());
                    }
                }
            }
        }
        Ok(component.into_ref())
    }
}

fn child_from_value(value: &Value) -> Result<Option<Child>> {
    match value {
        Value::Null => Ok(None),
        Value::String(text) => Ok(Some(Child::Text(text.clone()))),
        Value::Number(n) => Ok(Some(Child::Text(n.to_string()))),
        _ => ComponentRef::from_value(value).map(|node| Some(Child::Node(node))),
    }
}

fn children_from_value(value: &Value) -> Result<Children> {
    match value {
        Value::Array(items) => {
            let mut children = Vec::with_capacity(items.len());
            for item in items {
                if let Some(child) = child_from_value(item)? {
                    children.push(child);
                }
            }
            Ok(Children::Many(children))
        }
        other => Ok(child_from_value(other)?.map_or(Children::None, Children::One)),
    }
}

//! # Page Namespace Isolation
//!
//! Independently authored page modules reuse the same component ids
//! (`value`, `output`, `filter`). The host runtime keeps a single flat id
//! space, so every id a page declares is qualified with the page's namespace
//! before the runtime sees it and stripped again before page code sees it.
//!
//! ## Identifier Invariants
//!
//! 1. **Namespace Token**: A page module `pages.a.b.page` owns `pages_a_b`.
//!    Pages in one package share a namespace. Modules outside the pages root
//!    own none and their ids stay global.
//!
//! 2. **Wire Form**: A simple id `x` becomes `ns||x`. A structured id
//!    `{"type": "x", ..}` only has its `type` qualified; every other field
//!    (indexes, wildcards) is left untouched.
//!
//! 3. **Round Trip**: `decode(encode(ns, id)) == (Some(ns), id)` for any id
//!    that does not itself contain the separator.
//!
//! 4. **Host-Owned Ids**: `url`, `_pages_location`, `_pages_content`,
//!    `_pages_store` and `_pages_dummy` are never qualified.
//!
//! 5. **Registry Gating**: Layout and response rewriting only touch ids some
//!    binding declared (unless the policy is `unconditional`).
//!
//! 6. **Visit Once**: A shared sub-tree is namespaced exactly once per walk.
//!
//! ## Lifecycle
//!
//! Import (sequential page registration, bindings declared, layouts attached)
//! -> [`App::finish_import`] (layouts namespaced, table sealed) -> concurrent
//! [`Dispatcher::dispatch`] calls.

pub mod codec;
pub mod component;
pub mod config;
pub mod dependency;
pub mod discovery;
pub mod error;
pub mod identifier;
pub mod layout;
pub mod logging;
pub mod namespace;
pub mod pages;
pub mod props;
pub mod registry;
pub mod response;
pub mod runtime;
pub mod trigger;
pub mod visitor;

#[cfg(test)]
mod scenario_tests;

pub use codec::{IdentifierCodec, DEFAULT_SEPARATOR, HOST_OWNED_IDS};
pub use component::{Child, Children, Component, ComponentRef};
pub use config::{IsolationConfig, RewritePolicy};
pub use dependency::{Dependency, DependencyKind, DependencyRegistrar};
pub use discovery::{discover_pages, PageManifest};
pub use error::{NamespaceError, Result};
pub use identifier::{Identifier, StructuredId, Wildcard};
pub use layout::{LayoutNamespacer, LayoutReport};
pub use namespace::{ModuleFrame, Namespace, ResolutionContext};
pub use pages::{App, PageInfo, PageScope};
pub use props::PropSetter;
pub use registry::NamespaceRegistry;
pub use response::{Patch, ResponseRewriter};
pub use runtime::{
    CallbackContext, CallbackError, CallbackSpec, Dispatcher, Invocation, InvocationValue,
    NamespaceHooks, RuntimeHooks,
};
pub use trigger::{TriggerContext, TriggerTranslator, TriggeredInput};

//! Page table and the import phase.
//!
//! Pages register one after another. Each registration hands out a
//! [`PageScope`] that carries the page's namespace explicitly, so every
//! binding declared through it is namespaced without looking at who called.
//! [`App::finish_import`] then namespaces every layout and seals the table.

use rayon::prelude::*;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::codec::IdentifierCodec;
use crate::component::ComponentRef;
use crate::config::IsolationConfig;
use crate::dependency::{Dependency, DependencyKind, DependencyRegistrar};
use crate::discovery::PageManifest;
use crate::error::{NamespaceError, Result};
use crate::identifier::Identifier;
use crate::layout::LayoutNamespacer;
use crate::namespace::{is_module_path, is_under_root, package_of, Namespace, ResolutionContext};
use crate::registry::NamespaceRegistry;
use crate::response::ResponseRewriter;
use crate::runtime::{CallbackContext, CallbackError, CallbackSpec, Dispatcher, NamespaceHooks, RuntimeHooks};
use crate::trigger::TriggerTranslator;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageInfo {
    pub module: String,
    pub path: String,
    pub name: String,
    pub namespace: Option<Namespace>,
}

#[derive(Debug, Clone)]
pub struct PageEntry {
    pub info: PageInfo,
    pub layout: Option<ComponentRef>,
}

pub struct App {
    config: IsolationConfig,
    codec: Arc<IdentifierCodec>,
    registry: Arc<NamespaceRegistry>,
    registrar: DependencyRegistrar,
    dispatcher: Dispatcher,
    pages: Vec<PageEntry>,
    /// Namespace token -> package that claimed it first.
    owners: HashMap<Namespace, String>,
    sealed: bool,
}

impl App {
    pub fn new(config: IsolationConfig) -> Result<Self> {
        config.validate()?;
        let codec = Arc::new(IdentifierCodec::from_config(&config)?);
        let registry = Arc::new(NamespaceRegistry::new());
        let registrar = DependencyRegistrar::new(
            Arc::clone(&codec),
            Arc::clone(&registry),
            config.pages_root.clone(),
        );

        let hooks = NamespaceHooks {
            registrar: registrar.clone(),
            layout: LayoutNamespacer::new(Arc::clone(&codec), Arc::clone(&registry), config.policy),
            trigger: TriggerTranslator::new(Arc::clone(&codec)),
            response: ResponseRewriter::new(Arc::clone(&codec), Arc::clone(&registry), config.policy),
        };
        let mut dispatcher = Dispatcher::new(Arc::clone(&codec));
        dispatcher.add_hooks(Arc::new(hooks));

        Ok(Self {
            config,
            codec,
            registry,
            registrar,
            dispatcher,
            pages: Vec::new(),
            owners: HashMap::new(),
            sealed: false,
        })
    }

    pub fn config(&self) -> &IsolationConfig {
        &self.config
    }

    pub fn codec(&self) -> &Arc<IdentifierCodec> {
        &self.codec
    }

    pub fn registry(&self) -> &Arc<NamespaceRegistry> {
        &self.registry
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Registers an additional hook set, run after namespace isolation.
    pub fn add_hooks(&mut self, hooks: Arc<dyn RuntimeHooks>) {
        self.dispatcher.add_hooks(hooks);
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub fn register_page(&mut self, module: &str, path: &str, name: &str) -> Result<PageScope<'_>> {
        if self.sealed {
            return Err(NamespaceError::ImportSealed(module.to_string()));
        }
        if !is_module_path(module) {
            return Err(NamespaceError::InvalidModule(module.to_string()));
        }

        let namespace = if is_under_root(module, &self.config.pages_root) {
            Namespace::from_module_path(module)
        } else {
            None
        };

        if let Some(ns) = &namespace {
            let package = package_of(module);
            match self.owners.get(ns) {
                Some(owner) if owner != package => {
                    return Err(NamespaceError::NamespaceCollision {
                        namespace: ns.to_string(),
                        first: owner.clone(),
                        second: package.to_string(),
                    });
                }
                Some(_) => {}
                None => {
                    self.owners.insert(ns.clone(), package.to_string());
                }
            }
        } else {
            warn!(module, "page registered outside the pages root; ids stay global");
        }

        info!(module, path, namespace = ?namespace.as_ref().map(Namespace::as_str), "registered page");
        self.pages.push(PageEntry {
            info: PageInfo {
                module: module.to_string(),
                path: path.to_string(),
                name: name.to_string(),
                namespace,
            },
            layout: None,
        });
        let index = self.pages.len() - 1;
        Ok(PageScope { app: self, index })
    }

    /// Declares a binding on behalf of the innermost page module on `ctx`.
    /// Used for code that is not registered through a [`PageScope`].
    pub fn binding_in(
        &self,
        ctx: &ResolutionContext,
        kind: DependencyKind,
        id: impl Into<Identifier>,
        property: &str,
    ) -> Result<Dependency> {
        self.registrar.binding_in(ctx, kind, id.into(), property)
    }

    pub fn import_manifests(&mut self, manifests: Vec<PageManifest>) -> Result<()> {
        for manifest in manifests {
            let mut scope = self.register_page(
                &manifest.module,
                &manifest.path,
                manifest.name.as_deref().unwrap_or(&manifest.module),
            )?;
            for binding in manifest.bindings {
                scope.bind(binding.kind, binding.id, &binding.property)?;
            }
            if let Some(layout) = &manifest.layout {
                scope.set_layout(ComponentRef::from_value(layout)?);
            }
        }
        Ok(())
    }

    /// Ends the import phase: every page's bindings are declared, so each
    /// layout is namespaced once and the page table is sealed.
    pub fn finish_import(&mut self) -> Result<()> {
        if self.sealed {
            return Ok(());
        }

        let hooks = self.dispatcher.hooks();
        self.pages
            .par_iter()
            .filter_map(|page| match (&page.info.namespace, &page.layout) {
                (Some(namespace), Some(layout)) => Some((namespace, layout)),
                _ => None,
            })
            .try_for_each(|(namespace, layout)| {
                hooks
                    .iter()
                    .try_for_each(|hook| hook.after_layout(namespace, layout))
            })?;

        self.sealed = true;
        info!(
            pages = self.pages.len(),
            keys = self.registry.len(),
            callbacks = self.dispatcher.callback_keys().len(),
            "import finished"
        );
        Ok(())
    }

    pub fn page_registry(&self) -> Vec<PageInfo> {
        self.pages.iter().map(|page| page.info.clone()).collect()
    }

    pub fn page(&self, path: &str) -> Option<&PageEntry> {
        self.pages.iter().find(|page| page.info.path == path)
    }

    /// Serialized layout of the page served at `path`.
    pub fn layout_value(&self, path: &str) -> Result<Option<Value>> {
        match self.page(path).and_then(|page| page.layout.as_ref()) {
            Some(layout) => layout.to_value().map(Some),
            None => Ok(None),
        }
    }
}

/// Registration handle of one page module.
pub struct PageScope<'a> {
    app: &'a mut App,
    index: usize,
}

impl PageScope<'_> {
    pub fn namespace(&self) -> Option<&Namespace> {
        self.app.pages[self.index].info.namespace.as_ref()
    }

    pub fn bind(&mut self, kind: DependencyKind, id: impl Into<Identifier>, property: &str) -> Result<Dependency> {
        let namespace = self.app.pages[self.index].info.namespace.clone();
        self.app
            .dispatcher
            .bind(namespace.as_ref(), Dependency::new(kind, id, property))
    }

    pub fn input(&mut self, id: impl Into<Identifier>, property: &str) -> Result<Dependency> {
        self.bind(DependencyKind::Input, id, property)
    }

    pub fn output(&mut self, id: impl Into<Identifier>, property: &str) -> Result<Dependency> {
        self.bind(DependencyKind::Output, id, property)
    }

    pub fn state(&mut self, id: impl Into<Identifier>, property: &str) -> Result<Dependency> {
        self.bind(DependencyKind::State, id, property)
    }

    /// Registers a callback over already declared bindings and returns the
    /// output key the runtime will address it by.
    pub fn callback<F>(
        &mut self,
        outputs: Vec<Dependency>,
        inputs: Vec<Dependency>,
        states: Vec<Dependency>,
        handler: F,
    ) -> Result<String>
    where
        F: Fn(&CallbackContext<'_>, &[Value]) -> std::result::Result<Vec<Value>, CallbackError>
            + Send
            + Sync
            + 'static,
    {
        let namespace = self.namespace().cloned();
        self.app.dispatcher.register(CallbackSpec {
            namespace,
            outputs,
            inputs,
            states,
            handler: Arc::new(handler),
        })
    }

    pub fn set_layout(&mut self, layout: ComponentRef) {
        self.app.pages[self.index].layout = Some(layout);
    }
}

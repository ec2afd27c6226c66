//! Namespace tokens and their resolution from module paths.
//!
//! A page module `pages.analytics.page1` owns the namespace `pages_analytics`:
//! the final path segment is the module itself, every page in the same package
//! shares the package's namespace, and the dots are flattened to `_` so the
//! token never contains the separator.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

use crate::error::{NamespaceError, Result};

lazy_static! {
    static ref NAMESPACE_TOKEN_RE: Regex = Regex::new(r"^[A-Za-z0-9_\-]+$").unwrap();
    static ref MODULE_PATH_RE: Regex =
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_\-]*(\.[A-Za-z_][A-Za-z0-9_\-]*)*$").unwrap();
}

/// Packages that belong to the host runtime itself.
pub const NO_NAMESPACE_PACKAGES: &[&str] = &["", "."];

pub fn is_module_path(path: &str) -> bool {
    MODULE_PATH_RE.is_match(path)
}

/// Returns true when `module` is `root` itself or lives below it.
pub fn is_under_root(module: &str, root: &str) -> bool {
    module == root
        || module
            .strip_prefix(root)
            .is_some_and(|rest| rest.starts_with('.'))
}

/// Package part of a dotted module path (`a.b.c` -> `a.b`, `a` -> ``).
pub fn package_of(module: &str) -> &str {
    module.rsplit_once('.').map_or("", |(package, _)| package)
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Namespace(String);

impl Namespace {
    pub fn new(token: impl Into<String>) -> Result<Self> {
        let token = token.into();
        if NAMESPACE_TOKEN_RE.is_match(&token) {
            Ok(Namespace(token))
        } else {
            Err(NamespaceError::InvalidNamespace(token))
        }
    }

    /// Flattens a package path into a namespace. The reserved packages and
    /// anything that does not flatten to a legal token yield `None`.
    pub fn from_package(package: &str) -> Option<Self> {
        if NO_NAMESPACE_PACKAGES.contains(&package) {
            return None;
        }
        match Namespace::new(package.replace('.', "_")) {
            Ok(namespace) => Some(namespace),
            Err(err) => {
                warn!(package, code = err.code(), "package does not flatten to a namespace token; ids stay global");
                None
            }
        }
    }

    pub fn from_module_path(module: &str) -> Option<Self> {
        Namespace::from_package(package_of(module))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Namespace {
    type Error = NamespaceError;

    fn try_from(value: String) -> Result<Self> {
        Namespace::new(value)
    }
}

impl From<Namespace> for String {
    fn from(ns: Namespace) -> Self {
        ns.0
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RESOLUTION CONTEXT
// ═══════════════════════════════════════════════════════════════════════════════

/// One module on the import chain. `name` is unset while the module is still
/// initializing; `package` is known earlier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleFrame {
    pub name: Option<String>,
    pub package: Option<String>,
}

impl ModuleFrame {
    pub fn module(name: impl Into<String>) -> Self {
        let name = name.into();
        let package = package_of(&name).to_string();
        Self {
            name: Some(name),
            package: Some(package),
        }
    }

    pub fn initializing(package: impl Into<String>) -> Self {
        Self {
            name: None,
            package: Some(package.into()),
        }
    }
}

/// Explicit chain of modules currently being imported, innermost last.
///
/// The importer pushes a frame around each module load; binding declarations
/// made while the frame is active resolve against it.
#[derive(Debug, Clone, Default)]
pub struct ResolutionContext {
    frames: Vec<ModuleFrame>,
}

impl ResolutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Runs `f` with `frame` pushed on the chain and pops it afterwards.
    pub fn scoped<R>(&mut self, frame: ModuleFrame, f: impl FnOnce(&mut Self) -> R) -> R {
        self.frames.push(frame);
        let result = f(self);
        self.frames.pop();
        result
    }

    /// Namespace of the nearest enclosing page module, or `None` when the
    /// declaration comes from outside `pages_root` (host-internal code).
    pub fn resolve(&self, pages_root: &str) -> Option<Namespace> {
        for frame in self.frames.iter().rev() {
            let package = match (&frame.name, &frame.package) {
                (Some(name), _) if is_under_root(name, pages_root) => package_of(name),
                (None, Some(package)) if is_under_root(package, pages_root) => package.as_str(),
                _ => continue,
            };
            return Namespace::from_package(package);
        }
        None
    }
}

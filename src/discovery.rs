//! Page manifest discovery.
//!
//! Recursively scans a pages directory for `*.page.json` manifests and turns
//! each into a [`PageManifest`] whose module path mirrors the file's location:
//! `<dir>/analytics/page1.page.json` under root `pages` is `pages.analytics.page1`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

use crate::dependency::Dependency;
use crate::error::{NamespaceError, Result};

// ═══════════════════════════════════════════════════════════════════════════════
// MANIFEST TYPES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageManifest {
    /// Derived from the file location, never read from the manifest body.
    #[serde(skip)]
    pub module: String,
    pub path: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub layout: Option<Value>,
    #[serde(default)]
    pub bindings: Vec<Dependency>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// DISCOVERY
// ═══════════════════════════════════════════════════════════════════════════════

/// Discovers every manifest below `pages_dir`, sorted by module path so the
/// import order does not depend on directory iteration order.
pub fn discover_pages(pages_dir: &Path, pages_root: &str, suffix: &str) -> Result<Vec<PageManifest>> {
    if !pages_dir.is_dir() {
        return Err(NamespaceError::Io {
            path: pages_dir.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "pages directory not found"),
        });
    }

    let mut manifests = Vec::new();
    for file_path in find_manifests(pages_dir, suffix)? {
        let module = module_path_for(pages_dir, &file_path, pages_root, suffix)?;
        let mut manifest = parse_manifest(&file_path)?;
        manifest.module = module;
        debug!(module = %manifest.module, path = %manifest.path, "discovered page");
        manifests.push(manifest);
    }

    manifests.sort_by(|a, b| a.module.cmp(&b.module));
    Ok(manifests)
}

fn find_manifests(dir: &Path, suffix: &str) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).follow_links(true) {
        let entry = entry.map_err(|e| NamespaceError::Io {
            path: e.path().map_or_else(|| dir.to_path_buf(), Path::to_path_buf),
            source: e
                .into_io_error()
                .unwrap_or_else(|| std::io::Error::other("filesystem loop")),
        })?;
        let path = entry.path();
        let is_manifest = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.ends_with(suffix) && name.len() > suffix.len());
        if path.is_file() && is_manifest {
            files.push(path.to_path_buf());
        }
    }
    Ok(files)
}

/// Module path of a manifest: the pages root followed by every directory
/// below `pages_dir` and the file stem.
fn module_path_for(pages_dir: &Path, file_path: &Path, pages_root: &str, suffix: &str) -> Result<String> {
    let manifest_error = |message: &str| NamespaceError::Manifest {
        path: file_path.to_path_buf(),
        message: message.to_string(),
    };

    let relative = file_path
        .strip_prefix(pages_dir)
        .map_err(|_| manifest_error("manifest lies outside the pages directory"))?;

    let mut segments = vec![pages_root.to_string()];
    for component in relative.components() {
        let segment = component
            .as_os_str()
            .to_str()
            .ok_or_else(|| manifest_error("path is not valid UTF-8"))?;
        segments.push(segment.strip_suffix(suffix).unwrap_or(segment).to_string());
    }
    Ok(segments.join("."))
}

fn parse_manifest(file_path: &Path) -> Result<PageManifest> {
    let source = fs::read_to_string(file_path).map_err(|e| NamespaceError::Io {
        path: file_path.to_path_buf(),
        source: e,
    })?;
    serde_json::from_str(&source).map_err(|e| NamespaceError::Manifest {
        path: file_path.to_path_buf(),
        message: e.to_string(),
    })
}

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::codec::DEFAULT_SEPARATOR;
use crate::error::{NamespaceError, Result};
use crate::namespace::is_module_path;

/// Characters that may never appear in the namespace separator: JSON
/// structure, the `prop_id` property delimiter, and anything legal inside a
/// namespace token.
const FORBIDDEN_SEPARATOR_CHARS: &[char] = &['{', '}', '[', ']', ':', ',', '"', '.'];

/// Which layout nodes and response ids get rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RewritePolicy {
    /// Only identifiers whose key was recorded at binding declaration.
    #[default]
    Registered,
    /// Every identifier except host-owned ones.
    Unconditional,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IsolationConfig {
    /// Module path prefix under which page modules live.
    pub pages_root: String,
    pub separator: String,
    /// Host-owned simple identifiers that are never namespaced.
    pub skip_ids: Vec<String>,
    pub policy: RewritePolicy,
    /// File suffix of page manifests picked up by discovery.
    pub manifest_suffix: String,
}

impl Default for IsolationConfig {
    fn default() -> Self {
        Self {
            pages_root: "pages".to_string(),
            separator: DEFAULT_SEPARATOR.to_string(),
            skip_ids: crate::codec::HOST_OWNED_IDS
                .iter()
                .map(|id| id.to_string())
                .collect(),
            policy: RewritePolicy::default(),
            manifest_suffix: ".page.json".to_string(),
        }
    }
}

impl IsolationConfig {
    pub fn from_json_str(source: &str) -> Result<Self> {
        let config: IsolationConfig =
            serde_json::from_str(source).map_err(|e| NamespaceError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let source = fs::read_to_string(path).map_err(|source| NamespaceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&source)
    }

    pub fn validate(&self) -> Result<()> {
        validate_separator(&self.separator)?;

        if !is_module_path(&self.pages_root) {
            return Err(NamespaceError::Config(format!(
                "pagesRoot `{}` is not a dotted module path",
                self.pages_root
            )));
        }

        if let Some(id) = self.skip_ids.iter().find(|id| id.contains(&self.separator)) {
            return Err(NamespaceError::Config(format!(
                "skip id `{}` contains the separator `{}`",
                id, self.separator
            )));
        }

        if self.manifest_suffix.is_empty() {
            return Err(NamespaceError::Config(
                "manifestSuffix must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

pub fn validate_separator(separator: &str) -> Result<()> {
    let invalid = |reason: &str| NamespaceError::InvalidSeparator {
        separator: separator.to_string(),
        reason: reason.to_string(),
    };

    if separator.chars().count() != 2 {
        return Err(invalid("must be exactly two characters"));
    }
    for c in separator.chars() {
        if FORBIDDEN_SEPARATOR_CHARS.contains(&c) {
            return Err(invalid("must not reuse JSON structural characters or `.`"));
        }
        if c.is_whitespace() || c.is_alphanumeric() || c == '_' || c == '-' {
            return Err(invalid("must not contain characters legal in identifiers"));
        }
    }
    Ok(())
}

use std::path::PathBuf;

use thiserror::Error;

// ═══════════════════════════════════════════════════════════════════════════════
// ERROR CODES
// ═══════════════════════════════════════════════════════════════════════════════

pub const ERR_MALFORMED_IDENTIFIER: &str = "NS-ERR-ID-001";
pub const ERR_SEPARATOR_IN_LOCAL_ID: &str = "NS-ERR-ID-002";
pub const ERR_INVALID_NAMESPACE: &str = "NS-ERR-NS-001";
pub const ERR_NAMESPACE_COLLISION: &str = "NS-ERR-NS-002";
pub const ERR_INVALID_MODULE: &str = "NS-ERR-NS-003";
pub const ERR_INVALID_SEPARATOR: &str = "NS-ERR-SEP-001";
pub const ERR_IMPORT_SEALED: &str = "NS-ERR-IMPORT-001";
pub const ERR_UNKNOWN_CALLBACK: &str = "NS-ERR-DISPATCH-001";
pub const ERR_CALLBACK: &str = "NS-ERR-DISPATCH-002";
pub const ERR_DUPLICATE_CALLBACK: &str = "NS-ERR-DISPATCH-003";
pub const ERR_CONFIG: &str = "NS-ERR-CONFIG-001";
pub const ERR_IO: &str = "NS-ERR-IO-001";
pub const ERR_MANIFEST: &str = "NS-ERR-MANIFEST-001";

pub type Result<T> = std::result::Result<T, NamespaceError>;

/// Errors produced while namespacing identifiers, importing pages or
/// dispatching invocations.
#[derive(Debug, Error)]
pub enum NamespaceError {
    /// An identifier had the wrong shape (not a string, missing `type`,
    /// unparseable wire text).
    #[error("malformed identifier `{found}`: {reason}")]
    MalformedIdentifier { found: String, reason: String },

    /// A local value already carries the separator. Either the author used a
    /// reserved token or the identifier was encoded twice.
    #[error("local identifier `{id}` contains the reserved separator `{separator}`")]
    SeparatorInLocalId { id: String, separator: String },

    #[error("invalid namespace token `{0}`")]
    InvalidNamespace(String),

    /// Two distinct page packages flatten to the same namespace token.
    #[error("namespace `{namespace}` is claimed by both `{first}` and `{second}`")]
    NamespaceCollision {
        namespace: String,
        first: String,
        second: String,
    },

    #[error("`{0}` is not a dotted module path")]
    InvalidModule(String),

    #[error("invalid separator `{separator}`: {reason}")]
    InvalidSeparator { separator: String, reason: String },

    #[error("cannot register `{0}`: the import phase has finished")]
    ImportSealed(String),

    #[error("no callback registered for output `{0}`")]
    UnknownCallback(String),

    #[error("output `{0}` already has a callback")]
    DuplicateCallback(String),

    #[error("callback for `{output}` failed: {message}")]
    Callback { output: String, message: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to read `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid page manifest `{path}`: {message}")]
    Manifest { path: PathBuf, message: String },
}

impl NamespaceError {
    pub fn malformed(found: impl Into<String>, reason: impl Into<String>) -> Self {
        NamespaceError::MalformedIdentifier {
            found: found.into(),
            reason: reason.into(),
        }
    }

    /// Stable code for the error, suitable for log correlation.
    pub fn code(&self) -> &'static str {
        match self {
            NamespaceError::MalformedIdentifier { .. } => ERR_MALFORMED_IDENTIFIER,
            NamespaceError::SeparatorInLocalId { .. } => ERR_SEPARATOR_IN_LOCAL_ID,
            NamespaceError::InvalidNamespace(_) => ERR_INVALID_NAMESPACE,
            NamespaceError::NamespaceCollision { .. } => ERR_NAMESPACE_COLLISION,
            NamespaceError::InvalidModule(_) => ERR_INVALID_MODULE,
            NamespaceError::InvalidSeparator { .. } => ERR_INVALID_SEPARATOR,
            NamespaceError::ImportSealed(_) => ERR_IMPORT_SEALED,
            NamespaceError::UnknownCallback(_) => ERR_UNKNOWN_CALLBACK,
            NamespaceError::DuplicateCallback(_) => ERR_DUPLICATE_CALLBACK,
            NamespaceError::Callback { .. } => ERR_CALLBACK,
            NamespaceError::Config(_) => ERR_CONFIG,
            NamespaceError::Io { .. } => ERR_IO,
            NamespaceError::Manifest { .. } => ERR_MANIFEST,
        }
    }
}

//! Error types for pea_mirror
//!
//! Each phase of a mirror session has its own error enum. Only resolution and
//! catalog-level failures abort a session; everything else is reported per item
//! and the session carries on.

use std::path::PathBuf;
use thiserror::Error;

/// Bootstrap resolution errors (always fatal)
#[derive(Error, Debug)]
pub enum ResolveError {
    /// The bootstrap document could not be downloaded
    #[error("Could not download bootstrap document {name}: {source}")]
    BootstrapUnavailable {
        name: String,
        #[source]
        source: DownloadError,
    },

    /// The bootstrap document was downloaded but could not be read back
    #[error("Could not read bootstrap document {path}")]
    BootstrapUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A required dynamic path pattern had no match in the bootstrap document
    #[error("Required dynamic path '{name}' not found in bootstrap document")]
    MissingDynamicPath { name: &'static str },

    /// Invalid remote URL built from the configured origin
    #[error("Invalid URL for {path}: {error}")]
    InvalidUrl { path: String, error: String },
}

/// Download and HTTP transport errors
#[derive(Error, Debug)]
pub enum DownloadError {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O error during file operations
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Download timeout
    #[error("Download timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    /// Invalid URL provided
    #[error("Invalid URL: {url} - {error}")]
    InvalidUrl { url: String, error: String },

    /// Server returned a non-200 status
    #[error("HTTP Status {status}")]
    ServerError { status: u16 },

    /// Atomic file operation failed
    #[error("Atomic file operation failed: could not rename {temp_path} to {final_path}")]
    AtomicOperationFailed {
        temp_path: PathBuf,
        final_path: PathBuf,
    },

    /// Worker task panicked or was cancelled before reporting
    #[error("Download task for {name} did not complete: {reason}")]
    TaskFailed { name: String, reason: String },

    /// Invalid downloader configuration
    #[error("Invalid downloader configuration: {0}")]
    Configuration(String),

    /// Generic error for other issues
    #[error("{0}")]
    Other(String),
}

/// Font catalog (database file) errors
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Database file could not be read
    #[error("Could not read database file {path}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No declaration in the database file could be parsed
    #[error("No declarations could be parsed from {path}")]
    Empty { path: PathBuf },

    /// A declaration body is not valid structured data
    #[error("Declaration '{name}' is not valid structured data: {source}")]
    InvalidDeclaration {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    /// A declaration's opening brace is never closed
    #[error("Declaration '{name}' has an unbalanced body")]
    UnbalancedDeclaration { name: String },

    /// The font list is missing or has the wrong shape
    #[error("Font list '{name}' not found or malformed")]
    MissingFontList { name: String },

    /// A compact font entry does not have six comma-separated fields
    #[error("Compact font entry #{index} has {fields} fields, expected 6: {entry}")]
    MalformedEntry {
        index: usize,
        fields: usize,
        entry: String,
    },

    /// A numeric field could not be parsed
    #[error("Compact font entry #{index} has a non-integer {field}: {value}")]
    InvalidNumber {
        index: usize,
        field: &'static str,
        value: String,
    },

    /// Font manifest could not be serialised or written
    #[error("Could not write font manifest {path}: {reason}")]
    ManifestWrite { path: PathBuf, reason: String },
}

/// Patch application errors (always soft)
#[derive(Error, Debug)]
pub enum PatchError {
    /// Target file does not exist
    #[error("Could not find {path} to patch it")]
    TargetMissing { path: PathBuf },

    /// Target file exists but could not be read or written
    #[error("Error patching {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The rule targets a dynamic path that was not resolved
    #[error("Patch target '{target}' was not resolved for this session")]
    UnresolvedTarget { target: String },
}

/// Template manifest and reconcile errors
#[derive(Error, Debug)]
pub enum TemplateError {
    /// Template manifest could not be read
    #[error("Could not read template manifest {path}: {source}")]
    ManifestUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Template manifest is not valid JSON or lacks a list
    #[error("Could not parse template manifest: {reason}")]
    ManifestInvalid { reason: String },

    /// A local template file could not be removed
    #[error("Error removing {path}: {source}")]
    RemoveFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Template root could not be enumerated
    #[error("Could not enumerate template directory {path}: {source}")]
    ScanFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    NotFound { path: PathBuf },

    /// Invalid configuration format
    #[error("Invalid configuration format in {path}: {source}")]
    InvalidFormat {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Invalid configuration value
    #[error("Invalid configuration value for {field}: {value}. {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    /// User config directory could not be determined
    #[error("Could not determine user config directory")]
    NoConfigDir,

    /// Configuration file could not be read or written
    #[error("Configuration file I/O error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Top-level application error that can represent any error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Bootstrap resolution error
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// Download error
    #[error(transparent)]
    Download(#[from] DownloadError),

    /// Catalog error
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Patch error
    #[error(transparent)]
    Patch(#[from] PatchError),

    /// Template error
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Generic I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Generic application error with context
    #[error("Application error: {message}")]
    Generic { message: String },
}

impl AppError {
    /// Create a generic application error with a message
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Whether this error aborts the whole session
    ///
    /// Resolution failures and an unreadable or empty database are fatal.
    /// Per-item download, patch and template failures never are.
    pub fn is_fatal(&self) -> bool {
        match self {
            AppError::Resolve(_) => true,
            AppError::Catalog(CatalogError::Unreadable { .. })
            | AppError::Catalog(CatalogError::Empty { .. }) => true,
            AppError::Config(_) => true,
            AppError::Download(_)
            | AppError::Catalog(_)
            | AppError::Patch(_)
            | AppError::Template(_) => false,
            AppError::Io(_) | AppError::Generic { .. } => true,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Resolve(_) => "resolve",
            AppError::Download(_) => "download",
            AppError::Catalog(_) => "catalog",
            AppError::Patch(_) => "patch",
            AppError::Template(_) => "template",
            AppError::Config(_) => "config",
            AppError::Io(_) => "io",
            AppError::Generic { .. } => "generic",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

/// Resolution result type alias
pub type ResolveResult<T> = std::result::Result<T, ResolveError>;

/// Download result type alias
pub type DownloadResult<T> = std::result::Result<T, DownloadError>;

/// Catalog result type alias
pub type CatalogResult<T> = std::result::Result<T, CatalogError>;

/// Patch result type alias
pub type PatchResult<T> = std::result::Result<T, PatchError>;

/// Template result type alias
pub type TemplateResult<T> = std::result::Result<T, TemplateError>;

/// Configuration result type alias
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_errors_are_fatal() {
        let error = AppError::from(ResolveError::MissingDynamicPath { name: "database" });
        assert!(error.is_fatal());
        assert_eq!(error.category(), "resolve");
        assert!(error.to_string().contains("database"));
    }

    #[test]
    fn test_item_errors_are_not_fatal() {
        let download = AppError::from(DownloadError::ServerError { status: 404 });
        assert!(!download.is_fatal());
        assert_eq!(download.to_string(), "HTTP Status 404");

        let patch = AppError::from(PatchError::TargetMissing {
            path: PathBuf::from("index.html"),
        });
        assert!(!patch.is_fatal());
        assert_eq!(patch.category(), "patch");
    }

    #[test]
    fn test_catalog_fatality_depends_on_variant() {
        let empty = AppError::from(CatalogError::Empty {
            path: PathBuf::from("code/dbs/DBS7.js"),
        });
        assert!(empty.is_fatal());

        let missing_list = AppError::from(CatalogError::MissingFontList {
            name: "FNTS".to_string(),
        });
        assert!(!missing_list.is_fatal());
    }
}

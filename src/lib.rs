//! pea_mirror library
//!
//! Keeps a local, offline-usable mirror of a browser-based image editor.
//! Each run re-downloads the version-stamped application files, decodes the
//! font catalog, patches the mirror for offline use and optionally syncs
//! fonts and templates.

pub mod app;
pub mod cli;
pub mod config;
pub mod constants;
pub mod errors;
pub mod prelude;

// Re-export commonly used types for convenience
pub use errors::{AppError, Result};

#[cfg(test)]
mod tests {
    use super::*;
    use constants::*;

    #[test]
    fn test_constants_accessible() {
        assert_eq!(DEFAULT_FONT_WORKERS, 16);
        assert_eq!(ENV_LOCAL_ROOT, "PEA_MIRROR_ROOT");
        assert!(USER_AGENT.starts_with("pea-mirror"));
    }

    #[test]
    fn test_error_types() {
        let error = errors::CatalogError::Empty {
            path: "code/dbs/DBS7.js".into(),
        };
        let app_error = AppError::Catalog(error);

        assert_eq!(app_error.category(), "catalog");
        assert!(app_error.is_fatal());
    }
}

//! Core application logic for pea_mirror
//!
//! This module contains the mirror components: the transport and
//! downloader, the asset resolver, the font catalog decoder, the patch
//! engine, the template reconciler and the session that runs them in order.
//!
//! # Examples
//!
//! ```rust,no_run
//! use pea_mirror::app::CatalogDatabase;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = CatalogDatabase::decode(r#"var FNTS = {"list": ["Arial,Bold,,1,2,"]};"#);
//! for font in db.font_catalog()?.fonts() {
//!     println!("{} -> {}", font.post_script_name, font.source_path);
//! }
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod client;
pub mod coordinator;
pub mod fonts;
pub mod models;
pub mod patch;
pub mod progress;
pub mod resolver;
pub mod templates;
pub mod worker;

// Re-export main public API
pub use catalog::{CatalogDatabase, FontCatalog, FontRecord};
pub use client::{ClientConfig, Downloader, HttpHandler, Transport};
pub use coordinator::{MirrorSession, SessionConfig, SessionResult};
pub use fonts::FontMirror;
pub use models::{AssetRef, BatchReport};
pub use patch::{PatchReport, PatchRule};
pub use progress::ProgressReporter;
pub use resolver::{AssetResolver, DynamicAsset, DynamicPathSet};
pub use templates::{TemplateConfig, TemplateReconciler};
pub use worker::{WorkerConfig, WorkerPool};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_structure() {
        let config = ClientConfig::default();
        assert!(config.tcp_nodelay);
        assert_eq!(DynamicAsset::ALL.len(), 4);
        assert!(!ProgressReporter::hidden().is_visible());
    }
}

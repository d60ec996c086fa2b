//! Application constants for pea_mirror
//!
//! This module centralizes all constants used throughout the application,
//! organized by functional domain.

use std::time::Duration;

/// Environment variable names for configuration overrides
pub mod env {
    /// Overrides the local mirror root
    pub const LOCAL_ROOT: &str = "PEA_MIRROR_ROOT";

    /// Overrides the remote origin
    pub const REMOTE_BASE: &str = "PEA_MIRROR_REMOTE";
}

/// Remote origin and local mirror layout
pub mod origin {
    /// Remote website every asset is mirrored from
    pub const REMOTE_BASE: &str = "https://photopea.com/";

    /// Default local mirror root
    pub const LOCAL_ROOT: &str = "www.photopea.com/";

    /// Bootstrap document scanned for dynamic paths
    pub const BOOTSTRAP_DOCUMENT: &str = "index.html";

    /// Core files fetched on every run as (remote path, local path)
    pub const CORE_FILES: &[(&str, &str)] = &[
        ("manifest.json", "manifest.json"),
        ("promo/thumb256.png", "promo/thumb256.png"),
        ("rsrc/basic/basic.zip", "rsrc/basic/basic.zip"),
        ("code/ext/hb.wasm", "code/ext/hb.wasm"),
        ("code/ext/fribidi.wasm", "code/ext/fribidi.wasm"),
        ("papi/tpls.json", "papi/tpls.json"),
        ("rsrc/fonts/fonts.png", "rsrc/fonts/fonts.png"),
        (
            "code/storages/deviceStorage.html",
            "code/storages/deviceStorage.html",
        ),
        (
            "code/storages/googledriveStorage.html",
            "code/storages/googledriveStorage.html",
        ),
        (
            "code/storages/dropboxStorage.html",
            "code/storages/dropboxStorage.html",
        ),
        ("img/nft.png", "img/nft.png"),
        ("templates/?type=0&rsrc=", "templates/index.html"),
        ("templates/templates.js", "templates/templates.js"),
        ("templates/templates.css", "templates/templates.css"),
        ("plugins/gallery.json", "plugins/gallery.json"),
        ("plugins/gallery.html", "plugins/gallery.html"),
        ("img/wows_logo.png", "img/wows_logo.png"),
        ("promo/icon512.png", "promo/icon512.png"),
    ];
}

/// Patterns for version-stamped file names in the bootstrap document
pub mod patterns {
    /// Style sheet bundle
    pub const STYLE: &str = r"style/all(\d+)\.css";

    /// Extension bundle
    pub const EXTENSION: &str = r"code/ext/ext(\d+)\.js";

    /// Database bundle (holds the font catalog)
    pub const DATABASE: &str = r"code/dbs/DBS(\d+)\.js";

    /// Application logic bundle
    pub const APP_LOGIC: &str = r"code/pp/pp(\d+)\.js";
}

/// Font catalog layout
pub mod fonts {
    /// Database variable holding the compact font list
    pub const CATALOG_VARIABLE: &str = "FNTS";

    /// Field of the catalog variable holding the compact entries
    pub const LIST_FIELD: &str = "list";

    /// Remote and local directory all font files live under
    pub const FONT_DIR: &str = "rsrc/fonts/";

    /// Prefix for fonts hosted with the application
    pub const LOCAL_FONT_PREFIX: &str = "fs/";

    /// Prefix for web fonts
    pub const WEB_FONT_PREFIX: &str = "gf/";

    /// Font file extension
    pub const FONT_EXTENSION: &str = ".otf";

    /// Sentinel selecting the alternate derivation of a field
    pub const SENTINEL: &str = "a";

    /// Generated manifest file name, relative to the mirror root
    pub const MANIFEST_FILE: &str = "font-manifest.json";

    /// PostScript name of the default font family
    pub const DEFAULT_FAMILY: &str = "DejaVuSans";
}

/// Template bucket layout
pub mod templates {
    /// Template manifest, relative to the mirror root
    pub const MANIFEST_PATH: &str = "papi/tpls.json";

    /// Remote storage all template buckets live under
    pub const BUCKET_BASE: &str = "https://f000.backblazeb2.com/file/";

    /// Local template root, relative to the mirror root
    pub const LOCAL_DIR: &str = "templates/file";

    /// Bucket for templates attributed to the image host
    pub const SHARED_BUCKET: &str = "psdshared";

    /// Bucket for every other template
    pub const RESOURCE_BUCKET: &str = "pp-resources";

    /// Attribution marker selecting the shared bucket
    pub const SHARED_HOST_MARKER: &str = "imgur.com";

    /// Extension of files considered for pruning
    pub const TEMPLATE_EXTENSION: &str = "psd";

    /// Tuple index of the template file name
    pub const FILE_FIELD: usize = 3;

    /// Tuple index of the source attribution
    pub const SOURCE_FIELD: usize = 4;
}

/// HTTP client configuration constants
pub mod http {
    use super::Duration;

    /// Default user agent for all HTTP requests
    pub const USER_AGENT: &str = "pea-mirror/0.1.0";

    /// Timeout for core and template files
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Timeout for font files
    pub const FONT_TIMEOUT: Duration = Duration::from_secs(60);

    /// Connection establishment timeout
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

    /// Connection pool idle timeout
    pub const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

    /// Maximum idle connections per host in pool
    pub const POOL_MAX_PER_HOST: usize = 16;
}

/// Rate limiting configuration
pub mod limits {
    /// Default rate limit for origin requests (requests per second)
    pub const DEFAULT_RATE_LIMIT_RPS: u32 = 32;
}

/// File operation constants
pub mod files {
    /// Temporary file suffix for atomic operations
    pub const TEMP_FILE_SUFFIX: &str = ".tmp";

    /// Write buffer size for streaming downloads (4KB)
    pub const DOWNLOAD_CHUNK_SIZE: usize = 4 * 1024;
}

/// Worker and concurrency configuration
pub mod workers {
    /// Default number of concurrent font download workers
    pub const DEFAULT_FONT_WORKERS: usize = 16;

    /// Upper bound accepted for the font worker count
    pub const MAX_FONT_WORKERS: usize = 64;

    /// Result channel capacity per worker
    pub const CHANNEL_BUFFER_PER_WORKER: usize = 4;
}

/// Logging constants
pub mod logging {
    /// Default log level
    pub const DEFAULT_LOG_LEVEL: &str = "info";
}

// Re-export commonly used constants for convenience
pub use env::{LOCAL_ROOT as ENV_LOCAL_ROOT, REMOTE_BASE as ENV_REMOTE_BASE};
pub use files::TEMP_FILE_SUFFIX;
pub use http::USER_AGENT;
pub use limits::DEFAULT_RATE_LIMIT_RPS;
pub use workers::DEFAULT_FONT_WORKERS;

//! Configuration management for pea_mirror
//!
//! Settings are layered: built-in defaults, then a TOML config file, then
//! environment variables, then command line flags. Every section is
//! optional in the file, so an empty file is a valid configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::app::coordinator::parse_base;
use crate::app::{ClientConfig, SessionConfig, TemplateConfig, WorkerConfig};
use crate::constants::{env, http, limits, logging, origin, templates, workers};
use crate::errors::{ConfigError, ConfigResult};

/// Name of the project-local config file
pub const LOCAL_CONFIG_FILE: &str = "pea-mirror.toml";

/// Unified application configuration for TOML serialization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Origin and local mirror location
    pub mirror: MirrorConfig,
    /// HTTP client settings
    pub client: ClientConfig,
    /// Font pool settings
    pub fonts: WorkerConfig,
    /// Template bucket settings
    pub templates: TemplateConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// `[mirror]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MirrorConfig {
    /// Root of the local mirror
    pub local_root: PathBuf,
    /// Origin every asset is mirrored from
    pub remote_base: String,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            local_root: PathBuf::from(origin::LOCAL_ROOT),
            remote_base: origin::REMOTE_BASE.to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log level when no verbosity flag is given
    pub level: String,
    /// Enable colored output
    pub colored_output: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: logging::DEFAULT_LOG_LEVEL.to_string(),
            colored_output: true,
        }
    }
}

impl AppConfig {
    /// Load configuration with multi-source precedence:
    /// 1. Default values
    /// 2. Config file (if exists)
    /// 3. Environment variables
    ///
    /// Command line overrides are applied by the caller.
    pub async fn load(config_file_override: Option<PathBuf>) -> ConfigResult<Self> {
        let config_path = match config_file_override {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound { path });
                }
                Some(path)
            }
            None => Self::find_config_file(),
        };

        let mut config = match config_path {
            Some(path) => Self::load_from_file(&path).await?,
            None => {
                debug!("No config file found, using defaults");
                Self::default()
            }
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Applies `PEA_MIRROR_ROOT` and `PEA_MIRROR_REMOTE` through `lookup`
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(root) = lookup(env::LOCAL_ROOT).filter(|v| !v.is_empty()) {
            debug!("{} overrides local root: {}", env::LOCAL_ROOT, root);
            self.mirror.local_root = PathBuf::from(root);
        }
        if let Some(remote) = lookup(env::REMOTE_BASE).filter(|v| !v.is_empty()) {
            debug!("{} overrides remote base: {}", env::REMOTE_BASE, remote);
            self.mirror.remote_base = remote;
        }
    }

    /// Build and validate the session configuration
    pub fn to_session_config(&self) -> ConfigResult<SessionConfig> {
        let remote_base = parse_base("mirror.remote_base", &self.mirror.remote_base)?;
        let mut session = SessionConfig::new(remote_base, self.mirror.local_root.clone())?;
        session.core_timeout = self.client.request_timeout;
        session.fonts = self.fonts.clone();
        session.template_bucket_base =
            parse_base("templates.bucket_base", &self.templates.bucket_base)?;
        session.template_timeout = self.templates.timeout;
        session.validate()?;
        Ok(session)
    }

    /// Writes a commented default config to `path` unless one already exists
    ///
    /// Returns `true` when a file was created.
    pub async fn init_config_file(path: &Path) -> ConfigResult<bool> {
        if path.exists() {
            info!("Config file already exists: {}", path.display());
            return Ok(false);
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| ConfigError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        tokio::fs::write(path, Self::generate_default_config_content())
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        info!("Created default configuration file: {}", path.display());
        Ok(true)
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let mut search_paths = vec![PathBuf::from(format!("./{}", LOCAL_CONFIG_FILE))];
        if let Ok(user_config) = Self::default_config_path() {
            search_paths.push(user_config);
        }

        let found = search_paths.into_iter().find(|path| path.exists());
        if let Some(path) = &found {
            debug!("Found config file: {}", path.display());
        }
        found
    }

    /// Get the default config file path for the current user
    pub fn default_config_path() -> ConfigResult<PathBuf> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("pea-mirror").join("config.toml"))
    }

    /// Load configuration from a TOML file
    async fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|source| ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;

        let config: AppConfig =
            toml::from_str(&content).map_err(|source| ConfigError::InvalidFormat {
                path: path.to_path_buf(),
                source,
            })?;

        info!("Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Generate default configuration content with helpful comments
    pub fn generate_default_config_content() -> String {
        format!(
            r#"# pea-mirror configuration
# Every setting is optional; remove a line to fall back to its default.

[mirror]
# Local mirror root (overridden by PEA_MIRROR_ROOT or --root)
local_root = "{local_root}"
# Origin to mirror from (overridden by PEA_MIRROR_REMOTE or --remote)
remote_base = "{remote_base}"

[client]
user_agent = "{user_agent}"
tcp_keepalive = "30s"
tcp_nodelay = true
pool_idle_timeout = "90s"
pool_max_per_host = {pool_max}
# Timeout for the bootstrap document and every core file
request_timeout = "{core_timeout}s"
connect_timeout = "{connect_timeout}s"
rate_limit_rps = {rps}

[fonts]
# Concurrent downloads for --fonts (overridden by --workers)
worker_count = {workers}
timeout = "{font_timeout}s"

[templates]
bucket_base = "{bucket_base}"
timeout = "{core_timeout}s"

[logging]
level = "{level}"  # error, warn, info, debug, trace
colored_output = true
"#,
            local_root = origin::LOCAL_ROOT,
            remote_base = origin::REMOTE_BASE,
            user_agent = http::USER_AGENT,
            pool_max = http::POOL_MAX_PER_HOST,
            core_timeout = http::DEFAULT_TIMEOUT.as_secs(),
            connect_timeout = http::CONNECT_TIMEOUT.as_secs(),
            rps = limits::DEFAULT_RATE_LIMIT_RPS,
            workers = workers::DEFAULT_FONT_WORKERS,
            font_timeout = http::FONT_TIMEOUT.as_secs(),
            bucket_base = templates::BUCKET_BASE,
            level = logging::DEFAULT_LOG_LEVEL,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();

        assert_eq!(config.fonts.worker_count, workers::DEFAULT_FONT_WORKERS);
        assert_eq!(config.client.rate_limit_rps, limits::DEFAULT_RATE_LIMIT_RPS);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.mirror.local_root, PathBuf::from("www.photopea.com/"));
    }

    #[test]
    fn test_generated_config_matches_defaults() {
        let content = AppConfig::generate_default_config_content();
        let parsed: AppConfig = toml::from_str(&content).unwrap();

        assert_eq!(parsed, AppConfig::default());
        assert!(content.contains("[mirror]"));
        assert!(content.contains("[fonts]"));
    }

    #[tokio::test]
    async fn test_missing_explicit_config_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let result = AppConfig::load(Some(temp_dir.path().join("nonexistent.toml"))).await;

        assert!(matches!(result, Err(ConfigError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_partial_config_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("pea-mirror.toml");
        tokio::fs::write(
            &config_path,
            r#"
[mirror]
local_root = "/srv/mirror"

[fonts]
worker_count = 4
timeout = "2m"

[logging]
level = "debug"
"#,
        )
        .await
        .unwrap();

        let config = AppConfig::load_from_file(&config_path).await.unwrap();

        assert_eq!(config.mirror.local_root, PathBuf::from("/srv/mirror"));
        assert_eq!(config.mirror.remote_base, origin::REMOTE_BASE);
        assert_eq!(config.fonts.worker_count, 4);
        assert_eq!(config.fonts.download_timeout, Duration::from_secs(120));
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.client.request_timeout, http::DEFAULT_TIMEOUT);
    }

    #[tokio::test]
    async fn test_invalid_toml_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("broken.toml");
        tokio::fs::write(&config_path, "[fonts\nworker_count = ")
            .await
            .unwrap();

        let result = AppConfig::load(Some(config_path)).await;
        assert!(matches!(result, Err(ConfigError::InvalidFormat { .. })));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            (env::LOCAL_ROOT, "/tmp/pea"),
            (env::REMOTE_BASE, "http://127.0.0.1:8080/"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config.apply_env_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.mirror.local_root, PathBuf::from("/tmp/pea"));
        assert_eq!(config.mirror.remote_base, "http://127.0.0.1:8080/");

        let mut untouched = AppConfig::default();
        untouched.apply_env_overrides(|_| Some(String::new()));
        assert_eq!(untouched, AppConfig::default());
    }

    #[test]
    fn test_session_config_from_app_config() {
        let mut config = AppConfig::default();
        config.fonts.worker_count = 8;
        config.client.request_timeout = Duration::from_secs(10);

        let session = config.to_session_config().unwrap();
        assert_eq!(session.fonts.worker_count, 8);
        assert_eq!(session.core_timeout, Duration::from_secs(10));
        assert_eq!(
            session.template_bucket_base.as_str(),
            "https://f000.backblazeb2.com/file/"
        );

        config.mirror.remote_base = "not a url".to_string();
        assert!(config.to_session_config().is_err());
    }

    #[tokio::test]
    async fn test_init_config_file_does_not_overwrite() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        assert!(AppConfig::init_config_file(&path).await.unwrap());
        tokio::fs::write(&path, "# edited").await.unwrap();
        assert!(!AppConfig::init_config_file(&path).await.unwrap());

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(content, "# edited");
    }
}

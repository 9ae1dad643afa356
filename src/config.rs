//! Configuration management for moviepipe using the prefer crate.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pipeline::PipelineConfig;
use crate::scrapers::ScraperConfig;

/// Default user agent for page loads.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },
}

/// Application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base data directory.
    pub data_dir: PathBuf,
    /// Database filename.
    pub database_filename: String,
    /// Listing stage output.
    pub raw_filename: String,
    /// Detail + clean stage output.
    pub clean_filename: String,
    /// User agent for page loads.
    pub user_agent: String,
    pub scraper: ScraperConfig,
    pub pipeline: PipelineConfig,
}

impl Default for Settings {
    fn default() -> Self {
        // Local data dir -> Home dir -> Current dir
        let data_dir = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("moviepipe");

        Self {
            data_dir,
            database_filename: "movies.db".to_string(),
            raw_filename: "movies_raw.csv".to_string(),
            clean_filename: "movies_clean.csv".to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            scraper: ScraperConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl Settings {
    /// Create settings with a custom data directory.
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            ..Default::default()
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_filename)
    }

    pub fn raw_path(&self) -> PathBuf {
        self.data_dir.join(&self.raw_filename)
    }

    pub fn clean_path(&self) -> PathBuf {
        self.data_dir.join(&self.clean_filename)
    }

    /// Ensure all directories exist.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.data_dir)
    }
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Target directory for data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// Database filename.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clean_file: Option<String>,
    /// User agent string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// Scrape stage settings. Missing keys keep their defaults.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scraper: Option<ScraperConfig>,
    /// Retry and timeout policy for `run`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline: Option<PipelineConfig>,

    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration using prefer crate.
    /// prefer discovers the moviepipe config file in its standard locations;
    /// the file itself is read with serde so nested sections keep their shape.
    pub async fn load() -> Self {
        let source_path = match prefer::load("moviepipe").await {
            Ok(pref_config) => pref_config.source_path().cloned(),
            // No config file found, use defaults
            Err(_) => None,
        };

        match source_path {
            Some(path) => Self::load_from_path(&path).await.unwrap_or_else(|e| {
                tracing::warn!("Ignoring config file: {}", e);
                Self::default()
            }),
            None => Self::default(),
        }
    }

    /// Load configuration from a specific file path.
    /// `.toml` files are parsed as TOML, anything else as JSON.
    pub async fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        let mut config = Self::parse(path, &contents)?;
        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    fn parse(path: &Path, contents: &str) -> Result<Self, ConfigError> {
        let is_toml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("toml"));

        let parsed = if is_toml {
            toml::from_str(contents).map_err(|e| e.to_string())
        } else {
            serde_json::from_str(contents).map_err(|e| e.to_string())
        };
        parsed.map_err(|reason| ConfigError::Parse {
            path: path.to_path_buf(),
            reason,
        })
    }

    /// Get the base directory for resolving relative paths.
    /// Returns the config file's parent directory if available, otherwise None.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path.as_ref().and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Resolve a path that may be relative to the config file.
    /// - Absolute paths are returned as-is
    /// - Paths starting with ~ are expanded
    /// - Relative paths are resolved relative to `base_dir`
    pub fn resolve_path(&self, path_str: &str, base_dir: &Path) -> PathBuf {
        let expanded = shellexpand::tilde(path_str);
        let path = Path::new(expanded.as_ref());

        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }

    /// Apply configuration to settings.
    /// `base_dir` is used to resolve relative paths (typically config file dir or CWD).
    pub fn apply_to_settings(&self, settings: &mut Settings, base_dir: &Path) {
        if let Some(ref target) = self.target {
            settings.data_dir = self.resolve_path(target, base_dir);
        }
        if let Some(ref database) = self.database {
            settings.database_filename = database.clone();
        }
        if let Some(ref raw_file) = self.raw_file {
            settings.raw_filename = raw_file.clone();
        }
        if let Some(ref clean_file) = self.clean_file {
            settings.clean_filename = clean_file.clone();
        }
        if let Some(ref user_agent) = self.user_agent {
            settings.user_agent = user_agent.clone();
        }
        if let Some(ref scraper) = self.scraper {
            settings.scraper = scraper.clone();
        }
        if let Some(ref pipeline) = self.pipeline {
            settings.pipeline = pipeline.clone();
        }
    }
}

/// Options for loading settings.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit config file path (overrides auto-discovery).
    pub config_path: Option<PathBuf>,
    /// Use CWD for relative paths instead of config file directory.
    pub use_cwd: bool,
    /// Override data directory (--data-dir flag).
    pub data_dir: Option<PathBuf>,
}

/// Load settings with explicit options.
///
/// An explicit config path that cannot be read or parsed is an error;
/// a missing auto-discovered config just means defaults.
pub async fn load_settings_with_options(options: LoadOptions) -> Result<Settings, ConfigError> {
    let config = match &options.config_path {
        Some(path) => Config::load_from_path(path).await?,
        None => Config::load().await,
    };

    let mut settings = Settings::default();

    let cwd = || std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let base_dir = if options.use_cwd {
        cwd()
    } else {
        config.base_dir().unwrap_or_else(cwd)
    };

    config.apply_to_settings(&mut settings, &base_dir);

    // --data-dir override takes precedence, other settings are kept
    if let Some(data_dir) = options.data_dir {
        settings.data_dir = data_dir;
    }

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_paths() {
        let settings = Settings::with_data_dir(PathBuf::from("/data"));
        assert_eq!(settings.database_path(), PathBuf::from("/data/movies.db"));
        assert_eq!(settings.raw_path(), PathBuf::from("/data/movies_raw.csv"));
        assert_eq!(settings.clean_path(), PathBuf::from("/data/movies_clean.csv"));
        assert_eq!(settings.scraper.concurrency, 3);
        assert_eq!(settings.pipeline.retries, 2);
    }

    #[test]
    fn test_apply_resolves_relative_target() {
        let config = Config {
            target: Some("out".to_string()),
            database: Some("films.db".to_string()),
            ..Default::default()
        };
        let mut settings = Settings::default();
        config.apply_to_settings(&mut settings, Path::new("/etc/moviepipe"));

        assert_eq!(settings.data_dir, PathBuf::from("/etc/moviepipe/out"));
        assert_eq!(settings.database_path(), PathBuf::from("/etc/moviepipe/out/films.db"));
    }

    #[test]
    fn test_resolve_path_absolute_is_kept() {
        let config = Config::default();
        assert_eq!(
            config.resolve_path("/var/lib/movies", Path::new("/etc")),
            PathBuf::from("/var/lib/movies")
        );
    }

    #[tokio::test]
    async fn test_load_json_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("moviepipe.json");
        std::fs::write(
            &path,
            r#"{"target": "data", "scraper": {"page_count": 2, "concurrency": 5}, "pipeline": {"retries": 0}}"#,
        )
        .unwrap();

        let settings = load_settings_with_options(LoadOptions {
            config_path: Some(path),
            ..Default::default()
        })
        .await
        .unwrap();

        assert_eq!(settings.data_dir, dir.path().join("data"));
        assert_eq!(settings.scraper.page_count, 2);
        assert_eq!(settings.scraper.concurrency, 5);
        assert_eq!(settings.scraper.batch_size, 10);
        assert_eq!(settings.pipeline.retries, 0);
        assert_eq!(settings.pipeline.retry_delay_secs, 300);
    }

    #[tokio::test]
    async fn test_load_toml_config_with_data_dir_override() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("moviepipe.toml");
        std::fs::write(
            &path,
            "user_agent = \"test-agent\"\n\n[scraper.browser]\nengine = \"http\"\n",
        )
        .unwrap();

        let settings = load_settings_with_options(LoadOptions {
            config_path: Some(path),
            data_dir: Some(PathBuf::from("/tmp/override")),
            ..Default::default()
        })
        .await
        .unwrap();

        assert_eq!(settings.user_agent, "test-agent");
        assert_eq!(settings.scraper.browser.engine, "http");
        assert_eq!(settings.data_dir, PathBuf::from("/tmp/override"));
    }

    #[tokio::test]
    async fn test_explicit_config_errors() {
        let dir = tempdir().unwrap();
        let missing = load_settings_with_options(LoadOptions {
            config_path: Some(dir.path().join("absent.json")),
            ..Default::default()
        })
        .await;
        assert!(matches!(missing, Err(ConfigError::Read { .. })));

        let broken = dir.path().join("broken.json");
        std::fs::write(&broken, "{not json").unwrap();
        let parsed = load_settings_with_options(LoadOptions {
            config_path: Some(broken),
            ..Default::default()
        })
        .await;
        assert!(matches!(parsed, Err(ConfigError::Parse { .. })));
    }
}

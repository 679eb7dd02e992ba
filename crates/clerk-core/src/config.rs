//! Configuration loading and discovery.
//!
//! Sources are layered, later ones winning:
//! 1. Built-in defaults
//! 2. User config from the XDG config directory
//! 3. Project config, found by walking up from a start directory
//! 4. Explicit files
//! 5. `CLERK_*` environment variables (`__` separates sections)
//!
//! # Supported formats
//!
//! - TOML (`.toml`)
//! - YAML (`.yaml`, `.yml`)
//! - JSON (`.json`)
//!
//! # Config file locations (in order of precedence, highest first):
//! - `.clerk.<ext>` in current directory or any parent
//! - `clerk.<ext>` in current directory or any parent
//! - `~/.config/clerk/config.<ext>` (user config)
//!
//! # Example
//! ```no_run
//! use camino::Utf8PathBuf;
//! use clerk_core::config::{Config, ConfigLoader};
//!
//! let cwd = std::env::current_dir().unwrap();
//! let cwd = Utf8PathBuf::try_from(cwd).expect("current directory is not valid UTF-8");
//! let config = ConfigLoader::new()
//!     .with_project_search(&cwd)
//!     .load()
//!     .unwrap();
//! println!("min confidence: {}", config.classifier.min_confidence);
//! ```
//!
//! A project file covering every section:
//!
//! ```toml
//! log_level = "debug"
//!
//! [classifier]
//! enable_ai = true
//! min_confidence = 0.8
//! languages = ["go", "python"]
//! concurrency = 4
//!
//! [classifier.custom_keywords]
//! feat = ["introduce", "support"]
//!
//! [parser]
//! strict_mode = true
//!
//! [filter]
//! types = ["feat", "fix"]
//! exclude_authors = ["dependabot[bot]"]
//! since = "2024-01-01T00:00:00Z"
//!
//! [ai.retry]
//! max_attempts = 5
//! ```
//!
//! The same `min_confidence` from the environment:
//! `CLERK_CLASSIFIER__MIN_CONFIDENCE=0.8`.

use camino::{Utf8Path, Utf8PathBuf};
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};

use crate::classify::ClassifierConfig;
use crate::conventional::ParseOptions;
use crate::error::{ConfigError, ConfigResult};
use crate::filter::FilterOptions;
use crate::resilience::ResilienceConfig;

/// The configuration for clerk.
///
/// Deserialized from config files found during discovery (TOML, YAML, or JSON).
/// Every section is optional and falls back to its defaults.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Log level (e.g., "debug", "info", "warn", "error").
    pub log_level: LogLevel,
    /// Directory for JSONL log files (falls back to platform defaults if unset).
    pub log_dir: Option<Utf8PathBuf>,
    /// Classification cascade settings.
    pub classifier: ClassifierConfig,
    /// Conventional-commit parser options.
    pub parser: ParseOptions,
    /// Default commit filter.
    pub filter: FilterOptions,
    /// Resilience policy for the AI stage.
    pub ai: ResilienceConfig,
}

/// Log level configuration.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Verbose output for debugging and development.
    Debug,
    /// Standard operational information (default).
    #[default]
    Info,
    /// Warnings about potential issues.
    Warn,
    /// Errors that indicate failures.
    Error,
}

impl LogLevel {
    /// Returns the log level as a lowercase string slice.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Config file extensions, in lookup order.
const CONFIG_EXTENSIONS: &[&str] = &["toml", "yaml", "yml", "json"];

/// Application name for XDG directory lookup and config file names.
const APP_NAME: &str = "clerk";

/// Prefix for environment overrides.
const ENV_PREFIX: &str = "CLERK_";

/// Builder for loading configuration from multiple sources.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    project_search_root: Option<Utf8PathBuf>,
    include_user_config: bool,
    include_env: bool,
    /// Directory entry that ends the upward project search.
    boundary_marker: Option<String>,
    explicit_files: Vec<Utf8PathBuf>,
}

impl ConfigLoader {
    /// Loader with user config, env overrides, and a `.git` search boundary.
    pub fn new() -> Self {
        Self {
            project_search_root: None,
            include_user_config: true,
            include_env: true,
            boundary_marker: Some(".git".to_string()),
            explicit_files: Vec::new(),
        }
    }

    /// Walk up from `path` looking for `.clerk.<ext>` or `clerk.<ext>`.
    pub fn with_project_search<P: AsRef<Utf8Path>>(mut self, path: P) -> Self {
        self.project_search_root = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set whether to include user config from `~/.config/clerk/`.
    pub const fn with_user_config(mut self, include: bool) -> Self {
        self.include_user_config = include;
        self
    }

    /// Set whether `CLERK_*` environment variables override file values.
    pub const fn with_env(mut self, include: bool) -> Self {
        self.include_env = include;
        self
    }

    /// Stop the project search at the first parent containing `marker`.
    pub fn with_boundary_marker<S: Into<String>>(mut self, marker: S) -> Self {
        self.boundary_marker = Some(marker.into());
        self
    }

    /// Search all the way to the filesystem root.
    pub fn without_boundary_marker(mut self) -> Self {
        self.boundary_marker = None;
        self
    }

    /// Add a config file. Later files win; all explicit files beat discovered ones.
    pub fn with_file<P: AsRef<Utf8Path>>(mut self, path: P) -> Self {
        self.explicit_files.push(path.as_ref().to_path_buf());
        self
    }

    /// Config files that [`load`](Self::load) would merge, lowest precedence first.
    pub fn sources(&self) -> Vec<Utf8PathBuf> {
        let user = self
            .include_user_config
            .then(find_user_config)
            .flatten();
        let project = self
            .project_search_root
            .as_deref()
            .and_then(|root| self.find_project_config(root));

        user.into_iter()
            .chain(project)
            .chain(self.explicit_files.iter().cloned())
            .collect()
    }

    /// Load and validate the merged configuration.
    ///
    /// # Errors
    ///
    /// Fails if a source does not deserialize or the `[classifier]` section
    /// holds out-of-range values.
    #[tracing::instrument(skip(self), fields(search_root = ?self.project_search_root))]
    pub fn load(self) -> ConfigResult<Config> {
        let sources = self.sources();
        tracing::debug!(sources = sources.len(), "loading configuration");

        let mut figment = sources.iter().fold(
            Figment::new().merge(Serialized::defaults(Config::default())),
            |figment, path| merge_file(figment, path),
        );
        if self.include_env {
            figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        }

        let config: Config = figment
            .extract()
            .map_err(|e| ConfigError::Deserialize(Box::new(e)))?;
        config.classifier.validate()?;
        tracing::info!(
            log_level = config.log_level.as_str(),
            min_confidence = config.classifier.min_confidence,
            enable_ai = config.classifier.enable_ai,
            "configuration loaded"
        );
        Ok(config)
    }

    /// Like [`load`](Self::load), but fails when no config file exists.
    ///
    /// # Errors
    ///
    /// [`ConfigError::NotFound`] when discovery turns up nothing, otherwise
    /// whatever [`load`](Self::load) reports.
    pub fn load_or_error(self) -> ConfigResult<Config> {
        if self.sources().is_empty() {
            return Err(ConfigError::NotFound);
        }
        self.load()
    }

    fn find_project_config(&self, start: &Utf8Path) -> Option<Utf8PathBuf> {
        for dir in start.ancestors() {
            let found = CONFIG_EXTENSIONS.iter().find_map(|ext| {
                [format!(".{APP_NAME}.{ext}"), format!("{APP_NAME}.{ext}")]
                    .into_iter()
                    .map(|name| dir.join(name))
                    .find(|path| path.is_file())
            });
            if found.is_some() {
                return found;
            }
            // The directory holding the marker is the last one searched.
            if let Some(marker) = &self.boundary_marker
                && dir.join(marker).exists()
            {
                break;
            }
        }
        None
    }
}

fn find_user_config() -> Option<Utf8PathBuf> {
    let dir = user_config_dir()?;
    CONFIG_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("config.{ext}")))
        .find(|path| path.is_file())
}

/// Merge one file, picking the provider from its extension (TOML if unknown).
fn merge_file(figment: Figment, path: &Utf8Path) -> Figment {
    match path.extension() {
        Some("yaml" | "yml") => figment.merge(Yaml::file_exact(path.as_str())),
        Some("json") => figment.merge(Json::file_exact(path.as_str())),
        _ => figment.merge(Toml::file_exact(path.as_str())),
    }
}

/// Locate the nearest project config above `start`, ignoring `.git` boundaries.
pub fn find_project_config<P: AsRef<Utf8Path>>(start: P) -> Option<Utf8PathBuf> {
    ConfigLoader::new()
        .without_boundary_marker()
        .find_project_config(start.as_ref())
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("", "", APP_NAME)
}

/// The user config directory: `~/.config/clerk/` on Linux,
/// `~/Library/Application Support/clerk/` on macOS.
pub fn user_config_dir() -> Option<Utf8PathBuf> {
    let proj_dirs = project_dirs()?;
    Utf8PathBuf::from_path_buf(proj_dirs.config_dir().to_path_buf()).ok()
}

/// Machine-local data directory (`~/.local/share/clerk/` on Linux). Log
/// files land under its `logs/` subdirectory when nothing else is configured.
pub fn user_data_local_dir() -> Option<Utf8PathBuf> {
    let proj_dirs = project_dirs()?;
    Utf8PathBuf::from_path_buf(proj_dirs.data_local_dir().to_path_buf()).ok()
}

//! Application configuration, loaded from a TOML file.
//!
//! ```toml
//! [federation]
//! default_count = 20
//! source_timeout_seconds = 10
//!
//! [logging]
//! filter = "osfed=info,osfed_search=debug"
//!
//! [[sources]]
//! kind = "file"
//! name = "archive"
//! path = "/srv/feeds/archive.json"
//!
//! [[sources]]
//! kind = "http"
//! name = "catalogue"
//! template = "https://catalogue.example/search?q={searchTerms}&start={startIndex?}&n={count?}"
//! total_results = 1200
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use osfed_search::FederationConfig;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Default `EnvFilter` directives when neither `RUST_LOG` nor the config sets one.
pub const DEFAULT_LOG_FILTER: &str = "osfed=info,osfed_search=info";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Engine settings.
    pub federation: FederationConfig,
    /// Log output.
    pub logging: LoggingConfig,
    /// Configured sources, in declaration order.
    pub sources: Vec<SourceConfig>,
}

/// Log output configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directives; `RUST_LOG` takes precedence.
    pub filter: String,
    /// Directory for a daily rolling log file, in addition to stderr.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_owned(),
            directory: None,
        }
    }
}

fn default_index_offset() -> u64 {
    1
}

/// One configured source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    /// A JSON result document on disk.
    File {
        /// Source identity.
        name: String,
        /// Document path.
        path: PathBuf,
        /// Index of the first item.
        #[serde(default = "default_index_offset")]
        index_offset: u64,
    },
    /// A remote endpoint addressed by an OpenSearch URL template.
    Http {
        /// Source identity.
        name: String,
        /// URL template.
        template: String,
        /// Index of the first item.
        #[serde(default = "default_index_offset")]
        index_offset: u64,
        /// Declared total; absent means the endpoint's size is unknown.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        total_results: Option<u64>,
        /// Link reported with failures of this source.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        help_link: Option<String>,
    },
}

impl SourceConfig {
    /// Source identity.
    pub fn name(&self) -> &str {
        match self {
            Self::File { name, .. } | Self::Http { name, .. } => name,
        }
    }

    /// Index of the first item.
    pub fn index_offset(&self) -> u64 {
        match self {
            Self::File { index_offset, .. } | Self::Http { index_offset, .. } => *index_offset,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| AppError::Config(format!("{}: {e}", path.display())))
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path: `~/.config/osfed/config.toml`.
    pub fn default_config_path() -> PathBuf {
        if let Some(config) = std::env::var_os("XDG_CONFIG_HOME") {
            PathBuf::from(config).join("osfed").join("config.toml")
        } else if let Some(home) = std::env::var_os("HOME") {
            PathBuf::from(home)
                .join(".config")
                .join("osfed")
                .join("config.toml")
        } else {
            PathBuf::from("/tmp/osfed-config/config.toml")
        }
    }

    /// Validate engine settings and the source list.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Config`] for empty or duplicate source names, a
    /// zero `index_offset`, or invalid engine settings.
    pub fn validate(&self) -> Result<()> {
        self.federation.validate()?;
        let mut seen = HashSet::new();
        for source in &self.sources {
            let name = source.name();
            if name.trim().is_empty() {
                return Err(AppError::Config("source name must not be empty".into()));
            }
            if !seen.insert(name) {
                return Err(AppError::Config(format!("duplicate source name: {name}")));
            }
            if source.index_offset() == 0 {
                return Err(AppError::Config(format!(
                    "source {name}: index_offset must be at least 1"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[federation]
default_count = 10
max_batch_size = 50

[logging]
filter = "osfed=debug"

[[sources]]
kind = "file"
name = "archive"
path = "/srv/feeds/archive.json"

[[sources]]
kind = "http"
name = "catalogue"
template = "https://catalogue.example/search?q={searchTerms}&start={startIndex?}"
index_offset = 0
total_results = 1200
help_link = "https://catalogue.example/help"
"#;

    #[test]
    fn parses_sample() {
        let config: AppConfig = toml::from_str(SAMPLE).expect("parse");
        assert_eq!(config.federation.default_count, 10);
        assert_eq!(config.federation.max_batch_size, 50);
        assert_eq!(config.federation.probe_batch_size, FederationConfig::default().probe_batch_size);
        assert_eq!(config.logging.filter, "osfed=debug");
        assert_eq!(config.sources.len(), 2);
        assert_eq!(config.sources[0].name(), "archive");
        assert_eq!(config.sources[0].index_offset(), 1);
        assert_eq!(
            config.sources[1],
            SourceConfig::Http {
                name: "catalogue".into(),
                template: "https://catalogue.example/search?q={searchTerms}&start={startIndex?}".into(),
                index_offset: 0,
                total_results: Some(1200),
                help_link: Some("https://catalogue.example/help".into()),
            }
        );
    }

    #[test]
    fn empty_file_gives_defaults() {
        let config: AppConfig = toml::from_str("").expect("parse");
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.logging.filter, DEFAULT_LOG_FILTER);
    }

    #[test]
    fn validate_rejects_zero_index_offset() {
        let config: AppConfig = toml::from_str(SAMPLE).expect("parse");
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("index_offset"));
    }

    #[test]
    fn validate_rejects_duplicate_names() {
        let source = SourceConfig::File {
            name: "a".into(),
            path: "a.json".into(),
            index_offset: 1,
        };
        let config = AppConfig {
            sources: vec![source.clone(), source],
            ..Default::default()
        };
        assert!(config.validate().unwrap_err().to_string().contains("duplicate"));
    }

    #[test]
    fn validate_rejects_empty_names() {
        let config = AppConfig {
            sources: vec![SourceConfig::File {
                name: " ".into(),
                path: "a.json".into(),
                index_offset: 1,
            }],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_checks_engine_settings() {
        let mut config = AppConfig::default();
        config.federation.max_rounds = 0;
        assert!(config.validate().unwrap_err().to_string().contains("max_rounds"));
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("config.toml");
        let mut config: AppConfig = toml::from_str(SAMPLE).expect("parse");
        config.logging.directory = Some(dir.path().join("logs"));

        config.save_to_file(&path).expect("save");
        let loaded = AppConfig::from_file(&path).expect("load");
        assert_eq!(loaded, config);
    }

    #[test]
    fn from_file_nonexistent_returns_error() {
        let result = AppConfig::from_file(Path::new("/nonexistent/path/config.toml"));
        assert!(matches!(result, Err(AppError::Io(_))));
    }

    #[test]
    fn from_file_invalid_toml_returns_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "this is not valid toml {{{").expect("write");
        assert!(matches!(AppConfig::from_file(&path), Err(AppError::Config(_))));
    }

    #[test]
    fn default_config_path_ends_with_config_toml() {
        let path = AppConfig::default_config_path();
        let path_str = path.to_string_lossy();
        assert!(path_str.ends_with("config.toml"));
        assert!(path_str.contains("osfed"));
    }
}

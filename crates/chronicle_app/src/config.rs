//! `chronicle.toml` loading.
//!
//! Every section is optional and every field has a default, so an empty or
//! missing file yields a working configuration.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use chronicle_core::{EraConfig, EraTable};
use chronicle_engine::editor::DEPLOY_WORKFLOW;
use chronicle_engine::{DiscoverySettings, RepoConfig};
use chronicle_logging::chronicle_warn;

use crate::logging::LogDestination;

pub const DEFAULT_CONFIG_FILE: &str = "chronicle.toml";
pub const TOKEN_ENV: &str = "CHRONICLE_GITHUB_TOKEN";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub site: SiteSection,
    pub repository: RepositorySection,
    pub friends: FriendsSection,
    pub logging: LoggingSection,
    pub state: StateSection,
    pub eras: Vec<EraConfig>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SiteSection {
    pub title: String,
    pub subtitle: String,
    pub description: String,
    pub url: String,
    pub lang: String,
    pub owner: String,
    pub avatar: String,
    /// Root of the site checkout.
    pub content_dir: PathBuf,
    /// Posts directory, relative to `content_dir`.
    pub posts_dir: PathBuf,
    /// Permanent friend pages, relative to `content_dir`.
    pub friends_dir: PathBuf,
}

impl Default for SiteSection {
    fn default() -> Self {
        Self {
            title: "Chronicle".to_string(),
            subtitle: String::new(),
            description: String::new(),
            url: "https://example.com".to_string(),
            lang: "en".to_string(),
            owner: String::new(),
            avatar: String::new(),
            content_dir: PathBuf::from("."),
            posts_dir: PathBuf::from("src/content/posts"),
            friends_dir: PathBuf::from("src/content/friends"),
        }
    }
}

impl SiteSection {
    pub fn posts_path(&self) -> PathBuf {
        self.content_dir.join(&self.posts_dir)
    }

    pub fn friends_path(&self) -> PathBuf {
        self.content_dir.join(&self.friends_dir)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RepositorySection {
    #[serde(flatten)]
    pub repo: RepoConfig,
    pub workflow: String,
}

impl Default for RepositorySection {
    fn default() -> Self {
        Self {
            repo: RepoConfig::default(),
            workflow: DEPLOY_WORKFLOW.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FriendsSection {
    pub rss_paths: Vec<String>,
    pub json_paths: Vec<String>,
    pub feed_timeout_ms: u64,
    pub probe_timeout_ms: u64,
}

impl Default for FriendsSection {
    fn default() -> Self {
        let defaults = DiscoverySettings::default();
        Self {
            rss_paths: defaults.rss_paths,
            json_paths: defaults.json_paths,
            feed_timeout_ms: millis(defaults.feed_timeout),
            probe_timeout_ms: millis(defaults.probe_timeout),
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl FriendsSection {
    pub fn discovery_settings(&self) -> DiscoverySettings {
        DiscoverySettings {
            rss_paths: self.rss_paths.clone(),
            json_paths: self.json_paths.clone(),
            feed_timeout: Duration::from_millis(self.feed_timeout_ms),
            probe_timeout: Duration::from_millis(self.probe_timeout_ms),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    pub level: String,
    pub destination: LogDestination,
    pub file: PathBuf,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            destination: LogDestination::Terminal,
            file: PathBuf::from("chronicle.log"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StateSection {
    pub path: PathBuf,
}

impl Default for StateSection {
    fn default() -> Self {
        Self {
            path: PathBuf::from(".chronicle/state.ron"),
        }
    }
}

impl AppConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Loads `path`, falling back to defaults when the file is missing or
    /// invalid. Returns the warning to report once logging is up.
    pub fn load_or_default(path: &Path) -> (Self, Option<String>) {
        match Self::load(path) {
            Ok(config) => (config, None),
            Err(ConfigError::Read { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => {
                (Self::default(), None)
            }
            Err(err) => (
                Self::default(),
                Some(format!("Failed to load config from {}: {}; using defaults", path.display(), err)),
            ),
        }
    }

    /// The configured `[[eras]]` table, or the built-in one when none is
    /// given or the configured one is inconsistent.
    pub fn era_table(&self) -> EraTable {
        if self.eras.is_empty() {
            return EraTable::default();
        }
        let table = EraTable::new(self.eras.clone());
        match table.validate() {
            Ok(()) => table,
            Err(err) => {
                chronicle_warn!("Ignoring configured eras: {}", err);
                EraTable::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_file_gives_defaults() {
        let config = AppConfig::from_toml_str("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.repository.repo.branch, "main");
        assert_eq!(config.repository.workflow, "deploy.yml");
        assert_eq!(config.friends.feed_timeout_ms, 3000);
    }

    #[test]
    fn sections_override_defaults() {
        let text = r#"
            [site]
            title = "Field Notes"
            url = "https://notes.example"

            [repository]
            owner = "octo"
            repo = "notes"
            branch = "trunk"

            [friends]
            rss_paths = ["/index.xml"]
            probe_timeout_ms = 500

            [logging]
            level = "debug"
            destination = "both"

            [[eras]]
            key = "old"
            display_name = "Old Days"
            start_year = 0
            end_year = 1000
        "#;
        let config = AppConfig::from_toml_str(text).unwrap();
        assert_eq!(config.site.title, "Field Notes");
        assert_eq!(config.site.lang, "en");
        assert_eq!(config.repository.repo.owner, "octo");
        assert_eq!(config.repository.repo.branch, "trunk");
        assert_eq!(config.repository.repo.posts_path, "src/content/posts");
        assert_eq!(config.friends.rss_paths, vec!["/index.xml".to_string()]);
        assert_eq!(
            config.friends.discovery_settings().probe_timeout,
            Duration::from_millis(500)
        );
        assert_eq!(config.logging.destination, LogDestination::Both);
        assert_eq!(config.era_table().classify(500), "old");
    }

    #[test]
    fn inverted_era_falls_back_to_builtin_table() {
        let text = r#"
            [[eras]]
            key = "broken"
            display_name = "Broken"
            start_year = 10
            end_year = 5
        "#;
        let config = AppConfig::from_toml_str(text).unwrap();
        assert_eq!(config.era_table(), EraTable::default());
    }

    #[test]
    fn missing_file_is_silent_and_bad_file_warns() {
        let dir = tempfile::tempdir().unwrap();
        let (config, warning) = AppConfig::load_or_default(&dir.path().join("absent.toml"));
        assert_eq!(config, AppConfig::default());
        assert!(warning.is_none());

        let bad = dir.path().join("bad.toml");
        fs::write(&bad, "[site\ntitle=").unwrap();
        let (_, warning) = AppConfig::load_or_default(&bad);
        assert!(warning.is_some());
    }
}

//! Composer configuration.
//!
//! Loaded from a TOML file (with `$VAR` environment substitution) or from
//! environment variables. Every field has a default, so an empty file is a
//! valid configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};

use jearn_composer_core::classify::DEFAULT_OWN_DOMAIN;
use jearn_composer_core::embed::DEFAULT_EMBED_HOSTS;
use jearn_composer_core::{HistoryConfig, MAX_CHARS, UrlClassifier};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const DEFAULT_MAX_TITLE_CHARS: usize = 200;
const DEFAULT_MAX_CATEGORIES: usize = 3;
const DEFAULT_VISIBLE_CATEGORIES: usize = 5;
const DEFAULT_TITLE_DEBOUNCE_MS: u64 = 300;
const DEFAULT_HISTORY_GROUP_DELAY_MS: u64 = 300;
const DEFAULT_HISTORY_DEPTH: usize = 200;
const DEFAULT_TOKEN_TTL_MS: u64 = 6_000;
const DEFAULT_AUTOSAVE_DEBOUNCE_MS: u64 = 500;

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_chars: usize,
    pub max_title_chars: usize,
    pub max_categories: usize,
    pub visible_categories: usize,
    pub title_debounce_ms: u64,
    pub history_group_delay_ms: u64,
    pub history_depth: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_chars: MAX_CHARS,
            max_title_chars: DEFAULT_MAX_TITLE_CHARS,
            max_categories: DEFAULT_MAX_CATEGORIES,
            visible_categories: DEFAULT_VISIBLE_CATEGORIES,
            title_debounce_ms: DEFAULT_TITLE_DEBOUNCE_MS,
            history_group_delay_ms: DEFAULT_HISTORY_GROUP_DELAY_MS,
            history_depth: DEFAULT_HISTORY_DEPTH,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct LinksConfig {
    pub own_domain: String,
    pub embed_allow_list: Vec<String>,
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            own_domain: DEFAULT_OWN_DOMAIN.into(),
            embed_allow_list: DEFAULT_EMBED_HOSTS.iter().map(|h| h.to_string()).collect(),
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct DraftsConfig {
    /// Directory for the file backend. `None` keeps drafts in memory.
    pub dir: Option<PathBuf>,
    /// Quiet period after the last edit before the draft is saved.
    pub autosave_debounce_ms: u64,
}

impl Default for DraftsConfig {
    fn default() -> Self {
        Self {
            dir: None,
            autosave_debounce_ms: DEFAULT_AUTOSAVE_DEBOUNCE_MS,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct EchoConfig {
    pub token_ttl_ms: u64,
}

impl Default for EchoConfig {
    fn default() -> Self {
        Self {
            token_ttl_ms: DEFAULT_TOKEN_TTL_MS,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct ComposerConfig {
    pub limits: LimitsConfig,
    pub links: LinksConfig,
    pub drafts: DraftsConfig,
    pub echo: EchoConfig,
}

impl ComposerConfig {
    pub fn load(config_file: impl AsRef<Path>) -> Result<ComposerConfig, ConfigError> {
        let path = config_file.as_ref();
        let mut config_string = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        // substitute environment variables in config file
        for (k, v) in env::vars() {
            config_string = config_string.replace(&format!("${}", k), &v);
        }
        Self::from_toml(&config_string)
    }

    pub fn from_toml(src: &str) -> Result<ComposerConfig, ConfigError> {
        toml::from_str(src).map_err(ConfigError::Parse)
    }

    /// Load configuration from environment variables.
    ///
    /// Optional:
    /// - COMPOSER_OWN_DOMAIN (default: jearn.site)
    /// - COMPOSER_MAX_CHARS (default: 20000)
    /// - COMPOSER_DRAFT_DIR (default: in-memory drafts)
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Ok(domain) = env::var("COMPOSER_OWN_DOMAIN") {
            config.links.own_domain = domain;
        }
        if let Ok(max) = env::var("COMPOSER_MAX_CHARS") {
            config.limits.max_chars = max.parse().map_err(|e: std::num::ParseIntError| {
                ConfigError::Invalid {
                    var: "COMPOSER_MAX_CHARS",
                    message: e.to_string(),
                }
            })?;
        }
        if let Ok(dir) = env::var("COMPOSER_DRAFT_DIR") {
            config.drafts.dir = Some(PathBuf::from(dir));
        }
        Ok(config)
    }

    pub fn history(&self) -> HistoryConfig {
        HistoryConfig {
            title_debounce: Duration::from_millis(self.limits.title_debounce_ms),
            body_group_delay: Duration::from_millis(self.limits.history_group_delay_ms),
            body_depth: self.limits.history_depth,
            max_title_chars: self.limits.max_title_chars,
        }
    }

    pub fn classifier(&self) -> UrlClassifier {
        UrlClassifier::new(
            &self.links.own_domain,
            self.links.embed_allow_list.iter().map(String::as_str),
        )
    }

    pub fn token_ttl(&self) -> Duration {
        Duration::from_millis(self.echo.token_ttl_ms)
    }

    pub fn autosave_debounce(&self) -> Duration {
        Duration::from_millis(self.drafts.autosave_debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_is_default() {
        let config = ComposerConfig::from_toml("").unwrap();
        assert_eq!(config, ComposerConfig::default());
        assert_eq!(config.limits.max_chars, 20_000);
        assert_eq!(config.history().title_debounce, Duration::from_millis(300));
        assert_eq!(config.autosave_debounce(), Duration::from_millis(500));
    }

    #[test]
    fn test_partial_toml_overrides() {
        let config = ComposerConfig::from_toml(
            r#"
            [links]
            own_domain = "example.org"

            [limits]
            max_categories = 2

            [drafts]
            autosave_debounce_ms = 50
            "#,
        )
        .unwrap();
        assert_eq!(config.links.own_domain, "example.org");
        assert_eq!(config.limits.max_categories, 2);
        assert_eq!(config.limits.max_title_chars, 200);
        assert_eq!(config.classifier().own_domain(), "example.org");
        assert_eq!(config.drafts.dir, None);
        assert_eq!(config.autosave_debounce(), Duration::from_millis(50));
    }

    #[test]
    fn test_bad_toml_is_parse_error() {
        let err = ComposerConfig::from_toml("[limits]\nmax_chars = \"lots\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}

//! Configuration loading and management

use anyhow::{Context, Result};
use onion_reader_adapters::sources::{ArknightsConfig, Honkai3Config};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub sources: SourcesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    #[serde(default = "default_true")]
    pub run_on_start: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourcesConfig {
    #[serde(default)]
    pub arknights: ArknightsConfig,

    #[serde(default)]
    pub honkai3: Honkai3Config,
}

// Default value functions
fn default_database_path() -> PathBuf {
    PathBuf::from("./reader.sqlite")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_interval() -> u64 {
    600
}

fn default_timeout() -> u64 {
    30
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            log_level: default_log_level(),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
            run_on_start: default_true(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file and environment
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        // Try default config path if none specified
        let default_path = PathBuf::from("./config.toml");
        let path = config_path.unwrap_or(&default_path);

        if path.exists() {
            builder = builder.add_source(config::File::from(path));
        } else if config_path.is_some() {
            // User specified a path that doesn't exist
            anyhow::bail!("Config file not found: {}", path.display());
        }

        // Add environment variable overrides
        builder = builder.add_source(
            config::Environment::with_prefix("ONION_READER")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to build configuration")?;

        let config: Self = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.scheduler.interval_secs == 0 {
            anyhow::bail!("scheduler.interval_secs must be greater than zero");
        }
        if self.http.timeout_secs == 0 {
            anyhow::bail!("http.timeout_secs must be greater than zero");
        }
        if self.sources.honkai3.page_size == 0 {
            anyhow::bail!("sources.honkai3.page_size must be greater than zero");
        }
        Ok(())
    }

    /// Render the effective configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string(self).context("Failed to serialize configuration")
    }

    /// Generate example configuration as TOML string
    pub fn example_toml() -> String {
        r#"# onion-reader configuration

[general]
database_path = "./reader.sqlite"
log_level = "info"

[scheduler]
# Time between the starts of two ingest rounds
interval_secs = 600
run_on_start = true

[http]
timeout_secs = 30

[sources.arknights]
enabled = true
site_url = "https://ak.hypergryph.com"
list_url = "https://ak.hypergryph.com/news.html"
feed_name = "Arknights"
priority = 10
category = "Games"

[sources.honkai3]
enabled = true
api_url = "https://www.bh3.com/content/bh3Cn/getContentList"
article_base_url = "https://www.bh3.com"
website = "https://www.bh3.com/news/cate/171"
channel_id = 171
page_size = 10
# max_pages = 50
feed_name = "Honkai Impact 3"
priority = 10
category = "Games"
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_toml_matches_defaults() {
        let parsed: AppConfig = toml::from_str(&AppConfig::example_toml()).unwrap();
        let defaults = AppConfig::default();

        assert_eq!(parsed.general.database_path, defaults.general.database_path);
        assert_eq!(parsed.scheduler.interval_secs, 600);
        assert_eq!(parsed.http.timeout_secs, 30);
        assert_eq!(parsed.sources.arknights, defaults.sources.arknights);
        assert_eq!(parsed.sources.honkai3, defaults.sources.honkai3);
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let parsed: AppConfig = toml::from_str("[sources.honkai3]\nmax_pages = 3\n").unwrap();

        assert_eq!(parsed.sources.honkai3.max_pages, Some(3));
        assert_eq!(parsed.sources.honkai3.channel_id, 171);
        assert!(parsed.sources.arknights.enabled);
        assert!(parsed.scheduler.run_on_start);
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        let mut config = AppConfig::default();
        config.scheduler.interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_defaults_serialize() {
        let rendered = AppConfig::default().to_toml().unwrap();
        assert!(rendered.contains("[sources.arknights]"));
        assert!(!rendered.contains("max_pages"));
    }
}

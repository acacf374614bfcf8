use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::article::SourceDescriptor;
use crate::error::CollectError;

/// Largest accepted recency window, roughly a century.
pub const MAX_WINDOW_DAYS: i64 = 36_500;

/// The feed list shipped with the binary.
const EMBEDDED_FEEDS: &str = include_str!("../feeds.toml");

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Recency window in days
    #[serde(default = "default_window_days")]
    pub window_days: i64,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub categories: Vec<CategoryConfig>,
}

fn default_window_days() -> i64 {
    2
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("news_data")
}

fn default_log_file() -> PathBuf {
    PathBuf::from("logs/news_repository.log")
}

#[derive(Debug, Deserialize, Clone)]
pub struct FetchConfig {
    #[serde(default = "default_min_delay_ms")]
    pub min_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_min_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    2000
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    "NewsRepository/0.1 (RSS Aggregator)".to_string()
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: default_min_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CategoryConfig {
    pub name: String,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    pub name: String,
    pub url: String,
}

impl CategoryConfig {
    /// Source descriptors for this category, in declared order.
    pub fn descriptors(&self) -> Vec<SourceDescriptor> {
        self.sources
            .iter()
            .map(|source| SourceDescriptor {
                url: source.url.clone(),
                source_name: source.name.clone(),
                category: self.name.clone(),
            })
            .collect()
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse config from a TOML string (useful for testing)
    pub fn from_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// The configuration compiled into the binary from `feeds.toml`.
    pub fn embedded() -> anyhow::Result<Self> {
        Self::from_str(EMBEDDED_FEEDS)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.fetch.min_delay_ms > self.fetch.max_delay_ms {
            anyhow::bail!(
                "fetch.min_delay_ms ({}) exceeds fetch.max_delay_ms ({})",
                self.fetch.min_delay_ms,
                self.fetch.max_delay_ms
            );
        }
        if !(0..=MAX_WINDOW_DAYS).contains(&self.window_days) {
            anyhow::bail!(
                "window_days must be between 0 and {} (got {})",
                MAX_WINDOW_DAYS,
                self.window_days
            );
        }
        Ok(())
    }

    pub fn category(&self, name: &str) -> Result<&CategoryConfig, CollectError> {
        self.categories
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| CollectError::UnknownCategory(name.to_string()))
    }

    /// Resolve category names to their configuration, keeping the order the
    /// names were given in. An empty list selects every category.
    ///
    /// Unknown names are returned separately so the caller can report them
    /// without abandoning the known ones.
    pub fn select_categories(
        &self,
        names: &[String],
    ) -> (Vec<CategoryConfig>, Vec<CollectError>) {
        if names.is_empty() {
            return (self.categories.clone(), Vec::new());
        }

        let mut selected = Vec::new();
        let mut unknown = Vec::new();
        for name in names {
            match self.category(name) {
                Ok(category) => selected.push(category.clone()),
                Err(e) => unknown.push(e),
            }
        }
        (selected, unknown)
    }

    pub fn source_count(&self) -> usize {
        self.categories.iter().map(|c| c.sources.len()).sum()
    }
}

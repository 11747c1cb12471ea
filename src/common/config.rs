use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Global OriginScope configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Where the domain filter settings live
    #[serde(default = "default_settings_path")]
    pub settings_path: PathBuf,

    /// Length of ranking lists (top offenders, JSON failures, large keys)
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Estimate IndexedDB/Cache sizes from their counts when the host reports nothing
    #[serde(default)]
    pub opaque_size_estimates: bool,

    /// Bytes assumed per IndexedDB database when estimating
    #[serde(default = "default_indexed_db_estimate")]
    pub indexed_db_estimate_bytes: u64,

    /// Bytes assumed per cache bucket when estimating
    #[serde(default = "default_cache_bucket_estimate")]
    pub cache_bucket_estimate_bytes: u64,

    /// Output format preference
    #[serde(default)]
    pub output_format: OutputFormat,
}

/// Used when `--format` is not given on the command line
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Human,
    Json,
    Quiet,
}

fn default_settings_path() -> PathBuf {
    Config::data_dir().join("filter.toml")
}
fn default_top_n() -> usize {
    10
}
fn default_indexed_db_estimate() -> u64 {
    5_000
}
fn default_cache_bucket_estimate() -> u64 {
    10_000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            settings_path: default_settings_path(),
            top_n: default_top_n(),
            opaque_size_estimates: false,
            indexed_db_estimate_bytes: default_indexed_db_estimate(),
            cache_bucket_estimate_bytes: default_cache_bucket_estimate(),
            output_format: OutputFormat::Human,
        }
    }
}

impl Config {
    /// Get the OriginScope data directory (~/.originscope)
    pub fn data_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join(".originscope")
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        Self::data_dir().join("config.toml")
    }

    /// Load config from file, or fall back to defaults if it does not exist
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            let config: Config = toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config: {}", path.display()))?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path();
        Self::init_dirs()?;
        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&path, contents)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }

    /// Create the data directory
    pub fn init_dirs() -> Result<()> {
        let dir = Self::data_dir();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        Ok(())
    }

    /// Sampling options derived from this config
    pub fn sampler_options(&self) -> crate::sampler::SamplerOptions {
        crate::sampler::SamplerOptions {
            opaque_size_estimates: self.opaque_size_estimates,
            indexed_db_estimate_bytes: self.indexed_db_estimate_bytes,
            cache_bucket_estimate_bytes: self.cache_bucket_estimate_bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.top_n, 10);
        assert!(!config.opaque_size_estimates);
        assert_eq!(config.indexed_db_estimate_bytes, 5_000);
        assert_eq!(config.cache_bucket_estimate_bytes, 10_000);
        assert!(config.settings_path.ends_with("filter.toml"));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config = toml::from_str("top_n = 3\n").unwrap();
        assert_eq!(config.top_n, 3);
        assert_eq!(config.output_format, OutputFormat::Human);
        assert_eq!(config.cache_bucket_estimate_bytes, 10_000);
    }

    #[test]
    fn test_output_format_key() {
        let config: Config = toml::from_str("output_format = \"json\"\n").unwrap();
        assert_eq!(config.output_format, OutputFormat::Json);
    }
}

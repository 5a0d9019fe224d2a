use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};
use tracing::debug;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SimulatedApiConfig {
    #[serde(default = "default_min_latency_ms")]
    pub min_latency_ms: u64,
    #[serde(default = "default_max_latency_ms")]
    pub max_latency_ms: u64,
    /// Probability in `[0, 1]` that a simulated call fails.
    #[serde(default = "default_failure_rate")]
    pub failure_rate: f64,
}

impl Default for SimulatedApiConfig {
    fn default() -> Self {
        SimulatedApiConfig {
            min_latency_ms: default_min_latency_ms(),
            max_latency_ms: default_max_latency_ms(),
            failure_rate: default_failure_rate(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MarketConfig {
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    /// Multiplier applied when prices are filtered by market.
    #[serde(default = "default_market_factor")]
    pub market_factor: f64,
    /// Multiplier applied when prices are filtered by quality grade.
    #[serde(default = "default_quality_factor")]
    pub quality_factor: f64,
    /// Half-width of the uniform price perturbation.
    #[serde(default = "default_perturbation")]
    pub perturbation: f64,
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
    #[serde(default = "default_alert_interval_secs")]
    pub alert_interval_secs: u64,
    /// Fixed seed for reproducible simulated data.
    pub seed: Option<u64>,
    #[serde(default)]
    pub api: SimulatedApiConfig,
}

impl Default for MarketConfig {
    fn default() -> Self {
        MarketConfig {
            cache_ttl_secs: default_cache_ttl_secs(),
            market_factor: default_market_factor(),
            quality_factor: default_quality_factor(),
            perturbation: default_perturbation(),
            refresh_interval_secs: default_refresh_interval_secs(),
            alert_interval_secs: default_alert_interval_secs(),
            seed: None,
            api: SimulatedApiConfig::default(),
        }
    }
}

impl MarketConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(1))
    }

    pub fn alert_interval(&self) -> Duration {
        Duration::from_secs(self.alert_interval_secs.max(1))
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct TranslationsConfig {
    /// JSON file of user overrides, keyed by language code.
    pub overrides_path: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_language")]
    pub fallback_language: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub data_path: Option<String>,
    #[serde(default)]
    pub translations: TranslationsConfig,
    #[serde(default)]
    pub market: MarketConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            language: default_language(),
            fallback_language: default_language(),
            currency: default_currency(),
            data_path: None,
            translations: TranslationsConfig::default(),
            market: MarketConfig::default(),
        }
    }
}

fn default_language() -> String {
    "en".to_string()
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_cache_ttl_secs() -> u64 {
    2 * 60 * 60
}

fn default_market_factor() -> f64 {
    1.1
}

fn default_quality_factor() -> f64 {
    1.2
}

fn default_perturbation() -> f64 {
    0.25
}

fn default_refresh_interval_secs() -> u64 {
    300
}

fn default_alert_interval_secs() -> u64 {
    60
}

fn default_min_latency_ms() -> u64 {
    50
}

fn default_max_latency_ms() -> u64 {
    400
}

fn default_failure_rate() -> f64 {
    0.1
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!(
                "No config at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("org", "cropdesk", "cropdesk")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn default_data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("org", "cropdesk", "cropdesk")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        // An empty document deserializes to unit, not to an empty mapping
        if config_str.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
language: ar
fallback_language: en
currency: "SAR"
data_path: "/tmp/cropdesk"
translations:
  overrides_path: "/tmp/overrides.json"
market:
  cache_ttl_secs: 60
  market_factor: 1.3
  seed: 42
  api:
    failure_rate: 0.0
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert_eq!(config.language, "ar");
        assert_eq!(config.fallback_language, "en");
        assert_eq!(config.currency, "SAR");
        assert_eq!(config.data_path.as_deref(), Some("/tmp/cropdesk"));
        assert_eq!(
            config.translations.overrides_path.as_deref(),
            Some("/tmp/overrides.json")
        );
        assert_eq!(config.market.cache_ttl(), Duration::from_secs(60));
        assert_eq!(config.market.market_factor, 1.3);
        // Unset fields keep their defaults
        assert_eq!(config.market.quality_factor, 1.2);
        assert_eq!(config.market.perturbation, 0.25);
        assert_eq!(config.market.seed, Some(42));
        assert_eq!(config.market.api.failure_rate, 0.0);
        assert_eq!(config.market.api.max_latency_ms, 400);
    }

    #[test]
    fn test_defaults() {
        let config: AppConfig = serde_yaml::from_str("currency: EUR").unwrap();
        assert_eq!(config.language, "en");
        assert_eq!(config.currency, "EUR");
        assert_eq!(config.market.cache_ttl(), Duration::from_secs(7200));
        assert_eq!(config.market.market_factor, 1.1);
        assert!(config.market.seed.is_none());
        assert!(config.translations.overrides_path.is_none());
    }

    #[test]
    fn test_load_from_path() -> Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(file, "language: fr\nmarket:\n  refresh_interval_secs: 0")?;

        let config = AppConfig::load_from_path(file.path())?;
        assert_eq!(config.language, "fr");
        // Zero intervals are clamped so timers never spin
        assert_eq!(config.market.refresh_interval(), Duration::from_secs(1));
        Ok(())
    }

    #[test]
    fn test_empty_and_invalid_files() -> Result<()> {
        let empty = tempfile::NamedTempFile::new()?;
        let config = AppConfig::load_from_path(empty.path())?;
        assert_eq!(config.language, "en");

        let mut invalid = tempfile::NamedTempFile::new()?;
        writeln!(invalid, "market: [1, 2")?;
        let err = AppConfig::load_from_path(invalid.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));

        let missing = AppConfig::load_from_path("/nonexistent/cropdesk.yaml");
        assert!(missing.is_err());
        Ok(())
    }

    #[test]
    fn test_custom_data_path() -> Result<()> {
        let config = AppConfig {
            data_path: Some("/var/lib/cropdesk".to_string()),
            ..AppConfig::default()
        };
        assert_eq!(config.default_data_path()?, PathBuf::from("/var/lib/cropdesk"));
        Ok(())
    }
}

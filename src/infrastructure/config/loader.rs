use std::path::Path;

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::{ChangeCategory, Config};

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Backend endpoint cannot be empty")]
    EmptyEndpoint,

    #[error("Invalid timeout_secs: {0}. Must be between 1 and 600")]
    InvalidTimeout(u64),

    #[error("Invalid result_limit: {0}. Must be between 1 and 10000")]
    InvalidResultLimit(u32),

    #[error("Invalid rate limit: {0}. Must be positive")]
    InvalidRateLimit(u32),

    #[error("Invalid burst_size: {0}. Must be at least 1")]
    InvalidBurstSize(u32),

    #[error("Invalid query bounds: default_max_queries ({0}) must be between 1 and hard_max_queries ({1})")]
    InvalidQueryBounds(usize, usize),

    #[error("Invalid hard_max_queries: {0}. Must be between 1 and 10")]
    InvalidHardMaxQueries(usize),

    #[error("Invalid threshold {name}: {value}")]
    InvalidThreshold { name: &'static str, value: String },

    #[error("Invalid cache shards: {0}. Must be at least 1")]
    InvalidShards(usize),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidLogRotation(String),

    #[error("Invalid custom pattern '{0}': {1}")]
    InvalidCustomPattern(String, String),
}

/// Largest hard cap accepted for queries per investigation.
pub const QUERY_CAP: usize = 10;

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .logsleuth/config.yaml (project config)
    /// 3. .logsleuth/local.yaml (local overrides, optional)
    /// 4. Environment variables (LOGSLEUTH_* prefix, `__` separates sections)
    pub fn load() -> Result<Config> {
        let config: Config = Self::base()
            .merge(Yaml::file(".logsleuth/config.yaml"))
            .merge(Yaml::file(".logsleuth/local.yaml"))
            .merge(Self::env())
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file, still honoring environment
    /// overrides.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        let config: Config = Self::base()
            .merge(Yaml::file(path))
            .merge(Self::env())
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    fn base() -> Figment {
        Figment::new().merge(Serialized::defaults(Config::default()))
    }

    fn env() -> Env {
        Env::prefixed("LOGSLEUTH_").split("__")
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let backend = &config.backend;
        if backend.endpoint.trim().is_empty() {
            return Err(ConfigError::EmptyEndpoint);
        }
        if backend.timeout_secs == 0 || backend.timeout_secs > 600 {
            return Err(ConfigError::InvalidTimeout(backend.timeout_secs));
        }
        if backend.result_limit == 0 || backend.result_limit > 10_000 {
            return Err(ConfigError::InvalidResultLimit(backend.result_limit));
        }

        if config.rate_limit.requests_per_second == 0 {
            return Err(ConfigError::InvalidRateLimit(config.rate_limit.requests_per_second));
        }
        if config.rate_limit.burst_size == 0 {
            return Err(ConfigError::InvalidBurstSize(config.rate_limit.burst_size));
        }

        let investigation = &config.investigation;
        if investigation.hard_max_queries == 0 || investigation.hard_max_queries > QUERY_CAP {
            return Err(ConfigError::InvalidHardMaxQueries(investigation.hard_max_queries));
        }
        if investigation.default_max_queries == 0
            || investigation.default_max_queries > investigation.hard_max_queries
        {
            return Err(ConfigError::InvalidQueryBounds(
                investigation.default_max_queries,
                investigation.hard_max_queries,
            ));
        }

        let t = &investigation.thresholds;
        let unit = |name: &'static str, value: f64| {
            if (0.0..=1.0).contains(&value) {
                Ok(())
            } else {
                Err(ConfigError::InvalidThreshold {
                    name,
                    value: value.to_string(),
                })
            }
        };
        unit("spike_confidence", t.spike_confidence)?;
        unit("no_issue_confidence", t.no_issue_confidence)?;
        if t.spike_multiplier <= 1.0 {
            return Err(ConfigError::InvalidThreshold {
                name: "spike_multiplier",
                value: t.spike_multiplier.to_string(),
            });
        }
        if !(t.medium_count <= t.high_count && t.high_count <= t.critical_count) {
            return Err(ConfigError::InvalidThreshold {
                name: "severity counts",
                value: format!("{}/{}/{}", t.medium_count, t.high_count, t.critical_count),
            });
        }

        if config.cache.shards == 0 {
            return Err(ConfigError::InvalidShards(config.cache.shards));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }
        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }
        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidLogRotation(config.logging.rotation.clone()));
        }

        for pattern in &config.custom_patterns {
            let name = pattern.category.trim();
            if name.is_empty() {
                return Err(ConfigError::InvalidCustomPattern(
                    pattern.category.clone(),
                    "category name cannot be empty".to_string(),
                ));
            }
            if !matches!(ChangeCategory::from(name.to_string()), ChangeCategory::Custom(_)) {
                return Err(ConfigError::InvalidCustomPattern(
                    name.to_string(),
                    "name collides with a built-in category".to_string(),
                ));
            }
            if pattern.keywords.iter().all(|k| k.trim().is_empty()) {
                return Err(ConfigError::InvalidCustomPattern(
                    name.to_string(),
                    "at least one keyword is required".to_string(),
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{CustomPatternConfig, QuerySyntax, QueryTier};
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.investigation.default_max_queries, 5);
        assert_eq!(config.investigation.hard_max_queries, 10);
        assert_eq!(config.backend.timeout_secs, 30);
        assert_eq!(config.cache.shards, 16);
        assert_eq!(config.logging.level, "info");
        ConfigLoader::validate(&config).expect("Default config should be valid");
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r"
backend:
  endpoint: https://logs.example.com
  tier: archive
  syntax: lucene
  result_limit: 500
rate_limit:
  requests_per_second: 2
investigation:
  default_max_queries: 3
  thresholds:
    group_error_threshold: 25
cache:
  ttl_secs: 60
custom_patterns:
  - category: kafka
    keywords: [topic, partition]
";

        let config: Config = serde_yaml::from_str(yaml).expect("YAML should parse");

        assert_eq!(config.backend.endpoint, "https://logs.example.com");
        assert_eq!(config.backend.tier, QueryTier::Archive);
        assert_eq!(config.backend.syntax, QuerySyntax::Lucene);
        assert_eq!(config.backend.result_limit, 500);
        assert_eq!(config.backend.timeout_secs, 30);
        assert_eq!(config.rate_limit.requests_per_second, 2);
        assert_eq!(config.rate_limit.burst_size, 10);
        assert_eq!(config.investigation.default_max_queries, 3);
        assert_eq!(config.investigation.thresholds.group_error_threshold, 25);
        assert_eq!(config.investigation.thresholds.recurring_min, 3);
        assert_eq!(config.cache.ttl_secs, 60);
        assert_eq!(config.custom_patterns[0].keywords, vec!["topic", "partition"]);

        ConfigLoader::validate(&config).expect("Parsed config should be valid");
    }

    #[test]
    fn test_validate_zero_timeout() {
        let mut config = Config::default();
        config.backend.timeout_secs = 0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidTimeout(0))
        ));
    }

    #[test]
    fn test_validate_query_bounds() {
        let mut config = Config::default();
        config.investigation.hard_max_queries = 11;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidHardMaxQueries(11))
        ));

        let mut config = Config::default();
        config.investigation.default_max_queries = 8;
        config.investigation.hard_max_queries = 6;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidQueryBounds(8, 6))
        ));
    }

    #[test]
    fn test_validate_thresholds() {
        let mut config = Config::default();
        config.investigation.thresholds.spike_confidence = 1.5;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidThreshold { name: "spike_confidence", .. })
        ));

        let mut config = Config::default();
        config.investigation.thresholds.high_count = 500;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidThreshold { name: "severity counts", .. })
        ));
    }

    #[test]
    fn test_validate_zero_rate_limit() {
        let mut config = Config::default();
        config.rate_limit.requests_per_second = 0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidRateLimit(0))
        ));
    }

    #[test]
    fn test_validate_invalid_log_format() {
        let mut config = Config::default();
        config.logging.format = "xml".to_string();
        match ConfigLoader::validate(&config).unwrap_err() {
            ConfigError::InvalidLogFormat(format) => assert_eq!(format, "xml"),
            other => panic!("Expected InvalidLogFormat error, got {other}"),
        }
    }

    #[test]
    fn test_validate_custom_pattern_collision() {
        let mut config = Config::default();
        config.custom_patterns.push(CustomPatternConfig {
            category: "deployment".to_string(),
            keywords: vec!["ship".to_string()],
        });
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidCustomPattern(..))
        ));
    }

    #[test]
    fn test_hierarchical_merging() {
        let mut base_file = NamedTempFile::new().unwrap();
        writeln!(
            base_file,
            "backend:\n  endpoint: https://base.example.com\n  timeout_secs: 20\nlogging:\n  level: info\n  format: json"
        )
        .unwrap();
        base_file.flush().unwrap();

        let mut override_file = NamedTempFile::new().unwrap();
        writeln!(override_file, "backend:\n  timeout_secs: 45\nlogging:\n  level: debug").unwrap();
        override_file.flush().unwrap();

        let config: Config = ConfigLoader::base()
            .merge(Yaml::file(base_file.path()))
            .merge(Yaml::file(override_file.path()))
            .extract()
            .unwrap();

        assert_eq!(config.backend.timeout_secs, 45, "Override should win");
        assert_eq!(config.backend.endpoint, "https://base.example.com");
        assert_eq!(config.logging.level, "debug", "Override should win for nested fields");
        assert_eq!(config.logging.format, "json", "Base value should persist when not overridden");
    }

    #[test]
    fn test_env_override() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "backend:\n  endpoint: https://file.example.com").unwrap();
        file.flush().unwrap();

        temp_env::with_vars(
            [
                ("LOGSLEUTH_BACKEND__ENDPOINT", Some("https://env.example.com")),
                ("LOGSLEUTH_INVESTIGATION__DEFAULT_MAX_QUERIES", Some("7")),
            ],
            || {
                let config = ConfigLoader::load_from_file(file.path()).unwrap();
                assert_eq!(config.backend.endpoint, "https://env.example.com");
                assert_eq!(config.investigation.default_max_queries, 7);
            },
        );
    }

    #[test]
    fn test_env_override_is_validated() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "logging:\n  level: info").unwrap();
        file.flush().unwrap();
        temp_env::with_var("LOGSLEUTH_BACKEND__TIMEOUT_SECS", Some("0"), || {
            assert!(ConfigLoader::load_from_file(file.path()).is_err());
        });
    }
}

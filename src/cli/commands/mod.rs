//! Command handlers.
//!
//! Each handler builds the services it needs from the loaded [`Config`],
//! runs one operation, and renders the result through
//! [`output`](crate::cli::output::output).

pub mod correlate;
pub mod investigate;
pub mod patterns;

pub use correlate::CorrelateArgs;
pub use investigate::InvestigateArgs;
pub use patterns::PatternsArgs;

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::adapters::{HttpQueryExecutor, ScriptedQueryExecutor};
use crate::domain::models::{ChangeCategory, Config};
use crate::domain::ports::QueryExecutor;
use crate::services::PatternRegistry;

/// Build the executor for a command: the HTTP backend, or an executor that
/// answers every query with no rows when `dry_run` is set.
pub fn build_executor(config: &Config, dry_run: bool) -> Result<Arc<dyn QueryExecutor>> {
    if dry_run {
        tracing::info!("Dry run: queries are planned but not sent");
        return Ok(Arc::new(ScriptedQueryExecutor::new()));
    }
    let executor = HttpQueryExecutor::new(&config.backend, &config.rate_limit)
        .context("Failed to create the query backend client")?;
    Ok(Arc::new(executor))
}

/// Pattern registry with the configured custom categories registered.
pub fn build_registry(config: &Config) -> Result<Arc<PatternRegistry>> {
    let registry = PatternRegistry::new();
    for pattern in &config.custom_patterns {
        registry
            .register_category(ChangeCategory::from(pattern.category.clone()), &pattern.keywords)
            .with_context(|| format!("Failed to register custom pattern '{}'", pattern.category))?;
    }
    Ok(Arc::new(registry))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::CustomPatternConfig;

    #[test]
    fn test_build_registry_registers_custom_patterns() {
        let config = Config {
            custom_patterns: vec![CustomPatternConfig {
                category: "kafka".to_string(),
                keywords: vec!["topic".to_string(), "partition".to_string()],
            }],
            ..Config::default()
        };
        let registry = build_registry(&config).unwrap();
        assert_eq!(
            registry.classify_category("Increased partition count on orders topic"),
            Some(ChangeCategory::Custom("kafka".to_string()))
        );
    }

    #[test]
    fn test_build_registry_rejects_empty_keywords() {
        let config = Config {
            custom_patterns: vec![CustomPatternConfig {
                category: "kafka".to_string(),
                keywords: vec![],
            }],
            ..Config::default()
        };
        assert!(build_registry(&config).is_err());
    }

    #[test]
    fn test_dry_run_executor() {
        let executor = build_executor(&Config::default(), true).unwrap();
        assert_eq!(executor.name(), "scripted");
    }
}

//! Pattern registry: change categories and risk tiers mapped to keyword sets.
//!
//! The registry is shared across concurrent correlations and can be changed at
//! runtime. Writers build a fresh [`PatternTables`] and swap it in under the
//! write lock; readers take an `Arc` snapshot, so a reader never observes a
//! half-applied registration.

use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, info};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{ChangeCategory, RiskTier};

const DEPLOYMENT_KEYWORDS: &[&str] = &[
    "deploy", "release", "rollout", "rollback", "rolled back", "new version", "helm", "canary",
    "image tag",
];
const CONFIG_KEYWORDS: &[&str] = &[
    "config", "setting", "parameter", "environment variable", "env var", "properties",
];
const IAM_KEYWORDS: &[&str] = &[
    "iam", "role", "policy", "permission", "access key", "assumerole", "grant", "rbac",
];
const SCALING_KEYWORDS: &[&str] = &[
    "scale", "scaling", "autoscal", "replica", "desired capacity", "hpa",
];
const NETWORK_KEYWORDS: &[&str] = &[
    "security group", "firewall", "dns", "route", "vpc", "subnet", "load balancer", "ingress",
    "network acl",
];
const SECRET_KEYWORDS: &[&str] = &[
    "secret", "credential", "certificate", "api key", "kms", "vault", "rotate",
];
const DATABASE_KEYWORDS: &[&str] = &[
    "migration", "schema", "database", "alter table", "rds", "index",
];
const INFRASTRUCTURE_KEYWORDS: &[&str] = &[
    "terraform", "cloudformation", "instance", "node", "provision", "stack update",
];
const FEATURE_FLAG_KEYWORDS: &[&str] = &[
    "feature flag", "feature toggle", "flag", "toggle", "launchdarkly", "experiment",
];

const CRITICAL_KEYWORDS: &[&str] = &[
    "production", "prod", "delete", "drop", "destroy", "terminate", "root", "admin",
    "0.0.0.0/0", "revoke",
];
const HIGH_KEYWORDS: &[&str] = &[
    "iam", "policy", "permission", "secret", "credential", "certificate", "security group",
    "firewall", "migration", "schema", "rollback",
];
const MEDIUM_KEYWORDS: &[&str] = &[
    "deploy", "release", "config", "scale", "update", "modify", "change", "flag",
];

/// Verbs that mark an event as change-shaped when no category matched.
const GENERIC_CHANGE_VERBS: &[&str] = &[
    "updated", "created", "deleted", "enabled", "disabled", "modified", "changed", "applied",
    "rolled", "patched", "removed", "added",
];

/// Immutable snapshot of the registry contents.
#[derive(Debug, Clone, Default)]
pub struct PatternTables {
    /// Ordered: first match wins.
    categories: Vec<(ChangeCategory, Vec<String>)>,
    /// Ordered critical, high, medium.
    risk: Vec<(RiskTier, Vec<String>)>,
}

impl PatternTables {
    /// Built-in tables.
    pub fn builtin() -> Self {
        let categories = ChangeCategory::BUILTIN
            .iter()
            .map(|category| (category.clone(), to_owned(builtin_keywords(category))))
            .collect();
        let risk = vec![
            (RiskTier::Critical, to_owned(CRITICAL_KEYWORDS)),
            (RiskTier::High, to_owned(HIGH_KEYWORDS)),
            (RiskTier::Medium, to_owned(MEDIUM_KEYWORDS)),
        ];
        Self { categories, risk }
    }

    /// Category of a change message, or `None` when it is not change-shaped.
    pub fn classify_category(&self, message: &str) -> Option<ChangeCategory> {
        let text = message.to_lowercase();
        for (category, keywords) in &self.categories {
            if keywords.iter().any(|k| contains_term(&text, k)) {
                return Some(category.clone());
            }
        }
        GENERIC_CHANGE_VERBS
            .iter()
            .any(|verb| contains_term(&text, verb))
            .then_some(ChangeCategory::Other)
    }

    /// Risk tier of a change message; `Low` when nothing matches.
    pub fn classify_risk(&self, message: &str) -> RiskTier {
        let text = message.to_lowercase();
        self.risk
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| contains_term(&text, k)))
            .map_or(RiskTier::Low, |(tier, _)| *tier)
    }

    pub fn categories(&self) -> impl Iterator<Item = (&ChangeCategory, &[String])> {
        self.categories.iter().map(|(c, k)| (c, k.as_slice()))
    }

    pub fn risk_keywords(&self, tier: RiskTier) -> &[String] {
        self.risk
            .iter()
            .find(|(t, _)| *t == tier)
            .map(|(_, k)| k.as_slice())
            .unwrap_or(&[])
    }

    pub fn has_category(&self, category: &ChangeCategory) -> bool {
        *category == ChangeCategory::Other || self.categories.iter().any(|(c, _)| c == category)
    }

    /// Terms for a broad search of change-shaped events: every category
    /// keyword followed by the generic change verbs.
    pub fn search_terms(&self) -> Vec<String> {
        let mut terms = self.all_category_keywords();
        for verb in GENERIC_CHANGE_VERBS {
            if !terms.iter().any(|t| t == verb) {
                terms.push((*verb).to_string());
            }
        }
        terms
    }

    /// Every category keyword, deduplicated, in table order.
    pub fn all_category_keywords(&self) -> Vec<String> {
        let mut all: Vec<String> = Vec::new();
        for (_, keywords) in &self.categories {
            for keyword in keywords {
                if !all.contains(keyword) {
                    all.push(keyword.clone());
                }
            }
        }
        all
    }
}

fn builtin_keywords(category: &ChangeCategory) -> &'static [&'static str] {
    match category {
        ChangeCategory::Deployment => DEPLOYMENT_KEYWORDS,
        ChangeCategory::Config => CONFIG_KEYWORDS,
        ChangeCategory::Iam => IAM_KEYWORDS,
        ChangeCategory::Scaling => SCALING_KEYWORDS,
        ChangeCategory::Network => NETWORK_KEYWORDS,
        ChangeCategory::Secret => SECRET_KEYWORDS,
        ChangeCategory::Database => DATABASE_KEYWORDS,
        ChangeCategory::Infrastructure => INFRASTRUCTURE_KEYWORDS,
        ChangeCategory::FeatureFlag => FEATURE_FLAG_KEYWORDS,
        ChangeCategory::Other | ChangeCategory::Custom(_) => &[],
    }
}

fn to_owned(keywords: &[&str]) -> Vec<String> {
    keywords.iter().map(|k| (*k).to_string()).collect()
}

fn normalize_keywords(keywords: &[String]) -> Vec<String> {
    keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect()
}

/// Whether `term` occurs in `text` starting at a word boundary.
///
/// Only the start is anchored so that "deploy" matches "deployed" while
/// "iam" does not match "diamond".
fn contains_term(text: &str, term: &str) -> bool {
    text.match_indices(term).any(|(idx, _)| {
        text[..idx]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric())
    })
}

/// Process-wide, runtime-mutable pattern registry.
///
/// Construct one explicitly and share it behind an `Arc`; tests build
/// isolated instances.
#[derive(Debug)]
pub struct PatternRegistry {
    tables: RwLock<Arc<PatternTables>>,
}

impl Default for PatternRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternRegistry {
    /// Registry seeded with the built-in tables.
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Arc::new(PatternTables::builtin())),
        }
    }

    /// Current snapshot. Cheap: clones an `Arc`.
    pub fn snapshot(&self) -> Arc<PatternTables> {
        self.tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn update(&self, apply: impl FnOnce(&mut PatternTables)) {
        let mut guard = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = (**guard).clone();
        apply(&mut next);
        *guard = Arc::new(next);
    }

    /// Register keywords for a category.
    ///
    /// Keywords for an existing category are appended. A new category is
    /// checked before the built-in ones, so custom categories can carve
    /// specific changes out of broader built-in matches.
    pub fn register_category(&self, category: ChangeCategory, keywords: &[String]) -> DomainResult<()> {
        if category == ChangeCategory::Other {
            return Err(DomainError::InvalidInput(
                "'other' is reserved for generic change verbs".to_string(),
            ));
        }
        let keywords = normalize_keywords(keywords);
        if keywords.is_empty() {
            return Err(DomainError::InvalidInput(format!(
                "category '{category}' needs at least one keyword"
            )));
        }

        info!(category = %category, keywords = keywords.len(), "Registering change pattern");
        self.update(|tables| {
            if let Some((_, existing)) = tables.categories.iter_mut().find(|(c, _)| *c == category) {
                for keyword in keywords {
                    if !existing.contains(&keyword) {
                        existing.push(keyword);
                    }
                }
            } else {
                tables.categories.insert(0, (category, keywords));
            }
        });
        Ok(())
    }

    /// Add keywords to a risk tier. `Low` is the default tier and takes none.
    pub fn register_risk_keywords(&self, tier: RiskTier, keywords: &[String]) -> DomainResult<()> {
        if tier == RiskTier::Low {
            return Err(DomainError::InvalidInput(
                "low is the default risk tier and cannot hold keywords".to_string(),
            ));
        }
        let keywords = normalize_keywords(keywords);
        debug!(tier = %tier, keywords = keywords.len(), "Registering risk keywords");
        self.update(|tables| {
            if let Some((_, existing)) = tables.risk.iter_mut().find(|(t, _)| *t == tier) {
                for keyword in keywords {
                    if !existing.contains(&keyword) {
                        existing.push(keyword);
                    }
                }
            }
        });
        Ok(())
    }

    /// Restore the built-in tables, dropping every runtime registration.
    pub fn reset(&self) {
        info!("Resetting pattern registry to built-in tables");
        self.update(|tables| *tables = PatternTables::builtin());
    }

    pub fn classify_category(&self, message: &str) -> Option<ChangeCategory> {
        self.snapshot().classify_category(message)
    }

    pub fn classify_risk(&self, message: &str) -> RiskTier {
        self.snapshot().classify_risk(message)
    }
}

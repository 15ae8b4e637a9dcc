//! Implementation of the `logsleuth patterns` command.

use anyhow::Result;
use clap::{Args, Subcommand};
use serde::Serialize;

use crate::cli::commands::build_registry;
use crate::cli::display::{colorize_risk, list_table, render_list, section};
use crate::cli::output::{output, truncate, CommandOutput};
use crate::domain::models::{ChangeCategory, Config, RiskTier};
use crate::services::PatternTables;

#[derive(Args, Debug)]
pub struct PatternsArgs {
    #[command(subcommand)]
    pub command: PatternsCommand,
}

#[derive(Subcommand, Debug)]
pub enum PatternsCommand {
    /// List change categories and risk keywords, including configured custom patterns
    List,

    /// Show how a log message would be classified
    Classify {
        /// Message text to classify
        message: String,
    },
}

#[derive(Debug, Serialize)]
pub struct CategoryPatterns {
    pub category: ChangeCategory,
    pub keywords: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct RiskPatterns {
    pub tier: RiskTier,
    pub keywords: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct PatternListOutput {
    pub categories: Vec<CategoryPatterns>,
    pub risk: Vec<RiskPatterns>,
}

impl PatternListOutput {
    pub fn from_tables(tables: &PatternTables) -> Self {
        Self {
            categories: tables
                .categories()
                .map(|(category, keywords)| CategoryPatterns {
                    category: category.clone(),
                    keywords: keywords.to_vec(),
                })
                .collect(),
            risk: [RiskTier::Critical, RiskTier::High, RiskTier::Medium]
                .into_iter()
                .map(|tier| RiskPatterns {
                    tier,
                    keywords: tables.risk_keywords(tier).to_vec(),
                })
                .collect(),
        }
    }
}

impl CommandOutput for PatternListOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["category", "keywords"]);
        for entry in &self.categories {
            table.add_row(vec![entry.category.to_string(), truncate(&entry.keywords.join(", "), 90)]);
        }
        let mut lines = vec![render_list("category", &table, self.categories.len())];

        lines.push(section("Risk keywords"));
        for entry in &self.risk {
            lines.push(format!("  {:<8} {}", colorize_risk(entry.tier), entry.keywords.join(", ")));
        }
        lines.push("  low      (default)".to_string());
        lines.join("\n")
    }
}

#[derive(Debug, Serialize)]
pub struct ClassifyOutput {
    pub message: String,
    pub category: Option<ChangeCategory>,
    pub risk: RiskTier,
}

impl CommandOutput for ClassifyOutput {
    fn to_human(&self) -> String {
        match &self.category {
            Some(category) => format!(
                "Category: {category}\nRisk:     {}",
                colorize_risk(self.risk)
            ),
            None => "Not a change event.".to_string(),
        }
    }
}

pub fn execute(args: PatternsArgs, config: &Config, json_mode: bool) -> Result<()> {
    let registry = build_registry(config)?;
    match args.command {
        PatternsCommand::List => {
            output(&PatternListOutput::from_tables(&registry.snapshot()), json_mode);
        }
        PatternsCommand::Classify { message } => {
            let tables = registry.snapshot();
            let category = tables.classify_category(&message);
            let risk = tables.classify_risk(&message);
            output(&ClassifyOutput { message, category, risk }, json_mode);
        }
    }
    Ok(())
}

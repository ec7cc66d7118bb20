//! Catalog and backend listing commands

use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use fuseprobe_catalog::{RuleCatalog, RuleTemplate};
use fuseprobe_common::FuseProbeConfig;
use serde::Serialize;

use super::CommandContext;

/// List the rules a filter selects
#[derive(Debug, Parser)]
pub struct RulesCommand {
    /// Category or rule-name prefix; repeatable (defaults to `ruletest.enabled`)
    #[arg(short, long = "filter", value_name = "ENTRY")]
    pub filter: Vec<String>,

    /// List every rule in the catalog, in prerequisite order
    #[arg(long, conflicts_with = "filter")]
    pub all: bool,
}

impl RulesCommand {
    pub fn execute(&self, ctx: &CommandContext, config: &FuseProbeConfig) -> Result<()> {
        let catalog = RuleCatalog::from_config(&config.ruletest).context("invalid rule catalog")?;
        let rules: Vec<&RuleTemplate> = if self.all {
            catalog.topological_order().iter().filter_map(|name| catalog.get(name)).collect()
        } else {
            let filter: &[String] =
                if self.filter.is_empty() { &config.ruletest.enabled } else { &self.filter };
            catalog.list_rules(filter).context("failed to select rules")?
        };

        ctx.output.emit_result(&rules, |rules| {
            for rule in rules {
                let mut line = format!(
                    "{:<24} {:<12} {} -> {}",
                    style(&rule.name).bold(),
                    rule.category,
                    rule.op_a,
                    rule.op_b
                );
                if !rule.prerequisites.is_empty() {
                    line.push_str(&format!("  (after {})", rule.prerequisites.join(", ")));
                }
                println!("{line}");
            }
        })
    }
}

#[derive(Debug, Serialize)]
struct BackendEntry<'a> {
    name: &'a str,
    description: &'a str,
    selected: bool,
}

/// List the registered profiling backends
#[derive(Debug, Parser)]
pub struct BackendsCommand {}

impl BackendsCommand {
    pub fn execute(&self, ctx: &CommandContext, config: &FuseProbeConfig) -> Result<()> {
        let entries: Vec<BackendEntry<'_>> = ctx
            .registry
            .list()
            .into_iter()
            .map(|(name, description)| BackendEntry {
                name,
                description,
                selected: name == config.backend.name,
            })
            .collect();

        ctx.output.emit_result(&entries, |entries| {
            for e in entries {
                let marker = if e.selected { style("*").green().bold() } else { style(" ") };
                println!("{marker} {:<12} {}", e.name, style(e.description).dim());
            }
        })
    }
}

/// Check that the configured backend can reach its device
#[derive(Debug, Parser)]
pub struct ConnectCommand {}

impl ConnectCommand {
    pub fn execute(&self, ctx: &CommandContext, config: &FuseProbeConfig) -> Result<()> {
        let name = &config.backend.name;
        ctx.registry
            .connect(&config.backend)
            .with_context(|| format!("failed to connect to backend `{name}`"))?;
        ctx.output.status(&format!("{} backend `{name}`", style("Connected").green().bold()));
        Ok(())
    }
}

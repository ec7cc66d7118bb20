//! Test-case generation command

use anyhow::Result;
use clap::Parser;
use console::style;
use fuseprobe_common::FuseProbeConfig;
use fuseprobe_testcase::{GenerationReport, SkipReason};
use indexmap::IndexMap;
use serde::Serialize;

use super::CommandContext;
use crate::pipeline;

/// Generate opA / opB / block models for the selected rules
#[derive(Debug, Parser)]
pub struct GenerateCommand {
    /// Category or rule-name prefix; repeatable (defaults to `ruletest.enabled`)
    #[arg(short, long = "filter", value_name = "ENTRY")]
    pub filter: Vec<String>,
}

/// Serialized form of a generation run.
#[derive(Debug, Serialize)]
pub(super) struct GenerationSummary<'a> {
    generated: Vec<&'a str>,
    skipped: &'a IndexMap<String, SkipReason>,
}

impl<'a> GenerationSummary<'a> {
    pub(super) fn new(report: &'a GenerationReport) -> Self {
        Self { generated: report.test_cases.keys().map(String::as_str).collect(), skipped: &report.skipped }
    }

    pub(super) fn print(&self) {
        println!(
            "{} {} test cases, {} skipped",
            style("Generated").green().bold(),
            self.generated.len(),
            self.skipped.len()
        );
        for (rule, reason) in self.skipped {
            println!("  {} {rule}: {reason}", style("skipped").yellow());
        }
    }
}

impl GenerateCommand {
    pub fn execute(&self, ctx: &CommandContext, config: &FuseProbeConfig) -> Result<()> {
        let report = pipeline::generate(&ctx.workspace, config, &self.filter)?;
        ctx.output.emit_result(&GenerationSummary::new(&report), |s| s.print())
    }
}

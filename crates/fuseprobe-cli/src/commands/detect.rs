//! Fusion detection command

use anyhow::Result;
use clap::Parser;
use console::style;
use fuseprobe_common::FuseProbeConfig;
use fuseprobe_detect::{DetectionReport, RuleOutcome, RuleStatus};

use super::CommandContext;
use crate::pipeline;

/// Decide which rules the backend fuses
#[derive(Debug, Parser)]
pub struct DetectCommand {}

impl DetectCommand {
    pub fn execute(&self, ctx: &CommandContext, config: &FuseProbeConfig) -> Result<()> {
        let report = pipeline::detect(&ctx.workspace, config)?;
        ctx.output.status(&format!("Wrote {}", ctx.workspace.detected_rules().display()));
        ctx.output.emit_result(&report, print_detection)
    }
}

pub(super) fn styled_status(status: RuleStatus) -> console::StyledObject<&'static str> {
    let s = style(status.as_str());
    match status {
        RuleStatus::Fused => s.green().bold(),
        RuleStatus::NotFused => s,
        RuleStatus::NotApplicable | RuleStatus::Indeterminate => s.yellow(),
        RuleStatus::Failed => s.red(),
    }
}

pub(super) fn print_detection(report: &DetectionReport) {
    for (rule, outcome) in &report.outcomes {
        let detail = match outcome {
            RuleOutcome::Fused(v) | RuleOutcome::NotFused(v) => {
                format!("margin {:+.4} ms at eps {}", v.margin, v.eps)
            }
            RuleOutcome::NotApplicable { blocked_by } => format!("blocked by {}", blocked_by.join(", ")),
            RuleOutcome::Indeterminate { reason } | RuleOutcome::Failed { reason } => reason.clone(),
        };
        println!("{:<28} {:<16} {}", rule, styled_status(outcome.status()).to_string(), style(detail).dim());
    }

    let counts = report.counts();
    println!(
        "{}: {} fused, {} not fused, {} not applicable, {} indeterminate, {} failed",
        style("Summary").bold(),
        counts.fused,
        counts.not_fused,
        counts.not_applicable,
        counts.indeterminate,
        counts.failed
    );
}

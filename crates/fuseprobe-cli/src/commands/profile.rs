//! Profiling and full-pipeline commands

use anyhow::Result;
use clap::Parser;
use console::style;
use fuseprobe_common::FuseProbeConfig;
use fuseprobe_profiler::{ProfileProgress, ProfileReport};
use serde::Serialize;

use super::detect::print_detection;
use super::generate::GenerationSummary;
use super::CommandContext;
use crate::pipeline::{self, ProgressFn};

/// Profile every generated model that has no latency yet
#[derive(Debug, Parser)]
pub struct ProfileCommand {
    /// Do not print a line per profiled model
    #[arg(long)]
    pub no_progress: bool,
}

impl ProfileCommand {
    pub fn execute(&self, ctx: &CommandContext, config: &FuseProbeConfig) -> Result<()> {
        let progress = progress_printer(ctx, self.no_progress);
        let report = pipeline::profile(&ctx.workspace, config, &ctx.registry, progress)?;
        ctx.output.emit_result(&report, print_profile)
    }
}

/// Generate, profile and detect in one go
#[derive(Debug, Parser)]
pub struct RunCommand {
    /// Category or rule-name prefix; repeatable (defaults to `ruletest.enabled`)
    #[arg(short, long = "filter", value_name = "ENTRY")]
    pub filter: Vec<String>,

    /// Do not print a line per profiled model
    #[arg(long)]
    pub no_progress: bool,
}

#[derive(Serialize)]
struct RunOutput<'a> {
    generation: GenerationSummary<'a>,
    profile: &'a ProfileReport,
    detection: &'a fuseprobe_detect::DetectionReport,
}

impl RunCommand {
    pub fn execute(&self, ctx: &CommandContext, config: &FuseProbeConfig) -> Result<()> {
        let progress = progress_printer(ctx, self.no_progress);
        let summary = pipeline::run(&ctx.workspace, config, &ctx.registry, &self.filter, progress)?;
        let output = RunOutput {
            generation: GenerationSummary::new(&summary.generation),
            profile: &summary.profile,
            detection: &summary.detection,
        };
        ctx.output.emit_result(&output, |out| {
            out.generation.print();
            print_profile(out.profile);
            print_detection(out.detection);
        })
    }
}

fn progress_printer(ctx: &CommandContext, disabled: bool) -> Option<ProgressFn> {
    if disabled || !ctx.output.show_progress() {
        return None;
    }
    Some(Box::new(|p: ProfileProgress| {
        eprintln!(
            "{} {} {}",
            style(format!("[{}/{}]", p.step + 1, p.total)).dim(),
            p.rule,
            style(p.role).cyan()
        );
    }))
}

fn print_profile(report: &ProfileReport) {
    println!(
        "{} {} models in {:.1}s ({} reused, {} failed)",
        style("Profiled").green().bold(),
        report.profiled,
        report.elapsed.as_secs_f64(),
        report.skipped,
        report.failed
    );
    for (rule, failures) in report.failed_rules() {
        for (role, reason) in failures {
            println!("  {} {rule} {role}: {reason}", style("failed").red());
        }
    }
}

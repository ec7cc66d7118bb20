//! Workspace status command

use anyhow::Result;
use clap::Parser;
use console::style;

use super::detect::styled_status;
use super::CommandContext;
use crate::pipeline;

/// Show how far each rule has progressed
#[derive(Debug, Parser)]
pub struct StatusCommand {}

impl StatusCommand {
    pub fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let states = pipeline::status(&ctx.workspace)?;
        ctx.output.emit_result(&states, |states| {
            if states.is_empty() {
                println!("No test cases yet; run `fuseprobe generate`.");
                return;
            }
            for state in states {
                let stage = match state.stage {
                    Some(stage) => format!("{stage:?}").to_lowercase(),
                    None => "skipped".to_string(),
                };
                let status = state.status.map(|s| styled_status(s).to_string()).unwrap_or_default();
                println!("{:<28} {:<10} {}", state.rule, style(stage).cyan(), status);
            }
        })
    }
}

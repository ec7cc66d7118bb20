//! Workspace initialization

use anyhow::Result;
use clap::Parser;
use console::style;

use super::CommandContext;

/// Create a workspace with a default `fuseprobe.toml`
#[derive(Debug, Parser)]
pub struct CreateCommand {
    /// Overwrite an existing config file
    #[arg(long)]
    pub force: bool,
}

impl CreateCommand {
    pub fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let ws = &ctx.workspace;
        let written = ws.create(self.force)?;
        if written {
            ctx.output.status(&format!(
                "{} workspace at {}",
                style("Created").green().bold(),
                ws.root().display()
            ));
        } else {
            ctx.output.status(&format!(
                "{} {} already exists; pass --force to overwrite",
                style("Kept").yellow().bold(),
                ws.config_path().display()
            ));
        }
        Ok(())
    }
}

//! CLI subcommands.

mod create;
mod detect;
mod generate;
mod profile;
mod rules;
mod status;

pub use create::CreateCommand;
pub use detect::DetectCommand;
pub use generate::GenerateCommand;
pub use profile::{ProfileCommand, RunCommand};
pub use rules::{BackendsCommand, ConnectCommand, RulesCommand};
pub use status::StatusCommand;

use fuseprobe_profiler::BackendRegistry;

use crate::output::OutputConfig;
use crate::workspace::Workspace;

/// State shared by every subcommand.
pub struct CommandContext {
    pub workspace: Workspace,
    pub output: OutputConfig,
    pub registry: BackendRegistry,
}

impl CommandContext {
    pub fn new(workspace: Workspace, output: OutputConfig) -> Self {
        Self { workspace, output, registry: BackendRegistry::with_builtin() }
    }
}

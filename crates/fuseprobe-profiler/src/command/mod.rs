//! The `command` backend.
//!
//! Profiling is split the usual way: a runner that executes the
//! device-side tool and a parser that turns its output into a
//! [`ProfileSample`]. The configured `args` may contain `{model}` and
//! `{shapes}`, replaced per call with the artifact path and the input shapes
//! (`28x28x16,28x28x16`).

mod parser;
mod runner;

use std::path::Path;
use std::time::Duration;

use fuseprobe_common::{format_shapes, BackendConfig, ProfileError, Shape};

pub use parser::parse_latency_output;
pub use runner::CommandRunner;

use crate::profiler::{ProfileSample, Profiler};

/// Profiles by running an external command per model.
#[derive(Debug, Clone)]
pub struct CommandProfiler {
    program: String,
    args: Vec<String>,
    connection_check: Option<CommandRunner>,
}

impl CommandProfiler {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self { program: program.into(), args, connection_check: None }
    }

    pub fn with_connection_check(mut self, runner: CommandRunner) -> Self {
        self.connection_check = Some(runner);
        self
    }

    /// Build from `[backend]`; `command` is required.
    pub fn from_config(config: &BackendConfig) -> Result<Self, ProfileError> {
        let program = config.command.clone().ok_or_else(|| {
            ProfileError::Misconfigured("backend.command must be set for the command backend".into())
        })?;
        let mut profiler = Self::new(program, config.args.clone());
        if let Some((check, args)) = config.connection_check.split_first() {
            profiler = profiler.with_connection_check(CommandRunner::new(check.clone(), args.to_vec()));
        }
        Ok(profiler)
    }

    /// The runner for one model, placeholders substituted.
    pub fn runner_for(&self, artifact: &Path, shapes: &[Shape]) -> CommandRunner {
        let model = artifact.display().to_string();
        let shapes = format_shapes(shapes);
        let args = self
            .args
            .iter()
            .map(|a| a.replace("{model}", &model).replace("{shapes}", &shapes))
            .collect();
        CommandRunner::new(self.program.clone(), args)
    }
}

impl Profiler for CommandProfiler {
    fn name(&self) -> &str {
        "command"
    }

    fn check_connection(&mut self, timeout: Duration) -> Result<(), ProfileError> {
        match &self.connection_check {
            Some(runner) => runner.run(timeout).map(|_| ()),
            None => Ok(()),
        }
    }

    fn profile(
        &mut self,
        artifact: &Path,
        shapes: &[Shape],
        timeout: Duration,
    ) -> Result<ProfileSample, ProfileError> {
        let runner = self.runner_for(artifact, shapes);
        tracing::debug!(program = runner.program(), args = ?runner.args(), "running profiler command");
        let output = runner.run(timeout)?;
        parse_latency_output(&output)
    }
}

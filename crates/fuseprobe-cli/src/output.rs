//! Output configuration for CLI commands.
//!
//! - `--format json` emits machine-readable JSON to stdout
//! - `--quiet` suppresses status messages and progress

use serde::Serialize;
use std::io::Write;

/// Output format for CLI commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text (default).
    #[default]
    Text,
    /// Machine-readable JSON.
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown format '{other}'. Expected one of: text, json")),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Global output configuration derived from CLI flags.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub quiet: bool,
}

impl OutputConfig {
    /// Whether progress lines should be drawn.
    pub fn show_progress(&self) -> bool {
        !self.quiet && self.format == OutputFormat::Text
    }

    /// Print a status message (suppressed in quiet mode and JSON mode).
    pub fn status(&self, msg: &str) {
        if self.quiet || self.format == OutputFormat::Json {
            return;
        }
        eprintln!("{}", msg);
    }

    /// Emit a final result value. In JSON mode it is serialized to stdout;
    /// in text mode `text_fn` is called to render human output.
    pub fn emit_result<T: Serialize>(&self, value: &T, text_fn: impl FnOnce(&T)) -> anyhow::Result<()> {
        match self.format {
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(value)?;
                let mut stdout = std::io::stdout().lock();
                writeln!(stdout, "{json}")?;
            }
            OutputFormat::Text => text_fn(value),
        }
        Ok(())
    }
}

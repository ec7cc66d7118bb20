//! fuseprobe CLI library
//!
//! Exposes the workspace layout, the pipeline stages and the subcommands so
//! they can be driven from tests without spawning the binary.

pub mod commands;
pub mod exit;
pub mod output;
pub mod pipeline;
pub mod workspace;

pub use workspace::Workspace;

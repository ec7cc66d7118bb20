//! Fusion Decision Engine.
//!
//! Two ops are judged fused when the block runs meaningfully faster than the
//! two ops run separately:
//!
//! ```text
//! latency(block) < (latency(opA) + latency(opB)) * (1 - eps)
//! ```
//!
//! Rules are decided in prerequisite order, and a rule is only decided when
//! every prerequisite was judged fused.

pub mod detector;
pub mod report;
pub mod verdict;

pub use detector::Detector;
pub use report::{DetectionReport, StatusCounts};
pub use verdict::{FusionVerdict, RoleLatencies, RuleOutcome, RuleStatus};

//! Verdicts and per-rule outcomes.

use std::fmt;

use fuseprobe_common::LatencyObservation;
use serde::{Deserialize, Serialize};

/// The three latencies a verdict was computed from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoleLatencies {
    #[serde(rename = "opA")]
    pub op_a: LatencyObservation,
    #[serde(rename = "opB")]
    pub op_b: LatencyObservation,
    pub block: LatencyObservation,
}

/// Decision for one rule. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusionVerdict {
    pub fused: bool,
    pub eps: f64,
    /// `(opA + opB) * (1 - eps)`, in milliseconds.
    pub threshold: f64,
    /// `threshold - block`; positive when fused.
    pub margin: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency: Option<RoleLatencies>,
}

impl FusionVerdict {
    /// Apply the decision rule to three latencies.
    pub fn decide(latency: RoleLatencies, eps: f64) -> Self {
        let threshold = (latency.op_a.mean + latency.op_b.mean) * (1.0 - eps);
        let block = latency.block.mean;
        Self { fused: block < threshold, eps, threshold, margin: threshold - block, latency: Some(latency) }
    }

    /// Drop the latencies from the serialized form.
    pub fn without_latency(mut self) -> Self {
        self.latency = None;
        self
    }
}

/// Outcome of one rule, serialized with a `status` tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum RuleOutcome {
    Fused(FusionVerdict),
    NotFused(FusionVerdict),
    /// A prerequisite was not judged fused, or was never evaluated.
    NotApplicable { blocked_by: Vec<String> },
    /// The data cannot support a decision (missing or zero latency).
    Indeterminate { reason: String },
    /// Generation or profiling failed for this rule.
    Failed { reason: String },
}

impl RuleOutcome {
    pub fn from_verdict(verdict: FusionVerdict) -> Self {
        if verdict.fused {
            RuleOutcome::Fused(verdict)
        } else {
            RuleOutcome::NotFused(verdict)
        }
    }

    pub fn status(&self) -> RuleStatus {
        match self {
            RuleOutcome::Fused(_) => RuleStatus::Fused,
            RuleOutcome::NotFused(_) => RuleStatus::NotFused,
            RuleOutcome::NotApplicable { .. } => RuleStatus::NotApplicable,
            RuleOutcome::Indeterminate { .. } => RuleStatus::Indeterminate,
            RuleOutcome::Failed { .. } => RuleStatus::Failed,
        }
    }

    pub fn verdict(&self) -> Option<&FusionVerdict> {
        match self {
            RuleOutcome::Fused(v) | RuleOutcome::NotFused(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_fused(&self) -> bool {
        matches!(self, RuleOutcome::Fused(_))
    }
}

/// The status tag alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleStatus {
    Fused,
    NotFused,
    NotApplicable,
    Indeterminate,
    Failed,
}

impl RuleStatus {
    pub const ALL: [RuleStatus; 5] = [
        RuleStatus::Fused,
        RuleStatus::NotFused,
        RuleStatus::NotApplicable,
        RuleStatus::Indeterminate,
        RuleStatus::Failed,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            RuleStatus::Fused => "fused",
            RuleStatus::NotFused => "not-fused",
            RuleStatus::NotApplicable => "not-applicable",
            RuleStatus::Indeterminate => "indeterminate",
            RuleStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for RuleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lat(a: f64, b: f64, block: f64) -> RoleLatencies {
        RoleLatencies {
            op_a: LatencyObservation::new(a, 0.0),
            op_b: LatencyObservation::new(b, 0.0),
            block: LatencyObservation::new(block, 0.0),
        }
    }

    #[test]
    fn test_block_above_threshold_is_not_fused() {
        let v = FusionVerdict::decide(lat(40.0, 2.0, 41.0), 0.5);
        assert!(!v.fused);
        assert_eq!(v.threshold, 21.0);
        assert_eq!(v.margin, -20.0);

        let v = FusionVerdict::decide(lat(40.0, 2.0, 41.0), 0.05);
        assert!(!v.fused);
        assert!((v.threshold - 39.9).abs() < 1e-9);
    }

    #[test]
    fn test_block_below_threshold_is_fused() {
        let v = FusionVerdict::decide(lat(40.0, 2.0, 20.0), 0.5);
        assert!(v.fused);
        assert_eq!(v.margin, 1.0);
    }

    #[test]
    fn test_block_equal_to_threshold_is_not_fused() {
        assert!(!FusionVerdict::decide(lat(40.0, 2.0, 21.0), 0.5).fused);
    }

    #[test]
    fn test_outcome_tags() {
        let fused = RuleOutcome::from_verdict(FusionVerdict::decide(lat(40.0, 2.0, 20.0), 0.5));
        let json = serde_json::to_value(&fused).unwrap();
        assert_eq!(json["status"], "fused");
        assert_eq!(json["latency"]["opA"], "40 +- 0");

        let na = RuleOutcome::NotApplicable { blocked_by: vec!["BF_conv_bn".into()] };
        let json = serde_json::to_value(&na).unwrap();
        assert_eq!(json["status"], "not-applicable");
        assert_eq!(serde_json::from_value::<RuleOutcome>(json).unwrap(), na);

        for status in RuleStatus::ALL {
            assert_eq!(serde_json::to_value(status).unwrap(), status.as_str());
        }
    }
}

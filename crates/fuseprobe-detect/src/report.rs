//! The detection artifact and its status summary.

use fuseprobe_testcase::{SkipReason, Stage, TestCaseSpec};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::verdict::{RuleOutcome, RuleStatus};

/// Outcome of every rule, keyed by rule name. Serializes as a plain map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DetectionReport {
    pub outcomes: IndexMap<String, RuleOutcome>,
}

/// Number of rules per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct StatusCounts {
    pub fused: usize,
    pub not_fused: usize,
    pub not_applicable: usize,
    pub indeterminate: usize,
    pub failed: usize,
}

impl StatusCounts {
    pub fn get(&self, status: RuleStatus) -> usize {
        match status {
            RuleStatus::Fused => self.fused,
            RuleStatus::NotFused => self.not_fused,
            RuleStatus::NotApplicable => self.not_applicable,
            RuleStatus::Indeterminate => self.indeterminate,
            RuleStatus::Failed => self.failed,
        }
    }

    pub fn total(&self) -> usize {
        RuleStatus::ALL.iter().map(|&s| self.get(s)).sum()
    }
}

impl DetectionReport {
    pub fn get(&self, rule: &str) -> Option<&RuleOutcome> {
        self.outcomes.get(rule)
    }

    pub fn status(&self, rule: &str) -> Option<RuleStatus> {
        self.get(rule).map(RuleOutcome::status)
    }

    pub fn counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for outcome in self.outcomes.values() {
            let slot = match outcome.status() {
                RuleStatus::Fused => &mut counts.fused,
                RuleStatus::NotFused => &mut counts.not_fused,
                RuleStatus::NotApplicable => &mut counts.not_applicable,
                RuleStatus::Indeterminate => &mut counts.indeterminate,
                RuleStatus::Failed => &mut counts.failed,
            };
            *slot += 1;
        }
        counts
    }

    /// Record rules whose latest generation failed as `failed`.
    ///
    /// The failure replaces any outcome decided from an older test case.
    pub fn merge_generation_failures(&mut self, skipped: &IndexMap<String, SkipReason>) {
        for (rule, reason) in skipped {
            self.outcomes.insert(rule.clone(), RuleOutcome::Failed { reason: reason.to_string() });
        }
    }

    /// Where `case` stands in the pipeline.
    pub fn stage_of(&self, rule: &str, case: &TestCaseSpec) -> Stage {
        if self.outcomes.contains_key(rule) {
            Stage::Decided
        } else {
            case.stage()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fuseprobe_testcase::Role;

    #[test]
    fn test_generation_failures_are_reported_as_failed() {
        let mut report = DetectionReport::default();
        report.outcomes.insert("a".into(), RuleOutcome::Indeterminate { reason: "x".into() });

        let mut skipped = IndexMap::new();
        skipped.insert(
            "b".to_string(),
            SkipReason::ShapeMismatch { role: Role::OpB, message: "dense needs rank 1".into() },
        );
        skipped.insert("a".to_string(), SkipReason::ModelBuild { role: Role::OpA, message: "x".into() });
        report.merge_generation_failures(&skipped);

        assert_eq!(report.get("a"), Some(&RuleOutcome::Failed { reason: "model build failed for opA: x".into() }));
        assert_eq!(report.status("b"), Some(RuleStatus::Failed));
        let counts = report.counts();
        assert_eq!((counts.failed, counts.indeterminate, counts.total()), (2, 0, 2));
    }
}

//! Deciding every rule of a profiled test-case set.

use fuseprobe_catalog::{prerequisite_order, EPS_PARAM};
use fuseprobe_common::CatalogError;
use fuseprobe_testcase::{Role, TestCaseSpec, TestCases};
use indexmap::IndexMap;

use crate::report::DetectionReport;
use crate::verdict::{FusionVerdict, RoleLatencies, RuleOutcome};

/// Applies the fusion decision rule in prerequisite order.
#[derive(Debug, Clone, Copy)]
pub struct Detector {
    default_eps: f64,
    detail: bool,
}

impl Detector {
    /// `default_eps` applies to rules without their own `eps` parameter.
    pub fn new(default_eps: f64) -> Self {
        Self { default_eps, detail: true }
    }

    /// Keep the three latencies on each verdict.
    pub fn with_detail(mut self, detail: bool) -> Self {
        self.detail = detail;
        self
    }

    /// Decide every rule in `cases`.
    ///
    /// Fails only when the recorded prerequisites form a cycle. Outcomes are
    /// listed in the order of `cases`.
    pub fn detect(&self, cases: &TestCases) -> Result<DetectionReport, CatalogError> {
        let nodes: Vec<(&str, &[String])> =
            cases.iter().map(|(name, c)| (name.as_str(), c.prerequisites.as_slice())).collect();
        let order = prerequisite_order(&nodes)?;
        tracing::info!(rules = cases.len(), default_eps = self.default_eps, "detecting fusion rules");

        let mut decided: IndexMap<&str, RuleOutcome> = IndexMap::with_capacity(cases.len());
        for name in order {
            let Some(case) = cases.get(name) else { continue };
            let blocked_by: Vec<String> = case
                .prerequisites
                .iter()
                .filter(|p| !decided.get(p.as_str()).is_some_and(RuleOutcome::is_fused))
                .cloned()
                .collect();

            let outcome = if blocked_by.is_empty() {
                self.evaluate(case)
            } else {
                RuleOutcome::NotApplicable { blocked_by }
            };
            tracing::debug!(rule = name, status = %outcome.status(), "rule decided");
            decided.insert(name, outcome);
        }

        let mut report = DetectionReport::default();
        for name in cases.keys() {
            if let Some(outcome) = decided.swap_remove(name.as_str()) {
                report.outcomes.insert(name.clone(), outcome);
            }
        }

        let counts = report.counts();
        tracing::info!(
            fused = counts.fused,
            not_fused = counts.not_fused,
            not_applicable = counts.not_applicable,
            indeterminate = counts.indeterminate,
            failed = counts.failed,
            "fusion rule detection finished"
        );
        Ok(report)
    }

    /// Decide one rule whose prerequisites all fired.
    pub fn evaluate(&self, case: &TestCaseSpec) -> RuleOutcome {
        let failures = case.failures();
        if !failures.is_empty() {
            let reason = failures
                .iter()
                .map(|(role, err)| format!("{role}: {err}"))
                .collect::<Vec<_>>()
                .join("; ");
            return RuleOutcome::Failed { reason };
        }

        let mut missing = Vec::new();
        let mut latency = |role: Role| {
            let obs = case.model(role).latency;
            if obs.is_none() {
                missing.push(role.as_str());
            }
            obs
        };
        let (op_a, op_b, block) = (latency(Role::OpA), latency(Role::OpB), latency(Role::Block));
        let (Some(op_a), Some(op_b), Some(block)) = (op_a, op_b, block) else {
            return RuleOutcome::Indeterminate {
                reason: format!("no latency for {}", missing.join(", ")),
            };
        };

        for (role, obs) in [(Role::OpA, op_a), (Role::OpB, op_b)] {
            if obs.mean <= 0.0 {
                return RuleOutcome::Indeterminate {
                    reason: format!("{role} latency is {}", obs.mean),
                };
            }
        }

        let eps = case.params.get(EPS_PARAM).copied().unwrap_or(self.default_eps);
        if !(0.0..1.0).contains(&eps) {
            return RuleOutcome::Failed { reason: format!("eps {eps} is outside [0, 1)") };
        }

        let verdict = FusionVerdict::decide(RoleLatencies { op_a, op_b, block }, eps);
        RuleOutcome::from_verdict(if self.detail { verdict } else { verdict.without_latency() })
    }
}

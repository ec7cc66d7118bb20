//! The test-case artifact.
//!
//! Serialized form of one rule:
//!
//! ```json
//! { "opA":   { "model": "...", "shapes": [[28, 28, 16]], "latency": "1.2 +- 0.1", "op": {...} },
//!   "opB":   { ... },
//!   "block": { ... },
//!   "prerequisites": ["BF_conv_bn"] }
//! ```
//!
//! `model`, `shapes` and `latency` are the stable keys other tooling reads.
//! The rest is additive and skipped when empty.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use fuseprobe_common::{LatencyObservation, Shape};
use fuseprobe_ops::ModelRecipe;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Test cases keyed by rule name, in catalog order.
pub type TestCases = IndexMap<String, TestCaseSpec>;

/// Which of the three models of a test case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "opA")]
    OpA,
    #[serde(rename = "opB")]
    OpB,
    #[serde(rename = "block")]
    Block,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::OpA, Role::OpB, Role::Block];

    pub const fn as_str(self) -> &'static str {
        match self {
            Role::OpA => "opA",
            Role::OpB => "opB",
            Role::Block => "block",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pipeline stage a test case has reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Generated,
    Profiled,
    Decided,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Generated => write!(f, "generated"),
            Stage::Profiled => write!(f, "profiled"),
            Stage::Decided => write!(f, "decided"),
        }
    }
}

/// One model of a test case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Artifact location, fixed at generation time.
    pub model: PathBuf,
    /// Input shapes, one per input tensor.
    pub shapes: Vec<Shape>,
    /// Present only after a successful profiling call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency: Option<LatencyObservation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub samples: Option<u32>,
    /// Last profiling failure. Cleared when a later call succeeds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// How the model was constructed.
    pub op: ModelRecipe,
}

impl ModelSpec {
    pub fn new(model: PathBuf, shapes: Vec<Shape>, op: ModelRecipe) -> Self {
        Self { model, shapes, latency: None, samples: None, error: None, op }
    }

    pub fn is_profiled(&self) -> bool {
        self.latency.is_some()
    }

    pub fn is_failed(&self) -> bool {
        self.latency.is_none() && self.error.is_some()
    }

    /// Same artifact, shapes and construction as `other`.
    pub fn same_model(&self, other: &ModelSpec) -> bool {
        self.model == other.model && self.shapes == other.shapes && self.op == other.op
    }
}

/// The three models that test one fusion rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCaseSpec {
    #[serde(rename = "opA")]
    pub op_a: ModelSpec,
    #[serde(rename = "opB")]
    pub op_b: ModelSpec,
    pub block: ModelSpec,
    /// Rules that must be judged fused before this one is decided.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prerequisites: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, f64>,
}

impl TestCaseSpec {
    pub fn model(&self, role: Role) -> &ModelSpec {
        match role {
            Role::OpA => &self.op_a,
            Role::OpB => &self.op_b,
            Role::Block => &self.block,
        }
    }

    pub fn model_mut(&mut self, role: Role) -> &mut ModelSpec {
        match role {
            Role::OpA => &mut self.op_a,
            Role::OpB => &mut self.op_b,
            Role::Block => &mut self.block,
        }
    }

    pub fn models(&self) -> impl Iterator<Item = (Role, &ModelSpec)> {
        Role::ALL.into_iter().map(move |r| (r, self.model(r)))
    }

    /// `Profiled` once every model carries a latency.
    pub fn stage(&self) -> Stage {
        if self.models().all(|(_, m)| m.is_profiled()) {
            Stage::Profiled
        } else {
            Stage::Generated
        }
    }

    /// Roles whose last profiling call failed, with the recorded reason.
    pub fn failures(&self) -> Vec<(Role, &str)> {
        self.models()
            .filter(|(_, m)| m.is_failed())
            .filter_map(|(r, m)| m.error.as_deref().map(|e| (r, e)))
            .collect()
    }

    /// Copy latencies from `previous` for models that did not change.
    ///
    /// Returns how many models were carried over.
    pub fn adopt_measurements(&mut self, previous: &TestCaseSpec) -> usize {
        let mut adopted = 0;
        for role in Role::ALL {
            let old = previous.model(role);
            let new = self.model_mut(role);
            if new.latency.is_none() && old.latency.is_some() && new.same_model(old) {
                new.latency = old.latency;
                new.samples = old.samples;
                new.error = None;
                adopted += 1;
            }
        }
        adopted
    }
}

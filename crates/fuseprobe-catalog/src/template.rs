//! Rule templates.

use std::collections::BTreeMap;

use fuseprobe_common::OpOverrides;
use fuseprobe_ops::OpChain;
use serde::{Deserialize, Serialize};

/// Rule parameter holding the decision tolerance.
pub const EPS_PARAM: &str = "eps";

/// One fusion rule: two op chains, the rules that must fire first, and
/// rule-specific parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleTemplate {
    pub name: String,
    pub category: String,
    pub op_a: OpChain,
    pub op_b: OpChain,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prerequisites: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, f64>,
    #[serde(default)]
    pub overrides: OpOverrides,
}

impl RuleTemplate {
    pub fn new(
        name: impl Into<String>,
        category: impl Into<String>,
        op_a: OpChain,
        op_b: OpChain,
    ) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            op_a,
            op_b,
            prerequisites: Vec::new(),
            params: BTreeMap::new(),
            overrides: OpOverrides::default(),
        }
    }

    pub fn with_prerequisite(mut self, name: impl Into<String>) -> Self {
        self.prerequisites.push(name.into());
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: f64) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    pub fn with_overrides(mut self, overrides: OpOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// The rule's own tolerance, if it sets one.
    pub fn eps(&self) -> Option<f64> {
        self.params.get(EPS_PARAM).copied()
    }

    /// Whether a filter entry selects this template: the entry equals the
    /// category or is a prefix of the name.
    pub fn matches(&self, entry: &str) -> bool {
        self.category == entry || self.name.starts_with(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fuseprobe_ops::OpKind;

    fn conv_relu() -> RuleTemplate {
        RuleTemplate::new(
            "BF_conv_relu",
            "BasicFusion",
            OpChain::single(OpKind::Conv),
            OpChain::single(OpKind::Relu),
        )
    }

    #[test]
    fn test_matches_category_or_prefix() {
        let t = conv_relu();
        assert!(t.matches("BasicFusion"));
        assert!(t.matches("BF_conv"));
        assert!(t.matches("BF_conv_relu"));
        assert!(!t.matches("Basic"));
        assert!(!t.matches("CF_"));
    }

    #[test]
    fn test_eps_param() {
        assert_eq!(conv_relu().eps(), None);
        assert_eq!(conv_relu().with_param(EPS_PARAM, 0.2).eps(), Some(0.2));
    }

    #[test]
    fn test_serde_skips_empty_fields() {
        let json = serde_json::to_value(conv_relu()).unwrap();
        assert_eq!(json["op_a"], serde_json::json!(["conv"]));
        assert!(json.get("prerequisites").is_none());
        assert!(json.get("params").is_none());
    }
}

//! The validated rule catalog.

use fuseprobe_common::{CatalogError, RuleTestConfig};
use indexmap::IndexMap;

use crate::builtin::builtin_templates;
use crate::order::prerequisite_order;
use crate::template::{RuleTemplate, EPS_PARAM};

/// Rule templates in declaration order, checked for consistency.
#[derive(Debug, Clone)]
pub struct RuleCatalog {
    templates: IndexMap<String, RuleTemplate>,
    order: Vec<String>,
}

impl RuleCatalog {
    /// Validate `templates` and build the catalog.
    ///
    /// Fails on duplicate names, prerequisites naming unknown rules,
    /// non-finite parameters, `eps` outside `[0, 1)`, or a prerequisite
    /// cycle.
    pub fn new(templates: Vec<RuleTemplate>) -> Result<Self, CatalogError> {
        let mut by_name: IndexMap<String, RuleTemplate> = IndexMap::with_capacity(templates.len());
        for template in templates {
            validate_template(&template)?;
            if by_name.contains_key(&template.name) {
                return Err(CatalogError::DuplicateRule { name: template.name });
            }
            by_name.insert(template.name.clone(), template);
        }

        for template in by_name.values() {
            if let Some(missing) = template.prerequisites.iter().find(|p| !by_name.contains_key(*p)) {
                return Err(CatalogError::UnknownRule {
                    name: missing.clone(),
                    referenced_by: template.name.clone(),
                });
            }
        }

        let nodes: Vec<(&str, &[String])> =
            by_name.values().map(|t| (t.name.as_str(), t.prerequisites.as_slice())).collect();
        let order = prerequisite_order(&nodes)?.into_iter().map(str::to_string).collect();

        tracing::debug!(rules = by_name.len(), "rule catalog built");
        Ok(Self { templates: by_name, order })
    }

    /// Built-in rule families plus user-declared rules from `[ruletest]`.
    pub fn from_config(config: &RuleTestConfig) -> Result<Self, CatalogError> {
        Self::new(builtin_templates(config)?)
    }

    /// Templates selected by `filter`, in declaration order.
    ///
    /// Each entry matches by category or name prefix. An entry that matches
    /// nothing is an error; an empty filter selects nothing.
    pub fn list_rules<S: AsRef<str>>(&self, filter: &[S]) -> Result<Vec<&RuleTemplate>, CatalogError> {
        for entry in filter {
            let entry = entry.as_ref();
            if !self.templates.values().any(|t| t.matches(entry)) {
                return Err(CatalogError::UnknownCategory { entry: entry.to_string() });
            }
        }
        Ok(self
            .templates
            .values()
            .filter(|t| filter.iter().any(|e| t.matches(e.as_ref())))
            .collect())
    }

    /// Rule names with every prerequisite before its dependents.
    pub fn topological_order(&self) -> &[String] {
        &self.order
    }

    pub fn get(&self, name: &str) -> Option<&RuleTemplate> {
        self.templates.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RuleTemplate> {
        self.templates.values()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

fn validate_template(template: &RuleTemplate) -> Result<(), CatalogError> {
    let invalid = |reason: &str| CatalogError::InvalidTemplate {
        name: template.name.clone(),
        reason: reason.to_string(),
    };
    if template.name.trim().is_empty() {
        return Err(invalid("rule name cannot be empty"));
    }
    if template.name.contains(['/', '\\']) {
        return Err(invalid("rule name cannot contain path separators"));
    }
    if template.op_a.is_empty() || template.op_b.is_empty() {
        return Err(invalid("both op sides need at least one operator"));
    }

    for (key, &value) in &template.params {
        let reason = if !value.is_finite() {
            Some("must be finite")
        } else if key == EPS_PARAM && !(0.0..1.0).contains(&value) {
            Some("must lie in [0, 1)")
        } else {
            None
        };
        if let Some(reason) = reason {
            return Err(CatalogError::InvalidParam {
                rule: template.name.clone(),
                key: key.clone(),
                value: value.to_string(),
                reason: reason.to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fuseprobe_ops::{OpChain, OpKind};

    fn rule(name: &str, category: &str) -> RuleTemplate {
        RuleTemplate::new(name, category, OpChain::single(OpKind::Conv), OpChain::single(OpKind::Relu))
    }

    fn names(templates: &[&RuleTemplate]) -> Vec<String> {
        templates.iter().map(|t| t.name.clone()).collect()
    }

    #[test]
    fn test_cyclic_catalog_is_rejected() {
        let err = RuleCatalog::new(vec![
            rule("X", "Custom").with_prerequisite("Y"),
            rule("Y", "Custom").with_prerequisite("X"),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            CatalogError::CyclicRule { cycle: vec!["X".into(), "Y".into(), "X".into()] }
        );
    }

    #[test]
    fn test_duplicate_names() {
        let err = RuleCatalog::new(vec![rule("A", "c"), rule("A", "c")]).unwrap_err();
        assert_eq!(err, CatalogError::DuplicateRule { name: "A".into() });
    }

    #[test]
    fn test_unknown_prerequisite() {
        let err = RuleCatalog::new(vec![rule("A", "c").with_prerequisite("B")]).unwrap_err();
        assert_eq!(err, CatalogError::UnknownRule { name: "B".into(), referenced_by: "A".into() });
    }

    #[test]
    fn test_rule_names_stay_inside_model_dir() {
        for bad in ["../escape", "a/b", "a\\b"] {
            let err = RuleCatalog::new(vec![rule(bad, "c")]).unwrap_err();
            assert!(matches!(err, CatalogError::InvalidTemplate { .. }), "{bad}");
        }
        assert!(RuleCatalog::new(vec![rule("conv_relu.v2", "c")]).is_ok());
    }

    #[test]
    fn test_eps_range() {
        for bad in [1.0, -0.1, f64::NAN] {
            let err = RuleCatalog::new(vec![rule("A", "c").with_param(EPS_PARAM, bad)]).unwrap_err();
            assert!(matches!(err, CatalogError::InvalidParam { ref key, .. } if key == "eps"));
        }
        assert!(RuleCatalog::new(vec![rule("A", "c").with_param(EPS_PARAM, 0.0)]).is_ok());
    }

    #[test]
    fn test_list_rules_keeps_declaration_order() {
        let catalog = RuleCatalog::new(vec![
            rule("BF_conv_relu", "BasicFusion"),
            rule("CF_conv_bn_relu", "ChainFusion"),
            rule("BF_bn_relu", "BasicFusion"),
        ])
        .unwrap();

        let picked = catalog.list_rules(&["ChainFusion", "BasicFusion"]).unwrap();
        assert_eq!(names(&picked), vec!["BF_conv_relu", "CF_conv_bn_relu", "BF_bn_relu"]);

        let picked = catalog.list_rules(&["BF_bn"]).unwrap();
        assert_eq!(names(&picked), vec!["BF_bn_relu"]);

        assert!(catalog.list_rules::<&str>(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_filter_entry_without_matches() {
        let catalog = RuleCatalog::new(vec![rule("BF_conv_relu", "BasicFusion")]).unwrap();
        assert_eq!(
            catalog.list_rules(&["MultiFusion"]).unwrap_err(),
            CatalogError::UnknownCategory { entry: "MultiFusion".into() }
        );
    }

    #[test]
    fn test_topological_order() {
        let catalog = RuleCatalog::new(vec![
            rule("C", "c").with_prerequisite("B"),
            rule("A", "c"),
            rule("B", "c").with_prerequisite("A"),
        ])
        .unwrap();
        assert_eq!(catalog.topological_order(), &["A", "B", "C"]);
        assert_eq!(catalog.len(), 3);
        assert!(catalog.get("B").is_some());
    }
}

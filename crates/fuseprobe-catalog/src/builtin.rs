//! Built-in rule registry.
//!
//! Rule families are looked up by category name in [`RuleFamily::ALL`]; each
//! family expands its slice of `[ruletest]` into templates. User rules from
//! `[[ruletest.rules]]` are appended after the families.

use fuseprobe_common::{CatalogError, RuleDecl, RuleTestConfig};
use fuseprobe_ops::{OpChain, OpKind};

use crate::template::RuleTemplate;

pub const BASIC_FUSION: &str = "BasicFusion";
pub const CHAIN_FUSION: &str = "ChainFusion";
/// Category of user-declared rules that do not name one.
pub const CUSTOM: &str = "Custom";

/// A built-in family of rule templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleFamily {
    /// `BF_a_b`: op `a` followed by op `b`.
    Basic,
    /// `CF_a_b_c`: chain `a,b` followed by `c`, gated on `BF_a_b`.
    Chain,
}

impl RuleFamily {
    pub const ALL: [RuleFamily; 2] = [RuleFamily::Basic, RuleFamily::Chain];

    pub const fn category(self) -> &'static str {
        match self {
            RuleFamily::Basic => BASIC_FUSION,
            RuleFamily::Chain => CHAIN_FUSION,
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            RuleFamily::Basic => "two single operators, from ruletest.basic_testcases",
            RuleFamily::Chain => "two-op chain plus one operator, from ruletest.chain_testcases",
        }
    }

    pub fn from_category(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.category() == name)
    }

    /// Templates this family contributes for `config`.
    pub fn expand(self, config: &RuleTestConfig) -> Result<Vec<RuleTemplate>, CatalogError> {
        match self {
            RuleFamily::Basic => config
                .basic_testcases
                .iter()
                .map(|entry| {
                    let [a, b] = parse_ops::<2>(entry, "ruletest.basic_testcases")?;
                    Ok(RuleTemplate::new(
                        format!("BF_{}_{}", a, b),
                        BASIC_FUSION,
                        OpChain::single(a),
                        OpChain::single(b),
                    ))
                })
                .collect(),
            RuleFamily::Chain => config
                .chain_testcases
                .iter()
                .map(|entry| {
                    let [a, b, c] = parse_ops::<3>(entry, "ruletest.chain_testcases")?;
                    Ok(RuleTemplate::new(
                        format!("CF_{}_{}_{}", a, b, c),
                        CHAIN_FUSION,
                        OpChain::new(vec![a, b]),
                        OpChain::single(c),
                    )
                    .with_prerequisite(format!("BF_{}_{}", a, b)))
                })
                .collect(),
        }
    }
}

/// Every built-in family's templates followed by the user-declared rules.
pub fn builtin_templates(config: &RuleTestConfig) -> Result<Vec<RuleTemplate>, CatalogError> {
    let mut templates = Vec::new();
    for family in RuleFamily::ALL {
        templates.extend(family.expand(config)?);
    }
    for decl in &config.rules {
        templates.push(template_from_decl(decl)?);
    }
    Ok(templates)
}

fn template_from_decl(decl: &RuleDecl) -> Result<RuleTemplate, CatalogError> {
    let chain = |names: &[String]| -> Result<OpChain, CatalogError> {
        names
            .iter()
            .map(|n| parse_op(n, &decl.name))
            .collect::<Result<Vec<_>, _>>()
            .map(OpChain::new)
    };

    let mut template = RuleTemplate::new(
        decl.name.clone(),
        decl.category.clone().unwrap_or_else(|| CUSTOM.to_string()),
        chain(&decl.op_a)?,
        chain(&decl.op_b)?,
    )
    .with_overrides(decl.overrides.clone());
    template.prerequisites = decl.prerequisites.clone();
    template.params = decl.params.clone();
    Ok(template)
}

fn parse_ops<const N: usize>(entry: &str, context: &str) -> Result<[OpKind; N], CatalogError> {
    let parts: Vec<&str> = entry.split('_').collect();
    let parts: [&str; N] = parts.try_into().map_err(|parts: Vec<&str>| {
        CatalogError::InvalidTemplate {
            name: entry.to_string(),
            reason: format!("expected {N} operators joined by `_`, found {}", parts.len()),
        }
    })?;

    let mut ops = [OpKind::Conv; N];
    for (slot, name) in ops.iter_mut().zip(parts) {
        *slot = parse_op(name, context)?;
    }
    Ok(ops)
}

fn parse_op(name: &str, context: &str) -> Result<OpKind, CatalogError> {
    name.parse()
        .map_err(|_| CatalogError::UnknownOp { name: name.to_string(), context: context.to_string() })
}

//! Fusion-rule catalog.
//!
//! A [`RuleCatalog`] is a validated, ordered set of [`RuleTemplate`]s: names
//! are unique, every prerequisite exists, parameters are in range, and the
//! prerequisite graph is acyclic. [`builtin`] expands the `[ruletest]`
//! configuration into templates through a table of rule families.

pub mod builtin;
pub mod catalog;
pub mod order;
pub mod template;

pub use builtin::{builtin_templates, RuleFamily, BASIC_FUSION, CHAIN_FUSION, CUSTOM};
pub use catalog::RuleCatalog;
pub use order::prerequisite_order;
pub use template::{RuleTemplate, EPS_PARAM};

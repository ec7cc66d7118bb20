//! Test cases for fusion rules.
//!
//! [`TestCaseGenerator`] turns rule templates into [`TestCaseSpec`]s, one per
//! rule, each holding the `opA`, `opB` and `block` models. The resulting
//! [`TestCases`] map is the artifact every later stage reads and extends;
//! [`store`] persists it as JSON.

pub mod generator;
pub mod spec;
pub mod store;

pub use generator::{GenerationReport, SkipReason, TestCaseGenerator};
pub use spec::{ModelSpec, Role, Stage, TestCaseSpec, TestCases};
pub use store::{evict_test_cases, load_test_cases, read_json, save_test_cases, write_json};

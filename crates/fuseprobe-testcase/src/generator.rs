//! Test-Case Generator.
//!
//! For each template, in the order given: merge the global `[ruletest]`
//! values with the template's overrides, compose `opA` from the rule's input
//! shape, compose `opB` from `opA`'s output, and compose `block` as `opA`
//! followed by `opB` from the same input. Shape or parameter errors skip the
//! rule and are reported; they never stop the batch.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use fuseprobe_catalog::RuleTemplate;
use fuseprobe_common::{RuleTestConfig, Shape};
use fuseprobe_ops::{ComposeError, ModelBuilder, ModelRecipe, OpHyperParams, RankRequirement};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::spec::{ModelSpec, Role, TestCaseSpec, TestCases};

/// Why a rule produced no test case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SkipReason {
    ShapeMismatch { role: Role, message: String },
    ModelBuild { role: Role, message: String },
}

impl SkipReason {
    fn from_compose(role: Role, err: ComposeError) -> Self {
        match err {
            ComposeError::Shape(e) => SkipReason::ShapeMismatch { role, message: e.to_string() },
            ComposeError::Build(e) => SkipReason::ModelBuild { role, message: e.to_string() },
        }
    }

    pub fn role(&self) -> Role {
        match self {
            SkipReason::ShapeMismatch { role, .. } | SkipReason::ModelBuild { role, .. } => *role,
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::ShapeMismatch { role, message } => {
                write!(f, "shape mismatch in {role}: {message}")
            }
            SkipReason::ModelBuild { role, message } => {
                write!(f, "model build failed for {role}: {message}")
            }
        }
    }
}

/// Output of [`TestCaseGenerator::generate`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationReport {
    pub test_cases: TestCases,
    pub skipped: IndexMap<String, SkipReason>,
}

/// Expands rule templates into test cases.
pub struct TestCaseGenerator<'a> {
    config: &'a RuleTestConfig,
    model_dir: PathBuf,
    builder: Option<&'a dyn ModelBuilder>,
}

impl<'a> TestCaseGenerator<'a> {
    pub fn new(config: &'a RuleTestConfig, model_dir: impl Into<PathBuf>) -> Self {
        Self { config, model_dir: model_dir.into(), builder: None }
    }

    /// Build every model artifact while generating.
    pub fn with_builder(mut self, builder: &'a dyn ModelBuilder) -> Self {
        self.builder = Some(builder);
        self
    }

    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }

    /// Generate one test case per template, keyed by rule name.
    pub fn generate(&self, templates: &[&RuleTemplate]) -> GenerationReport {
        tracing::info!(rules = templates.len(), model_dir = %self.model_dir.display(), "generating test cases");

        let mut report = GenerationReport::default();
        for template in templates {
            match self.generate_one(template) {
                Ok(case) => {
                    report.test_cases.insert(template.name.clone(), case);
                }
                Err(reason) => {
                    tracing::warn!(rule = %template.name, %reason, "rule skipped");
                    report.skipped.insert(template.name.clone(), reason);
                }
            }
        }

        tracing::info!(
            generated = report.test_cases.len(),
            skipped = report.skipped.len(),
            "test case generation finished"
        );
        report
    }

    fn generate_one(&self, template: &RuleTemplate) -> Result<TestCaseSpec, SkipReason> {
        let hp = self.hyper_params(template);
        let input = self.input_shape(template);

        let recipe_a = ModelRecipe::new(input.clone(), template.op_a.descriptors(&hp));
        let out_a = recipe_a
            .compose()
            .map_err(|e| SkipReason::from_compose(Role::OpA, e))?
            .output_shape;
        let recipe_b = ModelRecipe::new(out_a, template.op_b.descriptors(&hp));
        let recipe_block = ModelRecipe::new(input, template.op_a.then(&template.op_b).descriptors(&hp));

        let rule = template.name.as_str();
        let op_a = self.model_spec(rule, Role::OpA, recipe_a)?;
        let op_b = self.model_spec(rule, Role::OpB, recipe_b).map_err(|reason| {
            self.discard(&[&op_a]);
            reason
        })?;
        let block = self.model_spec(rule, Role::Block, recipe_block).map_err(|reason| {
            self.discard(&[&op_a, &op_b]);
            reason
        })?;

        Ok(TestCaseSpec {
            op_a,
            op_b,
            block,
            prerequisites: template.prerequisites.clone(),
            params: template.params.clone(),
        })
    }

    /// Remove artifacts already written for a rule that is being skipped.
    fn discard(&self, built: &[&ModelSpec]) {
        if self.builder.is_none() {
            return;
        }
        for spec in built {
            if let Err(e) = fs::remove_file(&spec.model) {
                tracing::warn!(model = %spec.model.display(), error = %e, "failed to remove partial artifact");
            }
        }
    }

    fn model_spec(&self, rule: &str, role: Role, recipe: ModelRecipe) -> Result<ModelSpec, SkipReason> {
        let path = self.model_dir.join(format!("{rule}_{role}"));
        let (model, shapes) = match self.builder {
            Some(builder) => {
                let built =
                    builder.build(&recipe, &path).map_err(|e| SkipReason::from_compose(role, e))?;
                (built.artifact, built.input_shapes)
            }
            None => {
                let composed = recipe.compose().map_err(|e| SkipReason::from_compose(role, e))?;
                (path, composed.input_shapes)
            }
        };
        tracing::debug!(rule, %role, model = %model.display(), "model spec generated");
        Ok(ModelSpec::new(model, shapes, recipe))
    }

    /// Global hyperparameters with the template's overrides applied.
    fn hyper_params(&self, template: &RuleTemplate) -> OpHyperParams {
        let o = &template.overrides;
        let strides = o.strides.unwrap_or(self.config.strides);
        OpHyperParams {
            kernel_size: o.kernel_size.unwrap_or(self.config.kernel_size),
            strides,
            pool_strides: o.pool_strides.or(self.config.pool_strides).unwrap_or(strides),
            cout: o.cout.or(self.config.cout),
        }
    }

    /// The template's own input shape, else the rank-1 or the image default
    /// depending on what the first op consumes.
    fn input_shape(&self, template: &RuleTemplate) -> Shape {
        if let Some(shape) = &template.overrides.input_shape {
            return shape.clone();
        }
        match template.op_a.first().map(|k| k.rank_requirement()) {
            Some(RankRequirement::Exactly(1)) => self.config.d1_input_shape.clone(),
            _ => self.config.default_input_shape.clone(),
        }
    }
}

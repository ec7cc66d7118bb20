//! Model-builder collaborator.
//!
//! The pipeline only needs "given a recipe, produce a runnable artifact and
//! its input shapes". [`DescriptorModelBuilder`] satisfies that with a JSON
//! model description that backends (and the simulated backend) can load.

use std::fs;
use std::path::{Path, PathBuf};

use fuseprobe_common::{ModelBuildError, Shape};
use serde::{Deserialize, Serialize};

use crate::chain::{ComposeError, ComposedModel, ModelRecipe};

/// Format tag written into every descriptor artifact.
pub const ARTIFACT_FORMAT: &str = "fuseprobe-model/1";

/// A built model artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltModel {
    pub artifact: PathBuf,
    pub input_shapes: Vec<Shape>,
}

/// Turns a recipe into a runnable artifact.
///
/// Implementations must be deterministic for identical recipes and paths.
pub trait ModelBuilder {
    fn build(&self, recipe: &ModelRecipe, artifact: &Path) -> Result<BuiltModel, ComposeError>;
}

/// On-disk form written by [`DescriptorModelBuilder`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format: String,
    pub recipe: ModelRecipe,
    pub model: ComposedModel,
}

impl ModelArtifact {
    pub fn load(path: &Path) -> Result<Self, ModelBuildError> {
        let read_error =
            |reason: String| ModelBuildError::Read { path: path.to_path_buf(), reason };
        let text = fs::read_to_string(path).map_err(|e| read_error(e.to_string()))?;
        serde_json::from_str(&text).map_err(|e| read_error(e.to_string()))
    }
}

/// Writes `<artifact>.json` model descriptors.
#[derive(Debug, Clone, Copy, Default)]
pub struct DescriptorModelBuilder;

impl DescriptorModelBuilder {
    pub fn new() -> Self {
        Self
    }
}

impl ModelBuilder for DescriptorModelBuilder {
    fn build(&self, recipe: &ModelRecipe, artifact: &Path) -> Result<BuiltModel, ComposeError> {
        let model = recipe.compose()?;
        let path = artifact_path(artifact);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| write_error(&path, e))?;
        }

        let input_shapes = model.input_shapes.clone();
        let doc = ModelArtifact { format: ARTIFACT_FORMAT.to_string(), recipe: recipe.clone(), model };
        let text = serde_json::to_string_pretty(&doc).map_err(|e| write_error(&path, e))?;
        fs::write(&path, text).map_err(|e| write_error(&path, e))?;

        tracing::debug!(artifact = %path.display(), layers = recipe.layers.len(), "model built");
        Ok(BuiltModel { artifact: path, input_shapes })
    }
}

/// `<artifact>.json`, appended so dots already in the name survive.
fn artifact_path(artifact: &Path) -> PathBuf {
    let mut path = artifact.as_os_str().to_owned();
    path.push(".json");
    PathBuf::from(path)
}

fn write_error(path: &Path, err: impl std::fmt::Display) -> ModelBuildError {
    ModelBuildError::Write { path: path.to_path_buf(), reason: err.to_string() }
}

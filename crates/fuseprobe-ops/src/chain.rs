//! Operator chains and model composition.
//!
//! Composition follows one wiring rule for every op-kind pair. The model's
//! first input is the primary shape, duplicated when the first op takes two
//! tensors. Every later two-input op consumes the running tensor plus a fresh
//! model input of the running tensor's shape. For a two-op block this gives
//! inputs `[s0] * (1 + two_a) + [out_a] * two_b`, and for op B profiled alone
//! from `out_a` it gives `[out_a] * (1 + two_b)`.

use std::fmt;
use std::str::FromStr;

use fuseprobe_common::{ModelBuildError, Shape, ShapeMismatchError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::descriptor::{OpDescriptor, OpHyperParams};
use crate::op::OpKind;

/// One side of a fusion rule: a single op or a short sequence of ops.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OpChain(Vec<OpKind>);

impl OpChain {
    pub fn new(ops: Vec<OpKind>) -> Self {
        Self(ops)
    }

    pub fn single(op: OpKind) -> Self {
        Self(vec![op])
    }

    pub fn ops(&self) -> &[OpKind] {
        &self.0
    }

    pub fn first(&self) -> Option<OpKind> {
        self.0.first().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Descriptors for every op in the chain.
    pub fn descriptors(&self, hp: &OpHyperParams) -> Vec<OpDescriptor> {
        self.0.iter().map(|&k| OpDescriptor::new(k, hp)).collect()
    }

    /// `self` followed by `other`.
    pub fn then(&self, other: &OpChain) -> OpChain {
        OpChain(self.0.iter().chain(other.0.iter()).copied().collect())
    }
}

impl fmt::Display for OpChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.0.iter().map(|k| k.name()).collect();
        f.write_str(&names.join("+"))
    }
}

/// Parses `conv`, `conv+bn` or `conv,bn`.
impl FromStr for OpChain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ops = s
            .split(['+', ','])
            .filter(|p| !p.trim().is_empty())
            .map(str::parse)
            .collect::<Result<Vec<OpKind>, _>>()?;
        if ops.is_empty() {
            return Err(format!("empty operator chain `{s}`"));
        }
        Ok(Self(ops))
    }
}

/// Failure composing a recipe into a model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComposeError {
    #[error(transparent)]
    Shape(#[from] ShapeMismatchError),

    #[error(transparent)]
    Build(#[from] ModelBuildError),
}

/// What to build: layers applied in order to a primary input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRecipe {
    pub input_shape: Shape,
    pub layers: Vec<OpDescriptor>,
}

/// A layer placed in a composed model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layer {
    pub op: OpDescriptor,
    pub input_shape: Shape,
    pub output_shape: Shape,
    /// Index into the model inputs of the second operand, for two-input ops.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_input: Option<usize>,
}

/// A recipe with shapes threaded through every layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposedModel {
    pub input_shapes: Vec<Shape>,
    pub output_shape: Shape,
    pub layers: Vec<Layer>,
}

impl ModelRecipe {
    pub fn new(input_shape: Shape, layers: Vec<OpDescriptor>) -> Self {
        Self { input_shape, layers }
    }

    /// Validate every layer and thread shapes through the chain.
    pub fn compose(&self) -> Result<ComposedModel, ComposeError> {
        let first = self.layers.first().ok_or(ModelBuildError::Empty)?;
        for op in &self.layers {
            op.validate()?;
        }

        let mut input_shapes = vec![self.input_shape.clone()];
        if first.kind.is_two_input() {
            input_shapes.push(self.input_shape.clone());
        }

        let mut current = self.input_shape.clone();
        let mut layers = Vec::with_capacity(self.layers.len());
        for (i, op) in self.layers.iter().enumerate() {
            let extra_input = match (op.kind.is_two_input(), i) {
                (false, _) => None,
                (true, 0) => Some(1),
                (true, _) => {
                    input_shapes.push(current.clone());
                    Some(input_shapes.len() - 1)
                }
            };
            let output_shape = op.output_shape(&current)?;
            layers.push(Layer {
                op: op.clone(),
                input_shape: current,
                output_shape: output_shape.clone(),
                extra_input,
            });
            current = output_shape;
        }

        Ok(ComposedModel { input_shapes, output_shape: current, layers })
    }
}

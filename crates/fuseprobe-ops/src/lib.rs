//! Operators and minimal models for fusion-rule test cases.
//!
//! An [`OpDescriptor`] is one operator with its resolved hyperparameters.
//! A [`ModelRecipe`] strings descriptors together from a primary input
//! shape; [`ModelRecipe::compose`] threads shapes through the chain and
//! decides the model's input wiring. A [`ModelBuilder`] turns a recipe into
//! an artifact on disk.

pub mod builder;
pub mod chain;
pub mod descriptor;
pub mod op;

pub use builder::{BuiltModel, DescriptorModelBuilder, ModelArtifact, ModelBuilder};
pub use chain::{ComposeError, ComposedModel, Layer, ModelRecipe, OpChain};
pub use descriptor::{OpDescriptor, OpHyperParams};
pub use op::{OpKind, RankRequirement};

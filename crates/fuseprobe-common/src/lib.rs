//! Common types and utilities for fuseprobe
//!
//! This crate provides the foundational types shared by every stage of the
//! fusion-rule pipeline: the error taxonomy, the workspace configuration
//! schema, tensor shapes, and the latency observation with its stable
//! `"<mean> +- <stddev>"` text encoding.

pub mod config;
pub mod error;
pub mod latency;
pub mod shape;

pub use config::*;
pub use error::*;
pub use latency::LatencyObservation;
pub use shape::{format_shapes, num_elements, Shape};

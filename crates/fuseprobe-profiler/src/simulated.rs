//! The `simulated` backend.
//!
//! Reads a descriptor artifact written by `DescriptorModelBuilder` and
//! prices it with a fixed cost model: every kernel launch costs
//! [`LAUNCH_OVERHEAD_MS`], and a kernel pays for its multiply-accumulates,
//! for reading its inputs and for writing its output. Adjacent ops joined by
//! a `fusible` pair run as one kernel: one launch, no intermediate tensors,
//! and the remaining work sped up by [`FUSED_KERNEL_SPEEDUP`]. Results are
//! deterministic so whole pipelines can be exercised without a device.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use fuseprobe_common::{BackendConfig, ProfileError, Shape};
use fuseprobe_ops::{Layer, ModelArtifact, OpKind};

use crate::profiler::{ProfileSample, Profiler};

pub const LAUNCH_OVERHEAD_MS: f64 = 0.05;
/// Fused kernels keep intermediates in registers and schedule better than
/// the ops they replace.
pub const FUSED_KERNEL_SPEEDUP: f64 = 2.5;
const MS_PER_MAC: f64 = 1.0e-8;
const MS_PER_ELEMENT: f64 = 2.0e-6;
/// Relative spread reported as the standard deviation.
const JITTER: f64 = 0.02;

/// Deterministic cost-model profiler.
#[derive(Debug, Clone)]
pub struct SimulatedProfiler {
    fusible: HashSet<(OpKind, OpKind)>,
    samples: u32,
}

impl SimulatedProfiler {
    pub fn new(fusible: impl IntoIterator<Item = (OpKind, OpKind)>, samples: u32) -> Self {
        Self { fusible: fusible.into_iter().collect(), samples }
    }

    /// Build from `[backend]`. Fusible pairs are written `"a_b"`.
    pub fn from_config(config: &BackendConfig) -> Result<Self, ProfileError> {
        let pairs = config
            .fusible
            .iter()
            .map(|entry| {
                let bad = || ProfileError::Misconfigured(format!("invalid fusible pair `{entry}`"));
                let (a, b) = entry.split_once('_').ok_or_else(bad)?;
                let a: OpKind = a.parse().map_err(|_| bad())?;
                let b: OpKind = b.parse().map_err(|_| bad())?;
                Ok((a, b))
            })
            .collect::<Result<Vec<_>, ProfileError>>()?;
        if config.samples == 0 {
            return Err(ProfileError::Misconfigured("backend.samples must be at least 1".into()));
        }
        Ok(Self::new(pairs, config.samples))
    }

    /// Simulated mean latency of a composed model, in milliseconds.
    pub fn estimate(&self, layers: &[Layer]) -> f64 {
        let mut total = 0.0;
        let mut start = 0;
        for end in 1..=layers.len() {
            let joins_next = layers
                .get(end)
                .is_some_and(|next| self.fusible.contains(&(layers[end - 1].op.kind, next.op.kind)));
            if !joins_next {
                total += kernel_ms(&layers[start..end]);
                start = end;
            }
        }
        total
    }
}

/// One kernel running `group`, a non-empty run of fused layers.
fn kernel_ms(group: &[Layer]) -> f64 {
    let (Some(first), Some(last)) = (group.first(), group.last()) else {
        return 0.0;
    };
    let compute: f64 = group.iter().map(compute_ms).sum();
    let second_operands: f64 =
        group[1..].iter().filter(|l| l.extra_input.is_some()).map(|l| elements(&l.input_shape)).sum();
    let traffic = input_elements(first) + second_operands + elements(&last.output_shape);
    let work = compute + traffic * MS_PER_ELEMENT;
    let work = if group.len() > 1 { work / FUSED_KERNEL_SPEEDUP } else { work };
    LAUNCH_OVERHEAD_MS + work
}

fn compute_ms(layer: &Layer) -> f64 {
    let k = layer.op.kernel_size.unwrap_or(1) as f64;
    let out = elements(&layer.output_shape);
    let cin = layer.input_shape.last().copied().unwrap_or(1) as f64;
    let macs = match layer.op.kind {
        OpKind::Conv | OpKind::ConvTrans => out * k * k * cin,
        OpKind::DwConv | OpKind::MaxPool | OpKind::AvgPool => out * k * k,
        OpKind::Dense => out * cin,
        _ => 0.0,
    };
    macs * MS_PER_MAC
}

fn input_elements(layer: &Layer) -> f64 {
    let operands = if layer.extra_input.is_some() { 2.0 } else { 1.0 };
    operands * elements(&layer.input_shape)
}

fn elements(shape: &[usize]) -> f64 {
    shape.iter().map(|&d| d as f64).product()
}

impl Profiler for SimulatedProfiler {
    fn name(&self) -> &str {
        "simulated"
    }

    fn profile(
        &mut self,
        artifact: &Path,
        shapes: &[Shape],
        _timeout: Duration,
    ) -> Result<ProfileSample, ProfileError> {
        let doc = ModelArtifact::load(artifact).map_err(|e| ProfileError::Io(e.to_string()))?;
        if doc.model.input_shapes != shapes {
            return Err(ProfileError::Device(format!(
                "model expects inputs {:?}, got {:?}",
                doc.model.input_shapes, shapes
            )));
        }
        let mean = self.estimate(&doc.model.layers);
        Ok(ProfileSample::new(mean, mean * JITTER, self.samples))
    }
}

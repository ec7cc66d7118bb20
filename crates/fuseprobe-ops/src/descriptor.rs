//! Operator descriptors and per-operator shape inference.

use fuseprobe_common::{num_elements, ModelBuildError, Shape, ShapeMismatchError};
use serde::{Deserialize, Serialize};

use crate::op::OpKind;

/// Hyperparameters after merging global defaults with template overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpHyperParams {
    pub kernel_size: i64,
    pub strides: i64,
    pub pool_strides: i64,
    /// `None` keeps the input channel count.
    pub cout: Option<i64>,
}

impl Default for OpHyperParams {
    fn default() -> Self {
        Self { kernel_size: 3, strides: 1, pool_strides: 1, cout: None }
    }
}

/// One operator with the hyperparameters it actually uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpDescriptor {
    pub kind: OpKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kernel_size: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strides: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cout: Option<i64>,
}

impl OpDescriptor {
    /// Descriptor with no hyperparameters.
    pub const fn bare(kind: OpKind) -> Self {
        Self { kind, kernel_size: None, strides: None, cout: None }
    }

    /// Pick the hyperparameters relevant to `kind` out of `hp`.
    pub fn new(kind: OpKind, hp: &OpHyperParams) -> Self {
        match kind {
            OpKind::Conv | OpKind::ConvTrans => Self {
                kind,
                kernel_size: Some(hp.kernel_size),
                strides: Some(hp.strides),
                cout: hp.cout,
            },
            OpKind::DwConv => Self {
                kind,
                kernel_size: Some(hp.kernel_size),
                strides: Some(hp.strides),
                cout: None,
            },
            OpKind::MaxPool | OpKind::AvgPool => Self {
                kind,
                kernel_size: Some(hp.kernel_size),
                strides: Some(hp.pool_strides),
                cout: None,
            },
            OpKind::Dense => Self { kind, kernel_size: None, strides: None, cout: hp.cout },
            _ => Self::bare(kind),
        }
    }

    /// Reject non-positive hyperparameters.
    pub fn validate(&self) -> Result<(), ModelBuildError> {
        for (param, value) in
            [("kernel_size", self.kernel_size), ("strides", self.strides), ("cout", self.cout)]
        {
            if let Some(v) = value {
                if v <= 0 {
                    return Err(ModelBuildError::InvalidParameter {
                        op: self.kind.to_string(),
                        param: param.to_string(),
                        value: v,
                    });
                }
            }
        }
        Ok(())
    }

    /// Output shape for an input of shape `input`.
    ///
    /// Call [`validate`](Self::validate) first; non-positive strides are
    /// treated as 1 here.
    pub fn output_shape(&self, input: &[usize]) -> Result<Shape, ShapeMismatchError> {
        let req = self.kind.rank_requirement();
        if !req.accepts(input.len()) {
            return Err(self.mismatch(req.to_string(), input));
        }

        let stride = positive(self.strides);
        let channels = |c: usize| self.cout.map_or(c, |v| positive(Some(v)));
        let same_padded = |d: usize| d.saturating_sub(1) / stride + 1;

        let overflow = || self.mismatch("dimensions that fit in memory".to_string(), input);
        let scaled = |d: usize, by: usize| d.checked_mul(by).ok_or_else(overflow);
        let flattened = || num_elements(input).ok_or_else(overflow);

        let shape = match self.kind {
            OpKind::Conv | OpKind::DwConv | OpKind::MaxPool | OpKind::AvgPool => {
                let (h, w, c) = (input[0], input[1], input[2]);
                let c = if self.kind == OpKind::Conv { channels(c) } else { c };
                vec![same_padded(h), same_padded(w), c]
            }
            OpKind::ConvTrans => {
                vec![scaled(input[0], stride)?, scaled(input[1], stride)?, channels(input[2])]
            }
            OpKind::GlobalAvgPool => vec![input[2]],
            OpKind::Dense => vec![channels(input[0])],
            OpKind::Reshape => {
                if input.len() == 3 {
                    vec![input[2], input[0], input[1]]
                } else {
                    vec![1, flattened()?]
                }
            }
            OpKind::Flatten => vec![flattened()?],
            OpKind::Concat => {
                let mut out = input.to_vec();
                if let Some(last) = out.last_mut() {
                    *last = scaled(*last, 2)?;
                }
                out
            }
            OpKind::Split => {
                if input[2] < 2 {
                    return Err(self.mismatch("at least 2 channels".to_string(), input));
                }
                vec![input[0], input[1], input[2] / 2]
            }
            OpKind::Bn
            | OpKind::Se
            | OpKind::Relu
            | OpKind::Relu6
            | OpKind::Sigmoid
            | OpKind::Hswish
            | OpKind::Add => input.to_vec(),
        };
        Ok(shape)
    }

    fn mismatch(&self, expected: String, found: &[usize]) -> ShapeMismatchError {
        ShapeMismatchError { op: self.kind.to_string(), expected, found: found.to_vec() }
    }
}

fn positive(v: Option<i64>) -> usize {
    v.and_then(|v| usize::try_from(v).ok()).filter(|&v| v > 0).unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hp() -> OpHyperParams {
        OpHyperParams { kernel_size: 3, strides: 2, pool_strides: 2, cout: Some(32) }
    }

    #[test]
    fn test_new_keeps_relevant_params_only() {
        let relu = OpDescriptor::new(OpKind::Relu, &hp());
        assert_eq!(relu, OpDescriptor::bare(OpKind::Relu));

        let dw = OpDescriptor::new(OpKind::DwConv, &hp());
        assert_eq!(dw.cout, None);
        assert_eq!(dw.kernel_size, Some(3));

        let dense = OpDescriptor::new(OpKind::Dense, &hp());
        assert_eq!(dense.cout, Some(32));
        assert_eq!(dense.strides, None);
    }

    #[test]
    fn test_conv_output_shape() {
        let conv = OpDescriptor::new(OpKind::Conv, &hp());
        assert_eq!(conv.output_shape(&[28, 28, 16]).unwrap(), vec![14, 14, 32]);
        let conv = OpDescriptor::new(OpKind::Conv, &OpHyperParams::default());
        assert_eq!(conv.output_shape(&[28, 28, 16]).unwrap(), vec![28, 28, 16]);
    }

    #[test]
    fn test_odd_spatial_dims_round_up() {
        let pool = OpDescriptor::new(OpKind::MaxPool, &hp());
        assert_eq!(pool.output_shape(&[7, 7, 8]).unwrap(), vec![4, 4, 8]);
    }

    #[test]
    fn test_shape_changing_ops() {
        let d = |k| OpDescriptor::new(k, &hp());
        assert_eq!(d(OpKind::ConvTrans).output_shape(&[7, 7, 8]).unwrap(), vec![14, 14, 32]);
        assert_eq!(d(OpKind::GlobalAvgPool).output_shape(&[7, 7, 8]).unwrap(), vec![8]);
        assert_eq!(d(OpKind::Reshape).output_shape(&[7, 5, 8]).unwrap(), vec![8, 7, 5]);
        assert_eq!(d(OpKind::Reshape).output_shape(&[428]).unwrap(), vec![1, 428]);
        assert_eq!(d(OpKind::Flatten).output_shape(&[7, 5, 8]).unwrap(), vec![280]);
        assert_eq!(d(OpKind::Concat).output_shape(&[7, 5, 8]).unwrap(), vec![7, 5, 16]);
        assert_eq!(d(OpKind::Split).output_shape(&[7, 5, 8]).unwrap(), vec![7, 5, 4]);
        assert_eq!(d(OpKind::Dense).output_shape(&[428]).unwrap(), vec![32]);
    }

    #[test]
    fn test_rank_mismatch() {
        let dense = OpDescriptor::new(OpKind::Dense, &hp());
        let err = dense.output_shape(&[28, 28, 16]).unwrap_err();
        assert_eq!(err.op, "dense");
        assert_eq!(err.found, vec![28, 28, 16]);

        let conv = OpDescriptor::new(OpKind::Conv, &hp());
        assert!(conv.output_shape(&[428]).is_err());
    }

    #[test]
    fn test_overflowing_dimensions_are_mismatches() {
        let huge = OpHyperParams { strides: i64::MAX / 2, ..hp() };
        let err = OpDescriptor::new(OpKind::ConvTrans, &huge).output_shape(&[28, 28, 16]).unwrap_err();
        assert_eq!(err.op, "convtrans");

        let wide = [4, 4, usize::MAX / 2 + 1];
        assert!(OpDescriptor::bare(OpKind::Concat).output_shape(&wide).is_err());
        assert!(OpDescriptor::bare(OpKind::Flatten).output_shape(&wide).is_err());
        assert!(OpDescriptor::bare(OpKind::Reshape).output_shape(&[usize::MAX, 2]).is_err());
    }

    #[test]
    fn test_split_needs_two_channels() {
        let split = OpDescriptor::bare(OpKind::Split);
        assert!(split.output_shape(&[4, 4, 1]).is_err());
    }

    #[test]
    fn test_validate_rejects_non_positive() {
        let mut conv = OpDescriptor::new(OpKind::Conv, &hp());
        conv.kernel_size = Some(-3);
        assert_eq!(
            conv.validate(),
            Err(ModelBuildError::InvalidParameter {
                op: "conv".to_string(),
                param: "kernel_size".to_string(),
                value: -3,
            })
        );
        conv.kernel_size = Some(3);
        conv.strides = Some(0);
        assert!(conv.validate().is_err());
        assert!(OpDescriptor::bare(OpKind::Relu).validate().is_ok());
    }
}

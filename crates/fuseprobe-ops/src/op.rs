//! Operator kinds.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Operators that can appear in a fusion-rule test case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpKind {
    Conv,
    DwConv,
    ConvTrans,
    Bn,
    MaxPool,
    AvgPool,
    GlobalAvgPool,
    Se,
    Dense,
    Relu,
    Relu6,
    Sigmoid,
    Hswish,
    Reshape,
    Flatten,
    Add,
    Concat,
    Split,
}

/// Tensor rank an operator accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankRequirement {
    Exactly(usize),
    Any,
}

impl RankRequirement {
    pub fn accepts(self, rank: usize) -> bool {
        match self {
            RankRequirement::Exactly(r) => r == rank,
            RankRequirement::Any => rank >= 1,
        }
    }
}

impl fmt::Display for RankRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RankRequirement::Exactly(r) => write!(f, "a rank-{r} tensor"),
            RankRequirement::Any => write!(f, "a tensor of rank >= 1"),
        }
    }
}

impl OpKind {
    pub const ALL: [OpKind; 18] = [
        OpKind::Conv,
        OpKind::DwConv,
        OpKind::ConvTrans,
        OpKind::Bn,
        OpKind::MaxPool,
        OpKind::AvgPool,
        OpKind::GlobalAvgPool,
        OpKind::Se,
        OpKind::Dense,
        OpKind::Relu,
        OpKind::Relu6,
        OpKind::Sigmoid,
        OpKind::Hswish,
        OpKind::Reshape,
        OpKind::Flatten,
        OpKind::Add,
        OpKind::Concat,
        OpKind::Split,
    ];

    /// Config-file name of the operator.
    pub const fn name(self) -> &'static str {
        match self {
            OpKind::Conv => "conv",
            OpKind::DwConv => "dwconv",
            OpKind::ConvTrans => "convtrans",
            OpKind::Bn => "bn",
            OpKind::MaxPool => "maxpool",
            OpKind::AvgPool => "avgpool",
            OpKind::GlobalAvgPool => "globalavgpool",
            OpKind::Se => "se",
            OpKind::Dense => "dense",
            OpKind::Relu => "relu",
            OpKind::Relu6 => "relu6",
            OpKind::Sigmoid => "sigmoid",
            OpKind::Hswish => "hswish",
            OpKind::Reshape => "reshape",
            OpKind::Flatten => "flatten",
            OpKind::Add => "add",
            OpKind::Concat => "concat",
            OpKind::Split => "split",
        }
    }

    /// Operators that consume a second tensor alongside the running one.
    pub const fn is_two_input(self) -> bool {
        matches!(self, OpKind::Add | OpKind::Concat)
    }

    pub const fn rank_requirement(self) -> RankRequirement {
        match self {
            OpKind::Conv
            | OpKind::DwConv
            | OpKind::ConvTrans
            | OpKind::Bn
            | OpKind::MaxPool
            | OpKind::AvgPool
            | OpKind::GlobalAvgPool
            | OpKind::Se
            | OpKind::Split => RankRequirement::Exactly(3),
            OpKind::Dense => RankRequirement::Exactly(1),
            _ => RankRequirement::Any,
        }
    }

    /// Elementwise operators that touch each value once with no reduction.
    pub const fn is_elementwise(self) -> bool {
        matches!(
            self,
            OpKind::Relu | OpKind::Relu6 | OpKind::Sigmoid | OpKind::Hswish | OpKind::Add | OpKind::Bn
        )
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OpKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        if lowered == "fc" {
            return Ok(OpKind::Dense);
        }
        OpKind::ALL
            .iter()
            .copied()
            .find(|k| k.name() == lowered)
            .ok_or_else(|| format!("unknown operator `{s}`"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_roundtrip() {
        for kind in OpKind::ALL {
            assert_eq!(kind.name().parse::<OpKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_parse_aliases_and_case() {
        assert_eq!("FC".parse::<OpKind>().unwrap(), OpKind::Dense);
        assert_eq!(" DwConv ".parse::<OpKind>().unwrap(), OpKind::DwConv);
        assert!("gelu".parse::<OpKind>().is_err());
    }

    #[test]
    fn test_serde_matches_name() {
        for kind in OpKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.name()));
        }
    }

    #[test]
    fn test_two_input_ops() {
        let two: Vec<_> = OpKind::ALL.iter().filter(|k| k.is_two_input()).collect();
        assert_eq!(two, vec![&OpKind::Add, &OpKind::Concat]);
    }

    #[test]
    fn test_rank_requirements() {
        assert!(OpKind::Conv.rank_requirement().accepts(3));
        assert!(!OpKind::Conv.rank_requirement().accepts(1));
        assert!(OpKind::Dense.rank_requirement().accepts(1));
        assert!(!OpKind::Dense.rank_requirement().accepts(3));
        assert!(OpKind::Relu.rank_requirement().accepts(1));
        assert!(OpKind::Relu.rank_requirement().accepts(3));
    }
}

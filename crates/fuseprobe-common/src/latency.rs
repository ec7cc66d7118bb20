//! Latency observations and their text encoding.
//!
//! A [`LatencyObservation`] is the mean and standard deviation of N repeated
//! runs of one model, in milliseconds. It serializes as the string
//! `"<mean> +- <stddev>"`, which other tooling parses. Both numbers are
//! printed with Rust's shortest round-trip float formatting, so
//! `to_string()` followed by `parse()` reproduces the exact `f64` pair.

#![allow(clippy::cast_precision_loss)]

use std::fmt;
use std::ops::{Add, Mul};
use std::str::FromStr;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::LatencyParseError;

const SEPARATOR: &str = "+-";

/// Mean latency and its dispersion, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatencyObservation {
    pub mean: f64,
    pub stddev: f64,
}

impl LatencyObservation {
    pub const fn new(mean: f64, stddev: f64) -> Self {
        Self { mean, stddev }
    }

    /// Mean and population standard deviation of raw samples.
    ///
    /// Returns `None` for an empty slice.
    pub fn from_samples(samples: &[f64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        let n = samples.len() as f64;
        let mean = samples.iter().sum::<f64>() / n;
        let variance = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
        Some(Self { mean, stddev: variance.sqrt() })
    }

    /// Both numbers are finite and non-negative.
    pub fn is_valid(&self) -> bool {
        self.mean.is_finite() && self.stddev.is_finite() && self.mean >= 0.0 && self.stddev >= 0.0
    }
}

impl fmt::Display for LatencyObservation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {SEPARATOR} {}", self.mean, self.stddev)
    }
}

impl FromStr for LatencyObservation {
    type Err = LatencyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = |reason: &str| LatencyParseError { input: s.to_string(), reason: reason.into() };
        let (mean, stddev) =
            s.split_once(SEPARATOR).ok_or_else(|| err("missing `+-` separator"))?;
        let mean = mean.trim().parse::<f64>().map_err(|_| err("mean is not a number"))?;
        let stddev = stddev.trim().parse::<f64>().map_err(|_| err("stddev is not a number"))?;
        Ok(Self { mean, stddev })
    }
}

/// Latencies of independent sequential runs add; deviations add in quadrature.
impl Add for LatencyObservation {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            mean: self.mean + rhs.mean,
            stddev: (self.stddev.powi(2) + rhs.stddev.powi(2)).sqrt(),
        }
    }
}

impl Mul<f64> for LatencyObservation {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self {
        Self { mean: self.mean * rhs, stddev: self.stddev * rhs.abs() }
    }
}

impl Serialize for LatencyObservation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for LatencyObservation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct LatencyVisitor;

        impl Visitor<'_> for LatencyVisitor {
            type Value = LatencyObservation;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a latency string of the form \"<mean> +- <stddev>\"")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                v.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_str(LatencyVisitor)
    }
}

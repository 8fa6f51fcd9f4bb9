//! Indel process of the pair-HMM.
use super::check_time;
use crate::error::{PahmmError, Result};
use serde::{Deserialize, Serialize};

pub const LAMBDA_HI_BOUND: f64 = 0.3;
pub const EPSILON_HI_BOUND: f64 = 0.95;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GapProbabilities {
    pub open: f64,
    pub extension: f64,
}

pub trait IndelModel: Send + Sync {
    fn gap_probabilities(&self, time: f64) -> Result<GapProbabilities>;
    /// The largest divergence time worth searching, at most `cap`.
    fn divergence_bound(&self, cap: f64) -> f64 {
        cap
    }
}

/// Affine geometric gaps: the opening probability grows as 1 - exp(-lambda t),
/// the extension probability is constant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NegativeBinomialGapModel {
    pub lambda: f64,
    pub epsilon: f64,
}

impl NegativeBinomialGapModel {
    pub fn new(lambda: f64, epsilon: f64) -> Result<Self> {
        if !(lambda > 0f64 && lambda <= LAMBDA_HI_BOUND) {
            return Err(PahmmError::InvalidParameter(format!(
                "indel rate {} outside of (0, {}]",
                lambda, LAMBDA_HI_BOUND
            )));
        }
        if !(epsilon > 0f64 && epsilon <= EPSILON_HI_BOUND) {
            return Err(PahmmError::InvalidParameter(format!(
                "gap extension {} outside of (0, {}]",
                epsilon, EPSILON_HI_BOUND
            )));
        }
        Ok(Self { lambda, epsilon })
    }
}

impl IndelModel for NegativeBinomialGapModel {
    fn gap_probabilities(&self, time: f64) -> Result<GapProbabilities> {
        let time = check_time(time)?;
        Ok(GapProbabilities {
            open: 1f64 - (-self.lambda * time).exp(),
            extension: self.epsilon,
        })
    }
    /// The largest time keeping the opening probability below 1/2.
    fn divergence_bound(&self, cap: f64) -> f64 {
        let bound = std::f64::consts::LN_2 / self.lambda - 0.01;
        bound.min(cap)
    }
}

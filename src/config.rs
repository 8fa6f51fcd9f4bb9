//! Tunables of the distance estimation.
use crate::dptable::Storage;
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Which pair-HMM likelihood the optimiser maximises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    Forward,
    Viterbi,
}

impl std::str::FromStr for Algorithm {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "forward" | "fwd" => Ok(Algorithm::Forward),
            "viterbi" | "vit" => Ok(Algorithm::Viterbi),
            _ => Err(format!("unknown algorithm {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatrixStorage {
    Dense,
    Rolling,
}

impl From<MatrixStorage> for Storage {
    fn from(x: MatrixStorage) -> Storage {
        match x {
            MatrixStorage::Dense => Storage::Dense,
            MatrixStorage::Rolling => Storage::Rolling,
        }
    }
}

/// Band coverage and Brent accuracy of each divergence regime.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BandingConfig {
    /// The guide distance below which a pair is LOW divergence.
    pub low_divergence: f64,
    /// The guide distance below which a pair is MEDIUM divergence.
    pub high_divergence: f64,
    pub low_coverage: f64,
    pub medium_coverage: f64,
    pub high_coverage: f64,
    /// Candidate times are the guide distance times these.
    pub multipliers: [f64; 4],
    /// A cell stays in the band if its log posterior is at least
    /// `posterior_limit + posterior_delta`.
    pub posterior_limit: f64,
    pub posterior_delta: f64,
    pub normal_accuracy: f64,
    pub high_accuracy: f64,
    /// Use the normal accuracy for LOW/MEDIUM pairs instead of the high one for all.
    pub tiered_accuracy: bool,
}

impl std::default::Default for BandingConfig {
    fn default() -> Self {
        Self {
            low_divergence: 0.6,
            high_divergence: 0.8,
            low_coverage: 0.075,
            medium_coverage: 0.1,
            high_coverage: 0.25,
            multipliers: [0.7, 0.9, 1.1, 1.3],
            posterior_limit: -3.0,
            posterior_delta: -9.0,
            normal_accuracy: 1e-3,
            high_accuracy: 1e-2,
            tiered_accuracy: true,
        }
    }
}

impl BandingConfig {
    pub fn posterior_threshold(&self) -> f64 {
        self.posterior_limit + self.posterior_delta
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistanceConfig {
    pub banding: BandingConfig,
    /// Left end of the search interval.
    pub left_bound: f64,
    /// Upper cap of the right end of the search interval.
    /// The indel model may lower it further.
    pub divergence_bound: f64,
    pub max_iterations: usize,
    pub algorithm: Algorithm,
    /// Storage of the tables evaluated by the optimiser.
    pub matrix: MatrixStorage,
}

impl std::default::Default for DistanceConfig {
    fn default() -> Self {
        Self {
            banding: BandingConfig::default(),
            left_bound: 1e-8,
            divergence_bound: 50.0,
            max_iterations: crate::brent::MAX_ITERATIONS,
            algorithm: Algorithm::Forward,
            matrix: MatrixStorage::Rolling,
        }
    }
}

impl DistanceConfig {
    pub fn new(algorithm: Algorithm, matrix: MatrixStorage) -> Self {
        Self {
            algorithm,
            matrix,
            ..Default::default()
        }
    }
    pub fn with_banding(mut self, banding: BandingConfig) -> Self {
        self.banding = banding;
        self
    }
    pub fn with_bounds(mut self, left_bound: f64, divergence_bound: f64) -> Self {
        self.left_bound = left_bound;
        self.divergence_bound = divergence_bound;
        self
    }
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }
    /// Read a (possibly partial) JSON configuration. Missing fields keep their defaults.
    pub fn from_json(contents: &str) -> Result<Self> {
        Ok(serde_json::de::from_str(contents)?)
    }
    pub fn read<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }
}

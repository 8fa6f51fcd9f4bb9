//! Evolutionary models consumed by the pair-HMM.
//! A substitution model turns a divergence time into residue pair probabilities,
//! an indel model turns it into gap opening/extension probabilities.
//! Both are stateless given the time, so they can be shared across threads.
pub mod aminoacid;
pub mod gamma;
pub mod indel;
pub mod nucleotide;
pub mod reversible;
pub use aminoacid::EmpiricalAminoAcid;
pub use gamma::DiscreteGamma;
pub use indel::{GapProbabilities, IndelModel, NegativeBinomialGapModel};
pub use nucleotide::{Gtr, Hky85};
pub use reversible::ReversibleModel;

use crate::error::{PahmmError, Result};

pub trait SubstitutionModel: Send + Sync {
    fn alphabet_size(&self) -> usize;
    /// Equilibrium frequencies of the plain residues.
    fn equilibrium(&self) -> &[f64];
    /// P(t) for `time > 0`.
    fn transition_matrix(&self, time: f64) -> Result<TransitionMatrix>;
    fn log_equilibrium_freq(&self, i: u8) -> f64 {
        self.equilibrium()[i as usize].ln()
    }
    /// ln of the summed equilibrium mass of the members of an ambiguity class.
    fn log_equilibrium_of_class(&self, members: &[u8]) -> f64 {
        let pi = self.equilibrium();
        members.iter().map(|&i| pi[i as usize]).sum::<f64>().ln()
    }
}

/// Residue transition probabilities at a fixed divergence time.
#[derive(Debug, Clone)]
pub struct TransitionMatrix {
    size: usize,
    time: f64,
    // Row-major P_ij(t).
    pt: Vec<f64>,
    pi: Vec<f64>,
}

impl TransitionMatrix {
    /// `pt` is the row-major size x size matrix of the `size` frequencies in `pi`.
    pub fn new(time: f64, pt: Vec<f64>, pi: Vec<f64>) -> Result<Self> {
        let size = pi.len();
        if pt.len() != size * size {
            return Err(PahmmError::InvalidParameter(format!(
                "{} transition probabilities for {} residues",
                pt.len(),
                size
            )));
        }
        Ok(Self { size, time, pt, pi })
    }
    pub fn size(&self) -> usize {
        self.size
    }
    pub fn time(&self) -> f64 {
        self.time
    }
    pub fn prob(&self, i: u8, j: u8) -> f64 {
        self.pt[i as usize * self.size + j as usize]
    }
    /// ln(pi_i * P_ij(t)), the joint probability to see i and j at the ends of a match.
    pub fn log_pair(&self, i: u8, j: u8) -> f64 {
        (self.pi[i as usize] * self.prob(i, j)).ln()
    }
    /// ln(sum_{i in A} pi_i sum_{j in B} P_ij(t)).
    pub fn log_pair_of_classes(&self, xs: &[u8], ys: &[u8]) -> f64 {
        xs.iter()
            .map(|&i| self.pi[i as usize] * ys.iter().map(|&j| self.prob(i, j)).sum::<f64>())
            .sum::<f64>()
            .ln()
    }
}

pub(crate) fn check_time(time: f64) -> Result<f64> {
    if time > 0f64 && time.is_finite() {
        Ok(time)
    } else {
        Err(PahmmError::InvalidTime(time))
    }
}

/// Validate a frequency vector: positive entries summing to one (within 1e-6).
pub(crate) fn check_frequencies(pi: &[f64], size: usize) -> Result<()> {
    if pi.len() != size {
        return Err(PahmmError::InvalidParameter(format!(
            "{} frequencies given, {} expected",
            pi.len(),
            size
        )));
    }
    if pi.iter().any(|&x| !(x > 0f64)) {
        return Err(PahmmError::InvalidParameter(format!(
            "every equilibrium frequency must be positive: {:?}",
            pi
        )));
    }
    let sum: f64 = pi.iter().sum();
    if (sum - 1f64).abs() > 1e-6 {
        return Err(PahmmError::InvalidParameter(format!(
            "frequencies sum to {}",
            sum
        )));
    }
    Ok(())
}

//! Nucleotide models over the T, C, A, G order.
use super::ReversibleModel;
use crate::error::{PahmmError, Result};
use serde::{Deserialize, Serialize};

pub const KAPPA_BOUNDS: (f64, f64) = (1e-8, 20.0);
pub const GTR_RATE_BOUNDS: (f64, f64) = (0.0, 10.0);

/// HKY85. Transitions (T<->C, A<->G) are `kappa` times faster than transversions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hky85 {
    pub kappa: f64,
}

impl Hky85 {
    pub fn new(kappa: f64) -> Result<Self> {
        if !(KAPPA_BOUNDS.0..=KAPPA_BOUNDS.1).contains(&kappa) {
            return Err(PahmmError::InvalidParameter(format!(
                "kappa {} outside of [{}, {}]",
                kappa, KAPPA_BOUNDS.0, KAPPA_BOUNDS.1
            )));
        }
        Ok(Self { kappa })
    }
    pub fn exchangeability(&self) -> [f64; 16] {
        let mut s = [1f64; 16];
        (0..4).for_each(|i| s[i * 4 + i] = 0f64);
        // T<->C and A<->G.
        s[1] = self.kappa;
        s[4] = self.kappa;
        s[11] = self.kappa;
        s[14] = self.kappa;
        s
    }
    pub fn build(&self, pi: &[f64]) -> Result<ReversibleModel> {
        ReversibleModel::new(&self.exchangeability(), pi)
    }
}

/// General time reversible model. The five free rates are T<->C, T<->A, T<->G, C<->A, C<->G;
/// A<->G is fixed to one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Gtr {
    pub rates: [f64; 5],
}

impl Gtr {
    pub fn new(rates: [f64; 5]) -> Result<Self> {
        if rates
            .iter()
            .any(|&r| !(r > GTR_RATE_BOUNDS.0 && r <= GTR_RATE_BOUNDS.1))
        {
            return Err(PahmmError::InvalidParameter(format!(
                "GTR rates {:?} outside of ({}, {}]",
                rates, GTR_RATE_BOUNDS.0, GTR_RATE_BOUNDS.1
            )));
        }
        Ok(Self { rates })
    }
    pub fn exchangeability(&self) -> [f64; 16] {
        let mut s = [0f64; 16];
        let mut k = 0;
        for i in 0..4 {
            for j in i + 1..4 {
                let rate = if (i, j) == (2, 3) {
                    1f64
                } else {
                    k += 1;
                    self.rates[k - 1]
                };
                s[i * 4 + j] = rate;
                s[j * 4 + i] = rate;
            }
        }
        s
    }
    pub fn build(&self, pi: &[f64]) -> Result<ReversibleModel> {
        ReversibleModel::new(&self.exchangeability(), pi)
    }
}

//! Time-reversible substitution process and its eigendecomposition.
use super::gamma::DiscreteGamma;
use super::{check_frequencies, check_time, SubstitutionModel, TransitionMatrix};
use crate::error::{PahmmError, Result};
use nalgebra::{DMatrix, DVector};

/// A reversible rate matrix Q normalised to a mean rate of one.
/// Q is diagonalised through the symmetric matrix diag(sqrt(pi)) Q diag(1/sqrt(pi)),
/// so P(t) = diag(1/sqrt(pi)) E exp(L t) E^T diag(sqrt(pi)).
/// With Gamma rate categories, P(t) is the mean of P(r_k t) over the categories.
#[derive(Debug, Clone)]
pub struct ReversibleModel {
    pi: Vec<f64>,
    gamma: DiscreteGamma,
    q: DMatrix<f64>,
    eigenvalues: DVector<f64>,
    // diag(1/sqrt(pi)) E
    left: DMatrix<f64>,
    // E^T diag(sqrt(pi))
    right: DMatrix<f64>,
}

impl ReversibleModel {
    /// `exchangeability` is a symmetric n x n matrix in row-major order. Its diagonal is ignored.
    pub fn new(exchangeability: &[f64], pi: &[f64]) -> Result<Self> {
        let n = pi.len();
        check_frequencies(pi, n)?;
        if exchangeability.len() != n * n {
            return Err(PahmmError::InvalidParameter(format!(
                "exchangeability matrix has {} entries, {} expected",
                exchangeability.len(),
                n * n
            )));
        }
        let s = DMatrix::from_row_slice(n, n, exchangeability);
        if (0..n).any(|i| (0..i).any(|j| (s[(i, j)] - s[(j, i)]).abs() > 1e-9)) {
            return Err(PahmmError::InvalidParameter(
                "exchangeabilities are not symmetric".to_string(),
            ));
        }
        let mut q = DMatrix::from_fn(n, n, |i, j| if i == j { 0f64 } else { s[(i, j)] * pi[j] });
        let mut mean_rate = 0f64;
        for i in 0..n {
            let out: f64 = q.row(i).sum();
            q[(i, i)] = -out;
            mean_rate += out * pi[i];
        }
        if !(mean_rate > 0f64) {
            return Err(PahmmError::NumericDomain(format!(
                "mean substitution rate is {}",
                mean_rate
            )));
        }
        q /= mean_rate;
        let sqrt_pi: Vec<f64> = pi.iter().map(|x| x.sqrt()).collect();
        let mut sym = q.clone();
        for i in 0..n {
            for j in 0..n {
                sym[(i, j)] = q[(i, j)] * sqrt_pi[i] / sqrt_pi[j];
            }
        }
        // Remove the asymmetry left by rounding.
        let sym = (&sym + sym.transpose()) * 0.5;
        let eigen = sym.symmetric_eigen();
        let e = eigen.eigenvectors;
        let mut left = e.clone();
        let mut right = e.transpose();
        for i in 0..n {
            for k in 0..n {
                left[(i, k)] /= sqrt_pi[i];
                right[(k, i)] *= sqrt_pi[i];
            }
        }
        Ok(Self {
            pi: pi.to_vec(),
            gamma: DiscreteGamma::default(),
            q,
            eigenvalues: eigen.eigenvalues,
            left,
            right,
        })
    }
    pub fn with_gamma(mut self, gamma: DiscreteGamma) -> Self {
        self.gamma = gamma;
        self
    }
    pub fn gamma(&self) -> &DiscreteGamma {
        &self.gamma
    }
    pub fn rate_matrix(&self) -> &DMatrix<f64> {
        &self.q
    }
    /// P(t) as a matrix, averaged over the rate categories.
    pub fn pt(&self, time: f64) -> Result<DMatrix<f64>> {
        let time = check_time(time)?;
        let n = self.pi.len();
        let mut p = DMatrix::zeros(n, n);
        for &rate in self.gamma.rates() {
            p += self.pt_of_category(rate * time) * self.gamma.frequency();
        }
        Ok(p)
    }
    // Round-off negatives are clamped to zero.
    fn pt_of_category(&self, time: f64) -> DMatrix<f64> {
        let n = self.pi.len();
        let mut scaled = self.left.clone();
        for k in 0..n {
            let factor = (self.eigenvalues[k] * time).exp();
            scaled.column_mut(k).iter_mut().for_each(|x| *x *= factor);
        }
        let mut p = scaled * &self.right;
        p.iter_mut().for_each(|x| *x = x.max(0f64));
        p
    }
}

impl SubstitutionModel for ReversibleModel {
    fn alphabet_size(&self) -> usize {
        self.pi.len()
    }
    fn equilibrium(&self) -> &[f64] {
        &self.pi
    }
    fn transition_matrix(&self, time: f64) -> Result<TransitionMatrix> {
        let p = self.pt(time)?;
        let n = self.pi.len();
        let mut pt = Vec::with_capacity(n * n);
        for i in 0..n {
            pt.extend(p.row(i).iter().copied());
        }
        TransitionMatrix::new(time, pt, self.pi.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    fn jc() -> ReversibleModel {
        let mut s = vec![1f64; 16];
        (0..4).for_each(|i| s[i * 4 + i] = 0f64);
        ReversibleModel::new(&s, &[0.25; 4]).unwrap()
    }
    #[test]
    fn jukes_cantor_closed_form() {
        let model = jc();
        let t = 0.3;
        let p = model.pt(t).unwrap();
        let same = 0.25 + 0.75 * (-4f64 / 3f64 * t).exp();
        let diff = 0.25 - 0.25 * (-4f64 / 3f64 * t).exp();
        for i in 0..4 {
            for j in 0..4 {
                let expected = if i == j { same } else { diff };
                assert_relative_eq!(p[(i, j)], expected, epsilon = 1e-10);
            }
        }
    }
    #[test]
    fn rows_sum_to_one_and_reversible() {
        let pi = [0.1, 0.2, 0.3, 0.4];
        let s = [
            0.0, 2.0, 1.0, 0.5, //
            2.0, 0.0, 0.7, 1.0, //
            1.0, 0.7, 0.0, 3.0, //
            0.5, 1.0, 3.0, 0.0,
        ];
        let model = ReversibleModel::new(&s, &pi).unwrap();
        let q = model.rate_matrix();
        let mean: f64 = (0..4).map(|i| -q[(i, i)] * pi[i]).sum();
        assert_relative_eq!(mean, 1.0, epsilon = 1e-10);
        let p = model.pt(0.7).unwrap();
        for i in 0..4 {
            assert_relative_eq!(p.row(i).sum(), 1.0, epsilon = 1e-10);
            for j in 0..4 {
                assert_relative_eq!(pi[i] * p[(i, j)], pi[j] * p[(j, i)], epsilon = 1e-10);
            }
        }
    }
    #[test]
    fn gamma_categories_average_pt() {
        let plain = jc();
        let single = jc().with_gamma(DiscreteGamma::new(0.5, 1).unwrap());
        let (p, q) = (plain.pt(0.4).unwrap(), single.pt(0.4).unwrap());
        assert_relative_eq!(p, q, epsilon = 1e-14);
        let gamma = DiscreteGamma::new(0.5, 4).unwrap();
        let rates = gamma.rates().to_vec();
        let varied = jc().with_gamma(gamma);
        let g = varied.pt(0.4).unwrap();
        for i in 0..4 {
            assert_relative_eq!(g.row(i).sum(), 1.0, epsilon = 1e-10);
        }
        let expected: f64 = rates
            .iter()
            .map(|r| 0.25 + 0.75 * (-4f64 / 3f64 * r * 0.4).exp())
            .sum::<f64>()
            / 4.0;
        assert_relative_eq!(g[(0, 0)], expected, epsilon = 1e-10);
        // Rate variation keeps more sites unchanged at the same mean time.
        assert!(g[(0, 0)] > p[(0, 0)], "{}\t{}", g[(0, 0)], p[(0, 0)]);
    }
    #[test]
    fn zero_time_is_an_error() {
        assert!(jc().transition_matrix(0.0).is_err());
    }
    #[test]
    fn bad_frequencies() {
        let s = vec![1f64; 16];
        assert!(ReversibleModel::new(&s, &[0.5, 0.5, 0.0, 0.0]).is_err());
        assert!(ReversibleModel::new(&s, &[0.5, 0.5, 0.5, 0.5]).is_err());
    }
}

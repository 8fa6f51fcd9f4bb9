//! Discrete Gamma rate heterogeneity (Yang, 1994), mean of each category.
use crate::error::{PahmmError, Result};

const MAX_ITERATIONS: usize = 500;
const EPS: f64 = 1e-14;
const TINY: f64 = 1e-300;

/// ln Γ(x) by the Lanczos approximation (g=7).
pub fn ln_gamma(x: f64) -> f64 {
    const COEFFS: [f64; 8] = [
        676.5203681218851,
        -1259.1392167224028,
        771.323_428_777_653_1,
        -176.615_029_162_140_6,
        12.507343278686905,
        -0.13857109526572012,
        9.984_369_578_019_572e-6,
        1.5056327351493116e-7,
    ];
    let pi = std::f64::consts::PI;
    if x < 0.5 {
        (pi / (pi * x).sin()).ln() - ln_gamma(1.0 - x)
    } else {
        let x = x - 1.0;
        let mut ag = 0.999_999_999_999_809_9_f64;
        for (i, &c) in COEFFS.iter().enumerate() {
            ag += c / (x + i as f64 + 1.0);
        }
        let t = x + 7.5;
        0.5 * (2.0 * pi).ln() + (x + 0.5) * t.ln() - t + ag.ln()
    }
}

/// Regularised lower incomplete gamma function P(a, x).
pub fn regularized_lower_gamma(a: f64, x: f64) -> f64 {
    if x <= 0f64 {
        return 0f64;
    }
    let ln_prefactor = a * x.ln() - x - ln_gamma(a);
    if x < a + 1.0 {
        let (mut ap, mut term) = (a, 1.0 / a);
        let mut sum = term;
        for _ in 0..MAX_ITERATIONS {
            ap += 1.0;
            term *= x / ap;
            sum += term;
            if term.abs() < sum.abs() * EPS {
                break;
            }
        }
        (sum * ln_prefactor.exp()).min(1f64)
    } else {
        // Lentz's continued fraction for Q(a, x).
        let mut b = x + 1.0 - a;
        let mut c = 1.0 / TINY;
        let mut d = 1.0 / b;
        let mut h = d;
        for i in 1..MAX_ITERATIONS {
            let an = -(i as f64) * (i as f64 - a);
            b += 2.0;
            d = an * d + b;
            if d.abs() < TINY {
                d = TINY;
            }
            c = b + an / c;
            if c.abs() < TINY {
                c = TINY;
            }
            d = 1.0 / d;
            let delta = d * c;
            h *= delta;
            if (delta - 1.0).abs() < EPS {
                break;
            }
        }
        (1.0 - ln_prefactor.exp() * h).max(0f64)
    }
}

/// x with P(a, x) = p, for the unit-scale Gamma(a) distribution. Bisection.
pub fn gamma_quantile(a: f64, p: f64) -> f64 {
    if p <= 0f64 {
        return 0f64;
    }
    let mut hi = a.max(1f64);
    while regularized_lower_gamma(a, hi) < p && hi < 1e12 {
        hi *= 2.0;
    }
    let mut lo = 0f64;
    for _ in 0..MAX_ITERATIONS {
        let mid = 0.5 * (lo + hi);
        if regularized_lower_gamma(a, mid) < p {
            lo = mid;
        } else {
            hi = mid;
        }
        if hi - lo <= EPS * hi {
            break;
        }
    }
    0.5 * (lo + hi)
}

/// Relative rates of K equally probable categories of a Gamma(alpha, alpha) distribution.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscreteGamma {
    alpha: f64,
    rates: Vec<f64>,
}

impl std::default::Default for DiscreteGamma {
    fn default() -> Self {
        Self {
            alpha: 0f64,
            rates: vec![1f64],
        }
    }
}

impl DiscreteGamma {
    /// A single category, or `alpha == 0`, means no rate variation.
    pub fn new(alpha: f64, categories: usize) -> Result<Self> {
        if categories == 0 {
            return Err(PahmmError::InvalidParameter(
                "at least one rate category is needed".to_string(),
            ));
        }
        if !(alpha >= 0f64 && alpha.is_finite()) {
            return Err(PahmmError::InvalidParameter(format!(
                "gamma shape {} must be non-negative",
                alpha
            )));
        }
        if categories == 1 || alpha == 0f64 {
            return Ok(Self {
                alpha,
                rates: vec![1f64],
            });
        }
        let k = categories as f64;
        // Cumulative mass of Gamma(alpha+1) below each cutting point, as in Eq. 10.
        let cumulative: Vec<f64> = (1..categories)
            .map(|i| {
                let cut = gamma_quantile(alpha, i as f64 / k) / alpha;
                regularized_lower_gamma(alpha + 1.0, cut * alpha)
            })
            .collect();
        let mut rates = Vec::with_capacity(categories);
        let mut previous = 0f64;
        for &c in cumulative.iter() {
            rates.push((c - previous) * k);
            previous = c;
        }
        rates.push((1.0 - previous) * k);
        Ok(Self { alpha, rates })
    }
    pub fn alpha(&self) -> f64 {
        self.alpha
    }
    pub fn categories(&self) -> usize {
        self.rates.len()
    }
    pub fn rates(&self) -> &[f64] {
        &self.rates
    }
    /// Every category has probability 1/K.
    pub fn frequency(&self) -> f64 {
        1f64 / self.rates.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    #[test]
    fn gamma_functions() {
        assert_abs_diff_eq!(ln_gamma(5.0), 24f64.ln(), epsilon = 1e-10);
        assert_abs_diff_eq!(ln_gamma(0.5), std::f64::consts::PI.sqrt().ln(), epsilon = 1e-10);
        for &x in &[0.1f64, 1.0, 3.0, 10.0] {
            assert_abs_diff_eq!(regularized_lower_gamma(1.0, x), 1.0 - (-x).exp(), epsilon = 1e-10);
        }
        let q = gamma_quantile(2.5, 0.3);
        assert_abs_diff_eq!(regularized_lower_gamma(2.5, q), 0.3, epsilon = 1e-10);
    }
    #[test]
    fn yang_categories() {
        let gamma = DiscreteGamma::new(0.5, 4).unwrap();
        let expected = [0.0334, 0.2519, 0.8203, 2.8944];
        for (r, e) in gamma.rates().iter().zip(expected.iter()) {
            assert_abs_diff_eq!(*r, *e, epsilon = 1e-3);
        }
        let gamma = DiscreteGamma::new(1.0, 4).unwrap();
        let expected = [0.1369, 0.4767, 1.0000, 2.3863];
        for (r, e) in gamma.rates().iter().zip(expected.iter()) {
            assert_abs_diff_eq!(*r, *e, epsilon = 1e-3);
        }
        let mean: f64 = gamma.rates().iter().sum::<f64>() * gamma.frequency();
        assert_abs_diff_eq!(mean, 1.0, epsilon = 1e-10);
    }
    #[test]
    fn no_variation() {
        assert_eq!(DiscreteGamma::new(0.5, 1).unwrap().rates(), &[1.0]);
        assert_eq!(DiscreteGamma::new(0.0, 4).unwrap().rates(), &[1.0]);
        assert!(DiscreteGamma::new(0.5, 0).is_err());
        assert!(DiscreteGamma::new(-1.0, 4).is_err());
    }
}

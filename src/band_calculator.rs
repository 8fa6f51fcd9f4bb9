//! Two-pass band estimation: a few forward runs inside a fixed band around the guide time,
//! then a backward run at the best of them to cut the band down to the posterior mass.
use crate::band::Band;
use crate::config::BandingConfig;
use crate::dictionary::Dictionary;
use crate::dptable::Storage;
use crate::error::{PahmmError, Result};
use crate::hmm::{BackwardPairHmm, ForwardPairHmm, PairHmm, PairHmmAlgorithm};
use crate::model::{IndelModel, SubstitutionModel};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DivergenceRegime {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for DivergenceRegime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DivergenceRegime::Low => write!(f, "LOW"),
            DivergenceRegime::Medium => write!(f, "MEDIUM"),
            DivergenceRegime::High => write!(f, "HIGH"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BandEstimate {
    pub band: Band,
    /// The candidate time with the best forward likelihood.
    pub time: f64,
    /// Its log likelihood inside the fixed band.
    pub log_likelihood: f64,
    /// Relative accuracy for the subsequent time search.
    pub accuracy: f64,
    pub regime: DivergenceRegime,
}

#[derive(Debug, Clone, Copy)]
pub struct BandCalculator<'a> {
    config: &'a BandingConfig,
}

impl<'a> BandCalculator<'a> {
    pub fn new(config: &'a BandingConfig) -> Self {
        Self { config }
    }
    pub fn regime(&self, guide_time: f64) -> DivergenceRegime {
        if guide_time < self.config.low_divergence {
            DivergenceRegime::Low
        } else if guide_time < self.config.high_divergence {
            DivergenceRegime::Medium
        } else {
            DivergenceRegime::High
        }
    }
    pub fn coverage(&self, regime: DivergenceRegime) -> f64 {
        match regime {
            DivergenceRegime::Low => self.config.low_coverage,
            DivergenceRegime::Medium => self.config.medium_coverage,
            DivergenceRegime::High => self.config.high_coverage,
        }
    }
    pub fn accuracy(&self, regime: DivergenceRegime) -> f64 {
        match (self.config.tiered_accuracy, regime) {
            (true, DivergenceRegime::Low) | (true, DivergenceRegime::Medium) => {
                self.config.normal_accuracy
            }
            _ => self.config.high_accuracy,
        }
    }
    pub fn calculate(
        &self,
        seq1: &[u8],
        seq2: &[u8],
        dict: &Dictionary,
        subst: &dyn SubstitutionModel,
        indel: &dyn IndelModel,
        guide_time: f64,
    ) -> Result<BandEstimate> {
        let regime = self.regime(guide_time);
        info!("{} divergence ({:.4})", regime, guide_time);
        let fixed = Band::fixed(seq1.len(), seq2.len(), self.coverage(regime));
        let hmm = PairHmm::new(seq1, seq2, dict, subst, indel)?.with_band(&fixed);
        let mut best: Option<(f64, ForwardPairHmm)> = None;
        for &mult in self.config.multipliers.iter() {
            let time = guide_time * mult;
            let mut fwd = ForwardPairHmm::new(hmm.clone(), Storage::Dense);
            fwd.set_divergence_time(time)?;
            let lnl = fwd.run()?;
            trace!("CANDIDATE\t{:.5}\t{:.4}", time, lnl);
            if best.as_ref().map(|(x, _)| lnl < *x).unwrap_or(true) {
                best = Some((lnl, fwd));
            }
        }
        let (lnl, fwd) = best.ok_or_else(|| {
            PahmmError::InvalidParameter("no candidate multipliers for the band".to_string())
        })?;
        let time = fwd.divergence_time().unwrap_or(guide_time);
        let mut bwd = BackwardPairHmm::new(hmm);
        bwd.set_divergence_time(time)?;
        bwd.run()?;
        let posteriors = bwd.calculate_posteriors(&fwd)?;
        let band = fixed.refine(posteriors, self.config.posterior_threshold());
        debug!(
            "BAND\t{:.5}\t{}\t{}",
            time,
            fixed.active_cells(),
            band.active_cells()
        );
        trace!("Refined band\n{}", band.dump());
        Ok(BandEstimate {
            band,
            time,
            log_likelihood: -lnl,
            accuracy: self.accuracy(regime),
            regime,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gen_seq;
    use crate::hmm::tests::hky_setup;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256StarStar;
    #[test]
    fn regimes() {
        let config = BandingConfig::default();
        let calc = BandCalculator::new(&config);
        assert_eq!(calc.regime(0.1), DivergenceRegime::Low);
        assert_eq!(calc.regime(0.6), DivergenceRegime::Medium);
        assert_eq!(calc.regime(0.79), DivergenceRegime::Medium);
        assert_eq!(calc.regime(2.0), DivergenceRegime::High);
        assert_eq!(calc.accuracy(DivergenceRegime::Low), 1e-3);
        assert_eq!(calc.accuracy(DivergenceRegime::High), 1e-2);
        assert_eq!(calc.coverage(DivergenceRegime::Medium), 0.1);
        let flat = BandingConfig {
            tiered_accuracy: false,
            ..BandingConfig::default()
        };
        assert_eq!(BandCalculator::new(&flat).accuracy(DivergenceRegime::Low), 1e-2);
    }
    #[test]
    fn estimate_on_similar_sequences() {
        let (dict, subst, indel) = hky_setup();
        let mut rng: Xoshiro256StarStar = SeedableRng::seed_from_u64(3289);
        let template = gen_seq::generate_seq(&mut rng, 150);
        let query = gen_seq::introduce_errors(&template, &mut rng, 8, 2, 2);
        let (xs, ys) = (dict.translate(&template).unwrap(), dict.translate(&query).unwrap());
        let config = BandingConfig::default();
        let calc = BandCalculator::new(&config);
        let estimate = calc.calculate(&xs, &ys, &dict, &subst, &indel, 0.1).unwrap();
        assert_eq!(estimate.regime, DivergenceRegime::Low);
        let candidates: Vec<_> = config.multipliers.iter().map(|m| m * 0.1).collect();
        assert!(candidates.iter().any(|&t| (t - estimate.time).abs() < 1e-12));
        let fixed = Band::fixed(xs.len(), ys.len(), config.low_coverage);
        assert!(estimate.band.is_within(&fixed));
        assert!(estimate.band.active_cells() > 0);
        assert!(estimate.log_likelihood < 0.0);
    }
    #[test]
    fn zero_guide_is_an_error() {
        let (dict, subst, indel) = hky_setup();
        let xs = dict.translate(b"ACGTACGT").unwrap();
        let config = BandingConfig::default();
        let calc = BandCalculator::new(&config);
        assert!(calc.calculate(&xs, &xs, &dict, &subst, &indel, 0.0).is_err());
    }
}

//! Pairwise divergence times of a sequence set.
//! Each pair gets its own band, and a Brent search over the time with the pair-HMM likelihood
//! inside that band as the objective. Pairs share nothing but the models, so they run in parallel.
use crate::band::Band;
use crate::band_calculator::BandCalculator;
use crate::brent::Brent;
use crate::config::{Algorithm, DistanceConfig};
use crate::dictionary::Dictionary;
use crate::distance::DistanceMatrix;
use crate::dptable::Storage;
use crate::error::{PahmmError, Result};
use crate::guide::guide_distances;
use crate::hmm::{ForwardPairHmm, PairHmm, PairHmmAlgorithm, State, ViterbiPairHmm, MIN_LIKELIHOOD};
use crate::model::{IndelModel, SubstitutionModel};
use crate::sequences::Sequences;
use rayon::prelude::*;

#[derive(Debug, Clone, PartialEq)]
pub enum PairStatus {
    Optimized,
    /// The best likelihood found is indistinguishable from zero.
    Degenerate,
    Error(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PairResult {
    pub i: usize,
    pub j: usize,
    pub time: f64,
    pub log_likelihood: f64,
    pub guide_distance: f64,
    pub failed: bool,
    pub status: PairStatus,
}

/// Outcome of the time search for one pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Divergence {
    pub time: f64,
    pub log_likelihood: f64,
    pub degenerate: bool,
    pub evaluations: usize,
}

#[derive(Debug, Clone)]
pub struct DistanceEstimate {
    pub matrix: DistanceMatrix,
    pub pairs: Vec<PairResult>,
}

impl DistanceEstimate {
    pub fn failed_pairs(&self) -> usize {
        self.pairs.iter().filter(|p| p.failed).count()
    }
}

pub struct PairwiseDistanceDriver<'a> {
    subst: &'a dyn SubstitutionModel,
    indel: &'a dyn IndelModel,
    config: DistanceConfig,
}

impl<'a> PairwiseDistanceDriver<'a> {
    pub fn new(
        subst: &'a dyn SubstitutionModel,
        indel: &'a dyn IndelModel,
        config: DistanceConfig,
    ) -> Self {
        Self {
            subst,
            indel,
            config,
        }
    }
    pub fn config(&self) -> &DistanceConfig {
        &self.config
    }
    /// Right end of the search interval.
    pub fn divergence_bound(&self) -> f64 {
        self.indel.divergence_bound(self.config.divergence_bound)
    }
    /// Maximum likelihood divergence time of `seq1` and `seq2` (dictionary codes).
    pub fn compute_divergence(
        &self,
        seq1: &[u8],
        seq2: &[u8],
        dict: &Dictionary,
        guide_distance: f64,
    ) -> Result<Divergence> {
        let calc = BandCalculator::new(&self.config.banding);
        let estimate = calc.calculate(seq1, seq2, dict, self.subst, self.indel, guide_distance)?;
        let band = &estimate.band;
        let brent = Brent::new(self.config.left_bound, self.divergence_bound(), estimate.accuracy)
            .with_max_iterations(self.config.max_iterations);
        let hmm = PairHmm::new(seq1, seq2, dict, self.subst, self.indel)?.with_band(band);
        let storage = Storage::from(self.config.matrix);
        let mut algorithm: Box<dyn PairHmmAlgorithm + '_> = match self.config.algorithm {
            Algorithm::Forward => Box::new(ForwardPairHmm::new(hmm, storage)),
            Algorithm::Viterbi => Box::new(ViterbiPairHmm::new(hmm, storage)),
        };
        let result = brent.minimize_from(estimate.time, |time| {
            algorithm.set_divergence_time(time)?;
            algorithm.run()
        })?;
        let log_likelihood = -result.fx;
        let degenerate = log_likelihood <= MIN_LIKELIHOOD / 2f64;
        debug!(
            "OPT\t{:.6}\t{:.4}\t{}\t{}",
            result.x, log_likelihood, result.evaluations, result.converged
        );
        if degenerate {
            debug!("Optimization failed. Zero probability FWD.");
            if log_enabled!(log::Level::Trace) {
                self.dump_matrices(seq1, seq2, dict, band, result.x)?;
            }
        }
        Ok(Divergence {
            time: result.x,
            log_likelihood,
            degenerate,
            evaluations: result.evaluations,
        })
    }
    fn dump_matrices(
        &self,
        seq1: &[u8],
        seq2: &[u8],
        dict: &Dictionary,
        band: &Band,
        time: f64,
    ) -> Result<()> {
        trace!("Band\n{}", band.dump());
        let hmm = PairHmm::new(seq1, seq2, dict, self.subst, self.indel)?.with_band(band);
        let mut fwd = ForwardPairHmm::new(hmm, Storage::Dense);
        fwd.set_divergence_time(time)?;
        fwd.run()?;
        for &state in &[State::Match, State::Insert, State::Delete] {
            let table = fwd.table(state);
            for j in 0..table.cols() {
                let column: Vec<_> = match band.range(state, j) {
                    Some((lo, hi)) => table.column(j)[lo..=hi]
                        .iter()
                        .map(|x| format!("{:.2}", x))
                        .collect(),
                    None => vec![],
                };
                trace!("{:?}\t{}\t{}", state, j, column.join(" "));
            }
        }
        Ok(())
    }
    fn pair_result(&self, seqs: &Sequences, guide: &DistanceMatrix, i: usize, j: usize) -> PairResult {
        let guide_distance = guide.get(i, j);
        info!(
            "Running pairwise calculator for sequence id {} and {}",
            seqs.name(i),
            seqs.name(j)
        );
        match self.compute_divergence(seqs.codes(i), seqs.codes(j), seqs.dictionary(), guide_distance) {
            Ok(div) if div.degenerate => {
                warn!(
                    "{} and {}: the likelihood is degenerate ({:.2}) at time {:.5}",
                    seqs.name(i),
                    seqs.name(j),
                    div.log_likelihood,
                    div.time
                );
                PairResult {
                    i,
                    j,
                    time: div.time,
                    log_likelihood: div.log_likelihood,
                    guide_distance,
                    failed: true,
                    status: PairStatus::Degenerate,
                }
            }
            Ok(div) => PairResult {
                i,
                j,
                time: div.time,
                log_likelihood: div.log_likelihood,
                guide_distance,
                failed: false,
                status: PairStatus::Optimized,
            },
            Err(why) => {
                warn!("{} and {}: {}", seqs.name(i), seqs.name(j), why);
                PairResult {
                    i,
                    j,
                    time: self.divergence_bound(),
                    log_likelihood: MIN_LIKELIHOOD,
                    guide_distance,
                    failed: true,
                    status: PairStatus::Error(why.to_string()),
                }
            }
        }
    }
    /// Divergence times of every pair, with the guide distances computed from k-mers.
    pub fn run(&self, seqs: &Sequences) -> Result<DistanceEstimate> {
        if seqs.len() < 2 {
            return Err(PahmmError::InvalidInput(format!(
                "distances need at least two sequences, {} given",
                seqs.len()
            )));
        }
        let guide = guide_distances(seqs);
        self.run_with_guide(seqs, &guide)
    }
    pub fn run_with_guide(&self, seqs: &Sequences, guide: &DistanceMatrix) -> Result<DistanceEstimate> {
        if guide.size() != seqs.len() {
            return Err(PahmmError::InvalidInput(format!(
                "{} guide distances for {} sequences",
                guide.size(),
                seqs.len()
            )));
        }
        let pairs: Vec<PairResult> = seqs
            .pairs()
            .into_par_iter()
            .map(|(i, j)| self.pair_result(seqs, guide, i, j))
            .collect();
        let mut matrix = DistanceMatrix::new(seqs.len());
        for pair in pairs.iter() {
            matrix.set(pair.i, pair.j, pair.time);
        }
        Ok(DistanceEstimate { matrix, pairs })
    }
}

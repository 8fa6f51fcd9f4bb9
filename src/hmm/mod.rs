//! Evolutionary pair hidden Markov model.
//! There are three emitting states: Match (emits a residue from both sequences),
//! Insert (emits a residue from the first sequence only), and Delete (emits a residue from the second sequence only).
//! All the transition and emission probabilities are functions of the divergence time `t`
//! through an indel model (gap opening `g(t)`, gap extension `e(t)`) and a substitution model (P(t)).
//! Also, there is an implicit end state, reached from any state with probability `XI`.
//!
//! Every calculation is done in the natural log space, and `MIN_LIKELIHOOD` plays the role of log(0).
//! The forward, backward, and Viterbi passes share the model part defined here ([`PairHmm`]),
//! and each of them owns its own three DP tables.
pub mod backward;
pub mod forward;
pub mod viterbi;
pub use backward::{BackwardPairHmm, MpdAlignment, Posteriors};
pub use forward::ForwardPairHmm;
pub use viterbi::{ViterbiAlignment, ViterbiPairHmm};

use crate::band::{Band, ColumnRanges};
use crate::dictionary::Dictionary;
use crate::error::{ensure_finite, PahmmError, Result};
use crate::model::{GapProbabilities, IndelModel, SubstitutionModel, TransitionMatrix};

/// log(0) of the DP tables.
pub const MIN_LIKELIHOOD: f64 = -1_000_000f64;
/// Probability to move into the end state.
pub const XI: f64 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Match,
    Insert,
    Delete,
}

pub fn logsum(x: f64, y: f64) -> f64 {
    let (max, min) = if x < y { (y, x) } else { (x, y) };
    max + (min - max).exp().ln_1p()
}

pub fn logsum3(x: f64, y: f64, z: f64) -> f64 {
    logsum(logsum(x, y), z)
}

/// Log transition probabilities into one state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateTransitions {
    pub from_match: f64,
    pub from_insert: f64,
    pub from_delete: f64,
}

/// Log transition probabilities of the whole model at a given time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transitions {
    pub mat: StateTransitions,
    pub ins: StateTransitions,
    pub del: StateTransitions,
}

impl Transitions {
    pub fn new(gap: GapProbabilities) -> Result<Self> {
        let (g, e) = (gap.open, gap.extension);
        let mat = StateTransitions {
            from_match: ((1f64 - 2f64 * g) * (1f64 - XI)).ln(),
            from_insert: ((1f64 - e - XI) * (1f64 - 2f64 * g)).ln(),
            from_delete: ((1f64 - e - XI) * (1f64 - 2f64 * g)).ln(),
        };
        let ins = StateTransitions {
            from_match: (g * (1f64 - XI)).ln(),
            from_insert: (e + (1f64 - e - XI) * g).ln(),
            from_delete: ((1f64 - e - XI) * g).ln(),
        };
        let del = StateTransitions {
            from_match: (g * (1f64 - XI)).ln(),
            from_insert: ((1f64 - e - XI) * g).ln(),
            from_delete: (e + (1f64 - e - XI) * g).ln(),
        };
        for (name, t) in &[("match", mat), ("insert", ins), ("delete", del)] {
            let what = format!("transition into {} (g={}, e={})", name, g, e);
            ensure_finite(t.from_match, &what)?;
            ensure_finite(t.from_insert, &what)?;
            ensure_finite(t.from_delete, &what)?;
        }
        Ok(Self { mat, ins, del })
    }
    pub fn into_state(&self, state: State) -> &StateTransitions {
        match state {
            State::Match => &self.mat,
            State::Insert => &self.ins,
            State::Delete => &self.del,
        }
    }
}

/// Log equilibrium masses of the three states, after taking out the end probability,
/// and the aggregated transitions out of the silent start.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateEquilibrium {
    pub pi_m: f64,
    pub pi_i: f64,
    pub pi_d: f64,
    pub init_m: f64,
    pub init_i: f64,
    pub init_d: f64,
}

impl StateEquilibrium {
    /// Closed-form stationary distribution of the embedded Markov chain over {M, I, D}.
    pub fn new(gap: GapProbabilities, tr: &Transitions) -> Result<Self> {
        let (g, e) = (gap.open, gap.extension);
        let md00 = 1f64 - 2f64 * g;
        let md01 = g;
        let md10 = (1f64 - e) * (1f64 - 2f64 * g);
        let md11 = e + (1f64 - e) * g;
        let md20 = md10;
        let md21 = (1f64 - e) * g;
        let ratio = (1f64 - md00 + md10) / (md11 - 1f64 - md01);
        let pi_d = ((1f64 - md00) + md01 * ratio) / ((md01 - md21) * ratio + md20 - md00 + 1f64);
        let pi_i = (pi_d * (md01 - md21) - md01) / (md11 - 1f64 - md01);
        let pi_m = 1f64 - pi_i - pi_d;
        ensure_finite(pi_d, "delete state equilibrium")?;
        ensure_finite(pi_i, "insert state equilibrium")?;
        ensure_finite(pi_m, "match state equilibrium")?;
        let min_pi = MIN_LIKELIHOOD.exp();
        let log_mass = |pi: f64| {
            let pi = pi - XI / 3f64;
            if pi < min_pi || pi <= 0f64 {
                MIN_LIKELIHOOD
            } else {
                pi.ln()
            }
        };
        let (pi_m, pi_i, pi_d) = (log_mass(pi_m), log_mass(pi_i), log_mass(pi_d));
        let init = |t: &StateTransitions| {
            logsum3(
                t.from_insert + pi_i,
                t.from_delete + pi_d,
                t.from_match + pi_m,
            )
        };
        Ok(Self {
            pi_m,
            pi_i,
            pi_d,
            init_m: init(&tr.mat),
            init_i: init(&tr.ins),
            init_d: init(&tr.del),
        })
    }
}

/// Emission log-probabilities of every code (plain residue or ambiguity class) at a given time.
#[derive(Debug, Clone)]
pub struct EmissionTable {
    codes: usize,
    single: Vec<f64>,
    pair: Vec<f64>,
}

impl EmissionTable {
    pub fn new(
        dict: &Dictionary,
        subst: &dyn SubstitutionModel,
        tm: &TransitionMatrix,
    ) -> Result<Self> {
        let codes = dict.code_count();
        let mut single = vec![MIN_LIKELIHOOD; codes];
        let mut pair = vec![MIN_LIKELIHOOD; codes * codes];
        for a in (0..codes as u8).filter(|&a| !dict.is_gap(a)) {
            single[a as usize] = if dict.is_class(a) {
                subst.log_equilibrium_of_class(dict.members(a))
            } else {
                subst.log_equilibrium_freq(a)
            };
            for b in (0..codes as u8).filter(|&b| !dict.is_gap(b)) {
                let lk = if dict.is_class(a) || dict.is_class(b) {
                    tm.log_pair_of_classes(dict.members(a), dict.members(b))
                } else {
                    tm.log_pair(a, b)
                };
                pair[a as usize * codes + b as usize] = lk;
            }
        }
        for x in single.iter_mut().chain(pair.iter_mut()) {
            if x.is_nan() {
                return Err(PahmmError::NumericDomain(
                    "emission probability is NaN".to_string(),
                ));
            }
            *x = x.max(MIN_LIKELIHOOD);
        }
        Ok(Self {
            codes,
            single,
            pair,
        })
    }
    pub fn single(&self, a: u8) -> f64 {
        self.single[a as usize]
    }
    pub fn pair(&self, a: u8, b: u8) -> f64 {
        self.pair[a as usize * self.codes + b as usize]
    }
}

/// Everything the passes need at the current divergence time.
#[derive(Debug, Clone)]
pub struct TimedModel {
    pub time: f64,
    pub gap: GapProbabilities,
    pub transitions: Transitions,
    pub equilibrium: StateEquilibrium,
    pub emissions: EmissionTable,
    // Insert emission of seq1[i] and delete emission of seq2[j].
    em1: Vec<f64>,
    em2: Vec<f64>,
}

/// The model part of an evolutionary pair-HMM, bound to a pair of sequences.
/// `band == None` means the whole matrix.
#[derive(Clone)]
pub struct PairHmm<'a> {
    seq1: &'a [u8],
    seq2: &'a [u8],
    dict: &'a Dictionary,
    subst: &'a dyn SubstitutionModel,
    indel: &'a dyn IndelModel,
    band: Option<&'a Band>,
    model: Option<TimedModel>,
}

impl<'a> std::fmt::Debug for PairHmm<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PairHmm")
            .field("len1", &self.seq1.len())
            .field("len2", &self.seq2.len())
            .field("banded", &self.band.is_some())
            .field("time", &self.model.as_ref().map(|m| m.time))
            .finish()
    }
}

impl<'a> PairHmm<'a> {
    pub fn new(
        seq1: &'a [u8],
        seq2: &'a [u8],
        dict: &'a Dictionary,
        subst: &'a dyn SubstitutionModel,
        indel: &'a dyn IndelModel,
    ) -> Result<Self> {
        if seq1.is_empty() || seq2.is_empty() {
            return Err(PahmmError::InvalidInput(
                "pair-HMM needs two non-empty sequences".to_string(),
            ));
        }
        if subst.alphabet_size() != dict.alphabet_size() {
            return Err(PahmmError::InvalidInput(format!(
                "substitution model over {} residues, dictionary over {}",
                subst.alphabet_size(),
                dict.alphabet_size()
            )));
        }
        Ok(Self {
            seq1,
            seq2,
            dict,
            subst,
            indel,
            band: None,
            model: None,
        })
    }
    pub fn with_band(mut self, band: &'a Band) -> Self {
        self.band = Some(band);
        self
    }
    pub fn band(&self) -> Option<&'a Band> {
        self.band
    }
    pub fn seq1(&self) -> &'a [u8] {
        self.seq1
    }
    pub fn seq2(&self) -> &'a [u8] {
        self.seq2
    }
    pub fn dictionary(&self) -> &'a Dictionary {
        self.dict
    }
    /// Number of rows of the DP tables, |seq1| + 1.
    pub fn rows(&self) -> usize {
        self.seq1.len() + 1
    }
    /// Number of columns of the DP tables, |seq2| + 1.
    pub fn cols(&self) -> usize {
        self.seq2.len() + 1
    }
    pub fn divergence_time(&self) -> Option<f64> {
        self.model.as_ref().map(|m| m.time)
    }
    /// Set the divergence time and re-calculate every probability depending on it.
    pub fn set_divergence_time(&mut self, time: f64) -> Result<()> {
        if !(time > 0f64 && time.is_finite()) {
            return Err(PahmmError::InvalidTime(time));
        }
        let gap = self.indel.gap_probabilities(time)?;
        let transitions = Transitions::new(gap)?;
        let equilibrium = StateEquilibrium::new(gap, &transitions)?;
        let tm = self.subst.transition_matrix(time)?;
        let emissions = EmissionTable::new(self.dict, self.subst, &tm)?;
        let em1 = self.seq1.iter().map(|&a| emissions.single(a)).collect();
        let em2 = self.seq2.iter().map(|&b| emissions.single(b)).collect();
        self.model = Some(TimedModel {
            time,
            gap,
            transitions,
            equilibrium,
            emissions,
            em1,
            em2,
        });
        Ok(())
    }
    pub fn model(&self) -> Result<&TimedModel> {
        self.model.as_ref().ok_or(PahmmError::TimeNotSet)
    }
    /// Active rows of column `j` for each state.
    pub fn column_ranges(&self, j: usize) -> ColumnRanges {
        match self.band {
            Some(band) => band.column(j),
            None => Band::full_column(self.seq1.len(), j),
        }
    }
}

impl TimedModel {
    /// Insert emission of the i-th residue (0-origin) of the first sequence.
    #[inline]
    pub fn em_x(&self, i: usize) -> f64 {
        self.em1[i]
    }
    /// Delete emission of the j-th residue (0-origin) of the second sequence.
    #[inline]
    pub fn em_y(&self, j: usize) -> f64 {
        self.em2[j]
    }
    #[inline]
    pub fn em_m(&self, a: u8, b: u8) -> f64 {
        self.emissions.pair(a, b)
    }
}

/// Common interface of the three dynamic programming passes.
pub trait PairHmmAlgorithm {
    fn set_divergence_time(&mut self, time: f64) -> Result<()>;
    fn divergence_time(&self) -> Option<f64>;
    /// Run the pass and return the negated log-likelihood.
    fn run(&mut self) -> Result<f64>;
}

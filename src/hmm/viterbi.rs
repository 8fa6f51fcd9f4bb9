//! Viterbi algorithm: the likelihood of the single best alignment, and the alignment itself.
use super::{PairHmm, PairHmmAlgorithm, State, MIN_LIKELIHOOD};
use crate::dptable::{DPTable, Storage};
use crate::error::{PahmmError, Result};

#[derive(Debug, Clone)]
pub struct ViterbiPairHmm<'a> {
    hmm: PairHmm<'a>,
    mat: DPTable<f64>,
    ins: DPTable<f64>,
    del: DPTable<f64>,
    // The state each cell was entered from.
    mat_src: DPTable<Option<State>>,
    ins_src: DPTable<Option<State>>,
    del_src: DPTable<Option<State>>,
    best: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViterbiAlignment {
    pub aligned1: Vec<u8>,
    pub aligned2: Vec<u8>,
    pub states: Vec<State>,
}

// M wins only strictly, then X over Y.
fn argmax(m: f64, x: f64, y: f64) -> (f64, State) {
    if m > x && m > y {
        (m, State::Match)
    } else if x > y {
        (x, State::Insert)
    } else {
        (y, State::Delete)
    }
}

impl<'a> ViterbiPairHmm<'a> {
    pub fn new(hmm: PairHmm<'a>, storage: Storage) -> Self {
        let (rows, cols) = (hmm.rows(), hmm.cols());
        Self {
            hmm,
            mat: DPTable::new(storage, rows, cols, MIN_LIKELIHOOD),
            ins: DPTable::new(storage, rows, cols, MIN_LIKELIHOOD),
            del: DPTable::new(storage, rows, cols, MIN_LIKELIHOOD),
            mat_src: DPTable::new(storage, rows, cols, None),
            ins_src: DPTable::new(storage, rows, cols, None),
            del_src: DPTable::new(storage, rows, cols, None),
            best: None,
        }
    }
    pub fn hmm(&self) -> &PairHmm<'a> {
        &self.hmm
    }
    pub fn table(&self, state: State) -> &DPTable<f64> {
        match state {
            State::Match => &self.mat,
            State::Insert => &self.ins,
            State::Delete => &self.del,
        }
    }
    fn sources(&self, state: State) -> &DPTable<Option<State>> {
        match state {
            State::Match => &self.mat_src,
            State::Insert => &self.ins_src,
            State::Delete => &self.del_src,
        }
    }
    /// Log-likelihood of the best alignment of the last run.
    pub fn best_log_likelihood(&self) -> Option<f64> {
        self.best
    }
    /// Follow the recorded sources back from the best final state.
    pub fn traceback(&self) -> Result<ViterbiAlignment> {
        if !self.mat.supports_traceback() {
            return Err(PahmmError::MissingTraceback);
        }
        if self.best.is_none() {
            return Err(PahmmError::TimeNotSet);
        }
        let (seq1, seq2) = (self.hmm.seq1(), self.hmm.seq2());
        let gap = self.hmm.dictionary().gap_code();
        let (mut i, mut j) = (seq1.len(), seq2.len());
        let (mm, mx, my) = (self.mat.get(i, j), self.ins.get(i, j), self.del.get(i, j));
        let mut state = if mm >= mx && mm >= my {
            State::Match
        } else if mx >= my {
            State::Insert
        } else {
            State::Delete
        };
        let mut aln = ViterbiAlignment {
            aligned1: vec![],
            aligned2: vec![],
            states: vec![],
        };
        while 0 < i || 0 < j {
            let src = self.sources(state).get(i, j).ok_or_else(|| {
                PahmmError::InvalidInput(format!("traceback left the band at ({},{})", i, j))
            })?;
            aln.states.push(state);
            match state {
                State::Match => {
                    aln.aligned1.push(seq1[i - 1]);
                    aln.aligned2.push(seq2[j - 1]);
                    i -= 1;
                    j -= 1;
                }
                State::Insert => {
                    aln.aligned1.push(seq1[i - 1]);
                    aln.aligned2.push(gap);
                    i -= 1;
                }
                State::Delete => {
                    aln.aligned1.push(gap);
                    aln.aligned2.push(seq2[j - 1]);
                    j -= 1;
                }
            }
            state = src;
        }
        aln.aligned1.reverse();
        aln.aligned2.reverse();
        aln.states.reverse();
        Ok(aln)
    }
}

impl<'a> PairHmmAlgorithm for ViterbiPairHmm<'a> {
    fn set_divergence_time(&mut self, time: f64) -> Result<()> {
        self.best = None;
        self.hmm.set_divergence_time(time)
    }
    fn divergence_time(&self) -> Option<f64> {
        self.hmm.divergence_time()
    }
    fn run(&mut self) -> Result<f64> {
        let model = self.hmm.model()?;
        let (seq1, seq2) = (self.hmm.seq1(), self.hmm.seq2());
        let (n, m) = (seq1.len(), seq2.len());
        let (tr, eq) = (&model.transitions, &model.equilibrium);
        let (mat, ins, del) = (&mut self.mat, &mut self.ins, &mut self.del);
        let (mat_src, ins_src, del_src) = (&mut self.mat_src, &mut self.ins_src, &mut self.del_src);
        mat.initialize();
        ins.initialize();
        del.initialize();
        mat_src.initialize();
        ins_src.initialize();
        del_src.initialize();
        mat.set(0, 0, eq.pi_m);
        ins.set(0, 0, eq.pi_i);
        del.set(0, 0, eq.pi_d);
        for j in 0..=m {
            if 0 < j {
                mat.begin_column(j);
                ins.begin_column(j);
                del.begin_column(j);
                mat_src.begin_column(j);
                ins_src.begin_column(j);
                del_src.begin_column(j);
            }
            let ranges = self.hmm.column_ranges(j);
            if let (Some((lo, hi)), true) = (ranges.del, 0 < j) {
                let em = model.em_y(j - 1);
                for i in lo..=hi {
                    let (y, src) = argmax(
                        mat.get(i, j - 1) + tr.del.from_match,
                        ins.get(i, j - 1) + tr.del.from_insert,
                        del.get(i, j - 1) + tr.del.from_delete,
                    );
                    del.set(i, j, y + em);
                    del_src.set(i, j, Some(src));
                }
            }
            if let (Some((lo, hi)), true) = (ranges.mat, 0 < j) {
                let b = seq2[j - 1];
                for i in lo.max(1)..=hi {
                    let (mm, src) = argmax(
                        mat.get(i - 1, j - 1) + tr.mat.from_match,
                        ins.get(i - 1, j - 1) + tr.mat.from_insert,
                        del.get(i - 1, j - 1) + tr.mat.from_delete,
                    );
                    mat.set(i, j, mm + model.em_m(seq1[i - 1], b));
                    mat_src.set(i, j, Some(src));
                }
            }
            if let Some((lo, hi)) = ranges.ins {
                for i in lo.max(1)..=hi {
                    let (x, src) = argmax(
                        mat.get(i - 1, j) + tr.ins.from_match,
                        ins.get(i - 1, j) + tr.ins.from_insert,
                        del.get(i - 1, j) + tr.ins.from_delete,
                    );
                    ins.set(i, j, x + model.em_x(i - 1));
                    ins_src.set(i, j, Some(src));
                }
            }
        }
        let best = mat.get(n, m).max(ins.get(n, m)).max(del.get(n, m));
        trace!("VIT\t{:.5}\t{:.4}\t{}x{}", model.time, best, n, m);
        self.best = Some(best);
        Ok(-best)
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::hky_setup;
    use super::super::ForwardPairHmm;
    use super::*;
    use crate::band::Band;
    use crate::gen_seq;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256StarStar;
    #[test]
    fn viterbi_is_below_forward() {
        let (dict, subst, indel) = hky_setup();
        let mut rng: Xoshiro256StarStar = SeedableRng::seed_from_u64(9032);
        for _ in 0..5 {
            let template = gen_seq::generate_seq(&mut rng, 40);
            let query = gen_seq::introduce_randomness(&template, &mut rng, &gen_seq::PROFILE);
            let (xs, ys) = (dict.translate(&template).unwrap(), dict.translate(&query).unwrap());
            let hmm = PairHmm::new(&xs, &ys, &dict, &subst, &indel).unwrap();
            let mut vit = ViterbiPairHmm::new(hmm.clone(), Storage::Dense);
            let mut fwd = ForwardPairHmm::new(hmm, Storage::Dense);
            vit.set_divergence_time(0.3).unwrap();
            fwd.set_divergence_time(0.3).unwrap();
            let (v, f) = (vit.run().unwrap(), fwd.run().unwrap());
            // -ln of a single path is larger than -ln of the sum, even without the end term.
            assert!(f + super::super::XI.ln() < v, "{}\t{}", v, f);
        }
    }
    #[test]
    fn traceback_of_identical_sequences() {
        let (dict, subst, indel) = hky_setup();
        let xs = dict.translate(b"ACGTTGCATGCA").unwrap();
        let hmm = PairHmm::new(&xs, &xs, &dict, &subst, &indel).unwrap();
        let mut vit = ViterbiPairHmm::new(hmm, Storage::Dense);
        vit.set_divergence_time(0.1).unwrap();
        vit.run().unwrap();
        let aln = vit.traceback().unwrap();
        assert_eq!(aln.aligned1, xs);
        assert_eq!(aln.aligned2, xs);
        assert!(aln.states.iter().all(|&s| s == State::Match));
    }
    #[test]
    fn traceback_finds_the_deletion() {
        let (dict, subst, indel) = hky_setup();
        let xs = dict.translate(b"AACCGGTTACGTACGGATC").unwrap();
        let ys = dict.translate(b"AACCGGTTGTACGGATC").unwrap();
        let band = Band::fixed(xs.len(), ys.len(), 0.5);
        let hmm = PairHmm::new(&xs, &ys, &dict, &subst, &indel)
            .unwrap()
            .with_band(&band);
        let mut vit = ViterbiPairHmm::new(hmm, Storage::Dense);
        vit.set_divergence_time(0.1).unwrap();
        vit.run().unwrap();
        let aln = vit.traceback().unwrap();
        let inserts = aln.states.iter().filter(|&&s| s == State::Insert).count();
        let deletes = aln.states.iter().filter(|&&s| s == State::Delete).count();
        assert_eq!((inserts, deletes), (2, 0));
        let gap = dict.gap_code();
        let restored: Vec<_> = aln.aligned1.iter().filter(|&&x| x != gap).copied().collect();
        assert_eq!(restored, xs);
    }
    #[test]
    fn rolling_viterbi_scores_but_can_not_trace() {
        let (dict, subst, indel) = hky_setup();
        let xs = dict.translate(b"ACGTTGCATGCA").unwrap();
        let ys = dict.translate(b"ACGTGCATGGCA").unwrap();
        let hmm = PairHmm::new(&xs, &ys, &dict, &subst, &indel).unwrap();
        let mut dense = ViterbiPairHmm::new(hmm.clone(), Storage::Dense);
        let mut rolling = ViterbiPairHmm::new(hmm, Storage::Rolling);
        dense.set_divergence_time(0.2).unwrap();
        rolling.set_divergence_time(0.2).unwrap();
        assert_eq!(dense.run().unwrap(), rolling.run().unwrap());
        assert!(matches!(
            rolling.traceback(),
            Err(PahmmError::MissingTraceback)
        ));
    }
}

//! Backward algorithm, posterior probabilities, and the maximum posterior decoding.
use super::{
    logsum3, ForwardPairHmm, PairHmm, PairHmmAlgorithm, State, TimedModel, MIN_LIKELIHOOD, XI,
};
use crate::dptable::DPTable;
use crate::error::{PahmmError, Result};

/// Backward tables are always dense: the last row and the last column are filled
/// before the interior, so a rolling buffer can not hold them.
#[derive(Debug, Clone)]
pub struct BackwardPairHmm<'a> {
    hmm: PairHmm<'a>,
    mat: DPTable<f64>,
    ins: DPTable<f64>,
    del: DPTable<f64>,
    total: Option<f64>,
    posteriors: Option<Posteriors>,
}

/// Log posterior probabilities to pass through each cell in each state.
#[derive(Debug, Clone)]
pub struct Posteriors {
    mat: DPTable<f64>,
    ins: DPTable<f64>,
    del: DPTable<f64>,
}

impl Posteriors {
    pub fn get(&self, state: State, i: usize, j: usize) -> f64 {
        self.table(state).get(i, j)
    }
    pub fn table(&self, state: State) -> &DPTable<f64> {
        match state {
            State::Match => &self.mat,
            State::Insert => &self.ins,
            State::Delete => &self.del,
        }
    }
    pub fn rows(&self) -> usize {
        self.mat.rows()
    }
    pub fn cols(&self) -> usize {
        self.mat.cols()
    }
}

/// Maximum posterior alignment. `posteriors[k]` is the log posterior of the k-th column
/// of the alignment in the state it was decoded to. Gaps are the gap code of the dictionary.
#[derive(Debug, Clone, PartialEq)]
pub struct MpdAlignment {
    pub posteriors: Vec<f64>,
    pub aligned1: Vec<u8>,
    pub aligned2: Vec<u8>,
}

impl<'a> BackwardPairHmm<'a> {
    pub fn new(hmm: PairHmm<'a>) -> Self {
        let (rows, cols) = (hmm.rows(), hmm.cols());
        Self {
            hmm,
            mat: DPTable::dense(rows, cols, MIN_LIKELIHOOD),
            ins: DPTable::dense(rows, cols, MIN_LIKELIHOOD),
            del: DPTable::dense(rows, cols, MIN_LIKELIHOOD),
            total: None,
            posteriors: None,
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
    /// ln P(seq1, seq2 | t) collected at (0,0) in the last run.
    pub fn total_log_likelihood(&self) -> Option<f64> {
        self.total
    }
    pub fn posteriors(&self) -> Option<&Posteriors> {
        self.posteriors.as_ref()
    }
    // Fill the three states of (i,j) from its successors.
    fn fill_cell(&mut self, model: &TimedModel, i: usize, j: usize) {
        let (n, m) = (self.hmm.rows() - 1, self.hmm.cols() - 1);
        if i == n && j == m {
            let end = XI.ln();
            self.mat.set(i, j, end);
            self.ins.set(i, j, end);
            self.del.set(i, j, end);
            return;
        }
        let (bm, bx, by) = self.successors(model, i, j);
        self.ins.set(i, j, bx);
        self.del.set(i, j, by);
        self.mat.set(i, j, bm);
    }
    // Values of M, X and Y at (i,j), i.e. the sums over the three possible next cells.
    fn successors(&self, model: &TimedModel, i: usize, j: usize) -> (f64, f64, f64) {
        let (seq1, seq2) = (self.hmm.seq1(), self.hmm.seq2());
        let (n, m) = (seq1.len(), seq2.len());
        let bxp = match i == n {
            true => MIN_LIKELIHOOD,
            false => self.ins.get(i + 1, j) + model.em_x(i),
        };
        let byp = match j == m {
            true => MIN_LIKELIHOOD,
            false => self.del.get(i, j + 1) + model.em_y(j),
        };
        let bmp = match i == n || j == m {
            true => MIN_LIKELIHOOD,
            false => self.mat.get(i + 1, j + 1) + model.em_m(seq1[i], seq2[j]),
        };
        let tr = &model.transitions;
        let bx = logsum3(
            tr.mat.from_insert + bmp,
            tr.ins.from_insert + bxp,
            tr.del.from_insert + byp,
        );
        let by = logsum3(
            tr.mat.from_delete + bmp,
            tr.ins.from_delete + bxp,
            tr.del.from_delete + byp,
        );
        let bm = logsum3(
            tr.mat.from_match + bmp,
            tr.ins.from_match + bxp,
            tr.del.from_match + byp,
        );
        (bm, bx, by)
    }
    /// Combine with a forward run at the same time over the same band.
    /// The forward tables must be dense.
    pub fn calculate_posteriors(&mut self, forward: &ForwardPairHmm) -> Result<&Posteriors> {
        if !forward.table(State::Match).supports_traceback() {
            return Err(PahmmError::MissingTraceback);
        }
        let fwd_total = forward.total_log_likelihood().ok_or(PahmmError::TimeNotSet)?;
        if self.total.is_none() {
            return Err(PahmmError::TimeNotSet);
        }
        if forward.divergence_time() != self.hmm.divergence_time() {
            return Err(PahmmError::InvalidInput(format!(
                "posteriors need forward and backward at the same time ({:?} vs {:?})",
                forward.divergence_time(),
                self.hmm.divergence_time()
            )));
        }
        if forward.hmm().rows() != self.hmm.rows() || forward.hmm().cols() != self.hmm.cols() {
            return Err(PahmmError::InvalidInput(
                "forward and backward run on different pairs".to_string(),
            ));
        }
        let combine = |bwd: &DPTable<f64>, fwd: &DPTable<f64>| {
            let mut post = bwd.clone();
            for j in 0..bwd.cols() {
                for i in 0..bwd.rows() {
                    post.set(i, j, bwd.get(i, j) + fwd.get(i, j) - fwd_total);
                }
            }
            post
        };
        let posteriors = Posteriors {
            mat: combine(&self.mat, forward.table(State::Match)),
            ins: combine(&self.ins, forward.table(State::Insert)),
            del: combine(&self.del, forward.table(State::Delete)),
        };
        Ok(&*self.posteriors.insert(posteriors))
    }
    /// The alignment maximising the summed log posterior of its columns.
    pub fn mpd_with_posteriors(&self) -> Result<MpdAlignment> {
        let post = self.posteriors.as_ref().ok_or(PahmmError::MissingTraceback)?;
        let (seq1, seq2) = (self.hmm.seq1(), self.hmm.seq2());
        let (n, m) = (seq1.len(), seq2.len());
        let gap = self.hmm.dictionary().gap_code();
        let mut mp = DPTable::dense(n + 1, m + 1, 0f64);
        for i in 1..=n {
            mp.set(i, 0, mp.get(i - 1, 0) + post.get(State::Insert, i, 0));
        }
        for j in 1..=m {
            mp.set(0, j, mp.get(0, j - 1) + post.get(State::Delete, 0, j));
            for i in 1..=n {
                let best = (mp.get(i - 1, j - 1) + post.get(State::Match, i, j))
                    .max(mp.get(i - 1, j) + post.get(State::Insert, i, j))
                    .max(mp.get(i, j - 1) + post.get(State::Delete, i, j));
                mp.set(i, j, best);
            }
        }
        let mut aln = MpdAlignment {
            posteriors: Vec::with_capacity(n + m),
            aligned1: Vec::with_capacity(n + m),
            aligned2: Vec::with_capacity(n + m),
        };
        let (mut i, mut j) = (n, m);
        while 0 < i && 0 < j {
            let tm = mp.get(i - 1, j - 1);
            let ti = mp.get(i - 1, j);
            let td = mp.get(i, j - 1);
            if tm >= ti && tm >= td {
                aln.aligned1.push(seq1[i - 1]);
                aln.aligned2.push(seq2[j - 1]);
                aln.posteriors.push(post.get(State::Match, i, j));
                i -= 1;
                j -= 1;
            } else if ti >= td {
                aln.aligned1.push(seq1[i - 1]);
                aln.aligned2.push(gap);
                aln.posteriors.push(post.get(State::Insert, i, j));
                i -= 1;
            } else {
                aln.aligned1.push(gap);
                aln.aligned2.push(seq2[j - 1]);
                aln.posteriors.push(post.get(State::Delete, i, j));
                j -= 1;
            }
        }
        while 0 < i {
            aln.aligned1.push(seq1[i - 1]);
            aln.aligned2.push(gap);
            aln.posteriors.push(post.get(State::Insert, i, j));
            i -= 1;
        }
        while 0 < j {
            aln.aligned1.push(gap);
            aln.aligned2.push(seq2[j - 1]);
            aln.posteriors.push(post.get(State::Delete, i, j));
            j -= 1;
        }
        aln.aligned1.reverse();
        aln.aligned2.reverse();
        aln.posteriors.reverse();
        Ok(aln)
    }
}

impl<'a> PairHmmAlgorithm for BackwardPairHmm<'a> {
    fn set_divergence_time(&mut self, time: f64) -> Result<()> {
        self.total = None;
        self.posteriors = None;
        self.hmm.set_divergence_time(time)
    }
    fn divergence_time(&self) -> Option<f64> {
        self.hmm.divergence_time()
    }
    fn run(&mut self) -> Result<f64> {
        let model = self.hmm.model()?.clone();
        let (n, m) = (self.hmm.rows() - 1, self.hmm.cols() - 1);
        let (seq1, seq2) = (self.hmm.seq1(), self.hmm.seq2());
        self.posteriors = None;
        self.mat.initialize();
        self.ins.initialize();
        self.del.initialize();
        for j in (1..=m).rev() {
            self.fill_cell(&model, n, j);
        }
        for i in (1..=n).rev() {
            self.fill_cell(&model, i, m);
        }
        let tr = &model.transitions;
        // Corners which only one state can leave.
        let x_n0 = model.em_y(0) + tr.del.from_insert + self.del.get(n, 1);
        self.ins.set(n, 0, x_n0);
        let y_0m = model.em_x(0) + tr.ins.from_delete + self.ins.get(1, m);
        self.del.set(0, m, y_0m);
        if 0 < n && 0 < m {
            for j in (0..m).rev() {
                if let Some((lo, hi)) = self.hmm.column_ranges(j).del {
                    for i in (lo..=hi.min(n - 1)).rev() {
                        self.fill_cell(&model, i, j);
                    }
                }
            }
            if let Some((lo, hi)) = self.hmm.column_ranges(0).ins {
                for i in (lo..=hi.min(n - 1)).rev() {
                    let (_, bx, _) = self.successors(&model, i, 0);
                    self.ins.set(i, 0, bx);
                }
            }
        }
        self.mat.fill_row(0, MIN_LIKELIHOOD);
        self.ins.fill_row(0, MIN_LIKELIHOOD);
        let eq = &model.equilibrium;
        let bm = self.mat.get(1, 1) + model.em_m(seq1[0], seq2[0]) + eq.init_m;
        let bx = self.ins.get(1, 0) + model.em_x(0) + eq.init_i;
        let by = self.del.get(0, 1) + model.em_y(0) + eq.init_d;
        let total = logsum3(bm, bx, by);
        self.mat.set(0, 0, total);
        trace!("BWD\t{:.5}\t{:.4}\t{}x{}", model.time, total, n, m);
        self.total = Some(total);
        Ok(-total)
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::hky_setup;
    use super::*;
    use crate::band::Band;
    use crate::dptable::Storage;
    use crate::gen_seq;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256StarStar;
    #[test]
    fn forward_backward_agree() {
        let (dict, subst, indel) = hky_setup();
        let mut rng: Xoshiro256StarStar = SeedableRng::seed_from_u64(3904);
        for len in vec![1, 2, 5, 30, 70] {
            let template = gen_seq::generate_seq(&mut rng, len);
            let query = gen_seq::introduce_randomness(&template, &mut rng, &gen_seq::PROFILE);
            let query = if query.is_empty() { b"A".to_vec() } else { query };
            let (xs, ys) = (dict.translate(&template).unwrap(), dict.translate(&query).unwrap());
            for &time in &[0.01, 0.3, 1.5] {
                let hmm = PairHmm::new(&xs, &ys, &dict, &subst, &indel).unwrap();
                let mut fwd = ForwardPairHmm::new(hmm.clone(), Storage::Dense);
                let mut bwd = BackwardPairHmm::new(hmm);
                fwd.set_divergence_time(time).unwrap();
                bwd.set_divergence_time(time).unwrap();
                let (f, b) = (fwd.run().unwrap(), bwd.run().unwrap());
                assert!((f - b).abs() < 0.001, "{}\t{}\t{}\t{}", len, time, f, b);
            }
        }
    }
    #[test]
    fn posteriors_are_probabilities() {
        let (dict, subst, indel) = hky_setup();
        let mut rng: Xoshiro256StarStar = SeedableRng::seed_from_u64(12);
        let template = gen_seq::generate_seq(&mut rng, 50);
        let query = gen_seq::introduce_randomness(&template, &mut rng, &gen_seq::PROFILE);
        let (xs, ys) = (dict.translate(&template).unwrap(), dict.translate(&query).unwrap());
        let hmm = PairHmm::new(&xs, &ys, &dict, &subst, &indel).unwrap();
        let mut fwd = ForwardPairHmm::new(hmm.clone(), Storage::Dense);
        let mut bwd = BackwardPairHmm::new(hmm);
        fwd.set_divergence_time(0.2).unwrap();
        bwd.set_divergence_time(0.2).unwrap();
        fwd.run().unwrap();
        bwd.run().unwrap();
        let post = bwd.calculate_posteriors(&fwd).unwrap();
        for &state in &[State::Match, State::Insert, State::Delete] {
            for j in 0..post.cols() {
                for i in 0..post.rows() {
                    let p = post.get(state, i, j);
                    assert!(p <= 1e-6, "{:?}\t{}\t{}\t{}", state, i, j, p);
                }
            }
        }
        // The last cell is visited by every alignment.
        let (n, m) = (xs.len(), ys.len());
        let last = super::super::logsum3(
            post.get(State::Match, n, m),
            post.get(State::Insert, n, m),
            post.get(State::Delete, n, m),
        );
        assert!(last.abs() < 1e-6, "{}", last);
    }
    #[test]
    fn posteriors_need_matching_runs() {
        let (dict, subst, indel) = hky_setup();
        let xs = dict.translate(b"ACGTTA").unwrap();
        let hmm = PairHmm::new(&xs, &xs, &dict, &subst, &indel).unwrap();
        let mut fwd = ForwardPairHmm::new(hmm.clone(), Storage::Rolling);
        let mut bwd = BackwardPairHmm::new(hmm.clone());
        fwd.set_divergence_time(0.2).unwrap();
        bwd.set_divergence_time(0.2).unwrap();
        fwd.run().unwrap();
        bwd.run().unwrap();
        assert!(matches!(
            bwd.calculate_posteriors(&fwd),
            Err(PahmmError::MissingTraceback)
        ));
        let mut fwd = ForwardPairHmm::new(hmm, Storage::Dense);
        fwd.set_divergence_time(0.3).unwrap();
        fwd.run().unwrap();
        assert!(bwd.calculate_posteriors(&fwd).is_err());
        assert!(bwd.mpd_with_posteriors().is_err());
    }
    #[test]
    fn mpd_recovers_an_obvious_alignment() {
        let (dict, subst, indel) = hky_setup();
        let xs = dict.translate(b"ACGTACGTTTGACCA").unwrap();
        let ys = dict.translate(b"ACGTACGTGACCA").unwrap();
        let hmm = PairHmm::new(&xs, &ys, &dict, &subst, &indel).unwrap();
        let mut fwd = ForwardPairHmm::new(hmm.clone(), Storage::Dense);
        let mut bwd = BackwardPairHmm::new(hmm);
        fwd.set_divergence_time(0.1).unwrap();
        bwd.set_divergence_time(0.1).unwrap();
        fwd.run().unwrap();
        bwd.run().unwrap();
        bwd.calculate_posteriors(&fwd).unwrap();
        let aln = bwd.mpd_with_posteriors().unwrap();
        let gap = dict.gap_code();
        assert_eq!(aln.aligned1.len(), aln.aligned2.len());
        assert_eq!(aln.aligned1.len(), aln.posteriors.len());
        let ungapped: Vec<_> = aln.aligned1.iter().filter(|&&x| x != gap).copied().collect();
        assert_eq!(ungapped, xs);
        let ungapped: Vec<_> = aln.aligned2.iter().filter(|&&x| x != gap).copied().collect();
        assert_eq!(ungapped, ys);
        let gaps = aln.aligned2.iter().filter(|&&x| x == gap).count();
        assert_eq!(gaps, 2);
        assert!(aln.aligned1.iter().all(|&x| x != gap));
        assert!(aln.posteriors.iter().all(|&p| p <= 1e-6));
    }
    #[test]
    fn refined_band_is_within_the_fixed_one() {
        let (dict, subst, indel) = hky_setup();
        let mut rng: Xoshiro256StarStar = SeedableRng::seed_from_u64(481);
        for &(len, ins, del) in &[(80, 0, 0), (100, 6, 0), (100, 0, 6), (120, 3, 3)] {
            let template = gen_seq::generate_seq(&mut rng, len);
            let query = gen_seq::introduce_errors(&template, &mut rng, 4, del, ins);
            let (xs, ys) = (dict.translate(&template).unwrap(), dict.translate(&query).unwrap());
            let band = Band::fixed(xs.len(), ys.len(), 0.1);
            let hmm = PairHmm::new(&xs, &ys, &dict, &subst, &indel)
                .unwrap()
                .with_band(&band);
            let mut fwd = ForwardPairHmm::new(hmm.clone(), Storage::Dense);
            let mut bwd = BackwardPairHmm::new(hmm);
            fwd.set_divergence_time(0.1).unwrap();
            bwd.set_divergence_time(0.1).unwrap();
            fwd.run().unwrap();
            bwd.run().unwrap();
            let post = bwd.calculate_posteriors(&fwd).unwrap();
            let refined = band.refine(post, -12.0);
            assert!(refined.is_within(&band), "{}\n{}", band.dump(), refined.dump());
            assert!(refined.active_cells() < band.active_cells());
        }
    }
}

//! Forward algorithm: the total likelihood of a pair under the model,
//! summed over every alignment allowed by the band.
use super::{logsum3, PairHmm, PairHmmAlgorithm, State, MIN_LIKELIHOOD, XI};
use crate::dptable::{DPTable, Storage};
use crate::error::Result;

#[derive(Debug, Clone)]
pub struct ForwardPairHmm<'a> {
    hmm: PairHmm<'a>,
    mat: DPTable<f64>,
    ins: DPTable<f64>,
    del: DPTable<f64>,
    // ln of the total likelihood (not negated) of the last run.
    total: Option<f64>,
}

impl<'a> ForwardPairHmm<'a> {
    /// A rolling storage is enough for the likelihood, but not for posteriors.
    pub fn new(hmm: PairHmm<'a>, storage: Storage) -> Self {
        let (rows, cols) = (hmm.rows(), hmm.cols());
        Self {
            hmm,
            mat: DPTable::new(storage, rows, cols, MIN_LIKELIHOOD),
            ins: DPTable::new(storage, rows, cols, MIN_LIKELIHOOD),
            del: DPTable::new(storage, rows, cols, MIN_LIKELIHOOD),
            total: None,
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
    /// ln P(seq1, seq2 | t) of the last run.
    pub fn total_log_likelihood(&self) -> Option<f64> {
        self.total
    }
    pub fn storage(&self) -> Storage {
        self.mat.storage()
    }
}

impl<'a> PairHmmAlgorithm for ForwardPairHmm<'a> {
    fn set_divergence_time(&mut self, time: f64) -> Result<()> {
        self.total = None;
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
        mat.initialize();
        ins.initialize();
        del.initialize();
        mat.set(0, 0, eq.pi_m);
        ins.set(0, 0, eq.pi_i);
        del.set(0, 0, eq.pi_d);
        if let Some((lo, hi)) = self.hmm.column_ranges(0).ins {
            for i in lo.max(1)..=hi {
                let x = model.em_x(i - 1)
                    + logsum3(
                        mat.get(i - 1, 0) + tr.ins.from_match,
                        ins.get(i - 1, 0) + tr.ins.from_insert,
                        del.get(i - 1, 0) + tr.ins.from_delete,
                    );
                ins.set(i, 0, x);
            }
        }
        for j in 1..=m {
            mat.begin_column(j);
            ins.begin_column(j);
            del.begin_column(j);
            let ranges = self.hmm.column_ranges(j);
            if let Some((lo, hi)) = ranges.del {
                let em = model.em_y(j - 1);
                for i in lo..=hi {
                    let y = em
                        + logsum3(
                            mat.get(i, j - 1) + tr.del.from_match,
                            ins.get(i, j - 1) + tr.del.from_insert,
                            del.get(i, j - 1) + tr.del.from_delete,
                        );
                    del.set(i, j, y);
                }
            }
            if let Some((lo, hi)) = ranges.mat {
                let b = seq2[j - 1];
                for i in lo.max(1)..=hi {
                    let em = model.em_m(seq1[i - 1], b);
                    let mm = em
                        + logsum3(
                            mat.get(i - 1, j - 1) + tr.mat.from_match,
                            ins.get(i - 1, j - 1) + tr.mat.from_insert,
                            del.get(i - 1, j - 1) + tr.mat.from_delete,
                        );
                    mat.set(i, j, mm);
                }
            }
            if let Some((lo, hi)) = ranges.ins {
                for i in lo.max(1)..=hi {
                    let x = model.em_x(i - 1)
                        + logsum3(
                            mat.get(i - 1, j) + tr.ins.from_match,
                            ins.get(i - 1, j) + tr.ins.from_insert,
                            del.get(i - 1, j) + tr.ins.from_delete,
                        );
                    ins.set(i, j, x);
                }
            }
        }
        let total = logsum3(mat.get(n, m), ins.get(n, m), del.get(n, m)) + XI.ln();
        trace!(
            "FWD\t{:.5}\t{:.4}\t{}x{}",
            model.time,
            total,
            n,
            m
        );
        self.total = Some(total);
        Ok(-total)
    }
}

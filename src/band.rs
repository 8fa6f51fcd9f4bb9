//! Per-column active row ranges of the three pair-HMM states.
//! A band is built either as a fixed-width stripe around the naive diagonal,
//! or by cutting a wider band down to the cells with enough posterior mass.
use crate::hmm::{Posteriors, State};
use std::fmt::Write;

/// Inclusive range of active rows, `None` for an inactive column.
pub type RowRange = Option<(usize, usize)>;

/// The smallest half width of a fixed band.
pub const MIN_BAND_DELTA: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnRanges {
    pub mat: RowRange,
    pub ins: RowRange,
    pub del: RowRange,
}

impl ColumnRanges {
    pub fn get(&self, state: State) -> RowRange {
        match state {
            State::Match => self.mat,
            State::Insert => self.ins,
            State::Delete => self.del,
        }
    }
}

/// Rows run over the first sequence (0..=n), columns over the second (0..=m).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Band {
    rows: usize,
    matches: Vec<RowRange>,
    inserts: Vec<RowRange>,
    deletes: Vec<RowRange>,
}

impl Band {
    /// A band with every column inactive.
    pub fn empty(n: usize, m: usize) -> Self {
        Self {
            rows: n + 1,
            matches: vec![None; m + 1],
            inserts: vec![None; m + 1],
            deletes: vec![None; m + 1],
        }
    }
    /// The ranges of the unbanded computation for column `j` of a matrix with `n+1` rows.
    pub fn full_column(n: usize, j: usize) -> ColumnRanges {
        let all = if n == 0 { None } else { Some((1, n)) };
        if j == 0 {
            ColumnRanges {
                mat: None,
                ins: all,
                del: None,
            }
        } else {
            ColumnRanges {
                mat: all,
                ins: all,
                del: Some((0, n)),
            }
        }
    }
    /// Every cell reachable by the recurrences.
    pub fn full(n: usize, m: usize) -> Self {
        let mut band = Self::empty(n, m);
        for j in 0..=m {
            band.set_column(j, Self::full_column(n, j));
        }
        band
    }
    /// A stripe of `coverage * (n+1)` rows (at least `2 * MIN_BAND_DELTA`)
    /// centered on the straight line from (0,0) to (n,m).
    pub fn fixed(n: usize, m: usize, coverage: f64) -> Self {
        let half = (((coverage * (n + 1) as f64) / 2f64) as usize).max(MIN_BAND_DELTA);
        let mut band = Self::empty(n, m);
        band.inserts[0] = match half.min(n) {
            0 => None,
            hi => Some((1, hi)),
        };
        let slope = (n + 1) as f64 / (m + 1) as f64;
        for j in 1..=m {
            let est = (j as f64 * slope).round() as usize;
            let lo = est.saturating_sub(half);
            let hi = (est + half).min(n);
            let inner = if lo + 1 <= hi { Some((lo + 1, hi)) } else { None };
            band.matches[j] = inner;
            band.inserts[j] = inner;
            band.deletes[j] = if lo <= hi { Some((lo, hi)) } else { None };
        }
        band
    }
    /// Number of rows of the matrices this band was built for.
    pub fn rows(&self) -> usize {
        self.rows
    }
    pub fn cols(&self) -> usize {
        self.matches.len()
    }
    pub fn column(&self, j: usize) -> ColumnRanges {
        ColumnRanges {
            mat: self.matches[j],
            ins: self.inserts[j],
            del: self.deletes[j],
        }
    }
    pub fn range(&self, state: State, j: usize) -> RowRange {
        match state {
            State::Match => self.matches[j],
            State::Insert => self.inserts[j],
            State::Delete => self.deletes[j],
        }
    }
    pub fn set_range(&mut self, state: State, j: usize, range: RowRange) {
        match state {
            State::Match => self.matches[j] = range,
            State::Insert => self.inserts[j] = range,
            State::Delete => self.deletes[j] = range,
        }
    }
    fn set_column(&mut self, j: usize, ranges: ColumnRanges) {
        self.matches[j] = ranges.mat;
        self.inserts[j] = ranges.ins;
        self.deletes[j] = ranges.del;
    }
    /// Total number of active cells, summed over the states.
    pub fn active_cells(&self) -> usize {
        self.matches
            .iter()
            .chain(self.inserts.iter())
            .chain(self.deletes.iter())
            .filter_map(|r| r.map(|(lo, hi)| hi + 1 - lo))
            .sum()
    }
    /// True if every active range of `self` lies inside the same range of `other`.
    pub fn is_within(&self, other: &Band) -> bool {
        if self.cols() != other.cols() {
            return false;
        }
        let states = [State::Match, State::Insert, State::Delete];
        (0..self.cols()).all(|j| {
            states
                .iter()
                .all(|&s| match (self.range(s, j), other.range(s, j)) {
                    (None, _) => true,
                    (Some(_), None) => false,
                    (Some((lo, hi)), Some((olo, ohi))) => olo <= lo && hi <= ohi,
                })
        })
    }
    /// Cut every range down to the first and the last row whose log posterior reaches `threshold`.
    /// Only rows inside the current range are examined.
    pub fn refine(&self, posteriors: &Posteriors, threshold: f64) -> Band {
        let mut refined = self.clone();
        for &state in &[State::Match, State::Insert, State::Delete] {
            for j in 0..self.cols() {
                let range = self.range(state, j).and_then(|(lo, hi)| {
                    let mut passing = (lo..=hi).filter(|&i| posteriors.get(state, i, j) >= threshold);
                    let first = passing.next()?;
                    let last = passing.last().unwrap_or(first);
                    Some((first, last))
                });
                refined.set_range(state, j, range);
            }
        }
        refined
    }
    /// One line per column: `j M[lo,hi] I[lo,hi] D[lo,hi]`.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        let fmt = |r: RowRange| match r {
            Some((lo, hi)) => format!("[{},{}]", lo, hi),
            None => "[-1,-1]".to_string(),
        };
        for j in 0..self.cols() {
            let c = self.column(j);
            let _ = writeln!(
                &mut out,
                "{}\tM{}\tI{}\tD{}",
                j,
                fmt(c.mat),
                fmt(c.ins),
                fmt(c.del)
            );
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn fixed_band_layout() {
        let band = Band::fixed(100, 100, 0.1);
        // half width = max(trunc(0.1 * 101 / 2), 7) = 7
        assert_eq!(band.column(0).mat, None);
        assert_eq!(band.column(0).del, None);
        assert_eq!(band.column(0).ins, Some((1, 7)));
        assert_eq!(band.column(50).mat, Some((44, 57)));
        assert_eq!(band.column(50).ins, Some((44, 57)));
        assert_eq!(band.column(50).del, Some((43, 57)));
        assert_eq!(band.column(3).del, Some((0, 10)));
        assert_eq!(band.column(3).mat, Some((1, 10)));
        assert_eq!(band.column(100).mat, Some((94, 100)));
    }
    #[test]
    fn wide_band_on_short_sequences_is_full() {
        for n in 1..=7 {
            for m in 1..=9 {
                assert_eq!(Band::fixed(n, m, 1.0), Band::full(n, m), "{},{}", n, m);
            }
        }
    }
    #[test]
    fn band_follows_the_diagonal_of_unequal_lengths() {
        let band = Band::fixed(200, 100, 0.075);
        let mut prev = (0, 0);
        for j in 1..=100 {
            let (lo, hi) = band.column(j).mat.unwrap();
            assert!(prev.0 <= lo && prev.1 <= hi, "{}: {:?} -> {:?}", j, prev, (lo, hi));
            prev = (lo, hi);
        }
        assert_eq!(band.column(100).mat.map(|r| r.1), Some(200));
    }
    #[test]
    fn containment() {
        let wide = Band::fixed(50, 50, 0.5);
        let narrow = Band::fixed(50, 50, 0.1);
        assert!(narrow.is_within(&wide));
        assert!(!wide.is_within(&narrow));
        assert!(wide.is_within(&Band::full(50, 50)));
        assert!(Band::empty(50, 50).is_within(&narrow));
        assert!(narrow.active_cells() < wide.active_cells());
    }
    #[test]
    fn dump_format() {
        let dump = Band::fixed(3, 2, 1.0).dump();
        let lines: Vec<_> = dump.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "0\tM[-1,-1]\tI[1,3]\tD[-1,-1]");
        assert_eq!(lines[1], "1\tM[1,3]\tI[1,3]\tD[0,3]");
    }
}

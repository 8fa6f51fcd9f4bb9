//! A translated set of input sequences.
use crate::dictionary::{Alphabet, Dictionary};
use crate::error::{PahmmError, Result};
use crate::fasta::FASTARecord;

/// Smallest equilibrium frequency handed to a substitution model.
pub const MIN_FREQUENCY: f64 = 1e-3;

#[derive(Debug, Clone)]
pub struct Sequences {
    dictionary: Dictionary,
    names: Vec<String>,
    raw: Vec<Vec<u8>>,
    codes: Vec<Vec<u8>>,
}

impl Sequences {
    /// Translate the records. Gaps are removed, so an alignment can be given as well.
    pub fn new(records: &[FASTARecord], alphabet: Alphabet) -> Result<Self> {
        if records.is_empty() {
            return Err(PahmmError::InvalidInput("no sequences found".to_string()));
        }
        let dictionary = Dictionary::new(alphabet);
        let mut names = Vec::with_capacity(records.len());
        let mut raw = Vec::with_capacity(records.len());
        let mut codes = Vec::with_capacity(records.len());
        for (name, seq) in records {
            let translated = dictionary.translate(seq).map_err(|e| match e {
                PahmmError::InvalidInput(msg) => {
                    PahmmError::InvalidInput(format!("{} (sequence {})", msg, name))
                }
                e => e,
            })?;
            if translated.is_empty() {
                return Err(PahmmError::InvalidInput(format!(
                    "sequence {} has no residues",
                    name
                )));
            }
            let stripped: Vec<u8> = seq
                .iter()
                .filter(|b| b.is_ascii_alphabetic())
                .map(|b| b.to_ascii_uppercase())
                .collect();
            names.push(name.clone());
            raw.push(stripped);
            codes.push(translated);
        }
        Ok(Self {
            dictionary,
            names,
            raw,
            codes,
        })
    }
    /// Same as `new`, guessing the alphabet from the contents.
    pub fn detect(records: &[FASTARecord]) -> Result<Self> {
        let seqs: Vec<&[u8]> = records.iter().map(|x| x.1.as_slice()).collect();
        Self::new(records, Alphabet::detect(&seqs))
    }
    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }
    pub fn len(&self) -> usize {
        self.names.len()
    }
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
    pub fn name(&self, i: usize) -> &str {
        &self.names[i]
    }
    pub fn names(&self) -> &[String] {
        &self.names
    }
    /// Upper-cased residues without gaps.
    pub fn raw(&self, i: usize) -> &[u8] {
        &self.raw[i]
    }
    pub fn codes(&self, i: usize) -> &[u8] {
        &self.codes[i]
    }
    /// All (i,j) with i < j, in index order.
    pub fn pairs(&self) -> Vec<(usize, usize)> {
        let n = self.len();
        (0..n)
            .flat_map(|i| (i + 1..n).map(move |j| (i, j)))
            .collect()
    }
    /// Residue frequencies over the whole set.
    /// An ambiguity symbol adds one count to each residue it may stand for.
    pub fn observed_frequencies(&self) -> Vec<f64> {
        let dict = &self.dictionary;
        let mut counts = vec![0f64; dict.alphabet_size()];
        let symbols: Vec<u8> = (0..dict.code_count() as u8)
            .filter(|&c| !dict.is_gap(c))
            .map(|c| dict.symbol(c))
            .collect();
        let mut total = 0f64;
        for &symbol in symbols.iter() {
            let occ: usize = self.raw.iter().map(|seq| bytecount::count(seq, symbol)).sum();
            if occ == 0 {
                continue;
            }
            if let Ok(code) = dict.code(symbol) {
                for &m in dict.members(code) {
                    counts[m as usize] += occ as f64;
                    total += occ as f64;
                }
            }
        }
        // 'U' shares the code of 'T'.
        if dict.alphabet() == Alphabet::Nucleotide {
            let occ: usize = self.raw.iter().map(|seq| bytecount::count(seq, b'U')).sum();
            if let Ok(code) = dict.code(b'U') {
                counts[code as usize] += occ as f64;
                total += occ as f64;
            }
        }
        if total > 0f64 {
            counts.iter_mut().for_each(|x| *x /= total);
        }
        counts
    }
    /// Observed frequencies raised to at least `MIN_FREQUENCY` and renormalised,
    /// so a residue absent from the input still gets a valid model.
    pub fn equilibrium_frequencies(&self) -> Vec<f64> {
        let mut freqs = self.observed_frequencies();
        let missing: Vec<char> = freqs
            .iter()
            .enumerate()
            .filter(|(_, &f)| f < MIN_FREQUENCY)
            .map(|(i, _)| self.dictionary.symbol(i as u8) as char)
            .collect();
        if !missing.is_empty() {
            warn!(
                "residues {:?} are (almost) absent, their frequency is raised to {}",
                missing, MIN_FREQUENCY
            );
        }
        freqs.iter_mut().for_each(|f| *f = f.max(MIN_FREQUENCY));
        let sum: f64 = freqs.iter().sum();
        freqs.iter_mut().for_each(|f| *f /= sum);
        freqs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    fn records(seqs: &[&[u8]]) -> Vec<FASTARecord> {
        seqs.iter()
            .enumerate()
            .map(|(i, s)| (format!("s{}", i), s.to_vec()))
            .collect()
    }
    #[test]
    fn frequencies_with_classes() {
        let recs = records(&[b"TTCA", b"GN-", b"tu"]);
        let seqs = Sequences::new(&recs, Alphabet::Nucleotide).unwrap();
        let freqs = seqs.observed_frequencies();
        // T:2+1(N)+2(t,u) C:1+1 A:1+1 G:1+1 -> 5,2,2,2 over 11.
        let expected = [5. / 11., 2. / 11., 2. / 11., 2. / 11.];
        for (x, y) in freqs.iter().zip(expected.iter()) {
            assert!((x - y).abs() < 1e-12, "{:?}", freqs);
        }
        assert_eq!(seqs.codes(1), &[3, seqs.dictionary().code(b'N').unwrap()]);
        assert_eq!(seqs.raw(1), b"GN");
    }
    #[test]
    fn absent_residues_get_a_floor() {
        let recs = records(&[b"AAACCCTTT", b"ACTACT"]);
        let seqs = Sequences::new(&recs, Alphabet::Nucleotide).unwrap();
        let g = seqs.dictionary().code(b'G').unwrap() as usize;
        assert_eq!(seqs.observed_frequencies()[g], 0.0);
        let freqs = seqs.equilibrium_frequencies();
        assert!(freqs[g] > 0.0 && freqs[g] <= MIN_FREQUENCY, "{:?}", freqs);
        assert!((freqs.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        let model = crate::model::Hky85::new(2.0).unwrap().build(&freqs);
        assert!(model.is_ok());
        assert!(crate::model::Hky85::new(2.0)
            .unwrap()
            .build(&seqs.observed_frequencies())
            .is_err());
    }
    #[test]
    fn pair_order() {
        let recs = records(&[b"A", b"C", b"G", b"T"]);
        let seqs = Sequences::new(&recs, Alphabet::Nucleotide).unwrap();
        assert_eq!(
            seqs.pairs(),
            vec![(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)]
        );
    }
    #[test]
    fn rejects_bad_input() {
        assert!(Sequences::new(&[], Alphabet::Nucleotide).is_err());
        let recs = records(&[b"---"]);
        assert!(Sequences::new(&recs, Alphabet::Nucleotide).is_err());
        let recs = records(&[b"ACGJ"]);
        assert!(Sequences::new(&recs, Alphabet::Nucleotide).is_err());
    }
}

//! Pairwise evolutionary distances with a banded pair-HMM.
//!
//! For every pair of input sequences, the divergence time maximising the pair-HMM
//! likelihood (Forward, or Viterbi) is searched by Brent's method. The band of the
//! dynamic programming is first estimated from a k-mer guide distance and a
//! Forward/Backward pass, so each evaluation touches only a fraction of the matrix.
//! The distances are then joined into a BioNJ tree.
#[macro_use]
extern crate log;
pub mod band;
pub mod band_calculator;
pub mod brent;
pub mod config;
pub mod dictionary;
pub mod distance;
pub mod dptable;
pub mod driver;
pub mod error;
pub mod fasta;
pub mod gen_seq;
pub mod guide;
pub mod hmm;
pub mod model;
pub mod sequences;
pub mod tree;

pub use band::Band;
pub use config::{Algorithm, DistanceConfig, MatrixStorage};
pub use distance::DistanceMatrix;
pub use driver::{DistanceEstimate, PairResult, PairStatus, PairwiseDistanceDriver};
pub use error::{PahmmError, Result};
pub use sequences::Sequences;

/// Read a FASTA file into sequences. The alphabet is detected when `alphabet` is `None`.
pub fn read_sequences<P: AsRef<std::path::Path>>(
    path: P,
    alphabet: Option<dictionary::Alphabet>,
) -> Result<Sequences> {
    let records = fasta::read_fasta(&Some(path))?;
    match alphabet {
        Some(alphabet) => Sequences::new(&records, alphabet),
        None => Sequences::detect(&records),
    }
}

/// Estimate the pairwise distances of `seqs` and join them into a tree.
pub fn distances_and_tree(
    seqs: &Sequences,
    driver: &PairwiseDistanceDriver,
) -> Result<(DistanceEstimate, tree::PhyloTree)> {
    let estimate = driver.run(seqs)?;
    let tree = tree::bionj(&estimate.matrix, seqs.names())?;
    Ok((estimate, tree))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dictionary::Alphabet;
    #[test]
    fn read_sequences_from_file() {
        let path = std::env::temp_dir().join("pahmm_read_sequences_test.fa");
        std::fs::write(&path, ">a\nACGT-ACGT\n>b\nACGTTACG\n>c\nAC\nGTACGT\n").unwrap();
        let seqs = read_sequences(&path, None).unwrap();
        assert_eq!(seqs.len(), 3);
        assert_eq!(seqs.dictionary().alphabet(), Alphabet::Nucleotide);
        assert_eq!(seqs.name(0), "a");
        let forced = read_sequences(&path, Some(Alphabet::AminoAcid)).unwrap();
        assert_eq!(forced.dictionary().alphabet(), Alphabet::AminoAcid);
        std::fs::remove_file(&path).unwrap();
        assert!(read_sequences(&path, None).is_err());
    }
}

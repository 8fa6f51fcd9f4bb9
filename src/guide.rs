//! Rough divergence of every pair from shared k-mers.
//! It only has to place a pair in the right regime and give the band calculator a starting time.
use crate::dictionary::Alphabet;
use crate::distance::DistanceMatrix;
use crate::sequences::Sequences;
use rayon::prelude::*;
use std::collections::HashMap;

pub const NUCLEOTIDE_KMER: usize = 7;
pub const AMINO_ACID_KMER: usize = 4;

pub fn kmer_size(alphabet: Alphabet) -> usize {
    match alphabet {
        Alphabet::Nucleotide => NUCLEOTIDE_KMER,
        Alphabet::AminoAcid => AMINO_ACID_KMER,
    }
}

/// Multiset of the k-mers of `seq`. Empty if `seq` is shorter than k.
pub fn kmer_counts(seq: &[u8], k: usize) -> HashMap<&[u8], u32> {
    let mut counts = HashMap::new();
    if k <= seq.len() {
        for kmer in seq.windows(k) {
            *counts.entry(kmer).or_default() += 1;
        }
    }
    counts
}

pub fn common_kmers(xs: &HashMap<&[u8], u32>, ys: &HashMap<&[u8], u32>) -> u32 {
    xs.iter()
        .filter_map(|(kmer, &c)| ys.get(kmer).map(|&d| c.min(d)))
        .sum()
}

/// Map the raw k-mer distance onto the divergence time scale.
pub fn adjust(alphabet: Alphabet, d: f64) -> f64 {
    match alphabet {
        Alphabet::Nucleotide => 700f64.powf(d - 0.95) + 0.02,
        Alphabet::AminoAcid => (100f64.powf(d - 1.04) + 0.01) / 0.6,
    }
}

/// 1 - (shared k-mers)/(shorter length).
pub fn kmer_distance(xs: &HashMap<&[u8], u32>, ys: &HashMap<&[u8], u32>, len1: usize, len2: usize) -> f64 {
    let shorter = len1.min(len2).max(1) as f64;
    1f64 - common_kmers(xs, ys) as f64 / shorter
}

/// Adjusted k-mer distances of every pair.
pub fn guide_distances(seqs: &Sequences) -> DistanceMatrix {
    let alphabet = seqs.dictionary().alphabet();
    let k = kmer_size(alphabet);
    let counts: Vec<_> = (0..seqs.len())
        .into_par_iter()
        .map(|i| kmer_counts(seqs.raw(i), k))
        .collect();
    let distances: Vec<_> = seqs
        .pairs()
        .into_par_iter()
        .map(|(i, j)| {
            let (len1, len2) = (seqs.raw(i).len(), seqs.raw(j).len());
            let d = kmer_distance(&counts[i], &counts[j], len1, len2);
            let adjusted = adjust(alphabet, d);
            debug!("GUIDE\t{}\t{}\t{:.4}\t{:.4}", i, j, d, adjusted);
            (i, j, adjusted)
        })
        .collect();
    let mut matrix = DistanceMatrix::new(seqs.len());
    for (i, j, d) in distances {
        matrix.set(i, j, d);
    }
    matrix
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn counting() {
        let counts = kmer_counts(b"AAAAA", 3);
        assert_eq!(counts.len(), 1);
        assert_eq!(counts[&b"AAA"[..]], 3);
        assert!(kmer_counts(b"AC", 3).is_empty());
        let xs = kmer_counts(b"ACGTAC", 2);
        let ys = kmer_counts(b"ACAC", 2);
        // AC:2/2, CA:0/1, CG:1/0, GT:1/0, TA:1/0
        assert_eq!(common_kmers(&xs, &ys), 2);
        assert_eq!(common_kmers(&ys, &xs), 2);
    }
    #[test]
    fn distances() {
        let xs = kmer_counts(b"ACGTACGTAC", 7);
        let d = kmer_distance(&xs, &xs, 10, 10);
        assert!((d - 0.6).abs() < 1e-12, "{}", d);
        let short = kmer_counts(b"ACG", 7);
        assert_eq!(kmer_distance(&xs, &short, 10, 3), 1.0);
    }
    #[test]
    fn adjustment() {
        let d = adjust(Alphabet::Nucleotide, 0.95);
        assert!((d - 1.02).abs() < 1e-12);
        assert!(adjust(Alphabet::Nucleotide, 0.1) < 0.03);
        let d = adjust(Alphabet::AminoAcid, 1.04);
        assert!((d - 1.01 / 0.6).abs() < 1e-12);
    }
    #[test]
    fn matrix_of_a_set() {
        let records = vec![
            ("a".to_string(), b"ACGTTGCAACGTTGCATTGACA".to_vec()),
            ("b".to_string(), b"ACGTTGCAACGTTGCATTGACA".to_vec()),
            ("c".to_string(), b"TTTTTTTTGGGGGGGGCCCCAA".to_vec()),
        ];
        let seqs = Sequences::new(&records, Alphabet::Nucleotide).unwrap();
        let dm = guide_distances(&seqs);
        assert!(dm.get(0, 1) < dm.get(0, 2));
        assert_eq!(dm.get(0, 2), dm.get(2, 0));
        assert!((dm.get(0, 2) - adjust(Alphabet::Nucleotide, 1.0)).abs() < 1e-12);
    }
}

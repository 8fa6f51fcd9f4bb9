//! Alphabets and the translation from raw symbols into matrix codes.
//! A code below the alphabet size is a plain residue, the alphabet size itself is the gap,
//! and every code above it is an ambiguity class owned by the dictionary.
use crate::error::{PahmmError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Alphabet {
    Nucleotide,
    AminoAcid,
}

const NUCLEOTIDES: &[u8] = b"TCAG";
const AMINO_ACIDS: &[u8] = b"ARNDCQEGHILKMFPSTWYV";
const NUCLEOTIDE_CLASSES: &[(u8, &[u8])] = &[
    (b'R', b"AG"),
    (b'Y', b"CT"),
    (b'K', b"GT"),
    (b'M', b"AC"),
    (b'S', b"CG"),
    (b'W', b"AT"),
    (b'B', b"CGT"),
    (b'D', b"AGT"),
    (b'H', b"ACT"),
    (b'V', b"ACG"),
    (b'N', b"ACGT"),
];
const AMINO_ACID_CLASSES: &[(u8, &[u8])] = &[
    (b'B', b"DN"),
    (b'J', b"LI"),
    (b'Z', b"EQ"),
    (b'X', b"ARNDCQEGHILKMFPSTWYV"),
];
pub const GAP_SYMBOLS: &[u8] = b"-.";
const UNUSED: u8 = u8::MAX;

impl Alphabet {
    pub fn symbols(self) -> &'static [u8] {
        match self {
            Alphabet::Nucleotide => NUCLEOTIDES,
            Alphabet::AminoAcid => AMINO_ACIDS,
        }
    }
    pub fn size(self) -> usize {
        self.symbols().len()
    }
    fn classes(self) -> &'static [(u8, &'static [u8])] {
        match self {
            Alphabet::Nucleotide => NUCLEOTIDE_CLASSES,
            Alphabet::AminoAcid => AMINO_ACID_CLASSES,
        }
    }
    /// Guess the alphabet of a set of raw sequences.
    /// Nucleotides when at least 90% of the letters are one of ACGTUN.
    pub fn detect<T: std::borrow::Borrow<[u8]>>(seqs: &[T]) -> Self {
        let (mut nuc, mut total) = (0usize, 0usize);
        for seq in seqs.iter().map(|x| x.borrow()) {
            total += seq.iter().filter(|x| x.is_ascii_alphabetic()).count();
            nuc += b"ACGTUNacgtun"
                .iter()
                .map(|&b| bytecount::count(seq, b))
                .sum::<usize>();
        }
        if total > 0 && nuc * 10 >= total * 9 {
            Alphabet::Nucleotide
        } else {
            Alphabet::AminoAcid
        }
    }
}

/// Symbol translator. The member lists of all codes live here, and sequences
/// only carry codes pointing into them.
#[derive(Debug, Clone)]
pub struct Dictionary {
    alphabet: Alphabet,
    // code -> symbol.
    symbols: Vec<u8>,
    // code -> plain residues it stands for. Empty for the gap.
    members: Vec<Vec<u8>>,
    // ASCII -> code.
    translator: [u8; 256],
}

impl Dictionary {
    pub fn new(alphabet: Alphabet) -> Self {
        let mut translator = [UNUSED; 256];
        let mut symbols = vec![];
        let mut members = vec![];
        for (code, &symbol) in alphabet.symbols().iter().enumerate() {
            translator[symbol as usize] = code as u8;
            translator[symbol.to_ascii_lowercase() as usize] = code as u8;
            symbols.push(symbol);
            members.push(vec![code as u8]);
        }
        let gap = alphabet.size() as u8;
        for &g in GAP_SYMBOLS {
            translator[g as usize] = gap;
        }
        symbols.push(b'-');
        members.push(vec![]);
        if alphabet == Alphabet::Nucleotide {
            translator[b'U' as usize] = translator[b'T' as usize];
            translator[b'u' as usize] = translator[b'T' as usize];
        }
        for &(symbol, class) in alphabet.classes() {
            let code = symbols.len() as u8;
            let ids: Vec<u8> = class
                .iter()
                .map(|&b| translator[b as usize])
                .collect();
            translator[symbol as usize] = code;
            translator[symbol.to_ascii_lowercase() as usize] = code;
            symbols.push(symbol);
            members.push(ids);
        }
        Self {
            alphabet,
            symbols,
            members,
            translator,
        }
    }
    pub fn alphabet(&self) -> Alphabet {
        self.alphabet
    }
    pub fn alphabet_size(&self) -> usize {
        self.alphabet.size()
    }
    pub fn gap_code(&self) -> u8 {
        self.alphabet.size() as u8
    }
    /// Number of distinct codes, including the gap and the ambiguity classes.
    pub fn code_count(&self) -> usize {
        self.symbols.len()
    }
    pub fn is_gap(&self, code: u8) -> bool {
        code == self.gap_code()
    }
    pub fn is_class(&self, code: u8) -> bool {
        code > self.gap_code()
    }
    pub fn members(&self, code: u8) -> &[u8] {
        &self.members[code as usize]
    }
    pub fn symbol(&self, code: u8) -> u8 {
        self.symbols[code as usize]
    }
    pub fn code(&self, symbol: u8) -> Result<u8> {
        match self.translator[symbol as usize] {
            UNUSED => Err(PahmmError::InvalidInput(format!(
                "symbol {:?} is not in the {:?} dictionary",
                symbol as char, self.alphabet
            ))),
            code => Ok(code),
        }
    }
    /// Translate a raw sequence. Gaps are dropped; whitespace is ignored.
    pub fn translate(&self, seq: &[u8]) -> Result<Vec<u8>> {
        let mut codes = Vec::with_capacity(seq.len());
        for &b in seq.iter().filter(|b| !b.is_ascii_whitespace()) {
            let code = self.code(b)?;
            if !self.is_gap(code) {
                codes.push(code);
            }
        }
        Ok(codes)
    }
    pub fn to_symbols(&self, codes: &[u8]) -> Vec<u8> {
        codes.iter().map(|&c| self.symbol(c)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn nucleotide_codes() {
        let dict = Dictionary::new(Alphabet::Nucleotide);
        assert_eq!(dict.alphabet_size(), 4);
        assert_eq!(dict.translate(b"TCAG").unwrap(), vec![0, 1, 2, 3]);
        assert_eq!(dict.translate(b"tc-ag").unwrap(), vec![0, 1, 2, 3]);
        assert_eq!(dict.code(b'U').unwrap(), 0);
        let n = dict.code(b'N').unwrap();
        assert!(dict.is_class(n));
        let mut members = dict.members(n).to_vec();
        members.sort();
        assert_eq!(members, vec![0, 1, 2, 3]);
        let r = dict.code(b'r').unwrap();
        let mut members = dict.members(r).to_vec();
        members.sort();
        assert_eq!(members, vec![2, 3]);
        assert!(dict.translate(b"ACGZ").is_err());
        assert_eq!(dict.code_count(), 4 + 1 + 11);
    }
    #[test]
    fn amino_acid_codes() {
        let dict = Dictionary::new(Alphabet::AminoAcid);
        assert_eq!(dict.gap_code(), 20);
        let x = dict.code(b'X').unwrap();
        assert_eq!(dict.members(x).len(), 20);
        let b = dict.code(b'B').unwrap();
        assert_eq!(dict.members(b), &[3, 2]);
        assert_eq!(dict.to_symbols(&dict.translate(b"arnd").unwrap()), b"ARND");
    }
    #[test]
    fn detect_alphabet() {
        let nuc: Vec<&[u8]> = vec![b"ACGTACGTNN", b"acgu-acg"];
        assert_eq!(Alphabet::detect(&nuc), Alphabet::Nucleotide);
        let aa: Vec<&[u8]> = vec![b"MKVLAAGIVG", b"WYRHEDQK"];
        assert_eq!(Alphabet::detect(&aa), Alphabet::AminoAcid);
    }
}

//! Random sequences and mutated copies of them, to check the estimator on known divergences.
//! Not used by the distance pipeline itself.
use rand::seq::SliceRandom;
use rand::Rng;

pub const NUCLEOTIDES: &[u8] = b"ACGT";
pub const AMINO_ACIDS: &[u8] = b"ARNDCQEGHILKMFPSTWYV";

/// Per-residue rates of each kind of edit.
#[derive(Debug, Clone, Copy)]
pub struct Profile {
    pub sub: f64,
    pub del: f64,
    pub ins: f64,
}
impl Profile {
    pub fn sum(&self) -> f64 {
        self.sub + self.del + self.ins
    }
    pub fn mul(&self, x: f64) -> Self {
        Self {
            sub: self.sub * x,
            ins: self.ins * x,
            del: self.del * x,
        }
    }
}

pub const PROFILE: Profile = Profile {
    sub: 0.04,
    del: 0.02,
    ins: 0.02,
};

#[derive(Debug, Clone, Copy)]
enum Op {
    Match,
    MisMatch,
    Del,
    In,
}
impl Op {
    fn weight(self, p: &Profile) -> f64 {
        match self {
            Op::Match => (1. - p.sum()).max(0.),
            Op::MisMatch => p.sub,
            Op::Del => p.del,
            Op::In => p.ins,
        }
    }
}
const OPERATIONS: [Op; 4] = [Op::Match, Op::MisMatch, Op::Del, Op::In];

pub fn generate_seq<R: Rng>(rng: &mut R, len: usize) -> Vec<u8> {
    generate_from(rng, len, NUCLEOTIDES)
}

pub fn generate_protein<R: Rng>(rng: &mut R, len: usize) -> Vec<u8> {
    generate_from(rng, len, AMINO_ACIDS)
}

fn generate_from<R: Rng>(rng: &mut R, len: usize, residues: &[u8]) -> Vec<u8> {
    (0..len).filter_map(|_| residues.choose(rng)).copied().collect()
}

fn residues_of(seq: &[u8]) -> &'static [u8] {
    if seq.iter().all(|b| NUCLEOTIDES.contains(b)) {
        NUCLEOTIDES
    } else {
        AMINO_ACIDS
    }
}

fn apply<R: Rng>(seq: &[u8], rng: &mut R, operations: &[Op], residues: &[u8]) -> Vec<u8> {
    let mut res = Vec::with_capacity(seq.len());
    let mut remainings: Vec<_> = seq.iter().copied().rev().collect();
    for op in operations {
        match op {
            Op::Match => res.extend(remainings.pop()),
            Op::MisMatch => {
                if let Some(residue) = remainings.pop() {
                    res.push(substitute(rng, residue, residues));
                }
            }
            Op::In => res.extend(residues.choose(rng)),
            Op::Del => {
                remainings.pop();
            }
        }
    }
    res.extend(remainings.into_iter().rev());
    res
}

/// Edit each residue independently with the rates of `p`.
/// Substitutes and insertions are drawn from the alphabet of `seq`.
pub fn introduce_randomness<R: Rng>(seq: &[u8], rng: &mut R, p: &Profile) -> Vec<u8> {
    let residues = residues_of(seq);
    let mut operations = Vec::with_capacity(seq.len());
    let mut consumed = 0;
    while consumed < seq.len() {
        let op = match OPERATIONS.choose_weighted(rng, |e| e.weight(p)) {
            Ok(&op) => op,
            Err(_) => Op::Match,
        };
        if !matches!(op, Op::In) {
            consumed += 1;
        }
        operations.push(op);
    }
    apply(seq, rng, &operations, residues)
}

/// Exactly `sub` substitutions, `del` deletions and `ins` insertions at random positions.
pub fn introduce_errors<R: Rng>(seq: &[u8], rng: &mut R, sub: usize, del: usize, ins: usize) -> Vec<u8> {
    let residues = residues_of(seq);
    let sub = sub.min(seq.len());
    let del = del.min(seq.len() - sub);
    let mut operations = vec![
        vec![Op::Match; seq.len() - sub - del],
        vec![Op::MisMatch; sub],
        vec![Op::Del; del],
        vec![Op::In; ins],
    ]
    .concat();
    operations.shuffle(rng);
    apply(seq, rng, &operations, residues)
}

fn substitute<R: Rng>(rng: &mut R, residue: u8, residues: &[u8]) -> u8 {
    let others: Vec<u8> = residues.iter().filter(|&&e| e != residue).copied().collect();
    others.choose(rng).copied().unwrap_or(residue)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256StarStar;
    #[test]
    fn exact_errors() {
        let mut rng: Xoshiro256StarStar = SeedableRng::seed_from_u64(24);
        let template = generate_seq(&mut rng, 100);
        assert!(template.iter().all(|b| NUCLEOTIDES.contains(b)));
        let query = introduce_errors(&template, &mut rng, 5, 0, 0);
        assert_eq!(query.len(), 100);
        let diff = template.iter().zip(query.iter()).filter(|(a, b)| a != b).count();
        assert_eq!(diff, 5);
        let query = introduce_errors(&template, &mut rng, 0, 4, 7);
        assert_eq!(query.len(), 103);
        let query = introduce_errors(&template[..3], &mut rng, 2, 5, 0);
        assert_eq!(query.len(), 2);
    }
    #[test]
    fn proteins_stay_proteins() {
        let mut rng: Xoshiro256StarStar = SeedableRng::seed_from_u64(94);
        let template = generate_protein(&mut rng, 200);
        let query = introduce_randomness(&template, &mut rng, &PROFILE.mul(2.0));
        assert!(query.iter().all(|b| AMINO_ACIDS.contains(b)));
        assert!(query.len() > 150, "{}", query.len());
    }
}

//! BioNJ (Gascuel, 1997) over a distance matrix.
//! Same agglomeration as neighbour joining, but each new node is placed with a weight
//! minimising the variance of its distances to the remaining nodes.
use crate::distance::DistanceMatrix;
use crate::error::{PahmmError, Result};

/// Branch lengths never go below this.
pub const MIN_BRANCH_LENGTH: f64 = 1e-8;

#[derive(Debug, Clone, PartialEq)]
pub struct PhyloTree {
    /// Unrooted tree in Newick format, with the trailing semicolon.
    pub newick: String,
    /// Sum of the branch lengths.
    pub length: f64,
}

fn clamp(length: f64) -> f64 {
    if length < 0f64 {
        MIN_BRANCH_LENGTH
    } else {
        length
    }
}

// The pair (a,b) of active nodes minimising (r-2)d_ab - S_a - S_b. The first pair wins a tie.
fn select_pair(d: &[Vec<f64>], active: &[usize], sums: &[f64]) -> (usize, usize) {
    let r = active.len() as f64;
    let mut best = (0, 1);
    let mut min_q = std::f64::INFINITY;
    for (p, &i) in active.iter().enumerate() {
        for (q, &j) in active.iter().enumerate().skip(p + 1) {
            let value = (r - 2f64) * d[i][j] - sums[i] - sums[j];
            if value < min_q {
                min_q = value;
                best = (p, q);
            }
        }
    }
    best
}

pub fn bionj(dm: &DistanceMatrix, names: &[String]) -> Result<PhyloTree> {
    let size = dm.size();
    if size < 3 || names.len() != size {
        return Err(PahmmError::InvalidInput(format!(
            "BioNJ needs at least three named taxa ({} distances, {} names)",
            size,
            names.len()
        )));
    }
    let mut d: Vec<Vec<f64>> = (0..size).map(|i| dm.row(i).to_vec()).collect();
    let mut v = d.clone();
    let mut labels: Vec<String> = names.to_vec();
    let mut active: Vec<usize> = (0..size).collect();
    let mut length = 0f64;
    while active.len() > 3 {
        let r = active.len() as f64;
        let sums: Vec<f64> = (0..size)
            .map(|i| active.iter().map(|&k| d[i][k]).sum())
            .collect();
        let (p, q) = select_pair(&d, &active, &sums);
        let (a, b) = (active[p], active[q]);
        let d_ab = d[a][b];
        let la = 0.5 * (d_ab + (sums[a] - sums[b]) / (r - 2f64));
        let lb = d_ab - la;
        let lambda = if v[a][b] == 0f64 {
            0.5
        } else {
            let diff: f64 = active
                .iter()
                .filter(|&&i| i != a && i != b)
                .map(|&i| v[b][i] - v[a][i])
                .sum();
            (0.5 + diff / (2f64 * (r - 2f64) * v[a][b])).max(0f64).min(1f64)
        };
        trace!("JOIN\t{}\t{}\t{:.5}\t{:.5}\t{:.3}", a, b, la, lb, lambda);
        // The new node takes the slot of `a`.
        for &i in active.iter().filter(|&&i| i != a && i != b) {
            let d_ui = lambda * (d[a][i] - la) + (1f64 - lambda) * (d[b][i] - lb);
            let v_ui = lambda * v[a][i] + (1f64 - lambda) * v[b][i]
                - lambda * (1f64 - lambda) * v[a][b];
            d[a][i] = d_ui;
            d[i][a] = d_ui;
            v[a][i] = v_ui;
            v[i][a] = v_ui;
        }
        let (la, lb) = (clamp(la), clamp(lb));
        length += la + lb;
        labels[a] = format!("({}:{:.8},{}:{:.8})", labels[a], la, labels[b], lb);
        active.remove(q);
    }
    let (i, j, k) = (active[0], active[1], active[2]);
    let li = clamp(0.5 * (d[i][j] + d[i][k] - d[j][k]));
    let lj = clamp(0.5 * (d[i][j] + d[j][k] - d[i][k]));
    let lk = clamp(0.5 * (d[i][k] + d[j][k] - d[i][j]));
    length += li + lj + lk;
    let newick = format!(
        "({}:{:.8},{}:{:.8},{}:{:.8});",
        labels[i], li, labels[j], lj, labels[k], lk
    );
    Ok(PhyloTree { newick, length })
}

#[cfg(test)]
mod tests {
    use super::*;
    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| ((b'A' + i as u8) as char).to_string()).collect()
    }
    #[test]
    fn additive_four_taxa() {
        let mut dm = DistanceMatrix::new(4);
        let pairs = [(0, 1, 3.0), (0, 2, 3.0), (0, 3, 4.0), (1, 2, 4.0), (1, 3, 5.0), (2, 3, 4.0)];
        for &(i, j, d) in pairs.iter() {
            dm.set(i, j, d);
        }
        let tree = bionj(&dm, &names(4)).unwrap();
        assert_eq!(
            tree.newick,
            "((A:1.00000000,B:2.00000000):0.50000000,C:1.50000000,D:2.50000000);"
        );
        assert!((tree.length - 7.5).abs() < 1e-9, "{}", tree.length);
    }
    #[test]
    fn three_taxa_star() {
        let mut dm = DistanceMatrix::new(3);
        dm.set(0, 1, 0.3);
        dm.set(0, 2, 0.5);
        dm.set(1, 2, 0.6);
        let tree = bionj(&dm, &names(3)).unwrap();
        assert_eq!(tree.newick, "(A:0.10000000,B:0.20000000,C:0.40000000);");
        assert!((tree.length - 0.7).abs() < 1e-12);
    }
    #[test]
    fn negative_lengths_are_clamped() {
        let mut dm = DistanceMatrix::new(3);
        dm.set(0, 1, 0.1);
        dm.set(0, 2, 0.1);
        dm.set(1, 2, 1.0);
        let tree = bionj(&dm, &names(3)).unwrap();
        assert!(tree.newick.starts_with("(A:0.00000001,"), "{}", tree.newick);
    }
    #[test]
    fn every_taxon_appears_once() {
        let n = 7;
        let mut dm = DistanceMatrix::new(n);
        for i in 0..n {
            for j in i + 1..n {
                dm.set(i, j, 0.1 * (j - i) as f64 + 0.01 * (i * j % 5) as f64);
            }
        }
        let tree = bionj(&dm, &names(n)).unwrap();
        for name in names(n) {
            assert_eq!(tree.newick.matches(&format!("{}:", name)).count(), 1, "{}", tree.newick);
        }
        assert!(tree.newick.ends_with(");"));
        assert!(tree.length > 0.0);
    }
    #[test]
    fn too_few_taxa() {
        let dm = DistanceMatrix::new(2);
        assert!(bionj(&dm, &names(2)).is_err());
    }
}

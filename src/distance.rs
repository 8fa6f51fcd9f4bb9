//! Symmetric distance matrices and their text output.
use std::io::Write;

#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    size: usize,
    // Row-major, both triangles kept.
    distances: Vec<f64>,
}

impl DistanceMatrix {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            distances: vec![0f64; size * size],
        }
    }
    pub fn size(&self) -> usize {
        self.size
    }
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.distances[i * self.size + j]
    }
    /// Set d(i,j) and d(j,i). The diagonal stays zero.
    pub fn set(&mut self, i: usize, j: usize, distance: f64) {
        if i != j {
            self.distances[i * self.size + j] = distance;
            self.distances[j * self.size + i] = distance;
        }
    }
    pub fn row(&self, i: usize) -> &[f64] {
        &self.distances[i * self.size..(i + 1) * self.size]
    }
    /// Lower-triangle format: the count, then each name followed by its distances
    /// to the preceding sequences.
    pub fn write_lower_triangle<W: Write>(&self, names: &[String], wtr: &mut W) -> std::io::Result<()> {
        writeln!(wtr, "{}", self.size)?;
        for (i, name) in names.iter().enumerate().take(self.size) {
            write!(wtr, "{}        ", name)?;
            for j in 0..i {
                write!(wtr, " {}", self.get(i, j))?;
            }
            writeln!(wtr)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn symmetric() {
        let mut dm = DistanceMatrix::new(3);
        dm.set(0, 2, 0.5);
        dm.set(1, 1, 3.0);
        assert_eq!(dm.get(2, 0), 0.5);
        assert_eq!(dm.get(1, 1), 0.0);
        assert_eq!(dm.row(0), &[0.0, 0.0, 0.5]);
    }
    #[test]
    fn lower_triangle() {
        let mut dm = DistanceMatrix::new(3);
        dm.set(0, 1, 0.25);
        dm.set(0, 2, 0.5);
        dm.set(1, 2, 1.5);
        let names: Vec<_> = vec!["a", "b", "c"].into_iter().map(String::from).collect();
        let mut out = vec![];
        dm.write_lower_triangle(&names, &mut out).unwrap();
        let out = String::from_utf8(out).unwrap();
        assert_eq!(out, "3\na        \nb         0.25\nc         0.5 1.5\n");
    }
}

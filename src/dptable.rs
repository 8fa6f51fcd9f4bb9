//! Storage for one state of the pair-HMM.
//! All passes walk the grid column by column, so the memory is column-major.
//! A rolling table keeps only two columns, which is enough for the forward pass
//! but loses everything needed for tracebacks and posteriors.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    Dense,
    Rolling,
}

#[derive(Debug, Clone)]
pub struct DPTable<T> {
    // Total memory. (rows) x (cols) for a dense table, (rows) x 2 for a rolling one.
    mem: Vec<T>,
    rows: usize,
    cols: usize,
    storage: Storage,
    // The value every cell starts with.
    fill: T,
}

impl<T: Copy> DPTable<T> {
    pub fn new(storage: Storage, rows: usize, cols: usize, fill: T) -> Self {
        let width = match storage {
            Storage::Dense => cols,
            Storage::Rolling => 2.min(cols),
        };
        Self {
            mem: vec![fill; rows * width],
            rows,
            cols,
            storage,
            fill,
        }
    }
    pub fn dense(rows: usize, cols: usize, fill: T) -> Self {
        Self::new(Storage::Dense, rows, cols, fill)
    }
    pub fn rolling(rows: usize, cols: usize, fill: T) -> Self {
        Self::new(Storage::Rolling, rows, cols, fill)
    }
    pub fn rows(&self) -> usize {
        self.rows
    }
    pub fn cols(&self) -> usize {
        self.cols
    }
    pub fn storage(&self) -> Storage {
        self.storage
    }
    pub fn supports_traceback(&self) -> bool {
        self.storage == Storage::Dense
    }
    fn slot(&self, j: usize) -> usize {
        match self.storage {
            Storage::Dense => j,
            Storage::Rolling => j & 1,
        }
    }
    /// Read the [i,j] cell. In a rolling table only the current and the previous column are alive.
    pub fn get(&self, i: usize, j: usize) -> T {
        self.mem[self.slot(j) * self.rows + i]
    }
    pub fn set(&mut self, i: usize, j: usize, value: T) {
        let slot = self.slot(j);
        self.mem[slot * self.rows + i] = value;
    }
    /// Reset every cell to the fill value.
    pub fn initialize(&mut self) {
        let fill = self.fill;
        self.mem.iter_mut().for_each(|x| *x = fill);
    }
    /// Prepare column `j` before it is filled.
    /// The rolling table re-uses the buffer of column j-2, so it has to be cleared.
    pub fn begin_column(&mut self, j: usize) {
        if self.storage == Storage::Rolling {
            self.fill_col(j, self.fill);
        }
    }
    pub fn fill_row(&mut self, i: usize, value: T) {
        let rows = self.rows;
        self.mem
            .iter_mut()
            .skip(i)
            .step_by(rows)
            .for_each(|x| *x = value);
    }
    pub fn fill_col(&mut self, j: usize, value: T) {
        let start = self.slot(j) * self.rows;
        self.mem[start..start + self.rows]
            .iter_mut()
            .for_each(|x| *x = value);
    }
    /// Column `j` as a slice of length `rows`.
    pub fn column(&self, j: usize) -> &[T] {
        let start = self.slot(j) * self.rows;
        &self.mem[start..start + self.rows]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn dense_access() {
        let mut table = DPTable::dense(4, 3, -1f64);
        table.set(2, 1, 5.0);
        assert_eq!(table.get(2, 1), 5.0);
        assert_eq!(table.get(1, 2), -1.0);
        table.fill_row(0, 3.0);
        assert!((0..3).all(|j| table.get(0, j) == 3.0));
        table.fill_col(2, 7.0);
        assert!(table.column(2).iter().all(|&x| x == 7.0));
        assert_eq!(table.get(0, 1), 3.0);
        table.initialize();
        assert!((0..4).all(|i| (0..3).all(|j| table.get(i, j) == -1.0)));
    }
    #[test]
    fn rolling_reuses_columns() {
        let mut table = DPTable::rolling(3, 10, 0u32);
        assert!(!table.supports_traceback());
        table.begin_column(0);
        table.set(1, 0, 4);
        table.begin_column(1);
        table.set(1, 1, 5);
        assert_eq!(table.get(1, 0), 4);
        table.begin_column(2);
        assert_eq!(table.get(1, 2), 0);
        assert_eq!(table.get(1, 1), 5);
    }
}

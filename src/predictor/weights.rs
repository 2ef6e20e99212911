//! Storage for perceptron weights.

/// Largest value a weight can hold.
pub const MAX_WEIGHT: i8 = i8::MAX;

/// Smallest value a weight can hold.
pub const MIN_WEIGHT: i8 = i8::MIN;

/// A matrix of saturating signed weights.
///
/// Row 0 holds the bias weights; rows `1..=rows` hold the weights for each
/// perceptron input. Every row has the same number of entries, and the
/// matrix is never resized after it is created.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WeightTable {
    rows: usize,
    size: usize,
    data: Vec<i8>,
}
impl WeightTable {
    /// Create a zeroed table with `rows` rows of `size` weights.
    pub fn new(rows: usize, size: usize) -> Self {
        Self { rows, size, data: vec![0; rows * size] }
    }

    /// Number of rows (including the bias row).
    pub fn rows(&self) -> usize { self.rows }

    /// Number of weights in each row.
    pub fn size(&self) -> usize { self.size }

    fn offset(&self, row: usize, idx: usize) -> usize {
        row * self.size + (idx % self.size)
    }

    pub fn get(&self, row: usize, idx: usize) -> i8 {
        self.data[self.offset(row, idx)]
    }

    /// Return a single row of weights.
    pub fn row(&self, row: usize) -> &[i8] {
        &self.data[row * self.size..(row + 1) * self.size]
    }

    /// Move a weight one step towards 'sign' (+1 or -1), saturating at
    /// [MIN_WEIGHT] and [MAX_WEIGHT].
    pub fn adjust(&mut self, row: usize, idx: usize, sign: i32) {
        let off = self.offset(row, idx);
        let w = &mut self.data[off];
        *w = if sign >= 0 { w.saturating_add(1) } else { w.saturating_sub(1) };
    }

    pub fn increment(&mut self, row: usize, idx: usize) { self.adjust(row, idx, 1) }
    pub fn decrement(&mut self, row: usize, idx: usize) { self.adjust(row, idx, -1) }

    /// Overwrite a weight.
    pub fn set(&mut self, row: usize, idx: usize, val: i8) {
        let off = self.offset(row, idx);
        self.data[off] = val;
    }

    /// Number of non-zero weights.
    pub fn populated(&self) -> usize {
        self.data.iter().filter(|w| **w != 0).count()
    }
}

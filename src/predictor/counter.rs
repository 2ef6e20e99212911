//! Per-branch usage counters approximating a least-frequently-used policy.

use itertools::Itertools;
use crate::predictor::table::PredictorTable;

/// Saturation limit for a usage counter.
pub const MAX_USAGE: u8 = 127;

/// A table of saturating usage counters.
///
/// Each row belongs to a set of branches (selected by program counter
/// modulo the number of rows) and holds one counter per VPC iteration.
/// A counter is bumped each time its iteration supplies a correct target,
/// and reset to 1 when its slot is overwritten, so the smallest counter in
/// a row marks the least frequently useful slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UsageCounters {
    rows: usize,
    width: usize,
    data: Vec<u8>,
}
impl UsageCounters {
    pub fn new(rows: usize, width: usize) -> Self {
        Self { rows, width, data: vec![0; rows * width] }
    }

    /// Number of counters per row.
    pub fn width(&self) -> usize { self.width }

    /// Return the row of counters for the branch at 'pc'.
    pub fn counters(&self, pc: usize) -> &[u8] {
        self.get_entry(self.get_index(pc))
    }

    pub fn get(&self, pc: usize, iter: usize) -> u8 {
        self.counters(pc)[iter]
    }

    /// Increment a counter, saturating at [MAX_USAGE].
    pub fn increment(&mut self, pc: usize, iter: usize) {
        let idx = self.get_index(pc);
        let ctr = &mut self.get_entry_mut(idx)[iter];
        *ctr = ctr.saturating_add(1).min(MAX_USAGE);
    }

    /// Mark a freshly (re)allocated slot.
    pub fn reset(&mut self, pc: usize, iter: usize) {
        let idx = self.get_index(pc);
        self.get_entry_mut(idx)[iter] = 1;
    }

    /// Overwrite a counter (clamped to [MAX_USAGE]).
    pub fn set(&mut self, pc: usize, iter: usize, val: u8) {
        let idx = self.get_index(pc);
        self.get_entry_mut(idx)[iter] = val.min(MAX_USAGE);
    }

    /// Select the least-frequently-used iteration for the branch at 'pc'.
    /// Ties go to the lowest iteration.
    pub fn victim(&self, pc: usize) -> usize {
        self.counters(pc).iter().position_min().unwrap_or(0)
    }
}

impl PredictorTable for UsageCounters {
    type Entry = [u8];

    fn size(&self) -> usize { self.rows }

    fn get_index(&self, pc: usize) -> usize { pc % self.rows }

    fn get_entry(&self, idx: usize) -> &[u8] {
        &self.data[idx * self.width..(idx + 1) * self.width]
    }

    fn get_entry_mut(&mut self, idx: usize) -> &mut [u8] {
        &mut self.data[idx * self.width..(idx + 1) * self.width]
    }
}

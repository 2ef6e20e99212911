//! Branch target buffer (BTB) implementations.

use crate::predictor::table::PredictorTable;

/// A direct-mapped table of branch targets.
///
/// Entries are indexed by the low bits of an address. A stored value of
/// zero means "no target": zero is never a real branch target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetCache {
    size: usize,
    data: Vec<usize>,
}
impl TargetCache {
    pub fn new(size: usize) -> Self {
        debug_assert!(size.is_power_of_two());
        Self { size, data: vec![0; size] }
    }

    /// Return the target cached for 'addr' (zero when empty).
    pub fn get(&self, addr: usize) -> usize {
        *self.get_entry(self.get_index(addr))
    }

    /// Cache a target for 'addr', replacing whatever was there.
    pub fn set(&mut self, addr: usize, tgt: usize) {
        let idx = self.get_index(addr);
        *self.get_entry_mut(idx) = tgt;
    }

    /// Number of non-empty entries.
    pub fn occupancy(&self) -> usize {
        self.data.iter().filter(|t| **t != 0).count()
    }

    /// Percentage of entries holding a target.
    pub fn utilization(&self) -> f64 {
        (self.occupancy() as f64 / self.size as f64) * 100.0
    }
}

impl PredictorTable for TargetCache {
    type Entry = usize;

    fn size(&self) -> usize { self.size }

    fn get_index(&self, addr: usize) -> usize {
        addr & self.index_mask()
    }

    fn get_entry(&self, idx: usize) -> &usize {
        &self.data[idx & self.index_mask()]
    }

    fn get_entry_mut(&mut self, idx: usize) -> &mut usize {
        let index = idx & self.index_mask();
        &mut self.data[index]
    }
}

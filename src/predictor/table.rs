//! Types for implementing a table of predictor state.

/// Interface to a direct-mapped table of predictor state.
pub trait PredictorTable {
    /// The type of entry in the table.
    type Entry: ?Sized;

    /// Returns the number of entries in the table.
    fn size(&self) -> usize;

    /// Given some address, return the corresponding index into the table.
    fn get_index(&self, addr: usize) -> usize;

    /// Returns a reference to an entry in the table.
    fn get_entry(&self, idx: usize) -> &Self::Entry;

    /// Returns a mutable reference to an entry in the table.
    fn get_entry_mut(&mut self, idx: usize) -> &mut Self::Entry;

    /// Returns a bitmask corresponding to the number of entries in the table.
    fn index_mask(&self) -> usize {
        debug_assert!(self.size().is_power_of_two());
        self.size() - 1
    }
}

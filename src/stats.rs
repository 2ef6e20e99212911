//! Helpers for collecting statistics.

use std::collections::*;
use itertools::*;

use crate::branch::*;

/// Container for recording simple statistics while evaluating some model.
#[derive(Clone, Debug, Default)]
pub struct BranchStats {
    /// Per-branch statistics (indexed by program counter value).
    pub data: BTreeMap<usize, BranchData>,

    /// Number of correctly predicted conditional branches
    pub cond_hits: usize,

    /// Number of conditional branches
    pub cond_brns: usize,

    /// Number of correctly predicted indirect targets
    pub tgt_hits: usize,

    /// Number of indirect branches
    pub tgt_brns: usize,
}
impl BranchStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the conditional hit rate.
    pub fn cond_hit_rate(&self) -> f64 {
        if self.cond_brns == 0 { return 0.0; }
        self.cond_hits as f64 / self.cond_brns as f64
    }

    /// Return the indirect target hit rate.
    pub fn tgt_hit_rate(&self) -> f64 {
        if self.tgt_brns == 0 { return 0.0; }
        self.tgt_hits as f64 / self.tgt_brns as f64
    }

    /// Return the number of mispredicted conditional branches.
    pub fn cond_miss(&self) -> usize { self.cond_brns - self.cond_hits }

    /// Return the number of mispredicted indirect targets.
    pub fn tgt_miss(&self) -> usize { self.tgt_brns - self.tgt_hits }

    /// Record the prediction made for some branch.
    pub fn update(&mut self, record: &BranchRecord, outcome: Outcome, tgt: usize) {
        let mut hit = true;
        if record.is_conditional() {
            let cond_hit = outcome == record.outcome;
            self.cond_brns += 1;
            if cond_hit { self.cond_hits += 1; }
            hit &= cond_hit;
        }
        if record.is_indirect() {
            let tgt_hit = tgt == record.tgt;
            self.tgt_brns += 1;
            if tgt_hit { self.tgt_hits += 1; }
            hit &= tgt_hit;
        }

        let data = self.get_mut(record.pc());
        data.occ += 1;
        if hit { data.hits += 1; }
    }

    /// Returns a reference to data collected for a particular branch.
    pub fn get(&self, pc: usize) -> Option<&BranchData> {
        self.data.get(&pc)
    }

    /// Returns a mutable reference to data collected for a particular branch.
    /// Creates a new entry if one doesn't already exist.
    pub fn get_mut(&mut self, pc: usize) -> &mut BranchData {
        self.data.entry(pc).or_default()
    }

    /// Returns the number of unique observed branch instructions.
    pub fn num_unique_branches(&self) -> usize {
        self.data.len()
    }

    /// Returns the 'n' branches with the lowest hit rate, among branches
    /// executed at least 'min_occ' times.
    pub fn get_low_rate_branches(&self, n: usize, min_occ: usize)
        -> Vec<(usize, &BranchData)>
    {
        self.data.iter()
            .filter(|(_, s)| s.occ >= min_occ)
            .sorted_by(|x, y| x.1.hit_rate().total_cmp(&y.1.hit_rate()))
            .take(n)
            .map(|(pc, s)| (*pc, s))
            .collect()
    }
}

/// Container for per-branch statistics.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BranchData {
    /// Number of times this branch was encountered.
    pub occ: usize,

    /// Number of correct predictions for this branch.
    pub hits: usize,
}
impl BranchData {
    /// Return the hit rate for this branch.
    pub fn hit_rate(&self) -> f64 {
        if self.occ == 0 { return 0.0; }
        self.hits as f64 / self.occ as f64
    }
}

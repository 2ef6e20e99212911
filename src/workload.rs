//! Deterministic synthetic branch streams.
//!
//! A workload is a small "program" of branch sites executed in a loop.
//! Each site has some behavior (a fixed pattern, a loop exit, an outcome
//! copied from an earlier branch, noise, or an indirect dispatch). Running
//! the program unrolls it into a list of [BranchRecord].

use rand::{ Rng, SeedableRng };
use rand_chacha::ChaCha8Rng;

use crate::branch::*;
use crate::error::WorkloadError;

/// The behavior of a single branch site.
#[derive(Clone, Debug, PartialEq)]
pub enum SiteKind {
    /// A conditional branch with an arbitrary repeating pattern.
    Pattern(Vec<Outcome>),

    /// A loop-closing conditional branch: taken 'trip - 1' times, then
    /// not-taken once.
    Loop(usize),

    /// A conditional branch with the same outcome as the conditional
    /// branch executed 'distance' conditional branches ago.
    Correlated(usize),

    /// A conditional branch taken with some probability.
    Random(f64),

    /// An indirect jump whose target is selected by the outcomes of the
    /// most recent 'bits' conditional branches.
    Dispatch { bits: usize, targets: Vec<usize> },

    /// An indirect jump that always goes to the same place.
    Monomorphic(usize),
}

/// A branch site in a synthetic program.
#[derive(Clone, Debug, PartialEq)]
pub struct Site {
    pub pc: usize,
    pub kind: SiteKind,
}
impl Site {
    /// Reject sites that cannot produce an outcome or a target.
    pub fn validate(&self) -> Result<(), WorkloadError> {
        let pc = self.pc;
        match &self.kind {
            SiteKind::Pattern(p) if p.is_empty() => {
                Err(WorkloadError::Empty { pc, what: "pattern" })
            },
            SiteKind::Loop(0) => Err(WorkloadError::ZeroTrip { pc }),
            SiteKind::Correlated(0) => Err(WorkloadError::ZeroDistance { pc }),
            SiteKind::Random(p) if !(0.0..=1.0).contains(p) => {
                Err(WorkloadError::BadProbability { pc, p: *p })
            },
            SiteKind::Dispatch { targets, .. } if targets.is_empty() => {
                Err(WorkloadError::Empty { pc, what: "dispatch targets" })
            },
            _ => Ok(()),
        }
    }
}

/// A synthetic program and the state needed to unroll it.
#[derive(Clone, Debug)]
pub struct Workload {
    sites: Vec<Site>,
    rng: ChaCha8Rng,
    ctr: Vec<usize>,
    recent: Vec<Outcome>,
}
impl Workload {
    pub fn new(seed: u64, sites: Vec<Site>) -> Result<Self, WorkloadError> {
        for site in sites.iter() {
            site.validate()?;
        }
        Ok(Self::from_sites(seed, sites))
    }

    fn from_sites(seed: u64, sites: Vec<Site>) -> Self {
        let ctr = vec![0; sites.len()];
        Self {
            sites,
            rng: ChaCha8Rng::seed_from_u64(seed),
            ctr,
            recent: Vec::new(),
        }
    }

    /// A mix of every kind of site: loops, patterns, correlated and noisy
    /// branches, and indirect dispatch driven by recent outcomes.
    pub fn mixed(seed: u64) -> Self {
        use SiteKind::*;
        let sites = vec![
            Site { pc: 0x0040_1000, kind: Loop(7) },
            Site { pc: 0x0040_1024, kind: Random(0.5) },
            Site { pc: 0x0040_1048, kind: Random(0.5) },
            Site { pc: 0x0040_1070, kind: Correlated(2) },
            Site { pc: 0x0040_10a4, kind: Pattern(vec![Outcome::T, Outcome::T, Outcome::N]) },
            Site { pc: 0x0040_10c8, kind: Dispatch {
                bits: 2,
                targets: vec![0x0040_2000, 0x0040_2400, 0x0040_2800, 0x0040_2c00],
            }},
            Site { pc: 0x0040_10f0, kind: Monomorphic(0x0040_3000) },
            Site { pc: 0x0040_1114, kind: Random(0.9) },
        ];
        Self::from_sites(seed, sites)
    }

    pub fn sites(&self) -> &[Site] { &self.sites }

    fn history_bits(&self, bits: usize) -> usize {
        self.recent.iter().rev().take(bits).enumerate()
            .fold(0, |acc, (i, o)| acc | ((o.is_taken() as usize) << i))
    }

    /// Execute one branch site.
    fn step(&mut self, idx: usize) -> BranchRecord {
        let n = self.ctr[idx];
        self.ctr[idx] += 1;
        let pc = self.sites[idx].pc;
        let fallthrough = pc + 4;

        let record = match &self.sites[idx].kind {
            SiteKind::Pattern(p) => {
                let o = p[n % p.len()];
                BranchRecord::new(BranchInfo::conditional(pc), o, fallthrough)
            },
            SiteKind::Loop(trip) => {
                let o = Outcome::from(n % trip != trip - 1);
                BranchRecord::new(BranchInfo::conditional(pc), o, pc - 0x40)
            },
            SiteKind::Correlated(d) => {
                let o = self.recent.iter().rev().nth(d - 1).copied()
                    .unwrap_or(Outcome::N);
                BranchRecord::new(BranchInfo::conditional(pc), o, fallthrough)
            },
            SiteKind::Random(p) => {
                let p = *p;
                let o = Outcome::from(self.rng.gen_bool(p));
                BranchRecord::new(BranchInfo::conditional(pc), o, fallthrough)
            },
            SiteKind::Dispatch { bits, targets } => {
                let sel = self.history_bits(*bits) % targets.len();
                BranchRecord::new(BranchInfo::indirect(pc), Outcome::T, targets[sel])
            },
            SiteKind::Monomorphic(tgt) => {
                BranchRecord::new(BranchInfo::indirect(pc), Outcome::T, *tgt)
            },
        };
        if record.is_conditional() {
            self.recent.push(record.outcome);
            if self.recent.len() > 64 {
                self.recent.remove(0);
            }
        }
        record
    }

    /// Unroll the program until 'len' branches have been produced.
    pub fn generate(&mut self, len: usize) -> Vec<BranchRecord> {
        let mut data = Vec::with_capacity(len);
        let mut cur = 0;
        while data.len() < len && !self.sites.is_empty() {
            data.push(self.step(cur));
            cur = (cur + 1) % self.sites.len();
        }
        data
    }
}

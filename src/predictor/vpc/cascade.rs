//! The virtual-PC cascade used to resolve indirect branch targets.
//!
//! An indirect branch is treated as a chain of virtual conditional branches,
//! each with its own (hashed) virtual address and its own slot in the target
//! cache. The direction predictor decides whether each virtual branch is
//! "taken", i.e. whether the target cached for that slot is trusted.
//!
//! See "VPC Prediction: Reducing the Cost of Indirect Branches via
//! Hardware-Based Dynamic Devirtualization" (Kim et al., 2007).

use log::trace;

use crate::Outcome;
use crate::history::HistoryRegister;
use crate::predictor::btb::TargetCache;
use crate::predictor::perceptron::{ Perceptron, PerceptronOutput };

/// Constants used to derive virtual branch addresses.
pub const VPC_HASH: [usize; 20] = [
    0xbbc346ad, 0x129f47dd, 0xa63dcb5a, 0x3253f058,
    0xe2186929, 0x891f0f2e, 0x9d891952, 0xbe98e380,
    0x9d2071a3, 0xcf52069f, 0xd304bb44, 0x85f89e7d,
    0x4db71167, 0xa6ac37d6, 0x3f135331, 0xe8737721,
    0x86727eb1, 0xbaa58cc9, 0x4053e7f0, 0x7dc47f0f,
];

/// The largest supported number of cascade iterations: the first probe
/// uses the real address, every later probe consumes one hash constant.
pub const MAX_VPC_ITERS: usize = VPC_HASH.len() + 1;

/// Return the virtual address probed by iteration 'iter' for a branch at 'pc'.
pub fn vpc_address(pc: usize, iter: usize) -> usize {
    match iter {
        0 => pc,
        k => pc ^ VPC_HASH[k - 1],
    }
}

/// The state of the cascade before its first iteration: the real branch
/// address, and a private copy of the history registers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VirtualOrigin {
    pub pc: usize,
    pub ghr: HistoryRegister,
    pub phr: HistoryRegister,
    pub path_bits: usize,
}

/// A single iteration of the cascade.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VpcStep {
    /// The iteration number
    pub iter: usize,

    /// The virtual address probed in this iteration
    pub vpc: usize,

    /// The target found in the cache for 'vpc' (zero when empty)
    pub candidate: usize,

    /// Perceptron output for the virtual branch
    pub output: PerceptronOutput,
}
impl VpcStep {
    pub fn predicted(&self) -> Outcome { self.output.outcome }
}

/// Iterator over the steps of the cascade.
///
/// Each step reads the cache and the perceptron with the current virtual
/// state, then advances it: the virtual branch is assumed not-taken, and the
/// next virtual address is shifted into path history. Nothing here mutates
/// the predictor.
pub struct VpcCascade<'a> {
    perceptron: &'a Perceptron,
    cache: &'a TargetCache,
    pc: usize,
    vpc: usize,
    ghr: HistoryRegister,
    phr: HistoryRegister,
    path_bits: usize,
    iter: usize,
    limit: usize,
}
impl <'a> VpcCascade<'a> {
    pub fn new(origin: &VirtualOrigin,
        perceptron: &'a Perceptron,
        cache: &'a TargetCache,
        limit: usize,
    ) -> Self
    {
        Self {
            perceptron,
            cache,
            pc: origin.pc,
            vpc: origin.pc,
            ghr: origin.ghr.clone(),
            phr: origin.phr.clone(),
            path_bits: origin.path_bits,
            iter: 0,
            limit: limit.min(MAX_VPC_ITERS),
        }
    }
}
impl <'a> Iterator for VpcCascade<'a> {
    type Item = VpcStep;
    fn next(&mut self) -> Option<VpcStep> {
        if self.iter >= self.limit {
            return None;
        }
        let candidate = self.cache.get(self.vpc);
        let output = self.perceptron.output(self.vpc, &self.ghr, &self.phr);
        let step = VpcStep { iter: self.iter, vpc: self.vpc, candidate, output };

        self.iter += 1;
        if self.iter < MAX_VPC_ITERS {
            self.vpc = vpc_address(self.pc, self.iter);
            self.ghr.push(false);
            self.phr.push_bits(self.path_bits, self.vpc);
        }
        Some(step)
    }
}

/// The result of resolving an indirect branch through the cascade.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VpcTrace {
    /// Cascade state before the first iteration
    pub origin: VirtualOrigin,

    /// Every iteration attempted, in order
    pub steps: Vec<VpcStep>,

    /// The iteration that ended the search
    pub chosen: usize,

    /// The search ended without a trusted target
    pub btb_miss: bool,

    /// The predicted target (zero when unresolved)
    pub target: usize,
}
impl VpcTrace {
    /// Run the cascade until a cached target is trusted (a hit), an empty
    /// slot is found, or 'limit' iterations have been attempted.
    pub fn resolve(origin: VirtualOrigin,
        perceptron: &Perceptron,
        cache: &TargetCache,
        limit: usize,
    ) -> Self
    {
        let mut steps = Vec::new();
        let mut btb_miss = true;
        let mut target = 0;

        for step in VpcCascade::new(&origin, perceptron, cache, limit) {
            trace!("vpc {:016x} iter={} vpc={:016x} cand={:016x} sum={}",
                origin.pc, step.iter, step.vpc, step.candidate, step.output.sum
            );
            let hit  = step.candidate != 0 && step.predicted() == Outcome::T;
            let stop = hit || step.candidate == 0;
            if hit {
                btb_miss = false;
                target = step.candidate;
            }
            steps.push(step);
            if stop {
                break;
            }
        }
        let chosen = steps.len().saturating_sub(1);
        Self { origin, steps, chosen, btb_miss, target }
    }

    /// Append steps [replayed from the origin] until 'len' steps have been
    /// recorded. This must happen before any state used by the cascade is
    /// modified, so that replayed steps match what the lookup would have
    /// seen.
    pub fn extend_to(&mut self, len: usize, perceptron: &Perceptron, cache: &TargetCache) {
        if self.steps.len() >= len {
            return;
        }
        let have = self.steps.len();
        let more = VpcCascade::new(&self.origin, perceptron, cache, len).skip(have);
        self.steps.extend(more);
    }

    /// Return the recorded step for some iteration.
    pub fn step(&self, iter: usize) -> Option<&VpcStep> {
        self.steps.get(iter)
    }
}

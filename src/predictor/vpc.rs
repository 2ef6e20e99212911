//! A perceptron direction predictor combined with VPC indirect target
//! prediction.

pub mod cascade;
pub mod stat;

pub use cascade::*;
pub use stat::*;

use log::debug;

use crate::branch::*;
use crate::history::HistoryRegister;
use crate::predictor::*;

/// The structure used to predict indirect branch targets.
#[derive(Clone, Debug)]
pub enum TargetUnit {
    /// A direct-mapped BTB indexed by the branch address.
    Btb(TargetCache),

    /// A BTB probed through the VPC cascade, with usage counters used to
    /// pick replacement slots.
    Vpc {
        cache: TargetCache,
        usage: UsageCounters,
        iters: usize,
    },
}
impl TargetUnit {
    pub fn cache(&self) -> &TargetCache {
        match self {
            Self::Btb(cache) | Self::Vpc { cache, .. } => cache,
        }
    }

    pub fn usage(&self) -> Option<&UsageCounters> {
        match self {
            Self::Btb(_) => None,
            Self::Vpc { usage, .. } => Some(usage),
        }
    }
}

/// State carried from [VpcPredictor::predict] to [VpcPredictor::update].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BranchContext {
    /// The predicted branch
    pub info: BranchInfo,

    /// Perceptron output [for conditional branches]
    pub direction: Option<PerceptronOutput>,

    /// Cascade trace [for indirect branches with VPC prediction]
    pub indirect: Option<VpcTrace>,
}

/// Hashed perceptron direction predictor with VPC indirect target
/// prediction.
///
/// Conditional branches are predicted by the sign of the perceptron output.
/// Indirect branches are resolved by walking a cascade of virtual branch
/// addresses (see [cascade]), where the same perceptron decides whether to
/// trust the target cached for each virtual address.
#[derive(Clone, Debug)]
pub struct VpcPredictor {
    /// The configuration used to create this object
    pub cfg: PredictorConfig,

    pub stat: VpcStats,

    perceptron: Perceptron,

    /// Global outcome history
    ghr: HistoryRegister,

    /// Path history
    phr: HistoryRegister,

    targets: TargetUnit,
}

impl VpcPredictor {
    /// Create a predictor from a validated configuration.
    /// Use [PredictorConfig::build] instead of calling this directly.
    pub(crate) fn from_config(cfg: PredictorConfig) -> Self {
        let perceptron = Perceptron::new(cfg.perceptron.clone());
        let ghr = HistoryRegister::new(cfg.perceptron.history_len);
        let phr = HistoryRegister::new(cfg.perceptron.path_len);
        let (targets, iters) = match cfg.target {
            TargetConfig::Btb { size } => (TargetUnit::Btb(TargetCache::new(size)), 0),
            TargetConfig::Vpc { size, iters, usage_rows } => (TargetUnit::Vpc {
                cache: TargetCache::new(size),
                usage: UsageCounters::new(usage_rows, iters),
                iters,
            }, iters),
        };
        Self {
            stat: VpcStats::new(iters),
            cfg,
            perceptron,
            ghr,
            phr,
            targets,
        }
    }

    pub fn perceptron(&self) -> &Perceptron { &self.perceptron }
    pub fn weights(&self) -> &WeightTable { self.perceptron.weights() }
    pub fn history(&self) -> &HistoryRegister { &self.ghr }
    pub fn path(&self) -> &HistoryRegister { &self.phr }
    pub fn targets(&self) -> &TargetUnit { &self.targets }

    fn origin(&self, pc: usize) -> VirtualOrigin {
        VirtualOrigin {
            pc,
            ghr: self.ghr.clone(),
            phr: self.phr.clone(),
            path_bits: self.cfg.perceptron.path_bits,
        }
    }

    /// Record the resolved outcome of a conditional branch in global and
    /// path history.
    fn update_history(&mut self, pc: usize, outcome: Outcome) {
        self.ghr.push(outcome.into());
        self.phr.push_bits(self.cfg.perceptron.path_bits, pc);
    }

    /// Train the perceptron on one step of the cascade.
    fn train_step(&mut self, step: &VpcStep, outcome: Outcome) {
        self.perceptron.train(step.predicted(), outcome, &step.output.index,
            step.output.sum);
    }

    /// Record every cascade step that [VpcPredictor::update_vpc] may train,
    /// replaying from the origin while the weights and the cache still
    /// match what the lookup saw. A correct prediction only trains the
    /// recorded steps.
    fn replay(&self, trace: &mut VpcTrace, target: usize) {
        let TargetUnit::Vpc { cache, iters, .. } = &self.targets else {
            return;
        };
        if target == 0 || (!trace.btb_miss && target == trace.target) {
            return;
        }
        trace.extend_to(*iters, &self.perceptron, cache);
    }

    /// Learn from a resolved indirect branch predicted with the cascade.
    /// The trace must already be replayed with [VpcPredictor::replay].
    fn update_vpc(&mut self, pc: usize, trace: VpcTrace, target: usize) {
        // Zero never names a real target.
        if target == 0 {
            return;
        }
        let TargetUnit::Vpc { cache, usage, iters } = &mut self.targets else {
            return;
        };
        let iters = *iters;
        self.stat.lookups += 1;
        if trace.btb_miss {
            self.stat.btb_misses += 1;
        }

        // Correct target: the chosen virtual branch was right to be taken,
        // and every virtual branch before it was right to be not-taken.
        if !trace.btb_miss && target == trace.target {
            usage.increment(pc, trace.chosen);
            self.stat.hits += 1;
            self.stat.iter_hits[trace.chosen] += 1;
            for step in trace.steps.iter() {
                let outcome = Outcome::from(step.iter == trace.chosen);
                self.perceptron.train(step.predicted(), outcome,
                    &step.output.index, step.output.sum);
            }
            return;
        }

        let found = (0..iters).find(|k| cache.get(vpc_address(pc, *k)) == target);
        let (victim, forced) = match found {
            Some(k) => {
                debug!("vpc {:016x}: target {:016x} found at iter {} (chosen {})",
                    pc, target, k, trace.chosen);
                usage.increment(pc, k);
                self.stat.found += 1;
                (k, true)
            },
            None => {
                let (k, why) = if trace.btb_miss {
                    (trace.chosen, "miss")
                } else {
                    self.stat.evictions += 1;
                    (usage.victim(pc), "lfu")
                };
                debug!("vpc {:016x}: alloc {:016x} at iter {} ({})",
                    pc, target, k, why);
                cache.set(vpc_address(pc, k), target);
                usage.reset(pc, k);
                self.stat.allocs += 1;
                (k, false)
            },
        };

        // Reject every wrong candidate the cascade trusted or passed over
        // on its way to the chosen iteration.
        let last = trace.chosen.min(iters - 1);
        for step in trace.steps[..=last].iter() {
            if step.iter == victim || step.candidate == 0 {
                continue;
            }
            if found.map_or(false, |k| step.iter > k) {
                break;
            }
            self.train_step(step, Outcome::N);
        }

        let Some(step) = trace.step(victim) else {
            return;
        };
        if forced {
            self.perceptron.force_train(&step.output.index, Outcome::T);
        } else {
            self.train_step(step, Outcome::T);
        }
    }
}

impl BranchPredictor for VpcPredictor {
    type Context = BranchContext;

    fn name(&self) -> &'static str {
        match (self.cfg.perceptron.strategy, &self.targets) {
            (IndexStrategy::FoldedPath, TargetUnit::Vpc { .. }) => "FoldedPath+VPC",
            (IndexStrategy::FoldedPath, TargetUnit::Btb(_)) => "FoldedPath+BTB",
            (IndexStrategy::GlobalShifted, TargetUnit::Vpc { .. }) => "GlobalShifted+VPC",
            (IndexStrategy::GlobalShifted, TargetUnit::Btb(_)) => "GlobalShifted+BTB",
            (IndexStrategy::GlobalBipolar, TargetUnit::Vpc { .. }) => "GlobalBipolar+VPC",
            (IndexStrategy::GlobalBipolar, TargetUnit::Btb(_)) => "GlobalBipolar+BTB",
        }
    }

    fn predict(&self, branch: BranchInfo) -> Prediction<BranchContext> {
        let pc = branch.pc;

        let direction = if branch.is_conditional() {
            Some(self.perceptron.output(pc, &self.ghr, &self.phr))
        } else {
            None
        };
        let outcome = direction.as_ref().map_or(Outcome::T, |d| d.outcome);

        let (target, indirect) = match (&self.targets, branch.is_indirect()) {
            (_, false) => (0, None),
            (TargetUnit::Btb(cache), true) => (cache.get(pc), None),
            (TargetUnit::Vpc { cache, iters, .. }, true) => {
                let trace = VpcTrace::resolve(self.origin(pc), &self.perceptron,
                    cache, *iters);
                (trace.target, Some(trace))
            },
        };

        Prediction {
            outcome,
            target,
            ctx: BranchContext { info: branch, direction, indirect },
        }
    }

    fn update(&mut self,
        prediction: Prediction<BranchContext>,
        outcome: Outcome,
        target: usize,
    )
    {
        let BranchContext { info, direction, mut indirect } = prediction.ctx;
        let pc = info.pc;
        self.stat.clk += 1;

        // Conditional training below may touch weights the cascade reads.
        if let Some(trace) = indirect.as_mut() {
            self.replay(trace, target);
        }

        if let Some(out) = direction {
            if self.perceptron.train(out.outcome, outcome, &out.index, out.sum) {
                self.stat.cond_trainings += 1;
            }
            self.update_history(pc, outcome);
        }

        if !info.is_indirect() {
            return;
        }
        if let TargetUnit::Btb(cache) = &mut self.targets {
            self.stat.lookups += 1;
            if target == prediction.target && target != 0 {
                self.stat.hits += 1;
            }
            if target != 0 {
                cache.set(pc, target);
            }
            return;
        }
        if let Some(trace) = indirect {
            self.update_vpc(pc, trace, target);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn small_vpc(iters: usize) -> VpcPredictor {
        let mut cfg = PredictorConfig::merged_path_vpc();
        cfg.target = TargetConfig::Vpc { size: 1024, iters, usage_rows: 16 };
        cfg.build().unwrap()
    }

    fn cache_mut(p: &mut VpcPredictor) -> (&mut TargetCache, &mut UsageCounters) {
        match &mut p.targets {
            TargetUnit::Vpc { cache, usage, .. } => (cache, usage),
            TargetUnit::Btb(_) => unreachable!(),
        }
    }

    #[test]
    fn untrained_conditional_predicts_taken_then_learns() {
        let mut p = PredictorConfig::default().build().unwrap();
        let pred = p.predict(BranchInfo::conditional(0x1000));
        assert_eq!(pred.outcome, Outcome::T);
        assert_eq!(pred.ctx.direction.as_ref().unwrap().sum, 0);

        p.update(pred, Outcome::N, 0x1004);
        let w = p.weights();
        assert_eq!(w.get(0, 0x1000 % 4096), -1);
        for row in 1..=6 {
            assert_eq!(w.get(row, 0x1000 % 4096), -1);
        }
        assert_eq!(w.populated(), 7);
        assert!(!p.history().bit(0));
        assert_eq!(p.stat.cond_trainings, 1);
    }

    #[test]
    fn history_records_most_recent_outcome_first() {
        let mut p = PredictorConfig::default().build().unwrap();
        let pred = p.predict(BranchInfo::conditional(0x2003));
        p.update(pred, Outcome::T, 0);
        let pred = p.predict(BranchInfo::conditional(0x2005));
        p.update(pred, Outcome::N, 0);
        assert_eq!(p.history().segment(0, 2), 0b10);
        assert_eq!(p.path().segment(0, 8), 0x35);
    }

    #[test]
    fn unconditional_branches_leave_history_alone() {
        let mut p = PredictorConfig::default().build().unwrap();
        let pred = p.predict(BranchInfo::new(0x3000, BranchFlags::DIRECT_JUMP));
        assert_eq!(pred.outcome, Outcome::T);
        assert_eq!(pred.target, 0);
        p.update(pred, Outcome::T, 0x3100);
        assert_eq!(p.history().low_bits(), 0);
        assert_eq!(p.path().low_bits(), 0);
        assert_eq!(p.weights().populated(), 0);
    }

    #[test]
    fn predict_does_not_modify_state() {
        let mut p = small_vpc(8);
        for (pc, t) in [(0x10, 0x100), (0x10, 0x200), (0x24, 0x300)] {
            let pred = p.predict(BranchInfo::indirect(pc));
            p.update(pred, Outcome::T, t);
        }
        let weights = p.weights().clone();
        let ghr = p.history().clone();
        let cache = p.targets().cache().clone();
        let usage = p.targets().usage().cloned();
        let _ = p.predict(BranchInfo::new(0x10, BranchFlags::COND_INDIRECT));
        let _ = p.predict(BranchInfo::indirect(0x24));
        assert_eq!(&weights, p.weights());
        assert_eq!(&ghr, p.history());
        assert_eq!(&cache, p.targets().cache());
        assert_eq!(usage.as_ref(), p.targets().usage());
    }

    #[test]
    fn empty_cache_allocates_on_miss_then_hits() {
        let mut p = small_vpc(20);
        let pc = 0x4000;
        let pred = p.predict(BranchInfo::indirect(pc));
        let trace = pred.ctx.indirect.clone().unwrap();
        assert!(trace.btb_miss);
        assert_eq!(trace.chosen, 0);
        assert_eq!(pred.target, 0);

        p.update(pred, Outcome::T, 0xabc0);
        assert_eq!(p.targets().cache().get(pc), 0xabc0);
        assert_eq!(p.targets().usage().unwrap().get(pc, 0), 1);
        assert_eq!(p.stat.allocs, 1);
        assert_eq!(p.stat.btb_misses, 1);

        let pred = p.predict(BranchInfo::indirect(pc));
        assert_eq!(pred.target, 0xabc0);
        p.update(pred, Outcome::T, 0xabc0);
        assert_eq!(p.targets().usage().unwrap().get(pc, 0), 2);
        assert_eq!(p.stat.hits, 1);
        assert_eq!(p.stat.iter_hits[0], 1);
        assert!((p.stat.hit_rate() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn correct_deeper_hit_trains_earlier_steps_not_taken() {
        let mut p = small_vpc(4);
        let pc = 0x6000;
        {
            let (cache, _) = cache_mut(&mut p);
            cache.set(vpc_address(pc, 0), 0x111);
            cache.set(vpc_address(pc, 1), 0x222);
        }
        p.perceptron.weights_mut().set(0, vpc_address(pc, 0) % 4096, -10);

        let pred = p.predict(BranchInfo::indirect(pc));
        let trace = pred.ctx.indirect.clone().unwrap();
        assert!(!trace.btb_miss);
        assert_eq!(trace.chosen, 1);
        assert_eq!(pred.target, 0x222);
        p.update(pred, Outcome::T, 0x222);

        let first = &trace.steps[0].output.index;
        let second = &trace.steps[1].output.index;
        assert_eq!(p.weights().get(0, first.idx[0]), -11);
        assert_eq!(p.weights().get(1, first.idx[1]), -1);
        assert_eq!(p.weights().get(0, second.idx[0]), 1);
        assert_eq!(p.weights().get(1, second.idx[1]), 1);
        assert_eq!(p.targets().usage().unwrap().get(pc, 1), 1);
        assert_eq!(p.stat.iter_hits[1], 1);
        assert_eq!(p.stat.allocs, 0);
    }

    #[test]
    fn wrong_hit_evicts_least_used_slot() {
        let mut p = small_vpc(4);
        let pc = 0x5000;
        {
            let (cache, usage) = cache_mut(&mut p);
            for (k, u) in [5u8, 3, 1, 4].iter().enumerate() {
                cache.set(vpc_address(pc, k), 0x100 * (k + 1));
                usage.set(pc, k, *u);
            }
        }
        let pred = p.predict(BranchInfo::indirect(pc));
        assert_eq!(pred.target, 0x100);
        p.update(pred, Outcome::T, 0x9990);

        assert_eq!(p.targets().cache().get(vpc_address(pc, 2)), 0x9990);
        assert_eq!(p.targets().usage().unwrap().get(pc, 2), 1);
        assert_eq!(p.targets().cache().get(vpc_address(pc, 0)), 0x100);
        assert_eq!(p.stat.evictions, 1);

        // The rejected first candidate was trained towards not-taken.
        let pc0 = vpc_address(pc, 0) % 4096;
        assert_eq!(p.weights().get(0, pc0), -1);
    }

    #[test]
    fn target_found_deeper_is_reinforced() {
        let mut p = small_vpc(4);
        let pc = 0x6000;
        {
            let (cache, _) = cache_mut(&mut p);
            cache.set(vpc_address(pc, 0), 0x111);
            cache.set(vpc_address(pc, 2), 0x333);
        }
        let pred = p.predict(BranchInfo::indirect(pc));
        assert_eq!(pred.target, 0x111);
        p.update(pred, Outcome::T, 0x333);

        assert_eq!(p.stat.found, 1);
        assert_eq!(p.stat.allocs, 0);
        assert_eq!(p.targets().usage().unwrap().get(pc, 2), 1);
        assert_eq!(p.targets().cache().get(vpc_address(pc, 2)), 0x333);

        // The trusted wrong candidate is rejected, the empty slot is left
        // alone, and the slot holding the target is reinforced.
        let w = p.weights();
        assert_eq!(w.get(0, vpc_address(pc, 0) % 4096), -1);
        assert_eq!(w.get(0, vpc_address(pc, 1) % 4096), 0);
        assert_eq!(w.get(0, vpc_address(pc, 2) % 4096), 1);
    }

    #[test]
    fn cascade_replay_ignores_conditional_training() {
        let mut cfg = PredictorConfig::global_bipolar();
        cfg.target = TargetConfig::Vpc { size: 1024, iters: 4, usage_rows: 16 };
        let mut p = cfg.build().unwrap();
        let pc = 0x7000;

        // Find a history where the second virtual branch reads the same
        // weights as the conditional prediction.
        let mut shared = None;
        for g in 0..1024usize {
            let mut ghr = HistoryRegister::new(59);
            ghr.push_bits(10, g);
            let origin = VirtualOrigin {
                pc, ghr: ghr.clone(), phr: p.phr.clone(), path_bits: 4,
            };
            let dir = p.perceptron.index(pc, &ghr, &p.phr);
            let next = VpcCascade::new(&origin, &p.perceptron, p.targets.cache(), 2)
                .nth(1).unwrap().output.index;
            let overlap: i32 = dir.input.iter().zip(next.input.iter())
                .map(|(a, b)| *a as i32 * *b as i32).sum();
            if dir.idx[0] == next.idx[0] && overlap > 0 {
                shared = Some((ghr, next));
                break;
            }
        }
        let (ghr, next) = shared.unwrap();
        p.ghr = ghr;

        // Put the second virtual branch just above the training threshold.
        let s = next.idx[0];
        for (row, x) in next.input.iter().enumerate() {
            p.perceptron.weights_mut().set(row, s, *x);
        }
        p.perceptron.weights_mut().set(0, s, 69);
        {
            let (cache, usage) = cache_mut(&mut p);
            for (k, u) in [5u8, 1, 5, 5].iter().enumerate() {
                cache.set(vpc_address(pc, k), 0x100 * (k + 1));
                usage.set(pc, k, *u);
            }
        }

        let pred = p.predict(BranchInfo::new(pc, BranchFlags::COND_INDIRECT));
        assert_eq!(pred.outcome, Outcome::T);
        assert_eq!(pred.target, 0x100);
        p.update(pred, Outcome::N, 0x9990);

        // Trained not-taken twice (direction and the rejected first
        // candidate); the second virtual branch was confident at lookup.
        assert_eq!(p.targets().cache().get(vpc_address(pc, 1)), 0x9990);
        assert_eq!(p.stat.evictions, 1);
        assert_eq!(p.weights().get(0, s), 67);
    }

    #[test]
    fn exhausted_cascade_reports_miss() {
        let mut p = small_vpc(20);
        let pc = 0x7000;
        for k in 0..20 {
            let vpc = vpc_address(pc, k);
            p.perceptron.weights_mut().set(0, vpc % 4096, -64);
            let (cache, _) = cache_mut(&mut p);
            cache.set(vpc, 0x7700 + k);
        }
        let pred = p.predict(BranchInfo::indirect(pc));
        let trace = pred.ctx.indirect.as_ref().unwrap();
        assert!(trace.btb_miss);
        assert_eq!(trace.steps.len(), 20);
        assert_eq!(pred.target, 0);
    }

    #[test]
    fn zero_target_is_ignored() {
        let mut p = small_vpc(4);
        let pred = p.predict(BranchInfo::indirect(0x8000));
        p.update(pred, Outcome::T, 0);
        assert_eq!(p.targets().cache().occupancy(), 0);
        assert_eq!(p.stat.lookups, 0);
    }

    #[test]
    fn btb_unit_remembers_last_target() {
        let mut cfg = PredictorConfig::merged_path_vpc();
        cfg.target = TargetConfig::Btb { size: 64 };
        let mut p = cfg.build().unwrap();
        assert_eq!(p.name(), "FoldedPath+BTB");
        let pred = p.predict(BranchInfo::indirect(0x44));
        assert_eq!(pred.target, 0);
        assert!(pred.ctx.indirect.is_none());
        p.update(pred, Outcome::T, 0x880);
        let pred = p.predict(BranchInfo::indirect(0x44));
        assert_eq!(pred.target, 0x880);
        p.update(pred, Outcome::T, 0x880);
        let pred = p.predict(BranchInfo::indirect(0x44));
        p.update(pred, Outcome::T, 0x990);
        assert_eq!(p.targets().cache().get(0x44), 0x990);
        assert_eq!(p.stat.hits, 1);
        assert_eq!(p.stat.lookups, 3);
    }

    #[test]
    fn learns_alternating_targets() {
        let mut p = small_vpc(8);
        let mut dir = Outcome::N;
        let mut hits = 0;
        for i in 0..2000 {
            // A conditional branch whose outcome selects the target
            dir = !dir;
            let pred = p.predict(BranchInfo::conditional(0x100));
            p.update(pred, dir, 0x104);

            let tgt = if dir.is_taken() { 0xaaa0 } else { 0xbbb0 };
            let pred = p.predict(BranchInfo::indirect(0x200));
            if i >= 1000 && pred.target == tgt { hits += 1; }
            p.update(pred, Outcome::T, tgt);
        }
        assert!(hits > 900, "hits={}", hits);
    }
}

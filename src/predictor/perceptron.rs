//! Hashed perceptron direction predictor.
//!
//! See the following papers:
//!
//! - "Neural Methods for Dynamic Branch Prediction" (Jiménez and Lin, 2002)
//! - "Fast Path-Based Neural Branch Prediction" (Jiménez, 2003)
//! - "Merging Path and Gshare Indexing in Perceptron Branch Prediction"
//!   (Tarjan and Skadron, 2005)

use crate::Outcome;
use crate::history::HistoryRegister;
use crate::predictor::config::PerceptronConfig;
use crate::predictor::weights::WeightTable;

/// A strategy for turning an address and history into weight indices and
/// perceptron inputs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IndexStrategy {
    /// Each row hashes one segment of (global history XOR path history)
    /// with the address. All inputs are +1.
    FoldedPath,

    /// Each row hashes one window of global history with the address.
    /// Windows may overlap. All inputs are +1.
    GlobalShifted,

    /// Every row shares one index formed from global history and the
    /// address. The input for row 'i' is history bit 'i-1' in bipolar
    /// form (+1 when set, -1 when clear).
    GlobalBipolar,
}

/// The weights selected for one prediction: an index and an input value
/// for every row (row 0 is the bias).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PerceptronIndex {
    pub idx: Vec<usize>,
    pub input: Vec<i8>,
}
impl PerceptronIndex {
    pub fn rows(&self) -> usize { self.idx.len() }
}

/// Output from [Perceptron::output].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PerceptronOutput {
    /// The weights used to compute this output
    pub index: PerceptronIndex,

    /// The dot product of inputs and weights (including the bias)
    pub sum: i32,

    /// The predicted direction (the sign of 'sum')
    pub outcome: Outcome,
}

/// A perceptron predictor backed by a [WeightTable].
#[derive(Clone, Debug)]
pub struct Perceptron {
    cfg: PerceptronConfig,
    weights: WeightTable,
}
impl Perceptron {
    /// Create a perceptron with all weights zeroed.
    /// The configuration is expected to be validated already.
    pub fn new(cfg: PerceptronConfig) -> Self {
        let weights = WeightTable::new(cfg.rows + 1, cfg.size);
        Self { cfg, weights }
    }

    pub fn cfg(&self) -> &PerceptronConfig { &self.cfg }
    pub fn weights(&self) -> &WeightTable { &self.weights }
    pub fn weights_mut(&mut self) -> &mut WeightTable { &mut self.weights }
    pub fn theta(&self) -> i32 { self.cfg.theta }

    fn mask(&self) -> usize { self.cfg.size - 1 }

    /// Select the weights for a branch at 'pc' under some [possibly
    /// speculative] global and path history.
    pub fn index(&self, pc: usize, ghr: &HistoryRegister, phr: &HistoryRegister)
        -> PerceptronIndex
    {
        let rows = self.cfg.rows + 1;
        let mut idx = Vec::with_capacity(rows);
        let mut input = Vec::with_capacity(rows);

        match self.cfg.strategy {
            IndexStrategy::FoldedPath | IndexStrategy::GlobalShifted => {
                idx.push(pc & self.mask());
                input.push(1);
                for row in 1..rows {
                    let off = (row - 1) * self.cfg.segment_stride;
                    let mut seg = ghr.segment(off, self.cfg.segment_bits);
                    if self.cfg.strategy == IndexStrategy::FoldedPath {
                        seg ^= phr.segment(off, self.cfg.segment_bits);
                    }
                    idx.push((seg ^ pc) & self.mask());
                    input.push(1);
                }
            },
            IndexStrategy::GlobalBipolar => {
                let shared = (ghr.low_bits() ^ pc) & self.mask();
                idx.push(shared);
                input.push(1);
                for row in 1..rows {
                    idx.push(shared);
                    input.push(if ghr.bit(row - 1) { 1 } else { -1 });
                }
            },
        }
        PerceptronIndex { idx, input }
    }

    /// Compute the output for a set of selected weights.
    pub fn output_for(&self, index: PerceptronIndex) -> PerceptronOutput {
        let sum = index.idx.iter().zip(index.input.iter()).enumerate()
            .map(|(row, (i, x))| self.weights.get(row, *i) as i32 * *x as i32)
            .sum::<i32>();
        let outcome = if sum >= 0 { Outcome::T } else { Outcome::N };
        PerceptronOutput { index, sum, outcome }
    }

    /// Predict the direction of a branch at 'pc'. The predicted outcome is
    /// determined by the sign of the output; zero predicts taken.
    pub fn output(&self, pc: usize, ghr: &HistoryRegister, phr: &HistoryRegister)
        -> PerceptronOutput
    {
        self.output_for(self.index(pc, ghr, phr))
    }

    /// Training occurs after a misprediction, or when the output magnitude
    /// is not above the threshold.
    pub fn should_train(&self, predicted: Outcome, outcome: Outcome, sum: i32) -> bool {
        predicted != outcome || sum.abs() <= self.cfg.theta
    }

    /// Given the resolved outcome, adjust the weights used by a prediction.
    /// Returns 'true' if any training occurred.
    pub fn train(&mut self,
        predicted: Outcome,
        outcome: Outcome,
        index: &PerceptronIndex,
        sum: i32,
    ) -> bool
    {
        if !self.should_train(predicted, outcome, sum) {
            return false;
        }
        self.force_train(index, outcome);
        true
    }

    /// Adjust the weights unconditionally: each weight moves towards the
    /// product of its input and the outcome.
    pub fn force_train(&mut self, index: &PerceptronIndex, outcome: Outcome) {
        let t = outcome.sign();
        for (row, (i, x)) in index.idx.iter().zip(index.input.iter()).enumerate() {
            self.weights.adjust(row, *i, t * (*x as i32));
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::predictor::config::PredictorConfig;
    use proptest::prelude::*;

    fn folded() -> Perceptron {
        Perceptron::new(PredictorConfig::merged_path_vpc().perceptron)
    }

    #[test]
    fn zero_weights_predict_taken() {
        let p = folded();
        let ghr = HistoryRegister::new(64);
        let phr = HistoryRegister::new(64);
        let out = p.output(0x1000, &ghr, &phr);
        assert_eq!(out.sum, 0);
        assert_eq!(out.outcome, Outcome::T);
        assert_eq!(out.index.rows(), 7);
        assert!(out.index.idx.iter().all(|i| *i == 0x1000 % 4096));
    }

    #[test]
    fn folded_segments_mix_history_and_path() {
        let p = folded();
        let mut ghr = HistoryRegister::new(64);
        let mut phr = HistoryRegister::new(64);
        ghr.push_bits(20, 0b0000000011_0000000001);
        phr.push_bits(20, 0b0000000001_0000000001);
        let idx = p.index(0x30, &ghr, &phr);
        assert_eq!(idx.idx[0], 0x30);
        assert_eq!(idx.idx[1], 0x30);
        assert_eq!(idx.idx[2], 0x30 ^ 0b10);
        assert_eq!(idx.idx[3], 0x30);
    }

    #[test]
    fn bipolar_inputs_follow_history() {
        let p = Perceptron::new(PredictorConfig::global_bipolar().perceptron);
        let mut ghr = HistoryRegister::new(59);
        let phr = HistoryRegister::new(64);
        ghr.push(true);
        ghr.push(false);
        let idx = p.index(0x400, &ghr, &phr);
        assert_eq!(idx.input[0], 1);
        assert_eq!(idx.input[1], -1);
        assert_eq!(idx.input[2], 1);
        assert_eq!(idx.input[3], -1);
        assert!(idx.idx.iter().all(|i| *i == (0b10 ^ 0x400) & 1023));
    }

    #[test]
    fn bipolar_training_moves_towards_agreement() {
        let mut p = Perceptron::new(PredictorConfig::global_bipolar().perceptron);
        let mut ghr = HistoryRegister::new(59);
        let phr = HistoryRegister::new(64);
        ghr.push(true);
        let out = p.output(0x10, &ghr, &phr);
        assert!(p.train(out.outcome, Outcome::T, &out.index, out.sum));
        let i = out.index.idx[0];
        assert_eq!(p.weights().get(0, i), 1);
        assert_eq!(p.weights().get(1, i), 1);
        assert_eq!(p.weights().get(2, i), -1);
        let again = p.output(0x10, &ghr, &phr);
        assert_eq!(again.sum, 59 + 1);
    }

    #[test]
    fn confident_correct_prediction_is_not_trained() {
        let mut p = folded();
        let ghr = HistoryRegister::new(64);
        let phr = HistoryRegister::new(64);
        for _ in 0..10 {
            let out = p.output(0x88, &ghr, &phr);
            p.train(out.outcome, Outcome::T, &out.index, out.sum);
        }
        // 7 rows, each at +4 after 4 updates: 28 > theta (25)
        let out = p.output(0x88, &ghr, &phr);
        assert_eq!(out.sum, 28);
        let before = p.weights().clone();
        assert!(!p.train(out.outcome, Outcome::T, &out.index, out.sum));
        assert_eq!(&before, p.weights());
    }

    proptest! {
        #[test]
        fn gate_leaves_weights_alone(
            pc in any::<u32>(),
            hist in any::<u64>(),
            bias in 30i8..=127,
        ) {
            let mut p = folded();
            let mut ghr = HistoryRegister::new(64);
            let phr = HistoryRegister::new(64);
            ghr.push_bits(64, hist as usize);
            let idx = p.index(pc as usize, &ghr, &phr);
            p.weights_mut().set(0, idx.idx[0], bias);
            let out = p.output_for(idx);
            prop_assert!(out.sum.abs() > p.theta());
            let before = p.weights().clone();
            prop_assert!(!p.train(out.outcome, out.outcome, &out.index, out.sum));
            prop_assert_eq!(&before, p.weights());
        }

        #[test]
        fn output_is_pure(pc in any::<usize>(), hist in any::<u64>(), path in any::<u64>()) {
            let p = folded();
            let mut ghr = HistoryRegister::new(64);
            let mut phr = HistoryRegister::new(64);
            ghr.push_bits(64, hist as usize);
            phr.push_bits(64, path as usize);
            let a = p.output(pc, &ghr, &phr);
            let b = p.output(pc, &ghr, &phr);
            prop_assert_eq!(a, b);
            prop_assert!(p.index(pc, &ghr, &phr).idx.iter().all(|i| *i < 4096));
        }
    }
}

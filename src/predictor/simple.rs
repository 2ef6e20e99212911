
use crate::branch::*;
use crate::predictor::{ BranchPredictor, Prediction };

/// A simple predictor with no state: always predict 'taken', and never
/// predict a target.
#[derive(Clone, Copy, Debug, Default)]
pub struct TakenPredictor;
impl BranchPredictor for TakenPredictor {
    type Context = ();
    fn name(&self) -> &'static str { "TakenPredictor" }
    fn predict(&self, _branch: BranchInfo) -> Prediction<()> {
        Prediction { outcome: Outcome::T, target: 0, ctx: () }
    }
    fn update(&mut self, _p: Prediction<()>, _outcome: Outcome, _target: usize) {}
}

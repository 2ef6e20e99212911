//! Implementations of different branch predictors.

pub mod table;
pub mod simple;
pub mod config;
pub mod weights;
pub mod counter;
pub mod perceptron;
pub mod btb;
pub mod vpc;

pub use table::*;
pub use simple::*;
pub use config::*;
pub use weights::*;
pub use counter::*;
pub use perceptron::*;
pub use btb::*;
pub use vpc::*;

use crate::branch::*;

/// The result of a prediction: a direction, a target, and whatever state
/// the predictor needs to learn from the resolved branch.
///
/// A prediction must be handed back to the predictor that made it exactly
/// once, before that predictor makes another prediction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Prediction<C> {
    /// The predicted direction
    pub outcome: Outcome,

    /// The predicted target (zero when unknown)
    pub target: usize,

    /// State carried from prediction to update
    pub ctx: C,
}

/// Interface to a predictor that makes a prediction for a branch and is
/// later told how the branch actually resolved.
pub trait BranchPredictor {
    /// Per-prediction state carried to [BranchPredictor::update].
    type Context;

    fn name(&self) -> &'static str;

    /// Make a prediction. This never changes the state of the predictor.
    fn predict(&self, branch: BranchInfo) -> Prediction<Self::Context>;

    /// Update the state of the predictor with the resolved direction and
    /// target of a branch.
    fn update(&mut self,
        prediction: Prediction<Self::Context>,
        outcome: Outcome,
        target: usize,
    );
}

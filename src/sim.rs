//! Drive a predictor over a stream of branches in program order.

use log::debug;

use crate::branch::*;
use crate::predictor::BranchPredictor;
use crate::stats::BranchStats;

/// Predict and then update every branch in 'records', in order, recording
/// the accuracy of each prediction.
pub fn run<P: BranchPredictor>(p: &mut P, records: &[BranchRecord]) -> BranchStats {
    let mut stats = BranchStats::new();
    for record in records {
        let prediction = p.predict(record.info);
        stats.update(record, prediction.outcome, prediction.target);
        p.update(prediction, record.outcome, record.tgt);
    }
    debug!("{}: {} branches, {}/{} conditional, {}/{} indirect",
        p.name(), records.len(),
        stats.cond_hits, stats.cond_brns, stats.tgt_hits, stats.tgt_brns,
    );
    stats
}

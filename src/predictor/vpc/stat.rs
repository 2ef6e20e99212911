
/// Container for [VpcPredictor](crate::predictor::vpc::VpcPredictor)
/// runtime stats.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VpcStats {
    /// Number of updates
    pub clk: usize,

    /// Number of conditional updates that trained the perceptron
    pub cond_trainings: usize,

    /// Number of resolved indirect branches
    pub lookups: usize,

    /// Indirect branches with a correctly predicted target
    pub hits: usize,

    /// Indirect branches where the cascade found no trusted target
    pub btb_misses: usize,

    /// Correct targets found in the cache, but not at the chosen iteration
    pub found: usize,

    /// Targets written into the cache
    pub allocs: usize,

    /// Allocations that replaced the least-frequently-used slot
    pub evictions: usize,

    /// Number of correct predictions made by each iteration
    pub iter_hits: Vec<usize>,
}
impl VpcStats {
    pub fn new(iters: usize) -> Self {
        Self { iter_hits: vec![0; iters], ..Default::default() }
    }

    /// Fraction of indirect branches with a correct target.
    pub fn hit_rate(&self) -> f64 {
        if self.lookups == 0 { return 0.0; }
        self.hits as f64 / self.lookups as f64
    }
}

//! Construction-time parameters for a [VpcPredictor].

use crate::error::ConfigError;
use crate::predictor::perceptron::IndexStrategy;
use crate::predictor::vpc::{ VpcPredictor, MAX_VPC_ITERS };

/// Configuration for the perceptron direction predictor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PerceptronConfig {
    /// How rows are indexed and how inputs are encoded
    pub strategy: IndexStrategy,

    /// Number of input rows (the bias row is not counted)
    pub rows: usize,

    /// Number of weights in each row
    pub size: usize,

    /// Length of the global history register [in bits]
    pub history_len: usize,

    /// Length of the path history register [in bits]
    pub path_len: usize,

    /// Number of address bits shifted into path history per branch
    pub path_bits: usize,

    /// Width of the history segment hashed into each row's index
    pub segment_bits: usize,

    /// Distance [in bits] between the segments of consecutive rows
    pub segment_stride: usize,

    /// Training threshold
    pub theta: i32,
}
impl PerceptronConfig {
    /// The usual training threshold for a perceptron with 'rows' inputs.
    ///
    /// See "Neural Methods for Dynamic Branch Prediction" (Jiménez and Lin,
    /// 2002).
    pub fn default_theta(rows: usize) -> i32 {
        ((1.93f64 * rows as f64) + 14.0f64).floor() as i32
    }

    /// Get the [approximate] number of storage bits.
    pub fn storage_bits(&self) -> usize {
        (self.rows + 1) * self.size * 8 + self.history_len + self.path_len
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rows == 0 {
            return Err(ConfigError::ZeroSized { what: "perceptron rows" });
        }
        if !self.size.is_power_of_two() {
            return Err(ConfigError::TableSizeNotPowerOfTwo {
                what: "weight table", size: self.size,
            });
        }
        if self.history_len == 0 {
            return Err(ConfigError::ZeroSized { what: "history register" });
        }
        match self.strategy {
            IndexStrategy::GlobalBipolar => {
                if self.rows > self.history_len {
                    return Err(ConfigError::HistoryTooShort {
                        rows: self.rows, history_len: self.history_len,
                    });
                }
            },
            IndexStrategy::FoldedPath | IndexStrategy::GlobalShifted => {
                if self.segment_bits == 0 {
                    return Err(ConfigError::ZeroSized { what: "history segment" });
                }
                if self.segment_bits > usize::BITS as usize {
                    return Err(ConfigError::SegmentTooWide { bits: self.segment_bits });
                }
                // Path history is folded into the segments as well.
                let reg_len = match self.strategy {
                    IndexStrategy::FoldedPath => self.history_len.min(self.path_len),
                    _ => self.history_len,
                };
                let end = (self.rows - 1) * self.segment_stride + self.segment_bits;
                if end > reg_len {
                    return Err(ConfigError::SegmentOutOfRange {
                        row: self.rows, end, history_len: reg_len,
                    });
                }
            },
        }
        Ok(())
    }
}

/// Configuration for indirect target prediction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TargetConfig {
    /// A direct-mapped BTB indexed by the branch address.
    Btb {
        /// Number of entries
        size: usize,
    },

    /// A BTB probed through a cascade of virtual branch addresses.
    Vpc {
        /// Number of entries
        size: usize,

        /// Maximum number of virtual addresses probed per lookup
        iters: usize,

        /// Number of rows of usage counters
        usage_rows: usize,
    },
}
impl TargetConfig {
    pub fn cache_size(&self) -> usize {
        match self {
            Self::Btb { size } | Self::Vpc { size, .. } => *size,
        }
    }

    /// Get the [approximate] number of storage bits.
    pub fn storage_bits(&self) -> usize {
        match self {
            Self::Btb { size } => size * 32,
            Self::Vpc { size, iters, usage_rows } => size * 32 + usage_rows * iters * 7,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let size = self.cache_size();
        if !size.is_power_of_two() {
            return Err(ConfigError::TableSizeNotPowerOfTwo { what: "target cache", size });
        }
        if let Self::Vpc { iters, usage_rows, .. } = self {
            if *iters == 0 {
                return Err(ConfigError::ZeroSized { what: "VPC iterations" });
            }
            if *iters > MAX_VPC_ITERS {
                return Err(ConfigError::TooManyVpcIterations {
                    iters: *iters, max: MAX_VPC_ITERS,
                });
            }
            if *usage_rows == 0 {
                return Err(ConfigError::ZeroSized { what: "usage counter rows" });
            }
        }
        Ok(())
    }
}

/// Configuration for a [VpcPredictor].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PredictorConfig {
    pub perceptron: PerceptronConfig,
    pub target: TargetConfig,
}
impl PredictorConfig {
    /// Hashed perceptron over folded global and path history, with
    /// VPC indirect target prediction.
    pub fn merged_path_vpc() -> Self {
        Self {
            perceptron: PerceptronConfig {
                strategy: IndexStrategy::FoldedPath,
                rows: 6,
                size: 4096,
                history_len: 64,
                path_len: 64,
                path_bits: 4,
                segment_bits: 10,
                segment_stride: 10,
                theta: PerceptronConfig::default_theta(6),
            },
            target: TargetConfig::Vpc {
                size: 32768,
                iters: 20,
                usage_rows: 1640,
            },
        }
    }

    /// Plain global-history perceptron (one bipolar input per history
    /// bit), with VPC indirect target prediction.
    pub fn global_bipolar() -> Self {
        Self {
            perceptron: PerceptronConfig {
                strategy: IndexStrategy::GlobalBipolar,
                rows: 59,
                size: 1024,
                history_len: 59,
                path_len: 64,
                path_bits: 4,
                segment_bits: 0,
                segment_stride: 0,
                theta: PerceptronConfig::default_theta(59),
            },
            target: TargetConfig::Vpc {
                size: 32768,
                iters: 20,
                usage_rows: 1024,
            },
        }
    }

    /// Perceptron indexed by overlapping windows of global history hashed
    /// with the branch address, with a plain BTB for indirect targets.
    pub fn global_shifted() -> Self {
        Self {
            perceptron: PerceptronConfig {
                strategy: IndexStrategy::GlobalShifted,
                rows: 63,
                size: 8192,
                history_len: 136,
                path_len: 64,
                path_bits: 4,
                segment_bits: 10,
                segment_stride: 2,
                theta: PerceptronConfig::default_theta(63),
            },
            target: TargetConfig::Btb { size: 32768 },
        }
    }

    /// Get the [approximate] number of storage bits.
    pub fn storage_bits(&self) -> usize {
        self.perceptron.storage_bits() + self.target.storage_bits()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.perceptron.validate()?;
        self.target.validate()
    }

    /// Use this configuration to create a new [VpcPredictor].
    pub fn build(self) -> Result<VpcPredictor, ConfigError> {
        self.validate()?;
        Ok(VpcPredictor::from_config(self))
    }
}

impl Default for PredictorConfig {
    fn default() -> Self { Self::merged_path_vpc() }
}

//! Branch direction and indirect target prediction with a hashed
//! perceptron and VPC (virtual program counter) target resolution.

pub mod branch;
pub mod error;
pub mod history;
pub mod predictor;
pub mod sim;
pub mod stats;
pub mod workload;

pub use branch::*;
pub use error::*;
pub use history::*;
pub use predictor::*;

pub mod config;
pub mod error;
pub mod invocation;
pub mod output;
pub mod runner;
pub mod verdict;

pub use error::ProbeError;
pub use runner::{ExecutionResult, Outcome, Runner};
pub use verdict::Verdict;

//! In-process pipeline assembly.

mod orchestrator;
mod stats;

pub use orchestrator::LocalPipeline;
pub use stats::ServeStats;

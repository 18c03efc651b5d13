pub mod log;
pub mod runner;
pub mod stats;
pub mod types;

pub use runner::PhaseRunner;
pub use stats::{Summary, summarize};
pub use types::{Outcome, Phase, RequestConfig};

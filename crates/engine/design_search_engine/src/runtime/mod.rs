pub mod bench;
pub mod search;
pub mod trace;

pub use bench::{BenchResult, run_bench};
pub use search::{DepthOutcome, RunReport, SearchCarry, SearchEngine, StopReason};
pub use trace::{CSV_HEADER, TraceRow};

//! Multi-objective beam search over design states.
//!
//! Each depth expands the frontier through a rule set, balances the children
//! by rule category, scores them on five objectives (the Field objective
//! through a bounded projection cache), rescales with median/MAD statistics,
//! ranks by Pareto front and picks a spread-out beam under an adaptive
//! diversity pressure. One [`TraceRow`] per depth records what happened.

pub mod adapters;
pub mod capability;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod ports;
pub mod runtime;

pub use adapters::{CsvTraceSink, JsonlTraceSink, MemoryTraceSink};
pub use capability::{BeamFrontier, LambdaState};
pub use config::{BalanceMode, BenchConfig, NormalizationMode, RunConfig};
pub use domain::{DesignRule, DesignState, RuleSet, Transformation};
pub use engine::{BoundedProjectionCache, NormalizationStats};
pub use error::{ConfigError, EngineError};
pub use ports::TraceSink;
pub use runtime::{
    BenchResult, DepthOutcome, RunReport, SearchCarry, SearchEngine, StopReason, TraceRow,
    run_bench,
};

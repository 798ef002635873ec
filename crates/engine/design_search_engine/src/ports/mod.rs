pub mod trace_sink;

pub use trace_sink::TraceSink;

use crate::error::EngineError;
use crate::runtime::TraceRow;

/// Outbound port for per-depth diagnostics.
pub trait TraceSink {
    fn emit(&mut self, row: &TraceRow) -> Result<(), EngineError>;

    fn finish(&mut self) -> Result<(), EngineError> {
        Ok(())
    }
}

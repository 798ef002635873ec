use std::sync::{Arc, Mutex};

use crate::error::EngineError;
use crate::ports::TraceSink;
use crate::runtime::TraceRow;

#[derive(Clone, Default, Debug)]
pub struct MemoryTraceSink {
    rows: Arc<Mutex<Vec<TraceRow>>>,
}

impl MemoryTraceSink {
    pub fn take(&self) -> Vec<TraceRow> {
        match self.rows.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(_) => Vec::new(),
        }
    }
}

impl TraceSink for MemoryTraceSink {
    fn emit(&mut self, row: &TraceRow) -> Result<(), EngineError> {
        let mut guard = self
            .rows
            .lock()
            .map_err(|e| EngineError::Sink(format!("memory sink poisoned: {e}")))?;
        guard.push(row.clone());
        Ok(())
    }
}

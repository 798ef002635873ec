use std::io::Write;

use crate::error::EngineError;
use crate::ports::TraceSink;
use crate::runtime::TraceRow;

pub struct JsonlTraceSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonlTraceSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> TraceSink for JsonlTraceSink<W> {
    fn emit(&mut self, row: &TraceRow) -> Result<(), EngineError> {
        serde_json::to_writer(&mut self.writer, row)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), EngineError> {
        self.writer.flush()?;
        Ok(())
    }
}

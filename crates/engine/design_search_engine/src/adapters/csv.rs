use std::io::Write;

use crate::error::EngineError;
use crate::ports::TraceSink;
use crate::runtime::{CSV_HEADER, TraceRow};

/// Header on the first row, then one line per row.
pub struct CsvTraceSink<W: Write> {
    writer: W,
    header_written: bool,
}

impl<W: Write> CsvTraceSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            header_written: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> TraceSink for CsvTraceSink<W> {
    fn emit(&mut self, row: &TraceRow) -> Result<(), EngineError> {
        if !self.header_written {
            writeln!(self.writer, "{CSV_HEADER}")?;
            self.header_written = true;
        }
        writeln!(self.writer, "{}", row.to_csv_line())?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), EngineError> {
        self.writer.flush()?;
        Ok(())
    }
}

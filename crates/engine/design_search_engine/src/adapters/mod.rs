pub mod csv;
pub mod jsonl;
pub mod memory;

pub use csv::CsvTraceSink;
pub use jsonl::JsonlTraceSink;
pub use memory::MemoryTraceSink;

#[cfg(test)]
mod tests {
    use crate::config::RunConfig;
    use crate::domain::RuleSet;
    use crate::ports::TraceSink;
    use crate::runtime::{CSV_HEADER, SearchEngine};

    use super::*;

    fn engine() -> SearchEngine {
        let mut cfg = RunConfig::default();
        cfg.depth = 3;
        SearchEngine::new(cfg, RuleSet::default_catalogue()).expect("valid engine")
    }

    #[test]
    fn csv_sink_writes_header_once() {
        let mut sink = CsvTraceSink::new(Vec::new());
        engine().run_with_sink(&mut sink).expect("run");
        let text = String::from_utf8(sink.into_inner()).expect("utf8");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], CSV_HEADER);
        assert_eq!(lines.iter().filter(|l| **l == CSV_HEADER).count(), 1);
    }

    #[test]
    fn jsonl_sink_writes_one_object_per_row() {
        let mut sink = JsonlTraceSink::new(Vec::new());
        engine().run_with_sink(&mut sink).expect("run");
        let text = String::from_utf8(sink.into_inner()).expect("utf8");
        for (i, line) in text.lines().enumerate() {
            let value: serde_json::Value = serde_json::from_str(line).expect("json line");
            assert_eq!(value["depth"], i + 1);
        }
        assert_eq!(text.lines().count(), 3);
    }

    #[test]
    fn memory_sink_matches_report_rows() {
        let e = engine();
        let mut sink = MemoryTraceSink::default();
        let report = e.run_with_sink(&mut sink).expect("run");
        assert_eq!(sink.take(), report.rows);

        let mut replay = MemoryTraceSink::default();
        report.emit_to(&mut replay).expect("emit");
        assert_eq!(replay.take().len(), 3);
        assert!(replay.take().is_empty());
        replay.finish().expect("finish");
    }
}

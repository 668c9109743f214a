//! Purpose: Render extraction output for the CLI as fixed-width text or JSONL.
//! Exports: `PrintSink`, `JsonlSink`.
//! Role: The `Sink` implementations behind `--format table|jsonl`.
//! Invariants: Table output prints one header per selected table; JSONL emits
//! exactly one object per decoded record.
use std::io::Write;

use serde_json::json;

use esedump::api::{CacheRecord, Sink, TableMeta};

const HEADER: [&str; 8] = [
    "EntryId",
    "FileSize",
    "AccessCount",
    "CreationTime",
    "ModifiedTime",
    "AccessedTime",
    "Filename",
    "Url",
];

/// Human-readable fixed-width output, one metadata block per table and one
/// aligned row per record. Absent values render as `-`.
pub struct PrintSink<W: Write> {
    out: W,
    info: bool,
}

impl<W: Write> PrintSink<W> {
    pub fn new(out: W, info: bool) -> Self {
        Self { out, info }
    }

    fn print_meta(&mut self, meta: &TableMeta) {
        let _ = writeln!(self.out, "-----------------------------");
        let _ = writeln!(self.out, "Table {}: {}", meta.index, meta.name);
        let _ = writeln!(
            self.out,
            "Columns: {}  Records: {}",
            meta.column_count, meta.record_count
        );
    }

    fn print_header(&mut self) {
        let [entry, size, count, created, modified, accessed, filename, url] = HEADER;
        let _ = writeln!(
            self.out,
            "{entry:>8} {size:>12} {count:>11} {created:>23} {modified:>23} {accessed:>23} {filename:<32} {url}"
        );
    }
}

fn int_cell(value: Option<i64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

fn text_cell(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("-")
}

impl<W: Write> Sink for PrintSink<W> {
    fn table(&mut self, meta: &TableMeta) {
        if self.info || meta.selected {
            self.print_meta(meta);
        }
        if meta.selected && meta.record_count > 0 {
            self.print_header();
        }
    }

    fn record(&mut self, _meta: &TableMeta, record: &CacheRecord) {
        let _ = writeln!(
            self.out,
            "{:>8} {:>12} {:>11} {:>23} {:>23} {:>23} {:<32} {}",
            int_cell(record.entry_id),
            int_cell(record.file_size),
            int_cell(record.access_count),
            text_cell(&record.creation_time),
            text_cell(&record.modified_time),
            text_cell(&record.accessed_time),
            text_cell(&record.filename),
            text_cell(&record.url),
        );
    }
}

/// One JSON object per record on stdout; table metadata goes to the stream
/// only when `info` is set, tagged so consumers can split the two.
pub struct JsonlSink<W: Write> {
    out: W,
    info: bool,
}

impl<W: Write> JsonlSink<W> {
    pub fn new(out: W, info: bool) -> Self {
        Self { out, info }
    }
}

impl<W: Write> Sink for JsonlSink<W> {
    fn table(&mut self, meta: &TableMeta) {
        if !self.info {
            return;
        }
        let value = json!({
            "type": "table",
            "index": meta.index,
            "name": meta.name,
            "columns": meta.column_count,
            "records": meta.record_count,
            "selected": meta.selected,
        });
        let _ = writeln!(self.out, "{value}");
    }

    fn record(&mut self, meta: &TableMeta, record: &CacheRecord) {
        let value = json!({
            "type": "record",
            "table": meta.name,
            "index": record.index,
            "entry_id": record.entry_id,
            "file_size": record.file_size,
            "access_count": record.access_count,
            "creation_time": record.creation_time,
            "modified_time": record.modified_time,
            "accessed_time": record.accessed_time,
            "filename": record.filename,
            "url": record.url,
        });
        let _ = writeln!(self.out, "{value}");
    }
}

#[cfg(test)]
mod tests {
    use super::{JsonlSink, PrintSink};
    use esedump::api::{CacheRecord, Sink, TableMeta};

    fn meta() -> TableMeta {
        TableMeta {
            index: 0,
            name: "Container_1".to_string(),
            column_count: 25,
            record_count: 1,
            selected: true,
        }
    }

    fn record() -> CacheRecord {
        CacheRecord {
            index: 0,
            entry_id: Some(5),
            file_size: Some(100),
            access_count: Some(3),
            creation_time: Some("1601-01-01 00:00:00.000".to_string()),
            modified_time: None,
            accessed_time: None,
            filename: Some("a.txt".to_string()),
            url: None,
        }
    }

    #[test]
    fn print_sink_renders_absent_as_dash() {
        let mut buf = Vec::new();
        {
            let mut sink = PrintSink::new(&mut buf, false);
            let meta = meta();
            sink.table(&meta);
            sink.record(&meta, &record());
        }
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("Container_1"));
        assert!(text.contains("EntryId"));
        assert!(text.contains("a.txt"));
        let row = text.lines().last().unwrap();
        assert!(row.trim_end().ends_with('-'));
    }

    #[test]
    fn jsonl_sink_emits_one_object_per_record() {
        let mut buf = Vec::new();
        {
            let mut sink = JsonlSink::new(&mut buf, false);
            let meta = meta();
            sink.table(&meta);
            sink.record(&meta, &record());
        }
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 1);
        let value: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(value["type"], "record");
        assert_eq!(value["entry_id"], 5);
        assert!(value["url"].is_null());
    }
}

// Table enumeration and record extraction: walk every table, decode the
// columns of interest for the tables that match the name filter.
use crate::core::backend::EseBackend;
use crate::core::decode::{ColumnType, ColumnValue, decode_column};
use crate::core::error::Error;
use crate::core::session::{RecordGuard, Session};
use crate::core::timefmt::filetime_to_utc;

/// Default table-name filter: the WebCache content tables.
pub const DEFAULT_TABLE_FILTER: &str = "Container_";

/// Columns of interest, by 0-based schema index. The defaults are the known
/// layout of the WebCache `Container_n` table family; other table families
/// can remap without touching the extractor.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ColumnMap {
    pub entry_id: i32,
    pub file_size: i32,
    pub access_count: i32,
    pub creation_time: i32,
    pub modified_time: i32,
    pub accessed_time: i32,
    pub url: i32,
    pub filename: i32,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            entry_id: 0,
            file_size: 5,
            access_count: 8,
            creation_time: 10,
            modified_time: 12,
            accessed_time: 13,
            url: 17,
            filename: 18,
        }
    }
}

/// How to populate `AccessCount`.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum AccessCountMode {
    /// The 32-bit counter the column actually holds.
    #[default]
    Corrected,
    /// Reproduce historical exports, where AccessCount was populated from
    /// the previously read 64-bit field (FileSize). Useful for differential
    /// comparison against old output.
    Legacy,
}

/// Whether a zero timestamp renders as the 1601 epoch or as absent.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ZeroTimePolicy {
    #[default]
    Epoch,
    Absent,
}

#[derive(Clone, Debug)]
pub struct ExtractOptions {
    pub filter: String,
    pub columns: ColumnMap,
    pub access_count: AccessCountMode,
    pub zero_time: ZeroTimePolicy,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            filter: DEFAULT_TABLE_FILTER.to_string(),
            columns: ColumnMap::default(),
            access_count: AccessCountMode::default(),
            zero_time: ZeroTimePolicy::default(),
        }
    }
}

/// Metadata for one enumerated table. Emitted for every table in the file;
/// `selected` marks the ones whose records were extracted.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TableMeta {
    pub index: i32,
    pub name: String,
    pub column_count: i32,
    pub record_count: i64,
    pub selected: bool,
}

/// One decoded row. Fields are `None` when the value was absent or its
/// decode failed (the failure is reported separately).
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CacheRecord {
    pub index: i64,
    pub entry_id: Option<i64>,
    pub file_size: Option<i64>,
    pub access_count: Option<i64>,
    pub creation_time: Option<String>,
    pub modified_time: Option<String>,
    pub accessed_time: Option<String>,
    pub filename: Option<String>,
    pub url: Option<String>,
}

/// Receives enumeration and extraction output; the CLI prints, tests collect.
pub trait Sink {
    fn table(&mut self, meta: &TableMeta);
    fn record(&mut self, meta: &TableMeta, record: &CacheRecord);
}

/// Walk every table of the open file. Metadata is emitted for all tables;
/// records are extracted only for tables whose name contains
/// `options.filter`. A failure inside one table is reported and the walk
/// continues with the next; only the table-count query is fatal.
pub fn extract_file<B: EseBackend>(
    session: &Session<B>,
    options: &ExtractOptions,
    sink: &mut dyn Sink,
) -> Result<(), Error> {
    let table_count = session.table_count()?;
    for index in 0..table_count {
        if let Err(err) = extract_one_table(session, index, options, sink) {
            tracing::debug!(table = index, error = %err, "table skipped after reader failure");
        }
    }
    Ok(())
}

fn extract_one_table<B: EseBackend>(
    session: &Session<B>,
    index: i32,
    options: &ExtractOptions,
    sink: &mut dyn Sink,
) -> Result<(), Error> {
    let table = session.table(index)?;
    let name = table.name()?;
    let column_count = table.column_count()?;
    let record_count = table.record_count()?;
    let selected = name.contains(&options.filter);
    let meta = TableMeta {
        index,
        name,
        column_count,
        record_count,
        selected,
    };
    sink.table(&meta);

    if selected {
        tracing::debug!(table = %meta.name, records = record_count, "extracting records");
        for record_index in 0..record_count {
            let record = match table.record(record_index) {
                Ok(record) => record,
                // Already reported; skip the row, keep the table going.
                Err(_) => continue,
            };
            let decoded = decode_record(&record, record_index, options);
            sink.record(&meta, &decoded);
        }
    }
    Ok(())
}

/// Decode the columns of interest for one record. Single-column failures
/// leave the field unset and the partially decoded record is still produced.
fn decode_record<B: EseBackend>(
    record: &RecordGuard<'_, B>,
    index: i64,
    options: &ExtractOptions,
) -> CacheRecord {
    let columns = &options.columns;
    let mut out = CacheRecord {
        index,
        ..CacheRecord::default()
    };

    out.entry_id = read_int(record, columns.entry_id);
    out.file_size = read_int(record, columns.file_size);
    out.access_count = match options.access_count {
        AccessCountMode::Corrected => read_int(record, columns.access_count),
        AccessCountMode::Legacy => {
            // Historical exports performed the 32-bit read but published the
            // stale 64-bit buffer, i.e. the FileSize value.
            let _ = read_int(record, columns.access_count);
            out.file_size
        }
    };
    out.creation_time = read_time(record, columns.creation_time, options.zero_time);
    out.modified_time = read_time(record, columns.modified_time, options.zero_time);
    out.accessed_time = read_time(record, columns.accessed_time, options.zero_time);
    out.url = read_text(record, columns.url);
    out.filename = read_text(record, columns.filename);
    out
}

/// Query the declared type of `column` and decode accordingly. Reader
/// failures have already been reported by the session when this returns
/// `None`; unknown type tags decode as absent.
fn read_value<B: EseBackend>(record: &RecordGuard<'_, B>, column: i32) -> Option<ColumnValue> {
    let raw = record.column_type(column).ok()?;
    let Some(column_type) = ColumnType::from_raw(raw) else {
        tracing::warn!(column, raw, "unknown column type tag");
        return None;
    };
    decode_column(record, column, column_type).ok()
}

fn read_int<B: EseBackend>(record: &RecordGuard<'_, B>, column: i32) -> Option<i64> {
    read_value(record, column)?.as_int()
}

fn read_time<B: EseBackend>(
    record: &RecordGuard<'_, B>,
    column: i32,
    policy: ZeroTimePolicy,
) -> Option<String> {
    let ticks = read_value(record, column)?.as_int()? as u64;
    if ticks == 0 && policy == ZeroTimePolicy::Absent {
        return None;
    }
    match filetime_to_utc(ticks) {
        Ok(formatted) => Some(formatted),
        Err(err) => {
            tracing::warn!(column, ticks, error = %err, "undecodable timestamp");
            None
        }
    }
}

fn read_text<B: EseBackend>(record: &RecordGuard<'_, B>, column: i32) -> Option<String> {
    read_value(record, column)?.into_text()
}

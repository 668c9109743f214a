// Reader boundary: the handle-based C-style surface every backend must provide.
use std::path::Path;

/// Result code convention shared by every reader call: `1` success, `0`
/// not-found (meaningful only for the signature check), negative failure.
pub type RawCode = i32;

pub const RAW_SUCCESS: RawCode = 1;
pub const RAW_NOT_FOUND: RawCode = 0;

/// Read-only access when opening a file.
pub const ACCESS_FLAG_READ: u32 = 1;
/// Skip template-table columns when counting a table's columns.
pub const COLUMN_FLAG_IGNORE_TEMPLATE_TABLE: u32 = 1;
/// Value data flag marking a plain variable-size value with an extractable
/// string representation.
pub const VALUE_FLAG_VARIABLE_SIZE: u32 = 1;

/// Diagnostic payload a failing call leaves behind. Owning it is the whole
/// lifecycle: taking it out of the [`ErrorSlot`] and dropping it is the
/// "free exactly once" of the underlying library.
#[derive(Debug)]
pub struct ErrorContext {
    message: String,
}

impl ErrorContext {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn into_message(self) -> String {
        self.message
    }
}

/// Out-parameter for the error context of a single call. Callers hand in an
/// empty slot; a failing call fills it.
pub type ErrorSlot = Option<ErrorContext>;

/// The external ESE reader, expressed at the C calling convention it actually
/// has: opaque handles, out-parameters, raw result codes, an error slot per
/// call. All session/guard logic sits on top of this trait so the real
/// libesedb binding and the scripted test backend are interchangeable.
///
/// Implementations are not assumed to be thread-safe; the pipeline drives
/// them strictly sequentially.
pub trait EseBackend {
    type File;
    type Table;
    type Record;

    fn version(&self) -> String;

    fn check_file_signature(&self, path: &Path, error: &mut ErrorSlot) -> RawCode;

    fn file_initialize(&self, out: &mut Option<Self::File>, error: &mut ErrorSlot) -> RawCode;

    fn file_open(
        &self,
        file: &Self::File,
        path: &Path,
        access_flags: u32,
        error: &mut ErrorSlot,
    ) -> RawCode;

    fn file_close(&self, file: &Self::File, error: &mut ErrorSlot) -> RawCode;

    fn file_free(&self, file: Self::File, error: &mut ErrorSlot) -> RawCode;

    fn file_get_number_of_tables(
        &self,
        file: &Self::File,
        out: &mut i32,
        error: &mut ErrorSlot,
    ) -> RawCode;

    fn file_get_table(
        &self,
        file: &Self::File,
        index: i32,
        out: &mut Option<Self::Table>,
        error: &mut ErrorSlot,
    ) -> RawCode;

    fn table_get_utf8_name_size(
        &self,
        table: &Self::Table,
        out: &mut usize,
        error: &mut ErrorSlot,
    ) -> RawCode;

    /// Writes the NUL-terminated UTF-8 name into `buf`, which must be at
    /// least the size reported by [`Self::table_get_utf8_name_size`].
    fn table_get_utf8_name(
        &self,
        table: &Self::Table,
        buf: &mut [u8],
        error: &mut ErrorSlot,
    ) -> RawCode;

    fn table_get_number_of_columns(
        &self,
        table: &Self::Table,
        flags: u32,
        out: &mut i32,
        error: &mut ErrorSlot,
    ) -> RawCode;

    fn table_get_number_of_records(
        &self,
        table: &Self::Table,
        out: &mut i64,
        error: &mut ErrorSlot,
    ) -> RawCode;

    fn table_get_record(
        &self,
        table: &Self::Table,
        index: i64,
        out: &mut Option<Self::Record>,
        error: &mut ErrorSlot,
    ) -> RawCode;

    fn table_free(&self, table: Self::Table, error: &mut ErrorSlot) -> RawCode;

    fn record_get_number_of_values(
        &self,
        record: &Self::Record,
        out: &mut i32,
        error: &mut ErrorSlot,
    ) -> RawCode;

    fn record_get_value_64bit(
        &self,
        record: &Self::Record,
        column: i32,
        out: &mut u64,
        error: &mut ErrorSlot,
    ) -> RawCode;

    fn record_get_value_32bit(
        &self,
        record: &Self::Record,
        column: i32,
        out: &mut u32,
        error: &mut ErrorSlot,
    ) -> RawCode;

    fn record_get_column_type(
        &self,
        record: &Self::Record,
        column: i32,
        out: &mut u32,
        error: &mut ErrorSlot,
    ) -> RawCode;

    fn record_get_value_data_flags(
        &self,
        record: &Self::Record,
        column: i32,
        out: &mut u32,
        error: &mut ErrorSlot,
    ) -> RawCode;

    fn record_get_value_utf8_string_size(
        &self,
        record: &Self::Record,
        column: i32,
        out: &mut usize,
        error: &mut ErrorSlot,
    ) -> RawCode;

    /// Writes the NUL-terminated UTF-8 value into `buf`, which must be at
    /// least the size reported by the matching size query.
    fn record_get_value_utf8_string(
        &self,
        record: &Self::Record,
        column: i32,
        buf: &mut [u8],
        error: &mut ErrorSlot,
    ) -> RawCode;

    fn record_free(&self, record: Self::Record, error: &mut ErrorSlot) -> RawCode;
}

/// Decode a NUL-terminated UTF-8 buffer as produced by the name/value string
/// calls. Bytes past the first NUL are ignored.
pub fn utf8_from_buf(buf: &[u8]) -> String {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..end]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::utf8_from_buf;

    #[test]
    fn utf8_from_buf_stops_at_nul() {
        assert_eq!(utf8_from_buf(b"Container_1\0junk"), "Container_1");
        assert_eq!(utf8_from_buf(b"no-nul"), "no-nul");
        assert_eq!(utf8_from_buf(b"\0"), "");
    }
}

// Column value decoding: dispatch on the declared column type, never assume
// a value is present.
use crate::core::backend::{EseBackend, VALUE_FLAG_VARIABLE_SIZE};
use crate::core::error::Error;
use crate::core::session::RecordGuard;

/// ESE column type tags as reported by the reader's catalog.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ColumnType {
    Null,
    Boolean,
    U8,
    I16,
    I32,
    Currency,
    F32,
    F64,
    DateTime,
    Binary,
    Text,
    LargeBinary,
    LargeText,
    SuperLarge,
    U32,
    I64,
    Guid,
    U16,
}

impl ColumnType {
    pub fn from_raw(raw: u32) -> Option<Self> {
        Some(match raw {
            0 => Self::Null,
            1 => Self::Boolean,
            2 => Self::U8,
            3 => Self::I16,
            4 => Self::I32,
            5 => Self::Currency,
            6 => Self::F32,
            7 => Self::F64,
            8 => Self::DateTime,
            9 => Self::Binary,
            10 => Self::Text,
            11 => Self::LargeBinary,
            12 => Self::LargeText,
            13 => Self::SuperLarge,
            14 => Self::U32,
            15 => Self::I64,
            16 => Self::Guid,
            17 => Self::U16,
            _ => return None,
        })
    }
}

/// A decoded column value, or `Absent` when the record holds nothing
/// extractable for that column.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ColumnValue {
    Int(i64),
    Text(String),
    Absent,
}

impl ColumnValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn into_text(self) -> Option<String> {
        match self {
            Self::Text(value) => Some(value),
            _ => None,
        }
    }
}

/// Decode one column of one record according to its declared type.
///
/// 64-bit signed and date-time columns come back as raw integers (the
/// timestamp rendering is the extractor's job); 32-bit unsigned counters are
/// widened to i64. Text and large-text values are read only when the value
/// data flags mark a plain variable-size value, and only when the size query
/// reports something to read; both gates yield `Absent`, never an error.
/// Types outside the extractable set decode as `Absent`.
pub fn decode_column<B: EseBackend>(
    record: &RecordGuard<'_, B>,
    column: i32,
    column_type: ColumnType,
) -> Result<ColumnValue, Error> {
    match column_type {
        ColumnType::I64 | ColumnType::DateTime => {
            Ok(ColumnValue::Int(record.value_i64(column)?))
        }
        ColumnType::U32 => Ok(ColumnValue::Int(i64::from(record.value_u32(column)?))),
        ColumnType::Text | ColumnType::LargeText => {
            let flags = record.value_data_flags(column)?;
            if flags != VALUE_FLAG_VARIABLE_SIZE {
                return Ok(ColumnValue::Absent);
            }
            let size = record.utf8_size(column)?;
            if size == 0 {
                return Ok(ColumnValue::Absent);
            }
            Ok(ColumnValue::Text(record.utf8_string(column, size)?))
        }
        _ => Ok(ColumnValue::Absent),
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{ColumnType, ColumnValue, decode_column};
    use crate::core::mock::{MockEse, MockRecord, MockTable};
    use crate::core::session::Session;

    fn session_with_record(record: MockRecord) -> (MockEse, Session<MockEse>) {
        let backend = MockEse::new();
        backend.push_table(MockTable::new("Container_1", 25).with_record(record));
        let session = Session::open(backend.clone(), Path::new("mock.dat")).expect("open");
        (backend, session)
    }

    #[test]
    fn column_type_round_trips_known_tags() {
        assert_eq!(ColumnType::from_raw(12), Some(ColumnType::LargeText));
        assert_eq!(ColumnType::from_raw(14), Some(ColumnType::U32));
        assert_eq!(ColumnType::from_raw(15), Some(ColumnType::I64));
        assert_eq!(ColumnType::from_raw(18), None);
    }

    #[test]
    fn unextractable_flags_yield_absent_without_a_string_read() {
        let (backend, session) =
            session_with_record(MockRecord::new().text_with_flags(17, "http://x", 4));
        let table = session.table(0).expect("table");
        let record = table.record(0).expect("record");

        let value = decode_column(&record, 17, ColumnType::LargeText).expect("decode");
        assert_eq!(value, ColumnValue::Absent);
        assert_eq!(backend.calls_for("record_get_value_utf8_string_size"), 0);
        assert_eq!(backend.calls_for("record_get_value_utf8_string"), 0);
    }

    #[test]
    fn zero_size_yields_absent() {
        let (backend, session) = session_with_record(MockRecord::new().text(18, ""));
        let table = session.table(0).expect("table");
        let record = table.record(0).expect("record");

        let value = decode_column(&record, 18, ColumnType::Text).expect("decode");
        assert_eq!(value, ColumnValue::Absent);
        assert_eq!(backend.calls_for("record_get_value_utf8_string_size"), 1);
        assert_eq!(backend.calls_for("record_get_value_utf8_string"), 0);
    }

    #[test]
    fn text_is_read_at_exactly_the_reported_size() {
        let (_, session) = session_with_record(MockRecord::new().text(18, "iecompat[1].htm"));
        let table = session.table(0).expect("table");
        let record = table.record(0).expect("record");

        let value = decode_column(&record, 18, ColumnType::Text).expect("decode");
        assert_eq!(value, ColumnValue::Text("iecompat[1].htm".to_string()));
    }

    #[test]
    fn integers_widen_to_i64() {
        let (_, session) = session_with_record(MockRecord::new().int(5, -42).uint(8, u32::MAX));
        let table = session.table(0).expect("table");
        let record = table.record(0).expect("record");

        assert_eq!(
            decode_column(&record, 5, ColumnType::I64).expect("i64"),
            ColumnValue::Int(-42)
        );
        assert_eq!(
            decode_column(&record, 8, ColumnType::U32).expect("u32"),
            ColumnValue::Int(i64::from(u32::MAX))
        );
    }

    #[test]
    fn missing_integer_value_is_an_error_not_a_panic() {
        let (_, session) = session_with_record(MockRecord::new());
        let table = session.table(0).expect("table");
        let record = table.record(0).expect("record");

        let err = decode_column(&record, 0, ColumnType::I64).unwrap_err();
        assert_eq!(err.operation(), Some("record_get_value_64bit"));
        assert_eq!(session.reporter().len(), 1);
    }

    #[test]
    fn non_extractable_types_decode_as_absent() {
        let (_, session) = session_with_record(MockRecord::new().int(0, 1));
        let table = session.table(0).expect("table");
        let record = table.record(0).expect("record");

        assert_eq!(
            decode_column(&record, 3, ColumnType::Guid).expect("guid"),
            ColumnValue::Absent
        );
        assert_eq!(
            decode_column(&record, 3, ColumnType::Binary).expect("binary"),
            ColumnValue::Absent
        );
    }
}

// Scripted in-memory reader backend for tests: fixed tables and records,
// one-shot failure injection, a call log, and live-handle tracking.
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::rc::Rc;

use crate::core::backend::{ErrorContext, ErrorSlot, EseBackend, RAW_SUCCESS, RawCode};

/// A scripted column value. `Text` carries its value data flags so tests can
/// model long-value and compressed storage the extractor must not touch.
#[derive(Clone, Debug)]
pub enum MockValue {
    I64(i64),
    U32(u32),
    Text { value: String, flags: u32 },
}

/// One scripted row, keyed by column index.
#[derive(Clone, Debug, Default)]
pub struct MockRecord {
    values: BTreeMap<i32, MockValue>,
}

impl MockRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn int(mut self, column: i32, value: i64) -> Self {
        self.values.insert(column, MockValue::I64(value));
        self
    }

    pub fn uint(mut self, column: i32, value: u32) -> Self {
        self.values.insert(column, MockValue::U32(value));
        self
    }

    pub fn text(self, column: i32, value: &str) -> Self {
        self.text_with_flags(column, value, 1)
    }

    pub fn text_with_flags(mut self, column: i32, value: &str, flags: u32) -> Self {
        self.values.insert(
            column,
            MockValue::Text {
                value: value.to_string(),
                flags,
            },
        );
        self
    }
}

/// One scripted table.
#[derive(Clone, Debug)]
pub struct MockTable {
    pub name: String,
    pub column_count: i32,
    pub records: Vec<MockRecord>,
}

impl MockTable {
    pub fn new(name: &str, column_count: i32) -> Self {
        Self {
            name: name.to_string(),
            column_count,
            records: Vec::new(),
        }
    }

    pub fn with_record(mut self, record: MockRecord) -> Self {
        self.records.push(record);
        self
    }
}

#[derive(Debug, Default)]
struct State {
    signature: Option<RawCode>,
    tables: Vec<MockTable>,
    next_id: u32,
    live: HashSet<u32>,
    calls: Vec<&'static str>,
    fail_once: HashMap<&'static str, RawCode>,
}

/// Clonable scripted backend; clones share state so a test can keep a view
/// onto the backend it handed to the session.
#[derive(Clone, Debug, Default)]
pub struct MockEse {
    state: Rc<RefCell<State>>,
}

#[derive(Debug)]
pub struct MockTableHandle {
    id: u32,
    table: usize,
}

#[derive(Debug)]
pub struct MockRecordHandle {
    id: u32,
    table: usize,
    record: usize,
}

impl MockEse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the signature-check result (`1` is an ESE file, `0` is not,
    /// negative is a reader failure).
    pub fn with_signature(self, code: RawCode) -> Self {
        self.state.borrow_mut().signature = Some(code);
        self
    }

    pub fn push_table(&self, table: MockTable) {
        self.state.borrow_mut().tables.push(table);
    }

    /// Make the next call to `operation` fail with `code`.
    pub fn fail_once(&self, operation: &'static str, code: RawCode) {
        self.state.borrow_mut().fail_once.insert(operation, code);
    }

    /// Handles acquired from this backend and not yet freed.
    pub fn live_handles(&self) -> usize {
        self.state.borrow().live.len()
    }

    pub fn calls_for(&self, operation: &str) -> usize {
        self.state
            .borrow()
            .calls
            .iter()
            .filter(|&&call| call == operation)
            .count()
    }

    /// Log the call; fire an injected failure if one is pending.
    fn enter(&self, operation: &'static str, error: &mut ErrorSlot) -> Option<RawCode> {
        let mut state = self.state.borrow_mut();
        state.calls.push(operation);
        let code = state.fail_once.remove(operation)?;
        *error = Some(ErrorContext::new(format!(
            "injected failure in {operation}"
        )));
        Some(code)
    }

    fn alloc(&self) -> u32 {
        let mut state = self.state.borrow_mut();
        state.next_id += 1;
        let id = state.next_id;
        state.live.insert(id);
        id
    }

    fn release(&self, id: u32, operation: &'static str, error: &mut ErrorSlot) -> RawCode {
        if self.state.borrow_mut().live.remove(&id) {
            RAW_SUCCESS
        } else {
            *error = Some(ErrorContext::new(format!(
                "{operation}: unknown handle {id} (double free?)"
            )));
            -1
        }
    }

    fn fail(error: &mut ErrorSlot, message: String) -> RawCode {
        *error = Some(ErrorContext::new(message));
        -1
    }
}

impl EseBackend for MockEse {
    type File = u32;
    type Table = MockTableHandle;
    type Record = MockRecordHandle;

    fn version(&self) -> String {
        "mock 0.0".to_string()
    }

    fn check_file_signature(&self, _path: &Path, error: &mut ErrorSlot) -> RawCode {
        if let Some(code) = self.enter("check_file_signature", error) {
            return code;
        }
        self.state.borrow().signature.unwrap_or(RAW_SUCCESS)
    }

    fn file_initialize(&self, out: &mut Option<u32>, error: &mut ErrorSlot) -> RawCode {
        if let Some(code) = self.enter("file_initialize", error) {
            return code;
        }
        *out = Some(self.alloc());
        RAW_SUCCESS
    }

    fn file_open(
        &self,
        file: &u32,
        _path: &Path,
        _access_flags: u32,
        error: &mut ErrorSlot,
    ) -> RawCode {
        if let Some(code) = self.enter("file_open", error) {
            return code;
        }
        if !self.state.borrow().live.contains(file) {
            return Self::fail(error, format!("file handle {file} is not live"));
        }
        RAW_SUCCESS
    }

    fn file_close(&self, _file: &u32, error: &mut ErrorSlot) -> RawCode {
        if let Some(code) = self.enter("file_close", error) {
            return code;
        }
        RAW_SUCCESS
    }

    fn file_free(&self, file: u32, error: &mut ErrorSlot) -> RawCode {
        if let Some(code) = self.enter("file_free", error) {
            return code;
        }
        self.release(file, "file_free", error)
    }

    fn file_get_number_of_tables(&self, _file: &u32, out: &mut i32, error: &mut ErrorSlot) -> RawCode {
        if let Some(code) = self.enter("file_get_number_of_tables", error) {
            return code;
        }
        *out = self.state.borrow().tables.len() as i32;
        RAW_SUCCESS
    }

    fn file_get_table(
        &self,
        _file: &u32,
        index: i32,
        out: &mut Option<MockTableHandle>,
        error: &mut ErrorSlot,
    ) -> RawCode {
        if let Some(code) = self.enter("file_get_table", error) {
            return code;
        }
        let table_count = self.state.borrow().tables.len();
        if index < 0 || index as usize >= table_count {
            return Self::fail(error, format!("table index {index} out of range"));
        }
        *out = Some(MockTableHandle {
            id: self.alloc(),
            table: index as usize,
        });
        RAW_SUCCESS
    }

    fn table_get_utf8_name_size(
        &self,
        table: &MockTableHandle,
        out: &mut usize,
        error: &mut ErrorSlot,
    ) -> RawCode {
        if let Some(code) = self.enter("table_get_utf8_name_size", error) {
            return code;
        }
        *out = self.state.borrow().tables[table.table].name.len() + 1;
        RAW_SUCCESS
    }

    fn table_get_utf8_name(
        &self,
        table: &MockTableHandle,
        buf: &mut [u8],
        error: &mut ErrorSlot,
    ) -> RawCode {
        if let Some(code) = self.enter("table_get_utf8_name", error) {
            return code;
        }
        let state = self.state.borrow();
        let name = state.tables[table.table].name.as_bytes();
        if buf.len() < name.len() + 1 {
            return Self::fail(error, "name buffer too small".to_string());
        }
        buf[..name.len()].copy_from_slice(name);
        buf[name.len()] = 0;
        RAW_SUCCESS
    }

    fn table_get_number_of_columns(
        &self,
        table: &MockTableHandle,
        _flags: u32,
        out: &mut i32,
        error: &mut ErrorSlot,
    ) -> RawCode {
        if let Some(code) = self.enter("table_get_number_of_columns", error) {
            return code;
        }
        *out = self.state.borrow().tables[table.table].column_count;
        RAW_SUCCESS
    }

    fn table_get_number_of_records(
        &self,
        table: &MockTableHandle,
        out: &mut i64,
        error: &mut ErrorSlot,
    ) -> RawCode {
        if let Some(code) = self.enter("table_get_number_of_records", error) {
            return code;
        }
        *out = self.state.borrow().tables[table.table].records.len() as i64;
        RAW_SUCCESS
    }

    fn table_get_record(
        &self,
        table: &MockTableHandle,
        index: i64,
        out: &mut Option<MockRecordHandle>,
        error: &mut ErrorSlot,
    ) -> RawCode {
        if let Some(code) = self.enter("table_get_record", error) {
            return code;
        }
        let record_count = self.state.borrow().tables[table.table].records.len();
        if index < 0 || index as usize >= record_count {
            return Self::fail(error, format!("record index {index} out of range"));
        }
        *out = Some(MockRecordHandle {
            id: self.alloc(),
            table: table.table,
            record: index as usize,
        });
        RAW_SUCCESS
    }

    fn table_free(&self, table: MockTableHandle, error: &mut ErrorSlot) -> RawCode {
        if let Some(code) = self.enter("table_free", error) {
            return code;
        }
        self.release(table.id, "table_free", error)
    }

    fn record_get_number_of_values(
        &self,
        record: &MockRecordHandle,
        out: &mut i32,
        error: &mut ErrorSlot,
    ) -> RawCode {
        if let Some(code) = self.enter("record_get_number_of_values", error) {
            return code;
        }
        *out = self.state.borrow().tables[record.table].column_count;
        RAW_SUCCESS
    }

    fn record_get_value_64bit(
        &self,
        record: &MockRecordHandle,
        column: i32,
        out: &mut u64,
        error: &mut ErrorSlot,
    ) -> RawCode {
        if let Some(code) = self.enter("record_get_value_64bit", error) {
            return code;
        }
        match self.value(record, column) {
            Some(MockValue::I64(value)) => {
                *out = value as u64;
                RAW_SUCCESS
            }
            Some(_) => Self::fail(error, format!("column {column} is not 64-bit")),
            None => Self::fail(error, format!("column {column} has no value")),
        }
    }

    fn record_get_value_32bit(
        &self,
        record: &MockRecordHandle,
        column: i32,
        out: &mut u32,
        error: &mut ErrorSlot,
    ) -> RawCode {
        if let Some(code) = self.enter("record_get_value_32bit", error) {
            return code;
        }
        match self.value(record, column) {
            Some(MockValue::U32(value)) => {
                *out = value;
                RAW_SUCCESS
            }
            Some(_) => Self::fail(error, format!("column {column} is not 32-bit")),
            None => Self::fail(error, format!("column {column} has no value")),
        }
    }

    fn record_get_column_type(
        &self,
        record: &MockRecordHandle,
        column: i32,
        out: &mut u32,
        error: &mut ErrorSlot,
    ) -> RawCode {
        if let Some(code) = self.enter("record_get_column_type", error) {
            return code;
        }
        *out = match self.value(record, column) {
            Some(MockValue::I64(_)) => 15,
            Some(MockValue::U32(_)) => 14,
            Some(MockValue::Text { .. }) => 12,
            None => 0,
        };
        RAW_SUCCESS
    }

    fn record_get_value_data_flags(
        &self,
        record: &MockRecordHandle,
        column: i32,
        out: &mut u32,
        error: &mut ErrorSlot,
    ) -> RawCode {
        if let Some(code) = self.enter("record_get_value_data_flags", error) {
            return code;
        }
        *out = match self.value(record, column) {
            Some(MockValue::Text { flags, .. }) => flags,
            Some(_) => 1,
            None => 0,
        };
        RAW_SUCCESS
    }

    fn record_get_value_utf8_string_size(
        &self,
        record: &MockRecordHandle,
        column: i32,
        out: &mut usize,
        error: &mut ErrorSlot,
    ) -> RawCode {
        if let Some(code) = self.enter("record_get_value_utf8_string_size", error) {
            return code;
        }
        *out = match self.value(record, column) {
            Some(MockValue::Text { value, .. }) if !value.is_empty() => value.len() + 1,
            _ => 0,
        };
        RAW_SUCCESS
    }

    fn record_get_value_utf8_string(
        &self,
        record: &MockRecordHandle,
        column: i32,
        buf: &mut [u8],
        error: &mut ErrorSlot,
    ) -> RawCode {
        if let Some(code) = self.enter("record_get_value_utf8_string", error) {
            return code;
        }
        match self.value(record, column) {
            Some(MockValue::Text { value, .. }) => {
                let bytes = value.as_bytes();
                if buf.len() < bytes.len() + 1 {
                    return Self::fail(error, "string buffer too small".to_string());
                }
                buf[..bytes.len()].copy_from_slice(bytes);
                buf[bytes.len()] = 0;
                RAW_SUCCESS
            }
            _ => Self::fail(error, format!("column {column} has no string value")),
        }
    }

    fn record_free(&self, record: MockRecordHandle, error: &mut ErrorSlot) -> RawCode {
        if let Some(code) = self.enter("record_free", error) {
            return code;
        }
        self.release(record.id, "record_free", error)
    }
}

impl MockEse {
    fn value(&self, record: &MockRecordHandle, column: i32) -> Option<MockValue> {
        self.state.borrow().tables[record.table].records[record.record]
            .values
            .get(&column)
            .cloned()
    }
}

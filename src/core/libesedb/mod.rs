//! Purpose: Safe `EseBackend` implementation on top of the system libesedb.
//! Exports: `LibEsedb` plus the opaque handle newtypes it hands out.
//! Role: The real reader backend, enabled by the `libesedb` cargo feature.
//! Invariants: All FFI interaction is confined to this module + `sys`.
//! Invariants: A call's `libesedb_error_t` is rendered and freed before the
//! call returns; it never crosses the trait boundary.
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int, c_void};
use std::path::Path;
use std::ptr;

use crate::core::backend::{ErrorContext, ErrorSlot, EseBackend, RawCode};

pub mod sys;

const ERROR_SPRINT_SIZE: usize = 1024;

/// Owned pointer to a libesedb object. Freed only through the matching
/// `*_free` call made by the session layer.
#[derive(Debug)]
pub struct FileHandle(*mut c_void);

#[derive(Debug)]
pub struct TableHandle(*mut c_void);

#[derive(Debug)]
pub struct RecordHandle(*mut c_void);

/// Backend driving the system libesedb. Stateless; every call goes straight
/// through to the library.
#[derive(Clone, Copy, Debug, Default)]
pub struct LibEsedb;

impl LibEsedb {
    pub fn new() -> Self {
        Self
    }
}

/// Render and free a failing call's error object, filling the caller's slot.
fn drain_error(error_ptr: &mut *mut c_void, slot: &mut ErrorSlot) {
    if error_ptr.is_null() {
        return;
    }
    let mut buf = [0 as c_char; ERROR_SPRINT_SIZE];
    let printed =
        unsafe { sys::libesedb_error_sprint(*error_ptr, buf.as_mut_ptr(), ERROR_SPRINT_SIZE) };
    let message = if printed > 0 {
        unsafe { CStr::from_ptr(buf.as_ptr()) }
            .to_string_lossy()
            .into_owned()
    } else {
        "unprintable libesedb error".to_string()
    };
    unsafe {
        sys::libesedb_error_free(error_ptr);
    }
    *error_ptr = ptr::null_mut();
    *slot = Some(ErrorContext::new(message));
}

fn path_to_cstring(path: &Path, slot: &mut ErrorSlot) -> Option<CString> {
    match CString::new(path.to_string_lossy().into_owned()) {
        Ok(cstring) => Some(cstring),
        Err(_) => {
            *slot = Some(ErrorContext::new("path contains an interior NUL byte"));
            None
        }
    }
}

impl EseBackend for LibEsedb {
    type File = FileHandle;
    type Table = TableHandle;
    type Record = RecordHandle;

    fn version(&self) -> String {
        let raw = unsafe { sys::libesedb_get_version() };
        if raw.is_null() {
            return "unknown".to_string();
        }
        unsafe { CStr::from_ptr(raw) }.to_string_lossy().into_owned()
    }

    fn check_file_signature(&self, path: &Path, error: &mut ErrorSlot) -> RawCode {
        let Some(path) = path_to_cstring(path, error) else {
            return -1;
        };
        let mut error_ptr = ptr::null_mut();
        let code = unsafe { sys::libesedb_check_file_signature(path.as_ptr(), &mut error_ptr) };
        drain_error(&mut error_ptr, error);
        code
    }

    fn file_initialize(&self, out: &mut Option<FileHandle>, error: &mut ErrorSlot) -> RawCode {
        let mut file = ptr::null_mut();
        let mut error_ptr = ptr::null_mut();
        let code = unsafe { sys::libesedb_file_initialize(&mut file, &mut error_ptr) };
        drain_error(&mut error_ptr, error);
        if code >= 0 && !file.is_null() {
            *out = Some(FileHandle(file));
        }
        code
    }

    fn file_open(
        &self,
        file: &FileHandle,
        path: &Path,
        access_flags: u32,
        error: &mut ErrorSlot,
    ) -> RawCode {
        let Some(path) = path_to_cstring(path, error) else {
            return -1;
        };
        let mut error_ptr = ptr::null_mut();
        let code = unsafe {
            sys::libesedb_file_open(file.0, path.as_ptr(), access_flags as c_int, &mut error_ptr)
        };
        drain_error(&mut error_ptr, error);
        code
    }

    fn file_close(&self, file: &FileHandle, error: &mut ErrorSlot) -> RawCode {
        let mut error_ptr = ptr::null_mut();
        let code = unsafe { sys::libesedb_file_close(file.0, &mut error_ptr) };
        drain_error(&mut error_ptr, error);
        code
    }

    fn file_free(&self, file: FileHandle, error: &mut ErrorSlot) -> RawCode {
        let mut raw = file.0;
        let mut error_ptr = ptr::null_mut();
        let code = unsafe { sys::libesedb_file_free(&mut raw, &mut error_ptr) };
        drain_error(&mut error_ptr, error);
        code
    }

    fn file_get_number_of_tables(
        &self,
        file: &FileHandle,
        out: &mut i32,
        error: &mut ErrorSlot,
    ) -> RawCode {
        let mut count: c_int = 0;
        let mut error_ptr = ptr::null_mut();
        let code =
            unsafe { sys::libesedb_file_get_number_of_tables(file.0, &mut count, &mut error_ptr) };
        drain_error(&mut error_ptr, error);
        *out = count;
        code
    }

    fn file_get_table(
        &self,
        file: &FileHandle,
        index: i32,
        out: &mut Option<TableHandle>,
        error: &mut ErrorSlot,
    ) -> RawCode {
        let mut table = ptr::null_mut();
        let mut error_ptr = ptr::null_mut();
        let code =
            unsafe { sys::libesedb_file_get_table(file.0, index, &mut table, &mut error_ptr) };
        drain_error(&mut error_ptr, error);
        if code >= 0 && !table.is_null() {
            *out = Some(TableHandle(table));
        }
        code
    }

    fn table_get_utf8_name_size(
        &self,
        table: &TableHandle,
        out: &mut usize,
        error: &mut ErrorSlot,
    ) -> RawCode {
        let mut error_ptr = ptr::null_mut();
        let code = unsafe { sys::libesedb_table_get_utf8_name_size(table.0, out, &mut error_ptr) };
        drain_error(&mut error_ptr, error);
        code
    }

    fn table_get_utf8_name(
        &self,
        table: &TableHandle,
        buf: &mut [u8],
        error: &mut ErrorSlot,
    ) -> RawCode {
        let mut error_ptr = ptr::null_mut();
        let code = unsafe {
            sys::libesedb_table_get_utf8_name(table.0, buf.as_mut_ptr(), buf.len(), &mut error_ptr)
        };
        drain_error(&mut error_ptr, error);
        code
    }

    fn table_get_number_of_columns(
        &self,
        table: &TableHandle,
        flags: u32,
        out: &mut i32,
        error: &mut ErrorSlot,
    ) -> RawCode {
        let mut count: c_int = 0;
        let mut error_ptr = ptr::null_mut();
        let code = unsafe {
            sys::libesedb_table_get_number_of_columns(
                table.0,
                &mut count,
                flags as u8,
                &mut error_ptr,
            )
        };
        drain_error(&mut error_ptr, error);
        *out = count;
        code
    }

    fn table_get_number_of_records(
        &self,
        table: &TableHandle,
        out: &mut i64,
        error: &mut ErrorSlot,
    ) -> RawCode {
        let mut count: c_int = 0;
        let mut error_ptr = ptr::null_mut();
        let code = unsafe {
            sys::libesedb_table_get_number_of_records(table.0, &mut count, &mut error_ptr)
        };
        drain_error(&mut error_ptr, error);
        *out = i64::from(count);
        code
    }

    fn table_get_record(
        &self,
        table: &TableHandle,
        index: i64,
        out: &mut Option<RecordHandle>,
        error: &mut ErrorSlot,
    ) -> RawCode {
        let mut record = ptr::null_mut();
        let mut error_ptr = ptr::null_mut();
        let code = unsafe {
            sys::libesedb_table_get_record(table.0, index as c_int, &mut record, &mut error_ptr)
        };
        drain_error(&mut error_ptr, error);
        if code >= 0 && !record.is_null() {
            *out = Some(RecordHandle(record));
        }
        code
    }

    fn table_free(&self, table: TableHandle, error: &mut ErrorSlot) -> RawCode {
        let mut raw = table.0;
        let mut error_ptr = ptr::null_mut();
        let code = unsafe { sys::libesedb_table_free(&mut raw, &mut error_ptr) };
        drain_error(&mut error_ptr, error);
        code
    }

    fn record_get_number_of_values(
        &self,
        record: &RecordHandle,
        out: &mut i32,
        error: &mut ErrorSlot,
    ) -> RawCode {
        let mut count: c_int = 0;
        let mut error_ptr = ptr::null_mut();
        let code = unsafe {
            sys::libesedb_record_get_number_of_values(record.0, &mut count, &mut error_ptr)
        };
        drain_error(&mut error_ptr, error);
        *out = count;
        code
    }

    fn record_get_value_64bit(
        &self,
        record: &RecordHandle,
        column: i32,
        out: &mut u64,
        error: &mut ErrorSlot,
    ) -> RawCode {
        let mut error_ptr = ptr::null_mut();
        let code =
            unsafe { sys::libesedb_record_get_value_64bit(record.0, column, out, &mut error_ptr) };
        drain_error(&mut error_ptr, error);
        code
    }

    fn record_get_value_32bit(
        &self,
        record: &RecordHandle,
        column: i32,
        out: &mut u32,
        error: &mut ErrorSlot,
    ) -> RawCode {
        let mut error_ptr = ptr::null_mut();
        let code =
            unsafe { sys::libesedb_record_get_value_32bit(record.0, column, out, &mut error_ptr) };
        drain_error(&mut error_ptr, error);
        code
    }

    fn record_get_column_type(
        &self,
        record: &RecordHandle,
        column: i32,
        out: &mut u32,
        error: &mut ErrorSlot,
    ) -> RawCode {
        let mut error_ptr = ptr::null_mut();
        let code =
            unsafe { sys::libesedb_record_get_column_type(record.0, column, out, &mut error_ptr) };
        drain_error(&mut error_ptr, error);
        code
    }

    fn record_get_value_data_flags(
        &self,
        record: &RecordHandle,
        column: i32,
        out: &mut u32,
        error: &mut ErrorSlot,
    ) -> RawCode {
        let mut flags: u8 = 0;
        let mut error_ptr = ptr::null_mut();
        let code = unsafe {
            sys::libesedb_record_get_value_data_flags(record.0, column, &mut flags, &mut error_ptr)
        };
        drain_error(&mut error_ptr, error);
        *out = u32::from(flags);
        code
    }

    fn record_get_value_utf8_string_size(
        &self,
        record: &RecordHandle,
        column: i32,
        out: &mut usize,
        error: &mut ErrorSlot,
    ) -> RawCode {
        let mut error_ptr = ptr::null_mut();
        let code = unsafe {
            sys::libesedb_record_get_value_utf8_string_size(record.0, column, out, &mut error_ptr)
        };
        drain_error(&mut error_ptr, error);
        code
    }

    fn record_get_value_utf8_string(
        &self,
        record: &RecordHandle,
        column: i32,
        buf: &mut [u8],
        error: &mut ErrorSlot,
    ) -> RawCode {
        let mut error_ptr = ptr::null_mut();
        let code = unsafe {
            sys::libesedb_record_get_value_utf8_string(
                record.0,
                column,
                buf.as_mut_ptr(),
                buf.len(),
                &mut error_ptr,
            )
        };
        drain_error(&mut error_ptr, error);
        code
    }

    fn record_free(&self, record: RecordHandle, error: &mut ErrorSlot) -> RawCode {
        let mut raw = record.0;
        let mut error_ptr = ptr::null_mut();
        let code = unsafe { sys::libesedb_record_free(&mut raw, &mut error_ptr) };
        drain_error(&mut error_ptr, error);
        code
    }
}

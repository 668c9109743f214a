// Raw FFI bindings to libesedb (https://github.com/libyal/libesedb).
use std::os::raw::{c_char, c_int, c_void};

// All handles are opaque: libesedb_file_t, libesedb_table_t,
// libesedb_record_t, libesedb_error_t.
#[link(name = "esedb")]
unsafe extern "C" {
    pub fn libesedb_get_version() -> *const c_char;

    pub fn libesedb_check_file_signature(
        filename: *const c_char,
        error: *mut *mut c_void,
    ) -> c_int;

    pub fn libesedb_file_initialize(file: *mut *mut c_void, error: *mut *mut c_void) -> c_int;

    pub fn libesedb_file_open(
        file: *mut c_void,
        filename: *const c_char,
        access_flags: c_int,
        error: *mut *mut c_void,
    ) -> c_int;

    pub fn libesedb_file_close(file: *mut c_void, error: *mut *mut c_void) -> c_int;

    pub fn libesedb_file_free(file: *mut *mut c_void, error: *mut *mut c_void) -> c_int;

    pub fn libesedb_file_get_number_of_tables(
        file: *mut c_void,
        number_of_tables: *mut c_int,
        error: *mut *mut c_void,
    ) -> c_int;

    pub fn libesedb_file_get_table(
        file: *mut c_void,
        table_entry: c_int,
        table: *mut *mut c_void,
        error: *mut *mut c_void,
    ) -> c_int;

    pub fn libesedb_table_get_utf8_name_size(
        table: *mut c_void,
        utf8_string_size: *mut usize,
        error: *mut *mut c_void,
    ) -> c_int;

    pub fn libesedb_table_get_utf8_name(
        table: *mut c_void,
        utf8_string: *mut u8,
        utf8_string_size: usize,
        error: *mut *mut c_void,
    ) -> c_int;

    pub fn libesedb_table_get_number_of_columns(
        table: *mut c_void,
        number_of_columns: *mut c_int,
        flags: u8,
        error: *mut *mut c_void,
    ) -> c_int;

    pub fn libesedb_table_get_number_of_records(
        table: *mut c_void,
        number_of_records: *mut c_int,
        error: *mut *mut c_void,
    ) -> c_int;

    pub fn libesedb_table_get_record(
        table: *mut c_void,
        record_entry: c_int,
        record: *mut *mut c_void,
        error: *mut *mut c_void,
    ) -> c_int;

    pub fn libesedb_table_free(table: *mut *mut c_void, error: *mut *mut c_void) -> c_int;

    pub fn libesedb_record_get_number_of_values(
        record: *mut c_void,
        number_of_values: *mut c_int,
        error: *mut *mut c_void,
    ) -> c_int;

    pub fn libesedb_record_get_value_64bit(
        record: *mut c_void,
        value_entry: c_int,
        value_64bit: *mut u64,
        error: *mut *mut c_void,
    ) -> c_int;

    pub fn libesedb_record_get_value_32bit(
        record: *mut c_void,
        value_entry: c_int,
        value_32bit: *mut u32,
        error: *mut *mut c_void,
    ) -> c_int;

    pub fn libesedb_record_get_column_type(
        record: *mut c_void,
        value_entry: c_int,
        column_type: *mut u32,
        error: *mut *mut c_void,
    ) -> c_int;

    pub fn libesedb_record_get_value_data_flags(
        record: *mut c_void,
        value_entry: c_int,
        value_data_flags: *mut u8,
        error: *mut *mut c_void,
    ) -> c_int;

    pub fn libesedb_record_get_value_utf8_string_size(
        record: *mut c_void,
        value_entry: c_int,
        utf8_string_size: *mut usize,
        error: *mut *mut c_void,
    ) -> c_int;

    pub fn libesedb_record_get_value_utf8_string(
        record: *mut c_void,
        value_entry: c_int,
        utf8_string: *mut u8,
        utf8_string_size: usize,
        error: *mut *mut c_void,
    ) -> c_int;

    pub fn libesedb_record_free(record: *mut *mut c_void, error: *mut *mut c_void) -> c_int;

    pub fn libesedb_error_sprint(
        error: *mut c_void,
        string: *mut c_char,
        size: usize,
    ) -> c_int;

    pub fn libesedb_error_free(error: *mut *mut c_void) -> c_int;
}

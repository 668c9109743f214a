// Session and RAII guards: every acquired reader handle is released exactly
// once, on every exit path, with the release recorded in the ledger.
use std::cell::Cell;
use std::path::Path;

use crate::core::backend::{
    ACCESS_FLAG_READ, COLUMN_FLAG_IGNORE_TEMPLATE_TABLE, ErrorSlot, EseBackend, RAW_NOT_FOUND,
    RawCode, utf8_from_buf,
};
use crate::core::error::{Error, ErrorKind};
use crate::core::report::Reporter;

/// Acquire/release counters, per handle kind. Interior mutability because
/// guards bump them from `Drop`; the pipeline is single-threaded.
#[derive(Debug, Default)]
pub struct HandleLedger {
    files_acquired: Cell<u64>,
    files_released: Cell<u64>,
    tables_acquired: Cell<u64>,
    tables_released: Cell<u64>,
    records_acquired: Cell<u64>,
    records_released: Cell<u64>,
}

impl HandleLedger {
    fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            files_acquired: self.files_acquired.get(),
            files_released: self.files_released.get(),
            tables_acquired: self.tables_acquired.get(),
            tables_released: self.tables_released.get(),
            records_acquired: self.records_acquired.get(),
            records_released: self.records_released.get(),
        }
    }
}

/// Point-in-time copy of the ledger, the run's leak-detection signal.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct LedgerSnapshot {
    pub files_acquired: u64,
    pub files_released: u64,
    pub tables_acquired: u64,
    pub tables_released: u64,
    pub records_acquired: u64,
    pub records_released: u64,
}

impl LedgerSnapshot {
    pub fn acquired(&self) -> u64 {
        self.files_acquired + self.tables_acquired + self.records_acquired
    }

    pub fn released(&self) -> u64 {
        self.files_released + self.tables_released + self.records_released
    }

    pub fn balanced(&self) -> bool {
        self.files_acquired == self.files_released
            && self.tables_acquired == self.tables_released
            && self.records_acquired == self.records_released
    }
}

/// An open ESE file plus the bookkeeping shared by all guards derived from
/// it: the backend, the error reporter, and the handle ledger.
pub struct Session<B: EseBackend> {
    backend: B,
    reporter: Reporter,
    ledger: HandleLedger,
    file: Option<B::File>,
}

impl<B: EseBackend + std::fmt::Debug> std::fmt::Debug for Session<B>
where
    B::File: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("backend", &self.backend)
            .field("reporter", &self.reporter)
            .field("ledger", &self.ledger)
            .field("file", &self.file)
            .finish()
    }
}

impl<B: EseBackend> Session<B> {
    /// Initialize a file handle, verify the ESE signature, and open the file
    /// read-only. The initialized handle is freed on every failure path.
    pub fn open(backend: B, path: &Path) -> Result<Self, Error> {
        let session = Self {
            backend,
            reporter: Reporter::new(),
            ledger: HandleLedger::default(),
            file: None,
        };
        let mut slot: ErrorSlot = None;

        let mut file = None;
        let code = session.backend.file_initialize(&mut file, &mut slot);
        session.check("file_initialize", code, &mut slot)?;
        let file = file.ok_or_else(|| {
            Error::new(ErrorKind::Internal).with_message("reader reported success without a file handle")
        })?;
        session.ledger.files_acquired.set(1);

        let code = session.backend.check_file_signature(path, &mut slot);
        if code == RAW_NOT_FOUND {
            session.release_file(file);
            return Err(Error::new(ErrorKind::Signature)
                .with_message("file does not contain an ESE database")
                .with_path(path));
        }
        if let Err(err) = session.check("check_file_signature", code, &mut slot) {
            session.release_file(file);
            return Err(err.with_path(path));
        }

        let code = session
            .backend
            .file_open(&file, path, ACCESS_FLAG_READ, &mut slot);
        if let Err(err) = session.check("file_open", code, &mut slot) {
            session.release_file(file);
            return Err(err.with_path(path));
        }

        let mut session = session;
        session.file = Some(file);
        Ok(session)
    }

    pub fn version(&self) -> String {
        self.backend.version()
    }

    pub fn reporter(&self) -> &Reporter {
        &self.reporter
    }

    pub fn ledger(&self) -> LedgerSnapshot {
        self.ledger.snapshot()
    }

    /// Number of tables in the file. A failure here is file-level and fatal
    /// to the run.
    pub fn table_count(&self) -> Result<i32, Error> {
        let file = self.file()?;
        let mut slot: ErrorSlot = None;
        let mut count = 0;
        let code = self
            .backend
            .file_get_number_of_tables(file, &mut count, &mut slot);
        self.check("file_get_number_of_tables", code, &mut slot)?;
        Ok(count)
    }

    /// Acquire the table at `index`. The returned guard releases the handle
    /// when dropped, whatever happens in between.
    pub fn table(&self, index: i32) -> Result<TableGuard<'_, B>, Error> {
        let file = self.file()?;
        let mut slot: ErrorSlot = None;
        let mut handle = None;
        let code = self
            .backend
            .file_get_table(file, index, &mut handle, &mut slot);
        self.check("file_get_table", code, &mut slot)?;
        let handle = handle.ok_or_else(|| {
            Error::new(ErrorKind::Internal).with_message("reader reported success without a table handle")
        })?;
        self.ledger
            .tables_acquired
            .set(self.ledger.tables_acquired.get() + 1);
        Ok(TableGuard {
            session: self,
            handle: Some(handle),
        })
    }

    /// Close and free the file handle. Free is attempted even when close
    /// fails; calling this twice is a no-op.
    pub fn close(&mut self) -> Result<(), Error> {
        let Some(file) = self.file.take() else {
            return Ok(());
        };
        let mut slot: ErrorSlot = None;
        let code = self.backend.file_close(&file, &mut slot);
        let close_result = self.check("file_close", code, &mut slot);

        let code = self.backend.file_free(file, &mut slot);
        self.ledger
            .files_released
            .set(self.ledger.files_released.get() + 1);
        let free_result = self.check("file_free", code, &mut slot);

        close_result.and(free_result)
    }

    fn file(&self) -> Result<&B::File, Error> {
        self.file
            .as_ref()
            .ok_or_else(|| Error::new(ErrorKind::Usage).with_message("session already closed"))
    }

    /// Free a file handle on an open-failure path, reporting but otherwise
    /// ignoring a failing free.
    fn release_file(&self, file: B::File) {
        let mut slot: ErrorSlot = None;
        let code = self.backend.file_free(file, &mut slot);
        self.ledger
            .files_released
            .set(self.ledger.files_released.get() + 1);
        let _ = self.check("file_free", code, &mut slot);
    }

    /// Decode one raw result code. On failure: drain the error context,
    /// report it exactly once, and surface an `External` error carrying the
    /// operation name and code.
    fn check(
        &self,
        operation: &'static str,
        code: RawCode,
        slot: &mut ErrorSlot,
    ) -> Result<(), Error> {
        if code >= 0 {
            return Ok(());
        }
        let message = slot
            .take()
            .map(|ctx| ctx.into_message())
            .unwrap_or_else(|| "no error context".to_string());
        self.reporter.report(operation, code, message.clone());
        Err(Error::new(ErrorKind::External)
            .with_operation(operation)
            .with_code(code)
            .with_message(message))
    }
}

impl<B: EseBackend> Drop for Session<B> {
    fn drop(&mut self) {
        if self.file.is_some() {
            let _ = self.close();
        }
    }
}

/// One enumerated table. Owns the table handle for its scope; at most one
/// record guard is in flight underneath it at a time.
pub struct TableGuard<'s, B: EseBackend> {
    session: &'s Session<B>,
    handle: Option<B::Table>,
}

impl<'s, B: EseBackend> TableGuard<'s, B> {
    pub fn name(&self) -> Result<String, Error> {
        let handle = self.handle();
        let session = self.session;
        let mut slot: ErrorSlot = None;

        let mut size = 0usize;
        let code = session
            .backend
            .table_get_utf8_name_size(handle, &mut size, &mut slot);
        session.check("table_get_utf8_name_size", code, &mut slot)?;
        if size == 0 {
            return Ok(String::new());
        }

        let mut buf = vec![0u8; size];
        let code = session
            .backend
            .table_get_utf8_name(handle, &mut buf, &mut slot);
        session.check("table_get_utf8_name", code, &mut slot)?;
        Ok(utf8_from_buf(&buf))
    }

    pub fn column_count(&self) -> Result<i32, Error> {
        let mut slot: ErrorSlot = None;
        let mut count = 0;
        let code = self.session.backend.table_get_number_of_columns(
            self.handle(),
            COLUMN_FLAG_IGNORE_TEMPLATE_TABLE,
            &mut count,
            &mut slot,
        );
        self.session
            .check("table_get_number_of_columns", code, &mut slot)?;
        Ok(count)
    }

    pub fn record_count(&self) -> Result<i64, Error> {
        let mut slot: ErrorSlot = None;
        let mut count = 0;
        let code = self.session.backend.table_get_number_of_records(
            self.handle(),
            &mut count,
            &mut slot,
        );
        self.session
            .check("table_get_number_of_records", code, &mut slot)?;
        Ok(count)
    }

    /// Acquire the record at `index`; the guard releases it on drop.
    pub fn record(&self, index: i64) -> Result<RecordGuard<'s, B>, Error> {
        let session = self.session;
        let mut slot: ErrorSlot = None;
        let mut handle = None;
        let code =
            session
                .backend
                .table_get_record(self.handle(), index, &mut handle, &mut slot);
        session.check("table_get_record", code, &mut slot)?;
        let handle = handle.ok_or_else(|| {
            Error::new(ErrorKind::Internal)
                .with_message("reader reported success without a record handle")
        })?;
        session
            .ledger
            .records_acquired
            .set(session.ledger.records_acquired.get() + 1);
        Ok(RecordGuard {
            session,
            handle: Some(handle),
        })
    }

    fn handle(&self) -> &B::Table {
        self.handle
            .as_ref()
            .expect("table handle present until drop")
    }
}

impl<B: EseBackend> Drop for TableGuard<'_, B> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let mut slot: ErrorSlot = None;
            let code = self.session.backend.table_free(handle, &mut slot);
            self.session
                .ledger
                .tables_released
                .set(self.session.ledger.tables_released.get() + 1);
            let _ = self.session.check("table_free", code, &mut slot);
        }
    }
}

/// One row of a table, alive only for the duration of decoding it.
pub struct RecordGuard<'s, B: EseBackend> {
    session: &'s Session<B>,
    handle: Option<B::Record>,
}

impl<B: EseBackend> RecordGuard<'_, B> {
    pub fn value_count(&self) -> Result<i32, Error> {
        let mut slot: ErrorSlot = None;
        let mut count = 0;
        let code = self.session.backend.record_get_number_of_values(
            self.handle(),
            &mut count,
            &mut slot,
        );
        self.session
            .check("record_get_number_of_values", code, &mut slot)?;
        Ok(count)
    }

    pub fn value_i64(&self, column: i32) -> Result<i64, Error> {
        let mut slot: ErrorSlot = None;
        let mut value = 0u64;
        let code = self.session.backend.record_get_value_64bit(
            self.handle(),
            column,
            &mut value,
            &mut slot,
        );
        self.session
            .check("record_get_value_64bit", code, &mut slot)?;
        Ok(value as i64)
    }

    pub fn value_u32(&self, column: i32) -> Result<u32, Error> {
        let mut slot: ErrorSlot = None;
        let mut value = 0u32;
        let code = self.session.backend.record_get_value_32bit(
            self.handle(),
            column,
            &mut value,
            &mut slot,
        );
        self.session
            .check("record_get_value_32bit", code, &mut slot)?;
        Ok(value)
    }

    pub fn column_type(&self, column: i32) -> Result<u32, Error> {
        let mut slot: ErrorSlot = None;
        let mut raw = 0u32;
        let code = self.session.backend.record_get_column_type(
            self.handle(),
            column,
            &mut raw,
            &mut slot,
        );
        self.session
            .check("record_get_column_type", code, &mut slot)?;
        Ok(raw)
    }

    pub fn value_data_flags(&self, column: i32) -> Result<u32, Error> {
        let mut slot: ErrorSlot = None;
        let mut flags = 0u32;
        let code = self.session.backend.record_get_value_data_flags(
            self.handle(),
            column,
            &mut flags,
            &mut slot,
        );
        self.session
            .check("record_get_value_data_flags", code, &mut slot)?;
        Ok(flags)
    }

    pub fn utf8_size(&self, column: i32) -> Result<usize, Error> {
        let mut slot: ErrorSlot = None;
        let mut size = 0usize;
        let code = self.session.backend.record_get_value_utf8_string_size(
            self.handle(),
            column,
            &mut size,
            &mut slot,
        );
        self.session
            .check("record_get_value_utf8_string_size", code, &mut slot)?;
        Ok(size)
    }

    /// Read a UTF-8 value into a buffer of exactly `size` bytes, as reported
    /// by [`Self::utf8_size`]. No fixed-capacity buffers, no truncation.
    pub fn utf8_string(&self, column: i32, size: usize) -> Result<String, Error> {
        let mut slot: ErrorSlot = None;
        let mut buf = vec![0u8; size];
        let code = self.session.backend.record_get_value_utf8_string(
            self.handle(),
            column,
            &mut buf,
            &mut slot,
        );
        self.session
            .check("record_get_value_utf8_string", code, &mut slot)?;
        Ok(utf8_from_buf(&buf))
    }

    fn handle(&self) -> &B::Record {
        self.handle
            .as_ref()
            .expect("record handle present until drop")
    }
}

impl<B: EseBackend> Drop for RecordGuard<'_, B> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let mut slot: ErrorSlot = None;
            let code = self.session.backend.record_free(handle, &mut slot);
            self.session
                .ledger
                .records_released
                .set(self.session.ledger.records_released.get() + 1);
            let _ = self.session.check("record_free", code, &mut slot);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::Session;
    use crate::core::error::ErrorKind;
    use crate::core::mock::{MockEse, MockRecord, MockTable};

    fn mock_path() -> &'static Path {
        Path::new("WebCacheV01.dat")
    }

    #[test]
    fn open_close_free_balances_the_ledger() {
        let backend = MockEse::new();
        let mut session = Session::open(backend.clone(), mock_path()).expect("open");
        session.close().expect("close");

        let ledger = session.ledger();
        assert_eq!(ledger.files_acquired, 1);
        assert_eq!(ledger.files_released, 1);
        assert!(ledger.balanced());
        assert_eq!(backend.live_handles(), 0);
    }

    #[test]
    fn close_is_idempotent() {
        let backend = MockEse::new();
        let mut session = Session::open(backend, mock_path()).expect("open");
        session.close().expect("close");
        session.close().expect("second close");
        assert_eq!(session.ledger().files_released, 1);
    }

    #[test]
    fn drop_without_close_still_frees_the_file() {
        let backend = MockEse::new();
        {
            let _session = Session::open(backend.clone(), mock_path()).expect("open");
        }
        assert_eq!(backend.live_handles(), 0);
    }

    #[test]
    fn signature_mismatch_frees_the_initialized_handle() {
        let backend = MockEse::new().with_signature(0);
        let err = Session::open(backend.clone(), mock_path()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Signature);
        assert_eq!(backend.live_handles(), 0);
        assert_eq!(backend.calls_for("file_get_table"), 0);
    }

    #[test]
    fn open_failure_frees_the_initialized_handle() {
        let backend = MockEse::new();
        backend.fail_once("file_open", -3);
        let err = Session::open(backend.clone(), mock_path()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::External);
        assert_eq!(err.operation(), Some("file_open"));
        assert_eq!(err.code(), Some(-3));
        assert_eq!(backend.live_handles(), 0);
    }

    #[test]
    fn table_guard_releases_even_when_a_later_query_fails() {
        let backend = MockEse::new();
        backend.push_table(MockTable::new("Container_1", 25));
        backend.fail_once("table_get_number_of_records", -5);

        let session = Session::open(backend.clone(), mock_path()).expect("open");
        {
            let table = session.table(0).expect("table");
            assert!(table.record_count().is_err());
        }
        let ledger = session.ledger();
        assert_eq!(ledger.tables_acquired, 1);
        assert_eq!(ledger.tables_released, 1);
        assert_eq!(session.reporter().len(), 1);
    }

    #[test]
    fn record_guards_never_outlive_their_scope() {
        let backend = MockEse::new();
        backend.push_table(
            MockTable::new("Container_1", 25)
                .with_record(MockRecord::new().int(0, 7))
                .with_record(MockRecord::new().int(0, 8)),
        );

        let session = Session::open(backend, mock_path()).expect("open");
        let table = session.table(0).expect("table");
        for index in 0..table.record_count().expect("count") {
            let record = table.record(index).expect("record");
            assert_eq!(record.value_count().expect("values"), 25);
            assert!(record.value_i64(0).is_ok());
        }
        drop(table);

        let ledger = session.ledger();
        assert_eq!(ledger.records_acquired, 2);
        assert_eq!(ledger.records_released, 2);
        assert!(session.reporter().is_empty());
    }

    #[test]
    fn table_name_is_nul_trimmed() {
        let backend = MockEse::new();
        backend.push_table(MockTable::new("MSysObjects", 12));
        let session = Session::open(backend, mock_path()).expect("open");
        let table = session.table(0).expect("table");
        assert_eq!(table.name().expect("name"), "MSysObjects");
        assert_eq!(table.column_count().expect("columns"), 12);
    }
}

//! Purpose: Define the stable public Rust API boundary for esedump.
//! Exports: Core types and operations needed by the CLI and tests.
//! Role: Public, additive-only surface; hides internal module layout.
//! Invariants: This module is the only public path consumers should use.

pub use crate::core::backend::{
    ACCESS_FLAG_READ, COLUMN_FLAG_IGNORE_TEMPLATE_TABLE, ErrorContext, ErrorSlot, EseBackend,
    RAW_NOT_FOUND, RAW_SUCCESS, RawCode, VALUE_FLAG_VARIABLE_SIZE,
};
pub use crate::core::decode::{ColumnType, ColumnValue, decode_column};
#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::extract::{
    AccessCountMode, CacheRecord, ColumnMap, DEFAULT_TABLE_FILTER, ExtractOptions, Sink,
    TableMeta, ZeroTimePolicy, extract_file,
};
#[cfg(feature = "libesedb")]
pub use crate::core::libesedb::LibEsedb;
pub use crate::core::mock::{MockEse, MockRecord, MockTable, MockValue};
pub use crate::core::report::{Diagnostic, Reporter};
pub use crate::core::session::{LedgerSnapshot, RecordGuard, Session, TableGuard};
pub use crate::core::timefmt::{FILETIME_UNIX_OFFSET_SECS, filetime_to_utc};

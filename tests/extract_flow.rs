// End-to-end extraction flow over the scripted backend, through the public API.
use std::path::Path;

use esedump::api::{
    CacheRecord, ErrorKind, ExtractOptions, MockEse, MockRecord, MockTable, Session, Sink,
    TableMeta, extract_file,
};

#[derive(Default)]
struct Collector {
    tables: Vec<TableMeta>,
    records: Vec<CacheRecord>,
}

impl Sink for Collector {
    fn table(&mut self, meta: &TableMeta) {
        self.tables.push(meta.clone());
    }

    fn record(&mut self, _meta: &TableMeta, record: &CacheRecord) {
        self.records.push(record.clone());
    }
}

fn webcache_backend() -> MockEse {
    let backend = MockEse::new();
    backend.push_table(MockTable::new("MSysObjects", 12));
    backend.push_table(MockTable::new("Containers", 10));
    backend.push_table(
        MockTable::new("Container_1", 25)
            .with_record(
                MockRecord::new()
                    .int(0, 5)
                    .int(5, 100)
                    .uint(8, 3)
                    .int(10, 0)
                    .int(12, 0)
                    .int(13, 0)
                    .text(17, "http://x")
                    .text(18, "a.txt"),
            )
            .with_record(
                MockRecord::new()
                    .int(0, 6)
                    .int(5, 2048)
                    .uint(8, 1)
                    .int(10, 132_223_104_000_000_000)
                    .int(12, 132_223_104_001_234_567)
                    .int(13, 0)
                    .text_with_flags(17, "http://y", 4)
                    .text(18, "b.txt"),
            ),
    );
    backend
}

#[test]
fn full_run_decodes_matching_tables_and_balances_handles() {
    let backend = webcache_backend();
    let mut session = Session::open(backend.clone(), Path::new("WebCacheV01.dat")).expect("open");
    assert_eq!(session.version(), "mock 0.0");

    let mut sink = Collector::default();
    extract_file(&session, &ExtractOptions::default(), &mut sink).expect("extract");
    session.close().expect("close");

    assert_eq!(sink.tables.len(), 3);
    assert_eq!(
        sink.tables.iter().filter(|meta| meta.selected).count(),
        1
    );
    assert_eq!(sink.records.len(), 2);

    let first = &sink.records[0];
    assert_eq!(first.entry_id, Some(5));
    assert_eq!(first.file_size, Some(100));
    assert_eq!(first.access_count, Some(3));
    assert_eq!(first.creation_time.as_deref(), Some("1601-01-01 00:00:00.000"));
    assert_eq!(first.url.as_deref(), Some("http://x"));
    assert_eq!(first.filename.as_deref(), Some("a.txt"));

    let second = &sink.records[1];
    assert_eq!(second.entry_id, Some(6));
    // Long-value flags on the URL: absent, never an error.
    assert_eq!(second.url, None);
    assert_eq!(second.filename.as_deref(), Some("b.txt"));
    assert_eq!(second.creation_time.as_deref(), Some("2020-01-01 00:00:00.000"));
    assert_eq!(second.modified_time.as_deref(), Some("2020-01-01 00:00:00.123"));

    let ledger = session.ledger();
    assert!(ledger.balanced(), "ledger not balanced: {ledger:?}");
    assert_eq!(ledger.tables_acquired, 3);
    assert_eq!(ledger.records_acquired, 2);
    assert_eq!(backend.live_handles(), 0);
    assert!(session.reporter().is_empty());
}

#[test]
fn signature_mismatch_aborts_before_any_table_acquisition() {
    let backend = webcache_backend().with_signature(0);
    let err = Session::open(backend.clone(), Path::new("notanese.dat")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Signature);
    assert_eq!(backend.calls_for("file_get_table"), 0);
    assert_eq!(backend.live_handles(), 0);
}

//! Purpose: `esedump` CLI entry point: open an ESE file, extract records.
//! Role: Binary crate root; parses args, runs the extraction, prints results.
//! Invariants: A missing file or a signature mismatch exits 0 (negative
//! results, not failures); real failures map through `api::to_exit_code`.
//! Invariants: Diagnostics and the handle ledger are printed at end of run.
use std::io;
use std::path::PathBuf;

use clap::{Parser, ValueEnum, ValueHint};
use tracing_subscriber::EnvFilter;

use esedump::api::{
    AccessCountMode, Error, ErrorKind, ExtractOptions, Sink, ZeroTimePolicy, to_exit_code,
};

mod output;

use output::{JsonlSink, PrintSink};

#[derive(Parser)]
#[command(
    name = "esedump",
    version,
    about = "Extract records from ESE (Extensible Storage Engine) database files"
)]
struct Cli {
    #[arg(
        short = 'f',
        long,
        value_hint = ValueHint::FilePath,
        help = "ESE database file to read (e.g. WebCacheV01.dat)"
    )]
    file: PathBuf,

    #[arg(
        short = 't',
        long,
        default_value = esedump::api::DEFAULT_TABLE_FILTER,
        help = "Extract records only from tables whose name contains this substring"
    )]
    table: String,

    #[arg(
        short = 'i',
        long,
        help = "Print metadata for every table, not just the matching ones"
    )]
    info: bool,

    #[arg(
        long,
        value_enum,
        default_value = "table",
        help = "Output format for decoded records"
    )]
    format: OutputFormat,

    #[arg(
        long,
        help = "Populate AccessCount from the preceding 64-bit field (FileSize), matching legacy exports"
    )]
    legacy_access_count: bool,

    #[arg(long, help = "Render zero timestamps as absent instead of the 1601 epoch")]
    zero_time_absent: bool,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum OutputFormat {
    Table,
    Jsonl,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let exit_code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run(cli: Cli) -> Result<i32, Error> {
    if !cli.file.exists() {
        println!("file does not exist: {}", cli.file.display());
        return Ok(0);
    }

    let options = ExtractOptions {
        filter: cli.table.clone(),
        access_count: if cli.legacy_access_count {
            AccessCountMode::Legacy
        } else {
            AccessCountMode::Corrected
        },
        zero_time: if cli.zero_time_absent {
            ZeroTimePolicy::Absent
        } else {
            ZeroTimePolicy::Epoch
        },
        ..ExtractOptions::default()
    };

    let mut sink: Box<dyn Sink> = match cli.format {
        OutputFormat::Table => Box::new(PrintSink::new(io::stdout(), cli.info)),
        OutputFormat::Jsonl => Box::new(JsonlSink::new(io::stdout(), cli.info)),
    };

    extract(&cli, &options, sink.as_mut())
}

#[cfg(feature = "libesedb")]
fn extract(cli: &Cli, options: &ExtractOptions, sink: &mut dyn Sink) -> Result<i32, Error> {
    use esedump::api::{LibEsedb, Session, extract_file};

    let backend = LibEsedb::new();
    let mut session = match Session::open(backend, &cli.file) {
        Ok(session) => session,
        Err(err) if err.kind() == ErrorKind::Signature => {
            println!("{err}");
            return Ok(0);
        }
        Err(err) => return Err(err),
    };
    println!("libesedb version: {}", session.version());

    let result = extract_file(&session, options, sink);
    let close_result = session.close();

    let ledger = session.ledger();
    println!(
        "handles acquired: {}  released: {}{}",
        ledger.acquired(),
        ledger.released(),
        if ledger.balanced() { "" } else { "  (LEAK)" }
    );
    let diagnostics = session.reporter().len();
    if diagnostics > 0 {
        println!("reader diagnostics: {diagnostics} (see stderr)");
    }

    result?;
    close_result?;
    Ok(if ledger.balanced() { 0 } else { 1 })
}

#[cfg(not(feature = "libesedb"))]
fn extract(_cli: &Cli, _options: &ExtractOptions, _sink: &mut dyn Sink) -> Result<i32, Error> {
    Err(Error::new(ErrorKind::Usage)
        .with_message("this build has no reader backend; rebuild with `--features libesedb`"))
}

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use crate::common::{load_into, parse_single_selector, resolve_single_selector};
use crate::merge::load_options;
use wavemerge::preview::render_preview;
use wavemerge::session::Session;
use wavemerge::table::ColumnKind;

#[derive(Args, Debug)]
#[command(
    about = "Inspect wave datasets without merging",
    long_about = "Load each wave, print a preview of its first rows, then check that the identifier column exists in every file with a consistent type and report duplicate identifiers. Nothing is merged or written.\n\nExample:\n  wavemerge check wave1.csv wave2.xlsx -k pid --head 3"
)]
pub struct CheckArgs {
    /// Input files, one per wave ('-' for stdin)
    #[arg(value_name = "FILES", required = true)]
    pub files: Vec<PathBuf>,

    /// Identifier column (name or 1-based index into the first file)
    #[arg(short = 'k', long = "key", value_name = "COL", required = true)]
    pub key: String,

    /// Rows to preview per file
    #[arg(short = 'n', long = "head", value_name = "N", default_value_t = 5)]
    pub head: usize,

    /// Input delimiter for text files, overriding the extension
    #[arg(short = 'd', long = "delim", value_name = "CHAR")]
    pub delim: Option<String>,

    /// Comma-separated tokens read as missing values
    #[arg(long = "na", value_name = "TOKENS")]
    pub na: Option<String>,
}

pub fn run(args: CheckArgs) -> Result<()> {
    let options = load_options(args.delim.as_deref(), args.na.as_deref())?;
    let selector = parse_single_selector(&args.key)?;

    let mut session = Session::new(options);
    load_into(&mut session, &args.files)?;

    let headers = session
        .tables()
        .first()
        .map(|loaded| loaded.table.headers())
        .unwrap_or_default();
    let key = resolve_single_selector(&headers, selector)?;

    let stdout = io::stdout();
    let mut writer = stdout.lock();
    for (idx, loaded) in session.tables().iter().enumerate() {
        let kind = loaded
            .table
            .column(&key)
            .map(ColumnKind::of)
            .map(|kind| kind.label())
            .unwrap_or("missing");
        writeln!(
            writer,
            "[{}] {}: {} rows x {} columns, '{}' is {}",
            idx + 1,
            loaded.name,
            loaded.table.row_count(),
            loaded.table.width(),
            key,
            kind
        )?;
        render_preview(&mut writer, &loaded.table, args.head)?;
    }

    session.validate(&key)?;
    writeln!(writer, "identifier '{}' is valid across {} table(s)", key, session.tables().len())?;
    let diagnostics = session.duplicate_report(&key)?;
    if diagnostics.is_empty() {
        writeln!(writer, "no duplicate identifiers")?;
    }
    for diagnostic in diagnostics {
        writeln!(writer, "{}", diagnostic)?;
    }
    writer.flush()?;
    Ok(())
}

use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::{info, warn};

use crate::common::{
    load_into, open_output, parse_delimiter, parse_list, parse_single_selector,
    resolve_single_selector,
};
use wavemerge::export::write_delimited;
use wavemerge::join::JoinMode;
use wavemerge::load::LoadOptions;
use wavemerge::long::DEFAULT_WAVE_COLUMN;
use wavemerge::preprocess::FlagFilter;
use wavemerge::preview::render_preview;
use wavemerge::session::{MergeMode, MergeSettings, Session};
use wavemerge::table::Value;

#[derive(Args, Debug)]
#[command(
    about = "Merge wave datasets on a shared identifier",
    long_about = "Combine one dataset per wave into a single table keyed by an identifier column. Wide mode (default) joins the waves side by side and suffixes every non-identifier column with its wave label (e.g. score_w1, score_w2). Long mode stacks the waves, adds a wave column, and keeps only identifiers present in every wave. Duplicate identifiers inside a wave keep their first occurrence.\n\nExamples:\n  wavemerge merge wave1.csv wave2.csv -k pid\n  wavemerge merge w1.xlsx w2.xlsx w3.xlsx -k pid --mode long -o panel.csv\n  wavemerge merge a.tsv b.tsv -k 1 --join outer --waves baseline,followup"
)]
pub struct MergeArgs {
    /// Input files, one per wave, in wave order (csv, tsv, txt, xlsx, xls, ods; '-' for stdin)
    #[arg(value_name = "FILES", required = true)]
    pub files: Vec<PathBuf>,

    /// Identifier column shared by all waves (name or 1-based index into the first file)
    #[arg(short = 'k', long = "key", value_name = "COL", required = true)]
    pub key: String,

    /// Merge layout
    #[arg(short = 'm', long = "mode", value_enum, default_value_t = MergeMode::Wide)]
    pub mode: MergeMode,

    /// Join strategy for wide merges
    #[arg(short = 'j', long = "join", value_enum, default_value_t = JoinMode::Inner)]
    pub join: JoinMode,

    /// Comma-separated wave labels, one per file (defaults to w1,w2,...)
    #[arg(short = 'w', long = "waves", value_name = "LABELS")]
    pub waves: Option<String>,

    /// Name of the wave column added in long mode
    #[arg(long = "wave-column", value_name = "NAME", default_value = DEFAULT_WAVE_COLUMN)]
    pub wave_column: String,

    /// Replace missing cells with this value before merging
    #[arg(long = "fill", value_name = "VALUE")]
    pub fill: Option<String>,

    /// Keep only rows where both flag columns are truthy, e.g. 'consent,complete'
    #[arg(long = "require-flags", value_name = "A,B")]
    pub require_flags: Option<String>,

    /// Input delimiter for text files, overriding the extension (e.g. ';' or '\t')
    #[arg(short = 'd', long = "delim", value_name = "CHAR")]
    pub delim: Option<String>,

    /// Comma-separated tokens read as missing values (e.g. 'NA,N/A,-99')
    #[arg(long = "na", value_name = "TOKENS")]
    pub na: Option<String>,

    /// Output CSV path ('-' for stdout)
    #[arg(short = 'o', long = "output", value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Print the first N merged rows to stderr
    #[arg(long = "preview", value_name = "N")]
    pub preview: Option<usize>,
}

pub fn run(args: MergeArgs) -> Result<()> {
    let options = load_options(args.delim.as_deref(), args.na.as_deref())?;
    let settings_key = parse_single_selector(&args.key)?;

    let mut session = Session::new(options);
    load_into(&mut session, &args.files)?;

    let headers = session
        .tables()
        .first()
        .map(|loaded| loaded.table.headers())
        .unwrap_or_default();
    let key = resolve_single_selector(&headers, settings_key)?;

    let mut settings = MergeSettings::new(key);
    settings.mode = args.mode;
    settings.join = args.join;
    settings.waves = args.waves.as_deref().map(parse_list);
    settings.wave_column = args.wave_column;
    settings.fill = args.fill.as_deref().map(Value::infer);
    settings.flag_filter = args
        .require_flags
        .as_deref()
        .map(FlagFilter::parse)
        .transpose()?;

    let outcome = session.merge(&settings)?;
    for diagnostic in &outcome.diagnostics {
        warn!("{}", diagnostic);
    }
    info!(waves = %outcome.waves.join(","), "merged {} table(s)", outcome.waves.len());

    if let Some(limit) = args.preview {
        let mut stderr = io::stderr().lock();
        render_preview(&mut stderr, &outcome.table, limit)?;
    }

    let writer = open_output(args.output.as_deref())?;
    write_delimited(&outcome.table, writer, b',').context("failed writing merged table")
}

pub(crate) fn load_options(delim: Option<&str>, na: Option<&str>) -> Result<LoadOptions> {
    Ok(LoadOptions {
        delimiter: delim.map(parse_delimiter).transpose()?,
        na_values: na.map(parse_list).unwrap_or_default(),
    })
}

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::warn;

use wavemerge::load::Source;
use wavemerge::session::{LoadReport, Session};

/// An identifier column given by name or by 1-based position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnSelector {
    Index(usize),
    Name(String),
}

pub fn parse_single_selector(token: &str) -> Result<ColumnSelector> {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        bail!("column specification must not be empty");
    }
    if trimmed.contains(',') {
        bail!("column specification must reference exactly one column");
    }
    if let Ok(idx) = trimmed.parse::<usize>() {
        if idx == 0 {
            bail!("column indices use 1-based positions");
        }
        Ok(ColumnSelector::Index(idx - 1))
    } else {
        Ok(ColumnSelector::Name(trimmed.to_string()))
    }
}

/// Resolve a selector to a column name using `headers` (the first table's).
/// Names are returned as given; presence is the validator's job.
pub fn resolve_single_selector(headers: &[String], selector: ColumnSelector) -> Result<String> {
    match selector {
        ColumnSelector::Name(name) => Ok(name),
        ColumnSelector::Index(idx) => headers.get(idx).cloned().with_context(|| {
            format!(
                "column index {} out of range ({} columns)",
                idx + 1,
                headers.len()
            )
        }),
    }
}

pub fn parse_delimiter(spec: &str) -> Result<u8> {
    match spec {
        "\\t" | "tab" => return Ok(b'\t'),
        "" => bail!("delimiter must not be empty"),
        _ => {}
    }
    if spec.len() != 1 {
        bail!("delimiter must be a single ASCII character");
    }
    Ok(spec.as_bytes()[0])
}

/// Split a comma-separated list, trimming each entry and dropping empty ones.
pub fn parse_list(spec: &str) -> Vec<String> {
    spec.split(',')
        .map(|token| token.trim())
        .filter(|token| !token.is_empty())
        .map(|token| token.to_string())
        .collect()
}

/// Read every file into `session`, report per-file failures, and fail only
/// when nothing loaded.
pub fn load_into(session: &mut Session, files: &[PathBuf]) -> Result<LoadReport> {
    let mut sources = Vec::with_capacity(files.len());
    let mut read_failures = Vec::new();
    for path in files {
        match Source::read(path) {
            Ok(source) => sources.push(source),
            Err(err) => {
                warn!(source = err.source_name(), error = %err, "failed to read input");
                read_failures.push(err);
            }
        }
    }

    let mut report = session.load(sources);
    report.failures.splice(0..0, read_failures);
    if session.tables().is_empty() {
        bail!("no input file could be loaded");
    }
    Ok(report)
}

/// Buffered writer for `path`, or stdout when absent or `-`.
pub fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    match path {
        None => Ok(Box::new(BufWriter::new(io::stdout().lock()))),
        Some(path) if path == Path::new("-") => Ok(Box::new(BufWriter::new(io::stdout().lock()))),
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Box::new(BufWriter::new(file)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wavemerge::error::LoadError;
    use wavemerge::load::LoadOptions;

    #[test]
    fn parses_names_and_one_based_indices() {
        assert_eq!(
            parse_single_selector(" id ").unwrap(),
            ColumnSelector::Name("id".into())
        );
        assert_eq!(parse_single_selector("2").unwrap(), ColumnSelector::Index(1));
        assert!(parse_single_selector("0").is_err());
        assert!(parse_single_selector("a,b").is_err());
        assert!(parse_single_selector("").is_err());
    }

    #[test]
    fn resolves_index_against_headers() {
        let headers = vec!["pid".to_string(), "score".to_string()];
        assert_eq!(
            resolve_single_selector(&headers, ColumnSelector::Index(0)).unwrap(),
            "pid"
        );
        assert!(resolve_single_selector(&headers, ColumnSelector::Index(5)).is_err());
    }

    #[test]
    fn parses_delimiters() {
        assert_eq!(parse_delimiter(",").unwrap(), b',');
        assert_eq!(parse_delimiter("\\t").unwrap(), b'\t');
        assert_eq!(parse_delimiter("tab").unwrap(), b'\t');
        assert!(parse_delimiter("").is_err());
        assert!(parse_delimiter(";;").is_err());
    }

    #[test]
    fn unreadable_inputs_are_skipped_when_another_loads() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("w1.csv");
        std::fs::write(&good, "id,x\n1,2\n").unwrap();
        let missing = dir.path().join("w2.csv");

        let mut session = Session::new(LoadOptions::default());
        let report = load_into(&mut session, &[missing.clone(), good.clone()]).unwrap();
        assert_eq!(report.loaded, vec![good.display().to_string()]);
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(report.failures[0], LoadError::Io { .. }));
        assert_eq!(report.failures[0].source_name(), missing.display().to_string());
        assert_eq!(session.tables().len(), 1);
    }

    #[test]
    fn fails_when_nothing_loads() {
        let dir = tempfile::tempdir().unwrap();
        let broken = dir.path().join("w2.csv");
        std::fs::write(&broken, "").unwrap();
        let files = vec![dir.path().join("w1.csv"), broken];

        let mut session = Session::new(LoadOptions::default());
        let err = load_into(&mut session, &files).unwrap_err();
        assert!(err.to_string().contains("no input file could be loaded"));
        assert!(session.tables().is_empty());
    }

    #[test]
    fn splits_lists() {
        assert_eq!(parse_list("w1, w2 ,,w3"), vec!["w1", "w2", "w3"]);
    }
}

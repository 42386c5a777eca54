//! Parse named byte sources into [`Table`]s.

mod delimited;
mod excel;

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use crate::cache::Fingerprint;
use crate::error::LoadError;
use crate::table::{Table, Value};

pub use delimited::parse_delimited;
pub use excel::parse_workbook;

const STATISTICAL_FORMATS: &[&str] = &["sav", "zsav", "por", "dta", "sas7bdat", "xpt", "rds"];

/// A raw input: a display name (usually the path) plus its bytes.
#[derive(Debug, Clone)]
pub struct Source {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl Source {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Source {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a file, or stdin when `path` is `-`.
    pub fn read(path: &Path) -> Result<Self, LoadError> {
        let name = path.display().to_string();
        let mut bytes = Vec::new();
        let result = if path == Path::new("-") {
            io::stdin().lock().read_to_end(&mut bytes)
        } else {
            File::open(path).and_then(|mut file| file.read_to_end(&mut bytes))
        };
        result.map_err(|error| LoadError::Io {
            name: name.clone(),
            error,
        })?;
        Ok(Source { name, bytes })
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SourceFormat {
    Delimited(u8),
    Workbook,
}

/// Parse parameters shared by every source of a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadOptions {
    /// Overrides the delimiter implied by the file extension.
    pub delimiter: Option<u8>,
    /// Extra cell tokens read as null, besides blank cells.
    pub na_values: Vec<String>,
}

impl LoadOptions {
    /// Infer a typed value from untyped text, honouring NA tokens.
    pub fn cell(&self, raw: &str) -> Value {
        if self.is_na(raw) {
            return Value::Null;
        }
        Value::infer(raw)
    }

    pub fn is_na(&self, raw: &str) -> bool {
        let trimmed = raw.trim();
        self.na_values.iter().any(|na| na == trimmed)
    }

    pub(crate) fn fingerprint(&self, fp: &mut Fingerprint) {
        fp.opt_str(self.delimiter.map(|d| d as char).map(String::from).as_deref());
        for na in &self.na_values {
            fp.str(na);
        }
    }
}

/// Pick a parser from the source name's extension. Stdin (`-`) reads as CSV.
pub fn detect_format(name: &str, options: &LoadOptions) -> Result<SourceFormat, LoadError> {
    let extension = Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();

    let format = match extension.as_str() {
        "csv" => SourceFormat::Delimited(b','),
        "tsv" | "tab" | "txt" => SourceFormat::Delimited(b'\t'),
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => SourceFormat::Workbook,
        "" if name == "-" => SourceFormat::Delimited(b','),
        other if STATISTICAL_FORMATS.contains(&other) => {
            return Err(LoadError::UnsupportedFormat {
                name: name.to_string(),
                format: format!("{} (statistical package files must be exported to CSV first)", other),
            });
        }
        other => {
            return Err(LoadError::UnsupportedFormat {
                name: name.to_string(),
                format: if other.is_empty() {
                    "no extension".to_string()
                } else {
                    other.to_string()
                },
            });
        }
    };

    Ok(match (format, options.delimiter) {
        (SourceFormat::Delimited(_), Some(delimiter)) => SourceFormat::Delimited(delimiter),
        (format, _) => format,
    })
}

/// Parse one source into a table.
pub fn parse_source(source: &Source, options: &LoadOptions) -> Result<Table, LoadError> {
    match detect_format(&source.name, options)? {
        SourceFormat::Delimited(delimiter) => {
            parse_delimited(source.bytes.as_slice(), &source.name, delimiter, options)
        }
        SourceFormat::Workbook => parse_workbook(&source.bytes, &source.name, options),
    }
}

/// Trim header cells; every column needs a name.
fn normalize_headers(name: &str, raw: Vec<String>) -> Result<Vec<String>, LoadError> {
    let headers = raw
        .into_iter()
        .map(|header| header.trim().to_string())
        .collect::<Vec<_>>();
    if let Some(idx) = headers.iter().position(|h| h.is_empty()) {
        return Err(LoadError::parse(name, format!("column {} has an empty header", idx + 1)));
    }
    Ok(headers)
}

//! The merge session: owns loaded tables, settings, and caches, and sequences
//! validation, duplicate resolution, and the wide or long engine.

use std::collections::HashMap;
use std::fmt;

use clap::ValueEnum;
use tracing::{debug, info, warn};

use crate::cache::{ContentCache, Fingerprint};
use crate::dedup::{count_duplicates, resolve_duplicates};
use crate::error::{Diagnostic, LoadError, MergeError};
use crate::join::JoinMode;
use crate::load::{LoadOptions, Source, parse_source};
use crate::long::{DEFAULT_WAVE_COLUMN, merge_long};
use crate::preprocess::{FlagFilter, fill_nulls};
use crate::table::{Table, Value};
use crate::validate::validate_identifier;
use crate::wide::merge_wide;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Loaded,
    Validated,
    Merged,
}

/// Output shape of a merge.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, ValueEnum)]
pub enum MergeMode {
    /// One row per subject, columns suffixed per wave
    #[default]
    Wide,
    /// One row per subject per wave, stacked
    Long,
}

impl fmt::Display for MergeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergeMode::Wide => f.write_str("wide"),
            MergeMode::Long => f.write_str("long"),
        }
    }
}

/// Everything a merge depends on besides the tables themselves.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeSettings {
    pub key: String,
    pub mode: MergeMode,
    /// Only used in wide mode. Left/right results depend on table order.
    pub join: JoinMode,
    /// Explicit wave labels in table order; `None` numbers them `w1`, `w2`, ...
    pub waves: Option<Vec<String>>,
    pub wave_column: String,
    pub fill: Option<Value>,
    pub flag_filter: Option<FlagFilter>,
}

impl MergeSettings {
    pub fn new(key: impl Into<String>) -> Self {
        MergeSettings {
            key: key.into(),
            mode: MergeMode::Wide,
            join: JoinMode::Inner,
            waves: None,
            wave_column: DEFAULT_WAVE_COLUMN.to_string(),
            fill: None,
            flag_filter: None,
        }
    }

    fn fingerprint(&self, fp: &mut Fingerprint) {
        fp.str(&self.key)
            .str(&self.mode.to_string())
            .str(self.join.label())
            .str(&self.wave_column);
        match &self.waves {
            Some(waves) => {
                fp.str("explicit");
                for wave in waves {
                    fp.str(wave);
                }
            }
            None => {
                fp.str("auto");
            }
        }
        match &self.fill {
            Some(value) => fp.str("fill").value(value),
            None => fp.str("nofill"),
        };
        match &self.flag_filter {
            Some(filter) => fp.str("flags").str(&filter.first).str(&filter.second),
            None => fp.str("noflags"),
        };
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadedTable {
    pub name: String,
    pub table: Table,
}

#[derive(Debug, Default)]
pub struct LoadReport {
    pub loaded: Vec<String>,
    pub failures: Vec<LoadError>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub table: Table,
    pub waves: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Auto-numbered wave labels: `w1`, `w2`, ...
pub fn default_wave_labels(count: usize) -> Vec<String> {
    (1..=count).map(|idx| format!("w{}", idx)).collect()
}

/// Check explicit labels against the table count; reject empty or repeated ones.
pub fn resolve_wave_labels(
    waves: Option<&[String]>,
    table_count: usize,
) -> Result<Vec<String>, MergeError> {
    let Some(waves) = waves else {
        return Ok(default_wave_labels(table_count));
    };
    if waves.len() != table_count {
        return Err(MergeError::InvalidWaveLabels(format!(
            "{} label(s) given for {} table(s)",
            waves.len(),
            table_count
        )));
    }
    let mut seen: HashMap<&str, usize> = HashMap::new();
    for (idx, wave) in waves.iter().enumerate() {
        let label = wave.trim();
        if label.is_empty() {
            return Err(MergeError::InvalidWaveLabels(format!(
                "label for table {} is empty",
                idx + 1
            )));
        }
        if let Some(first) = seen.insert(label, idx + 1) {
            return Err(MergeError::DuplicateWaveLabel {
                label: label.to_string(),
                first,
                second: idx + 1,
            });
        }
    }
    Ok(waves.iter().map(|wave| wave.trim().to_string()).collect())
}

/// Single-owner merge session. Tables are kept in input order; that order
/// decides wave numbering and the outcome of left/right wide joins.
pub struct Session {
    state: SessionState,
    load_options: LoadOptions,
    tables: Vec<LoadedTable>,
    validated_key: Option<String>,
    parse_cache: ContentCache<Table>,
    merge_cache: ContentCache<MergeOutcome>,
}

impl Session {
    pub fn new(load_options: LoadOptions) -> Self {
        Session {
            state: SessionState::Idle,
            load_options,
            tables: Vec::new(),
            validated_key: None,
            parse_cache: ContentCache::new("parse"),
            merge_cache: ContentCache::new("merge"),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn tables(&self) -> &[LoadedTable] {
        &self.tables
    }

    pub fn validated_key(&self) -> Option<&str> {
        self.validated_key.as_deref()
    }

    /// Parse every source; failures are collected and the rest still load.
    pub fn load(&mut self, sources: Vec<Source>) -> LoadReport {
        let mut report = LoadReport::default();
        for source in sources {
            match self.parse_cached(&source) {
                Ok(table) => {
                    info!(
                        source = %source.name,
                        rows = table.row_count(),
                        columns = table.width(),
                        "loaded table"
                    );
                    report.loaded.push(source.name.clone());
                    self.add_table(source.name, table);
                }
                Err(err) => {
                    warn!(source = %source.name, error = %err, "failed to load table");
                    report.failures.push(err);
                }
            }
        }
        report
    }

    fn parse_cached(&mut self, source: &Source) -> Result<Table, LoadError> {
        let mut fp = Fingerprint::new("parse");
        fp.str(&source.name).bytes(&source.bytes);
        self.load_options.fingerprint(&mut fp);
        let options = &self.load_options;
        self.parse_cache
            .get_or_try_insert_with(fp.finish(), || parse_source(source, options))
    }

    /// Append an already parsed table. Any new input returns the session to `Loaded`.
    pub fn add_table(&mut self, name: impl Into<String>, table: Table) {
        self.tables.push(LoadedTable {
            name: name.into(),
            table,
        });
        self.validated_key = None;
        self.state = SessionState::Loaded;
    }

    /// Check the identifier against the loaded tables.
    pub fn validate(&mut self, key: &str) -> Result<(), MergeError> {
        if self.state == SessionState::Idle {
            return Err(MergeError::NoTables);
        }
        let result = validate_identifier(self.tables.iter().map(|loaded| &loaded.table), key);
        self.record_validation(key, result)
    }

    fn record_validation(
        &mut self,
        key: &str,
        result: Result<(), MergeError>,
    ) -> Result<(), MergeError> {
        match result {
            Ok(()) => {
                info!(key, tables = self.tables.len(), "identifier validated");
                self.validated_key = Some(key.to_string());
                self.state = SessionState::Validated;
                Ok(())
            }
            Err(err) => {
                warn!(key, error = %err, "identifier validation failed");
                self.validated_key = None;
                self.state = SessionState::Loaded;
                Err(err)
            }
        }
    }

    /// Report repeated identifiers per table without merging.
    pub fn duplicate_report(&self, key: &str) -> Result<Vec<Diagnostic>, MergeError> {
        count_duplicates(self.tables.iter().map(|loaded| &loaded.table), key)
    }

    /// Validate, de-duplicate, and merge the loaded tables.
    ///
    /// Identical tables and settings return the cached outcome. A validation
    /// failure leaves the session `Loaded`; an engine failure leaves it
    /// `Validated`. Either way the caller may retry with other settings.
    pub fn merge(&mut self, settings: &MergeSettings) -> Result<MergeOutcome, MergeError> {
        if self.state == SessionState::Idle || self.tables.is_empty() {
            return Err(MergeError::NoTables);
        }
        let waves = resolve_wave_labels(settings.waves.as_deref(), self.tables.len())?;

        let mut fp = Fingerprint::new("merge");
        for loaded in &self.tables {
            fp.table(&loaded.table);
        }
        settings.fingerprint(&mut fp);
        let cache_key = fp.finish();
        if let Some(outcome) = self.merge_cache.get(&cache_key) {
            self.validated_key = Some(settings.key.clone());
            self.state = SessionState::Merged;
            return Ok(outcome);
        }

        let prepared = self.prepare_tables(settings);
        let validated = validate_identifier(&prepared, &settings.key);
        self.record_validation(&settings.key, validated)?;

        let outcome = self.run_engine(prepared, settings, waves)?;
        for diagnostic in &outcome.diagnostics {
            debug!(%diagnostic, "merge diagnostic");
        }
        info!(
            mode = %settings.mode,
            rows = outcome.table.row_count(),
            columns = outcome.table.width(),
            "merge complete"
        );
        self.merge_cache.insert(cache_key, outcome.clone());
        self.state = SessionState::Merged;
        Ok(outcome)
    }

    fn prepare_tables(&self, settings: &MergeSettings) -> Vec<Table> {
        self.tables
            .iter()
            .map(|loaded| {
                let mut table = loaded.table.clone();
                if let Some(filter) = &settings.flag_filter {
                    table = filter.apply(table);
                }
                if let Some(fill) = &settings.fill {
                    table = fill_nulls(table, fill);
                }
                table
            })
            .collect()
    }

    fn run_engine(
        &self,
        tables: Vec<Table>,
        settings: &MergeSettings,
        waves: Vec<String>,
    ) -> Result<MergeOutcome, MergeError> {
        let (tables, mut diagnostics) = resolve_duplicates(tables, &settings.key)?;
        let table = match settings.mode {
            MergeMode::Wide => merge_wide(tables, &settings.key, &waves, settings.join)?,
            MergeMode::Long => {
                let merged = merge_long(tables, &settings.key, &waves, &settings.wave_column)?;
                diagnostics.extend(merged.mismatch);
                merged.table
            }
        };
        Ok(MergeOutcome {
            table,
            waves,
            diagnostics,
        })
    }

    /// Drop all tables and cached results.
    pub fn reset(&mut self) {
        self.tables.clear();
        self.validated_key = None;
        self.parse_cache.clear();
        self.merge_cache.clear();
        self.state = SessionState::Idle;
    }
}

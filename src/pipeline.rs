//! Weekly stats to training table: load, backfill, encode, roll up, write.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{info, warn};

use crate::columns::{
    TRACKED_STATS, WEEKLY_COLUMNS, WEEKLY_PREFIX, WEEKLY_REQUIRED_FIELDS, YEARLY_PREFIX,
};
use crate::encoding::add_team_features;
use crate::loader::{load_source, LoadError, SortOrder, SourceSpec};
use crate::observability::{env_value, parse_bool};
use crate::positions::{resolve_positions, BackfillError, PositionMap};
use crate::row::{RowError, StructuredRow, FEATURE_PREFIX};
use crate::timeline::{
    add_rolling_features, build_indices, default_rolling_windows, rolling_feature_names,
    RollingWindow, TimelineError,
};

pub const TABLE_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrepareConfig {
    pub data_dir: PathBuf,
    pub weekly_prefix: String,
    pub yearly_prefix: String,
    pub output_path: PathBuf,
    pub windows: Vec<RollingWindow>,
    pub write_manifest: bool,
}

impl Default for PrepareConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            weekly_prefix: WEEKLY_PREFIX.to_string(),
            yearly_prefix: YEARLY_PREFIX.to_string(),
            output_path: PathBuf::from("data/training_data.csv"),
            windows: default_rolling_windows(),
            write_manifest: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum PrepareError {
    #[error("invalid prepare config: {0}")]
    InvalidConfig(String),
    #[error("load stage failed: {0}")]
    Load(#[from] LoadError),
    #[error("backfill stage failed: {0}")]
    Backfill(#[from] BackfillError),
    #[error("encode stage failed: {0}")]
    Encode(#[source] RowError),
    #[error("rolling stage failed: {0}")]
    Rolling(#[from] TimelineError),
    #[error("write stage failed: no rows to write to {path}")]
    EmptyTable { path: PathBuf },
    #[error("write stage failed: row {row_index} has a different column layout than row 0")]
    SchemaMismatch { row_index: usize },
    #[error("write stage failed: I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("write stage failed: CSV error on {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("write stage failed: manifest encoding error: {0}")]
    Manifest(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaManifest {
    pub version: u32,
    pub fingerprint: String,
    pub columns: Vec<String>,
    pub feature_columns: usize,
    pub row_count: usize,
    pub generated_at_utc: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrepareReport {
    pub weekly_files: usize,
    pub rows: usize,
    pub known_positions: usize,
    pub columns: usize,
    pub feature_columns: usize,
    pub fingerprint: String,
    pub output_path: PathBuf,
    pub manifest_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrepareOutcome {
    Written(PrepareReport),
    /// Nothing to write; no output file was created.
    NoData { weekly_files: usize },
}

pub fn prepare_config_from_env() -> Result<PrepareConfig, PrepareError> {
    let mut config = PrepareConfig::default();

    if let Some(dir) = env_value("FPREP_DATA_DIR") {
        config.data_dir = PathBuf::from(dir);
        config.output_path = config.data_dir.join("training_data.csv");
    }
    if let Some(output) = env_value("FPREP_OUTPUT") {
        config.output_path = PathBuf::from(output);
    }
    if let Some(raw) = env_value("FPREP_WINDOWS") {
        config.windows = parse_windows(&raw)?;
    }
    if let Some(write_manifest) = env_value("FPREP_WRITE_MANIFEST").and_then(|raw| parse_bool(&raw))
    {
        config.write_manifest = write_manifest;
    }

    Ok(config)
}

/// Parses `Prev:1,Prev4:4`.
pub fn parse_windows(raw: &str) -> Result<Vec<RollingWindow>, PrepareError> {
    let mut windows = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (name, weeks) = part.split_once(':').ok_or_else(|| {
            PrepareError::InvalidConfig(format!("window '{part}' must look like Name:weeks"))
        })?;
        let weeks = weeks.trim().parse::<u32>().map_err(|_| {
            PrepareError::InvalidConfig(format!("window '{part}' has a non-integer size"))
        })?;
        windows.push(RollingWindow::new(name.trim(), weeks));
    }
    Ok(windows)
}

pub fn validate_config(cfg: &PrepareConfig) -> Result<(), PrepareError> {
    if cfg.weekly_prefix.is_empty() || cfg.yearly_prefix.is_empty() {
        return Err(PrepareError::InvalidConfig(
            "source prefixes must not be empty".to_string(),
        ));
    }

    if cfg.windows.is_empty() {
        return Err(PrepareError::InvalidConfig(
            "at least one rolling window is required".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for window in &cfg.windows {
        if window.name.is_empty() {
            return Err(PrepareError::InvalidConfig(
                "rolling window names must not be empty".to_string(),
            ));
        }
        if window.weeks == 0 {
            return Err(PrepareError::InvalidConfig(format!(
                "rolling window '{}' must cover at least one week",
                window.name
            )));
        }
        if !seen.insert(window.name.as_str()) {
            return Err(PrepareError::InvalidConfig(format!(
                "rolling window '{}' is defined twice",
                window.name
            )));
        }
    }

    // `Def_` on a window name can shadow another window's defense feature.
    let mut features = HashSet::new();
    for name in rolling_feature_names(&TRACKED_STATS, &cfg.windows) {
        if !features.insert(name.clone()) {
            return Err(PrepareError::InvalidConfig(format!(
                "rolling windows produce feature '{name}' twice"
            )));
        }
    }

    Ok(())
}

pub fn run_prepare(cfg: &PrepareConfig) -> Result<PrepareOutcome, PrepareError> {
    validate_config(cfg)?;

    info!(
        component = "pipeline",
        event = "prepare.run.start",
        data_dir = %cfg.data_dir.display(),
        output = %cfg.output_path.display(),
        windows = ?cfg.windows.iter().map(|w| w.weeks).collect::<Vec<_>>()
    );

    let spec = SourceSpec::new(&cfg.weekly_prefix, SortOrder::Ascending)
        .with_required_fields(&WEEKLY_REQUIRED_FIELDS)
        .with_cell_defaults(&WEEKLY_COLUMNS);
    let weekly = load_source(&cfg.data_dir, &spec)?;
    let weekly_files = weekly.files.len();

    if weekly.rows.is_empty() {
        warn!(
            component = "pipeline",
            event = "prepare.no_data",
            data_dir = %cfg.data_dir.display(),
            weekly_files
        );
        return Ok(PrepareOutcome::NoData { weekly_files });
    }

    let positions = resolve_positions(&cfg.data_dir, &cfg.yearly_prefix)?;
    let rows = build_training_rows(weekly.rows, &positions, &cfg.windows)?;

    let (written, table) = stage_table(&rows, &cfg.output_path)?;
    let manifest = if cfg.write_manifest {
        let path = manifest_path_for(&cfg.output_path);
        match stage_manifest(&path, &written) {
            Ok(staged) => Some(staged),
            Err(err) => {
                table.discard();
                return Err(err);
            }
        }
    } else {
        None
    };

    // Both files are fully written before either is moved into place.
    if let Err(err) = table.commit() {
        if let Some(staged) = &manifest {
            staged.discard();
        }
        return Err(err);
    }
    log_write_finish(&cfg.output_path, &written);
    let manifest_path = match manifest {
        Some(staged) => {
            staged.commit()?;
            Some(staged.dest)
        }
        None => None,
    };

    let report = PrepareReport {
        weekly_files,
        rows: written.row_count,
        known_positions: positions.len(),
        columns: written.columns.len(),
        feature_columns: written.feature_columns,
        fingerprint: written.fingerprint,
        output_path: cfg.output_path.clone(),
        manifest_path,
    };

    info!(
        component = "pipeline",
        event = "prepare.run.finish",
        weekly_files = report.weekly_files,
        rows = report.rows,
        columns = report.columns,
        feature_columns = report.feature_columns,
        fingerprint = %report.fingerprint
    );

    Ok(PrepareOutcome::Written(report))
}

/// Backfill, team encoding and rolling stats, in that order. Each stage takes
/// the rows and hands them on.
pub fn build_training_rows(
    rows: Vec<StructuredRow>,
    positions: &PositionMap,
    windows: &[RollingWindow],
) -> Result<Vec<StructuredRow>, PrepareError> {
    let rows = positions
        .apply_to(rows)
        .map_err(|err| PrepareError::Backfill(BackfillError::Row(err)))?;
    let rows = add_team_features(rows).map_err(PrepareError::Encode)?;
    let indices = build_indices(&rows, &TRACKED_STATS)?;
    let rows = add_rolling_features(rows, &indices, windows)?;
    Ok(rows)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenTable {
    pub columns: Vec<String>,
    pub feature_columns: usize,
    pub row_count: usize,
    pub fingerprint: String,
}

/// Writes `rows` to `path` through a temporary sibling file, so a failed
/// write never leaves a partial table behind. An empty row set is rejected.
pub fn write_table(rows: &[StructuredRow], path: &Path) -> Result<WrittenTable, PrepareError> {
    let (written, staged) = stage_table(rows, path)?;
    staged.commit()?;
    log_write_finish(path, &written);
    Ok(written)
}

/// A fully written temporary file waiting to be renamed onto `dest`.
struct StagedFile {
    tmp: PathBuf,
    dest: PathBuf,
}

impl StagedFile {
    fn commit(&self) -> Result<(), PrepareError> {
        fs::rename(&self.tmp, &self.dest).map_err(|source| {
            self.discard();
            PrepareError::Io {
                path: self.dest.clone(),
                source,
            }
        })
    }

    fn discard(&self) {
        let _ = fs::remove_file(&self.tmp);
    }
}

fn stage_table(
    rows: &[StructuredRow],
    path: &Path,
) -> Result<(WrittenTable, StagedFile), PrepareError> {
    let Some(first) = rows.first() else {
        return Err(PrepareError::EmptyTable {
            path: path.to_path_buf(),
        });
    };
    let columns = first.header();

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| PrepareError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let staged = StagedFile {
        tmp: tmp_path_for(path),
        dest: path.to_path_buf(),
    };
    if let Err(err) = write_rows(rows, &columns, &staged.tmp) {
        staged.discard();
        return Err(err);
    }

    let feature_columns = columns
        .iter()
        .filter(|c| c.starts_with(FEATURE_PREFIX))
        .count();
    let fingerprint = schema_fingerprint(&columns);

    Ok((
        WrittenTable {
            columns,
            feature_columns,
            row_count: rows.len(),
            fingerprint,
        },
        staged,
    ))
}

fn log_write_finish(path: &Path, written: &WrittenTable) {
    info!(
        component = "pipeline",
        event = "prepare.write.finish",
        path = %path.display(),
        rows = written.row_count,
        columns = written.columns.len(),
        feature_columns = written.feature_columns
    );
}

fn write_rows(rows: &[StructuredRow], header: &[String], path: &Path) -> Result<(), PrepareError> {
    let csv_err = |source| PrepareError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = csv::Writer::from_path(path).map_err(csv_err)?;
    writer.write_record(header).map_err(csv_err)?;
    for (row_index, row) in rows.iter().enumerate() {
        if row.header() != header {
            return Err(PrepareError::SchemaMismatch { row_index });
        }
        writer.write_record(row.values()).map_err(csv_err)?;
    }
    writer.flush().map_err(|source| PrepareError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

pub fn schema_fingerprint(columns: &[String]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("version:{TABLE_SCHEMA_VERSION};"));
    hasher.update("columns:");
    for column in columns {
        hasher.update(column.as_bytes());
        hasher.update(";");
    }
    hex::encode(hasher.finalize())
}

/// `training_data.csv` → `training_data.schema.json`.
pub fn manifest_path_for(output_path: &Path) -> PathBuf {
    output_path.with_extension("schema.json")
}

fn stage_manifest(path: &Path, written: &WrittenTable) -> Result<StagedFile, PrepareError> {
    let manifest = SchemaManifest {
        version: TABLE_SCHEMA_VERSION,
        fingerprint: written.fingerprint.clone(),
        columns: written.columns.clone(),
        feature_columns: written.feature_columns,
        row_count: written.row_count,
        generated_at_utc: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
    };
    let body = serde_json::to_vec_pretty(&manifest)?;
    let staged = StagedFile {
        tmp: tmp_path_for(path),
        dest: path.to_path_buf(),
    };
    if let Err(source) = fs::write(&staged.tmp, body) {
        staged.discard();
        return Err(PrepareError::Io {
            path: staged.tmp.clone(),
            source,
        });
    }
    Ok(staged)
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| "training_data.csv".to_string());
    path.with_file_name(format!("{file_name}.tmp"))
}

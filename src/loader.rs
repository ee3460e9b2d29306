//! Multi-source table loading.
//!
//! A source is every regular file in one directory whose name starts with a
//! given prefix. Files are read in lexicographic order (ascending or
//! descending), and each file is parsed against its own header, so files with
//! different column sets can be mixed in one load.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::columns::ColumnDefault;
use crate::row::{StructuredRow, TableSchema};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// What to load from a directory and how to check it.
#[derive(Debug, Clone, Copy)]
pub struct SourceSpec<'a> {
    pub prefix: &'a str,
    pub order: SortOrder,
    pub required_fields: &'a [&'a str],
    pub cell_defaults: &'a [ColumnDefault],
}

impl<'a> SourceSpec<'a> {
    pub fn new(prefix: &'a str, order: SortOrder) -> Self {
        Self {
            prefix,
            order,
            required_fields: &[],
            cell_defaults: &[],
        }
    }

    pub fn with_required_fields(mut self, required_fields: &'a [&'a str]) -> Self {
        self.required_fields = required_fields;
        self
    }

    pub fn with_cell_defaults(mut self, cell_defaults: &'a [ColumnDefault]) -> Self {
        self.cell_defaults = cell_defaults;
        self
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("source not found: {path}")]
    SourceNotFound { path: PathBuf },
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("CSV error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("{path} is missing required column '{column}'")]
    MissingColumn { path: PathBuf, column: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadedSource {
    pub files: Vec<PathBuf>,
    pub rows: Vec<StructuredRow>,
}

pub fn load_all(
    dir: &Path,
    prefix: &str,
    order: SortOrder,
) -> Result<Vec<StructuredRow>, LoadError> {
    load_source(dir, &SourceSpec::new(prefix, order)).map(|loaded| loaded.rows)
}

pub fn load_source(dir: &Path, spec: &SourceSpec<'_>) -> Result<LoadedSource, LoadError> {
    let files = list_source_files(dir, spec.prefix, spec.order)?;
    let mut rows = Vec::new();

    for path in &files {
        let before = rows.len();
        read_source_file(path, spec, &mut rows)?;
        debug!(
            component = "loader",
            event = "loader.file.read",
            path = %path.display(),
            rows = rows.len() - before
        );
    }

    info!(
        component = "loader",
        event = "loader.source.finish",
        dir = %dir.display(),
        prefix = spec.prefix,
        order = ?spec.order,
        files = files.len(),
        rows = rows.len()
    );

    Ok(LoadedSource { files, rows })
}

/// Regular files in `dir` whose name starts with `prefix`, sorted by name.
pub fn list_source_files(
    dir: &Path,
    prefix: &str,
    order: SortOrder,
) -> Result<Vec<PathBuf>, LoadError> {
    let entries = fs::read_dir(dir).map_err(|err| io_error(dir, err))?;

    let mut named = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| io_error(dir, err))?;
        let file_name = entry.file_name().to_string_lossy().to_string();
        if !file_name.starts_with(prefix) {
            continue;
        }
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        named.push((file_name, path));
    }

    named.sort_by(|a, b| a.0.cmp(&b.0));
    if order == SortOrder::Descending {
        named.reverse();
    }

    Ok(named.into_iter().map(|(_, path)| path).collect())
}

fn read_source_file(
    path: &Path,
    spec: &SourceSpec<'_>,
    rows: &mut Vec<StructuredRow>,
) -> Result<(), LoadError> {
    let file = fs::File::open(path).map_err(|err| io_error(path, err))?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(file);

    let headers = reader
        .headers()
        .map_err(|source| csv_error(path, source))?
        .clone();
    if headers.is_empty() {
        return Ok(());
    }

    let schema = Arc::new(TableSchema::new(headers.iter()));
    if let Some(column) = schema.first_missing(spec.required_fields) {
        return Err(LoadError::MissingColumn {
            path: path.to_path_buf(),
            column: column.to_string(),
        });
    }

    let defaults: Vec<(usize, &str)> = spec
        .cell_defaults
        .iter()
        .filter_map(|column| {
            let default = column.default?;
            schema.position(column.name).map(|idx| (idx, default))
        })
        .collect();

    for record in reader.records() {
        let record = record.map_err(|source| csv_error(path, source))?;
        let mut cells: Vec<String> = record.iter().map(str::to_string).collect();
        for (idx, default) in &defaults {
            if let Some(cell) = cells.get_mut(*idx) {
                if cell.is_empty() {
                    *cell = (*default).to_string();
                }
            }
        }
        rows.push(StructuredRow::new(Arc::clone(&schema), cells));
    }

    Ok(())
}

fn io_error(path: &Path, err: std::io::Error) -> LoadError {
    if err.kind() == ErrorKind::NotFound {
        LoadError::SourceNotFound {
            path: path.to_path_buf(),
        }
    } else {
        LoadError::Io {
            path: path.to_path_buf(),
            source: err,
        }
    }
}

fn csv_error(path: &Path, source: csv::Error) -> LoadError {
    LoadError::Csv {
        path: path.to_path_buf(),
        source,
    }
}

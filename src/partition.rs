//! Splits the prepared table for one position into a training set and a test
//! set (the requested year and week), and describes which columns the
//! training step consumes.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::columns::{FANTASY_POINTS, POSITION, WEEK, YEAR};
use crate::observability::env_value;
use crate::row::FEATURE_PREFIX;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionRequest {
    pub input_path: PathBuf,
    pub output_dir: PathBuf,
    pub position: String,
    pub year: String,
    pub week: String,
}

impl PartitionRequest {
    pub fn new(
        position: impl Into<String>,
        year: impl Into<String>,
        week: impl Into<String>,
    ) -> Self {
        Self {
            input_path: PathBuf::from("data/training_data.csv"),
            output_dir: PathBuf::from("output"),
            position: position.into(),
            year: year.into(),
            week: week.into(),
        }
    }

    /// `partitioned_2019_03_RB_training.csv` style file name.
    pub fn file_name(&self, training: bool) -> String {
        format!(
            "partitioned_{}_{}_{}_{}.csv",
            self.year,
            padded_week(&self.week),
            self.position,
            if training { "training" } else { "test" }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionReport {
    pub training_path: PathBuf,
    pub test_path: PathBuf,
    pub training_rows: usize,
    pub test_rows: usize,
    pub skipped_rows: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainingColumns {
    pub target: String,
    pub features: Vec<String>,
    pub ignored: Vec<String>,
}

#[derive(Debug, Error)]
pub enum PartitionError {
    #[error("invalid partition request: {0}")]
    InvalidRequest(String),
    #[error("source not found: {path}")]
    SourceNotFound { path: PathBuf },
    #[error("{path} is missing required column '{column}'")]
    MissingColumn { path: PathBuf, column: String },
    #[error("table has no target column 'Fantasy Points'")]
    MissingTarget,
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("CSV error on {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

pub fn partition_request_from_env() -> Result<PartitionRequest, PartitionError> {
    let required = |key: &str| -> Result<String, PartitionError> {
        env_value(key).ok_or_else(|| PartitionError::InvalidRequest(format!("{key} must be set")))
    };

    let mut req = PartitionRequest::new(
        required("FPREP_POSITION")?,
        required("FPREP_YEAR")?,
        required("FPREP_WEEK")?,
    );
    if let Some(input) = env_value("FPREP_INPUT") {
        req.input_path = PathBuf::from(input);
    }
    if let Some(dir) = env_value("FPREP_PARTITION_DIR") {
        req.output_dir = PathBuf::from(dir);
    }
    Ok(req)
}

/// Target column plus every `Feat:` column, in table order.
pub fn training_columns(header: &[String]) -> Result<TrainingColumns, PartitionError> {
    if !header.iter().any(|c| c == FANTASY_POINTS) {
        return Err(PartitionError::MissingTarget);
    }

    let (features, ignored): (Vec<String>, Vec<String>) = header
        .iter()
        .filter(|c| c.as_str() != FANTASY_POINTS)
        .cloned()
        .partition(|c| c.starts_with(FEATURE_PREFIX));

    Ok(TrainingColumns {
        target: FANTASY_POINTS.to_string(),
        features,
        ignored,
    })
}

/// Rows whose `Pos` differs from the request are dropped. Of the rest, rows
/// matching the requested year and week go to the test file and everything
/// else to the training file. Both files get the full header.
pub fn partition_training_table(req: &PartitionRequest) -> Result<PartitionReport, PartitionError> {
    if req.position.is_empty() || req.year.is_empty() || req.week.is_empty() {
        return Err(PartitionError::InvalidRequest(
            "position, year and week are required".to_string(),
        ));
    }

    let input = &req.input_path;
    let file = fs::File::open(input).map_err(|err| {
        if err.kind() == ErrorKind::NotFound {
            PartitionError::SourceNotFound {
                path: input.clone(),
            }
        } else {
            PartitionError::Io {
                path: input.clone(),
                source: err,
            }
        }
    })?;
    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(file);
    let header = reader
        .headers()
        .map_err(|source| csv_error(input, source))?
        .clone();

    let column = |name: &str| -> Result<usize, PartitionError> {
        header
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| PartitionError::MissingColumn {
                path: input.clone(),
                column: name.to_string(),
            })
    };
    let pos_idx = column(POSITION)?;
    let week_idx = column(WEEK)?;
    let year_idx = column(YEAR)?;

    fs::create_dir_all(&req.output_dir).map_err(|source| PartitionError::Io {
        path: req.output_dir.clone(),
        source,
    })?;
    let training_path = req.output_dir.join(req.file_name(true));
    let test_path = req.output_dir.join(req.file_name(false));

    let mut training = csv::Writer::from_path(&training_path)
        .map_err(|source| csv_error(&training_path, source))?;
    let mut test =
        csv::Writer::from_path(&test_path).map_err(|source| csv_error(&test_path, source))?;
    training
        .write_record(&header)
        .map_err(|source| csv_error(&training_path, source))?;
    test.write_record(&header)
        .map_err(|source| csv_error(&test_path, source))?;

    let mut report = PartitionReport {
        training_path: training_path.clone(),
        test_path: test_path.clone(),
        training_rows: 0,
        test_rows: 0,
        skipped_rows: 0,
    };

    for record in reader.records() {
        let record = record.map_err(|source| csv_error(input, source))?;
        if record.get(pos_idx) != Some(req.position.as_str()) {
            report.skipped_rows += 1;
            continue;
        }

        let is_test = record.get(week_idx) == Some(req.week.as_str())
            && record.get(year_idx) == Some(req.year.as_str());
        if is_test {
            test.write_record(&record)
                .map_err(|source| csv_error(&test_path, source))?;
            report.test_rows += 1;
        } else {
            training
                .write_record(&record)
                .map_err(|source| csv_error(&training_path, source))?;
            report.training_rows += 1;
        }
    }

    training.flush().map_err(|source| PartitionError::Io {
        path: training_path.clone(),
        source,
    })?;
    test.flush().map_err(|source| PartitionError::Io {
        path: test_path.clone(),
        source,
    })?;

    info!(
        component = "partition",
        event = "partition.finish",
        position = %req.position,
        year = %req.year,
        week = %req.week,
        training_rows = report.training_rows,
        test_rows = report.test_rows,
        skipped_rows = report.skipped_rows
    );

    Ok(report)
}

fn padded_week(week: &str) -> String {
    if week.len() == 1 {
        format!("0{week}")
    } else {
        week.to_string()
    }
}

fn csv_error(path: &Path, source: csv::Error) -> PartitionError {
    PartitionError::Csv {
        path: path.to_path_buf(),
        source,
    }
}

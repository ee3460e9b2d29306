//! Position backfill.
//!
//! Weekly records carry no position. Yearly summaries do, so positions are
//! merged from those, newest year first, and the first non-empty position
//! seen for a player wins.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::columns::{
    player_key, DATE, FANTASY_POSITION, NAME, POSITION, UNKNOWN_POSITION, YEAR,
    YEARLY_REQUIRED_FIELDS,
};
use crate::loader::{load_source, LoadError, SortOrder, SourceSpec};
use crate::row::{RowError, StructuredRow};

#[derive(Debug, Error)]
pub enum BackfillError {
    #[error("no yearly source files matching '{prefix}' in {dir}")]
    SourceNotFound { dir: PathBuf, prefix: String },
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Row(#[from] RowError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PositionMap {
    positions: HashMap<String, String>,
}

impl PositionMap {
    /// Builds the map from yearly rows that are already in precedence order
    /// (most recent year first).
    pub fn from_rows<'a, I>(rows: I) -> Result<Self, RowError>
    where
        I: IntoIterator<Item = &'a StructuredRow>,
    {
        let mut positions = HashMap::new();
        for row in rows {
            let position = row.get(FANTASY_POSITION)?;
            if position.is_empty() {
                continue;
            }
            positions
                .entry(player_key(row.get(NAME)?).to_string())
                .or_insert_with(|| position.to_string());
        }
        Ok(Self { positions })
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.positions.get(player_key(name)).map(String::as_str)
    }

    /// Adds `Pos` and then `Year` to every row.
    pub fn apply_to(&self, rows: Vec<StructuredRow>) -> Result<Vec<StructuredRow>, RowError> {
        let mut out = Vec::with_capacity(rows.len());
        let mut unknown = 0usize;

        for mut row in rows {
            let position = match self.get(row.get(NAME)?) {
                Some(position) => position.to_string(),
                None => {
                    unknown += 1;
                    UNKNOWN_POSITION.to_string()
                }
            };
            let year = year_from_date(row.get(DATE)?).to_string();
            row.add_field(POSITION, position)?;
            row.add_field(YEAR, year)?;
            out.push(row);
        }

        info!(
            component = "positions",
            event = "prepare.positions.applied",
            rows = out.len(),
            unknown_positions = unknown
        );

        Ok(out)
    }
}

pub fn resolve_positions(dir: &Path, prefix: &str) -> Result<PositionMap, BackfillError> {
    let spec = SourceSpec::new(prefix, SortOrder::Descending)
        .with_required_fields(&YEARLY_REQUIRED_FIELDS);
    let loaded = load_source(dir, &spec)?;
    if loaded.files.is_empty() {
        return Err(BackfillError::SourceNotFound {
            dir: dir.to_path_buf(),
            prefix: prefix.to_string(),
        });
    }

    let map = PositionMap::from_rows(&loaded.rows)?;
    info!(
        component = "positions",
        event = "prepare.positions.resolved",
        yearly_files = loaded.files.len(),
        yearly_rows = loaded.rows.len(),
        players = map.len()
    );
    Ok(map)
}

/// Portion of a `YYYY-MM-DD` date before the first `-`. Not validated.
pub fn year_from_date(date: &str) -> &str {
    date.split('-').next().unwrap_or(date)
}

//! Temporal indices and backward-looking rolling averages.
//!
//! Two indices are built from the full weekly row set before any query runs:
//! one keyed by player, where the last row for a (player, year, week) wins,
//! and one keyed by opponent, where every row facing that opponent in a week
//! is summed into what the defense allowed. Rolling averages then look at the
//! N weeks strictly before a row's own week.

use std::collections::HashMap;

use thiserror::Error;
use tracing::info;

use crate::columns::{NAME, OPPONENT, WEEK, YEAR};
use crate::row::{RowError, StructuredRow};

/// Season length used when stepping back across a year boundary. Real
/// schedules vary; week 0 always wraps to this week of the prior year.
pub const SEASON_LENGTH_WEEKS: i32 = 16;

pub const DEFENSE_FEATURE_PREFIX: &str = "Def_";

#[derive(Debug, Error)]
pub enum TimelineError {
    #[error(transparent)]
    Row(#[from] RowError),
    #[error("invalid integer in field '{field}': '{value}' (row {row_index})")]
    InvalidNumber {
        field: String,
        value: String,
        row_index: usize,
    },
    #[error("stat '{field}' overflows for {entity} in {year} week {week}")]
    Overflow {
        field: String,
        entity: String,
        year: i32,
        week: i32,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollingWindow {
    pub name: String,
    pub weeks: u32,
}

impl RollingWindow {
    pub fn new(name: impl Into<String>, weeks: u32) -> Self {
        Self {
            name: name.into(),
            weeks,
        }
    }

    pub fn player_feature(&self, stat: &str) -> String {
        format!("{}_{}", self.name, stat)
    }

    pub fn defense_feature(&self, stat: &str) -> String {
        format!("{DEFENSE_FEATURE_PREFIX}{}_{}", self.name, stat)
    }
}

pub fn default_rolling_windows() -> Vec<RollingWindow> {
    vec![
        RollingWindow::new("Prev", 1),
        RollingWindow::new("Prev4", 4),
        RollingWindow::new("Prev8", 8),
    ]
}

/// How a second record for the same (entity, year, week) is merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePolicy {
    Overwrite,
    Accumulate,
}

/// `entity → (year, week) → stat values`, with stat values stored in the
/// order of `stats`. A present (entity, year, week) always has every stat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineIndex {
    stats: Vec<String>,
    policy: MergePolicy,
    entries: HashMap<String, HashMap<(i32, i32), Vec<i64>>>,
}

impl TimelineIndex {
    pub fn new<S: AsRef<str>>(stats: &[S], policy: MergePolicy) -> Self {
        Self {
            stats: stats.iter().map(|s| s.as_ref().to_string()).collect(),
            policy,
            entries: HashMap::new(),
        }
    }

    pub fn stats(&self) -> &[String] {
        &self.stats
    }

    pub fn policy(&self) -> MergePolicy {
        self.policy
    }

    pub fn stat_position(&self, stat: &str) -> Option<usize> {
        self.stats.iter().position(|s| s == stat)
    }

    pub fn entity_count(&self) -> usize {
        self.entries.len()
    }

    /// Number of populated (entity, year, week) slots.
    pub fn slot_count(&self) -> usize {
        self.entries.values().map(HashMap::len).sum()
    }

    /// Records one row's stat values. `values` must follow `stats()` order;
    /// missing trailing values count as zero. An accumulated sum that leaves
    /// the `i64` range is an error and leaves the slot unchanged.
    pub fn record(
        &mut self,
        entity: &str,
        year: i32,
        week: i32,
        values: &[i64],
    ) -> Result<(), TimelineError> {
        let width = self.stats.len();
        let slot = self
            .entries
            .entry(entity.to_string())
            .or_default()
            .entry((year, week))
            .or_insert_with(|| vec![0; width]);

        let mut merged = Vec::with_capacity(width);
        for (idx, current) in slot.iter().enumerate() {
            let value = values.get(idx).copied().unwrap_or(0);
            let next = match self.policy {
                MergePolicy::Overwrite => Some(value),
                MergePolicy::Accumulate => current.checked_add(value),
            };
            match next {
                Some(next) => merged.push(next),
                None => {
                    return Err(TimelineError::Overflow {
                        field: self.stats[idx].clone(),
                        entity: entity.to_string(),
                        year,
                        week,
                    })
                }
            }
        }
        *slot = merged;
        Ok(())
    }

    pub fn value_at(&self, entity: &str, year: i32, week: i32, stat_idx: usize) -> Option<i64> {
        self.entries
            .get(entity)?
            .get(&(year, week))?
            .get(stat_idx)
            .copied()
    }

    pub fn value(&self, entity: &str, year: i32, week: i32, stat: &str) -> Option<i64> {
        self.value_at(entity, year, week, self.stat_position(stat)?)
    }

    /// Mean of `stat` over the `window` weeks before (year, week), counting
    /// only weeks with data. `0.0` when none of them has data or the stat is
    /// not tracked.
    pub fn rolling_average(
        &self,
        entity: &str,
        year: i32,
        week: i32,
        stat: &str,
        window: u32,
    ) -> f64 {
        match self.stat_position(stat) {
            Some(stat_idx) => self.rolling_average_at(entity, year, week, stat_idx, window),
            None => 0.0,
        }
    }

    pub fn rolling_average_at(
        &self,
        entity: &str,
        year: i32,
        week: i32,
        stat_idx: usize,
        window: u32,
    ) -> f64 {
        let Some(weeks) = self.entries.get(entity) else {
            return 0.0;
        };

        let mut total = 0i128;
        let mut samples = 0u32;
        let (mut y, mut w) = (year, week);
        for _ in 0..window {
            (y, w) = previous_week(y, w);
            if let Some(value) = weeks.get(&(y, w)).and_then(|values| values.get(stat_idx)) {
                total += i128::from(*value);
                samples += 1;
            }
        }

        if samples == 0 {
            0.0
        } else {
            total as f64 / samples as f64
        }
    }
}

pub fn previous_week(year: i32, week: i32) -> (i32, i32) {
    if week <= 1 {
        (year.saturating_sub(1), SEASON_LENGTH_WEEKS)
    } else {
        (year, week - 1)
    }
}

/// The (year, week) slots a rolling query of size `window` inspects, most
/// recent first.
pub fn window_weeks(year: i32, week: i32, window: u32) -> Vec<(i32, i32)> {
    let mut out = Vec::with_capacity(window as usize);
    let mut cursor = (year, week);
    for _ in 0..window {
        cursor = previous_week(cursor.0, cursor.1);
        out.push(cursor);
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineIndices {
    pub players: TimelineIndex,
    pub opponents: TimelineIndex,
}

pub fn build_indices<S: AsRef<str>>(
    rows: &[StructuredRow],
    stats: &[S],
) -> Result<TimelineIndices, TimelineError> {
    let mut players = TimelineIndex::new(stats, MergePolicy::Overwrite);
    let mut opponents = TimelineIndex::new(stats, MergePolicy::Accumulate);
    let mut values = Vec::with_capacity(stats.len());

    for (row_index, row) in rows.iter().enumerate() {
        let year = parse_int_field(row, YEAR, row_index)?;
        let week = parse_int_field(row, WEEK, row_index)?;

        values.clear();
        for stat in stats {
            values.push(parse_stat_field(row, stat.as_ref(), row_index)?);
        }

        players.record(row.get(NAME)?, year, week, &values)?;
        opponents.record(row.get(OPPONENT)?, year, week, &values)?;
    }

    info!(
        component = "timeline",
        event = "prepare.timeline.built",
        rows = rows.len(),
        players = players.entity_count(),
        player_weeks = players.slot_count(),
        opponents = opponents.entity_count(),
        opponent_weeks = opponents.slot_count()
    );

    Ok(TimelineIndices { players, opponents })
}

/// Feature names in emission order: stats outer, windows inner, player
/// before defense.
pub fn rolling_feature_names<S: AsRef<str>>(stats: &[S], windows: &[RollingWindow]) -> Vec<String> {
    let mut names = Vec::with_capacity(stats.len() * windows.len() * 2);
    for stat in stats {
        for window in windows {
            names.push(window.player_feature(stat.as_ref()));
            names.push(window.defense_feature(stat.as_ref()));
        }
    }
    names
}

/// Appends player and defense rolling averages to every row. The indices
/// must already hold the complete row set.
pub fn add_rolling_features(
    rows: Vec<StructuredRow>,
    indices: &TimelineIndices,
    windows: &[RollingWindow],
) -> Result<Vec<StructuredRow>, TimelineError> {
    let stats = indices.players.stats();
    let plan: Vec<(usize, &RollingWindow, String, String)> = stats
        .iter()
        .enumerate()
        .flat_map(|(stat_idx, stat)| {
            windows.iter().map(move |window| {
                (
                    stat_idx,
                    window,
                    window.player_feature(stat),
                    window.defense_feature(stat),
                )
            })
        })
        .collect();
    let mut out = Vec::with_capacity(rows.len());

    for (row_index, mut row) in rows.into_iter().enumerate() {
        let year = parse_int_field(&row, YEAR, row_index)?;
        let week = parse_int_field(&row, WEEK, row_index)?;
        let player = row.get(NAME)?.to_string();
        let opponent = row.get(OPPONENT)?.to_string();

        for (stat_idx, window, own_name, def_name) in &plan {
            let own = indices
                .players
                .rolling_average_at(&player, year, week, *stat_idx, window.weeks);
            let allowed = indices
                .opponents
                .rolling_average_at(&opponent, year, week, *stat_idx, window.weeks);
            row.add_feature(own_name.as_str(), own)?;
            row.add_feature(def_name.as_str(), allowed)?;
        }
        out.push(row);
    }

    info!(
        component = "timeline",
        event = "prepare.features.rolling",
        rows = out.len(),
        windows = ?windows.iter().map(|w| w.weeks).collect::<Vec<_>>(),
        features_per_row = plan.len() * 2
    );

    Ok(out)
}

fn parse_int_field(
    row: &StructuredRow,
    field: &str,
    row_index: usize,
) -> Result<i32, TimelineError> {
    let raw = row.get(field)?;
    raw.trim()
        .parse::<i32>()
        .map_err(|_| TimelineError::InvalidNumber {
            field: field.to_string(),
            value: raw.to_string(),
            row_index,
        })
}

/// Empty stat cells count as zero, matching the weekly default-value table.
fn parse_stat_field(
    row: &StructuredRow,
    field: &str,
    row_index: usize,
) -> Result<i64, TimelineError> {
    let raw = row.get(field)?.trim();
    if raw.is_empty() {
        return Ok(0);
    }
    raw.parse::<i64>().map_err(|_| TimelineError::InvalidNumber {
        field: field.to_string(),
        value: raw.to_string(),
        row_index,
    })
}

//! Fantasy football training-table preparation.
//!
//! Current implemented scope:
//! - multi-source weekly/yearly CSV loading with per-file headers
//! - position and year backfill from yearly summaries
//! - one-hot team encodings and game-context flags
//! - player and opponent rolling averages over a (year, week) timeline
//! - table writing with a schema manifest, and position/week partitioning

mod columns;
mod encoding;
mod loader;
mod observability;
mod partition;
mod pipeline;
mod positions;
mod row;
mod timeline;

pub use columns::{
    player_key, weekly_file_name, yearly_file_name, ColumnDefault, AWAY_MARKER, FANTASY_POINTS,
    FANTASY_POSITION, NAME_SUFFIX_SEPARATOR, TRACKED_STATS, UNKNOWN_POSITION, WEEKLY_COLUMNS,
    WEEKLY_PREFIX, WEEKLY_REQUIRED_FIELDS, YEARLY_PREFIX, YEARLY_REQUIRED_FIELDS,
};
pub use encoding::{
    add_team_features, collect_team_codes, team_feature_names, HOME_GAME_FEATURE,
    OPPONENT_FEATURE_PREFIX, SUNDAY_GAME_FEATURE, TEAM_FEATURE_PREFIX,
};
pub use loader::{
    list_source_files, load_all, load_source, LoadError, LoadedSource, SortOrder, SourceSpec,
};
pub use observability::{
    init_logging, log_app_start, log_data_source, logging_config_from_env, LogFormat,
    LoggingConfig, LoggingInitError,
};
pub use partition::{
    partition_request_from_env, partition_training_table, training_columns, PartitionError,
    PartitionReport, PartitionRequest, TrainingColumns,
};
pub use pipeline::{
    build_training_rows, manifest_path_for, parse_windows, prepare_config_from_env, run_prepare,
    schema_fingerprint, validate_config, write_table, PrepareConfig, PrepareError,
    PrepareOutcome, PrepareReport, SchemaManifest, WrittenTable, TABLE_SCHEMA_VERSION,
};
pub use positions::{resolve_positions, year_from_date, BackfillError, PositionMap};
pub use row::{render_feature_value, RowError, StructuredRow, TableSchema, FEATURE_PREFIX};
pub use timeline::{
    add_rolling_features, build_indices, default_rolling_windows, previous_week,
    rolling_feature_names, window_weeks, MergePolicy, RollingWindow, TimelineError,
    TimelineIndex, TimelineIndices, DEFENSE_FEATURE_PREFIX, SEASON_LENGTH_WEEKS,
};

//! One-hot team encodings and game-context flags.

use std::collections::BTreeSet;

use tracing::info;

use crate::columns::{AWAY_MARKER, DAY, OPPONENT, SUNDAY, TEAM, VENUE};
use crate::row::{RowError, StructuredRow};

pub const TEAM_FEATURE_PREFIX: &str = "Team_";
pub const OPPONENT_FEATURE_PREFIX: &str = "Opp_";
pub const HOME_GAME_FEATURE: &str = "Is_Home_Game";
pub const SUNDAY_GAME_FEATURE: &str = "Is_Sunday_Game";

/// Every team code seen as either `Team` or `Opp`, sorted.
pub fn collect_team_codes(rows: &[StructuredRow]) -> Result<Vec<String>, RowError> {
    let mut teams = BTreeSet::new();
    for row in rows {
        teams.insert(row.get(TEAM)?.to_string());
        teams.insert(row.get(OPPONENT)?.to_string());
    }
    Ok(teams.into_iter().collect())
}

pub fn team_feature_names(teams: &[String]) -> Vec<String> {
    let mut names = Vec::with_capacity(teams.len() * 2 + 2);
    for team in teams {
        names.push(format!("{TEAM_FEATURE_PREFIX}{team}"));
        names.push(format!("{OPPONENT_FEATURE_PREFIX}{team}"));
    }
    names.push(HOME_GAME_FEATURE.to_string());
    names.push(SUNDAY_GAME_FEATURE.to_string());
    names
}

/// Appends `Team_X`/`Opp_X` for every known team, then the home and Sunday
/// flags.
pub fn add_team_features(rows: Vec<StructuredRow>) -> Result<Vec<StructuredRow>, RowError> {
    let teams = collect_team_codes(&rows)?;
    let names: Vec<(String, String)> = teams
        .iter()
        .map(|team| {
            (
                format!("{TEAM_FEATURE_PREFIX}{team}"),
                format!("{OPPONENT_FEATURE_PREFIX}{team}"),
            )
        })
        .collect();

    let mut out = Vec::with_capacity(rows.len());
    for mut row in rows {
        let team = row.get(TEAM)?.to_string();
        let opponent = row.get(OPPONENT)?.to_string();
        let is_home = row.get(VENUE)? != AWAY_MARKER;
        let is_sunday = row.get(DAY)? == SUNDAY;

        for (code, (team_name, opp_name)) in teams.iter().zip(&names) {
            row.add_flag(team_name.as_str(), *code == team)?;
            row.add_flag(opp_name.as_str(), *code == opponent)?;
        }
        row.add_flag(HOME_GAME_FEATURE, is_home)?;
        row.add_flag(SUNDAY_GAME_FEATURE, is_sunday)?;
        out.push(row);
    }

    info!(
        component = "encoding",
        event = "prepare.features.teams",
        rows = out.len(),
        teams = teams.len(),
        features_per_row = teams.len() * 2 + 2
    );

    Ok(out)
}

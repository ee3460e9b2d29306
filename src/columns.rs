//! Column vocabulary shared by the weekly scraper output, the pipeline and the
//! training consumer.

pub const WEEKLY_PREFIX: &str = "player_stats_";
pub const YEARLY_PREFIX: &str = "yearly_stats_";

pub const NAME: &str = "Name";
pub const DATE: &str = "Date";
pub const TEAM: &str = "Team";
pub const VENUE: &str = "At";
pub const OPPONENT: &str = "Opp";
pub const WEEK: &str = "Week";
pub const DAY: &str = "Day";
pub const POSITION: &str = "Pos";
pub const YEAR: &str = "Year";
pub const FANTASY_POSITION: &str = "FantPos";
pub const FANTASY_POINTS: &str = "Fantasy Points";

pub const UNKNOWN_POSITION: &str = "Unknown";
pub const AWAY_MARKER: &str = "@";
pub const SUNDAY: &str = "Sun";

/// Yearly summary names look like `Tom Brady\BradTo00`; only the part before
/// this character identifies the player.
pub const NAME_SUFFIX_SEPARATOR: char = '\\';

/// One column of the weekly source files and the value an empty cell takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDefault {
    pub name: &'static str,
    pub default: Option<&'static str>,
}

const fn text(name: &'static str) -> ColumnDefault {
    ColumnDefault {
        name,
        default: None,
    }
}

const fn numeric(name: &'static str) -> ColumnDefault {
    ColumnDefault {
        name,
        default: Some("0"),
    }
}

/// Weekly file columns in scraper order.
pub const WEEKLY_COLUMNS: [ColumnDefault; 27] = [
    text("Name"),
    text("Age"),
    text("Date"),
    text("Team"),
    text("At"),
    text("Opp"),
    text("Result"),
    text("Game Number"),
    text("Week"),
    text("Day"),
    numeric("Passing Cmp"),
    numeric("Passing Att"),
    numeric("Passing Completion Percentage"),
    numeric("Passing Yards"),
    numeric("Passing TD"),
    numeric("Passing Int"),
    numeric("Passing Sack"),
    numeric("Fantasy Points"),
    numeric("Rushing Att"),
    numeric("Rushing Yards"),
    numeric("Rushing TD"),
    numeric("Recv Rec"),
    numeric("Recv Yards"),
    numeric("Recv TD"),
    numeric("Fumb"),
    numeric("Extra Points"),
    numeric("Extra Points Att"),
];

/// Stats that get rolling player and opponent averages, in emission order.
pub const TRACKED_STATS: [&str; 15] = [
    "Passing Cmp",
    "Passing Att",
    "Passing Yards",
    "Passing TD",
    "Passing Int",
    "Passing Sack",
    "Rushing Att",
    "Rushing Yards",
    "Rushing TD",
    "Recv Rec",
    "Recv Yards",
    "Recv TD",
    "Fumb",
    "Extra Points",
    "Extra Points Att",
];

/// Fields every weekly file must carry for the pipeline to run.
pub const WEEKLY_REQUIRED_FIELDS: [&str; 22] = [
    NAME,
    DATE,
    TEAM,
    VENUE,
    OPPONENT,
    WEEK,
    DAY,
    "Passing Cmp",
    "Passing Att",
    "Passing Yards",
    "Passing TD",
    "Passing Int",
    "Passing Sack",
    "Rushing Att",
    "Rushing Yards",
    "Rushing TD",
    "Recv Rec",
    "Recv Yards",
    "Recv TD",
    "Fumb",
    "Extra Points",
    "Extra Points Att",
];

pub const YEARLY_REQUIRED_FIELDS: [&str; 2] = [NAME, FANTASY_POSITION];

pub fn weekly_file_name(year: i32, week: u32) -> String {
    format!("{WEEKLY_PREFIX}{year}_{week:02}.csv")
}

pub fn yearly_file_name(year: i32) -> String {
    format!("{YEARLY_PREFIX}{year}.csv")
}

/// Player key with any disambiguation suffix removed.
pub fn player_key(name: &str) -> &str {
    name.split(NAME_SUFFIX_SEPARATOR).next().unwrap_or(name)
}

#![allow(dead_code)]

use std::fs;
use std::path::Path;

use fantasy_prep::{weekly_file_name, yearly_file_name, WEEKLY_COLUMNS};

#[derive(Debug, Clone)]
pub struct Game {
    pub name: &'static str,
    pub date: &'static str,
    pub team: &'static str,
    pub at: &'static str,
    pub opp: &'static str,
    pub week: u32,
    pub day: &'static str,
    pub stats: Vec<(&'static str, &'static str)>,
}

impl Game {
    pub fn new(
        name: &'static str,
        date: &'static str,
        team: &'static str,
        at: &'static str,
        opp: &'static str,
        week: u32,
        day: &'static str,
    ) -> Self {
        Self {
            name,
            date,
            team,
            at,
            opp,
            week,
            day,
            stats: Vec::new(),
        }
    }

    pub fn stat(mut self, name: &'static str, value: &'static str) -> Self {
        self.stats.push((name, value));
        self
    }

    fn cells(&self) -> Vec<String> {
        WEEKLY_COLUMNS
            .iter()
            .map(|column| match column.name {
                "Name" => self.name.to_string(),
                "Age" => "27.100".to_string(),
                "Date" => self.date.to_string(),
                "Team" => self.team.to_string(),
                "At" => self.at.to_string(),
                "Opp" => self.opp.to_string(),
                "Result" => "W 20-17".to_string(),
                "Game Number" => self.week.to_string(),
                "Week" => self.week.to_string(),
                "Day" => self.day.to_string(),
                stat => self
                    .stats
                    .iter()
                    .find(|(name, _)| *name == stat)
                    .map(|(_, value)| value.to_string())
                    .unwrap_or_default(),
            })
            .collect()
    }
}

pub fn write_weekly(dir: &Path, year: i32, week: u32, games: &[Game]) {
    let path = dir.join(weekly_file_name(year, week));
    let mut writer = csv::Writer::from_path(&path).expect("weekly fixture should be writable");
    writer
        .write_record(WEEKLY_COLUMNS.iter().map(|c| c.name))
        .expect("header should be written");
    for game in games {
        writer
            .write_record(game.cells())
            .expect("row should be written");
    }
    writer.flush().expect("weekly fixture should flush");
}

pub fn write_yearly(dir: &Path, year: i32, players: &[(&str, &str)]) {
    let path = dir.join(yearly_file_name(year));
    let mut writer = csv::Writer::from_path(&path).expect("yearly fixture should be writable");
    writer
        .write_record(["Rk", "Name", "Tm", "FantPos"])
        .expect("header should be written");
    for (idx, (name, pos)) in players.iter().enumerate() {
        let rank = (idx + 1).to_string();
        writer
            .write_record([rank.as_str(), *name, "UNK", *pos])
            .expect("row should be written");
    }
    writer.flush().expect("yearly fixture should flush");
}

/// Two weeks of 2019 games plus 2018/2019 yearly summaries.
pub fn seed_season(dir: &Path) {
    write_yearly(
        dir,
        2018,
        &[
            ("Alpha QB\\AlphQB00", "QB"),
            ("Xavier\\XaviWR00", "WR"),
            ("Bravo RB\\BravRB00", "RB"),
        ],
    );
    write_yearly(
        dir,
        2019,
        &[("Xavier\\XaviRB00", "RB"), ("Bravo RB\\BravRB00", "")],
    );

    write_weekly(
        dir,
        2019,
        1,
        &[
            Game::new("Alpha QB", "2019-09-08", "NWE", "", "PIT", 1, "Sun")
                .stat("Passing Yards", "300")
                .stat("Passing TD", "3"),
            Game::new("Xavier", "2019-09-08", "PIT", "@", "NWE", 1, "Sun")
                .stat("Rushing Yards", "50"),
            Game::new("Zulu", "2019-09-08", "NWE", "", "PIT", 1, "Sun")
                .stat("Recv Yards", "40")
                .stat("Recv Rec", "4"),
        ],
    );
    write_weekly(
        dir,
        2019,
        2,
        &[
            Game::new("Alpha QB", "2019-09-15", "NWE", "@", "MIA", 2, "Sun")
                .stat("Passing Yards", "200")
                .stat("Passing TD", "1"),
            Game::new("Xavier", "2019-09-15", "PIT", "", "SEA", 2, "Sun")
                .stat("Rushing Yards", "70"),
            Game::new("Zulu", "2019-09-12", "NWE", "@", "MIA", 2, "Thu")
                .stat("Recv Yards", "60"),
            Game::new("Yankee", "2019-09-15", "SEA", "@", "PIT", 2, "Sun")
                .stat("Recv Yards", "10"),
        ],
    );
}

pub struct Table {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn read(path: &Path) -> Self {
        let mut reader = csv::Reader::from_path(path).expect("table should be readable");
        let header = reader
            .headers()
            .expect("table should have a header")
            .iter()
            .map(str::to_string)
            .collect();
        let rows = reader
            .records()
            .map(|r| {
                r.expect("record should parse")
                    .iter()
                    .map(str::to_string)
                    .collect()
            })
            .collect();
        Self { header, rows }
    }

    pub fn column(&self, name: &str) -> usize {
        self.header
            .iter()
            .position(|c| c == name)
            .unwrap_or_else(|| panic!("column {name} must exist"))
    }

    pub fn cell(&self, row: usize, name: &str) -> &str {
        &self.rows[row][self.column(name)]
    }

    pub fn row_for(&self, name: &str, week: &str) -> usize {
        let name_idx = self.column("Name");
        let week_idx = self.column("Week");
        self.rows
            .iter()
            .position(|r| r[name_idx] == name && r[week_idx] == week)
            .unwrap_or_else(|| panic!("row for {name} week {week} must exist"))
    }
}

pub fn first_line(path: &Path) -> String {
    fs::read_to_string(path)
        .expect("file should be readable")
        .lines()
        .next()
        .unwrap_or_default()
        .to_string()
}

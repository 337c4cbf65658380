//! Test Helper Utilities
//!
//! CSV fixture builders for both catalogs and a small-model configuration
//! that fits the fixture set.

#![allow(dead_code)]

use gamecat_common::config::TomlConfig;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const STEAM_HEADER: [&str; 15] = [
    "name",
    "price",
    "release_date",
    "windows",
    "mac",
    "linux",
    "num_reviews_total",
    "metacritic_score",
    "header_image",
    "developers",
    "publishers",
    "categories",
    "genres",
    "tags",
    "supported_languages",
];

pub const EPIC_HEADER: [&str; 7] = [
    "name",
    "price",
    "release_date",
    "genres",
    "developer",
    "publisher",
    "platform",
];

/// One row of the review-rich catalog
#[derive(Debug, Clone)]
pub struct SteamRow {
    pub name: &'static str,
    pub price: &'static str,
    pub release_date: &'static str,
    pub platforms: [bool; 3],
    pub reviews: u64,
    pub metacritic: u32,
    pub developers: &'static str,
    pub categories: &'static str,
    pub genres: &'static str,
    pub tags: &'static str,
    pub languages: &'static str,
}

impl Default for SteamRow {
    fn default() -> Self {
        Self {
            name: "",
            price: "9.99",
            release_date: "Jan 1, 2018",
            platforms: [true, false, false],
            reviews: 1000,
            metacritic: 0,
            developers: "",
            categories: "Single-player",
            genres: "",
            tags: "",
            languages: "English",
        }
    }
}

impl SteamRow {
    fn cells(&self) -> Vec<String> {
        let bool_cell = |b: bool| if b { "True" } else { "False" }.to_string();
        vec![
            self.name.to_string(),
            self.price.to_string(),
            self.release_date.to_string(),
            bool_cell(self.platforms[0]),
            bool_cell(self.platforms[1]),
            bool_cell(self.platforms[2]),
            self.reviews.to_string(),
            self.metacritic.to_string(),
            format!("https://img.example/{}.jpg", self.name.len()),
            self.developers.to_string(),
            self.developers.to_string(),
            self.categories.to_string(),
            self.genres.to_string(),
            self.tags.to_string(),
            self.languages.to_string(),
        ]
    }
}

/// One row of the low-signal catalog (price in cents)
#[derive(Debug, Clone)]
pub struct EpicRow {
    pub name: &'static str,
    pub price_cents: &'static str,
    pub release_date: &'static str,
    pub genres: &'static str,
    pub developer: &'static str,
    pub platform: &'static str,
}

impl Default for EpicRow {
    fn default() -> Self {
        Self {
            name: "",
            price_cents: "999",
            release_date: "2018-01-01",
            genres: "",
            developer: "",
            platform: "Windows",
        }
    }
}

impl EpicRow {
    fn cells(&self) -> Vec<String> {
        vec![
            self.name.to_string(),
            self.price_cents.to_string(),
            self.release_date.to_string(),
            self.genres.to_string(),
            self.developer.to_string(),
            self.developer.to_string(),
            self.platform.to_string(),
        ]
    }
}

pub fn write_csv(path: &Path, header: &[&str], rows: &[Vec<String>]) {
    let mut writer = csv::Writer::from_path(path).unwrap();
    writer.write_record(header).unwrap();
    for row in rows {
        writer.write_record(row).unwrap();
    }
    writer.flush().unwrap();
}

pub fn write_steam_csv(path: &Path, rows: &[SteamRow]) {
    let rows: Vec<Vec<String>> = rows.iter().map(SteamRow::cells).collect();
    write_csv(path, &STEAM_HEADER, &rows);
}

pub fn write_epic_csv(path: &Path, rows: &[EpicRow]) {
    let rows: Vec<Vec<String>> = rows.iter().map(EpicRow::cells).collect();
    write_csv(path, &EPIC_HEADER, &rows);
}

/// The shared fixture catalog
///
/// Primary: an edition variant pair, a junk prologue, a sub-floor title and
/// assorted genres. Secondary: overlapping titles, an override-only exclusive,
/// an exclusive nobody protects and a name with no Latin characters.
pub fn fixture_rows() -> (Vec<SteamRow>, Vec<EpicRow>) {
    let steam = vec![
        SteamRow {
            name: "Super Game",
            price: "19.99",
            release_date: "Mar 3, 2015",
            reviews: 800,
            genres: "Action",
            tags: "Action,Adventure",
            ..Default::default()
        },
        SteamRow {
            name: "Super Game: Deluxe Edition",
            price: "29.99",
            release_date: "Mar 3, 2015",
            reviews: 5000,
            metacritic: 81,
            genres: "Action",
            tags: "Action,Adventure",
            ..Default::default()
        },
        SteamRow {
            name: "Best Game Prologue",
            reviews: 9000,
            genres: "Action",
            ..Default::default()
        },
        SteamRow {
            name: "Wild Lands",
            price: "24.99",
            release_date: "Jun 10, 2021",
            platforms: [true, true, true],
            reviews: 20000,
            categories: "Single-player, Multi-player, Online Co-op",
            genres: "Adventure, Indie",
            tags: "Open World Survival Craft, Sandbox",
            ..Default::default()
        },
        SteamRow {
            name: "Old Shooter",
            price: "4.99",
            release_date: "Nov 16, 2004",
            reviews: 3000,
            developers: "Valve",
            categories: "Single-player, Multi-player, PvP",
            genres: "Action",
            tags: "FPS, Classic",
            ..Default::default()
        },
        SteamRow {
            name: "Farm Life",
            price: "14.99",
            release_date: "Feb 26, 2016",
            reviews: 1200,
            genres: "Simulation, Casual",
            tags: "Farming Sim, Relaxing",
            ..Default::default()
        },
        SteamRow {
            name: "Tiny Indie",
            reviews: 100,
            genres: "Indie",
            ..Default::default()
        },
        SteamRow {
            name: "Puzzle Box",
            price: "9.99",
            release_date: "",
            reviews: 900,
            genres: "Puzzle, Indie",
            ..Default::default()
        },
        SteamRow {
            name: "Racer X",
            price: "19.99",
            release_date: "Sep 1, 2012",
            reviews: 2500,
            categories: "Single-player, Controller Support",
            genres: "Racing, Sports",
            ..Default::default()
        },
    ];

    let epic = vec![
        EpicRow {
            name: "Super Game",
            price_cents: "1499",
            release_date: "2015-03-03",
            genres: "ACTION",
            ..Default::default()
        },
        EpicRow {
            name: "Wild Lands",
            price_cents: "1999",
            release_date: "2021-06-10",
            genres: "SURVIVAL",
            ..Default::default()
        },
        EpicRow {
            name: "Puzzle Box",
            price_cents: "799",
            release_date: "2019-05-01",
            genres: "PUZZLE",
            ..Default::default()
        },
        EpicRow {
            name: "Fortnite",
            price_cents: "0",
            release_date: "2017-07-21",
            genres: "ACTION",
            developer: "Epic Games",
            ..Default::default()
        },
        EpicRow {
            name: "Lonely Exclusive",
            price_cents: "2999",
            release_date: "2022-02-02",
            genres: "ADVENTURE",
            ..Default::default()
        },
        EpicRow {
            name: "ゲーム",
            price_cents: "999",
            release_date: "2020-01-01",
            genres: "RPG",
            ..Default::default()
        },
    ];
    (steam, epic)
}

/// Config with a model small enough for the fixture catalog
pub fn small_config(steam_path: PathBuf, epic_path: PathBuf, out_dir: PathBuf) -> TomlConfig {
    let mut config = TomlConfig::default();
    config.inputs.steam_path = steam_path;
    config.inputs.epic_path = epic_path;
    config.outputs.dir = out_dir;
    config.model.clusters = 3;
    config.model.n_init = 3;
    config.model.silhouette_sample = 50;
    config.model.neighbors = 4;
    config
}

/// Write the fixture catalog into a fresh temp dir
///
/// Returns (TempDir, config). TempDir must be kept alive for the test.
pub fn fixture_workspace() -> (TempDir, TomlConfig) {
    let dir = TempDir::new().unwrap();
    let steam_path = dir.path().join("steam.csv");
    let epic_path = dir.path().join("epic.csv");
    let (steam, epic) = fixture_rows();
    write_steam_csv(&steam_path, &steam);
    write_epic_csv(&epic_path, &epic);
    let config = small_config(steam_path, epic_path, dir.path().join("snapshots"));
    (dir, config)
}

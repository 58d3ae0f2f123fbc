// Configuration loading and parsing (league.toml, rules.toml).

use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::sim::GameRules;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub league: LeagueConfig,
    pub rules: RulesConfig,
    pub db_path: String,
    pub data_paths: DataPaths,
}

// ---------------------------------------------------------------------------
// league.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire league.toml file.
#[derive(Debug, Clone, Deserialize)]
struct LeagueFile {
    league: LeagueConfig,
    database: DatabaseSection,
    data_paths: DataPaths,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeagueConfig {
    pub name: String,
    /// Season epoch ("times") that games are recorded against.
    pub season: u32,
}

#[derive(Debug, Clone, Deserialize)]
struct DatabaseSection {
    path: String,
}

/// CSV roster sources, relative to the working directory.
#[derive(Debug, Clone, Deserialize)]
pub struct DataPaths {
    pub teams: String,
    pub players: String,
    pub pitchers: String,
}

// ---------------------------------------------------------------------------
// rules.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
struct RulesFile {
    game: GameSection,
    #[serde(default)]
    simulation: SimulationSection,
}

#[derive(Debug, Clone, Deserialize)]
struct GameSection {
    extra_inning_limit: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SimulationSection {
    seed: Option<u64>,
    #[serde(default)]
    log_plays: bool,
}

/// Game rules and simulation knobs assembled from rules.toml.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RulesConfig {
    /// Last inning before a tie is called a draw; 0 disables the limit.
    pub extra_inning_limit: u32,
    /// Fixed seed for reproducible games. `None` draws from process entropy.
    pub seed: Option<u64>,
    /// Emit a debug event for every play.
    pub log_plays: bool,
}

impl RulesConfig {
    pub fn game_rules(&self) -> GameRules {
        GameRules {
            extra_inning_limit: self.extra_inning_limit,
            log_plays: self.log_plays,
        }
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Files read from `config/`, each seeded from `defaults/` when missing.
const CONFIG_FILES: [&str; 2] = ["league.toml", "rules.toml"];

/// Load and validate `config/league.toml` and `config/rules.toml` under
/// `base_dir`. Missing files are an error; see `load_config` for the
/// variant that seeds them first.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");
    let league: LeagueFile = parse_file(&config_dir.join("league.toml"))?;
    let rules: RulesFile = parse_file(&config_dir.join("rules.toml"))?;

    let config = Config {
        league: league.league,
        rules: RulesConfig {
            extra_inning_limit: rules.game.extra_inning_limit,
            seed: rules.simulation.seed,
            log_plays: rules.simulation.log_plays,
        },
        db_path: league.database.path,
        data_paths: league.data_paths,
    };
    validate(&config)?;
    Ok(config)
}

/// Copy each config file that is missing from `config/` out of `defaults/`.
/// Returns the files written. Existing files are never touched.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.is_dir() {
        if config_dir.is_dir() {
            return Ok(vec![]);
        }
        return Err(ConfigError::DefaultsCopyError {
            message: format!("no defaults/ or config/ directory in {}", base_dir.display()),
        });
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("cannot create {}: {e}", config_dir.display()),
    })?;

    let mut copied = Vec::new();
    for name in CONFIG_FILES {
        let source = defaults_dir.join(name);
        let target = config_dir.join(name);
        if target.exists() || !source.is_file() {
            continue;
        }
        std::fs::copy(&source, &target).map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("cannot copy {} to {}: {e}", source.display(), target.display()),
        })?;
        copied.push(target);
    }
    Ok(copied)
}

/// Seed and load the configuration relative to the working directory.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

fn parse_file<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })?;
    toml::from_str(&text).map_err(|source| ConfigError::ParseError {
        path: path.to_path_buf(),
        source,
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.league.name.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "league.name".into(),
            message: "must not be empty".into(),
        });
    }

    if config.league.season == 0 {
        return Err(ConfigError::ValidationError {
            field: "league.season".into(),
            message: "must be at least 1".into(),
        });
    }

    let limit = config.rules.extra_inning_limit;
    if limit != 0 && limit < crate::sim::game::REGULATION_INNINGS {
        return Err(ConfigError::ValidationError {
            field: "game.extra_inning_limit".into(),
            message: format!("must be 0 (unlimited) or at least 9, got {limit}"),
        });
    }

    let paths: &[(&str, &str)] = &[
        ("data_paths.teams", &config.data_paths.teams),
        ("data_paths.players", &config.data_paths.players),
        ("data_paths.pitchers", &config.data_paths.pitchers),
    ];
    for (name, value) in paths {
        if value.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                field: name.to_string(),
                message: "must not be empty".into(),
            });
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

// League orchestration: roster import, one "play ball" request, standings.

use anyhow::{Context, Result};
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::config::Config;
use crate::db::{Champion, Database, Standing};
use crate::roster::import;
use crate::sim::{Game, GameResult, Play, RandomSource};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LeagueError {
    #[error("a team cannot play itself (team {0})")]
    SameTeam(i64),

    #[error("no season is open; run the import first")]
    NoSeason,

    #[error("unknown team '{0}'")]
    UnknownTeam(String),
}

/// What a finished request hands back to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct PlayBallReport {
    pub times: u32,
    pub game_log_id: i64,
    pub result: GameResult,
    pub champion: Option<Champion>,
}

/// Load the configured CSV rosters into the database and open the
/// configured season if no season is open yet. Returns the team ids.
pub fn import_league(db: &Database, config: &Config) -> Result<Vec<i64>> {
    let teams = import::load_all(config).context("failed to load roster files")?;
    let ids = db.import_roster(&teams)?;
    if db.current_times()?.is_none() {
        db.start_season(config.league.season)?;
        info!("opened season {}", config.league.season);
    }
    info!("imported {} teams into {}", ids.len(), config.league.name);
    Ok(ids)
}

/// Resolve a team by name.
pub fn team_id(db: &Database, name: &str) -> Result<i64> {
    db.find_team_id(name)?
        .ok_or_else(|| LeagueError::UnknownTeam(name.to_string()).into())
}

/// Play one game between two stored teams in the open season and persist
/// everything it produced.
pub fn play_ball<R: RandomSource>(
    db: &Database,
    config: &Config,
    top_id: i64,
    bottom_id: i64,
    rng: R,
) -> Result<PlayBallReport> {
    if top_id == bottom_id {
        return Err(LeagueError::SameTeam(top_id).into());
    }
    let times = db.current_times()?.ok_or(LeagueError::NoSeason)?;

    let top = db.load_team(top_id, times)?;
    let bottom = db.load_team(bottom_id, times)?;

    info!("start game: {} at {}", top.name, bottom.name);
    let game = Game::new(&top, &bottom, config.rules.game_rules());
    let mut resolver = Play::new(rng);
    let result = game.play(&mut resolver);

    let game_log_id = db.record_game(times, &result)?;
    let champion = db.champion(times)?;
    info!(
        "recorded game {}: {} {} - {} {}",
        game_log_id,
        top.name,
        result.record.score.top,
        result.record.score.bottom,
        bottom.name
    );

    Ok(PlayBallReport {
        times,
        game_log_id,
        result,
        champion,
    })
}

/// Season table ordered by wins, then run differential.
pub fn standings(db: &Database, times: u32) -> Result<Vec<Standing>> {
    let mut table = db.standings(times)?;
    table.sort_by(|a, b| {
        b.season
            .win
            .cmp(&a.season.win)
            .then_with(|| b.run_differential().cmp(&a.run_differential()))
    });
    Ok(table)
}

// SQLite persistence layer for rosters, season stats and game logs.

use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use serde::Serialize;

use crate::roster::import::TeamImport;
use crate::roster::{
    Batter, BattingStats, Condition, Pitcher, PitchingStats, Position, Team, TeamSeason,
    Tendencies,
};
use crate::sim::game::{BattingLine, SideResult};
use crate::sim::{GameResult, Outcome, TopBottom};

/// The reigning champion of a season and its consecutive title defences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Champion {
    pub team_id: i64,
    pub name: String,
    pub win_continue: u32,
}

/// One row of the season table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Standing {
    pub team_id: i64,
    pub name: String,
    pub season: TeamSeason,
}

impl Standing {
    pub fn run_differential(&self) -> i64 {
        self.season.score as i64 - self.season.lose_score as i64
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameLogEntry {
    pub id: i64,
    pub times: u32,
    pub teams: TopBottom<String>,
    pub score: TopBottom<u32>,
    pub outcome: Outcome,
    pub walk_off: bool,
    pub innings: u32,
    pub line_score: TopBottom<Vec<u32>>,
    pub played_at: String,
}

/// SQLite-backed persistence for teams, players, per-season stats, the
/// champion record and the game log.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a SQLite database at `path` and ensure all tables
    /// exist. Pass `":memory:"` for an ephemeral in-memory database (useful
    /// for tests).
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA foreign_keys = ON;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS teams (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                name        TEXT NOT NULL UNIQUE,
                owner       TEXT NOT NULL,
                type_attack REAL NOT NULL,
                type_bunt   REAL NOT NULL,
                type_steal  REAL NOT NULL,
                type_mind   REAL NOT NULL
            );

            CREATE TABLE IF NOT EXISTS current_data (
                times            INTEGER PRIMARY KEY,
                start_at         TEXT NOT NULL,
                end_at           TEXT,
                champion_team_id INTEGER REFERENCES teams(id),
                win_continue     INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS players (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                team_id       INTEGER NOT NULL REFERENCES teams(id),
                name          TEXT NOT NULL,
                batting_order INTEGER NOT NULL,
                position      TEXT NOT NULL,
                condition     INTEGER NOT NULL,
                power         REAL NOT NULL,
                meet          REAL NOT NULL,
                run           REAL NOT NULL,
                defense       REAL NOT NULL,
                active        INTEGER NOT NULL DEFAULT 1,
                UNIQUE(team_id, name)
            );

            CREATE TABLE IF NOT EXISTS pitchers (
                id             INTEGER PRIMARY KEY AUTOINCREMENT,
                team_id        INTEGER NOT NULL REFERENCES teams(id),
                name           TEXT NOT NULL,
                rotation_order INTEGER NOT NULL,
                condition      INTEGER NOT NULL,
                speed          REAL NOT NULL,
                change         REAL NOT NULL,
                control        REAL NOT NULL,
                defense        REAL NOT NULL,
                active         INTEGER NOT NULL DEFAULT 1,
                UNIQUE(team_id, name)
            );

            CREATE TABLE IF NOT EXISTS batting_data (
                member_kind   TEXT NOT NULL,
                member_id     INTEGER NOT NULL,
                times         INTEGER NOT NULL,
                at_bat        INTEGER NOT NULL DEFAULT 0,
                hit           INTEGER NOT NULL DEFAULT 0,
                double        INTEGER NOT NULL DEFAULT 0,
                triple        INTEGER NOT NULL DEFAULT 0,
                hr            INTEGER NOT NULL DEFAULT 0,
                bat_score     INTEGER NOT NULL DEFAULT 0,
                four_ball     INTEGER NOT NULL DEFAULT 0,
                strike_out    INTEGER NOT NULL DEFAULT 0,
                bunt          INTEGER NOT NULL DEFAULT 0,
                sacrifice_fly INTEGER NOT NULL DEFAULT 0,
                steal         INTEGER NOT NULL DEFAULT 0,
                steal_failed  INTEGER NOT NULL DEFAULT 0,
                error         INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (member_kind, member_id, times)
            );

            CREATE TABLE IF NOT EXISTS pitching_data (
                pitcher_id   INTEGER NOT NULL REFERENCES pitchers(id),
                times        INTEGER NOT NULL,
                win          INTEGER NOT NULL DEFAULT 0,
                lose         INTEGER NOT NULL DEFAULT 0,
                strike_out   INTEGER NOT NULL DEFAULT 0,
                four_ball    INTEGER NOT NULL DEFAULT 0,
                hit          INTEGER NOT NULL DEFAULT 0,
                hr           INTEGER NOT NULL DEFAULT 0,
                wild_pitch   INTEGER NOT NULL DEFAULT 0,
                out_count    INTEGER NOT NULL DEFAULT 0,
                loss_score   INTEGER NOT NULL DEFAULT 0,
                runs_allowed INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (pitcher_id, times)
            );

            CREATE TABLE IF NOT EXISTS team_data (
                team_id      INTEGER NOT NULL REFERENCES teams(id),
                times        INTEGER NOT NULL,
                win          INTEGER NOT NULL DEFAULT 0,
                lose         INTEGER NOT NULL DEFAULT 0,
                draw         INTEGER NOT NULL DEFAULT 0,
                win_continue INTEGER NOT NULL DEFAULT 0,
                score        INTEGER NOT NULL DEFAULT 0,
                lose_score   INTEGER NOT NULL DEFAULT 0,
                hr           INTEGER NOT NULL DEFAULT 0,
                steal        INTEGER NOT NULL DEFAULT 0,
                strike_out   INTEGER NOT NULL DEFAULT 0,
                error        INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (team_id, times)
            );

            CREATE TABLE IF NOT EXISTS game_logs (
                id             INTEGER PRIMARY KEY AUTOINCREMENT,
                times          INTEGER NOT NULL,
                top_team_id    INTEGER NOT NULL REFERENCES teams(id),
                bottom_team_id INTEGER NOT NULL REFERENCES teams(id),
                top_score      INTEGER NOT NULL,
                bottom_score   INTEGER NOT NULL,
                outcome        TEXT NOT NULL,
                walk_off       INTEGER NOT NULL,
                innings        INTEGER NOT NULL,
                line_score     TEXT NOT NULL,
                played_at      TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_game_logs_times ON game_logs(times);
            ",
        )
        .context("failed to create database schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the database connection.
    ///
    /// Panics if the mutex is poisoned (another thread panicked while
    /// holding the lock). This should never happen in normal operation.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }

    // ------------------------------------------------------------------
    // Seasons
    // ------------------------------------------------------------------

    /// Open season `times`, closing any other open season. Re-opening the
    /// current season is a no-op.
    pub fn start_season(&self, times: u32) -> Result<()> {
        let mut conn = self.conn();
        let now = timestamp();
        let tx = conn.transaction().context("failed to begin transaction")?;
        tx.execute(
            "UPDATE current_data SET end_at = ?2 WHERE end_at IS NULL AND times <> ?1",
            params![times, now],
        )
        .context("failed to close previous season")?;
        tx.execute(
            "INSERT INTO current_data (times, start_at) VALUES (?1, ?2)
             ON CONFLICT(times) DO UPDATE SET end_at = NULL",
            params![times, now],
        )
        .context("failed to open season")?;
        tx.commit().context("failed to commit start_season")?;
        Ok(())
    }

    /// The open season, if any.
    pub fn current_times(&self) -> Result<Option<u32>> {
        let conn = self.conn();
        let times: Option<u32> = conn
            .query_row(
                "SELECT MAX(times) FROM current_data WHERE end_at IS NULL",
                [],
                |row| row.get(0),
            )
            .context("failed to query current season")?;
        Ok(times)
    }

    // ------------------------------------------------------------------
    // Rosters
    // ------------------------------------------------------------------

    /// Import teams with their players and pitchers in a single transaction.
    ///
    /// Teams, players and pitchers are upserted by name, so re-importing
    /// updates ratings and keeps accumulated stats. Members missing from the
    /// new import are deactivated rather than deleted. Returns the team ids
    /// in input order.
    pub fn import_roster(&self, teams: &[TeamImport]) -> Result<Vec<i64>> {
        let mut conn = self.conn();
        let tx = conn
            .transaction()
            .context("failed to begin import transaction")?;

        let mut ids = Vec::with_capacity(teams.len());
        for team in teams {
            let team_id: i64 = tx
                .query_row(
                    "INSERT INTO teams (name, owner, type_attack, type_bunt, type_steal, type_mind)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                     ON CONFLICT(name) DO UPDATE SET
                        owner       = excluded.owner,
                        type_attack = excluded.type_attack,
                        type_bunt   = excluded.type_bunt,
                        type_steal  = excluded.type_steal,
                        type_mind   = excluded.type_mind
                     RETURNING id",
                    params![
                        team.name,
                        team.owner,
                        team.tendencies.attack,
                        team.tendencies.bunt,
                        team.tendencies.steal,
                        team.tendencies.mind,
                    ],
                    |row| row.get(0),
                )
                .with_context(|| format!("failed to upsert team {}", team.name))?;

            tx.execute("UPDATE players SET active = 0 WHERE team_id = ?1", params![team_id])
                .context("failed to deactivate players")?;
            tx.execute("UPDATE pitchers SET active = 0 WHERE team_id = ?1", params![team_id])
                .context("failed to deactivate pitchers")?;

            for p in &team.players {
                tx.execute(
                    "INSERT INTO players
                        (team_id, name, batting_order, position, condition, power, meet, run, defense, active)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 1)
                     ON CONFLICT(team_id, name) DO UPDATE SET
                        batting_order = excluded.batting_order,
                        position      = excluded.position,
                        condition     = excluded.condition,
                        power         = excluded.power,
                        meet          = excluded.meet,
                        run           = excluded.run,
                        defense       = excluded.defense,
                        active        = 1",
                    params![
                        team_id,
                        p.name,
                        p.order,
                        p.position.display_str(),
                        p.condition.level(),
                        p.power,
                        p.meet,
                        p.run,
                        p.defense,
                    ],
                )
                .with_context(|| format!("failed to upsert player {}", p.name))?;
            }

            for p in &team.pitchers {
                tx.execute(
                    "INSERT INTO pitchers
                        (team_id, name, rotation_order, condition, speed, change, control, defense, active)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 1)
                     ON CONFLICT(team_id, name) DO UPDATE SET
                        rotation_order = excluded.rotation_order,
                        condition      = excluded.condition,
                        speed          = excluded.speed,
                        change         = excluded.change,
                        control        = excluded.control,
                        defense        = excluded.defense,
                        active         = 1",
                    params![
                        team_id,
                        p.name,
                        p.order,
                        p.condition.level(),
                        p.speed,
                        p.change,
                        p.control,
                        p.defense,
                    ],
                )
                .with_context(|| format!("failed to upsert pitcher {}", p.name))?;
            }
            ids.push(team_id);
        }

        tx.commit().context("failed to commit import")?;
        Ok(ids)
    }

    pub fn find_team_id(&self, name: &str) -> Result<Option<i64>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id FROM teams WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )
        .optional()
        .context("failed to look up team")
    }

    /// Build a game-ready team with its season-to-date stats for `times`.
    ///
    /// Fails if the team does not exist or its active roster is not a legal
    /// lineup.
    pub fn load_team(&self, team_id: i64, times: u32) -> Result<Team> {
        let conn = self.conn();

        let (name, owner, tendencies) = conn
            .query_row(
                "SELECT name, owner, type_attack, type_bunt, type_steal, type_mind
                 FROM teams WHERE id = ?1",
                params![team_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        Tendencies {
                            attack: row.get(2)?,
                            bunt: row.get(3)?,
                            steal: row.get(4)?,
                            mind: row.get(5)?,
                        },
                    ))
                },
            )
            .optional()
            .context("failed to query team")?
            .ok_or_else(|| anyhow!("team {team_id} does not exist"))?;

        let players = load_batters(&conn, team_id, times)?;
        let pitchers = load_pitchers(&conn, team_id, times)?;
        let season = query_team_season(&conn, team_id, times)?;

        Team::new(team_id, &name, &owner, tendencies, players, pitchers, season)
            .with_context(|| format!("team {name} cannot take the field"))
    }

    // ------------------------------------------------------------------
    // Results
    // ------------------------------------------------------------------

    /// Merge a finished game into season `times` and append it to the game
    /// log, all in one transaction. Returns the game log id.
    pub fn record_game(&self, times: u32, result: &GameResult) -> Result<i64> {
        let mut conn = self.conn();
        let tx = conn
            .transaction()
            .context("failed to begin record_game transaction")?;

        merge_side(&tx, times, &result.sides.top)?;
        merge_side(&tx, times, &result.sides.bottom)?;

        let record = &result.record;
        let line_score = serde_json::to_string(&record.score_board)
            .context("failed to serialize line score")?;
        let log_id: i64 = tx
            .query_row(
                "INSERT INTO game_logs
                    (times, top_team_id, bottom_team_id, top_score, bottom_score, outcome, walk_off, innings, line_score, played_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                 RETURNING id",
                params![
                    times,
                    result.sides.top.team_id,
                    result.sides.bottom.team_id,
                    record.score.top,
                    record.score.bottom,
                    outcome_str(record.outcome),
                    record.walk_off,
                    record.innings_played,
                    line_score,
                    timestamp(),
                ],
                |row| row.get(0),
            )
            .context("failed to insert game log")?;

        update_champion(&tx, times, result)?;

        tx.commit().context("failed to commit record_game")?;
        Ok(log_id)
    }

    pub fn champion(&self, times: u32) -> Result<Option<Champion>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT c.champion_team_id, t.name, c.win_continue
             FROM current_data c JOIN teams t ON t.id = c.champion_team_id
             WHERE c.times = ?1",
            params![times],
            |row| {
                Ok(Champion {
                    team_id: row.get(0)?,
                    name: row.get(1)?,
                    win_continue: row.get(2)?,
                })
            },
        )
        .optional()
        .context("failed to query champion")
    }

    /// Most recent games of season `times`, newest first.
    pub fn game_logs(&self, times: u32, limit: usize) -> Result<Vec<GameLogEntry>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT g.id, g.times, top.name, bottom.name, g.top_score, g.bottom_score,
                        g.outcome, g.walk_off, g.innings, g.line_score, g.played_at
                 FROM game_logs g
                 JOIN teams top ON top.id = g.top_team_id
                 JOIN teams bottom ON bottom.id = g.bottom_team_id
                 WHERE g.times = ?1
                 ORDER BY g.id DESC
                 LIMIT ?2",
            )
            .context("failed to prepare game_logs query")?;

        let rows = stmt
            .query_map(params![times, limit as i64], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, u32>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, u32>(4)?,
                    row.get::<_, u32>(5)?,
                    row.get::<_, String>(6)?,
                    row.get::<_, bool>(7)?,
                    row.get::<_, u32>(8)?,
                    row.get::<_, String>(9)?,
                    row.get::<_, String>(10)?,
                ))
            })
            .context("failed to query game logs")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map game log rows")?;

        rows.into_iter()
            .map(
                |(id, times, top, bottom, top_score, bottom_score, outcome, walk_off, innings, line, played_at)|
                 -> Result<GameLogEntry> {
                    let line_score: TopBottom<Vec<u32>> = serde_json::from_str(&line)
                        .with_context(|| format!("corrupt line score in game log {id}"))?;
                    Ok(GameLogEntry {
                        id,
                        times,
                        teams: TopBottom::new(top, bottom),
                        score: TopBottom::new(top_score, bottom_score),
                        outcome: parse_outcome(&outcome)?,
                        walk_off,
                        innings,
                        line_score,
                        played_at,
                    })
                },
            )
            .collect()
    }

    /// Every team with its totals for season `times`, in team id order.
    /// Teams that have not played yet show zeros.
    pub fn standings(&self, times: u32) -> Result<Vec<Standing>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT t.id, t.name,
                        COALESCE(d.win, 0), COALESCE(d.lose, 0), COALESCE(d.draw, 0),
                        COALESCE(d.win_continue, 0), COALESCE(d.score, 0),
                        COALESCE(d.lose_score, 0), COALESCE(d.hr, 0), COALESCE(d.steal, 0),
                        COALESCE(d.strike_out, 0), COALESCE(d.error, 0)
                 FROM teams t
                 LEFT JOIN team_data d ON d.team_id = t.id AND d.times = ?1
                 ORDER BY t.id",
            )
            .context("failed to prepare standings query")?;

        let standings = stmt
            .query_map(params![times], |row| {
                Ok(Standing {
                    team_id: row.get(0)?,
                    name: row.get(1)?,
                    season: TeamSeason {
                        win: row.get(2)?,
                        lose: row.get(3)?,
                        draw: row.get(4)?,
                        win_continue: row.get(5)?,
                        score: row.get(6)?,
                        lose_score: row.get(7)?,
                        hr: row.get(8)?,
                        steal: row.get(9)?,
                        strike_out: row.get(10)?,
                        error: row.get(11)?,
                    },
                })
            })
            .context("failed to query standings")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map standing rows")?;

        Ok(standings)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn timestamp() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

fn outcome_str(outcome: Outcome) -> &'static str {
    match outcome {
        Outcome::Top => "top",
        Outcome::Bottom => "bottom",
        Outcome::Draw => "draw",
    }
}

fn parse_outcome(s: &str) -> Result<Outcome> {
    match s {
        "top" => Ok(Outcome::Top),
        "bottom" => Ok(Outcome::Bottom),
        "draw" => Ok(Outcome::Draw),
        other => Err(anyhow!("unknown game outcome '{other}'")),
    }
}

fn condition_from(level: i64, who: &str) -> Result<Condition> {
    Condition::from_level(level).ok_or_else(|| anyhow!("{who} has invalid condition {level}"))
}

const BATTER_KIND: &str = "batter";
const PITCHER_KIND: &str = "pitcher";

fn query_batting(conn: &Connection, kind: &str, member_id: i64, times: u32) -> Result<BattingStats> {
    let stats = conn
        .query_row(
            "SELECT at_bat, hit, double, triple, hr, bat_score, four_ball, strike_out,
                    bunt, sacrifice_fly, steal, steal_failed, error
             FROM batting_data WHERE member_kind = ?1 AND member_id = ?2 AND times = ?3",
            params![kind, member_id, times],
            |row| {
                Ok(BattingStats {
                    at_bat: row.get(0)?,
                    hit: row.get(1)?,
                    double: row.get(2)?,
                    triple: row.get(3)?,
                    hr: row.get(4)?,
                    bat_score: row.get(5)?,
                    four_ball: row.get(6)?,
                    strike_out: row.get(7)?,
                    bunt: row.get(8)?,
                    sacrifice_fly: row.get(9)?,
                    steal: row.get(10)?,
                    steal_failed: row.get(11)?,
                    error: row.get(12)?,
                })
            },
        )
        .optional()
        .context("failed to query batting data")?;
    Ok(stats.unwrap_or_default())
}

fn query_pitching(conn: &Connection, pitcher_id: i64, times: u32) -> Result<PitchingStats> {
    let stats = conn
        .query_row(
            "SELECT win, lose, strike_out, four_ball, hit, hr, wild_pitch, out_count,
                    loss_score, runs_allowed
             FROM pitching_data WHERE pitcher_id = ?1 AND times = ?2",
            params![pitcher_id, times],
            |row| {
                Ok(PitchingStats {
                    win: row.get(0)?,
                    lose: row.get(1)?,
                    strike_out: row.get(2)?,
                    four_ball: row.get(3)?,
                    hit: row.get(4)?,
                    hr: row.get(5)?,
                    wild_pitch: row.get(6)?,
                    out_count: row.get(7)?,
                    loss_score: row.get(8)?,
                    runs_allowed: row.get(9)?,
                })
            },
        )
        .optional()
        .context("failed to query pitching data")?;
    Ok(stats.unwrap_or_default())
}

fn query_team_season(conn: &Connection, team_id: i64, times: u32) -> Result<TeamSeason> {
    let season = conn
        .query_row(
            "SELECT win, lose, draw, win_continue, score, lose_score, hr, steal, strike_out, error
             FROM team_data WHERE team_id = ?1 AND times = ?2",
            params![team_id, times],
            |row| {
                Ok(TeamSeason {
                    win: row.get(0)?,
                    lose: row.get(1)?,
                    draw: row.get(2)?,
                    win_continue: row.get(3)?,
                    score: row.get(4)?,
                    lose_score: row.get(5)?,
                    hr: row.get(6)?,
                    steal: row.get(7)?,
                    strike_out: row.get(8)?,
                    error: row.get(9)?,
                })
            },
        )
        .optional()
        .context("failed to query team data")?;
    Ok(season.unwrap_or_default())
}

struct BatterRow {
    id: i64,
    name: String,
    order: u32,
    position: String,
    condition: i64,
    power: f64,
    meet: f64,
    run: f64,
    defense: f64,
}

fn load_batters(conn: &Connection, team_id: i64, times: u32) -> Result<Vec<Batter>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, name, batting_order, position, condition, power, meet, run, defense
             FROM players WHERE team_id = ?1 AND active = 1 ORDER BY batting_order",
        )
        .context("failed to prepare players query")?;
    let rows = stmt
        .query_map(params![team_id], |row| {
            Ok(BatterRow {
                id: row.get(0)?,
                name: row.get(1)?,
                order: row.get(2)?,
                position: row.get(3)?,
                condition: row.get(4)?,
                power: row.get(5)?,
                meet: row.get(6)?,
                run: row.get(7)?,
                defense: row.get(8)?,
            })
        })
        .context("failed to query players")?
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("failed to map player rows")?;

    rows.into_iter()
        .map(|r| {
            let position = Position::from_str_pos(&r.position)
                .ok_or_else(|| anyhow!("{} has unknown position '{}'", r.name, r.position))?;
            let condition = condition_from(r.condition, &r.name)?;
            let season = query_batting(conn, BATTER_KIND, r.id, times)?;
            Ok(Batter {
                id: r.id,
                name: r.name,
                order: r.order,
                position,
                condition,
                power: r.power,
                meet: r.meet,
                run: r.run,
                defense: r.defense,
                season,
            })
        })
        .collect()
}

struct PitcherRow {
    id: i64,
    name: String,
    order: u32,
    condition: i64,
    speed: f64,
    change: f64,
    control: f64,
    defense: f64,
}

fn load_pitchers(conn: &Connection, team_id: i64, times: u32) -> Result<Vec<Pitcher>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, name, rotation_order, condition, speed, change, control, defense
             FROM pitchers WHERE team_id = ?1 AND active = 1 ORDER BY rotation_order",
        )
        .context("failed to prepare pitchers query")?;
    let rows = stmt
        .query_map(params![team_id], |row| {
            Ok(PitcherRow {
                id: row.get(0)?,
                name: row.get(1)?,
                order: row.get(2)?,
                condition: row.get(3)?,
                speed: row.get(4)?,
                change: row.get(5)?,
                control: row.get(6)?,
                defense: row.get(7)?,
            })
        })
        .context("failed to query pitchers")?
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("failed to map pitcher rows")?;

    rows.into_iter()
        .map(|r| {
            let condition = condition_from(r.condition, &r.name)?;
            let season = query_pitching(conn, r.id, times)?;
            let batting = query_batting(conn, PITCHER_KIND, r.id, times)?;
            Ok(Pitcher {
                id: r.id,
                name: r.name,
                order: r.order,
                condition,
                speed: r.speed,
                change: r.change,
                control: r.control,
                defense: r.defense,
                season,
                batting,
            })
        })
        .collect()
}

fn merge_batting(tx: &Transaction<'_>, times: u32, line: &BattingLine) -> Result<()> {
    let kind = if line.is_pitcher { PITCHER_KIND } else { BATTER_KIND };
    let s = &line.stats;
    tx.execute(
        "INSERT INTO batting_data
            (member_kind, member_id, times, at_bat, hit, double, triple, hr, bat_score,
             four_ball, strike_out, bunt, sacrifice_fly, steal, steal_failed, error)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
         ON CONFLICT(member_kind, member_id, times) DO UPDATE SET
            at_bat        = at_bat + excluded.at_bat,
            hit           = hit + excluded.hit,
            double        = double + excluded.double,
            triple        = triple + excluded.triple,
            hr            = hr + excluded.hr,
            bat_score     = bat_score + excluded.bat_score,
            four_ball     = four_ball + excluded.four_ball,
            strike_out    = strike_out + excluded.strike_out,
            bunt          = bunt + excluded.bunt,
            sacrifice_fly = sacrifice_fly + excluded.sacrifice_fly,
            steal         = steal + excluded.steal,
            steal_failed  = steal_failed + excluded.steal_failed,
            error         = error + excluded.error",
        params![
            kind,
            line.player_id,
            times,
            s.at_bat,
            s.hit,
            s.double,
            s.triple,
            s.hr,
            s.bat_score,
            s.four_ball,
            s.strike_out,
            s.bunt,
            s.sacrifice_fly,
            s.steal,
            s.steal_failed,
            s.error,
        ],
    )
    .with_context(|| format!("failed to merge batting line for {}", line.name))?;
    Ok(())
}

fn merge_side(tx: &Transaction<'_>, times: u32, side: &SideResult) -> Result<()> {
    for line in &side.batting {
        merge_batting(tx, times, line)?;
    }

    let p = &side.pitching.stats;
    tx.execute(
        "INSERT INTO pitching_data
            (pitcher_id, times, win, lose, strike_out, four_ball, hit, hr, wild_pitch,
             out_count, loss_score, runs_allowed)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
         ON CONFLICT(pitcher_id, times) DO UPDATE SET
            win          = win + excluded.win,
            lose         = lose + excluded.lose,
            strike_out   = strike_out + excluded.strike_out,
            four_ball    = four_ball + excluded.four_ball,
            hit          = hit + excluded.hit,
            hr           = hr + excluded.hr,
            wild_pitch   = wild_pitch + excluded.wild_pitch,
            out_count    = out_count + excluded.out_count,
            loss_score   = loss_score + excluded.loss_score,
            runs_allowed = runs_allowed + excluded.runs_allowed",
        params![
            side.pitching.pitcher_id,
            times,
            p.win,
            p.lose,
            p.strike_out,
            p.four_ball,
            p.hit,
            p.hr,
            p.wild_pitch,
            p.out_count,
            p.loss_score,
            p.runs_allowed,
        ],
    )
    .with_context(|| format!("failed to merge pitching line for {}", side.pitching.name))?;

    // A new row starts its streak at the game's wins; an existing row
    // extends on a win and resets otherwise.
    let t = &side.team;
    tx.execute(
        "INSERT INTO team_data
            (team_id, times, win, lose, draw, win_continue, score, lose_score, hr, steal,
             strike_out, error)
         VALUES (?1, ?2, ?3, ?4, ?5, ?3, ?6, ?7, ?8, ?9, ?10, ?11)
         ON CONFLICT(team_id, times) DO UPDATE SET
            win          = win + excluded.win,
            lose         = lose + excluded.lose,
            draw         = draw + excluded.draw,
            win_continue = CASE WHEN excluded.win > 0
                                THEN win_continue + excluded.win
                                ELSE 0 END,
            score        = score + excluded.score,
            lose_score   = lose_score + excluded.lose_score,
            hr           = hr + excluded.hr,
            steal        = steal + excluded.steal,
            strike_out   = strike_out + excluded.strike_out,
            error        = error + excluded.error",
        params![
            side.team_id,
            times,
            t.win,
            t.lose,
            t.draw,
            t.score,
            t.lose_score,
            t.hr,
            t.steal,
            t.strike_out,
            t.error,
        ],
    )
    .context("failed to merge team data")?;
    Ok(())
}

/// The away team wins the title outright; the home team defends it
/// (or takes it) and extends the streak when it already held it. A draw
/// leaves the record alone.
fn update_champion(tx: &Transaction<'_>, times: u32, result: &GameResult) -> Result<()> {
    let (team_id, streak) = match result.record.outcome {
        Outcome::Draw => return Ok(()),
        Outcome::Top => (result.sides.top.team_id, 1),
        Outcome::Bottom => {
            let holder: Option<(Option<i64>, u32)> = tx
                .query_row(
                    "SELECT champion_team_id, win_continue FROM current_data WHERE times = ?1",
                    params![times],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()
                .context("failed to query champion")?;
            let bottom = result.sides.bottom.team_id;
            match holder {
                Some((Some(id), streak)) if id == bottom => (bottom, streak + 1),
                _ => (bottom, 1),
            }
        }
    };

    let updated = tx
        .execute(
            "UPDATE current_data SET champion_team_id = ?2, win_continue = ?3 WHERE times = ?1",
            params![times, team_id, streak],
        )
        .context("failed to update champion")?;
    if updated == 0 {
        return Err(anyhow!("season {times} has not been started"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::import::{PitcherRow as ImportPitcher, PlayerRow};
    use crate::roster::FIELD_POSITIONS;
    use crate::sim::game::PitchingLine;
    use crate::sim::GameRecord;

    /// Helper: create a fresh in-memory database for each test.
    fn test_db() -> Database {
        Database::open(":memory:").expect("in-memory database should open")
    }

    fn roster(name: &str) -> TeamImport {
        let players = FIELD_POSITIONS
            .iter()
            .enumerate()
            .map(|(i, &pos)| PlayerRow {
                team: name.to_string(),
                name: format!("{name} {pos}"),
                order: i as u32 + 1,
                position: pos,
                condition: Condition::Normal,
                power: 5.0,
                meet: 5.0,
                run: 5.0,
                defense: 5.0,
            })
            .collect();
        TeamImport {
            name: name.to_string(),
            owner: "owner".to_string(),
            tendencies: Tendencies::default(),
            players,
            pitchers: vec![ImportPitcher {
                team: name.to_string(),
                name: format!("{name} Ace"),
                order: 1,
                condition: Condition::Good,
                speed: 6.0,
                change: 5.0,
                control: 4.0,
                defense: 5.0,
            }],
        }
    }

    /// Helper: a result where `top` scored `top_runs` and `bottom` scored
    /// `bottom_runs`. Only the fields persistence looks at are filled in.
    fn result_for(top: &Team, bottom: &Team, top_runs: u32, bottom_runs: u32) -> GameResult {
        let outcome = match top_runs.cmp(&bottom_runs) {
            std::cmp::Ordering::Greater => Outcome::Top,
            std::cmp::Ordering::Less => Outcome::Bottom,
            std::cmp::Ordering::Equal => Outcome::Draw,
        };
        let side = |team: &Team, scored: u32, allowed: u32| {
            let won = scored > allowed;
            let lost = scored < allowed;
            let mut batting: Vec<BattingLine> = team
                .lineup
                .iter()
                .enumerate()
                .map(|(slot, b)| BattingLine {
                    player_id: b.id,
                    name: b.name.clone(),
                    slot,
                    is_pitcher: false,
                    stats: BattingStats {
                        at_bat: 4,
                        hit: 1,
                        ..BattingStats::default()
                    },
                })
                .collect();
            batting.push(BattingLine {
                player_id: team.pitcher.id,
                name: team.pitcher.name.clone(),
                slot: 8,
                is_pitcher: true,
                stats: BattingStats {
                    at_bat: 3,
                    ..BattingStats::default()
                },
            });
            SideResult {
                team_id: team.id,
                batting,
                pitching: PitchingLine {
                    pitcher_id: team.pitcher.id,
                    name: team.pitcher.name.clone(),
                    stats: PitchingStats {
                        win: won as u32,
                        lose: lost as u32,
                        out_count: 27,
                        loss_score: allowed,
                        runs_allowed: allowed,
                        ..PitchingStats::default()
                    },
                },
                team: TeamSeason {
                    win: won as u32,
                    lose: lost as u32,
                    draw: (!won && !lost) as u32,
                    score: scored,
                    lose_score: allowed,
                    ..TeamSeason::default()
                },
            }
        };
        GameResult {
            record: GameRecord {
                teams: TopBottom::new(top.name.clone(), bottom.name.clone()),
                score: TopBottom::new(top_runs, bottom_runs),
                hits: TopBottom::new(8, 8),
                home_runs: TopBottom::default(),
                errors: TopBottom::default(),
                score_board: TopBottom::new(vec![top_runs], vec![bottom_runs]),
                hit_board: TopBottom::default(),
                out_board: TopBottom::default(),
                innings: vec![],
                walk_off: false,
                outcome,
                innings_played: 9,
            },
            sides: TopBottom::new(side(top, top_runs, bottom_runs), side(bottom, bottom_runs, top_runs)),
        }
    }

    fn seeded_league() -> (Database, Team, Team) {
        let db = test_db();
        db.start_season(1).unwrap();
        let ids = db.import_roster(&[roster("Tigers"), roster("Giants")]).unwrap();
        let top = db.load_team(ids[0], 1).unwrap();
        let bottom = db.load_team(ids[1], 1).unwrap();
        (db, top, bottom)
    }

    // ------------------------------------------------------------------
    // Schema / seasons
    // ------------------------------------------------------------------

    #[test]
    fn open_creates_tables() {
        let db = test_db();
        let conn = db.conn();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        for expected in [
            "batting_data",
            "current_data",
            "game_logs",
            "pitchers",
            "pitching_data",
            "players",
            "team_data",
            "teams",
        ] {
            assert!(tables.contains(&expected.to_string()), "missing table {expected}");
        }
    }

    #[test]
    fn start_season_closes_previous() {
        let db = test_db();
        assert_eq!(db.current_times().unwrap(), None);
        db.start_season(1).unwrap();
        assert_eq!(db.current_times().unwrap(), Some(1));
        db.start_season(1).unwrap();
        assert_eq!(db.current_times().unwrap(), Some(1));
        db.start_season(2).unwrap();
        assert_eq!(db.current_times().unwrap(), Some(2));
    }

    // ------------------------------------------------------------------
    // Rosters
    // ------------------------------------------------------------------

    #[test]
    fn import_and_load_team_round_trip() {
        let db = test_db();
        let ids = db.import_roster(&[roster("Tigers")]).unwrap();
        assert_eq!(db.find_team_id("Tigers").unwrap(), Some(ids[0]));
        assert_eq!(db.find_team_id("Carp").unwrap(), None);

        let team = db.load_team(ids[0], 1).unwrap();
        assert_eq!(team.name, "Tigers");
        assert_eq!(team.lineup.len(), 8);
        assert_eq!(team.lineup[4].position, Position::ShortStop);
        assert_eq!(team.pitcher.condition, Condition::Good);
        assert_eq!(team.season, TeamSeason::default());
    }

    #[test]
    fn reimport_updates_without_duplicates() {
        let db = test_db();
        let first = db.import_roster(&[roster("Tigers")]).unwrap();

        let mut updated = roster("Tigers");
        updated.tendencies.attack = 9.0;
        updated.players[0].power = 9.5;
        let second = db.import_roster(&[updated]).unwrap();
        assert_eq!(first, second);

        let team = db.load_team(second[0], 1).unwrap();
        assert_eq!(team.tendencies.attack, 9.0);
        assert_eq!(team.lineup[0].power, 9.5);
        assert_eq!(team.lineup.len() + team.bench.len(), 8);
    }

    #[test]
    fn load_missing_team_fails() {
        let db = test_db();
        assert!(db.load_team(42, 1).is_err());
    }

    #[test]
    fn load_team_with_illegal_lineup_fails() {
        let db = test_db();
        let mut short = roster("Short");
        short.players.truncate(5);
        let ids = db.import_roster(&[short]).unwrap();
        let err = db.load_team(ids[0], 1).unwrap_err();
        assert!(format!("{err:#}").contains("Short"));
    }

    // ------------------------------------------------------------------
    // Results
    // ------------------------------------------------------------------

    #[test]
    fn record_game_merges_stats() {
        let (db, top, bottom) = seeded_league();
        let result = result_for(&top, &bottom, 5, 3);
        db.record_game(1, &result).unwrap();
        db.record_game(1, &result).unwrap();

        let top = db.load_team(top.id, 1).unwrap();
        assert_eq!(top.season.win, 2);
        assert_eq!(top.season.win_continue, 2);
        assert_eq!(top.season.score, 10);
        assert_eq!(top.lineup[0].season.at_bat, 8);
        assert_eq!(top.pitcher.season.win, 2);
        assert_eq!(top.pitcher.batting.at_bat, 6);

        let bottom = db.load_team(bottom.id, 1).unwrap();
        assert_eq!(bottom.season.lose, 2);
        assert_eq!(bottom.season.win_continue, 0);
        assert_eq!(bottom.pitcher.season.loss_score, 10);

        // Other seasons are untouched.
        let next = db.load_team(top.id, 2).unwrap();
        assert_eq!(next.season, TeamSeason::default());
    }

    #[test]
    fn loss_resets_streak() {
        let (db, top, bottom) = seeded_league();
        db.record_game(1, &result_for(&top, &bottom, 5, 3)).unwrap();
        db.record_game(1, &result_for(&top, &bottom, 1, 3)).unwrap();
        let top = db.load_team(top.id, 1).unwrap();
        assert_eq!(top.season.win, 1);
        assert_eq!(top.season.win_continue, 0);
    }

    #[test]
    fn champion_follows_results() {
        let (db, top, bottom) = seeded_league();
        assert_eq!(db.champion(1).unwrap(), None);

        db.record_game(1, &result_for(&top, &bottom, 4, 2)).unwrap();
        let champ = db.champion(1).unwrap().unwrap();
        assert_eq!((champ.team_id, champ.win_continue), (top.id, 1));

        // Home win takes the title.
        db.record_game(1, &result_for(&top, &bottom, 1, 2)).unwrap();
        let champ = db.champion(1).unwrap().unwrap();
        assert_eq!((champ.team_id, champ.win_continue), (bottom.id, 1));

        // Home win by the holder extends the streak.
        db.record_game(1, &result_for(&top, &bottom, 0, 2)).unwrap();
        assert_eq!(db.champion(1).unwrap().unwrap().win_continue, 2);

        // Draw changes nothing.
        db.record_game(1, &result_for(&top, &bottom, 3, 3)).unwrap();
        let champ = db.champion(1).unwrap().unwrap();
        assert_eq!((champ.team_id, champ.win_continue), (bottom.id, 2));

        // Away win resets to 1 even for a repeat winner.
        db.record_game(1, &result_for(&bottom, &top, 6, 0)).unwrap();
        let champ = db.champion(1).unwrap().unwrap();
        assert_eq!((champ.team_id, champ.win_continue), (bottom.id, 1));
    }

    #[test]
    fn record_game_requires_started_season() {
        let db = test_db();
        let ids = db.import_roster(&[roster("Tigers"), roster("Giants")]).unwrap();
        let top = db.load_team(ids[0], 3).unwrap();
        let bottom = db.load_team(ids[1], 3).unwrap();
        assert!(db.record_game(3, &result_for(&top, &bottom, 2, 1)).is_err());
        // The failed transaction left nothing behind.
        assert!(db.game_logs(3, 10).unwrap().is_empty());
        assert_eq!(db.load_team(ids[0], 3).unwrap().season, TeamSeason::default());
    }

    #[test]
    fn game_logs_newest_first() {
        let (db, top, bottom) = seeded_league();
        let first = db.record_game(1, &result_for(&top, &bottom, 1, 0)).unwrap();
        let second = db.record_game(1, &result_for(&top, &bottom, 2, 5)).unwrap();

        let logs = db.game_logs(1, 10).unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].id, second);
        assert_eq!(logs[1].id, first);
        assert_eq!(logs[0].outcome, Outcome::Bottom);
        assert_eq!(logs[0].score, TopBottom::new(2, 5));
        assert_eq!(logs[0].teams.top, "Tigers");
        assert_eq!(logs[0].line_score.bottom, vec![5]);
        assert!(!logs[0].played_at.is_empty());

        assert_eq!(db.game_logs(1, 1).unwrap().len(), 1);
        assert!(db.game_logs(2, 10).unwrap().is_empty());
    }

    #[test]
    fn standings_include_idle_teams() {
        let (db, top, bottom) = seeded_league();
        db.import_roster(&[roster("Carp")]).unwrap();
        db.record_game(1, &result_for(&top, &bottom, 7, 2)).unwrap();

        let table = db.standings(1).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table[0].season.win, 1);
        assert_eq!(table[0].run_differential(), 5);
        assert_eq!(table[1].season.lose, 1);
        assert_eq!(table[2].name, "Carp");
        assert_eq!(table[2].season, TeamSeason::default());
    }
}

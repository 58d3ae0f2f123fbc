// Roster import from CSV.
//
// Three files: teams (with manager tendencies), position players and
// pitchers. Players and pitchers reference their team by name.

use serde::Deserialize;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

use super::position::{Condition, Position};
use super::team::{Batter, BattingStats, Pitcher, PitchingStats, RosterError, Team, TeamSeason, Tendencies};
use crate::config::{Config, DataPaths};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct TeamRow {
    pub name: String,
    pub owner: String,
    pub tendencies: Tendencies,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerRow {
    pub team: String,
    pub name: String,
    pub order: u32,
    pub position: Position,
    pub condition: Condition,
    pub power: f64,
    pub meet: f64,
    pub run: f64,
    pub defense: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PitcherRow {
    pub team: String,
    pub name: String,
    pub order: u32,
    pub condition: Condition,
    pub speed: f64,
    pub change: f64,
    pub control: f64,
    pub defense: f64,
}

/// One team's complete roster, ready to be written to the database.
#[derive(Debug, Clone, PartialEq)]
pub struct TeamImport {
    pub name: String,
    pub owner: String,
    pub tendencies: Tendencies,
    pub players: Vec<PlayerRow>,
    pub pitchers: Vec<PitcherRow>,
}

impl TeamImport {
    /// Build the in-memory team this roster would produce. Ids are left at 0.
    pub fn to_team(&self) -> Result<Team, RosterError> {
        let players = self
            .players
            .iter()
            .map(|p| Batter {
                id: 0,
                name: p.name.clone(),
                order: p.order,
                position: p.position,
                condition: p.condition,
                power: p.power,
                meet: p.meet,
                run: p.run,
                defense: p.defense,
                season: BattingStats::default(),
            })
            .collect();
        let pitchers = self
            .pitchers
            .iter()
            .map(|p| Pitcher {
                id: 0,
                name: p.name.clone(),
                order: p.order,
                condition: p.condition,
                speed: p.speed,
                change: p.change,
                control: p.control,
                defense: p.defense,
                season: PitchingStats::default(),
                batting: BattingStats::default(),
            })
            .collect();
        Team::new(
            0,
            &self.name,
            &self.owner,
            self.tendencies,
            players,
            pitchers,
            TeamSeason::default(),
        )
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Roster(#[from] RosterError),
}

// ---------------------------------------------------------------------------
// Raw CSV serde structs (private)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawTeam {
    name: String,
    #[serde(default)]
    owner: String,
    type_attack: f64,
    type_bunt: f64,
    type_steal: f64,
    type_mind: f64,
}

#[derive(Debug, Deserialize)]
struct RawPlayer {
    team: String,
    name: String,
    order: u32,
    position: String,
    condition: i64,
    power: f64,
    meet: f64,
    run: f64,
    defense: f64,
}

#[derive(Debug, Deserialize)]
struct RawPitcher {
    team: String,
    name: String,
    order: u32,
    condition: i64,
    speed: f64,
    change: f64,
    control: f64,
    defense: f64,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn all_finite(values: &[f64]) -> bool {
    values.iter().all(|v| v.is_finite())
}

fn parse_condition(name: &str, level: i64) -> Result<Condition, ImportError> {
    Condition::from_level(level).ok_or_else(|| {
        ImportError::Validation(format!(
            "'{name}' has condition {level}, expected 1 through 5"
        ))
    })
}

// ---------------------------------------------------------------------------
// Reader-based loaders (private, enable testing without temp files)
// ---------------------------------------------------------------------------

fn load_teams_from_reader<R: Read>(rdr: R) -> Result<Vec<TeamRow>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut teams = Vec::new();
    for result in reader.deserialize::<RawTeam>() {
        match result {
            Ok(raw) => {
                let values = [raw.type_attack, raw.type_bunt, raw.type_steal, raw.type_mind];
                if !all_finite(&values) {
                    warn!("skipping team '{}': non-finite tendency value", raw.name.trim());
                    continue;
                }
                teams.push(TeamRow {
                    name: raw.name.trim().to_string(),
                    owner: raw.owner.trim().to_string(),
                    tendencies: Tendencies {
                        attack: raw.type_attack,
                        bunt: raw.type_bunt,
                        steal: raw.type_steal,
                        mind: raw.type_mind,
                    },
                });
            }
            Err(e) => {
                warn!("skipping malformed team row: {}", e);
            }
        }
    }
    Ok(teams)
}

fn load_players_from_reader<R: Read>(rdr: R) -> Result<Vec<PlayerRow>, ImportError> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut players = Vec::new();
    for result in reader.deserialize::<RawPlayer>() {
        let raw = match result {
            Ok(raw) => raw,
            Err(e) => {
                warn!("skipping malformed player row: {}", e);
                continue;
            }
        };
        let name = raw.name.trim().to_string();
        if !all_finite(&[raw.power, raw.meet, raw.run, raw.defense]) {
            warn!("skipping player '{}': non-finite skill value", name);
            continue;
        }
        let position = Position::from_str_pos(&raw.position).ok_or_else(|| {
            ImportError::Validation(format!("'{name}' has unknown position '{}'", raw.position))
        })?;
        let condition = parse_condition(&name, raw.condition)?;
        players.push(PlayerRow {
            team: raw.team.trim().to_string(),
            name,
            order: raw.order,
            position,
            condition,
            power: raw.power,
            meet: raw.meet,
            run: raw.run,
            defense: raw.defense,
        });
    }
    Ok(players)
}

fn load_pitchers_from_reader<R: Read>(rdr: R) -> Result<Vec<PitcherRow>, ImportError> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut pitchers = Vec::new();
    for result in reader.deserialize::<RawPitcher>() {
        let raw = match result {
            Ok(raw) => raw,
            Err(e) => {
                warn!("skipping malformed pitcher row: {}", e);
                continue;
            }
        };
        let name = raw.name.trim().to_string();
        if !all_finite(&[raw.speed, raw.change, raw.control, raw.defense]) {
            warn!("skipping pitcher '{}': non-finite skill value", name);
            continue;
        }
        let condition = parse_condition(&name, raw.condition)?;
        pitchers.push(PitcherRow {
            team: raw.team.trim().to_string(),
            name,
            order: raw.order,
            condition,
            speed: raw.speed,
            change: raw.change,
            control: raw.control,
            defense: raw.defense,
        });
    }
    Ok(pitchers)
}

/// Group players and pitchers under their teams and check every roster.
fn assemble(
    teams: Vec<TeamRow>,
    players: Vec<PlayerRow>,
    pitchers: Vec<PitcherRow>,
) -> Result<Vec<TeamImport>, ImportError> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut imports: Vec<TeamImport> = Vec::with_capacity(teams.len());
    for team in teams {
        if index.contains_key(&team.name) {
            return Err(ImportError::Validation(format!(
                "team '{}' is listed twice",
                team.name
            )));
        }
        index.insert(team.name.clone(), imports.len());
        imports.push(TeamImport {
            name: team.name,
            owner: team.owner,
            tendencies: team.tendencies,
            players: Vec::new(),
            pitchers: Vec::new(),
        });
    }

    for player in players {
        let Some(&idx) = index.get(&player.team) else {
            return Err(ImportError::Validation(format!(
                "player '{}' belongs to unknown team '{}'",
                player.name, player.team
            )));
        };
        imports[idx].players.push(player);
    }
    for pitcher in pitchers {
        let Some(&idx) = index.get(&pitcher.team) else {
            return Err(ImportError::Validation(format!(
                "pitcher '{}' belongs to unknown team '{}'",
                pitcher.name, pitcher.team
            )));
        };
        imports[idx].pitchers.push(pitcher);
    }

    for import in &imports {
        import.to_team()?;
    }
    Ok(imports)
}

// ---------------------------------------------------------------------------
// Public path-based loaders
// ---------------------------------------------------------------------------

fn open(path: &Path) -> Result<std::fs::File, ImportError> {
    std::fs::File::open(path).map_err(|e| ImportError::Io {
        path: path.display().to_string(),
        source: e,
    })
}

pub fn load_teams(path: &Path) -> Result<Vec<TeamRow>, ImportError> {
    load_teams_from_reader(open(path)?).map_err(|e| ImportError::Csv {
        path: path.display().to_string(),
        source: e,
    })
}

pub fn load_players(path: &Path) -> Result<Vec<PlayerRow>, ImportError> {
    load_players_from_reader(open(path)?)
}

pub fn load_pitchers(path: &Path) -> Result<Vec<PitcherRow>, ImportError> {
    load_pitchers_from_reader(open(path)?)
}

/// Load every roster using the paths from the config.
pub fn load_all(config: &Config) -> Result<Vec<TeamImport>, ImportError> {
    load_all_from_paths(&config.data_paths)
}

/// Load every roster from explicit paths. Exposed for testing and flexibility.
pub fn load_all_from_paths(paths: &DataPaths) -> Result<Vec<TeamImport>, ImportError> {
    let teams = load_teams(Path::new(&paths.teams))?;
    let players = load_players(Path::new(&paths.players))?;
    let pitchers = load_pitchers(Path::new(&paths.pitchers))?;

    if teams.is_empty() {
        return Err(ImportError::Validation(
            "team CSV produced zero valid rows".into(),
        ));
    }

    let imports = assemble(teams, players, pitchers)?;
    info!("loaded {} team rosters", imports.len());
    Ok(imports)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const TEAMS: &str = "\
name,owner,type_attack,type_bunt,type_steal,type_mind
Tigers,alice,7,3,6,5
Giants,bob,4,6,2,8";

    fn players_csv(team: &str) -> String {
        let positions = ["C", "1B", "2B", "3B", "SS", "LF", "CF", "RF"];
        let mut csv = String::from("team,name,order,position,condition,power,meet,run,defense\n");
        for (i, pos) in positions.iter().enumerate() {
            csv.push_str(&format!("{team},{team} {pos},{},{pos},3,5,5,5,5\n", i + 1));
        }
        csv
    }

    #[test]
    fn teams_csv_roundtrip() {
        let teams = load_teams_from_reader(TEAMS.as_bytes()).unwrap();
        assert_eq!(teams.len(), 2);
        assert_eq!(teams[0].name, "Tigers");
        assert_eq!(teams[0].owner, "alice");
        assert_eq!(teams[0].tendencies.attack, 7.0);
        assert_eq!(teams[1].tendencies.mind, 8.0);
    }

    #[test]
    fn malformed_team_rows_are_skipped() {
        let csv = "\
name,owner,type_attack,type_bunt,type_steal,type_mind
Tigers,alice,7,3,6,5
Broken,carol,not-a-number,3,6,5
Giants,bob,4,6,2,8";
        let teams = load_teams_from_reader(csv.as_bytes()).unwrap();
        let names: Vec<&str> = teams.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Tigers", "Giants"]);
    }

    #[test]
    fn players_accept_scorebook_positions() {
        let csv = "\
team,name,order,position,condition,power,meet,run,defense
Tigers,Sato,1,遊,4,6.5,7,8,6
Tigers,Kato,10,補欠,3,4,4,4,4";
        let players = load_players_from_reader(csv.as_bytes()).unwrap();
        assert_eq!(players[0].position, Position::ShortStop);
        assert_eq!(players[0].condition, Condition::Good);
        assert_eq!(players[1].position, Position::Bench);
    }

    #[test]
    fn unknown_position_is_rejected() {
        let csv = "\
team,name,order,position,condition,power,meet,run,defense
Tigers,Sato,1,DH,3,5,5,5,5";
        let err = load_players_from_reader(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, ImportError::Validation(msg) if msg.contains("DH")));
    }

    #[test]
    fn condition_out_of_range_is_rejected() {
        let csv = "\
team,name,order,condition,speed,change,control,defense
Tigers,Ace,1,6,7,6,5,4";
        let err = load_pitchers_from_reader(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, ImportError::Validation(_)));
    }

    #[test]
    fn malformed_player_rows_are_skipped() {
        let csv = "\
team,name,order,position,condition,power,meet,run,defense
Tigers,Sato,1,SS,3,5,5,5,5
Tigers,Broken,two,SS,3,5,5,5,5";
        let players = load_players_from_reader(csv.as_bytes()).unwrap();
        assert_eq!(players.len(), 1);
    }

    #[test]
    fn assemble_groups_by_team() {
        let teams = load_teams_from_reader(TEAMS.as_bytes()).unwrap();
        let mut players = load_players_from_reader(players_csv("Tigers").as_bytes()).unwrap();
        players.extend(load_players_from_reader(players_csv("Giants").as_bytes()).unwrap());
        let pitchers = load_pitchers_from_reader(
            "team,name,order,condition,speed,change,control,defense\n\
             Tigers,Ace,1,3,7,6,5,4\n\
             Giants,Lefty,1,4,5,7,6,3\n"
                .as_bytes(),
        )
        .unwrap();

        let imports = assemble(teams, players, pitchers).unwrap();
        assert_eq!(imports.len(), 2);
        assert_eq!(imports[0].players.len(), 8);
        assert_eq!(imports[1].pitchers[0].name, "Lefty");
        let team = imports[0].to_team().unwrap();
        assert_eq!(team.pitcher.name, "Ace");
    }

    #[test]
    fn unknown_team_reference_is_rejected() {
        let teams = load_teams_from_reader(TEAMS.as_bytes()).unwrap();
        let players = load_players_from_reader(players_csv("Carp").as_bytes()).unwrap();
        let err = assemble(teams, players, vec![]).unwrap_err();
        assert!(matches!(err, ImportError::Validation(msg) if msg.contains("Carp")));
    }

    #[test]
    fn incomplete_roster_is_rejected() {
        let teams = load_teams_from_reader(TEAMS.as_bytes()).unwrap();
        let players = load_players_from_reader(players_csv("Tigers").as_bytes()).unwrap();
        // Giants have nobody.
        let err = assemble(teams, players, vec![]).unwrap_err();
        assert!(matches!(err, ImportError::Roster(_)));
    }
}

// In-memory teams, batters and pitchers for one game.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::position::{Condition, Position, FIELD_POSITIONS};

/// Number of batting-order slots. Slots 0..=7 are position players, the last
/// slot belongs to the pitcher.
pub const LINEUP_SLOTS: usize = 9;

/// Batting-order slot reserved for the pitcher.
pub const PITCHER_SLOT: usize = 8;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RosterError {
    #[error("team {team} has only {count} starters, 8 are required")]
    ShortLineup { team: String, count: usize },

    #[error("team {team} starts {player} at {position}, which is not a lineup position")]
    InvalidStarter {
        team: String,
        player: String,
        position: Position,
    },

    #[error("team {team} has more than one starter at {position}")]
    DuplicatePosition { team: String, position: Position },

    #[error("team {team} has no starter at {position}")]
    MissingPosition { team: String, position: Position },

    #[error("team {team} has no active pitcher")]
    MissingPitcher { team: String },
}

// ---------------------------------------------------------------------------
// Tendencies
// ---------------------------------------------------------------------------

/// Manager tendencies, each on a 0-10 scale with 5 as neutral.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tendencies {
    pub attack: f64,
    pub bunt: f64,
    pub steal: f64,
    pub mind: f64,
}

impl Default for Tendencies {
    fn default() -> Self {
        Tendencies {
            attack: 5.0,
            bunt: 5.0,
            steal: 5.0,
            mind: 5.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Stat lines
// ---------------------------------------------------------------------------

/// Counting stats for a hitter, used both for season totals and for the
/// per-game deltas produced by the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattingStats {
    pub at_bat: u32,
    pub hit: u32,
    pub double: u32,
    pub triple: u32,
    pub hr: u32,
    /// Runs batted in.
    pub bat_score: u32,
    pub four_ball: u32,
    pub strike_out: u32,
    pub bunt: u32,
    pub sacrifice_fly: u32,
    pub steal: u32,
    pub steal_failed: u32,
    pub error: u32,
}

impl BattingStats {
    pub fn merge(&mut self, other: &BattingStats) {
        self.at_bat += other.at_bat;
        self.hit += other.hit;
        self.double += other.double;
        self.triple += other.triple;
        self.hr += other.hr;
        self.bat_score += other.bat_score;
        self.four_ball += other.four_ball;
        self.strike_out += other.strike_out;
        self.bunt += other.bunt;
        self.sacrifice_fly += other.sacrifice_fly;
        self.steal += other.steal;
        self.steal_failed += other.steal_failed;
        self.error += other.error;
    }

    /// Batting average, or 0.0 before the first at-bat.
    pub fn average(&self) -> f64 {
        if self.at_bat == 0 {
            return 0.0;
        }
        self.hit as f64 / self.at_bat as f64
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PitchingStats {
    pub win: u32,
    pub lose: u32,
    pub strike_out: u32,
    pub four_ball: u32,
    pub hit: u32,
    pub hr: u32,
    pub wild_pitch: u32,
    /// Outs recorded while on the mound (three per inning pitched).
    pub out_count: u32,
    /// Earned runs: runs allowed minus those caused by fielding errors.
    pub loss_score: u32,
    pub runs_allowed: u32,
}

impl PitchingStats {
    pub fn merge(&mut self, other: &PitchingStats) {
        self.win += other.win;
        self.lose += other.lose;
        self.strike_out += other.strike_out;
        self.four_ball += other.four_ball;
        self.hit += other.hit;
        self.hr += other.hr;
        self.wild_pitch += other.wild_pitch;
        self.out_count += other.out_count;
        self.loss_score += other.loss_score;
        self.runs_allowed += other.runs_allowed;
    }

    /// Earned run average over nine innings, or 0.0 with no outs recorded.
    pub fn era(&self) -> f64 {
        if self.out_count == 0 {
            return 0.0;
        }
        self.loss_score as f64 * 27.0 / self.out_count as f64
    }
}

/// Season aggregates for a team.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamSeason {
    pub win: u32,
    pub lose: u32,
    pub draw: u32,
    /// Current consecutive-win streak.
    pub win_continue: u32,
    pub score: u32,
    pub lose_score: u32,
    pub hr: u32,
    pub steal: u32,
    /// Strikeouts recorded by the team's pitchers.
    pub strike_out: u32,
    pub error: u32,
}

impl TeamSeason {
    /// Add a game's totals. The streak is not additive: a win extends it,
    /// anything else resets it.
    pub fn merge(&mut self, other: &TeamSeason) {
        self.win += other.win;
        self.lose += other.lose;
        self.draw += other.draw;
        self.win_continue = if other.win > 0 {
            self.win_continue + other.win
        } else {
            0
        };
        self.score += other.score;
        self.lose_score += other.lose_score;
        self.hr += other.hr;
        self.steal += other.steal;
        self.strike_out += other.strike_out;
        self.error += other.error;
    }
}

// ---------------------------------------------------------------------------
// Players
// ---------------------------------------------------------------------------

/// A position player as loaded for one game.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batter {
    pub id: i64,
    pub name: String,
    /// Batting order as stored (1-based); reserves sort after the starters.
    pub order: u32,
    pub position: Position,
    pub condition: Condition,
    pub power: f64,
    pub meet: f64,
    pub run: f64,
    pub defense: f64,
    pub season: BattingStats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pitcher {
    pub id: i64,
    pub name: String,
    /// Rotation order; the lowest order is the active pitcher.
    pub order: u32,
    pub condition: Condition,
    pub speed: f64,
    pub change: f64,
    pub control: f64,
    pub defense: f64,
    pub season: PitchingStats,
    pub batting: BattingStats,
}

/// Whoever stands at the plate: a position player, or the pitcher hitting
/// for himself.
#[derive(Debug, Clone, Copy)]
pub enum Participant<'a> {
    Fielder(&'a Batter),
    Pitcher(&'a Pitcher),
}

impl<'a> Participant<'a> {
    pub fn name(&self) -> &'a str {
        match self {
            Participant::Fielder(b) => &b.name,
            Participant::Pitcher(p) => &p.name,
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            Participant::Fielder(b) => b.id,
            Participant::Pitcher(p) => p.id,
        }
    }

    pub fn is_pitcher(&self) -> bool {
        matches!(self, Participant::Pitcher(_))
    }
}

// ---------------------------------------------------------------------------
// Team
// ---------------------------------------------------------------------------

/// A validated team ready to take the field.
///
/// Deserializing goes through `Team::new`, so a serialized team is
/// revalidated and its fielding assignments rebuilt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "TeamData")]
pub struct Team {
    pub id: i64,
    pub name: String,
    pub owner: String,
    pub tendencies: Tendencies,
    /// The eight starting position players in batting order.
    pub lineup: Vec<Batter>,
    pub bench: Vec<Batter>,
    /// The active pitcher. The rest of the staff is not used in a game.
    pub pitcher: Pitcher,
    pub staff: Vec<Pitcher>,
    pub season: TeamSeason,
    /// Index into `lineup` for each entry of `FIELD_POSITIONS`.
    #[serde(skip)]
    defenders: [usize; 8],
}

/// Serialized shape of a `Team`, without the derived fielding index.
#[derive(Deserialize)]
struct TeamData {
    id: i64,
    name: String,
    owner: String,
    tendencies: Tendencies,
    lineup: Vec<Batter>,
    bench: Vec<Batter>,
    pitcher: Pitcher,
    staff: Vec<Pitcher>,
    season: TeamSeason,
}

impl TryFrom<TeamData> for Team {
    type Error = RosterError;

    fn try_from(data: TeamData) -> Result<Self, Self::Error> {
        let mut players = data.lineup;
        players.extend(data.bench);
        let mut pitchers = vec![data.pitcher];
        pitchers.extend(data.staff);
        Team::new(
            data.id,
            &data.name,
            &data.owner,
            data.tendencies,
            players,
            pitchers,
            data.season,
        )
    }
}

impl Team {
    /// Build a team from its players and pitchers.
    ///
    /// Players are sorted by batting order; the first eight are the starters
    /// and must cover every fielding position exactly once. Pitchers are
    /// sorted by rotation order and the first one takes the mound.
    pub fn new(
        id: i64,
        name: &str,
        owner: &str,
        tendencies: Tendencies,
        mut players: Vec<Batter>,
        mut pitchers: Vec<Pitcher>,
        season: TeamSeason,
    ) -> Result<Self, RosterError> {
        players.sort_by_key(|p| p.order);
        pitchers.sort_by_key(|p| p.order);

        if players.len() < FIELD_POSITIONS.len() {
            return Err(RosterError::ShortLineup {
                team: name.to_string(),
                count: players.len(),
            });
        }
        let bench = players.split_off(FIELD_POSITIONS.len());
        let lineup = players;

        let mut defenders: [Option<usize>; 8] = [None; 8];
        for (idx, batter) in lineup.iter().enumerate() {
            if !batter.position.is_lineup_position() {
                return Err(RosterError::InvalidStarter {
                    team: name.to_string(),
                    player: batter.name.clone(),
                    position: batter.position,
                });
            }
            let Some(slot) = FIELD_POSITIONS.iter().position(|&p| p == batter.position) else {
                continue;
            };
            if defenders[slot].is_some() {
                return Err(RosterError::DuplicatePosition {
                    team: name.to_string(),
                    position: batter.position,
                });
            }
            defenders[slot] = Some(idx);
        }

        let mut resolved = [0usize; 8];
        for (slot, found) in defenders.iter().enumerate() {
            match found {
                Some(idx) => resolved[slot] = *idx,
                None => {
                    return Err(RosterError::MissingPosition {
                        team: name.to_string(),
                        position: FIELD_POSITIONS[slot],
                    })
                }
            }
        }

        if pitchers.is_empty() {
            return Err(RosterError::MissingPitcher {
                team: name.to_string(),
            });
        }
        let staff = pitchers.split_off(1);
        let pitcher = pitchers.remove(0);

        Ok(Team {
            id,
            name: name.to_string(),
            owner: owner.to_string(),
            tendencies,
            lineup,
            bench,
            pitcher,
            staff,
            season,
            defenders: resolved,
        })
    }

    /// The participant due up in the given batting-order slot.
    ///
    /// Slot 8 is the pitcher. Slots wrap, so callers may pass a raw counter.
    pub fn batter_at(&self, slot: usize) -> Participant<'_> {
        let slot = slot % LINEUP_SLOTS;
        if slot == PITCHER_SLOT {
            Participant::Pitcher(&self.pitcher)
        } else {
            Participant::Fielder(&self.lineup[slot])
        }
    }

    /// The fielder covering a position, as a participant (the pitcher covers
    /// `Position::Pitcher`).
    ///
    /// Every fielding position is guaranteed by `Team::new`; asking for the
    /// bench is a contract violation and panics.
    pub fn fielder(&self, position: Position) -> Participant<'_> {
        if position == Position::Pitcher {
            return Participant::Pitcher(&self.pitcher);
        }
        let slot = FIELD_POSITIONS
            .iter()
            .position(|&p| p == position)
            .unwrap_or_else(|| panic!("no fielder covers {position}"));
        Participant::Fielder(&self.lineup[self.defenders[slot]])
    }

    /// Batting-order slot of whoever covers the position.
    pub fn slot_of(&self, position: Position) -> usize {
        if position == Position::Pitcher {
            return PITCHER_SLOT;
        }
        let slot = FIELD_POSITIONS
            .iter()
            .position(|&p| p == position)
            .unwrap_or_else(|| panic!("no fielder covers {position}"));
        self.defenders[slot]
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Helper: a batter with neutral skills at the given order and position.
    pub(crate) fn batter(id: i64, order: u32, position: Position) -> Batter {
        Batter {
            id,
            name: format!("Batter {order}"),
            order,
            position,
            condition: Condition::Normal,
            power: 5.0,
            meet: 5.0,
            run: 5.0,
            defense: 5.0,
            season: BattingStats::default(),
        }
    }

    pub(crate) fn pitcher(id: i64, order: u32) -> Pitcher {
        Pitcher {
            id,
            name: format!("Pitcher {order}"),
            order,
            condition: Condition::Normal,
            speed: 5.0,
            change: 5.0,
            control: 5.0,
            defense: 5.0,
            season: PitchingStats::default(),
            batting: BattingStats::default(),
        }
    }

    /// Helper: a valid nine-man team with neutral tendencies.
    pub(crate) fn sample_team(id: i64, name: &str) -> Team {
        let players = FIELD_POSITIONS
            .iter()
            .enumerate()
            .map(|(i, &pos)| batter(id * 100 + i as i64, i as u32 + 1, pos))
            .collect();
        Team::new(
            id,
            name,
            "owner",
            Tendencies::default(),
            players,
            vec![pitcher(id * 100 + 50, 13)],
            TeamSeason::default(),
        )
        .expect("sample team should be valid")
    }

    #[test]
    fn builds_lineup_in_batting_order() {
        let mut players: Vec<Batter> = FIELD_POSITIONS
            .iter()
            .enumerate()
            .map(|(i, &pos)| batter(i as i64, i as u32 + 1, pos))
            .collect();
        players.reverse();
        players.push(batter(99, 9, Position::Bench));

        let team = Team::new(
            1,
            "Tigers",
            "owner",
            Tendencies::default(),
            players,
            vec![pitcher(50, 14), pitcher(51, 13)],
            TeamSeason::default(),
        )
        .unwrap();

        let orders: Vec<u32> = team.lineup.iter().map(|b| b.order).collect();
        assert_eq!(orders, vec![1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(team.bench.len(), 1);
        assert_eq!(team.pitcher.order, 13, "lowest rotation order takes the mound");
        assert_eq!(team.staff.len(), 1);
    }

    #[test]
    fn slot_eight_is_the_pitcher() {
        let team = sample_team(1, "Tigers");
        assert!(team.batter_at(PITCHER_SLOT).is_pitcher());
        assert!(!team.batter_at(0).is_pitcher());
        assert_eq!(team.batter_at(9).name(), team.batter_at(0).name());
    }

    #[test]
    fn fielder_lookup_covers_every_position() {
        let team = sample_team(1, "Tigers");
        for pos in FIELD_POSITIONS {
            match team.fielder(pos) {
                Participant::Fielder(b) => assert_eq!(b.position, pos),
                Participant::Pitcher(_) => panic!("{pos} should be a position player"),
            }
            let slot = team.slot_of(pos);
            assert_eq!(team.lineup[slot].position, pos);
        }
        assert!(team.fielder(Position::Pitcher).is_pitcher());
        assert_eq!(team.slot_of(Position::Pitcher), PITCHER_SLOT);
    }

    #[test]
    fn rejects_short_lineup() {
        let players = vec![batter(1, 1, Position::Catcher)];
        let err = Team::new(1, "Short", "o", Tendencies::default(), players, vec![pitcher(2, 1)], TeamSeason::default())
            .unwrap_err();
        assert_eq!(
            err,
            RosterError::ShortLineup {
                team: "Short".into(),
                count: 1
            }
        );
    }

    #[test]
    fn rejects_duplicate_position() {
        let mut players: Vec<Batter> = FIELD_POSITIONS
            .iter()
            .enumerate()
            .map(|(i, &pos)| batter(i as i64, i as u32 + 1, pos))
            .collect();
        players[7].position = Position::Catcher;
        let err = Team::new(1, "Dup", "o", Tendencies::default(), players, vec![pitcher(2, 1)], TeamSeason::default())
            .unwrap_err();
        assert_eq!(
            err,
            RosterError::DuplicatePosition {
                team: "Dup".into(),
                position: Position::Catcher
            }
        );
    }

    #[test]
    fn rejects_bench_player_in_lineup() {
        let mut players: Vec<Batter> = FIELD_POSITIONS
            .iter()
            .enumerate()
            .map(|(i, &pos)| batter(i as i64, i as u32 + 1, pos))
            .collect();
        players[3].position = Position::Bench;
        let err = Team::new(1, "Bench", "o", Tendencies::default(), players, vec![pitcher(2, 1)], TeamSeason::default())
            .unwrap_err();
        assert!(matches!(err, RosterError::InvalidStarter { .. }));
    }

    #[test]
    fn rejects_missing_pitcher() {
        let players: Vec<Batter> = FIELD_POSITIONS
            .iter()
            .enumerate()
            .map(|(i, &pos)| batter(i as i64, i as u32 + 1, pos))
            .collect();
        let err = Team::new(1, "NoArm", "o", Tendencies::default(), players, vec![], TeamSeason::default())
            .unwrap_err();
        assert_eq!(err, RosterError::MissingPitcher { team: "NoArm".into() });
    }

    #[test]
    fn deserialized_team_keeps_fielding_assignments() {
        let team = sample_team(1, "Tigers");
        let json = serde_json::to_string(&team).unwrap();
        let back: Team = serde_json::from_str(&json).unwrap();
        for pos in FIELD_POSITIONS {
            assert_eq!(back.slot_of(pos), team.slot_of(pos), "{pos}");
            assert_eq!(back.fielder(pos).name(), team.fielder(pos).name());
        }
        assert_eq!(back.pitcher.name, team.pitcher.name);
    }

    #[test]
    fn deserializing_an_illegal_lineup_fails() {
        let mut value = serde_json::to_value(sample_team(1, "Tigers")).unwrap();
        value["lineup"][4]["position"] = serde_json::json!("Catcher");
        let err = serde_json::from_value::<Team>(value).unwrap_err();
        assert!(err.to_string().contains("more than one starter"), "{err}");
    }

    #[test]
    fn team_season_merge_tracks_streak() {
        let mut season = TeamSeason {
            win: 3,
            win_continue: 2,
            ..TeamSeason::default()
        };
        season.merge(&TeamSeason {
            win: 1,
            score: 5,
            ..TeamSeason::default()
        });
        assert_eq!(season.win, 4);
        assert_eq!(season.win_continue, 3);

        season.merge(&TeamSeason {
            lose: 1,
            ..TeamSeason::default()
        });
        assert_eq!(season.win_continue, 0);
        assert_eq!(season.score, 5);
    }

    #[test]
    fn rate_stats_handle_empty_lines() {
        assert_eq!(BattingStats::default().average(), 0.0);
        assert_eq!(PitchingStats::default().era(), 0.0);
        let line = PitchingStats {
            out_count: 27,
            loss_score: 3,
            ..PitchingStats::default()
        };
        assert!((line.era() - 3.0).abs() < f64::EPSILON);
    }
}

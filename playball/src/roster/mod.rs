pub mod import;
pub mod position;
pub mod team;

pub use position::{Condition, Position, FIELD_POSITIONS};
pub use team::{
    Batter, BattingStats, Participant, Pitcher, PitchingStats, RosterError, Team, TeamSeason,
    Tendencies, LINEUP_SLOTS, PITCHER_SLOT,
};

// Fielding positions and player condition.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Fielding positions. `Bench` marks reserves that do not start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Position {
    Catcher,
    FirstBase,
    SecondBase,
    ThirdBase,
    ShortStop,
    LeftField,
    CenterField,
    RightField,
    Pitcher,
    Bench,
}

/// The eight positions a starting lineup must fill besides the pitcher,
/// in scorebook order (2 through 9).
pub const FIELD_POSITIONS: [Position; 8] = [
    Position::Catcher,
    Position::FirstBase,
    Position::SecondBase,
    Position::ThirdBase,
    Position::ShortStop,
    Position::LeftField,
    Position::CenterField,
    Position::RightField,
];

impl Position {
    /// Parse a position string into a Position enum.
    ///
    /// Accepts the usual abbreviations ("C", "1B", "SS", "BE", ...) as well
    /// as the single-character scorebook marks used by the league's legacy
    /// data ("捕", "一", "遊", "補欠", ...).
    pub fn from_str_pos(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "C" | "捕" => Some(Position::Catcher),
            "1B" | "一" => Some(Position::FirstBase),
            "2B" | "二" => Some(Position::SecondBase),
            "3B" | "三" => Some(Position::ThirdBase),
            "SS" | "遊" => Some(Position::ShortStop),
            "LF" | "左" => Some(Position::LeftField),
            "CF" | "中" => Some(Position::CenterField),
            "RF" | "右" => Some(Position::RightField),
            "P" | "投" => Some(Position::Pitcher),
            "BE" | "BN" | "補欠" => Some(Position::Bench),
            _ => None,
        }
    }

    /// Return the display string for this position.
    pub fn display_str(&self) -> &'static str {
        match self {
            Position::Catcher => "C",
            Position::FirstBase => "1B",
            Position::SecondBase => "2B",
            Position::ThirdBase => "3B",
            Position::ShortStop => "SS",
            Position::LeftField => "LF",
            Position::CenterField => "CF",
            Position::RightField => "RF",
            Position::Pitcher => "P",
            Position::Bench => "BE",
        }
    }

    /// Whether a ball hit to this position stays in the infield.
    pub fn is_infield(&self) -> bool {
        matches!(
            self,
            Position::Pitcher
                | Position::Catcher
                | Position::FirstBase
                | Position::SecondBase
                | Position::ThirdBase
                | Position::ShortStop
        )
    }

    pub fn is_outfield(&self) -> bool {
        matches!(
            self,
            Position::LeftField | Position::CenterField | Position::RightField
        )
    }

    /// Whether a starter may be listed at this position in the batting order.
    pub fn is_lineup_position(&self) -> bool {
        !matches!(self, Position::Pitcher | Position::Bench)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_str())
    }
}

// ---------------------------------------------------------------------------
// Condition
// ---------------------------------------------------------------------------

/// A player's morale going into the game. Level 3 is neutral; the mental
/// value used during play is derived from `level() - 5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Condition {
    Awful,
    Bad,
    #[default]
    Normal,
    Good,
    Excellent,
}

impl Condition {
    pub fn from_level(level: i64) -> Option<Self> {
        match level {
            1 => Some(Condition::Awful),
            2 => Some(Condition::Bad),
            3 => Some(Condition::Normal),
            4 => Some(Condition::Good),
            5 => Some(Condition::Excellent),
            _ => None,
        }
    }

    pub fn level(&self) -> i32 {
        match self {
            Condition::Awful => 1,
            Condition::Bad => 2,
            Condition::Normal => 3,
            Condition::Good => 4,
            Condition::Excellent => 5,
        }
    }
}

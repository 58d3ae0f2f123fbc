// Game situation snapshot handed to the resolver for each play.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::runner::RunnerState;

/// Which half of an inning is being played. The top half is batted by the
/// away team, the bottom half by the home team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Half {
    Top,
    Bottom,
}

impl Half {
    pub fn other(self) -> Half {
        match self {
            Half::Top => Half::Bottom,
            Half::Bottom => Half::Top,
        }
    }
}

impl fmt::Display for Half {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Half::Top => write!(f, "top"),
            Half::Bottom => write!(f, "bottom"),
        }
    }
}

/// A pair of values, one per side, indexed by `Half`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TopBottom<T> {
    pub top: T,
    pub bottom: T,
}

impl<T> TopBottom<T> {
    pub fn new(top: T, bottom: T) -> Self {
        TopBottom { top, bottom }
    }

    pub fn get(&self, half: Half) -> &T {
        match half {
            Half::Top => &self.top,
            Half::Bottom => &self.bottom,
        }
    }

    pub fn get_mut(&mut self, half: Half) -> &mut T {
        match half {
            Half::Top => &mut self.top,
            Half::Bottom => &mut self.bottom,
        }
    }
}

/// Everything the resolver needs to know about the moment of a play.
#[derive(Debug, Clone, PartialEq)]
pub struct GameStatus {
    pub inning: u32,
    /// The batting side.
    pub offense: Half,
    pub score: TopBottom<u32>,
    /// Accumulated per-team motivation.
    pub motivation: TopBottom<f64>,
    pub out_count: u32,
    /// Batting-order slot (0..9) of the offense's current batter.
    pub order: usize,
    pub runner: RunnerState,
    /// Batting-order slot of whoever stands on first, if anyone.
    pub first_runner: Option<usize>,
    /// One-off offensive boost carried from a half-inning that stranded the
    /// bases loaded.
    pub rally: bool,
}

impl GameStatus {
    /// Fresh status for the start of a half-inning.
    pub fn new(inning: u32, offense: Half) -> Self {
        GameStatus {
            inning,
            offense,
            score: TopBottom::default(),
            motivation: TopBottom::default(),
            out_count: 0,
            order: 0,
            runner: RunnerState::default(),
            first_runner: None,
            rally: false,
        }
    }

    pub fn defense(&self) -> Half {
        self.offense.other()
    }

    pub fn offense_motivation(&self) -> f64 {
        let bonus = if self.rally { 1.0 } else { 0.0 };
        self.motivation.get(self.offense) + bonus
    }

    pub fn defense_motivation(&self) -> f64 {
        *self.motivation.get(self.defense())
    }

    /// Absolute run difference between the two sides.
    pub fn score_gap(&self) -> u32 {
        self.score.top.abs_diff(self.score.bottom)
    }

    /// True once the home team leads in the bottom of the ninth or later.
    pub fn is_walk_off(&self) -> bool {
        self.offense == Half::Bottom && self.inning >= 9 && self.score.bottom > self.score.top
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_bottom_indexing() {
        let mut pair = TopBottom::new(1, 2);
        assert_eq!(*pair.get(Half::Top), 1);
        *pair.get_mut(Half::Bottom) += 5;
        assert_eq!(pair.bottom, 7);
        assert_eq!(Half::Top.other(), Half::Bottom);
    }

    #[test]
    fn rally_only_boosts_offense() {
        let mut status = GameStatus::new(3, Half::Top);
        status.motivation = TopBottom::new(0.4, -0.2);
        status.rally = true;
        assert!((status.offense_motivation() - 1.4).abs() < 1e-9);
        assert!((status.defense_motivation() + 0.2).abs() < 1e-9);
    }

    #[test]
    fn walk_off_needs_bottom_of_ninth_and_lead() {
        let mut status = GameStatus::new(9, Half::Bottom);
        status.score = TopBottom::new(3, 4);
        assert!(status.is_walk_off());

        status.inning = 8;
        assert!(!status.is_walk_off());

        status.inning = 11;
        status.offense = Half::Top;
        assert!(!status.is_walk_off());

        status.offense = Half::Bottom;
        status.score = TopBottom::new(4, 4);
        assert!(!status.is_walk_off());
        assert_eq!(status.score_gap(), 0);
    }
}

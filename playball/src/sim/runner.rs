// Packed runner state: decimal digits (third)(second)(first), each 0 or 1.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Occupied bases packed as a decimal integer. `101` means runners on first
/// and third, `111` is bases loaded, `0` is empty.
///
/// Advancing by one base multiplies by ten. Any digit pushed to the
/// thousands place or beyond is a runner crossing the plate; `extract_runs`
/// counts those and keeps the sub-1000 remainder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunnerState(u32);

/// Outcome of moving runners: the new state and how many crossed the plate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Advance {
    pub state: RunnerState,
    pub runs: u32,
}

pub const EMPTY: RunnerState = RunnerState(0);
pub const FIRST: RunnerState = RunnerState(1);
pub const FIRST_THIRD: RunnerState = RunnerState(101);
pub const LOADED: RunnerState = RunnerState(111);

/// Count runners that crossed the plate in an advanced raw value.
///
/// Runs are the non-zero digits of `raw / 1000`; the returned remainder is
/// always below 1000.
pub fn extract_runs(raw: u32) -> (u32, u32) {
    let mut scored = raw / 1000;
    let mut runs = 0;
    while scored > 0 {
        if scored % 10 != 0 {
            runs += 1;
        }
        scored /= 10;
    }
    (runs, raw % 1000)
}

impl RunnerState {
    /// Build a state from its packed form. Returns `None` unless every digit
    /// is 0 or 1 and the value is below 1000.
    pub fn from_raw(raw: u32) -> Option<Self> {
        if raw >= 1000 {
            return None;
        }
        let digits = [raw % 10, raw / 10 % 10, raw / 100];
        if digits.iter().all(|&d| d <= 1) {
            Some(RunnerState(raw))
        } else {
            None
        }
    }

    pub fn raw(self) -> u32 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn on_first(self) -> bool {
        self.0 % 10 == 1
    }

    pub fn on_second(self) -> bool {
        self.0 / 10 % 10 == 1
    }

    pub fn on_third(self) -> bool {
        self.0 / 100 == 1
    }

    pub fn is_loaded(self) -> bool {
        self == LOADED
    }

    /// Runner in scoring position, i.e. anyone beyond first.
    pub fn in_scoring_position(self) -> bool {
        self.0 >= 10
    }

    pub fn count(self) -> u32 {
        self.on_first() as u32 + self.on_second() as u32 + self.on_third() as u32
    }

    pub fn without_first(self) -> Self {
        if self.on_first() {
            RunnerState(self.0 - 1)
        } else {
            self
        }
    }

    pub fn without_third(self) -> Self {
        if self.on_third() {
            RunnerState(self.0 - 100)
        } else {
            self
        }
    }

    /// A steal is only tried when the runner on first is the lead runner
    /// with second open: `1` or `101`.
    pub fn steal_eligible(self) -> bool {
        self == FIRST || self == FIRST_THIRD
    }

    /// State after a successful steal of second. Only meaningful when
    /// `steal_eligible`.
    pub fn stolen_second(self) -> Self {
        match self.0 {
            1 => RunnerState(10),
            101 => RunnerState(110),
            _ => self,
        }
    }

    /// Move every runner `bases` bases, optionally placing the batter on the
    /// base he reaches. `advance(4, true)` is a home run.
    pub fn advance(self, bases: u32, batter_reaches: bool) -> Advance {
        if bases == 0 {
            return Advance {
                state: self,
                runs: 0,
            };
        }
        let mut raw = self.0 * 10u32.pow(bases);
        if batter_reaches {
            raw += 10u32.pow(bases - 1);
        }
        let (runs, rest) = extract_runs(raw);
        Advance {
            state: RunnerState(rest),
            runs,
        }
    }

    /// Batter to first on a walk; only forced runners move.
    pub fn force_walk(self) -> Advance {
        let (state, runs) = match self.0 {
            0 => (1, 0),
            1 | 10 => (11, 0),
            100 => (101, 0),
            11 | 101 | 110 => (111, 0),
            111 => (111, 1),
            other => (other, 0),
        };
        Advance {
            state: RunnerState(state),
            runs,
        }
    }
}

impl fmt::Display for RunnerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03}", self.0)
    }
}

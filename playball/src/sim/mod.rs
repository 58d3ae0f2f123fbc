pub mod game;
pub mod inning;
pub mod play;
pub mod rng;
pub mod runner;
pub mod skill;
pub mod status;

pub use game::{Game, GameRecord, GameResult, GameRules, Outcome};
pub use play::{Play, PlayRecord, PlayResolver};
pub use rng::{RandomSource, RngSource, ScriptedRandom};
pub use status::{Half, TopBottom};

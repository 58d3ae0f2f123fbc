// Full game: alternate half-innings until a legal ending, then fold the
// play-by-play into box-score deltas.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

use crate::roster::{BattingStats, PitchingStats, Team, TeamSeason, LINEUP_SLOTS};

use super::inning::{Inning, InningSummary};
use super::play::{HitKind, Matchup, PlayKind, PlayResolver};
use super::status::{Half, TopBottom};

/// Regulation length of a game.
pub const REGULATION_INNINGS: u32 = 9;

/// Game-level rules that are configurable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameRules {
    /// Last inning to play before a tie becomes a draw. 0, the default,
    /// plays extra innings until the game is decided.
    pub extra_inning_limit: u32,
    pub log_plays: bool,
}

impl Default for GameRules {
    fn default() -> Self {
        GameRules {
            extra_inning_limit: 0,
            log_plays: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// The away team won.
    Top,
    /// The home team won.
    Bottom,
    Draw,
}

impl Outcome {
    pub fn winner(self) -> Option<Half> {
        match self {
            Outcome::Top => Some(Half::Top),
            Outcome::Bottom => Some(Half::Bottom),
            Outcome::Draw => None,
        }
    }
}

/// Everything the game produced that is worth keeping in a log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    pub teams: TopBottom<String>,
    pub score: TopBottom<u32>,
    pub hits: TopBottom<u32>,
    pub home_runs: TopBottom<u32>,
    /// Errors committed by each side while fielding.
    pub errors: TopBottom<u32>,
    /// Runs per half-inning. The home row is one short when the bottom of
    /// the last inning was not needed.
    pub score_board: TopBottom<Vec<u32>>,
    pub hit_board: TopBottom<Vec<u32>>,
    pub out_board: TopBottom<Vec<u32>>,
    pub innings: Vec<InningSummary>,
    pub walk_off: bool,
    pub outcome: Outcome,
    pub innings_played: u32,
}

impl fmt::Display for GameRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .teams
            .top
            .chars()
            .count()
            .max(self.teams.bottom.chars().count())
            .max(4);

        write!(f, "{:width$}", "")?;
        for inning in 1..=self.innings_played {
            write!(f, "{inning:>3}")?;
        }
        writeln!(f, " |  R  H  E")?;

        for half in [Half::Top, Half::Bottom] {
            write!(f, "{:width$}", self.teams.get(half))?;
            let board = self.score_board.get(half);
            for idx in 0..self.innings_played as usize {
                match board.get(idx) {
                    Some(runs) => write!(f, "{runs:>3}")?,
                    None => write!(f, "{:>3}", "X")?,
                }
            }
            writeln!(
                f,
                " |{:>3}{:>3}{:>3}",
                self.score.get(half),
                self.hits.get(half),
                self.errors.get(half)
            )?;
        }
        Ok(())
    }
}

/// Per-game batting delta for one participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattingLine {
    pub player_id: i64,
    pub name: String,
    pub slot: usize,
    pub is_pitcher: bool,
    pub stats: BattingStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PitchingLine {
    pub pitcher_id: i64,
    pub name: String,
    pub stats: PitchingStats,
}

/// One side's deltas, ready to merge into season totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SideResult {
    pub team_id: i64,
    /// Nine lines in batting order; the last belongs to the pitcher.
    pub batting: Vec<BattingLine>,
    pub pitching: PitchingLine,
    pub team: TeamSeason,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameResult {
    pub record: GameRecord,
    pub sides: TopBottom<SideResult>,
}

/// A game between an away (`top`) and a home (`bottom`) team.
#[derive(Debug, Clone)]
pub struct Game<'a> {
    teams: TopBottom<&'a Team>,
    rules: GameRules,
}

impl<'a> Game<'a> {
    pub fn new(top: &'a Team, bottom: &'a Team, rules: GameRules) -> Self {
        Game {
            teams: TopBottom::new(top, bottom),
            rules,
        }
    }

    /// Play from the top of the first until the game is decided (or drawn
    /// at the extra-inning limit).
    pub fn play<P: PlayResolver>(&self, resolver: &mut P) -> GameResult {
        let mut score: TopBottom<u32> = TopBottom::default();
        let mut motivation: TopBottom<f64> = TopBottom::default();
        let mut order: TopBottom<usize> = TopBottom::default();
        let mut rally: TopBottom<bool> = TopBottom::default();
        let mut innings = Vec::new();
        let mut inning = 1;

        'game: loop {
            for half in [Half::Top, Half::Bottom] {
                let matchup = Matchup {
                    offense: self.teams.get(half),
                    defense: self.teams.get(half.other()),
                };
                let summary = Inning::new(matchup, inning, half, score, motivation, *order.get(half))
                    .with_rally(*rally.get(half))
                    .with_play_logging(self.rules.log_plays)
                    .play(resolver);

                *score.get_mut(half) += summary.runs;
                motivation = summary.motivation;
                *order.get_mut(half) = summary.next_order;
                *rally.get_mut(half) = summary.stranded_loaded;
                innings.push(summary);

                if self.is_over(inning, half, &score) {
                    break 'game;
                }
            }
            inning += 1;
        }

        let record = self.build_record(innings, score, inning);
        info!(
            top = %record.teams.top,
            bottom = %record.teams.bottom,
            top_score = record.score.top,
            bottom_score = record.score.bottom,
            innings = record.innings_played,
            walk_off = record.walk_off,
            "game over"
        );
        let sides = TopBottom::new(
            self.side_result(Half::Top, &record),
            self.side_result(Half::Bottom, &record),
        );
        GameResult { record, sides }
    }

    /// Continuation check after each half-inning.
    fn is_over(&self, inning: u32, half: Half, score: &TopBottom<u32>) -> bool {
        if inning < REGULATION_INNINGS {
            return false;
        }
        match half {
            Half::Top => score.bottom > score.top,
            Half::Bottom => {
                let limit = self.rules.extra_inning_limit;
                score.top != score.bottom || (limit > 0 && inning >= limit)
            }
        }
    }

    fn build_record(
        &self,
        innings: Vec<InningSummary>,
        score: TopBottom<u32>,
        innings_played: u32,
    ) -> GameRecord {
        let mut hits = TopBottom::default();
        let mut home_runs = TopBottom::default();
        let mut errors: TopBottom<u32> = TopBottom::default();
        let mut score_board: TopBottom<Vec<u32>> = TopBottom::default();
        let mut hit_board: TopBottom<Vec<u32>> = TopBottom::default();
        let mut out_board: TopBottom<Vec<u32>> = TopBottom::default();

        for summary in &innings {
            let half = summary.half;
            *hits.get_mut(half) += summary.hits;
            *home_runs.get_mut(half) += summary.home_runs;
            *errors.get_mut(half.other()) += summary.errors;
            score_board.get_mut(half).push(summary.runs);
            hit_board.get_mut(half).push(summary.hits);
            out_board.get_mut(half).push(summary.outs);
        }

        let outcome = if score.top > score.bottom {
            Outcome::Top
        } else if score.bottom > score.top {
            Outcome::Bottom
        } else {
            Outcome::Draw
        };
        let walk_off = innings.last().is_some_and(|s| s.walk_off);

        GameRecord {
            teams: TopBottom::new(self.teams.top.name.clone(), self.teams.bottom.name.clone()),
            score,
            hits,
            home_runs,
            errors,
            score_board,
            hit_board,
            out_board,
            innings,
            walk_off,
            outcome,
            innings_played,
        }
    }

    /// Fold the play-by-play into one side's batting, pitching and team
    /// deltas.
    fn side_result(&self, side: Half, record: &GameRecord) -> SideResult {
        let team = *self.teams.get(side);
        let mut batting: Vec<BattingLine> = (0..LINEUP_SLOTS)
            .map(|slot| {
                let p = team.batter_at(slot);
                BattingLine {
                    player_id: p.id(),
                    name: p.name().to_string(),
                    slot,
                    is_pitcher: p.is_pitcher(),
                    stats: BattingStats::default(),
                }
            })
            .collect();
        let mut pitching = PitchingStats::default();
        let mut season = TeamSeason::default();

        for summary in &record.innings {
            for play in &summary.plays {
                if summary.half == side {
                    let line = &mut batting[play.slot].stats;
                    if play.kind.is_at_bat() {
                        line.at_bat += 1;
                    }
                    line.bat_score += play.rbi;
                    match play.kind {
                        PlayKind::Hit(hit) => {
                            line.hit += 1;
                            match hit {
                                HitKind::Double => line.double += 1,
                                HitKind::Triple => line.triple += 1,
                                HitKind::HomeRun => line.hr += 1,
                                HitKind::Single => {}
                            }
                        }
                        PlayKind::Walk => line.four_ball += 1,
                        PlayKind::StrikeOut => line.strike_out += 1,
                        PlayKind::Bunt { success: true } => line.bunt += 1,
                        PlayKind::SacrificeFly => line.sacrifice_fly += 1,
                        PlayKind::Steal { success: true } => {
                            line.steal += 1;
                            season.steal += 1;
                        }
                        PlayKind::Steal { success: false } => line.steal_failed += 1,
                        _ => {}
                    }
                } else {
                    // This side is fielding.
                    pitching.out_count += play.outs;
                    pitching.runs_allowed += play.runs;
                    pitching.loss_score += play.self_loss_score();
                    match play.kind {
                        PlayKind::Hit(hit) => {
                            pitching.hit += 1;
                            if hit == HitKind::HomeRun {
                                pitching.hr += 1;
                            }
                        }
                        PlayKind::Walk => pitching.four_ball += 1,
                        PlayKind::StrikeOut => pitching.strike_out += 1,
                        PlayKind::WildPitch => pitching.wild_pitch += 1,
                        PlayKind::Error => {
                            for &pos in &play.fielders {
                                batting[team.slot_of(pos)].stats.error += 1;
                            }
                        }
                        _ => {}
                    }
                }
            }
        }

        let won = record.outcome.winner() == Some(side);
        let lost = record.outcome.winner() == Some(side.other());
        pitching.win = won as u32;
        pitching.lose = lost as u32;

        season.win = won as u32;
        season.lose = lost as u32;
        season.draw = (record.outcome == Outcome::Draw) as u32;
        season.win_continue = won as u32;
        season.score = *record.score.get(side);
        season.lose_score = *record.score.get(side.other());
        season.hr = *record.home_runs.get(side);
        season.strike_out = pitching.strike_out;
        season.error = *record.errors.get(side);

        SideResult {
            team_id: team.id,
            batting,
            pitching: PitchingLine {
                pitcher_id: team.pitcher.id,
                name: team.pitcher.name.clone(),
                stats: pitching,
            },
            team: season,
        }
    }
}

// Half-inning engine: resolve plays until three outs or a walk-off.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::play::{HitKind, Matchup, PlayKind, PlayRecord, PlayResolver};
use super::runner::RunnerState;
use super::status::{GameStatus, Half, TopBottom};

/// Run gap beyond which both teams lose heart.
const BLOWOUT_GAP: u32 = 8;

/// Totals and log for one completed half-inning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InningSummary {
    pub inning: u32,
    pub half: Half,
    pub runs: u32,
    pub hits: u32,
    pub home_runs: u32,
    /// Errors committed by the fielding side.
    pub errors: u32,
    pub outs: u32,
    pub plays: Vec<PlayRecord>,
    /// Slot that leads off this side's next half-inning.
    pub next_order: usize,
    pub motivation: TopBottom<f64>,
    pub walk_off: bool,
    /// Inning ended scoreless on an out made with the bases loaded.
    pub stranded_loaded: bool,
}

/// One half-inning about to be played.
#[derive(Debug, Clone)]
pub struct Inning<'a> {
    matchup: Matchup<'a>,
    inning: u32,
    half: Half,
    score: TopBottom<u32>,
    motivation: TopBottom<f64>,
    order: usize,
    rally: bool,
    log_plays: bool,
}

impl<'a> Inning<'a> {
    pub fn new(
        matchup: Matchup<'a>,
        inning: u32,
        half: Half,
        score: TopBottom<u32>,
        motivation: TopBottom<f64>,
        order: usize,
    ) -> Self {
        Inning {
            matchup,
            inning,
            half,
            score,
            motivation,
            order,
            rally: false,
            log_plays: false,
        }
    }

    /// Grant the one-off boost earned by stranding the bases loaded last time.
    pub fn with_rally(mut self, rally: bool) -> Self {
        self.rally = rally;
        self
    }

    pub fn with_play_logging(mut self, log_plays: bool) -> Self {
        self.log_plays = log_plays;
        self
    }

    /// Play the half-inning to completion.
    pub fn play<P: PlayResolver>(&self, resolver: &mut P) -> InningSummary {
        let half = self.half;
        let mut status = GameStatus {
            inning: self.inning,
            offense: half,
            score: self.score,
            motivation: self.motivation,
            out_count: 0,
            order: self.order % 9,
            runner: RunnerState::default(),
            first_runner: None,
            rally: self.rally,
        };

        let mut summary = InningSummary {
            inning: self.inning,
            half,
            runs: 0,
            hits: 0,
            home_runs: 0,
            errors: 0,
            outs: 0,
            plays: Vec::new(),
            next_order: status.order,
            motivation: self.motivation,
            walk_off: false,
            stranded_loaded: false,
        };

        while status.out_count < 3 {
            apply_blowout(&mut status);

            let mut record = resolver.resolve(&self.matchup, &status);
            let batter_slot = status.order;

            *status.score.get_mut(half) += record.runs;
            status.out_count = record.out_count;
            status.runner = record.runner;

            if record.kind.batter_reaches() && record.runner.on_first() {
                status.first_runner = Some(batter_slot);
            } else if !record.runner.on_first() {
                status.first_runner = None;
            }

            if record.kind.consumes_turn() {
                status.order = (status.order + 1) % 9;
            }

            *status.motivation.get_mut(half) += record.offense_motivation;
            *status.motivation.get_mut(half.other()) += record.defense_motivation;

            summary.runs += record.runs;
            match record.kind {
                PlayKind::Hit(hit) => {
                    summary.hits += 1;
                    if hit == HitKind::HomeRun {
                        summary.home_runs += 1;
                    }
                }
                PlayKind::Error => summary.errors += 1,
                _ => {}
            }

            if self.log_plays {
                debug!(
                    inning = self.inning,
                    half = %half,
                    order = batter_slot,
                    "{record}"
                );
            }

            if status.is_walk_off() {
                record.walk_off = true;
                summary.plays.push(record);
                summary.walk_off = true;
                break;
            }
            summary.plays.push(record);
        }

        summary.outs = status.out_count.min(3);
        summary.next_order = status.order;
        summary.motivation = status.motivation;
        summary.stranded_loaded = !summary.walk_off
            && summary.runs == 0
            && summary
                .plays
                .last()
                .is_some_and(|last| last.outs > 0 && last.runner_before.is_loaded());

        debug!(
            inning = self.inning,
            half = %half,
            runs = summary.runs,
            hits = summary.hits,
            "half-inning complete"
        );
        summary
    }
}

/// Once the gap passes the blowout line, the trailing side drops to -2 and
/// the leading side to -1.
fn apply_blowout(status: &mut GameStatus) {
    if status.score_gap() <= BLOWOUT_GAP {
        return;
    }
    let leader = if status.score.top > status.score.bottom {
        Half::Top
    } else {
        Half::Bottom
    };
    *status.motivation.get_mut(leader) = -1.0;
    *status.motivation.get_mut(leader.other()) = -2.0;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::team::tests::sample_team;
    use crate::roster::{Position, Team};
    use crate::sim::play::{Decision, ScriptedPlays};
    use crate::sim::runner::LOADED;

    fn out() -> Decision {
        Decision::new(PlayKind::StrikeOut)
    }

    fn walk() -> Decision {
        Decision::new(PlayKind::Walk)
    }

    fn single() -> Decision {
        Decision::to(PlayKind::Hit(HitKind::Single), &[Position::CenterField])
    }

    fn teams() -> (Team, Team) {
        (sample_team(1, "Away"), sample_team(2, "Home"))
    }

    fn top_inning<'a>(away: &'a Team, home: &'a Team, order: usize) -> Inning<'a> {
        Inning::new(
            Matchup {
                offense: away,
                defense: home,
            },
            1,
            Half::Top,
            TopBottom::default(),
            TopBottom::default(),
            order,
        )
    }

    #[test]
    fn three_strikeouts_end_the_inning() {
        let (away, home) = teams();
        let mut resolver = ScriptedPlays::new([], out());
        let summary = top_inning(&away, &home, 0).play(&mut resolver);
        assert_eq!(summary.plays.len(), 3);
        assert_eq!(summary.outs, 3);
        assert_eq!(summary.runs, 0);
        assert_eq!(summary.next_order, 3);
        assert!(!summary.stranded_loaded);
    }

    #[test]
    fn batting_order_wraps_through_the_pitcher() {
        let (away, home) = teams();
        let mut resolver = ScriptedPlays::new([], out());
        let summary = top_inning(&away, &home, 7).play(&mut resolver);
        let slots: Vec<usize> = summary.plays.iter().map(|p| p.slot).collect();
        assert_eq!(slots, vec![7, 8, 0]);
        assert_eq!(summary.plays[1].player, away.pitcher.name);
        assert_eq!(summary.next_order, 1);
    }

    #[test]
    fn bases_loaded_walk_forces_one_run_and_advances_order() {
        let (away, home) = teams();
        let mut resolver = ScriptedPlays::new([walk(), walk(), walk(), walk()], out());
        let summary = top_inning(&away, &home, 0).play(&mut resolver);

        let fourth = &summary.plays[3];
        assert_eq!(fourth.runner_before, LOADED);
        assert_eq!(fourth.runner, LOADED);
        assert_eq!(fourth.runs, 1);
        assert_eq!(fourth.rbi, 1);
        assert_eq!(fourth.slot, 3);
        assert_eq!(resolver.seen[4].order, 4);
        assert_eq!(summary.runs, 1);
    }

    #[test]
    fn stolen_base_keeps_the_batter_at_the_plate() {
        let (away, home) = teams();
        let mut resolver = ScriptedPlays::new(
            [single(), Decision::new(PlayKind::Steal { success: true })],
            out(),
        );
        let summary = top_inning(&away, &home, 0).play(&mut resolver);

        let steal = &summary.plays[1];
        assert_eq!(steal.runner.raw(), 10);
        assert_eq!(steal.outs, 0);
        assert_eq!(steal.slot, 0, "the runner from the single is charged");
        assert_eq!(resolver.seen[1].order, 1);
        assert_eq!(resolver.seen[2].order, 1, "steal does not use the turn");
        assert_eq!(resolver.seen[2].first_runner, None);
    }

    #[test]
    fn first_runner_tracks_whoever_reaches_first() {
        let (away, home) = teams();
        let mut resolver = ScriptedPlays::new([single(), walk(), out()], out());
        top_inning(&away, &home, 2).play(&mut resolver);
        assert_eq!(resolver.seen[0].first_runner, None);
        assert_eq!(resolver.seen[1].first_runner, Some(2));
        assert_eq!(resolver.seen[2].first_runner, Some(3));
        // Strikeout leaves first occupied: the runner is kept.
        assert_eq!(resolver.seen[3].first_runner, Some(3));
    }

    #[test]
    fn double_play_ends_the_inning_at_three_outs() {
        let (away, home) = teams();
        let mut resolver = ScriptedPlays::new(
            [
                out(),
                single(),
                Decision::to(PlayKind::DoublePlay, &[Position::ShortStop]),
            ],
            out(),
        );
        let summary = top_inning(&away, &home, 0).play(&mut resolver);
        assert_eq!(summary.plays.len(), 3);
        assert_eq!(summary.outs, 3);
        assert_eq!(resolver.remaining(), 0);
    }

    #[test]
    fn walk_off_stops_immediately() {
        let (away, home) = teams();
        let inning = Inning::new(
            Matchup {
                offense: &home,
                defense: &away,
            },
            9,
            Half::Bottom,
            TopBottom::new(3, 3),
            TopBottom::default(),
            0,
        );
        let mut resolver = ScriptedPlays::new(
            [
                single(),
                Decision::to(PlayKind::Hit(HitKind::HomeRun), &[Position::LeftField]),
                single(),
            ],
            out(),
        );
        let summary = inning.play(&mut resolver);
        assert!(summary.walk_off);
        assert_eq!(summary.plays.len(), 2);
        assert!(summary.plays[1].walk_off);
        assert_eq!(summary.runs, 2);
        assert_eq!(summary.outs, 0);
        assert_eq!(resolver.remaining(), 1);
    }

    #[test]
    fn no_walk_off_before_the_ninth() {
        let (away, home) = teams();
        let inning = Inning::new(
            Matchup {
                offense: &home,
                defense: &away,
            },
            8,
            Half::Bottom,
            TopBottom::new(0, 0),
            TopBottom::default(),
            0,
        );
        let hr = Decision::to(PlayKind::Hit(HitKind::HomeRun), &[Position::LeftField]);
        let mut resolver = ScriptedPlays::new([hr], out());
        let summary = inning.play(&mut resolver);
        assert!(!summary.walk_off);
        assert_eq!(summary.plays.len(), 4);
        assert_eq!(summary.home_runs, 1);
    }

    #[test]
    fn stranding_the_bases_loaded_is_flagged() {
        let (away, home) = teams();
        let mut resolver = ScriptedPlays::new([walk(), walk(), walk()], out());
        let summary = top_inning(&away, &home, 0).play(&mut resolver);
        assert_eq!(summary.runs, 0);
        assert!(summary.stranded_loaded);
    }

    #[test]
    fn blowout_flattens_motivation() {
        let (away, home) = teams();
        let inning = Inning::new(
            Matchup {
                offense: &away,
                defense: &home,
            },
            5,
            Half::Top,
            TopBottom::new(12, 2),
            TopBottom::new(1.5, 0.3),
            0,
        );
        let mut resolver = ScriptedPlays::new([], out());
        inning.play(&mut resolver);
        assert_eq!(resolver.seen[0].motivation, TopBottom::new(-1.0, -2.0));
    }

    #[test]
    fn rally_boost_reaches_the_resolver() {
        let (away, home) = teams();
        let mut resolver = ScriptedPlays::new([], out());
        top_inning(&away, &home, 0)
            .with_rally(true)
            .play(&mut resolver);
        assert!(resolver.seen.iter().all(|s| s.rally));
        assert!((resolver.seen[0].offense_motivation() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn runs_move_motivation_both_ways() {
        let (away, home) = teams();
        let hr = Decision::to(PlayKind::Hit(HitKind::HomeRun), &[Position::RightField]);
        let mut resolver = ScriptedPlays::new([hr], out());
        let summary = top_inning(&away, &home, 0).play(&mut resolver);
        assert!((summary.motivation.top - 0.2).abs() < 1e-9);
        assert!((summary.motivation.bottom + 0.2).abs() < 1e-9);
    }
}

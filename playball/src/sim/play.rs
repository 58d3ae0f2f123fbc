// Plate-appearance resolver.
//
// `Play::decide` walks the decision tree and returns what happened; `settle`
// turns that into runner movement, outs, runs and credits. Settlement is
// deterministic so scripted resolvers in tests can reuse it.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

use crate::roster::{Position, Team};

use super::rng::RandomSource;
use super::runner::RunnerState;
use super::skill::{
    batting_skill, fielding_skill, pitching_skill, signed_pow, team_mind, BattingSkill,
    PitchingSkill, SkillContext,
};
use super::status::GameStatus;

// ---------------------------------------------------------------------------
// Outcome types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HitKind {
    Single,
    Double,
    Triple,
    HomeRun,
}

impl HitKind {
    pub fn bases(self) -> u32 {
        match self {
            HitKind::Single => 1,
            HitKind::Double => 2,
            HitKind::Triple => 3,
            HitKind::HomeRun => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayKind {
    Steal { success: bool },
    WildPitch,
    Bunt { success: bool },
    StrikeOut,
    Walk,
    Hit(HitKind),
    Error,
    Out,
    DoublePlay,
    SacrificeFly,
}

impl PlayKind {
    /// Whether the batter's turn is used up. Steals and wild pitches happen
    /// between pitches and leave the same batter at the plate.
    pub fn consumes_turn(self) -> bool {
        !matches!(self, PlayKind::Steal { .. } | PlayKind::WildPitch)
    }

    /// Whether the play counts as an official at-bat.
    pub fn is_at_bat(self) -> bool {
        matches!(
            self,
            PlayKind::StrikeOut
                | PlayKind::Hit(_)
                | PlayKind::Error
                | PlayKind::Out
                | PlayKind::DoublePlay
        )
    }

    pub fn is_hit(self) -> bool {
        matches!(self, PlayKind::Hit(_))
    }

    /// Plays after which the batter may be standing on first.
    pub fn batter_reaches(self) -> bool {
        matches!(self, PlayKind::Hit(_) | PlayKind::Error | PlayKind::Walk)
    }
}

impl fmt::Display for PlayKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PlayKind::Steal { success: true } => "stolen base",
            PlayKind::Steal { success: false } => "caught stealing",
            PlayKind::WildPitch => "wild pitch",
            PlayKind::Bunt { success: true } => "sacrifice bunt",
            PlayKind::Bunt { success: false } => "failed bunt",
            PlayKind::StrikeOut => "strikeout",
            PlayKind::Walk => "walk",
            PlayKind::Hit(HitKind::Single) => "single",
            PlayKind::Hit(HitKind::Double) => "double",
            PlayKind::Hit(HitKind::Triple) => "triple",
            PlayKind::Hit(HitKind::HomeRun) => "home run",
            PlayKind::Error => "error",
            PlayKind::Out => "out",
            PlayKind::DoublePlay => "double play",
            PlayKind::SacrificeFly => "sacrifice fly",
        };
        write!(f, "{s}")
    }
}

/// What happened on a play, before any bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub kind: PlayKind,
    /// Fielders the ball was hit to; one, or two for a ball in a gap.
    pub fielders: Vec<Position>,
}

impl Decision {
    pub fn new(kind: PlayKind) -> Self {
        Decision {
            kind,
            fielders: Vec::new(),
        }
    }

    pub fn to(kind: PlayKind, fielders: &[Position]) -> Self {
        Decision {
            kind,
            fielders: fielders.to_vec(),
        }
    }
}

/// One resolved play as appended to the inning log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayRecord {
    pub kind: PlayKind,
    /// Batting-order slot of the actor: the runner on a steal, the batter
    /// otherwise.
    pub slot: usize,
    pub player: String,
    pub pitcher: String,
    pub fielders: Vec<Position>,
    pub runner_before: RunnerState,
    pub runner: RunnerState,
    pub outs: u32,
    /// Outs in the half-inning after the play.
    pub out_count: u32,
    pub runs: u32,
    pub rbi: u32,
    /// Runs that scored because of a fielding error.
    pub error_runs: u32,
    pub offense_motivation: f64,
    pub defense_motivation: f64,
    pub walk_off: bool,
}

impl PlayRecord {
    /// Runs charged to the pitcher as earned.
    pub fn self_loss_score(&self) -> u32 {
        self.runs - self.error_runs
    }
}

impl fmt::Display for PlayRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.player, self.kind)?;
        if !self.fielders.is_empty() {
            let names: Vec<&str> = self.fielders.iter().map(|p| p.display_str()).collect();
            write!(f, " ({})", names.join("-"))?;
        }
        if self.runs > 0 {
            write!(f, ", {} run(s) score", self.runs)?;
        }
        write!(f, " [runners {}, {} out]", self.runner, self.out_count)
    }
}

/// The two teams involved in a play.
#[derive(Debug, Clone, Copy)]
pub struct Matchup<'a> {
    pub offense: &'a Team,
    pub defense: &'a Team,
}

/// Anything that can resolve a play. `Play` is the probabilistic one.
pub trait PlayResolver {
    fn resolve(&mut self, matchup: &Matchup<'_>, status: &GameStatus) -> PlayRecord;
}

// ---------------------------------------------------------------------------
// Steal parameters
// ---------------------------------------------------------------------------

/// Attempt and success chances (percent) for a steal of second.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StealParams {
    pub start: f64,
    pub success: f64,
}

/// Steal chances for the current runner state. `start` is 0 unless the
/// runner on first is the lead runner (`1` or `101`).
pub fn steal_params(
    runner_state: RunnerState,
    runner: &BattingSkill,
    pitcher_defense: f64,
    catcher_defense: f64,
    steal_tendency: f64,
    motivation: f64,
) -> StealParams {
    if !runner_state.steal_eligible() {
        return StealParams {
            start: 0.0,
            success: 0.0,
        };
    }
    let battery = pitcher_defense + catcher_defense;
    let start = (signed_pow(runner.run, 1.6) - runner.power) * 0.8 - battery * 0.5
        + (steal_tendency - 5.0) * 2.0;
    let success = 55.0 + (runner.run - 5.0) * 6.0 - (runner.power - 5.0) * 1.5
        - (battery / 2.0 - 5.0) * 4.0
        + motivation;
    StealParams { start, success }
}

// ---------------------------------------------------------------------------
// Hit direction
// ---------------------------------------------------------------------------

const INFIELD: [(Position, f64); 6] = [
    (Position::Pitcher, 1.0),
    (Position::Catcher, 0.5),
    (Position::FirstBase, 2.0),
    (Position::SecondBase, 3.0),
    (Position::ThirdBase, 2.5),
    (Position::ShortStop, 3.0),
];

const INFIELD_GAPS: [([Position; 2], f64); 3] = [
    ([Position::FirstBase, Position::SecondBase], 1.0),
    ([Position::SecondBase, Position::ShortStop], 1.0),
    ([Position::ShortStop, Position::ThirdBase], 1.0),
];

const OUTFIELD: [(Position, f64); 3] = [
    (Position::LeftField, 3.0),
    (Position::CenterField, 4.0),
    (Position::RightField, 3.0),
];

const OUTFIELD_GAPS: [([Position; 2], f64); 2] = [
    ([Position::LeftField, Position::CenterField], 1.0),
    ([Position::CenterField, Position::RightField], 1.0),
];

fn weighted_pick<R: RandomSource, T: Copy>(rng: &mut R, options: &[(T, f64)]) -> T {
    let total: f64 = options.iter().map(|(_, w)| w).sum();
    let mut target = rng.uniform() * total;
    for &(item, weight) in options {
        if target < weight {
            return item;
        }
        target -= weight;
    }
    options[options.len() - 1].0
}

/// Where a ball in play went.
#[derive(Debug, Clone, PartialEq)]
struct Direction {
    fielders: Vec<Position>,
    outfield: bool,
}

impl Direction {
    fn is_gap(&self) -> bool {
        self.fielders.len() > 1
    }
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// Everything computed once per play before walking the decision tree.
struct Situation {
    batter: BattingSkill,
    pitcher: PitchingSkill,
    batter_is_pitcher: bool,
    offense_mind: f64,
}

/// Probabilistic resolver driven by an injected random source.
#[derive(Debug, Clone)]
pub struct Play<R> {
    rng: R,
}

impl<R: RandomSource> Play<R> {
    pub fn new(rng: R) -> Self {
        Play { rng }
    }

    /// Walk the decision tree for one play.
    ///
    /// Draw order: offense mind, defense mind, batter (two draws unless the
    /// pitcher bats), pitcher (three draws), then one draw per gate that is
    /// reached.
    pub fn decide(&mut self, matchup: &Matchup<'_>, status: &GameStatus) -> Decision {
        let offense = matchup.offense;
        let defense = matchup.defense;
        let batter = offense.batter_at(status.order);

        let offense_mind = team_mind(&mut self.rng, &offense.tendencies);
        let defense_mind = team_mind(&mut self.rng, &defense.tendencies);

        let offense_ctx = SkillContext {
            tendencies: &offense.tendencies,
            mind: offense_mind,
            motivation: status.offense_motivation(),
            runner: status.runner,
            inning: status.inning,
        };
        let defense_ctx = SkillContext {
            tendencies: &defense.tendencies,
            mind: defense_mind,
            motivation: status.defense_motivation(),
            runner: status.runner,
            inning: status.inning,
        };

        let situation = Situation {
            batter: batting_skill(batter, &offense_ctx, &mut self.rng),
            pitcher: pitching_skill(&defense.pitcher, &defense_ctx, &mut self.rng),
            batter_is_pitcher: batter.is_pitcher(),
            offense_mind,
        };
        let b = &situation.batter;
        let p = &situation.pitcher;

        let defense_motivation = status.defense_motivation();
        let field = |pos: Position| {
            fielding_skill(defense.fielder(pos), &defense.tendencies, defense_motivation)
        };
        let catcher = field(Position::Catcher);
        let pitcher_defense = defense.pitcher.defense;

        // 1. steal
        if let Some(kind) = self.try_steal(matchup, status, &situation, pitcher_defense, catcher) {
            return Decision::new(kind);
        }

        // 2. wild pitch
        if !status.runner.is_empty() {
            let pct = (p.speed * 0.5 + p.change * 1.5 - p.control - catcher) * 0.4;
            if self.rng.chance(pct) {
                return Decision::to(PlayKind::WildPitch, &[Position::Pitcher, Position::Catcher]);
            }
        }

        // 3. bunt
        if bunt_situation(status) {
            let attempt = situation.batter_is_pitcher
                || b.power + b.meet <= 6.0 + offense.tendencies.bunt * 1.4;
            if attempt {
                let success = situation.batter_is_pitcher
                    || self.rng.chance(
                        80.0 + (10.0 - b.power) * 0.5 + (10.0 - b.meet) * 0.5 + b.run * 0.5,
                    );
                let fielder = weighted_pick(
                    &mut self.rng,
                    &[
                        (Position::Pitcher, 2.0),
                        (Position::Catcher, 1.0),
                        (Position::FirstBase, 1.5),
                        (Position::ThirdBase, 1.5),
                    ],
                );
                return Decision::to(PlayKind::Bunt { success }, &[fielder]);
            }
        }

        // 4. strikeout
        let strikeout = 18.0
            + (p.speed * 1.2 + p.change * 0.8 - b.meet * 1.5 - b.power * 0.5) * 1.5
            + (p.mental - b.mental);
        if self.rng.chance(strikeout) {
            return Decision::new(PlayKind::StrikeOut);
        }

        // 5. walk
        let walk = 8.0
            + (b.power * 0.6 + b.meet * 0.4 - p.control * 0.8 - p.change * 0.1 - p.speed * 0.1)
                * 1.2
            - p.mental * 0.5;
        if self.rng.chance(walk) {
            return Decision::new(PlayKind::Walk);
        }

        // 6a. hard hits
        if let Some(hit) = self.hard_hit(b, p) {
            let direction = self.direction(b, p, hit != HitKind::Single);
            return Decision {
                kind: PlayKind::Hit(hit),
                fielders: direction.fielders,
            };
        }

        // 6b. ball in play
        let in_play = 75.0 + (b.meet - p.control) * 2.0;
        if self.rng.chance(in_play) {
            let direction = self.direction(b, p, false);
            let kind = self.field_ball(status, b, &direction, &field);
            return Decision {
                kind,
                fielders: direction.fielders,
            };
        }

        // 7. default out
        let direction = self.direction(b, p, false);
        Decision {
            kind: PlayKind::Out,
            fielders: direction.fielders,
        }
    }

    fn try_steal(
        &mut self,
        matchup: &Matchup<'_>,
        status: &GameStatus,
        situation: &Situation,
        pitcher_defense: f64,
        catcher_defense: f64,
    ) -> Option<PlayKind> {
        if !status.runner.steal_eligible() {
            return None;
        }
        let slot = status.first_runner?;
        let runner = matchup.offense.batter_at(slot);
        if runner.is_pitcher() {
            return None;
        }
        let ctx = SkillContext {
            tendencies: &matchup.offense.tendencies,
            mind: situation.offense_mind,
            motivation: status.offense_motivation(),
            runner: status.runner,
            inning: status.inning,
        };
        let skill = batting_skill(runner, &ctx, &mut self.rng);
        let params = steal_params(
            status.runner,
            &skill,
            pitcher_defense,
            catcher_defense,
            matchup.offense.tendencies.steal,
            status.offense_motivation(),
        );
        if !self.rng.chance(params.start) {
            return None;
        }
        let success = self.rng.chance(params.success);
        Some(PlayKind::Steal { success })
    }

    fn hard_hit(&mut self, b: &BattingSkill, p: &PitchingSkill) -> Option<HitKind> {
        let home_run = 2.5
            + (b.power * 1.2 - p.speed * 0.4 - p.change * 0.4 - p.control * 0.2) * 0.8
            + b.mental * 0.2;
        if self.rng.chance(home_run) {
            return Some(HitKind::HomeRun);
        }

        let long = 4.0
            + (b.power * 0.5 + b.meet * 0.6 + b.run * 0.2
                - p.speed * 0.5
                - p.change * 0.5
                - p.control * 0.3)
                * 0.8;
        if self.rng.chance(long) {
            let triple = self.rng.chance(5.0 + b.run * 1.5);
            return Some(if triple { HitKind::Triple } else { HitKind::Double });
        }

        let single = 12.0
            + (b.meet * 1.2 + b.run * 0.3 - p.change * 0.8 - p.control * 0.4 - p.speed * 0.3)
                * 0.8;
        if self.rng.chance(single) {
            return Some(HitKind::Single);
        }
        None
    }

    /// Direction lottery. Extra-base hits always reach the outfield.
    fn direction(&mut self, b: &BattingSkill, p: &PitchingSkill, force_outfield: bool) -> Direction {
        let outfield = force_outfield
            || self.rng.chance(
                35.0 + (b.power * 1.2 + b.meet * 0.3
                    - p.speed * 0.6
                    - p.change * 0.5
                    - p.control * 0.4)
                    * 2.5,
            );
        let gap = self.rng.chance(18.0 + (b.meet - p.control) * 1.5);

        let fielders = match (outfield, gap) {
            (true, true) => weighted_pick(&mut self.rng, &OUTFIELD_GAPS).to_vec(),
            (true, false) => vec![weighted_pick(&mut self.rng, &OUTFIELD)],
            (false, true) => weighted_pick(&mut self.rng, &INFIELD_GAPS).to_vec(),
            (false, false) => vec![weighted_pick(&mut self.rng, &INFIELD)],
        };
        Direction { fielders, outfield }
    }

    /// Resolve a ball in play against the fielders it was hit to.
    fn field_ball(
        &mut self,
        status: &GameStatus,
        b: &BattingSkill,
        direction: &Direction,
        field: &dyn Fn(Position) -> f64,
    ) -> PlayKind {
        let d = direction.fielders.iter().map(|&pos| field(pos)).sum::<f64>()
            / direction.fielders.len() as f64;

        let hit = if direction.outfield {
            let gap = if direction.is_gap() { 20.0 } else { 0.0 };
            20.0 + (b.power * 0.6 + b.meet * 0.6 + b.run * 0.3 - d * 1.5) * 1.5 + gap
        } else {
            let gap = if direction.is_gap() { 15.0 } else { 0.0 };
            12.0 + (b.meet * 0.8 + b.run - d * 1.5) * 1.5 + gap
        };
        if self.rng.chance(hit) {
            if direction.outfield && direction.is_gap() && self.rng.chance(30.0 + b.run * 3.0) {
                return PlayKind::Hit(HitKind::Double);
            }
            return PlayKind::Hit(HitKind::Single);
        }

        if self.rng.chance(2.5 - (d - 5.0) * 0.8) {
            return PlayKind::Error;
        }

        if status.out_count < 2 {
            if !direction.outfield
                && status.runner.on_first()
                && self.rng.chance(35.0 + (d * 1.5 - b.run * 2.0) * 2.0)
            {
                return PlayKind::DoublePlay;
            }
            if direction.outfield
                && status.runner.on_third()
                && self.rng.chance(30.0 + b.power * 4.0 - d * 2.0)
            {
                return PlayKind::SacrificeFly;
            }
        }
        PlayKind::Out
    }
}

impl<R: RandomSource> PlayResolver for Play<R> {
    fn resolve(&mut self, matchup: &Matchup<'_>, status: &GameStatus) -> PlayRecord {
        let decision = self.decide(matchup, status);
        settle(&decision, matchup, status)
    }
}

/// Resolver that replays a fixed list of decisions, then repeats `fallback`.
/// Every status it is asked about is kept for inspection.
#[derive(Debug, Clone)]
pub struct ScriptedPlays {
    script: VecDeque<Decision>,
    fallback: Decision,
    pub seen: Vec<GameStatus>,
}

impl ScriptedPlays {
    pub fn new(script: impl IntoIterator<Item = Decision>, fallback: Decision) -> Self {
        ScriptedPlays {
            script: script.into_iter().collect(),
            fallback,
            seen: Vec::new(),
        }
    }

    /// Decisions not yet consumed.
    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl PlayResolver for ScriptedPlays {
    fn resolve(&mut self, matchup: &Matchup<'_>, status: &GameStatus) -> PlayRecord {
        self.seen.push(status.clone());
        let decision = self
            .script
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        settle(&decision, matchup, status)
    }
}

/// Bunt situation: close game, runner on first (and maybe second), no outs
/// or one out with the eighth hitter not at the plate.
pub fn bunt_situation(status: &GameStatus) -> bool {
    let runner = status.runner.raw();
    status.score_gap() < 5
        && (runner == 1 || runner == 11)
        && (status.out_count == 0 || (status.out_count == 1 && status.order != 7))
}

// ---------------------------------------------------------------------------
// Settlement
// ---------------------------------------------------------------------------

/// Apply a decision to the game situation and produce the play record.
pub fn settle(decision: &Decision, matchup: &Matchup<'_>, status: &GameStatus) -> PlayRecord {
    let before = status.runner;
    let mut runner = before;
    let mut outs = 0;
    let mut runs = 0;
    let mut rbi = 0;
    let mut error_runs = 0;
    let mut offense_motivation = 0.0;
    let mut defense_motivation = 0.0;
    let mut slot = status.order % 9;

    match decision.kind {
        PlayKind::Steal { success } => {
            slot = status.first_runner.unwrap_or(slot);
            if success {
                runner = before.stolen_second();
                offense_motivation += 0.1;
            } else {
                runner = before.without_first();
                outs = 1;
            }
        }
        PlayKind::WildPitch => {
            let adv = before.advance(1, false);
            runner = adv.state;
            runs = adv.runs;
            defense_motivation -= 0.1;
        }
        PlayKind::Bunt { success } => {
            outs = 1;
            if success {
                let adv = before.advance(1, false);
                runner = adv.state;
                runs = adv.runs;
                rbi = adv.runs;
            }
        }
        PlayKind::StrikeOut | PlayKind::Out => outs = 1,
        PlayKind::Walk => {
            let adv = before.force_walk();
            runner = adv.state;
            runs = adv.runs;
            rbi = adv.runs;
        }
        PlayKind::Hit(hit) => {
            let adv = before.advance(hit.bases(), true);
            runner = adv.state;
            runs = adv.runs;
            rbi = adv.runs;
        }
        PlayKind::Error => {
            let adv = before.advance(1, true);
            runner = adv.state;
            runs = adv.runs;
            error_runs = adv.runs;
            if status.out_count < 2 {
                rbi = adv.runs;
            }
            defense_motivation -= 0.1;
        }
        PlayKind::DoublePlay => {
            debug_assert!(status.out_count < 2, "double play with two outs");
            let adv = before.without_first().advance(1, false);
            runner = adv.state;
            runs = adv.runs;
            outs = 2;
        }
        PlayKind::SacrificeFly => {
            runner = before.without_third();
            runs = 1;
            rbi = 1;
            outs = 1;
        }
    }

    let out_count = status.out_count + outs;
    if out_count >= 3 {
        runs = 0;
        rbi = 0;
        error_runs = 0;
    }
    if runs > 0 {
        offense_motivation += 0.2 * runs as f64;
        defense_motivation -= 0.2 * runs as f64;
    }

    let player = matchup.offense.batter_at(slot).name().to_string();
    PlayRecord {
        kind: decision.kind,
        slot,
        player,
        pitcher: matchup.defense.pitcher.name.clone(),
        fielders: decision.fielders.clone(),
        runner_before: before,
        runner,
        outs,
        out_count,
        runs,
        rbi,
        error_runs,
        offense_motivation,
        defense_motivation,
        walk_off: false,
    }
}

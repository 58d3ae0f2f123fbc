// Effective per-play skills: base ratings folded with mental pressure, team
// tendencies and motivation.
//
// Nothing here mutates the roster. Each plate appearance gets fresh values.

use crate::roster::{Condition, Participant, Pitcher, Tendencies};

use super::rng::RandomSource;
use super::runner::RunnerState;

/// Fixed batting line for a pitcher at the plate.
pub const PITCHER_BATTING: f64 = -5.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BattingSkill {
    pub power: f64,
    pub meet: f64,
    pub run: f64,
    pub mental: f64,
}

impl BattingSkill {
    /// The deficient line every pitcher bats with.
    pub fn pitcher() -> Self {
        BattingSkill {
            power: PITCHER_BATTING,
            meet: PITCHER_BATTING,
            run: PITCHER_BATTING,
            mental: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchingSkill {
    pub speed: f64,
    pub change: f64,
    pub control: f64,
    pub mental: f64,
    pub stamina: f64,
}

/// Team-wide inputs shared by every participant on one side for one play.
#[derive(Debug, Clone, Copy)]
pub struct SkillContext<'a> {
    pub tendencies: &'a Tendencies,
    /// The side's mind term for this play, see `team_mind`.
    pub mind: f64,
    pub motivation: f64,
    pub runner: RunnerState,
    pub inning: u32,
}

/// Zero-mean noise whose spread shrinks as the team's `mind` rating rises.
pub fn team_mind<R: RandomSource>(rng: &mut R, tendencies: &Tendencies) -> f64 {
    let spread = 10.0 - tendencies.mind;
    (rng.uniform() * spread - spread * 0.5) * 0.4
}

/// Mental value of a position player. Pressure pushes it away from zero by
/// adding its magnitude, never by flipping its sign through multiplication.
pub fn batter_mental(condition: Condition, runner: RunnerState, inning: u32) -> f64 {
    let mut mental = (condition.level() - 5) as f64;
    if runner.in_scoring_position() {
        mental += mental.abs() * 1.7;
    }
    if inning >= 9 {
        mental += mental.abs() * 1.5;
    } else if inning >= 7 {
        mental += mental.abs() * 1.2;
    }
    mental
}

/// Mental value and stamina weight of a pitcher. Stamina stays 0 until a
/// runner reaches scoring position or the late innings arrive, which keeps a
/// fresh pitcher's ratings free of mental noise.
pub fn pitcher_mental(condition: Condition, runner: RunnerState, inning: u32) -> (f64, f64) {
    let mut mental = (condition.level() - 5) as f64;
    let mut stamina = 0.0;
    if runner.in_scoring_position() {
        mental *= 1.5;
        stamina = 1.0;
    }
    if inning >= 9 {
        mental *= 1.4;
        stamina = 0.8;
    } else if inning >= 6 {
        mental *= 1.2;
        stamina = 0.9;
    }
    (mental, stamina)
}

/// Effective batting skill for whoever is at the plate (or on first).
///
/// A position player takes two draws (power, then meet). A pitcher takes
/// none and bats with the fixed deficient line.
pub fn batting_skill<R: RandomSource>(
    participant: Participant<'_>,
    ctx: &SkillContext<'_>,
    rng: &mut R,
) -> BattingSkill {
    let batter = match participant {
        Participant::Pitcher(_) => return BattingSkill::pitcher(),
        Participant::Fielder(b) => b,
    };

    let mental = batter_mental(batter.condition, ctx.runner, ctx.inning);
    let power_mental = rng.uniform() * mental * 0.05 + 1.0;
    let meet_mental = rng.uniform() * mental * 0.1 + 1.0;

    let mut power = batter.power * power_mental + ctx.mind + ctx.motivation;
    let mut meet = batter.meet * meet_mental + ctx.mind + ctx.motivation;
    let attack = ctx.tendencies.attack;

    // Aggressive teams amplify the dominant tool only.
    if power > meet {
        power += (attack - 5.0) * 0.2;
    } else {
        meet += (attack - 5.0) * 0.15;
    }

    let mut run = batter.run;
    if run > 4.0 {
        run += (attack - 5.0) * 0.1 + ctx.motivation;
    }

    BattingSkill {
        power,
        meet,
        run,
        mental,
    }
}

/// Effective pitching skill for the defensive side's pitcher. Takes three
/// draws: speed, change, control.
pub fn pitching_skill<R: RandomSource>(
    pitcher: &Pitcher,
    ctx: &SkillContext<'_>,
    rng: &mut R,
) -> PitchingSkill {
    let (mental, stamina) = pitcher_mental(pitcher.condition, ctx.runner, ctx.inning);
    let speed_mental = 1.0 + rng.uniform() * mental * 0.05 * stamina;
    let change_mental = 1.0 + rng.uniform() * mental * 0.07 * stamina;
    let control_mental = 1.0 + rng.uniform() * mental * 0.1 * stamina;

    let mut speed = pitcher.speed * speed_mental + ctx.mind + ctx.motivation;
    let mut change = pitcher.change * change_mental + ctx.mind + ctx.motivation;
    let mut control = pitcher.control * control_mental + ctx.mind + ctx.motivation;
    let attack = ctx.tendencies.attack;

    if speed > change {
        speed += (5.0 - attack) * 0.15;
    } else {
        change += (5.0 - attack) * 0.1;
    }
    control += (5.0 - attack) * 0.2;

    PitchingSkill {
        speed,
        change,
        control,
        mental,
        stamina,
    }
}

/// Defensive rating of a fielder for this play. The pitcher fields with his
/// raw rating.
pub fn fielding_skill(fielder: Participant<'_>, tendencies: &Tendencies, motivation: f64) -> f64 {
    match fielder {
        Participant::Pitcher(p) => p.defense,
        Participant::Fielder(b) => b.defense + motivation + (5.0 - tendencies.attack) * 0.3,
    }
}

/// `x^exp` with the sign of `x` preserved, so slow runners stay negative.
pub fn signed_pow(x: f64, exp: f64) -> f64 {
    x.signum() * x.abs().powf(exp)
}

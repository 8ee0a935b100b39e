#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Combat resolution: the damage law, threat ordering and the hit sources that
//! are not driven by an ability.
//!
//! Every resolver here is pure with respect to the world. They read a
//! [`UnitView`] and emit [`Command::StrikeUnits`] batches; the world applies the
//! hits, removes defeated units and credits score by [`StrikeSource`].

use std::{cmp::Ordering, time::Duration};

use log::debug;
use quiz_defence_core::{
    AllyProfile, Command, Event, SessionPhase, Strike, StrikeSource, UnitSnapshot, UnitView,
};
use rand::Rng;

/// Damage dealt by a hit of `attack × multiplier` against `defense`.
///
/// The result is floored and never below one.
#[must_use]
pub fn strike_damage(attack: u32, multiplier: f64, defense: u32) -> u32 {
    let raw = (f64::from(attack) * multiplier - f64::from(defense)).floor();
    if raw.is_nan() || raw < 1.0 {
        1
    } else if raw >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        raw as u32
    }
}

/// Live units ordered from greatest threat to least.
///
/// Threat is advancement toward the line; ties go to the earliest spawned unit.
#[must_use]
pub fn threat_order(units: &UnitView) -> Vec<UnitSnapshot> {
    let mut ordered: Vec<UnitSnapshot> = units.iter().copied().collect();
    ordered.sort_by(|left, right| {
        right
            .position
            .partial_cmp(&left.position)
            .unwrap_or(Ordering::Equal)
            .then(left.id.cmp(&right.id))
    });
    ordered
}

/// Live unit closest to the line.
#[must_use]
pub fn front_unit(units: &UnitView) -> Option<UnitSnapshot> {
    threat_order(units).into_iter().next()
}

/// Critical hit parameters of the primary attack.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CriticalRule {
    chance: f64,
    multiplier: f64,
}

impl CriticalRule {
    /// Creates a rule that scales a hit by `multiplier` with probability `chance`.
    #[must_use]
    pub fn new(chance: f64, multiplier: f64) -> Self {
        Self {
            chance: chance.clamp(0.0, 1.0),
            multiplier,
        }
    }
}

/// Resolves the primary attack unlocked by a correct answer.
///
/// Picks the front unit and rolls for a critical hit; returns `None` when no
/// unit is live.
pub fn primary_attack<R: Rng>(
    units: &UnitView,
    attack: u32,
    critical: CriticalRule,
    rng: &mut R,
) -> Option<Strike> {
    let target = front_unit(units)?;
    let base = strike_damage(attack, 1.0, target.defense);
    if !rng.gen_bool(critical.chance) {
        return Some(Strike {
            unit: target.id,
            damage: base,
            source: StrikeSource::Primary,
        });
    }

    let damage = strike_damage(base, critical.multiplier, 0);
    debug!("critical primary attack on #{} for {damage}", target.id.get());
    Some(Strike {
        unit: target.id,
        damage,
        source: StrikeSource::PrimaryCritical,
    })
}

/// Sums the elapsed wall-clock time carried by tick events.
fn elapsed(events: &[Event]) -> Duration {
    events
        .iter()
        .filter_map(|event| match event {
            Event::TimeAdvanced { dt } => Some(*dt),
            _ => None,
        })
        .fold(Duration::ZERO, Duration::saturating_add)
}

/// Companion that strikes the front unit on a fixed interval.
///
/// Its timer only runs while at least one unit is live.
#[derive(Debug)]
pub struct Ally {
    attack: u32,
    interval: Duration,
    accumulator: Duration,
}

impl Ally {
    /// Creates an ally from its profile.
    #[must_use]
    pub fn new(profile: &AllyProfile) -> Self {
        let interval = Duration::try_from_secs_f64(profile.interval_secs.max(0.0))
            .unwrap_or(Duration::from_secs(5));
        Self {
            attack: profile.attack,
            interval,
            accumulator: Duration::ZERO,
        }
    }

    /// Emits a strike on the front unit each time the interval elapses.
    pub fn handle(
        &mut self,
        events: &[Event],
        phase: SessionPhase,
        units: &UnitView,
        out: &mut Vec<Command>,
    ) {
        if phase != SessionPhase::Playing || units.is_empty() {
            return;
        }

        let dt = elapsed(events);
        if dt.is_zero() {
            return;
        }

        self.accumulator = self.accumulator.saturating_add(dt);
        if self.accumulator < self.interval {
            return;
        }
        self.accumulator = Duration::ZERO;

        let Some(target) = front_unit(units) else {
            return;
        };
        out.push(Command::StrikeUnits {
            strikes: vec![Strike {
                unit: target.id,
                damage: strike_damage(self.attack, 1.0, target.defense),
                source: StrikeSource::Ally,
            }],
        });
    }
}

/// Converts damage field pulses into hits on every live unit.
///
/// Field damage ignores unit defense.
#[derive(Debug, Default)]
pub struct FieldStrikes {
    scratch: Vec<Strike>,
}

impl FieldStrikes {
    /// Creates a resolver with an empty scratch buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits one strike batch per pulse observed in `events`.
    pub fn handle(&mut self, events: &[Event], units: &UnitView, out: &mut Vec<Command>) {
        for event in events {
            let Event::FieldPulsed { damage } = event else {
                continue;
            };
            self.scratch.clear();
            self.scratch.extend(units.iter().map(|unit| Strike {
                unit: unit.id,
                damage: (*damage).max(1),
                source: StrikeSource::Field,
            }));
            if self.scratch.is_empty() {
                continue;
            }
            out.push(Command::StrikeUnits {
                strikes: std::mem::take(&mut self.scratch),
            });
        }
    }
}

/// Opening effect that defeats the earliest released units after a short delay.
#[derive(Debug)]
pub struct QuickStart {
    count: u32,
    delay: Duration,
    elapsed: Duration,
    fired: bool,
}

impl QuickStart {
    /// Creates the effect for `count` units, fired once `delay` has elapsed.
    #[must_use]
    pub fn new(count: u32, delay: Duration) -> Self {
        Self {
            count,
            delay,
            elapsed: Duration::ZERO,
            fired: count == 0,
        }
    }

    /// Reports whether the effect has already resolved.
    #[must_use]
    pub fn is_spent(&self) -> bool {
        self.fired
    }

    /// Emits lethal strikes on the first released units once the delay elapsed.
    pub fn handle(
        &mut self,
        events: &[Event],
        phase: SessionPhase,
        units: &UnitView,
        out: &mut Vec<Command>,
    ) {
        if self.fired || phase != SessionPhase::Playing {
            return;
        }

        self.elapsed = self.elapsed.saturating_add(elapsed(events));
        if self.elapsed < self.delay {
            return;
        }
        self.fired = true;

        let strikes: Vec<Strike> = units
            .iter()
            .take(self.count as usize)
            .map(|unit| Strike {
                unit: unit.id,
                damage: unit.health,
                source: StrikeSource::QuickStart,
            })
            .collect();
        if strikes.is_empty() {
            return;
        }
        debug!("quick start defeats {} unit(s)", strikes.len());
        out.push(Command::StrikeUnits { strikes });
    }
}

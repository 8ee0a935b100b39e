#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative runtime state of a Quiz Defence stage attempt.
//!
//! The world is the only place where attempt state changes. It integrates unit
//! advancement on [`Command::AdvanceUnits`] and the damage field on
//! [`Command::AdvanceField`], applies hits and contact damage, and moves itself
//! to `Clearing` or `GameOver` the instant the corresponding condition holds
//! after a damage application.

use std::collections::BTreeMap;

use log::{debug, info, warn};
use quiz_defence_core::{
    frames_in, AbilityId, Command, DamageField, Event, ProgressionSnapshot, SessionPhase,
    StageDefinition, Strike, Timestamp, UnitId, UnitKind, UnitTemplate, KNOCKBACK_POSITION,
    POSITION_LIMIT,
};

/// Values fixed for the duration of an attempt.
#[derive(Clone, Debug, PartialEq)]
pub struct Setup {
    /// Ordered unit roster of the stage.
    pub roster: Vec<UnitTemplate>,
    /// Player health at attempt start.
    pub max_health: u32,
    /// Player defense against contact damage.
    pub defense: u32,
    /// Size of the resource pool.
    pub resource_max: u32,
    /// Shield charges at attempt start.
    pub shields: u32,
    /// Fraction by which every spawned unit is slowed.
    pub slow_factor: f64,
    /// Number of questions in the deck.
    pub question_count: usize,
}

impl Setup {
    /// Derives the attempt setup from the stage and the player's progression.
    #[must_use]
    pub fn new(
        stage: &StageDefinition,
        progression: &ProgressionSnapshot,
        question_count: usize,
    ) -> Self {
        Self {
            roster: stage.units.clone(),
            max_health: progression.stats.health,
            defense: progression.defense_power(),
            resource_max: progression.resource_max(),
            shields: progression.equipment.shield_charges,
            slow_factor: progression.slow_factor(),
            question_count,
        }
    }
}

/// Represents the authoritative state of one attempt.
#[derive(Debug)]
pub struct World {
    roster: Vec<UnitTemplate>,
    released: Vec<bool>,
    units: Vec<Unit>,
    next_unit_id: u32,
    player: Player,
    phase: SessionPhase,
    score: u64,
    kills: u32,
    total_units: u32,
    question_index: usize,
    question_count: usize,
    stunned_until: Option<Timestamp>,
    cooldowns: BTreeMap<AbilityId, Timestamp>,
    field: Option<DamageField>,
    slow_factor: f64,
}

impl World {
    /// Creates a fresh attempt in `Standby`.
    #[must_use]
    pub fn new(setup: Setup) -> Self {
        let total_units = u32::try_from(setup.roster.len()).unwrap_or(u32::MAX);
        Self {
            released: vec![false; setup.roster.len()],
            roster: setup.roster,
            units: Vec::new(),
            next_unit_id: 0,
            player: Player {
                health: setup.max_health,
                max_health: setup.max_health,
                defense: setup.defense,
                resource: setup.resource_max,
                resource_max: setup.resource_max,
                shields: setup.shields,
            },
            phase: SessionPhase::Standby,
            score: 0,
            kills: 0,
            total_units,
            question_index: 0,
            question_count: setup.question_count,
            stunned_until: None,
            cooldowns: BTreeMap::new(),
            field: None,
            slow_factor: setup.slow_factor.clamp(0.0, 1.0),
        }
    }

    fn is_live(&self) -> bool {
        self.phase == SessionPhase::Playing
    }

    fn unit_index(&self, unit_id: UnitId) -> Option<usize> {
        self.units.iter().position(|unit| unit.id == unit_id)
    }

    fn enter_phase(&mut self, phase: SessionPhase, out_events: &mut Vec<Event>) {
        if !self.phase.can_transition_to(phase) {
            warn!("rejected phase transition {:?} -> {:?}", self.phase, phase);
            return;
        }
        info!("phase {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
        out_events.push(Event::PhaseChanged { phase });
    }

    fn advance_units(&mut self, frames: f64) {
        for unit in &mut self.units {
            unit.position = (unit.position + unit.speed * frames).clamp(0.0, POSITION_LIMIT);
        }
    }

    fn advance_field(&mut self, frames: f64, out_events: &mut Vec<Event>) {
        let Some(field) = self.field.as_mut() else {
            return;
        };
        field.remaining_frames -= frames;
        field.timer_frames += frames;
        if field.timer_frames >= field.interval_frames {
            field.timer_frames = 0.0;
            out_events.push(Event::FieldPulsed {
                damage: field.damage,
            });
        }
        if field.remaining_frames <= 0.0 {
            self.field = None;
            debug!("damage field expired");
            out_events.push(Event::FieldExpired);
        }
    }

    fn spawn(&mut self, roster_index: usize, out_events: &mut Vec<Event>) {
        let Some(template) = self.roster.get(roster_index).copied() else {
            warn!("spawn requested for unknown roster index {roster_index}");
            return;
        };
        if std::mem::replace(&mut self.released[roster_index], true) {
            return;
        }

        let id = UnitId::new(self.next_unit_id);
        self.next_unit_id = self.next_unit_id.saturating_add(1);
        self.units.push(Unit {
            id,
            kind: template.kind,
            health: template.health,
            max_health: template.health,
            position: 0.0,
            speed: template.speed * (1.0 - self.slow_factor),
            attack: template.attack,
            defense: template.defense,
        });
        debug!("spawned {:?} #{} from roster {roster_index}", template.kind, id.get());
        out_events.push(Event::UnitSpawned {
            unit: id,
            kind: template.kind,
            roster_index,
        });
    }

    fn strike_units(&mut self, strikes: Vec<Strike>, out_events: &mut Vec<Event>) {
        for strike in strikes {
            let Some(index) = self.unit_index(strike.unit) else {
                continue;
            };
            let unit = &mut self.units[index];
            unit.health = unit.health.saturating_sub(strike.damage);
            if unit.health > 0 {
                out_events.push(Event::UnitDamaged {
                    unit: strike.unit,
                    damage: strike.damage,
                    remaining: unit.health,
                });
                continue;
            }

            let _ = self.units.remove(index);
            let score = strike.source.kill_score();
            self.kills = self.kills.saturating_add(1);
            self.score = self.score.saturating_add(score);
            out_events.push(Event::UnitDefeated {
                unit: strike.unit,
                source: strike.source,
                score,
            });
        }

        if self.total_units > 0 && self.kills >= self.total_units {
            self.enter_phase(SessionPhase::Clearing, out_events);
        }
    }

    fn strike_player(&mut self, attackers: &[UnitId], damage: u32, out_events: &mut Vec<Event>) {
        self.player.health = self.player.health.saturating_sub(damage);
        out_events.push(Event::PlayerDamaged {
            damage,
            remaining: self.player.health,
        });

        for unit in self
            .units
            .iter_mut()
            .filter(|unit| attackers.contains(&unit.id))
        {
            unit.position = KNOCKBACK_POSITION;
            out_events.push(Event::UnitKnockedBack {
                unit: unit.id,
                position: unit.position,
            });
        }

        if self.player.health == 0 {
            self.enter_phase(SessionPhase::GameOver, out_events);
        }
    }
}

/// Applies the provided command to the world, mutating state deterministically.
///
/// Apart from [`Command::EnterPhase`], commands only take effect while the
/// attempt is `Playing`.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    if let Command::EnterPhase { phase } = command {
        world.enter_phase(phase, out_events);
        return;
    }

    if !world.is_live() {
        debug!("ignored {command:?} outside of play");
        return;
    }

    match command {
        Command::EnterPhase { .. } => {}
        Command::Tick { dt } => out_events.push(Event::TimeAdvanced { dt }),
        Command::AdvanceUnits { dt } => {
            let frames = frames_in(dt);
            if frames > 0.0 {
                world.advance_units(frames);
            }
        }
        Command::AdvanceField { dt } => {
            let frames = frames_in(dt);
            if frames > 0.0 {
                world.advance_field(frames, out_events);
            }
        }
        Command::SpawnUnit { roster_index } => world.spawn(roster_index, out_events),
        Command::StrikeUnits { strikes } => world.strike_units(strikes, out_events),
        Command::StrikePlayer { attackers, damage } => {
            world.strike_player(&attackers, damage, out_events);
        }
        Command::SlowUnits { factor } => {
            for unit in &mut world.units {
                unit.speed *= factor;
            }
            out_events.push(Event::UnitsSlowed { factor });
        }
        Command::SpendResource { amount } => {
            world.player.resource = world.player.resource.saturating_sub(amount);
            out_events.push(Event::ResourceChanged {
                current: world.player.resource,
            });
        }
        Command::RefundResource { amount } => {
            world.player.resource = world
                .player
                .resource
                .saturating_add(amount)
                .min(world.player.resource_max);
            out_events.push(Event::ResourceChanged {
                current: world.player.resource,
            });
        }
        Command::StartCooldown { ability, ready_at } => {
            let _ = world.cooldowns.insert(ability.clone(), ready_at);
            out_events.push(Event::CooldownStarted { ability, ready_at });
        }
        Command::GrantShield => {
            world.player.shields = world.player.shields.saturating_add(1);
            out_events.push(Event::ShieldGranted {
                shields: world.player.shields,
            });
        }
        Command::Stun { until } => {
            let until = world.stunned_until.map_or(until, |current| current.max(until));
            world.stunned_until = Some(until);
            out_events.push(Event::Stunned { until });
        }
        Command::AdvanceQuestion => {
            if world.question_count > 0 {
                world.question_index = (world.question_index + 1) % world.question_count;
                out_events.push(Event::QuestionAdvanced {
                    index: world.question_index,
                });
            }
        }
        Command::DeployField { field } => {
            if world.field.replace(field).is_some() {
                debug!("damage field replaced");
            }
            out_events.push(Event::FieldDeployed {
                damage: field.damage,
            });
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use quiz_defence_core::{
        AbilityId, DamageField, SessionPhase, Timestamp, UnitSnapshot, UnitView,
    };

    use super::World;

    /// Player-side state of the attempt.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct PlayerSnapshot {
        /// Current health.
        pub health: u32,
        /// Health at attempt start.
        pub max_health: u32,
        /// Defense against contact damage.
        pub defense: u32,
        /// Current resource.
        pub resource: u32,
        /// Size of the resource pool.
        pub resource_max: u32,
        /// Shield charges held.
        pub shields: u32,
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(world: &World) -> SessionPhase {
        world.phase
    }

    /// Captures a read-only view of the live units.
    #[must_use]
    pub fn unit_view(world: &World) -> UnitView {
        UnitView::from_snapshots(
            world
                .units
                .iter()
                .map(|unit| UnitSnapshot {
                    id: unit.id,
                    kind: unit.kind,
                    health: unit.health,
                    max_health: unit.max_health,
                    position: unit.position,
                    speed: unit.speed,
                    attack: unit.attack,
                    defense: unit.defense,
                })
                .collect(),
        )
    }

    /// Captures the player-side state.
    #[must_use]
    pub fn player(world: &World) -> PlayerSnapshot {
        PlayerSnapshot {
            health: world.player.health,
            max_health: world.player.max_health,
            defense: world.player.defense,
            resource: world.player.resource,
            resource_max: world.player.resource_max,
            shields: world.player.shields,
        }
    }

    /// Score accumulated in the attempt.
    #[must_use]
    pub fn score(world: &World) -> u64 {
        world.score
    }

    /// Units defeated so far.
    #[must_use]
    pub fn kills(world: &World) -> u32 {
        world.kills
    }

    /// Units that must be defeated to clear the stage.
    #[must_use]
    pub fn total_units(world: &World) -> u32 {
        world.total_units
    }

    /// Index of the question currently presented.
    #[must_use]
    pub fn question_index(world: &World) -> usize {
        world.question_index
    }

    /// Reports whether player actions are blocked at `now`.
    #[must_use]
    pub fn is_stunned(world: &World, now: Timestamp) -> bool {
        world.stunned_until.is_some_and(|until| until > now)
    }

    /// Instant at which the wrong-answer stun lapses, if one was ever applied.
    #[must_use]
    pub fn stunned_until(world: &World) -> Option<Timestamp> {
        world.stunned_until
    }

    /// Instant at which the provided ability becomes usable, if it ever cooled down.
    #[must_use]
    pub fn cooldown_ready_at(world: &World, ability: &AbilityId) -> Option<Timestamp> {
        world.cooldowns.get(ability).copied()
    }

    /// Active damage field, if any.
    #[must_use]
    pub fn field(world: &World) -> Option<DamageField> {
        world.field
    }

    /// Reports whether the roster entry at `index` has been released.
    #[must_use]
    pub fn is_released(world: &World, index: usize) -> bool {
        world.released.get(index).copied().unwrap_or(false)
    }
}

#[derive(Clone, Copy, Debug)]
struct Player {
    health: u32,
    max_health: u32,
    defense: u32,
    resource: u32,
    resource_max: u32,
    shields: u32,
}

#[derive(Clone, Copy, Debug)]
struct Unit {
    id: UnitId,
    kind: UnitKind,
    health: u32,
    max_health: u32,
    position: f64,
    speed: f64,
    attack: u32,
    defense: u32,
}

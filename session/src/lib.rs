#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Session state machine driving a single stage attempt.
//!
//! A [`Session`] owns the selected stage, the question deck and, while an
//! attempt runs, the authoritative world together with every system. The
//! driver calls [`Session::tick`] once per display refresh with a wall-clock
//! timestamp and forwards player input through [`Session::submit_answer`] and
//! [`Session::use_ability`]. Everything the renderer and UI need is queued as
//! [`Notification`] values and read back with [`Session::drain_notifications`].

use std::time::Duration;

use log::{debug, info};
use quiz_defence_core::{
    AbilityId, Command, DamageField, EffectEvent, EffectKind, EffectTarget, Event, Feedback,
    Notification, ProgressionSnapshot, Question, SessionPhase, StageDefinition, StageId, Strike,
    StrikeSource, Timestamp, UnitSnapshot, UnitView,
};
use quiz_defence_system_abilities::{Abilities, Invocation};
use quiz_defence_system_combat::{primary_attack, Ally, CriticalRule, FieldStrikes, QuickStart};
use quiz_defence_system_contact::Contact;
use quiz_defence_system_spawning::Spawning;
use quiz_defence_world::{self as world, query, Setup, World};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

pub mod catalog;
pub mod error;
pub mod rewards;
pub mod tuning;

pub use catalog::{
    next_uncleared, CatalogData, InMemoryProgression, ProgressionStore, QuestionSource,
    StageCatalog,
};
pub use error::{ActionRejected, SetupError};
pub use quiz_defence_world::query::PlayerSnapshot;
pub use tuning::Tuning;

/// Effect scale used for the stage-clear flourish and quick-start strikes.
const FLOURISH_SCALE: u32 = 3;

/// Effect scale used for the quick-start coin shower.
const QUICK_START_COIN_SCALE: u32 = 2;

/// Effect scale used for ally hits, field hits and contact damage.
const SUPPORT_SCALE: u32 = 1;

/// Tells the driver whether it should keep scheduling ticks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopControl {
    /// The attempt is running or holding; schedule another tick.
    Continue,
    /// Nothing left to simulate; stop re-arming the loop.
    Stop,
}

/// Immutable observation of the session for renderers and tests.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionSnapshot {
    /// Current phase.
    pub phase: SessionPhase,
    /// Selected stage.
    pub stage: Option<StageId>,
    /// Player vitals, absent before the first attempt.
    pub player: Option<PlayerSnapshot>,
    /// Score of the attempt.
    pub score: u64,
    /// Units defeated in the attempt.
    pub kills: u32,
    /// Units that must be defeated to clear the stage.
    pub total_units: u32,
    /// Index of the question currently presented.
    pub question_index: usize,
    /// Time left on the wrong-answer stun.
    pub stun_remaining: Duration,
    /// Live units sorted by identifier.
    pub units: Vec<UnitSnapshot>,
    /// Active damage field.
    pub field: Option<DamageField>,
    /// Remaining cooldown of every equipped ability, in slot order.
    pub cooldowns: Vec<(AbilityId, Duration)>,
}

/// Stage attempt state machine.
#[derive(Debug)]
pub struct Session<P> {
    store: P,
    tuning: Tuning,
    rng: ChaCha8Rng,
    stage: Option<StageDefinition>,
    questions: Vec<Question>,
    attempt: Option<Attempt>,
    notifications: Vec<Notification>,
}

impl<P: ProgressionStore> Session<P> {
    /// Creates an idle session writing rewards to `store`.
    ///
    /// `seed` drives the critical-hit roll so that attempts are reproducible.
    #[must_use]
    pub fn new(store: P, tuning: Tuning, seed: u64) -> Self {
        Self {
            store,
            tuning,
            rng: ChaCha8Rng::seed_from_u64(seed),
            stage: None,
            questions: Vec::new(),
            attempt: None,
            notifications: Vec::new(),
        }
    }

    /// Selects a stage and loads the question deck, discarding any attempt.
    ///
    /// Fails without touching the session when the catalog cannot supply a
    /// playable stage or question deck.
    pub fn select_stage(
        &mut self,
        catalog: &impl StageCatalog,
        questions: &impl QuestionSource,
        stage: StageId,
    ) -> Result<(), SetupError> {
        let definition = catalog.stage(stage).ok_or(SetupError::StageNotFound(stage))?;
        if definition.units.is_empty() {
            return Err(SetupError::EmptyRoster(stage));
        }
        if definition.spawn_delays.len() > definition.units.len() {
            return Err(SetupError::ScheduleMismatch {
                stage,
                units: definition.units.len(),
                delays: definition.spawn_delays.len(),
            });
        }

        let deck = questions.questions();
        if deck.is_empty() {
            return Err(SetupError::NoQuestions);
        }
        if let Some(index) = deck
            .iter()
            .position(|question| question.answer >= question.options.len())
        {
            return Err(SetupError::InvalidQuestion(index));
        }

        info!("selected stage {} ({})", stage.get(), definition.name);
        self.stage = Some(definition.clone());
        self.questions = deck.to_vec();
        self.attempt = None;
        Ok(())
    }

    /// Starts a fresh attempt, or retries after a finished one.
    pub fn start(&mut self, now: Timestamp) -> Result<(), SetupError> {
        let from = self.phase();
        if !from.can_transition_to(SessionPhase::Playing) {
            return Err(SetupError::InvalidTransition {
                from,
                to: SessionPhase::Playing,
            });
        }
        let stage = self.stage.as_ref().ok_or(SetupError::NoStageSelected)?;

        let progression = self.store.snapshot();
        info!(
            "starting stage {} as {:?} level {}",
            stage.id.get(),
            progression.class,
            progression.level
        );
        self.attempt = Some(Attempt::begin(
            stage.clone(),
            progression,
            self.questions.len(),
            &self.tuning,
            now,
            &mut self.notifications,
        ));
        Ok(())
    }

    /// Advances the attempt to `now`.
    ///
    /// The elapsed time is derived from the previous tick, so calling this
    /// twice with the same timestamp changes nothing.
    pub fn tick(&mut self, now: Timestamp) -> LoopControl {
        let Some(attempt) = self.attempt.as_mut() else {
            return LoopControl::Stop;
        };

        match query::phase(&attempt.world) {
            SessionPhase::Playing => attempt.step(now, &mut self.notifications),
            SessionPhase::Clearing => attempt.hold(now, &mut self.store, &mut self.notifications),
            SessionPhase::Standby | SessionPhase::Clear | SessionPhase::GameOver => {}
        }

        match query::phase(&attempt.world) {
            SessionPhase::Playing | SessionPhase::Clearing => LoopControl::Continue,
            SessionPhase::Standby | SessionPhase::Clear | SessionPhase::GameOver => {
                LoopControl::Stop
            }
        }
    }

    /// Answers the current question with the option at `option`.
    ///
    /// A correct answer unlocks one primary attack; a wrong one stuns the
    /// player. Either way the deck moves to the next question. Returns whether
    /// the answer was correct.
    pub fn submit_answer(
        &mut self,
        option: usize,
        now: Timestamp,
    ) -> Result<bool, ActionRejected> {
        let attempt = self
            .attempt
            .as_mut()
            .filter(|attempt| query::phase(&attempt.world) == SessionPhase::Playing)
            .ok_or(ActionRejected::NotPlaying)?;

        if query::is_stunned(&attempt.world, now) {
            self.notifications
                .push(Notification::Feedback(Feedback::StillStunned));
            return Err(ActionRejected::Stunned);
        }

        let question = self
            .questions
            .get(query::question_index(&attempt.world))
            .ok_or(ActionRejected::NotPlaying)?;
        if option >= question.options.len() {
            return Err(ActionRejected::InvalidOption(option));
        }

        let correct = option == question.answer;
        let mut commands = Vec::with_capacity(2);
        if correct {
            self.notifications
                .push(Notification::Feedback(Feedback::CorrectAnswer));
            let units = query::unit_view(&attempt.world);
            let critical = CriticalRule::new(
                self.tuning.critical_chance,
                self.tuning.critical_multiplier,
            );
            if let Some(strike) = primary_attack(
                &units,
                attempt.progression.attack_power(),
                critical,
                &mut self.rng,
            ) {
                attempt.primary_effects(strike, &mut self.notifications);
                commands.push(Command::StrikeUnits {
                    strikes: vec![strike],
                });
            }
        } else {
            let stun = self.tuning.stun();
            self.notifications
                .push(Notification::Feedback(Feedback::WrongAnswer { stun }));
            commands.push(Command::Stun {
                until: now.after(stun),
            });
        }
        commands.push(Command::AdvanceQuestion);

        let _ = attempt.apply_batch(commands, now, &mut self.notifications);
        Ok(correct)
    }

    /// Uses the equipped ability `ability`.
    pub fn use_ability(
        &mut self,
        ability: &AbilityId,
        now: Timestamp,
    ) -> Result<(), ActionRejected> {
        let attempt = self
            .attempt
            .as_mut()
            .filter(|attempt| query::phase(&attempt.world) == SessionPhase::Playing)
            .ok_or(ActionRejected::NotPlaying)?;

        let units = query::unit_view(&attempt.world);
        let invocation = Invocation {
            units: &units,
            attack: attempt.progression.attack_power(),
            level: attempt.progression.level,
            resource: query::player(&attempt.world).resource,
            stunned: query::is_stunned(&attempt.world, now),
            ready_at: query::cooldown_ready_at(&attempt.world, ability),
            now,
        };

        let outcome = match attempt.abilities.invoke(ability, invocation) {
            Ok(outcome) => outcome,
            Err(rejection) => {
                debug!("ability `{}` rejected: {rejection}", ability.as_str());
                if let Some(feedback) = rejection.feedback() {
                    self.notifications.push(Notification::Feedback(feedback));
                }
                return Err(rejection.into());
            }
        };

        self.notifications
            .extend(outcome.effects.into_iter().map(Notification::Effect));
        self.notifications
            .push(Notification::Feedback(outcome.feedback));
        let _ = attempt.apply_batch(outcome.commands, now, &mut self.notifications);
        Ok(())
    }

    /// Abandons the current attempt and returns to stage selection.
    pub fn leave(&mut self) {
        if let Some(attempt) = self.attempt.take() {
            info!(
                "left stage {} in {:?}",
                attempt.stage.id.get(),
                query::phase(&attempt.world)
            );
        }
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.attempt
            .as_ref()
            .map_or(SessionPhase::Standby, |attempt| query::phase(&attempt.world))
    }

    /// Selected stage, shown while in standby.
    #[must_use]
    pub fn stage(&self) -> Option<&StageDefinition> {
        self.stage.as_ref()
    }

    /// Question the player is expected to answer next.
    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        let index = self
            .attempt
            .as_ref()
            .map_or(0, |attempt| query::question_index(&attempt.world));
        self.questions.get(index)
    }

    /// Tuning the session runs with.
    #[must_use]
    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    /// Progression store receiving rewards.
    #[must_use]
    pub fn store(&self) -> &P {
        &self.store
    }

    /// Captures an immutable view of the session at `now`.
    #[must_use]
    pub fn snapshot(&self, now: Timestamp) -> SessionSnapshot {
        let stage = self.stage.as_ref().map(|stage| stage.id);
        let Some(attempt) = self.attempt.as_ref() else {
            return SessionSnapshot {
                phase: SessionPhase::Standby,
                stage,
                player: None,
                score: 0,
                kills: 0,
                total_units: self.stage.as_ref().map_or(0, StageDefinition::total_units),
                question_index: 0,
                stun_remaining: Duration::ZERO,
                units: Vec::new(),
                field: None,
                cooldowns: Vec::new(),
            };
        };

        let world = &attempt.world;
        SessionSnapshot {
            phase: query::phase(world),
            stage,
            player: Some(query::player(world)),
            score: query::score(world),
            kills: query::kills(world),
            total_units: query::total_units(world),
            question_index: query::question_index(world),
            stun_remaining: query::stunned_until(world)
                .map_or(Duration::ZERO, |until| until.saturating_since(now)),
            units: query::unit_view(world).into_vec(),
            field: query::field(world),
            cooldowns: attempt
                .abilities
                .definitions()
                .iter()
                .map(|definition| {
                    let remaining = query::cooldown_ready_at(world, &definition.id)
                        .map_or(Duration::ZERO, |ready_at| ready_at.saturating_since(now));
                    (definition.id.clone(), remaining)
                })
                .collect(),
        }
    }

    /// Takes every notification queued since the previous call.
    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }
}

/// Runtime state of one attempt: the world plus every system driving it.
#[derive(Debug)]
struct Attempt {
    stage: StageDefinition,
    progression: ProgressionSnapshot,
    world: World,
    spawning: Spawning,
    contact: Contact,
    field: FieldStrikes,
    quick_start: QuickStart,
    ally: Option<Ally>,
    abilities: Abilities,
    clearing_hold: Duration,
    last_tick: Timestamp,
    clearing_until: Option<Timestamp>,
    rewarded: bool,
}

impl Attempt {
    fn begin(
        stage: StageDefinition,
        progression: ProgressionSnapshot,
        question_count: usize,
        tuning: &Tuning,
        now: Timestamp,
        notifications: &mut Vec<Notification>,
    ) -> Self {
        let world = World::new(Setup::new(&stage, &progression, question_count));
        let mut attempt = Self {
            spawning: Spawning::new(&stage),
            contact: Contact::new(),
            field: FieldStrikes::new(),
            quick_start: QuickStart::new(
                progression.equipment.quick_kill_count(),
                tuning.quick_start_delay(),
            ),
            ally: progression.ally.as_ref().map(Ally::new),
            abilities: Abilities::new(
                progression.abilities.clone(),
                tuning.cooldown(),
                tuning.field_damage_ratio,
            ),
            clearing_hold: tuning.clearing_hold(),
            last_tick: now,
            clearing_until: None,
            rewarded: false,
            stage,
            progression,
            world,
        };

        let mut commands = vec![Command::EnterPhase {
            phase: SessionPhase::Playing,
        }];
        attempt.spawning.prime(&mut commands);
        let _ = attempt.apply_batch(commands, now, notifications);
        attempt
    }

    /// Advances a playing attempt to `now`.
    ///
    /// Within a tick, due units spawn first and then everything moves. The
    /// ally strikes before the field pulses, and contact is resolved last.
    fn step(&mut self, now: Timestamp, notifications: &mut Vec<Notification>) {
        let dt = now.saturating_since(self.last_tick);
        self.last_tick = self.last_tick.max(now);
        let tick_events = self.apply_batch(vec![Command::Tick { dt }], now, notifications);

        let mut commands = Vec::new();
        self.spawning
            .handle(&tick_events, query::phase(&self.world), &mut commands);
        commands.push(Command::AdvanceUnits { dt });
        let _ = self.apply_batch(commands, now, notifications);

        let mut commands = Vec::new();
        let phase = query::phase(&self.world);
        let units = query::unit_view(&self.world);
        self.quick_start
            .handle(&tick_events, phase, &units, &mut commands);
        let _ = self.apply_batch(commands, now, notifications);

        if let Some(ally) = self.ally.as_mut() {
            let mut commands = Vec::new();
            let units = query::unit_view(&self.world);
            ally.handle(&tick_events, query::phase(&self.world), &units, &mut commands);
            let _ = self.apply_batch(commands, now, notifications);
        }

        let field_events =
            self.apply_batch(vec![Command::AdvanceField { dt }], now, notifications);
        let mut commands = Vec::new();
        self.field
            .handle(&field_events, &query::unit_view(&self.world), &mut commands);
        let _ = self.apply_batch(commands, now, notifications);

        let mut commands = Vec::new();
        self.contact.handle(
            &tick_events,
            query::phase(&self.world),
            &query::unit_view(&self.world),
            query::player(&self.world).defense,
            &mut commands,
        );
        let _ = self.apply_batch(commands, now, notifications);
    }

    /// Finishes the clearing hold and pays the reward exactly once.
    fn hold(
        &mut self,
        now: Timestamp,
        store: &mut impl ProgressionStore,
        notifications: &mut Vec<Notification>,
    ) {
        if self.clearing_until.map_or(true, |until| now < until) {
            return;
        }

        let _ = self.apply_batch(
            vec![Command::EnterPhase {
                phase: SessionPhase::Clear,
            }],
            now,
            notifications,
        );
        if self.rewarded || query::phase(&self.world) != SessionPhase::Clear {
            return;
        }
        self.rewarded = true;

        let reward = rewards::clear_reward(
            &self.stage,
            &self.progression,
            query::score(&self.world),
            query::kills(&self.world),
        );
        store.apply_reward(&reward);
        store.record_clear(reward.stage);
        info!(
            "cleared stage {}: score {}, {} exp, {} currency, {} tickets",
            reward.stage.get(),
            reward.score,
            reward.experience,
            reward.currency,
            reward.tickets
        );
        notifications.push(Notification::StageCleared(reward));
    }

    /// Applies `commands` in order and reacts to the resulting events.
    fn apply_batch(
        &mut self,
        commands: Vec<Command>,
        now: Timestamp,
        notifications: &mut Vec<Notification>,
    ) -> Vec<Event> {
        let mut events = Vec::new();
        for command in commands {
            if let Command::StrikeUnits { strikes } = &command {
                self.support_effects(strikes, notifications);
            }
            world::apply(&mut self.world, command, &mut events);
        }
        self.observe(&events, now, notifications);
        events
    }

    fn observe(
        &mut self,
        events: &[Event],
        now: Timestamp,
        notifications: &mut Vec<Notification>,
    ) {
        let mut quick_kills = 0;
        for event in events {
            match event {
                Event::PhaseChanged {
                    phase: SessionPhase::Clearing,
                } => {
                    self.clearing_until = Some(now.after(self.clearing_hold));
                    for kind in [EffectKind::Fire, EffectKind::Magic] {
                        notifications.push(Notification::Effect(EffectEvent {
                            kind,
                            target: EffectTarget::Player,
                            level_scale: FLOURISH_SCALE,
                            damage: 0,
                            critical: true,
                        }));
                    }
                }
                Event::PhaseChanged {
                    phase: SessionPhase::GameOver,
                } => {
                    info!(
                        "stage {} failed with score {}",
                        self.stage.id.get(),
                        query::score(&self.world)
                    );
                    notifications.push(Notification::StageFailed {
                        stage: self.stage.id,
                        score: query::score(&self.world),
                        kills: query::kills(&self.world),
                    });
                }
                Event::PlayerDamaged { damage, .. } => {
                    notifications.push(Notification::Effect(EffectEvent {
                        kind: EffectKind::Slash,
                        target: EffectTarget::Player,
                        level_scale: SUPPORT_SCALE,
                        damage: *damage,
                        critical: true,
                    }));
                    notifications.push(Notification::Feedback(Feedback::ContactDamage {
                        damage: *damage,
                    }));
                }
                Event::UnitDefeated {
                    source: StrikeSource::QuickStart,
                    ..
                } => quick_kills += 1,
                _ => {}
            }
        }

        if quick_kills > 0 {
            notifications.push(Notification::Feedback(Feedback::QuickStart {
                kills: quick_kills,
            }));
        }
    }

    /// Effects for a primary attack: the class signature plus one per weapon tag.
    fn primary_effects(&self, strike: Strike, notifications: &mut Vec<Notification>) {
        let critical = strike.source == StrikeSource::PrimaryCritical;
        let level = self.progression.level;
        notifications.push(Notification::Effect(EffectEvent {
            kind: self.progression.class.signature_effect(),
            target: EffectTarget::Unit(strike.unit),
            level_scale: level,
            damage: strike.damage,
            critical,
        }));
        for tag in &self.progression.equipment.damage_tags {
            notifications.push(Notification::Effect(EffectEvent {
                kind: tag.effect_kind(),
                target: EffectTarget::Unit(strike.unit),
                level_scale: level,
                damage: 0,
                critical: false,
            }));
        }
        if critical {
            notifications.push(Notification::Feedback(Feedback::CriticalHit {
                damage: strike.damage,
            }));
        }
    }

    /// Effects for hits that no player action produced.
    fn support_effects(&self, strikes: &[Strike], notifications: &mut Vec<Notification>) {
        if query::phase(&self.world) != SessionPhase::Playing {
            return;
        }

        let units: UnitView = query::unit_view(&self.world);
        for strike in strikes {
            let target = EffectTarget::Unit(strike.unit);
            let effect = |kind, level_scale, damage, critical| {
                Notification::Effect(EffectEvent {
                    kind,
                    target,
                    level_scale,
                    damage,
                    critical,
                })
            };
            match strike.source {
                StrikeSource::Ally => {
                    let ally = effect(EffectKind::Magic, SUPPORT_SCALE, strike.damage, false);
                    notifications.push(ally);
                }
                StrikeSource::Field => {
                    let pulse = effect(EffectKind::Ice, SUPPORT_SCALE, strike.damage, false);
                    notifications.push(pulse);
                }
                StrikeSource::QuickStart => {
                    let max_health = units
                        .get(strike.unit)
                        .map_or(strike.damage, |unit| unit.max_health);
                    notifications.push(effect(EffectKind::Slash, FLOURISH_SCALE, max_health, true));
                    notifications.push(effect(EffectKind::Coin, QUICK_START_COIN_SCALE, 0, true));
                }
                StrikeSource::Primary
                | StrikeSource::PrimaryCritical
                | StrikeSource::Ability
                | StrikeSource::AbilitySweep => {}
            }
        }
    }
}

#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Quiz Defence engine.
//!
//! This crate defines the message surface that connects the session state
//! machine, the authoritative world, and pure systems. The session submits
//! [`Command`] values describing desired mutations, the world executes those
//! commands via its `apply` entry point, and then broadcasts [`Event`] values
//! for systems to react to deterministically. Systems consume event streams,
//! query immutable snapshots, and respond exclusively with new command batches.
//! Everything that leaves the engine for renderers and toasts is expressed as a
//! [`Notification`].

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub mod progression;

pub use progression::{
    AllyProfile, BaseStats, DamageTag, EquipmentItem, EquipmentModifiers, ItemEffect, ItemSlot,
    PlayerClass, ProgressionSnapshot,
};

/// Nominal frame length that speeds and spawn delays are expressed against.
pub const FRAME_MILLIS: f64 = 16.0;

/// Advancement at which a unit reaches the defended line and deals contact damage.
pub const CONTACT_THRESHOLD: f64 = 85.0;

/// Advancement a unit is pushed back to after dealing contact damage.
pub const KNOCKBACK_POSITION: f64 = 75.0;

/// Upper bound of the advancement track.
pub const POSITION_LIMIT: f64 = 100.0;

/// Converts an elapsed duration into nominal frame equivalents.
#[must_use]
pub fn frames_in(dt: Duration) -> f64 {
    dt.as_nanos() as f64 / 1_000_000.0 / FRAME_MILLIS
}

/// Monotonic wall-clock instant measured from an arbitrary origin chosen by the driver.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Timestamp(Duration);

impl Timestamp {
    /// The origin instant.
    pub const ZERO: Self = Self(Duration::ZERO);

    /// Creates a timestamp the provided number of milliseconds after the origin.
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(Duration::from_millis(millis))
    }

    /// Creates a timestamp from a duration measured since the origin.
    #[must_use]
    pub const fn from_duration(since_origin: Duration) -> Self {
        Self(since_origin)
    }

    /// Duration elapsed since the origin.
    #[must_use]
    pub const fn as_duration(&self) -> Duration {
        self.0
    }

    /// Time elapsed since `earlier`, saturating at zero when the clock ran backwards.
    #[must_use]
    pub fn saturating_since(self, earlier: Timestamp) -> Duration {
        self.0.saturating_sub(earlier.0)
    }

    /// Instant that lies `delay` after this one.
    #[must_use]
    pub fn after(self, delay: Duration) -> Self {
        Self(self.0.saturating_add(delay))
    }
}

/// Unique identifier assigned to a spawned unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitId(u32);

impl UnitId {
    /// Creates a new unit identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Identifier of a stage within the catalog.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StageId(u32);

impl StageId {
    /// Creates a new stage identifier.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Identifier of an ability as issued by the progression store.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AbilityId(String);

impl AbilityId {
    /// Creates an ability identifier from its textual key.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Textual key of the ability.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Closed set of hostile unit archetypes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    /// Fragile unit that closes distance quickly.
    LightFast,
    /// Baseline unit that arrives in numbers.
    LightSwarm,
    /// Slow unit with heavy defense.
    HeavyTank,
    /// Stage boss.
    EliteBoss,
}

/// Immutable description of a unit as defined by the stage catalog.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct UnitTemplate {
    /// Archetype of the unit.
    pub kind: UnitKind,
    /// Health the unit spawns with.
    pub health: u32,
    /// Advancement per nominal frame before any slow is applied.
    pub speed: f64,
    /// Damage dealt to the player on contact before defense.
    pub attack: u32,
    /// Flat reduction applied to incoming hits.
    pub defense: u32,
}

/// Rewards granted for clearing a stage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageReward {
    /// Experience granted on clear.
    pub experience: u32,
    /// Currency granted on clear.
    pub currency: u32,
    /// Draw tickets granted on clear.
    pub tickets: u32,
    /// Egg tickets granted on clear.
    pub egg_tickets: u32,
}

/// Immutable stage definition supplied by the stage catalog.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StageDefinition {
    /// Identifier of the stage.
    pub id: StageId,
    /// Display name shown in standby.
    pub name: String,
    /// Short briefing shown in standby.
    #[serde(default)]
    pub description: String,
    /// Ordered unit roster.
    pub units: Vec<UnitTemplate>,
    /// Spawn delay of each roster entry in frame equivalents, parallel to `units`.
    #[serde(default)]
    pub spawn_delays: Vec<f64>,
    /// Rewards granted on clear.
    #[serde(default)]
    pub reward: StageReward,
    /// Whether clearing the stage offers the player a new class.
    #[serde(default)]
    pub offers_class_unlock: bool,
}

impl StageDefinition {
    /// Spawn delay for the roster entry at `index`; entries without a delay spawn immediately.
    #[must_use]
    pub fn spawn_delay(&self, index: usize) -> f64 {
        self.spawn_delays.get(index).copied().unwrap_or(0.0)
    }

    /// Number of units that must be defeated to clear the stage.
    #[must_use]
    pub fn total_units(&self) -> u32 {
        u32::try_from(self.units.len()).unwrap_or(u32::MAX)
    }
}

/// Question supplied by the trivia source.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// Prompt shown to the player.
    pub prompt: String,
    /// Selectable answers.
    pub options: Vec<String>,
    /// Index of the correct entry within `options`.
    pub answer: usize,
}

/// Lifecycle phase of a stage attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SessionPhase {
    /// Idle before an attempt, showing stage metadata.
    Standby,
    /// Attempt in progress.
    Playing,
    /// Cosmetic hold after the last unit fell.
    Clearing,
    /// Attempt won and rewarded.
    Clear,
    /// Attempt lost.
    GameOver,
}

impl SessionPhase {
    /// Reports whether the lifecycle permits moving from `self` to `next`.
    ///
    /// Every phase may exit to `Standby`. `Playing` is entered from `Standby` or
    /// as a retry from either terminal phase, never from itself.
    #[must_use]
    pub const fn can_transition_to(self, next: SessionPhase) -> bool {
        matches!(
            (self, next),
            (Self::Standby, Self::Playing)
                | (Self::Playing, Self::Clearing)
                | (Self::Playing, Self::GameOver)
                | (Self::Clearing, Self::Clear)
                | (Self::Clear, Self::Playing)
                | (Self::GameOver, Self::Playing)
                | (Self::Playing, Self::Standby)
                | (Self::Clearing, Self::Standby)
                | (Self::Clear, Self::Standby)
                | (Self::GameOver, Self::Standby)
        )
    }

    /// Reports whether the phase ends an attempt.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Clear | Self::GameOver)
    }
}

/// Targeting strategy of an ability.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "target", rename_all = "snake_case")]
pub enum TargetingStrategy {
    /// One hit on the front unit.
    Single,
    /// One hit on each of the `hit_count` front units.
    Multi {
        /// Maximum number of units struck.
        #[serde(default = "default_hit_count")]
        hit_count: u32,
    },
    /// One hit on every live unit.
    All,
    /// Recurring damage on every live unit.
    DamageField {
        /// Lifetime of the field in frame equivalents.
        #[serde(default = "default_field_duration")]
        duration_frames: f64,
        /// Frames between pulses.
        #[serde(default = "default_field_interval")]
        interval_frames: f64,
        /// Halves the speed of every live unit when cast.
        #[serde(default)]
        slows_units: bool,
    },
    /// Adds one shield charge.
    SelfShield,
}

fn default_hit_count() -> u32 {
    2
}

fn default_field_duration() -> f64 {
    300.0
}

fn default_field_interval() -> f64 {
    60.0
}

fn default_multiplier() -> f64 {
    1.0
}

/// Immutable ability definition supplied by the progression store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AbilityDefinition {
    /// Identifier of the ability.
    pub id: AbilityId,
    /// Display name used in feedback.
    pub name: String,
    /// Resource debited on use.
    pub resource_cost: u32,
    /// Multiplier applied to the player's attack.
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    /// How the ability picks its targets.
    pub strategy: TargetingStrategy,
}

/// Session-scoped recurring damage effect.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DamageField {
    /// Damage applied to every live unit per pulse.
    pub damage: u32,
    /// Frames remaining before the field expires.
    pub remaining_frames: f64,
    /// Frames between pulses.
    pub interval_frames: f64,
    /// Frames accumulated toward the next pulse.
    pub timer_frames: f64,
}

impl DamageField {
    /// Creates a freshly cast field.
    #[must_use]
    pub const fn new(damage: u32, duration_frames: f64, interval_frames: f64) -> Self {
        Self {
            damage,
            remaining_frames: duration_frames,
            interval_frames,
            timer_frames: 0.0,
        }
    }
}

/// Origin of a hit against a unit; determines the score credited on a kill.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StrikeSource {
    /// Non-critical primary attack.
    Primary,
    /// Critical primary attack.
    PrimaryCritical,
    /// Single-target ability.
    Ability,
    /// Multi-target or all-target ability.
    AbilitySweep,
    /// Ally auto-attack.
    Ally,
    /// Damage field pulse.
    Field,
    /// Quick-start item effect.
    QuickStart,
}

impl StrikeSource {
    /// Score credited when a hit from this source defeats a unit.
    #[must_use]
    pub const fn kill_score(self) -> u64 {
        match self {
            Self::Primary | Self::Ally | Self::QuickStart => 100,
            Self::PrimaryCritical => 200,
            Self::Ability | Self::AbilitySweep => 150,
            Self::Field => 50,
        }
    }
}

/// Resolved hit against a single unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Strike {
    /// Unit receiving the hit.
    pub unit: UnitId,
    /// Damage dealt; always at least one.
    pub damage: u32,
    /// Origin of the hit.
    pub source: StrikeSource,
}

/// Immutable representation of a single unit's state used for queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UnitSnapshot {
    /// Unique identifier assigned to the unit.
    pub id: UnitId,
    /// Archetype of the unit.
    pub kind: UnitKind,
    /// Current health.
    pub health: u32,
    /// Health the unit spawned with.
    pub max_health: u32,
    /// Advancement toward the defended line.
    pub position: f64,
    /// Effective advancement per nominal frame.
    pub speed: f64,
    /// Contact attack.
    pub attack: u32,
    /// Flat defense.
    pub defense: u32,
}

/// Read-only snapshot describing all live units.
#[derive(Clone, Debug, Default)]
pub struct UnitView {
    snapshots: Vec<UnitSnapshot>,
}

impl UnitView {
    /// Creates a new unit view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<UnitSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured unit snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &UnitSnapshot> {
        self.snapshots.iter()
    }

    /// Number of live units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether no unit is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Snapshot of the unit with the provided identifier.
    #[must_use]
    pub fn get(&self, id: UnitId) -> Option<&UnitSnapshot> {
        self.snapshots
            .binary_search_by_key(&id, |snapshot| snapshot.id)
            .ok()
            .map(|index| &self.snapshots[index])
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<UnitSnapshot> {
        self.snapshots
    }
}

/// Visual family requested from the renderer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EffectKind {
    /// Blade strike.
    Slash,
    /// Arcane burst.
    Magic,
    /// Coin shower.
    Coin,
    /// Flames.
    Fire,
    /// Frost.
    Ice,
    /// Shadow.
    Dark,
    /// Restoration glow.
    Heal,
    /// Barrier shimmer.
    Shield,
}

/// Recipient of an effect.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EffectTarget {
    /// A live unit.
    Unit(UnitId),
    /// The defended position.
    Player,
}

/// Fire-and-forget request for the renderer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EffectEvent {
    /// Visual family.
    pub kind: EffectKind,
    /// Recipient of the effect.
    pub target: EffectTarget,
    /// Scale factor, usually the player level.
    pub level_scale: u32,
    /// Damage number to display; zero for purely cosmetic effects.
    pub damage: u32,
    /// Whether the effect should be emphasised as critical.
    pub critical: bool,
}

/// Informational toast-style feedback.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Feedback {
    /// The submitted answer was correct.
    CorrectAnswer,
    /// The submitted answer was wrong and the player is stunned.
    WrongAnswer {
        /// Length of the stun.
        stun: Duration,
    },
    /// The primary attack landed a critical hit.
    CriticalHit {
        /// Damage dealt.
        damage: u32,
    },
    /// An action was attempted while stunned.
    StillStunned,
    /// An ability was attempted without enough resource.
    InsufficientResource {
        /// Cost of the ability.
        required: u32,
        /// Resource available.
        available: u32,
    },
    /// An ability was attempted while cooling down.
    CoolingDown {
        /// Ability that was attempted.
        ability: AbilityId,
    },
    /// An ability resolved against one or more units.
    AbilityStruck {
        /// Name of the ability.
        name: String,
        /// Units struck.
        targets: u32,
        /// Total damage dealt.
        total_damage: u32,
    },
    /// An offensive ability found nothing to hit and its cost was refunded.
    NoTargets {
        /// Name of the ability.
        name: String,
    },
    /// A damage field was deployed.
    FieldDeployed {
        /// Name of the ability.
        name: String,
    },
    /// A shield charge was granted.
    ShieldRaised {
        /// Name of the ability.
        name: String,
    },
    /// Units reached the line and damaged the player.
    ContactDamage {
        /// Total damage taken.
        damage: u32,
    },
    /// The quick-start item effect defeated units.
    QuickStart {
        /// Units defeated.
        kills: u32,
    },
}

/// Rewards and summary produced when an attempt is cleared.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClearReward {
    /// Stage that was cleared.
    pub stage: StageId,
    /// Experience granted.
    pub experience: u32,
    /// Currency granted.
    pub currency: u32,
    /// Draw tickets granted.
    pub tickets: u32,
    /// Egg tickets granted.
    pub egg_tickets: u32,
    /// Final score of the attempt.
    pub score: u64,
    /// Units defeated during the attempt.
    pub kills: u32,
    /// Whether the stage had not been cleared before.
    pub first_clear: bool,
    /// Whether the player may unlock a new class.
    pub class_unlock_offer: bool,
}

/// Outbound message consumed by renderers and UI layers.
#[derive(Clone, Debug, PartialEq)]
pub enum Notification {
    /// Visual effect request.
    Effect(EffectEvent),
    /// Toast-style feedback.
    Feedback(Feedback),
    /// The attempt was cleared and rewards were written back.
    StageCleared(ClearReward),
    /// The attempt was lost.
    StageFailed {
        /// Stage that was attempted.
        stage: StageId,
        /// Final score of the attempt.
        score: u64,
        /// Units defeated before the loss.
        kills: u32,
    },
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Moves the attempt into the provided phase.
    EnterPhase {
        /// Phase to enter.
        phase: SessionPhase,
    },
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Wall-clock time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Moves every live unit forward by the frames in `dt`.
    AdvanceUnits {
        /// Wall-clock time to integrate.
        dt: Duration,
    },
    /// Runs the active damage field's timers for the frames in `dt`.
    AdvanceField {
        /// Wall-clock time to integrate.
        dt: Duration,
    },
    /// Releases the roster entry at the provided index.
    SpawnUnit {
        /// Index into the stage roster.
        roster_index: usize,
    },
    /// Applies resolved hits to units.
    StrikeUnits {
        /// Hits to apply in order.
        strikes: Vec<Strike>,
    },
    /// Applies contact damage to the player and knocks the attackers back.
    StrikePlayer {
        /// Units in contact this tick.
        attackers: Vec<UnitId>,
        /// Total damage dealt.
        damage: u32,
    },
    /// Multiplies the speed of every live unit.
    SlowUnits {
        /// Factor applied to current speeds.
        factor: f64,
    },
    /// Debits the resource pool.
    SpendResource {
        /// Amount to debit.
        amount: u32,
    },
    /// Credits the resource pool, clamped to its maximum.
    RefundResource {
        /// Amount to credit.
        amount: u32,
    },
    /// Starts an ability cooldown.
    StartCooldown {
        /// Ability cooling down.
        ability: AbilityId,
        /// Instant at which the ability becomes usable again.
        ready_at: Timestamp,
    },
    /// Adds one shield charge.
    GrantShield,
    /// Blocks player actions until the provided instant.
    Stun {
        /// Instant at which the stun lapses.
        until: Timestamp,
    },
    /// Moves to the next question, wrapping around the deck.
    AdvanceQuestion,
    /// Replaces any active damage field.
    DeployField {
        /// Field to deploy.
        field: DamageField,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Announces that the attempt entered a new phase.
    PhaseChanged {
        /// Phase that became active.
        phase: SessionPhase,
    },
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Wall-clock time that elapsed in the tick.
        dt: Duration,
    },
    /// Confirms that a roster entry was released.
    UnitSpawned {
        /// Identifier assigned to the unit.
        unit: UnitId,
        /// Archetype of the unit.
        kind: UnitKind,
        /// Index into the stage roster.
        roster_index: usize,
    },
    /// Confirms that a unit took damage and survived.
    UnitDamaged {
        /// Unit that was hit.
        unit: UnitId,
        /// Damage dealt.
        damage: u32,
        /// Health left.
        remaining: u32,
    },
    /// Confirms that a unit was defeated and removed.
    UnitDefeated {
        /// Unit that was defeated.
        unit: UnitId,
        /// Origin of the lethal hit.
        source: StrikeSource,
        /// Score credited for the kill.
        score: u64,
    },
    /// Confirms that a unit was pushed back after contact.
    UnitKnockedBack {
        /// Unit that was pushed back.
        unit: UnitId,
        /// Position after the knockback.
        position: f64,
    },
    /// Confirms that contact damage was applied to the player.
    PlayerDamaged {
        /// Damage dealt.
        damage: u32,
        /// Health left.
        remaining: u32,
    },
    /// Confirms that unit speeds were scaled.
    UnitsSlowed {
        /// Factor applied.
        factor: f64,
    },
    /// Reports the resource pool after a change.
    ResourceChanged {
        /// Current resource.
        current: u32,
    },
    /// Confirms that an ability started cooling down.
    CooldownStarted {
        /// Ability cooling down.
        ability: AbilityId,
        /// Instant at which the ability becomes usable again.
        ready_at: Timestamp,
    },
    /// Confirms that a shield charge was granted.
    ShieldGranted {
        /// Shield charges after the grant.
        shields: u32,
    },
    /// Confirms that the player was stunned.
    Stunned {
        /// Instant at which the stun lapses.
        until: Timestamp,
    },
    /// Confirms that the question deck advanced.
    QuestionAdvanced {
        /// Index of the question now presented.
        index: usize,
    },
    /// Confirms that a damage field was deployed.
    FieldDeployed {
        /// Damage per pulse.
        damage: u32,
    },
    /// Reports that the active field pulsed.
    FieldPulsed {
        /// Damage to apply to every live unit.
        damage: u32,
    },
    /// Reports that the active field expired.
    FieldExpired,
}

#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Resource and cooldown gated abilities.
//!
//! [`Abilities::invoke`] validates a request against the current runtime
//! state and, when accepted, returns the full command batch that debits the
//! resource, starts the cooldown and executes the ability's
//! [`TargetingStrategy`]. A rejected request produces no commands at all.

use std::time::Duration;

use log::debug;
use quiz_defence_core::{
    AbilityDefinition, AbilityId, Command, DamageField, EffectEvent, EffectKind, EffectTarget,
    Feedback, Strike, StrikeSource, TargetingStrategy, Timestamp, UnitSnapshot, UnitView,
};
use quiz_defence_system_combat::{front_unit, strike_damage, threat_order};
use thiserror::Error;

/// Speed factor applied to every live unit by slowing fields.
const FIELD_SLOW_FACTOR: f64 = 0.5;

/// Reasons an ability request is refused.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum AbilityRejection {
    /// The ability is not equipped.
    #[error("ability `{}` is not equipped", .0.as_str())]
    UnknownAbility(AbilityId),
    /// The resource pool is below the ability's cost.
    #[error("ability needs {required} resource but only {available} is available")]
    InsufficientResource {
        /// Cost of the ability.
        required: u32,
        /// Resource available.
        available: u32,
    },
    /// The ability's cooldown has not expired.
    #[error("ability `{}` is cooling down", .ability.as_str())]
    CoolingDown {
        /// Ability that was attempted.
        ability: AbilityId,
        /// Instant at which it becomes usable.
        ready_at: Timestamp,
    },
    /// The player is stunned.
    #[error("abilities are blocked while stunned")]
    Stunned,
}

impl AbilityRejection {
    /// Feedback shown to the player, if the rejection is player-facing.
    #[must_use]
    pub fn feedback(&self) -> Option<Feedback> {
        match self {
            Self::UnknownAbility(_) => None,
            Self::CoolingDown { ability, .. } => Some(Feedback::CoolingDown {
                ability: ability.clone(),
            }),
            Self::InsufficientResource {
                required,
                available,
            } => Some(Feedback::InsufficientResource {
                required: *required,
                available: *available,
            }),
            Self::Stunned => Some(Feedback::StillStunned),
        }
    }
}

/// Runtime state an ability request is validated and resolved against.
#[derive(Clone, Copy, Debug)]
pub struct Invocation<'a> {
    /// Live units.
    pub units: &'a UnitView,
    /// Player attack power.
    pub attack: u32,
    /// Player level, used as the effect scale.
    pub level: u32,
    /// Current resource.
    pub resource: u32,
    /// Whether the player is stunned at `now`.
    pub stunned: bool,
    /// Instant at which the ability last set its cooldown to expire.
    pub ready_at: Option<Timestamp>,
    /// Wall-clock instant of the request.
    pub now: Timestamp,
}

/// Accepted ability use.
#[derive(Clone, Debug, PartialEq)]
pub struct AbilityOutcome {
    /// Commands to apply in order.
    pub commands: Vec<Command>,
    /// Renderer effects.
    pub effects: Vec<EffectEvent>,
    /// Feedback describing the result.
    pub feedback: Feedback,
}

/// Equipped abilities and the rules shared by all of them.
#[derive(Clone, Debug)]
pub struct Abilities {
    definitions: Vec<AbilityDefinition>,
    cooldown: Duration,
    field_damage_ratio: f64,
}

impl Abilities {
    /// Creates the ability system for the equipped definitions.
    #[must_use]
    pub fn new(
        definitions: Vec<AbilityDefinition>,
        cooldown: Duration,
        field_damage_ratio: f64,
    ) -> Self {
        Self {
            definitions,
            cooldown,
            field_damage_ratio,
        }
    }

    /// Equipped definitions in slot order.
    #[must_use]
    pub fn definitions(&self) -> &[AbilityDefinition] {
        &self.definitions
    }

    /// Definition of the equipped ability with the provided identifier.
    #[must_use]
    pub fn definition(&self, id: &AbilityId) -> Option<&AbilityDefinition> {
        self.definitions.iter().find(|definition| &definition.id == id)
    }

    /// Validates and resolves a request to use `id`.
    pub fn invoke(
        &self,
        id: &AbilityId,
        invocation: Invocation<'_>,
    ) -> Result<AbilityOutcome, AbilityRejection> {
        let definition = self
            .definition(id)
            .ok_or_else(|| AbilityRejection::UnknownAbility(id.clone()))?;

        if invocation.stunned {
            return Err(AbilityRejection::Stunned);
        }
        if invocation.resource < definition.resource_cost {
            return Err(AbilityRejection::InsufficientResource {
                required: definition.resource_cost,
                available: invocation.resource,
            });
        }
        if let Some(ready_at) = invocation.ready_at.filter(|ready_at| *ready_at > invocation.now)
        {
            return Err(AbilityRejection::CoolingDown {
                ability: id.clone(),
                ready_at,
            });
        }

        let mut outcome = AbilityOutcome {
            commands: vec![
                Command::SpendResource {
                    amount: definition.resource_cost,
                },
                Command::StartCooldown {
                    ability: id.clone(),
                    ready_at: invocation.now.after(self.cooldown),
                },
            ],
            effects: Vec::new(),
            feedback: Feedback::NoTargets {
                name: definition.name.clone(),
            },
        };

        match definition.strategy {
            TargetingStrategy::Single => {
                let targets: Vec<UnitSnapshot> =
                    front_unit(invocation.units).into_iter().collect();
                let hit = Hit::new(StrikeSource::Ability, EffectKind::Slash);
                hit.resolve(definition, &invocation, &targets, &mut outcome);
            }
            TargetingStrategy::Multi { hit_count } => {
                let targets: Vec<UnitSnapshot> = threat_order(invocation.units)
                    .into_iter()
                    .take(hit_count as usize)
                    .collect();
                let hit = Hit::new(StrikeSource::AbilitySweep, EffectKind::Coin);
                hit.resolve(definition, &invocation, &targets, &mut outcome);
            }
            TargetingStrategy::All => {
                let targets = threat_order(invocation.units);
                let hit = Hit::new(StrikeSource::AbilitySweep, EffectKind::Magic);
                hit.resolve(definition, &invocation, &targets, &mut outcome);
            }
            TargetingStrategy::DamageField {
                duration_frames,
                interval_frames,
                slows_units,
            } => {
                let damage = field_damage(
                    invocation.attack,
                    definition.multiplier,
                    self.field_damage_ratio,
                );
                outcome.commands.push(Command::DeployField {
                    field: DamageField::new(damage, duration_frames, interval_frames),
                });
                if slows_units {
                    outcome.commands.push(Command::SlowUnits {
                        factor: FIELD_SLOW_FACTOR,
                    });
                }
                outcome
                    .effects
                    .push(player_effect(EffectKind::Ice, invocation.level, damage));
                outcome.feedback = Feedback::FieldDeployed {
                    name: definition.name.clone(),
                };
            }
            TargetingStrategy::SelfShield => {
                outcome.commands.push(Command::GrantShield);
                outcome
                    .effects
                    .push(player_effect(EffectKind::Shield, invocation.level, 0));
                outcome.feedback = Feedback::ShieldRaised {
                    name: definition.name.clone(),
                };
            }
        }

        debug!("ability `{}` resolved: {:?}", id.as_str(), outcome.feedback);
        Ok(outcome)
    }
}

/// Per-pulse damage of a field cast with the provided attack and multiplier.
#[must_use]
pub fn field_damage(attack: u32, multiplier: f64, ratio: f64) -> u32 {
    let raw = (f64::from(attack) * multiplier * ratio).floor();
    if raw.is_nan() || raw < 1.0 {
        1
    } else if raw >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        raw as u32
    }
}

/// Hit resolution shared by the unit-targeting strategies.
struct Hit {
    source: StrikeSource,
    effect: EffectKind,
}

impl Hit {
    const fn new(source: StrikeSource, effect: EffectKind) -> Self {
        Self { source, effect }
    }

    fn resolve(
        &self,
        definition: &AbilityDefinition,
        invocation: &Invocation<'_>,
        targets: &[UnitSnapshot],
        outcome: &mut AbilityOutcome,
    ) {
        if targets.is_empty() {
            outcome.commands.push(Command::RefundResource {
                amount: definition.resource_cost,
            });
            return;
        }

        let strikes: Vec<Strike> = targets
            .iter()
            .map(|target| Strike {
                unit: target.id,
                damage: strike_damage(invocation.attack, definition.multiplier, target.defense),
                source: self.source,
            })
            .collect();

        outcome.effects.extend(strikes.iter().map(|strike| EffectEvent {
            kind: self.effect,
            target: EffectTarget::Unit(strike.unit),
            level_scale: invocation.level,
            damage: strike.damage,
            critical: self.source == StrikeSource::Ability,
        }));
        outcome.feedback = Feedback::AbilityStruck {
            name: definition.name.clone(),
            targets: u32::try_from(strikes.len()).unwrap_or(u32::MAX),
            total_damage: strikes
                .iter()
                .fold(0u32, |total, strike| total.saturating_add(strike.damage)),
        };
        outcome.commands.push(Command::StrikeUnits { strikes });
    }
}

fn player_effect(kind: EffectKind, level: u32, damage: u32) -> EffectEvent {
    EffectEvent {
        kind,
        target: EffectTarget::Player,
        level_scale: level,
        damage,
        critical: false,
    }
}

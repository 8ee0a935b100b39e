//! Gameplay tuning knobs shared by every attempt.

use std::time::Duration;

use serde::Deserialize;

/// Timing and damage constants that are not part of stage or ability data.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Tuning {
    /// Cooldown started by every successful ability use.
    pub cooldown_ms: u64,
    /// Stun applied by a wrong answer.
    pub stun_ms: u64,
    /// Length of the cosmetic hold between `Clearing` and `Clear`.
    pub clearing_hold_ms: u64,
    /// Delay before the quick-start effect resolves.
    pub quick_start_delay_ms: u64,
    /// Probability that a primary attack is critical.
    pub critical_chance: f64,
    /// Damage multiplier of a critical primary attack.
    pub critical_multiplier: f64,
    /// Share of `attack × multiplier` dealt by each damage field pulse.
    pub field_damage_ratio: f64,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            cooldown_ms: 3_000,
            stun_ms: 2_000,
            clearing_hold_ms: 2_000,
            quick_start_delay_ms: 500,
            critical_chance: 0.1,
            critical_multiplier: 1.5,
            field_damage_ratio: 0.3,
        }
    }
}

impl Tuning {
    /// Ability cooldown as a duration.
    #[must_use]
    pub const fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    /// Wrong-answer stun as a duration.
    #[must_use]
    pub const fn stun(&self) -> Duration {
        Duration::from_millis(self.stun_ms)
    }

    /// Clearing hold as a duration.
    #[must_use]
    pub const fn clearing_hold(&self) -> Duration {
        Duration::from_millis(self.clearing_hold_ms)
    }

    /// Quick-start delay as a duration.
    #[must_use]
    pub const fn quick_start_delay(&self) -> Duration {
        Duration::from_millis(self.quick_start_delay_ms)
    }
}

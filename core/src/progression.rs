//! Player progression inputs: classes, base stats, equipment and allies.
//!
//! The progression store owns these values; the engine only reads a
//! [`ProgressionSnapshot`] taken before an attempt starts.

use serde::{Deserialize, Serialize};

use crate::{AbilityDefinition, EffectKind, StageId, StageReward};

const MAX_SLOW: f64 = 0.9;
const EXP_BOOST_ATTACK_BONUS: u32 = 5;
const QUICK_KILL_POTENCY_PER_UNIT: u32 = 100;

/// Playable classes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerClass {
    /// Balanced melee class.
    Warrior,
    /// Fragile class that slows the enemy advance.
    Mage,
    /// Class that earns extra stage rewards.
    Merchant,
}

impl PlayerClass {
    /// Every playable class.
    pub const ALL: [PlayerClass; 3] = [Self::Warrior, Self::Mage, Self::Merchant];

    const fn evolution(self) -> [(u32, BaseStats); 3] {
        match self {
            Self::Warrior => [
                (1, BaseStats::new(10, 5, 3, 2)),
                (5, BaseStats::new(30, 18, 12, 5)),
                (10, BaseStats::new(60, 40, 30, 10)),
            ],
            Self::Mage => [
                (1, BaseStats::new(6, 8, 2, 3)),
                (5, BaseStats::new(18, 28, 8, 7)),
                (10, BaseStats::new(35, 55, 18, 14)),
            ],
            Self::Merchant => [
                (1, BaseStats::new(8, 4, 4, 5)),
                (5, BaseStats::new(22, 14, 12, 16)),
                (10, BaseStats::new(45, 30, 25, 30)),
            ],
        }
    }

    /// Base stats at the provided level.
    ///
    /// Stats are defined at each evolution level and linearly interpolated
    /// (floored) in between; levels past the final evolution keep its stats.
    #[must_use]
    pub fn stats_for_level(self, level: u32) -> BaseStats {
        let stages = self.evolution();
        let level = level.max(stages[0].0);
        let current = stages
            .iter()
            .rev()
            .find(|(threshold, _)| level >= *threshold)
            .copied()
            .unwrap_or(stages[0]);
        let Some(next) = stages.iter().find(|(threshold, _)| *threshold > level).copied() else {
            return current.1;
        };

        let progress = f64::from(level - current.0) / f64::from(next.0 - current.0);
        let lerp = |from: u32, to: u32| -> u32 {
            let value = f64::from(from) + (f64::from(to) - f64::from(from)) * progress;
            value.floor().max(0.0) as u32
        };
        BaseStats {
            health: lerp(current.1.health, next.1.health),
            attack: lerp(current.1.attack, next.1.attack),
            defense: lerp(current.1.defense, next.1.defense),
            speed: lerp(current.1.speed, next.1.speed),
        }
    }

    /// Fraction by which the class slows every unit's advance.
    #[must_use]
    pub const fn advance_slow(self) -> f64 {
        match self {
            Self::Mage => 0.3,
            Self::Warrior | Self::Merchant => 0.0,
        }
    }

    /// Effect played for the class's primary attack.
    #[must_use]
    pub const fn signature_effect(self) -> EffectKind {
        match self {
            Self::Warrior => EffectKind::Slash,
            Self::Mage => EffectKind::Magic,
            Self::Merchant => EffectKind::Coin,
        }
    }

    /// Applies the class's bonus to a stage reward.
    #[must_use]
    pub fn adjust_reward(self, reward: StageReward) -> StageReward {
        match self {
            Self::Merchant => StageReward {
                currency: reward.currency.saturating_mul(3) / 2,
                tickets: reward.tickets.saturating_add(1),
                ..reward
            },
            Self::Warrior | Self::Mage => reward,
        }
    }
}

/// Base combat statistics derived from class and level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseStats {
    /// Maximum health.
    pub health: u32,
    /// Attack power.
    pub attack: u32,
    /// Defense against contact damage.
    pub defense: u32,
    /// Speed; feeds the resource maximum.
    pub speed: u32,
}

impl BaseStats {
    /// Creates a stat block.
    #[must_use]
    pub const fn new(health: u32, attack: u32, defense: u32, speed: u32) -> Self {
        Self {
            health,
            attack,
            defense,
            speed,
        }
    }

    /// Size of the resource pool: twenty plus five per speed point.
    #[must_use]
    pub const fn resource_max(&self) -> u32 {
        20 + self.speed.saturating_mul(5)
    }
}

/// Equipment slots.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemSlot {
    /// Weapon slot.
    Weapon,
    /// Armor slot.
    Armor,
    /// Accessory slot.
    Accessory,
}

/// Effect carried by an item.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemEffect {
    /// No combat effect.
    #[default]
    None,
    /// Boosts experience; on a weapon it also adds a flat attack bonus.
    ExpBoost,
    /// Slows the enemy advance by `value` percent when worn as an accessory.
    TimeSlow,
    /// Improves ticket drops outside of combat.
    TicketDrop,
    /// Grants `value` shield charges and defense when worn as armor.
    Shield,
    /// Defeats `value / 100` opening units when wielded as a weapon.
    QuickKill,
}

/// Item owned by the player.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquipmentItem {
    /// Catalog identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Slot the item occupies.
    pub slot: ItemSlot,
    /// Effect carried by the item.
    #[serde(default)]
    pub effect: ItemEffect,
    /// Potency of the effect.
    #[serde(default)]
    pub value: u32,
    /// Flavour text; may mention damage types.
    #[serde(default)]
    pub description: String,
}

/// Elemental flavour attached to primary hits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DamageTag {
    /// Fire.
    Fire,
    /// Ice.
    Ice,
    /// Darkness.
    Dark,
    /// Healing.
    Heal,
}

impl DamageTag {
    /// Tags mentioned in the provided text.
    #[must_use]
    pub fn detect(text: &str) -> Vec<DamageTag> {
        let lowered = text.to_lowercase();
        let mut tags = Vec::new();
        if lowered.contains("fire") {
            tags.push(Self::Fire);
        }
        if lowered.contains("ice") || lowered.contains("freeze") {
            tags.push(Self::Ice);
        }
        if lowered.contains("dark") {
            tags.push(Self::Dark);
        }
        if lowered.contains("heal") {
            tags.push(Self::Heal);
        }
        tags
    }

    /// Effect played alongside a primary hit.
    #[must_use]
    pub const fn effect_kind(self) -> EffectKind {
        match self {
            Self::Fire => EffectKind::Fire,
            Self::Ice => EffectKind::Ice,
            Self::Dark => EffectKind::Dark,
            Self::Heal => EffectKind::Heal,
        }
    }
}

/// Combat modifiers folded from the equipped items.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EquipmentModifiers {
    /// Percentage by which the enemy advance is slowed.
    pub slow_percent: u32,
    /// Flat attack bonus.
    pub attack_bonus: u32,
    /// Flat defense bonus.
    pub defense_bonus: u32,
    /// Shield charges at attempt start.
    pub shield_charges: u32,
    /// Quick-start potency; every full hundred defeats one opening unit.
    pub quick_kill_potency: u32,
    /// Elemental flavours of the weapon.
    pub damage_tags: Vec<DamageTag>,
}

impl EquipmentModifiers {
    /// Folds the modifiers of the equipped items.
    ///
    /// Effects only apply from the slot that carries them: attack boosts and
    /// quick-start from the weapon, shields from armor, slow from accessories.
    #[must_use]
    pub fn from_items(items: &[EquipmentItem]) -> Self {
        let mut modifiers = Self::default();
        for item in items {
            match (item.slot, item.effect) {
                (ItemSlot::Weapon, ItemEffect::ExpBoost) => {
                    modifiers.attack_bonus =
                        modifiers.attack_bonus.saturating_add(EXP_BOOST_ATTACK_BONUS);
                }
                (ItemSlot::Weapon, ItemEffect::QuickKill) => {
                    modifiers.quick_kill_potency =
                        modifiers.quick_kill_potency.saturating_add(item.value);
                }
                (ItemSlot::Armor, ItemEffect::Shield) => {
                    modifiers.shield_charges = modifiers.shield_charges.saturating_add(item.value);
                    modifiers.defense_bonus = modifiers.defense_bonus.saturating_add(item.value);
                }
                (ItemSlot::Accessory, ItemEffect::TimeSlow) => {
                    modifiers.slow_percent = modifiers.slow_percent.saturating_add(item.value);
                }
                _ => {}
            }

            if item.slot == ItemSlot::Weapon {
                for tag in DamageTag::detect(&item.name)
                    .into_iter()
                    .chain(DamageTag::detect(&item.description))
                {
                    if !modifiers.damage_tags.contains(&tag) {
                        modifiers.damage_tags.push(tag);
                    }
                }
            }
        }
        modifiers
    }

    /// Number of opening units defeated by the quick-start effect.
    #[must_use]
    pub const fn quick_kill_count(&self) -> u32 {
        self.quick_kill_potency / QUICK_KILL_POTENCY_PER_UNIT
    }
}

fn default_ally_interval() -> f64 {
    5.0
}

/// Companion that attacks the front unit on a timer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AllyProfile {
    /// Display name.
    pub name: String,
    /// Attack power.
    pub attack: u32,
    /// Seconds between attacks.
    #[serde(default = "default_ally_interval")]
    pub interval_secs: f64,
}

/// Read-only view of the player's progression taken before an attempt.
#[derive(Clone, Debug, PartialEq)]
pub struct ProgressionSnapshot {
    /// Selected class.
    pub class: PlayerClass,
    /// Player level.
    pub level: u32,
    /// Base stats for the class and level.
    pub stats: BaseStats,
    /// Modifiers from the equipped items.
    pub equipment: EquipmentModifiers,
    /// Equipped abilities.
    pub abilities: Vec<AbilityDefinition>,
    /// Selected ally, if any.
    pub ally: Option<AllyProfile>,
    /// Classes the player has unlocked.
    pub unlocked_classes: Vec<PlayerClass>,
    /// Stages the player has cleared before.
    pub cleared_stages: Vec<StageId>,
}

impl ProgressionSnapshot {
    /// Snapshot for a fresh player of the provided class and level.
    #[must_use]
    pub fn new(class: PlayerClass, level: u32) -> Self {
        Self {
            class,
            level,
            stats: class.stats_for_level(level),
            equipment: EquipmentModifiers::default(),
            abilities: Vec::new(),
            ally: None,
            unlocked_classes: vec![class],
            cleared_stages: Vec::new(),
        }
    }

    /// Attack power including equipment.
    #[must_use]
    pub fn attack_power(&self) -> u32 {
        self.stats.attack.saturating_add(self.equipment.attack_bonus)
    }

    /// Defense including equipment.
    #[must_use]
    pub fn defense_power(&self) -> u32 {
        self.stats.defense.saturating_add(self.equipment.defense_bonus)
    }

    /// Size of the resource pool.
    #[must_use]
    pub fn resource_max(&self) -> u32 {
        self.stats.resource_max()
    }

    /// Global slow applied to every spawned unit, capped at ninety percent.
    #[must_use]
    pub fn slow_factor(&self) -> f64 {
        let items = f64::from(self.equipment.slow_percent) / 100.0;
        (items + self.class.advance_slow()).min(MAX_SLOW)
    }

    /// Whether a stage that offers a class unlock may present the offer.
    #[must_use]
    pub fn class_unlock_available(&self) -> bool {
        !self.unlocked_classes.is_empty() && self.unlocked_classes.len() < PlayerClass::ALL.len()
    }
}

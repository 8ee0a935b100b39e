#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Contact resolution between advancing units and the defended line.

use log::debug;
use quiz_defence_core::{Command, Event, SessionPhase, UnitId, UnitView, CONTACT_THRESHOLD};

/// Damage a single unit deals on contact.
#[must_use]
pub fn contact_damage(unit_attack: u32, player_defense: u32) -> u32 {
    unit_attack.saturating_sub(player_defense).max(1)
}

/// Pure system that converts units at the line into player damage.
#[derive(Debug, Default)]
pub struct Contact {
    attackers: Vec<UnitId>,
}

impl Contact {
    /// Creates a new contact system.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits a single player strike covering every unit in contact after time advanced.
    pub fn handle(
        &mut self,
        events: &[Event],
        phase: SessionPhase,
        units: &UnitView,
        player_defense: u32,
        out: &mut Vec<Command>,
    ) {
        if phase != SessionPhase::Playing {
            return;
        }

        let advanced = events.iter().any(|event| match event {
            Event::TimeAdvanced { dt } => !dt.is_zero(),
            _ => false,
        });
        if !advanced {
            return;
        }

        self.attackers.clear();
        let mut damage: u32 = 0;
        for unit in units.iter().filter(|unit| unit.position >= CONTACT_THRESHOLD) {
            self.attackers.push(unit.id);
            damage = damage.saturating_add(contact_damage(unit.attack, player_defense));
        }

        if self.attackers.is_empty() {
            return;
        }

        debug!("{} unit(s) reached the line for {damage}", self.attackers.len());
        out.push(Command::StrikePlayer {
            attackers: self.attackers.clone(),
            damage,
        });
    }
}

//! External collaborators of the session and their in-memory implementations.

use quiz_defence_core::{
    ClearReward, ProgressionSnapshot, Question, StageDefinition, StageId,
};
use serde::Deserialize;

/// Read-only source of immutable stage definitions.
pub trait StageCatalog {
    /// Stage with the provided identifier.
    fn stage(&self, id: StageId) -> Option<&StageDefinition>;

    /// Every stage in map order.
    fn stages(&self) -> &[StageDefinition];
}

/// Read-only source of trivia questions.
pub trait QuestionSource {
    /// Questions in presentation order.
    fn questions(&self) -> &[Question];
}

/// Persistent player progression.
pub trait ProgressionStore {
    /// Progression read when an attempt starts.
    fn snapshot(&self) -> ProgressionSnapshot;

    /// Credits the rewards of a cleared attempt.
    fn apply_reward(&mut self, reward: &ClearReward);

    /// Marks the stage as cleared.
    fn record_clear(&mut self, stage: StageId);
}

/// First stage in map order that has not been cleared yet.
#[must_use]
pub fn next_uncleared<'a>(
    catalog: &'a impl StageCatalog,
    cleared: &[StageId],
) -> Option<&'a StageDefinition> {
    catalog
        .stages()
        .iter()
        .find(|stage| !cleared.contains(&stage.id))
}

/// Stages and questions held in memory.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct CatalogData {
    /// Stages in map order.
    #[serde(default)]
    pub stages: Vec<StageDefinition>,
    /// Questions in presentation order.
    #[serde(default)]
    pub questions: Vec<Question>,
}

impl StageCatalog for CatalogData {
    fn stage(&self, id: StageId) -> Option<&StageDefinition> {
        self.stages.iter().find(|stage| stage.id == id)
    }

    fn stages(&self) -> &[StageDefinition] {
        &self.stages
    }
}

impl QuestionSource for CatalogData {
    fn questions(&self) -> &[Question] {
        &self.questions
    }
}

/// Progression store that keeps balances in memory.
#[derive(Clone, Debug)]
pub struct InMemoryProgression {
    snapshot: ProgressionSnapshot,
    experience: u64,
    currency: u64,
    tickets: u64,
    egg_tickets: u64,
    rewards: Vec<ClearReward>,
}

impl InMemoryProgression {
    /// Creates a store seeded with the provided progression.
    #[must_use]
    pub fn new(snapshot: ProgressionSnapshot) -> Self {
        Self {
            snapshot,
            experience: 0,
            currency: 0,
            tickets: 0,
            egg_tickets: 0,
            rewards: Vec::new(),
        }
    }

    /// Experience credited so far.
    #[must_use]
    pub fn experience(&self) -> u64 {
        self.experience
    }

    /// Currency credited so far.
    #[must_use]
    pub fn currency(&self) -> u64 {
        self.currency
    }

    /// Draw tickets credited so far.
    #[must_use]
    pub fn tickets(&self) -> u64 {
        self.tickets
    }

    /// Egg tickets credited so far.
    #[must_use]
    pub fn egg_tickets(&self) -> u64 {
        self.egg_tickets
    }

    /// Every reward credited, oldest first.
    #[must_use]
    pub fn rewards(&self) -> &[ClearReward] {
        &self.rewards
    }
}

impl ProgressionStore for InMemoryProgression {
    fn snapshot(&self) -> ProgressionSnapshot {
        self.snapshot.clone()
    }

    fn apply_reward(&mut self, reward: &ClearReward) {
        self.experience = self.experience.saturating_add(u64::from(reward.experience));
        self.currency = self.currency.saturating_add(u64::from(reward.currency));
        self.tickets = self.tickets.saturating_add(u64::from(reward.tickets));
        self.egg_tickets = self.egg_tickets.saturating_add(u64::from(reward.egg_tickets));
        self.rewards.push(reward.clone());
    }

    fn record_clear(&mut self, stage: StageId) {
        if !self.snapshot.cleared_stages.contains(&stage) {
            self.snapshot.cleared_stages.push(stage);
        }
    }
}

#[cfg(test)]
mod tests {
    use quiz_defence_core::StageReward;

    use super::*;

    fn stage(id: u32) -> StageDefinition {
        StageDefinition {
            id: StageId::new(id),
            name: format!("Stage {id}"),
            description: String::new(),
            units: Vec::new(),
            spawn_delays: Vec::new(),
            reward: StageReward::default(),
            offers_class_unlock: false,
        }
    }

    #[test]
    fn next_uncleared_follows_map_order() {
        let catalog = CatalogData {
            stages: vec![stage(1), stage(2), stage(3)],
            questions: Vec::new(),
        };
        let cleared = [StageId::new(1), StageId::new(3)];
        assert_eq!(
            next_uncleared(&catalog, &cleared).map(|stage| stage.id),
            Some(StageId::new(2))
        );
        assert!(next_uncleared(
            &catalog,
            &[StageId::new(1), StageId::new(2), StageId::new(3)]
        )
        .is_none());
    }
}

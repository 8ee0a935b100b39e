//! Reward computation for cleared attempts.

use quiz_defence_core::{ClearReward, ProgressionSnapshot, StageDefinition};

/// Builds the reward payload for a cleared attempt.
///
/// The class bonus is applied to the stage's configured reward. A class unlock
/// is only offered by stages flagged for it, and only while the player has
/// unlocked some but not all classes.
#[must_use]
pub fn clear_reward(
    stage: &StageDefinition,
    progression: &ProgressionSnapshot,
    score: u64,
    kills: u32,
) -> ClearReward {
    let reward = progression.class.adjust_reward(stage.reward);
    ClearReward {
        stage: stage.id,
        experience: reward.experience,
        currency: reward.currency,
        tickets: reward.tickets,
        egg_tickets: reward.egg_tickets,
        score,
        kills,
        first_clear: !progression.cleared_stages.contains(&stage.id),
        class_unlock_offer: stage.offers_class_unlock && progression.class_unlock_available(),
    }
}

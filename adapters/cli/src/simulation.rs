//! Scripted player that drives a session without a renderer.

use std::{fmt, time::Duration};

use anyhow::{Context, Result};
use log::{debug, info, warn};
use quiz_defence_core::{ClearReward, Notification, SessionPhase, StageId, Timestamp};
use quiz_defence_session::{LoopControl, ProgressionStore, Session};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Pacing and skill of the scripted player.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Script {
    /// Wall-clock length of one driver frame.
    pub(crate) frame: Duration,
    /// Time between two submitted answers.
    pub(crate) answer_every: Duration,
    /// Probability of answering correctly.
    pub(crate) accuracy: f64,
    /// Attempt is abandoned once this much time passed.
    pub(crate) time_limit: Duration,
    /// Seed of the answer generator.
    pub(crate) seed: u64,
}

/// How a scripted attempt ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Outcome {
    Cleared,
    Failed,
    Abandoned,
}

/// Result of a scripted attempt.
#[derive(Clone, Debug)]
pub(crate) struct Summary {
    pub(crate) stage: StageId,
    pub(crate) outcome: Outcome,
    pub(crate) elapsed: Duration,
    pub(crate) answers: u32,
    pub(crate) correct: u32,
    pub(crate) abilities_used: u32,
    pub(crate) effects: u32,
    pub(crate) score: u64,
    pub(crate) kills: u32,
    pub(crate) total_units: u32,
    pub(crate) health: u32,
    pub(crate) reward: Option<ClearReward>,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let outcome = match self.outcome {
            Outcome::Cleared => "cleared",
            Outcome::Failed => "failed",
            Outcome::Abandoned => "abandoned",
        };
        writeln!(
            f,
            "stage {} {outcome} after {:.1}s",
            self.stage.get(),
            self.elapsed.as_secs_f64()
        )?;
        writeln!(
            f,
            "answers: {}/{} correct, abilities used: {}, effects played: {}",
            self.correct, self.answers, self.abilities_used, self.effects
        )?;
        write!(
            f,
            "score: {}, kills: {}/{}, health left: {}",
            self.score, self.kills, self.total_units, self.health
        )?;
        if let Some(reward) = &self.reward {
            write!(
                f,
                "\nreward: {} exp, {} currency, {} tickets, {} egg tickets",
                reward.experience, reward.currency, reward.tickets, reward.egg_tickets
            )?;
            if reward.first_clear {
                write!(f, " (first clear)")?;
            }
            if reward.class_unlock_offer {
                write!(f, "\na new class can be unlocked")?;
            }
        }
        Ok(())
    }
}

/// Plays the selected stage of `session` until it resolves or times out.
pub(crate) fn run<P: ProgressionStore>(
    session: &mut Session<P>,
    script: &Script,
) -> Result<Summary> {
    let stage = session
        .stage()
        .map(|stage| stage.id)
        .context("no stage selected")?;
    let frame = script.frame.max(Duration::from_millis(1));
    let mut rng = ChaCha8Rng::seed_from_u64(script.seed);
    let mut summary = Summary {
        stage,
        outcome: Outcome::Abandoned,
        elapsed: Duration::ZERO,
        answers: 0,
        correct: 0,
        abilities_used: 0,
        effects: 0,
        score: 0,
        kills: 0,
        total_units: 0,
        health: 0,
        reward: None,
    };

    let origin = Timestamp::from_millis(0);
    session
        .start(origin)
        .with_context(|| format!("stage {} cannot be started", stage.get()))?;
    info!("stage {} started", stage.get());

    let mut elapsed = Duration::ZERO;
    let mut last_answer = Duration::ZERO;
    loop {
        elapsed += frame;
        let now = Timestamp::from_duration(elapsed);
        let control = session.tick(now);

        if session.phase() == SessionPhase::Playing
            && elapsed.saturating_sub(last_answer) >= script.answer_every
        {
            last_answer = elapsed;
            answer(session, script.accuracy, &mut rng, now, &mut summary);
            use_first_ready_ability(session, now, &mut summary);
        }

        record(session.drain_notifications(), &mut summary);
        let snapshot = session.snapshot(now);
        summary.score = snapshot.score;
        summary.kills = snapshot.kills;
        summary.total_units = snapshot.total_units;
        summary.health = snapshot.player.map_or(0, |player| player.health);

        if control == LoopControl::Stop {
            break;
        }
        if elapsed >= script.time_limit {
            warn!(
                "time limit of {:.1}s reached, leaving the stage",
                script.time_limit.as_secs_f64()
            );
            session.leave();
            break;
        }
    }

    summary.elapsed = elapsed;
    summary.outcome = match session.phase() {
        SessionPhase::Clear => Outcome::Cleared,
        SessionPhase::GameOver => Outcome::Failed,
        SessionPhase::Standby | SessionPhase::Playing | SessionPhase::Clearing => {
            Outcome::Abandoned
        }
    };
    Ok(summary)
}

fn answer<P: ProgressionStore>(
    session: &mut Session<P>,
    accuracy: f64,
    rng: &mut ChaCha8Rng,
    now: Timestamp,
    summary: &mut Summary,
) {
    let Some(question) = session.current_question() else {
        return;
    };
    let options = question.options.len();
    let choice = if options > 1 && !rng.gen_bool(accuracy.clamp(0.0, 1.0)) {
        (question.answer + rng.gen_range(1..options)) % options
    } else {
        question.answer
    };

    match session.submit_answer(choice, now) {
        Ok(correct) => {
            summary.answers += 1;
            if correct {
                summary.correct += 1;
            }
        }
        Err(rejection) => debug!("answer rejected: {rejection}"),
    }
}

fn use_first_ready_ability<P: ProgressionStore>(
    session: &mut Session<P>,
    now: Timestamp,
    summary: &mut Summary,
) {
    let snapshot = session.snapshot(now);
    if snapshot.units.is_empty() {
        return;
    }
    let ready: Vec<_> = snapshot
        .cooldowns
        .into_iter()
        .filter(|(_, remaining)| remaining.is_zero())
        .map(|(ability, _)| ability)
        .collect();

    for ability in ready {
        match session.use_ability(&ability, now) {
            Ok(()) => {
                summary.abilities_used += 1;
                return;
            }
            Err(rejection) => debug!("ability {} rejected: {rejection}", ability.as_str()),
        }
    }
}

fn record(notifications: Vec<Notification>, summary: &mut Summary) {
    for notification in notifications {
        match notification {
            Notification::Effect(_) => summary.effects += 1,
            Notification::Feedback(feedback) => debug!("feedback: {feedback:?}"),
            Notification::StageCleared(reward) => {
                info!(
                    "stage {} cleared with score {}",
                    reward.stage.get(),
                    reward.score
                );
                summary.reward = Some(reward);
            }
            Notification::StageFailed { stage, score, kills } => {
                info!(
                    "stage {} failed with score {score} after {kills} kills",
                    stage.get()
                );
            }
        }
    }
}

#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic spawning system releasing scheduled roster entries.
//!
//! Elapsed time is converted into nominal frame equivalents and accumulated.
//! Every roster entry is released exactly once, on the first tick at which the
//! accumulator reaches its configured delay.

use log::debug;
use quiz_defence_core::{frames_in, Command, Event, SessionPhase, StageDefinition};

/// Pure system that emits spawn commands while an attempt is playing.
#[derive(Debug)]
pub struct Spawning {
    delays: Vec<f64>,
    released: Vec<bool>,
    elapsed_frames: f64,
}

impl Spawning {
    /// Creates a spawning system for the provided stage schedule.
    #[must_use]
    pub fn new(stage: &StageDefinition) -> Self {
        let delays: Vec<f64> = (0..stage.units.len())
            .map(|index| stage.spawn_delay(index))
            .collect();
        Self {
            released: vec![false; delays.len()],
            delays,
            elapsed_frames: 0.0,
        }
    }

    /// Releases every entry scheduled at the very start of the attempt.
    pub fn prime(&mut self, out: &mut Vec<Command>) {
        self.release_due(0.0, out);
    }

    /// Consumes events to emit spawn commands for entries whose delay elapsed.
    pub fn handle(&mut self, events: &[Event], phase: SessionPhase, out: &mut Vec<Command>) {
        if phase != SessionPhase::Playing {
            return;
        }

        let frames: f64 = events
            .iter()
            .filter_map(|event| match event {
                Event::TimeAdvanced { dt } => Some(frames_in(*dt)),
                _ => None,
            })
            .sum();

        if frames <= 0.0 {
            return;
        }

        self.elapsed_frames += frames;
        self.release_due(self.elapsed_frames, out);
    }

    /// Frame equivalents accumulated since the attempt started.
    #[must_use]
    pub fn elapsed_frames(&self) -> f64 {
        self.elapsed_frames
    }

    /// Number of entries still waiting for release.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.released.iter().filter(|released| !**released).count()
    }

    fn release_due(&mut self, elapsed: f64, out: &mut Vec<Command>) {
        for (roster_index, (delay, released)) in
            self.delays.iter().zip(self.released.iter_mut()).enumerate()
        {
            if *released || elapsed < *delay {
                continue;
            }
            *released = true;
            debug!("releasing roster entry {roster_index} at frame {elapsed:.1}");
            out.push(Command::SpawnUnit { roster_index });
        }
    }
}

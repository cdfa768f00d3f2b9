//! Audio cue selection.
//!
//! The tracker decides *which* cue a tick deserves; playing it is someone
//! else's job. Each distinct `remaining_sec` fires at most once per step
//! instance, so repeated sub-second ticks that round to the same second stay
//! quiet.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::events::TimerEvent;
use crate::timer::Step;

/// Steps shorter than this get no halfway cue.
const HALFWAY_MIN_SEC: u64 = 10;
/// Countdown cues fire at these remaining seconds, then `Final` at 1.
const COUNTDOWN_FROM_SEC: u64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cue", rename_all = "lowercase")]
pub enum AudioCue {
    Halfway,
    Countdown { remaining_sec: u64 },
    Final,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CueInput<'a> {
    pub step_key: &'a str,
    pub running: bool,
    pub remaining_sec: u64,
    pub step_duration_sec: u64,
}

/// Build tracker input from an engine event.
pub fn cue_input<'a>(event: &TimerEvent, steps: &'a [Step]) -> Option<CueInput<'a>> {
    let snapshot = event.snapshot();
    let step = steps.get(snapshot.step_index)?;
    Some(CueInput {
        step_key: &step.id,
        running: snapshot.running,
        remaining_sec: snapshot.remaining_sec,
        step_duration_sec: step.duration_sec,
    })
}

#[derive(Debug, Default)]
pub struct AudioCueTracker {
    step_key: Option<String>,
    fired: HashSet<u64>,
}

impl AudioCueTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, input: &CueInput<'_>) -> Option<AudioCue> {
        if self.step_key.as_deref() != Some(input.step_key) {
            self.step_key = Some(input.step_key.to_string());
            self.fired.clear();
        }
        if !input.running || self.fired.contains(&input.remaining_sec) {
            return None;
        }

        let cue = select_cue(input.remaining_sec, input.step_duration_sec)?;
        self.fired.insert(input.remaining_sec);
        Some(cue)
    }
}

fn select_cue(remaining: u64, duration: u64) -> Option<AudioCue> {
    // Nothing at the very start of a step.
    if remaining == 0 || remaining >= duration {
        return None;
    }
    if remaining == 1 {
        return Some(AudioCue::Final);
    }
    if remaining <= COUNTDOWN_FROM_SEC {
        return Some(AudioCue::Countdown {
            remaining_sec: remaining,
        });
    }
    if duration >= HALFWAY_MIN_SEC && remaining == duration / 2 {
        return Some(AudioCue::Halfway);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(key: &str, remaining_sec: u64, duration: u64) -> CueInput<'_> {
        CueInput {
            step_key: key,
            running: true,
            remaining_sec,
            step_duration_sec: duration,
        }
    }

    #[test]
    fn fires_each_second_once() {
        let mut tracker = AudioCueTracker::new();
        assert_eq!(tracker.observe(&input("a", 3, 20)), Some(AudioCue::Countdown { remaining_sec: 3 }));
        assert_eq!(tracker.observe(&input("a", 3, 20)), None);
        assert_eq!(tracker.observe(&input("a", 2, 20)), Some(AudioCue::Countdown { remaining_sec: 2 }));
        assert_eq!(tracker.observe(&input("a", 1, 20)), Some(AudioCue::Final));
        assert_eq!(tracker.observe(&input("a", 1, 20)), None);
    }

    #[test]
    fn halfway_only_for_longer_steps() {
        let mut tracker = AudioCueTracker::new();
        assert_eq!(tracker.observe(&input("a", 10, 20)), Some(AudioCue::Halfway));
        assert_eq!(tracker.observe(&input("b", 4, 8)), None);
    }

    #[test]
    fn new_step_instance_resets() {
        let mut tracker = AudioCueTracker::new();
        assert!(tracker.observe(&input("a", 2, 20)).is_some());
        assert!(tracker.observe(&input("b", 2, 20)).is_some());
    }

    #[test]
    fn silent_when_not_running_or_at_step_start() {
        let mut tracker = AudioCueTracker::new();
        let mut paused = input("a", 2, 20);
        paused.running = false;
        assert_eq!(tracker.observe(&paused), None);
        // Not consumed by the paused observation.
        assert!(tracker.observe(&input("a", 2, 20)).is_some());
        assert_eq!(tracker.observe(&input("c", 3, 3)), None);
    }

    #[test]
    fn cue_input_reads_step_from_event() {
        let steps = crate::timer::build_steps(
            0,
            &[crate::workout::WorkoutBlock::new(
                1,
                crate::workout::Pace::time(20),
                vec![crate::workout::Exercise::timed("Row", 20)],
            )],
        )
        .steps;
        let event = TimerEvent::Tick {
            snapshot: crate::events::Snapshot::new(0, 9_500, true),
        };
        let input = cue_input(&event, &steps).unwrap();
        assert_eq!(input.step_key, "b0-s0-e0-work");
        assert_eq!(input.remaining_sec, 10);
        assert_eq!(input.step_duration_sec, 20);
        assert!(cue_input(
            &TimerEvent::Tick {
                snapshot: crate::events::Snapshot::new(5, 0, true)
            },
            &steps
        )
        .is_none());
    }
}

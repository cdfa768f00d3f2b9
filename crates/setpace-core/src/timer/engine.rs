//! Timer engine implementation.
//!
//! The timer engine is a clock-delta state machine over a run plan's steps. It
//! does not use internal threads - the caller (or [`super::TimerHandle`]) is
//! responsible for calling `tick()` periodically.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running <-> Paused
//!            |  ^
//!            v  |
//!          Holding            (blocking step waits for resume/skip)
//!            |
//!            v
//!         Finished            (any state) -> Stopped
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = create_timer(plan.steps, |event| println!("{event:?}"));
//! engine.start();
//! // Every 250ms:
//! engine.tick();
//! ```
//!
//! Every emission goes through the callback passed at construction. A step
//! that reaches zero loads the next step's full duration in the same tick;
//! overshoot is discarded, so a late tick never eats into the next step and a
//! long gap never skips steps.

use serde::{Deserialize, Serialize};

use super::clock::{Clock, SystemClock};
use super::plan::Step;
use crate::events::{Snapshot, TimerEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerState {
    Idle,
    Running,
    Paused,
    /// Current step is blocking and waits for the user to continue.
    Holding,
    Finished,
    /// Disposed by `stop()`. Every control call is a no-op from here on.
    Stopped,
}

/// Receives every event the engine emits.
pub type EventSink = Box<dyn FnMut(&TimerEvent) + Send>;

/// Core timer engine.
///
/// Operates on clock deltas -- no internal thread.
pub struct TimerEngine<C: Clock = SystemClock> {
    steps: Vec<Step>,
    clock: C,
    state: TimerState,
    step_index: usize,
    /// Remaining time in milliseconds for the current step.
    remaining_ms: u64,
    /// Clock reading at the last start/resume/tick. `None` while not running.
    last_tick_ms: Option<u64>,
    /// Set when backgrounding paused a running timer.
    resume_on_foreground: bool,
    on_event: Option<EventSink>,
}

/// Build an engine on the system clock.
pub fn create_timer<F>(steps: Vec<Step>, on_event: F) -> TimerEngine<SystemClock>
where
    F: FnMut(&TimerEvent) + Send + 'static,
{
    TimerEngine::with_clock(steps, SystemClock::new(), Box::new(on_event))
}

impl<C: Clock> TimerEngine<C> {
    /// Create an engine over `steps`.
    ///
    /// Starts `Idle` with the first step loaded, or `Finished` when there are
    /// no steps at all.
    pub fn with_clock(steps: Vec<Step>, clock: C, on_event: EventSink) -> Self {
        let (state, remaining_ms) = match steps.first() {
            Some(first) => (TimerState::Idle, first.duration_ms),
            None => (TimerState::Finished, 0),
        };
        Self {
            steps,
            clock,
            state,
            step_index: 0,
            remaining_ms,
            last_tick_ms: None,
            resume_on_foreground: false,
            on_event: Some(on_event),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == TimerState::Running
    }

    pub fn step_index(&self) -> usize {
        self.step_index
    }

    pub fn remaining_ms(&self) -> u64 {
        self.remaining_ms
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn current_step(&self) -> Option<&Step> {
        self.steps.get(self.step_index)
    }

    /// Time left in the whole run, counting the current step's remainder.
    pub fn run_remaining_ms(&self) -> u64 {
        if matches!(self.state, TimerState::Finished | TimerState::Stopped) {
            return 0;
        }
        let later: u64 = self
            .steps
            .iter()
            .skip(self.step_index + 1)
            .map(|s| s.duration_ms)
            .sum();
        later.saturating_add(self.remaining_ms)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::new(self.step_index, self.remaining_ms, self.is_running())
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin the run from the first step. From `Paused`/`Holding` this
    /// behaves like `resume()`.
    pub fn start(&mut self) {
        match self.state {
            TimerState::Idle => {
                self.step_index = 0;
                self.state = TimerState::Running;
                self.last_tick_ms = Some(self.clock.now_ms());
                if self.land() {
                    tracing::debug!(step_index = self.step_index, "timer started");
                    let snapshot = self.snapshot();
                    self.emit(TimerEvent::Started { snapshot });
                }
            }
            TimerState::Paused | TimerState::Holding => self.resume(),
            TimerState::Running | TimerState::Finished | TimerState::Stopped => {}
        }
    }

    /// Freeze the countdown. No-op unless running.
    pub fn pause(&mut self) {
        if self.state != TimerState::Running {
            return;
        }
        self.flush_elapsed();
        self.state = TimerState::Paused;
        self.last_tick_ms = None;
        tracing::debug!(
            step_index = self.step_index,
            remaining_ms = self.remaining_ms,
            "timer paused"
        );
        let snapshot = self.snapshot();
        self.emit(TimerEvent::Paused { snapshot });
    }

    /// Continue from the frozen remaining time, or confirm a held step.
    pub fn resume(&mut self) {
        if !matches!(self.state, TimerState::Paused | TimerState::Holding) {
            return;
        }
        self.state = TimerState::Running;
        self.last_tick_ms = Some(self.clock.now_ms());
        if self.remaining_ms == 0 {
            self.advance();
            return;
        }
        tracing::debug!(step_index = self.step_index, "timer resumed");
        let snapshot = self.snapshot();
        self.emit(TimerEvent::Resumed { snapshot });
    }

    /// End the current step now and load the next one at full duration.
    ///
    /// Keeps the running/paused state; skipping a held step continues the run.
    pub fn skip(&mut self) {
        match self.state {
            TimerState::Running | TimerState::Paused => {}
            TimerState::Holding => {
                self.state = TimerState::Running;
                self.last_tick_ms = Some(self.clock.now_ms());
            }
            TimerState::Idle | TimerState::Finished | TimerState::Stopped => return,
        }
        tracing::debug!(from_step = self.step_index, "step skipped");
        self.advance();
    }

    /// Halt for good and drop the event sink. Safe from any state.
    pub fn stop(&mut self) {
        if self.state == TimerState::Stopped {
            return;
        }
        tracing::debug!(step_index = self.step_index, "timer stopped");
        self.state = TimerState::Stopped;
        self.last_tick_ms = None;
        self.resume_on_foreground = false;
        self.on_event = None;
    }

    /// Call periodically. Emits a tick, or a step change when the current
    /// step ran out.
    pub fn tick(&mut self) {
        if self.state != TimerState::Running {
            return;
        }
        let elapsed = self.take_elapsed();
        if elapsed >= self.remaining_ms {
            self.remaining_ms = 0;
            self.advance();
        } else {
            self.remaining_ms -= elapsed;
            let snapshot = self.snapshot();
            self.emit(TimerEvent::Tick { snapshot });
        }
    }

    /// The app is going to the background: freeze a running timer.
    pub fn enter_background(&mut self) {
        if self.state == TimerState::Running {
            self.pause();
            self.resume_on_foreground = true;
        }
    }

    /// Back in the foreground: restart the clock fresh from the frozen time.
    /// Time spent in the background is not counted.
    pub fn enter_foreground(&mut self) {
        if std::mem::take(&mut self.resume_on_foreground) && self.state == TimerState::Paused {
            self.resume();
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn take_elapsed(&mut self) -> u64 {
        let now = self.clock.now_ms();
        let elapsed = self
            .last_tick_ms
            .map(|last| now.saturating_sub(last))
            .unwrap_or(0);
        self.last_tick_ms = Some(now);
        elapsed
    }

    fn flush_elapsed(&mut self) {
        let elapsed = self.take_elapsed();
        self.remaining_ms = self.remaining_ms.saturating_sub(elapsed);
    }

    fn advance(&mut self) {
        let from = self.step_index;
        self.step_index += 1;
        if self.land() {
            if self.state == TimerState::Running {
                self.last_tick_ms = Some(self.clock.now_ms());
            }
            let snapshot = self.snapshot();
            self.emit(TimerEvent::StepChanged {
                from_step: from,
                snapshot,
            });
        }
    }

    /// Load the step at `step_index`, passing over instant steps.
    ///
    /// Returns false when the run ran out of steps and finished instead.
    fn land(&mut self) -> bool {
        while let Some(step) = self.steps.get(self.step_index) {
            if !step.is_instant() {
                self.remaining_ms = step.duration_ms;
                if step.blocking && self.state == TimerState::Running {
                    self.state = TimerState::Holding;
                    self.last_tick_ms = None;
                }
                return true;
            }
            self.step_index += 1;
        }
        self.finish();
        false
    }

    fn finish(&mut self) {
        self.step_index = self.steps.len().saturating_sub(1);
        self.remaining_ms = 0;
        self.state = TimerState::Finished;
        self.last_tick_ms = None;
        tracing::info!(steps = self.steps.len(), "run finished");
        let snapshot = self.snapshot();
        self.emit(TimerEvent::Finished { snapshot });
    }

    fn emit(&mut self, event: TimerEvent) {
        if let Some(sink) = self.on_event.as_mut() {
            sink(&event);
        }
    }
}

impl<C: Clock> std::fmt::Debug for TimerEngine<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerEngine")
            .field("state", &self.state)
            .field("step_index", &self.step_index)
            .field("remaining_ms", &self.remaining_ms)
            .field("steps", &self.steps.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::timer::clock::ManualClock;
    use crate::timer::plan::build_steps;
    use crate::workout::{Exercise, Pace, WorkoutBlock};

    type Log = Arc<Mutex<Vec<TimerEvent>>>;

    fn engine_for(steps: Vec<Step>) -> (TimerEngine<ManualClock>, ManualClock, Log) {
        let clock = ManualClock::new();
        let log: Log = Arc::default();
        let sink = log.clone();
        let engine = TimerEngine::with_clock(
            steps,
            clock.clone(),
            Box::new(move |e| sink.lock().unwrap().push(*e)),
        );
        (engine, clock, log)
    }

    fn circuit_steps() -> Vec<Step> {
        let blocks = vec![WorkoutBlock::new(
            2,
            Pace::time(20),
            vec![Exercise::timed("Squat", 20), Exercise::timed("Row", 20)],
        )
        .with_rests(10, 30)];
        build_steps(5, &blocks).steps
    }

    fn run_for(engine: &mut TimerEngine<ManualClock>, clock: &ManualClock, ms: u64) {
        for _ in 0..ms / 250 {
            clock.advance(250);
            engine.tick();
        }
    }

    #[test]
    fn start_pause_resume() {
        let (mut engine, _clock, log) = engine_for(circuit_steps());
        assert_eq!(engine.state(), TimerState::Idle);

        engine.start();
        assert_eq!(engine.state(), TimerState::Running);

        engine.pause();
        assert_eq!(engine.state(), TimerState::Paused);

        engine.resume();
        assert_eq!(engine.state(), TimerState::Running);

        let kinds: Vec<bool> = log.lock().unwrap().iter().map(|e| e.snapshot().running).collect();
        assert_eq!(kinds, vec![true, false, true]);
    }

    #[test]
    fn start_while_running_is_noop() {
        let (mut engine, clock, log) = engine_for(circuit_steps());
        engine.start();
        clock.advance(1_000);
        engine.start();
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[test]
    fn ticks_count_down_with_ceil_seconds() {
        let (mut engine, clock, log) = engine_for(circuit_steps());
        engine.start();
        clock.advance(250);
        engine.tick();
        let last = *log.lock().unwrap().last().unwrap();
        assert_eq!(
            last,
            TimerEvent::Tick {
                snapshot: Snapshot {
                    step_index: 0,
                    remaining_sec: 5,
                    remaining_ms: 4_750,
                    running: true,
                }
            }
        );
    }

    #[test]
    fn pause_twice_keeps_frozen_time() {
        let (mut engine, clock, log) = engine_for(circuit_steps());
        engine.start();
        clock.advance(1_300);
        engine.pause();
        let frozen = engine.remaining_ms();
        clock.advance(5_000);
        engine.pause();
        assert_eq!(engine.remaining_ms(), frozen);
        assert_eq!(frozen, 3_700);
        let paused = log
            .lock()
            .unwrap()
            .iter()
            .filter(|e| matches!(e, TimerEvent::Paused { .. }))
            .count();
        assert_eq!(paused, 1);
    }

    #[test]
    fn resume_has_no_time_jump() {
        let (mut engine, clock, _log) = engine_for(circuit_steps());
        engine.start();
        clock.advance(1_000);
        engine.pause();
        clock.advance(60_000);
        engine.resume();
        clock.advance(250);
        engine.tick();
        assert_eq!(engine.remaining_ms(), 3_750);
    }

    #[test]
    fn step_boundary_loads_full_next_duration() {
        let (mut engine, clock, log) = engine_for(circuit_steps());
        engine.start();
        run_for(&mut engine, &clock, 5_000);

        let events = log.lock().unwrap();
        let first_step1 = events
            .iter()
            .find(|e| e.snapshot().step_index == 1)
            .unwrap();
        assert_eq!(
            *first_step1,
            TimerEvent::StepChanged {
                from_step: 0,
                snapshot: Snapshot::new(1, 20_000, true),
            }
        );
        assert!(events
            .iter()
            .all(|e| !(e.snapshot().step_index == 0 && e.snapshot().remaining_ms == 0)));
    }

    #[test]
    fn late_tick_discards_overshoot() {
        let (mut engine, clock, _log) = engine_for(circuit_steps());
        engine.start();
        clock.advance(5_900);
        engine.tick();
        assert_eq!(engine.step_index(), 1);
        assert_eq!(engine.remaining_ms(), 20_000);
    }

    #[test]
    fn skip_loads_full_duration() {
        let (mut engine, clock, log) = engine_for(circuit_steps());
        engine.start();
        engine.skip();
        clock.advance(5_000);
        engine.tick();
        assert_eq!(engine.remaining_ms(), 15_000);

        engine.skip();
        assert_eq!(engine.step_index(), 2);
        assert_eq!(engine.remaining_ms(), 10_000);
        assert!(engine.is_running());
        let last = *log.lock().unwrap().last().unwrap();
        assert_eq!(
            last,
            TimerEvent::StepChanged {
                from_step: 1,
                snapshot: Snapshot::new(2, 10_000, true),
            }
        );
    }

    #[test]
    fn skip_while_paused_stays_paused() {
        let (mut engine, _clock, _log) = engine_for(circuit_steps());
        engine.start();
        engine.pause();
        engine.skip();
        assert_eq!(engine.state(), TimerState::Paused);
        assert_eq!(engine.step_index(), 1);
        assert_eq!(engine.remaining_ms(), 20_000);
    }

    #[test]
    fn instant_steps_are_consumed_together() {
        let blocks = vec![WorkoutBlock::new(
            1,
            Pace::time(0),
            vec![
                Exercise::timed("A", 1).with_pace(Pace::time(1)),
                Exercise::timed("B", 0),
                Exercise::timed("C", 0),
                Exercise::timed("D", 2).with_pace(Pace::time(2)),
            ],
        )];
        let (mut engine, clock, log) = engine_for(build_steps(0, &blocks).steps);
        engine.start();
        run_for(&mut engine, &clock, 1_000);
        assert_eq!(engine.step_index(), 3);
        let changes: Vec<TimerEvent> = log
            .lock()
            .unwrap()
            .iter()
            .filter(|e| matches!(e, TimerEvent::StepChanged { .. }))
            .copied()
            .collect();
        assert_eq!(
            changes,
            vec![TimerEvent::StepChanged {
                from_step: 0,
                snapshot: Snapshot::new(3, 2_000, true),
            }]
        );
    }

    #[test]
    fn finishing_emits_terminal_snapshot_and_stops_ticking() {
        let blocks = vec![WorkoutBlock::new(1, Pace::time(1), vec![Exercise::timed("A", 1)])];
        let (mut engine, clock, log) = engine_for(build_steps(0, &blocks).steps);
        engine.start();
        run_for(&mut engine, &clock, 1_000);
        assert_eq!(engine.state(), TimerState::Finished);
        assert_eq!(
            *log.lock().unwrap().last().unwrap(),
            TimerEvent::Finished {
                snapshot: Snapshot::new(0, 0, false),
            }
        );

        let count = log.lock().unwrap().len();
        run_for(&mut engine, &clock, 1_000);
        engine.stop();
        assert_eq!(log.lock().unwrap().len(), count);
    }

    #[test]
    fn empty_plan_is_finished_and_silent() {
        let (mut engine, _clock, log) = engine_for(Vec::new());
        assert!(!engine.is_running());
        assert_eq!(engine.state(), TimerState::Finished);
        engine.start();
        engine.skip();
        engine.tick();
        assert!(!engine.is_running());
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn all_instant_plan_finishes_on_start() {
        let blocks = vec![WorkoutBlock::new(1, Pace::time(0), vec![Exercise::timed("A", 0)])];
        let (mut engine, _clock, log) = engine_for(build_steps(0, &blocks).steps);
        engine.start();
        assert_eq!(engine.state(), TimerState::Finished);
        assert!(matches!(log.lock().unwrap()[..], [TimerEvent::Finished { .. }]));
    }

    #[test]
    fn stop_silences_everything() {
        let (mut engine, clock, log) = engine_for(circuit_steps());
        engine.start();
        engine.stop();
        let count = log.lock().unwrap().len();
        clock.advance(1_000);
        engine.tick();
        engine.resume();
        engine.skip();
        engine.pause();
        engine.start();
        engine.stop();
        assert_eq!(engine.state(), TimerState::Stopped);
        assert!(!engine.is_running());
        assert_eq!(log.lock().unwrap().len(), count);
    }

    #[test]
    fn reps_step_holds_until_confirmed() {
        let blocks = vec![WorkoutBlock::new(
            1,
            Pace::time(2),
            vec![
                Exercise::timed("Jog", 2),
                Exercise::reps("Burpee", 10).with_pace(Pace::reps(10)),
                Exercise::timed("Plank", 2),
            ],
        )];
        let (mut engine, clock, log) = engine_for(build_steps(0, &blocks).steps);
        engine.start();
        run_for(&mut engine, &clock, 2_000);
        assert_eq!(engine.state(), TimerState::Holding);
        assert_eq!(engine.step_index(), 1);
        assert_eq!(
            *log.lock().unwrap().last().unwrap(),
            TimerEvent::StepChanged {
                from_step: 0,
                snapshot: Snapshot::new(1, 0, false),
            }
        );

        run_for(&mut engine, &clock, 10_000);
        assert_eq!(engine.step_index(), 1);

        engine.resume();
        assert_eq!(engine.state(), TimerState::Running);
        assert_eq!(engine.step_index(), 2);
        assert_eq!(engine.remaining_ms(), 2_000);
    }

    #[test]
    fn background_freezes_and_foreground_resumes() {
        let (mut engine, clock, _log) = engine_for(circuit_steps());
        engine.start();
        clock.advance(2_000);
        engine.tick();
        engine.enter_background();
        assert_eq!(engine.state(), TimerState::Paused);

        clock.advance(600_000);
        engine.enter_foreground();
        assert!(engine.is_running());
        assert_eq!(engine.step_index(), 0);
        assert_eq!(engine.remaining_ms(), 3_000);
    }

    #[test]
    fn foreground_does_not_resume_user_pause() {
        let (mut engine, _clock, _log) = engine_for(circuit_steps());
        engine.start();
        engine.pause();
        engine.enter_background();
        engine.enter_foreground();
        assert_eq!(engine.state(), TimerState::Paused);
    }

    #[test]
    fn run_remaining_counts_later_steps() {
        let (mut engine, clock, _log) = engine_for(circuit_steps());
        assert_eq!(engine.run_remaining_ms(), 135_000);
        engine.start();
        run_for(&mut engine, &clock, 1_000);
        assert_eq!(engine.run_remaining_ms(), 134_000);
    }
}

//! Tokio driver for a [`TimerEngine`].
//!
//! One task owns the engine and its single periodic clock. Control calls are
//! queued as commands and applied on that task between ticks, so the engine
//! never needs a lock. Events fan out over a broadcast channel; reminder and
//! audio observers subscribe independently.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::clock::TokioClock;
use super::engine::{TimerEngine, TimerState};
use super::plan::Step;
use crate::events::TimerEvent;

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy)]
pub struct DriverConfig {
    pub tick_interval: Duration,
    /// Broadcast buffer; slow subscribers lag past this many events.
    pub event_capacity: usize,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            tick_interval: DEFAULT_TICK_INTERVAL,
            event_capacity: 256,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Start,
    Pause,
    Resume,
    Skip,
    Background,
    Foreground,
    Stop,
}

/// Handle to an engine running on its own task.
///
/// Dropping the handle stops the engine.
pub struct TimerHandle {
    commands: mpsc::UnboundedSender<Command>,
    events: broadcast::Sender<TimerEvent>,
    /// Emission gate; closed synchronously by `stop()`.
    open: Arc<Mutex<bool>>,
    running: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl TimerHandle {
    /// Spawn the engine task. Must be called from within a tokio runtime.
    pub fn spawn(steps: Vec<Step>, config: DriverConfig) -> Self {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let open = Arc::new(Mutex::new(true));
        let running = Arc::new(AtomicBool::new(false));

        let sink_events = events.clone();
        let sink_open = open.clone();
        let engine = TimerEngine::with_clock(
            steps,
            TokioClock::new(),
            Box::new(move |event: &TimerEvent| {
                if let Ok(open) = sink_open.lock() {
                    if *open {
                        // No subscribers is fine.
                        let _ = sink_events.send(*event);
                    }
                }
            }),
        );

        let task = tokio::spawn(drive(engine, command_rx, config.tick_interval, running.clone()));

        Self {
            commands,
            events,
            open,
            running,
            task,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TimerEvent> {
        self.events.subscribe()
    }

    pub fn start(&self) {
        self.send(Command::Start);
    }

    pub fn pause(&self) {
        self.send(Command::Pause);
    }

    pub fn resume(&self) {
        self.send(Command::Resume);
    }

    pub fn skip(&self) {
        self.send(Command::Skip);
    }

    pub fn enter_background(&self) {
        self.send(Command::Background);
    }

    pub fn enter_foreground(&self) {
        self.send(Command::Foreground);
    }

    /// Stop the engine. No event is published once this returns.
    pub fn stop(&self) {
        if let Ok(mut open) = self.open.lock() {
            *open = false;
        }
        self.running.store(false, Ordering::SeqCst);
        self.send(Command::Stop);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stop and wait for the engine task to exit.
    pub async fn join(self) {
        self.stop();
        let TimerHandle { task, .. } = self;
        if let Err(e) = task.await {
            tracing::warn!(error = %e, "timer task ended abnormally");
        }
    }

    fn send(&self, command: Command) {
        // A closed channel means the engine is gone; control calls become no-ops.
        if self.commands.send(command).is_err() {
            tracing::trace!(?command, "timer already stopped");
        }
    }
}

async fn drive(
    mut engine: TimerEngine<TokioClock>,
    mut commands: mpsc::UnboundedReceiver<Command>,
    period: Duration,
    running: Arc<AtomicBool>,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else {
                    engine.stop();
                    break;
                };
                apply(&mut engine, command);
                // Drop any tick scheduled against the old state.
                interval.reset();
            }
            _ = interval.tick(), if engine.is_running() => {
                engine.tick();
            }
        }

        if engine.state() == TimerState::Stopped {
            running.store(false, Ordering::SeqCst);
            break;
        }
        running.store(engine.is_running(), Ordering::SeqCst);
    }
}

fn apply(engine: &mut TimerEngine<TokioClock>, command: Command) {
    match command {
        Command::Start => engine.start(),
        Command::Pause => engine.pause(),
        Command::Resume => engine.resume(),
        Command::Skip => engine.skip(),
        Command::Background => engine.enter_background(),
        Command::Foreground => engine.enter_foreground(),
        Command::Stop => engine.stop(),
    }
}

use serde::{Deserialize, Serialize};

/// Point-in-time view of the engine, plain data only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub step_index: usize,
    /// `remaining_ms` rounded up, so a countdown never shows 0 while time remains.
    pub remaining_sec: u64,
    pub remaining_ms: u64,
    pub running: bool,
}

impl Snapshot {
    pub fn new(step_index: usize, remaining_ms: u64, running: bool) -> Self {
        Self {
            step_index,
            remaining_sec: ceil_secs(remaining_ms),
            remaining_ms,
            running,
        }
    }
}

/// Display rounding for remaining time: always up.
pub fn ceil_secs(ms: u64) -> u64 {
    ms / 1000 + u64::from(ms % 1000 != 0)
}

/// Every engine emission. Transitions get their own variant so consumers can
/// react to "step changed" without diffing ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimerEvent {
    Started {
        #[serde(flatten)]
        snapshot: Snapshot,
    },
    Paused {
        #[serde(flatten)]
        snapshot: Snapshot,
    },
    Resumed {
        #[serde(flatten)]
        snapshot: Snapshot,
    },
    Tick {
        #[serde(flatten)]
        snapshot: Snapshot,
    },
    /// A new step became current, by elapsing or by skip.
    StepChanged {
        from_step: usize,
        #[serde(flatten)]
        snapshot: Snapshot,
    },
    /// Terminal event: last step done, `running == false`, `remaining_ms == 0`.
    Finished {
        #[serde(flatten)]
        snapshot: Snapshot,
    },
}

impl TimerEvent {
    pub fn snapshot(&self) -> &Snapshot {
        match self {
            TimerEvent::Started { snapshot }
            | TimerEvent::Paused { snapshot }
            | TimerEvent::Resumed { snapshot }
            | TimerEvent::Tick { snapshot }
            | TimerEvent::StepChanged { snapshot, .. }
            | TimerEvent::Finished { snapshot } => snapshot,
        }
    }

    pub fn is_transition(&self) -> bool {
        !matches!(self, TimerEvent::Tick { .. })
    }
}

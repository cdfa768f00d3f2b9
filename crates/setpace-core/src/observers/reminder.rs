//! Step-end reminders.
//!
//! While a step counts down, exactly one reminder is pending, timed to fire
//! when the step's remaining time runs out. Any pause, resume or step change
//! cancels it and, if the timer is still running, schedules a fresh one.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::events::TimerEvent;
use crate::timer::{Phase, Step};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: Uuid,
    pub step_id: String,
    pub phase: Phase,
    pub step_name: String,
    /// Lookahead label for the notification body.
    pub next_name: String,
    pub fire_at: DateTime<Utc>,
}

/// Platform notification backend.
pub trait Notifier {
    fn schedule(&mut self, reminder: &Reminder);
    fn cancel(&mut self, reminder_id: Uuid);
}

/// Keeps every call, for tests and dry runs.
#[derive(Debug, Default, Clone)]
pub struct RecordingNotifier {
    pub scheduled: Vec<Reminder>,
    pub cancelled: Vec<Uuid>,
}

impl Notifier for RecordingNotifier {
    fn schedule(&mut self, reminder: &Reminder) {
        self.scheduled.push(reminder.clone());
    }

    fn cancel(&mut self, reminder_id: Uuid) {
        self.cancelled.push(reminder_id);
    }
}

pub struct ReminderPlanner<N: Notifier> {
    steps: Vec<Step>,
    notifier: N,
    pending: Option<Uuid>,
}

impl<N: Notifier> ReminderPlanner<N> {
    pub fn new(steps: Vec<Step>, notifier: N) -> Self {
        Self {
            steps,
            notifier,
            pending: None,
        }
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn pending(&self) -> Option<Uuid> {
        self.pending
    }

    /// Feed one engine event. `now` anchors the fire time.
    pub fn observe(&mut self, event: &TimerEvent, now: DateTime<Utc>) {
        let snapshot = *event.snapshot();
        match event {
            TimerEvent::Tick { .. } => {}
            TimerEvent::Started { .. }
            | TimerEvent::Resumed { .. }
            | TimerEvent::StepChanged { .. }
                if snapshot.running =>
            {
                self.cancel_pending();
                self.schedule_for(snapshot.step_index, snapshot.remaining_ms, now);
            }
            _ => self.cancel_pending(),
        }
    }

    fn schedule_for(&mut self, step_index: usize, remaining_ms: u64, now: DateTime<Utc>) {
        let Some(step) = self.steps.get(step_index) else {
            return;
        };
        if remaining_ms == 0 {
            return;
        }
        let reminder = Reminder {
            id: Uuid::new_v4(),
            step_id: step.id.clone(),
            phase: step.label,
            step_name: step.name.clone(),
            next_name: step.next_name.clone(),
            fire_at: now + Duration::milliseconds(remaining_ms as i64),
        };
        tracing::debug!(step_id = %reminder.step_id, fire_at = %reminder.fire_at, "reminder scheduled");
        self.notifier.schedule(&reminder);
        self.pending = Some(reminder.id);
    }

    fn cancel_pending(&mut self) {
        if let Some(id) = self.pending.take() {
            self.notifier.cancel(id);
        }
    }
}

//! Consumers of the engine's event stream.
//!
//! The engine only emits data. Platform side effects (local notifications,
//! sound) live behind these observers, each fed the same events independently.

mod audio;
mod reminder;

pub use audio::{cue_input, AudioCue, AudioCueTracker, CueInput};
pub use reminder::{Notifier, RecordingNotifier, Reminder, ReminderPlanner};

//! Workout definitions.
//!
//! A [`Workout`] is an ordered list of [`WorkoutBlock`]s, each repeated for a
//! number of sets. It is read-only input to the plan builder; nothing in the
//! timer mutates it once a run starts.
//!
//! JSON uses camelCase field names:
//!
//! ```json
//! {
//!   "id": "w1",
//!   "name": "Legs",
//!   "updatedAtMs": 0,
//!   "blocks": [{
//!     "id": "b1",
//!     "sets": 2,
//!     "defaultPace": { "kind": "time", "workSec": 20 },
//!     "restBetweenSetsSec": 30,
//!     "restBetweenExercisesSec": 10,
//!     "exercises": [{ "id": "e1", "name": "Squat", "mode": "time", "value": 20 }]
//!   }]
//! }
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, ValidationError};

/// How an exercise is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExerciseMode {
    Time,
    Reps,
}

/// Work-duration policy for an exercise.
///
/// Only [`Pace::Time`] produces a countable duration; reps are advanced by hand.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Pace {
    Time {
        #[serde(rename = "workSec")]
        work_sec: f64,
    },
    Reps {
        reps: f64,
    },
}

impl Pace {
    pub fn time(work_sec: u64) -> Self {
        Pace::Time {
            work_sec: work_sec as f64,
        }
    }

    pub fn reps(reps: u64) -> Self {
        Pace::Reps { reps: reps as f64 }
    }

    /// Work duration in whole seconds. Reps paces have none.
    pub fn work_secs(&self) -> u64 {
        match self {
            Pace::Time { work_sec } => sanitize_secs(*work_sec),
            Pace::Reps { .. } => 0,
        }
    }

    pub fn is_reps(&self) -> bool {
        matches!(self, Pace::Reps { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    pub id: String,
    pub name: String,
    pub mode: ExerciseMode,
    /// Seconds when `mode` is time, repetitions when `mode` is reps.
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pace_override: Option<Pace>,
}

impl Exercise {
    pub fn timed(name: impl Into<String>, secs: u64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            mode: ExerciseMode::Time,
            value: secs as f64,
            pace_override: None,
        }
    }

    pub fn reps(name: impl Into<String>, reps: u64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            mode: ExerciseMode::Reps,
            value: reps as f64,
            pace_override: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_pace(mut self, pace: Pace) -> Self {
        self.pace_override = Some(pace);
        self
    }

    /// The exercise's own pace override, falling back to the block default.
    pub fn resolved_pace(&self, block_default: &Pace) -> Pace {
        self.pace_override.unwrap_or(*block_default)
    }

    /// `value` clamped to a whole, non-negative number.
    pub fn target(&self) -> u64 {
        sanitize_secs(self.value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutBlock {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub sets: u32,
    pub exercises: Vec<Exercise>,
    pub default_pace: Pace,
    #[serde(default)]
    pub rest_between_sets_sec: f64,
    #[serde(default)]
    pub rest_between_exercises_sec: f64,
}

impl WorkoutBlock {
    pub fn new(sets: u32, default_pace: Pace, exercises: Vec<Exercise>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: None,
            sets,
            exercises,
            default_pace,
            rest_between_sets_sec: 0.0,
            rest_between_exercises_sec: 0.0,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_rests(mut self, between_exercises_sec: u64, between_sets_sec: u64) -> Self {
        self.rest_between_exercises_sec = between_exercises_sec as f64;
        self.rest_between_sets_sec = between_sets_sec as f64;
        self
    }

    pub fn rest_between_sets(&self) -> u64 {
        sanitize_secs(self.rest_between_sets_sec)
    }

    pub fn rest_between_exercises(&self) -> u64 {
        sanitize_secs(self.rest_between_exercises_sec)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workout {
    pub id: String,
    pub name: String,
    pub blocks: Vec<WorkoutBlock>,
    #[serde(default)]
    pub updated_at_ms: i64,
}

impl Workout {
    pub fn new(name: impl Into<String>, blocks: Vec<WorkoutBlock>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            blocks,
            updated_at_ms: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// A small two-block workout with fixed ids.
    pub fn sample() -> Self {
        Self {
            id: "sample".into(),
            name: "Sample Circuit".into(),
            updated_at_ms: 0,
            blocks: vec![
                WorkoutBlock::new(
                    2,
                    Pace::time(20),
                    vec![
                        Exercise::timed("Squats", 20).with_id("squats"),
                        Exercise::timed("Push-ups", 20).with_id("pushups"),
                    ],
                )
                .with_id("warmup")
                .with_title("Warm Up")
                .with_rests(10, 30),
                WorkoutBlock::new(
                    1,
                    Pace::time(40),
                    vec![
                        Exercise::timed("Plank", 40).with_id("plank"),
                        Exercise::reps("Burpees", 10)
                            .with_id("burpees")
                            .with_pace(Pace::reps(10)),
                    ],
                )
                .with_id("core")
                .with_title("Core")
                .with_rests(15, 0),
            ],
        }
    }

    /// Structural problems worth reporting to an editor.
    ///
    /// Plan building never depends on this; malformed numbers are clamped there.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut issues = Vec::new();

        if self.name.trim().is_empty() {
            issues.push(ValidationError::InvalidValue {
                field: "name".into(),
                message: "workout name is empty".into(),
            });
        }
        if self.blocks.is_empty() {
            issues.push(ValidationError::EmptyCollection("blocks".into()));
        }

        let mut block_ids = HashSet::new();
        for block in &self.blocks {
            if !block_ids.insert(block.id.as_str()) {
                issues.push(ValidationError::DuplicateId {
                    kind: "block".into(),
                    id: block.id.clone(),
                });
            }
            let mut exercise_ids = HashSet::new();
            for exercise in &block.exercises {
                if !exercise_ids.insert(exercise.id.as_str()) {
                    issues.push(ValidationError::DuplicateId {
                        kind: "exercise".into(),
                        id: exercise.id.clone(),
                    });
                }
                if !exercise.value.is_finite() || exercise.value < 0.0 {
                    issues.push(ValidationError::InvalidValue {
                        field: format!("{}.value", exercise.id),
                        message: format!("{} will be treated as 0", exercise.value),
                    });
                }
            }
        }

        issues
    }
}

/// Whole seconds from a possibly malformed number. Non-finite and negative
/// inputs become 0.
pub fn sanitize_secs(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value.round() as u64
    } else {
        0
    }
}

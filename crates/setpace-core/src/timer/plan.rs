//! Run plan construction.
//!
//! [`build_steps`] flattens a list of workout blocks into the ordered sequence
//! of timed phases the engine counts down. The builder is pure: equal input
//! always yields equal steps, ids and `run_key`, so callers can memoize on the
//! key instead of on object identity.
//!
//! ```text
//! PREP  WORK REST WORK  REST(set)  WORK REST WORK  [BLOCK_PAUSE]  WORK ...
//! └─┬─┘ └──── set 0 ───────────┘   └─ set 1 ────┘                 └ block 1
//! ```

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::progress::RunMeta;
use crate::workout::{sanitize_secs, Pace, WorkoutBlock};

/// Key used for plans with no steps.
pub const EMPTY_RUN_KEY: &str = "empty";

/// Lookahead label once no work remains.
pub const FINISH_LABEL: &str = "Finish";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Prep,
    Work,
    Rest,
    BlockPause,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Prep => "PREP",
            Phase::Work => "WORK",
            Phase::Rest => "REST",
            Phase::BlockPause => "BLOCK_PAUSE",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One atomic phase of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Stable within a plan; derived from position and phase.
    pub id: String,
    pub label: Phase,
    /// Display name: the exercise for WORK steps, otherwise the phase name.
    pub name: String,
    pub duration_sec: u64,
    pub duration_ms: u64,
    pub block_idx: usize,
    pub set_idx: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exercise_idx: Option<usize>,
    /// Name of the next work item, for "next up" displays and reminders.
    pub next_name: String,
    /// Blocking steps wait for the user instead of counting down on their own.
    #[serde(default)]
    pub blocking: bool,
    /// Exercise target (seconds or reps) for WORK steps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<u64>,
}

impl Step {
    fn new(id: String, label: Phase, name: String, duration_sec: u64) -> Self {
        Self {
            id,
            label,
            name,
            duration_sec,
            duration_ms: duration_sec.saturating_mul(1000),
            block_idx: 0,
            set_idx: 0,
            exercise_idx: None,
            next_name: String::new(),
            blocking: false,
            target: None,
        }
    }

    fn at(mut self, block_idx: usize, set_idx: usize, exercise_idx: Option<usize>) -> Self {
        self.block_idx = block_idx;
        self.set_idx = set_idx;
        self.exercise_idx = exercise_idx;
        self
    }

    /// Zero-duration, non-blocking steps are consumed without a tick.
    pub fn is_instant(&self) -> bool {
        self.duration_ms == 0 && !self.blocking
    }
}

/// Pause inserted between blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockPauseOptions {
    #[serde(default)]
    pub duration_sec: u64,
    /// Hold at the pause until the user confirms.
    #[serde(default = "default_true")]
    pub blocking: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlanOptions {
    pub prep_sec: u64,
    #[serde(default)]
    pub block_pause: Option<BlockPauseOptions>,
}

impl PlanOptions {
    pub fn with_prep(prep_sec: u64) -> Self {
        Self {
            prep_sec,
            block_pause: None,
        }
    }
}

/// Flattened steps plus everything derived from them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunPlan {
    pub steps: Vec<Step>,
    pub meta: RunMeta,
    pub total_blocks: usize,
    pub planned_sets_by_block: Vec<u32>,
    pub total_sets_for_run: u32,
    /// True when any work step is paced by repetitions.
    pub has_reps: bool,
    pub total_duration_sec: u64,
    pub run_key: String,
}

impl RunPlan {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn step(&self, index: usize) -> Option<&Step> {
        self.steps.get(index)
    }

    /// Fill of the enclosing set's bar for a step with `remaining_ms` left.
    pub fn set_progress(&self, step_index: usize, remaining_ms: u64) -> f64 {
        let Some(step) = self.step(step_index) else {
            return 0.0;
        };
        let range = super::progress::progress_range_from_meta(&self.meta, step_index, step);
        if range.step_duration_ms == 0 {
            return range.end_progress;
        }
        let done = 1.0 - (remaining_ms.min(range.step_duration_ms) as f64 / range.step_duration_ms as f64);
        range.start_progress + (range.end_progress - range.start_progress) * done
    }
}

/// Build a plan with a prep phase and no block pauses.
pub fn build_steps(prep_sec: u64, blocks: &[WorkoutBlock]) -> RunPlan {
    build_plan(&PlanOptions::with_prep(prep_sec), blocks)
}

pub fn build_plan(options: &PlanOptions, blocks: &[WorkoutBlock]) -> RunPlan {
    let mut steps = Vec::new();
    let mut has_reps = false;

    let planned_sets_by_block: Vec<u32> = blocks.iter().map(effective_sets).collect();
    let has_sets = planned_sets_by_block.iter().any(|&sets| sets > 0);

    if options.prep_sec > 0 && has_sets {
        steps.push(Step::new(
            "prep".into(),
            Phase::Prep,
            "Get Ready".into(),
            options.prep_sec,
        ));
    }

    let mut emitted_block = false;

    for (bi, block) in blocks.iter().enumerate() {
        let sets = planned_sets_by_block[bi] as usize;
        if sets == 0 {
            continue;
        }

        if emitted_block {
            if let Some(pause) = options.block_pause {
                let mut step = Step::new(
                    format!("b{bi}-pause"),
                    Phase::BlockPause,
                    block.title.clone().unwrap_or_else(|| "Block Pause".into()),
                    pause.duration_sec,
                )
                .at(bi, 0, None);
                step.blocking = pause.blocking;
                steps.push(step);
            }
        }
        emitted_block = true;

        let rest_exercises = checked_secs(block.rest_between_exercises_sec, &block.id, "restBetweenExercisesSec");
        let rest_sets = checked_secs(block.rest_between_sets_sec, &block.id, "restBetweenSetsSec");
        let last_exercise = block.exercises.len() - 1;

        for si in 0..sets {
            for (ei, exercise) in block.exercises.iter().enumerate() {
                let pace = exercise.resolved_pace(&block.default_pace);
                let work_sec = match pace {
                    Pace::Time { work_sec } => checked_secs(work_sec, &exercise.id, "workSec"),
                    Pace::Reps { .. } => 0,
                };
                let mut step = Step::new(
                    format!("b{bi}-s{si}-e{ei}-work"),
                    Phase::Work,
                    exercise.name.clone(),
                    work_sec,
                )
                .at(bi, si, Some(ei));
                step.target = Some(checked_secs(exercise.value, &exercise.id, "value"));
                if pace.is_reps() {
                    step.blocking = true;
                    has_reps = true;
                }
                steps.push(step);

                if ei < last_exercise && rest_exercises > 0 {
                    steps.push(
                        Step::new(format!("b{bi}-s{si}-e{ei}-rest"), Phase::Rest, "Rest".into(), rest_exercises)
                            .at(bi, si, Some(ei)),
                    );
                }
            }

            if si + 1 < sets && rest_sets > 0 {
                steps.push(
                    Step::new(format!("b{bi}-s{si}-rest"), Phase::Rest, "Rest".into(), rest_sets)
                        .at(bi, si, None),
                );
            }
        }
    }

    assign_next_names(&mut steps);

    let meta = RunMeta::from_steps(&steps);
    let run_key = run_key(options, blocks, steps.is_empty());
    let total_duration_sec = steps.iter().map(|s| s.duration_sec).sum();

    tracing::debug!(
        steps = steps.len(),
        total_duration_sec,
        run_key = %run_key,
        "built run plan"
    );

    RunPlan {
        steps,
        meta,
        total_blocks: blocks.len(),
        total_sets_for_run: planned_sets_by_block.iter().sum(),
        planned_sets_by_block,
        has_reps,
        total_duration_sec,
        run_key,
    }
}

/// Sets that will actually produce steps.
fn effective_sets(block: &WorkoutBlock) -> u32 {
    if block.exercises.is_empty() {
        0
    } else {
        block.sets
    }
}

fn checked_secs(raw: f64, owner: &str, field: &str) -> u64 {
    if !raw.is_finite() || raw < 0.0 {
        tracing::warn!(owner, field, raw, "clamping malformed value to 0");
    }
    sanitize_secs(raw)
}

/// Walk backwards so every step sees the nearest work step after it.
fn assign_next_names(steps: &mut [Step]) {
    let mut upcoming = FINISH_LABEL.to_string();
    for step in steps.iter_mut().rev() {
        step.next_name = upcoming.clone();
        if step.label == Phase::Work {
            upcoming = step.name.clone();
        }
    }
}

/// Fingerprint of every duration-affecting input.
///
/// Every field is length-prefixed before hashing, so ids containing any
/// characters cannot make two different structures hash alike.
fn run_key(options: &PlanOptions, blocks: &[WorkoutBlock], empty: bool) -> String {
    if empty {
        return EMPTY_RUN_KEY.to_string();
    }

    let mut hasher = Sha256::new();
    feed(&mut hasher, &options.prep_sec.to_string());
    match options.block_pause {
        Some(pause) => {
            feed(&mut hasher, "pause");
            feed(&mut hasher, &pause.duration_sec.to_string());
            feed(&mut hasher, &pause.blocking.to_string());
        }
        None => feed(&mut hasher, "no-pause"),
    }
    feed(&mut hasher, &blocks.len().to_string());
    for block in blocks {
        feed(&mut hasher, &block.id);
        feed(&mut hasher, &effective_sets(block).to_string());
        feed(&mut hasher, &block.rest_between_sets().to_string());
        feed(&mut hasher, &block.rest_between_exercises().to_string());
        feed(&mut hasher, &pace_token(&block.default_pace));
        feed(&mut hasher, &block.exercises.len().to_string());
        for exercise in &block.exercises {
            feed(&mut hasher, &exercise.id);
            feed(&mut hasher, &pace_token(&exercise.resolved_pace(&block.default_pace)));
        }
    }

    hex::encode(hasher.finalize())
}

fn feed(hasher: &mut Sha256, field: &str) {
    hasher.update((field.len() as u64).to_le_bytes());
    hasher.update(field.as_bytes());
}

fn pace_token(pace: &Pace) -> String {
    match pace {
        Pace::Time { work_sec } => format!("t{}", sanitize_secs(*work_sec)),
        Pace::Reps { reps } => format!("r{}", sanitize_secs(*reps)),
    }
}

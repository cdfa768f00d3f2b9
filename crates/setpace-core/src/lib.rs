//! # setpace Core Library
//!
//! This library provides the core logic for the setpace workout timer. It
//! turns a structured workout into a flat run plan and drives a pausable,
//! skippable countdown across it. The `setpace` CLI is a thin layer over the
//! same library.
//!
//! ## Architecture
//!
//! - **Plan Builder**: pure function from workout blocks to ordered steps plus
//!   set-progress metadata and a `run_key` fingerprint
//! - **Timer Engine**: a clock-delta state machine that requires the caller to
//!   periodically invoke `tick()`; [`TimerHandle`] does so on a tokio task
//! - **Observers**: reminder scheduling and audio cue selection fed from the
//!   engine's event stream
//! - **Storage**: TOML-based configuration
//!
//! ## Key Components
//!
//! - [`build_steps`]: Workout blocks to [`RunPlan`]
//! - [`progress_range_from_meta`]: Set-bar range of a step
//! - [`TimerEngine`]: Core timer state machine
//! - [`Config`]: Application configuration management

pub mod error;
pub mod events;
pub mod observers;
pub mod storage;
pub mod timer;
pub mod workout;

pub use error::{ConfigError, CoreError, ValidationError};
pub use events::{Snapshot, TimerEvent};
pub use storage::Config;
pub use timer::{
    build_plan, build_steps, create_timer, progress_range_from_meta, Phase, PlanOptions,
    ProgressRange, RunPlan, Step, TimerEngine, TimerHandle, TimerState,
};
pub use workout::{Exercise, ExerciseMode, Pace, Workout, WorkoutBlock};

pub mod completions;
pub mod config;
pub mod plan;
pub mod progress;
pub mod run;
pub mod sample;
pub mod simulate;

use std::path::Path;

use setpace_core::{build_plan, Config, RunPlan, Workout};

/// Load a workout file and build its plan. `prep` overrides the configured
/// prep countdown.
pub(crate) fn load_plan(
    path: &Path,
    prep: Option<u64>,
    config: &Config,
) -> Result<RunPlan, Box<dyn std::error::Error>> {
    let workout = Workout::from_json_file(path)?;
    for issue in workout.validate() {
        tracing::warn!(workout = %workout.name, "{issue}");
    }

    let mut options = config.plan_options();
    if let Some(prep_sec) = prep {
        options.prep_sec = prep_sec;
    }
    Ok(build_plan(&options, &workout.blocks))
}

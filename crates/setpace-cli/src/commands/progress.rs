use std::path::PathBuf;

use clap::Args;
use setpace_core::{progress_range_from_meta, Config};

#[derive(Args)]
pub struct ProgressArgs {
    /// Workout JSON file
    workout: PathBuf,
    /// Step index in the plan
    step: usize,
    /// Prep countdown in seconds (defaults to the configured value)
    #[arg(long)]
    prep: Option<u64>,
}

pub fn run(args: ProgressArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let plan = super::load_plan(&args.workout, args.prep, &config)?;
    let step = plan
        .step(args.step)
        .ok_or_else(|| format!("step {} out of range (plan has {} steps)", args.step, plan.len()))?;

    let range = progress_range_from_meta(&plan.meta, args.step, step);
    println!("{}", serde_json::to_string_pretty(&range)?);
    Ok(())
}

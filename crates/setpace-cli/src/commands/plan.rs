use std::path::PathBuf;

use clap::Args;
use setpace_core::Config;

#[derive(Args)]
pub struct PlanArgs {
    /// Workout JSON file
    workout: PathBuf,
    /// Prep countdown in seconds (defaults to the configured value)
    #[arg(long)]
    prep: Option<u64>,
    /// Print the whole plan as JSON
    #[arg(long)]
    json: bool,
}

pub fn run(args: PlanArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let plan = super::load_plan(&args.workout, args.prep, &config)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    for (i, step) in plan.steps.iter().enumerate() {
        let duration = if step.blocking && step.duration_sec == 0 {
            match step.target {
                Some(reps) => format!("x{reps}"),
                None => "hold".to_string(),
            }
        } else {
            format!("{}s", step.duration_sec)
        };
        println!(
            "{i:>3}  {:<11} {:>6}  {:<24} next: {}",
            step.label.as_str(),
            duration,
            step.name,
            step.next_name
        );
    }
    println!(
        "{} steps, {} sets across {} blocks, {}s timed",
        plan.len(),
        plan.total_sets_for_run,
        plan.total_blocks,
        plan.total_duration_sec
    );
    println!("run key: {}", plan.run_key);
    Ok(())
}

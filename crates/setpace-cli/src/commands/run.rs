use std::path::PathBuf;

use clap::Args;
use setpace_core::observers::{cue_input, AudioCueTracker, Notifier, Reminder, ReminderPlanner};
use setpace_core::{Config, Step, TimerEvent, TimerHandle};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

#[derive(Args)]
pub struct RunArgs {
    /// Workout JSON file
    workout: PathBuf,
    /// Prep countdown in seconds (defaults to the configured value)
    #[arg(long)]
    prep: Option<u64>,
}

/// Logs reminders instead of handing them to a desktop notification service.
struct LogNotifier;

impl Notifier for LogNotifier {
    fn schedule(&mut self, reminder: &Reminder) {
        tracing::info!(
            id = %reminder.id,
            step = %reminder.step_name,
            next = %reminder.next_name,
            fire_at = %reminder.fire_at,
            "reminder scheduled"
        );
    }

    fn cancel(&mut self, reminder_id: Uuid) {
        tracing::debug!(id = %reminder_id, "reminder cancelled");
    }
}

pub fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let plan = super::load_plan(&args.workout, args.prep, &config)?;
    if plan.is_empty() {
        println!("nothing to run: the workout has no steps");
        return Ok(());
    }

    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(run_steps(plan.steps, &config));
    // A pending stdin read cannot be cancelled; don't wait for it.
    runtime.shutdown_background();
    result
}

async fn run_steps(steps: Vec<Step>, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let handle = TimerHandle::spawn(steps.clone(), config.driver_config());
    let mut events = handle.subscribe();
    let mut reminders = config
        .notifications
        .enabled
        .then(|| ReminderPlanner::new(steps.clone(), LogNotifier));
    let mut cues = config.audio.enabled.then(AudioCueTracker::new);

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let mut input_open = true;

    eprintln!("controls: p pause, r resume, s skip, b background, f foreground, q quit");
    handle.start();

    loop {
        tokio::select! {
            line = input.next_line(), if input_open => match line? {
                Some(line) => {
                    if !control(&handle, line.trim()) {
                        break;
                    }
                }
                None => input_open = false,
            },
            event = events.recv() => match event {
                Ok(event) => {
                    report(&event, &steps, reminders.as_mut(), cues.as_mut())?;
                    if matches!(event, TimerEvent::Finished { .. }) {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => tracing::warn!(skipped, "event stream lagged"),
                Err(RecvError::Closed) => break,
            },
        }
    }

    handle.join().await;
    Ok(())
}

/// Apply one line of user input. Returns false when the user quits.
fn control(handle: &TimerHandle, line: &str) -> bool {
    match line {
        "p" | "pause" => handle.pause(),
        "r" | "resume" => handle.resume(),
        "s" | "skip" => handle.skip(),
        "b" | "background" => handle.enter_background(),
        "f" | "foreground" => handle.enter_foreground(),
        "q" | "quit" => {
            handle.stop();
            return false;
        }
        "" => {}
        other => eprintln!("unknown command: {other}"),
    }
    true
}

fn report(
    event: &TimerEvent,
    steps: &[Step],
    reminders: Option<&mut ReminderPlanner<LogNotifier>>,
    cues: Option<&mut AudioCueTracker>,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string(event)?);

    if let Some(planner) = reminders {
        planner.observe(event, chrono::Utc::now());
    }
    if let Some(tracker) = cues {
        if let Some(cue) = cue_input(event, steps).and_then(|input| tracker.observe(&input)) {
            println!("{}", serde_json::to_string(&cue)?);
        }
    }

    if let TimerEvent::Started { snapshot } | TimerEvent::StepChanged { snapshot, .. } = event {
        if let Some(step) = steps.get(snapshot.step_index) {
            if step.blocking && !snapshot.running {
                eprintln!("{}: press r when done", step.name);
            }
        }
    }
    Ok(())
}

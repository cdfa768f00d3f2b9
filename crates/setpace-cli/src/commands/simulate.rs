use std::path::PathBuf;
use std::sync::mpsc;

use clap::Args;
use setpace_core::timer::ManualClock;
use setpace_core::{Config, Step, TimerEngine, TimerEvent, TimerState};

#[derive(Args)]
pub struct SimulateArgs {
    /// Workout JSON file
    workout: PathBuf,
    /// Prep countdown in seconds (defaults to the configured value)
    #[arg(long)]
    prep: Option<u64>,
    /// Simulated tick period in milliseconds (defaults to the configured value)
    #[arg(long)]
    tick_ms: Option<u64>,
    /// Print transitions as JSON lines
    #[arg(long)]
    json: bool,
}

pub fn run(args: SimulateArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let plan = super::load_plan(&args.workout, args.prep, &config)?;
    let tick_ms = args
        .tick_ms
        .unwrap_or_else(|| config.tick_interval().as_millis() as u64)
        .max(1);

    let (tx, rx) = mpsc::channel();
    let clock = ManualClock::new();
    let mut engine = TimerEngine::with_clock(
        plan.steps.clone(),
        clock.clone(),
        Box::new(move |event: &TimerEvent| {
            let _ = tx.send(*event);
        }),
    );

    let mut elapsed_ms = 0u64;
    let mut confirmations = 0u32;
    engine.start();
    loop {
        for event in rx.try_iter().filter(TimerEvent::is_transition) {
            print_event(&event, elapsed_ms, &plan.steps, args.json)?;
        }
        match engine.state() {
            TimerState::Running => {
                clock.advance(tick_ms);
                elapsed_ms += tick_ms;
                engine.tick();
            }
            // Held steps wait for the user; confirm them straight away.
            TimerState::Holding | TimerState::Paused => {
                confirmations += 1;
                engine.resume();
            }
            TimerState::Idle | TimerState::Finished | TimerState::Stopped => break,
        }
    }

    if !args.json {
        println!(
            "finished in {}s of timer time, {confirmations} manual confirmations",
            elapsed_ms / 1000
        );
    }
    Ok(())
}

fn print_event(
    event: &TimerEvent,
    elapsed_ms: u64,
    steps: &[Step],
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        let line = serde_json::json!({ "at_ms": elapsed_ms, "event": event });
        println!("{}", serde_json::to_string(&line)?);
        return Ok(());
    }

    let snapshot = event.snapshot();
    let kind = match event {
        TimerEvent::Started { .. } => "start",
        TimerEvent::Paused { .. } => "pause",
        TimerEvent::Resumed { .. } => "resume",
        TimerEvent::Tick { .. } => "tick",
        TimerEvent::StepChanged { .. } => "step",
        TimerEvent::Finished { .. } => "finish",
    };
    let secs = elapsed_ms / 1000;
    match steps.get(snapshot.step_index) {
        Some(step) if !matches!(event, TimerEvent::Finished { .. }) => println!(
            "[{:>2}:{:02}] {kind:<7} #{:<3} {:<11} {} ({}s)",
            secs / 60,
            secs % 60,
            snapshot.step_index,
            step.label.as_str(),
            step.name,
            snapshot.remaining_sec
        ),
        _ => println!("[{:>2}:{:02}] {kind}", secs / 60, secs % 60),
    }
    Ok(())
}

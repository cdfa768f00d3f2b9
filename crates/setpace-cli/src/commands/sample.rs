use setpace_core::Workout;

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let json = serde_json::to_string_pretty(&Workout::sample())?;
    println!("{json}");
    Ok(())
}

use clap::Command;
use clap_complete::Shell;

pub fn run(shell: Shell, command: &mut Command) -> Result<(), Box<dyn std::error::Error>> {
    let name = command.get_name().to_string();
    clap_complete::generate(shell, command, name, &mut std::io::stdout());
    Ok(())
}

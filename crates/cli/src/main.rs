use std::process::ExitCode;

fn main() -> ExitCode {
    structure_agent_cli::run()
}

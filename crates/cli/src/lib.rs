pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "structure-agent",
    about = "Structure requirements agent CLI",
    long_about = "Collect structure requirements locally, forward prompts to the hosted agent, and inspect configuration.",
    after_help = "Examples:\n  structure-agent chat\n  structure-agent ask --prompt \"place it at 1,2,3\"\n  structure-agent config"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Run the requirements dialogue locally, one message per line")]
    Chat,
    #[command(about = "Forward one prompt to the hosted agent and print the JSON reply")]
    Ask {
        #[arg(long, help = "Prompt to send to the agent")]
        prompt: String,
        #[arg(long, help = "Include run steps when the run fails")]
        debug: bool,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Chat => commands::chat::run(),
        Command::Ask { prompt, debug } => commands::ask::run(&prompt, debug),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

mod cli_util;
mod commands;

use std::env;
use std::io::{self, Write};

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::commands::check::CheckArgs;
use crate::commands::run::RunArgs;

/// Environment variable holding the log filter, e.g. `BF_LOG=bf_runner=trace`.
const LOG_ENV: &str = "BF_LOG";

fn print_top_usage_and_exit(program: &str, code: i32) -> ! {
    eprintln!(
        r#"Usage:
  {0} run   [OPTIONS] "<code>"       # Run Brainfuck code (args are concatenated)
  {0} run   [OPTIONS] --file <PATH>  # Run Brainfuck code loaded from file
  {0} check "<code>" | --file <PATH> # Validate brackets without running

Run "{0} <subcommand> --help" for more info.

Logging is controlled by {1} (e.g. {1}=debug); it goes to stderr.
"#,
        program, LOG_ENV
    );
    let _ = io::stderr().flush();
    std::process::exit(code);
}

#[derive(Parser, Debug)]
#[command(name = "bf", disable_help_flag = true, disable_help_subcommand = true)]
struct Cli {
    /// Show this help
    #[arg(short = 'h', long = "help", action = clap::ArgAction::SetTrue)]
    help: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    Run(RunArgs),
    Check(CheckArgs),
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    // We still pull the program name for help rendering consistency
    let program = env::args().next().unwrap_or_else(|| String::from("bf"));

    let cli = Cli::parse();
    init_logging();

    let Some(command) = cli.command.filter(|_| !cli.help) else {
        print_top_usage_and_exit(&program, if cli.help { 0 } else { 2 });
    };

    let code = match command {
        Command::Run(args) => commands::run::run(&program, args),
        Command::Check(args) => commands::check::run(&program, args),
    };

    std::process::exit(code);
}

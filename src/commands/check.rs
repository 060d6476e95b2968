use std::io::{self, Write};
use std::path::PathBuf;

use bf_runner::{InterpreterError, Program};
use clap::Args;
use tracing::debug;

use crate::cli_util::{load_code, print_run_error};

#[derive(Args, Debug)]
#[command(disable_help_flag = true)]
pub struct CheckArgs {
    /// Read Brainfuck code from PATH instead of positional "<code>"
    #[arg(short = 'f', long = "file", value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// Concatenated Brainfuck code parts
    #[arg(value_name = "code", trailing_var_arg = true, allow_hyphen_values = true)]
    pub code: Vec<String>,

    /// Show this help
    #[arg(short = 'h', long = "help", action = clap::ArgAction::SetTrue)]
    pub help: bool,
}

pub fn run(program: &str, args: CheckArgs) -> i32 {
    if args.help {
        usage_and_exit(program, 0);
    }

    let code = match load_code(program, args.file, args.code) {
        Ok(code) => code,
        Err(2) => usage_and_exit(program, 2),
        Err(exit) => return exit,
    };

    match Program::parse(&code) {
        Ok(parsed) => {
            debug!(len = parsed.len(), "program is well formed");
            println!("ok");
            let _ = io::stdout().flush();
            0
        }
        Err(err) => {
            print_run_error(program, &code, &InterpreterError::from(err));
            1
        }
    }
}

fn usage_and_exit(program: &str, code: i32) -> ! {
    eprintln!(
        r#"Usage:
  {0} check "<code>"
  {0} check --file <PATH>

Options:
  --file,  -f <PATH>  Read Brainfuck code from PATH instead of positional "<code>"
  --help,  -h         Show this help

Description:
  Checks that every '[' has a matching ']' without running the program.
  Prints "ok" on success; otherwise reports the offending bracket and exits 1.
"#,
        program
    );
    let _ = io::stderr().flush();
    std::process::exit(code);
}

use std::io::{self, Write};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use bf_runner::{
    CancelFlag, CellWidth, Config, InputSource, Interpreter, OutputTarget, Termination,
};
use clap::Args;
use tracing::debug;

use crate::cli_util::{format_dump, load_code, print_run_error};

#[derive(Args, Debug)]
#[command(disable_help_flag = true)]
pub struct RunArgs {
    /// Read Brainfuck code from PATH instead of positional "<code>"
    #[arg(short = 'f', long = "file", value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// Concatenated Brainfuck code parts
    #[arg(value_name = "code", trailing_var_arg = true, allow_hyphen_values = true)]
    pub code: Vec<String>,

    /// Tape size in cells; 0 selects the default (fallback BF_TAPE_SIZE; default 4096)
    #[arg(short = 's', long = "size", value_name = "N")]
    pub size: Option<usize>,

    /// Where `,` reads from: "stdin" or a file path (default stdin)
    #[arg(short = 'i', long = "input", value_name = "stdin|PATH")]
    pub input: Option<InputSource>,

    /// Where `.` writes to: "stdout" or a file path (default stdout)
    #[arg(short = 'o', long = "output", value_name = "stdout|PATH")]
    pub output: Option<OutputTarget>,

    /// Cell width: i8, i16, i32 or i64 (fallback BF_CELL_WIDTH; default i8)
    #[arg(short = 'w', long = "cell-width", value_name = "WIDTH")]
    pub cell_width: Option<CellWidth>,

    /// Maximum interpreter steps before abort (fallback BF_MAX_STEPS; default unlimited)
    #[arg(long = "max-steps", value_name = "N")]
    pub max_steps: Option<u64>,

    /// Cancel the run after MS milliseconds of wall-clock time
    #[arg(long = "timeout", value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Print the final tape to stderr
    #[arg(short = 'd', long = "dump")]
    pub dump: bool,

    /// Show this help
    #[arg(short = 'h', long = "help", action = clap::ArgAction::SetTrue)]
    pub help: bool,
}

pub fn run(program: &str, args: RunArgs) -> i32 {
    if args.help {
        usage_and_exit(program, 0);
    }

    let RunArgs {
        file,
        code,
        size,
        input,
        output,
        cell_width,
        max_steps,
        timeout_ms,
        dump,
        ..
    } = args;

    let code = match load_code(program, file, code) {
        Ok(code) => code,
        Err(2) => usage_and_exit(program, 2),
        Err(exit) => return exit,
    };

    // Resolve settings: flags -> env -> config file -> defaults
    let mut config = match Config::load() {
        Ok(config) => config.interpreter,
        Err(e) => {
            eprintln!("{program}: {e}");
            let _ = io::stderr().flush();
            return 1;
        }
    };
    if let Some(size) = size {
        config.tape_size = size;
    }
    if let Some(width) = cell_width {
        config.cell_width = width;
    }
    if max_steps.is_some() {
        config.max_steps = max_steps;
    }

    let input = input.unwrap_or_default();
    let output = output.unwrap_or_default();
    let to_stdout = output == OutputTarget::Stdout;

    let input_port = match input.open() {
        Ok(port) => port,
        Err(e) => {
            eprintln!("{program}: failed to open input {input:?}: {e}");
            let _ = io::stderr().flush();
            return 1;
        }
    };
    let output_port = match output.open() {
        Ok(port) => port,
        Err(e) => {
            eprintln!("{program}: failed to open output {output:?}: {e}");
            let _ = io::stderr().flush();
            return 1;
        }
    };

    // SIGINT/SIGTERM and the wall-clock timeout both request cancellation.
    let cancel = CancelFlag::new();
    let on_signal = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || on_signal.cancel()) {
        eprintln!("{program}: failed to set ctrl+c handler: {e}");
        let _ = io::stderr().flush();
        return 1;
    }
    if let Some(ms) = timeout_ms {
        let on_timeout = cancel.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(ms));
            on_timeout.cancel();
        });
    }

    debug!(?config, ?input, ?output, "resolved run settings");

    let mut bf = Interpreter::builder()
        .config(config)
        .input(input_port)
        .output(output_port)
        .build();

    let exit_code = match bf.run(&code, &cancel) {
        Ok(report) => {
            if report.termination == Termination::Cancelled {
                eprintln!("Execution cancelled at instruction {}", report.command_pointer);
            }
            if dump {
                eprint!("{}", format_dump(&report.tape, report.pointer));
            }
            0
        }
        Err(err) => {
            print_run_error(program, &code, &err);
            1
        }
    };
    let _ = io::stderr().flush();

    // For readability, ensure output ends with a newline
    if to_stdout {
        let mut stdout = io::stdout();
        let _ = writeln!(stdout);
        let _ = stdout.flush();
    }
    exit_code
}

fn usage_and_exit(program: &str, code: i32) -> ! {
    eprintln!(
        r#"Usage:
  {0} run [OPTIONS] "<code>"
  {0} run [OPTIONS] --file <PATH>

Options:
  --file,       -f <PATH>         Read Brainfuck code from PATH instead of positional "<code>"
  --size,       -s <N>            Tape size in cells (0 = default 4096)
  --input,      -i <stdin|PATH>   Source for `,` (default stdin)
  --output,     -o <stdout|PATH>  Sink for `.` (default stdout)
  --cell-width, -w <WIDTH>        Cell width: i8, i16, i32, i64 (default i8)
  --max-steps <N>                 Abort after N steps
  --timeout <MS>                  Cancel after MS milliseconds
  --dump,       -d                Print the final tape to stderr
  --help,       -h                Show this help

Notes:
- Input (`,`) reads one byte per instruction; on EOF the current cell is left unchanged.
- Output (`.`) writes the low byte of the current cell.
- Characters outside of ><+-.,[] are treated as comments.
- Ctrl+C cancels the run; the partial tape is still available with --dump.

Examples:
- Run a program from a file, echoing input from another file:
    {0} run --file ./cat.bf --input ./input.txt
- Inspect the tape after a run:
    {0} run --dump "+++[>+<-]"
"#,
        program
    );
    let _ = io::stderr().flush();
    std::process::exit(code);
}

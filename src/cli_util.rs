use std::fmt::Write as _;
use std::fs;
use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;

use bf_runner::{Cell, InterpreterError};
use nu_ansi_term::Color;

/// Cells shown per row in a tape dump.
const DUMP_ROW: usize = 16;

/// Characters of program shown either side of an error position.
const WINDOW_CHARS: usize = 32;

/// Resolve the program text from `--file` or the concatenated positional parts.
///
/// On failure a message has already been printed and the exit code is returned.
pub fn load_code(program: &str, file: Option<PathBuf>, code: Vec<String>) -> Result<String, i32> {
    match (file, code.is_empty()) {
        (None, true) => {
            eprintln!("{program}: no program given (pass CODE or --file PATH)");
            Err(2)
        }
        (Some(_), false) => {
            eprintln!("{program}: cannot use positional code together with --file");
            Err(2)
        }
        (Some(path), true) => fs::read_to_string(&path).map_err(|e| {
            eprintln!("{program}: failed to read code file {}: {e}", path.display());
            let _ = io::stderr().flush();
            1
        }),
        (None, false) => Ok(code.join("")),
    }
}

fn error_label(msg: &str) -> String {
    if io::stderr().is_terminal() {
        Color::Red.bold().paint(msg).to_string()
    } else {
        msg.to_string()
    }
}

/// Pretty-print an [`InterpreterError`] with caret positioning.
pub fn print_run_error(program: &str, code: &str, err: &InterpreterError) {
    let label = match err {
        InterpreterError::UnmatchedBrackets { .. } => "Parse error",
        InterpreterError::PointerOutOfBounds { .. } => "Runtime error",
        InterpreterError::Io { .. } | InterpreterError::Flush { .. } => "I/O error",
        InterpreterError::Handler { .. } => "Opcode error",
        InterpreterError::StepLimitExceeded { .. } => "Execution aborted",
    };
    eprintln!("{program}: {}: {err}", error_label(label));
    if let Some(ip) = err.ip() {
        eprint!("{}", render_context(code, ip));
    }
    let _ = io::stderr().flush();
}

/// A window of `code` around char index `pos` with a caret underneath.
pub fn render_context(code: &str, pos: usize) -> String {
    let chars: Vec<char> = code.chars().collect();
    let start = pos.saturating_sub(WINDOW_CHARS);
    let end = (pos + WINDOW_CHARS + 1).min(chars.len());

    // Newlines and tabs would break the caret alignment.
    let slice: String = chars[start.min(end)..end]
        .iter()
        .map(|&c| if c.is_whitespace() { ' ' } else { c })
        .collect();

    let mut out = String::new();
    let _ = writeln!(out, "  {slice}");
    let _ = writeln!(out, "  {}^", " ".repeat(pos.saturating_sub(start)));
    out
}

/// Render the tape as rows of cells, trailing zeros trimmed, the data pointer in brackets.
pub fn format_dump(tape: &[Cell], pointer: usize) -> String {
    let used = tape
        .iter()
        .rposition(|&c| c != 0)
        .map_or(0, |i| i + 1)
        .max(pointer + 1)
        .min(tape.len());

    let mut out = String::new();
    let _ = writeln!(out, "tape: {} cells, pointer at {pointer}", tape.len());
    for (row, chunk) in tape[..used].chunks(DUMP_ROW).enumerate() {
        let base = row * DUMP_ROW;
        let _ = write!(out, "{base:06}:");
        for (offset, value) in chunk.iter().enumerate() {
            if base + offset == pointer {
                let _ = write!(out, " [{value}]");
            } else {
                let _ = write!(out, " {value}");
            }
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_places_caret_under_position() {
        let rendered = render_context("+++<", 3);
        assert_eq!(rendered, "  +++<\n     ^\n");
    }

    #[test]
    fn context_window_is_clipped() {
        let code = "+".repeat(100);
        let rendered = render_context(&code, 50);
        let first = rendered.lines().next().unwrap();
        assert_eq!(first.len(), 2 + 65);
    }

    #[test]
    fn context_handles_multibyte_chars() {
        let rendered = render_context("é<", 1);
        assert_eq!(rendered, "  é<\n   ^\n");
    }

    #[test]
    fn dump_trims_trailing_zeros_and_marks_pointer() {
        let mut tape = vec![0; 40];
        tape[0] = 3;
        tape[17] = -1;
        let dump = format_dump(&tape, 1);
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines[0], "tape: 40 cells, pointer at 1");
        assert!(lines[1].starts_with("000000: 3 [0] 0"));
        assert_eq!(lines[2], "000016: 0 -1");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn dump_of_empty_tape_shows_pointer_cell() {
        let dump = format_dump(&[0; 8], 0);
        assert_eq!(dump, "tape: 8 cells, pointer at 0\n000000: [0]\n");
    }

    #[test]
    fn load_code_rejects_both_sources() {
        let err = load_code("bf", Some(PathBuf::from("x.bf")), vec!["+".into()]).unwrap_err();
        assert_eq!(err, 2);
    }

    #[test]
    fn load_code_joins_parts() {
        let code = load_code("bf", None, vec!["++".into(), "[-]".into()]).unwrap();
        assert_eq!(code, "++[-]");
    }
}

//! The execution engine.
//!
//! A run validates the whole program up front, then steps through it one
//! symbol at a time until the command pointer passes the end (halted), the
//! cancellation flag is observed between steps (cancelled), or a handler
//! fails. Halted and cancelled runs both hand back the full tape.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, trace, warn};

use crate::cell::{Cell, CellWidth};
use crate::config::InterpreterConfig;
use crate::error::InterpreterError;
use crate::opcode::{Builtin, Handler, OpContext, OpError, Opcode, OpcodeRegistry};
use crate::ports::{EmptyInput, InputPort, NullOutput, OutputPort};
use crate::program::{JumpTable, Program};
use crate::tape::Tape;

/// Cooperative cancellation signal, checked once per step.
///
/// Clones share the same flag, so one handle can be given to a signal handler
/// or timer thread while the interpreter polls another.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Lifecycle of an [`Interpreter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Ready,
    Running,
    Halted,
    Cancelled,
    Failed,
}

/// How a successful run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The command pointer passed the end of the program.
    Halted,
    /// The cancellation flag was observed between steps.
    Cancelled,
}

/// Final state of a run that halted or was cancelled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub termination: Termination,
    /// Every cell of the tape, in order.
    pub tape: Vec<Cell>,
    /// Data pointer when the run stopped.
    pub pointer: usize,
    /// Command pointer when the run stopped.
    pub command_pointer: usize,
    pub steps: u64,
}

impl RunReport {
    pub fn is_cancelled(&self) -> bool {
        self.termination == Termination::Cancelled
    }

    /// The cell under the data pointer.
    pub fn current_cell(&self) -> Cell {
        self.tape[self.pointer]
    }
}

/// Builder for [`Interpreter`]. All opcode registration happens here.
pub struct InterpreterBuilder {
    config: InterpreterConfig,
    registry: OpcodeRegistry,
    input: Box<dyn InputPort + Send>,
    output: Box<dyn OutputPort + Send>,
}

impl Default for InterpreterBuilder {
    fn default() -> Self {
        Self {
            config: InterpreterConfig::default(),
            registry: OpcodeRegistry::default(),
            input: Box::new(EmptyInput),
            output: Box::new(NullOutput),
        }
    }
}

impl InterpreterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: InterpreterConfig) -> Self {
        self.config = config;
        self
    }

    /// Number of cells; `0` selects the default of 4096.
    pub fn tape_size(mut self, size: usize) -> Self {
        self.config.tape_size = size;
        self
    }

    pub fn cell_width(mut self, width: CellWidth) -> Self {
        self.config.cell_width = width;
        self
    }

    pub fn max_steps(mut self, limit: Option<u64>) -> Self {
        self.config.max_steps = limit;
        self
    }

    pub fn input(mut self, input: impl InputPort + Send + 'static) -> Self {
        self.input = Box::new(input);
        self
    }

    pub fn output(mut self, output: impl OutputPort + Send + 'static) -> Self {
        self.output = Box::new(output);
        self
    }

    /// Register a custom opcode under `symbol`, overriding any built-in there.
    pub fn opcode(mut self, symbol: char, opcode: impl Opcode + 'static) -> Self {
        self.registry.register(symbol, opcode);
        self
    }

    /// Closure form of [`opcode`](Self::opcode).
    pub fn opcode_fn<F>(mut self, symbol: char, f: F) -> Self
    where
        F: Fn(&mut OpContext<'_>) -> Result<(), OpError> + Send + Sync + 'static,
    {
        self.registry.register_fn(symbol, f);
        self
    }

    pub fn build(self) -> Interpreter {
        Interpreter {
            config: self.config,
            registry: self.registry,
            input: self.input,
            output: self.output,
            state: State::Ready,
        }
    }
}

/// An extensible Brainfuck interpreter.
///
/// ```
/// use bf_runner::{CancelFlag, Interpreter, MemoryInput, MemoryOutput};
///
/// let out = MemoryOutput::new();
/// let mut bf = Interpreter::builder()
///     .tape_size(16)
///     .input(MemoryInput::from_bytes(b"A"))
///     .output(out.clone())
///     .opcode_fn('^', |ctx| {
///         let v = ctx.read();
///         ctx.write(ctx.width().mul(v, v));
///         Ok(())
///     })
///     .build();
///
/// let report = bf.run(",.>+++^", &CancelFlag::new()).expect("program should run");
/// assert_eq!(out.bytes(), b"A");
/// assert_eq!(report.tape[1], 9);
/// ```
pub struct Interpreter {
    config: InterpreterConfig,
    registry: OpcodeRegistry,
    input: Box<dyn InputPort + Send>,
    output: Box<dyn OutputPort + Send>,
    state: State,
}

impl Default for Interpreter {
    fn default() -> Self {
        InterpreterBuilder::default().build()
    }
}

impl Interpreter {
    pub fn builder() -> InterpreterBuilder {
        InterpreterBuilder::new()
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Validate and execute `code` on a fresh tape.
    ///
    /// The output port is flushed on every exit path. If flushing fails after
    /// the program already failed, the program's error wins.
    pub fn run(&mut self, code: &str, cancel: &CancelFlag) -> Result<RunReport, InterpreterError> {
        self.state = State::Running;

        let result = match Program::parse(code) {
            Ok(program) => self.execute(&program, cancel),
            Err(err) => {
                debug!(ip = err.ip, kind = %err.kind, "program failed validation");
                Err(err.into())
            }
        };

        let flushed = self.output.flush();
        let result = match (result, flushed) {
            (Ok(report), Ok(())) => Ok(report),
            (Ok(_), Err(source)) => Err(InterpreterError::Flush { source }),
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(flush_err)) => {
                warn!(error = %flush_err, "failed to flush output after run error");
                Err(err)
            }
        };

        self.state = match &result {
            Ok(report) => match report.termination {
                Termination::Halted => State::Halted,
                Termination::Cancelled => State::Cancelled,
            },
            Err(_) => State::Failed,
        };
        result
    }

    fn execute(&mut self, program: &Program, cancel: &CancelFlag) -> Result<RunReport, InterpreterError> {
        let mut tape = Tape::new(self.config.tape_size, self.config.cell_width);
        debug!(
            tape_size = tape.len(),
            cell_width = %self.config.cell_width,
            program_len = program.len(),
            "starting run"
        );

        let registry = &self.registry;
        let input: &mut dyn InputPort = &mut *self.input;
        let output: &mut dyn OutputPort = &mut *self.output;

        let mut ip: usize = 0;
        let mut steps: u64 = 0;

        let termination = loop {
            let Some(symbol) = program.symbol(ip) else {
                break Termination::Halted;
            };

            if cancel.is_cancelled() {
                break Termination::Cancelled;
            }

            if let Some(limit) = self.config.max_steps {
                if steps >= limit {
                    return Err(InterpreterError::StepLimitExceeded { ip, limit });
                }
            }

            trace!(ip, op = %symbol, ptr = tape.pointer(), cell = tape.read(), "step");

            let next = match registry.lookup(symbol) {
                // Anything unregistered is a comment.
                None => ip + 1,
                Some(Handler::Builtin(builtin)) => {
                    let mut ctx = OpContext::new(&mut tape, &mut *input, &mut *output);
                    apply_builtin(*builtin, &mut ctx, program.jumps(), ip)
                        .map_err(|e| InterpreterError::from_op(e, ip, symbol))?
                }
                Some(Handler::Custom(opcode)) => {
                    let mut ctx = OpContext::new(&mut tape, &mut *input, &mut *output);
                    opcode
                        .execute(&mut ctx)
                        .map_err(|e| InterpreterError::from_op(e, ip, symbol))?;
                    ip + 1
                }
            };

            steps += 1;
            ip = next;
        };

        debug!(?termination, steps, ip, "run finished");

        Ok(RunReport {
            termination,
            pointer: tape.pointer(),
            tape: tape.into_cells(),
            command_pointer: ip,
            steps,
        })
    }
}

/// Apply one built-in and return the next command pointer.
///
/// `,` on exhausted input leaves the current cell unchanged.
fn apply_builtin(
    builtin: Builtin,
    ctx: &mut OpContext<'_>,
    jumps: &JumpTable,
    ip: usize,
) -> Result<usize, OpError> {
    match builtin {
        Builtin::Right => ctx.move_pointer(1)?,
        Builtin::Left => ctx.move_pointer(-1)?,
        Builtin::Increment => {
            let after = ctx.width().add(ctx.read(), 1);
            ctx.write(after);
        }
        Builtin::Decrement => {
            let after = ctx.width().sub(ctx.read(), 1);
            ctx.write(after);
        }
        Builtin::Output => {
            let value = ctx.read();
            ctx.emit(value)?;
        }
        Builtin::Input => {
            if let Some(value) = ctx.read_input()? {
                ctx.write(value);
            }
        }
        Builtin::LoopStart => {
            if ctx.read() == 0 {
                let close = jumps
                    .target(ip)
                    .ok_or_else(|| OpError::failed("no matching ']' for '['"))?;
                return Ok(close + 1);
            }
        }
        Builtin::LoopEnd => {
            if ctx.read() != 0 {
                let open = jumps
                    .target(ip)
                    .ok_or_else(|| OpError::failed("no matching '[' for ']'"))?;
                return Ok(open + 1);
            }
        }
    }
    Ok(ip + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{MemoryInput, MemoryOutput};

    fn run(code: &str, tape_size: usize) -> Result<RunReport, InterpreterError> {
        Interpreter::builder()
            .tape_size(tape_size)
            .build()
            .run(code, &CancelFlag::new())
    }

    #[test]
    fn empty_program_halts_immediately() {
        let report = run("", 4).unwrap();
        assert_eq!(report.termination, Termination::Halted);
        assert_eq!(report.steps, 0);
        assert_eq!(report.tape, vec![0; 4]);
    }

    #[test]
    fn state_moves_from_ready_to_terminal() {
        let mut bf = Interpreter::default();
        assert_eq!(bf.state(), State::Ready);
        bf.run("+", &CancelFlag::new()).unwrap();
        assert_eq!(bf.state(), State::Halted);
        assert!(bf.run("<", &CancelFlag::new()).is_err());
        assert_eq!(bf.state(), State::Failed);
    }

    #[test]
    fn each_run_starts_with_fresh_tape() {
        let mut bf = Interpreter::builder().tape_size(2).build();
        let first = bf.run("+>+", &CancelFlag::new()).unwrap();
        let second = bf.run("+", &CancelFlag::new()).unwrap();
        assert_eq!(first.tape, vec![1, 1]);
        assert_eq!(second.tape, vec![1, 0]);
        assert_eq!(second.pointer, 0);
    }

    #[test]
    fn empty_loop_on_zero_cell_is_ok() {
        assert!(run("[]", 10).is_ok());
    }

    #[test]
    fn simple_program_without_io_runs_ok() {
        let report = run("+++[-]", 10).unwrap();
        assert_eq!(report.tape[0], 0);
    }

    #[test]
    fn skipped_loop_body_does_not_execute() {
        let report = run("[<]+", 2).unwrap();
        assert_eq!(report.tape, vec![1, 0]);
    }

    #[test]
    fn wrapping_subtraction() {
        let report = run("-", 1).unwrap();
        assert_eq!(report.tape[0], -1);
    }

    #[test]
    fn wrapping_addition() {
        let report = run(&"+".repeat(256), 1).unwrap();
        assert_eq!(report.tape[0], 0);
    }

    #[test]
    fn left_pointer_out_of_bounds_errors() {
        let result = run("<", 10);
        assert!(matches!(
            result,
            Err(InterpreterError::PointerOutOfBounds { ip: 0, ptr: 0, op: '<' })
        ));
    }

    #[test]
    fn right_pointer_out_of_bounds_errors() {
        let result = run(">>>", 3);
        assert!(matches!(
            result,
            Err(InterpreterError::PointerOutOfBounds { ip: 2, ptr: 2, op: '>' })
        ));
    }

    #[test]
    fn unmatched_open_bracket_never_steps() {
        let out = MemoryOutput::new();
        let mut bf = Interpreter::builder().output(out.clone()).build();
        let result = bf.run("+.[", &CancelFlag::new());
        assert!(matches!(result, Err(InterpreterError::UnmatchedBrackets { ip: 2, .. })));
        assert!(out.contents().is_empty());
    }

    #[test]
    fn comments_are_skipped_but_counted() {
        let report = run("a+b", 2).unwrap();
        assert_eq!(report.tape, vec![1, 0]);
        assert_eq!(report.steps, 3);
    }

    #[test]
    fn exhausted_input_leaves_cell_unchanged() {
        let mut bf = Interpreter::builder()
            .tape_size(1)
            .input(MemoryInput::new([]))
            .build();
        let report = bf.run("+++++,", &CancelFlag::new()).unwrap();
        assert_eq!(report.tape[0], 5);
    }

    #[test]
    fn input_is_wrapped_to_cell_width() {
        let mut bf = Interpreter::builder()
            .tape_size(1)
            .input(MemoryInput::from_bytes(&[200]))
            .build();
        let report = bf.run(",", &CancelFlag::new()).unwrap();
        assert_eq!(report.tape[0], -56);
    }

    #[test]
    fn step_limit_aborts_infinite_loop() {
        let mut bf = Interpreter::builder().max_steps(Some(50)).build();
        let result = bf.run("+[]", &CancelFlag::new());
        assert!(matches!(
            result,
            Err(InterpreterError::StepLimitExceeded { limit: 50, .. })
        ));
    }

    #[test]
    fn step_limit_allows_exactly_limit_steps() {
        let mut bf = Interpreter::builder().max_steps(Some(3)).build();
        let report = bf.run("+++", &CancelFlag::new()).unwrap();
        assert_eq!(report.steps, 3);
    }

    #[test]
    fn pre_cancelled_flag_returns_untouched_tape() {
        let cancel = CancelFlag::new();
        cancel.cancel();
        let mut bf = Interpreter::builder().tape_size(2).build();
        let report = bf.run("+++", &cancel).unwrap();
        assert!(report.is_cancelled());
        assert_eq!(report.command_pointer, 0);
        assert_eq!(report.tape, vec![0, 0]);
        assert_eq!(bf.state(), State::Cancelled);
    }

    #[test]
    fn custom_opcode_can_cancel_between_steps() {
        let cancel = CancelFlag::new();
        let trigger = cancel.clone();
        let mut bf = Interpreter::builder()
            .tape_size(1)
            .opcode_fn('!', move |_| {
                trigger.cancel();
                Ok(())
            })
            .build();
        let report = bf.run("+!+", &cancel).unwrap();
        assert!(report.is_cancelled());
        assert_eq!(report.tape, vec![1]);
        assert_eq!(report.command_pointer, 2);
    }

    #[test]
    fn custom_failure_carries_position() {
        let mut bf = Interpreter::builder()
            .opcode_fn('x', |_| Err(OpError::failed("boom")))
            .build();
        let err = bf.run("++x", &CancelFlag::new()).unwrap_err();
        assert!(matches!(
            err,
            InterpreterError::Handler { ip: 2, op: 'x', ref message } if message == "boom"
        ));
    }

    #[test]
    fn overriding_a_builtin_replaces_it() {
        let mut bf = Interpreter::builder()
            .tape_size(1)
            .opcode_fn('+', |ctx| {
                let v = ctx.read();
                ctx.write(v + 10);
                Ok(())
            })
            .build();
        let report = bf.run("++-", &CancelFlag::new()).unwrap();
        assert_eq!(report.tape[0], 19);
    }
}

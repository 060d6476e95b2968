//! An extensible Brainfuck interpreter library.
//!
//! The interpreter operates on a fixed-size tape of wrapping signed cells
//! (4096 cells of `i8` by default) with a single data pointer.
//!
//! Features and behaviors:
//! - Memory tape initialized to 0; width selectable per interpreter (`i8`..`i64`).
//! - Strict pointer bounds: moving left from cell 0 or right past the end
//!   returns an error.
//! - Brackets are validated before the first step; unmatched brackets never run.
//! - Input `,` pulls one value from an [`InputPort`]; on exhausted input the
//!   current cell is left unchanged.
//! - Output `.` pushes the current cell to an [`OutputPort`].
//! - Characters outside the registered opcodes are comments.
//! - Extra single-character opcodes can be registered on the builder, and may
//!   override built-ins.
//! - Runs poll a [`CancelFlag`] between steps; a cancelled run returns its
//!   partial tape instead of an error.
//!
//! Quick start:
//!
//! ```no_run
//! use bf_runner::{ByteInput, ByteOutput, CancelFlag, Interpreter};
//!
//! // Classic "Hello World!" in Brainfuck
//! let code = "++++++++++[>+++++++>++++++++++>+++>+<<<<-]>++.>+.+++++++..+++.>++.<<+++++++++++++++.>.+++.------.--------.>+.>.";
//! let mut bf = Interpreter::builder()
//!     .input(ByteInput::stdin())
//!     .output(ByteOutput::stdout())
//!     .build();
//! bf.run(code, &CancelFlag::new()).expect("program should run");
//! println!(); // ensure a trailing newline for readability
//! ```

pub mod cell;
pub mod config;
pub mod error;
pub mod interpreter;
pub mod opcode;
pub mod ports;
pub mod program;
pub mod tape;

pub use cell::{Cell, CellWidth, ParseCellWidthError};
pub use config::{Config, ConfigError, InterpreterConfig};
pub use error::{ErrorCategory, InterpreterError};
pub use interpreter::{CancelFlag, Interpreter, InterpreterBuilder, RunReport, State, Termination};
pub use opcode::{Builtin, Handler, OpContext, OpError, Opcode, OpcodeRegistry};
pub use ports::{
    ByteInput, ByteOutput, EmptyInput, InputPort, InputSource, MemoryInput, MemoryOutput,
    NullOutput, OutputPort, OutputTarget,
};
pub use program::{JumpTable, Program, UnmatchedBracketKind, ValidationError};
pub use tape::{BoundsError, DEFAULT_TAPE_SIZE, Tape};

//! Opcodes: the eight built-ins plus caller-registered extensions.
//!
//! Built-ins are a closed set of tags dispatched directly by the interpreter.
//! Extensions implement [`Opcode`] (closures do automatically) and are stored
//! behind an `Arc` in the [`OpcodeRegistry`]. Registering under a built-in's
//! symbol replaces that built-in for every run of the interpreter.

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::sync::Arc;

use crate::cell::{Cell, CellWidth};
use crate::ports::{InputPort, OutputPort};
use crate::tape::{BoundsError, Tape};

/// The built-in instruction set `><+-.,[]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    Right,
    Left,
    Increment,
    Decrement,
    Output,
    Input,
    LoopStart,
    LoopEnd,
}

impl Builtin {
    pub const ALL: [Builtin; 8] = [
        Builtin::Right,
        Builtin::Left,
        Builtin::Increment,
        Builtin::Decrement,
        Builtin::Output,
        Builtin::Input,
        Builtin::LoopStart,
        Builtin::LoopEnd,
    ];

    pub fn symbol(self) -> char {
        match self {
            Builtin::Right => '>',
            Builtin::Left => '<',
            Builtin::Increment => '+',
            Builtin::Decrement => '-',
            Builtin::Output => '.',
            Builtin::Input => ',',
            Builtin::LoopStart => '[',
            Builtin::LoopEnd => ']',
        }
    }

    pub fn from_symbol(symbol: char) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.symbol() == symbol)
    }
}

/// Failure reported by an opcode handler. The interpreter annotates it with
/// the command pointer and symbol before surfacing it.
#[derive(Debug, thiserror::Error)]
pub enum OpError {
    #[error(transparent)]
    PointerOutOfBounds(#[from] BoundsError),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("{0}")]
    Failed(String),
}

impl OpError {
    pub fn failed(message: impl Into<String>) -> Self {
        OpError::Failed(message.into())
    }
}

/// Mutable view of interpreter state handed to opcode handlers.
pub struct OpContext<'a> {
    tape: &'a mut Tape,
    input: &'a mut dyn InputPort,
    output: &'a mut dyn OutputPort,
}

impl<'a> OpContext<'a> {
    pub(crate) fn new(
        tape: &'a mut Tape,
        input: &'a mut dyn InputPort,
        output: &'a mut dyn OutputPort,
    ) -> Self {
        Self { tape, input, output }
    }

    /// The current cell.
    pub fn read(&self) -> Cell {
        self.tape.read()
    }

    /// Overwrite the current cell, wrapping to the cell width.
    pub fn write(&mut self, value: Cell) {
        self.tape.write(value);
    }

    pub fn pointer(&self) -> usize {
        self.tape.pointer()
    }

    pub fn tape_len(&self) -> usize {
        self.tape.len()
    }

    pub fn width(&self) -> CellWidth {
        self.tape.width()
    }

    pub fn move_pointer(&mut self, delta: isize) -> Result<(), OpError> {
        Ok(self.tape.move_by(delta)?)
    }

    /// Pull the next input value; `None` once input is exhausted.
    pub fn read_input(&mut self) -> Result<Option<Cell>, OpError> {
        Ok(self.input.next()?)
    }

    pub fn emit(&mut self, value: Cell) -> Result<(), OpError> {
        Ok(self.output.emit(value)?)
    }
}

/// A custom single-character operation.
pub trait Opcode: Send + Sync {
    fn execute(&self, ctx: &mut OpContext<'_>) -> Result<(), OpError>;
}

impl<F> Opcode for F
where
    F: Fn(&mut OpContext<'_>) -> Result<(), OpError> + Send + Sync,
{
    fn execute(&self, ctx: &mut OpContext<'_>) -> Result<(), OpError> {
        (self)(ctx)
    }
}

/// What a symbol is bound to.
#[derive(Clone)]
pub enum Handler {
    Builtin(Builtin),
    Custom(Arc<dyn Opcode>),
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handler::Builtin(b) => f.debug_tuple("Builtin").field(b).finish(),
            Handler::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Symbol → handler map. Starts with the eight built-ins.
#[derive(Debug, Clone)]
pub struct OpcodeRegistry {
    handlers: HashMap<char, Handler>,
}

impl Default for OpcodeRegistry {
    fn default() -> Self {
        let handlers = Builtin::ALL
            .into_iter()
            .map(|b| (b.symbol(), Handler::Builtin(b)))
            .collect();
        Self { handlers }
    }
}

impl OpcodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `symbol` to `opcode`, replacing any existing binding.
    pub fn register<O>(&mut self, symbol: char, opcode: O)
    where
        O: Opcode + 'static,
    {
        self.handlers.insert(symbol, Handler::Custom(Arc::new(opcode)));
    }

    /// [`register`](Self::register) for closures, so their argument types are inferred.
    pub fn register_fn<F>(&mut self, symbol: char, f: F)
    where
        F: Fn(&mut OpContext<'_>) -> Result<(), OpError> + Send + Sync + 'static,
    {
        self.register(symbol, f);
    }

    pub fn lookup(&self, symbol: char) -> Option<&Handler> {
        self.handlers.get(&symbol)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

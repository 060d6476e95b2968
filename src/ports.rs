//! Input and output ports.
//!
//! The interpreter never talks to stdin, stdout or files directly. `,` pulls a
//! value from an [`InputPort`] and `.` pushes one to an [`OutputPort`]; the
//! concrete backing (live stream, file, in-memory buffer) is chosen by the
//! caller before a run.
//!
//! Byte-backed ports map each input byte to a cell in `0..=255` and write the
//! low byte of each emitted cell.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};

use crate::cell::Cell;

/// A source of cell values for `,`.
pub trait InputPort {
    /// The next value, or `Ok(None)` once the input is exhausted.
    ///
    /// May block on a live stream until data arrives or the stream closes.
    fn next(&mut self) -> io::Result<Option<Cell>>;
}

/// A sink for cell values produced by `.`.
pub trait OutputPort {
    fn emit(&mut self, value: Cell) -> io::Result<()>;

    /// Push any buffered values to the backing store. Called once at the end of every run.
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<T: InputPort + ?Sized> InputPort for Box<T> {
    fn next(&mut self) -> io::Result<Option<Cell>> {
        (**self).next()
    }
}

impl<T: OutputPort + ?Sized> OutputPort for Box<T> {
    fn emit(&mut self, value: Cell) -> io::Result<()> {
        (**self).emit(value)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }
}

/// Reads one byte per `,` from any [`Read`] implementation.
pub struct ByteInput<R> {
    reader: R,
}

impl<R: Read> ByteInput<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl ByteInput<io::Stdin> {
    pub fn stdin() -> Self {
        Self::new(io::stdin())
    }
}

impl ByteInput<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self::new(BufReader::new(File::open(path)?)))
    }
}

impl<R: Read> InputPort for ByteInput<R> {
    fn next(&mut self) -> io::Result<Option<Cell>> {
        let mut buf = [0u8; 1];
        loop {
            match self.reader.read(&mut buf) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(Cell::from(buf[0]))),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

/// Writes the low byte of each emitted cell to any [`Write`] implementation.
pub struct ByteOutput<W> {
    writer: W,
}

impl<W: Write> ByteOutput<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl ByteOutput<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl ByteOutput<BufWriter<File>> {
    /// Create (or truncate) the file at `path`.
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self::new(BufWriter::new(File::create(path)?)))
    }
}

impl<W: Write> OutputPort for ByteOutput<W> {
    fn emit(&mut self, value: Cell) -> io::Result<()> {
        self.writer.write_all(&[value as u8])
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// An in-memory queue of input values.
#[derive(Debug, Clone, Default)]
pub struct MemoryInput {
    values: VecDeque<Cell>,
}

impl MemoryInput {
    pub fn new(values: impl IntoIterator<Item = Cell>) -> Self {
        Self {
            values: values.into_iter().collect(),
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self::new(bytes.iter().map(|&b| Cell::from(b)))
    }

    pub fn remaining(&self) -> usize {
        self.values.len()
    }
}

impl InputPort for MemoryInput {
    fn next(&mut self) -> io::Result<Option<Cell>> {
        Ok(self.values.pop_front())
    }
}

/// An in-memory output buffer.
///
/// Clones share the same buffer, so a caller can keep one handle and hand the
/// other to the interpreter.
#[derive(Debug, Clone, Default)]
pub struct MemoryOutput {
    buffer: Arc<Mutex<Vec<Cell>>>,
}

impl MemoryOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of everything emitted so far.
    pub fn contents(&self) -> Vec<Cell> {
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Everything emitted so far, as low bytes.
    pub fn bytes(&self) -> Vec<u8> {
        self.contents().into_iter().map(|c| c as u8).collect()
    }
}

impl OutputPort for MemoryOutput {
    fn emit(&mut self, value: Cell) -> io::Result<()> {
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(value);
        Ok(())
    }
}

/// Always exhausted. The default input port.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyInput;

impl InputPort for EmptyInput {
    fn next(&mut self) -> io::Result<Option<Cell>> {
        Ok(None)
    }
}

/// Discards everything. The default output port.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullOutput;

impl OutputPort for NullOutput {
    fn emit(&mut self, _value: Cell) -> io::Result<()> {
        Ok(())
    }
}

/// Keyword selecting the process's standard streams.
pub const STDIN_KEYWORD: &str = "stdin";
pub const STDOUT_KEYWORD: &str = "stdout";

/// Where `,` reads from: `stdin` (also the empty string) or a file path.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum InputSource {
    #[default]
    Stdin,
    File(PathBuf),
}

impl InputSource {
    pub fn open(&self) -> io::Result<Box<dyn InputPort + Send>> {
        let port: Box<dyn InputPort + Send> = match self {
            InputSource::Stdin => Box::new(ByteInput::stdin()),
            InputSource::File(path) => Box::new(ByteInput::open(path)?),
        };
        Ok(port)
    }
}

impl FromStr for InputSource {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || s.eq_ignore_ascii_case(STDIN_KEYWORD) {
            Ok(InputSource::Stdin)
        } else {
            Ok(InputSource::File(PathBuf::from(s)))
        }
    }
}

/// Where `.` writes to: `stdout` (also the empty string) or a file path.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OutputTarget {
    #[default]
    Stdout,
    File(PathBuf),
}

impl OutputTarget {
    pub fn open(&self) -> io::Result<Box<dyn OutputPort + Send>> {
        let port: Box<dyn OutputPort + Send> = match self {
            OutputTarget::Stdout => Box::new(ByteOutput::stdout()),
            OutputTarget::File(path) => Box::new(ByteOutput::create(path)?),
        };
        Ok(port)
    }
}

impl FromStr for OutputTarget {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || s.eq_ignore_ascii_case(STDOUT_KEYWORD) {
            Ok(OutputTarget::Stdout)
        } else {
            Ok(OutputTarget::File(PathBuf::from(s)))
        }
    }
}

use crate::cell::{Cell, CellWidth};

/// Tape length used when a size of zero is requested.
pub const DEFAULT_TAPE_SIZE: usize = 4096;

/// The data pointer attempted to leave the tape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("pointer out of bounds (ptr={ptr}, delta={delta}, len={len})")]
pub struct BoundsError {
    pub ptr: usize,
    pub delta: isize,
    pub len: usize,
}

/// A fixed-length tape of zero-initialized cells with a single data pointer.
///
/// The length is fixed at construction; the pointer always stays in `[0, len)`.
#[derive(Debug, Clone)]
pub struct Tape {
    cells: Vec<Cell>,
    pointer: usize,
    width: CellWidth,
}

impl Tape {
    /// Create a zeroed tape of `size` cells (`0` selects [`DEFAULT_TAPE_SIZE`]).
    pub fn new(size: usize, width: CellWidth) -> Self {
        let size = if size == 0 { DEFAULT_TAPE_SIZE } else { size };
        Self {
            cells: vec![0; size],
            pointer: 0,
            width,
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn pointer(&self) -> usize {
        self.pointer
    }

    pub fn width(&self) -> CellWidth {
        self.width
    }

    /// The cell under the data pointer.
    pub fn read(&self) -> Cell {
        self.cells[self.pointer]
    }

    /// Store `value` under the data pointer, wrapped to the tape's width.
    pub fn write(&mut self, value: Cell) {
        self.cells[self.pointer] = self.width.wrap(value);
    }

    /// Shift the data pointer by `delta`. The pointer is left untouched on failure.
    pub fn move_by(&mut self, delta: isize) -> Result<(), BoundsError> {
        let err = BoundsError {
            ptr: self.pointer,
            delta,
            len: self.cells.len(),
        };
        let target = self.pointer.checked_add_signed(delta).ok_or(err)?;
        if target >= self.cells.len() {
            return Err(err);
        }
        self.pointer = target;
        Ok(())
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn into_cells(self) -> Vec<Cell> {
        self.cells
    }
}

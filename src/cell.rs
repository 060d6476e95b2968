//! Cell values and their configurable width.
//!
//! Every cell is stored as an `i64`, but an interpreter instance picks one
//! [`CellWidth`] up front and all writes are truncated to it with two's
//! complement wraparound. Overflow and underflow are therefore always defined.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A single tape slot. Its effective range is governed by [`CellWidth`].
pub type Cell = i64;

/// The signed integer width cells wrap to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellWidth {
    #[default]
    I8,
    I16,
    I32,
    I64,
}

/// Returned when a width name is not one of `i8`, `i16`, `i32`, `i64`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown cell width '{0}' (expected i8, i16, i32 or i64)")]
pub struct ParseCellWidthError(String);

impl CellWidth {
    /// Truncate `value` to this width, sign-extending back to a [`Cell`].
    pub fn wrap(self, value: i64) -> Cell {
        match self {
            CellWidth::I8 => value as i8 as Cell,
            CellWidth::I16 => value as i16 as Cell,
            CellWidth::I32 => value as i32 as Cell,
            CellWidth::I64 => value,
        }
    }

    /// Wrapping addition within this width.
    pub fn add(self, a: Cell, b: Cell) -> Cell {
        self.wrap(a.wrapping_add(b))
    }

    /// Wrapping subtraction within this width.
    pub fn sub(self, a: Cell, b: Cell) -> Cell {
        self.wrap(a.wrapping_sub(b))
    }

    /// Wrapping multiplication within this width.
    pub fn mul(self, a: Cell, b: Cell) -> Cell {
        self.wrap(a.wrapping_mul(b))
    }

    pub fn min_value(self) -> Cell {
        match self {
            CellWidth::I8 => i8::MIN as Cell,
            CellWidth::I16 => i16::MIN as Cell,
            CellWidth::I32 => i32::MIN as Cell,
            CellWidth::I64 => i64::MIN,
        }
    }

    pub fn max_value(self) -> Cell {
        match self {
            CellWidth::I8 => i8::MAX as Cell,
            CellWidth::I16 => i16::MAX as Cell,
            CellWidth::I32 => i32::MAX as Cell,
            CellWidth::I64 => i64::MAX,
        }
    }

    pub fn bits(self) -> u32 {
        match self {
            CellWidth::I8 => 8,
            CellWidth::I16 => 16,
            CellWidth::I32 => 32,
            CellWidth::I64 => 64,
        }
    }
}

impl fmt::Display for CellWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "i{}", self.bits())
    }
}

impl FromStr for CellWidth {
    type Err = ParseCellWidthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "i8" => Ok(CellWidth::I8),
            "i16" => Ok(CellWidth::I16),
            "i32" => Ok(CellWidth::I32),
            "i64" => Ok(CellWidth::I64),
            _ => Err(ParseCellWidthError(s.to_string())),
        }
    }
}

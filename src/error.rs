use crate::opcode::OpError;
use crate::program::{UnmatchedBracketKind, ValidationError};

/// Errors that can occur while interpreting a program.
///
/// Every runtime variant carries `ip`, the command pointer (a char index into
/// the program) at which the run failed.
#[derive(Debug, thiserror::Error)]
pub enum InterpreterError {
    /// Loops were not balanced; detected before the first step.
    #[error("Unmatched bracket {kind} at instruction {ip}")]
    UnmatchedBrackets { ip: usize, kind: UnmatchedBracketKind },

    /// The data pointer attempted to move left of cell 0 or beyond the last cell.
    #[error("Pointer out of bounds at instruction {ip} (ptr={ptr}, op='{op}')")]
    PointerOutOfBounds { ip: usize, ptr: usize, op: char },

    /// An input or output port failed.
    #[error("I/O error at instruction {ip} (op='{op}'): {source}")]
    Io {
        ip: usize,
        op: char,
        #[source]
        source: std::io::Error,
    },

    /// A custom opcode reported failure.
    #[error("Opcode '{op}' failed at instruction {ip}: {message}")]
    Handler { ip: usize, op: char, message: String },

    /// Execution aborted due to the configured step limit.
    #[error("Execution aborted: step limit exceeded ({limit}) at instruction {ip}")]
    StepLimitExceeded { ip: usize, limit: u64 },

    /// The output port could not be flushed after the program finished.
    #[error("I/O error flushing output: {source}")]
    Flush {
        #[source]
        source: std::io::Error,
    },
}

/// Coarse grouping of [`InterpreterError`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Bounds,
    Io,
    Handler,
    Limit,
}

impl InterpreterError {
    /// Command pointer at which the error occurred, when there is one.
    pub fn ip(&self) -> Option<usize> {
        match self {
            InterpreterError::UnmatchedBrackets { ip, .. }
            | InterpreterError::PointerOutOfBounds { ip, .. }
            | InterpreterError::Io { ip, .. }
            | InterpreterError::Handler { ip, .. }
            | InterpreterError::StepLimitExceeded { ip, .. } => Some(*ip),
            InterpreterError::Flush { .. } => None,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            InterpreterError::UnmatchedBrackets { .. } => ErrorCategory::Validation,
            InterpreterError::PointerOutOfBounds { .. } => ErrorCategory::Bounds,
            InterpreterError::Io { .. } | InterpreterError::Flush { .. } => ErrorCategory::Io,
            InterpreterError::Handler { .. } => ErrorCategory::Handler,
            InterpreterError::StepLimitExceeded { .. } => ErrorCategory::Limit,
        }
    }

    /// Attach position information to a handler failure.
    pub(crate) fn from_op(err: OpError, ip: usize, op: char) -> Self {
        match err {
            OpError::PointerOutOfBounds(bounds) => InterpreterError::PointerOutOfBounds {
                ip,
                ptr: bounds.ptr,
                op,
            },
            OpError::Io(source) => InterpreterError::Io { ip, op, source },
            OpError::Failed(message) => InterpreterError::Handler { ip, op, message },
        }
    }
}

impl From<ValidationError> for InterpreterError {
    fn from(err: ValidationError) -> Self {
        InterpreterError::UnmatchedBrackets {
            ip: err.ip,
            kind: err.kind,
        }
    }
}

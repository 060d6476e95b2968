//! Command validation and loop-jump resolution.

use std::fmt;

/// Which side of the loop was unmatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnmatchedBracketKind {
    Open,
    Close,
}

impl fmt::Display for UnmatchedBracketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnmatchedBracketKind::Open => write!(f, "'['"),
            UnmatchedBracketKind::Close => write!(f, "']'"),
        }
    }
}

/// Loops were not balanced. `ip` is the char index of the offending bracket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Unmatched bracket {kind} at instruction {ip}")]
pub struct ValidationError {
    pub ip: usize,
    pub kind: UnmatchedBracketKind,
}

/// Matching bracket positions, indexed by command pointer.
#[derive(Debug, Clone, Default)]
pub struct JumpTable {
    targets: Vec<Option<usize>>,
}

impl JumpTable {
    /// The position of the bracket matching the one at `ip`, if `ip` is a bracket.
    pub fn target(&self, ip: usize) -> Option<usize> {
        self.targets.get(ip).copied().flatten()
    }
}

/// Scan `commands` once and pair up every `[` with its `]`.
///
/// A stray `]` is reported at its own position; an unclosed `[` is reported at
/// the innermost one still open when the scan ends.
pub fn validate(commands: &[char]) -> Result<JumpTable, ValidationError> {
    let mut targets = vec![None; commands.len()];
    let mut open = Vec::new();

    for (ip, symbol) in commands.iter().enumerate() {
        match symbol {
            '[' => open.push(ip),
            ']' => {
                let start = open.pop().ok_or(ValidationError {
                    ip,
                    kind: UnmatchedBracketKind::Close,
                })?;
                targets[start] = Some(ip);
                targets[ip] = Some(start);
            }
            _ => {}
        }
    }

    match open.pop() {
        Some(ip) => Err(ValidationError {
            ip,
            kind: UnmatchedBracketKind::Open,
        }),
        None => Ok(JumpTable { targets }),
    }
}

/// A validated command string, immutable for the duration of a run.
#[derive(Debug, Clone)]
pub struct Program {
    commands: Vec<char>,
    jumps: JumpTable,
}

impl Program {
    pub fn parse(code: &str) -> Result<Self, ValidationError> {
        let commands: Vec<char> = code.chars().collect();
        let jumps = validate(&commands)?;
        Ok(Self { commands, jumps })
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn symbol(&self, ip: usize) -> Option<char> {
        self.commands.get(ip).copied()
    }

    pub fn jumps(&self) -> &JumpTable {
        &self.jumps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(code: &str) -> Result<JumpTable, ValidationError> {
        validate(&code.chars().collect::<Vec<_>>())
    }

    #[test]
    fn balanced_programs_validate() {
        for code in ["", "[]", "[[]]", "+[->+<]", "hello world"] {
            assert!(check(code).is_ok(), "{code:?} should validate");
        }
    }

    #[test]
    fn lone_open_is_rejected() {
        assert_eq!(
            check("[").unwrap_err(),
            ValidationError { ip: 0, kind: UnmatchedBracketKind::Open }
        );
    }

    #[test]
    fn lone_close_is_rejected() {
        assert_eq!(
            check("]").unwrap_err(),
            ValidationError { ip: 0, kind: UnmatchedBracketKind::Close }
        );
    }

    #[test]
    fn unclosed_nested_open_reports_innermost() {
        let err = check("[[]").unwrap_err();
        assert_eq!(err.kind, UnmatchedBracketKind::Open);
        assert_eq!(err.ip, 0);

        let err = check("+[[+]").unwrap_err();
        assert_eq!(err.ip, 1);
    }

    #[test]
    fn close_before_open_is_rejected() {
        let err = check("+][").unwrap_err();
        assert_eq!(err, ValidationError { ip: 1, kind: UnmatchedBracketKind::Close });
    }

    #[test]
    fn jump_table_pairs_nested_brackets() {
        let table = check("[[]]").unwrap();
        assert_eq!(table.target(0), Some(3));
        assert_eq!(table.target(3), Some(0));
        assert_eq!(table.target(1), Some(2));
        assert_eq!(table.target(2), Some(1));
        assert_eq!(table.target(4), None);
    }

    #[test]
    fn program_indexes_by_char_not_byte() {
        let program = Program::parse("é[]").unwrap();
        assert_eq!(program.len(), 3);
        assert_eq!(program.symbol(1), Some('['));
        assert_eq!(program.jumps().target(1), Some(2));
    }
}

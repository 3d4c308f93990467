//! The line-level command model (spec §3): `A`/`D`/`A+`/`D+`/`X`/`X+`/
//! `E`/`E+`, the `$$EQUAL$$` separate-mode marker, and intra-line
//! commands delegated to [`crate::charpatch::CharCommand`].

use crate::charpatch::CharCommand;
use core::fmt;

/// Marker line preceding the dual-coordinate equal runs emitted by
/// `IncludeEqualMode::Separate` (§6).
pub const EQUAL_SEPARATE_MARKER: &str = "$$EQUAL$$";

/// One line-level command, already resolved to a concrete wire shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `<line> A <content>` — addition, coordinate in the output sequence.
    Add { line: usize, content: String },
    /// `<line> D <content>` — anchor-checked deletion, coordinate in the
    /// input sequence.
    Delete { line: usize, content: String },
    /// `<line> X` — unanchored (unsafe) deletion; not invertible.
    DeleteUnsafe { line: usize },
    /// `<line> A+ <count>` followed by `count` content lines.
    AddBlock { line: usize, content: Vec<String> },
    /// `<line> D+ <count>` followed by `count` content lines.
    DeleteBlock { line: usize, content: Vec<String> },
    /// `<line> X+ <count>`, no content lines (unsafe deletions carry no
    /// anchor).
    DeleteUnsafeBlock { line: usize, count: usize },
    /// `<line> E <content>` — single-line context-equal, informational.
    Equal { line: usize, content: String },
    /// `<line> E+ <count>` followed by `count` content lines (count may
    /// be zero, emitting no content lines).
    EqualBlock { line: usize, content: Vec<String> },
    /// `<old>-<new> E <content>`, appearing after [`EQUAL_SEPARATE_MARKER`].
    EqualSeparate { old_line: usize, new_line: usize, content: String },
    /// The bare `$$EQUAL$$` marker line preceding a run of
    /// [`Command::EqualSeparate`] entries.
    EqualSeparateMarker,
    /// Intra-line command (`a`/`d`/`e`/`x`/`a*`/`d*`/`x*`).
    Char(CharCommand),
    /// A line that didn't match any known command grammar. Per spec §7
    /// ("Format error ... pass-through verbatim, forward-compatibility
    /// for future opcodes"), parsing never rejects a patch outright for
    /// this — the offending line is carried through unchanged.
    Raw(String),
}

impl Command {
    /// Serializes this command to its wire lines (header line, plus any
    /// block content lines).
    pub fn to_lines(&self) -> Vec<String> {
        match self {
            Command::Add { line, content } => vec![format!("{line} A {content}")],
            Command::Delete { line, content } => vec![format!("{line} D {content}")],
            Command::DeleteUnsafe { line } => vec![format!("{line} X")],
            Command::AddBlock { line, content } => {
                let mut lines = vec![format!("{line} A+ {}", content.len())];
                lines.extend(content.iter().cloned());
                lines
            }
            Command::DeleteBlock { line, content } => {
                let mut lines = vec![format!("{line} D+ {}", content.len())];
                lines.extend(content.iter().cloned());
                lines
            }
            Command::DeleteUnsafeBlock { line, count } => vec![format!("{line} X+ {count}")],
            Command::Equal { line, content } => vec![format!("{line} E {content}")],
            Command::EqualBlock { line, content } => {
                let mut lines = vec![format!("{line} E+ {}", content.len())];
                lines.extend(content.iter().cloned());
                lines
            }
            Command::EqualSeparate { old_line, new_line, content } => {
                vec![format!("{old_line}-{new_line} E {content}")]
            }
            Command::EqualSeparateMarker => vec![EQUAL_SEPARATE_MARKER.to_string()],
            Command::Char(c) => vec![c.to_string()],
            Command::Raw(line) => vec![line.clone()],
        }
    }

    /// Inverts the command per §4.3 ("swap `A`/`D`, `A+`/`D+`, `a`/`d`;
    /// coordinates, counts, contents, and segment ordering are preserved
    /// literally"). Returns `None` for unsafe (non-invertible) commands.
    pub fn invert(&self) -> Option<Command> {
        match self {
            Command::Add { line, content } => {
                Some(Command::Delete { line: *line, content: content.clone() })
            }
            Command::Delete { line, content } => {
                Some(Command::Add { line: *line, content: content.clone() })
            }
            Command::DeleteUnsafe { .. } => None,
            Command::AddBlock { line, content } => {
                Some(Command::DeleteBlock { line: *line, content: content.clone() })
            }
            Command::DeleteBlock { line, content } => {
                Some(Command::AddBlock { line: *line, content: content.clone() })
            }
            Command::DeleteUnsafeBlock { .. } => None,
            Command::Equal { .. }
            | Command::EqualBlock { .. }
            | Command::EqualSeparate { .. }
            | Command::EqualSeparateMarker => Some(self.clone()),
            Command::Char(c) => c.invert().map(Command::Char),
            Command::Raw(_) => Some(self.clone()),
        }
    }

    /// Whether this command (or any descendant) is an unsafe deletion,
    /// making the overall patch non-invertible.
    pub fn is_unsafe(&self) -> bool {
        match self {
            Command::DeleteUnsafe { .. } | Command::DeleteUnsafeBlock { .. } => true,
            Command::Char(c) => matches!(c.op, crate::charpatch::CharOp::Unsafe),
            _ => false,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_lines().join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_and_delete_invert_to_each_other() {
        let add = Command::Add { line: 2, content: "line 2".into() };
        let del = add.invert().unwrap();
        assert_eq!(del, Command::Delete { line: 2, content: "line 2".into() });
        assert_eq!(del.invert().unwrap(), add);
    }

    #[test]
    fn unsafe_delete_is_not_invertible() {
        assert!(Command::DeleteUnsafe { line: 1 }.invert().is_none());
        assert!(Command::DeleteUnsafeBlock { line: 1, count: 2 }.invert().is_none());
    }

    #[test]
    fn block_serializes_header_and_content() {
        let cmd = Command::AddBlock { line: 2, content: vec!["A".into(), "B".into(), "C".into()] };
        assert_eq!(cmd.to_lines(), vec!["2 A+ 3", "A", "B", "C"]);
    }

    #[test]
    fn equal_separate_serializes_dual_coordinate() {
        let cmd = Command::EqualSeparate { old_line: 3, new_line: 5, content: "same".into() };
        assert_eq!(cmd.to_lines(), vec!["3-5 E same"]);
    }
}

//! `invertPatch` (spec §4.3 "Inversion"): swaps `A`/`D`, `A+`/`D+`,
//! `a`/`d` across an entire command stream. Fails if any command in the
//! stream is unsafe (§4.3, §9 "Unsafe commands are one-way").

use super::command::Command;

/// Per spec §7's "Invariant violation" entry: inverting a patch that
/// contains any unsafe (unanchored) deletion is a fatal error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvertError;

impl std::fmt::Display for InvertError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "cannot invert a patch containing unsafe (unanchored) deletions")
    }
}

impl std::error::Error for InvertError {}

pub fn invert_commands(commands: &[Command]) -> Result<Vec<Command>, InvertError> {
    commands.iter().map(|c| c.invert().ok_or(InvertError)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linepatch::create::build_commands;
    use crate::linepatch::options::CreateOptions;

    #[test]
    fn inverts_add_delete_pairs() {
        let commands = build_commands("line 1\nline 3", "line 1\nline 2\nline 3", &CreateOptions::default()).unwrap();
        let inverted = invert_commands(&commands).unwrap();
        assert_eq!(inverted, vec![Command::Delete { line: 2, content: "line 2".into() }]);
    }

    #[test]
    fn unsafe_commands_cannot_be_inverted() {
        let commands = vec![Command::DeleteUnsafe { line: 1 }];
        assert!(invert_commands(&commands).is_err());
    }
}

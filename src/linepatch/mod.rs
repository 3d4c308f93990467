//! Line-level patch codec (component C3): `createPatch`/`invertPatch`,
//! the wire command model, and serialization/parsing.

pub mod command;
pub mod create;
pub mod diff;
pub mod invert;
pub mod options;
pub mod parse;

pub use command::{Command, EQUAL_SEPARATE_MARKER};
pub use create::{build_commands, split_lines, PatchError};
pub use diff::{resolve_strategy, DiffStrategy, LineOp, MyersDiff, PatienceDiff};
pub use invert::{invert_commands, InvertError};
pub use options::{
    ApplyOptions, CreateOptions, DeletionSafety, DeletionStrategy, DiffStrategyName, Granularity, IncludeEqualMode,
    Mode, ValidationLevel,
};
pub use parse::{is_valid_header, parse_patch};

use crate::apply::apply_patch;
use crate::warn::{LogSink, WarningSink};

/// Full `createPatch(oldText, newText, options)` entry point: builds the
/// command stream, serializes it, optionally compresses it (`optimal`
/// keeps whichever form is strictly shorter), and optionally round-trip
/// validates before returning (spec §4.3 steps 5–6).
pub fn create_patch(old_text: &str, new_text: &str, options: &CreateOptions) -> Result<Vec<String>, PatchError> {
    let commands = build_commands(old_text, new_text, options)?;
    let uncompressed: Vec<String> = commands.iter().flat_map(Command::to_lines).collect();

    let patch = if options.compress {
        let compressed = crate::compress::compress(&uncompressed);
        if options.optimal {
            let compressed_len = compressed.join("\n").len();
            let uncompressed_len = uncompressed.join("\n").len();
            // Tie goes to the uncompressed form (spec §9 "Optimal fallback").
            if compressed_len < uncompressed_len { compressed } else { uncompressed.clone() }
        } else {
            compressed
        }
    } else {
        uncompressed.clone()
    };

    if !matches!(options.validation_level, ValidationLevel::None) {
        validate(old_text, new_text, &patch, options)?;
    }

    Ok(patch)
}

fn validate(old_text: &str, new_text: &str, patch: &[String], options: &CreateOptions) -> Result<(), PatchError> {
    let sink: &dyn WarningSink = &LogSink;
    let to_apply: Vec<String> = if crate::container::is_compressed(patch) {
        crate::decompress::decompress(patch, sink)
            .map_err(|e| PatchError::ValidationFailed(e.to_string()))?
            .lines
    } else {
        patch.to_vec()
    };

    let apply_options = ApplyOptions { mode: options.mode, include_char_equals: options.include_char_equals, ..ApplyOptions::default() };
    let applied = apply_patch(old_text, &to_apply, apply_options, sink)
        .map_err(|e| PatchError::ValidationFailed(e.to_string()))?;
    if applied != new_text {
        return Err(PatchError::ValidationFailed(format!(
            "forward apply produced {applied:?}, expected {new_text:?}"
        )));
    }

    if matches!(options.validation_level, ValidationLevel::AllInvert) {
        let commands = parse_patch(&to_apply, sink);
        let has_unsafe = commands.iter().any(Command::is_unsafe);
        if !has_unsafe {
            let inverted_commands =
                invert_commands(&commands).map_err(|e| PatchError::ValidationFailed(e.to_string()))?;
            let inverted_lines: Vec<String> = inverted_commands.iter().flat_map(Command::to_lines).collect();
            let rolled_back = apply_patch(new_text, &inverted_lines, apply_options, sink)
                .map_err(|e| PatchError::ValidationFailed(e.to_string()))?;
            if rolled_back != old_text {
                return Err(PatchError::ValidationFailed(format!(
                    "inverse apply produced {rolled_back:?}, expected {old_text:?}"
                )));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_patch_validates_apply_level() {
        let mut options = CreateOptions::default();
        options.validation_level = ValidationLevel::Apply;
        let patch = create_patch("line 1\nline 3", "line 1\nline 2\nline 3", &options).unwrap();
        assert_eq!(patch, vec!["2 A line 2"]);
    }

    #[test]
    fn create_patch_validates_all_invert_level() {
        let mut options = CreateOptions::default();
        options.validation_level = ValidationLevel::AllInvert;
        let patch = create_patch("const x = 10;", "const y = 10;", &options).unwrap();
        assert!(!patch.is_empty());
    }

    #[test]
    fn optimal_never_exceeds_uncompressed_length() {
        let mut options = CreateOptions::default();
        options.compress = true;
        options.optimal = true;
        let with_compression = create_patch("a\nb\nc", "a\nx\nc", &options).unwrap();

        let mut uncompressed_options = options.clone();
        uncompressed_options.compress = false;
        let without_compression = create_patch("a\nb\nc", "a\nx\nc", &uncompressed_options).unwrap();

        assert!(with_compression.join("\n").len() <= without_compression.join("\n").len());
    }
}

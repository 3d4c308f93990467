//! `applyPatch(originalLine, patch)` (spec §4.2 Application).

use super::command::{CharCommand, CharOp};
use crate::warn::WarningSink;
use base64::Engine as _;
use std::collections::BTreeMap;
use core::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CharPatchError {
    /// `d` anchor content did not match the source span, and strict mode
    /// was requested.
    AnchorMismatch { line_number: Option<usize>, index: usize, expected: String, found: String },
}

impl fmt::Display for CharPatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CharPatchError::AnchorMismatch { line_number, index, expected, found } => write!(
                f,
                "anchor mismatch at char index {index} (line {line_number:?}): expected {expected:?}, found {found:?}"
            ),
        }
    }
}

impl std::error::Error for CharPatchError {}

/// Decodes a segment's `content` field, honoring binary mode (§4.2
/// "Binary mode ... content is Base64-encoded before being placed in a
/// segment").
fn decode_segment_content(content: &str, binary: bool) -> Vec<char> {
    if binary {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(content)
            .unwrap_or_default();
        bytes.into_iter().map(|b| b as char).collect()
    } else {
        content.chars().collect()
    }
}

/// Applies the `d`/`x` and `a` (and ignores `e`, informational-only)
/// commands addressed at `line_number` to `original_line`.
///
/// `strict` selects fatal-on-anchor-mismatch; otherwise mismatches are
/// warned on `sink` and the offending segment is dropped (its deletion
/// does not happen, matching §4.7's "warn + drop" policy).
pub fn apply_char_patch(
    original_line: &str,
    commands: &[CharCommand],
    line_number: Option<usize>,
    strict: bool,
    binary: bool,
    sink: &dyn WarningSink,
) -> Result<String, CharPatchError> {
    let original: Vec<char> = original_line.chars().collect();
    let mut deleted = vec![false; original.len()];

    for command in commands {
        match command.op {
            CharOp::Delete => {
                for segment in &command.segments {
                    // `expected.len()` (not `segment.length`) is the
                    // number of original chars/bytes this segment spans:
                    // in binary mode `segment.length` is the Base64
                    // string's length, not the decoded span (§4.2).
                    let expected = decode_segment_content(segment.content.as_deref().unwrap_or(""), binary);
                    let span = expected.len();
                    let found: Vec<char> = original
                        .get(segment.index..segment.index.saturating_add(span).min(original.len()))
                        .map(|s| s.to_vec())
                        .unwrap_or_default();
                    if found.len() != span || found != expected {
                        let message = format!(
                            "char anchor mismatch at index {} (line {:?}): expected {:?}, found {:?}",
                            segment.index,
                            line_number,
                            expected.iter().collect::<String>(),
                            found.iter().collect::<String>(),
                        );
                        if strict {
                            return Err(CharPatchError::AnchorMismatch {
                                line_number,
                                index: segment.index,
                                expected: expected.iter().collect(),
                                found: found.iter().collect(),
                            });
                        }
                        sink.warn(&message);
                        continue;
                    }
                    for i in segment.index..(segment.index + span).min(original.len()) {
                        deleted[i] = true;
                    }
                }
            }
            CharOp::Unsafe => {
                for segment in &command.segments {
                    for i in segment.index..(segment.index + segment.length).min(original.len()) {
                        deleted[i] = true;
                    }
                }
            }
            CharOp::Add | CharOp::Equal => {}
        }
    }

    let intermediate: Vec<char> = original
        .iter()
        .enumerate()
        .filter(|(i, _)| !deleted[*i])
        .map(|(_, c)| *c)
        .collect();

    let mut additions: BTreeMap<usize, Vec<Vec<char>>> = BTreeMap::new();
    for command in commands {
        if command.op != CharOp::Add {
            continue;
        }
        for segment in &command.segments {
            let content = decode_segment_content(segment.content.as_deref().unwrap_or(""), binary);
            additions.entry(segment.index).or_default().push(content);
        }
    }

    let mut result = String::new();
    for i in 0..=intermediate.len() {
        if let Some(chunks) = additions.get(&i) {
            for chunk in chunks {
                result.extend(chunk.iter());
            }
        }
        if i < intermediate.len() {
            result.push(intermediate[i]);
        }
    }
    // Overrun additions: indices beyond the intermediate string's length,
    // emitted in ascending key order (§4.2 step 4).
    for (&index, chunks) in additions.range((intermediate.len() + 1)..) {
        let _ = index;
        for chunk in chunks {
            result.extend(chunk.iter());
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charpatch::create::create_char_patch;
    use crate::warn::NullSink;

    #[test]
    fn round_trips_substitution() {
        let old = "const x = 10;";
        let new = "const y = 10;";
        let commands = create_char_patch(old, new, 1, false, false);
        let applied = apply_char_patch(old, &commands, Some(1), true, false, &NullSink).unwrap();
        assert_eq!(applied, new);
    }

    #[test]
    fn anchor_mismatch_is_fatal_in_strict_mode() {
        let commands = create_char_patch("const x = 10;", "const y = 10;", 1, false, false);
        let err = apply_char_patch("const Z = 10;", &commands, Some(1), true, false, &NullSink);
        assert!(err.is_err());
    }

    #[test]
    fn anchor_mismatch_is_dropped_in_lenient_mode() {
        let commands = create_char_patch("const x = 10;", "const y = 10;", 1, false, false);
        let applied = apply_char_patch("const Z = 10;", &commands, Some(1), false, false, &NullSink).unwrap();
        // The deletion of 'Z' didn't happen (anchor mismatch), but the
        // addition still fires at its target index.
        assert!(applied.contains('y'));
    }

    #[test]
    fn unsafe_segments_skip_anchor_check() {
        use crate::charpatch::command::CharCommand;
        use crate::charpatch::segment::Segment;
        let commands = vec![CharCommand::new_single(
            1,
            CharOp::Unsafe,
            vec![Segment { index: 0, length: 1, content: None }],
        )];
        let applied = apply_char_patch("xyz", &commands, Some(1), true, false, &NullSink).unwrap();
        assert_eq!(applied, "yz");
    }

    #[test]
    fn round_trips_every_seed_example() {
        for (old, new) in [
            ("line1\nline2", "line1\nline2"),
            ("abc", "xyz"),
            ("", "hello"),
            ("hello", ""),
        ] {
            let commands = create_char_patch(old, new, 1, false, false);
            let applied = apply_char_patch(old, &commands, Some(1), true, false, &NullSink).unwrap();
            assert_eq!(applied, new);
        }
    }
}

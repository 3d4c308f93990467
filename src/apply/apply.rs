//! `applyPatch(originalText, patch, options)` (spec §4.4): the
//! three-phase reconstruction (parse / char-apply / assemble).

use crate::charpatch::{apply_char_patch, CharCommand};
use crate::linepatch::command::Command;
use crate::linepatch::create::split_lines;
use crate::linepatch::options::ApplyOptions;
use crate::linepatch::parse::parse_patch;
use crate::warn::WarningSink;
use core::fmt;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyError {
    /// `D`/`D+` anchor content did not match the source, and strict mode
    /// was requested.
    AnchorMismatch { line: usize, expected: String, found: String },
}

impl fmt::Display for ApplyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplyError::AnchorMismatch { line, expected, found } => write!(
                f,
                "anchor mismatch at line {line}: expected {expected:?}, found {found:?}"
            ),
        }
    }
}

impl std::error::Error for ApplyError {}

/// Applies `patch` (the wire lines of an uncompressed patch — see
/// [`crate::decompress`] for the compressed form) to `original_text`,
/// producing the reconstructed text. Trailing-newline state of
/// `original_text` is preserved unless the patch itself deletes or adds
/// a trailing blank line.
pub fn apply_patch(
    original_text: &str,
    patch: &[String],
    options: ApplyOptions,
    sink: &dyn WarningSink,
) -> Result<String, ApplyError> {
    let (source_lines, trailing_newline) = split_lines(original_text);
    let commands = parse_patch(patch, sink);

    // --- Parse phase: classify into deletions / additions / char mods ---
    let mut deletions: BTreeSet<usize> = BTreeSet::new();
    let mut anchors: BTreeMap<usize, String> = BTreeMap::new();
    let mut unsafe_deletions: BTreeSet<usize> = BTreeSet::new();
    let mut additions: BTreeMap<usize, Vec<String>> = BTreeMap::new();
    let mut char_mods: BTreeMap<usize, Vec<CharCommand>> = BTreeMap::new();

    for command in &commands {
        match command {
            Command::Add { line, content } => additions.entry(*line).or_default().push(content.clone()),
            Command::AddBlock { line, content } => {
                // All of `content` inserts at the single target
                // coordinate `line`, in order — not one line per index.
                additions.entry(*line).or_default().extend(content.clone());
            }
            Command::Delete { line, content } => {
                deletions.insert(*line);
                anchors.insert(*line, content.clone());
            }
            Command::DeleteBlock { line, content } => {
                for (i, c) in content.iter().enumerate() {
                    deletions.insert(*line + i);
                    anchors.insert(*line + i, c.clone());
                }
            }
            Command::DeleteUnsafe { line } => {
                deletions.insert(*line);
                unsafe_deletions.insert(*line);
            }
            Command::DeleteUnsafeBlock { line, count } => {
                for i in 0..*count {
                    deletions.insert(*line + i);
                    unsafe_deletions.insert(*line + i);
                }
            }
            Command::Char(c) => {
                for source_line in char_coordinate_lines(c) {
                    char_mods.entry(source_line).or_default().push(c.clone());
                }
            }
            Command::Equal { .. }
            | Command::EqualBlock { .. }
            | Command::EqualSeparate { .. }
            | Command::EqualSeparateMarker
            | Command::Raw(_) => {}
        }
    }

    // --- Char-apply phase: rewrite the content of affected source lines ---
    let mut working_lines = source_lines.clone();
    for (line_number, mods) in &char_mods {
        let Some(original) = source_lines.get(line_number.saturating_sub(1)) else {
            continue;
        };
        let transformed = apply_char_patch(original, mods, Some(*line_number), options.strict_mode, matches!(options.mode, crate::linepatch::options::Mode::Binary), sink)
            .unwrap_or_else(|_| original.clone());
        if let Some(slot) = working_lines.get_mut(line_number.saturating_sub(1)) {
            *slot = transformed;
        }
    }

    // --- Assemble phase ---
    let mut result_lines: Vec<String> = Vec::new();
    for (index, line) in working_lines.iter().enumerate() {
        let line_number = index + 1;
        flush_additions_up_to(result_lines.len() + 1, &mut additions, &mut result_lines);

        if deletions.contains(&line_number) {
            if !unsafe_deletions.contains(&line_number) {
                if let Some(expected) = anchors.get(&line_number) {
                    let found = &source_lines[index];
                    if found != expected {
                        let message = format!(
                            "anchor mismatch at line {line_number}: expected {expected:?}, found {found:?}"
                        );
                        if options.strict_mode {
                            return Err(ApplyError::AnchorMismatch {
                                line: line_number,
                                expected: expected.clone(),
                                found: found.clone(),
                            });
                        }
                        sink.warn(&message);
                        // Anchor mismatch in lenient mode: drop the
                        // deletion (keep the line) per §4.7.
                        result_lines.push(line.clone());
                    }
                    // else: anchor matched, deletion proceeds (line omitted).
                }
            }
            continue;
        }
        result_lines.push(line.clone());
    }

    // Flush any additions keyed beyond the end of source (ascending key
    // order, §4.4 step 3 "after source is exhausted").
    for (_, lines) in additions {
        result_lines.extend(lines);
    }

    let mut out = result_lines.join("\n");
    if trailing_newline {
        out.push('\n');
    }
    Ok(out)
}

/// Drains any addition buckets keyed strictly below `target`, in
/// ascending key order, appending their (already arrival-ordered)
/// content to `out`. Used to interleave additions at the correct output
/// position while walking source lines.
fn flush_additions_up_to(target: usize, additions: &mut BTreeMap<usize, Vec<String>>, out: &mut Vec<String>) {
    loop {
        let Some(&key) = additions.keys().next() else { break };
        if key > target {
            break;
        }
        if let Some(lines) = additions.remove(&key) {
            out.extend(lines);
        }
    }
}

/// Source line numbers a char command addresses — a singleton for
/// single-line commands, every line in the range-list for grouped ones
/// (spec §3 "grouped ... one segment applies to every line in the
/// range").
fn char_coordinate_lines(command: &CharCommand) -> Vec<usize> {
    command.coordinate.lines()
}

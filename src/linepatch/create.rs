//! `createPatch(oldText, newText, options)` (spec §4.3).

use super::command::Command;
use super::diff::{resolve_strategy, LineOp};
use super::options::{CreateOptions, DeletionSafety, DeletionStrategy, Granularity, IncludeEqualMode, Mode};
use crate::charpatch::create_char_patch_mode;
use core::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchError {
    /// `granularity = Chars` was requested (spec §4.3 step 3, §4.7).
    GranularityNotImplemented,
    /// `validationLevel` round-trip check failed.
    ValidationFailed(String),
}

impl fmt::Display for PatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatchError::GranularityNotImplemented => {
                write!(f, "granularity 'chars' is not implemented")
            }
            PatchError::ValidationFailed(msg) => write!(f, "patch failed round-trip validation: {msg}"),
        }
    }
}

impl std::error::Error for PatchError {}

/// Splits text into lines, normalizing `\r\n`/`\r` to `\n` first (§4.3
/// step 1). Returns the lines plus whether the input ended in a newline
/// (so callers can preserve trailing-newline state, §8 "Boundary
/// behaviors").
pub fn split_lines(text: &str) -> (Vec<String>, bool) {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    if normalized.is_empty() {
        return (Vec::new(), false);
    }
    let trailing_newline = normalized.ends_with('\n');
    let body = if trailing_newline { &normalized[..normalized.len() - 1] } else { &normalized[..] };
    (body.split('\n').map(str::to_string).collect(), trailing_newline)
}

/// One contiguous run from the edit script: a pure add, a pure remove, an
/// equal run, or (when a remove run is immediately followed by an add
/// run) a replace.
enum Hunk {
    Remove(Vec<String>),
    Add(Vec<String>),
    Replace(Vec<String>, Vec<String>),
    Equal(Vec<String>),
}

fn script_to_hunks(script: &[LineOp]) -> Vec<Hunk> {
    let mut hunks = Vec::new();
    let mut i = 0;
    while i < script.len() {
        match &script[i] {
            LineOp::Equal(_) => {
                let mut run = Vec::new();
                while i < script.len() {
                    if let LineOp::Equal(l) = &script[i] {
                        run.push(l.clone());
                        i += 1;
                    } else {
                        break;
                    }
                }
                hunks.push(Hunk::Equal(run));
            }
            _ => {
                let mut removed = Vec::new();
                while i < script.len() {
                    if let LineOp::Remove(l) = &script[i] {
                        removed.push(l.clone());
                        i += 1;
                    } else {
                        break;
                    }
                }
                let mut added = Vec::new();
                while i < script.len() {
                    if let LineOp::Add(l) = &script[i] {
                        added.push(l.clone());
                        i += 1;
                    } else {
                        break;
                    }
                }
                if !removed.is_empty() && !added.is_empty() {
                    hunks.push(Hunk::Replace(removed, added));
                } else if !removed.is_empty() {
                    hunks.push(Hunk::Remove(removed));
                } else {
                    hunks.push(Hunk::Add(added));
                }
            }
        }
    }
    hunks
}

fn serialized_len(commands: &[Command]) -> usize {
    commands.iter().flat_map(Command::to_lines).collect::<Vec<_>>().join("\n").len()
}

/// Emits `Add`/`AddBlock` for a pure addition run starting at target
/// coordinate `start` (1-based).
fn emit_add_run(start: usize, lines: &[String]) -> Vec<Command> {
    if lines.len() <= 2 {
        lines
            .iter()
            .enumerate()
            .map(|(i, l)| Command::Add { line: start + i, content: l.clone() })
            .collect()
    } else {
        vec![Command::AddBlock { line: start, content: lines.to_vec() }]
    }
}

/// Emits `D`/`D+`/`X`/`X+` for a pure removal run starting at source
/// coordinate `start`, sub-grouped by deletion safety when a per-line
/// predicate is in effect.
fn emit_remove_run(start: usize, lines: &[String], strategy: &DeletionStrategy) -> Vec<Command> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        let safety = strategy.safety_for(&lines[i], start + i);
        let mut j = i + 1;
        while j < lines.len() && strategy.safety_for(&lines[j], start + j) as u8 == safety as u8 {
            j += 1;
        }
        let group = &lines[i..j];
        let group_start = start + i;
        match safety {
            DeletionSafety::Safe => {
                if group.len() <= 2 {
                    for (k, l) in group.iter().enumerate() {
                        out.push(Command::Delete { line: group_start + k, content: l.clone() });
                    }
                } else {
                    out.push(Command::DeleteBlock { line: group_start, content: group.to_vec() });
                }
            }
            DeletionSafety::Unsafe => {
                if group.len() <= 2 {
                    for k in 0..group.len() {
                        out.push(Command::DeleteUnsafe { line: group_start + k });
                    }
                } else {
                    out.push(Command::DeleteUnsafeBlock { line: group_start, count: group.len() });
                }
            }
        }
        i = j;
    }
    out
}

/// Candidate B for a replace hunk: an independent `D+`/`A+` (or
/// single-line) pair, ignoring intra-line structure.
fn replace_as_line_commands(
    old_start: usize,
    new_start: usize,
    removed: &[String],
    added: &[String],
    strategy: &DeletionStrategy,
) -> Vec<Command> {
    let mut out = emit_remove_run(old_start, removed, strategy);
    out.extend(emit_add_run(new_start, added));
    out
}

/// Candidate A for an aligned (equal-length) replace hunk: a char patch
/// per line pair. Only attempted when `old_pos == new_pos` for every
/// pair, since `create_char_patch` addresses both its `d` and `a` halves
/// with a single shared coordinate (spec §4.2) — when positions have
/// drifted, the single-coordinate invariant (§3) can't be honored by a
/// char patch here, and we fall back to candidate B (documented in
/// `DESIGN.md`).
fn replace_as_char_patches(
    old_start: usize,
    new_start: usize,
    removed: &[String],
    added: &[String],
    include_char_equals: bool,
    unsafe_deletion: bool,
    binary: bool,
) -> Option<Vec<Command>> {
    if old_start != new_start {
        return None;
    }
    let mut deletes = Vec::new();
    let mut adds = Vec::new();
    let mut equals = Vec::new();
    for i in 0..removed.len() {
        let line_number = old_start + i;
        let commands =
            create_char_patch_mode(&removed[i], &added[i], line_number, include_char_equals, unsafe_deletion, binary);
        for c in commands {
            match c.op {
                crate::charpatch::CharOp::Delete | crate::charpatch::CharOp::Unsafe => deletes.push(c),
                crate::charpatch::CharOp::Add => adds.push(c),
                crate::charpatch::CharOp::Equal => equals.push(c),
            }
        }
    }
    // Fold structurally-identical per-line commands into grouped `a*`/`d*`/`x*`
    // forms (spec §8 seed scenario #5: an identical prefix added to several
    // consecutive lines collapses into one grouped command).
    let mut out: Vec<Command> = Vec::new();
    out.extend(crate::charpatch::group_identical(&deletes).into_iter().map(Command::Char));
    out.extend(crate::charpatch::group_identical(&adds).into_iter().map(Command::Char));
    out.extend(crate::charpatch::group_identical(&equals).into_iter().map(Command::Char));
    Some(out)
}

struct Cursors {
    old: usize,
    new: usize,
}

/// Builds the uncompressed command stream for `old` -> `new` under
/// `options`, without (yet) serializing to lines or invoking compression
/// (that happens in [`super::create_patch`]).
pub fn build_commands(old_text: &str, new_text: &str, options: &CreateOptions) -> Result<Vec<Command>, PatchError> {
    if matches!(options.granularity, Granularity::Chars) {
        return Err(PatchError::GranularityNotImplemented);
    }

    let include_char_equals =
        options.include_char_equals || matches!(options.include_equal_mode, IncludeEqualMode::Context);
    let unsafe_deletion = matches!(options.deletion_strategy, DeletionStrategy::Unsafe);

    let (old_lines, _old_trailing_nl) = split_lines(old_text);
    let (new_lines, _new_trailing_nl) = split_lines(new_text);

    let strategy = resolve_strategy(options.diff_strategy_name);
    let script = strategy.diff(&old_lines, &new_lines);
    let hunks = script_to_hunks(&script);

    let mut commands = Vec::new();
    let mut separate_equals: Vec<Command> = Vec::new();
    let mut cursors = Cursors { old: 1, new: 1 };

    let equal_hunk_count = hunks.iter().filter(|h| matches!(h, Hunk::Equal(_))).count();
    let mut equal_hunk_index = 0usize;

    for hunk in &hunks {
        match hunk {
            Hunk::Add(lines) => {
                commands.extend(emit_add_run(cursors.new, lines));
                cursors.new += lines.len();
            }
            Hunk::Remove(lines) => {
                commands.extend(emit_remove_run(cursors.old, lines, &options.deletion_strategy));
                cursors.old += lines.len();
            }
            Hunk::Replace(removed, added) => {
                let replace_commands = build_replace(
                    cursors.old,
                    cursors.new,
                    removed,
                    added,
                    options,
                    include_char_equals,
                    unsafe_deletion,
                );
                commands.extend(replace_commands);
                cursors.old += removed.len();
                cursors.new += added.len();
            }
            Hunk::Equal(lines) => {
                let is_first = equal_hunk_index == 0;
                let is_last = equal_hunk_index + 1 == equal_hunk_count;
                equal_hunk_index += 1;
                emit_equal_hunk(
                    lines,
                    cursors.old,
                    cursors.new,
                    is_first,
                    is_last,
                    options,
                    &mut commands,
                    &mut separate_equals,
                );
                cursors.old += lines.len();
                cursors.new += lines.len();
            }
        }
    }

    if matches!(options.include_equal_mode, IncludeEqualMode::Separate) && !separate_equals.is_empty() {
        commands.push(Command::EqualSeparateMarker);
        commands.extend(separate_equals);
    }

    Ok(commands)
}

fn build_replace(
    old_start: usize,
    new_start: usize,
    removed: &[String],
    added: &[String],
    options: &CreateOptions,
    include_char_equals: bool,
    unsafe_deletion: bool,
) -> Vec<Command> {
    if matches!(options.granularity, Granularity::Lines) {
        return replace_as_line_commands(old_start, new_start, removed, added, &options.deletion_strategy);
    }

    if removed.len() == added.len() && !removed.is_empty() {
        let binary = matches!(options.mode, Mode::Binary);
        let candidate_b = replace_as_line_commands(old_start, new_start, removed, added, &options.deletion_strategy);
        let candidate_a = replace_as_char_patches(
            old_start,
            new_start,
            removed,
            added,
            include_char_equals,
            unsafe_deletion,
            binary,
        );
        return match candidate_a {
            Some(candidate_a) if serialized_len(&candidate_a) < serialized_len(&candidate_b) => candidate_a,
            _ => candidate_b,
        };
    }

    replace_as_line_commands(old_start, new_start, removed, added, &options.deletion_strategy)
}

#[allow(clippy::too_many_arguments)]
fn emit_equal_hunk(
    lines: &[String],
    old_start: usize,
    new_start: usize,
    is_first: bool,
    is_last: bool,
    options: &CreateOptions,
    commands: &mut Vec<Command>,
    separate_equals: &mut Vec<Command>,
) {
    match options.include_equal_mode {
        IncludeEqualMode::None => {}
        IncludeEqualMode::Inline => {
            if !lines.is_empty() {
                commands.push(Command::EqualBlock { line: new_start, content: lines.to_vec() });
            }
        }
        IncludeEqualMode::Separate => {
            for (i, line) in lines.iter().enumerate() {
                separate_equals.push(Command::EqualSeparate {
                    old_line: old_start + i,
                    new_line: new_start + i,
                    content: line.clone(),
                });
            }
        }
        IncludeEqualMode::Context => {
            let n = options.include_context_lines.max(1);
            let len = lines.len();
            let leading_allowed = !is_first;
            let trailing_allowed = !is_last;
            if len <= 2 * n {
                if (leading_allowed || trailing_allowed) && !lines.is_empty() {
                    commands.push(Command::EqualBlock { line: new_start, content: lines.to_vec() });
                }
            } else {
                if leading_allowed {
                    commands.push(Command::EqualBlock { line: new_start, content: lines[..n].to_vec() });
                }
                if trailing_allowed {
                    let tail_new_start = new_start + len - n;
                    commands.push(Command::EqualBlock { line: tail_new_start, content: lines[len - n..].to_vec() });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linepatch::options::CreateOptions;
    use pretty_assertions::assert_eq;

    fn render(commands: &[Command]) -> Vec<String> {
        commands.iter().flat_map(Command::to_lines).collect()
    }

    #[test]
    fn seed_1_pure_addition() {
        let commands = build_commands("line 1\nline 3", "line 1\nline 2\nline 3", &CreateOptions::default()).unwrap();
        assert_eq!(render(&commands), vec!["2 A line 2"]);
    }

    #[test]
    fn seed_2_pure_deletion() {
        let commands =
            build_commands("line 1\nline 2\nline 3", "line 1\nline 3", &CreateOptions::default()).unwrap();
        assert_eq!(render(&commands), vec!["2 D line 2"]);
    }

    #[test]
    fn seed_3_single_line_char_substitution() {
        let commands = build_commands("const x = 10;", "const y = 10;", &CreateOptions::default()).unwrap();
        assert_eq!(render(&commands), vec!["1 d 6 1 x", "1 a 6 1 y"]);
    }

    #[test]
    fn seed_4_block_addition() {
        let commands =
            build_commands("start\nend", "start\nA\nB\nC\nend", &CreateOptions::default()).unwrap();
        assert_eq!(render(&commands), vec!["2 A+ 3", "A", "B", "C"]);
    }

    #[test]
    fn seed_5_grouped_char_edit_across_lines() {
        let commands = build_commands(
            "line1\nline2\nline3",
            "  line1\n  line2\nline3",
            &CreateOptions::default(),
        )
        .unwrap();
        assert_eq!(render(&commands), vec!["1-2 a* 0 2   "]);
    }

    #[test]
    fn empty_to_empty_is_empty_patch() {
        let commands = build_commands("", "", &CreateOptions::default()).unwrap();
        assert!(commands.is_empty());
    }

    #[test]
    fn creation_from_empty_emits_plain_adds() {
        let commands = build_commands("", "a\nb", &CreateOptions::default()).unwrap();
        assert_eq!(render(&commands), vec!["1 A a", "2 A b"]);
    }

    #[test]
    fn total_deletion_emits_plain_deletes() {
        let commands = build_commands("x\ny", "", &CreateOptions::default()).unwrap();
        assert_eq!(render(&commands), vec!["1 D x", "2 D y"]);
    }

    #[test]
    fn chars_granularity_is_unimplemented() {
        let mut options = CreateOptions::default();
        options.granularity = Granularity::Chars;
        let err = build_commands("a", "b", &options).unwrap_err();
        assert_eq!(err, PatchError::GranularityNotImplemented);
    }

    #[test]
    fn lines_granularity_suppresses_char_commands() {
        let mut options = CreateOptions::default();
        options.granularity = Granularity::Lines;
        let commands = build_commands("const x = 10;", "const y = 10;", &options).unwrap();
        assert!(commands.iter().all(|c| !matches!(c, Command::Char(_))));
    }

    #[test]
    fn binary_mode_emits_base64_segment_content() {
        let mut options = CreateOptions::default();
        options.mode = Mode::Binary;
        let commands = build_commands("const x = 10;", "const y = 10;", &options).unwrap();
        let rendered = render(&commands);
        // 'x' and 'y' Base64-encode to "eA==" / "eQ==" (§4.2 "Binary mode").
        assert_eq!(rendered, vec!["1 d 6 4 eA==", "1 a 6 4 eQ=="]);
    }

    #[test]
    fn unsafe_deletion_strategy_emits_x_commands() {
        let mut options = CreateOptions::default();
        options.deletion_strategy = DeletionStrategy::Unsafe;
        options.granularity = Granularity::Lines;
        let commands = build_commands("a\nb\nc", "a\nc", &options).unwrap();
        assert!(matches!(commands[0], Command::DeleteUnsafe { .. }));
    }
}

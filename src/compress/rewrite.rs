//! Pass 4 (rewrite into parametric strings, compressed numeric fields)
//! and Pass 5 (run-length aggregation of consecutive single-line
//! commands into blocks) of the secondary compressor.

use crate::base58;
use crate::charpatch::{CharCommand, Coordinate, RangeItem};
use crate::container::{render_parametric, Dictionary, ParametricPart};
use crate::linepatch::command::{Command, EQUAL_SEPARATE_MARKER};

/// Merges consecutive single-line `Add`/`Delete`/`DeleteUnsafe` commands
/// whose line numbers are sequential into their block form — but only
/// once a run is longer than two lines. `createPatch` itself already
/// switches to block form past that point (§4.3's `k <= 2` rule), so a
/// run of exactly one or two singles reaching this pass was deliberately
/// emitted that way and coalescing it would change the command set
/// `decompress` recovers, breaking the §8 round-trip property. Runs
/// longer than two can only arise from patches assembled outside
/// `createPatch` (e.g. hand-built or concatenated ones), so merging those
/// is still a safe, lossless-for-`createPatch`-output optimization.
pub fn aggregate(commands: Vec<Command>) -> Vec<Command> {
    let mut out = Vec::with_capacity(commands.len());
    let mut i = 0;
    while i < commands.len() {
        match &commands[i] {
            Command::Add { line, .. } => {
                let start = *line;
                let mut content = Vec::new();
                let mut j = i;
                while let Some(Command::Add { line, content: c }) = commands.get(j) {
                    if *line != start + content.len() {
                        break;
                    }
                    content.push(c.clone());
                    j += 1;
                }
                if content.len() > 2 {
                    out.push(Command::AddBlock { line: start, content });
                    i = j;
                    continue;
                }
            }
            Command::Delete { line, .. } => {
                let start = *line;
                let mut content = Vec::new();
                let mut j = i;
                while let Some(Command::Delete { line, content: c }) = commands.get(j) {
                    if *line != start + content.len() {
                        break;
                    }
                    content.push(c.clone());
                    j += 1;
                }
                if content.len() > 2 {
                    out.push(Command::DeleteBlock { line: start, content });
                    i = j;
                    continue;
                }
            }
            Command::DeleteUnsafe { line } => {
                let start = *line;
                let mut count = 0usize;
                let mut j = i;
                while let Some(Command::DeleteUnsafe { line }) = commands.get(j) {
                    if *line != start + count {
                        break;
                    }
                    count += 1;
                    j += 1;
                }
                if count > 2 {
                    out.push(Command::DeleteUnsafeBlock { line: start, count });
                    i = j;
                    continue;
                }
            }
            _ => {}
        }
        out.push(commands[i].clone());
        i += 1;
    }
    out
}

/// Rewrites a command stream into its compressed body lines: Base58
/// numeric fields throughout, and dictionary-backed parametric encoding
/// of string-command content where it's shorter than the literal.
pub fn rewrite_commands(commands: &[Command], dictionary: &Dictionary) -> Vec<String> {
    let mut lines = Vec::new();
    for command in aggregate(commands.to_vec()) {
        lines.extend(compressed_lines(&command, dictionary));
    }
    lines
}

fn coord(n: usize) -> String {
    base58::encode(n as u64)
}

fn compressed_lines(command: &Command, dictionary: &Dictionary) -> Vec<String> {
    match command {
        Command::Add { line, content } => vec![format!("{} A {}", coord(*line), choose_payload(content, dictionary))],
        Command::Delete { line, content } => {
            vec![format!("{} D {}", coord(*line), choose_payload(content, dictionary))]
        }
        Command::DeleteUnsafe { line } => vec![format!("{} X", coord(*line))],
        Command::AddBlock { line, content } => {
            let mut out = vec![format!("{} A+ {}", coord(*line), coord(content.len()))];
            out.extend(content.iter().map(|c| choose_payload(c, dictionary)));
            out
        }
        Command::DeleteBlock { line, content } => {
            let mut out = vec![format!("{} D+ {}", coord(*line), coord(content.len()))];
            out.extend(content.iter().map(|c| choose_payload(c, dictionary)));
            out
        }
        Command::DeleteUnsafeBlock { line, count } => vec![format!("{} X+ {}", coord(*line), coord(*count))],
        Command::Equal { line, content } => {
            vec![format!("{} E {}", coord(*line), choose_payload(content, dictionary))]
        }
        Command::EqualBlock { line, content } => {
            let mut out = vec![format!("{} E+ {}", coord(*line), coord(content.len()))];
            out.extend(content.iter().map(|c| choose_payload(c, dictionary)));
            out
        }
        Command::EqualSeparate { old_line, new_line, content } => {
            vec![format!("{}-{} E {}", coord(*old_line), coord(*new_line), choose_payload(content, dictionary))]
        }
        Command::EqualSeparateMarker => vec![EQUAL_SEPARATE_MARKER.to_string()],
        Command::Char(c) => vec![compressed_char_line(c, dictionary)],
        Command::Raw(line) => vec![line.clone()],
    }
}

/// Chooses between literal and parametric encoding for one content
/// string, always producing something [`crate::container::parse_parametric`]
/// recovers exactly. A literal that happens to start with `@` or `#` is
/// escaped as a single-literal-run parametric string even when no
/// dictionary reference helps, so a leading `@`/`#` is always a reliable
/// "this payload is parametric" signal at decompress time.
fn choose_payload(content: &str, dictionary: &Dictionary) -> String {
    let parametrized = parametrize(content, dictionary);
    if parametrized.chars().count() < content.chars().count() {
        parametrized
    } else if matches!(content.chars().next(), Some('@') | Some('#')) {
        render_parametric(&[ParametricPart::Literal(content.to_string())])
    } else {
        content.to_string()
    }
}

/// Greedy longest-match-first tokenization of `content` against the
/// dictionary. Returns `content` unchanged (verbatim) if no dictionary
/// entry matched anywhere.
fn parametrize(content: &str, dictionary: &Dictionary) -> String {
    if content.is_empty() || dictionary.entries().is_empty() {
        return content.to_string();
    }
    let mut templates: Vec<(usize, Vec<char>)> = dictionary
        .entries()
        .iter()
        .enumerate()
        .map(|(id, entry)| (id, entry.chars().collect()))
        .collect();
    templates.sort_by(|a, b| b.1.len().cmp(&a.1.len()));

    let chars: Vec<char> = content.chars().collect();
    let mut parts = Vec::new();
    let mut literal_buf = String::new();
    let mut pos = 0usize;
    let mut used_ref = false;

    'outer: while pos < chars.len() {
        for (id, template) in &templates {
            if template.is_empty() || pos + template.len() > chars.len() {
                continue;
            }
            if chars[pos..pos + template.len()] == template[..] {
                if !literal_buf.is_empty() {
                    parts.push(ParametricPart::Literal(std::mem::take(&mut literal_buf)));
                }
                parts.push(ParametricPart::Ref(*id));
                pos += template.len();
                used_ref = true;
                continue 'outer;
            }
        }
        literal_buf.push(chars[pos]);
        pos += 1;
    }
    if !literal_buf.is_empty() {
        parts.push(ParametricPart::Literal(literal_buf));
    }

    if used_ref {
        render_parametric(&parts)
    } else {
        content.to_string()
    }
}

/// Renders a char command with Base58 coordinate and segment numeric
/// fields. Per spec §4.5 Pass 4, a segment whose content exactly matches
/// a dictionary entry is rewritten to the shorter `<index>@<id>` form
/// (length omitted — it's implied by the entry's content length);
/// otherwise the segment keeps its literal `<index> <length> <content>`
/// form.
fn compressed_char_line(command: &CharCommand, dictionary: &Dictionary) -> String {
    let coordinate = match &command.coordinate {
        Coordinate::Single(n) => coord(*n),
        Coordinate::Grouped(items) => items
            .iter()
            .map(|item| match item {
                RangeItem::Single(n) => coord(*n),
                RangeItem::Range(a, b) => format!("{}-{}", coord(*a), coord(*b)),
            })
            .collect::<Vec<_>>()
            .join(","),
    };
    let payload = command
        .segments
        .iter()
        .map(|segment| {
            if !command.op.has_content() {
                return format!("{} {}", coord(segment.index), coord(segment.length));
            }
            let content = segment.content.as_deref().unwrap_or("");
            match dictionary.id_of(content) {
                Some(id) => format!("{}@{}", coord(segment.index), crate::container::encode_dictionary_id(id)),
                None => format!("{} {} {}", coord(segment.index), coord(segment.length), content),
            }
        })
        .collect::<Vec<_>>()
        .join(" ");
    format!("{} {} {}", coordinate, command.opcode_token(), payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::Dictionary;

    #[test]
    fn aggregates_sequential_adds_into_a_block() {
        let commands = vec![
            Command::Add { line: 1, content: "a".into() },
            Command::Add { line: 2, content: "b".into() },
            Command::Add { line: 3, content: "c".into() },
        ];
        let merged = aggregate(commands);
        assert_eq!(
            merged,
            vec![Command::AddBlock { line: 1, content: vec!["a".into(), "b".into(), "c".into()] }]
        );
    }

    #[test]
    fn does_not_merge_non_sequential_adds() {
        let commands =
            vec![Command::Add { line: 1, content: "a".into() }, Command::Add { line: 5, content: "b".into() }];
        let merged = aggregate(commands);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn does_not_merge_a_two_line_run_createpatch_would_keep_single() {
        // createPatch("", "a\nb") emits these as two singles (k <= 2);
        // coalescing them here would make decompress recover a block
        // instead of the original two-single-line command set.
        let commands =
            vec![Command::Add { line: 1, content: "a".into() }, Command::Add { line: 2, content: "b".into() }];
        let merged = aggregate(commands.clone());
        assert_eq!(merged, commands);
    }

    #[test]
    fn does_not_merge_a_two_line_delete_run() {
        let commands =
            vec![Command::Delete { line: 1, content: "x".into() }, Command::Delete { line: 2, content: "y".into() }];
        let merged = aggregate(commands.clone());
        assert_eq!(merged, commands);
    }

    #[test]
    fn literal_starting_with_marker_char_is_escaped() {
        let dict = Dictionary::new(vec![]);
        let payload = choose_payload("@not-a-reference", &dict);
        assert!(payload.starts_with('#'));
    }

    #[test]
    fn dictionary_hit_shortens_payload() {
        let dict = Dictionary::new(vec!["a fairly long repeated fragment".to_string()]);
        let content = "prefix a fairly long repeated fragment suffix";
        let payload = choose_payload(content, &dict);
        assert!(payload.len() < content.len());
        assert!(payload.contains('@'));
    }

    #[test]
    fn char_segment_matching_dictionary_entry_uses_short_form() {
        use crate::charpatch::command::{CharCommand, CharOp};
        use crate::charpatch::segment::Segment;

        let dict = Dictionary::new(vec!["10".to_string()]);
        let command = CharCommand::new_single(1, CharOp::Add, vec![Segment { index: 6, length: 2, content: Some("10".into()) }]);
        let line = compressed_char_line(&command, &dict);
        // line number 1 -> base58 "2", segment index 6 -> base58 "7",
        // dictionary id 0 stays decimal "0" (< 10).
        assert_eq!(line, "2 a 7@0");
    }
}

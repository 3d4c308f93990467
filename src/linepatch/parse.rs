//! Parses an uncompressed patch's wire lines back into [`Command`]s.
//! Shared by the applier (C4) and the compressor's Pass 1 partition step.

use super::command::{Command, EQUAL_SEPARATE_MARKER};
use crate::charpatch::{parse_range_list, parse_segments, CharCommand, CharOp, Coordinate};
use crate::warn::WarningSink;

const SINGLE_LINE_OPS: [&str; 4] = ["A", "D", "X", "E"];
const BLOCK_OPS: [&str; 4] = ["A+", "D+", "X+", "E+"];
const CHAR_SINGLE_OPS: [&str; 4] = ["a", "d", "e", "x"];
const CHAR_GROUP_OPS: [&str; 3] = ["a*", "d*", "x*"];

/// A header line split into its three grammar parts. `rest` is `""` when
/// the header had no third token (e.g. a bare `"3 X"`).
struct Header<'a> {
    coord: &'a str,
    opcode: &'a str,
    rest: &'a str,
}

fn split_header(line: &str) -> Option<Header<'_>> {
    let mut parts = line.splitn(3, ' ');
    let coord = parts.next()?;
    if coord.is_empty() {
        return None;
    }
    let opcode = parts.next()?;
    let rest = parts.next().unwrap_or("");
    Some(Header { coord, opcode, rest })
}

/// Whether `line` matches the command-header grammar. Used to implement
/// the block-truncation forgiveness rule (§9): a content line that is
/// itself a syntactically valid header ends the block early.
pub fn is_valid_header(line: &str) -> bool {
    let Some(header) = split_header(line) else { return false };
    SINGLE_LINE_OPS.contains(&header.opcode)
        || BLOCK_OPS.contains(&header.opcode)
        || (CHAR_SINGLE_OPS.contains(&header.opcode) && header.coord.parse::<usize>().is_ok())
        || (CHAR_GROUP_OPS.contains(&header.opcode) && parse_range_list(header.coord).is_some())
}

/// Parses a full uncompressed command stream (already-separated lines,
/// no leading `~`/dictionary envelope — see [`crate::container`] for
/// that).
pub fn parse_patch(lines: &[String], sink: &dyn WarningSink) -> Vec<Command> {
    let mut commands = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        let line = &lines[i];
        if line == EQUAL_SEPARATE_MARKER {
            commands.push(Command::EqualSeparateMarker);
            i += 1;
            for rest in &lines[i..] {
                commands.push(parse_equal_separate_line(rest));
            }
            return commands;
        }

        let Some(header) = split_header(line) else {
            commands.push(Command::Raw(line.clone()));
            i += 1;
            continue;
        };

        if BLOCK_OPS.contains(&header.opcode) {
            let Ok(coord) = header.coord.parse::<usize>() else {
                commands.push(Command::Raw(line.clone()));
                i += 1;
                continue;
            };
            let Ok(count) = header.rest.trim().parse::<usize>() else {
                commands.push(Command::Raw(line.clone()));
                i += 1;
                continue;
            };
            i += 1;

            if header.opcode == "X+" {
                commands.push(Command::DeleteUnsafeBlock { line: coord, count });
                continue;
            }

            let mut content = Vec::new();
            let mut overran = false;
            while content.len() < count {
                match lines.get(i) {
                    Some(candidate) if !is_valid_header(candidate) => {
                        content.push(candidate.clone());
                        i += 1;
                    }
                    Some(_) => break, // truncated by an embedded header; keep partial content
                    None => {
                        overran = true;
                        break;
                    }
                }
            }

            if overran {
                sink.warn(&format!(
                    "block header at line {coord} ({}) declared {count} content lines but patch ended after {}; dropping block",
                    header.opcode,
                    content.len()
                ));
                continue;
            }
            if content.len() < count {
                sink.warn(&format!(
                    "block header at line {coord} ({}) declared {count} content lines but only {} remained before the next command; truncating",
                    header.opcode,
                    content.len()
                ));
            }

            commands.push(match header.opcode {
                "A+" => Command::AddBlock { line: coord, content },
                "D+" => Command::DeleteBlock { line: coord, content },
                "E+" => Command::EqualBlock { line: coord, content },
                _ => unreachable!("header.opcode already matched BLOCK_OPS"),
            });
            continue;
        }

        if SINGLE_LINE_OPS.contains(&header.opcode) {
            let Ok(coord) = header.coord.parse::<usize>() else {
                commands.push(Command::Raw(line.clone()));
                i += 1;
                continue;
            };
            let payload = header.rest.to_string();
            commands.push(match header.opcode {
                "A" => Command::Add { line: coord, content: payload },
                "D" => Command::Delete { line: coord, content: payload },
                "X" => Command::DeleteUnsafe { line: coord },
                "E" => Command::Equal { line: coord, content: payload },
                _ => unreachable!("header.opcode already matched SINGLE_LINE_OPS"),
            });
            i += 1;
            continue;
        }

        if CHAR_SINGLE_OPS.contains(&header.opcode) {
            let Ok(coord) = header.coord.parse::<usize>() else {
                commands.push(Command::Raw(line.clone()));
                i += 1;
                continue;
            };
            let op = CharOp::from_letter(header.opcode.chars().next().unwrap()).expect("checked above");
            match parse_segments(header.rest, op.has_content()) {
                Ok(segments) => commands.push(Command::Char(CharCommand::new_single(coord, op, segments))),
                Err(_) => commands.push(Command::Raw(line.clone())),
            }
            i += 1;
            continue;
        }

        if CHAR_GROUP_OPS.contains(&header.opcode) {
            let Some(range) = parse_range_list(header.coord) else {
                commands.push(Command::Raw(line.clone()));
                i += 1;
                continue;
            };
            let op = CharOp::from_letter(header.opcode.chars().next().unwrap()).expect("checked above");
            match parse_segments(header.rest, op.has_content()) {
                Ok(segments) => commands.push(Command::Char(CharCommand {
                    coordinate: Coordinate::Grouped(range),
                    op,
                    segments,
                })),
                Err(_) => commands.push(Command::Raw(line.clone())),
            }
            i += 1;
            continue;
        }

        commands.push(Command::Raw(line.clone()));
        i += 1;
    }
    commands
}

fn parse_equal_separate_line(line: &str) -> Command {
    if let Some(header) = split_header(line) {
        if header.opcode == "E" {
            if let Some((old_str, new_str)) = header.coord.split_once('-') {
                if let (Ok(old_line), Ok(new_line)) = (old_str.parse::<usize>(), new_str.parse::<usize>()) {
                    return Command::EqualSeparate { old_line, new_line, content: header.rest.to_string() };
                }
            }
        }
    }
    Command::Raw(line.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linepatch::create::build_commands;
    use crate::linepatch::options::CreateOptions;
    use crate::warn::NullSink;

    #[test]
    fn round_trips_block_and_single_commands() {
        let original = build_commands("start\nend", "start\nA\nB\nC\nend", &CreateOptions::default()).unwrap();
        let lines: Vec<String> = original.iter().flat_map(Command::to_lines).collect();
        let parsed = parse_patch(&lines, &NullSink);
        assert_eq!(parsed, original);
    }

    #[test]
    fn round_trips_char_substitution() {
        let original = build_commands("const x = 10;", "const y = 10;", &CreateOptions::default()).unwrap();
        let lines: Vec<String> = original.iter().flat_map(Command::to_lines).collect();
        let parsed = parse_patch(&lines, &NullSink);
        assert_eq!(parsed, original);
    }

    #[test]
    fn unknown_opcode_passes_through_verbatim() {
        let lines = vec!["3 Q mystery".to_string()];
        let parsed = parse_patch(&lines, &NullSink);
        assert_eq!(parsed, vec![Command::Raw("3 Q mystery".to_string())]);
    }

    #[test]
    fn block_truncates_when_a_header_is_embedded() {
        let lines = vec!["1 A+ 3".to_string(), "one".to_string(), "2 A two".to_string()];
        let parsed = parse_patch(&lines, &NullSink);
        assert_eq!(parsed[0], Command::AddBlock { line: 1, content: vec!["one".to_string()] });
        assert_eq!(parsed[1], Command::Add { line: 2, content: "two".to_string() });
    }

    #[test]
    fn block_is_dropped_when_patch_ends_early() {
        let lines = vec!["1 A+ 3".to_string(), "one".to_string()];
        let parsed = parse_patch(&lines, &NullSink);
        assert!(parsed.is_empty());
    }

    #[test]
    fn x_plus_carries_no_content() {
        let lines = vec!["1 X+ 2".to_string(), "3 A x".to_string()];
        let parsed = parse_patch(&lines, &NullSink);
        assert_eq!(parsed[0], Command::DeleteUnsafeBlock { line: 1, count: 2 });
        assert_eq!(parsed[1], Command::Add { line: 3, content: "x".to_string() });
    }

    #[test]
    fn parses_separate_equal_section() {
        let lines = vec![EQUAL_SEPARATE_MARKER.to_string(), "3-5 E same".to_string()];
        let parsed = parse_patch(&lines, &NullSink);
        assert_eq!(
            parsed,
            vec![
                Command::EqualSeparateMarker,
                Command::EqualSeparate { old_line: 3, new_line: 5, content: "same".to_string() },
            ]
        );
    }
}

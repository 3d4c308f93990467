//! Secondary decompressor (component C6): the exact inverse of
//! [`crate::compress`] — strips the `~` envelope, expands dictionary
//! references, and decodes every Base58 numeric field back to decimal,
//! producing the same wire lines an uncompressed `createPatch` call
//! would have (spec §4.6).

use crate::base58;
use crate::charpatch::segment::Segment;
use crate::charpatch::{CharCommand, CharOp, Coordinate, RangeItem};
use crate::container::{looks_parametric, parse_parametric};
use crate::linepatch::command::{Command, EQUAL_SEPARATE_MARKER};
use crate::linepatch::parse::is_valid_header;
use crate::warn::WarningSink;
use core::fmt;

const SINGLE_LINE_OPS: [&str; 4] = ["A", "D", "X", "E"];
const BLOCK_OPS: [&str; 4] = ["A+", "D+", "X+", "E+"];
const CHAR_SINGLE_OPS: [&str; 4] = ["a", "d", "e", "x"];
const CHAR_GROUP_OPS: [&str; 3] = ["a*", "d*", "x*"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecompressResult {
    /// The equivalent uncompressed patch's wire lines.
    pub lines: Vec<String>,
}

/// Error produced when `decompress` is handed a patch that was never
/// compressed in the first place — callers are expected to check
/// [`crate::container::is_compressed`] first (spec §8 testable property
/// #4 exists for exactly this reason).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecompressError {
    NotCompressed,
}

impl fmt::Display for DecompressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecompressError::NotCompressed => write!(f, "patch is not compressed (missing leading `~` marker)"),
        }
    }
}

impl std::error::Error for DecompressError {}

/// Decompresses `patch`, which must start with the `~` magic marker.
pub fn decompress(patch: &[String], sink: &dyn WarningSink) -> Result<DecompressResult, DecompressError> {
    let envelope = crate::container::split_envelope(patch).ok_or(DecompressError::NotCompressed)?;
    let commands = parse_compressed_body(&envelope.body, &envelope.dictionary, sink);
    let lines = commands.iter().flat_map(Command::to_lines).collect();
    Ok(DecompressResult { lines })
}

fn decode_coord(token: &str) -> Option<usize> {
    base58::decode(token).ok().map(|v| v as usize)
}

/// Expands a string-command payload: parametric if it looks parametric
/// (leading `@`/`#`), otherwise returned verbatim.
fn expand(payload: &str, dictionary: &[String]) -> String {
    if looks_parametric(payload) {
        parse_parametric(payload, dictionary)
    } else {
        payload.to_string()
    }
}

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

fn is_valid_compressed_header(line: &str) -> bool {
    let Some(header) = split_header(line) else { return false };
    SINGLE_LINE_OPS.contains(&header.opcode)
        || BLOCK_OPS.contains(&header.opcode)
        || (CHAR_SINGLE_OPS.contains(&header.opcode) && decode_coord(header.coord).is_some())
        || (CHAR_GROUP_OPS.contains(&header.opcode) && parse_compressed_range_list(header.coord).is_some())
}

fn parse_compressed_range_list(s: &str) -> Option<Vec<RangeItem>> {
    let mut items = Vec::new();
    for part in s.split(',') {
        if let Some((a, b)) = part.split_once('-') {
            items.push(RangeItem::Range(decode_coord(a)?, decode_coord(b)?));
        } else {
            items.push(RangeItem::Single(decode_coord(part)?));
        }
    }
    if items.is_empty() {
        None
    } else {
        Some(items)
    }
}

/// Reads one segment run out of a compressed char payload. Two per-segment
/// shapes are accepted (spec §4.5 Pass 4): the literal `<idx> <len>
/// [<content>]` form (same "declared length is authoritative" rule
/// [`crate::charpatch::segment`] uses, just with Base58 numeric tokens),
/// and the dictionary-backed short form `<idx>@<id>` (no length token —
/// it's implied by the referenced entry's content length).
fn parse_compressed_segments(payload: &str, with_content: bool, dictionary: &[String]) -> Option<Vec<Segment>> {
    let chars: Vec<char> = payload.chars().collect();
    let mut pos = 0usize;
    let mut segments = Vec::new();

    let read_token = |chars: &[char], pos: &mut usize| -> String {
        let start = *pos;
        while *pos < chars.len() && chars[*pos] != ' ' {
            *pos += 1;
        }
        chars[start..*pos].iter().collect()
    };

    while pos < chars.len() {
        let first_token = read_token(&chars, &mut pos);

        if with_content {
            if let Some((idx_str, id_str)) = first_token.split_once('@') {
                let index = decode_coord(idx_str)?;
                let id = crate::container::decode_dictionary_id(id_str)?;
                let content = dictionary.get(id)?.clone();
                let length = content.chars().count();
                segments.push(Segment { index, length, content: Some(content) });
                if pos < chars.len() {
                    if chars.get(pos) != Some(&' ') {
                        return None;
                    }
                    pos += 1;
                }
                continue;
            }
        }

        let index = decode_coord(&first_token)?;
        if chars.get(pos) != Some(&' ') {
            return None;
        }
        pos += 1;
        let length = decode_coord(&read_token(&chars, &mut pos))?;

        if !with_content {
            segments.push(Segment { index, length, content: None });
            if pos < chars.len() {
                if chars.get(pos) != Some(&' ') {
                    return None;
                }
                pos += 1;
            }
            continue;
        }

        if chars.get(pos) != Some(&' ') {
            return None;
        }
        pos += 1;
        if chars.len() - pos < length {
            return None;
        }
        let content: String = chars[pos..pos + length].iter().collect();
        pos += length;
        segments.push(Segment { index, length, content: Some(content) });

        if pos < chars.len() {
            if chars.get(pos) != Some(&' ') {
                return None;
            }
            pos += 1;
        }
    }
    Some(segments)
}

fn parse_compressed_body(lines: &[String], dictionary: &[String], sink: &dyn WarningSink) -> Vec<Command> {
    let mut commands = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        let line = &lines[i];
        if line == EQUAL_SEPARATE_MARKER {
            commands.push(Command::EqualSeparateMarker);
            i += 1;
            for rest in &lines[i..] {
                commands.push(parse_compressed_equal_separate_line(rest, dictionary));
            }
            return commands;
        }

        let Some(header) = split_header(line) else {
            commands.push(Command::Raw(line.clone()));
            i += 1;
            continue;
        };

        if BLOCK_OPS.contains(&header.opcode) {
            let (Some(coord), Some(count)) = (decode_coord(header.coord), decode_coord(header.rest.trim())) else {
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
                    Some(candidate) if !is_valid_compressed_header(candidate) && !is_valid_header(candidate) => {
                        content.push(expand(candidate, dictionary));
                        i += 1;
                    }
                    Some(_) => break,
                    None => {
                        overran = true;
                        break;
                    }
                }
            }

            if overran {
                sink.warn(&format!(
                    "compressed block header at line {coord} ({}) declared {count} content lines but patch ended after {}; dropping block",
                    header.opcode,
                    content.len()
                ));
                continue;
            }
            if content.len() < count {
                sink.warn(&format!(
                    "compressed block header at line {coord} ({}) declared {count} content lines but only {} remained before the next command; truncating",
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
            let Some(coord) = decode_coord(header.coord) else {
                commands.push(Command::Raw(line.clone()));
                i += 1;
                continue;
            };
            let payload = expand(header.rest, dictionary);
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
            let (Some(coord), Some(op)) =
                (decode_coord(header.coord), CharOp::from_letter(header.opcode.chars().next().unwrap()))
            else {
                commands.push(Command::Raw(line.clone()));
                i += 1;
                continue;
            };
            match parse_compressed_segments(header.rest, op.has_content(), dictionary) {
                Some(segments) => commands.push(Command::Char(CharCommand::new_single(coord, op, segments))),
                None => commands.push(Command::Raw(line.clone())),
            }
            i += 1;
            continue;
        }

        if CHAR_GROUP_OPS.contains(&header.opcode) {
            let Some(range) = parse_compressed_range_list(header.coord) else {
                commands.push(Command::Raw(line.clone()));
                i += 1;
                continue;
            };
            let op = CharOp::from_letter(header.opcode.chars().next().unwrap()).expect("checked above");
            match parse_compressed_segments(header.rest, op.has_content(), dictionary) {
                Some(segments) => {
                    commands.push(Command::Char(CharCommand { coordinate: Coordinate::Grouped(range), op, segments }))
                }
                None => commands.push(Command::Raw(line.clone())),
            }
            i += 1;
            continue;
        }

        commands.push(Command::Raw(line.clone()));
        i += 1;
    }
    commands
}

fn parse_compressed_equal_separate_line(line: &str, dictionary: &[String]) -> Command {
    if let Some(header) = split_header(line) {
        if header.opcode == "E" {
            if let Some((old_str, new_str)) = header.coord.split_once('-') {
                if let (Some(old_line), Some(new_line)) = (decode_coord(old_str), decode_coord(new_str)) {
                    return Command::EqualSeparate {
                        old_line,
                        new_line,
                        content: expand(header.rest, dictionary),
                    };
                }
            }
        }
    }
    Command::Raw(line.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compress::compress;
    use pretty_assertions::assert_eq;
    use crate::linepatch::command::Command as C;
    use crate::linepatch::create::build_commands;
    use crate::linepatch::options::CreateOptions;
    use crate::warn::NullSink;

    fn uncompressed(old: &str, new: &str) -> Vec<String> {
        build_commands(old, new, &CreateOptions::default()).unwrap().iter().flat_map(C::to_lines).collect()
    }

    #[test]
    fn rejects_uncompressed_input() {
        let patch = vec!["1 A x".to_string()];
        assert_eq!(decompress(&patch, &NullSink).unwrap_err(), DecompressError::NotCompressed);
    }

    #[test]
    fn round_trips_simple_addition() {
        let patch = uncompressed("a\nb", "a\nc\nb");
        let compressed = compress(&patch);
        let result = decompress(&compressed, &NullSink).unwrap();
        assert_eq!(result.lines, patch);
    }

    #[test]
    fn round_trips_char_substitution() {
        let patch = uncompressed("const x = 10;", "const y = 10;");
        let compressed = compress(&patch);
        let result = decompress(&compressed, &NullSink).unwrap();
        assert_eq!(result.lines, patch);
    }

    #[test]
    fn round_trips_block_commands() {
        let patch = uncompressed("start\nend", "start\nA\nB\nC\nend");
        let compressed = compress(&patch);
        let result = decompress(&compressed, &NullSink).unwrap();
        assert_eq!(result.lines, patch);
    }

    #[test]
    fn round_trips_repeated_content_through_dictionary() {
        let patch = uncompressed("x\ny", "a fairly long repeated fragment\nx\na fairly long repeated fragment\ny");
        let compressed = compress(&patch);
        assert!(compressed.iter().any(|l| l.starts_with('@')));
        let result = decompress(&compressed, &NullSink).unwrap();
        assert_eq!(result.lines, patch);
    }

    #[test]
    fn round_trips_repeated_char_segment_content_through_dictionary() {
        // "99" shares no character with either replaced digit ("1", "2"),
        // so the LCS-based char diff can't fold part of the replacement
        // into a prefix match — both lines emit an identical two-char add
        // segment, which is what the dictionary should pick up.
        let patch = uncompressed(
            "const aaaaaaaaaaaa = 1;\nconst bbbbbbbbbbbb = 2;",
            "const aaaaaaaaaaaa = 99;\nconst bbbbbbbbbbbb = 99;",
        );
        let compressed = compress(&patch);
        assert!(compressed.iter().any(|l| l.contains('@') && (l.starts_with(|c: char| c.is_ascii_digit()))));
        let result = decompress(&compressed, &NullSink).unwrap();
        assert_eq!(result.lines, patch);
    }
}

//! `createPatch(oldLine, newLine, lineNumber)` (spec §4.2).

use super::command::{CharCommand, CharOp};
use super::diff::{diff_chars, CharOp as EditOp};
use super::segment::Segment;
use base64::Engine as _;

/// Maximum length of an equal run that gets folded into its neighboring
/// changes rather than kept as a standalone equal segment (spec §4.2 step
/// 4, "Grouping law" in §8).
pub const GROUP_MERGE_THRESHOLD: usize = 4;

#[derive(Debug, Clone)]
struct Block {
    is_equal: bool,
    old_start: usize,
    new_start: usize,
    remove_chars: Vec<char>,
    add_chars: Vec<char>,
    equal_chars: Vec<char>,
}

impl Block {
    fn is_change(&self) -> bool {
        !self.is_equal
    }
}

fn script_to_blocks(script: &[EditOp]) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut old_index = 0usize;
    let mut new_index = 0usize;
    let mut i = 0usize;
    while i < script.len() {
        if let EditOp::Equal(_) = script[i] {
            let start_old = old_index;
            let start_new = new_index;
            let mut chars = Vec::new();
            while i < script.len() {
                if let EditOp::Equal(c) = script[i] {
                    chars.push(c);
                    old_index += 1;
                    new_index += 1;
                    i += 1;
                } else {
                    break;
                }
            }
            blocks.push(Block {
                is_equal: true,
                old_start: start_old,
                new_start: start_new,
                remove_chars: Vec::new(),
                add_chars: Vec::new(),
                equal_chars: chars,
            });
        } else {
            let start_old = old_index;
            let start_new = new_index;
            let mut removes = Vec::new();
            let mut adds = Vec::new();
            while i < script.len() {
                match script[i] {
                    EditOp::Remove(c) => {
                        removes.push(c);
                        old_index += 1;
                        i += 1;
                    }
                    EditOp::Add(c) => {
                        adds.push(c);
                        new_index += 1;
                        i += 1;
                    }
                    EditOp::Equal(_) => break,
                }
            }
            blocks.push(Block {
                is_equal: false,
                old_start: start_old,
                new_start: start_new,
                remove_chars: removes,
                add_chars: adds,
                equal_chars: Vec::new(),
            });
        }
    }
    blocks
}

/// Repeatedly folds `Change, short Equal, Change` triples into one Change
/// block until no more folds apply.
fn merge_short_gaps(mut blocks: Vec<Block>) -> Vec<Block> {
    loop {
        let mut merged_any = false;
        let mut out: Vec<Block> = Vec::with_capacity(blocks.len());
        let mut i = 0;
        while i < blocks.len() {
            if i + 2 < blocks.len()
                && blocks[i].is_change()
                && blocks[i + 1].is_equal
                && blocks[i + 1].equal_chars.len() <= GROUP_MERGE_THRESHOLD
                && blocks[i + 2].is_change()
            {
                let a = &blocks[i];
                let gap = &blocks[i + 1];
                let b = &blocks[i + 2];
                let mut remove_chars = a.remove_chars.clone();
                remove_chars.extend(gap.equal_chars.iter().copied());
                remove_chars.extend(b.remove_chars.iter().copied());
                let mut add_chars = a.add_chars.clone();
                add_chars.extend(gap.equal_chars.iter().copied());
                add_chars.extend(b.add_chars.iter().copied());
                out.push(Block {
                    is_equal: false,
                    old_start: a.old_start,
                    new_start: a.new_start,
                    remove_chars,
                    add_chars,
                    equal_chars: Vec::new(),
                });
                i += 3;
                merged_any = true;
            } else {
                out.push(blocks[i].clone());
                i += 1;
            }
        }
        blocks = out;
        if !merged_any {
            return blocks;
        }
    }
}

/// Encodes a segment's content for the wire (spec §4.2 "Binary mode"):
/// in binary mode, `chars` (each one representing a raw byte, 0-255) is
/// Base64-encoded and `length` becomes the Base64 string's length; in
/// text mode, content and length are the chars verbatim.
fn encode_segment_content(chars: &[char], binary: bool) -> (String, usize) {
    if binary {
        let bytes: Vec<u8> = chars.iter().map(|&c| c as u8).collect();
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
        let length = encoded.chars().count();
        (encoded, length)
    } else {
        let content: String = chars.iter().collect();
        let length = chars.len();
        (content, length)
    }
}

/// Builds the `d`/`x`, `a`, and optional `e` commands for one line pair.
/// `unsafe_deletion` selects `x` (no anchor content) over `d`. `binary`
/// Base64-encodes content-bearing segments per spec §4.2; unsafe segments
/// always carry the raw span length regardless of mode, since they never
/// store content to begin with.
pub fn create_char_patch(
    old_line: &str,
    new_line: &str,
    line_number: usize,
    include_char_equals: bool,
    unsafe_deletion: bool,
) -> Vec<CharCommand> {
    create_char_patch_mode(old_line, new_line, line_number, include_char_equals, unsafe_deletion, false)
}

/// Full form of [`create_char_patch`] with an explicit binary-mode flag.
pub fn create_char_patch_mode(
    old_line: &str,
    new_line: &str,
    line_number: usize,
    include_char_equals: bool,
    unsafe_deletion: bool,
    binary: bool,
) -> Vec<CharCommand> {
    let old_chars: Vec<char> = old_line.chars().collect();
    let new_chars: Vec<char> = new_line.chars().collect();
    let script = diff_chars(&old_chars, &new_chars);
    let blocks = merge_short_gaps(script_to_blocks(&script));

    let mut delete_segments = Vec::new();
    let mut add_segments = Vec::new();
    let mut equal_segments = Vec::new();

    for block in &blocks {
        if block.is_equal {
            if include_char_equals && !block.equal_chars.is_empty() {
                let (content, length) = encode_segment_content(&block.equal_chars, binary);
                equal_segments.push(Segment { index: block.old_start, length, content: Some(content) });
            }
            continue;
        }
        if !block.remove_chars.is_empty() {
            if unsafe_deletion {
                delete_segments.push(Segment { index: block.old_start, length: block.remove_chars.len(), content: None });
            } else {
                let (content, length) = encode_segment_content(&block.remove_chars, binary);
                delete_segments.push(Segment { index: block.old_start, length, content: Some(content) });
            }
        }
        if !block.add_chars.is_empty() {
            let (content, length) = encode_segment_content(&block.add_chars, binary);
            add_segments.push(Segment { index: block.new_start, length, content: Some(content) });
        }
    }

    let mut commands = Vec::new();
    if !delete_segments.is_empty() {
        let op = if unsafe_deletion { CharOp::Unsafe } else { CharOp::Delete };
        commands.push(CharCommand::new_single(line_number, op, delete_segments));
    }
    if !add_segments.is_empty() {
        commands.push(CharCommand::new_single(line_number, CharOp::Add, add_segments));
    }
    if include_char_equals && !equal_segments.is_empty() {
        commands.push(CharCommand::new_single(line_number, CharOp::Equal, equal_segments));
    }
    commands
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_3_single_char_substitution() {
        let commands = create_char_patch("const x = 10;", "const y = 10;", 1, false, false);
        let rendered: Vec<String> = commands.iter().map(|c| c.to_string()).collect();
        assert_eq!(rendered, vec!["1 d 6 1 x", "1 a 6 1 y"]);
    }

    #[test]
    fn short_equal_run_folds_into_one_change() {
        // "abcdefg" -> "Xbcdefg" with a trailing edit 4 chars later should
        // still collapse since the gap is <= 4.
        let commands = create_char_patch("aWXYZb", "AWXYZB", 1, false, false);
        let delete = commands.iter().find(|c| c.op == CharOp::Delete).unwrap();
        // One merged segment, not two separate ones around "WXYZ".
        assert_eq!(delete.segments.len(), 1);
    }

    #[test]
    fn long_equal_run_stays_independent() {
        let commands = create_char_patch("aXXXXXXb", "AXXXXXXB", 1, false, false);
        let delete = commands.iter().find(|c| c.op == CharOp::Delete).unwrap();
        assert_eq!(delete.segments.len(), 2);
    }

    #[test]
    fn unsafe_mode_omits_content() {
        let commands = create_char_patch("const x = 10;", "const y = 10;", 1, false, true);
        let unsafe_cmd = commands.iter().find(|c| c.op == CharOp::Unsafe).unwrap();
        assert!(unsafe_cmd.segments[0].content.is_none());
    }

    #[test]
    fn include_char_equals_emits_e_command() {
        let commands = create_char_patch("hello world", "hellX world", 1, true, false);
        assert!(commands.iter().any(|c| c.op == CharOp::Equal));
    }
}

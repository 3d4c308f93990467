//! Secondary compressor (component C5): mines a content dictionary from
//! an uncompressed patch, then rewrites it into the `~`-prefixed
//! compressed layout (spec §3, §4.5).

pub mod mining;
pub mod rewrite;

use crate::container::{render_envelope, Dictionary};
use crate::linepatch::parse::parse_patch;
use crate::warn::NullSink;

/// Compresses an uncompressed patch's wire lines. Always produces a
/// well-formed compressed patch, even when the mined dictionary is
/// empty (an empty dictionary plus an unchanged body, still usefully
/// Base58-shrinking every numeric field).
pub fn compress(patch: &[String]) -> Vec<String> {
    let commands = parse_patch(patch, &NullSink);
    let templates = mining::mine_templates(&commands);
    let dictionary = Dictionary::new(templates);
    let body = rewrite::rewrite_commands(&commands, &dictionary);
    render_envelope(dictionary.entries(), &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::is_compressed;
    use crate::decompress::decompress;
    use crate::linepatch::create::build_commands;
    use crate::linepatch::command::Command;
    use crate::linepatch::options::CreateOptions;
    use crate::warn::NullSink;
    use pretty_assertions::assert_eq;

    fn uncompressed(old: &str, new: &str) -> Vec<String> {
        build_commands(old, new, &CreateOptions::default())
            .unwrap()
            .iter()
            .flat_map(Command::to_lines)
            .collect()
    }

    #[test]
    fn compressed_output_starts_with_magic() {
        let patch = uncompressed("a\nb", "a\nx\nb");
        let compressed = compress(&patch);
        assert!(is_compressed(&compressed));
    }

    #[test]
    fn compress_then_decompress_round_trips() {
        let patch = uncompressed("a\nb\nc", "repeated text block\na\nrepeated text block\nc");
        let compressed = compress(&patch);
        let decompressed = decompress(&compressed, &NullSink).unwrap();
        assert_eq!(decompressed.lines, patch);
    }

    #[test]
    fn repeated_content_installs_a_dictionary_entry() {
        let patch = uncompressed("x", "a sizeable repeated fragment\nx\na sizeable repeated fragment");
        let compressed = compress(&patch);
        assert!(compressed.iter().any(|l| l.starts_with('@')));
    }

    #[test]
    fn seed_scenario_short_repeated_line_compresses_per_spec() {
        let patch = vec!["10 A common line".to_string(), "20 A common line".to_string()];
        let compressed = compress(&patch);
        assert_eq!(compressed[0], "~");
        assert_eq!(compressed[1], "@0 common line");
        assert_eq!(compressed[2], "$");
        let decompressed = decompress(&compressed, &NullSink).unwrap();
        assert_eq!(decompressed.lines, patch);
    }

    #[test]
    fn two_line_addition_from_empty_round_trips_without_block_coalescing() {
        // createPatch("", "a\nb") emits two singles (k <= 2); compression
        // must not turn them into a block, or decompression would recover
        // a different command set than the original (spec §8 property 3).
        let patch = uncompressed("", "a\nb");
        assert_eq!(patch, vec!["1 A a".to_string(), "2 A b".to_string()]);
        let compressed = compress(&patch);
        let decompressed = decompress(&compressed, &NullSink).unwrap();
        assert_eq!(decompressed.lines, patch);
    }

    #[test]
    fn total_deletion_round_trips_without_block_coalescing() {
        let patch = uncompressed("x\ny", "");
        assert_eq!(patch, vec!["1 D x".to_string(), "2 D y".to_string()]);
        let compressed = compress(&patch);
        let decompressed = decompress(&compressed, &NullSink).unwrap();
        assert_eq!(decompressed.lines, patch);
    }
}

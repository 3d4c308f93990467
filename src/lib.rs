//! `patchwire` — a compact textual diff/patch codec.
//!
//! Given two versions of line-oriented text, [`create_patch`] emits a
//! patch: an ordered sequence of wire-format commands that
//! [`apply_patch`] can replay against the first version to reconstruct
//! the second. [`invert_patch`] flips a patch so it rolls a change back
//! instead of applying it forward (unless the patch carries unsafe,
//! unanchored deletions, which are one-way by design). [`compress`] and
//! [`decompress`] provide a secondary, dictionary-based encoding over
//! the same command stream, exact inverses of each other.
//!
//! The module layout mirrors the components of the design: [`base58`]
//! (C1), [`charpatch`] (C2, intra-line edits), [`linepatch`] (C3, the
//! command model and line-level synthesis), [`apply`] (C4),
//! [`compress`] (C5), and [`decompress`] (C6). [`container`] holds the
//! `~`/dictionary/`$` envelope shared by C5 and C6.

pub mod apply;
pub mod base58;
pub mod charpatch;
pub mod compress;
pub mod container;
pub mod decompress;
pub mod linepatch;
pub mod warn;

pub use apply::ApplyError;
pub use compress::compress;
pub use container::is_compressed;
pub use decompress::{decompress, DecompressError, DecompressResult};
pub use linepatch::{
    create_patch, ApplyOptions, Command, CreateOptions, DeletionSafety, DeletionStrategy, DiffStrategyName,
    Granularity, IncludeEqualMode, Mode, PatchError, ValidationLevel,
};
pub use warn::{CallbackSink, LogSink, NullSink, WarningSink};

use linepatch::parse::parse_patch;
use linepatch::invert::{invert_commands, InvertError};

/// Applies `patch` (the wire lines produced by [`create_patch`], compressed
/// or not) to `original_text`, producing the reconstructed text.
///
/// Compressed patches (those starting with the `~` magic marker) are
/// transparently decompressed first.
pub fn apply_patch(
    original_text: &str,
    patch: &[String],
    options: ApplyOptions,
    sink: &dyn WarningSink,
) -> Result<String, ApplyPatchError> {
    let lines: Vec<String> = if is_compressed(patch) {
        decompress(patch, sink).map_err(ApplyPatchError::Decompress)?.lines
    } else {
        patch.to_vec()
    };
    apply::apply_patch(original_text, &lines, options, sink).map_err(ApplyPatchError::Apply)
}

/// Inverts `patch`, producing a patch that rolls a forward application
/// back to the original text. Fails if `patch` contains any unsafe
/// (unanchored) deletion, or if it is a compressed patch whose body
/// cannot be decompressed.
pub fn invert_patch(patch: &[String], sink: &dyn WarningSink) -> Result<Vec<String>, ApplyPatchError> {
    let lines: Vec<String> = if is_compressed(patch) {
        decompress(patch, sink).map_err(ApplyPatchError::Decompress)?.lines
    } else {
        patch.to_vec()
    };
    let commands = parse_patch(&lines, sink);
    let inverted = invert_commands(&commands).map_err(ApplyPatchError::Invert)?;
    Ok(inverted.iter().flat_map(Command::to_lines).collect())
}

/// Error produced by the top-level [`apply_patch`]/[`invert_patch`]
/// convenience wrappers, which unify C4/C6/C3-invert's distinct error
/// types behind one `std::error::Error` impl.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyPatchError {
    Decompress(DecompressError),
    Apply(ApplyError),
    Invert(InvertError),
}

impl std::fmt::Display for ApplyPatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApplyPatchError::Decompress(e) => write!(f, "{e}"),
            ApplyPatchError::Apply(e) => write!(f, "{e}"),
            ApplyPatchError::Invert(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ApplyPatchError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_forward_through_top_level_api() {
        let old = "line 1\nline 3";
        let new = "line 1\nline 2\nline 3";
        let patch = create_patch(old, new, &CreateOptions::default()).unwrap();
        let applied = apply_patch(old, &patch, ApplyOptions::default(), &NullSink).unwrap();
        assert_eq!(applied, new);
    }

    #[test]
    fn round_trips_inverse_through_top_level_api() {
        let old = "line 1\nline 3";
        let new = "line 1\nline 2\nline 3";
        let patch = create_patch(old, new, &CreateOptions::default()).unwrap();
        let inverted = invert_patch(&patch, &NullSink).unwrap();
        let rolled_back = apply_patch(new, &inverted, ApplyOptions::default(), &NullSink).unwrap();
        assert_eq!(rolled_back, old);
    }

    #[test]
    fn compressed_patches_apply_transparently() {
        let old = "a\nb\nc";
        let new = "repeated text block\na\nrepeated text block\nc";
        let mut options = CreateOptions::default();
        options.compress = true;
        let patch = create_patch(old, new, &options).unwrap();
        assert!(is_compressed(&patch));
        let applied = apply_patch(old, &patch, ApplyOptions::default(), &NullSink).unwrap();
        assert_eq!(applied, new);
    }

    #[test]
    fn empty_inputs_yield_empty_patch() {
        let patch = create_patch("", "", &CreateOptions::default()).unwrap();
        assert!(patch.is_empty());
    }
}

//! Option structs accepted by `createPatch`/`applyPatch` (spec §6),
//! modeled after `Lz4F_preferences_t` in `frame/types.rs`:
//! `Default`-deriving structs of `#[default]`-tagged enums (see
//! `SPEC_FULL.md` §10.3).

use std::fmt;
use std::sync::Arc;

/// How finely `createPatch` may represent a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Granularity {
    /// Allow the size-based choice between line commands and intra-line
    /// character commands (default).
    #[default]
    Mixed,
    /// Suppress all intra-line commands; emit only `A`/`D`/`A+`/`D+`/`X`/`X+`.
    Lines,
    /// Not implemented (spec §4.3 step 3); requesting it is a fatal error
    /// at call time.
    Chars,
}

/// Outcome of a per-line deletion-safety predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionSafety {
    Safe,
    Unsafe,
}

/// Selects between anchor-checked (`D`/`D+`/`d`) and unanchored
/// (`X`/`X+`/`x`) deletions.
#[derive(Clone)]
pub enum DeletionStrategy {
    /// Always anchor-checked (default).
    Safe,
    /// Always unanchored; deletions are not invertible.
    Unsafe,
    /// Per-line predicate `(content, lineNumber) -> Safe | Unsafe`.
    Predicate(Arc<dyn Fn(&str, usize) -> DeletionSafety + Send + Sync>),
}

impl Default for DeletionStrategy {
    fn default() -> Self {
        DeletionStrategy::Safe
    }
}

impl fmt::Debug for DeletionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeletionStrategy::Safe => write!(f, "DeletionStrategy::Safe"),
            DeletionStrategy::Unsafe => write!(f, "DeletionStrategy::Unsafe"),
            DeletionStrategy::Predicate(_) => write!(f, "DeletionStrategy::Predicate(..)"),
        }
    }
}

impl DeletionStrategy {
    pub fn safety_for(&self, content: &str, line_number: usize) -> DeletionSafety {
        match self {
            DeletionStrategy::Safe => DeletionSafety::Safe,
            DeletionStrategy::Unsafe => DeletionSafety::Unsafe,
            DeletionStrategy::Predicate(f) => f(content, line_number),
        }
    }
}

/// How equal (unchanged) runs are represented in the emitted patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IncludeEqualMode {
    /// Equal runs emit nothing (default).
    #[default]
    None,
    /// Emit `E+` headers (new-coordinate) preceding each equal run.
    Inline,
    /// Collect all equal runs after a `$$EQUAL$$` marker, dual `old-new`
    /// coordinates.
    Separate,
    /// Emit `E+` blocks of `include_context_lines` size around each change.
    Context,
}

/// Depth of round-trip validation `createPatch` performs before returning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationLevel {
    #[default]
    None,
    /// Apply the emitted patch and compare against `newText`.
    Apply,
    /// Also invert-and-reapply, unless the patch contains unsafe commands.
    AllInvert,
}

/// Identifies the line-level diff collaborator to use (§10.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiffStrategyName {
    #[default]
    Myers,
    Patience,
    /// Accepted as a name; currently maps to the same Myers implementation
    /// (see `DESIGN.md` Open Questions — no distinguishing semantics are
    /// defined for it).
    PreserveStructure,
}

/// Text vs binary content mode (§4.2 "Binary mode").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Text,
    Binary,
}

/// Options accepted by `createPatch`.
#[derive(Debug, Clone, Default)]
pub struct CreateOptions {
    pub granularity: Granularity,
    pub deletion_strategy: DeletionStrategy,
    pub include_equal_mode: IncludeEqualMode,
    /// Used only by `IncludeEqualMode::Context`.
    pub include_context_lines: usize,
    /// Forced `true` when `include_equal_mode == Context` (§6).
    pub include_char_equals: bool,
    pub compress: bool,
    /// Keep compression only if strictly shorter than the uncompressed form.
    pub optimal: bool,
    pub validation_level: ValidationLevel,
    pub diff_strategy_name: DiffStrategyName,
    pub mode: Mode,
}

/// Options accepted by `applyPatch`. The warning sink is passed
/// separately (as `charpatch::apply` already does) rather than embedded
/// here, since `Box<dyn WarningSink>` doesn't derive the traits the rest
/// of this struct wants.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApplyOptions {
    pub strict_mode: bool,
    pub mode: Mode,
    /// Informs the parser that `e`/`E`/`E+` commands may be present.
    pub include_char_equals: bool,
}

//! Char-level diff codec (component C2): intra-line `a`/`d`/`e`/`x` (and
//! grouped `a*`/`d*`/`x*`) command synthesis and application.

pub mod apply;
pub mod command;
pub mod create;
pub mod diff;
pub mod segment;

pub use apply::{apply_char_patch, CharPatchError};
pub use command::{group_identical, parse_range_list, CharCommand, CharOp, Coordinate, RangeItem};
pub use create::{create_char_patch, create_char_patch_mode, GROUP_MERGE_THRESHOLD};
pub use segment::{parse_segments, serialize_segments, Segment, SegmentParseError};

//! Patch applier (component C4): the three-phase reconstruction of
//! spec §4.4.

mod apply;

pub use apply::{apply_patch, ApplyError};

//! Unified diffs: parsing text into `FileDiff`s and applying their hunks.

pub mod apply;
pub mod parse;

pub use apply::{join_lines, split_lines, Applied, DiffApplier};
pub use parse::parse_unified_diff;

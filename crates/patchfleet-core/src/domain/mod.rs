//! Domain models for patchfleet.
//!
//! Canonical definitions for the core entities:
//! - `FileDiff`: one file's worth of parsed unified-diff hunks
//! - `PatchPlan`: commit message, branch name and PR body for a run
//! - `PatchResult` / `FleetReport`: per-repository outcomes
//! - `PatchError`: the error taxonomy

pub mod error;
pub mod file_diff;
pub mod plan;
pub mod report;

pub use error::{ErrorKind, PatchError, Result};
pub use file_diff::{FileAction, FileDiff, Hunk, HunkLine};
pub use plan::{default_branch_name, PatchPlan, PROVENANCE_MARKER};
pub use report::{
    BranchOutcome, FileOutcome, FileReport, FleetReport, PatchResult, PullRequestOutcome,
    RepositoryReport,
};

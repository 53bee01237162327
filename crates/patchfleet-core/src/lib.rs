//! patchfleet core library
//!
//! Applies one unified diff across a fleet of hosted repositories:
//!
//! - `diff`: unified-diff parser and hunk applier
//! - `store`: versioned text-file access on a branch
//! - `branch`: find-or-create for the work branch
//! - `pipeline`: one repository, branch to pull request
//! - `orchestrator`: fan-out over the selected repositories
//! - `selection`: editor-driven repository selection

pub mod branch;
pub mod deadline;
pub mod diff;
pub mod domain;
pub mod obs;
pub mod orchestrator;
pub mod pipeline;
pub mod selection;
pub mod store;
pub mod telemetry;

pub use branch::{BranchResolution, BranchResolver};
pub use diff::{join_lines, parse_unified_diff, split_lines, Applied, DiffApplier};
pub use domain::{
    default_branch_name, BranchOutcome, ErrorKind, FileAction, FileDiff, FileOutcome, FileReport,
    FleetReport, Hunk, HunkLine, PatchError, PatchPlan, PatchResult, PullRequestOutcome,
    RepositoryReport, Result, PROVENANCE_MARKER,
};
pub use orchestrator::{CancelFlag, FleetOptions, FleetOrchestrator, DEFAULT_MAX_PARALLEL};
pub use pipeline::{PipelineOptions, RepositoryPatchPipeline, DEFAULT_CALL_TIMEOUT};
pub use selection::{
    parse_selection, render_selection, select_repositories, TextEditor, SELECTION_HEADER,
};
pub use store::{FileStore, TextFile};
pub use telemetry::init_tracing;

//! What to do to every selected repository: commit message, branch, PR body.

use serde::{Deserialize, Serialize};

/// Fixed body attached to every pull request opened by patchfleet.
pub const PROVENANCE_MARKER: &str = "Automated by patchfleet";

/// Branch name derived from a commit message: every space becomes a hyphen.
///
/// Pure and deterministic, so re-running with the same message resumes the
/// same branch.
pub fn default_branch_name(message: &str) -> String {
    message.replace(' ', "-")
}

/// Per-run instructions shared by all repository pipelines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchPlan {
    /// Commit message for every file commit; also the pull request title
    pub commit_message: String,
    pub branch_name: String,
    pub pr_body: String,
}

impl PatchPlan {
    /// Plan whose branch name is derived from the message.
    pub fn new(commit_message: &str) -> Self {
        PatchPlan {
            commit_message: commit_message.to_string(),
            branch_name: default_branch_name(commit_message),
            pr_body: PROVENANCE_MARKER.to_string(),
        }
    }

    pub fn with_branch(mut self, branch_name: &str) -> Self {
        self.branch_name = branch_name.to_string();
        self
    }
}

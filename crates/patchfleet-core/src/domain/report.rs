//! Per-repository results and the fleet report that collects them.

use chrono::{DateTime, Utc};
use patchfleet_store::{Branch, CommitRef, PullRequest, RepoRef};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::error::ErrorKind;

/// How the work branch was obtained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BranchOutcome {
    /// Already existed; reused unchanged
    Found(Branch),
    /// Created from the default branch head
    Created(Branch),
    /// Dry run: would be created from `base_sha`
    Planned { name: String, base_sha: String },
}

impl BranchOutcome {
    pub fn name(&self) -> &str {
        match self {
            BranchOutcome::Found(b) | BranchOutcome::Created(b) => &b.name,
            BranchOutcome::Planned { name, .. } => name,
        }
    }
}

/// What happened to one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    Created { commit: CommitRef },
    Updated { commit: CommitRef },
    Deleted { commit: CommitRef },
    /// Content already matches the patched result; nothing written
    AlreadyApplied,
    /// Dry run: the patch applies; nothing written
    WouldWrite,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileReport {
    pub path: String,
    pub outcome: FileOutcome,
}

/// How the pull request was obtained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PullRequestOutcome {
    Opened(PullRequest),
    /// An open pull request for the same head and base already existed
    Reused(PullRequest),
}

impl PullRequestOutcome {
    pub fn pull_request(&self) -> &PullRequest {
        match self {
            PullRequestOutcome::Opened(pr) | PullRequestOutcome::Reused(pr) => pr,
        }
    }
}

/// Successful pipeline run for one repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryReport {
    pub repo: RepoRef,
    pub branch: BranchOutcome,
    pub files: Vec<FileReport>,
    /// `None` only in dry-run mode
    pub pull_request: Option<PullRequestOutcome>,
}

/// Outcome for one repository. Results are never merged across repositories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum PatchResult {
    Succeeded(RepositoryReport),
    Failed {
        repo: RepoRef,
        kind: ErrorKind,
        error: String,
    },
    /// The run was interrupted before this repository started
    Cancelled { repo: RepoRef },
}

impl PatchResult {
    pub fn repo(&self) -> &RepoRef {
        match self {
            PatchResult::Succeeded(report) => &report.repo,
            PatchResult::Failed { repo, .. } | PatchResult::Cancelled { repo } => repo,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, PatchResult::Failed { .. })
    }
}

/// Results of one fleet run, in selection order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetReport {
    pub run_id: Uuid,
    pub branch: String,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub results: Vec<PatchResult>,
}

impl FleetReport {
    pub fn succeeded(&self) -> usize {
        self.count(|r| matches!(r, PatchResult::Succeeded(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(PatchResult::is_failure)
    }

    pub fn cancelled(&self) -> usize {
        self.count(|r| matches!(r, PatchResult::Cancelled { .. }))
    }

    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }

    fn count(&self, pred: impl Fn(&PatchResult) -> bool) -> usize {
        self.results.iter().filter(|r| pred(r)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo(name: &str) -> RepoRef {
        RepoRef::new("acme", name, "main")
    }

    #[test]
    fn test_fleet_report_counts() {
        let report = FleetReport {
            run_id: Uuid::new_v4(),
            branch: "fix".into(),
            dry_run: false,
            started_at: Utc::now(),
            finished_at: Utc::now(),
            results: vec![
                PatchResult::Failed {
                    repo: repo("a"),
                    kind: ErrorKind::Conflict,
                    error: "stale".into(),
                },
                PatchResult::Cancelled { repo: repo("b") },
            ],
        };
        assert_eq!(report.succeeded(), 0);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.cancelled(), 1);
        assert!(report.has_failures());
        assert_eq!(report.results[1].repo().name, "b");
    }

    #[test]
    fn test_failed_result_serializes_kind() {
        let result = PatchResult::Failed {
            repo: repo("a"),
            kind: ErrorKind::NotFound,
            error: "bar.txt does not exist on branch fix".into(),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["result"], "failed");
        assert_eq!(json["kind"], "not_found");
        assert_eq!(json["repo"]["name"], "a");
    }
}

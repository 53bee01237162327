//! Structured observability hooks for fleet and repository lifecycle events.
//!
//! This module provides:
//! - a repository-scoped span for `tracing::Instrument`
//! - emission functions for key lifecycle events: fleet start/finish,
//!   repository start/finish/failure, branch resolution, file commits
//!
//! Events are emitted at `info!` level (failures at `warn!`), filtered via
//! `PATCHFLEET_LOG` or `RUST_LOG`.

use tracing::{info, warn, Span};

use crate::domain::{BranchOutcome, ErrorKind, FileOutcome};

/// Span tagging every event of one repository pipeline with the run id and
/// repository name. Attach with `.instrument(repo_span(..))`.
pub fn repo_span(run_id: &str, repo: &str) -> Span {
    tracing::info_span!("patchfleet.repo", run_id = %run_id, repo = %repo)
}

pub fn emit_fleet_started(run_id: &str, branch: &str, repos: usize, max_parallel: usize) {
    info!(
        event = "fleet.started",
        run_id = %run_id,
        branch = %branch,
        repos = repos,
        max_parallel = max_parallel,
    );
}

pub fn emit_repo_started(repo: &str, files: usize) {
    info!(event = "repo.started", repo = %repo, files = files);
}

pub fn emit_branch_resolved(repo: &str, outcome: &BranchOutcome) {
    let status = match outcome {
        BranchOutcome::Found(_) => "found",
        BranchOutcome::Created(_) => "created",
        BranchOutcome::Planned { .. } => "planned",
    };
    info!(event = "branch.resolved", repo = %repo, branch = %outcome.name(), status = status);
}

/// Emit event: one file written (or recognised as already patched).
pub fn emit_file_committed(repo: &str, path: &str, outcome: &FileOutcome) {
    let (status, sha) = match outcome {
        FileOutcome::Created { commit } => ("created", Some(commit.sha.as_str())),
        FileOutcome::Updated { commit } => ("updated", Some(commit.sha.as_str())),
        FileOutcome::Deleted { commit } => ("deleted", Some(commit.sha.as_str())),
        FileOutcome::AlreadyApplied => ("already_applied", None),
        FileOutcome::WouldWrite => ("would_write", None),
    };
    info!(
        event = "file.committed",
        repo = %repo,
        path = %path,
        status = status,
        commit = sha.unwrap_or("-"),
    );
}

pub fn emit_repo_finished(repo: &str, duration_ms: u64, pull_request: Option<&str>) {
    info!(
        event = "repo.finished",
        repo = %repo,
        duration_ms = duration_ms,
        pull_request = pull_request.unwrap_or("-"),
    );
}

pub fn emit_repo_failed(repo: &str, kind: ErrorKind, error: &dyn std::fmt::Display) {
    warn!(event = "repo.failed", repo = %repo, kind = %kind, error = %error);
}

pub fn emit_fleet_finished(
    run_id: &str,
    duration_ms: u64,
    succeeded: usize,
    failed: usize,
    cancelled: usize,
) {
    info!(
        event = "fleet.finished",
        run_id = %run_id,
        duration_ms = duration_ms,
        succeeded = succeeded,
        failed = failed,
        cancelled = cancelled,
    );
}

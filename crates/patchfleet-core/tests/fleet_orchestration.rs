//! Integration tests for fleet orchestration.
//!
//! Covered:
//! - one failing repository does not affect the others
//! - results keep selection order, sequential or parallel
//! - cancellation stops repositories that have not started
//! - the report serializes for `--report`

use std::sync::Arc;

use async_trait::async_trait;
use patchfleet_core::domain::{ErrorKind, PatchPlan, PatchResult};
use patchfleet_core::orchestrator::{CancelFlag, FleetOptions, FleetOrchestrator};
use patchfleet_core::parse_unified_diff;
use patchfleet_store::fakes::{MemoryHost, Operation};
use patchfleet_store::storage_traits::*;
use patchfleet_store::RemoteHost;

const FIX_BAR: &str = "--- a/bar.txt\n+++ b/bar.txt\n@@ -1,3 +1,3 @@\n x\n-y\n+Y\n z\n";

fn repos() -> Vec<RepoRef> {
    vec![
        RepoRef::new("acme", "alpha", "main"),
        RepoRef::new("acme", "beta", "master"),
        RepoRef::new("acme", "gamma", "main"),
    ]
}

/// Every repository has bar.txt except `beta`.
fn fleet_host() -> Arc<MemoryHost> {
    let host = MemoryHost::new();
    for repo in repos() {
        host.add_repository(repo.clone());
        if repo.name != "beta" {
            host.put_file(&repo, &repo.default_branch, "bar.txt", b"x\ny\nz");
        }
    }
    Arc::new(host)
}

fn names(results: &[PatchResult]) -> Vec<String> {
    results.iter().map(|r| r.repo().name.clone()).collect()
}

#[tokio::test]
async fn failures_are_isolated_per_repository() {
    let host = fleet_host();
    let diff = parse_unified_diff(FIX_BAR).unwrap();
    let orchestrator = FleetOrchestrator::new(host.clone(), FleetOptions::default());

    let report = orchestrator
        .run(&repos(), &diff, &PatchPlan::new("Fix bar"))
        .await;

    assert_eq!(names(&report.results), vec!["alpha", "beta", "gamma"]);
    assert!(matches!(report.results[0], PatchResult::Succeeded(_)));
    match &report.results[1] {
        PatchResult::Failed { kind, error, .. } => {
            assert_eq!(*kind, ErrorKind::NotFound);
            assert!(error.contains("bar.txt"), "{error}");
        }
        other => panic!("expected beta to fail, got {other:?}"),
    }
    assert!(matches!(report.results[2], PatchResult::Succeeded(_)));
    assert_eq!(report.succeeded(), 2);
    assert_eq!(report.failed(), 1);
    assert!(report.has_failures());

    let gamma = RepoRef::new("acme", "gamma", "main");
    assert_eq!(
        host.file_content(&gamma, "Fix-bar", "bar.txt").unwrap(),
        b"x\nY\nz"
    );
}

#[tokio::test]
async fn parallel_run_keeps_selection_order() {
    let host = fleet_host();
    let diff = parse_unified_diff(FIX_BAR).unwrap();
    let options = FleetOptions {
        max_parallel: 3,
        ..FleetOptions::default()
    };

    let report = FleetOrchestrator::new(host.clone(), options)
        .run(&repos(), &diff, &PatchPlan::new("Fix bar"))
        .await;

    assert_eq!(names(&report.results), vec!["alpha", "beta", "gamma"]);
    assert_eq!(report.succeeded(), 2);
    assert_eq!(host.call_count(Operation::CreatePullRequest), 2);
}

#[tokio::test]
async fn cancelled_before_start_touches_nothing() {
    let host = fleet_host();
    host.clear_calls();
    let diff = parse_unified_diff(FIX_BAR).unwrap();
    let cancel = CancelFlag::new();
    cancel.cancel();

    let report = FleetOrchestrator::new(host.clone(), FleetOptions::default())
        .with_cancel_flag(cancel)
        .run(&repos(), &diff, &PatchPlan::new("Fix bar"))
        .await;

    assert_eq!(report.cancelled(), 3);
    assert!(!report.has_failures());
    assert!(host.calls().is_empty());
}

/// Cancels the run as soon as the first pull request is opened.
struct CancelAfterFirstPr {
    inner: Arc<MemoryHost>,
    cancel: CancelFlag,
}

#[async_trait]
impl RepositorySearch for CancelAfterFirstPr {
    async fn search_repositories(&self, query: &str, limit: u32) -> StoreResult<Vec<RepoRef>> {
        self.inner.search_repositories(query, limit).await
    }
}

#[async_trait]
impl BranchStore for CancelAfterFirstPr {
    async fn get_branch(&self, repo: &RepoRef, name: &str) -> StoreResult<Branch> {
        self.inner.get_branch(repo, name).await
    }

    async fn create_branch_ref(&self, repo: &RepoRef, name: &str, sha: &str) -> StoreResult<()> {
        self.inner.create_branch_ref(repo, name, sha).await
    }
}

#[async_trait]
impl ContentStore for CancelAfterFirstPr {
    async fn read_file(
        &self,
        repo: &RepoRef,
        branch: &str,
        path: &str,
    ) -> StoreResult<Option<RemoteFile>> {
        self.inner.read_file(repo, branch, path).await
    }

    async fn create_file(
        &self,
        repo: &RepoRef,
        target: FileTarget<'_>,
        content: &[u8],
    ) -> StoreResult<CommitRef> {
        self.inner.create_file(repo, target, content).await
    }

    async fn update_file(
        &self,
        repo: &RepoRef,
        target: FileTarget<'_>,
        content: &[u8],
        version: &VersionToken,
    ) -> StoreResult<CommitRef> {
        self.inner.update_file(repo, target, content, version).await
    }

    async fn delete_file(
        &self,
        repo: &RepoRef,
        target: FileTarget<'_>,
        version: &VersionToken,
    ) -> StoreResult<CommitRef> {
        self.inner.delete_file(repo, target, version).await
    }
}

#[async_trait]
impl PullRequestStore for CancelAfterFirstPr {
    async fn create_pull_request(
        &self,
        repo: &RepoRef,
        request: &NewPullRequest,
    ) -> StoreResult<PullRequest> {
        let pr = self.inner.create_pull_request(repo, request).await;
        self.cancel.cancel();
        pr
    }

    async fn find_open_pull_request(
        &self,
        repo: &RepoRef,
        head: &str,
        base: &str,
    ) -> StoreResult<Option<PullRequest>> {
        self.inner.find_open_pull_request(repo, head, base).await
    }
}

#[tokio::test]
async fn cancellation_mid_run_stops_unstarted_repositories() {
    let inner = fleet_host();
    let cancel = CancelFlag::new();
    let host = Arc::new(CancelAfterFirstPr {
        inner: inner.clone(),
        cancel: cancel.clone(),
    });
    let diff = parse_unified_diff(FIX_BAR).unwrap();

    let report = FleetOrchestrator::new(host, FleetOptions::default())
        .with_cancel_flag(cancel)
        .run(&repos(), &diff, &PatchPlan::new("Fix bar"))
        .await;

    assert!(matches!(report.results[0], PatchResult::Succeeded(_)));
    assert!(matches!(report.results[1], PatchResult::Cancelled { .. }));
    assert!(matches!(report.results[2], PatchResult::Cancelled { .. }));
    assert_eq!(inner.pull_requests(&repos()[0]).len(), 1);
    assert!(inner.pull_requests(&repos()[2]).is_empty());
}

#[tokio::test]
async fn works_through_a_trait_object() {
    let host: Arc<dyn RemoteHost> = fleet_host();
    let diff = parse_unified_diff(FIX_BAR).unwrap();

    let report = FleetOrchestrator::new(host, FleetOptions::default())
        .run(&repos()[..1], &diff, &PatchPlan::new("Fix bar"))
        .await;
    assert_eq!(report.succeeded(), 1);
}

#[tokio::test]
async fn report_serializes_to_json() {
    let host = fleet_host();
    let diff = parse_unified_diff(FIX_BAR).unwrap();

    let report = FleetOrchestrator::new(host, FleetOptions::default())
        .run(&repos(), &diff, &PatchPlan::new("Fix bar"))
        .await;
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["branch"], "Fix-bar");
    assert_eq!(json["results"].as_array().unwrap().len(), 3);
    assert_eq!(json["results"][0]["result"], "succeeded");
    assert_eq!(json["results"][1]["result"], "failed");
    assert_eq!(json["results"][1]["kind"], "not_found");
}

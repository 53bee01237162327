//! Trait contract tests for RepositorySearch, BranchStore, ContentStore and
//! PullRequestStore.
//!
//! These tests verify the behavioral contracts of the remote host traits
//! using the in-memory fake. Any conforming implementation must pass these.

use patchfleet_store::fakes::{HostCall, MemoryHost, Operation};
use patchfleet_store::storage_traits::*;
use patchfleet_store::StoreError;

fn repo() -> RepoRef {
    RepoRef::new("acme", "widgets", "main")
}

fn host_with_repo() -> MemoryHost {
    let host = MemoryHost::new();
    host.add_repository(repo());
    host
}

fn target<'a>(branch: &'a str, path: &'a str) -> FileTarget<'a> {
    FileTarget {
        branch,
        path,
        message: "test commit",
    }
}

// ===========================================================================
// RepositorySearch contract tests
// ===========================================================================

#[tokio::test]
async fn search_filters_by_org_and_terms() {
    let host = MemoryHost::new();
    host.add_repository(RepoRef::new("acme", "svc-billing", "main"));
    host.add_repository(RepoRef::new("acme", "svc-auth", "master"));
    host.add_repository(RepoRef::new("acme", "docs", "main"));
    host.add_repository(RepoRef::new("other", "svc-billing", "main"));

    let found = host.search_repositories("org:acme svc", 30).await.unwrap();
    let names: Vec<_> = found.iter().map(|r| r.full_name()).collect();
    assert_eq!(names, vec!["acme/svc-auth", "acme/svc-billing"]);
}

#[tokio::test]
async fn search_respects_limit() {
    let host = MemoryHost::new();
    for i in 0..5 {
        host.add_repository(RepoRef::new("acme", &format!("repo-{i}"), "main"));
    }
    let found = host.search_repositories("org:acme", 2).await.unwrap();
    assert_eq!(found.len(), 2);
}

// ===========================================================================
// BranchStore contract tests
// ===========================================================================

#[tokio::test]
async fn get_missing_branch_is_not_found() {
    let host = host_with_repo();
    let err = host.get_branch(&repo(), "feature").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn create_branch_ref_points_at_base_commit() {
    let host = host_with_repo();
    host.put_file(&repo(), "main", "README.md", b"hello");
    let main = host.get_branch(&repo(), "main").await.unwrap();

    host.create_branch_ref(&repo(), "feature", &main.head_sha)
        .await
        .unwrap();
    let feature = host.get_branch(&repo(), "feature").await.unwrap();

    assert_eq!(feature.head_sha, main.head_sha);
    assert_eq!(
        host.file_content(&repo(), "feature", "README.md").as_deref(),
        Some(&b"hello"[..])
    );
}

#[tokio::test]
async fn create_existing_branch_ref_conflicts() {
    let host = host_with_repo();
    let main = host.get_branch(&repo(), "main").await.unwrap();
    let err = host
        .create_branch_ref(&repo(), "main", &main.head_sha)
        .await
        .unwrap_err();
    assert!(err.is_conflict());
}

// ===========================================================================
// ContentStore contract tests
// ===========================================================================

#[tokio::test]
async fn read_missing_file_is_none() {
    let host = host_with_repo();
    let file = host.read_file(&repo(), "main", "nope.txt").await.unwrap();
    assert!(file.is_none());
}

#[tokio::test]
async fn create_then_read_round_trip() {
    let host = host_with_repo();
    host.create_file(&repo(), target("main", "foo.txt"), b"a\nb")
        .await
        .unwrap();
    let file = host
        .read_file(&repo(), "main", "foo.txt")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(file.content, b"a\nb");
    assert_eq!(file.version, VersionToken::for_content(b"a\nb"));
}

#[tokio::test]
async fn create_existing_path_conflicts() {
    let host = host_with_repo();
    host.put_file(&repo(), "main", "foo.txt", b"already here");
    let err = host
        .create_file(&repo(), target("main", "foo.txt"), b"new")
        .await
        .unwrap_err();
    assert!(err.is_conflict());
    assert_eq!(
        host.file_content(&repo(), "main", "foo.txt").as_deref(),
        Some(&b"already here"[..])
    );
}

#[tokio::test]
async fn update_with_current_token_succeeds() {
    let host = host_with_repo();
    let token = host.put_file(&repo(), "main", "bar.txt", b"x\ny\nz");
    host.update_file(&repo(), target("main", "bar.txt"), b"x\nY\nz", &token)
        .await
        .unwrap();
    assert_eq!(
        host.file_content(&repo(), "main", "bar.txt").as_deref(),
        Some(&b"x\nY\nz"[..])
    );
}

#[tokio::test]
async fn update_with_stale_token_conflicts_and_leaves_content() {
    let host = host_with_repo();
    let stale = host.put_file(&repo(), "main", "bar.txt", b"x\ny\nz");
    host.put_file(&repo(), "main", "bar.txt", b"x\ny\nz\nconcurrent");

    let err = host
        .update_file(&repo(), target("main", "bar.txt"), b"x\nY\nz", &stale)
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::Conflict { .. }));
    assert_eq!(
        host.file_content(&repo(), "main", "bar.txt").as_deref(),
        Some(&b"x\ny\nz\nconcurrent"[..])
    );
}

#[tokio::test]
async fn update_missing_file_is_not_found() {
    let host = host_with_repo();
    let err = host
        .update_file(
            &repo(),
            target("main", "ghost.txt"),
            b"",
            &VersionToken::new("T1"),
        )
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn delete_removes_file_with_current_token() {
    let host = host_with_repo();
    let token = host.put_file(&repo(), "main", "old.txt", b"bye");
    host.delete_file(&repo(), target("main", "old.txt"), &token)
        .await
        .unwrap();
    assert!(host.file_content(&repo(), "main", "old.txt").is_none());
}

#[tokio::test]
async fn delete_with_stale_token_conflicts() {
    let host = host_with_repo();
    let stale = host.put_file(&repo(), "main", "old.txt", b"bye");
    host.put_file(&repo(), "main", "old.txt", b"still here");
    let err = host
        .delete_file(&repo(), target("main", "old.txt"), &stale)
        .await
        .unwrap_err();
    assert!(err.is_conflict());
    assert!(host.file_content(&repo(), "main", "old.txt").is_some());
}

#[tokio::test]
async fn writes_advance_branch_head() {
    let host = host_with_repo();
    let before = host.branch_head(&repo(), "main").unwrap();
    let commit = host
        .create_file(&repo(), target("main", "new.txt"), b"1")
        .await
        .unwrap();
    assert_ne!(commit.sha, before);
    assert_eq!(host.branch_head(&repo(), "main").unwrap(), commit.sha);
}

// ===========================================================================
// PullRequestStore contract tests
// ===========================================================================

fn pr_request(head: &str) -> NewPullRequest {
    NewPullRequest {
        title: "Fix typo".to_string(),
        head: head.to_string(),
        base: "main".to_string(),
        body: "Automated".to_string(),
    }
}

#[tokio::test]
async fn duplicate_pull_request_conflicts() {
    let host = host_with_repo();
    let main = host.get_branch(&repo(), "main").await.unwrap();
    host.create_branch_ref(&repo(), "fix", &main.head_sha)
        .await
        .unwrap();

    let first = host
        .create_pull_request(&repo(), &pr_request("fix"))
        .await
        .unwrap();
    assert_eq!(first.number, 1);

    let err = host
        .create_pull_request(&repo(), &pr_request("fix"))
        .await
        .unwrap_err();
    assert!(err.is_conflict());

    let found = host
        .find_open_pull_request(&repo(), "fix", "main")
        .await
        .unwrap();
    assert_eq!(found, Some(first));
}

#[tokio::test]
async fn pull_request_requires_existing_head() {
    let host = host_with_repo();
    let err = host
        .create_pull_request(&repo(), &pr_request("missing"))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Api { status: 422, .. }));
}

// ===========================================================================
// Fake bookkeeping
// ===========================================================================

#[tokio::test]
async fn injected_failure_fires_once() {
    let host = host_with_repo();
    host.fail_next(Operation::GetBranch, StoreError::RateLimited("slow down".into()));

    let err = host.get_branch(&repo(), "main").await.unwrap_err();
    assert!(matches!(err, StoreError::RateLimited(_)));
    assert!(host.get_branch(&repo(), "main").await.is_ok());
    assert_eq!(host.call_count(Operation::GetBranch), 2);
}

#[tokio::test]
async fn journal_records_mutations() {
    let host = host_with_repo();
    host.read_file(&repo(), "main", "a.txt").await.unwrap();
    host.create_file(&repo(), target("main", "a.txt"), b"a")
        .await
        .unwrap();

    let calls = host.calls();
    assert_eq!(calls.len(), 2);
    assert!(!calls[0].is_mutation());
    assert!(matches!(
        &calls[1],
        HostCall::CreateFile { path, content, .. } if path == "a.txt" && content == b"a"
    ));
}

//! GitHub REST v3 request and response bodies
//!
//! Only the fields patchfleet reads are modelled; everything else in the
//! responses is ignored by serde.

use patchfleet_store::{Branch, CommitRef, PullRequest, RepoRef};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchResponse {
    pub items: Vec<RepositoryItem>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RepositoryItem {
    pub name: String,
    pub owner: OwnerItem,
    pub default_branch: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OwnerItem {
    pub login: String,
}

impl From<RepositoryItem> for RepoRef {
    fn from(item: RepositoryItem) -> Self {
        RepoRef {
            owner: item.owner.login,
            name: item.name,
            default_branch: item.default_branch,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct BranchResponse {
    pub name: String,
    pub commit: ShaItem,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ShaItem {
    pub sha: String,
}

impl From<BranchResponse> for Branch {
    fn from(resp: BranchResponse) -> Self {
        Branch {
            name: resp.name,
            head_sha: resp.commit.sha,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateRefRequest<'a> {
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub sha: &'a str,
}

/// `GET /repos/{owner}/{repo}/contents/{path}` for a single file.
#[derive(Debug, Deserialize)]
pub(crate) struct ContentResponse {
    #[serde(rename = "type")]
    pub kind: String,
    pub path: String,
    pub sha: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub encoding: Option<String>,
}

/// Body for `PUT` (create/update) and `DELETE` on the contents endpoint.
#[derive(Debug, Serialize)]
pub(crate) struct ContentWriteRequest<'a> {
    pub message: &'a str,
    pub branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ContentWriteResponse {
    pub commit: CommitItem,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CommitItem {
    pub sha: String,
    #[serde(default)]
    pub html_url: Option<String>,
}

impl From<ContentWriteResponse> for CommitRef {
    fn from(resp: ContentWriteResponse) -> Self {
        CommitRef {
            sha: resp.commit.sha,
            url: resp.commit.html_url,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct PullResponse {
    pub number: u64,
    pub html_url: String,
    pub head: PullRefItem,
    pub base: PullRefItem,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PullRefItem {
    #[serde(rename = "ref")]
    pub git_ref: String,
}

impl From<PullResponse> for PullRequest {
    fn from(resp: PullResponse) -> Self {
        PullRequest {
            number: resp.number,
            url: resp.html_url,
            head: resp.head.git_ref,
            base: resp.base.git_ref,
        }
    }
}

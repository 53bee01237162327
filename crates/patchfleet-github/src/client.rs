//! GitHub REST client
//!
//! Implements the patchfleet remote host traits on top of the GitHub v3 API.
//! Every request carries the configured deadline; nothing is retried here.

use async_trait::async_trait;
use patchfleet_store::encoding;
use patchfleet_store::{
    Branch, BranchStore, CommitRef, ContentStore, FileTarget, NewPullRequest, PullRequest,
    PullRequestStore, RemoteFile, RepoRef, RepositorySearch, StoreError, StoreResult,
    VersionToken,
};
use reqwest::header::ACCEPT;
use reqwest::{RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::api::*;
use crate::config::GithubConfig;
use crate::error::{status_error, transport_error, GithubError};

const API_VERSION: &str = "2022-11-28";
const MEDIA_TYPE: &str = "application/vnd.github+json";
/// GitHub caps `per_page` at 100
const MAX_PAGE_SIZE: u32 = 100;

/// GitHub API client.
///
/// Owns the HTTP connection pool; dropping the client releases it, whichever
/// way the owning scope is left.
pub struct GithubClient {
    config: GithubConfig,
    base: Url,
    http: reqwest::Client,
}

impl GithubClient {
    /// Create a new GitHub client
    pub fn new(config: GithubConfig) -> Result<Self, GithubError> {
        let base = Url::parse(&config.api_url).map_err(|e| GithubError::InvalidApiUrl {
            url: config.api_url.clone(),
            reason: e.to_string(),
        })?;
        if base.cannot_be_a_base() {
            return Err(GithubError::InvalidApiUrl {
                url: config.api_url.clone(),
                reason: "URL cannot carry path segments".to_string(),
            });
        }

        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout)
            .build()?;

        debug!(api_url = %config.api_url, timeout = ?config.timeout, "GitHub client ready");
        Ok(GithubClient { config, base, http })
    }

    pub fn config(&self) -> &GithubConfig {
        &self.config
    }

    /// Build an API URL from path segments; segments containing `/` are split
    /// so each component is percent-encoded on its own.
    fn url(&self, segments: &[&str]) -> StoreResult<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::Transport(format!("{} cannot be a base URL", self.base)))?
            .pop_if_empty()
            .extend(
                segments
                    .iter()
                    .flat_map(|s| s.split('/'))
                    .filter(|s| !s.is_empty()),
            );
        Ok(url)
    }

    fn repo_url(&self, repo: &RepoRef, rest: &[&str]) -> StoreResult<Url> {
        let mut segments = vec!["repos", repo.owner.as_str(), repo.name.as_str()];
        segments.extend_from_slice(rest);
        self.url(&segments)
    }

    async fn execute(&self, request: RequestBuilder, what: &str) -> StoreResult<Response> {
        let response = request
            .bearer_auth(&self.config.token)
            .header(ACCEPT, MEDIA_TYPE)
            .header("X-GitHub-Api-Version", API_VERSION)
            .send()
            .await
            .map_err(|e| transport_error(e, what))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let exhausted = response
            .headers()
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok())
            == Some("0");
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorBody>(&body)
            .map(|b| b.message)
            .unwrap_or(body);
        if exhausted {
            warn!(what, "GitHub rate limit exhausted");
        }
        Err(status_error(status.as_u16(), exhausted, what, message))
    }

    async fn json<T: DeserializeOwned>(&self, request: RequestBuilder, what: &str) -> StoreResult<T> {
        self.execute(request, what)
            .await?
            .json::<T>()
            .await
            .map_err(|e| transport_error(e, what))
    }
}

impl Drop for GithubClient {
    fn drop(&mut self) {
        debug!(api_url = %self.config.api_url, "releasing HTTP connection pool");
    }
}

fn file_resource(repo: &RepoRef, branch: &str, path: &str) -> String {
    format!("{}@{}:{}", repo.full_name(), branch, path)
}

#[async_trait]
impl RepositorySearch for GithubClient {
    async fn search_repositories(&self, query: &str, limit: u32) -> StoreResult<Vec<RepoRef>> {
        let per_page = limit.clamp(1, MAX_PAGE_SIZE);
        let mut repos: Vec<RepoRef> = Vec::new();
        let mut page = 1u32;

        while (repos.len() as u32) < limit {
            let mut url = self.url(&["search", "repositories"])?;
            url.query_pairs_mut()
                .append_pair("q", query)
                .append_pair("per_page", &per_page.to_string())
                .append_pair("page", &page.to_string());

            let resp: SearchResponse = self.json(self.http.get(url), "repository search").await?;
            let fetched = resp.items.len();
            repos.extend(resp.items.into_iter().map(RepoRef::from));
            debug!(page, fetched, "search page received");

            if fetched < per_page as usize {
                break;
            }
            page += 1;
        }

        repos.truncate(limit as usize);
        Ok(repos)
    }
}

#[async_trait]
impl BranchStore for GithubClient {
    async fn get_branch(&self, repo: &RepoRef, name: &str) -> StoreResult<Branch> {
        let url = self.repo_url(repo, &["branches", name])?;
        let what = format!("{} branch {}", repo.full_name(), name);
        let resp: BranchResponse = self.json(self.http.get(url), &what).await?;
        Ok(resp.into())
    }

    async fn create_branch_ref(&self, repo: &RepoRef, name: &str, sha: &str) -> StoreResult<()> {
        let url = self.repo_url(repo, &["git", "refs"])?;
        let body = CreateRefRequest {
            git_ref: format!("refs/heads/{name}"),
            sha,
        };
        let what = format!("{} refs/heads/{}", repo.full_name(), name);
        self.execute(self.http.post(url).json(&body), &what).await?;
        Ok(())
    }
}

#[async_trait]
impl ContentStore for GithubClient {
    async fn read_file(
        &self,
        repo: &RepoRef,
        branch: &str,
        path: &str,
    ) -> StoreResult<Option<RemoteFile>> {
        let mut url = self.repo_url(repo, &["contents", path])?;
        url.query_pairs_mut().append_pair("ref", branch);
        let what = file_resource(repo, branch, path);

        let value: serde_json::Value = match self.json(self.http.get(url), &what).await {
            Ok(value) => value,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e),
        };
        if value.is_array() {
            return Err(StoreError::Decode(format!("{what} is a directory")));
        }

        let resp: ContentResponse = serde_json::from_value(value)?;
        if resp.kind != "file" {
            return Err(StoreError::Decode(format!("{what} is a {}", resp.kind)));
        }
        let content = match (resp.encoding.as_deref(), resp.content.as_deref()) {
            (Some("base64"), Some(body)) => encoding::decode(body)?,
            (encoding, _) => {
                return Err(StoreError::Unsupported(format!(
                    "{what}: content encoding {encoding:?} (file too large for the contents API)"
                )))
            }
        };

        Ok(Some(RemoteFile {
            path: resp.path,
            content,
            version: VersionToken::new(resp.sha),
        }))
    }

    async fn create_file(
        &self,
        repo: &RepoRef,
        target: FileTarget<'_>,
        content: &[u8],
    ) -> StoreResult<CommitRef> {
        let url = self.repo_url(repo, &["contents", target.path])?;
        let body = ContentWriteRequest {
            message: target.message,
            branch: target.branch,
            content: Some(encoding::encode(content)),
            sha: None,
        };
        let what = file_resource(repo, target.branch, target.path);
        let resp: ContentWriteResponse = self.json(self.http.put(url).json(&body), &what).await?;
        Ok(resp.into())
    }

    async fn update_file(
        &self,
        repo: &RepoRef,
        target: FileTarget<'_>,
        content: &[u8],
        version: &VersionToken,
    ) -> StoreResult<CommitRef> {
        let url = self.repo_url(repo, &["contents", target.path])?;
        let body = ContentWriteRequest {
            message: target.message,
            branch: target.branch,
            content: Some(encoding::encode(content)),
            sha: Some(version.as_str()),
        };
        let what = file_resource(repo, target.branch, target.path);
        let resp: ContentWriteResponse = self.json(self.http.put(url).json(&body), &what).await?;
        Ok(resp.into())
    }

    async fn delete_file(
        &self,
        repo: &RepoRef,
        target: FileTarget<'_>,
        version: &VersionToken,
    ) -> StoreResult<CommitRef> {
        let url = self.repo_url(repo, &["contents", target.path])?;
        let body = ContentWriteRequest {
            message: target.message,
            branch: target.branch,
            content: None,
            sha: Some(version.as_str()),
        };
        let what = file_resource(repo, target.branch, target.path);
        let resp: ContentWriteResponse =
            self.json(self.http.delete(url).json(&body), &what).await?;
        Ok(resp.into())
    }
}

#[async_trait]
impl PullRequestStore for GithubClient {
    async fn create_pull_request(
        &self,
        repo: &RepoRef,
        request: &NewPullRequest,
    ) -> StoreResult<PullRequest> {
        let url = self.repo_url(repo, &["pulls"])?;
        let what = format!("{} pull request {}", repo.full_name(), request.head);
        let resp: PullResponse = self.json(self.http.post(url).json(request), &what).await?;
        Ok(resp.into())
    }

    async fn find_open_pull_request(
        &self,
        repo: &RepoRef,
        head: &str,
        base: &str,
    ) -> StoreResult<Option<PullRequest>> {
        let mut url = self.repo_url(repo, &["pulls"])?;
        url.query_pairs_mut()
            .append_pair("state", "open")
            .append_pair("head", &format!("{}:{}", repo.owner, head))
            .append_pair("base", base);
        let what = format!("{} open pull requests for {}", repo.full_name(), head);
        let pulls: Vec<PullResponse> = self.json(self.http.get(url), &what).await?;
        Ok(pulls.into_iter().next().map(PullRequest::from))
    }
}

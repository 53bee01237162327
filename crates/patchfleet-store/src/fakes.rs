//! In-memory fake remote host (testing only)
//!
//! `MemoryHost` satisfies the `RemoteHost` trait contracts without any
//! network access. File bodies are kept in their wire form (base64 wrapped at
//! 60 columns) so reads go through the same decode path a real host needs.
//! Every call is journaled for assertions, and one-shot failures can be
//! injected per operation.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::encoding;
use crate::error::StoreError;
use crate::storage_traits::*;

/// Remote operations, used to select injected failures and count calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Search,
    GetBranch,
    CreateBranchRef,
    ReadFile,
    CreateFile,
    UpdateFile,
    DeleteFile,
    CreatePullRequest,
    FindPullRequest,
}

/// One journaled call against the fake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    Search {
        query: String,
        limit: u32,
    },
    GetBranch {
        repo: String,
        name: String,
    },
    CreateBranchRef {
        repo: String,
        name: String,
        sha: String,
    },
    ReadFile {
        repo: String,
        branch: String,
        path: String,
    },
    CreateFile {
        repo: String,
        branch: String,
        path: String,
        content: Vec<u8>,
    },
    UpdateFile {
        repo: String,
        branch: String,
        path: String,
        content: Vec<u8>,
        version: VersionToken,
    },
    DeleteFile {
        repo: String,
        branch: String,
        path: String,
        version: VersionToken,
    },
    CreatePullRequest {
        repo: String,
        request: NewPullRequest,
    },
    FindPullRequest {
        repo: String,
        head: String,
        base: String,
    },
}

impl HostCall {
    pub fn operation(&self) -> Operation {
        match self {
            HostCall::Search { .. } => Operation::Search,
            HostCall::GetBranch { .. } => Operation::GetBranch,
            HostCall::CreateBranchRef { .. } => Operation::CreateBranchRef,
            HostCall::ReadFile { .. } => Operation::ReadFile,
            HostCall::CreateFile { .. } => Operation::CreateFile,
            HostCall::UpdateFile { .. } => Operation::UpdateFile,
            HostCall::DeleteFile { .. } => Operation::DeleteFile,
            HostCall::CreatePullRequest { .. } => Operation::CreatePullRequest,
            HostCall::FindPullRequest { .. } => Operation::FindPullRequest,
        }
    }

    /// `true` for calls that change remote state.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self.operation(),
            Operation::CreateBranchRef
                | Operation::CreateFile
                | Operation::UpdateFile
                | Operation::DeleteFile
                | Operation::CreatePullRequest
        )
    }
}

#[derive(Debug, Clone)]
struct StoredFile {
    /// Wire form: base64 wrapped at `encoding::WRAP_WIDTH`
    encoded: String,
    version: VersionToken,
}

#[derive(Debug, Clone, Default)]
struct BranchState {
    head_sha: String,
    files: BTreeMap<String, StoredFile>,
}

#[derive(Debug)]
struct RepoState {
    repo: RepoRef,
    branches: BTreeMap<String, BranchState>,
    pulls: Vec<PullRequest>,
}

#[derive(Debug, Default)]
struct HostState {
    repos: BTreeMap<String, RepoState>,
    commits: u64,
}

impl HostState {
    fn repo_mut(&mut self, repo: &RepoRef) -> StoreResult<&mut RepoState> {
        self.repos
            .get_mut(&repo.full_name())
            .ok_or_else(|| StoreError::not_found(format!("repository {}", repo.full_name())))
    }

    fn next_commit(&mut self, parent: &str, detail: &str) -> String {
        self.commits += 1;
        let mut hasher = Sha256::new();
        hasher.update(parent.as_bytes());
        hasher.update(detail.as_bytes());
        hasher.update(self.commits.to_be_bytes());
        hex::encode(hasher.finalize())
    }
}

/// In-memory remote host.
#[derive(Debug, Default)]
pub struct MemoryHost {
    state: Mutex<HostState>,
    calls: Mutex<Vec<HostCall>>,
    failures: Mutex<HashMap<Operation, StoreError>>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a repository with an empty default branch.
    pub fn add_repository(&self, repo: RepoRef) {
        let mut state = self.state.lock().unwrap();
        let head_sha = state.next_commit("", &format!("init {}", repo.full_name()));
        let mut branches = BTreeMap::new();
        branches.insert(
            repo.default_branch.clone(),
            BranchState {
                head_sha,
                files: BTreeMap::new(),
            },
        );
        state.repos.insert(
            repo.full_name(),
            RepoState {
                repo,
                branches,
                pulls: Vec::new(),
            },
        );
    }

    /// Write a file directly, bypassing version checks (simulates another
    /// writer). Returns the new version token.
    pub fn put_file(&self, repo: &RepoRef, branch: &str, path: &str, content: &[u8]) -> VersionToken {
        let mut state = self.state.lock().unwrap();
        let sha = {
            let parent = state
                .repos
                .get(&repo.full_name())
                .and_then(|r| r.branches.get(branch))
                .map(|b| b.head_sha.clone())
                .unwrap_or_default();
            state.next_commit(&parent, path)
        };
        let repo_state = state
            .repos
            .get_mut(&repo.full_name())
            .expect("repository registered");
        let branch_state = repo_state.branches.entry(branch.to_string()).or_default();
        let version = VersionToken::for_content(content);
        branch_state.files.insert(
            path.to_string(),
            StoredFile {
                encoded: encoding::wrap(&encoding::encode(content), encoding::WRAP_WIDTH),
                version: version.clone(),
            },
        );
        branch_state.head_sha = sha;
        version
    }

    /// Decoded content of `path` on `branch`, if present.
    pub fn file_content(&self, repo: &RepoRef, branch: &str, path: &str) -> Option<Vec<u8>> {
        let state = self.state.lock().unwrap();
        state
            .repos
            .get(&repo.full_name())?
            .branches
            .get(branch)?
            .files
            .get(path)
            .map(|f| encoding::decode(&f.encoded).expect("fake stores valid base64"))
    }

    pub fn branch_names(&self, repo: &RepoRef) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state
            .repos
            .get(&repo.full_name())
            .map(|r| r.branches.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn branch_head(&self, repo: &RepoRef, branch: &str) -> Option<String> {
        let state = self.state.lock().unwrap();
        state
            .repos
            .get(&repo.full_name())?
            .branches
            .get(branch)
            .map(|b| b.head_sha.clone())
    }

    pub fn pull_requests(&self, repo: &RepoRef) -> Vec<PullRequest> {
        let state = self.state.lock().unwrap();
        state
            .repos
            .get(&repo.full_name())
            .map(|r| r.pulls.clone())
            .unwrap_or_default()
    }

    /// Make the next call of `op` fail with `err`.
    pub fn fail_next(&self, op: Operation, err: StoreError) {
        self.failures.lock().unwrap().insert(op, err);
    }

    /// All calls so far, in order.
    pub fn calls(&self) -> Vec<HostCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, op: Operation) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.operation() == op)
            .count()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn record(&self, call: HostCall) -> StoreResult<()> {
        let op = call.operation();
        self.calls.lock().unwrap().push(call);
        match self.failures.lock().unwrap().remove(&op) {
            Some(err) => {
                tracing::debug!(operation = ?op, error = %err, "injected failure");
                Err(err)
            }
            None => Ok(()),
        }
    }
}

fn resource(repo: &RepoRef, branch: &str, path: &str) -> String {
    format!("{}@{}:{}", repo.full_name(), branch, path)
}

#[async_trait]
impl RepositorySearch for MemoryHost {
    async fn search_repositories(&self, query: &str, limit: u32) -> StoreResult<Vec<RepoRef>> {
        self.record(HostCall::Search {
            query: query.to_string(),
            limit,
        })?;

        let mut owner = None;
        let mut terms = Vec::new();
        for word in query.split_whitespace() {
            match word.strip_prefix("org:") {
                Some(org) => owner = Some(org),
                None => terms.push(word),
            }
        }

        let state = self.state.lock().unwrap();
        Ok(state
            .repos
            .values()
            .map(|r| &r.repo)
            .filter(|r| owner.is_none_or(|o| r.owner == o))
            .filter(|r| terms.iter().all(|t| r.name.contains(t)))
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl BranchStore for MemoryHost {
    async fn get_branch(&self, repo: &RepoRef, name: &str) -> StoreResult<Branch> {
        self.record(HostCall::GetBranch {
            repo: repo.full_name(),
            name: name.to_string(),
        })?;
        let mut state = self.state.lock().unwrap();
        let repo_state = state.repo_mut(repo)?;
        repo_state
            .branches
            .get(name)
            .map(|b| Branch {
                name: name.to_string(),
                head_sha: b.head_sha.clone(),
            })
            .ok_or_else(|| StoreError::not_found(format!("branch {name}")))
    }

    async fn create_branch_ref(&self, repo: &RepoRef, name: &str, sha: &str) -> StoreResult<()> {
        self.record(HostCall::CreateBranchRef {
            repo: repo.full_name(),
            name: name.to_string(),
            sha: sha.to_string(),
        })?;
        let mut state = self.state.lock().unwrap();
        let repo_state = state.repo_mut(repo)?;
        if repo_state.branches.contains_key(name) {
            return Err(StoreError::conflict(
                format!("refs/heads/{name}"),
                "reference already exists",
            ));
        }
        let source = repo_state
            .branches
            .values()
            .find(|b| b.head_sha == sha)
            .cloned()
            .ok_or_else(|| StoreError::Api {
                status: 422,
                message: format!("object {sha} does not exist"),
            })?;
        repo_state.branches.insert(name.to_string(), source);
        Ok(())
    }
}

#[async_trait]
impl ContentStore for MemoryHost {
    async fn read_file(
        &self,
        repo: &RepoRef,
        branch: &str,
        path: &str,
    ) -> StoreResult<Option<RemoteFile>> {
        self.record(HostCall::ReadFile {
            repo: repo.full_name(),
            branch: branch.to_string(),
            path: path.to_string(),
        })?;
        let mut state = self.state.lock().unwrap();
        let repo_state = state.repo_mut(repo)?;
        let branch_state = repo_state
            .branches
            .get(branch)
            .ok_or_else(|| StoreError::not_found(format!("branch {branch}")))?;
        match branch_state.files.get(path) {
            Some(file) => Ok(Some(RemoteFile {
                path: path.to_string(),
                content: encoding::decode(&file.encoded)?,
                version: file.version.clone(),
            })),
            None => Ok(None),
        }
    }

    async fn create_file(
        &self,
        repo: &RepoRef,
        target: FileTarget<'_>,
        content: &[u8],
    ) -> StoreResult<CommitRef> {
        self.record(HostCall::CreateFile {
            repo: repo.full_name(),
            branch: target.branch.to_string(),
            path: target.path.to_string(),
            content: content.to_vec(),
        })?;
        let mut state = self.state.lock().unwrap();
        let parent = branch_head(&mut state, repo, target.branch)?;
        let sha = state.next_commit(&parent, target.message);
        let branch_state = branch_mut(&mut state, repo, target.branch)?;
        if branch_state.files.contains_key(target.path) {
            return Err(StoreError::conflict(
                resource(repo, target.branch, target.path),
                "file already exists",
            ));
        }
        branch_state.files.insert(
            target.path.to_string(),
            StoredFile {
                encoded: encoding::wrap(&encoding::encode(content), encoding::WRAP_WIDTH),
                version: VersionToken::for_content(content),
            },
        );
        branch_state.head_sha = sha.clone();
        Ok(CommitRef { sha, url: None })
    }

    async fn update_file(
        &self,
        repo: &RepoRef,
        target: FileTarget<'_>,
        content: &[u8],
        version: &VersionToken,
    ) -> StoreResult<CommitRef> {
        self.record(HostCall::UpdateFile {
            repo: repo.full_name(),
            branch: target.branch.to_string(),
            path: target.path.to_string(),
            content: content.to_vec(),
            version: version.clone(),
        })?;
        let mut state = self.state.lock().unwrap();
        let parent = branch_head(&mut state, repo, target.branch)?;
        let sha = state.next_commit(&parent, target.message);
        let branch_state = branch_mut(&mut state, repo, target.branch)?;
        let file = branch_state
            .files
            .get_mut(target.path)
            .ok_or_else(|| StoreError::not_found(resource(repo, target.branch, target.path)))?;
        if &file.version != version {
            return Err(StoreError::conflict(
                resource(repo, target.branch, target.path),
                format!("{} does not match {}", version, file.version),
            ));
        }
        *file = StoredFile {
            encoded: encoding::wrap(&encoding::encode(content), encoding::WRAP_WIDTH),
            version: VersionToken::for_content(content),
        };
        branch_state.head_sha = sha.clone();
        Ok(CommitRef { sha, url: None })
    }

    async fn delete_file(
        &self,
        repo: &RepoRef,
        target: FileTarget<'_>,
        version: &VersionToken,
    ) -> StoreResult<CommitRef> {
        self.record(HostCall::DeleteFile {
            repo: repo.full_name(),
            branch: target.branch.to_string(),
            path: target.path.to_string(),
            version: version.clone(),
        })?;
        let mut state = self.state.lock().unwrap();
        let parent = branch_head(&mut state, repo, target.branch)?;
        let sha = state.next_commit(&parent, target.message);
        let branch_state = branch_mut(&mut state, repo, target.branch)?;
        let current = branch_state
            .files
            .get(target.path)
            .map(|f| f.version.clone())
            .ok_or_else(|| StoreError::not_found(resource(repo, target.branch, target.path)))?;
        if &current != version {
            return Err(StoreError::conflict(
                resource(repo, target.branch, target.path),
                format!("{version} does not match {current}"),
            ));
        }
        branch_state.files.remove(target.path);
        branch_state.head_sha = sha.clone();
        Ok(CommitRef { sha, url: None })
    }
}

fn branch_mut<'a>(
    state: &'a mut HostState,
    repo: &RepoRef,
    branch: &str,
) -> StoreResult<&'a mut BranchState> {
    state
        .repo_mut(repo)?
        .branches
        .get_mut(branch)
        .ok_or_else(|| StoreError::not_found(format!("branch {branch}")))
}

fn branch_head(state: &mut HostState, repo: &RepoRef, branch: &str) -> StoreResult<String> {
    Ok(branch_mut(state, repo, branch)?.head_sha.clone())
}

#[async_trait]
impl PullRequestStore for MemoryHost {
    async fn create_pull_request(
        &self,
        repo: &RepoRef,
        request: &NewPullRequest,
    ) -> StoreResult<PullRequest> {
        self.record(HostCall::CreatePullRequest {
            repo: repo.full_name(),
            request: request.clone(),
        })?;
        let mut state = self.state.lock().unwrap();
        let repo_state = state.repo_mut(repo)?;
        if !repo_state.branches.contains_key(&request.head) {
            return Err(StoreError::Api {
                status: 422,
                message: format!("head branch {} does not exist", request.head),
            });
        }
        if repo_state
            .pulls
            .iter()
            .any(|p| p.head == request.head && p.base == request.base)
        {
            return Err(StoreError::conflict(
                format!("{} pull {}", repo.full_name(), request.head),
                "a pull request already exists",
            ));
        }
        let number = repo_state.pulls.len() as u64 + 1;
        let pull = PullRequest {
            number,
            url: format!("https://git.example.test/{}/pull/{}", repo.full_name(), number),
            head: request.head.clone(),
            base: request.base.clone(),
        };
        repo_state.pulls.push(pull.clone());
        Ok(pull)
    }

    async fn find_open_pull_request(
        &self,
        repo: &RepoRef,
        head: &str,
        base: &str,
    ) -> StoreResult<Option<PullRequest>> {
        self.record(HostCall::FindPullRequest {
            repo: repo.full_name(),
            head: head.to_string(),
            base: base.to_string(),
        })?;
        let mut state = self.state.lock().unwrap();
        let repo_state = state.repo_mut(repo)?;
        Ok(repo_state
            .pulls
            .iter()
            .find(|p| p.head == head && p.base == base)
            .cloned())
    }
}

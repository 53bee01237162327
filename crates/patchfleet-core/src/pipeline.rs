//! One repository, start to finish: branch, file commits, pull request.
//!
//! Steps run strictly in order and the first failure aborts the repository.
//! Re-running with the same plan resumes: the branch is reused, files that
//! already carry the patched content are skipped, and an open pull request
//! for the same head and base is returned instead of a duplicate.

use std::sync::Arc;
use std::time::Duration;

use patchfleet_store::{NewPullRequest, RemoteHost, RepoRef};
use tracing::debug;

use crate::branch::BranchResolver;
use crate::deadline::bounded;
use crate::diff::{join_lines, Applied, DiffApplier};
use crate::domain::{
    BranchOutcome, FileAction, FileDiff, FileOutcome, FileReport, PatchError, PatchPlan,
    PullRequestOutcome, RepositoryReport, Result,
};
use crate::obs;
use crate::store::FileStore;

/// Default deadline for each remote call.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Deadline applied to every remote call
    pub call_timeout: Duration,
    /// Read and apply, but create no branch, commit or pull request
    pub dry_run: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            call_timeout: DEFAULT_CALL_TIMEOUT,
            dry_run: false,
        }
    }
}

pub struct RepositoryPatchPipeline<H: ?Sized> {
    host: Arc<H>,
    options: PipelineOptions,
    applier: DiffApplier,
}

impl<H> RepositoryPatchPipeline<H>
where
    H: RemoteHost + ?Sized,
{
    pub fn new(host: Arc<H>, options: PipelineOptions) -> Self {
        Self {
            host,
            options,
            applier: DiffApplier::new(),
        }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Apply `diff` to `repo` on the plan's branch and open a pull request.
    pub async fn run(
        &self,
        repo: &RepoRef,
        diff: &[FileDiff],
        plan: &PatchPlan,
    ) -> Result<RepositoryReport> {
        let name = repo.full_name();
        let host = self.host.as_ref();
        let timeout = self.options.call_timeout;
        let resolver = BranchResolver::new(host, timeout);

        let default_branch = bounded(
            &format!("get branch {}", repo.default_branch),
            timeout,
            host.get_branch(repo, &repo.default_branch),
        )
        .await?;

        let branch: BranchOutcome = if self.options.dry_run {
            match resolver.find(repo, &plan.branch_name).await? {
                Some(existing) => BranchOutcome::Found(existing),
                None => BranchOutcome::Planned {
                    name: plan.branch_name.clone(),
                    base_sha: default_branch.head_sha.clone(),
                },
            }
        } else {
            resolver
                .ensure_branch(repo, &plan.branch_name, &default_branch.head_sha)
                .await?
                .into()
        };
        obs::emit_branch_resolved(&name, &branch);

        // a planned branch does not exist yet; its content is the default branch
        let read_branch = match &branch {
            BranchOutcome::Planned { .. } => repo.default_branch.as_str(),
            other => other.name(),
        };
        let store = FileStore::new(host, repo, read_branch, timeout);

        let mut files = Vec::with_capacity(diff.len());
        for file in diff {
            let outcome = self.patch_file(&store, file, &plan.commit_message).await?;
            obs::emit_file_committed(&name, file.display_path(), &outcome);
            files.push(FileReport {
                path: file.display_path().to_string(),
                outcome,
            });
        }

        let pull_request = if self.options.dry_run {
            None
        } else {
            Some(self.open_pull_request(repo, plan).await?)
        };

        Ok(RepositoryReport {
            repo: repo.clone(),
            branch,
            files,
            pull_request,
        })
    }

    async fn patch_file(
        &self,
        store: &FileStore<'_, H>,
        file: &FileDiff,
        message: &str,
    ) -> Result<FileOutcome> {
        let dry_run = self.options.dry_run;

        match file.action()? {
            FileAction::Delete { path } => {
                let current = store.read_existing(path).await?;
                debug!(path = %path, existing = %current.text, "deleting file");
                self.applier.apply(Some(current.lines().as_slice()), file)?;
                if dry_run {
                    return Ok(FileOutcome::WouldWrite);
                }
                let commit = store.delete(path, message, &current.version).await?;
                Ok(FileOutcome::Deleted { commit })
            }
            FileAction::Create { path } => {
                let patched = patched_text(self.applier.apply(None, file)?);
                debug!(path = %path, patched = %patched, "creating file");
                match store.read(path).await? {
                    None if dry_run => Ok(FileOutcome::WouldWrite),
                    None => {
                        let commit = store.create(path, &patched, message).await?;
                        Ok(FileOutcome::Created { commit })
                    }
                    Some(existing) if existing.text == patched => Ok(FileOutcome::AlreadyApplied),
                    Some(_) => Err(PatchError::Conflict {
                        path: path.to_string(),
                        detail: format!(
                            "file already exists on {} with different content",
                            store.branch()
                        ),
                    }),
                }
            }
            FileAction::Modify { path } => {
                let current = store.read_existing(path).await?;
                let lines = current.lines();
                debug!(path = %path, existing = %current.text, "patching file");

                let patched = match self.applier.apply(Some(lines.as_slice()), file) {
                    Ok(applied) => patched_text(applied),
                    Err(PatchError::PatchDoesNotApply { .. })
                        if self.applier.is_already_applied(&lines, file) =>
                    {
                        debug!(path = %path, "patch already present");
                        return Ok(FileOutcome::AlreadyApplied);
                    }
                    Err(e) => return Err(e),
                };
                debug!(path = %path, patched = %patched, "patched content");

                if patched == current.text {
                    return Ok(FileOutcome::AlreadyApplied);
                }
                if dry_run {
                    return Ok(FileOutcome::WouldWrite);
                }
                let commit = store
                    .update(path, &patched, message, &current.version)
                    .await?;
                Ok(FileOutcome::Updated { commit })
            }
        }
    }

    async fn open_pull_request(
        &self,
        repo: &RepoRef,
        plan: &PatchPlan,
    ) -> Result<PullRequestOutcome> {
        let host = self.host.as_ref();
        let timeout = self.options.call_timeout;
        let head = plan.branch_name.as_str();
        let base = repo.default_branch.as_str();

        let existing = bounded(
            "find open pull request",
            timeout,
            host.find_open_pull_request(repo, head, base),
        )
        .await?;
        if let Some(pr) = existing {
            debug!(repo = %repo, number = pr.number, "reusing open pull request");
            return Ok(PullRequestOutcome::Reused(pr));
        }

        let request = NewPullRequest {
            title: plan.commit_message.clone(),
            head: head.to_string(),
            base: base.to_string(),
            body: plan.pr_body.clone(),
        };
        let pr = bounded(
            "create pull request",
            timeout,
            host.create_pull_request(repo, &request),
        )
        .await?;
        Ok(PullRequestOutcome::Opened(pr))
    }
}

fn patched_text(applied: Applied) -> String {
    match applied {
        Applied::Content(lines) => join_lines(&lines),
        Applied::Deleted => String::new(),
    }
}

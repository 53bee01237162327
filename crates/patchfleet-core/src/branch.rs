//! Find-or-create for the work branch.

use std::time::Duration;

use patchfleet_store::{Branch, BranchStore, RepoRef, StoreError};
use tracing::debug;

use crate::deadline::bounded;
use crate::domain::{BranchOutcome, PatchError, Result};

/// How `ensure_branch` obtained the branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchResolution {
    /// The branch already existed and is returned unchanged
    Found(Branch),
    /// The branch was created at the requested base
    Created(Branch),
}

impl BranchResolution {
    pub fn branch(&self) -> &Branch {
        match self {
            BranchResolution::Found(b) | BranchResolution::Created(b) => b,
        }
    }
}

impl From<BranchResolution> for BranchOutcome {
    fn from(resolution: BranchResolution) -> Self {
        match resolution {
            BranchResolution::Found(b) => BranchOutcome::Found(b),
            BranchResolution::Created(b) => BranchOutcome::Created(b),
        }
    }
}

pub struct BranchResolver<'a, H: ?Sized> {
    host: &'a H,
    call_timeout: Duration,
}

impl<'a, H> BranchResolver<'a, H>
where
    H: BranchStore + ?Sized,
{
    pub fn new(host: &'a H, call_timeout: Duration) -> Self {
        BranchResolver { host, call_timeout }
    }

    /// Branch `name`, or `None` if it does not exist.
    pub async fn find(&self, repo: &RepoRef, name: &str) -> Result<Option<Branch>> {
        match self.get(repo, name).await {
            Ok(branch) => Ok(Some(branch)),
            Err(PatchError::Remote(StoreError::NotFound { .. })) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Return branch `name`, creating it at `base_sha` when it is absent.
    ///
    /// A ref that appears between the lookup and the create (another writer)
    /// is treated as found.
    pub async fn ensure_branch(
        &self,
        repo: &RepoRef,
        name: &str,
        base_sha: &str,
    ) -> Result<BranchResolution> {
        if let Some(branch) = self.find(repo, name).await? {
            debug!(repo = %repo, branch = %name, "reusing existing branch");
            return Ok(BranchResolution::Found(branch));
        }

        let created = bounded(
            &format!("create branch {name}"),
            self.call_timeout,
            self.host.create_branch_ref(repo, name, base_sha),
        )
        .await;
        match created {
            Ok(()) => Ok(BranchResolution::Created(self.get(repo, name).await?)),
            Err(PatchError::Remote(StoreError::Conflict { .. })) => {
                debug!(repo = %repo, branch = %name, "branch appeared concurrently");
                Ok(BranchResolution::Found(self.get(repo, name).await?))
            }
            Err(e) => Err(e),
        }
    }

    async fn get(&self, repo: &RepoRef, name: &str) -> Result<Branch> {
        bounded(
            &format!("get branch {name}"),
            self.call_timeout,
            self.host.get_branch(repo, name),
        )
        .await
    }
}

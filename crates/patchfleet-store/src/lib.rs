//! patchfleet-store: remote repository host abstractions
//!
//! This crate defines what patchfleet needs from a code-hosting service,
//! independent of any vendor or transport.
//!
//! ## Key Components
//!
//! - `RemoteHost`: search, branch refs, versioned file contents, pull requests
//! - `VersionToken`: optimistic-concurrency token threaded from read to write
//! - `encoding`: base64 content transport, tolerant of wrapped payloads
//! - `fakes::MemoryHost`: in-memory host for tests

pub mod encoding;
mod error;
pub mod fakes;
pub mod storage_traits;

pub use error::StoreError;
pub use storage_traits::{
    Branch, BranchStore, CommitRef, ContentStore, FileTarget, NewPullRequest, PullRequest,
    PullRequestStore, RemoteFile, RemoteHost, RepoRef, RepositorySearch, StoreResult,
    VersionToken,
};

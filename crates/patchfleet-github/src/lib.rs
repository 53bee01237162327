//! patchfleet-github: GitHub backend for patchfleet
//!
//! This crate implements the `patchfleet_store::RemoteHost` traits against the
//! GitHub REST v3 API:
//!
//! - repository search (`GET /search/repositories`)
//! - branches and refs (`GET /repos/{o}/{r}/branches/{b}`, `POST .../git/refs`)
//! - file contents (`GET|PUT|DELETE .../contents/{path}`, sha-conditioned)
//! - pull requests (`POST .../pulls`, `GET .../pulls?head=&base=`)
//!
//! Status codes are mapped onto `StoreError` so the pipeline can tell
//! not-found, conflict, permission and rate-limit failures apart.

mod api;
pub mod client;
pub mod config;
pub mod error;

pub use client::GithubClient;
pub use config::{GithubConfig, DEFAULT_API_URL, DEFAULT_TIMEOUT};
pub use error::GithubError;

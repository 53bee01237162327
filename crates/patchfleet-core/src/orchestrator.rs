//! Fleet orchestration: one pipeline per selected repository.
//!
//! Results are independent (a failure in one repository never affects the
//! others) and reported in selection order regardless of completion order.
//! Concurrency is bounded by `max_parallel`; the default of 1 patches
//! repositories strictly one after another.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use patchfleet_store::{RemoteHost, RepoRef};
use tracing::Instrument;
use uuid::Uuid;

use crate::domain::{FileDiff, FleetReport, PatchPlan, PatchResult};
use crate::obs;
use crate::pipeline::{PipelineOptions, RepositoryPatchPipeline};

pub const DEFAULT_MAX_PARALLEL: usize = 1;

#[derive(Debug, Clone)]
pub struct FleetOptions {
    /// Upper bound on repositories patched at once (at least 1)
    pub max_parallel: usize,
    pub pipeline: PipelineOptions,
}

impl Default for FleetOptions {
    fn default() -> Self {
        Self {
            max_parallel: DEFAULT_MAX_PARALLEL,
            pipeline: PipelineOptions::default(),
        }
    }
}

/// Shared cancellation switch. Checked before each repository starts;
/// repositories already in progress run to completion.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct FleetOrchestrator<H: ?Sized> {
    pipeline: RepositoryPatchPipeline<H>,
    max_parallel: usize,
    cancel: CancelFlag,
}

impl<H> FleetOrchestrator<H>
where
    H: RemoteHost + ?Sized,
{
    pub fn new(host: Arc<H>, options: FleetOptions) -> Self {
        Self {
            pipeline: RepositoryPatchPipeline::new(host, options.pipeline),
            max_parallel: options.max_parallel.max(1),
            cancel: CancelFlag::new(),
        }
    }

    /// Use an externally owned flag (e.g. one set from a Ctrl-C handler).
    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Patch every repository in `repos` and collect one result each.
    pub async fn run(&self, repos: &[RepoRef], diff: &[FileDiff], plan: &PatchPlan) -> FleetReport {
        let run_id = Uuid::new_v4();
        let run_label = run_id.to_string();
        let started_at = Utc::now();
        let clock = Instant::now();
        obs::emit_fleet_started(&run_label, &plan.branch_name, repos.len(), self.max_parallel);

        let run_label_ref = run_label.as_str();
        let results: Vec<PatchResult> = stream::iter(repos)
            .map(move |repo| self.run_one(run_label_ref, repo, diff, plan))
            .buffered(self.max_parallel)
            .collect()
            .await;

        let report = FleetReport {
            run_id,
            branch: plan.branch_name.clone(),
            dry_run: self.pipeline.options().dry_run,
            started_at,
            finished_at: Utc::now(),
            results,
        };
        obs::emit_fleet_finished(
            &run_label,
            elapsed_ms(clock),
            report.succeeded(),
            report.failed(),
            report.cancelled(),
        );
        report
    }

    async fn run_one(
        &self,
        run_id: &str,
        repo: &RepoRef,
        diff: &[FileDiff],
        plan: &PatchPlan,
    ) -> PatchResult {
        if self.cancel.is_cancelled() {
            return PatchResult::Cancelled { repo: repo.clone() };
        }

        let name = repo.full_name();
        let span = obs::repo_span(run_id, &name);
        async {
            obs::emit_repo_started(&name, diff.len());
            let clock = Instant::now();
            match self.pipeline.run(repo, diff, plan).await {
                Ok(report) => {
                    let url = report
                        .pull_request
                        .as_ref()
                        .map(|pr| pr.pull_request().url.as_str());
                    obs::emit_repo_finished(&name, elapsed_ms(clock), url);
                    PatchResult::Succeeded(report)
                }
                Err(err) => {
                    obs::emit_repo_failed(&name, err.kind(), &err);
                    PatchResult::Failed {
                        repo: repo.clone(),
                        kind: err.kind(),
                        error: err.to_string(),
                    }
                }
            }
        }
        .instrument(span)
        .await
    }
}

fn elapsed_ms(clock: Instant) -> u64 {
    u64::try_from(clock.elapsed().as_millis()).unwrap_or(u64::MAX)
}

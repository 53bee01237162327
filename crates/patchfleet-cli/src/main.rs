//! patchfleet - apply one unified diff across many hosted repositories
//!
//! The `patchfleet` command searches an organization for repositories, lets
//! the user pick some in `$EDITOR`, then for each one creates a branch,
//! commits the patched files and opens a pull request.
//!
//! ## Flow
//!
//! 1. parse the patch file (fails before any remote call)
//! 2. search `org:<org> <query>`
//! 3. select repositories by marking `[X]` in the editor
//! 4. patch each repository; print one line per repository

mod editor;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{ArgGroup, Parser};
use patchfleet_core::{
    parse_unified_diff, select_repositories, CancelFlag, FleetOptions, FleetOrchestrator,
    FleetReport, PatchPlan, PatchResult, PipelineOptions, TextEditor,
};
use patchfleet_github::{GithubClient, GithubConfig, DEFAULT_API_URL};
use patchfleet_store::{RemoteHost, RepoRef, RepositorySearch};
use tracing::{info, warn, Level};

use crate::editor::ExternalEditor;

#[derive(Parser, Debug)]
#[command(name = "patchfleet")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(
    about = "Apply one unified diff across many repositories, one pull request each",
    long_about = None
)]
#[command(group(
    ArgGroup::new("credentials")
        .required(true)
        .args(["token", "token_variable"])
))]
struct Cli {
    /// Access token for the hosting API
    #[arg(long)]
    token: Option<String>,

    /// Name of an environment variable holding the access token
    #[arg(long, value_name = "ENV")]
    token_variable: Option<String>,

    /// Organization to search
    #[arg(short, long)]
    org: String,

    /// Extra search terms
    #[arg(short, long, default_value = "")]
    query: String,

    /// Maximum number of repositories to offer
    #[arg(short = 'n', long, default_value_t = 30)]
    limit: u32,

    /// Unified diff to apply
    #[arg(short, long)]
    patch: PathBuf,

    /// Commit message and pull request title
    #[arg(short, long)]
    message: String,

    /// Branch name (default: the message with spaces replaced by hyphens)
    #[arg(long)]
    branch: Option<String>,

    /// Enable debug output, including file contents
    #[arg(short, long, visible_alias = "debug")]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    json: bool,

    /// Base URL of the hosting API
    #[arg(long, env = "PATCHFLEET_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Deadline for each remote call, in seconds
    #[arg(long, default_value_t = 5)]
    timeout_secs: u64,

    /// Repositories to patch at the same time
    #[arg(short = 'j', long, default_value_t = 1)]
    jobs: usize,

    /// Read and apply the patch, but write nothing
    #[arg(long)]
    dry_run: bool,

    /// Write the full run report as JSON to this file
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    patchfleet_core::init_tracing(cli.json, level);

    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let token = resolve_token(cli.token.as_deref(), cli.token_variable.as_deref(), |var| {
        std::env::var(var).ok()
    })?;

    let patch_text = std::fs::read_to_string(&cli.patch)
        .with_context(|| format!("Failed to read patch file {}", cli.patch.display()))?;
    let diff = parse_unified_diff(&patch_text)
        .with_context(|| format!("Failed to parse {}", cli.patch.display()))?;

    let mut plan = PatchPlan::new(&cli.message);
    if let Some(branch) = &cli.branch {
        plan = plan.with_branch(branch);
    }

    let timeout = Duration::from_secs(cli.timeout_secs);
    let config = GithubConfig::new(&token)
        .with_api_url(&cli.api_url)
        .with_timeout(timeout);
    let host: Arc<dyn RemoteHost> =
        Arc::new(GithubClient::new(config).context("Failed to set up the API client")?);

    let query = search_query(&cli.org, &cli.query);
    let found = host
        .search_repositories(&query, cli.limit)
        .await
        .with_context(|| format!("Repository search for {query:?} failed"))?;
    if found.is_empty() {
        println!("No repositories match {query:?}");
        return Ok(ExitCode::SUCCESS);
    }
    info!(query = %query, found = found.len(), "repositories found");

    let selected = choose_repositories(ExternalEditor::from_env(), found).await?;
    if selected.is_empty() {
        println!("No repositories selected");
        return Ok(ExitCode::SUCCESS);
    }

    let cancel = CancelFlag::new();
    watch_for_interrupt(cancel.clone());

    let options = FleetOptions {
        max_parallel: cli.jobs,
        pipeline: PipelineOptions {
            call_timeout: timeout,
            dry_run: cli.dry_run,
        },
    };
    let report = FleetOrchestrator::new(host, options)
        .with_cancel_flag(cancel)
        .run(&selected, &diff, &plan)
        .await;

    print_results(&report, &mut std::io::stdout().lock())?;

    if let Some(path) = &cli.report {
        write_report(&report, path)?;
        info!(path = %path.display(), "report written");
    }

    if report.has_failures() || report.cancelled() > 0 {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

/// Run the selection editor on the blocking pool; it waits for the user.
async fn choose_repositories<E>(editor: E, found: Vec<RepoRef>) -> Result<Vec<RepoRef>>
where
    E: TextEditor + Send + 'static,
{
    let selected = tokio::task::spawn_blocking(move || select_repositories(&editor, &found))
        .await
        .context("Repository selection task failed")??;
    Ok(selected)
}

/// Token from `--token`, or from the variable named by `--token-variable`.
fn resolve_token(
    token: Option<&str>,
    variable: Option<&str>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<String> {
    match (token, variable) {
        (Some(token), None) if !token.trim().is_empty() => Ok(token.to_string()),
        (Some(_), None) => bail!("--token is empty"),
        (None, Some(var)) => match lookup(var) {
            Some(token) if !token.trim().is_empty() => Ok(token),
            _ => bail!("environment variable {var} is not set or empty"),
        },
        _ => bail!("exactly one of --token or --token-variable is required"),
    }
}

fn search_query(org: &str, query: &str) -> String {
    format!("org:{org} {query}").trim().to_string()
}

/// Cancel the fleet run on Ctrl-C. Repositories already started finish.
fn watch_for_interrupt(cancel: CancelFlag) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted; finishing repositories already in progress");
            cancel.cancel();
        }
    });
}

fn write_report(report: &FleetReport, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write report to {}", path.display()))
}

fn print_results(report: &FleetReport, out: &mut impl Write) -> std::io::Result<()> {
    for result in &report.results {
        match result {
            PatchResult::Succeeded(repo_report) => match &repo_report.pull_request {
                Some(pr) => writeln!(
                    out,
                    "PR for patching {}: {}",
                    repo_report.repo.name,
                    pr.pull_request().url
                )?,
                None => writeln!(
                    out,
                    "Dry run for {}: {} file(s) would be patched on {}",
                    repo_report.repo.name,
                    repo_report.files.len(),
                    repo_report.branch.name()
                )?,
            },
            PatchResult::Failed { repo, error, .. } => {
                writeln!(out, "Failed to patch {}: {}", repo.name, error)?
            }
            PatchResult::Cancelled { repo } => {
                writeln!(out, "Skipped {}: run was interrupted", repo.name)?
            }
        }
    }
    Ok(())
}

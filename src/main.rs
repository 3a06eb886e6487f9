use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};
use tracing_subscriber::EnvFilter;

use pr_context::config::Config;
use pr_context::github::HttpClient;
use pr_context::pr::{Locator, PrError, PullRequestContext};
use pr_context::report::{self, PullRequestSnapshot};

/// pr-context: load a GitHub pull request with its files, commits
/// (including pushed dates), comments and reviews, and print a summary.
///
/// Demonstration binary for the `pr_context` library.
#[derive(Parser, Debug)]
#[command(name = "pr-context", version, about)]
struct Cli {
    /// GitHub Pull Request URL (e.g., https://github.com/org/repo/pull/42)
    pr_url: String,

    /// Optional output file path for markdown report
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    info!("parsing PR URL");
    let locator = Locator::parse_url(&cli.pr_url)?;
    debug!(
        owner = %locator.owner(),
        repo = %locator.repo(),
        pr = locator.number(),
        "parsed PR URL"
    );

    info!("loading configuration");
    let config = Config::load()?;
    let token = config.github_token().ok_or(PrError::MissingToken)?;
    let client = HttpClient::with_endpoints(
        token,
        config.github.api_url.clone(),
        config.github.graphql_url.clone(),
    );

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, cancelling outstanding requests");
            on_interrupt.cancel();
        }
    });

    let span = info_span!("pr_context", pr_url = %cli.pr_url);
    let snapshot = async {
        info!("fetching pull request from GitHub");
        let mut ctx = PullRequestContext::new(Arc::new(client), &locator, cancel)
            .await?
            .with_retry_policy(config.retry_policy());
        load_snapshot(&mut ctx).await
    }
    .instrument(span)
    .await?;

    info!("generating report");
    let built_report = report::build(snapshot);
    report::output(&built_report, cli.output.as_deref())?;
    info!(review_status = %built_report.overall, "done");

    Ok(())
}

async fn load_snapshot(ctx: &mut PullRequestContext) -> Result<PullRequestSnapshot, PrError> {
    let files = ctx.changed_files().await?.to_vec();
    let commits = ctx.commits().await?.to_vec();
    let comments = ctx.comments().await?.to_vec();
    let reviews = ctx.reviews().await?.to_vec();
    info!(
        files = files.len(),
        commits = commits.len(),
        comments = comments.len(),
        reviews = reviews.len(),
        "fetched pull request"
    );

    Ok(PullRequestSnapshot {
        repository: format!("{}/{}", ctx.owner(), ctx.repo()),
        number: ctx.number(),
        descriptor: ctx.descriptor().clone(),
        files,
        commits,
        comments,
        reviews,
    })
}

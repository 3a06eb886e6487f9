//! Summary report used by the demonstration binary.

pub mod types;

pub use types::{PullRequestSnapshot, Report, ReviewStatus};

use crate::pr::ReviewState;
use colored::Colorize;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to write report file: {0}")]
    FileWrite(#[from] std::io::Error),
}

/// Build a Report from a loaded pull request.
///
/// Reviews arrive oldest first, so the last review of each reviewer is
/// their current verdict.
pub fn build(snapshot: PullRequestSnapshot) -> Report {
    let mut latest = BTreeMap::new();
    for review in &snapshot.reviews {
        let status = match review.state {
            ReviewState::Approved => ReviewStatus::Approved,
            ReviewState::ChangesRequested => ReviewStatus::ChangesRequested,
            ReviewState::Other(_) => continue,
        };
        latest.insert(review.author.clone(), status);
    }
    let reviewers: Vec<(String, ReviewStatus)> = latest.into_iter().collect();
    let overall = reviewers
        .iter()
        .map(|(_, status)| *status)
        .max()
        .unwrap_or(ReviewStatus::Pending);

    let (base_branch, head_branch) = snapshot.descriptor.branches();

    Report {
        repository: snapshot.repository,
        number: snapshot.number,
        author: snapshot.descriptor.author,
        base_branch,
        head_branch,
        additions: snapshot.files.iter().map(|f| f.additions).sum(),
        deletions: snapshot.files.iter().map(|f| f.deletions).sum(),
        files: snapshot.files,
        commits: snapshot.commits,
        comment_count: snapshot.comments.len(),
        reviewers,
        overall,
    }
}

/// Output the report to terminal (default) or to a markdown file.
#[instrument(skip(report), fields(pr = report.number, overall = %report.overall))]
pub fn output(report: &Report, output_path: Option<&Path>) -> Result<(), ReportError> {
    match output_path {
        None => {
            debug!("writing report to terminal");
            print_terminal_report(report);
            Ok(())
        }
        Some(path) => {
            debug!(path = %path.display(), "writing report to file");
            write_markdown_report(report, path)
        }
    }
}

fn pushed_at(commit: &crate::pr::Commit) -> String {
    commit
        .pushed_at
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn short_sha(sha: &str) -> &str {
    sha.get(..10).unwrap_or(sha)
}

/// Format and print the report to the terminal with colors.
///
/// PR org/repo#42 by alice
/// main <- feature | Files changed: 7 | +320 -45
///
/// ═══ Commits (3) ═══
/// ═══ Files (7) ═══
/// ═══ Reviews ═══
///
/// ═══ Review Status: APPROVED ═══
fn print_terminal_report(report: &Report) {
    println!();
    println!("PR {}#{} by {}", report.repository, report.number, report.author);
    println!(
        "{} <- {} | Files changed: {} | +{} -{}",
        report.base_branch,
        report.head_branch,
        report.files.len(),
        report.additions,
        report.deletions
    );
    println!();

    println!("═══ Commits ({}) ═══", report.commits.len());
    for commit in &report.commits {
        println!(
            "  • {} pushed {} by {}",
            short_sha(&commit.sha).yellow(),
            pushed_at(commit),
            if commit.author.is_empty() { "(unlinked)" } else { &commit.author }
        );
    }
    println!();

    println!("═══ Files ({}) ═══", report.files.len());
    for file in &report.files {
        println!(
            "  • {} [{}] {} {}",
            file.filename,
            file.status,
            format!("+{}", file.additions).green(),
            format!("-{}", file.deletions).red()
        );
    }
    println!();

    println!("═══ Reviews ═══");
    println!("Comments: {}", report.comment_count);
    if report.reviewers.is_empty() {
        println!("  No reviews.");
    } else {
        for (reviewer, status) in &report.reviewers {
            println!("  • {}: {}", reviewer, colorize_status(*status));
        }
    }
    println!();

    println!("═══ Review Status: {} ═══", colorize_status(report.overall));
    println!();
}

/// Write the report as a markdown file, same layout as the terminal.
fn write_markdown_report(report: &Report, path: &Path) -> Result<(), ReportError> {
    let mut md = String::new();
    md.push_str(&format!(
        "# PR {}#{}\n\n",
        report.repository, report.number
    ));
    md.push_str(&format!(
        "**Author:** {} | **Branches:** `{}` <- `{}` | **Files changed:** {} | **+{} -{}**\n\n",
        report.author,
        report.base_branch,
        report.head_branch,
        report.files.len(),
        report.additions,
        report.deletions
    ));

    md.push_str(&format!("## Commits ({})\n\n", report.commits.len()));
    for commit in &report.commits {
        md.push_str(&format!(
            "- `{}` pushed {}\n",
            short_sha(&commit.sha),
            pushed_at(commit)
        ));
    }
    md.push('\n');

    md.push_str(&format!("## Files ({})\n\n", report.files.len()));
    for file in &report.files {
        md.push_str(&format!(
            "- `{}` ({}) +{} -{}\n",
            file.filename, file.status, file.additions, file.deletions
        ));
    }
    md.push('\n');

    md.push_str("## Reviews\n\n");
    md.push_str(&format!("**Comments:** {}\n\n", report.comment_count));
    for (reviewer, status) in &report.reviewers {
        md.push_str(&format!("- **{}**: {}\n", reviewer, status));
    }
    md.push('\n');

    md.push_str(&format!("## Review Status: {}\n", report.overall));

    std::fs::write(path, md)?;
    Ok(())
}

/// Helper to colorize a review status for terminal output.
fn colorize_status(status: ReviewStatus) -> colored::ColoredString {
    match status {
        ReviewStatus::ChangesRequested => status.to_string().red().bold(),
        ReviewStatus::Pending => status.to_string().yellow().bold(),
        ReviewStatus::Approved => status.to_string().green().bold(),
    }
}

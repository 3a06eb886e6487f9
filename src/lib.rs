//! Loads the complete state of a GitHub pull request: its descriptor,
//! changed files, commits with pushed dates, comments and reviews.
//!
//! The library entry point is [`pr::PullRequestContext`], built from a
//! [`pr::Locator`] and any [`github::GitHubApi`] implementation. The
//! `pr-context` binary and the [`report`] module are a demonstration
//! consumer of that API and are not part of the loading component.

pub mod config;
pub mod github;
pub mod pr;
pub mod report;

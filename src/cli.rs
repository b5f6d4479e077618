//! Command line entry point.
//!
//! One run: select the train containing the checked-out branch, propagate
//! with the cascade, synchronise review requests, then print the status
//! report. Everything that can fail on configuration is resolved before the
//! first mutation.

use std::path::PathBuf;

use clap::Parser;

use crate::cascade::{CascadeReport, EngineOptions, GraftEngine};
use crate::config::{ConfigError, DEFINITION_FILE_NAME, TrainDefinition, load_token};
use crate::error::GraftError;
use crate::git::{self, WorkingTree};
use crate::github::OctocrabClient;
use crate::operator::TerminalOperator;
use crate::persistence::DefinitionFile;
use crate::review::{ReviewReport, ReviewSync};
use crate::status::{render_train_json, render_train_status};
use crate::types::{RepoId, Train};

/// Keep a train of stacked branches grafted, pushed and cross-linked.
#[derive(Debug, Clone, Parser)]
#[command(name = "graft", version, about)]
pub struct Cli {
    /// Train definition file [default: <repo root>/.pr-train.yml]
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// GitHub token; falls back to $GITHUB_TOKEN, then ~/.graft/token
    #[arg(long, value_name = "TOKEN")]
    pub token: Option<String>,

    /// Compare against the remote-tracking refs as they are
    #[arg(long)]
    pub no_fetch: bool,

    /// Graft locally but push nothing
    #[arg(long)]
    pub no_push: bool,

    /// Skip pull request synchronisation
    #[arg(long)]
    pub local: bool,

    /// Only print the train's status; change nothing
    #[arg(long)]
    pub status: bool,

    /// Print the status report as JSON
    #[arg(long)]
    pub json: bool,

    /// Debug logging (overridden by RUST_LOG)
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Whether the run talks to the review host.
    pub fn syncs_reviews(&self) -> bool {
        !self.local && !self.status
    }

    pub fn engine_options(&self, remote: &str) -> EngineOptions {
        EngineOptions {
            fetch: !self.no_fetch,
            push: !self.no_push,
            ..EngineOptions::new(remote)
        }
    }
}

/// Runs graft in the current directory and returns what to print.
pub async fn run(cli: Cli) -> Result<String, GraftError> {
    let cwd = std::env::current_dir().map_err(git::GitError::Io)?;
    let root = git::toplevel(&cwd)?;
    let definition_path = cli
        .config
        .clone()
        .unwrap_or_else(|| root.join(DEFINITION_FILE_NAME));
    let definition = TrainDefinition::load(&definition_path)?;
    let settings = definition.settings.clone();

    let mut worktree = WorkingTree::discover(&root, settings.remote.clone())?;
    let current = git::current_branch(worktree.root())?.ok_or(GraftError::DetachedHead)?;
    let mut train = Train::for_branch(&definition, &current)?;
    tracing::info!(train = train.name(), branch = %current, "selected train");

    let client = if cli.syncs_reviews() {
        Some(review_client(&worktree, cli.token.clone())?)
    } else {
        None
    };

    let mut operator = TerminalOperator::stdio();
    let mut engine = GraftEngine::new(
        &mut worktree,
        &mut operator,
        cli.engine_options(&settings.remote),
    );
    let cascade = if cli.status {
        engine.inspect(&mut train)?;
        None
    } else {
        Some(engine.run(&mut train)?)
    };

    let review = match client {
        Some(client) => {
            let file = DefinitionFile::new(&definition_path);
            let report = ReviewSync::new(&client, &mut operator, &file, settings.merge_branch.clone())
                .run(&mut train)
                .await?;
            Some(report)
        }
        None => None,
    };

    if cli.json {
        return Ok(render_train_json(&train)?);
    }
    let mut out = render_train_status(&train, Some(&current));
    if let Some(cascade) = &cascade {
        out.push_str(&summarise_cascade(cascade));
    }
    if let Some(review) = &review {
        out.push_str(&summarise_review(review));
    }
    Ok(out)
}

/// Builds the GitHub client, resolving the token and repository first.
fn review_client(worktree: &WorkingTree, token: Option<String>) -> Result<OctocrabClient, GraftError> {
    let token = load_token(token)?;
    let url = git::remote_url(worktree.root(), worktree.remote())?;
    let repo = RepoId::from_remote_url(&url).ok_or(ConfigError::UnrecognisedRemote(url))?;
    tracing::debug!(repo = %repo, "review host");
    OctocrabClient::from_token(token, repo).map_err(GraftError::Client)
}

fn summarise_cascade(report: &CascadeReport) -> String {
    if report.is_noop() {
        return "\n\nNothing to graft or push.".to_string();
    }
    let mut out = String::from("\n");
    for branch in &report.origin_synced {
        out.push_str(&format!("\nPulled remote commits into {}", branch));
    }
    for (source, target) in &report.grafted {
        out.push_str(&format!("\nGrafted {} into {}", source, target));
    }
    for branch in &report.pushed {
        out.push_str(&format!("\nPushed {}", branch));
    }
    out
}

fn summarise_review(report: &ReviewReport) -> String {
    let mut out = String::new();
    for (branch, number) in &report.created {
        out.push_str(&format!("\nOpened {} for {}", number, branch));
    }
    for branch in &report.marked_merged {
        out.push_str(&format!("\nMarked {} as merged", branch));
    }
    if !report.updated.is_empty() {
        out.push_str(&format!(
            "\nUpdated the tracking table in {} pull request(s)",
            report.updated.len()
        ));
    }
    for failure in &report.failures {
        out.push_str(&format!("\nCould not update {}: {}", failure.branch, failure.error));
    }
    out
}

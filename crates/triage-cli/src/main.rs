//! PR Triage CLI
//!
//! The `pr-triage` command triages pull requests on a GitHub repository:
//! it accepts single new files, accepts edits by a file's original author,
//! rejects multi-file submissions and holds deletions for review.
//!
//! ## Commands
//!
//! - `run`: one triage pass over the open pull requests
//! - `watch`: repeat `run` on an interval until interrupted
//! - `evaluate`: decide a single pull request, optionally applying the result

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn, Level};
use triage_core::{
    apply_decision, plan_actions, run_cycle, triage_change, ChangeSelection, CycleOptions,
    CycleReport, DecisionTag, HistoryResolver, PolicyConfig,
};
use triage_github::{GithubClient, GithubConfig, MergeMethod, DEFAULT_API_URL};

#[derive(Parser, Debug)]
#[command(name = "pr-triage")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Automated pull request triage for GitHub repositories", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines and reports
    #[arg(long, global = true)]
    json: bool,

    #[command(flatten)]
    repo: RepoArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct RepoArgs {
    /// Repository to triage (owner/name)
    #[arg(long, env = "REPO_NAME", global = true)]
    repo: Option<String>,

    /// GitHub API token
    #[arg(long, env = "GITHUB_TOKEN", global = true, hide_env_values = true)]
    token: Option<String>,

    /// Reviewer mentioned and requested when a file is deleted
    #[arg(long, env = "MENTION_USER", global = true)]
    mention: Option<String>,

    /// GitHub REST API root
    #[arg(long, env = "GITHUB_API_URL", global = true, default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Branch whose history determines original authors (default branch if unset)
    #[arg(long, env = "TRIAGE_BASE_BRANCH", global = true)]
    base_branch: Option<String>,

    /// Merge method for accepted pull requests (merge, squash, rebase)
    #[arg(long, global = true, default_value = "merge")]
    merge_method: String,

    /// Seconds to wait for a file's history before giving up on it
    #[arg(long, global = true, default_value = "30")]
    timeout_secs: u64,

    /// Pull requests evaluated at once
    #[arg(long, global = true, default_value = "4")]
    concurrency: usize,

    /// Open a follow-up issue for pull requests no rule handles
    #[arg(long, global = true)]
    follow_up_issues: bool,
}

#[derive(Args, Debug, Clone, Copy)]
struct CycleArgs {
    /// Triage every open pull request, not only untouched new ones
    #[arg(long)]
    all: bool,

    /// Decide without commenting, merging or closing
    #[arg(long)]
    dry_run: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one triage pass
    Run {
        #[command(flatten)]
        cycle: CycleArgs,
    },

    /// Run triage passes on an interval until interrupted
    Watch {
        #[command(flatten)]
        cycle: CycleArgs,

        /// Seconds between passes
        #[arg(long, default_value = "60")]
        interval_secs: u64,
    },

    /// Decide a single pull request
    Evaluate {
        /// Pull request number
        number: u64,

        /// Apply the decision instead of only printing it
        #[arg(long)]
        apply: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    triage_core::init_tracing(cli.json, level);

    let client = Arc::new(build_client(&cli.repo)?);
    let resolver = HistoryResolver::new(Arc::clone(&client))
        .with_timeout(Duration::from_secs(cli.repo.timeout_secs));
    let policy = policy_config(&cli.repo);

    match cli.command {
        Commands::Run { cycle } => {
            let options = cycle_options(&cli.repo, cycle);
            let report = run_cycle(&*client, &*client, &resolver, &policy, &options)
                .await
                .context("Failed to list open pull requests")?;
            print_report(&report, cli.json)
        }
        Commands::Watch {
            cycle,
            interval_secs,
        } => {
            let options = cycle_options(&cli.repo, cycle);
            cmd_watch(
                &client,
                &resolver,
                &policy,
                &options,
                Duration::from_secs(interval_secs.max(1)),
                cli.json,
            )
            .await
        }
        Commands::Evaluate { number, apply } => {
            cmd_evaluate(&client, &resolver, &policy, number, apply, cli.json).await
        }
    }
}

fn build_client(args: &RepoArgs) -> Result<GithubClient> {
    let slug = args
        .repo
        .as_deref()
        .context("No repository given: pass --repo or set REPO_NAME")?;
    let merge_method: MergeMethod = args.merge_method.parse()?;

    let mut config = GithubConfig::new(slug)?
        .with_api_base_url(&args.api_url)
        .with_merge_method(merge_method);
    match &args.token {
        Some(token) => config = config.with_token(token),
        None => warn!("GITHUB_TOKEN not set, requests are anonymous and cannot act"),
    }
    if let Some(branch) = &args.base_branch {
        config = config.with_base_branch(branch);
    }

    GithubClient::new(config).context("Failed to build GitHub client")
}

fn policy_config(args: &RepoArgs) -> PolicyConfig {
    let mut policy = PolicyConfig::default().with_follow_up_issues(args.follow_up_issues);
    if let Some(reviewer) = args.mention.as_deref().filter(|m| !m.is_empty()) {
        policy = policy.with_reviewer(reviewer.trim_start_matches('@'));
    }
    policy
}

fn cycle_options(args: &RepoArgs, cycle: CycleArgs) -> CycleOptions {
    CycleOptions {
        selection: if cycle.all {
            ChangeSelection::AllOpen
        } else {
            ChangeSelection::NewlyOpened
        },
        max_concurrent: args.concurrency.max(1),
        dry_run: cycle.dry_run,
    }
}

async fn cmd_watch(
    client: &Arc<GithubClient>,
    resolver: &HistoryResolver<Arc<GithubClient>>,
    policy: &PolicyConfig,
    options: &CycleOptions,
    interval: Duration,
    json: bool,
) -> Result<()> {
    info!(
        repo = %client.config().slug(),
        interval_secs = interval.as_secs(),
        "Watching for pull requests"
    );
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match run_cycle(&**client, &**client, resolver, policy, options).await {
                    Ok(report) => print_report(&report, json)?,
                    // Listing failures end only this pass
                    Err(err) => warn!(error = %err, "Triage pass failed"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping");
                return Ok(());
            }
        }
    }
}

async fn cmd_evaluate(
    client: &Arc<GithubClient>,
    resolver: &HistoryResolver<Arc<GithubClient>>,
    policy: &PolicyConfig,
    number: u64,
    apply: bool,
    json: bool,
) -> Result<()> {
    let change = client
        .pull_request(number)
        .await
        .with_context(|| format!("Failed to fetch pull request #{number}"))?;
    let decision = triage_change(&**client, resolver, policy, &change)
        .await
        .with_context(|| format!("Failed to triage pull request #{number}"))?;

    let applied = if apply {
        Some(
            apply_decision(&**client, &change, &decision)
                .await
                .with_context(|| format!("Failed to apply decision to #{number}"))?,
        )
    } else {
        None
    };

    if json {
        let out = serde_json::json!({
            "number": change.number,
            "title": change.title,
            "decision": decision,
            "planned": plan_actions(&change, &decision),
            "applied": applied,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("{} {}", change, change.title);
    println!("  decision: {} ({})", decision.tag(), decision.rule());
    println!("  message:");
    for line in decision.message().lines() {
        println!("    {line}");
    }
    let verb = if applied.is_some() { "applied" } else { "planned" };
    for action in plan_actions(&change, &decision) {
        println!("  {verb}: {}", action.name());
    }
    if let Some(issue) = applied.and_then(|a| a.opened_issue) {
        println!("  opened issue #{issue}");
    }
    Ok(())
}

fn print_report(report: &CycleReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(report)?);
        return Ok(());
    }

    for change in &report.changes {
        match (&change.decision, &change.error) {
            (Some(d), None) => println!(
                "#{:<6} {:<12} {}",
                change.number,
                d.tag().to_string(),
                change.title
            ),
            (Some(d), Some(err)) => println!(
                "#{:<6} {:<12} {} (failed: {err})",
                change.number,
                d.tag().to_string(),
                change.title
            ),
            (None, Some(err)) => println!("#{:<6} {:<12} {err}", change.number, "error"),
            (None, None) => {}
        }
    }
    println!(
        "examined {}, skipped {}, accepted {}, rejected {}, held {}, info requested {}, failed {}",
        report.examined,
        report.skipped,
        report.count(DecisionTag::Accept),
        report.count(DecisionTag::Reject),
        report.count(DecisionTag::Hold),
        report.count(DecisionTag::RequestInfo),
        report.failures().count(),
    );
    Ok(())
}

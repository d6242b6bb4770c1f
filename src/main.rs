//! `promote` - GitLab merge and release automation

mod cli;

use anstream::{eprintln, println};
use anyhow::{Context, bail};
use clap::Parser;
use cli::context::CommandContext;
use cli::style::Stylize;
use cli::{Actions, Args, CliProgress};
use glpromote::cancel::CancelToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    if !args.has_action() {
        bail!("nothing to do: pass --diff, --merge-create, --merge, --build or --build-tags");
    }
    let actions = Actions::from_args(&args, chrono::Local::now().naive_local())?;

    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    let ctx = CommandContext::new(&args, cancel)
        .with_context(|| format!("failed to set up project {}", args.project))?;
    let progress = if args.verbose {
        CliProgress::verbose()
    } else {
        CliProgress::compact()
    };

    let failures = run(&ctx, &actions, args.confirm, &progress).await;
    if failures > 0 {
        bail!("{failures} operation(s) failed");
    }
    Ok(())
}

/// Run every requested flow in order. Returns the number of failures.
async fn run(ctx: &CommandContext, actions: &Actions, confirm: bool, progress: &CliProgress) -> usize {
    let mut failures = 0;

    if !actions.diffs.is_empty() {
        failures += cli::diff::run_diff(ctx, &actions.diffs, progress).await;
    }

    let mut iids = actions.merges.clone();
    if !actions.creates.is_empty() {
        let (created, failed) = cli::diff::run_merge_create(ctx, &actions.creates, progress).await;
        failures += failed;
        if actions.land {
            for iid in created {
                if !iids.contains(&iid) {
                    iids.push(iid);
                }
            }
        }
    }

    if actions.land {
        failures += cli::merge::run_merge(ctx, &iids, progress).await;
    }

    if let Some(options) = &actions.build {
        if let Err(e) = cli::promote::run_build(ctx, options, confirm, progress).await {
            failures += 1;
            println!("{}", format!("⚠️  Build failed: {e}").warn());
        }
    }

    if let Some((destination, options)) = &actions.build_tags {
        if let Err(e) = cli::promote::run_build_tags(ctx, destination, options, progress).await {
            failures += 1;
            println!("{}", format!("⚠️  Tagging failed: {e}").warn());
        }
    }

    if ctx.cancel.is_cancelled() {
        eprintln!("{}", "Interrupted".warn());
    }
    failures
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "glpromote=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

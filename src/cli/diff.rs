//! Diff and merge-create commands

use crate::cli::CliProgress;
use crate::cli::context::CommandContext;
use crate::cli::style::{Stylize, check};
use anstream::println;
use glpromote::changes::format_plain;
use glpromote::merge::{Acquisition, BranchPair};
use glpromote::release::DiffRequest;

/// Print the changelog for each request. Returns the number of failures.
pub async fn run_diff(ctx: &CommandContext, requests: &[DiffRequest], progress: &CliProgress) -> usize {
    let results = ctx.coordinator(progress).report_diffs(requests).await;
    progress.clear();

    let mut failures = 0;
    for item in results {
        let request = &item.item;
        println!();
        println!(
            "{} {} {} {}",
            "Commits on".emphasis(),
            request.source.accent(),
            "not in".muted(),
            request.destination.accent()
        );

        match item.result {
            Ok(change_set) if change_set.is_empty() => {
                println!("{}", "Nothing new.".muted());
            }
            Ok(change_set) => {
                println!("{}", format_plain(request.group_by, &change_set.commit_changes));
                println!(
                    "{}",
                    format!(
                        "{} commit(s), {} file(s) changed",
                        change_set.total_commits, change_set.total_files
                    )
                    .muted()
                );
            }
            Err(e) => {
                failures += 1;
                println!("{}", format!("⚠️  {e}").warn());
            }
        }
    }
    failures
}

/// Open (or reuse) an MR per pair. Returns the acquired iids and the
/// number of failures.
pub async fn run_merge_create(
    ctx: &CommandContext,
    pairs: &[BranchPair],
    progress: &CliProgress,
) -> (Vec<u64>, usize) {
    let results = ctx.coordinator(progress).create_from_diffs(pairs).await;
    progress.clear();

    let mut iids = Vec::new();
    let mut failures = 0;
    for item in results {
        let pair = &item.item;
        match item.result {
            Ok(None) => {}
            Ok(Some(Acquisition::Unavailable { reason, .. })) => {
                failures += 1;
                println!(
                    "{}",
                    format!("⚠️  No MR for {} → {}: {reason}", pair.source, pair.target).warn()
                );
            }
            Ok(Some(acquisition)) => {
                if let Some(mr) = acquisition.merge_request() {
                    let verb = if acquisition.is_reused() { "Reusing" } else { "Created" };
                    println!(
                        "{} {verb} MR !{} {}",
                        check(),
                        mr.iid,
                        mr.web_url.muted()
                    );
                    iids.push(mr.iid);
                }
            }
            Err(e) => {
                failures += 1;
                println!("{}", format!("⚠️  {e}").warn());
            }
        }
    }
    (iids, failures)
}

//! Merge command - land merge requests into main

use crate::cli::CliProgress;
use crate::cli::context::CommandContext;
use crate::cli::style::{CHECK, Stylize};
use anstream::println;
use glpromote::merge::LandedMerge;
use glpromote::release::ItemResult;

/// Land `iids` into main, one at a time. Returns the number of failures.
pub async fn run_merge(ctx: &CommandContext, iids: &[u64], progress: &CliProgress) -> usize {
    if iids.is_empty() {
        return 0;
    }

    println!();
    println!(
        "{} {} {}",
        "Merging".emphasis(),
        format!("{} MR(s) into", iids.len()).accent(),
        ctx.config.main_branch.accent()
    );

    let results = ctx.coordinator(progress).land_to_main(iids).await;
    progress.clear();
    print_merge_summary(&results)
}

fn print_merge_summary(results: &[ItemResult<u64, LandedMerge>]) -> usize {
    let merged: Vec<String> = results
        .iter()
        .filter_map(|item| item.result.as_ref().ok().map(|landed| describe(item.item, landed)))
        .collect();
    let failed: Vec<(u64, String)> = results
        .iter()
        .filter_map(|item| item.result.as_ref().err().map(|e| (item.item, e.to_string())))
        .collect();

    println!();
    if failed.is_empty() {
        println!("{}", format!("{CHECK} Merge complete!").success());
    } else {
        println!("{} Merge partially complete", "⚠️".warn());
    }

    if !merged.is_empty() {
        println!("   Merged: {}", merged.join(", ").accent());
    }
    for (iid, message) in &failed {
        println!("   {} !{}", "Failed:".warn(), iid.warn());
        println!("          {}", message.muted());
    }

    failed.len()
}

fn describe(iid: u64, landed: &LandedMerge) -> String {
    if landed.queued_on_pipeline {
        format!("!{iid} (queued on pipeline)")
    } else {
        format!("!{iid}")
    }
}

//! Build commands - promote main into deploy, tag releases

use crate::cli::CliProgress;
use crate::cli::context::CommandContext;
use crate::cli::style::{CHECK, Stylize, arrow};
use anstream::println;
use dialoguer::Confirm;
use glpromote::changes::{ChangeSetAnalyzer, GroupBy, format_plain};
use glpromote::error::{Error, Result};
use glpromote::release::{PromoteOptions, PromoteOutcome, PromoteReport};

/// Run the build command
///
/// With `confirm`, the changelog is shown first and nothing happens
/// unless the user agrees.
pub async fn run_build(
    ctx: &CommandContext,
    options: &PromoteOptions,
    confirm: bool,
    progress: &CliProgress,
) -> Result<()> {
    let source = options
        .source
        .clone()
        .unwrap_or_else(|| ctx.config.main_branch.clone());
    let destination = match &options.destination {
        Some(d) => d.clone(),
        None => ctx.config.require_deploy_branch()?.to_string(),
    };

    println!();
    println!(
        "{} {} {} {} {}",
        "Promoting".emphasis(),
        source.accent(),
        arrow(),
        destination.accent(),
        format!("(project {})", ctx.config.project_id).muted()
    );

    if confirm && !preview_and_confirm(ctx, &source, &destination).await? {
        println!("{}", "Aborted".muted());
        return Ok(());
    }

    let options = PromoteOptions {
        source: Some(source),
        destination: Some(destination),
        ..options.clone()
    };
    let outcome = ctx.coordinator(progress).promote_to_deploy(&options).await;
    progress.clear();

    match outcome? {
        PromoteOutcome::NothingToPromote { .. } => {
            println!("{}", "Nothing to promote.".muted());
        }
        PromoteOutcome::Promoted(report) => print_promote_summary(&report),
    }
    Ok(())
}

/// Show what a promotion would carry. Returns whether to proceed.
async fn preview_and_confirm(ctx: &CommandContext, source: &str, destination: &str) -> Result<bool> {
    let change_set = ChangeSetAnalyzer::new(ctx.host.as_ref())
        .diff(source, destination)
        .await?;
    if change_set.is_empty() {
        // Let the promote flow report it
        return Ok(true);
    }

    println!();
    println!("{}", format_plain(GroupBy::None, &change_set.commit_changes));
    println!();

    Confirm::new()
        .with_prompt(format!(
            "Promote {} commit(s) into {destination}?",
            change_set.total_commits
        ))
        .default(false)
        .interact()
        .map_err(|e| Error::Internal(format!("Failed to read confirmation: {e}")))
}

fn print_promote_summary(report: &PromoteReport) {
    println!();
    println!(
        "{} {} commit(s) {} {} {}",
        format!("{CHECK} Promoted").success(),
        report.change_set.total_commits.accent(),
        report.source.accent(),
        arrow(),
        report.destination.accent()
    );

    let verb = if report.reused { "reused" } else { "created" };
    println!(
        "   MR !{} ({verb}): {}",
        report.merge_request.iid,
        report.merge_request.web_url.muted()
    );

    if report.landed.queued_on_pipeline {
        println!("   {}", "Merge queued until the pipeline succeeds".warn());
    }
    if let Some(url) = &report.merge_commit_url {
        println!("   Commit: {}", url.accent());
    }
    match &report.tag {
        Some(tag) => println!("   Tag: {}", tag.accent()),
        None => println!("   {}", "No tag created".muted()),
    }
}

/// Run the tag-only release command
pub async fn run_build_tags(
    ctx: &CommandContext,
    destination: &str,
    options: &PromoteOptions,
    progress: &CliProgress,
) -> Result<()> {
    println!();
    println!(
        "{} {} {}",
        "Tagging".emphasis(),
        ctx.config.require_deploy_branch()?.accent(),
        format!("(compared with {destination})").muted()
    );

    let created = ctx.coordinator(progress).tag_release(destination, options).await;
    progress.clear();

    match created? {
        Some(tag) => println!("{} {}", format!("{CHECK} Tagged").success(), tag.accent()),
        None => println!("{}", "Nothing new to tag.".muted()),
    }
    Ok(())
}

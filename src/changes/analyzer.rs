//! Commit delta between two branches, without merge noise

use crate::error::{Error, Result};
use crate::platform::HostService;
use crate::types::{ChangeSetResult, CommitChange, CompareResult, RawCommit};
use chrono::{DateTime, FixedOffset};
use tracing::debug;

/// Title of the merge request that promotes one branch into another
pub fn promotion_title(source: &str, target: &str) -> String {
    format!("Sync {source} into {target}")
}

/// Length of a short SHA when the host does not provide one
const SHORT_SHA_LEN: usize = 8;

const UNKNOWN_DATE: &str = "unknown date";

/// Whether a commit only integrates another branch.
///
/// True for multi-parent commits, for conventional merge titles and for
/// `promotion`, the title this tool gives its own promotion merges.
pub fn is_merge_noise(commit: &RawCommit, promotion: &str) -> bool {
    if commit.parent_ids.len() > 1 {
        return true;
    }

    let text = if commit.title.is_empty() {
        commit.message.lines().next().unwrap_or_default()
    } else {
        commit.title.as_str()
    };
    let title = text.trim().to_lowercase();

    title.starts_with("merge ")
        || title.contains("merge branch")
        || title.contains("merge remote-tracking branch")
        || title == promotion.trim().to_lowercase()
}

/// Filter noise, reorder oldest-first and project into changelog records.
///
/// `promotion` is the promotion title for the compared pair.
pub fn build_change_set(compare: CompareResult, promotion: &str) -> ChangeSetResult {
    let commit_changes: Vec<CommitChange> = compare
        .commits
        .iter()
        .filter(|c| !is_merge_noise(c, promotion))
        .rev()
        .enumerate()
        .map(|(index, commit)| project_commit(index, commit))
        .collect();

    ChangeSetResult {
        total_commits: commit_changes.len(),
        total_files: compare.diff_count,
        commit_changes,
    }
}

fn project_commit(index: usize, commit: &RawCommit) -> CommitChange {
    let short_sha = commit
        .short_id
        .clone()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| commit.id.chars().take(SHORT_SHA_LEN).collect());

    let timestamp = commit
        .created_at
        .as_deref()
        .or(commit.committed_date.as_deref())
        .and_then(|ts| DateTime::<FixedOffset>::parse_from_rfc3339(ts).ok());

    let (date, date_time) = timestamp.map_or_else(
        || (UNKNOWN_DATE.to_string(), UNKNOWN_DATE.to_string()),
        |ts| {
            (
                ts.format("%d/%m/%Y").to_string(),
                ts.format("%d/%m/%Y %H:%M").to_string(),
            )
        },
    );

    let messages = commit
        .message
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .map(ToString::to_string)
        .collect();

    CommitChange {
        index,
        short_sha,
        date,
        date_time,
        author: commit.author_name.clone(),
        title: commit.title.clone(),
        messages,
    }
}

/// Computes what a promotion would carry
pub struct ChangeSetAnalyzer<'a> {
    host: &'a dyn HostService,
}

impl<'a> ChangeSetAnalyzer<'a> {
    /// Create an analyzer
    pub fn new(host: &'a dyn HostService) -> Self {
        Self { host }
    }

    /// Commits in `source` but not in `destination`, oldest first.
    ///
    /// An empty result means there is nothing to promote; it is not an error.
    pub async fn diff(&self, source: &str, destination: &str) -> Result<ChangeSetResult> {
        debug!(source, destination, "computing change set");
        let compare = self
            .host
            .compare_branches(destination, source)
            .await
            .map_err(|e| Error::DiffFetch {
                from: destination.to_string(),
                to: source.to_string(),
                message: e.to_string(),
            })?;

        let raw = compare.commits.len();
        let result = build_change_set(compare, &promotion_title(source, destination));
        debug!(
            raw,
            kept = result.total_commits,
            files = result.total_files,
            "computed change set"
        );
        Ok(result)
    }
}

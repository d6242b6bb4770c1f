//! Core types for glpromote

use serde::{Deserialize, Serialize};

/// A merge request as seen at fetch time
///
/// Never cached across polls: the status is only authoritative at the
/// moment it was fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeRequest {
    /// Project-scoped MR id
    pub iid: u64,
    /// MR title
    pub title: String,
    /// Source branch name
    pub source_branch: String,
    /// Target branch name
    pub target_branch: String,
    /// Classified mergeability status
    pub status: MergeStatus,
    /// Whether the host reports conflicts
    pub has_conflicts: bool,
    /// Web URL for the MR
    pub web_url: String,
    /// Merge commit SHA, once merged
    pub merge_commit_sha: Option<String>,
}

/// Mergeability of a merge request, classified into three buckets
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeStatus {
    /// Terminal success: a merge may be issued now
    Ready(Readiness),
    /// Terminal failure: waiting will not help
    Blocked(BlockReason),
    /// Still computing (or unknown); carries the raw status string
    Pending(String),
}

impl std::fmt::Display for MergeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ready(r) => write!(f, "{r}"),
            Self::Blocked(b) => write!(f, "{b}"),
            Self::Pending(raw) if raw.is_empty() => write!(f, "(none)"),
            Self::Pending(raw) => write!(f, "{raw}"),
        }
    }
}

/// Ready statuses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// `mergeable`
    Mergeable,
    /// `can_be_merged` (legacy `merge_status` value)
    CanBeMerged,
    /// `ci_must_pass`: merge has to be queued on the pipeline
    CiMustPass,
}

impl Readiness {
    /// Whether the merge must be requested as "merge when pipeline succeeds"
    pub const fn queue_on_pipeline(self) -> bool {
        matches!(self, Self::CiMustPass)
    }

    /// Raw host spelling
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mergeable => "mergeable",
            Self::CanBeMerged => "can_be_merged",
            Self::CiMustPass => "ci_must_pass",
        }
    }
}

impl std::fmt::Display for Readiness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Conditions that block a merge and do not resolve by waiting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockReason {
    /// `conflicts`
    Conflicts,
    /// `cannot_be_merged`
    CannotBeMerged,
    /// `ff_only_enabled`
    FfOnlyEnabled,
    /// `not_approved`
    NotApproved,
    /// `discussions_not_resolved`
    DiscussionsNotResolved,
}

impl BlockReason {
    /// Raw host spelling
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Conflicts => "conflicts",
            Self::CannotBeMerged => "cannot_be_merged",
            Self::FfOnlyEnabled => "ff_only_enabled",
            Self::NotApproved => "not_approved",
            Self::DiscussionsNotResolved => "discussions_not_resolved",
        }
    }
}

impl std::fmt::Display for BlockReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options for the merge call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOptions {
    /// Request "merge when pipeline succeeds" instead of an immediate merge
    pub queue_on_pipeline: bool,
    /// Custom merge commit message
    pub commit_message: Option<String>,
}

/// Host response to an accepted merge call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    /// MR state after the call ("merged", "opened" when queued)
    pub state: String,
    /// Merge commit SHA (absent while queued on a pipeline)
    pub merge_commit_sha: Option<String>,
}

/// A commit as reported by the compare endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawCommit {
    /// Full SHA
    pub id: String,
    /// Abbreviated SHA
    #[serde(default)]
    pub short_id: Option<String>,
    /// First line of the message
    #[serde(default)]
    pub title: String,
    /// Full message
    #[serde(default)]
    pub message: String,
    /// Author name
    #[serde(default)]
    pub author_name: String,
    /// Creation timestamp (RFC 3339)
    #[serde(default)]
    pub created_at: Option<String>,
    /// Commit timestamp (RFC 3339)
    #[serde(default)]
    pub committed_date: Option<String>,
    /// Parent SHAs
    #[serde(default)]
    pub parent_ids: Vec<String>,
}

/// Result of comparing two branches
#[derive(Debug, Clone, Default)]
pub struct CompareResult {
    /// Commits reachable from head but not base, newest first
    pub commits: Vec<RawCommit>,
    /// Number of changed files
    pub diff_count: usize,
}

/// A commit that represents real work, projected for changelogs
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitChange {
    /// Zero-based position, oldest first
    pub index: usize,
    /// Abbreviated SHA
    pub short_sha: String,
    /// Calendar date, `DD/MM/YYYY`
    pub date: String,
    /// Date and time, `DD/MM/YYYY HH:mm`
    pub date_time: String,
    /// Author name
    pub author: String,
    /// Commit title
    pub title: String,
    /// Non-blank message lines, title first
    pub messages: Vec<String>,
}

/// Commits present in one branch but not another
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeSetResult {
    /// Qualifying commits, oldest first
    pub commit_changes: Vec<CommitChange>,
    /// Number of qualifying commits
    pub total_commits: usize,
    /// Number of changed files
    pub total_files: usize,
}

impl ChangeSetResult {
    /// Whether there is nothing to promote
    pub fn is_empty(&self) -> bool {
        self.commit_changes.is_empty()
    }
}

//! Mergeability classification - pure functions, no I/O

use crate::types::{BlockReason, MergeStatus, Readiness};

impl MergeStatus {
    /// Classify a raw `detailed_merge_status`/`merge_status` string.
    ///
    /// Anything not explicitly ready or blocked is pending, including the
    /// empty string and statuses introduced by newer host versions.
    pub fn classify(raw: &str) -> Self {
        match raw {
            "mergeable" => Self::Ready(Readiness::Mergeable),
            "can_be_merged" => Self::Ready(Readiness::CanBeMerged),
            "ci_must_pass" => Self::Ready(Readiness::CiMustPass),
            "conflicts" => Self::Blocked(BlockReason::Conflicts),
            "cannot_be_merged" => Self::Blocked(BlockReason::CannotBeMerged),
            "ff_only_enabled" => Self::Blocked(BlockReason::FfOnlyEnabled),
            "not_approved" => Self::Blocked(BlockReason::NotApproved),
            "discussions_not_resolved" => Self::Blocked(BlockReason::DiscussionsNotResolved),
            other => Self::Pending(other.to_string()),
        }
    }

    /// Whether polling should stop on this status
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending(_))
    }
}

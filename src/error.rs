//! Error types for glpromote

use crate::types::BlockReason;
use thiserror::Error;

/// Errors produced while talking to the host or sequencing a release
#[derive(Debug, Error)]
pub enum Error {
    /// Host answered with a non-success status
    #[error("GitLab API returned {status}: {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body (truncated) or reason phrase
        message: String,
    },

    /// Transport failure (connect, timeout, decode)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Reading a merge request failed
    #[error("failed to fetch MR !{iid}: {message}")]
    Fetch {
        /// Merge request iid
        iid: u64,
        /// Underlying failure
        message: String,
    },

    /// Retargeting a merge request was rejected
    #[error("failed to retarget MR !{iid} to {target}: {message}")]
    Retarget {
        /// Merge request iid
        iid: u64,
        /// Requested target branch
        target: String,
        /// Underlying failure
        message: String,
    },

    /// Merge request is in a state that waiting will not fix
    #[error("MR !{iid} is blocked by: {reason}")]
    MergeBlocked {
        /// Merge request iid
        iid: u64,
        /// Blocking condition reported by the host
        reason: BlockReason,
    },

    /// Poll budget spent without the merge request becoming ready
    #[error("MR !{iid} not mergeable after {attempts} attempt(s) (last status: {last_status})")]
    PollExhausted {
        /// Merge request iid
        iid: u64,
        /// Number of polls performed
        attempts: u32,
        /// Last raw status observed, or the last fetch error
        last_status: String,
    },

    /// The merge call itself was rejected
    #[error("merge of MR !{iid} failed ({status}): {message}")]
    MergeRequestFailed {
        /// Merge request iid
        iid: u64,
        /// HTTP status code, 0 when the request never got an answer
        status: u16,
        /// Host message
        message: String,
    },

    /// Neither creation nor reuse produced a merge request
    #[error("no open MR from {source_branch} -> {target_branch}; create failed ({reason}) and reuse found nothing")]
    NoMergeRequestAvailable {
        /// Source branch
        source_branch: String,
        /// Target branch
        target_branch: String,
        /// Why creation failed
        reason: String,
    },

    /// Merge request does not point at the branch the flow expects
    #[error("MR !{iid} targets {actual}, expected {expected}")]
    TargetMismatch {
        /// Merge request iid
        iid: u64,
        /// Branch the flow requires
        expected: String,
        /// Branch the merge request targets
        actual: String,
    },

    /// A tag with this name already exists
    #[error("tag {0} already exists")]
    TagConflict(String),

    /// Tag creation was rejected for another reason
    #[error("failed to create tag {name} ({status}): {message}")]
    TagCreate {
        /// Tag name
        name: String,
        /// HTTP status code, 0 when the request never got an answer
        status: u16,
        /// Host message
        message: String,
    },

    /// Two release tags share the same version and sequence at the top of the series
    #[error("ambiguous latest release tag: {0} has a duplicate with the same version and sequence")]
    DuplicateTag(String),

    /// Branch comparison failed
    #[error("failed to compare {from}...{to}: {message}")]
    DiffFetch {
        /// Compare base
        from: String,
        /// Compare head
        to: String,
        /// Underlying failure
        message: String,
    },

    /// Configuration or registry problem
    #[error("configuration error: {0}")]
    Config(String),

    /// Operation interrupted by the user
    #[error("cancelled")]
    Cancelled,

    /// Unexpected internal failure
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Status and message pair for wrapping host failures into flow errors
    pub(crate) fn status_and_message(&self) -> (u16, String) {
        match self {
            Self::Api { status, message } => (*status, message.clone()),
            other => (0, other.to_string()),
        }
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

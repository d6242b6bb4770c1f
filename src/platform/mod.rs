//! Hosting service client
//!
//! Provides the narrow set of merge request, tag and compare operations
//! the release flows sequence. Any non-2xx answer surfaces as
//! [`Error::Api`](crate::error::Error::Api); callers map it into the
//! flow-specific error they need.

mod gitlab;

pub use gitlab::GitLabService;

use crate::error::Result;
use crate::types::{CompareResult, MergeOptions, MergeOutcome, MergeRequest};
use async_trait::async_trait;
use serde::Serialize;

/// Fields to change on an existing merge request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeRequestUpdate {
    /// New target branch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_branch: Option<String>,
    /// New title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// New description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl MergeRequestUpdate {
    /// Update that only changes the target branch
    pub fn retarget(target: &str) -> Self {
        Self {
            target_branch: Some(target.to_string()),
            ..Self::default()
        }
    }
}

/// Host service trait for merge request, tag and compare operations
///
/// Abstracts the hosting API so orchestration code can be exercised
/// against an in-memory mock.
#[async_trait]
pub trait HostService: Send + Sync {
    /// Fetch a merge request with its current mergeability status
    async fn get_merge_request(&self, iid: u64) -> Result<MergeRequest>;

    /// Update fields of a merge request
    async fn update_merge_request(
        &self,
        iid: u64,
        update: &MergeRequestUpdate,
    ) -> Result<MergeRequest>;

    /// Merge a merge request, immediately or queued on its pipeline
    async fn merge_merge_request(&self, iid: u64, options: &MergeOptions) -> Result<MergeOutcome>;

    /// Open a new merge request
    async fn create_merge_request(
        &self,
        source: &str,
        target: &str,
        title: &str,
        description: Option<&str>,
    ) -> Result<MergeRequest>;

    /// List open merge requests for a source/target pair
    async fn list_open_merge_requests(&self, source: &str, target: &str)
    -> Result<Vec<MergeRequest>>;

    /// List tag names, one page at a time (pages start at 1)
    async fn list_tags(&self, page: u32, per_page: u32) -> Result<Vec<String>>;

    /// Create a tag on a ref; returns the created tag name
    async fn create_tag(&self, name: &str, git_ref: &str, message: &str) -> Result<String>;

    /// Compare two refs: commits reachable from `to` but not from `from`
    async fn compare_branches(&self, from: &str, to: &str) -> Result<CompareResult>;
}

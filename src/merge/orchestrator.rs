//! Merge orchestration - effectful operations
//!
//! Drives a merge request from "exists" to "merged": optional retarget,
//! mergeability polling, and the merge call itself.

use crate::cancel::CancelToken;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::platform::{HostService, MergeRequestUpdate};
use crate::progress::ProgressCallback;
use crate::types::{MergeOptions, MergeOutcome, MergeRequest, MergeStatus, Readiness};
use tracing::debug;

/// Source and target of a merge request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchPair {
    /// Source branch
    pub source: String,
    /// Target branch
    pub target: String,
}

/// A merge that the host accepted
#[derive(Debug, Clone)]
pub struct LandedMerge {
    /// The merge request as last polled (status was ready)
    pub merge_request: MergeRequest,
    /// Whether the merge was queued on the pipeline instead of merged now
    pub queued_on_pipeline: bool,
    /// Host response to the merge call
    pub outcome: MergeOutcome,
}

/// How `create_or_reuse` obtained a merge request
#[derive(Debug, Clone)]
pub enum Acquisition {
    /// A new merge request was opened
    Created(MergeRequest),
    /// Creation failed; an open merge request for the same pair was reused
    Reused(MergeRequest),
    /// Creation failed and no open merge request exists
    Unavailable {
        /// Source branch
        source: String,
        /// Target branch
        target: String,
        /// Why creation failed
        reason: String,
    },
}

impl Acquisition {
    /// The acquired merge request, if any
    pub const fn merge_request(&self) -> Option<&MergeRequest> {
        match self {
            Self::Created(mr) | Self::Reused(mr) => Some(mr),
            Self::Unavailable { .. } => None,
        }
    }

    /// Whether an existing merge request was reused
    pub const fn is_reused(&self) -> bool {
        matches!(self, Self::Reused(_))
    }

    /// The acquired merge request, or `NoMergeRequestAvailable`
    pub fn into_merge_request(self) -> Result<MergeRequest> {
        match self {
            Self::Created(mr) | Self::Reused(mr) => Ok(mr),
            Self::Unavailable {
                source,
                target,
                reason,
            } => Err(Error::NoMergeRequestAvailable {
                source_branch: source,
                target_branch: target,
                reason,
            }),
        }
    }
}

/// Merge request lifecycle driver
///
/// Every host call is issued sequentially; later steps depend on what
/// earlier ones observed.
pub struct MergeOrchestrator<'a> {
    host: &'a dyn HostService,
    config: &'a Config,
    progress: &'a dyn ProgressCallback,
    cancel: CancelToken,
}

impl<'a> MergeOrchestrator<'a> {
    /// Create an orchestrator
    pub fn new(
        host: &'a dyn HostService,
        config: &'a Config,
        progress: &'a dyn ProgressCallback,
    ) -> Self {
        Self {
            host,
            config,
            progress,
            cancel: CancelToken::new(),
        }
    }

    /// Use an externally controlled cancellation token
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Make sure a merge request targets the configured main branch.
    ///
    /// Retargets it when it points elsewhere.
    pub async fn ensure_target_is_main(&self, iid: u64) -> Result<BranchPair> {
        let main = &self.config.main_branch;
        let mr = self
            .host
            .get_merge_request(iid)
            .await
            .map_err(|e| Error::Fetch {
                iid,
                message: e.to_string(),
            })?;

        self.progress
            .on_message(&format!(
                "ℹ️  MR !{iid}: {} -> {}",
                mr.source_branch, mr.target_branch
            ))
            .await;

        if &mr.target_branch != main {
            self.progress
                .on_message(&format!("🛠  Retarget MR !{iid} to {main}"))
                .await;
            self.host
                .update_merge_request(iid, &MergeRequestUpdate::retarget(main))
                .await
                .map_err(|e| Error::Retarget {
                    iid,
                    target: main.clone(),
                    message: e.to_string(),
                })?;
        }

        Ok(BranchPair {
            source: mr.source_branch,
            target: main.clone(),
        })
    }

    /// Poll until the merge request is ready, blocked, or the budget runs out.
    ///
    /// Fetch failures count as pending. Blocked statuses fail on the spot.
    pub async fn poll_mergeable(&self, iid: u64) -> Result<(MergeRequest, Readiness)> {
        let retries = self.config.poll_retries;
        let mut last_status = String::from("(not polled)");

        for attempt in 1..=retries {
            self.cancel.check()?;
            let remaining = retries - attempt;

            match self.host.get_merge_request(iid).await {
                Ok(mr) => {
                    let status = mr.status.to_string();
                    self.progress
                        .on_poll(iid, &status, mr.has_conflicts, remaining)
                        .await;

                    match mr.status {
                        MergeStatus::Ready(readiness) => return Ok((mr, readiness)),
                        MergeStatus::Blocked(reason) => {
                            return Err(Error::MergeBlocked { iid, reason });
                        }
                        MergeStatus::Pending(_) => last_status = status,
                    }
                }
                Err(e) => {
                    debug!(mr_iid = iid, attempt, error = %e, "poll fetch failed");
                    last_status = format!("fetch failed: {e}");
                }
            }

            if remaining > 0 {
                tokio::time::sleep(self.config.poll_delay()).await;
            }
        }

        Err(Error::PollExhausted {
            iid,
            attempts: retries,
            last_status,
        })
    }

    /// Wait for mergeability, then merge into `target_ref`.
    pub async fn merge_into(&self, target_ref: &str, iid: u64) -> Result<LandedMerge> {
        self.merge_into_with_message(target_ref, iid, None).await
    }

    /// Like [`merge_into`](Self::merge_into) with a custom merge commit message.
    pub async fn merge_into_with_message(
        &self,
        target_ref: &str,
        iid: u64,
        commit_message: Option<&str>,
    ) -> Result<LandedMerge> {
        let (mr, readiness) = self.poll_mergeable(iid).await?;

        if mr.target_branch != target_ref {
            return Err(Error::TargetMismatch {
                iid,
                expected: target_ref.to_string(),
                actual: mr.target_branch,
            });
        }

        let queue_on_pipeline = readiness.queue_on_pipeline();
        self.progress
            .on_message(&format!(
                "🔀 Merge MR !{iid} → {target_ref} (queue_on_pipeline={queue_on_pipeline})"
            ))
            .await;

        let options = MergeOptions {
            queue_on_pipeline,
            commit_message: commit_message.map(ToString::to_string),
        };
        let outcome = self
            .host
            .merge_merge_request(iid, &options)
            .await
            .map_err(|e| {
                let (status, message) = e.status_and_message();
                Error::MergeRequestFailed {
                    iid,
                    status,
                    message,
                }
            })?;

        self.progress
            .on_message(&format!("✅ Merge accepted: MR !{iid} state={}", outcome.state))
            .await;

        Ok(LandedMerge {
            merge_request: mr,
            queued_on_pipeline: queue_on_pipeline,
            outcome,
        })
    }

    /// Open a merge request `source -> target`, or reuse an open one.
    ///
    /// Any creation failure (including "already exists") falls back to the
    /// first open merge request for the same pair. With `auto_merge`, the
    /// acquired merge request is landed right away.
    pub async fn create_or_reuse(
        &self,
        source: &str,
        target: &str,
        description: Option<&str>,
        title: &str,
        auto_merge: bool,
    ) -> Result<Acquisition> {
        let acquisition = match self
            .host
            .create_merge_request(source, target, title, description)
            .await
        {
            Ok(mr) => {
                self.progress
                    .on_message(&format!("✅ Created MR !{}: {source} -> {target}", mr.iid))
                    .await;
                Acquisition::Created(mr)
            }
            Err(create_err) => {
                debug!(source, target, error = %create_err, "create failed, looking for open MR");
                self.find_open(source, target, &create_err).await
            }
        };

        if let Acquisition::Reused(mr) = &acquisition {
            self.progress
                .on_message(&format!("ℹ️  Reuse MR !{}: {source} -> {target}", mr.iid))
                .await;
        }

        if auto_merge {
            if let Some(mr) = acquisition.merge_request() {
                self.merge_into(target, mr.iid).await?;
            }
        }

        Ok(acquisition)
    }

    async fn find_open(&self, source: &str, target: &str, create_err: &Error) -> Acquisition {
        let unavailable = |reason: String| Acquisition::Unavailable {
            source: source.to_string(),
            target: target.to_string(),
            reason,
        };

        match self.host.list_open_merge_requests(source, target).await {
            Ok(open) => open
                .into_iter()
                .find(|mr| mr.source_branch == source && mr.target_branch == target)
                .map_or_else(|| unavailable(create_err.to_string()), Acquisition::Reused),
            Err(list_err) => unavailable(format!(
                "{create_err}; listing open MRs failed: {list_err}"
            )),
        }
    }
}

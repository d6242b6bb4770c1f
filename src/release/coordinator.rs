//! Top-level release flows
//!
//! Composes the orchestrator, analyzer, formatter and sequencer into the
//! flows the command line exposes. Batch flows return one result per item;
//! a failing item never stops the rest.

use crate::cancel::CancelToken;
use crate::changes::{ChangeSetAnalyzer, GroupBy, format_markdown, format_plain, promotion_title};
use crate::config::Config;
use crate::error::Result;
use crate::merge::{Acquisition, BranchPair, LandedMerge, MergeOrchestrator};
use crate::platform::HostService;
use crate::progress::ProgressCallback;
use crate::release::TagSequencer;
use crate::types::{ChangeSetResult, MergeRequest};
use chrono::NaiveDateTime;
use url::Url;

/// Outcome of one batch item
#[derive(Debug)]
pub struct ItemResult<K, T> {
    /// The input item
    pub item: K,
    /// What happened to it
    pub result: Result<T>,
}

impl<K, T> ItemResult<K, T> {
    /// Whether this item succeeded
    pub const fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// A changelog request for one branch pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffRequest {
    /// Branch whose extra commits are reported
    pub source: String,
    /// Branch compared against
    pub destination: String,
    /// Grouping for the plain changelog
    pub group_by: GroupBy,
}

/// Options for promotion and tag-only releases
#[derive(Debug, Clone, Default)]
pub struct PromoteOptions {
    /// Source branch (defaults to the main branch)
    pub source: Option<String>,
    /// Destination branch (defaults to the deploy branch)
    pub destination: Option<String>,
    /// Fixed tag name instead of the next in sequence
    pub tag_name: Option<String>,
    /// Fixed tag message instead of the changelog
    pub tag_message: Option<String>,
}

/// What a completed promotion did
#[derive(Debug, Clone)]
pub struct PromoteReport {
    /// Promoted branch
    pub source: String,
    /// Branch promoted into
    pub destination: String,
    /// Commits carried by the promotion
    pub change_set: ChangeSetResult,
    /// The promotion merge request
    pub merge_request: MergeRequest,
    /// Whether an already open merge request was reused
    pub reused: bool,
    /// The accepted merge
    pub landed: LandedMerge,
    /// Web URL of the merge commit, when the merge happened immediately
    pub merge_commit_url: Option<String>,
    /// Created tag, when tagging is enabled
    pub tag: Option<String>,
}

/// Result of the promote flow
#[derive(Debug, Clone)]
pub enum PromoteOutcome {
    /// Source has no commits the destination lacks
    NothingToPromote {
        /// Source branch
        source: String,
        /// Destination branch
        destination: String,
    },
    /// Promotion merged (or queued)
    Promoted(Box<PromoteReport>),
}

/// Entry point for the land, promote, diff and tag flows
pub struct ReleaseCoordinator<'a> {
    host: &'a dyn HostService,
    config: &'a Config,
    progress: &'a dyn ProgressCallback,
    cancel: CancelToken,
}

impl<'a> ReleaseCoordinator<'a> {
    /// Create a coordinator
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

    fn orchestrator(&self) -> MergeOrchestrator<'a> {
        MergeOrchestrator::new(self.host, self.config, self.progress)
            .with_cancel(self.cancel.clone())
    }

    fn sequencer(&self) -> TagSequencer<'a> {
        TagSequencer::new(self.host).with_cancel(self.cancel.clone())
    }

    fn analyzer(&self) -> ChangeSetAnalyzer<'a> {
        ChangeSetAnalyzer::new(self.host)
    }

    /// Land one merge request into main: retarget if needed, then merge.
    pub async fn land(&self, iid: u64) -> Result<LandedMerge> {
        self.cancel.check()?;
        let orchestrator = self.orchestrator();
        orchestrator.ensure_target_is_main(iid).await?;
        orchestrator.merge_into(&self.config.main_branch, iid).await
    }

    /// Land several merge requests, one at a time, in input order.
    pub async fn land_to_main(&self, iids: &[u64]) -> Vec<ItemResult<u64, LandedMerge>> {
        let mut results = Vec::with_capacity(iids.len());
        for &iid in iids {
            self.progress
                .on_message(&format!(
                    "🔧 Merge MR !{iid} into {} (project {})",
                    self.config.main_branch, self.config.project_id
                ))
                .await;
            results.push(ItemResult {
                item: iid,
                result: self.land(iid).await,
            });
        }
        results
    }

    /// Compute change sets for several branch pairs.
    pub async fn report_diffs(
        &self,
        requests: &[DiffRequest],
    ) -> Vec<ItemResult<DiffRequest, ChangeSetResult>> {
        let mut results = Vec::with_capacity(requests.len());
        for request in requests {
            self.progress
                .on_message(&format!(
                    "📥 Commits in {} not in {}",
                    request.source, request.destination
                ))
                .await;
            let result = match self.cancel.check() {
                Ok(()) => {
                    self.analyzer()
                        .diff(&request.source, &request.destination)
                        .await
                }
                Err(e) => Err(e),
            };
            results.push(ItemResult {
                item: request.clone(),
                result,
            });
        }
        results
    }

    /// Open (or reuse) a merge request per pair, describing it with the
    /// markdown changelog. Pairs with nothing to merge yield `None`.
    pub async fn create_from_diffs(
        &self,
        pairs: &[BranchPair],
    ) -> Vec<ItemResult<BranchPair, Option<Acquisition>>> {
        let mut results = Vec::with_capacity(pairs.len());
        for pair in pairs {
            results.push(ItemResult {
                item: pair.clone(),
                result: self.create_from_diff(pair).await,
            });
        }
        results
    }

    async fn create_from_diff(&self, pair: &BranchPair) -> Result<Option<Acquisition>> {
        self.cancel.check()?;
        let change_set = self.analyzer().diff(&pair.source, &pair.target).await?;
        if change_set.is_empty() {
            self.progress
                .on_message(&format!(
                    "🎉 {} has nothing new for {}",
                    pair.source, pair.target
                ))
                .await;
            return Ok(None);
        }

        let description = format_markdown(&change_set.commit_changes);
        let title = format!("Merge branch {} into {}", pair.source, pair.target);
        let acquisition = self
            .orchestrator()
            .create_or_reuse(&pair.source, &pair.target, Some(&description), &title, false)
            .await?;
        Ok(Some(acquisition))
    }

    /// Promote main into deploy, then tag the release.
    pub async fn promote_to_deploy(&self, options: &PromoteOptions) -> Result<PromoteOutcome> {
        let source = options
            .source
            .clone()
            .unwrap_or_else(|| self.config.main_branch.clone());
        let destination = match &options.destination {
            Some(d) => d.clone(),
            None => self.config.require_deploy_branch()?.to_string(),
        };

        let change_set = self.analyzer().diff(&source, &destination).await?;
        if change_set.is_empty() {
            self.progress
                .on_message(&format!(
                    "🎉 Nothing to promote: {destination} is up to date with {source}"
                ))
                .await;
            return Ok(PromoteOutcome::NothingToPromote {
                source,
                destination,
            });
        }
        self.progress
            .on_message(&format!(
                "📝 {} commit(s) on {source} not in {destination}",
                change_set.total_commits
            ))
            .await;

        let orchestrator = self.orchestrator();
        let description = format_markdown(&change_set.commit_changes);
        let title = promotion_title(&source, &destination);
        let acquisition = orchestrator
            .create_or_reuse(&source, &destination, Some(&description), &title, false)
            .await?;
        let reused = acquisition.is_reused();
        let merge_request = acquisition.into_merge_request()?;

        // The merge commit carries the promotion title, which later diffs skip
        let landed = orchestrator
            .merge_into_with_message(&destination, merge_request.iid, Some(&title))
            .await?;
        let merge_commit_url = landed
            .outcome
            .merge_commit_sha
            .as_deref()
            .and_then(|sha| merge_commit_url(&landed.merge_request.web_url, sha));

        let tag = if self.config.auto_tag {
            // Tag the merge commit itself when known; the branch head may
            // still be pre-merge while the pipeline runs.
            let git_ref = landed
                .outcome
                .merge_commit_sha
                .clone()
                .unwrap_or_else(|| destination.clone());
            let message = options
                .tag_message
                .clone()
                .unwrap_or_else(|| format_plain(GroupBy::None, &change_set.commit_changes));
            Some(self.create_tag(options, &git_ref, &message).await?)
        } else {
            self.progress
                .on_message("🏷️  Skip tagging (auto-tag disabled)")
                .await;
            None
        };

        Ok(PromoteOutcome::Promoted(Box::new(PromoteReport {
            source,
            destination,
            change_set,
            merge_request,
            reused,
            landed,
            merge_commit_url,
            tag,
        })))
    }

    /// Tag the deploy branch without merging, when it has commits that
    /// `destination` lacks. Returns the created tag, or `None` when there
    /// is nothing new.
    pub async fn tag_release(
        &self,
        destination: &str,
        options: &PromoteOptions,
    ) -> Result<Option<String>> {
        let deploy = self.config.require_deploy_branch()?;
        let change_set = self.analyzer().diff(deploy, destination).await?;
        if change_set.is_empty() {
            self.progress
                .on_message(&format!("🎉 {deploy} has nothing new for {destination}"))
                .await;
            return Ok(None);
        }

        let message = options
            .tag_message
            .clone()
            .unwrap_or_else(|| default_tag_message(chrono::Local::now().naive_local()));
        Ok(Some(self.create_tag(options, deploy, &message).await?))
    }

    async fn create_tag(&self, options: &PromoteOptions, git_ref: &str, message: &str) -> Result<String> {
        let sequencer = self.sequencer();
        let name = match &options.tag_name {
            Some(name) => name.clone(),
            None => sequencer.compute_next_tag_name().await?,
        };
        self.progress
            .on_message(&format!("🏷️  Create tag {name} on {git_ref}"))
            .await;

        let created = sequencer.create_release(&name, git_ref, message).await?;
        self.progress
            .on_message(&format!("✅ Tag created: {created}"))
            .await;
        Ok(created)
    }
}

/// Web URL of a merge commit, derived from its merge request's URL.
///
/// `https://host/group/project/-/merge_requests/12` becomes
/// `https://host/group/project/-/commit/<sha>`.
pub fn merge_commit_url(web_url: &str, sha: &str) -> Option<String> {
    let mut url = Url::parse(web_url).ok()?;
    let segments: Vec<String> = url
        .path_segments()?
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect();
    let pos = segments.iter().rposition(|s| s == "merge_requests")?;

    {
        let mut path = url.path_segments_mut().ok()?;
        path.clear();
        path.extend(segments[..pos].iter().map(String::as_str));
        path.extend(["commit", sha]);
    }
    Some(url.to_string())
}

/// Tag message used when there is no changelog to attach
pub fn default_tag_message(now: NaiveDateTime) -> String {
    format!("Build at: {}", now.format("%d/%m/%Y %H:%M:%S"))
}

/// Tag message built from user-supplied changelog lines
pub fn custom_tag_message(lines: &[String], now: NaiveDateTime) -> String {
    let bullets: Vec<String> = lines.iter().map(|l| format!(" - {}", l.trim())).collect();
    format!(
        "Build at: {}\nChangelogs:\n{}",
        now.format("%d/%m/%Y %H:%M"),
        bullets.join("\n")
    )
}

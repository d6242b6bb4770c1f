//! GitLab REST v4 implementation of [`HostService`]

use crate::config::Config;
use crate::error::{Error, Result};
use crate::platform::{HostService, MergeRequestUpdate};
use crate::types::{CompareResult, MergeOptions, MergeOutcome, MergeRequest, MergeStatus, RawCommit};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// GitLab service using reqwest
pub struct GitLabService {
    client: Client,
    token: String,
    base_url: String,
}

#[derive(Deserialize)]
struct MergeRequestDto {
    iid: u64,
    #[serde(default)]
    title: String,
    source_branch: String,
    target_branch: String,
    #[serde(default)]
    detailed_merge_status: Option<String>,
    #[serde(default)]
    merge_status: Option<String>,
    #[serde(default)]
    has_conflicts: bool,
    #[serde(default)]
    web_url: String,
    #[serde(default)]
    merge_commit_sha: Option<String>,
}

impl From<MergeRequestDto> for MergeRequest {
    fn from(mr: MergeRequestDto) -> Self {
        // detailed_merge_status supersedes merge_status on newer GitLab
        let raw = mr
            .detailed_merge_status
            .filter(|s| !s.is_empty())
            .or(mr.merge_status)
            .unwrap_or_default();

        Self {
            iid: mr.iid,
            title: mr.title,
            source_branch: mr.source_branch,
            target_branch: mr.target_branch,
            status: MergeStatus::classify(&raw),
            has_conflicts: mr.has_conflicts,
            web_url: mr.web_url,
            merge_commit_sha: mr.merge_commit_sha,
        }
    }
}

#[derive(Deserialize)]
struct MergeResponse {
    #[serde(default)]
    state: String,
    #[serde(default)]
    merge_commit_sha: Option<String>,
}

#[derive(Deserialize)]
struct TagDto {
    name: String,
}

#[derive(Deserialize)]
struct CompareDto {
    #[serde(default)]
    commits: Vec<RawCommit>,
    #[serde(default)]
    diffs: Vec<serde_json::Value>,
}

#[derive(Serialize)]
struct CreateMrPayload<'a> {
    source_branch: &'a str,
    target_branch: &'a str,
    title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    remove_source_branch: bool,
}

#[derive(Serialize)]
struct MergePayload<'a> {
    merge_when_pipeline_succeeds: bool,
    should_remove_source_branch: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    merge_commit_message: Option<&'a str>,
}

/// Default request timeout in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Longest error body kept in an error message
const MAX_ERROR_BODY: usize = 2000;

impl GitLabService {
    /// Create a GitLab service for the configured project
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::Internal(format!("failed to create HTTP client: {e}")))?;

        let base_url = format!(
            "{}/api/v4/projects/{}",
            config.host.trim_end_matches('/'),
            urlencoding::encode(&config.project_id)
        );

        Ok(Self {
            client,
            token: config.token.clone(),
            base_url,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.header("PRIVATE-TOKEN", &self.token).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(Error::Api {
            status: status.as_u16(),
            message: error_message(&body, status.canonical_reason()),
        })
    }
}

/// Pull the `message`/`error` field out of a GitLab error body.
fn error_message(body: &str, reason: Option<&str>) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["message", "error"] {
            match value.get(key) {
                Some(serde_json::Value::String(s)) => return s.clone(),
                Some(other) if !other.is_null() => return other.to_string(),
                _ => {}
            }
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        return reason.unwrap_or("request failed").to_string();
    }
    trimmed.chars().take(MAX_ERROR_BODY).collect()
}

#[async_trait]
impl HostService for GitLabService {
    async fn get_merge_request(&self, iid: u64) -> Result<MergeRequest> {
        debug!(mr_iid = iid, "getting MR");
        let url = self.url(&format!("merge_requests/{iid}"));

        let mr: MergeRequestDto = self.send(self.client.get(&url)).await?.json().await?;

        let mr: MergeRequest = mr.into();
        debug!(mr_iid = iid, status = %mr.status, "got MR");
        Ok(mr)
    }

    async fn update_merge_request(
        &self,
        iid: u64,
        update: &MergeRequestUpdate,
    ) -> Result<MergeRequest> {
        debug!(mr_iid = iid, ?update, "updating MR");
        let url = self.url(&format!("merge_requests/{iid}"));

        let mr: MergeRequestDto = self
            .send(self.client.put(&url).json(update))
            .await?
            .json()
            .await?;

        debug!(mr_iid = iid, "updated MR");
        Ok(mr.into())
    }

    async fn merge_merge_request(&self, iid: u64, options: &MergeOptions) -> Result<MergeOutcome> {
        debug!(
            mr_iid = iid,
            queue_on_pipeline = options.queue_on_pipeline,
            "merging MR"
        );
        let url = self.url(&format!("merge_requests/{iid}/merge"));

        let payload = MergePayload {
            merge_when_pipeline_succeeds: options.queue_on_pipeline,
            should_remove_source_branch: false,
            merge_commit_message: options.commit_message.as_deref(),
        };

        let response: MergeResponse = self
            .send(self.client.put(&url).json(&payload))
            .await?
            .json()
            .await?;

        debug!(
            mr_iid = iid,
            state = %response.state,
            sha = ?response.merge_commit_sha,
            "merge accepted"
        );
        Ok(MergeOutcome {
            state: response.state,
            merge_commit_sha: response.merge_commit_sha,
        })
    }

    async fn create_merge_request(
        &self,
        source: &str,
        target: &str,
        title: &str,
        description: Option<&str>,
    ) -> Result<MergeRequest> {
        debug!(source, target, "creating MR");
        let url = self.url("merge_requests");

        let payload = CreateMrPayload {
            source_branch: source,
            target_branch: target,
            title,
            description,
            remove_source_branch: false,
        };

        let mr: MergeRequestDto = self
            .send(self.client.post(&url).json(&payload))
            .await?
            .json()
            .await?;

        debug!(mr_iid = mr.iid, "created MR");
        Ok(mr.into())
    }

    async fn list_open_merge_requests(
        &self,
        source: &str,
        target: &str,
    ) -> Result<Vec<MergeRequest>> {
        debug!(source, target, "listing open MRs");
        let url = self.url("merge_requests");

        let mrs: Vec<MergeRequestDto> = self
            .send(self.client.get(&url).query(&[
                ("state", "opened"),
                ("source_branch", source),
                ("target_branch", target),
            ]))
            .await?
            .json()
            .await?;

        debug!(count = mrs.len(), "listed open MRs");
        Ok(mrs.into_iter().map(Into::into).collect())
    }

    async fn list_tags(&self, page: u32, per_page: u32) -> Result<Vec<String>> {
        debug!(page, per_page, "listing tags");
        let url = self.url("repository/tags");

        let tags: Vec<TagDto> = self
            .send(
                self.client
                    .get(&url)
                    .query(&[("per_page", per_page), ("page", page)]),
            )
            .await?
            .json()
            .await?;

        debug!(page, count = tags.len(), "listed tags");
        Ok(tags.into_iter().map(|t| t.name).collect())
    }

    async fn create_tag(&self, name: &str, git_ref: &str, message: &str) -> Result<String> {
        debug!(tag = name, git_ref, "creating tag");
        let url = self.url("repository/tags");

        let tag: TagDto = self
            .send(self.client.post(&url).form(&[
                ("tag_name", name),
                ("ref", git_ref),
                ("message", message),
            ]))
            .await?
            .json()
            .await?;

        debug!(tag = %tag.name, "created tag");
        Ok(tag.name)
    }

    async fn compare_branches(&self, from: &str, to: &str) -> Result<CompareResult> {
        debug!(from, to, "comparing branches");
        let url = self.url("repository/compare");

        let compare: CompareDto = self
            .send(self.client.get(&url).query(&[("from", from), ("to", to)]))
            .await?
            .json()
            .await?;

        debug!(
            commits = compare.commits.len(),
            files = compare.diffs.len(),
            "compared branches"
        );
        Ok(CompareResult {
            commits: compare.commits,
            diff_count: compare.diffs.len(),
        })
    }
}

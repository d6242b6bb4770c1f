//! Mock host service for testing
//!
//! These are test utilities - not all may be used in every test binary.

#![allow(dead_code)]

use async_trait::async_trait;
use glpromote::error::{Error, Result};
use glpromote::platform::{HostService, MergeRequestUpdate};
use glpromote::types::{
    CompareResult, MergeOptions, MergeOutcome, MergeRequest, MergeStatus, RawCommit,
};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// Call record for `create_merge_request`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateMrCall {
    pub source: String,
    pub target: String,
    pub title: String,
    pub description: Option<String>,
}

/// Call record for `merge_merge_request`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeCall {
    pub iid: u64,
    pub options: MergeOptions,
}

/// Call record for `create_tag`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTagCall {
    pub name: String,
    pub git_ref: String,
    pub message: String,
}

fn api(status: u16, message: &str) -> Error {
    Error::Api {
        status,
        message: message.to_string(),
    }
}

/// In-memory GitLab project
///
/// Features:
/// - Stored merge requests with scripted status sequences per poll
/// - Open-MR bookkeeping, so a second create for the same pair is rejected
///   the way GitLab does
/// - A flat tag list served in pages
/// - Compare responses per (from, to) pair
/// - Call tracking and error injection
pub struct MockHostService {
    next_iid: AtomicU64,
    merge_requests: Mutex<HashMap<u64, MergeRequest>>,
    merged: Mutex<HashSet<u64>>,
    // `None` in a script is a failed fetch
    status_scripts: Mutex<HashMap<u64, VecDeque<Option<String>>>>,
    tags: Mutex<Vec<String>>,
    compare_responses: Mutex<HashMap<(String, String), CompareResult>>,
    // Call tracking
    get_calls: Mutex<Vec<u64>>,
    update_calls: Mutex<Vec<(u64, MergeRequestUpdate)>>,
    merge_calls: Mutex<Vec<MergeCall>>,
    create_mr_calls: Mutex<Vec<CreateMrCall>>,
    list_open_calls: Mutex<Vec<(String, String)>>,
    list_tags_calls: Mutex<Vec<u32>>,
    create_tag_calls: Mutex<Vec<CreateTagCall>>,
    compare_calls: Mutex<Vec<(String, String)>>,
    // Error injection
    error_on_update: Mutex<Option<String>>,
    error_on_merge: Mutex<HashMap<u64, (u16, String)>>,
    error_on_create_mr: Mutex<Option<(u16, String)>>,
    error_on_list_open: Mutex<Option<String>>,
    error_on_tags_page: Mutex<Option<u32>>,
    error_on_create_tag: Mutex<Option<(u16, String)>>,
    error_on_compare: Mutex<Option<String>>,
}

impl Default for MockHostService {
    fn default() -> Self {
        Self::new()
    }
}

impl MockHostService {
    /// Create an empty project; new merge requests start at iid 100
    pub fn new() -> Self {
        Self {
            next_iid: AtomicU64::new(100),
            merge_requests: Mutex::new(HashMap::new()),
            merged: Mutex::new(HashSet::new()),
            status_scripts: Mutex::new(HashMap::new()),
            tags: Mutex::new(Vec::new()),
            compare_responses: Mutex::new(HashMap::new()),
            get_calls: Mutex::new(Vec::new()),
            update_calls: Mutex::new(Vec::new()),
            merge_calls: Mutex::new(Vec::new()),
            create_mr_calls: Mutex::new(Vec::new()),
            list_open_calls: Mutex::new(Vec::new()),
            list_tags_calls: Mutex::new(Vec::new()),
            create_tag_calls: Mutex::new(Vec::new()),
            compare_calls: Mutex::new(Vec::new()),
            error_on_update: Mutex::new(None),
            error_on_merge: Mutex::new(HashMap::new()),
            error_on_create_mr: Mutex::new(None),
            error_on_list_open: Mutex::new(None),
            error_on_tags_page: Mutex::new(None),
            error_on_create_tag: Mutex::new(None),
            error_on_compare: Mutex::new(None),
        }
    }

    // === Setup ===

    /// Store an open merge request with a fixed status
    pub fn add_merge_request(&self, iid: u64, source: &str, target: &str, status: &str) {
        self.merge_requests
            .lock()
            .unwrap()
            .insert(iid, make_mr(iid, source, target, status));
    }

    /// Statuses returned by successive polls; `None` fails that fetch.
    /// The last status sticks once the script runs out.
    pub fn script_statuses(&self, iid: u64, statuses: &[Option<&str>]) {
        self.status_scripts.lock().unwrap().insert(
            iid,
            statuses.iter().map(|s| s.map(ToString::to_string)).collect(),
        );
    }

    /// Replace the tag list
    pub fn set_tags(&self, tags: &[&str]) {
        *self.tags.lock().unwrap() = tags.iter().map(ToString::to_string).collect();
    }

    /// Fill the tag list with `count` non-release tags, then append `tags`
    pub fn set_tags_with_padding(&self, count: usize, tags: &[&str]) {
        let mut all: Vec<String> = (0..count).map(|i| format!("build-{i}")).collect();
        all.extend(tags.iter().map(ToString::to_string));
        *self.tags.lock().unwrap() = all;
    }

    /// Commits returned by `compare_branches(from, to)`, newest first
    pub fn set_compare(&self, from: &str, to: &str, commits: Vec<RawCommit>, diff_count: usize) {
        self.compare_responses.lock().unwrap().insert(
            (from.to_string(), to.to_string()),
            CompareResult {
                commits,
                diff_count,
            },
        );
    }

    // === Error injection ===

    /// Make `update_merge_request` fail
    pub fn fail_update(&self, msg: &str) {
        *self.error_on_update.lock().unwrap() = Some(msg.to_string());
    }

    /// Make `merge_merge_request` fail for one iid
    pub fn fail_merge(&self, iid: u64, status: u16, msg: &str) {
        self.error_on_merge
            .lock()
            .unwrap()
            .insert(iid, (status, msg.to_string()));
    }

    /// Make `create_merge_request` fail unconditionally
    pub fn fail_create_mr(&self, status: u16, msg: &str) {
        *self.error_on_create_mr.lock().unwrap() = Some((status, msg.to_string()));
    }

    /// Make `list_open_merge_requests` fail
    pub fn fail_list_open(&self, msg: &str) {
        *self.error_on_list_open.lock().unwrap() = Some(msg.to_string());
    }

    /// Make `list_tags` fail for one page
    pub fn fail_tags_page(&self, page: u32) {
        *self.error_on_tags_page.lock().unwrap() = Some(page);
    }

    /// Make `create_tag` fail
    pub fn fail_create_tag(&self, status: u16, msg: &str) {
        *self.error_on_create_tag.lock().unwrap() = Some((status, msg.to_string()));
    }

    /// Make `compare_branches` fail
    pub fn fail_compare(&self, msg: &str) {
        *self.error_on_compare.lock().unwrap() = Some(msg.to_string());
    }

    // === Call inspection ===

    pub fn get_calls(&self) -> Vec<u64> {
        self.get_calls.lock().unwrap().clone()
    }

    pub fn update_calls(&self) -> Vec<(u64, MergeRequestUpdate)> {
        self.update_calls.lock().unwrap().clone()
    }

    pub fn merge_calls(&self) -> Vec<MergeCall> {
        self.merge_calls.lock().unwrap().clone()
    }

    pub fn create_mr_calls(&self) -> Vec<CreateMrCall> {
        self.create_mr_calls.lock().unwrap().clone()
    }

    pub fn list_tags_calls(&self) -> Vec<u32> {
        self.list_tags_calls.lock().unwrap().clone()
    }

    pub fn create_tag_calls(&self) -> Vec<CreateTagCall> {
        self.create_tag_calls.lock().unwrap().clone()
    }

    pub fn compare_calls(&self) -> Vec<(String, String)> {
        self.compare_calls.lock().unwrap().clone()
    }

    /// Current stored state of a merge request
    pub fn merge_request(&self, iid: u64) -> Option<MergeRequest> {
        self.merge_requests.lock().unwrap().get(&iid).cloned()
    }

    /// Current tag list
    pub fn tags(&self) -> Vec<String> {
        self.tags.lock().unwrap().clone()
    }

    /// Assert that `merge_merge_request` was called for `iid`
    pub fn assert_merge_called(&self, iid: u64) {
        let calls = self.merge_calls();
        assert!(
            calls.iter().any(|c| c.iid == iid),
            "Expected merge({iid}) but got: {calls:?}"
        );
    }

    /// Assert that `merge_merge_request` was NOT called for `iid`
    pub fn assert_merge_not_called(&self, iid: u64) {
        let calls = self.merge_calls();
        assert!(
            !calls.iter().any(|c| c.iid == iid),
            "Expected merge({iid}) NOT to be called but it was: {calls:?}"
        );
    }

    fn is_open(&self, iid: u64) -> bool {
        !self.merged.lock().unwrap().contains(&iid)
    }
}

/// Build a merge request as the host would report it
pub fn make_mr(iid: u64, source: &str, target: &str, status: &str) -> MergeRequest {
    MergeRequest {
        iid,
        title: format!("MR {iid}"),
        source_branch: source.to_string(),
        target_branch: target.to_string(),
        status: MergeStatus::classify(status),
        has_conflicts: status == "conflicts",
        web_url: format!("https://gitlab.example.com/team/app/-/merge_requests/{iid}"),
        merge_commit_sha: None,
    }
}

/// Build a compare-endpoint commit
pub fn make_commit(id: &str, title: &str, author: &str, created_at: &str) -> RawCommit {
    RawCommit {
        id: id.to_string(),
        short_id: Some(id.chars().take(7).collect()),
        title: title.to_string(),
        message: format!("{title}\n"),
        author_name: author.to_string(),
        created_at: Some(created_at.to_string()),
        committed_date: None,
        parent_ids: vec![format!("{id}-parent")],
    }
}

/// Build a two-parent merge commit
pub fn make_merge_commit(id: &str, title: &str) -> RawCommit {
    RawCommit {
        parent_ids: vec!["p1".to_string(), "p2".to_string()],
        ..make_commit(id, title, "Merger", "2024-03-01T10:00:00Z")
    }
}

#[async_trait]
impl HostService for MockHostService {
    async fn get_merge_request(&self, iid: u64) -> Result<MergeRequest> {
        self.get_calls.lock().unwrap().push(iid);

        let next = self
            .status_scripts
            .lock()
            .unwrap()
            .get_mut(&iid)
            .and_then(|script| {
                if script.len() > 1 {
                    script.pop_front()
                } else {
                    script.front().cloned()
                }
            });

        let mut mrs = self.merge_requests.lock().unwrap();
        let mr = mrs
            .get_mut(&iid)
            .ok_or_else(|| api(404, "404 Not found"))?;

        match next {
            Some(Some(status)) => {
                mr.status = MergeStatus::classify(&status);
                mr.has_conflicts = status == "conflicts";
            }
            Some(None) => return Err(api(502, "Bad Gateway")),
            None => {}
        }
        Ok(mr.clone())
    }

    async fn update_merge_request(
        &self,
        iid: u64,
        update: &MergeRequestUpdate,
    ) -> Result<MergeRequest> {
        self.update_calls
            .lock()
            .unwrap()
            .push((iid, update.clone()));

        if let Some(msg) = self.error_on_update.lock().unwrap().as_ref() {
            return Err(api(403, msg));
        }

        let mut mrs = self.merge_requests.lock().unwrap();
        let mr = mrs
            .get_mut(&iid)
            .ok_or_else(|| api(404, "404 Not found"))?;
        if let Some(target) = &update.target_branch {
            mr.target_branch.clone_from(target);
        }
        if let Some(title) = &update.title {
            mr.title.clone_from(title);
        }
        Ok(mr.clone())
    }

    async fn merge_merge_request(&self, iid: u64, options: &MergeOptions) -> Result<MergeOutcome> {
        self.merge_calls.lock().unwrap().push(MergeCall {
            iid,
            options: options.clone(),
        });

        if let Some((status, msg)) = self.error_on_merge.lock().unwrap().get(&iid) {
            return Err(api(*status, msg));
        }

        if options.queue_on_pipeline {
            return Ok(MergeOutcome {
                state: "opened".to_string(),
                merge_commit_sha: None,
            });
        }

        self.merged.lock().unwrap().insert(iid);
        Ok(MergeOutcome {
            state: "merged".to_string(),
            merge_commit_sha: Some(format!("{iid:040x}")),
        })
    }

    async fn create_merge_request(
        &self,
        source: &str,
        target: &str,
        title: &str,
        description: Option<&str>,
    ) -> Result<MergeRequest> {
        self.create_mr_calls.lock().unwrap().push(CreateMrCall {
            source: source.to_string(),
            target: target.to_string(),
            title: title.to_string(),
            description: description.map(ToString::to_string),
        });

        if let Some((status, msg)) = self.error_on_create_mr.lock().unwrap().as_ref() {
            return Err(api(*status, msg));
        }

        let duplicate = self
            .merge_requests
            .lock()
            .unwrap()
            .values()
            .find(|mr| mr.source_branch == source && mr.target_branch == target && self.is_open(mr.iid))
            .map(|mr| mr.iid);
        if let Some(existing) = duplicate {
            return Err(api(
                409,
                &format!(
                    "Another open merge request already exists for this source branch: !{existing}"
                ),
            ));
        }

        let iid = self.next_iid.fetch_add(1, Ordering::SeqCst);
        let mut mr = make_mr(iid, source, target, "mergeable");
        mr.title = title.to_string();
        self.merge_requests.lock().unwrap().insert(iid, mr.clone());
        Ok(mr)
    }

    async fn list_open_merge_requests(
        &self,
        source: &str,
        target: &str,
    ) -> Result<Vec<MergeRequest>> {
        self.list_open_calls
            .lock()
            .unwrap()
            .push((source.to_string(), target.to_string()));

        if let Some(msg) = self.error_on_list_open.lock().unwrap().as_ref() {
            return Err(api(500, msg));
        }

        let mut open: Vec<MergeRequest> = self
            .merge_requests
            .lock()
            .unwrap()
            .values()
            .filter(|mr| {
                mr.source_branch == source && mr.target_branch == target && self.is_open(mr.iid)
            })
            .cloned()
            .collect();
        open.sort_by_key(|mr| mr.iid);
        Ok(open)
    }

    async fn list_tags(&self, page: u32, per_page: u32) -> Result<Vec<String>> {
        self.list_tags_calls.lock().unwrap().push(page);

        if *self.error_on_tags_page.lock().unwrap() == Some(page) {
            return Err(api(500, "Internal Server Error"));
        }

        let tags = self.tags.lock().unwrap();
        let per_page = per_page as usize;
        let start = (page as usize - 1) * per_page;
        Ok(tags.iter().skip(start).take(per_page).cloned().collect())
    }

    async fn create_tag(&self, name: &str, git_ref: &str, message: &str) -> Result<String> {
        self.create_tag_calls.lock().unwrap().push(CreateTagCall {
            name: name.to_string(),
            git_ref: git_ref.to_string(),
            message: message.to_string(),
        });

        if let Some((status, msg)) = self.error_on_create_tag.lock().unwrap().as_ref() {
            return Err(api(*status, msg));
        }

        let mut tags = self.tags.lock().unwrap();
        if tags.iter().any(|t| t == name) {
            return Err(api(400, &format!("Tag {name} already exists")));
        }
        tags.insert(0, name.to_string());
        Ok(name.to_string())
    }

    async fn compare_branches(&self, from: &str, to: &str) -> Result<CompareResult> {
        self.compare_calls
            .lock()
            .unwrap()
            .push((from.to_string(), to.to_string()));

        if let Some(msg) = self.error_on_compare.lock().unwrap().as_ref() {
            return Err(api(500, msg));
        }

        Ok(self
            .compare_responses
            .lock()
            .unwrap()
            .get(&(from.to_string(), to.to_string()))
            .cloned()
            .unwrap_or_default())
    }
}

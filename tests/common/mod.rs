//! Shared test helpers

#![allow(dead_code)]

mod mock_host;

#[allow(unused_imports)]
pub use mock_host::{
    CreateMrCall, CreateTagCall, MergeCall, MockHostService, make_commit, make_merge_commit,
    make_mr,
};

use async_trait::async_trait;
use glpromote::config::Config;
use glpromote::progress::ProgressCallback;
use std::sync::Mutex;

/// Config for project 42 with `main`/`deploy`, five polls and no delay
pub fn test_config() -> Config {
    Config {
        host: "https://gitlab.example.com".to_string(),
        project_id: "42".to_string(),
        token: "test-token".to_string(),
        main_branch: "main".to_string(),
        deploy_branch: Some("deploy".to_string()),
        poll_retries: 5,
        poll_delay_ms: 0,
        auto_tag: true,
    }
}

/// Progress sink that records everything it is told
#[derive(Default)]
pub struct RecordingProgress {
    messages: Mutex<Vec<String>>,
    polls: Mutex<Vec<(u64, String, u32)>>,
}

impl RecordingProgress {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }

    /// `(iid, status, remaining)` per poll
    pub fn polls(&self) -> Vec<(u64, String, u32)> {
        self.polls.lock().unwrap().clone()
    }

    pub fn saw(&self, needle: &str) -> bool {
        self.messages().iter().any(|m| m.contains(needle))
    }
}

#[async_trait]
impl ProgressCallback for RecordingProgress {
    async fn on_message(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }

    async fn on_poll(&self, iid: u64, status: &str, _has_conflicts: bool, remaining: u32) {
        self.polls
            .lock()
            .unwrap()
            .push((iid, status.to_string(), remaining));
    }
}

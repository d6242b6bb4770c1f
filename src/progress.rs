//! Progress reporting for long-running flows
//!
//! The core never prints. It reports human-facing progress through a
//! [`ProgressCallback`] and leaves presentation to the caller.

use async_trait::async_trait;

/// Receives progress updates from orchestration code
#[async_trait]
pub trait ProgressCallback: Send + Sync {
    /// A free-form status line
    async fn on_message(&self, message: &str);

    /// One mergeability poll completed
    async fn on_poll(&self, iid: u64, status: &str, has_conflicts: bool, remaining: u32) {
        self.on_message(&format!(
            "⏳ MR !{iid} status={status} conflicts={has_conflicts} left={remaining}"
        ))
        .await;
    }
}

/// Progress sink that discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

#[async_trait]
impl ProgressCallback for NoopProgress {
    async fn on_message(&self, _message: &str) {}
}

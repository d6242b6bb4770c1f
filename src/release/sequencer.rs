//! Tag sequencing against the host's tag list

use crate::cancel::CancelToken;
use crate::error::{Error, Result};
use crate::platform::HostService;
use crate::release::tag::{is_release_tag, next_tag_name};
use tracing::debug;

/// Tags requested per page
pub const TAG_PAGE_SIZE: u32 = 100;

/// Upper bound on pages fetched
pub const MAX_TAG_PAGES: u32 = 3;

/// Computes and creates release tags
pub struct TagSequencer<'a> {
    host: &'a dyn HostService,
    cancel: CancelToken,
}

impl<'a> TagSequencer<'a> {
    /// Create a sequencer
    pub fn new(host: &'a dyn HostService) -> Self {
        Self {
            host,
            cancel: CancelToken::new(),
        }
    }

    /// Use an externally controlled cancellation token
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Fetch tag names, stopping at the first short or empty page.
    ///
    /// A failed page is an error: guessing from a partial list could
    /// reissue an existing name.
    pub async fn list_tag_names(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();

        for page in 1..=MAX_TAG_PAGES {
            self.cancel.check()?;
            let batch = self.host.list_tags(page, TAG_PAGE_SIZE).await?;
            let count = batch.len();
            names.extend(batch);

            if count < TAG_PAGE_SIZE as usize {
                break;
            }
        }

        debug!(
            total = names.len(),
            valid = names.iter().filter(|n| is_release_tag(n)).count(),
            "collected tags"
        );
        Ok(names)
    }

    /// Next release tag name after the latest well-formed existing tag.
    pub async fn compute_next_tag_name(&self) -> Result<String> {
        let names = self.list_tag_names().await?;
        next_tag_name(&names)
    }

    /// Create a release tag on `git_ref`.
    pub async fn create_release(&self, name: &str, git_ref: &str, message: &str) -> Result<String> {
        self.host
            .create_tag(name, git_ref, message)
            .await
            .map_err(|e| {
                let (status, text) = e.status_and_message();
                if is_conflict(status, &text) {
                    Error::TagConflict(name.to_string())
                } else {
                    Error::TagCreate {
                        name: name.to_string(),
                        status,
                        message: text,
                    }
                }
            })
    }
}

/// GitLab reports an existing tag as 400 "Tag ... already exists"
fn is_conflict(status: u16, message: &str) -> bool {
    matches!(status, 400 | 409) && message.to_lowercase().contains("already exists")
}

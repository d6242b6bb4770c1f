//! Release tagging and the flows built on the merge orchestrator
//!
//! - `tag`: pure tag-name parsing and sequencing
//! - [`TagSequencer`]: reads the host's tags and creates new ones
//! - [`ReleaseCoordinator`]: land, promote, diff and tag flows

mod coordinator;
mod sequencer;
mod tag;

pub use coordinator::{
    DiffRequest, ItemResult, PromoteOptions, PromoteOutcome, PromoteReport, ReleaseCoordinator,
    custom_tag_message, default_tag_message, merge_commit_url,
};
pub use sequencer::{MAX_TAG_PAGES, TAG_PAGE_SIZE, TagSequencer};
pub use tag::{ReleaseTag, is_release_tag, latest_release_tag, next_tag_name};

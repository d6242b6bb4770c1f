//! Change sets and changelogs
//!
//! The analyzer decides what a promotion would carry; the formatter turns
//! that into text for terminals, tag messages and MR descriptions.

mod analyzer;
mod format;

pub use analyzer::{ChangeSetAnalyzer, build_change_set, is_merge_noise, promotion_title};
pub use format::{
    ChangelogStyle, GroupBy, format_changelog, format_markdown, format_plain, group_changes,
};

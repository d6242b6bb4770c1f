//! Changelog rendering
//!
//! Plain text for terminals and tag messages; markdown for merge request
//! descriptions.

use crate::error::{Error, Result};
use crate::types::CommitChange;
use std::str::FromStr;

/// Field used to group commit changes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GroupBy {
    /// No grouping: one flat block per commit
    #[default]
    None,
    /// Author name
    Author,
    /// Calendar date
    Date,
    /// Date and minute
    DateTime,
    /// Commit title
    Title,
}

impl GroupBy {
    fn key(self, change: &CommitChange) -> Option<&str> {
        match self {
            Self::None => None,
            Self::Author => Some(change.author.as_str()),
            Self::Date => Some(change.date.as_str()),
            Self::DateTime => Some(change.date_time.as_str()),
            Self::Title => Some(change.title.as_str()),
        }
    }
}

impl FromStr for GroupBy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "" | "none" | "null" => Ok(Self::None),
            "author" => Ok(Self::Author),
            "date" => Ok(Self::Date),
            "datetime" | "date_time" => Ok(Self::DateTime),
            "title" => Ok(Self::Title),
            other => Err(Error::Config(format!(
                "unknown group-by field {other:?} (expected none, author, date, datetime or title)"
            ))),
        }
    }
}

/// Output style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChangelogStyle {
    /// Plain text, grouped by the requested field
    #[default]
    Plain,
    /// Markdown, always grouped by date
    Markdown,
}

const SEPARATOR: &str = "--------------------------------------------------------";

/// Render commit changes in the requested style.
///
/// Markdown output ignores `group_by` and groups by date.
pub fn format_changelog(group_by: GroupBy, changes: &[CommitChange], style: ChangelogStyle) -> String {
    match style {
        ChangelogStyle::Plain => format_plain(group_by, changes),
        ChangelogStyle::Markdown => format_markdown(changes),
    }
}

/// Group changes by `group_by`, keeping first-seen group order.
///
/// With [`GroupBy::None`] everything lands in one unnamed group.
pub fn group_changes(group_by: GroupBy, changes: &[CommitChange]) -> Vec<(Option<&str>, Vec<&CommitChange>)> {
    let mut groups: Vec<(Option<&str>, Vec<&CommitChange>)> = Vec::new();

    for change in changes {
        let key = group_by.key(change);
        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, members)) => members.push(change),
            None => groups.push((key, vec![change])),
        }
    }

    groups
}

/// Plain-text changelog
pub fn format_plain(group_by: GroupBy, changes: &[CommitChange]) -> String {
    let mut sections = Vec::new();

    for (name, members) in group_changes(group_by, changes) {
        let mut lines = Vec::new();
        if let Some(name) = name {
            lines.push(format!("\n ✾✾✾✾✾✾✾✾ 👉{name}👈 ✾✾✾✾✾✾✾✾"));
        }
        for change in members {
            push_commit_block(&mut lines, change);
        }
        sections.push(lines.join("\n"));
    }

    sections.join("\n")
}

fn push_commit_block(lines: &mut Vec<String>, change: &CommitChange) {
    lines.push(format!(
        "👉 CommitID: [{}]  ⏰ createdAt: [{}]",
        change.short_sha, change.date_time
    ));
    lines.push(format!("👳 Author: {}", change.author));
    lines.push("✍️  Changelogs:".to_string());
    for message in &change.messages {
        lines.push(format!("    ✔️  {}", bullet_text(message)));
    }
    lines.push(SEPARATOR.to_string());
}

/// A line that already starts with `-` loses that dash.
fn bullet_text(line: &str) -> &str {
    let trimmed = line.trim();
    trimmed.strip_prefix('-').map_or(trimmed, str::trim)
}

/// Markdown changelog: one heading per date, one sub-heading per commit.
///
/// The first message line repeats the title, so only continuation lines
/// become bullets.
pub fn format_markdown(changes: &[CommitChange]) -> String {
    let mut out = String::new();

    for (date, members) in group_changes(GroupBy::Date, changes) {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&format!("## {}\n", date.unwrap_or_default()));

        for change in members {
            out.push_str(&format!(
                "\n### [{}] {}\n_{} at {}_\n",
                change.short_sha, change.title, change.author, change.date_time
            ));
            let body: Vec<&String> = change.messages.iter().skip(1).collect();
            if !body.is_empty() {
                out.push('\n');
                for line in body {
                    out.push_str(&format!("- {}\n", bullet_text(line)));
                }
            }
        }
    }

    out
}

//! Command-line surface for the `promote` binary

pub mod context;
pub mod diff;
pub mod merge;
pub mod promote;
pub mod style;

use anstream::println;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use clap::Parser;
use glpromote::changes::GroupBy;
use glpromote::error::{Error, Result};
use glpromote::merge::BranchPair;
use glpromote::progress::ProgressCallback;
use glpromote::release::{DiffRequest, PromoteOptions, custom_tag_message};
use indicatif::ProgressBar;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;
use style::{Stylize, spinner_style};

/// Land GitLab merge requests, promote main into deploy and tag releases
#[derive(Debug, Parser)]
#[command(name = "promote", version, about)]
pub struct Args {
    /// Project name from the registry
    pub project: String,

    /// Print the changelog of SRC not in DST, grouped by GROUP
    /// (none, author, date, datetime, title; default date)
    #[arg(long, value_name = "SRC:DST[:GROUP]", value_delimiter = ',')]
    pub diff: Vec<String>,

    /// Open (or reuse) an MR from SRC into DST; add --merge to land it
    #[arg(long = "merge-create", value_name = "SRC:DST", value_delimiter = ',')]
    pub merge_create: Vec<String>,

    /// Land merge requests into the main branch, plus any from
    /// --merge-create
    #[arg(long, value_name = "IID", value_delimiter = ',', num_args = 0..)]
    pub merge: Option<Vec<u64>>,

    /// Promote MAIN into DEPLOY and tag the release
    /// (defaults to the project's branches)
    #[arg(long, value_name = "MAIN:DEPLOY", num_args = 0..=1, default_missing_value = "")]
    pub build: Option<String>,

    /// Tag name to create instead of the next in sequence
    #[arg(long, value_name = "NAME")]
    pub tag: Option<String>,

    /// Changelog line for the tag message (repeatable)
    #[arg(long = "tag-desc", value_name = "LINE")]
    pub tag_desc: Vec<String>,

    /// Preview the promotion and ask before merging
    #[arg(long)]
    pub confirm: bool,

    /// Tag the deploy branch without merging, if it has commits DEST lacks
    #[arg(long = "build-tags", value_name = "DEST")]
    pub build_tags: Option<String>,

    /// Project registry file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Mergeability polls before giving up
    #[arg(long, value_name = "N")]
    pub poll_retries: Option<u32>,

    /// Delay between mergeability polls
    #[arg(long, value_name = "MS")]
    pub poll_delay_ms: Option<u64>,

    /// Never create tags after promoting
    #[arg(long)]
    pub no_tag: bool,

    /// Print every poll and enable debug logs
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Whether any action flag was given
    pub fn has_action(&self) -> bool {
        !self.diff.is_empty()
            || !self.merge_create.is_empty()
            || self.merge.is_some()
            || self.build.is_some()
            || self.build_tags.is_some()
    }
}

/// Everything an invocation asked for, validated before any host call
#[derive(Debug, Clone, Default)]
pub struct Actions {
    /// `--diff` requests
    pub diffs: Vec<DiffRequest>,
    /// `--merge-create` pairs
    pub creates: Vec<BranchPair>,
    /// `--merge` iids
    pub merges: Vec<u64>,
    /// Whether `--merge` was given; created MRs are landed only then
    pub land: bool,
    /// `--build` options
    pub build: Option<PromoteOptions>,
    /// `--build-tags` destination and tag options
    pub build_tags: Option<(String, PromoteOptions)>,
}

impl Actions {
    /// Validate `args`; `now` stamps `--tag-desc` messages.
    pub fn from_args(args: &Args, now: NaiveDateTime) -> Result<Self> {
        let diffs = args
            .diff
            .iter()
            .map(|raw| parse_diff_request(raw))
            .collect::<Result<Vec<_>>>()?;
        let creates = args
            .merge_create
            .iter()
            .map(|raw| parse_branch_pair(raw))
            .collect::<Result<Vec<_>>>()?;

        let merges = args.merge.clone().unwrap_or_default();
        if args.merge.is_some() && merges.is_empty() && creates.is_empty() {
            return Err(Error::Config(
                "--merge needs IIDs or --merge-create".to_string(),
            ));
        }

        let tag_options = PromoteOptions {
            tag_name: args.tag.clone(),
            tag_message: (!args.tag_desc.is_empty())
                .then(|| custom_tag_message(&args.tag_desc, now)),
            ..PromoteOptions::default()
        };

        let build = match args.build.as_deref() {
            None => None,
            Some("") => Some(tag_options.clone()),
            Some(raw) => {
                let pair = parse_branch_pair(raw)?;
                Some(PromoteOptions {
                    source: Some(pair.source),
                    destination: Some(pair.target),
                    ..tag_options.clone()
                })
            }
        };

        let build_tags = match args.build_tags.as_deref().map(str::trim) {
            None => None,
            Some("") => {
                return Err(Error::Config(
                    "--build-tags needs a destination branch".to_string(),
                ));
            }
            Some(dest) => Some((dest.to_string(), tag_options)),
        };

        Ok(Self {
            diffs,
            creates,
            land: args.merge.is_some(),
            merges,
            build,
            build_tags,
        })
    }
}

/// Parse `SRC:DST[:GROUP]`
pub fn parse_diff_request(raw: &str) -> Result<DiffRequest> {
    let parts: Vec<&str> = raw.split(':').map(str::trim).collect();
    match parts.as_slice() {
        [source, destination] => Ok(DiffRequest {
            source: non_empty(source, raw)?,
            destination: non_empty(destination, raw)?,
            group_by: GroupBy::Date,
        }),
        [source, destination, group] => Ok(DiffRequest {
            source: non_empty(source, raw)?,
            destination: non_empty(destination, raw)?,
            group_by: group.parse()?,
        }),
        _ => Err(Error::Config(format!(
            "expected SRC:DST[:GROUP], got {raw:?}"
        ))),
    }
}

/// Parse `SRC:DST`
pub fn parse_branch_pair(raw: &str) -> Result<BranchPair> {
    match raw.split_once(':') {
        Some((source, target)) if !target.contains(':') => Ok(BranchPair {
            source: non_empty(source.trim(), raw)?,
            target: non_empty(target.trim(), raw)?,
        }),
        _ => Err(Error::Config(format!("expected SRC:DST, got {raw:?}"))),
    }
}

fn non_empty(part: &str, raw: &str) -> Result<String> {
    if part.is_empty() {
        Err(Error::Config(format!("empty branch name in {raw:?}")))
    } else {
        Ok(part.to_string())
    }
}

/// Console progress sink
///
/// Messages are printed as lines. Poll ticks drive a spinner in compact
/// mode and are printed as lines in verbose mode.
pub struct CliProgress {
    verbose: bool,
    spinner: Mutex<Option<ProgressBar>>,
}

impl CliProgress {
    /// Spinner for poll ticks
    pub const fn compact() -> Self {
        Self {
            verbose: false,
            spinner: Mutex::new(None),
        }
    }

    /// One line per poll tick
    pub const fn verbose() -> Self {
        Self {
            verbose: true,
            spinner: Mutex::new(None),
        }
    }

    /// Remove the spinner, if one is showing
    pub fn clear(&self) {
        if let Ok(mut guard) = self.spinner.lock() {
            if let Some(spinner) = guard.take() {
                spinner.finish_and_clear();
            }
        }
    }

    fn tick(&self, message: String) {
        if let Ok(mut guard) = self.spinner.lock() {
            let spinner = guard.get_or_insert_with(|| {
                let bar = ProgressBar::new_spinner();
                bar.set_style(spinner_style());
                bar.enable_steady_tick(Duration::from_millis(80));
                bar
            });
            spinner.set_message(message);
        }
    }
}

#[async_trait]
impl ProgressCallback for CliProgress {
    async fn on_message(&self, message: &str) {
        self.clear();
        println!("{message}");
    }

    async fn on_poll(&self, iid: u64, status: &str, has_conflicts: bool, remaining: u32) {
        let line = format!(
            "⏳ MR !{iid} status={status} conflicts={has_conflicts} left={remaining}"
        );
        if self.verbose {
            self.on_message(&line.muted()).await;
        } else {
            self.tick(line);
        }
    }
}

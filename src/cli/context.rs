//! Shared command context for CLI commands
//!
//! Extracts common setup shared by the diff, merge and promote commands.

use crate::cli::Args;
use glpromote::cancel::CancelToken;
use glpromote::config::{Config, Overrides, TOKEN_ENV, default_registry_path, load_registry};
use glpromote::error::Result;
use glpromote::platform::{GitLabService, HostService};
use glpromote::progress::ProgressCallback;
use glpromote::release::ReleaseCoordinator;
use tracing::debug;

/// Shared context for CLI commands that talk to GitLab
///
/// Built once per invocation:
/// - Load the project registry
/// - Resolve the project's config (token, branches, poll budget)
/// - Create the GitLab service
pub struct CommandContext {
    /// Resolved invocation config
    pub config: Config,
    /// GitLab service
    pub host: Box<dyn HostService>,
    /// Cancelled on Ctrl-C
    pub cancel: CancelToken,
}

impl CommandContext {
    /// Create a new command context
    pub fn new(args: &Args, cancel: CancelToken) -> Result<Self> {
        let path = match &args.config {
            Some(path) => path.clone(),
            None => default_registry_path()?,
        };
        debug!(path = %path.display(), "loading registry");
        let registry = load_registry(&path)?;

        let overrides = Overrides {
            poll_retries: args.poll_retries,
            poll_delay_ms: args.poll_delay_ms,
            no_tag: args.no_tag,
        };
        let config = registry.resolve(&args.project, std::env::var(TOKEN_ENV).ok(), &overrides)?;
        let host = Box::new(GitLabService::new(&config)?);

        Ok(Self {
            config,
            host,
            cancel,
        })
    }

    /// Release coordinator reporting through `progress`
    pub fn coordinator<'a>(&'a self, progress: &'a dyn ProgressCallback) -> ReleaseCoordinator<'a> {
        ReleaseCoordinator::new(self.host.as_ref(), &self.config, progress)
            .with_cancel(self.cancel.clone())
    }
}

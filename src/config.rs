//! Invocation config and the project registry file.
//!
//! The registry is a TOML file listing known projects:
//!
//! ```toml
//! host = "https://gitlab.example.com"
//! token = "glpat-..."          # optional, GITLAB_TOKEN wins
//!
//! [defaults]
//! poll_retries = 20
//! poll_delay_ms = 2000
//! auto_tag = true
//!
//! [[projects]]
//! name = "gate-core"
//! id = 455
//! main_branch = "main"
//! deploy_branch = "deploy"
//! ```

use crate::error::{Error, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Directory name under the user config dir.
const CONFIG_DIR: &str = "glpromote";

/// Registry filename.
const REGISTRY_FILE: &str = "projects.toml";

/// Environment variable that overrides the registry token.
pub const TOKEN_ENV: &str = "GITLAB_TOKEN";

const DEFAULT_POLL_RETRIES: u32 = 20;
const DEFAULT_POLL_DELAY_MS: u64 = 2000;

/// Configuration for one invocation
///
/// Built once and passed by reference to every component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Host base URL including scheme, e.g. `https://gitlab.com`
    pub host: String,
    /// Numeric project id or `group/project` path
    pub project_id: String,
    /// API token
    pub token: String,
    /// Integration branch
    pub main_branch: String,
    /// Deploy branch (None when the project has none)
    pub deploy_branch: Option<String>,
    /// Maximum number of mergeability polls
    pub poll_retries: u32,
    /// Delay between polls in milliseconds
    pub poll_delay_ms: u64,
    /// Whether promotion creates a release tag
    pub auto_tag: bool,
}

impl Config {
    /// Delay between polls
    pub const fn poll_delay(&self) -> Duration {
        Duration::from_millis(self.poll_delay_ms)
    }

    /// Deploy branch, or a config error when the project has none
    pub fn require_deploy_branch(&self) -> Result<&str> {
        self.deploy_branch.as_deref().ok_or_else(|| {
            Error::Config(format!(
                "project {} has no deploy branch configured",
                self.project_id
            ))
        })
    }
}

/// Project identifier as written in the registry
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ProjectId {
    /// Numeric id
    Numeric(u64),
    /// `group/project` path
    Path(String),
}

impl std::fmt::Display for ProjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Numeric(id) => write!(f, "{id}"),
            Self::Path(path) => write!(f, "{path}"),
        }
    }
}

/// One registered project
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectEntry {
    /// Name used on the command line
    pub name: String,
    /// Host project id
    pub id: ProjectId,
    /// Integration branch
    pub main_branch: String,
    /// Deploy branch; empty means none
    #[serde(default)]
    pub deploy_branch: Option<String>,
}

/// Polling and tagging defaults
#[derive(Debug, Clone, Deserialize)]
pub struct Defaults {
    /// Maximum number of mergeability polls
    #[serde(default = "default_poll_retries")]
    pub poll_retries: u32,
    /// Delay between polls in milliseconds
    #[serde(default = "default_poll_delay_ms")]
    pub poll_delay_ms: u64,
    /// Whether promotion creates a release tag
    #[serde(default = "default_auto_tag")]
    pub auto_tag: bool,
}

const fn default_poll_retries() -> u32 {
    DEFAULT_POLL_RETRIES
}

const fn default_poll_delay_ms() -> u64 {
    DEFAULT_POLL_DELAY_MS
}

const fn default_auto_tag() -> bool {
    true
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            poll_retries: DEFAULT_POLL_RETRIES,
            poll_delay_ms: DEFAULT_POLL_DELAY_MS,
            auto_tag: true,
        }
    }
}

/// Contents of the registry file
#[derive(Debug, Clone, Deserialize)]
pub struct Registry {
    /// Host base URL including scheme
    pub host: String,
    /// Token, if stored in the file
    #[serde(default)]
    pub token: Option<String>,
    /// Polling and tagging defaults
    #[serde(default)]
    pub defaults: Defaults,
    /// Known projects
    #[serde(default)]
    pub projects: Vec<ProjectEntry>,
}

/// Per-invocation overrides from the command line
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// Override poll retries
    pub poll_retries: Option<u32>,
    /// Override poll delay
    pub poll_delay_ms: Option<u64>,
    /// Disable tagging
    pub no_tag: bool,
}

impl Registry {
    /// Parse registry contents.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("invalid registry: {e}")))
    }

    /// Look up a project by name.
    pub fn project(&self, name: &str) -> Result<&ProjectEntry> {
        self.projects
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| Error::Config(format!("project {name} is not configured")))
    }

    /// Build the invocation config for a project.
    ///
    /// `env_token` takes precedence over the token stored in the file.
    pub fn resolve(
        &self,
        project: &str,
        env_token: Option<String>,
        overrides: &Overrides,
    ) -> Result<Config> {
        let entry = self.project(project)?;
        let token = env_token
            .filter(|t| !t.trim().is_empty())
            .or_else(|| self.token.clone())
            .ok_or_else(|| {
                Error::Config(format!(
                    "no API token: set {TOKEN_ENV} or `token` in the registry"
                ))
            })?;

        Ok(Config {
            host: self.host.trim_end_matches('/').to_string(),
            project_id: entry.id.to_string(),
            token,
            main_branch: entry.main_branch.clone(),
            deploy_branch: entry
                .deploy_branch
                .clone()
                .filter(|b| !b.trim().is_empty()),
            poll_retries: overrides
                .poll_retries
                .unwrap_or(self.defaults.poll_retries),
            poll_delay_ms: overrides
                .poll_delay_ms
                .unwrap_or(self.defaults.poll_delay_ms),
            auto_tag: self.defaults.auto_tag && !overrides.no_tag,
        })
    }
}

/// Default registry location: `<config dir>/glpromote/projects.toml`.
pub fn default_registry_path() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join(CONFIG_DIR).join(REGISTRY_FILE))
        .ok_or_else(|| Error::Config("cannot determine user config directory".to_string()))
}

/// Load the registry from disk.
pub fn load_registry(path: &Path) -> Result<Registry> {
    let content = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;
    Registry::parse(&content)
}

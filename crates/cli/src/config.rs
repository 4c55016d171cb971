//! Configuration file support for glops.
//!
//! Configuration is resolved with the following precedence (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (`GLOPS_URL`, `GLOPS_BASE_BRANCH`, `GLOPS_MIRROR_URL`),
//!    read by clap alongside the matching flag
//! 3. Config file (`--config <file>`, or `./glops.toml` when present)
//! 4. Built-in defaults
//!
//! The access token is never read from the file. `token_env` only names the
//! environment variable that holds it.
//!
//! Example config file:
//! ```toml
//! [gitlab]
//! url = "https://gitlab.com"
//! token_env = "GITLAB_TOKEN"
//!
//! [repository]
//! base_branch = "master"
//! mirror_url = "https://gitlab.cee.redhat.com/service/clusterimagesets.git"
//! branch_lookup = "not_found_only"   # or "any_error"
//! ```

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use gitlab::{DEFAULT_BASE_URL, DEFAULT_TOKEN_ENV};
use repo_ops::RepoSettings;
use serde::Deserialize;

/// Config file looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "glops.toml";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Instance and credential location.
    pub gitlab: GitLabConfig,
    /// Base branch, mirror URL and branch-lookup policy.
    pub repository: RepoSettings,
}

/// GitLab connection configuration.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GitLabConfig {
    /// Instance base URL.
    pub url: String,
    /// Name of the environment variable holding the access token.
    pub token_env: String,
}

impl Default for GitLabConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_BASE_URL.to_string(),
            token_env: DEFAULT_TOKEN_ENV.to_string(),
        }
    }
}

/// Values given on the command line (or through their environment variables).
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub url: Option<String>,
    pub base_branch: Option<String>,
    pub mirror_url: Option<String>,
}

impl Config {
    /// Load from `path`, or from [`DEFAULT_CONFIG_FILE`] if it exists, or fall
    /// back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))
            }
            None => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(url) = overrides.url {
            self.gitlab.url = url;
        }
        if let Some(base_branch) = overrides.base_branch {
            self.repository.base_branch = base_branch;
        }
        if let Some(mirror_url) = overrides.mirror_url {
            self.repository.mirror_url = mirror_url;
        }
    }
}

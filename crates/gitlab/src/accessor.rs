//! Lazy, memoised construction of the [`GitLabClient`].
//!
//! A [`ClientAccessor`] is an ordinary value owned by the caller. The first
//! successful [`ClientAccessor::client`] call reads the credential and builds
//! the client; every later call returns that same handle, whatever URL it
//! asks for.

use std::fmt;
use std::sync::Arc;

use repo_ops::RepoError;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::GitLabClient;

/// Public GitLab instance used when no URL is configured.
pub const DEFAULT_BASE_URL: &str = "https://gitlab.com";

/// Environment variable holding the personal access token.
pub const DEFAULT_TOKEN_ENV: &str = "GITLAB_TOKEN";

type TokenLookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Builds the client on first use and hands out the same [`Arc`] afterwards.
///
/// Concurrent first callers are serialised by a [`OnceCell`], so exactly one
/// client is created. A failed initialisation is not cached; the next call
/// tries again.
pub struct ClientAccessor {
    token_env: String,
    lookup: TokenLookup,
    cell: OnceCell<Arc<GitLabClient>>,
}

impl ClientAccessor {
    /// An accessor that reads the token from the process environment variable
    /// `token_env`.
    pub fn new(token_env: impl Into<String>) -> Self {
        Self::with_lookup(token_env, |name| std::env::var(name).ok())
    }

    /// An accessor that resolves the token through `lookup` instead of the
    /// process environment.
    pub fn with_lookup<F>(token_env: impl Into<String>, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            token_env: token_env.into(),
            lookup: Box::new(lookup),
            cell: OnceCell::new(),
        }
    }

    pub fn token_env(&self) -> &str {
        &self.token_env
    }

    /// Returns the shared client, creating it for `base_url` on first use.
    ///
    /// Fails with [`RepoError::Configuration`] if the token variable is unset
    /// or empty at initialisation time.
    pub async fn client(&self, base_url: &str) -> Result<Arc<GitLabClient>, RepoError> {
        let client = self
            .cell
            .get_or_try_init(|| async { self.init(base_url) })
            .await?;
        if client.base_url() != base_url {
            debug!(
                requested = base_url,
                using = client.base_url(),
                "client already initialised, ignoring requested URL"
            );
        }
        Ok(Arc::clone(client))
    }

    fn init(&self, base_url: &str) -> Result<Arc<GitLabClient>, RepoError> {
        let token = (self.lookup)(&self.token_env)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| RepoError::configuration(format!("{} not set", self.token_env)))?;
        let client = GitLabClient::new(base_url, &token)?;
        info!(base_url, "initialised GitLab client");
        Ok(Arc::new(client))
    }
}

impl Default for ClientAccessor {
    fn default() -> Self {
        Self::new(DEFAULT_TOKEN_ENV)
    }
}

impl fmt::Debug for ClientAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientAccessor")
            .field("token_env", &self.token_env)
            .field("initialised", &self.cell.initialized())
            .finish()
    }
}

//! GitLab infrastructure adapter.
//!
//! Implements the [`repo_ops::RepositoryHost`] trait over the GitLab REST v4
//! API with `reqwest`, and provides [`ClientAccessor`] for building the
//! authenticated client once per process from a token in the environment.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** This crate must not contain domain rules. URL
//! construction, authentication headers and status classification live here;
//! the [`repo_ops`] crate never sees them.
//!
//! ```ignore
//! use gitlab::{ClientAccessor, DEFAULT_BASE_URL};
//! use repo_ops::{RepoOperations, RepoRequest, RepoSettings};
//!
//! let accessor = ClientAccessor::default();
//! let client = accessor.client(DEFAULT_BASE_URL).await?;
//! let ops = RepoOperations::new(client, RepoSettings::default())?;
//! let project = ops.get_project(&RepoRequest::new(DEFAULT_BASE_URL, "group/project", "")).await?;
//! ```

mod accessor;
mod client;
mod error;

pub use accessor::{ClientAccessor, DEFAULT_BASE_URL, DEFAULT_TOKEN_ENV};
pub use client::GitLabClient;
pub use error::{from_status, from_transport};

//! The port through which operations reach the hosting platform.
//!
//! Infrastructure crates implement [`RepositoryHost`]; this crate never sees
//! URLs, headers or status codes. Every method is one remote call: no
//! retries, no pagination, no cross-call state.

use async_trait::async_trait;

use crate::{
    Branch, Commit, MergeRequest, NewBranch, NewCommit, NewMergeRequest, NewMirror, Project,
    ProjectMirror, RepoError, RepositoryFile, ResponseMeta,
};

/// Remote calls consumed by [`crate::RepoOperations`].
///
/// `project` is either a numeric project ID or a full `group/project` path;
/// implementations are responsible for encoding it.
#[async_trait]
pub trait RepositoryHost: Send + Sync {
    /// Creates `branch.branch` starting at `branch.reference`.
    async fn create_branch(&self, project: &str, branch: &NewBranch) -> Result<Branch, RepoError>;

    /// Fetches a single branch. A missing branch is [`RepoError::NotFound`].
    async fn get_branch(&self, project: &str, branch: &str) -> Result<Branch, RepoError>;

    async fn delete_branch(&self, project: &str, branch: &str) -> Result<ResponseMeta, RepoError>;

    /// Fetches a file at `reference`, content still in transport encoding.
    async fn get_file(
        &self,
        project: &str,
        path: &str,
        reference: &str,
    ) -> Result<RepositoryFile, RepoError>;

    async fn get_project(&self, project: &str) -> Result<Project, RepoError>;

    /// Submits all actions of `commit` atomically.
    async fn create_commit(&self, project: &str, commit: &NewCommit) -> Result<Commit, RepoError>;

    async fn create_merge_request(
        &self,
        project: &str,
        merge_request: &NewMergeRequest,
    ) -> Result<MergeRequest, RepoError>;

    async fn add_project_mirror(
        &self,
        project: &str,
        mirror: &NewMirror,
    ) -> Result<ProjectMirror, RepoError>;
}

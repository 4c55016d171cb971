//! Repository operations built on [`RepositoryHost`].
//!
//! Each method translates a [`RepoRequest`] into one remote call and returns
//! the typed result or the host's error unchanged. [`RepoOperations::create_commit`]
//! and [`RepoOperations::create_merge_request`] are the only methods that
//! sequence more than one call.

use std::sync::Arc;

use base64::Engine as _;
use tracing::{debug, info};

use crate::{
    Branch, Commit, CommitAction, FileSet, ForkParent, MergeRequest, NewBranch, NewCommit,
    NewMergeRequest, NewMirror, Project, ProjectMirror, RepoError, RepoRequest, RepoSettings,
    RepositoryHost, ResponseMeta,
};

/// An explicitly constructed handle for running operations.
///
/// Holds the host connection and the configured settings. Build one at start-up
/// and pass it (or clones of it) to whatever needs to talk to the platform.
#[derive(Clone)]
pub struct RepoOperations {
    host: Arc<dyn RepositoryHost>,
    settings: RepoSettings,
}

impl RepoOperations {
    /// Creates a handle over `host`, rejecting unusable settings.
    pub fn new(host: Arc<dyn RepositoryHost>, settings: RepoSettings) -> Result<Self, RepoError> {
        settings.validate()?;
        Ok(Self { host, settings })
    }

    pub fn settings(&self) -> &RepoSettings {
        &self.settings
    }

    /// Creates `request.branch` from the configured base branch.
    #[tracing::instrument(skip(self, request), fields(project = %request.project, branch = %request.branch))]
    pub async fn create_branch(&self, request: &RepoRequest) -> Result<Branch, RepoError> {
        let body = NewBranch {
            branch: request.branch.clone(),
            reference: self.settings.base_branch.clone(),
        };
        let branch = self.host.create_branch(&request.project, &body).await?;
        info!(reference = %body.reference, "created branch");
        Ok(branch)
    }

    #[tracing::instrument(skip(self, request), fields(project = %request.project, branch = %request.branch))]
    pub async fn get_branch(&self, request: &RepoRequest) -> Result<Branch, RepoError> {
        self.host
            .get_branch(&request.project, &request.branch)
            .await
    }

    #[tracing::instrument(skip(self, request), fields(project = %request.project, branch = %request.branch))]
    pub async fn delete_branch(&self, request: &RepoRequest) -> Result<ResponseMeta, RepoError> {
        self.host
            .delete_branch(&request.project, &request.branch)
            .await
    }

    /// Commits `files` to `request.branch`, creating the branch first if it
    /// does not exist.
    ///
    /// Each file becomes one literal-content update action, in path order.
    /// Which lookup failures count as "branch missing" is governed by
    /// [`RepoSettings::branch_lookup`]; other lookup failures are returned.
    #[tracing::instrument(skip(self, request, files), fields(project = %request.project, branch = %request.branch, files = files.len()))]
    pub async fn create_commit(
        &self,
        request: &RepoRequest,
        files: &FileSet,
    ) -> Result<Commit, RepoError> {
        match self.get_branch(request).await {
            Ok(_) => debug!("branch exists"),
            Err(err) if self.settings.branch_lookup.treats_as_missing(&err) => {
                debug!(error = %err, "branch lookup failed, creating branch");
                self.create_branch(request).await?;
            }
            Err(err) => return Err(err),
        }

        let body = NewCommit {
            branch: request.branch.clone(),
            commit_message: request.message.clone(),
            actions: files
                .iter()
                .map(|(path, content)| CommitAction::update(path, content))
                .collect(),
        };
        let commit = self.host.create_commit(&request.project, &body).await?;
        info!(commit = %commit.short_id, "created commit");
        Ok(commit)
    }

    /// Opens a merge request from `request.branch` into the base branch of the
    /// project `request.project` was forked from.
    ///
    /// Fails with [`RepoError::MissingForkParent`] without calling the remote
    /// if the project is not a fork.
    #[tracing::instrument(skip(self, request), fields(project = %request.project, branch = %request.branch))]
    pub async fn create_merge_request(
        &self,
        request: &RepoRequest,
    ) -> Result<MergeRequest, RepoError> {
        let parent = self
            .get_fork_parent(request)
            .await?
            .ok_or_else(|| RepoError::MissingForkParent {
                project: request.project.clone(),
            })?;

        let body = NewMergeRequest {
            source_branch: request.branch.clone(),
            target_branch: self.settings.base_branch.clone(),
            title: request.message.clone(),
            target_project_id: parent.id,
        };
        let merge_request = self
            .host
            .create_merge_request(&request.project, &body)
            .await?;
        info!(
            target_project = %parent.id,
            iid = merge_request.iid,
            "opened merge request"
        );
        Ok(merge_request)
    }

    /// Registers the configured mirror URL on `request.project`, enabled.
    ///
    /// The URL always comes from [`RepoSettings::mirror_url`], never from the
    /// request.
    #[tracing::instrument(skip(self, request), fields(project = %request.project))]
    pub async fn create_pull_mirror(
        &self,
        request: &RepoRequest,
    ) -> Result<ProjectMirror, RepoError> {
        let body = NewMirror {
            url: self.settings.mirror_url.clone(),
            enabled: true,
        };
        let mirror = self
            .host
            .add_project_mirror(&request.project, &body)
            .await?;
        info!(mirror = %mirror.id, "added mirror");
        Ok(mirror)
    }

    #[tracing::instrument(skip(self, request), fields(project = %request.project))]
    pub async fn get_project(&self, request: &RepoRequest) -> Result<Project, RepoError> {
        self.host.get_project(&request.project).await
    }

    /// Returns the project `request.project` was forked from, or `None` if it
    /// is not a fork.
    #[tracing::instrument(skip(self, request), fields(project = %request.project))]
    pub async fn get_fork_parent(
        &self,
        request: &RepoRequest,
    ) -> Result<Option<ForkParent>, RepoError> {
        let parent = self.get_project(request).await?.forked_from_project;
        debug!(forked = parent.is_some(), "resolved fork parent");
        Ok(parent)
    }

    /// Reads `request.path` at `request.branch` and returns the raw bytes.
    #[tracing::instrument(skip(self, request), fields(project = %request.project, branch = %request.branch, path = %request.path))]
    pub async fn get_file(&self, request: &RepoRequest) -> Result<Vec<u8>, RepoError> {
        let file = self
            .host
            .get_file(&request.project, &request.path, &request.branch)
            .await?;
        decode_content(&file.encoding, &file.content)
    }
}

fn decode_content(encoding: &str, content: &str) -> Result<Vec<u8>, RepoError> {
    match encoding {
        "text" => Ok(content.as_bytes().to_vec()),
        "base64" | "" => base64::engine::general_purpose::STANDARD
            .decode(content.trim())
            .map_err(|e| RepoError::decode(format!("file content is not valid base64: {e}"))),
        other => Err(RepoError::decode(format!(
            "unsupported file encoding '{other}'"
        ))),
    }
}

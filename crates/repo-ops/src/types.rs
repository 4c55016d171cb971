//! Value types exchanged with the remote platform.
//!
//! Three groups live here:
//!
//! - the per-call inputs ([`RepoRequest`], [`FileSet`]);
//! - outgoing payloads (`New*`, [`CommitAction`]) serialised with the remote
//!   API's field names;
//! - incoming entities ([`Branch`], [`Commit`], [`Project`], ...) deserialised
//!   from the remote API. Only the fields this crate reads or reports are
//!   modelled; everything else in the response is ignored.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{MergeRequestId, MirrorId, ProjectId};

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Describes which project, branch and file an operation addresses.
///
/// Built fresh for each call. Fields are not validated here: an operation only
/// reads the fields it needs, and the remote rejects values it cannot accept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoRequest {
    /// Base URL of the hosting instance (e.g. `"https://gitlab.com"`).
    pub host: String,
    /// Project ID or full path (`"group/project"`).
    pub project: String,
    /// Branch to read, create, delete or commit to.
    pub branch: String,
    /// Repository-relative file path, used by file reads.
    pub path: String,
    /// Commit message, also used as the merge-request title.
    pub message: String,
}

impl RepoRequest {
    /// Creates a request for `project` and `branch` on `host`.
    pub fn new(
        host: impl Into<String>,
        project: impl Into<String>,
        branch: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            project: project.into(),
            branch: branch.into(),
            ..Self::default()
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }
}

// ---------------------------------------------------------------------------

/// Files to write in a single commit, keyed by repository-relative path.
///
/// Paths are unique. Iteration is in path order, so the actions of a commit
/// are always submitted in the same order for the same input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSet(BTreeMap<String, String>);

impl FileSet {
    /// Creates an empty file set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the content for `path`, returning the previous content.
    pub fn insert(&mut self, path: impl Into<String>, content: impl Into<String>) -> Option<String> {
        self.0.insert(path.into(), content.into())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates `(path, content)` pairs in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(p, c)| (p.as_str(), c.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FileSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

// ---------------------------------------------------------------------------
// Outgoing payloads
// ---------------------------------------------------------------------------

/// Body of a create-branch request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewBranch {
    /// Name of the branch to create.
    pub branch: String,
    /// Branch name or commit SHA the new branch starts from.
    #[serde(rename = "ref")]
    pub reference: String,
}

/// Kind of change a [`CommitAction`] applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitActionKind {
    Create,
    Update,
    Delete,
    Move,
    Chmod,
}

/// How the `content` of a [`CommitAction`] is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentEncoding {
    /// Content is the literal file text.
    Text,
    /// Content is base64 of the file bytes.
    Base64,
}

/// One file-level change inside a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitAction {
    pub action: CommitActionKind,
    pub file_path: String,
    pub content: String,
    pub encoding: ContentEncoding,
}

impl CommitAction {
    /// An update of `file_path` to the literal `content`.
    pub fn update(file_path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            action: CommitActionKind::Update,
            file_path: file_path.into(),
            content: content.into(),
            encoding: ContentEncoding::Text,
        }
    }
}

/// Body of a create-commit request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewCommit {
    pub branch: String,
    pub commit_message: String,
    pub actions: Vec<CommitAction>,
}

/// Body of a create-merge-request request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewMergeRequest {
    pub source_branch: String,
    pub target_branch: String,
    pub title: String,
    /// Project the merge request is opened against (the fork parent).
    pub target_project_id: ProjectId,
}

/// Body of an add-mirror request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewMirror {
    pub url: String,
    pub enabled: bool,
}

// ---------------------------------------------------------------------------
// Incoming entities
// ---------------------------------------------------------------------------

/// Commit summary embedded in a [`Branch`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitSummary {
    pub id: String,
    #[serde(default)]
    pub short_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub committed_date: Option<DateTime<Utc>>,
}

/// A branch as reported by the remote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    pub name: String,
    #[serde(default)]
    pub merged: bool,
    #[serde(default)]
    pub protected: bool,
    #[serde(default)]
    pub default: bool,
    #[serde(default)]
    pub web_url: Option<String>,
    #[serde(default)]
    pub commit: Option<CommitSummary>,
}

/// A commit created by the create-commit call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commit {
    /// Full commit SHA.
    pub id: String,
    #[serde(default)]
    pub short_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub author_name: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub web_url: Option<String>,
}

/// A merge request as returned by the create call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeRequest {
    pub id: MergeRequestId,
    /// Per-project sequence number shown in the UI (`!iid`).
    pub iid: u64,
    pub project_id: ProjectId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub source_branch: String,
    #[serde(default)]
    pub target_branch: String,
    #[serde(default)]
    pub target_project_id: Option<ProjectId>,
    #[serde(default)]
    pub web_url: Option<String>,
}

/// The upstream project a fork was created from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForkParent {
    pub id: ProjectId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub path_with_namespace: String,
    #[serde(default)]
    pub web_url: Option<String>,
}

/// Project metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub path_with_namespace: String,
    #[serde(default)]
    pub default_branch: Option<String>,
    #[serde(default)]
    pub web_url: Option<String>,
    /// Present only when the project is a fork.
    #[serde(default)]
    pub forked_from_project: Option<ForkParent>,
}

/// A mirror registered on a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectMirror {
    pub id: MirrorId,
    /// Mirror URL, with any credentials masked by the remote.
    pub url: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub update_status: Option<String>,
    #[serde(default)]
    pub last_error: Option<String>,
}

/// A file read from the repository.
///
/// `content` is in transport encoding; see [`crate::RepoOperations::get_file`]
/// for the decoded bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryFile {
    pub file_name: String,
    pub file_path: String,
    #[serde(default)]
    pub size: u64,
    /// `"base64"` (the remote's default) or `"text"`.
    pub encoding: String,
    pub content: String,
    #[serde(rename = "ref", default)]
    pub reference: String,
    #[serde(default)]
    pub blob_id: String,
    #[serde(default)]
    pub commit_id: String,
}

/// Transport-level outcome of a call with no response body (delete).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseMeta {
    /// HTTP status code.
    pub status: u16,
    /// Correlation ID assigned by the remote (`X-Request-Id`), when sent.
    pub request_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_set_iterates_in_path_order() {
        let files: FileSet = [("b.txt", "world"), ("a.txt", "hello")].into_iter().collect();
        let paths: Vec<&str> = files.iter().map(|(p, _)| p).collect();
        assert_eq!(paths, vec!["a.txt", "b.txt"]);
    }

    #[test]
    fn test_file_set_insert_replaces() {
        let mut files = FileSet::new();
        assert!(files.insert("a.txt", "one").is_none());
        assert_eq!(files.insert("a.txt", "two").as_deref(), Some("one"));
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_new_branch_uses_ref_field() {
        let body = NewBranch {
            branch: "feature".to_string(),
            reference: "master".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({ "branch": "feature", "ref": "master" })
        );
    }

    #[test]
    fn test_update_action_serialises_literal_content() {
        let action = CommitAction::update("a.txt", "hello");
        assert_eq!(
            serde_json::to_value(&action).unwrap(),
            serde_json::json!({
                "action": "update",
                "file_path": "a.txt",
                "content": "hello",
                "encoding": "text"
            })
        );
    }

    #[test]
    fn test_project_with_fork_parent_deserialises() {
        let json = r#"{
            "id": 3,
            "name": "clusterimagesets",
            "path_with_namespace": "me/clusterimagesets",
            "default_branch": "master",
            "web_url": "https://gitlab.com/me/clusterimagesets",
            "star_count": 0,
            "forked_from_project": {
                "id": 13083,
                "name": "clusterimagesets",
                "name_with_namespace": "service / clusterimagesets",
                "path_with_namespace": "service/clusterimagesets",
                "web_url": "https://gitlab.com/service/clusterimagesets"
            }
        }"#;
        let project: Project = serde_json::from_str(json).unwrap();
        assert_eq!(project.id, ProjectId::new(3));
        assert_eq!(
            project.forked_from_project.map(|p| p.id),
            Some(ProjectId::new(13083))
        );
    }

    #[test]
    fn test_project_without_fork_parent_deserialises() {
        let json = r#"{ "id": 3, "forked_from_project": null }"#;
        let project: Project = serde_json::from_str(json).unwrap();
        assert!(project.forked_from_project.is_none());
    }

    #[test]
    fn test_branch_with_offset_timestamp_deserialises() {
        let json = r#"{
            "name": "master",
            "merged": false,
            "protected": true,
            "default": true,
            "commit": {
                "id": "7b5c3cc8be40ee161ae89a06bba6229da1032a0c",
                "short_id": "7b5c3cc",
                "title": "add projects API",
                "committed_date": "2012-06-28T03:44:20-07:00"
            }
        }"#;
        let branch: Branch = serde_json::from_str(json).unwrap();
        let commit = branch.commit.unwrap();
        assert_eq!(
            commit.committed_date.unwrap().to_rfc3339(),
            "2012-06-28T10:44:20+00:00"
        );
    }
}

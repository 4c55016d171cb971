//! Repository operations against a hosted source-control platform.
//!
//! This crate contains the request descriptor, the entity types returned by the
//! platform, the single error type, and the operations themselves (create
//! branch, commit files, open merge request, add mirror, read file and project
//! metadata). Infrastructure crates implement [`RepositoryHost`]; they never
//! add behaviour of their own.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O dependencies.
//! It defines *what* is called; infrastructure crates define *how* it reaches
//! the network.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`ProjectId`, `BranchName`, etc.) |
//! | [`types`] | Request descriptor, file set, payloads and entities |
//! | [`errors`] | `RepoError` and retry-policy types |
//! | [`ports`] | The `RepositoryHost` trait |
//! | [`settings`] | Base branch, mirror URL and branch-lookup policy |
//! | [`operations`] | `RepoOperations` |

pub mod errors;
pub mod identifiers;
pub mod operations;
pub mod ports;
pub mod settings;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use errors::{RepoError, RetryPolicy};
pub use identifiers::{BranchName, InvocationId, MergeRequestId, MirrorId, ProjectId};
pub use operations::RepoOperations;
pub use ports::RepositoryHost;
pub use settings::{BranchLookup, RepoSettings, DEFAULT_BASE_BRANCH, DEFAULT_MIRROR_URL};
pub use types::{
    Branch, Commit, CommitAction, CommitActionKind, CommitSummary, ContentEncoding, FileSet,
    ForkParent, MergeRequest, NewBranch, NewCommit, NewMergeRequest, NewMirror, Project,
    ProjectMirror, RepoRequest, RepositoryFile, ResponseMeta,
};

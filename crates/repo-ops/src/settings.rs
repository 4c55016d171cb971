//! Configured values shared by every operation.

use serde::{Deserialize, Serialize};

use crate::{BranchName, RepoError};

/// Branch that new branches start from and merge requests target.
pub const DEFAULT_BASE_BRANCH: &str = "master";

/// Source URL registered by the pull-mirror operation.
pub const DEFAULT_MIRROR_URL: &str = "https://gitlab.cee.redhat.com/service/clusterimagesets.git";

/// How the commit operation interprets a failed branch lookup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchLookup {
    /// Only a not-found answer means the branch is missing; any other lookup
    /// error aborts the commit.
    #[default]
    NotFoundOnly,
    /// Any lookup error means the branch is missing and creation is attempted.
    AnyError,
}

impl BranchLookup {
    /// Returns `true` if `err` from a branch lookup means "create the branch".
    pub fn treats_as_missing(self, err: &RepoError) -> bool {
        match self {
            Self::NotFoundOnly => err.is_not_found(),
            Self::AnyError => true,
        }
    }
}

/// Configuration read by the operations at call time.
///
/// Missing fields take their defaults when deserialised; unknown fields are
/// rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RepoSettings {
    pub base_branch: String,
    pub mirror_url: String,
    pub branch_lookup: BranchLookup,
}

impl Default for RepoSettings {
    fn default() -> Self {
        Self {
            base_branch: DEFAULT_BASE_BRANCH.to_string(),
            mirror_url: DEFAULT_MIRROR_URL.to_string(),
            branch_lookup: BranchLookup::default(),
        }
    }
}

impl RepoSettings {
    /// Rejects settings that would send an empty ref or mirror URL.
    pub fn validate(&self) -> Result<(), RepoError> {
        if BranchName::new(self.base_branch.as_str()).is_none() {
            return Err(RepoError::configuration("base branch must not be empty"));
        }
        if self.mirror_url.trim().is_empty() {
            return Err(RepoError::configuration("mirror URL must not be empty"));
        }
        Ok(())
    }
}

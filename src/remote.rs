//! Remote Repository Contract
//!
//! The capabilities the reconciler needs from a version-controlled hosting service.
//! Any backend (GitHub, a test double, ...) that honors these semantics can drive
//! reconciliation:
//!
//! - `update_file` is an optimistic-concurrency write: it must fail when the expected
//!   version token no longer matches the file on that branch.
//! - `create_branch` must fail when the branch already exists.
//! - `list_open_proposals` returns the open proposals whose source is the given branch.

use crate::error::RemoteError;
use async_trait::async_trait;

pub mod github;

pub use github::GitHubRepository;

/// File content plus the opaque version token used for conditional writes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub content: Vec<u8>,
    pub version: String,
}

/// Identifier of a change proposal (pull request number on GitHub)
pub type ProposalId = u64;

#[async_trait]
pub trait RemoteRepository: Send + Sync {
    /// Fetch a file at a branch, tag or commit
    async fn fetch_file(&self, path: &str, git_ref: &str) -> Result<RemoteFile, RemoteError>;

    /// Resolve a branch name to the commit it points at
    async fn resolve_ref(&self, branch: &str) -> Result<String, RemoteError>;

    /// Create `branch` pointing at `from_commit`
    async fn create_branch(&self, from_commit: &str, branch: &str) -> Result<(), RemoteError>;

    /// Commit new file content on `branch`, conditional on `expected_version`
    async fn update_file(
        &self,
        path: &str,
        branch: &str,
        message: &str,
        content: &[u8],
        expected_version: &str,
    ) -> Result<(), RemoteError>;

    /// Open a change proposal from `head` into `base`
    async fn create_change_proposal(
        &self,
        title: &str,
        body: &str,
        head: &str,
        base: &str,
    ) -> Result<ProposalId, RemoteError>;

    /// Open proposals whose source branch is `head`
    async fn list_open_proposals(&self, head: &str) -> Result<Vec<ProposalId>, RemoteError>;

    /// Backend name for logs
    fn backend_name(&self) -> &str;
}

//! Git operations abstraction layer
//!
//! This module provides a trait-based abstraction over the Git operations the
//! publisher needs, allowing for a real implementation backed by a Git
//! repository on disk and a mock implementation for testing.
//!
//! # Overview
//!
//! - [repository::Git2Repository]: reads history with `git2`, pushes with the `git` CLI
//! - [mock::MockRepository]: in-memory branches that record every push call
//!
//! # Usage
//!
//! ```rust
//! # use git_batch_push::git::Repository;
//! # fn example<R: Repository>(repo: &R) -> Result<(), Box<dyn std::error::Error>> {
//! for branch in repo.list_branches()? {
//!     let commits = repo.list_commits(&branch)?;
//!     println!("{}: {} commits", branch, commits.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod mock;
pub mod repository;

pub use mock::{MockRepository, PushCall};
pub use repository::Git2Repository;

use crate::error::Result;
use git2::Oid;

/// Refspec that force-moves `refs/heads/<branch>` on the remote to `oid`
pub fn commit_refspec(oid: Oid, branch: &str) -> String {
    format!("+{}:refs/heads/{}", oid, branch)
}

/// Refspec that pushes the local branch to the remote branch of the same name
pub fn branch_refspec(branch: &str) -> String {
    format!("refs/heads/{}:refs/heads/{}", branch, branch)
}

/// Version-control engine used by the publisher
///
/// ## Error Handling
///
/// All methods return [crate::error::Result<T>]. Implementations map read
/// failures to [crate::error::BatchPushError::Git] and rejected pushes to
/// [crate::error::BatchPushError::Push].
pub trait Repository {
    /// List local branch names
    ///
    /// Order is not significant; callers sort.
    fn list_branches(&self) -> Result<Vec<String>>;

    /// List commits reachable from a branch tip
    ///
    /// Returns commit identifiers in topological order, oldest first. A branch
    /// without a resolvable tip yields an empty list.
    ///
    /// # Arguments
    /// * `branch` - Name of the local branch (e.g., "main")
    fn list_commits(&self, branch: &str) -> Result<Vec<Oid>>;

    /// Force the remote `refs/heads/<branch>` to point at `oid`
    ///
    /// # Arguments
    /// * `remote` - Name of the remote (e.g., "origin")
    /// * `oid` - Commit to move the remote ref to
    /// * `branch` - Branch name on the remote
    fn push_commit(&self, remote: &str, oid: Oid, branch: &str) -> Result<()>;

    /// Push a local branch to the remote by name
    ///
    /// Succeeds without changes when the remote already matches.
    fn push_branch(&self, remote: &str, branch: &str) -> Result<()>;

    /// Push every local tag to the remote in one operation
    fn push_tags(&self, remote: &str) -> Result<()>;
}

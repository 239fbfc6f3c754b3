use crate::error::{BatchPushError, Result};
use crate::git::{branch_refspec, commit_refspec, Repository};
use git2::Oid;
use std::cell::RefCell;
use std::collections::HashMap;

/// A push issued against a repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushCall {
    Commit {
        remote: String,
        oid: Oid,
        branch: String,
    },
    Branch {
        remote: String,
        branch: String,
    },
    Tags {
        remote: String,
    },
}

/// Mock repository for testing without actual git operations
///
/// Branches hold their commit list directly. Every push is recorded in
/// order and applied to an in-memory view of the remote's branch refs.
pub struct MockRepository {
    branches: HashMap<String, Vec<Oid>>,
    calls: RefCell<Vec<PushCall>>,
    remote_heads: RefCell<HashMap<String, Oid>>,
    reject: Option<PushCall>,
}

impl MockRepository {
    /// Create a new empty mock repository
    pub fn new() -> Self {
        MockRepository {
            branches: HashMap::new(),
            calls: RefCell::new(Vec::new()),
            remote_heads: RefCell::new(HashMap::new()),
            reject: None,
        }
    }

    /// Add a branch with an explicit oldest-first commit list
    pub fn add_branch(&mut self, name: impl Into<String>, commits: Vec<Oid>) {
        self.branches.insert(name.into(), commits);
    }

    /// Add a branch with `count` synthetic commits
    ///
    /// Identifiers are derived from the branch name and position, so two
    /// branches never share commits.
    pub fn add_branch_with_commits(&mut self, name: impl Into<String>, count: usize) {
        let name = name.into();
        let seed = self.branches.len() as u32 + 1;
        let commits = (1..=count as u32).map(|i| synthetic_oid(seed, i)).collect();
        self.branches.insert(name, commits);
    }

    /// Make the given push fail with a rejection
    pub fn reject_push(&mut self, call: PushCall) {
        self.reject = Some(call);
    }

    /// Every push attempted so far, in order
    pub fn calls(&self) -> Vec<PushCall> {
        self.calls.borrow().clone()
    }

    /// Forget recorded calls, keeping the remote state
    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    /// Where the remote's `refs/heads/<branch>` currently points
    pub fn remote_head(&self, branch: &str) -> Option<Oid> {
        self.remote_heads.borrow().get(branch).copied()
    }

    fn record(&self, call: PushCall, refspec: String) -> Result<()> {
        self.calls.borrow_mut().push(call.clone());
        if self.reject.as_ref() == Some(&call) {
            let remote = match &call {
                PushCall::Commit { remote, .. }
                | PushCall::Branch { remote, .. }
                | PushCall::Tags { remote } => remote.clone(),
            };
            return Err(BatchPushError::push(remote, refspec, "rejected by mock"));
        }
        Ok(())
    }
}

/// Deterministic commit identifier for tests
pub fn synthetic_oid(seed: u32, index: u32) -> Oid {
    let mut bytes = [0u8; 20];
    bytes[..4].copy_from_slice(&seed.to_be_bytes());
    bytes[16..].copy_from_slice(&index.to_be_bytes());
    Oid::from_bytes(&bytes).expect("20 bytes is a valid oid")
}

impl Default for MockRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl Repository for MockRepository {
    fn list_branches(&self) -> Result<Vec<String>> {
        Ok(self.branches.keys().cloned().collect())
    }

    fn list_commits(&self, branch: &str) -> Result<Vec<Oid>> {
        self.branches
            .get(branch)
            .cloned()
            .ok_or_else(|| BatchPushError::branch(format!("Branch not found: {}", branch)))
    }

    fn push_commit(&self, remote: &str, oid: Oid, branch: &str) -> Result<()> {
        self.record(
            PushCall::Commit {
                remote: remote.to_string(),
                oid,
                branch: branch.to_string(),
            },
            commit_refspec(oid, branch),
        )?;
        self.remote_heads
            .borrow_mut()
            .insert(branch.to_string(), oid);
        Ok(())
    }

    fn push_branch(&self, remote: &str, branch: &str) -> Result<()> {
        self.record(
            PushCall::Branch {
                remote: remote.to_string(),
                branch: branch.to_string(),
            },
            branch_refspec(branch),
        )?;
        if let Some(tip) = self.branches.get(branch).and_then(|c| c.last()) {
            self.remote_heads
                .borrow_mut()
                .insert(branch.to_string(), *tip);
        }
        Ok(())
    }

    fn push_tags(&self, remote: &str) -> Result<()> {
        self.record(
            PushCall::Tags {
                remote: remote.to_string(),
            },
            "--tags".to_string(),
        )
    }
}

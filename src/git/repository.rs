use crate::error::{BatchPushError, Result};
use crate::git::{branch_refspec, commit_refspec};
use git2::{BranchType, Cred, CredentialType, Oid, PushOptions, RemoteCallbacks, Sort};
use git2::Repository as Git2Repo;
use std::cell::{Cell, RefCell};
use std::path::Path;
use tracing::{debug, warn};

/// Credential prompts libgit2 may issue before a push is given up
const MAX_CREDENTIAL_ATTEMPTS: usize = 5;

/// Wrapper around git2::Repository with our trait interface
pub struct Git2Repository {
    repo: Git2Repo,
}

impl Git2Repository {
    /// Open or discover a git repository
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let repo = Git2Repo::discover(path)?;

        Ok(Git2Repository { repo })
    }

    /// Create from existing git2::Repository
    pub fn from_git2(repo: Git2Repo) -> Self {
        Git2Repository { repo }
    }

    /// Push `refspecs` to `remote_name` in a single operation.
    ///
    /// `label` names the push in errors. A ref the remote refuses fails the
    /// whole push even though libgit2 itself reports success.
    fn push_refspecs(&self, remote_name: &str, refspecs: &[String], label: &str) -> Result<()> {
        let mut remote = self.repo.find_remote(remote_name).map_err(|e| {
            BatchPushError::push(remote_name, label, format!("Cannot find remote: {}", e))
        })?;
        let config = self.repo.config()?;

        let rejected = RefCell::new(Vec::new());
        let attempts = Cell::new(0usize);

        let mut callbacks = RemoteCallbacks::new();
        callbacks.credentials(|url, username_from_url, allowed_types| {
            attempts.set(attempts.get() + 1);
            if attempts.get() > MAX_CREDENTIAL_ATTEMPTS {
                return Err(git2::Error::from_str("authentication failed"));
            }
            credentials(&config, url, username_from_url, allowed_types)
        });
        callbacks.push_update_reference(|refname, status| {
            if let Some(status) = status {
                warn!(refname, status, "remote rejected reference");
                rejected
                    .borrow_mut()
                    .push(format!("{} rejected: {}", refname, status));
            }
            Ok(())
        });

        let mut push_options = PushOptions::new();
        push_options.remote_callbacks(callbacks);

        let specs: Vec<&str> = refspecs.iter().map(|s| s.as_str()).collect();
        debug!(remote = remote_name, refspec = label, "pushing");

        let pushed = remote.push(&specs, Some(&mut push_options));
        drop(push_options);

        if let Err(e) = pushed {
            let message = if e.class() == git2::ErrorClass::Net {
                format!("Network error during push: {}", e)
            } else if e.class() == git2::ErrorClass::Reference {
                format!("Reference error during push: {}", e)
            } else {
                e.to_string()
            };
            return Err(BatchPushError::push(remote_name, label, message));
        }

        let rejected = rejected.into_inner();
        if !rejected.is_empty() {
            return Err(BatchPushError::push(remote_name, label, rejected.join("; ")));
        }

        Ok(())
    }
}

/// Credentials for a push: SSH keys from ~/.ssh, then the SSH agent, then
/// the configured git credential helper, then libgit2's default.
fn credentials(
    config: &git2::Config,
    url: &str,
    username_from_url: Option<&str>,
    allowed_types: CredentialType,
) -> std::result::Result<Cred, git2::Error> {
    let username = username_from_url.unwrap_or("git");

    if allowed_types.contains(CredentialType::SSH_KEY) {
        if let Some(home) = dirs::home_dir() {
            for key in ["id_ed25519", "id_rsa", "id_ecdsa"] {
                let path = home.join(".ssh").join(key);
                if path.exists() {
                    if let Ok(cred) = Cred::ssh_key(username, None, &path, None) {
                        return Ok(cred);
                    }
                }
            }
        }

        if let Ok(cred) = Cred::ssh_key_from_agent(username) {
            return Ok(cred);
        }
    }

    if allowed_types.contains(CredentialType::USER_PASS_PLAINTEXT) {
        if let Ok(cred) = Cred::credential_helper(config, url, username_from_url) {
            return Ok(cred);
        }
    }

    Cred::default()
}

impl super::Repository for Git2Repository {
    fn list_branches(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();

        for entry in self.repo.branches(Some(BranchType::Local))? {
            let (branch, _) = entry?;
            if let Some(name) = branch.name()? {
                names.push(name.to_string());
            }
        }

        Ok(names)
    }

    fn list_commits(&self, branch: &str) -> Result<Vec<Oid>> {
        let branch_ref = self
            .repo
            .find_branch(branch, BranchType::Local)
            .map_err(|e| BatchPushError::branch(format!("Cannot find branch '{}': {}", branch, e)))?;

        let tip = match branch_ref.get().target() {
            Some(oid) => oid,
            None => return Ok(Vec::new()),
        };

        let mut revwalk = self.repo.revwalk()?;
        revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::REVERSE)?;
        revwalk.push(tip)?;

        let commits = revwalk.collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(commits)
    }

    fn push_commit(&self, remote: &str, oid: Oid, branch: &str) -> Result<()> {
        let refspec = commit_refspec(oid, branch);
        self.push_refspecs(remote, std::slice::from_ref(&refspec), &refspec)
    }

    fn push_branch(&self, remote: &str, branch: &str) -> Result<()> {
        let refspec = branch_refspec(branch);
        self.push_refspecs(remote, std::slice::from_ref(&refspec), &refspec)
    }

    fn push_tags(&self, remote: &str) -> Result<()> {
        let tags = self.repo.tag_names(None)?;
        let refspecs: Vec<String> = tags
            .iter()
            .flatten()
            .map(|tag| format!("refs/tags/{}:refs/tags/{}", tag, tag))
            .collect();

        if refspecs.is_empty() {
            debug!(remote, "no tags to push");
            return Ok(());
        }

        self.push_refspecs(remote, &refspecs, "refs/tags/*")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::Repository;
    use tempfile::TempDir;

    fn commit_chain(repo: &Git2Repo, count: usize) -> Vec<Oid> {
        let sig = git2::Signature::now("Test", "test@example.com").unwrap();
        let tree_id = repo.index().unwrap().write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();

        let mut oids = Vec::new();
        for i in 0..count {
            let parent = oids.last().map(|oid| repo.find_commit(*oid).unwrap());
            let parents: Vec<&git2::Commit> = parent.iter().collect();
            let oid = repo
                .commit(
                    Some("HEAD"),
                    &sig,
                    &sig,
                    &format!("commit {}", i),
                    &tree,
                    &parents,
                )
                .unwrap();
            oids.push(oid);
        }
        oids
    }

    #[test]
    fn test_list_commits_oldest_first() {
        let dir = TempDir::new().unwrap();
        let raw = Git2Repo::init(dir.path()).unwrap();
        let expected = commit_chain(&raw, 5);
        let head = raw.head().unwrap().shorthand().unwrap().to_string();

        let repo = Git2Repository::from_git2(raw);
        assert_eq!(repo.list_commits(&head).unwrap(), expected);
    }

    #[test]
    fn test_list_branches() {
        let dir = TempDir::new().unwrap();
        let raw = Git2Repo::init(dir.path()).unwrap();
        let oids = commit_chain(&raw, 2);
        let first = raw.find_commit(oids[0]).unwrap();
        raw.branch("topic", &first, false).unwrap();
        drop(first);

        let repo = Git2Repository::from_git2(raw);
        let branches = repo.list_branches().unwrap();
        assert_eq!(branches.len(), 2);
        assert!(branches.contains(&"topic".to_string()));
        assert_eq!(repo.list_commits("topic").unwrap(), vec![oids[0]]);
    }

    #[test]
    fn test_missing_branch_is_branch_error() {
        let dir = TempDir::new().unwrap();
        let raw = Git2Repo::init(dir.path()).unwrap();
        commit_chain(&raw, 1);

        let repo = Git2Repository::from_git2(raw);
        let err = repo.list_commits("nope").unwrap_err();
        assert!(matches!(err, BatchPushError::Branch(_)));
    }

    #[test]
    fn test_open_missing_path_fails() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("does-not-exist");

        assert!(Git2Repository::open(&missing).is_err());
    }

    fn with_bare_remote(raw: &Git2Repo) -> (TempDir, Git2Repo) {
        let remote_dir = TempDir::new().unwrap();
        let bare = Git2Repo::init_bare(remote_dir.path()).unwrap();
        raw.remote("origin", remote_dir.path().to_str().unwrap())
            .unwrap();
        (remote_dir, bare)
    }

    #[test]
    fn test_push_commit_moves_remote_ref_to_raw_oid() {
        let dir = TempDir::new().unwrap();
        let raw = Git2Repo::init(dir.path()).unwrap();
        let oids = commit_chain(&raw, 3);
        let head = raw.head().unwrap().name().unwrap().to_string();
        let branch = head.trim_start_matches("refs/heads/").to_string();
        let (_remote_dir, bare) = with_bare_remote(&raw);

        let repo = Git2Repository::from_git2(raw);
        repo.push_commit("origin", oids[0], &branch).unwrap();

        assert_eq!(bare.refname_to_id(&head).unwrap(), oids[0]);
        // No local branch is created for the pushed commit
        assert_eq!(repo.list_branches().unwrap(), vec![branch]);
    }

    #[test]
    fn test_non_fast_forward_push_is_rejected() {
        let dir = TempDir::new().unwrap();
        let raw = Git2Repo::init(dir.path()).unwrap();
        let oids = commit_chain(&raw, 3);
        let head = raw.head().unwrap().name().unwrap().to_string();
        let branch = head.trim_start_matches("refs/heads/").to_string();
        let (_remote_dir, bare) = with_bare_remote(&raw);
        {
            let first = raw.find_commit(oids[0]).unwrap();
            raw.branch("old", &first, false).unwrap();
        }

        let repo = Git2Repository::from_git2(raw);
        repo.push_branch("origin", &branch).unwrap();
        // Unforced push of an ancestor over the remote tip
        let refspec = format!("refs/heads/old:{}", head);
        let err = repo
            .push_refspecs("origin", &[refspec.clone()], &refspec)
            .unwrap_err();

        assert!(matches!(err, BatchPushError::Push { .. }));
        assert_eq!(bare.refname_to_id(&head).unwrap(), oids[2]);
    }

    #[test]
    fn test_push_tags_sends_every_tag() {
        let dir = TempDir::new().unwrap();
        let raw = Git2Repo::init(dir.path()).unwrap();
        let oids = commit_chain(&raw, 2);
        let (_remote_dir, bare) = with_bare_remote(&raw);
        for (name, oid) in [("v1", oids[0]), ("v2", oids[1])] {
            let object = raw.find_object(oid, None).unwrap();
            raw.tag_lightweight(name, &object, false).unwrap();
        }

        let repo = Git2Repository::from_git2(raw);
        repo.push_tags("origin").unwrap();

        assert_eq!(bare.refname_to_id("refs/tags/v1").unwrap(), oids[0]);
        assert_eq!(bare.refname_to_id("refs/tags/v2").unwrap(), oids[1]);
    }

    #[test]
    fn test_push_tags_without_tags_is_noop() {
        let dir = TempDir::new().unwrap();
        let raw = Git2Repo::init(dir.path()).unwrap();
        commit_chain(&raw, 1);
        let (_remote_dir, bare) = with_bare_remote(&raw);

        let repo = Git2Repository::from_git2(raw);
        repo.push_tags("origin").unwrap();

        assert!(bare.tag_names(None).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_remote_is_push_error() {
        let dir = TempDir::new().unwrap();
        let raw = Git2Repo::init(dir.path()).unwrap();
        let oids = commit_chain(&raw, 1);

        let repo = Git2Repository::from_git2(raw);
        let err = repo.push_commit("nowhere", oids[0], "main").unwrap_err();

        match err {
            BatchPushError::Push { remote, message, .. } => {
                assert_eq!(remote, "nowhere");
                assert!(message.contains("Cannot find remote"));
            }
            other => panic!("expected push error, got {}", other),
        }
    }
}

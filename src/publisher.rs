//! Incremental branch publisher
//!
//! Pushes the full history of each local branch to a remote in batches of at
//! most `batch_size` commits, then pushes all tags. Every push target is an
//! ancestor of the next one, so the remote only ever sees fast-forwards.
//! Runs are not resumable: each run re-walks every branch from its first
//! commit and re-issues pushes the remote already has.

use std::num::NonZeroUsize;
use std::thread;
use std::time::Duration;

use git2::Oid;
use tracing::{debug, info, info_span};

use crate::domain::{BatchPlan, BranchFilter};
use crate::error::Result;
use crate::git::Repository;

/// Settings for a publish run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishOptions {
    /// Remote to push to
    pub remote_name: String,
    /// Maximum number of commits advanced per intermediate push
    pub batch_size: NonZeroUsize,
    /// Pause after each intermediate push; zero disables pausing
    pub inter_batch_delay: Duration,
    /// Report pushes without issuing them
    pub dry_run: bool,
}

impl Default for PublishOptions {
    fn default() -> Self {
        PublishOptions {
            remote_name: "origin".to_string(),
            batch_size: NonZeroUsize::new(1000).unwrap_or(NonZeroUsize::MIN),
            inter_batch_delay: Duration::from_secs(2),
            dry_run: false,
        }
    }
}

/// Receives progress events while publishing
///
/// All methods default to doing nothing.
pub trait Progress {
    fn branch_started(&self, _branch: &str, _total: usize) {}

    fn batch_pushed(&self, _branch: &str, _position: usize, _total: usize, _oid: Oid) {}

    fn branch_pushed(&self, _branch: &str) {}

    fn tags_pushed(&self, _remote: &str) {}
}

/// Progress sink that discards every event
pub struct NoProgress;

impl Progress for NoProgress {}

/// Outcome of publishing one branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchReport {
    pub branch: String,
    /// Commits reachable from the branch tip
    pub total: usize,
    /// 1-based positions at which an intermediate push was issued
    pub pushed_positions: Vec<usize>,
}

/// Outcome of a full run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishSummary {
    pub remote: String,
    pub branches: Vec<BranchReport>,
    pub dry_run: bool,
}

impl PublishSummary {
    /// Pushes issued, or planned in a dry run: intermediate and final
    /// pushes per branch plus the single tag push
    pub fn total_pushes(&self) -> usize {
        self.branches
            .iter()
            .map(|b| b.pushed_positions.len() + 1)
            .sum::<usize>()
            + 1
    }
}

/// Publishes branches of a repository to a remote in batches
pub struct Publisher<'a, R: Repository> {
    repo: &'a R,
    options: PublishOptions,
    filter: BranchFilter,
    progress: &'a dyn Progress,
}

impl<'a, R: Repository> Publisher<'a, R> {
    pub fn new(repo: &'a R, options: PublishOptions) -> Self {
        Publisher {
            repo,
            options,
            filter: BranchFilter::default(),
            progress: &NoProgress,
        }
    }

    /// Restrict which local branches are published
    pub fn with_filter(mut self, filter: BranchFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_progress(mut self, progress: &'a dyn Progress) -> Self {
        self.progress = progress;
        self
    }

    pub fn options(&self) -> &PublishOptions {
        &self.options
    }

    /// Selected branches in publishing order
    pub fn branches(&self) -> Result<Vec<String>> {
        let local = self.repo.list_branches()?;
        self.filter.select(&local)
    }

    /// Batch plan for every selected branch, without pushing anything
    pub fn plan(&self) -> Result<Vec<(String, BatchPlan)>> {
        self.branches()?
            .into_iter()
            .map(|branch| {
                let total = self.repo.list_commits(&branch)?.len();
                Ok((branch, BatchPlan::new(total, self.options.batch_size)))
            })
            .collect()
    }

    /// Publish every selected branch, then push all tags once
    pub fn publish_all(&self) -> Result<PublishSummary> {
        let branches = self.branches()?;
        info!(
            remote = %self.options.remote_name,
            branches = branches.len(),
            batch_size = self.options.batch_size.get(),
            dry_run = self.options.dry_run,
            "publishing branches"
        );

        let mut reports = Vec::with_capacity(branches.len());
        for branch in &branches {
            reports.push(self.publish_branch(branch)?);
        }

        if !self.options.dry_run {
            self.repo.push_tags(&self.options.remote_name)?;
        }
        self.progress.tags_pushed(&self.options.remote_name);
        info!(remote = %self.options.remote_name, "tags pushed");

        Ok(PublishSummary {
            remote: self.options.remote_name.clone(),
            branches: reports,
            dry_run: self.options.dry_run,
        })
    }

    /// Push one branch's history in batches, then the branch by name
    pub fn publish_branch(&self, branch: &str) -> Result<BranchReport> {
        let _span = info_span!("branch", name = %branch).entered();
        let remote = self.options.remote_name.as_str();

        let commits = self.repo.list_commits(branch)?;
        let plan = BatchPlan::new(commits.len(), self.options.batch_size);
        let total = plan.total();

        info!(total, pushes = plan.push_count(), "walking history");
        self.progress.branch_started(branch, total);

        let mut pushed_positions = Vec::with_capacity(plan.push_count());
        for (index, oid) in commits.iter().enumerate() {
            let count = index + 1;
            if !plan.is_boundary(count) {
                continue;
            }

            debug!(count, total, %oid, "intermediate push");
            if !self.options.dry_run {
                self.repo.push_commit(remote, *oid, branch)?;
            }
            pushed_positions.push(count);
            self.progress.batch_pushed(branch, count, total, *oid);
            self.pause();
        }

        if !self.options.dry_run {
            self.repo.push_branch(remote, branch)?;
        }
        self.progress.branch_pushed(branch);
        info!(total, pushes = pushed_positions.len() + 1, "branch published");

        Ok(BranchReport {
            branch: branch.to_string(),
            total,
            pushed_positions,
        })
    }

    fn pause(&self) {
        if self.options.dry_run || self.options.inter_batch_delay.is_zero() {
            return;
        }
        thread::sleep(self.options.inter_batch_delay);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::{MockRepository, PushCall};
    use std::cell::RefCell;
    use std::io;
    use std::sync::{Arc, Mutex};

    fn options(batch_size: usize) -> PublishOptions {
        PublishOptions {
            batch_size: NonZeroUsize::new(batch_size).unwrap(),
            inter_batch_delay: Duration::ZERO,
            ..PublishOptions::default()
        }
    }

    #[derive(Default)]
    struct Recorder {
        events: RefCell<Vec<String>>,
    }

    impl Progress for Recorder {
        fn branch_started(&self, branch: &str, total: usize) {
            self.events
                .borrow_mut()
                .push(format!("start {} {}", branch, total));
        }

        fn batch_pushed(&self, branch: &str, position: usize, total: usize, _oid: Oid) {
            self.events
                .borrow_mut()
                .push(format!("batch {} {}/{}", branch, position, total));
        }

        fn branch_pushed(&self, branch: &str) {
            self.events.borrow_mut().push(format!("done {}", branch));
        }

        fn tags_pushed(&self, remote: &str) {
            self.events.borrow_mut().push(format!("tags {}", remote));
        }
    }

    #[test]
    fn test_default_options() {
        let opts = PublishOptions::default();
        assert_eq!(opts.remote_name, "origin");
        assert_eq!(opts.batch_size.get(), 1000);
        assert_eq!(opts.inter_batch_delay, Duration::from_secs(2));
    }

    #[test]
    fn test_progress_events_in_order() {
        let mut repo = MockRepository::new();
        repo.add_branch_with_commits("main", 5);
        let recorder = Recorder::default();

        Publisher::new(&repo, options(2))
            .with_progress(&recorder)
            .publish_all()
            .unwrap();

        assert_eq!(
            *recorder.events.borrow(),
            vec![
                "start main 5",
                "batch main 2/5",
                "batch main 4/5",
                "batch main 5/5",
                "done main",
                "tags origin",
            ]
        );
    }

    #[test]
    fn test_publish_branch_targets_commit_at_each_boundary() {
        let mut repo = MockRepository::new();
        repo.add_branch_with_commits("main", 7);
        let commits = repo.list_commits("main").unwrap();

        let report = Publisher::new(&repo, options(3))
            .publish_branch("main")
            .unwrap();

        assert_eq!(report.pushed_positions, vec![3, 6, 7]);
        let targets: Vec<Oid> = repo
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                PushCall::Commit { oid, .. } => Some(oid),
                _ => None,
            })
            .collect();
        assert_eq!(targets, vec![commits[2], commits[5], commits[6]]);
    }

    #[test]
    fn test_summary_counts_pushes() {
        let mut repo = MockRepository::new();
        repo.add_branch_with_commits("a", 3);
        repo.add_branch("b", vec![]);

        let summary = Publisher::new(&repo, options(2)).publish_all().unwrap();
        // a: 2 intermediate + 1 final, b: 1 final, tags: 1
        assert_eq!(summary.total_pushes(), 5);
        assert_eq!(summary.total_pushes(), repo.calls().len());
    }

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_branch_finish_is_logged() {
        let mut repo = MockRepository::new();
        repo.add_branch_with_commits("main", 5);

        let buffer = LogBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            Publisher::new(&repo, options(2))
                .publish_branch("main")
                .unwrap();
        });

        let logs = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        let line = logs
            .lines()
            .find(|l| l.contains("branch published"))
            .expect("branch published event");
        assert!(line.contains("total=5"));
        assert!(line.contains("pushes=4"));
        assert!(line.contains("main"));
    }

    #[test]
    fn test_pause_sleeps_between_batches() {
        let mut repo = MockRepository::new();
        repo.add_branch_with_commits("main", 2);
        let opts = PublishOptions {
            inter_batch_delay: Duration::from_millis(20),
            ..options(1)
        };

        let started = std::time::Instant::now();
        Publisher::new(&repo, opts).publish_branch("main").unwrap();
        assert!(started.elapsed() >= Duration::from_millis(40));
    }
}

//! User interface module - progress reporting and formatting.
//!
//! - `formatter` - Pure formatting functions
//! - This module - [ConsoleProgress], the terminal progress sink

use git2::Oid;

use crate::publisher::Progress;

pub mod formatter;

pub use formatter::{
    display_branch_header, display_error, display_plan, display_status, display_success,
    display_summary, format_batch_line,
};

/// Prints publisher progress to stdout
///
/// Large histories can take hours; each batch boundary prints a line so the
/// run never looks hung.
pub struct ConsoleProgress {
    dry_run: bool,
}

impl ConsoleProgress {
    pub fn new(dry_run: bool) -> Self {
        ConsoleProgress { dry_run }
    }

    fn verb(&self) -> &'static str {
        if self.dry_run {
            "Would push"
        } else {
            "Pushed"
        }
    }
}

fn short(oid: Oid) -> String {
    let full = oid.to_string();
    full[..7.min(full.len())].to_string()
}

impl Progress for ConsoleProgress {
    fn branch_started(&self, branch: &str, total: usize) {
        display_branch_header(branch, total);
        if total == 0 {
            display_status(&format!("{}: no commits to walk", branch));
        }
    }

    fn batch_pushed(&self, branch: &str, position: usize, total: usize, oid: Oid) {
        let line = format_batch_line(branch, position, total, &short(oid));
        if self.dry_run {
            display_status(&format!("[dry run] {}", line));
        } else {
            display_status(&line);
        }
    }

    fn branch_pushed(&self, branch: &str) {
        display_success(&format!("{} branch {}", self.verb(), branch));
    }

    fn tags_pushed(&self, remote: &str) {
        display_success(&format!("{} all tags to {}", self.verb(), remote));
    }
}

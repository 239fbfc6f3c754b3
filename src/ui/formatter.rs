//! Pure formatting and display functions for terminal output.

use console::style;

use crate::domain::BatchPlan;
use crate::publisher::PublishSummary;

pub fn display_error(message: &str) {
    eprintln!("{} {}", style("ERROR:").red().bold(), message);
}

pub fn display_success(message: &str) {
    println!("{} {}", style("✓").green(), message);
}

pub fn display_status(message: &str) {
    println!("{} {}", style("→").yellow(), message);
}

/// Percentage of history reached, for progress lines
pub fn percent(position: usize, total: usize) -> usize {
    if total == 0 {
        100
    } else {
        position * 100 / total
    }
}

pub fn format_batch_line(branch: &str, position: usize, total: usize, short_oid: &str) -> String {
    format!(
        "{}: pushed {}/{} ({}%) at {}",
        branch,
        position,
        total,
        percent(position, total),
        short_oid
    )
}

pub fn display_branch_header(branch: &str, total: usize) {
    println!(
        "\n{} {} ({} commits)",
        style("Publishing branch").bold(),
        style(branch).cyan(),
        total
    );
}

pub fn display_plan(remote: &str, plans: &[(String, BatchPlan)]) {
    println!(
        "{} {}",
        style("Branches to publish to").bold(),
        style(remote).cyan()
    );
    for (branch, plan) in plans {
        println!(
            "  - {} ({} commits, {} batch pushes + 1 final push)",
            branch,
            plan.total(),
            plan.push_count()
        );
    }
}

pub fn display_summary(summary: &PublishSummary) {
    let prefix = if summary.dry_run { "Dry run: would publish" } else { "Published" };
    let commits: usize = summary.branches.iter().map(|b| b.total).sum();
    println!(
        "\n{} {} {} branch(es), {} commits and all tags to {} in {} pushes\n",
        style("✓").green(),
        prefix,
        summary.branches.len(),
        commits,
        summary.remote,
        summary.total_pushes()
    );
}

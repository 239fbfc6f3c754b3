use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use git_batch_push::config::{self, Config};
use git_batch_push::git::Git2Repository;
use git_batch_push::ui::{self, ConsoleProgress};
use git_batch_push::Publisher;

#[derive(clap::Parser)]
#[command(
    name = "git-batch-push",
    version,
    about = "Push every branch's history and all tags to a remote in bounded batches"
)]
struct Args {
    #[arg(short, long, help = "Custom configuration file path")]
    config: Option<String>,

    #[arg(short, long, help = "Remote to push to [default: origin]")]
    remote: Option<String>,

    #[arg(short = 'n', long, help = "Commits per intermediate push [default: 1000]")]
    batch_size: Option<usize>,

    #[arg(
        short,
        long = "delay-ms",
        help = "Pause after each intermediate push, in milliseconds [default: 2000]"
    )]
    delay_ms: Option<u64>,

    #[arg(short, long = "branch", help = "Only publish this branch (repeatable)")]
    branches: Vec<String>,

    #[arg(short = 'x', long, help = "Skip this branch (repeatable)")]
    exclude: Vec<String>,

    #[arg(short = 'C', long, default_value = ".", help = "Repository path")]
    repo: String,

    #[arg(long, help = "Report what would be pushed without pushing")]
    dry_run: bool,

    #[arg(long, help = "Show branches and planned pushes, then exit")]
    list: bool,

    #[arg(short, long, action = clap::ArgAction::Count, help = "Increase log verbosity")]
    verbose: u8,
}

impl Args {
    /// Command-line values take precedence over the configuration file
    fn apply_to(&self, config: &mut Config) {
        if let Some(remote) = &self.remote {
            config.remote = remote.clone();
        }
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }
        if let Some(delay_ms) = self.delay_ms {
            config.inter_batch_delay_ms = delay_ms;
        }
        if !self.branches.is_empty() {
            config.branches.include = self.branches.clone();
        }
        config.branches.exclude.extend(self.exclude.iter().cloned());
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    if let Err(e) = run(args) {
        ui::display_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let mut config =
        config::load_config(args.config.as_deref()).context("Error loading config")?;
    args.apply_to(&mut config);

    let options = config.publish_options(args.dry_run)?;
    let repo = Git2Repository::open(&args.repo)
        .with_context(|| format!("Git repository error at '{}'", args.repo))?;

    let progress = ConsoleProgress::new(options.dry_run);
    let publisher = Publisher::new(&repo, options)
        .with_filter(config.branch_filter())
        .with_progress(&progress);

    if args.list {
        let plans = publisher.plan()?;
        ui::display_plan(&publisher.options().remote_name, &plans);
        return Ok(());
    }

    if publisher.options().dry_run {
        ui::display_status("Dry run: no pushes will be issued");
    }

    let summary = publisher.publish_all()?;
    ui::display_summary(&summary);

    Ok(())
}

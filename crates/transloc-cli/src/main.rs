use std::io::IsTerminal;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{eyre, Result};
use tracing::{debug, error, info, warn};
use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use transloc_services::{fill_tree, update_dictionaries, UpdateOptions};

#[derive(Parser)]
#[command(name = "transloc", version, about = "Translation memory maintenance for extracted game text")]
struct Cli {
    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Reconcile a freshly extracted dictionary tree against the old one
    Update {
        /// Root of the previously translated dictionary
        #[arg(long)]
        old_root: Option<PathBuf>,
        /// Root of the fresh extraction; rewritten in place
        #[arg(long)]
        new_root: Option<PathBuf>,
        /// Version tag recorded on quarantined entries
        #[arg(long)]
        game_version: Option<String>,
        /// Where to write the audit listing of quarantined keys
        #[arg(long)]
        report_dir: Option<PathBuf>,
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },

    /// Fill untranslated entries whose original text is already translated elsewhere
    Fill {
        #[arg(long)]
        root: PathBuf,
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },

    /// Count entries and translations in a dictionary tree
    Stats {
        #[arg(long)]
        root: PathBuf,
    },
}

trait Runnable {
    async fn run(self, use_color: bool) -> Result<()>;
}

impl Runnable for Commands {
    async fn run(self, use_color: bool) -> Result<()> {
        let cmd_name = format!("{:?}", self);
        info!("starting command: {}", cmd_name);

        let result = match self {
            Commands::Update {
                old_root,
                new_root,
                game_version,
                report_dir,
                dry_run,
            } => {
                let cfg = transloc_config::load_config()?;
                let old_root = old_root
                    .or_else(|| cfg.old_root.as_deref().map(PathBuf::from))
                    .ok_or_else(|| eyre!("--old-root is required (flag or transloc.toml)"))?;
                let new_root = new_root
                    .or_else(|| cfg.new_root.as_deref().map(PathBuf::from))
                    .ok_or_else(|| eyre!("--new-root is required (flag or transloc.toml)"))?;
                let version = game_version
                    .or(cfg.game_version)
                    .ok_or_else(|| eyre!("--game-version is required (flag or transloc.toml)"))?;
                let report_dir = report_dir.or_else(|| cfg.report_dir.as_deref().map(PathBuf::from));
                debug!(
                    "update args: old_root={:?} new_root={:?} version={} dry_run={}",
                    old_root, new_root, version, dry_run
                );

                let opts = UpdateOptions {
                    dry_run,
                    report_dir,
                };
                let outcome = update_dictionaries(&old_root, &new_root, &version, &opts).await?;

                for path in &outcome.missing_files {
                    info!("file disappeared from the new extraction: {}", path.display());
                }
                for (path, reason) in &outcome.failed {
                    warn!("skipped {}: {}", path.display(), reason);
                }
                print_reports(&outcome, use_color);
                if dry_run {
                    println!(
                        "DRY-RUN: would carry {} entr{} and archive {}",
                        outcome.carried,
                        if outcome.carried == 1 { "y" } else { "ies" },
                        outcome.archived
                    );
                } else {
                    println!(
                        "✔ carried {} entr{}, archived {}, {} file(s) missing, {} skipped",
                        outcome.carried,
                        if outcome.carried == 1 { "y" } else { "ies" },
                        outcome.archived,
                        outcome.missing_files.len(),
                        outcome.failed.len()
                    );
                }
                Ok(())
            }

            Commands::Fill { root, dry_run } => {
                debug!("fill args: root={:?} dry_run={}", root, dry_run);
                let summary = fill_tree(&root, dry_run)?;
                if dry_run {
                    println!(
                        "DRY-RUN: would fill {} entr{} across {} file(s)",
                        summary.filled,
                        if summary.filled == 1 { "y" } else { "ies" },
                        summary.files.len()
                    );
                } else {
                    println!(
                        "✔ filled {} entr{} across {} file(s)",
                        summary.filled,
                        if summary.filled == 1 { "y" } else { "ies" },
                        summary.files.len()
                    );
                }
                Ok(())
            }

            Commands::Stats { root } => {
                debug!("stats args: root={:?}", root);
                let stats = transloc_services::count_entries(&root);
                println!(
                    "{} file(s), {} entr{}, {} translated",
                    stats.files,
                    stats.entries,
                    if stats.entries == 1 { "y" } else { "ies" },
                    stats.translated
                );
                Ok(())
            }
        };

        match &result {
            Ok(_) => info!("finished command: {}", cmd_name),
            Err(e) => error!("command {} failed: {:?}", cmd_name, e),
        }

        result
    }
}

fn print_reports(outcome: &transloc_services::ReconcileOutcome, use_color: bool) {
    for report in &outcome.reports {
        if use_color {
            use owo_colors::OwoColorize;
            println!("⚠ {}", report.path.display().to_string().yellow());
            for key in &report.leftover_keys {
                println!("    {}", key.cyan());
            }
        } else {
            println!("! {}", report.path.display());
            for key in &report.leftover_keys {
                println!("    {}", key);
            }
        }
    }
}

fn init_tracing() {
    let file_appender = rolling::daily("logs", "transloc.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
    // Keep the writer alive for the whole process.
    std::mem::forget(guard);

    let console_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")));

    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_target(true)
        .with_writer(file_writer)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();

    let cli = Cli::parse();

    let use_color = !cli.no_color
        && std::io::stdout().is_terminal()
        && std::env::var_os("NO_COLOR").is_none();

    cli.cmd.run(use_color).await
}

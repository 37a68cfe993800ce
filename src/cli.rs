//! Command-line interface.
//!
//! Parses arguments with `clap`, builds a [`Manager`] over the given
//! directory and runs one command against it.

use crate::config::Config;
use crate::file_category::Category;
use crate::file_organizer::{CollisionChoice, MoveReport};
use crate::manager::{Context, Manager};
use crate::output::OutputFormatter;
use crate::prompt::FixedAnswers;
use crate::undo::UndoManager;
use anyhow::Context as _;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Catalogue, index and organize a media collection.
#[derive(Debug, Parser)]
#[command(name = "mediatidy", version, about)]
pub struct Cli {
    /// Directory to manage.
    pub dir: PathBuf,

    /// Scan subdirectories too.
    #[arg(short, long)]
    pub recursive: bool,

    /// Configuration file to use instead of the default lookup.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Rebuild every record instead of trusting the cache.
    #[arg(long)]
    pub no_cache: bool,

    /// Do not probe media while scanning.
    #[arg(long)]
    pub no_probe: bool,

    /// Log progress details to stderr.
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Count files per category and sub-type.
    Summary {
        /// List every file below its table.
        #[arg(long)]
        details: bool,
    },
    /// Count files per modification date.
    Dates,
    /// Move files into the per-category layout.
    Organize(MoveArgs),
    /// Move every file into one folder.
    MoveAll {
        /// Destination, relative to the managed directory unless absolute.
        folder: PathBuf,
        #[command(flatten)]
        moves: MoveArgs,
    },
    /// Revert the last organize or move-all run.
    Undo,
    /// Open files of a category in the configured viewer.
    Open {
        /// video, image or audio.
        category: Category,
        /// Only the first N files.
        #[arg(long, value_name = "N")]
        top: Option<usize>,
        /// Shuffle the files handed to the viewer.
        #[arg(long)]
        random: bool,
    },
}

#[derive(Debug, Clone, Args)]
pub struct MoveArgs {
    /// Show what would move without touching anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Do not ask for confirmation.
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// What to do when a destination is taken.
    #[arg(long, value_enum, default_value_t = ConflictPolicy::Ask)]
    pub on_conflict: ConflictPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConflictPolicy {
    Ask,
    Skip,
    Rename,
    Abort,
}

impl ConflictPolicy {
    /// The fixed answer, `None` when the operator is asked.
    pub fn choice(self) -> Option<CollisionChoice> {
        match self {
            ConflictPolicy::Ask => None,
            ConflictPolicy::Skip => Some(CollisionChoice::Skip),
            ConflictPolicy::Rename => Some(CollisionChoice::Rename),
            ConflictPolicy::Abort => Some(CollisionChoice::Abort),
        }
    }
}

/// Runs the parsed command.
///
/// ```no_run
/// use clap::Parser;
/// use mediatidy::cli::{Cli, run_cli};
///
/// let cli = Cli::parse_from(["mediatidy", "/media/inbox", "summary"]);
/// if let Err(e) = run_cli(cli) {
///     eprintln!("Error: {:#}", e);
/// }
/// ```
pub fn run_cli(cli: Cli) -> anyhow::Result<()> {
    if let Command::Undo = cli.command {
        return undo(&cli.dir);
    }

    let mut config = Config::load(cli.config.as_deref()).context("Error loading configuration")?;
    if cli.recursive {
        config.scan.recursive = true;
    }
    if cli.no_cache {
        config.probe.disable_cache();
    }
    if cli.no_probe {
        config.probe.disable_probing();
    }

    let mut context = Context::from_config(&config);
    if let Command::Organize(moves) | Command::MoveAll { moves, .. } = &cli.command
        && let Some(choice) = moves.on_conflict.choice()
    {
        context = context.with_resolver(FixedAnswers::new(choice, true));
    }

    let mut manager = Manager::load(&cli.dir, config, Rc::new(context))
        .with_context(|| format!("Error scanning {}", cli.dir.display()))?;

    match cli.command {
        Command::Summary { details } => {
            let summaries = manager.summary();
            if summaries.is_empty() {
                OutputFormatter::info("No files found.");
            }
            for summary in &summaries {
                OutputFormatter::summary_table(summary);
                if details {
                    OutputFormatter::details(manager.list(summary.category), false);
                }
            }
            save_cache(&manager)
        }
        Command::Dates => {
            OutputFormatter::dates(&manager.date_counts());
            save_cache(&manager)
        }
        Command::Organize(moves) => {
            manager.set_assume_yes(moves.yes);
            announce_dry_run(&moves);
            let report = manager.organize(moves.dry_run)?;
            finish_moves(&manager, &moves, report)
        }
        Command::MoveAll { folder, moves } => {
            manager.set_assume_yes(moves.yes);
            announce_dry_run(&moves);
            let report = manager.move_all_to(&folder, moves.dry_run)?;
            finish_moves(&manager, &moves, report)
        }
        Command::Open {
            category,
            top,
            random,
        } => {
            let opened = manager.open(category, top, random)?;
            if opened == 0 {
                OutputFormatter::info(&format!("No {} files to open.", category));
            } else {
                OutputFormatter::success(&format!("Opened {} {} files.", opened, category));
            }
            save_cache(&manager)
        }
        Command::Undo => Ok(()),
    }
}

fn undo(dir: &Path) -> anyhow::Result<()> {
    let report = UndoManager::undo(dir).with_context(|| format!("Error undoing moves in {}", dir.display()))?;
    OutputFormatter::undo_report(&report);
    Ok(())
}

fn announce_dry_run(moves: &MoveArgs) {
    if moves.dry_run {
        OutputFormatter::dry_run_notice("No files will be moved.");
    }
}

fn finish_moves(manager: &Manager, moves: &MoveArgs, report: Option<MoveReport>) -> anyhow::Result<()> {
    let Some(report) = report else {
        OutputFormatter::info("Cancelled, nothing was moved.");
        return save_cache(manager);
    };

    OutputFormatter::move_report(&report);
    if moves.dry_run {
        return save_cache(manager);
    }
    OutputFormatter::cache_conflicts(&report.cache_conflicts);
    if !report.moved.is_empty() {
        OutputFormatter::info(&format!(
            "History saved. Use 'mediatidy {} undo' to revert.",
            manager.root().display()
        ));
    }
    Ok(())
}

fn save_cache(manager: &Manager) -> anyhow::Result<()> {
    let conflicts = manager.save_cache().context("Error saving the cache")?;
    if !conflicts.is_empty() {
        OutputFormatter::cache_conflicts(&conflicts);
    }
    Ok(())
}

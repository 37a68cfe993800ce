/// Collision-safe relocation of files.
///
/// This module moves batches of records into a destination folder. It splits
/// a batch into no-op, clear and occupied moves, asks a [`ConflictResolver`]
/// what to do about occupied destinations, generates unique names on request,
/// and reports every item's outcome. Completed moves are journalled so the
/// last batch can be undone.
use crate::cache::CacheConflict;
use crate::output::OutputFormatter;
use crate::prompt::ConflictResolver;
use crate::record::FileRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{info, warn};

/// Name of the move journal kept in the managed root.
pub const HISTORY_FILE_NAME: &str = ".mediatidy_history.json";

/// Errors that can occur while moving files.
#[derive(Debug, thiserror::Error)]
pub enum OrganizeError {
    /// Failed to create a destination directory.
    #[error("Failed to create directory {}: {source}", .path.display())]
    DirectoryCreationFailed { path: PathBuf, source: io::Error },
    /// The move did not happen; the file is still at `from`.
    #[error("Failed to move {} to {}: {source}", .from.display(), .to.display())]
    FileMoveFailure {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },
    /// A cross-device move left copies in both places and could not be
    /// rolled back.
    #[error("Move of {} to {} left the file in both places: {reason}", .from.display(), .to.display())]
    PartialMove {
        from: PathBuf,
        to: PathBuf,
        reason: String,
    },
    /// The operator chose to abort on a name collision.
    #[error("Move aborted by the operator; no files were moved in this batch")]
    Aborted,
    /// The base directory path is invalid or doesn't exist.
    #[error("Invalid base path {}: {source}", .path.display())]
    InvalidBasePath { path: PathBuf, source: io::Error },
    /// Failed to write the move journal.
    #[error("Failed to write history file: {0}")]
    HistoryWriteFailed(io::Error),
    /// Failed to read the move journal.
    #[error("Failed to read history file: {0}")]
    HistoryReadFailed(io::Error),
    /// The move journal has an invalid format.
    #[error("Invalid history file format: {0}")]
    InvalidHistoryFormat(String),
}

/// Result type for file organization operations.
pub type OrganizeResult<T> = Result<T, OrganizeError>;

/// One completed (or, in a dry run, planned) move.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub original_path: PathBuf,
    pub new_path: PathBuf,
}

/// Journal of the moves performed by the last mutating batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationLog {
    /// RFC 3339 timestamp of the batch.
    pub timestamp: String,
    pub base_path: PathBuf,
    pub operations: Vec<Operation>,
}

impl OperationLog {
    pub fn new(base_path: PathBuf) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            base_path,
            operations: Vec::new(),
        }
    }

    fn history_file_path(base_path: &Path) -> PathBuf {
        base_path.join(HISTORY_FILE_NAME)
    }

    /// Writes the journal, replacing any previous one.
    pub fn save(&self, base_path: &Path) -> OrganizeResult<()> {
        let json = serde_json::to_string_pretty(self).map_err(|e| {
            OrganizeError::HistoryWriteFailed(io::Error::new(io::ErrorKind::InvalidData, e))
        })?;
        fs::write(Self::history_file_path(base_path), json)
            .map_err(OrganizeError::HistoryWriteFailed)
    }

    /// Loads the journal, `None` if there is none.
    pub fn load(base_path: &Path) -> OrganizeResult<Option<Self>> {
        let history_path = Self::history_file_path(base_path);
        if !history_path.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(&history_path).map_err(OrganizeError::HistoryReadFailed)?;
        serde_json::from_str(&json)
            .map(Some)
            .map_err(|e| OrganizeError::InvalidHistoryFormat(e.to_string()))
    }

    pub fn delete(base_path: &Path) -> OrganizeResult<()> {
        let history_path = Self::history_file_path(base_path);
        if history_path.exists() {
            fs::remove_file(&history_path).map_err(OrganizeError::HistoryWriteFailed)?;
        }
        Ok(())
    }
}

/// What to do with moves whose destination is already taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionChoice {
    /// Leave colliding files where they are.
    Skip,
    /// Move colliding files under a unique suffixed name.
    Rename,
    /// Cancel the whole batch before anything moves.
    Abort,
}

impl FromStr for CollisionChoice {
    type Err = crate::file_category::ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "s" | "skip" => Ok(CollisionChoice::Skip),
            "r" | "rename" => Ok(CollisionChoice::Rename),
            "q" | "a" | "abort" | "quit" => Ok(CollisionChoice::Abort),
            _ => Err(crate::file_category::ParseEnumError {
                kind: "collision choice",
                value: s.to_string(),
            }),
        }
    }
}

/// A planned move whose destination is occupied.
#[derive(Debug, Clone)]
pub struct Collision {
    pub(crate) index: usize,
    pub source: PathBuf,
    pub destination: PathBuf,
    pub source_size: u64,
    /// Size of the file already at the destination, if it is on disk.
    pub existing_size: Option<u64>,
}

/// Outcome of a move batch.
#[derive(Debug, Clone, Default)]
pub struct MoveReport {
    pub dry_run: bool,
    /// Moves performed, or planned when `dry_run` is set.
    pub moved: Vec<Operation>,
    /// Colliding moves left alone: (source, wanted destination).
    pub skipped: Vec<(PathBuf, PathBuf)>,
    /// Moves that failed: (source, reason).
    pub failed: Vec<(PathBuf, String)>,
    /// Records already at their destination.
    pub unchanged: usize,
    /// Cache entries that changed since the last save, filled in when the
    /// cache is written after a real run.
    pub cache_conflicts: Vec<CacheConflict>,
}

impl MoveReport {
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            ..Default::default()
        }
    }

    pub fn merge(&mut self, other: MoveReport) {
        self.moved.extend(other.moved);
        self.skipped.extend(other.skipped);
        self.failed.extend(other.failed);
        self.unchanged += other.unchanged;
        self.cache_conflicts.extend(other.cache_conflicts);
    }

    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Filesystem primitives used by the planner.
pub struct FileOrganizer;

impl FileOrganizer {
    /// Moves a single file.
    ///
    /// Tries a rename first. Across filesystems it copies then removes the
    /// source, rolling the copy back if the source cannot be removed. Only
    /// when that rollback also fails is `PartialMove` returned.
    pub fn relocate(from: &Path, to: &Path) -> OrganizeResult<()> {
        match fs::rename(from, to) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::CrossesDevices => Self::copy_then_remove(from, to),
            Err(e) => Err(OrganizeError::FileMoveFailure {
                from: from.to_path_buf(),
                to: to.to_path_buf(),
                source: e,
            }),
        }
    }

    fn copy_then_remove(from: &Path, to: &Path) -> OrganizeResult<()> {
        if let Err(e) = fs::copy(from, to) {
            let _ = fs::remove_file(to);
            return Err(OrganizeError::FileMoveFailure {
                from: from.to_path_buf(),
                to: to.to_path_buf(),
                source: e,
            });
        }

        if let Err(e) = fs::remove_file(from) {
            return match fs::remove_file(to) {
                Ok(()) => Err(OrganizeError::FileMoveFailure {
                    from: from.to_path_buf(),
                    to: to.to_path_buf(),
                    source: e,
                }),
                Err(rollback) => Err(OrganizeError::PartialMove {
                    from: from.to_path_buf(),
                    to: to.to_path_buf(),
                    reason: format!("remove source: {}; remove copy: {}", e, rollback),
                }),
            };
        }
        Ok(())
    }

    /// Returns `destination` if it is free, else the first free
    /// `<stem>-<n><ext>` next to it, counting n from 0.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use mediatidy::file_organizer::FileOrganizer;
    /// use std::path::Path;
    ///
    /// // With photo.jpg and photo-0.jpg present:
    /// let dst = FileOrganizer::get_unique_destination(Path::new("album/photo.jpg"));
    /// assert_eq!(dst, Path::new("album/photo-1.jpg"));
    /// ```
    pub fn get_unique_destination(destination: &Path) -> PathBuf {
        Self::unique_destination_avoiding(destination, &HashSet::new())
    }

    /// Like [`FileOrganizer::get_unique_destination`], also treating
    /// `claimed` paths as taken.
    pub fn unique_destination_avoiding(destination: &Path, claimed: &HashSet<PathBuf>) -> PathBuf {
        let taken = |p: &Path| p.exists() || claimed.contains(p);
        if !taken(destination) {
            return destination.to_path_buf();
        }
        Self::next_free_suffix(destination, taken)
    }

    fn next_free_suffix(destination: &Path, taken: impl Fn(&Path) -> bool) -> PathBuf {
        let folder = destination.parent().unwrap_or_else(|| Path::new(""));
        let stem = destination
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let ext = destination
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();

        let mut suffix: u64 = 0;
        loop {
            let candidate = folder.join(format!("{}-{}{}", stem, suffix, ext));
            if !taken(&candidate) {
                return candidate;
            }
            suffix += 1;
        }
    }
}

/// Moves a selection of records into one folder.
pub struct MovePlanner<'a> {
    resolver: &'a dyn ConflictResolver,
    dry_run: bool,
}

impl<'a> MovePlanner<'a> {
    pub fn new(resolver: &'a dyn ConflictResolver, dry_run: bool) -> Self {
        Self { resolver, dry_run }
    }

    /// Moves `records[i]` for every `i` in `selection` into `folder`.
    ///
    /// `destination` computes each record's target path inside the folder.
    /// Records already at their target are left alone. Occupied targets
    /// (on disk, or claimed earlier in this batch) go to the resolver; an
    /// `Abort` returns before the filesystem is touched. The folder is
    /// created only when something is cleared to move.
    ///
    /// Individual failures are collected in the report and do not undo
    /// earlier moves. A `PartialMove` stops the batch.
    pub fn move_to<F>(
        &self,
        records: &mut [FileRecord],
        selection: &[usize],
        folder: &Path,
        destination: F,
    ) -> OrganizeResult<MoveReport>
    where
        F: Fn(&FileRecord, &Path) -> PathBuf,
    {
        let mut report = MoveReport::new(self.dry_run);
        let mut claimed: HashSet<PathBuf> = HashSet::new();
        let mut clear: Vec<(usize, PathBuf)> = Vec::new();
        let mut occupied: Vec<Collision> = Vec::new();

        for &index in selection {
            let record = &records[index];
            let dst = destination(record, folder);

            if record.path() == dst {
                report.unchanged += 1;
                continue;
            }

            if dst.exists() || claimed.contains(&dst) {
                occupied.push(Collision {
                    index,
                    source: record.path().to_path_buf(),
                    existing_size: fs::metadata(&dst).ok().map(|m| m.len()),
                    destination: dst,
                    source_size: record.size(),
                });
            } else {
                claimed.insert(dst.clone());
                clear.push((index, dst));
            }
        }

        if !occupied.is_empty() {
            match self.resolver.resolve(&occupied) {
                CollisionChoice::Skip => {
                    report
                        .skipped
                        .extend(occupied.into_iter().map(|c| (c.source, c.destination)));
                }
                CollisionChoice::Rename => {
                    for collision in occupied {
                        let dst =
                            FileOrganizer::unique_destination_avoiding(&collision.destination, &claimed);
                        info!(from = %collision.source.display(), to = %dst.display(), "renaming on collision");
                        claimed.insert(dst.clone());
                        clear.push((collision.index, dst));
                    }
                }
                CollisionChoice::Abort => return Err(OrganizeError::Aborted),
            }
        }

        if clear.is_empty() {
            return Ok(report);
        }

        if !self.dry_run && !folder.exists() {
            info!(folder = %folder.display(), "creating destination folder");
            fs::create_dir_all(folder).map_err(|e| OrganizeError::DirectoryCreationFailed {
                path: folder.to_path_buf(),
                source: e,
            })?;
        }

        let progress = OutputFormatter::create_progress_bar(clear.len() as u64);
        for (index, dst) in clear {
            let record = &mut records[index];
            let from = record.path().to_path_buf();
            match record.move_to(&dst, self.dry_run) {
                Ok(()) => report.moved.push(Operation {
                    original_path: from,
                    new_path: dst,
                }),
                Err(e @ OrganizeError::PartialMove { .. }) => {
                    progress.abandon();
                    return Err(e);
                }
                Err(e) => {
                    warn!(error = %e, "move failed");
                    report.failed.push((from, e.to_string()));
                }
            }
            progress.inc(1);
        }
        progress.finish_and_clear();

        Ok(report)
    }
}

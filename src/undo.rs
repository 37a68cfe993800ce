//! Reverting the last move batch.
//!
//! Every mutating organize or move-all run leaves a journal in the managed
//! root. Undo replays it backwards, putting each file back where it came
//! from.
use crate::file_organizer::{FileOrganizer, Operation, OperationLog, OrganizeError, OrganizeResult};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Outcome of an undo.
#[derive(Debug, Default)]
pub struct UndoReport {
    pub restored_files: usize,
    pub failed_restores: Vec<(PathBuf, String)>,
    /// Journalled files no longer at their recorded location.
    pub skipped_files: Vec<(PathBuf, String)>,
}

impl UndoReport {
    pub fn is_complete_success(&self) -> bool {
        self.failed_restores.is_empty() && self.skipped_files.is_empty()
    }
}

/// Reverts journalled moves.
pub struct UndoManager;

impl UndoManager {
    /// Undoes the most recent batch recorded under `base_path`.
    ///
    /// Files missing from their recorded destination are skipped. A file now
    /// occupying an original location is renamed aside with a timestamp
    /// suffix first. The journal is removed only when everything was restored.
    ///
    /// # Errors
    ///
    /// Fails when the base path does not exist or there is no readable
    /// journal.
    ///
    /// ```no_run
    /// use mediatidy::undo::UndoManager;
    /// use std::path::Path;
    ///
    /// match UndoManager::undo(Path::new("/media/inbox")) {
    ///     Ok(report) => println!("Restored {} files", report.restored_files),
    ///     Err(e) => eprintln!("Undo failed: {}", e),
    /// }
    /// ```
    pub fn undo(base_path: &Path) -> OrganizeResult<UndoReport> {
        if !base_path.is_dir() {
            return Err(OrganizeError::InvalidBasePath {
                path: base_path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
            });
        }

        let log = OperationLog::load(base_path)?.ok_or_else(|| {
            OrganizeError::InvalidHistoryFormat("no previous move batch to undo".to_string())
        })?;

        let mut report = UndoReport::default();
        for operation in log.operations.iter().rev() {
            match Self::restore_file(operation) {
                Ok(()) => report.restored_files += 1,
                Err(Restore::Missing(path, reason)) => report.skipped_files.push((path, reason)),
                Err(Restore::Failed(path, reason)) => report.failed_restores.push((path, reason)),
            }
        }
        info!(restored = report.restored_files, "undo finished");

        if report.is_complete_success()
            && let Err(e) = OperationLog::delete(base_path)
        {
            warn!(error = %e, "could not delete the history file");
        }

        Ok(report)
    }

    fn restore_file(operation: &Operation) -> Result<(), Restore> {
        if !operation.new_path.exists() {
            return Err(Restore::Missing(
                operation.new_path.clone(),
                "File not found at expected location".to_string(),
            ));
        }

        if operation.original_path.exists() {
            let backup_path = Self::generate_backup_path(&operation.original_path);
            fs::rename(&operation.original_path, &backup_path).map_err(|e| {
                Restore::Failed(
                    operation.original_path.clone(),
                    format!("Could not back up conflicting file: {}", e),
                )
            })?;
            warn!(path = %operation.original_path.display(), backup = %backup_path.display(), "original location occupied, backed up");
        }

        if let Some(parent) = operation.original_path.parent()
            && !parent.exists()
        {
            fs::create_dir_all(parent).map_err(|e| {
                Restore::Failed(parent.to_path_buf(), format!("Could not recreate folder: {}", e))
            })?;
        }

        FileOrganizer::relocate(&operation.new_path, &operation.original_path)
            .map_err(|e| Restore::Failed(operation.new_path.clone(), e.to_string()))
    }

    /// `clip.mp4` becomes `clip.mp4.bak.20251109-143052`.
    fn generate_backup_path(original_path: &Path) -> PathBuf {
        let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
        let filename = original_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "file".to_string());

        let backup_name = format!("{}.bak.{}", filename, timestamp);
        match original_path.parent() {
            Some(parent) => parent.join(backup_name),
            None => PathBuf::from(backup_name),
        }
    }
}

enum Restore {
    Missing(PathBuf, String),
    Failed(PathBuf, String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_organizer::{CollisionChoice, MovePlanner};
    use crate::prompt::FixedAnswers;
    use crate::record::FileRecord;
    use tempfile::TempDir;

    fn move_and_journal(base_path: &Path, names: &[&str], folder: &str) -> Vec<PathBuf> {
        let mut records: Vec<FileRecord> = names
            .iter()
            .map(|name| {
                let path = base_path.join(name);
                fs::write(&path, format!("{} content", name)).expect("Failed to write test file");
                FileRecord::create(&path, None).expect("Failed to create record")
            })
            .collect();
        let selection: Vec<usize> = (0..records.len()).collect();
        let resolver = FixedAnswers::new(CollisionChoice::Abort, true);
        let report = MovePlanner::new(&resolver, false)
            .move_to(&mut records, &selection, &base_path.join(folder), |r, f| f.join(r.name()))
            .expect("Failed to move files");

        let mut log = OperationLog::new(base_path.to_path_buf());
        log.operations = report.moved.clone();
        log.save(base_path).expect("Failed to save history");
        report.moved.into_iter().map(|op| op.original_path).collect()
    }

    #[test]
    fn test_undo_no_history() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        assert!(UndoManager::undo(temp_dir.path()).is_err());
    }

    #[test]
    fn test_undo_restores_every_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();
        let originals = move_and_journal(base_path, &["clip.mp4", "song.mp3"], "@media");
        assert!(originals.iter().all(|p| !p.exists()));

        let report = UndoManager::undo(base_path).expect("Undo failed");

        assert_eq!(report.restored_files, 2);
        assert!(report.is_complete_success());
        assert!(originals.iter().all(|p| p.exists()));
        assert!(OperationLog::load(base_path).unwrap().is_none());
    }

    #[test]
    fn test_undo_backs_up_occupied_original() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();
        let originals = move_and_journal(base_path, &["notes.txt"], "@document");
        fs::write(&originals[0], "new content").expect("Failed to create conflict");

        let report = UndoManager::undo(base_path).expect("Undo failed");

        assert_eq!(report.restored_files, 1);
        assert_eq!(
            fs::read_to_string(&originals[0]).unwrap(),
            "notes.txt content"
        );
        let backups = fs::read_dir(base_path)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains(".bak."))
            .count();
        assert_eq!(backups, 1);
    }

    #[test]
    fn test_undo_skips_missing_file_and_keeps_journal() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();
        let mut log = OperationLog::new(base_path.to_path_buf());
        log.operations.push(Operation {
            original_path: base_path.join("gone.mp4"),
            new_path: base_path.join("@video").join("gone.mp4"),
        });
        log.save(base_path).expect("Failed to save history");

        let report = UndoManager::undo(base_path).expect("Undo failed");

        assert_eq!(report.restored_files, 0);
        assert_eq!(report.skipped_files.len(), 1);
        assert!(OperationLog::load(base_path).unwrap().is_some());
    }

    #[test]
    fn test_undo_invalid_base_path() {
        assert!(UndoManager::undo(Path::new("/non/existent/path")).is_err());
    }
}

//! mediatidy - catalogue, index and organize a media collection
//!
//! This library scans a directory, sorts files into typed lists by category,
//! probes audio, video and images for their metadata, indexes them by date,
//! orientation, length and image type, caches what it learned between runs,
//! and moves files into a per-category layout that can be undone.

pub mod cache;
pub mod cli;
pub mod config;
pub mod file_category;
pub mod file_list;
pub mod file_organizer;
pub mod launcher;
pub mod logging;
pub mod manager;
pub mod media;
pub mod output;
pub mod probe;
pub mod prompt;
pub mod record;
pub mod sort;
pub mod undo;

pub use cache::{CacheConflict, CacheError, CacheStore};
pub use config::{Config, ConfigError, ScanFilters};
pub use file_category::{Category, FileMapper};
pub use file_list::{FileList, ListError, Summary};
pub use file_organizer::{CollisionChoice, FileOrganizer, MoveReport, OrganizeError};
pub use manager::{Context, Manager, ManagerError};
pub use media::{ImageType, LengthBucket, Orientation};
pub use record::{FileRecord, MediaInfo, RecordError};
pub use sort::SortKey;
pub use undo::{UndoManager, UndoReport};

pub use cli::{Cli, run_cli};

//! File categorization by extension.
//!
//! This module maps file extensions to the coarse media categories the rest of
//! the crate indexes and organizes by. The mapping is a pure function of the
//! file name: no content sniffing, no filesystem access.
//!
//! # Examples
//!
//! ```
//! use mediatidy::file_category::Category;
//!
//! assert_eq!(Category::infer("clip.MP4"), Category::Video);
//! assert_eq!(Category::infer("scan.png"), Category::Image);
//! assert_eq!(Category::infer("backup.z07"), Category::Archive);
//! assert_eq!(Category::infer("notes"), Category::Unset);
//! ```
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::OnceLock;

/// Represents a broad file category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    /// Video files (MP4, MKV, MOV, etc.)
    Video,
    /// Image files (JPG, PNG, GIF, etc.)
    Image,
    /// Audio files (MP3, FLAC, etc.)
    Audio,
    /// Document files (PDF, TXT, DOCX, etc.)
    Document,
    /// Archive files, including numbered multi-volume parts (.z01 to .z99)
    Archive,
    /// Anything the extension table does not know about
    Unset,
}

impl Category {
    /// Every category, in the order summaries and organize runs visit them.
    pub const ALL: [Category; 6] = [
        Category::Video,
        Category::Image,
        Category::Audio,
        Category::Document,
        Category::Archive,
        Category::Unset,
    ];

    /// Infers the category of a file from its name.
    ///
    /// Total and deterministic: unknown or missing extensions give `Unset`.
    pub fn infer(file_name: &str) -> Category {
        FileMapper::standard().categorize(Path::new(file_name))
    }

    /// Returns the default folder this category is organized into,
    /// relative to the managed root.
    ///
    /// # Examples
    ///
    /// ```
    /// use mediatidy::file_category::Category;
    ///
    /// assert_eq!(Category::Video.dir_name(), "@video");
    /// assert_eq!(Category::Unset.dir_name(), ".");
    /// ```
    pub fn dir_name(&self) -> &'static str {
        match self {
            Category::Video => "@video",
            Category::Image => "@image",
            Category::Audio => "@audio",
            Category::Document => "@document",
            Category::Archive => "@archive",
            Category::Unset => ".",
        }
    }

    /// Returns the variant name, as stored in the cache.
    pub fn name(&self) -> &'static str {
        match self {
            Category::Video => "Video",
            Category::Image => "Image",
            Category::Audio => "Audio",
            Category::Document => "Document",
            Category::Archive => "Archive",
            Category::Unset => "Unset",
        }
    }

    /// Whether records of this category carry audio/video stream metadata.
    pub fn is_media(&self) -> bool {
        matches!(self, Category::Video | Category::Audio)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a string names no known enum value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct ParseEnumError {
    /// What was being parsed ("category", "sort key", ...).
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

impl FromStr for Category {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "video" | "videos" => Ok(Category::Video),
            "image" | "images" => Ok(Category::Image),
            "audio" | "audios" => Ok(Category::Audio),
            "document" | "documents" | "doc" | "docs" => Ok(Category::Document),
            "archive" | "archives" | "zip" => Ok(Category::Archive),
            "unset" | "other" => Ok(Category::Unset),
            _ => Err(ParseEnumError {
                kind: "category",
                value: s.to_string(),
            }),
        }
    }
}

/// Maps file extensions to categories.
///
/// Lookups are case-insensitive. The standard table can be extended with
/// custom mappings.
#[derive(Debug, Clone)]
pub struct FileMapper {
    extension_map: HashMap<String, Category>,
}

impl FileMapper {
    /// Creates a new `FileMapper` with all standard mappings.
    pub fn new() -> Self {
        let mut mapper = Self {
            extension_map: HashMap::new(),
        };
        mapper.populate_standard_mappings();
        mapper
    }

    /// Shared standard table used by [`Category::infer`].
    fn standard() -> &'static FileMapper {
        static STANDARD: OnceLock<FileMapper> = OnceLock::new();
        STANDARD.get_or_init(FileMapper::new)
    }

    fn populate_standard_mappings(&mut self) {
        for ext in ["m4v", "mp4", "mov", "mkv", "wmv", "asf", "rm", "avi", "flv", "webm"] {
            self.add_extension_mapping(ext, Category::Video);
        }

        for ext in ["jpg", "jpeg", "png", "gif", "webp", "bmp"] {
            self.add_extension_mapping(ext, Category::Image);
        }

        for ext in ["mp3", "flac", "wav", "m4a", "ogg", "aac"] {
            self.add_extension_mapping(ext, Category::Audio);
        }

        for ext in ["txt", "pdf", "docx", "doc", "md"] {
            self.add_extension_mapping(ext, Category::Document);
        }

        for ext in ["rar", "zip", "7z", "tar", "gz"] {
            self.add_extension_mapping(ext, Category::Archive);
        }
        // Split zip volumes: .z01 .. .z99
        for volume in 1..100 {
            self.add_extension_mapping(&format!("z{:02}", volume), Category::Archive);
        }
    }

    /// Adds a file extension to category mapping.
    pub fn add_extension_mapping(&mut self, ext: &str, category: Category) {
        self.extension_map
            .insert(ext.trim_start_matches('.').to_lowercase(), category);
    }

    /// Maps a file extension (without the dot) to a category.
    ///
    /// # Examples
    ///
    /// ```
    /// use mediatidy::file_category::{Category, FileMapper};
    ///
    /// let mapper = FileMapper::default();
    /// assert_eq!(mapper.extension_to_category("PDF"), Some(Category::Document));
    /// assert_eq!(mapper.extension_to_category("xyz"), None);
    /// ```
    pub fn extension_to_category(&self, ext: &str) -> Option<Category> {
        self.extension_map.get(&ext.to_lowercase()).copied()
    }

    /// Determines the category for a path from its extension, `Unset` if unknown.
    pub fn categorize(&self, path: &Path) -> Category {
        path.extension()
            .and_then(|ext| self.extension_to_category(&ext.to_string_lossy()))
            .unwrap_or(Category::Unset)
    }
}

impl Default for FileMapper {
    fn default() -> Self {
        Self::new()
    }
}

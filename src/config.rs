//! Configuration.
//!
//! Settings come from a TOML file. Every section and key is optional. Missing
//! ones fall back to the built-in defaults: nothing excluded, hidden files
//! skipped, probing and caching on, `@<category>` targets with unknown files
//! left at the root. An example file:
//!
//! ```toml
//! [scan]
//! recursive = false
//! enable_hidden_files = false
//!
//! [scan.exclude]
//! filenames = [".DS_Store", "Thumbs.db"]
//! patterns = ["*.part", "**/tmp/**"]
//! extensions = ["bak"]
//! regex = []
//!
//! [scan.include]
//! patterns = []
//!
//! [probe]
//! ffprobe = "ffprobe"
//! classifier = []
//!
//! [probe.video]
//! enabled = true
//! use_cache = true
//!
//! [organize]
//! video = "@video"
//! broken_video = "@broken-videos"
//!
//! [viewer]
//! image = ["feh", "-g", "1680x1050", "--scale-down", "--auto-zoom"]
//!
//! [cache]
//! path = "/tmp/mediatidy-cache.json"
//! ```

use crate::cache::CacheStore;
use crate::file_category::Category;
use glob::Pattern;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Errors that can occur during configuration loading and filter compilation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),
    #[error("Invalid configuration in {}: {reason}", .path.display())]
    ConfigInvalid { path: PathBuf, reason: String },
    #[error("Invalid glob pattern '{0}'")]
    InvalidGlobPattern(String),
    #[error("Invalid regex pattern '{pattern}': {reason}")]
    InvalidRegexPattern { pattern: String, reason: String },
    #[error("IO error reading configuration {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Whole configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scan: ScanConfig,
    pub probe: ProbeConfig,
    pub organize: OrganizeConfig,
    pub viewer: ViewerConfig,
    pub cache: CacheConfig,
}

/// Which files a scan picks up.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Descend into subdirectories.
    pub recursive: bool,
    /// Whether to include hidden files (starting with ".").
    pub enable_hidden_files: bool,
    pub exclude: ExcludeRules,
    /// Whitelist, overrides exclude rules.
    pub include: IncludeRules,
}

/// Rules for excluding files from a scan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExcludeRules {
    /// Exact filenames, e.g. "Thumbs.db".
    pub filenames: Vec<String>,
    /// Glob patterns matched against the path relative to the root.
    pub patterns: Vec<String>,
    /// Extensions without the dot, case-insensitive.
    pub extensions: Vec<String>,
    /// Regexes matched against the file name.
    pub regex: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IncludeRules {
    pub patterns: Vec<String>,
}

/// Probing switches for one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeRule {
    /// Probe new records while scanning.
    pub enabled: bool,
    /// Reuse fresh cached records instead of rebuilding them.
    pub use_cache: bool,
}

impl Default for ProbeRule {
    fn default() -> Self {
        Self {
            enabled: true,
            use_cache: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Program used to read media streams.
    pub ffprobe: String,
    /// Image classifier command; the image path is appended. Empty disables
    /// classification.
    pub classifier: Vec<String>,
    pub video: ProbeRule,
    pub audio: ProbeRule,
    pub image: ProbeRule,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            ffprobe: "ffprobe".to_string(),
            classifier: Vec::new(),
            video: ProbeRule::default(),
            audio: ProbeRule::default(),
            image: ProbeRule::default(),
        }
    }
}

impl ProbeConfig {
    /// Switches for a category. Categories without metadata are never
    /// probed but always trust the cache.
    pub fn rule(&self, category: Category) -> ProbeRule {
        match category {
            Category::Video => self.video,
            Category::Audio => self.audio,
            Category::Image => self.image,
            Category::Document | Category::Archive | Category::Unset => ProbeRule {
                enabled: false,
                use_cache: true,
            },
        }
    }

    /// Turns probing off for every category.
    pub fn disable_probing(&mut self) {
        for rule in [&mut self.video, &mut self.audio, &mut self.image] {
            rule.enabled = false;
        }
    }

    /// Stops trusting the cache for every category.
    pub fn disable_cache(&mut self) {
        for rule in [&mut self.video, &mut self.audio, &mut self.image] {
            rule.use_cache = false;
        }
    }
}

/// Target folders, relative to the managed root unless absolute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganizeConfig {
    pub video: PathBuf,
    pub image: PathBuf,
    pub audio: PathBuf,
    pub document: PathBuf,
    pub archive: PathBuf,
    pub unset: PathBuf,
    pub broken_video: PathBuf,
    pub broken_audio: PathBuf,
}

impl Default for OrganizeConfig {
    fn default() -> Self {
        Self {
            video: Category::Video.dir_name().into(),
            image: Category::Image.dir_name().into(),
            audio: Category::Audio.dir_name().into(),
            document: Category::Document.dir_name().into(),
            archive: Category::Archive.dir_name().into(),
            unset: Category::Unset.dir_name().into(),
            broken_video: "@broken-videos".into(),
            broken_audio: "@broken-audios".into(),
        }
    }
}

impl OrganizeConfig {
    pub fn target(&self, category: Category) -> &Path {
        match category {
            Category::Video => self.video.as_path(),
            Category::Image => self.image.as_path(),
            Category::Audio => self.audio.as_path(),
            Category::Document => self.document.as_path(),
            Category::Archive => self.archive.as_path(),
            Category::Unset => self.unset.as_path(),
        }
    }

    /// Where broken media of this category is moved.
    pub fn quarantine(&self, category: Category) -> Option<&Path> {
        match category {
            Category::Video => Some(self.broken_video.as_path()),
            Category::Audio => Some(self.broken_audio.as_path()),
            _ => None,
        }
    }
}

/// Viewer commands; file paths are appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub video: Vec<String>,
    pub audio: Vec<String>,
    pub image: Vec<String>,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        let vlc = vec!["vlc".to_string(), "--".to_string()];
        Self {
            video: vlc.clone(),
            audio: vlc,
            image: ["feh", "-g", "1680x1050", "--scale-down", "--auto-zoom"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl ViewerConfig {
    /// Command for a category; empty when it has no viewer.
    pub fn command(&self, category: Category) -> &[String] {
        match category {
            Category::Video => self.video.as_slice(),
            Category::Audio => self.audio.as_slice(),
            Category::Image => self.image.as_slice(),
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Overrides the default cache location.
    pub path: Option<PathBuf>,
}

impl CacheConfig {
    pub fn resolved_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(CacheStore::default_path)
    }
}

impl Config {
    /// Load configuration from a file, with fallback to defaults.
    ///
    /// Attempts to load configuration in the following order:
    /// 1. If `config_path` is provided, load from that file
    /// 2. Look for `.mediatidyrc.toml` in the current directory
    /// 3. Look for `~/.config/mediatidy/config.toml`
    /// 4. Fall back to default configuration
    ///
    /// # Errors
    ///
    /// Returns an error if a configuration file is found (or named) but
    /// cannot be read or parsed.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let local_config = PathBuf::from(".mediatidyrc.toml");
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Ok(home) = std::env::var("HOME") {
            let home_config = PathBuf::from(home)
                .join(".config")
                .join("mediatidy")
                .join("config.toml");
            if home_config.exists() {
                return Self::load_from_file(&home_config);
            }
        }

        Ok(Self::default())
    }

    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Compiles the scan rules for matching.
    pub fn scan_filters(&self) -> Result<ScanFilters, ConfigError> {
        ScanFilters::new(&self.scan)
    }
}

/// Scan rules with patterns compiled once.
#[derive(Debug)]
pub struct ScanFilters {
    enable_hidden_files: bool,
    exclude_filenames: HashSet<String>,
    exclude_extensions: HashSet<String>,
    exclude_patterns: Vec<Pattern>,
    exclude_regexes: Vec<Regex>,
    include_patterns: Vec<Pattern>,
}

fn compile_globs(patterns: &[String]) -> Result<Vec<Pattern>, ConfigError> {
    patterns
        .iter()
        .map(|p| Pattern::new(p).map_err(|_| ConfigError::InvalidGlobPattern(p.clone())))
        .collect()
}

impl ScanFilters {
    pub fn new(scan: &ScanConfig) -> Result<Self, ConfigError> {
        let exclude_regexes = scan
            .exclude
            .regex
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| ConfigError::InvalidRegexPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            enable_hidden_files: scan.enable_hidden_files,
            exclude_filenames: scan.exclude.filenames.iter().cloned().collect(),
            exclude_extensions: scan
                .exclude
                .extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_lowercase())
                .collect(),
            exclude_patterns: compile_globs(&scan.exclude.patterns)?,
            exclude_regexes,
            include_patterns: compile_globs(&scan.include.patterns)?,
        })
    }

    /// Whether a file (path relative to the root) is scanned.
    ///
    /// Include patterns win; then hidden files, exact names, extensions,
    /// globs and regexes exclude, in that order.
    pub fn should_include(&self, file_path: &Path) -> bool {
        let file_name = file_path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();

        if self.include_patterns.iter().any(|p| p.matches_path(file_path)) {
            return true;
        }

        if !self.enable_hidden_files && file_name.starts_with('.') {
            return false;
        }

        if self.exclude_filenames.contains(file_name.as_ref()) {
            return false;
        }

        if let Some(ext) = file_path.extension()
            && self
                .exclude_extensions
                .contains(&ext.to_string_lossy().to_lowercase())
        {
            return false;
        }

        if self.exclude_patterns.iter().any(|p| p.matches_path(file_path)) {
            return false;
        }

        !self.exclude_regexes.iter().any(|r| r.is_match(&file_name))
    }

    /// Whether a scan descends into a directory with this name.
    ///
    /// Names starting with `#` or `.` are pruned, except single-character
    /// ones.
    pub fn should_descend(dir_name: &str) -> bool {
        dir_name.chars().count() <= 1 || !(dir_name.starts_with('#') || dir_name.starts_with('.'))
    }
}

//! File records.
//!
//! A [`FileRecord`] describes one file on disk: its path, size, modification
//! time and category, plus category-specific metadata filled in by probing.
//! The metadata lives in a tagged [`MediaInfo`] variant so that every record
//! shares one shape regardless of category.

use crate::file_category::Category;
use crate::file_organizer::{FileOrganizer, OrganizeResult};
use crate::media::{ImageType, LengthBucket, Orientation};
use crate::output::{self, OutputFormatter};
use crate::probe::{Probers, StreamKind};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Errors raised while building a record.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    /// The path does not name an existing regular file.
    #[error("Given path {} doesn't exist or is not a file", .0.display())]
    NotFound(PathBuf),
    /// The file exists but its metadata could not be read.
    #[error("Failed to read metadata of {}: {source}", .path.display())]
    Stat {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Metadata of an audio file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioInfo {
    pub duration: Option<f64>,
    pub length: LengthBucket,
    pub broken: bool,
}

/// Metadata of a video file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    pub duration: Option<f64>,
    pub length: LengthBucket,
    pub broken: bool,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub orientation: Orientation,
}

/// Metadata of an image file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageInfo {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub orientation: Orientation,
    pub image_type: ImageType,
    /// Raw classifier output, in percent.
    pub probability: Option<f64>,
}

/// Category-specific payload of a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MediaInfo {
    /// Documents, archives and unknown files carry nothing extra.
    Plain,
    Audio(AudioInfo),
    Video(VideoInfo),
    Image(ImageInfo),
}

impl MediaInfo {
    /// Empty payload for a category.
    pub fn for_category(category: Category) -> Self {
        match category {
            Category::Audio => MediaInfo::Audio(AudioInfo::default()),
            Category::Video => MediaInfo::Video(VideoInfo::default()),
            Category::Image => MediaInfo::Image(ImageInfo::default()),
            Category::Document | Category::Archive | Category::Unset => MediaInfo::Plain,
        }
    }

    /// Whether this payload is the kind a record of `category` carries.
    pub fn fits(&self, category: Category) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(&MediaInfo::for_category(category))
    }
}

/// One file on disk.
///
/// Equality follows "same file, possibly relocated": name, full modification
/// time and size must match, the path may differ.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    path: PathBuf,
    name: String,
    size: u64,
    mtime: NaiveDateTime,
    category: Category,
    probed: bool,
    media: MediaInfo,
}

impl PartialEq for FileRecord {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.mtime == other.mtime && self.size == other.size
    }
}

/// Reads size and local modification time of a regular file.
pub(crate) fn stat_file(path: &Path) -> Result<(u64, NaiveDateTime), RecordError> {
    let metadata = match fs::metadata(path) {
        Ok(m) if m.is_file() => m,
        Ok(_) => return Err(RecordError::NotFound(path.to_path_buf())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(RecordError::NotFound(path.to_path_buf()));
        }
        Err(e) => {
            return Err(RecordError::Stat {
                path: path.to_path_buf(),
                source: e,
            });
        }
    };

    let modified = metadata.modified().map_err(|e| RecordError::Stat {
        path: path.to_path_buf(),
        source: e,
    })?;

    Ok((
        metadata.len(),
        DateTime::<Local>::from(modified).naive_local(),
    ))
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

impl FileRecord {
    /// Builds a record for an existing regular file.
    ///
    /// Size, modification time and category are captured immediately. When
    /// `probers` is given the record is probed before returning.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::NotFound` if the path is not an existing file.
    pub fn create(path: impl AsRef<Path>, probers: Option<Probers<'_>>) -> Result<Self, RecordError> {
        let path = path.as_ref();
        let (size, mtime) = stat_file(path)?;
        let name = file_name_of(path);
        let category = Category::infer(&name);

        let mut record = Self {
            path: path.to_path_buf(),
            name,
            size,
            mtime,
            category,
            probed: false,
            media: MediaInfo::for_category(category),
        };

        if let Some(probers) = probers {
            record.probe(probers, false);
        }
        Ok(record)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn mtime(&self) -> NaiveDateTime {
        self.mtime
    }

    /// Local calendar date of the last modification.
    pub fn mdate(&self) -> NaiveDate {
        self.mtime.date()
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn probed(&self) -> bool {
        self.probed
    }

    pub fn media(&self) -> &MediaInfo {
        &self.media
    }

    pub fn duration(&self) -> Option<f64> {
        match &self.media {
            MediaInfo::Audio(a) => a.duration,
            MediaInfo::Video(v) => v.duration,
            _ => None,
        }
    }

    pub fn width(&self) -> Option<u32> {
        match &self.media {
            MediaInfo::Video(v) => v.width,
            MediaInfo::Image(i) => i.width,
            _ => None,
        }
    }

    pub fn height(&self) -> Option<u32> {
        match &self.media {
            MediaInfo::Video(v) => v.height,
            MediaInfo::Image(i) => i.height,
            _ => None,
        }
    }

    /// Orientation, `None` for categories without dimensions.
    pub fn orientation(&self) -> Option<Orientation> {
        match &self.media {
            MediaInfo::Video(v) => Some(v.orientation),
            MediaInfo::Image(i) => Some(i.orientation),
            _ => None,
        }
    }

    /// Length bucket, `None` for categories without a duration.
    pub fn length(&self) -> Option<LengthBucket> {
        match &self.media {
            MediaInfo::Audio(a) => Some(a.length),
            MediaInfo::Video(v) => Some(v.length),
            _ => None,
        }
    }

    /// Image type, `None` for non-images.
    pub fn image_type(&self) -> Option<ImageType> {
        match &self.media {
            MediaInfo::Image(i) => Some(i.image_type),
            _ => None,
        }
    }

    /// True when probing failed or found no usable stream.
    pub fn broken(&self) -> bool {
        match &self.media {
            MediaInfo::Audio(a) => a.broken,
            MediaInfo::Video(v) => v.broken,
            _ => false,
        }
    }

    pub fn size_human(&self) -> String {
        output::human_size(self.size)
    }

    pub fn duration_human(&self) -> String {
        self.duration().map(output::human_duration).unwrap_or_default()
    }

    /// Whether this record still describes a file with the given stat facts.
    pub fn is_fresh(&self, size: u64, mtime: NaiveDateTime) -> bool {
        self.size == size && self.mtime == mtime
    }

    /// Populates category-specific metadata.
    ///
    /// No-op on an already probed record unless `force` is set. Probe
    /// failures are not errors: media records are flagged broken, images stay
    /// unclassified.
    pub fn probe(&mut self, probers: Probers<'_>, force: bool) {
        if self.probed && !force {
            return;
        }
        debug!(path = %self.path.display(), "probing");

        self.media = MediaInfo::for_category(self.category);
        match self.category {
            Category::Audio => self.probe_audio(probers),
            Category::Video => self.probe_video(probers),
            Category::Image => self.probe_image(probers),
            Category::Document | Category::Archive | Category::Unset => {}
        }
        self.probed = true;
    }

    fn probe_audio(&mut self, probers: Probers<'_>) {
        let mut info = AudioInfo::default();
        match probers.media.probe(&self.path) {
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to probe media file");
                info.broken = true;
            }
            Ok(probe) => {
                let streams = probe.streams_of(StreamKind::Audio);
                if streams.len() > 1 {
                    warn!(path = %self.path.display(), "more than one audio stream, using the first");
                }
                match streams.first() {
                    None => {
                        warn!(path = %self.path.display(), "no audio stream found");
                        info.broken = true;
                    }
                    Some(stream) => {
                        if stream.duration.is_none() {
                            warn!(path = %self.path.display(), "cannot extract the audio duration");
                        }
                        info.duration = stream.duration;
                        info.length = LengthBucket::classify(Category::Audio, info.duration);
                    }
                }
            }
        }
        self.media = MediaInfo::Audio(info);
    }

    fn probe_video(&mut self, probers: Probers<'_>) {
        let mut info = VideoInfo::default();
        match probers.media.probe(&self.path) {
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to probe media file");
                info.broken = true;
            }
            Ok(probe) => {
                let streams = probe.streams_of(StreamKind::Video);
                if streams.len() > 1 {
                    warn!(path = %self.path.display(), "more than one video stream, using the first");
                }
                match streams.first() {
                    None => {
                        warn!(path = %self.path.display(), "no video stream found");
                        info.broken = true;
                    }
                    Some(stream) => {
                        match (stream.effective_width(), stream.effective_height()) {
                            (Some(w), Some(h)) => {
                                info.width = Some(w);
                                info.height = Some(h);
                            }
                            _ => {
                                warn!(path = %self.path.display(), "cannot extract the video dimension")
                            }
                        }
                        if stream.duration.is_none() {
                            warn!(path = %self.path.display(), "cannot extract the video duration");
                        }
                        info.duration = stream.duration;
                        info.length = LengthBucket::classify(Category::Video, info.duration);
                        info.orientation = Orientation::from_dimensions(info.width, info.height);
                    }
                }
            }
        }
        self.media = MediaInfo::Video(info);
    }

    fn probe_image(&mut self, probers: Probers<'_>) {
        let mut info = ImageInfo::default();
        match probers.image.classify(&self.path) {
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to classify image");
            }
            Ok(class) => {
                info.probability = Some(class.probability);
                info.image_type = ImageType::from_probability(class.probability);
                info.width = class.width;
                info.height = class.height;
            }
        }
        info.orientation = Orientation::from_dimensions(info.width, info.height);
        self.media = MediaInfo::Image(info);
    }

    /// Moves the file and repoints the record at its new location.
    ///
    /// With `dry_run` only the intended move is reported. Otherwise either the
    /// file ends up at `destination` and the record follows it, or nothing
    /// changed and an error is returned.
    pub fn move_to(&mut self, destination: &Path, dry_run: bool) -> OrganizeResult<()> {
        if dry_run {
            OutputFormatter::dry_run_move(&self.path, destination);
            return Ok(());
        }

        FileOrganizer::relocate(&self.path, destination)?;
        debug!(from = %self.path.display(), to = %destination.display(), "moved");
        self.path = destination.to_path_buf();
        self.name = file_name_of(destination);
        Ok(())
    }

    /// Serializes every field into a plain JSON object, enums by name.
    ///
    /// Fails for paths that are not valid UTF-8.
    pub fn to_cache_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Rebuilds a record from [`FileRecord::to_cache_value`] output.
    ///
    /// Trusts the cached metadata: the filesystem is not consulted and the
    /// record is not probed. Entries whose payload does not belong to their
    /// category are rejected.
    pub fn from_cache_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        let record: FileRecord = serde_json::from_value(value)?;
        if !record.media.fits(record.category) {
            return Err(serde::de::Error::custom(format!(
                "cached metadata of {} does not match category {}",
                record.path.display(),
                record.category
            )));
        }
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::{ImageClass, MediaProbe, StreamInfo, TableClassifier, TableProber};
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).expect("Failed to write test file");
        path
    }

    fn video_probe(duration: f64, width: u32, height: u32) -> MediaProbe {
        MediaProbe {
            streams: vec![
                StreamInfo::new(StreamKind::Audio, Some(duration)),
                StreamInfo::new(StreamKind::Video, Some(duration)).with_size(width, height),
            ],
        }
    }

    #[test]
    fn test_create_missing_path_fails() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let result = FileRecord::create(temp_dir.path().join("nope.mp4"), None);
        assert!(matches!(result, Err(RecordError::NotFound(_))));
    }

    #[test]
    fn test_create_directory_fails() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let result = FileRecord::create(temp_dir.path(), None);
        assert!(matches!(result, Err(RecordError::NotFound(_))));
    }

    #[test]
    fn test_create_captures_stat_without_probing() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = write(&temp_dir, "clip.mp4", b"12345");

        let record = FileRecord::create(&path, None).unwrap();
        assert_eq!(record.name(), "clip.mp4");
        assert_eq!(record.size(), 5);
        assert_eq!(record.category(), Category::Video);
        assert!(!record.probed());
        assert_eq!(record.orientation(), Some(Orientation::Unknown));
        assert_eq!(record.length(), Some(LengthBucket::Unknown));
        assert!(!record.broken());
    }

    #[test]
    fn test_probe_video_fills_metadata() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = write(&temp_dir, "clip.mp4", b"data");
        let prober = TableProber::new().with("clip.mp4", video_probe(400.0, 1080, 1920));
        let classifier = TableClassifier::new();

        let record =
            FileRecord::create(&path, Some(Probers::new(&prober, &classifier))).unwrap();
        assert!(record.probed());
        assert_eq!(record.duration(), Some(400.0));
        assert_eq!(record.length(), Some(LengthBucket::Medium));
        assert_eq!(record.orientation(), Some(Orientation::Portrait));
        assert!(!record.broken());
    }

    #[test]
    fn test_probe_video_without_video_stream_is_broken() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = write(&temp_dir, "sound.mp4", b"data");
        let prober = TableProber::new().with(
            "sound.mp4",
            MediaProbe {
                streams: vec![StreamInfo::new(StreamKind::Audio, Some(12.0))],
            },
        );
        let classifier = TableClassifier::new();

        let record =
            FileRecord::create(&path, Some(Probers::new(&prober, &classifier))).unwrap();
        assert!(record.probed());
        assert!(record.broken());
        assert_eq!(record.duration(), None);
    }

    #[test]
    fn test_probe_failure_marks_audio_broken() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = write(&temp_dir, "song.mp3", b"data");
        let prober = TableProber::new();
        let classifier = TableClassifier::new();

        let record =
            FileRecord::create(&path, Some(Probers::new(&prober, &classifier))).unwrap();
        assert!(record.probed());
        assert!(record.broken());
        assert_eq!(record.length(), Some(LengthBucket::Unknown));
    }

    #[test]
    fn test_probe_is_idempotent_unless_forced() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = write(&temp_dir, "song.mp3", b"data");
        let classifier = TableClassifier::new();
        let failing = TableProber::new();
        let working = TableProber::new().with(
            "song.mp3",
            MediaProbe {
                streams: vec![StreamInfo::new(StreamKind::Audio, Some(700.0))],
            },
        );

        let mut record =
            FileRecord::create(&path, Some(Probers::new(&failing, &classifier))).unwrap();
        assert!(record.broken());

        record.probe(Probers::new(&working, &classifier), false);
        assert!(record.broken());

        record.probe(Probers::new(&working, &classifier), true);
        assert!(!record.broken());
        assert_eq!(record.length(), Some(LengthBucket::Long));
    }

    #[test]
    fn test_image_classification_thresholds() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let prober = TableProber::new();
        let class = |p| ImageClass {
            probability: p,
            width: Some(800),
            height: Some(600),
        };
        let classifier = TableClassifier::new()
            .with("a.png", class(70.0))
            .with("b.png", class(50.0))
            .with("c.png", class(10.0));

        for (name, expected) in [
            ("a.png", ImageType::Illustration),
            ("b.png", ImageType::Uncertain),
            ("c.png", ImageType::Photo),
        ] {
            let path = write(&temp_dir, name, b"img");
            let record =
                FileRecord::create(&path, Some(Probers::new(&prober, &classifier))).unwrap();
            assert_eq!(record.image_type(), Some(expected));
            assert_eq!(record.orientation(), Some(Orientation::Landscape));
        }
    }

    #[test]
    fn test_image_classifier_failure_leaves_unset() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = write(&temp_dir, "odd.jpg", b"img");
        let prober = TableProber::new();
        let classifier = TableClassifier::new();

        let record =
            FileRecord::create(&path, Some(Probers::new(&prober, &classifier))).unwrap();
        assert_eq!(record.category(), Category::Image);
        assert!(record.probed());
        assert!(!record.broken());
        assert_eq!(record.image_type(), Some(ImageType::Unset));
        assert_eq!(record.orientation(), Some(Orientation::Unknown));
    }

    #[test]
    fn test_cache_value_round_trip() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = write(&temp_dir, "clip.mp4", b"data");
        let prober = TableProber::new().with("clip.mp4", video_probe(90.0, 1920, 1080));
        let classifier = TableClassifier::new();
        let record =
            FileRecord::create(&path, Some(Probers::new(&prober, &classifier))).unwrap();

        let value = record.to_cache_value().unwrap();
        assert_eq!(value["category"], "Video");
        assert_eq!(value["media"]["Video"]["orientation"], "Landscape");
        assert_eq!(value["media"]["Video"]["length"], "Short");

        fs::remove_file(&path).unwrap();
        let restored = FileRecord::from_cache_value(value).unwrap();
        assert_eq!(restored, record);
        assert!(restored.probed());
        assert_eq!(restored.media(), record.media());
        assert_eq!(restored.path(), record.path());
    }

    #[test]
    fn test_cache_value_rejects_payload_of_other_category() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = write(&temp_dir, "clip.mp4", b"data");
        let record = FileRecord::create(&path, None).unwrap();

        let mut value = record.to_cache_value().unwrap();
        value["media"] = serde_json::json!("Plain");
        assert!(FileRecord::from_cache_value(value).is_err());

        let mut value = record.to_cache_value().unwrap();
        value["category"] = serde_json::json!("Document");
        assert!(FileRecord::from_cache_value(value).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_cache_value_fails_for_non_utf8_name() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join(OsStr::from_bytes(b"clip\xff.mp4"));
        fs::write(&path, b"data").expect("Failed to write test file");

        let record = FileRecord::create(&path, None).unwrap();
        assert_eq!(record.category(), Category::Video);
        assert!(record.to_cache_value().is_err());
    }

    #[test]
    fn test_equality_ignores_path() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = write(&temp_dir, "doc.txt", b"same");
        let a = FileRecord::create(&path, None).unwrap();
        let mut b = a.clone();
        b.path = temp_dir.path().join("elsewhere").join("doc.txt");
        assert_eq!(a, b);

        b.size += 1;
        assert_ne!(a, b);
    }

    #[test]
    fn test_move_updates_path_and_name() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = write(&temp_dir, "doc.txt", b"content");
        let mut record = FileRecord::create(&path, None).unwrap();

        let dst = temp_dir.path().join("renamed.txt");
        record.move_to(&dst, false).unwrap();
        assert_eq!(record.path(), dst.as_path());
        assert_eq!(record.name(), "renamed.txt");
        assert!(dst.exists());
        assert!(!path.exists());
    }

    #[test]
    fn test_dry_run_move_changes_nothing() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = write(&temp_dir, "doc.txt", b"content");
        let mut record = FileRecord::create(&path, None).unwrap();

        record
            .move_to(&temp_dir.path().join("other.txt"), true)
            .unwrap();
        assert_eq!(record.path(), path.as_path());
        assert!(path.exists());
    }

    #[test]
    fn test_freshness_check() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = write(&temp_dir, "doc.txt", b"content");
        let record = FileRecord::create(&path, None).unwrap();
        let (size, mtime) = stat_file(&path).unwrap();
        assert!(record.is_fresh(size, mtime));
        assert!(!record.is_fresh(size + 1, mtime));
    }
}

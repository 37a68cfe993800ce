//! Metadata probing collaborators.
//!
//! Stream metadata for audio/video and the illustration-vs-photo heuristic for
//! images come from external tools. The core only sees the two traits below;
//! the default implementations run `ffprobe` and a configurable classifier
//! command and parse their JSON output.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Errors raised by a prober or classifier.
///
/// These never escape probing: a failing probe marks the record broken (media)
/// or leaves it unclassified (images).
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
    #[error("{program} exited with {status} for {}", .path.display())]
    Failed {
        program: String,
        path: PathBuf,
        status: std::process::ExitStatus,
    },
    #[error("unreadable output for {}: {reason}", .path.display())]
    Parse { path: PathBuf, reason: String },
    #[error("{0}")]
    Unavailable(String),
}

/// Kind of a stream inside a media container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Video,
    Audio,
    Other,
}

/// One stream as reported by the media prober.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamInfo {
    pub kind: StreamKind,
    /// Seconds, if the container reports it.
    pub duration: Option<f64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub coded_width: Option<u32>,
    pub coded_height: Option<u32>,
}

impl StreamInfo {
    /// A stream with only a kind and a duration.
    pub fn new(kind: StreamKind, duration: Option<f64>) -> Self {
        Self {
            kind,
            duration,
            width: None,
            height: None,
            coded_width: None,
            coded_height: None,
        }
    }

    /// Sets display dimensions.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    /// Display width, falling back to the coded width.
    pub fn effective_width(&self) -> Option<u32> {
        self.width.or(self.coded_width)
    }

    /// Display height, falling back to the coded height.
    pub fn effective_height(&self) -> Option<u32> {
        self.height.or(self.coded_height)
    }
}

/// Result of probing a media container.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaProbe {
    pub streams: Vec<StreamInfo>,
}

impl MediaProbe {
    /// Streams of the given kind, in container order.
    pub fn streams_of(&self, kind: StreamKind) -> Vec<&StreamInfo> {
        self.streams.iter().filter(|s| s.kind == kind).collect()
    }
}

/// Result of the image heuristic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageClass {
    /// Likelihood, in percent, that the image is an illustration.
    pub probability: f64,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Reads stream metadata from an audio or video file.
pub trait MediaProber {
    fn probe(&self, path: &Path) -> Result<MediaProbe, ProbeError>;
}

/// Estimates whether an image is an illustration.
pub trait ImageClassifier {
    fn classify(&self, path: &Path) -> Result<ImageClass, ProbeError>;
}

/// Borrowed pair of collaborators handed to records while probing.
#[derive(Clone, Copy)]
pub struct Probers<'a> {
    pub media: &'a dyn MediaProber,
    pub image: &'a dyn ImageClassifier,
}

impl<'a> Probers<'a> {
    pub fn new(media: &'a dyn MediaProber, image: &'a dyn ImageClassifier) -> Self {
        Self { media, image }
    }
}

/// `ffprobe`-backed media prober.
#[derive(Debug, Clone)]
pub struct FfprobeProber {
    program: String,
}

#[derive(Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    duration: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    coded_width: Option<u32>,
    coded_height: Option<u32>,
}

impl FfprobeProber {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Parses `ffprobe -print_format json -show_streams` output.
    pub fn parse(path: &Path, json: &str) -> Result<MediaProbe, ProbeError> {
        let output: FfprobeOutput =
            serde_json::from_str(json).map_err(|e| ProbeError::Parse {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let streams = output
            .streams
            .into_iter()
            .map(|s| StreamInfo {
                kind: match s.codec_type.as_deref() {
                    Some("video") => StreamKind::Video,
                    Some("audio") => StreamKind::Audio,
                    _ => StreamKind::Other,
                },
                duration: s.duration.and_then(|d| d.parse::<f64>().ok()),
                width: s.width,
                height: s.height,
                coded_width: s.coded_width,
                coded_height: s.coded_height,
            })
            .collect();

        Ok(MediaProbe { streams })
    }
}

impl Default for FfprobeProber {
    fn default() -> Self {
        Self::new("ffprobe")
    }
}

impl MediaProber for FfprobeProber {
    fn probe(&self, path: &Path) -> Result<MediaProbe, ProbeError> {
        let output = Command::new(&self.program)
            .args(["-v", "quiet", "-print_format", "json", "-show_streams"])
            .arg(path)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .map_err(|e| ProbeError::Spawn {
                program: self.program.clone(),
                source: e,
            })?;

        if !output.status.success() {
            return Err(ProbeError::Failed {
                program: self.program.clone(),
                path: path.to_path_buf(),
                status: output.status,
            });
        }

        Self::parse(path, &String::from_utf8_lossy(&output.stdout))
    }
}

/// Image classifier that runs an external command.
///
/// The command gets the image path appended and must print
/// `{"probability": <0-100>, "width": <px>, "height": <px>}` on stdout.
/// With an empty command every classification fails, which leaves images
/// unclassified.
#[derive(Debug, Clone, Default)]
pub struct CommandClassifier {
    command: Vec<String>,
}

#[derive(Deserialize)]
struct ClassifierOutput {
    probability: f64,
    width: Option<u32>,
    height: Option<u32>,
}

impl CommandClassifier {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }
}

impl ImageClassifier for CommandClassifier {
    fn classify(&self, path: &Path) -> Result<ImageClass, ProbeError> {
        let Some((program, args)) = self.command.split_first() else {
            return Err(ProbeError::Unavailable(
                "no image classifier configured".to_string(),
            ));
        };

        let output = Command::new(program)
            .args(args)
            .arg(path)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .map_err(|e| ProbeError::Spawn {
                program: program.clone(),
                source: e,
            })?;

        if !output.status.success() {
            return Err(ProbeError::Failed {
                program: program.clone(),
                path: path.to_path_buf(),
                status: output.status,
            });
        }

        let parsed: ClassifierOutput =
            serde_json::from_slice(&output.stdout).map_err(|e| ProbeError::Parse {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        Ok(ImageClass {
            probability: parsed.probability.clamp(0.0, 100.0),
            width: parsed.width,
            height: parsed.height,
        })
    }
}

/// Prober answering from a fixed table keyed by file name.
///
/// Unknown names fail like an unreadable file would.
#[derive(Debug, Clone, Default)]
pub struct TableProber {
    entries: HashMap<String, MediaProbe>,
}

impl TableProber {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the probe result for a file name.
    pub fn with(mut self, file_name: &str, probe: MediaProbe) -> Self {
        self.entries.insert(file_name.to_string(), probe);
        self
    }
}

impl MediaProber for TableProber {
    fn probe(&self, path: &Path) -> Result<MediaProbe, ProbeError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        self.entries
            .get(&name)
            .cloned()
            .ok_or_else(|| ProbeError::Unavailable(format!("no probe data for {}", name)))
    }
}

/// Classifier answering from a fixed table keyed by file name.
#[derive(Debug, Clone, Default)]
pub struct TableClassifier {
    entries: HashMap<String, ImageClass>,
}

impl TableClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the classification for a file name.
    pub fn with(mut self, file_name: &str, class: ImageClass) -> Self {
        self.entries.insert(file_name.to_string(), class);
        self
    }
}

impl ImageClassifier for TableClassifier {
    fn classify(&self, path: &Path) -> Result<ImageClass, ProbeError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        self.entries
            .get(&name)
            .copied()
            .ok_or_else(|| ProbeError::Unavailable(format!("no classification for {}", name)))
    }
}

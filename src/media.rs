//! Media classification rules.
//!
//! Small closed enums describing a media file's shape and the pure rules that
//! derive them from probed values. Every enum has an "unknown" member so a
//! record is always indexable, probed or not.

use crate::file_category::{Category, ParseEnumError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Portrait or landscape, derived from pixel dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum Orientation {
    Portrait,
    Landscape,
    #[default]
    Unknown,
}

impl Orientation {
    pub const ALL: [Orientation; 3] = [
        Orientation::Portrait,
        Orientation::Landscape,
        Orientation::Unknown,
    ];

    /// Classifies from optional dimensions.
    ///
    /// Taller than wide is portrait, anything else (including square) is
    /// landscape. A missing dimension gives `Unknown`.
    ///
    /// ```
    /// use mediatidy::media::Orientation;
    ///
    /// assert_eq!(Orientation::from_dimensions(Some(1080), Some(1920)), Orientation::Portrait);
    /// assert_eq!(Orientation::from_dimensions(Some(512), Some(512)), Orientation::Landscape);
    /// assert_eq!(Orientation::from_dimensions(None, Some(512)), Orientation::Unknown);
    /// ```
    pub fn from_dimensions(width: Option<u32>, height: Option<u32>) -> Self {
        match (width, height) {
            (Some(w), Some(h)) if h > w => Orientation::Portrait,
            (Some(_), Some(_)) => Orientation::Landscape,
            _ => Orientation::Unknown,
        }
    }

    /// Short code used in file name prefixes.
    pub fn code(&self) -> &'static str {
        match self {
            Orientation::Portrait => "Po",
            Orientation::Landscape => "La",
            Orientation::Unknown => "_",
        }
    }
}

/// Duration range of an audio or video file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum LengthBucket {
    Short,
    Medium,
    Long,
    ExtraLong,
    #[default]
    Unknown,
}

/// Half-open `[lo, hi)` second ranges for audio.
const AUDIO_BUCKETS: [(f64, f64, LengthBucket); 4] = [
    (0.0, 300.0, LengthBucket::Short),
    (300.0, 600.0, LengthBucket::Medium),
    (600.0, 1800.0, LengthBucket::Long),
    (1800.0, 3_600_000.0, LengthBucket::ExtraLong),
];

/// Half-open `[lo, hi)` second ranges for video.
const VIDEO_BUCKETS: [(f64, f64, LengthBucket); 4] = [
    (0.0, 300.0, LengthBucket::Short),
    (300.0, 1800.0, LengthBucket::Medium),
    (1800.0, 3600.0, LengthBucket::Long),
    (3600.0, 3_600_000.0, LengthBucket::ExtraLong),
];

impl LengthBucket {
    pub const ALL: [LengthBucket; 5] = [
        LengthBucket::Short,
        LengthBucket::Medium,
        LengthBucket::Long,
        LengthBucket::ExtraLong,
        LengthBucket::Unknown,
    ];

    /// Buckets a duration for the given category.
    ///
    /// Only `Audio` and `Video` have length buckets; any other category, a
    /// missing duration, or one outside every range gives `Unknown`.
    pub fn classify(category: Category, duration: Option<f64>) -> Self {
        let table: &[(f64, f64, LengthBucket)] = match category {
            Category::Audio => &AUDIO_BUCKETS,
            Category::Video => &VIDEO_BUCKETS,
            _ => return LengthBucket::Unknown,
        };
        let Some(d) = duration else {
            return LengthBucket::Unknown;
        };
        table
            .iter()
            .find(|(lo, hi, _)| d >= *lo && d < *hi)
            .map(|(_, _, bucket)| *bucket)
            .unwrap_or(LengthBucket::Unknown)
    }

    /// Short code used in file name prefixes.
    pub fn code(&self) -> &'static str {
        match self {
            LengthBucket::Short => "S",
            LengthBucket::Medium => "M",
            LengthBucket::Long => "L",
            LengthBucket::ExtraLong => "XL",
            LengthBucket::Unknown => "_",
        }
    }

    /// Row label for summary tables.
    pub fn label(&self) -> &'static str {
        match self {
            LengthBucket::Short => "Short",
            LengthBucket::Medium => "Medium",
            LengthBucket::Long => "Long",
            LengthBucket::ExtraLong => "Ex-Long",
            LengthBucket::Unknown => "Unknown Length",
        }
    }
}

/// Whether an image looks drawn or photographed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum ImageType {
    Illustration,
    Photo,
    Uncertain,
    #[default]
    Unset,
}

impl ImageType {
    pub const ALL: [ImageType; 4] = [
        ImageType::Illustration,
        ImageType::Photo,
        ImageType::Uncertain,
        ImageType::Unset,
    ];

    /// Maps a classifier probability (percent) to an image type.
    ///
    /// ```
    /// use mediatidy::media::ImageType;
    ///
    /// assert_eq!(ImageType::from_probability(65.0), ImageType::Illustration);
    /// assert_eq!(ImageType::from_probability(35.5), ImageType::Uncertain);
    /// assert_eq!(ImageType::from_probability(35.0), ImageType::Photo);
    /// ```
    pub fn from_probability(p: f64) -> Self {
        if p >= 65.0 {
            ImageType::Illustration
        } else if p > 35.0 {
            ImageType::Uncertain
        } else {
            ImageType::Photo
        }
    }

    /// Folder name used when organizing images.
    pub fn folder(&self) -> &'static str {
        match self {
            ImageType::Illustration => "@illustration",
            ImageType::Photo => "@photo",
            ImageType::Uncertain => "@uncertain",
            ImageType::Unset => "@notset",
        }
    }

    /// Row label for summary tables.
    pub fn label(&self) -> &'static str {
        match self {
            ImageType::Illustration => "Illustration",
            ImageType::Photo => "Photo",
            ImageType::Uncertain => "Uncertain",
            ImageType::Unset => "Type Not Set",
        }
    }
}

macro_rules! parse_by_name {
    ($ty:ty, $kind:literal, { $($name:literal => $variant:expr),+ $(,)? }) => {
        impl FromStr for $ty {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_lowercase().as_str() {
                    $($name => Ok($variant),)+
                    _ => Err(ParseEnumError { kind: $kind, value: s.to_string() }),
                }
            }
        }
    };
}

parse_by_name!(Orientation, "orientation", {
    "portrait" => Orientation::Portrait,
    "po" => Orientation::Portrait,
    "landscape" => Orientation::Landscape,
    "la" => Orientation::Landscape,
    "unknown" => Orientation::Unknown,
});

parse_by_name!(LengthBucket, "length bucket", {
    "short" => LengthBucket::Short,
    "s" => LengthBucket::Short,
    "medium" => LengthBucket::Medium,
    "m" => LengthBucket::Medium,
    "long" => LengthBucket::Long,
    "l" => LengthBucket::Long,
    "extralong" => LengthBucket::ExtraLong,
    "xl" => LengthBucket::ExtraLong,
    "unknown" => LengthBucket::Unknown,
});

parse_by_name!(ImageType, "image type", {
    "illustration" => ImageType::Illustration,
    "photo" => ImageType::Photo,
    "uncertain" => ImageType::Uncertain,
    "unset" => ImageType::Unset,
});

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl fmt::Display for LengthBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl fmt::Display for ImageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

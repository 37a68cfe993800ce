//! Sort keys for file lists.

use crate::file_category::{Category, ParseEnumError};
use crate::media::{ImageType, LengthBucket, Orientation};
use crate::record::FileRecord;
use chrono::{NaiveDate, NaiveDateTime};
use std::cmp::Ordering;
use std::str::FromStr;

/// Attribute a list can be sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Name,
    Category,
    Date,
    Time,
    Size,
    Width,
    Height,
    Orientation,
    Duration,
    Length,
    ImageType,
}

/// Value extracted from a record for sorting.
///
/// `Least` stands in for attributes a record lacks and orders before
/// everything else.
#[derive(Debug, Clone)]
pub enum SortValue {
    Least,
    Text(String),
    Category(Category),
    Date(NaiveDate),
    Time(NaiveDateTime),
    Integer(u64),
    Float(f64),
    Orientation(Orientation),
    Length(LengthBucket),
    ImageType(ImageType),
}

impl SortValue {
    fn rank(&self) -> u8 {
        match self {
            SortValue::Least => 0,
            SortValue::Text(_) => 1,
            SortValue::Category(_) => 2,
            SortValue::Date(_) => 3,
            SortValue::Time(_) => 4,
            SortValue::Integer(_) => 5,
            SortValue::Float(_) => 6,
            SortValue::Orientation(_) => 7,
            SortValue::Length(_) => 8,
            SortValue::ImageType(_) => 9,
        }
    }
}

impl Ord for SortValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (SortValue::Text(a), SortValue::Text(b)) => a.cmp(b),
            (SortValue::Category(a), SortValue::Category(b)) => a.cmp(b),
            (SortValue::Date(a), SortValue::Date(b)) => a.cmp(b),
            (SortValue::Time(a), SortValue::Time(b)) => a.cmp(b),
            (SortValue::Integer(a), SortValue::Integer(b)) => a.cmp(b),
            (SortValue::Float(a), SortValue::Float(b)) => a.total_cmp(b),
            (SortValue::Orientation(a), SortValue::Orientation(b)) => a.cmp(b),
            (SortValue::Length(a), SortValue::Length(b)) => a.cmp(b),
            (SortValue::ImageType(a), SortValue::ImageType(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for SortValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for SortValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SortValue {}

impl SortKey {
    /// Extracts this key from a record.
    pub fn value(&self, record: &FileRecord) -> SortValue {
        match self {
            SortKey::Name => SortValue::Text(record.name().to_string()),
            SortKey::Category => SortValue::Category(record.category()),
            SortKey::Date => SortValue::Date(record.mdate()),
            SortKey::Time => SortValue::Time(record.mtime()),
            SortKey::Size => SortValue::Integer(record.size()),
            SortKey::Width => record
                .width()
                .map_or(SortValue::Least, |w| SortValue::Integer(u64::from(w))),
            SortKey::Height => record
                .height()
                .map_or(SortValue::Least, |h| SortValue::Integer(u64::from(h))),
            SortKey::Orientation => record
                .orientation()
                .map_or(SortValue::Least, SortValue::Orientation),
            SortKey::Duration => record.duration().map_or(SortValue::Least, SortValue::Float),
            SortKey::Length => record.length().map_or(SortValue::Least, SortValue::Length),
            SortKey::ImageType => record
                .image_type()
                .map_or(SortValue::Least, SortValue::ImageType),
        }
    }
}

impl FromStr for SortKey {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "name" => Ok(SortKey::Name),
            "category" | "type" => Ok(SortKey::Category),
            "date" | "mdate" => Ok(SortKey::Date),
            "time" | "mtime" => Ok(SortKey::Time),
            "size" => Ok(SortKey::Size),
            "width" => Ok(SortKey::Width),
            "height" => Ok(SortKey::Height),
            "orientation" => Ok(SortKey::Orientation),
            "duration" => Ok(SortKey::Duration),
            "length" | "length_type" => Ok(SortKey::Length),
            "image_type" => Ok(SortKey::ImageType),
            _ => Err(ParseEnumError {
                kind: "sort key",
                value: s.to_string(),
            }),
        }
    }
}

//! Typed collections of file records.
//!
//! A [`FileList`] holds the records of one category in insertion order and
//! keeps secondary indices over them: modification date, ancestor folders and
//! the category's own dimensions (orientation, length bucket, image type).
//! Queries return new lists and never touch the receiver.

use crate::file_category::Category;
use crate::file_organizer::{FileOrganizer, MovePlanner, MoveReport, OrganizeError};
use crate::media::{ImageType, LengthBucket, Orientation};
use crate::output::OutputFormatter;
use crate::probe::Probers;
use crate::prompt::ConflictResolver;
use crate::record::{FileRecord, RecordError};
use crate::sort::SortKey;
use chrono::{Local, NaiveDate, TimeDelta};
use rand::seq::SliceRandom;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Errors raised by file list operations.
#[derive(Debug, thiserror::Error)]
pub enum ListError {
    #[error(transparent)]
    Record(#[from] RecordError),
    #[error(transparent)]
    Organize(#[from] OrganizeError),
    #[error("{} is a {found} file, this list holds {expected} files", .path.display())]
    WrongCategory {
        path: PathBuf,
        expected: Category,
        found: Category,
    },
    #[error("{category} files are not indexed by {index}")]
    UnsupportedIndex { category: Category, index: IndexKind },
    #[error("unreadable cache entry: {0}")]
    CacheEntry(#[from] serde_json::Error),
}

/// Secondary index dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    Orientation,
    Length,
    ImageType,
}

impl IndexKind {
    fn applies_to(self, category: Category) -> bool {
        matches!(
            (self, category),
            (IndexKind::Orientation, Category::Video | Category::Image)
                | (IndexKind::Length, Category::Video | Category::Audio)
                | (IndexKind::ImageType, Category::Image)
        )
    }
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexKind::Orientation => f.write_str("orientation"),
            IndexKind::Length => f.write_str("length"),
            IndexKind::ImageType => f.write_str("image type"),
        }
    }
}

/// What happened to a record offered to a list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admitted {
    Indexed,
    /// Broken media, moved aside to the given path and not indexed.
    Quarantined(PathBuf),
}

enum Admission {
    Accept,
    Quarantine(PathBuf),
}

/// Outcome of [`FileList::probe`].
#[derive(Debug, Default)]
pub struct ProbeReport {
    pub probed: usize,
    pub quarantined: Vec<PathBuf>,
    pub failures: Vec<(PathBuf, String)>,
}

/// Count table of one list, as shown by the `summary` command.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub category: Category,
    /// Column labels, the last being "Sum". Empty for categories without
    /// sub-types.
    pub columns: Vec<&'static str>,
    /// Row label and one count per column; the last row is "Sum".
    pub rows: Vec<(&'static str, Vec<usize>)>,
    pub total_files: usize,
    pub total_size: u64,
    pub total_duration: f64,
}

/// Records of one category plus their indices.
#[derive(Debug, Clone)]
pub struct FileList {
    category: Category,
    base: PathBuf,
    target: PathBuf,
    quarantine: Option<PathBuf>,
    records: Vec<FileRecord>,
    by_mdate: BTreeMap<NaiveDate, Vec<usize>>,
    folders: BTreeSet<PathBuf>,
    by_orientation: BTreeMap<Orientation, Vec<usize>>,
    by_length: BTreeMap<LengthBucket, Vec<usize>>,
    by_image_type: BTreeMap<ImageType, Vec<usize>>,
}

impl FileList {
    /// An empty list resolving target folders against the current directory.
    pub fn new(category: Category) -> Self {
        Self::with_base(category, ".")
    }

    /// An empty list whose relative target folders resolve against `base`.
    pub fn with_base(category: Category, base: impl Into<PathBuf>) -> Self {
        let quarantine = match category {
            Category::Video => Some(PathBuf::from("@broken-videos")),
            Category::Audio => Some(PathBuf::from("@broken-audios")),
            _ => None,
        };
        let mut list = Self {
            category,
            base: base.into(),
            target: PathBuf::from(category.dir_name()),
            quarantine,
            records: Vec::new(),
            by_mdate: BTreeMap::new(),
            folders: BTreeSet::new(),
            by_orientation: BTreeMap::new(),
            by_length: BTreeMap::new(),
            by_image_type: BTreeMap::new(),
        };
        list.seed_indices();
        list
    }

    /// Overrides the organize target and the broken-media folder.
    pub fn with_targets(mut self, target: impl Into<PathBuf>, quarantine: Option<PathBuf>) -> Self {
        self.target = target.into();
        if self.category.is_media() {
            self.quarantine = quarantine;
        }
        self
    }

    fn empty_like(&self) -> Self {
        let mut list = Self {
            category: self.category,
            base: self.base.clone(),
            target: self.target.clone(),
            quarantine: self.quarantine.clone(),
            records: Vec::new(),
            by_mdate: BTreeMap::new(),
            folders: BTreeSet::new(),
            by_orientation: BTreeMap::new(),
            by_length: BTreeMap::new(),
            by_image_type: BTreeMap::new(),
        };
        list.seed_indices();
        list
    }

    fn seed_indices(&mut self) {
        if self.indexes(IndexKind::Orientation) {
            for o in Orientation::ALL {
                self.by_orientation.insert(o, Vec::new());
            }
        }
        if self.indexes(IndexKind::Length) {
            for l in LengthBucket::ALL {
                self.by_length.insert(l, Vec::new());
            }
        }
        if self.indexes(IndexKind::ImageType) {
            for t in ImageType::ALL {
                self.by_image_type.insert(t, Vec::new());
            }
        }
    }

    fn indexes(&self, kind: IndexKind) -> bool {
        kind.applies_to(self.category)
    }

    fn ensure_indexed(&self, kind: IndexKind) -> Result<(), ListError> {
        if self.indexes(kind) {
            Ok(())
        } else {
            Err(ListError::UnsupportedIndex {
                category: self.category,
                index: kind,
            })
        }
    }

    /// Resolves a folder against the base, dropping `.` components.
    fn resolve(&self, folder: &Path) -> PathBuf {
        self.base.join(folder).components().collect()
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[FileRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &FileRecord> {
        self.records.iter()
    }

    /// Every ancestor directory of every record seen so far.
    pub fn folders(&self) -> &BTreeSet<PathBuf> {
        &self.folders
    }

    /// Builds a record for `path` and offers it to the list.
    pub fn add_path(
        &mut self,
        path: impl AsRef<Path>,
        probers: Option<Probers<'_>>,
    ) -> Result<Admitted, ListError> {
        let record = FileRecord::create(path, probers)?;
        self.add(record)
    }

    /// Rebuilds a cached record and offers it to the list without probing.
    pub fn add_from_cache(&mut self, value: Value) -> Result<Admitted, ListError> {
        let record = FileRecord::from_cache_value(value)?;
        self.add(record)
    }

    /// Offers a record to the list.
    ///
    /// Broken audio and video is moved to the quarantine folder instead of
    /// being indexed.
    pub fn add(&mut self, mut record: FileRecord) -> Result<Admitted, ListError> {
        if record.category() != self.category {
            return Err(ListError::WrongCategory {
                path: record.path().to_path_buf(),
                expected: self.category,
                found: record.category(),
            });
        }

        match self.admission(&record) {
            Admission::Accept => {
                self.index(record);
                Ok(Admitted::Indexed)
            }
            Admission::Quarantine(folder) => {
                let dst = self.quarantine(&mut record, &folder)?;
                Ok(Admitted::Quarantined(dst))
            }
        }
    }

    fn admission(&self, record: &FileRecord) -> Admission {
        match &self.quarantine {
            Some(folder) if record.probed() && record.broken() => {
                Admission::Quarantine(self.resolve(folder))
            }
            _ => Admission::Accept,
        }
    }

    fn quarantine(&self, record: &mut FileRecord, folder: &Path) -> Result<PathBuf, ListError> {
        if record.path().parent() == Some(folder) {
            debug!(path = %record.path().display(), "already in quarantine");
            return Ok(record.path().to_path_buf());
        }

        if !folder.exists() {
            fs::create_dir_all(folder).map_err(|e| OrganizeError::DirectoryCreationFailed {
                path: folder.to_path_buf(),
                source: e,
            })?;
        }

        let from = record.path().to_path_buf();
        let dst = FileOrganizer::get_unique_destination(&folder.join(record.name()));
        record.move_to(&dst, false)?;
        warn!(from = %from.display(), to = %dst.display(), "moved broken media aside");
        Ok(dst)
    }

    /// Inserts into the base list and every applicable index.
    fn index(&mut self, record: FileRecord) {
        let pos = self.records.len();

        if let Some(parent) = record.path().parent() {
            for ancestor in parent.ancestors().filter(|a| !a.as_os_str().is_empty()) {
                self.folders.insert(ancestor.to_path_buf());
            }
        }
        self.by_mdate.entry(record.mdate()).or_default().push(pos);
        if self.indexes(IndexKind::Orientation)
            && let Some(o) = record.orientation()
        {
            self.by_orientation.entry(o).or_default().push(pos);
        }
        if self.indexes(IndexKind::Length)
            && let Some(l) = record.length()
        {
            self.by_length.entry(l).or_default().push(pos);
        }
        if self.indexes(IndexKind::ImageType)
            && let Some(t) = record.image_type()
        {
            self.by_image_type.entry(t).or_default().push(pos);
        }

        self.records.push(record);
    }

    fn clear_indices(&mut self) -> Vec<FileRecord> {
        self.by_mdate.clear();
        self.by_orientation.clear();
        self.by_length.clear();
        self.by_image_type.clear();
        self.seed_indices();
        std::mem::take(&mut self.records)
    }

    fn rebuild_indices(&mut self) {
        for record in self.clear_indices() {
            self.index(record);
        }
    }

    fn subset(&self, positions: impl IntoIterator<Item = usize>) -> FileList {
        let mut list = self.empty_like();
        let mut seen = HashSet::new();
        for pos in positions {
            if seen.insert(pos) {
                list.index(self.records[pos].clone());
            }
        }
        list
    }

    // Queries

    pub fn by_mdate(&self, date: NaiveDate) -> FileList {
        self.by_mdates(&[date])
    }

    /// Records modified on any of `dates`, in the order given.
    ///
    /// Dates without records are skipped with a warning.
    pub fn by_mdates(&self, dates: &[NaiveDate]) -> FileList {
        let list = self.select_dates(dates, true);
        if list.is_empty() {
            warn!(category = %self.category, "no files found for the given dates");
        }
        list
    }

    pub(crate) fn select_dates(&self, dates: &[NaiveDate], warn_missing: bool) -> FileList {
        let mut positions = Vec::new();
        for date in dates {
            match self.by_mdate.get(date) {
                Some(found) => positions.extend(found.iter().copied()),
                None if warn_missing => {
                    warn!(category = %self.category, %date, "no files modified on this date")
                }
                None => {}
            }
        }
        self.subset(positions)
    }

    /// Records whose full path starts with `prefix`.
    pub fn by_folder(&self, prefix: &str) -> FileList {
        self.subset(
            self.records
                .iter()
                .enumerate()
                .filter(|(_, r)| r.path().to_string_lossy().starts_with(prefix))
                .map(|(i, _)| i),
        )
    }

    pub fn by_orientation(&self, orientation: Orientation) -> Result<FileList, ListError> {
        self.ensure_indexed(IndexKind::Orientation)?;
        Ok(self.subset(self.by_orientation.get(&orientation).cloned().unwrap_or_default()))
    }

    pub fn by_length(&self, length: LengthBucket) -> Result<FileList, ListError> {
        self.ensure_indexed(IndexKind::Length)?;
        Ok(self.subset(self.by_length.get(&length).cloned().unwrap_or_default()))
    }

    pub fn by_image_type(&self, image_type: ImageType) -> Result<FileList, ListError> {
        self.ensure_indexed(IndexKind::ImageType)?;
        Ok(self.subset(self.by_image_type.get(&image_type).cloned().unwrap_or_default()))
    }

    pub fn probed(&self) -> FileList {
        self.filter(|r| r.probed())
    }

    pub fn unprobed(&self) -> FileList {
        self.filter(|r| !r.probed())
    }

    fn filter(&self, keep: impl Fn(&FileRecord) -> bool) -> FileList {
        self.subset(
            self.records
                .iter()
                .enumerate()
                .filter(|(_, r)| keep(r))
                .map(|(i, _)| i),
        )
    }

    pub fn shorts(&self) -> Result<FileList, ListError> {
        self.by_length(LengthBucket::Short)
    }

    pub fn mids(&self) -> Result<FileList, ListError> {
        self.by_length(LengthBucket::Medium)
    }

    pub fn longs(&self) -> Result<FileList, ListError> {
        self.by_length(LengthBucket::Long)
    }

    pub fn extra_longs(&self) -> Result<FileList, ListError> {
        self.by_length(LengthBucket::ExtraLong)
    }

    pub fn portrait(&self) -> Result<FileList, ListError> {
        self.by_orientation(Orientation::Portrait)
    }

    pub fn landscape(&self) -> Result<FileList, ListError> {
        self.by_orientation(Orientation::Landscape)
    }

    pub fn unknown_orientation(&self) -> Result<FileList, ListError> {
        self.by_orientation(Orientation::Unknown)
    }

    pub fn illustrations(&self) -> Result<FileList, ListError> {
        self.by_image_type(ImageType::Illustration)
    }

    pub fn photos(&self) -> Result<FileList, ListError> {
        self.by_image_type(ImageType::Photo)
    }

    pub fn uncertain(&self) -> Result<FileList, ListError> {
        self.by_image_type(ImageType::Uncertain)
    }

    // Dates

    /// Distinct modification dates, ascending.
    pub fn mdates(&self) -> Vec<NaiveDate> {
        self.by_mdate.keys().copied().collect()
    }

    pub fn today(&self) -> FileList {
        self.by_mdate(Local::now().date_naive())
    }

    /// Records from the `days` latest dates that have any.
    pub fn last_days(&self, days: usize) -> FileList {
        let dates = self.mdates();
        let start = dates.len().saturating_sub(days);
        self.by_mdates(&dates[start..])
    }

    /// Records from the `days` earliest dates that have any.
    pub fn first_days(&self, days: usize) -> FileList {
        let dates = self.mdates();
        self.by_mdates(&dates[..days.min(dates.len())])
    }

    /// Records modified today or in the `days` calendar days before.
    pub fn recent(&self, days: u32) -> FileList {
        let today = Local::now().date_naive();
        let dates: Vec<NaiveDate> = (0..=days)
            .filter_map(|d| today.checked_sub_signed(TimeDelta::days(i64::from(d))))
            .collect();
        self.by_mdates(&dates)
    }

    /// Stable sort by `key`, records lacking the attribute first.
    pub fn sort(&mut self, key: SortKey) -> &mut Self {
        self.records.sort_by_cached_key(|r| key.value(r));
        self.rebuild_indices();
        self
    }

    /// Probes every record and re-runs admission.
    ///
    /// Records that turn out broken are quarantined. When moving one aside
    /// fails it stays indexed and the failure is reported.
    pub fn probe(&mut self, probers: Probers<'_>, force: bool, progress: bool) -> ProbeReport {
        let mut report = ProbeReport::default();
        let bar = OutputFormatter::progress_bar(self.records.len() as u64, progress);
        bar.set_message(format!("{} probing", self.category));

        for mut record in self.clear_indices() {
            if force || !record.probed() {
                record.probe(probers, force);
                report.probed += 1;
            }
            bar.inc(1);

            match self.admission(&record) {
                Admission::Accept => self.index(record),
                Admission::Quarantine(folder) => match self.quarantine(&mut record, &folder) {
                    Ok(dst) => report.quarantined.push(dst),
                    Err(e) => {
                        warn!(path = %record.path().display(), error = %e, "cannot quarantine broken media");
                        report.failures.push((record.path().to_path_buf(), e.to_string()));
                        self.index(record);
                    }
                },
            }
        }
        bar.finish_and_clear();
        report
    }

    // Moving

    /// Moves every record into the category's target layout.
    ///
    /// Videos go to `<target>/<date>/` with a `[length-orientation]` name
    /// prefix, images to `<target>/<image type folder>/<date>/`, everything
    /// else flat into the target folder.
    pub fn organize(
        &mut self,
        resolver: &dyn ConflictResolver,
        dry_run: bool,
    ) -> Result<MoveReport, ListError> {
        let target = self.resolve(&self.target);
        let mut batches: Vec<(PathBuf, Vec<usize>)> = Vec::new();

        match self.category {
            Category::Video => {
                for (date, positions) in &self.by_mdate {
                    batches.push((target.join(date.to_string()), positions.clone()));
                }
            }
            Category::Image => {
                for image_type in ImageType::ALL {
                    let of_type: HashSet<usize> = self
                        .by_image_type
                        .get(&image_type)
                        .map(|p| p.iter().copied().collect())
                        .unwrap_or_default();
                    for (date, positions) in &self.by_mdate {
                        let selection: Vec<usize> =
                            positions.iter().copied().filter(|p| of_type.contains(p)).collect();
                        if !selection.is_empty() {
                            batches.push((
                                target.join(image_type.folder()).join(date.to_string()),
                                selection,
                            ));
                        }
                    }
                }
            }
            _ => batches.push((target, (0..self.records.len()).collect())),
        }

        let mut report = MoveReport::new(dry_run);
        for (folder, selection) in batches {
            report.merge(self.move_selection(&selection, &folder, resolver, dry_run)?);
        }
        Ok(report)
    }

    /// Moves every record into `folder` (resolved against the base).
    pub fn move_to(
        &mut self,
        folder: impl AsRef<Path>,
        resolver: &dyn ConflictResolver,
        dry_run: bool,
    ) -> Result<MoveReport, ListError> {
        let folder = self.resolve(folder.as_ref());
        let selection: Vec<usize> = (0..self.records.len()).collect();
        self.move_selection(&selection, &folder, resolver, dry_run)
    }

    fn move_selection(
        &mut self,
        selection: &[usize],
        folder: &Path,
        resolver: &dyn ConflictResolver,
        dry_run: bool,
    ) -> Result<MoveReport, ListError> {
        let planner = MovePlanner::new(resolver, dry_run);
        let category = self.category;
        let report = planner.move_to(&mut self.records, selection, folder, |record, folder| {
            destination_for(category, record, folder)
        })?;

        if !dry_run {
            for op in &report.moved {
                if let Some(parent) = op.new_path.parent() {
                    for ancestor in parent.ancestors().filter(|a| !a.as_os_str().is_empty()) {
                        self.folders.insert(ancestor.to_path_buf());
                    }
                }
            }
        }
        Ok(report)
    }

    // Output

    /// Cache entries keyed by path relative to `base`.
    ///
    /// Records whose path is not valid UTF-8 cannot be cached and are left
    /// out.
    pub fn to_cache(&self, base: &Path) -> BTreeMap<String, Value> {
        self.records
            .iter()
            .filter_map(|r| {
                let relative = r.path().strip_prefix(base).unwrap_or(r.path());
                let Some(key) = relative.to_str() else {
                    warn!(path = %r.path().display(), "not caching a path that is not UTF-8");
                    return None;
                };
                match r.to_cache_value() {
                    Ok(value) => Some((key.to_string(), value)),
                    Err(e) => {
                        warn!(path = %r.path().display(), error = %e, "not caching record");
                        None
                    }
                }
            })
            .collect()
    }

    pub fn total_size(&self) -> u64 {
        self.records.iter().map(|r| r.size()).sum()
    }

    pub fn total_duration(&self) -> f64 {
        self.records.iter().filter_map(|r| r.duration()).sum()
    }

    pub fn summary(&self) -> Summary {
        let (columns, rows) = match self.category {
            Category::Video => count_table(
                &self.records,
                &LengthBucket::ALL.map(|l| (l, l.label())),
                &orientation_columns(),
                |r| r.length().unwrap_or_default(),
                |r| r.orientation().unwrap_or_default(),
            ),
            Category::Image => count_table(
                &self.records,
                &ImageType::ALL.map(|t| (t, t.label())),
                &orientation_columns(),
                |r| r.image_type().unwrap_or_default(),
                |r| r.orientation().unwrap_or_default(),
            ),
            Category::Audio => count_table(
                &self.records,
                &LengthBucket::ALL.map(|l| (l, l.label())),
                &[],
                |r| r.length().unwrap_or_default(),
                |_| (),
            ),
            _ => (Vec::new(), Vec::new()),
        };

        Summary {
            category: self.category,
            columns,
            rows,
            total_files: self.records.len(),
            total_size: self.total_size(),
            total_duration: self.total_duration(),
        }
    }

    /// Paths for the viewer: the first `top` (all when `None`), shuffled on
    /// request.
    pub fn paths_to_open(&self, top: Option<usize>, random: bool) -> Vec<PathBuf> {
        let take = top.unwrap_or(self.records.len());
        let mut paths: Vec<PathBuf> = self
            .records
            .iter()
            .take(take)
            .map(|r| r.path().to_path_buf())
            .collect();
        if random {
            paths.shuffle(&mut rand::thread_rng());
        }
        paths
    }
}

fn destination_for(category: Category, record: &FileRecord, folder: &Path) -> PathBuf {
    match category {
        Category::Video => folder.join(video_file_name(record)),
        _ => folder.join(record.name()),
    }
}

/// File name of a video after organizing, with its
/// `[length-orientation]` prefix when one applies.
fn video_file_name(record: &FileRecord) -> String {
    let length = record.length().unwrap_or_default();
    let orientation = record.orientation().unwrap_or_default();
    if !record.probed() || (length == LengthBucket::Unknown && orientation == Orientation::Unknown) {
        return record.name().to_string();
    }

    let prefix = format!("[{}-{}]", length.code(), orientation.code());
    if record.name().starts_with(&prefix) {
        record.name().to_string()
    } else {
        format!("{}{}", prefix, record.name())
    }
}

fn orientation_columns() -> [(Orientation, &'static str); 3] {
    [
        (Orientation::Portrait, "Portrait"),
        (Orientation::Landscape, "Landscape"),
        (Orientation::Unknown, "Unknown Ratio"),
    ]
}

/// Counts records per (row, column) pair and appends "Sum" totals.
fn count_table<R: PartialEq + Copy, C: PartialEq + Copy>(
    records: &[FileRecord],
    rows: &[(R, &'static str)],
    columns: &[(C, &'static str)],
    row_of: impl Fn(&FileRecord) -> R,
    column_of: impl Fn(&FileRecord) -> C,
) -> (Vec<&'static str>, Vec<(&'static str, Vec<usize>)>) {
    let width = columns.len() + 1;
    let mut table: Vec<(&'static str, Vec<usize>)> =
        rows.iter().map(|(_, label)| (*label, vec![0; width])).collect();
    let mut sums = vec![0; width];

    for record in records {
        let Some(row) = rows.iter().position(|(r, _)| *r == row_of(record)) else {
            continue;
        };
        if let Some(col) = columns.iter().position(|(c, _)| *c == column_of(record)) {
            table[row].1[col] += 1;
            sums[col] += 1;
        }
        table[row].1[width - 1] += 1;
        sums[width - 1] += 1;
    }
    table.push(("Sum", sums));

    let mut labels: Vec<&'static str> = columns.iter().map(|(_, label)| *label).collect();
    labels.push("Sum");
    (labels, table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_organizer::CollisionChoice;
    use crate::probe::{ImageClass, MediaProbe, StreamInfo, StreamKind, TableClassifier, TableProber};
    use crate::prompt::FixedAnswers;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, name.as_bytes()).expect("Failed to write test file");
        path
    }

    fn video(duration: f64, width: u32, height: u32) -> MediaProbe {
        MediaProbe {
            streams: vec![StreamInfo::new(StreamKind::Video, Some(duration)).with_size(width, height)],
        }
    }

    fn index_union(list: &FileList) -> Vec<Vec<usize>> {
        let mut unions = Vec::new();
        let mut dates: Vec<usize> = list.by_mdate.values().flatten().copied().collect();
        dates.sort();
        unions.push(dates);
        for index in [
            list.by_orientation.values().flatten().copied().collect::<Vec<_>>(),
            list.by_length.values().flatten().copied().collect(),
            list.by_image_type.values().flatten().copied().collect(),
        ] {
            if !index.is_empty() {
                let mut index = index;
                index.sort();
                unions.push(index);
            }
        }
        unions
    }

    #[test]
    fn test_every_index_covers_every_record() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let prober = TableProber::new()
            .with("a.mp4", video(10.0, 1920, 1080))
            .with("b.mp4", video(400.0, 1080, 1920))
            .with("c.mp4", video(4000.0, 640, 480));
        let classifier = TableClassifier::new();
        let probers = Probers::new(&prober, &classifier);

        let mut list = FileList::with_base(Category::Video, temp_dir.path());
        for name in ["a.mp4", "b.mp4", "c.mp4", "d.mp4"] {
            let path = write(temp_dir.path(), name);
            let probe = if name == "d.mp4" { None } else { Some(probers) };
            assert_eq!(list.add_path(&path, probe).unwrap(), Admitted::Indexed);
        }

        assert_eq!(list.len(), 4);
        let expected: Vec<usize> = (0..4).collect();
        let unions = index_union(&list);
        assert_eq!(unions.len(), 3);
        for union in unions {
            assert_eq!(union, expected);
        }
        assert_eq!(list.by_orientation.len(), Orientation::ALL.len());
        assert!(list.by_image_type.is_empty());
    }

    #[test]
    fn test_wrong_category_is_rejected() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = write(temp_dir.path(), "notes.txt");
        let mut list = FileList::new(Category::Video);
        assert!(matches!(
            list.add_path(&path, None),
            Err(ListError::WrongCategory { .. })
        ));
        assert!(list.is_empty());
    }

    #[test]
    fn test_unsupported_index_is_an_error() {
        let audio = FileList::new(Category::Audio);
        assert!(matches!(
            audio.by_orientation(Orientation::Portrait),
            Err(ListError::UnsupportedIndex { .. })
        ));
        assert!(audio.shorts().is_ok());

        let docs = FileList::new(Category::Document);
        assert!(docs.by_length(LengthBucket::Short).is_err());
        assert!(docs.illustrations().is_err());
    }

    #[test]
    fn test_by_mdate_on_missing_date_is_empty() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let mut list = FileList::with_base(Category::Document, temp_dir.path());
        list.add_path(write(temp_dir.path(), "a.txt"), None).unwrap();

        let missing = NaiveDate::from_ymd_opt(1999, 1, 1).unwrap();
        assert!(list.by_mdate(missing).is_empty());
        assert_eq!(list.len(), 1);

        let today = list.mdates()[0];
        assert_eq!(list.by_mdates(&[today, today, missing]).len(), 1);
    }

    #[test]
    fn test_query_leaves_receiver_untouched() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let sub = temp_dir.path().join("sub");
        fs::create_dir(&sub).unwrap();
        let mut list = FileList::with_base(Category::Document, temp_dir.path());
        list.add_path(write(temp_dir.path(), "a.txt"), None).unwrap();
        list.add_path(write(&sub, "b.txt"), None).unwrap();

        let found = list.by_folder(&sub.to_string_lossy());
        assert_eq!(found.len(), 1);
        assert_eq!(found.records()[0].name(), "b.txt");
        assert_eq!(list.len(), 2);
        assert!(list.folders().contains(&sub));
        assert!(list.folders().contains(temp_dir.path()));
    }

    #[test]
    fn test_sort_by_duration_puts_unknown_first() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let prober = TableProber::new()
            .with("long.mp4", video(5000.0, 1920, 1080))
            .with("short.mp4", video(5.0, 1920, 1080));
        let classifier = TableClassifier::new();
        let probers = Probers::new(&prober, &classifier);

        let mut list = FileList::with_base(Category::Video, temp_dir.path());
        list.add_path(write(temp_dir.path(), "long.mp4"), Some(probers)).unwrap();
        list.add_path(write(temp_dir.path(), "plain.mp4"), None).unwrap();
        list.add_path(write(temp_dir.path(), "short.mp4"), Some(probers)).unwrap();

        list.sort(SortKey::Duration);
        let names: Vec<&str> = list.iter().map(|r| r.name()).collect();
        assert_eq!(names, ["plain.mp4", "short.mp4", "long.mp4"]);

        let shorts = list.shorts().unwrap();
        assert_eq!(shorts.records()[0].name(), "short.mp4");
    }

    #[test]
    fn test_broken_video_is_quarantined() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let prober = TableProber::new();
        let classifier = TableClassifier::new();
        let path = write(temp_dir.path(), "bad.mp4");

        let mut list = FileList::with_base(Category::Video, temp_dir.path());
        let admitted = list
            .add_path(&path, Some(Probers::new(&prober, &classifier)))
            .unwrap();

        let expected = temp_dir.path().join("@broken-videos").join("bad.mp4");
        assert_eq!(admitted, Admitted::Quarantined(expected.clone()));
        assert!(expected.exists());
        assert!(!path.exists());
        assert!(list.is_empty());
    }

    #[test]
    fn test_probe_reindexes_and_quarantines() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let prober = TableProber::new().with(
            "good.mp3",
            MediaProbe {
                streams: vec![StreamInfo::new(StreamKind::Audio, Some(700.0))],
            },
        );
        let classifier = TableClassifier::new();

        let mut list = FileList::with_base(Category::Audio, temp_dir.path());
        list.add_path(write(temp_dir.path(), "good.mp3"), None).unwrap();
        list.add_path(write(temp_dir.path(), "bad.mp3"), None).unwrap();
        assert_eq!(list.by_length(LengthBucket::Unknown).unwrap().len(), 2);

        let report = list.probe(Probers::new(&prober, &classifier), false, false);
        assert_eq!(report.probed, 2);
        assert_eq!(report.quarantined.len(), 1);
        assert_eq!(list.len(), 1);
        assert_eq!(list.longs().unwrap().len(), 1);
        assert!(list.by_length(LengthBucket::Unknown).unwrap().is_empty());
        assert!(temp_dir.path().join("@broken-audios").join("bad.mp3").exists());
    }

    #[test]
    fn test_organize_video_with_prefix_and_rename() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let prober = TableProber::new().with("clip.mp4", video(400.0, 1080, 1920));
        let classifier = TableClassifier::new();
        let path = write(temp_dir.path(), "clip.mp4");

        let mut list = FileList::with_base(Category::Video, temp_dir.path());
        list.add_path(&path, Some(Probers::new(&prober, &classifier))).unwrap();
        let date = list.mdates()[0].to_string();
        let folder = temp_dir.path().join("@video").join(&date);
        fs::create_dir_all(&folder).unwrap();
        fs::write(folder.join("[M-Po]clip.mp4"), "occupied").unwrap();

        let resolver = FixedAnswers::new(CollisionChoice::Rename, true);
        let report = list.organize(&resolver, false).unwrap();

        assert_eq!(report.moved.len(), 1);
        assert!(folder.join("[M-Po]clip-0.mp4").exists());
        assert!(!path.exists());
        assert_eq!(list.records()[0].name(), "[M-Po]clip-0.mp4");
    }

    #[test]
    fn test_video_prefix_rules() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let prober = TableProber::new().with("[S-La]done.mp4", video(10.0, 1920, 1080));
        let classifier = TableClassifier::new();
        let probers = Probers::new(&prober, &classifier);

        let done = FileRecord::create(write(temp_dir.path(), "[S-La]done.mp4"), Some(probers)).unwrap();
        assert_eq!(video_file_name(&done), "[S-La]done.mp4");

        let unprobed = FileRecord::create(write(temp_dir.path(), "raw.mp4"), None).unwrap();
        assert_eq!(video_file_name(&unprobed), "raw.mp4");
    }

    #[test]
    fn test_organize_images_by_type_and_date() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let prober = TableProber::new();
        let classifier = TableClassifier::new().with(
            "art.png",
            ImageClass {
                probability: 90.0,
                width: Some(100),
                height: Some(200),
            },
        );
        let probers = Probers::new(&prober, &classifier);

        let mut list = FileList::with_base(Category::Image, temp_dir.path());
        list.add_path(write(temp_dir.path(), "art.png"), Some(probers)).unwrap();
        list.add_path(write(temp_dir.path(), "odd.png"), Some(probers)).unwrap();
        let date = list.mdates()[0].to_string();

        let resolver = FixedAnswers::new(CollisionChoice::Abort, true);
        let report = list.organize(&resolver, false).unwrap();
        assert_eq!(report.moved.len(), 2);

        let image_dir = temp_dir.path().join("@image");
        assert!(image_dir.join("@illustration").join(&date).join("art.png").exists());
        assert!(image_dir.join("@notset").join(&date).join("odd.png").exists());
    }

    #[test]
    fn test_organize_dry_run_creates_nothing() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let mut list = FileList::with_base(Category::Document, temp_dir.path());
        list.add_path(write(temp_dir.path(), "a.txt"), None).unwrap();

        let resolver = FixedAnswers::new(CollisionChoice::Abort, true);
        let report = list.organize(&resolver, true).unwrap();

        assert_eq!(report.moved.len(), 1);
        assert!(!temp_dir.path().join("@document").exists());
        assert!(temp_dir.path().join("a.txt").exists());
    }

    #[test]
    fn test_unset_files_stay_in_base() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let mut list = FileList::with_base(Category::Unset, temp_dir.path());
        list.add_path(write(temp_dir.path(), "Makefile"), None).unwrap();

        let resolver = FixedAnswers::new(CollisionChoice::Abort, true);
        let report = list.organize(&resolver, false).unwrap();
        assert_eq!(report.unchanged, 1);
        assert!(report.moved.is_empty());
    }

    #[test]
    fn test_cache_keys_are_relative() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let sub = temp_dir.path().join("sub");
        fs::create_dir(&sub).unwrap();
        let mut list = FileList::with_base(Category::Document, temp_dir.path());
        list.add_path(write(&sub, "a.txt"), None).unwrap();

        let entries = list.to_cache(temp_dir.path());
        let key = Path::new("sub").join("a.txt").to_string_lossy().to_string();
        assert!(entries.contains_key(&key));

        let mut restored = FileList::with_base(Category::Document, temp_dir.path());
        restored.add_from_cache(entries[&key].clone()).unwrap();
        assert_eq!(restored.records()[0], list.records()[0]);
    }

    #[cfg(unix)]
    #[test]
    fn test_cache_skips_non_utf8_names() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let mut list = FileList::with_base(Category::Video, temp_dir.path());
        for name in [&b"clip\xff.mp4"[..], &b"clip\xfe.mp4"[..], &b"clip.mp4"[..]] {
            let path = temp_dir.path().join(OsStr::from_bytes(name));
            fs::write(&path, b"data").unwrap();
            list.add_path(path, None).unwrap();
        }
        assert_eq!(list.len(), 3);

        let entries = list.to_cache(temp_dir.path());
        assert_eq!(entries.len(), 1);
        assert!(entries.contains_key("clip.mp4"));
    }

    #[test]
    fn test_video_summary_counts() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let prober = TableProber::new()
            .with("a.mp4", video(10.0, 1080, 1920))
            .with("b.mp4", video(400.0, 1920, 1080));
        let classifier = TableClassifier::new();
        let probers = Probers::new(&prober, &classifier);

        let mut list = FileList::with_base(Category::Video, temp_dir.path());
        list.add_path(write(temp_dir.path(), "a.mp4"), Some(probers)).unwrap();
        list.add_path(write(temp_dir.path(), "b.mp4"), Some(probers)).unwrap();

        let summary = list.summary();
        assert_eq!(summary.columns, ["Portrait", "Landscape", "Unknown Ratio", "Sum"]);
        assert_eq!(summary.rows[0], ("Short", vec![1, 0, 0, 1]));
        assert_eq!(summary.rows[1], ("Medium", vec![0, 1, 0, 1]));
        assert_eq!(summary.rows.last().unwrap(), &("Sum", vec![1, 1, 0, 2]));
        assert_eq!(summary.total_files, 2);
        assert_eq!(summary.total_duration, 410.0);
    }

    #[test]
    fn test_paths_to_open_top() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let mut list = FileList::with_base(Category::Document, temp_dir.path());
        for name in ["a.txt", "b.txt", "c.txt"] {
            list.add_path(write(temp_dir.path(), name), None).unwrap();
        }
        assert_eq!(list.paths_to_open(Some(2), false).len(), 2);
        assert_eq!(list.paths_to_open(None, true).len(), 3);
    }
}

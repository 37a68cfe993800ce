//! Managed media root.
//!
//! A [`Manager`] scans one directory, sorts every file into the [`FileList`]
//! of its category and drives the operations that span categories: probing,
//! organizing, mass moves, cache persistence and viewers.
//!
//! Process-wide collaborators live in a [`Context`] shared by every manager
//! derived from the same scan.

use crate::cache::{CacheConflict, CacheError, CacheStore, Partition};
use crate::config::{Config, ConfigError, ScanFilters};
use crate::file_category::Category;
use crate::file_list::{Admitted, FileList, ListError, ProbeReport, Summary};
use crate::file_organizer::{HISTORY_FILE_NAME, MoveReport, OperationLog, OrganizeError};
use crate::launcher::{LaunchError, ViewerLauncher};
use crate::output::OutputFormatter;
use crate::probe::{CommandClassifier, FfprobeProber, ImageClassifier, MediaProber, Probers};
use crate::prompt::{ConflictResolver, Confirm, InteractivePrompt};
use crate::record::{FileRecord, stat_file};
use chrono::NaiveDate;
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

#[derive(Debug, thiserror::Error)]
pub enum ManagerError {
    #[error("Directory {} does not exist", .0.display())]
    NotFound(PathBuf),
    #[error("No viewer configured for {0} files")]
    NoViewer(Category),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    List(#[from] ListError),
    #[error(transparent)]
    Organize(#[from] OrganizeError),
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error(transparent)]
    Launch(#[from] LaunchError),
}

/// Shared state of one run: the cache, running viewers and the probing and
/// prompting collaborators.
pub struct Context {
    cache: RefCell<CacheStore>,
    launcher: RefCell<ViewerLauncher>,
    prober: Box<dyn MediaProber>,
    classifier: Box<dyn ImageClassifier>,
    resolver: Box<dyn ConflictResolver>,
    confirm: Box<dyn Confirm>,
    progress: bool,
}

impl Context {
    /// Context around `cache` with `ffprobe`, no image classifier and
    /// terminal prompts.
    pub fn new(cache: CacheStore) -> Self {
        Self {
            cache: RefCell::new(cache),
            launcher: RefCell::new(ViewerLauncher::new()),
            prober: Box::new(FfprobeProber::default()),
            classifier: Box::new(CommandClassifier::default()),
            resolver: Box::new(InteractivePrompt),
            confirm: Box::new(InteractivePrompt),
            progress: false,
        }
    }

    /// Context for the configured cache, prober and classifier, with
    /// progress bars.
    pub fn from_config(config: &Config) -> Self {
        let cache = CacheStore::load_or_empty(config.cache.resolved_path());
        Self::new(cache)
            .with_prober(FfprobeProber::new(config.probe.ffprobe.clone()))
            .with_classifier(CommandClassifier::new(config.probe.classifier.clone()))
            .with_progress(true)
    }

    pub fn with_prober(mut self, prober: impl MediaProber + 'static) -> Self {
        self.prober = Box::new(prober);
        self
    }

    pub fn with_classifier(mut self, classifier: impl ImageClassifier + 'static) -> Self {
        self.classifier = Box::new(classifier);
        self
    }

    pub fn with_resolver(mut self, resolver: impl ConflictResolver + 'static) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    pub fn with_confirm(mut self, confirm: impl Confirm + 'static) -> Self {
        self.confirm = Box::new(confirm);
        self
    }

    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    pub fn probers(&self) -> Probers<'_> {
        Probers::new(self.prober.as_ref(), self.classifier.as_ref())
    }

    /// Number of entries in the cache store.
    pub fn cached_entries(&self) -> usize {
        self.cache.borrow().len()
    }

    /// Viewers started through this context and not seen exiting.
    pub fn running_viewers(&self) -> usize {
        self.launcher.borrow_mut().reap();
        self.launcher.borrow().running()
    }
}

/// Every file under one root, split by category.
pub struct Manager {
    root: PathBuf,
    config: Config,
    lists: BTreeMap<Category, FileList>,
    context: Rc<Context>,
    assume_yes: bool,
}

impl Manager {
    /// Scans `root` and builds a list per category.
    ///
    /// Fresh cache entries are reused when the category trusts the cache;
    /// every other file gets a new record, probed when the category's probing
    /// is enabled. Files that cannot be read are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns `ManagerError::NotFound` if `root` is not a directory, or a
    /// config error if the scan filters do not compile.
    pub fn load(
        root: impl AsRef<Path>,
        config: Config,
        context: Rc<Context>,
    ) -> Result<Self, ManagerError> {
        let given = root.as_ref();
        let root = fs::canonicalize(given).map_err(|_| ManagerError::NotFound(given.to_path_buf()))?;
        if !root.is_dir() {
            return Err(ManagerError::NotFound(given.to_path_buf()));
        }
        let filters = config.scan_filters()?;

        let lists = Category::ALL
            .into_iter()
            .map(|category| {
                let list = FileList::with_base(category, &root).with_targets(
                    config.organize.target(category),
                    config.organize.quarantine(category).map(Path::to_path_buf),
                );
                (category, list)
            })
            .collect();
        let mut manager = Self {
            root,
            config,
            lists,
            context,
            assume_yes: false,
        };

        let paths = manager.scan(&filters);
        let bar = OutputFormatter::progress_bar(paths.len() as u64, manager.context.progress);
        bar.set_message("loading");
        for path in &paths {
            manager.admit(path);
            bar.inc(1);
        }
        bar.finish_and_clear();
        info!(root = %manager.root.display(), files = manager.len(), "loaded");

        Ok(manager)
    }

    /// Files under the root that pass the scan rules, in name order.
    fn scan(&self, filters: &ScanFilters) -> Vec<PathBuf> {
        let max_depth = if self.config.scan.recursive { usize::MAX } else { 1 };

        WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(max_depth)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                entry.depth() == 0
                    || !entry.file_type().is_dir()
                    || ScanFilters::should_descend(&entry.file_name().to_string_lossy())
            })
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(error = %e, "cannot read directory entry");
                    None
                }
            })
            .filter(|entry| entry.path().is_file() && entry.file_name() != HISTORY_FILE_NAME)
            .filter(|entry| {
                let relative = entry.path().strip_prefix(&self.root).unwrap_or(entry.path());
                filters.should_include(relative)
            })
            .map(|entry| entry.into_path())
            .collect()
    }

    /// Key of `path` in the cache partition, `None` when it is not UTF-8.
    fn cache_key(&self, path: &Path) -> Option<String> {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .to_str()
            .map(str::to_string)
    }

    /// Cached record for `path`, if there is one and it still matches the
    /// file on disk.
    fn fresh_cached(&self, path: &Path, category: Category) -> Option<FileRecord> {
        let key = self.cache_key(path)?;
        let value = self.context.cache.borrow().get(&self.root, &key).cloned()?;

        let record = match FileRecord::from_cache_value(value) {
            Ok(record) => record,
            Err(e) => {
                debug!(key = %key, error = %e, "unreadable cache entry");
                return None;
            }
        };
        if record.path() != path || record.category() != category {
            debug!(key = %key, "cache entry describes another file");
            return None;
        }

        let (size, mtime) = stat_file(path).ok()?;
        if record.is_fresh(size, mtime) {
            debug!(key = %key, "cache hit");
            Some(record)
        } else {
            debug!(key = %key, "stale cache entry");
            None
        }
    }

    fn admit(&mut self, path: &Path) {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let category = Category::infer(&name);
        let rule = self.config.probe.rule(category);
        let cached = if rule.use_cache {
            self.fresh_cached(path, category)
        } else {
            None
        };

        let context = Rc::clone(&self.context);
        let probers = context.probers();
        let Some(list) = self.lists.get_mut(&category) else {
            return;
        };

        let admitted = match cached {
            Some(mut record) => {
                if rule.enabled && !record.probed() {
                    record.probe(probers, false);
                }
                list.add(record)
            }
            None => list.add_path(path, rule.enabled.then_some(probers)),
        };

        match admitted {
            Ok(Admitted::Indexed) => {}
            Ok(Admitted::Quarantined(dst)) => {
                OutputFormatter::warning(&format!(
                    "Broken {} moved to {}",
                    name,
                    dst.strip_prefix(&self.root).unwrap_or(&dst).display()
                ));
            }
            Err(e) => warn!(path = %path.display(), error = %e, "skipping file"),
        }
    }

    /// Manager over the same root and context holding `lists`.
    fn derive(&self, lists: BTreeMap<Category, FileList>) -> Manager {
        Manager {
            root: self.root.clone(),
            config: self.config.clone(),
            lists,
            context: Rc::clone(&self.context),
            assume_yes: self.assume_yes,
        }
    }

    fn derive_with(&self, select: impl Fn(&FileList) -> FileList) -> Manager {
        self.derive(
            self.lists
                .iter()
                .map(|(category, list)| (*category, select(list)))
                .collect(),
        )
    }

    /// Skips confirmation before mutating moves.
    pub fn set_assume_yes(&mut self, assume_yes: bool) {
        self.assume_yes = assume_yes;
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn context(&self) -> &Rc<Context> {
        &self.context
    }

    // Accessors

    pub fn list(&self, category: Category) -> &FileList {
        &self.lists[&category]
    }

    pub fn list_mut(&mut self, category: Category) -> &mut FileList {
        self.lists
            .entry(category)
            .or_insert_with(|| FileList::new(category))
    }

    pub fn videos(&self) -> &FileList {
        self.list(Category::Video)
    }

    pub fn images(&self) -> &FileList {
        self.list(Category::Image)
    }

    pub fn audios(&self) -> &FileList {
        self.list(Category::Audio)
    }

    pub fn documents(&self) -> &FileList {
        self.list(Category::Document)
    }

    pub fn archives(&self) -> &FileList {
        self.list(Category::Archive)
    }

    pub fn others(&self) -> &FileList {
        self.list(Category::Unset)
    }

    /// Total number of records across categories.
    pub fn len(&self) -> usize {
        self.lists.values().map(FileList::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Queries

    /// Distinct modification dates across categories, ascending.
    pub fn mdates(&self) -> Vec<NaiveDate> {
        self.lists
            .values()
            .flat_map(|list| list.mdates())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Number of files per modification date, ascending.
    pub fn date_counts(&self) -> Vec<(NaiveDate, usize)> {
        let mut counts: BTreeMap<NaiveDate, usize> = BTreeMap::new();
        for record in self.lists.values().flat_map(|list| list.iter()) {
            *counts.entry(record.mdate()).or_default() += 1;
        }
        counts.into_iter().collect()
    }

    pub fn by_mdate(&self, date: NaiveDate) -> Manager {
        self.by_mdates(&[date])
    }

    /// Files modified on any of `dates`, in every category.
    pub fn by_mdates(&self, dates: &[NaiveDate]) -> Manager {
        let manager = self.derive_with(|list| list.select_dates(dates, false));
        if manager.is_empty() {
            warn!(dates = dates.len(), "no files found for the given dates");
        }
        manager
    }

    /// Files below `folder`, absolute or relative to the root.
    pub fn by_folder(&self, folder: impl AsRef<Path>) -> Manager {
        let folder = self.root.join(folder.as_ref());
        let prefix = folder.to_string_lossy();
        self.derive_with(|list| list.by_folder(&prefix))
    }

    // Operations

    /// Probes every media list, quarantining newly broken files.
    pub fn probe(&mut self, force: bool) -> ProbeReport {
        let context = Rc::clone(&self.context);
        let mut report = ProbeReport::default();
        for category in [Category::Video, Category::Audio, Category::Image] {
            if let Some(list) = self.lists.get_mut(&category) {
                let partial = list.probe(context.probers(), force, context.progress);
                report.probed += partial.probed;
                report.quarantined.extend(partial.quarantined);
                report.failures.extend(partial.failures);
            }
        }
        info!(probed = report.probed, quarantined = report.quarantined.len(), "probe finished");
        report
    }

    fn confirmed(&self, dry_run: bool, question: &str) -> bool {
        dry_run || self.assume_yes || self.context.confirm.confirm(question)
    }

    /// Moves every file into its category's layout.
    ///
    /// Returns `None` when the operator declines. After a real run the cache
    /// is saved and the moves are journalled for undo, even when a later
    /// category aborted.
    pub fn organize(&mut self, dry_run: bool) -> Result<Option<MoveReport>, ManagerError> {
        if !self.confirmed(dry_run, &format!("Organize {} files?", self.len())) {
            info!("organize declined");
            return Ok(None);
        }

        let context = Rc::clone(&self.context);
        let mut report = MoveReport::new(dry_run);
        for category in Category::ALL {
            let Some(list) = self.lists.get_mut(&category) else {
                continue;
            };
            match list.organize(context.resolver.as_ref(), dry_run) {
                Ok(partial) => report.merge(partial),
                Err(e) => {
                    self.finish_moves(&mut report)?;
                    OutputFormatter::cache_conflicts(&report.cache_conflicts);
                    return Err(e.into());
                }
            }
        }
        self.finish_moves(&mut report)?;
        Ok(Some(report))
    }

    /// Moves every file, whatever its category, into `folder`.
    pub fn move_all_to(
        &mut self,
        folder: impl AsRef<Path>,
        dry_run: bool,
    ) -> Result<Option<MoveReport>, ManagerError> {
        let folder = folder.as_ref();
        let question = format!("Move {} files to {}?", self.len(), folder.display());
        if !self.confirmed(dry_run, &question) {
            info!("move declined");
            return Ok(None);
        }

        let context = Rc::clone(&self.context);
        let mut report = MoveReport::new(dry_run);
        for category in Category::ALL {
            let Some(list) = self.lists.get_mut(&category) else {
                continue;
            };
            match list.move_to(folder, context.resolver.as_ref(), dry_run) {
                Ok(partial) => report.merge(partial),
                Err(e) => {
                    self.finish_moves(&mut report)?;
                    OutputFormatter::cache_conflicts(&report.cache_conflicts);
                    return Err(e.into());
                }
            }
        }
        self.finish_moves(&mut report)?;
        Ok(Some(report))
    }

    fn finish_moves(&self, report: &mut MoveReport) -> Result<(), ManagerError> {
        if report.dry_run {
            return Ok(());
        }
        report.cache_conflicts = self.save_cache()?;
        if !report.moved.is_empty() {
            let mut log = OperationLog::new(self.root.clone());
            log.operations = report.moved.clone();
            log.save(&self.root)?;
            debug!(moves = log.operations.len(), "journal written");
        }
        Ok(())
    }

    /// Writes every record to the cache partition of the root.
    ///
    /// Entries that changed since they were cached are returned; the new
    /// values are stored regardless.
    pub fn save_cache(&self) -> Result<Vec<CacheConflict>, ManagerError> {
        let entries: Partition = self
            .lists
            .values()
            .flat_map(|list| list.to_cache(&self.root))
            .collect();
        let conflicts = self
            .context
            .cache
            .borrow_mut()
            .merge_and_save(&self.root, entries)?;
        Ok(conflicts)
    }

    /// Count tables for every non-empty category.
    pub fn summary(&self) -> Vec<Summary> {
        self.lists
            .values()
            .filter(|list| !list.is_empty())
            .map(FileList::summary)
            .collect()
    }

    /// Opens files of `category` in the configured viewer, returning how
    /// many were handed over.
    pub fn open(
        &self,
        category: Category,
        top: Option<usize>,
        random: bool,
    ) -> Result<usize, ManagerError> {
        let command = self.config.viewer.command(category);
        if command.is_empty() {
            return Err(ManagerError::NoViewer(category));
        }

        let paths = self.list(category).paths_to_open(top, random);
        if paths.is_empty() {
            return Ok(0);
        }
        self.context.launcher.borrow_mut().launch(command, &paths)?;
        Ok(paths.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_organizer::CollisionChoice;
    use crate::media::{LengthBucket, Orientation};
    use crate::probe::{MediaProbe, StreamInfo, StreamKind, TableClassifier, TableProber};
    use crate::prompt::FixedAnswers;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    fn clip(duration: f64, width: u32, height: u32) -> MediaProbe {
        MediaProbe {
            streams: vec![StreamInfo::new(StreamKind::Video, Some(duration)).with_size(width, height)],
        }
    }

    fn context(cache_dir: &TempDir, prober: TableProber, confirm: bool) -> Rc<Context> {
        let answers = FixedAnswers::new(CollisionChoice::Rename, confirm);
        Rc::new(
            Context::new(CacheStore::empty(cache_dir.path().join("cache.json")))
                .with_prober(prober)
                .with_classifier(TableClassifier::new())
                .with_resolver(answers)
                .with_confirm(answers),
        )
    }

    fn write(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, name).expect("Failed to write test file");
        path
    }

    fn set_mtime(path: &Path, days_ago: u64) {
        let when = SystemTime::now() - Duration::from_secs(days_ago * 86_400);
        fs::File::options()
            .write(true)
            .open(path)
            .and_then(|f| f.set_modified(when))
            .expect("Failed to set mtime");
    }

    #[test]
    fn test_load_missing_root() {
        let cache_dir = TempDir::new().unwrap();
        let result = Manager::load(
            "/non/existent/media",
            Config::default(),
            context(&cache_dir, TableProber::new(), true),
        );
        assert!(matches!(result, Err(ManagerError::NotFound(_))));
    }

    #[test]
    fn test_load_sorts_files_by_category() {
        let root = TempDir::new().unwrap();
        let cache_dir = TempDir::new().unwrap();
        for name in ["clip.mp4", "song.mp3", "pic.png", "notes.txt", "pack.zip", "README"] {
            write(root.path(), name);
        }
        let mut config = Config::default();
        config.probe.disable_probing();

        let manager =
            Manager::load(root.path(), config, context(&cache_dir, TableProber::new(), true)).unwrap();

        assert_eq!(manager.len(), 6);
        for category in Category::ALL {
            assert_eq!(manager.list(category).len(), 1, "{}", category);
        }
        assert!(!manager.videos().records()[0].probed());
    }

    #[test]
    fn test_load_prunes_hidden_and_hash_dirs_when_recursive() {
        let root = TempDir::new().unwrap();
        let cache_dir = TempDir::new().unwrap();
        write(root.path(), "top.txt");
        write(root.path(), "sub/inner.txt");
        write(root.path(), ".hidden/secret.txt");
        write(root.path(), "#trash/old.txt");
        write(root.path(), "_/kept.txt");
        write(root.path(), ".dotfile.txt");

        let mut config = Config::default();
        config.scan.recursive = true;
        let manager = Manager::load(root.path(), config.clone(), context(&cache_dir, TableProber::new(), true))
            .unwrap();
        let mut names: Vec<&str> = manager.documents().iter().map(|r| r.name()).collect();
        names.sort();
        assert_eq!(names, vec!["inner.txt", "kept.txt", "top.txt"]);

        config.scan.recursive = false;
        let flat =
            Manager::load(root.path(), config, context(&cache_dir, TableProber::new(), true)).unwrap();
        assert_eq!(flat.documents().len(), 1);
    }

    #[test]
    fn test_broken_video_is_quarantined_on_load() {
        let root = TempDir::new().unwrap();
        let cache_dir = TempDir::new().unwrap();
        write(root.path(), "bad.mp4");

        let manager =
            Manager::load(root.path(), Config::default(), context(&cache_dir, TableProber::new(), true))
                .unwrap();

        assert!(manager.videos().is_empty());
        assert!(root.path().join("@broken-videos").join("bad.mp4").exists());
        assert!(!root.path().join("bad.mp4").exists());
    }

    #[test]
    fn test_fresh_cache_entries_skip_probing() {
        let root = TempDir::new().unwrap();
        let cache_dir = TempDir::new().unwrap();
        write(root.path(), "clip.mp4");
        let prober = TableProber::new().with("clip.mp4", clip(400.0, 1080, 1920));

        let ctx = context(&cache_dir, prober, true);
        let manager = Manager::load(root.path(), Config::default(), Rc::clone(&ctx)).unwrap();
        assert!(manager.save_cache().unwrap().is_empty());
        assert_eq!(ctx.cached_entries(), 1);

        // A prober that knows nothing would mark the clip broken.
        let reloaded = CacheStore::load(cache_dir.path().join("cache.json")).unwrap();
        let ctx = Rc::new(
            Context::new(reloaded)
                .with_prober(TableProber::new())
                .with_classifier(TableClassifier::new()),
        );
        let manager = Manager::load(root.path(), Config::default(), ctx).unwrap();
        let record = &manager.videos().records()[0];
        assert_eq!(record.length(), Some(LengthBucket::Medium));
        assert_eq!(record.orientation(), Some(Orientation::Portrait));
    }

    #[test]
    fn test_stale_cache_entry_is_rebuilt_and_reported() {
        let root = TempDir::new().unwrap();
        let cache_dir = TempDir::new().unwrap();
        let path = write(root.path(), "notes.txt");

        let ctx = context(&cache_dir, TableProber::new(), true);
        Manager::load(root.path(), Config::default(), Rc::clone(&ctx))
            .unwrap()
            .save_cache()
            .unwrap();

        fs::write(&path, "a longer body than before").unwrap();
        let manager = Manager::load(root.path(), Config::default(), Rc::clone(&ctx)).unwrap();
        assert_eq!(manager.documents().records()[0].size(), 25);

        let conflicts = manager.save_cache().unwrap();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].key, "notes.txt");
        assert!(conflicts[0].diffs.iter().any(|d| d.field == "size"));
    }

    #[test]
    fn test_organize_reports_stale_cache_entries() {
        let root = TempDir::new().unwrap();
        let cache_dir = TempDir::new().unwrap();
        let path = write(root.path(), "notes.txt");

        let ctx = context(&cache_dir, TableProber::new(), true);
        Manager::load(root.path(), Config::default(), Rc::clone(&ctx))
            .unwrap()
            .save_cache()
            .unwrap();

        fs::write(&path, "a longer body than before").unwrap();
        let mut config = Config::default();
        config.organize.document = PathBuf::from(".");
        let mut manager = Manager::load(root.path(), config, Rc::clone(&ctx)).unwrap();

        let report = manager.organize(false).unwrap().unwrap();
        assert_eq!(report.unchanged, 1);
        assert_eq!(report.cache_conflicts.len(), 1);
        assert_eq!(report.cache_conflicts[0].key, "notes.txt");
        assert!(report.cache_conflicts[0].diffs.iter().any(|d| d.field == "size"));
    }

    #[test]
    fn test_dry_run_organize_reports_no_cache_conflicts() {
        let root = TempDir::new().unwrap();
        let cache_dir = TempDir::new().unwrap();
        let path = write(root.path(), "notes.txt");

        let ctx = context(&cache_dir, TableProber::new(), true);
        Manager::load(root.path(), Config::default(), Rc::clone(&ctx))
            .unwrap()
            .save_cache()
            .unwrap();

        fs::write(&path, "a longer body than before").unwrap();
        let mut manager = Manager::load(root.path(), Config::default(), Rc::clone(&ctx)).unwrap();
        let report = manager.organize(true).unwrap().unwrap();
        assert!(report.cache_conflicts.is_empty());
        assert_eq!(manager.save_cache().unwrap().len(), 1);
    }

    #[test]
    fn test_by_mdates_and_dates() {
        let root = TempDir::new().unwrap();
        let cache_dir = TempDir::new().unwrap();
        let old = write(root.path(), "old.txt");
        write(root.path(), "new.txt");
        write(root.path(), "new.zip");
        set_mtime(&old, 10);

        let manager =
            Manager::load(root.path(), Config::default(), context(&cache_dir, TableProber::new(), true))
                .unwrap();
        let dates = manager.mdates();
        assert_eq!(dates.len(), 2);
        assert_eq!(manager.date_counts(), vec![(dates[0], 1), (dates[1], 2)]);

        let recent = manager.by_mdate(dates[1]);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent.archives().len(), 1);
        assert!(manager.by_mdates(&[]).is_empty());
    }

    #[test]
    fn test_by_folder_relative_to_root() {
        let root = TempDir::new().unwrap();
        let cache_dir = TempDir::new().unwrap();
        write(root.path(), "a/one.txt");
        write(root.path(), "b/two.txt");
        let mut config = Config::default();
        config.scan.recursive = true;

        let manager =
            Manager::load(root.path(), config, context(&cache_dir, TableProber::new(), true)).unwrap();
        let only_a = manager.by_folder("a");
        assert_eq!(only_a.len(), 1);
        assert_eq!(only_a.documents().records()[0].name(), "one.txt");
    }

    #[test]
    fn test_organize_declined_changes_nothing() {
        let root = TempDir::new().unwrap();
        let cache_dir = TempDir::new().unwrap();
        let path = write(root.path(), "notes.txt");

        let mut manager =
            Manager::load(root.path(), Config::default(), context(&cache_dir, TableProber::new(), false))
                .unwrap();
        assert!(manager.organize(false).unwrap().is_none());
        assert!(path.exists());
        assert!(OperationLog::load(root.path()).unwrap().is_none());
    }

    #[test]
    fn test_organize_journals_and_caches_moves() {
        let root = TempDir::new().unwrap();
        let cache_dir = TempDir::new().unwrap();
        write(root.path(), "notes.txt");
        write(root.path(), "pack.zip");

        let ctx = context(&cache_dir, TableProber::new(), true);
        let mut manager = Manager::load(root.path(), Config::default(), Rc::clone(&ctx)).unwrap();
        let report = manager.organize(false).unwrap().unwrap();

        assert_eq!(report.moved.len(), 2);
        assert!(root.path().join("@document").join("notes.txt").exists());
        assert!(root.path().join("@archive").join("pack.zip").exists());
        let log = OperationLog::load(root.path()).unwrap().unwrap();
        assert_eq!(log.operations.len(), 2);
        assert_eq!(ctx.cached_entries(), 2);
    }

    #[test]
    fn test_move_all_dry_run_creates_nothing() {
        let root = TempDir::new().unwrap();
        let cache_dir = TempDir::new().unwrap();
        write(root.path(), "notes.txt");
        write(root.path(), "song.mp3");
        let mut config = Config::default();
        config.probe.disable_probing();

        let mut manager =
            Manager::load(root.path(), config, context(&cache_dir, TableProber::new(), false)).unwrap();
        let report = manager.move_all_to("inbox", true).unwrap().unwrap();

        assert_eq!(report.moved.len(), 2);
        assert!(!root.path().join("inbox").exists());
        assert!(OperationLog::load(root.path()).unwrap().is_none());
    }

    #[test]
    fn test_open_without_viewer() {
        let root = TempDir::new().unwrap();
        let cache_dir = TempDir::new().unwrap();
        let manager =
            Manager::load(root.path(), Config::default(), context(&cache_dir, TableProber::new(), true))
                .unwrap();
        assert!(matches!(
            manager.open(Category::Document, None, false),
            Err(ManagerError::NoViewer(Category::Document))
        ));
        assert_eq!(manager.open(Category::Video, Some(3), false).unwrap(), 0);
    }
}

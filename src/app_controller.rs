use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::app_config::Config;
use crate::cache::{CacheStats, CacheStore, DatabaseConnection, FetchCache, MemoryCacheStore, SqliteCacheStore};
use crate::document::{CharacterRecord, DocumentSpec, DocumentWriter, DocxWriter, Section, assemble};
use crate::errors::{AppError, RetrievalError};
use crate::file_utils::{FileManager, MEMORY_SUFFIX, STORY_SUFFIX};
use crate::retrieval::{DirectoryRetriever, HttpRetriever, ListingKind, ScriptRetriever};
use crate::script::{ParseReport, ScriptParser, referenced_characters};

// @module: Application controller for script export

/// What a run exports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    /// Chapter stories
    Story,
    /// Character records
    Memory,
}

impl ExportKind {
    pub fn listing_kind(self) -> ListingKind {
        match self {
            ExportKind::Story => ListingKind::Chapter,
            ExportKind::Memory => ListingKind::Character,
        }
    }

    pub fn file_suffix(self) -> &'static str {
        match self {
            ExportKind::Story => STORY_SUFFIX,
            ExportKind::Memory => MEMORY_SUFFIX,
        }
    }
}

/// One export run as requested on the command line
#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub kind: ExportKind,
    pub names: Vec<String>,
    /// Output directory, or the output file in combined mode when it has the document extension
    pub output: PathBuf,
    pub combined: bool,
    /// Append related character records to story documents
    pub attach_records: bool,
    /// Show progress and write skipped-line reports
    pub verbose: bool,
}

impl ExportRequest {
    pub fn new(kind: ExportKind, names: Vec<String>) -> Self {
        Self { kind, names, output: PathBuf::from("."), combined: false, attach_records: false, verbose: false }
    }
}

/// Outcome of a run
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub requested: usize,
    /// Files written, in request order
    pub written: Vec<PathBuf>,
    /// Names that produced nothing, with the reason
    pub failed: Vec<(String, String)>,
    pub combined_write_failed: bool,
    pub cache: CacheStats,
}

impl RunSummary {
    /// Process exit status for this outcome
    pub fn exit_code(&self) -> i32 {
        if self.combined_write_failed {
            4
        } else if self.written.is_empty() {
            3
        } else {
            0
        }
    }
}

/// A parsed script with its title
#[derive(Debug, Clone)]
struct LoadedUnit {
    title: String,
    report: ParseReport,
}

/// All parsed scripts for one requested name
#[derive(Debug, Clone)]
struct LoadedName {
    name: String,
    units: Vec<LoadedUnit>,
}

/// Main application controller
pub struct Controller {
    // @field: App configuration
    config: Config,
    retriever: Arc<dyn ScriptRetriever>,
    cache: FetchCache,
    writer: Arc<dyn DocumentWriter>,
    parser: ScriptParser,
}

impl Controller {
    // @method: Create a controller with the retriever and cache store the configuration selects
    pub fn with_config(config: Config) -> Result<Self> {
        let retriever: Arc<dyn ScriptRetriever> = match &config.fetch.source_dir {
            Some(dir) => {
                info!("Reading scripts from {:?}", dir);
                Arc::new(DirectoryRetriever::new(dir))
            }
            None => Arc::new(HttpRetriever::from_config(&config.fetch).context("Failed to create HTTP client")?),
        };

        let store: Arc<dyn CacheStore> = if config.cache.enabled && retriever.cacheable() {
            let db = match &config.cache.path {
                Some(path) => DatabaseConnection::new(path)?,
                None => DatabaseConnection::new_default()?,
            };
            Arc::new(SqliteCacheStore::new(db))
        } else {
            debug!("Fetch cache not used for this source; using an in-memory store");
            Arc::new(MemoryCacheStore::new())
        };

        Ok(Self::with_parts(config, retriever, store, Arc::new(DocxWriter::new())))
    }

    // @method: Create a controller from explicit collaborators
    pub fn with_parts(
        config: Config,
        retriever: Arc<dyn ScriptRetriever>,
        store: Arc<dyn CacheStore>,
        writer: Arc<dyn DocumentWriter>,
    ) -> Self {
        Self { config, retriever, cache: FetchCache::new(store, false), writer, parser: ScriptParser::new() }
    }

    /// Bypass cached records and overwrite them with fresh fetches
    pub fn with_force_refresh(self, force_refresh: bool) -> Self {
        let cache = FetchCache::new(self.cache.store().clone(), force_refresh);
        Self { cache, ..self }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run one export
    pub async fn run(&self, request: &ExportRequest) -> Result<RunSummary> {
        let start_time = std::time::Instant::now();
        let mut summary = RunSummary { requested: request.names.len(), ..RunSummary::default() };

        info!("Exporting {} {} name(s)", request.names.len(), request.kind.listing_kind());

        let progress = Self::progress_bar(request.names.len() as u64, request.verbose);
        progress.set_message("Fetching");
        let results = self.load_names(request.kind.listing_kind(), &request.names, &progress).await;
        progress.finish_with_message("Fetched");

        let mut loaded = Vec::new();
        for (name, result) in results {
            match result {
                Ok(entry) => loaded.push(entry),
                Err(e) => {
                    warn!("Skipping '{}': {}", name, e);
                    summary.failed.push((name, e.to_string()));
                }
            }
        }

        let records = if request.kind == ExportKind::Story && request.attach_records {
            self.load_records(&loaded, request.verbose).await
        } else {
            Vec::new()
        };

        if request.combined {
            if !loaded.is_empty() {
                let path = self.combined_path(request);
                let spec = self.combined_spec(request.kind, &loaded, &records);
                match self.write_document(&spec, &path, &loaded, request.verbose) {
                    Ok(()) => summary.written.push(path),
                    Err(e) => {
                        error!("{}", e);
                        summary.combined_write_failed = true;
                    }
                }
            }
        } else {
            FileManager::ensure_dir(&request.output)?;
            for entry in &loaded {
                let path = FileManager::output_path(
                    &request.output,
                    &entry.name,
                    request.kind.file_suffix(),
                    self.writer.extension(),
                );
                let spec = self.single_spec(request.kind, entry, &records);
                match self.write_document(&spec, &path, std::slice::from_ref(entry), request.verbose) {
                    Ok(()) => summary.written.push(path),
                    Err(e) => {
                        error!("{}", e);
                        summary.failed.push((entry.name.clone(), e.to_string()));
                    }
                }
            }
        }

        summary.cache = self.cache.stats();
        info!(
            "Export completed in {}: {} file(s) written, {} failure(s)",
            Self::format_duration(start_time.elapsed()),
            summary.written.len(),
            summary.failed.len()
        );
        info!("Fetch cache: {}", summary.cache);

        Ok(summary)
    }

    /// Load names with bounded concurrency; results keep request order
    async fn load_names(
        &self,
        kind: ListingKind,
        names: &[String],
        progress: &ProgressBar,
    ) -> Vec<(String, Result<LoadedName, AppError>)> {
        let concurrency = self.config.fetch.concurrent_requests.max(1);

        stream::iter(names.iter().cloned())
            .map(|name| async move {
                let result = self.load_name(kind, &name).await;
                (name, result)
            })
            .buffered(concurrency)
            .inspect(|(name, _)| {
                progress.set_message(name.clone());
                progress.inc(1);
            })
            .collect()
            .await
    }

    async fn load_name(&self, kind: ListingKind, name: &str) -> Result<LoadedName, AppError> {
        let listing = self.cache.listing(self.retriever.as_ref(), kind, name).await?;
        debug!("'{}' lists {} script(s)", name, listing.entries.len());

        let mut units = Vec::new();
        let mut last_error = None;

        for entry in &listing.entries {
            match self.cache.script(self.retriever.as_ref(), entry, &self.parser).await {
                Ok(report) if report.unit.is_empty() => {
                    warn!("Entry '{}' of '{}' is empty, skipped", entry.title, name);
                }
                Ok(report) => {
                    if report.ambiguous > 0 {
                        debug!("Entry '{}' had {} ambiguous line(s)", entry.title, report.ambiguous);
                    }
                    units.push(LoadedUnit { title: entry.title.clone(), report });
                }
                Err(e) => {
                    warn!("Entry '{}' of '{}' failed: {}", entry.title, name, e);
                    last_error = Some(e);
                }
            }
        }

        if units.is_empty() {
            return Err(last_error.unwrap_or_else(|| {
                AppError::Retrieval(RetrievalError::InvalidResponse {
                    name: name.to_string(),
                    message: "no entry produced any content".to_string(),
                })
            }));
        }

        Ok(LoadedName { name: name.to_string(), units })
    }

    /// Character records for every speaker in `loaded`; failures only log
    async fn load_records(&self, loaded: &[LoadedName], verbose: bool) -> Vec<CharacterRecord> {
        let characters = referenced_characters(loaded.iter().flat_map(|l| l.units.iter().map(|u| &u.report.unit)));
        if characters.is_empty() {
            return Vec::new();
        }
        info!("Looking up records for {} character(s)", characters.len());

        let progress = Self::progress_bar(characters.len() as u64, verbose);
        let results = self.load_names(ListingKind::Character, &characters, &progress).await;
        progress.finish_and_clear();

        let mut records = Vec::new();
        for (name, result) in results {
            match result {
                Ok(entry) => {
                    for unit in entry.units {
                        records.push(CharacterRecord::new(&name, unit.title, unit.report.unit));
                    }
                }
                Err(AppError::Retrieval(RetrievalError::NotFound(_))) => debug!("No records for '{}'", name),
                Err(e) => warn!("Records for '{}' unavailable: {}", name, e),
            }
        }
        records
    }

    fn single_spec(&self, kind: ExportKind, entry: &LoadedName, records: &[CharacterRecord]) -> DocumentSpec {
        let sections = entry.units.iter().map(|u| Section::new(&u.title, u.report.unit.clone())).collect();
        let mut spec = DocumentSpec::new(self.config.document.clone()).with_sections(sections);
        if kind == ExportKind::Story {
            spec = spec.with_main_title(&entry.name);
            if !records.is_empty() {
                spec = spec.with_appendix(records.to_vec());
            }
        }
        spec
    }

    fn combined_spec(&self, kind: ExportKind, loaded: &[LoadedName], records: &[CharacterRecord]) -> DocumentSpec {
        let sections = loaded
            .iter()
            .flat_map(|entry| {
                entry
                    .units
                    .iter()
                    .map(move |u| Section::new(format!("{}：{}", entry.name, u.title), u.report.unit.clone()))
            })
            .collect();
        let mut spec = DocumentSpec::new(self.config.document.clone()).with_sections(sections);
        if kind == ExportKind::Story {
            if let Some(first) = loaded.first() {
                spec = spec.with_main_title(&first.name);
            }
            if !records.is_empty() {
                spec = spec.with_appendix(records.to_vec());
            }
        }
        spec
    }

    fn combined_path(&self, request: &ExportRequest) -> PathBuf {
        let extension = self.writer.extension();
        let is_file = request
            .output
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(extension));
        if is_file {
            request.output.clone()
        } else {
            FileManager::combined_output_path(&request.output, request.kind.file_suffix(), extension)
        }
    }

    fn write_document(&self, spec: &DocumentSpec, path: &Path, sources: &[LoadedName], verbose: bool) -> Result<(), AppError> {
        let document = assemble(spec);
        self.writer.write(&document, path)?;
        info!("Success: {}", path.display());

        if verbose {
            self.write_skipped_report(path, sources);
        }
        Ok(())
    }

    // @creates: `<output>.skipped.txt` listing directive lines that produced no element
    fn write_skipped_report(&self, output: &Path, sources: &[LoadedName]) {
        let mut report = String::new();
        for source in sources {
            for unit in &source.units {
                for line in &unit.report.skipped {
                    report.push_str(&format!("{}\t{}\t{}\t{}\n", source.name, unit.title, line.index + 1, line.text));
                }
            }
        }
        if report.is_empty() {
            return;
        }

        let path = FileManager::skipped_report_path(output);
        match FileManager::write_to_file(&path, &report) {
            Ok(()) => debug!("Skipped lines written to {}", path.display()),
            Err(e) => warn!("Could not write skipped-line report: {}", e),
        }
    }

    fn progress_bar(len: u64, visible: bool) -> ProgressBar {
        if !visible {
            return ProgressBar::hidden();
        }
        let progress_bar = ProgressBar::new(len);
        let template_result = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} names ({percent}%) {msg}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(template_result.progress_chars("█▓▒░"));
        progress_bar
    }

    fn format_duration(duration: std::time::Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}

//! Per-file cache of compiled operations
//!
//! Each source file maps to the descriptors it produced last time plus the
//! BLAKE3 hash of the text they came from. Reprocessing an unchanged file is a
//! no-op; a changed file has its entry replaced wholesale, so operations that
//! disappeared from the file disappear from the manifest too.

use crate::descriptor::compile_document;
use crate::errors::CompileError;
use crate::extract::{has_document_marker, DocumentExtractor};
use globset::{GlobBuilder, GlobMatcher};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::Instant;
use toolgraph_config::ProjectConfig;
use toolgraph_logger as logger;
use toolgraph_manifest::OperationDescriptor;
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

/// Operations last compiled from one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub file: PathBuf,
    pub content_hash: String,
    pub operations: Vec<OperationDescriptor>,
}

/// What processing a file did to the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    /// No GraphQL marker in the file
    Skipped,
    /// Content hash matched the cached entry
    Unchanged,
    /// Entry replaced with this many operations
    Updated { operations: usize },
    /// File is gone, or lost its last document, and its entry was dropped
    Removed,
}

/// Counters for a full scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub files_seen: usize,
    pub files_updated: usize,
    pub files_unchanged: usize,
    pub entries_pruned: usize,
}

/// Glob over root-relative source paths
#[derive(Debug, Clone)]
pub struct IncludeFilter {
    matcher: GlobMatcher,
}

impl IncludeFilter {
    pub fn new(pattern: &str) -> Result<Self, CompileError> {
        let glob = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .map_err(|source| CompileError::InvalidGlob {
                pattern: pattern.to_string(),
                source,
            })?;
        Ok(Self {
            matcher: glob.compile_matcher(),
        })
    }

    /// Filter for the project's configured `include` glob
    pub fn for_project(config: &ProjectConfig) -> Result<Self, CompileError> {
        Self::new(&config.include)
    }

    pub fn matches(&self, relative: &Path) -> bool {
        self.matcher.is_match(relative)
    }
}

#[derive(Debug, Default)]
pub struct SourceCache {
    entries: BTreeMap<PathBuf, CacheEntry>,
}

impl SourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn is_ignored_dir(entry: &DirEntry) -> bool {
        if !entry.file_type().is_dir() || entry.depth() == 0 {
            return false;
        }

        matches!(
            entry.file_name().to_string_lossy().as_ref(),
            ".git"
                | ".hg"
                | ".svn"
                | "node_modules"
                | "target"
                | "dist"
                | "build"
                | "coverage"
                | ".next"
                | ".turbo"
                | ".cache"
        )
    }

    fn relative_key(root: &Path, path: &Path) -> PathBuf {
        path.strip_prefix(root).unwrap_or(path).to_path_buf()
    }

    /// Compile one file into the cache
    ///
    /// On error the previous entry for the file is left as it was.
    pub fn process_file<E: DocumentExtractor + ?Sized>(
        &mut self,
        root: &Path,
        path: &Path,
        extractor: &E,
    ) -> Result<FileOutcome, CompileError> {
        let key = Self::relative_key(root, path);
        let absolute = root.join(&key);

        let text = match std::fs::read_to_string(&absolute) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(if self.entries.remove(&key).is_some() {
                    debug!("Dropped cache entry for deleted file {:?}", key);
                    FileOutcome::Removed
                } else {
                    FileOutcome::Skipped
                });
            }
            Err(source) => {
                return Err(CompileError::Io {
                    path: absolute,
                    source,
                })
            }
        };

        if !has_document_marker(&text) {
            return Ok(if self.entries.remove(&key).is_some() {
                FileOutcome::Removed
            } else {
                FileOutcome::Skipped
            });
        }

        let content_hash = blake3::hash(text.as_bytes()).to_hex().to_string();
        if self
            .entries
            .get(&key)
            .is_some_and(|entry| entry.content_hash == content_hash)
        {
            return Ok(FileOutcome::Unchanged);
        }

        let operations = Self::compile_text(&absolute, &text, extractor)
            .map_err(|e| e.in_file(key.clone()))?;
        let count = operations.len();
        debug!("Compiled {} operations from {:?}", count, key);

        self.entries.insert(
            key.clone(),
            CacheEntry {
                file: key,
                content_hash,
                operations,
            },
        );
        Ok(FileOutcome::Updated { operations: count })
    }

    fn compile_text<E: DocumentExtractor + ?Sized>(
        path: &Path,
        text: &str,
        extractor: &E,
    ) -> Result<Vec<OperationDescriptor>, CompileError> {
        let mut operations = Vec::new();
        for document in extractor.extract(path, text)? {
            if let Some(descriptor) = compile_document(&document.source)? {
                operations.push(descriptor);
            }
        }
        Ok(operations)
    }

    /// Walk `root`, process every file the filter accepts and prune entries
    /// for files that no longer exist
    pub fn scan<E: DocumentExtractor + ?Sized>(
        &mut self,
        root: &Path,
        filter: &IncludeFilter,
        extractor: &E,
    ) -> Result<ScanSummary, CompileError> {
        let start = Instant::now();
        let mut summary = ScanSummary::default();
        let mut seen = BTreeSet::new();

        for entry in WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !Self::is_ignored_dir(entry))
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
        {
            let key = Self::relative_key(root, entry.path());
            if !filter.matches(&key) {
                continue;
            }
            summary.files_seen += 1;

            match self.process_file(root, &key, extractor)? {
                FileOutcome::Updated { .. } => summary.files_updated += 1,
                FileOutcome::Unchanged => summary.files_unchanged += 1,
                FileOutcome::Skipped | FileOutcome::Removed => {}
            }
            seen.insert(key);
        }

        let before = self.entries.len();
        self.entries.retain(|key, _| seen.contains(key));
        summary.entries_pruned = before - self.entries.len();

        logger::debug(&format!(
            "Scanned {} files under {} in {:.2}ms ({} updated, {} unchanged, {} pruned)",
            summary.files_seen,
            root.display(),
            start.elapsed().as_secs_f64() * 1000.0,
            summary.files_updated,
            summary.files_unchanged,
            summary.entries_pruned,
        ));
        Ok(summary)
    }

    /// All cached descriptors, in path order then source order
    pub fn operations(&self) -> impl Iterator<Item = &OperationDescriptor> {
        self.entries.values().flat_map(|entry| entry.operations.iter())
    }

    pub fn entry(&self, relative: &Path) -> Option<&CacheEntry> {
        self.entries.get(relative)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

use anyhow::Result;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use super::RevisionSource;
use crate::contest::RawRevision;
use crate::storage::{load_json, load_json_or_default, save_json};
use crate::wikisource::{page_title, QueryResponse};

/// On-disk page cache: book -> page number -> API response.
pub type PageCache = BTreeMap<String, BTreeMap<String, QueryResponse>>;

/// Replays revisions from a JSON cache file, falling back to `inner` on a
/// miss and recording what it fetched.
///
/// New entries are only written to disk by [`CachedSource::flush`].
pub struct CachedSource<S> {
    inner: S,
    path: PathBuf,
    cache: Mutex<PageCache>,
    dirty: AtomicBool,
}

impl<S> CachedSource<S> {
    /// Load the cache at `path` (a missing file is an empty cache).
    pub fn open(inner: S, path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let cache: PageCache = load_json_or_default(&path)?;
        tracing::debug!("Loaded page cache {} ({} books)", path.display(), cache.len());
        Ok(Self {
            inner,
            path,
            cache: Mutex::new(cache),
            dirty: AtomicBool::new(false),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lookup(&self, book: &str, page: u32) -> Option<QueryResponse> {
        let cache = self.cache.lock().unwrap();
        cache.get(book)?.get(&page.to_string()).cloned()
    }

    fn record(&self, book: &str, page: u32, revisions: Option<Vec<RawRevision>>) {
        let response = QueryResponse::for_page(&page_title(book, page), revisions);
        let mut cache = self.cache.lock().unwrap();
        cache
            .entry(book.to_string())
            .or_default()
            .insert(page.to_string(), response);
        self.dirty.store(true, Ordering::Relaxed);
    }

    /// Persist new entries, if any.
    pub fn flush(&self) -> Result<()> {
        if !self.dirty.swap(false, Ordering::Relaxed) {
            return Ok(());
        }
        let snapshot = self.cache.lock().unwrap().clone();
        if let Err(e) = save_json(&self.path, &snapshot) {
            self.dirty.store(true, Ordering::Relaxed);
            return Err(e);
        }
        Ok(())
    }
}

impl<S: RevisionSource + Sync> RevisionSource for CachedSource<S> {
    async fn fetch_revisions(&self, book: &str, page: u32) -> Result<Option<Vec<RawRevision>>> {
        if let Some(response) = self.lookup(book, page) {
            tracing::debug!("Request is cached: {}", page_title(book, page));
            return Ok(response.into_revisions());
        }

        let revisions = self.inner.fetch_revisions(book, page).await?;
        self.record(book, page, revisions.clone());
        Ok(revisions)
    }

    fn checkpoint(&self) -> Result<()> {
        self.flush()
    }
}

/// Merge JSON cache files shaped `{outer: {inner: value}}`.
///
/// Outer keys are unioned; for inner keys present in several files the
/// later file wins. Works for page caches and book-list caches alike.
pub fn merge_cache_files(files: &[PathBuf]) -> Result<BTreeMap<String, BTreeMap<String, Value>>> {
    let mut merged: BTreeMap<String, BTreeMap<String, Value>> = BTreeMap::new();
    for file in files {
        tracing::info!("Merging cache file {}", file.display());
        let part: BTreeMap<String, BTreeMap<String, Value>> = load_json(file)?;
        for (key, entries) in part {
            merged.entry(key).or_default().extend(entries);
        }
    }
    Ok(merged)
}

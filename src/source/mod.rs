//! Where page revisions come from.
//!
//! Scoring only sees [`RevisionSource`]; whether revisions are fetched live
//! or replayed from a cache file is decided once in `main`.

pub mod cache;

pub use cache::{merge_cache_files, CachedSource, PageCache};

use anyhow::Result;
use std::future::Future;

use crate::contest::RawRevision;
use crate::wikisource::{self, page_title, ApiClient};

pub trait RevisionSource {
    /// Revisions of page `page` of `book`, in any order.
    /// `Ok(None)` means the page does not exist.
    fn fetch_revisions(
        &self,
        book: &str,
        page: u32,
    ) -> impl Future<Output = Result<Option<Vec<RawRevision>>>> + Send;

    /// Called after each document is scored.
    fn checkpoint(&self) -> Result<()> {
        Ok(())
    }
}

/// Live revisions from a Wikisource API endpoint.
#[derive(Debug, Clone)]
pub struct WikisourceSource {
    client: ApiClient,
    rvlimit: u32,
}

impl WikisourceSource {
    pub fn new(client: ApiClient, rvlimit: u32) -> Self {
        Self { client, rvlimit }
    }
}

impl RevisionSource for WikisourceSource {
    async fn fetch_revisions(&self, book: &str, page: u32) -> Result<Option<Vec<RawRevision>>> {
        wikisource::fetch_revisions(&self.client, &page_title(book, page), self.rvlimit).await
    }
}

use anyhow::Result;
use std::collections::BTreeMap;
use std::future::Future;
use std::path::Path;

use super::Document;
use crate::storage::{load_json_or_default, save_json};
use crate::wikisource::{fetch_page_count, ApiClient};

/// Key of the page-count table inside the book-list cache file.
pub const BOOKLIST_KEY: &str = "CACHE_BOOKS_LIST";

/// Book-list cache file: `{"CACHE_BOOKS_LIST": {book: page count}}`.
pub type BooklistCache = BTreeMap<String, BTreeMap<String, u32>>;

pub trait PageCounter {
    fn page_count(&self, book: &str) -> impl Future<Output = Result<u32>> + Send;
}

/// Page counts from the Commons file description API.
impl PageCounter for ApiClient {
    async fn page_count(&self, book: &str) -> Result<u32> {
        fetch_page_count(self, book).await
    }
}

/// Pair each book with its page count.
///
/// Counts come from the cache at `cache_path` when known; otherwise they
/// are looked up and the cache is saved right away, so an interrupted run
/// keeps what it already resolved. A failed lookup aborts: scoring a book
/// with an unknown page count would silently undercount it.
pub async fn resolve_documents<C: PageCounter>(
    books: &[String],
    counter: &C,
    cache_path: &Path,
) -> Result<Vec<Document>> {
    let mut cache: BooklistCache = load_json_or_default(cache_path)?;
    let mut documents = Vec::with_capacity(books.len());

    for book in books {
        let known = cache.get(BOOKLIST_KEY).and_then(|counts| counts.get(book)).copied();
        let page_count = match known {
            Some(count) => count,
            None => {
                let count = counter.page_count(book).await?;
                cache
                    .entry(BOOKLIST_KEY.to_string())
                    .or_default()
                    .insert(book.clone(), count);
                save_json(cache_path, &cache)?;
                count
            }
        };
        tracing::debug!(book = %book, pages = page_count, "resolved page count");
        documents.push(Document {
            id: book.clone(),
            page_count,
        });
    }

    Ok(documents)
}

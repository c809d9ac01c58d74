pub mod client;
pub mod types;

pub use client::{create_client, wikisource_api, ApiClient, RetryPolicy, COMMONS_API};
pub use types::QueryResponse;

use anyhow::{Context, Result};

use crate::contest::RawRevision;

/// Title of page `page` of a book in the Page namespace.
pub fn page_title(book: &str, page: u32) -> String {
    format!("Page:{}/{}", book, page)
}

/// Fetch up to `rvlimit` revisions (newest first) of a wiki page, with content.
/// Returns `None` if the page does not exist.
pub async fn fetch_revisions(
    client: &ApiClient,
    title: &str,
    rvlimit: u32,
) -> Result<Option<Vec<RawRevision>>> {
    tracing::info!("Requesting '{}'", title);
    let params = [
        ("action", "query".to_string()),
        ("format", "json".to_string()),
        ("prop", "revisions".to_string()),
        ("titles", title.to_string()),
        ("rvlimit", rvlimit.to_string()),
        ("rvprop", "ids|user|timestamp|content".to_string()),
    ];

    let response = client
        .query(&params)
        .await
        .with_context(|| format!("Failed to fetch revisions of '{}'", title))?;

    Ok(response.into_revisions())
}

/// Number of pages of a multi-page file (djvu/pdf) hosted on Commons.
pub async fn fetch_page_count(commons: &ApiClient, book: &str) -> Result<u32> {
    let title = format!("File:{}", book);
    tracing::info!("Requesting image info for '{}'", title);
    let params = [
        ("action", "query".to_string()),
        ("format", "json".to_string()),
        ("prop", "imageinfo".to_string()),
        ("titles", title.clone()),
        ("iilimit", "50".to_string()),
        ("iiprop", "size".to_string()),
    ];

    let response = commons
        .query(&params)
        .await
        .with_context(|| format!("Failed to fetch image info of '{}'", title))?;

    response
        .page_count()
        .with_context(|| format!("No page count reported for '{}'", title))
}

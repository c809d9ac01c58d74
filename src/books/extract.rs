use anyhow::{Context, Result};
use regex::Regex;
use std::collections::BTreeSet;

use crate::contest::history::parse_api_timestamp;
use crate::contest::{ContestWindow, RawRevision};
use crate::wikisource::{fetch_revisions, ApiClient};

/// Revisions of the rules page worth scanning.
///
/// A full batch (`rvlimit` or more) means the page's history reaches back
/// further than what was fetched, so only revisions saved during the contest
/// (end inclusive) are kept. A short batch is the whole history and is
/// scanned entirely.
pub fn select_revisions<'a>(
    revisions: &'a [RawRevision],
    window: &ContestWindow,
    rvlimit: u32,
) -> Result<Vec<&'a RawRevision>> {
    if revisions.len() < rvlimit as usize {
        return Ok(revisions.iter().collect());
    }

    let mut selected = Vec::new();
    for rev in revisions {
        let timestamp = parse_api_timestamp(&rev.timestamp)?;
        if window.covers(timestamp) {
            selected.push(rev);
        }
    }
    Ok(selected)
}

/// Every `title.ext` matched by `book_re` (groups 1 and 2) in the texts.
pub fn extract_titles<'a>(texts: impl IntoIterator<Item = &'a str>, book_re: &Regex) -> BTreeSet<String> {
    let mut titles = BTreeSet::new();
    for text in texts {
        for caps in book_re.captures_iter(text) {
            if let (Some(title), Some(ext)) = (caps.get(1), caps.get(2)) {
                titles.insert(format!("{}.{}", title.as_str(), ext.as_str()));
            }
        }
    }
    titles
}

/// Fetch the rules page and list the contest books it mentions, sorted.
pub async fn extract_books(
    client: &ApiClient,
    rules_page: &str,
    rvlimit: u32,
    window: &ContestWindow,
    book_re: &Regex,
) -> Result<Vec<String>> {
    let revisions = fetch_revisions(client, rules_page, rvlimit)
        .await?
        .with_context(|| format!("Rules page '{}' does not exist", rules_page))?;

    let selected = select_revisions(&revisions, window, rvlimit)?;
    tracing::info!(
        "Scanning {} of {} revisions of '{}'",
        selected.len(),
        revisions.len(),
        rules_page
    );

    let titles = extract_titles(selected.iter().map(|rev| rev.content.as_str()), book_re);
    Ok(titles.into_iter().collect())
}

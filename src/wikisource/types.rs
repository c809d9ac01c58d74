use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::contest::RawRevision;

/// Body of an `action=query` response.
///
/// Only the parts the contest needs are modelled; everything else the API
/// sends is ignored, so responses cached by older tooling still load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<Query>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Query {
    /// Keyed by page id; "-1" style ids for missing pages
    #[serde(default)]
    pub pages: BTreeMap<String, PageEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revisions: Option<Vec<RawRevision>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imageinfo: Option<Vec<ImageInfo>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagecount: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    pub code: String,
    #[serde(default)]
    pub info: String,
}

impl QueryResponse {
    /// Response shape for a single page, used when recording cache entries.
    pub fn for_page(title: &str, revisions: Option<Vec<RawRevision>>) -> Self {
        let id = if revisions.is_some() { "0" } else { "-1" };
        let entry = PageEntry {
            title: Some(title.to_string()),
            revisions,
            imageinfo: None,
        };
        Self {
            query: Some(Query {
                pages: BTreeMap::from([(id.to_string(), entry)]),
            }),
            error: None,
        }
    }

    fn first_page(&self) -> Option<&PageEntry> {
        self.query.as_ref()?.pages.values().next()
    }

    /// Revisions of the (single) queried page; `None` when the page does not exist.
    pub fn into_revisions(self) -> Option<Vec<RawRevision>> {
        self.query?.pages.into_values().next()?.revisions
    }

    /// Page count reported by `prop=imageinfo&iiprop=size` for a multi-page file.
    pub fn page_count(&self) -> Option<u32> {
        self.first_page()?.imageinfo.as_ref()?.first()?.pagecount
    }
}

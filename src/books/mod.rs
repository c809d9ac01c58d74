pub mod extract;
pub mod list;
pub mod pagecount;

pub use extract::extract_books;
pub use list::{format_books, parse_books, read_books};
pub use pagecount::{resolve_documents, BooklistCache, PageCounter, BOOKLIST_KEY};

/// A contest book and its number of pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// File name on Commons, e.g. `Foo.djvu`
    pub id: String,
    pub page_count: u32,
}

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Parse a books file: one book per line, optionally double-quoted.
/// Blank lines and `#` comments are ignored, duplicates dropped.
pub fn parse_books(content: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    content
        .lines()
        .filter(|line| !line.trim().is_empty() && !line.trim_start().starts_with('#'))
        .map(unquote)
        .filter(|book| !book.is_empty())
        .filter(|book| seen.insert(book.clone()))
        .collect()
}

/// Strip surrounding double quotes, undoing `""` escapes inside them.
fn unquote(line: &str) -> String {
    let line = line.trim();
    match line.strip_prefix('"').and_then(|rest| rest.strip_suffix('"')) {
        Some(inner) => inner.replace("\"\"", "\""),
        None => line.to_string(),
    }
}

pub fn read_books(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read books file {}", path.display()))?;
    Ok(parse_books(&content))
}

/// Render books the way `extract-books` writes them: one quoted title per line.
pub fn format_books<'a>(books: impl IntoIterator<Item = &'a str>) -> String {
    books
        .into_iter()
        .map(|book| format!("\"{}\"\n", book.replace('"', "\"\"")))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_books() {
        let content = "# contest books\n\"Foo.djvu\"\n\nBar.pdf  \n  \"Baz.djvu\"\n# Old.djvu\n";
        assert_eq!(parse_books(content), vec!["Foo.djvu", "Bar.pdf", "Baz.djvu"]);
    }

    #[test]
    fn test_parse_books_drops_duplicates() {
        assert_eq!(parse_books("Foo.djvu\n\"Foo.djvu\"\n"), vec!["Foo.djvu"]);
    }

    #[test]
    fn test_format_books() {
        assert_eq!(format_books(["A.djvu", "B.pdf"]), "\"A.djvu\"\n\"B.pdf\"\n");
    }

    #[test]
    fn test_quoted_title_with_quotes() {
        let title = "Il \"Cinque maggio\".djvu";
        let written = format_books([title]);
        assert_eq!(written, "\"Il \"\"Cinque maggio\"\".djvu\"\n");
        assert_eq!(parse_books(&written), vec![title]);
    }

    #[test]
    fn test_format_then_parse() {
        let books = vec!["A.djvu".to_string(), "B.pdf".to_string()];
        let written = format_books(books.iter().map(String::as_str));
        assert_eq!(parse_books(&written), books);
    }
}

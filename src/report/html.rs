use super::tsv::ResultRow;

/// Placeholder in the HTML template replaced by the table rows.
pub const ROWS_PLACEHOLDER: &str = "{{{rows}}}";

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Link to a user page on the contest's Wikisource.
pub fn format_user(name: &str, lang: &str) -> String {
    let name = escape_html(name);
    format!(
        "<a href=\"//{lang}.wikisource.org/wiki/User:{name}\">{name}</a>",
        lang = lang,
        name = name
    )
}

fn format_row(row: &ResultRow, lang: &str) -> String {
    format!(
        "\n    <tr>\n    <td>{}</td>\n    <td>{}</td>\n    <td>{}</td>\n    <td>{}</td><td>{}</td><td>{}</td><td>{}</td>\n    </tr>",
        format_user(&row.user, lang),
        row.punts,
        row.vali,
        row.revi,
        row.revi2,
        row.revi3,
        row.revi5
    )
}

/// Substitute the ranked rows into `template`.
pub fn render_html(template: &str, rows: &[ResultRow], lang: &str) -> String {
    let table = rows
        .iter()
        .map(|row| format_row(row, lang))
        .collect::<Vec<_>>()
        .join("\n");
    template.replace(ROWS_PLACEHOLDER, &table)
}

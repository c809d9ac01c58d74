pub mod formatter;
pub mod html;
pub mod trace;
pub mod tsv;

pub use formatter::{format_leaderboard, should_use_colors};
pub use html::render_html;
pub use trace::{format_trace, trace_page, trace_path, TraceRow};
pub use tsv::{
    format_extended_results, format_results, parse_results, read_results, write_report, ResultRow,
};

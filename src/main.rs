use anyhow::Context;
use clap::{Parser, Subcommand};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::time::Instant;

use wscontest::books::{format_books, read_books, resolve_documents};
use wscontest::config::{validate_config, Config};
use wscontest::contest::rank;
use wscontest::pipeline::{score_contest, ContestTally, DocumentError, PipelineOptions};
use wscontest::report::{self, format_extended_results, format_results, render_html, write_report};
use wscontest::source::{CachedSource, WikisourceSource};
use wscontest::telemetry::{self, TelemetryConfig};
use wscontest::wikisource::{create_client, wikisource_api, ApiClient, RetryPolicy, COMMONS_API};

const EXIT_SUCCESS: i32 = 0;
const EXIT_NETWORK: i32 = 2;
const EXIT_CONFIG: i32 = 4;
const EXIT_IO: i32 = 5;

/// Directory receiving per-book revision traces in debug mode
const TRACE_DIR: &str = "debug";

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tally the contest leaderboard (default if no subcommand)
    Score {
        /// File listing the contest books, one per line
        #[arg(short = 'f', long, default_value = "books.tsv")]
        books: PathBuf,

        /// Page-count cache (defaults to <BOOKS>.booklist_cache.json)
        #[arg(long)]
        booklist_cache: Option<PathBuf>,

        /// Revision cache (defaults to <BOOKS>.cache.json)
        #[arg(long)]
        cache: Option<PathBuf>,

        /// Replay and record fetched revisions through the revision cache
        #[arg(long)]
        enable_cache: bool,

        /// Results file (defaults to <BOOKS>.results.tsv)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Merge result files, and optionally cache files, from several runs
    Merge {
        /// Result files to merge
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Book-list cache files to merge
        #[arg(long, num_args = 1..)]
        booklist: Vec<PathBuf>,

        #[arg(long, default_value = "booklist_cache_tot.json")]
        booklist_output: PathBuf,

        /// Revision cache files to merge
        #[arg(long, num_args = 1..)]
        cache: Vec<PathBuf>,

        #[arg(long, default_value = "cache_tot.json")]
        cache_output: PathBuf,

        /// Merged results file
        #[arg(short, long, default_value = "results_tot.tsv")]
        output: PathBuf,

        /// Also render the leaderboard as HTML
        #[arg(long)]
        html: bool,

        /// HTML output (defaults to <OUTPUT>.index.html)
        #[arg(long)]
        html_output: Option<PathBuf>,

        #[arg(long, default_value = "index.template.html")]
        html_template: PathBuf,

        /// Wikisource language for user links (defaults to the config's)
        #[arg(long)]
        lang: Option<String>,
    },
    /// List the contest books mentioned on the rules page
    ExtractBooks {
        #[arg(short, long, default_value = "books.tsv")]
        output: PathBuf,
    },
}

#[derive(Parser, Debug)]
#[command(name = "wscontest")]
#[command(about = "Wikisource proofreading contest score tally", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug logging and write revision traces to ./debug
    #[arg(short, long, global = true)]
    debug: bool,

    /// Path to config file (defaults to ./contest.yaml, then ~/.config/wscontest/contest.yaml)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl Cli {
    fn verbosity(&self) -> u8 {
        if self.debug {
            2
        } else if self.verbose {
            1
        } else {
            0
        }
    }
}

fn exit_with(code: i32, what: &str, error: anyhow::Error) -> ! {
    eprintln!("{}: {:#}", what, error);
    std::process::exit(code);
}

/// `<path><suffix>`, e.g. `books.tsv` -> `books.tsv.cache.json`
fn derived_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

fn load_valid_config(path: Option<PathBuf>) -> Config {
    let config = match wscontest::config::load_config(path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {:#}", e);
            std::process::exit(EXIT_CONFIG);
        }
    };

    if let Err(errors) = validate_config(&config) {
        eprintln!("Config errors:");
        for error in errors {
            eprintln!("  - {}", error);
        }
        std::process::exit(EXIT_CONFIG);
    }

    config
}

fn init_logging(verbosity: u8, level: Option<String>) {
    if let Err(e) = telemetry::init(&TelemetryConfig::new(verbosity, level)) {
        eprintln!("{:#}", e);
    }
}

#[tokio::main]
async fn main() {
    // Install rustls crypto provider (required for rustls 0.23+)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    let cli = Cli::parse();
    let verbosity = cli.verbosity();
    let config_path = cli.config.clone().map(PathBuf::from);
    let command = cli.command.unwrap_or(Commands::Score {
        books: PathBuf::from("books.tsv"),
        booklist_cache: None,
        cache: None,
        enable_cache: false,
        output: None,
    });
    let start_time = Instant::now();

    match command {
        Commands::Score {
            books,
            booklist_cache,
            cache,
            enable_cache,
            output,
        } => {
            let config = load_valid_config(config_path);
            init_logging(verbosity, config.log_level.clone());

            let paths = ScorePaths {
                booklist_cache: booklist_cache
                    .unwrap_or_else(|| derived_path(&books, ".booklist_cache.json")),
                cache: enable_cache.then(|| cache.unwrap_or_else(|| derived_path(&books, ".cache.json"))),
                output: output.unwrap_or_else(|| derived_path(&books, ".results.tsv")),
                books,
            };
            run_score(&config, &paths, cli.debug).await;
        }
        Commands::Merge {
            files,
            booklist,
            booklist_output,
            cache,
            cache_output,
            output,
            html,
            html_output,
            html_template,
            lang,
        } => {
            init_logging(verbosity, None);

            let rows = match wscontest::merge::merge_result_files(&files) {
                Ok(rows) => rows,
                Err(e) => exit_with(EXIT_IO, "Cannot merge results", e),
            };
            if let Err(e) = write_report(&output, &format_extended_results(&rows)) {
                exit_with(EXIT_IO, "Cannot write merged results", e);
            }
            println!("Merged {} files into {} ({} users)", files.len(), output.display(), rows.len());

            if html {
                let lang = lang.unwrap_or_else(|| load_valid_config(config_path).contest.language);
                let html_output =
                    html_output.unwrap_or_else(|| derived_path(&output, ".index.html"));
                let rendered = std::fs::read_to_string(&html_template)
                    .with_context(|| format!("Failed to read HTML template {}", html_template.display()))
                    .and_then(|template| {
                        write_report(&html_output, &render_html(&template, &rows, &lang))
                    });
                if let Err(e) = rendered {
                    exit_with(EXIT_IO, "Cannot render HTML", e);
                }
                println!("Wrote {}", html_output.display());
            }

            for (inputs, target) in [(&booklist, &booklist_output), (&cache, &cache_output)] {
                if inputs.is_empty() {
                    continue;
                }
                match wscontest::merge::merge_caches(inputs, target) {
                    Ok(entries) => println!("Merged {} cache files into {} ({} entries)", inputs.len(), target.display(), entries),
                    Err(e) => exit_with(EXIT_IO, "Cannot merge cache files", e),
                }
            }
        }
        Commands::ExtractBooks { output } => {
            let config = load_valid_config(config_path);
            init_logging(verbosity, config.log_level.clone());
            run_extract_books(&config, &output).await;
        }
    }

    if verbosity > 0 {
        eprintln!("Done in {:?}", start_time.elapsed());
    }
    std::process::exit(EXIT_SUCCESS);
}

struct ScorePaths {
    books: PathBuf,
    booklist_cache: PathBuf,
    /// Revision cache, when enabled
    cache: Option<PathBuf>,
    output: PathBuf,
}

async fn run_score(config: &Config, paths: &ScorePaths, debug: bool) {
    let window = match config.window() {
        Ok(w) => w,
        Err(e) => exit_with(EXIT_CONFIG, "Invalid contest window", e.into()),
    };

    let books = match read_books(&paths.books) {
        Ok(books) => books,
        Err(e) => exit_with(EXIT_IO, "Cannot read books", e),
    };
    tracing::info!("Loaded {} books from {}", books.len(), paths.books.display());

    let http = match create_client(config.fetch.timeout()) {
        Ok(c) => c,
        Err(e) => exit_with(EXIT_NETWORK, "Failed to create HTTP client", e),
    };
    let retry = RetryPolicy::from_config(&config.fetch);

    let commons = ApiClient::new(http.clone(), COMMONS_API, retry);
    let documents = match resolve_documents(&books, &commons, &paths.booklist_cache).await {
        Ok(documents) => documents,
        Err(e) => exit_with(EXIT_NETWORK, "Cannot resolve page counts", e),
    };

    let live = WikisourceSource::new(
        ApiClient::new(http, wikisource_api(&config.contest.language), retry),
        config.fetch.rvlimit(),
    );
    let options = PipelineOptions {
        concurrency: config.fetch.concurrency(),
        trace_dir: debug.then(|| PathBuf::from(TRACE_DIR)),
    };

    let result = match &paths.cache {
        Some(cache_path) => {
            let cached = match CachedSource::open(live, cache_path) {
                Ok(c) => c,
                Err(e) => exit_with(EXIT_IO, "Cannot open revision cache", e),
            };
            let result = score_contest(&cached, &documents, &window, &options).await;
            if let Err(e) = cached.flush() {
                exit_with(EXIT_IO, "Cannot save revision cache", e);
            }
            result
        }
        None => score_contest(&live, &documents, &window, &options).await,
    };

    let tally = match result {
        Ok(tally) => tally,
        Err(e) if e.downcast_ref::<DocumentError>().is_some() => {
            exit_with(EXIT_NETWORK, "Scoring aborted", e)
        }
        Err(e) => exit_with(EXIT_IO, "Scoring aborted", e),
    };

    if tally.all_failed() {
        eprintln!("All books failed to download. Check your network connection.");
        std::process::exit(EXIT_NETWORK);
    }
    report_omissions(&tally);

    let leaderboard = rank(&tally.totals);
    if let Err(e) = write_report(&paths.output, &format_results(&leaderboard)) {
        exit_with(EXIT_IO, "Cannot write results", e);
    }

    println!("{}", report::format_leaderboard(&leaderboard, report::should_use_colors()));
    tracing::info!("Wrote {}", paths.output.display());
}

/// Tell the user which pages and books are missing from the totals.
fn report_omissions(tally: &ContestTally) {
    if !tally.skipped_pages.is_empty() {
        eprintln!("Skipped {} pages with unreadable revisions:", tally.skipped_pages.len());
        for skipped in &tally.skipped_pages {
            eprintln!("  - {} page {}: {}", skipped.book, skipped.page, skipped.reason);
        }
    }
    if !tally.failed_documents.is_empty() {
        eprintln!("Skipped {} books that could not be fetched:", tally.failed_documents.len());
        for failed in &tally.failed_documents {
            eprintln!("  - {}: {}", failed.book, failed.reason);
        }
    }
}

async fn run_extract_books(config: &Config, output: &Path) {
    let (Some(rules_page), Some(pattern)) = (&config.contest.rules_page, &config.contest.book_regex)
    else {
        eprintln!("extract-books needs contest.rules_page and contest.book_regex in the config file.");
        std::process::exit(EXIT_CONFIG);
    };
    let book_re = match Regex::new(pattern) {
        Ok(re) => re,
        Err(e) => exit_with(EXIT_CONFIG, "Invalid contest.book_regex", e.into()),
    };
    let window = match config.window() {
        Ok(w) => w,
        Err(e) => exit_with(EXIT_CONFIG, "Invalid contest window", e.into()),
    };

    let http = match create_client(config.fetch.timeout()) {
        Ok(c) => c,
        Err(e) => exit_with(EXIT_NETWORK, "Failed to create HTTP client", e),
    };
    let client = ApiClient::new(
        http,
        wikisource_api(&config.contest.language),
        RetryPolicy::from_config(&config.fetch),
    );

    let books = match wscontest::books::extract_books(
        &client,
        rules_page,
        config.fetch.rvlimit(),
        &window,
        &book_re,
    )
    .await
    {
        Ok(books) => books,
        Err(e) => exit_with(EXIT_NETWORK, "Cannot extract books", e),
    };

    if let Err(e) = write_report(output, &format_books(books.iter().map(String::as_str))) {
        exit_with(EXIT_IO, "Cannot write books file", e);
    }
    println!("Wrote {} books to {}", books.len(), output.display());
}

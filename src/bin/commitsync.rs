//! commitsync CLI: sync the commit feed and browse the local store.
//!
//! Usage:
//!   commitsync sync [--feed-url url] [--per-page n] [--db path]
//!   commitsync list [--authors] [--search text | --filter preset] [--db path]
//!   commitsync edit <row> <text> [--authors] [--db path]
//!   commitsync delete <row> [--authors] [--db path]

use clap::{Args, Parser, Subcommand};
use commitsync::{
    Browser, EntityKind, EntityView, HttpFeedClient, IngestPipeline, Presentable, Presenter,
    QuickFilter, Store, SyncConfig,
};
use std::path::PathBuf;
use tracing::Level;

#[derive(Parser)]
#[command(
    name = "commitsync",
    version,
    about = "Sync a commit feed into a local store and browse it"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Path to SQLite database file
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the feed once and ingest it
    Sync {
        /// Feed endpoint
        #[arg(long)]
        feed_url: Option<String>,
        /// Records requested per fetch
        #[arg(long)]
        per_page: Option<u32>,
    },
    /// List commits or authors, newest first
    List {
        #[command(flatten)]
        view: ViewArgs,
    },
    /// Replace the message (or name) of the record at a row
    Edit {
        /// Row number as shown by `list`
        row: usize,
        /// New text, at most 50 characters
        text: String,
        #[command(flatten)]
        view: ViewArgs,
    },
    /// Delete the record at a row
    Delete {
        /// Row number as shown by `list`
        row: usize,
        #[command(flatten)]
        view: ViewArgs,
    },
}

/// Selects which rows are shown, and so what a row number refers to
#[derive(Args)]
struct ViewArgs {
    /// Show authors instead of commits
    #[arg(long)]
    authors: bool,
    /// Search messages (or author names)
    #[arg(long, conflicts_with = "filter")]
    search: Option<String>,
    /// Preset: fixes, no-pull-requests, recent, all, ben-barham
    #[arg(long)]
    filter: Option<QuickFilter>,
}

/// Prints rows as a plain table
struct TablePresenter;

impl Presenter for TablePresenter {
    fn present(&mut self, kind: EntityKind, rows: &[EntityView]) {
        if rows.is_empty() {
            println!("No {}s.", kind);
            return;
        }
        println!("{:>4}  {:<50}  {}", "ROW", "TITLE", "DETAIL");
        println!("{}", "-".repeat(96));
        for (row, view) in rows.iter().enumerate() {
            let title: String = view.title().lines().next().unwrap_or_default().chars().take(50).collect();
            println!("{:>4}  {:<50}  {}", row, title, view.subtitle());
        }
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn open_store(config: &SyncConfig) -> Result<Store, String> {
    let db_path = config.resolved_db_path();
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    Store::open(&db_path)
        .map_err(|e| format!("Failed to open database at {}: {}", db_path.display(), e))
}

/// Open a browser showing the rows selected by `view`
fn open_browser(store: &Store, view: &ViewArgs) -> Result<Browser, String> {
    let mut browser = Browser::new(store);
    let kind = if view.authors {
        EntityKind::Author
    } else {
        EntityKind::Commit
    };
    browser.show(kind).map_err(|e| e.to_string())?;
    if let Some(text) = &view.search {
        browser.set_search_text(text).map_err(|e| e.to_string())?;
    } else if let Some(quick) = view.filter {
        browser.apply_quick_filter(quick).map_err(|e| e.to_string())?;
    }
    Ok(browser)
}

fn cmd_sync(store: &Store, config: &SyncConfig) -> i32 {
    let client = match HttpFeedClient::new(config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("failed to create tokio runtime: {}", e);
            return 1;
        }
    };

    let pipeline = IngestPipeline::new(store.clone());
    match rt.block_on(pipeline.sync(&client)) {
        Ok(report) => {
            println!(
                "Fetched {} records: {} commits added, {} new authors",
                report.records_seen, report.commits_inserted, report.authors_created
            );
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_list(store: &Store, view: &ViewArgs) -> i32 {
    match open_browser(store, view) {
        Ok(browser) => {
            browser.present(&mut TablePresenter);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_edit(store: &Store, view: &ViewArgs, row: usize, text: &str) -> i32 {
    let result = open_browser(store, view).and_then(|mut browser| {
        let mut session = browser.begin_edit(row).map_err(|e| e.to_string())?;
        session.set_text(text).map_err(|e| e.to_string())?;
        browser.save_edit(&session).map_err(|e| e.to_string())?;
        Ok(session)
    });
    match result {
        Ok(session) => {
            println!("Saved row {}: {}", row, session.text());
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_delete(store: &Store, view: &ViewArgs, row: usize) -> i32 {
    let result = open_browser(store, view).and_then(|mut browser| {
        let title = browser.row(row).map_err(|e| e.to_string())?.title();
        browser.delete(row).map_err(|e| e.to_string())?;
        Ok(title)
    });
    match result {
        Ok(title) => {
            println!("Deleted row {}: {}", row, title);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = SyncConfig {
        db_path: cli.db,
        ..Default::default()
    };
    if let Commands::Sync { feed_url, per_page } = &cli.command {
        if let Some(url) = feed_url {
            config.feed_url = url.clone();
        }
        if let Some(n) = per_page {
            config.per_page = *n;
        }
    }

    let store = match open_store(&config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let code = match &cli.command {
        Commands::Sync { .. } => cmd_sync(&store, &config),
        Commands::List { view } => cmd_list(&store, view),
        Commands::Edit { row, text, view } => cmd_edit(&store, view, *row, text),
        Commands::Delete { row, view } => cmd_delete(&store, view, *row),
    };
    std::process::exit(code);
}

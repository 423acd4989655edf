//! # Quote Sync CLI (`qsync`)
//!
//! Manage a local quote collection and keep it in sync with a remote
//! source.
//!
//! ## Usage
//!
//! ```bash
//! qsync --config ./config/qsync.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `qsync init` | Create the SQLite database and schema |
//! | `qsync add "<text>" --category <c>` | Add a quote locally and push it |
//! | `qsync list` | List stored quotes |
//! | `qsync categories` | List categories |
//! | `qsync random` | Show a random quote |
//! | `qsync last` | Show the last viewed quote |
//! | `qsync sync` | Run one sync pass |
//! | `qsync watch` | Sync now and then periodically |
//! | `qsync export` | Export quotes as JSON |
//! | `qsync import <file>` | Import quotes from JSON |

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use quote_sync::browse;
use quote_sync::config;
use quote_sync::kv::SqliteKv;
use quote_sync::notify::{NotificationLog, Notifier, NotifyMode};
use quote_sync::remote::{HttpRemote, Remote};
use quote_sync::scheduler::Scheduler;
use quote_sync::store::RecordStore;
use quote_sync::sync::{self, SyncService};
use quote_sync::transfer::{self, ImportOutcome};

/// Quote Sync CLI: an offline-first quote collection with remote sync.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file.
#[derive(Parser)]
#[command(
    name = "qsync",
    about = "Quote Sync: an offline-first quote collection with remote sync",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/qsync.toml")]
    config: PathBuf,

    /// Notification output: `auto`, `human`, `json`, or `off`.
    ///
    /// `auto` prints human-readable lines when stderr is a terminal and
    /// JSON lines otherwise.
    #[arg(long, global = true, default_value = "auto")]
    notify: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database and its schema.
    ///
    /// Idempotent. Every other command also creates the schema on demand.
    Init,

    /// Add a quote locally and push it to the remote.
    ///
    /// The quote is stored first; a failed push is reported but never
    /// undoes the local addition.
    Add {
        /// Quote text.
        text: String,

        /// Quote category.
        #[arg(long)]
        category: String,
    },

    /// List stored quotes.
    List {
        /// Only list quotes in this category.
        #[arg(long)]
        category: Option<String>,
    },

    /// List categories, marking the last selected one.
    Categories,

    /// Show a random quote.
    Random {
        /// Category to pick from, or `all`. Defaults to the last selection.
        #[arg(long)]
        category: Option<String>,
    },

    /// Show the last viewed quote.
    Last,

    /// Run one fetch-and-merge pass against the remote.
    Sync,

    /// Sync now, then every `sync.interval_secs` until interrupted.
    Watch {
        /// Stop after this many passes.
        #[arg(long)]
        passes: Option<usize>,
    },

    /// Export all quotes as a JSON array.
    Export {
        /// Output file. Writes to stdout when omitted.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Append quotes from a JSON file.
    Import {
        /// Path to a JSON array of quotes.
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("quote_sync=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;
    let log = Arc::new(NotificationLog::forwarding(
        cfg.notify.ttl(),
        NotifyMode::parse(&cli.notify)?.notifier(),
    ));
    let notifier: Arc<dyn Notifier> = log.clone();

    // Opening the store creates the schema when missing.
    let kv = Arc::new(SqliteKv::open(&cfg).await?);
    let store = Arc::new(RecordStore::open(kv.clone(), &cfg.store).await);
    let remote: Arc<dyn Remote> = Arc::new(HttpRemote::new(&cfg.remote)?);
    let service = SyncService::new(store.clone(), remote, notifier.clone());

    match cli.command {
        Commands::Init => {
            println!("Database initialized successfully.");
        }
        Commands::Add { text, category } => {
            let added = service.add_record(&text, &category).await?;
            if added.inserted {
                println!("added {}", added.record.id);
            } else {
                println!("already stored {}", added.record.id);
            }
            if let Some(push) = added.push {
                push.await.ok();
            }
        }
        Commands::List { category } => {
            browse::run_list(&store, category.as_deref()).await?;
        }
        Commands::Categories => {
            browse::run_categories(&store).await?;
        }
        Commands::Random { category } => {
            browse::run_random(&store, category.as_deref()).await?;
        }
        Commands::Last => {
            browse::run_last(&store).await?;
        }
        Commands::Sync => {
            let outcome = service.run_pass().await?;
            sync::print_summary(&outcome);
        }
        Commands::Watch { passes } => {
            let mut changes = store.subscribe();
            let watched = store.clone();
            let notices = log.clone();
            let printer = tokio::spawn(async move {
                while changes.changed().await.is_ok() {
                    let set = watched.current().await;
                    println!(
                        "quotes: {}  categories: {}  recent notices: {}",
                        set.len(),
                        browse::categories(&set).join(", "),
                        notices.active().len()
                    );
                }
            });

            let scheduler = Scheduler::new(service, cfg.sync.interval());
            let report = scheduler
                .run(passes, async {
                    tokio::signal::ctrl_c().await.ok();
                })
                .await;
            printer.abort();
            println!(
                "watch stopped: {} passes started, {} succeeded, {} failed",
                report.started, report.succeeded, report.failed
            );
        }
        Commands::Export { output } => {
            transfer::run_export(&store, output.as_deref()).await?;
        }
        Commands::Import { path } => {
            match transfer::import_file(&store, &path, notifier.as_ref()).await? {
                ImportOutcome::Imported(n) => println!("imported {} quotes", n),
                ImportOutcome::Rejected => println!("import rejected"),
            }
        }
    }

    kv.close().await;
    Ok(())
}

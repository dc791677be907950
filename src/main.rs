//! `lumawell-chat`: terminal client for the health & wellness assistant
//!
//! Keeps a conversation timeline in sync with a remote chat backend: one
//! request in flight at a time, multi-paragraph answers split into bubbles.

mod backend;
mod chunking;
mod config;
mod db;
mod ids;
mod render;
mod runtime;
mod state_machine;
mod thread_identity;
mod timeline;
mod tui;

use backend::{ChatBackend, HttpChatBackend, LoggingBackend};
use clap::{Parser, Subcommand};
use config::ClientConfig;
use db::Database;
use state_machine::ChatContext;
use std::fs::{File, OpenOptions};
use std::sync::{Arc, Mutex};
use thread_identity::ThreadIdentity;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "lumawell-chat", version)]
#[command(about = "Chat with the LumaWell health & wellness assistant")]
struct Cli {
    #[command(subcommand)]
    command: Option<CliCommand>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum CliCommand {
    /// Interactive chat (default)
    Chat,
    /// Probe the backend health endpoint
    Health,
    /// Print the persisted thread id
    Thread {
        /// Forget the thread id; the next chat starts a new thread
        #[arg(long)]
        forget: bool,
    },
}

/// Where log records go. The chat UI owns the terminal, so it logs to a file.
enum LogTarget {
    File(File),
    Stderr,
    Discard,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = ClientConfig::from_env();
    let command = cli.command.unwrap_or(CliCommand::Chat);

    let log_target = if command == CliCommand::Chat {
        open_log_file(&config).map_or(LogTarget::Discard, LogTarget::File)
    } else {
        LogTarget::Stderr
    };
    init_logging(log_target);

    match command {
        CliCommand::Chat => run_chat(&config).await,
        CliCommand::Health => run_health(&config).await,
        CliCommand::Thread { forget } => run_thread(&config, forget),
    }
}

fn open_log_file(config: &ClientConfig) -> Option<File> {
    std::fs::create_dir_all(&config.data_dir).ok()?;
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(config.log_path())
        .ok()
}

fn init_logging(target: LogTarget) {
    let registry = tracing_subscriber::registry().with(
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "lumawell_chat=info".into()),
    );
    let layer = tracing_subscriber::fmt::layer()
        .json()
        .with_current_span(false)
        .with_span_list(false);

    match target {
        LogTarget::File(file) => registry.with(layer.with_writer(Mutex::new(file))).init(),
        LogTarget::Stderr => registry.with(layer.with_writer(std::io::stderr)).init(),
        LogTarget::Discard => registry.with(layer.with_writer(std::io::sink)).init(),
    }
}

/// Persistent identity when the settings store opens, in-memory otherwise
fn open_identity(config: &ClientConfig) -> ThreadIdentity {
    let path = config.db_path();
    match Database::open(&path) {
        Ok(db) => {
            tracing::info!(path = %path.display(), "Opened settings store");
            ThreadIdentity::new(Arc::new(db))
        }
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Settings store unavailable, thread id will not persist"
            );
            ThreadIdentity::in_memory()
        }
    }
}

fn http_backend(config: &ClientConfig) -> Result<Arc<dyn ChatBackend>, backend::BackendError> {
    let http: Arc<dyn ChatBackend> = Arc::new(HttpChatBackend::new(&config.api_url, config.timeout)?);
    Ok(Arc::new(LoggingBackend::new(http)))
}

async fn run_chat(config: &ClientConfig) -> Result<(), Box<dyn std::error::Error>> {
    let identity = open_identity(config);
    let context = ChatContext::new(identity.get_or_create())
        .with_city(config.city.clone())
        .with_realtime(config.realtime)
        .with_stagger(config.stagger);

    let backend = http_backend(config)?;
    tracing::info!(
        endpoint = %backend.endpoint(),
        thread_id = %context.thread_id,
        city = ?context.city,
        realtime = context.realtime,
        "Starting chat"
    );

    let handle = runtime::spawn(context, Arc::clone(&backend), runtime::welcome_seed());
    tui::run(handle, backend).await?;
    Ok(())
}

async fn run_health(config: &ClientConfig) -> Result<(), Box<dyn std::error::Error>> {
    let backend = http_backend(config)?;
    let health = backend.health().await?;
    println!("{}: {}", config.api_url, health.status);
    if health.is_ok() {
        Ok(())
    } else {
        Err(format!("backend reported status {:?}", health.status).into())
    }
}

fn run_thread(config: &ClientConfig, forget: bool) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open(config.db_path())?;
    let identity = ThreadIdentity::new(Arc::new(db));

    if forget {
        identity.clear()?;
        println!("Thread id cleared");
    } else {
        println!("{}", identity.get_or_create());
    }
    Ok(())
}

use anyhow::{Context, Result};
use axum::{
    Router,
    routing::{get, post},
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::{net::SocketAddr, sync::Arc};
use tower_http::cors::CorsLayer;
use tower_http::trace::MakeSpan;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::prelude::*;
use uuid::Uuid;

mod config;
mod conversation;
mod db;
mod error;
mod handlers;
mod history;
mod metrics;
mod models;
mod repository;
#[cfg(test)]
mod test_helpers;
mod ws;

use crate::config::{ChatConfig, FileConfig, IdentityConfig, PairchatConfig, Profile};
use crate::db::Database;
use crate::history::HistoryService;
use crate::metrics::ServerMetrics;
use crate::repository::ChatRepository;
use crate::ws::{BroadcastHub, ConnectionRegistry};

/// Custom span maker that adds a unique request ID to each incoming request
#[derive(Clone)]
struct RequestIdMakeSpan;

impl<B> MakeSpan<B> for RequestIdMakeSpan {
    fn make_span(&mut self, request: &axum::http::Request<B>) -> tracing::Span {
        let request_id = Uuid::new_v4().to_string();
        tracing::info_span!(
            "request",
            method = %request.method(),
            uri = %request.uri(),
            request_id = %request_id,
        )
    }
}

#[derive(Parser)]
#[command(name = "pairchat")]
#[command(about = "One-to-one chat server with live WebSocket delivery")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Custom data directory (defaults to ~/.pairchat)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the chat server in the foreground
    Server(ServerArgs),

    /// Print the resolved configuration as TOML
    Config(ConfigArgs),
}

#[derive(Parser)]
struct ServerArgs {
    /// Port for the web server (overrides config; 0 = auto-select)
    #[arg(short, long)]
    port: Option<u16>,

    /// Host to bind to (overrides config)
    #[arg(short = 'b', long)]
    host: Option<String>,

    /// Configuration preset
    #[arg(long, value_enum)]
    profile: Option<Profile>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Clean start - reset database (prompt for confirmation)
    #[arg(long)]
    reset_db: bool,
}

#[derive(Parser)]
struct ConfigArgs {
    /// Resolve as if this profile were selected
    #[arg(long, value_enum)]
    profile: Option<Profile>,
}

#[derive(Clone)]
#[allow(dead_code)]
pub(crate) struct AppState {
    pub config: Arc<PairchatConfig>,
    /// Account registration settings
    pub identity: Arc<IdentityConfig>,
    /// Server metrics for observability
    pub metrics: Arc<ServerMetrics>,
    pub db: Arc<Database>,
    pub repository: ChatRepository,
    /// Persist-then-broadcast entry point shared by HTTP and WebSocket sends
    pub hub: Arc<BroadcastHub>,
    pub history: HistoryService,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = PairchatConfig::new(cli.data_dir.clone())?;

    match cli.command {
        Commands::Server(args) => run_server(args, config).await,
        Commands::Config(args) => print_config(&config, args.profile.as_ref()),
    }
}

fn print_config(config: &PairchatConfig, profile: Option<&Profile>) -> Result<()> {
    let fc: FileConfig = config::load_config(&config.data_dir, profile)
        .extract()
        .context("Invalid configuration")?;
    let rendered = toml::to_string_pretty(&fc).context("Failed to render configuration")?;
    println!("# {}", config.config_toml_path().display());
    print!("{}", rendered);
    Ok(())
}

async fn run_server(args: ServerArgs, config: PairchatConfig) -> Result<()> {
    // Setup logging
    let default_directive = if args.debug {
        "pairchat=debug,tower_http=debug,info"
    } else {
        "pairchat=info,tower_http=info,warn"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(env_filter)
        .init();

    info!("Starting pairchat");

    let file_config: FileConfig = config::load_config(&config.data_dir, args.profile.as_ref())
        .extract()
        .context("Invalid configuration")?;
    let chat_config = ChatConfig::from_file(&file_config.chat);
    let identity = Arc::new(IdentityConfig::from_file(&file_config.identity));

    let config = Arc::new(config);

    // Handle database reset if requested
    if args.reset_db && config.db_path.exists() {
        println!("This will delete all stored messages and accounts!");
        print!("Are you sure? (yes/no): ");
        use std::io::{self, Write};
        io::stdout().flush()?;
        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        if input.trim() == "yes" {
            config.reset_database()?;
            println!("Database reset.");
        } else {
            println!("Cancelled.");
        }
    }

    info!("Initializing database...");
    let db = Arc::new(Database::new(&config).await?);
    let repository = ChatRepository::new(db.pool.clone());

    let metrics = Arc::new(ServerMetrics::new());
    let registry = Arc::new(ConnectionRegistry::new(chat_config.connection_buffer));
    let hub = Arc::new(BroadcastHub::new(
        repository.clone(),
        registry,
        metrics.clone(),
    ));
    info!(
        "Chat config: connection_buffer={}, registration={}",
        chat_config.connection_buffer,
        if identity.allow_registration {
            "open"
        } else {
            "closed"
        }
    );

    let app_state = AppState {
        config: config.clone(),
        identity,
        metrics,
        db: db.clone(),
        history: HistoryService::new(repository.clone()),
        repository,
        hub,
    };

    let app = Router::new()
        // Account routes
        .route("/api/users", get(handlers::list_users_handler))
        .route("/api/users/register", post(handlers::register_handler))
        .route("/api/users/login", post(handlers::login_handler))
        // Message routes
        .route("/api/messages/send", post(handlers::send_message_handler))
        .route("/api/messages/{a}/{b}", get(handlers::history_handler))
        .route(
            "/api/messages/{a}/{b}/days",
            get(handlers::history_by_day_handler),
        )
        .route("/api/ws", get(handlers::chat_websocket_handler))
        // Admin endpoints
        .route("/api/admin/stats", get(handlers::get_database_stats))
        // Health endpoints
        .route("/health", get(handlers::health_handler))
        .route("/health/live", get(handlers::health_live_handler))
        .route("/health/ready", get(handlers::health_ready_handler))
        .route("/metrics", get(handlers::metrics_handler))
        .layer(TraceLayer::new_for_http().make_span_with(RequestIdMakeSpan))
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    let host = args
        .host
        .or(file_config.server.host)
        .unwrap_or_else(|| "127.0.0.1".to_string());
    let port = args
        .port
        .or(file_config.server.port)
        .unwrap_or(config::DEFAULT_PORT);
    let addr = format!("{}:{}", host, port)
        .parse::<SocketAddr>()
        .with_context(|| format!("Invalid listen address {}:{}", host, port))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    let actual_addr = listener.local_addr()?;

    info!("pairchat listening on http://{}", actual_addr);
    info!("API endpoints:");
    info!("  POST   /api/messages/send        - Store and broadcast a message");
    info!("  GET    /api/messages/:a/:b       - Conversation history");
    info!("  GET    /api/messages/:a/:b/days  - History grouped by day");
    info!("  GET    /api/ws                   - Live message stream");

    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received shutdown signal, cleaning up...");
    };

    let server_result = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
        .context("Server error");

    info!("Closing database...");
    db.pool.close().await;

    info!("Shutdown complete");
    server_result
}

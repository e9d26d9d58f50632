use clap::{Parser, Subcommand};
use inventory_backend::db::pool;
use inventory_backend::db::services::PgItemRepository;
use inventory_backend::server::config::ServerConfig;
use inventory_backend::server::logging::{init_fallback_logging, init_logging};
use inventory_backend::server::shutdown::shutdown_signal;
use inventory_backend::web::create_axum_router;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Do not apply pending migrations on startup
    #[arg(long, global = true)]
    skip_migrations: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Apply pending database migrations and exit
    Migrate,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    // --- Server Config Setup ---
    let server_config = match ServerConfig::load(args.config.as_deref()) {
        Ok(config) => Arc::new(config),
        Err(e) => {
            init_fallback_logging();
            error!("Failed to load server configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&server_config);
    info!(
        version = VERSION,
        environment = ?server_config.environment,
        "Starting inventory server."
    );

    // --- Database Pool Setup ---
    let db_pool = match pool::connect(&server_config).await {
        Ok(pool) => pool,
        Err(e) => {
            error!(error = %e, "Failed to connect to the database.");
            std::process::exit(1);
        }
    };

    let command = args.command.unwrap_or(Command::Serve);
    if command == Command::Migrate || !args.skip_migrations {
        if let Err(e) = pool::run_migrations(&db_pool).await {
            error!(error = %e, "Failed to apply database migrations.");
            db_pool.close().await;
            std::process::exit(1);
        }
    }
    if command == Command::Migrate {
        db_pool.close().await;
        return Ok(());
    }

    // --- HTTP Server ---
    let items = Arc::new(PgItemRepository::new(db_pool.clone()));
    let app = create_axum_router(items, server_config.clone());

    let addr = SocketAddr::new(server_config.host, server_config.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %addr, "HTTP server listening.");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db_pool.close().await;
    info!("Server stopped; database pool closed.");
    Ok(())
}

//! P2P back-office server and admin commands

use std::sync::Arc;

use api_gateway::auth::JwtKeys;
use api_gateway::config::AppConfig;
use api_gateway::AppState;
use clap::{Parser, Subcommand};
use common::db::{init_db_pool, run_migrations};
use dotenv::dotenv;
use exchange_sync::{BybitConnector, ExchangeSyncConfig, Reconciler};
use fiscal_receipt::{EvotorClient, FiscalConfig, ReceiptIssuer};
use order_service::{
    InMemoryOrderRepository, OrderRepository, OrderService, OrderServiceConfig, PostgresOrderRepository,
    ReceiptService, RepositoryType, SyncService,
};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter, FmtSubscriber};

type BoxError = Box<dyn std::error::Error>;

/// Command line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    #[clap(subcommand)]
    command: Option<Command>,
    #[clap(flatten)]
    serve: ServeArgs,
}

/// Server options, also read when no subcommand is given
#[derive(clap::Args, Debug)]
struct ServeArgs {
    /// Listening address
    #[clap(short, long, env = "ADDR", global = true)]
    addr: Option<String>,
    /// Admin account created at startup when the login is free
    #[clap(long, env = "ADMIN_LOGIN", global = true)]
    admin_login: Option<String>,
    #[clap(long, env = "ADMIN_PASSWORD", hide_env_values = true, global = true)]
    admin_password: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Apply database migrations and exit
    Migrate,
    /// Register a user
    CreateUser {
        #[clap(long)]
        login: String,
        #[clap(long)]
        password: String,
        /// Grant access to the admin views
        #[clap(long)]
        admin: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Load environment variables
    dotenv().ok();

    let args = Args::parse();
    let log_level = init_tracing();

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(args.serve, log_level).await,
        Command::Migrate => migrate().await,
        Command::CreateUser { login, password, admin } => create_user(&login, &password, admin).await,
    }
}

/// Debug level when `DEBUG=1`, info otherwise
fn init_tracing() -> Level {
    let env_debug = std::env::var("DEBUG").unwrap_or_else(|_| "0".to_string());
    let log_level = if env_debug == "1" { Level::DEBUG } else { Level::INFO };

    let env_filter = EnvFilter::builder()
        .with_default_directive(log_level.into())
        .from_env_lossy();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_ok() {
        debug!("Debug logging enabled");
    }
    log_level
}

/// Open the configured repository, migrating PostgreSQL first
async fn open_repository(config: &OrderServiceConfig) -> Result<Arc<dyn OrderRepository>, BoxError> {
    match RepositoryType::from_config(config) {
        RepositoryType::InMemory => {
            warn!("DATABASE_URL is not set, data is kept in memory only");
            Ok(Arc::new(InMemoryOrderRepository::new()))
        }
        RepositoryType::Postgres { database_url, pool_size } => {
            let repo = PostgresOrderRepository::connect(&database_url, pool_size).await?;
            run_migrations(repo.pool()).await?;
            Ok(Arc::new(repo))
        }
    }
}

async fn serve(args: ServeArgs, log_level: Level) -> Result<(), BoxError> {
    info!("Starting P2P back-office...");

    let mut app_config = AppConfig::from_env();
    if let Some(addr) = args.addr {
        app_config = app_config.with_addr(addr);
    }
    let order_config = OrderServiceConfig::from_env();
    let exchange_config = ExchangeSyncConfig::from_env();
    let fiscal_config = FiscalConfig::from_env();

    let repo = open_repository(&order_config).await?;
    let workers = exchange_config.stats_workers;
    let reconciler = Arc::new(Reconciler::new(
        Arc::new(BybitConnector::new(exchange_config.clone())?),
        &exchange_config,
    ));
    let issuer = ReceiptIssuer::new(Arc::new(EvotorClient::new(fiscal_config)?));

    let state = Arc::new(AppState {
        orders: Arc::new(OrderService::new(Arc::clone(&repo), order_config)),
        sync: Arc::new(SyncService::new(Arc::clone(&repo), reconciler, workers)),
        receipts: Arc::new(ReceiptService::new(repo, issuer)),
        jwt: JwtKeys::new(&app_config.jwt_secret, app_config.jwt_ttl_hours),
    });

    match (args.admin_login, args.admin_password) {
        (Some(login), Some(password)) => {
            if state.orders.ensure_admin(&login, &password).await? {
                info!("Created admin account {}", login);
            }
        }
        (Some(login), None) => warn!("ADMIN_PASSWORD is not set, admin account {} not created", login),
        _ => {}
    }

    let app = api_gateway::router_with_log_level(state, log_level);

    let listener = TcpListener::bind(&app_config.addr).await?;
    info!("Listening on {}", app_config.addr);

    // Run until interrupt signal
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    info!("Shutting down");
    Ok(())
}

async fn migrate() -> Result<(), BoxError> {
    let config = OrderServiceConfig::from_env();
    let database_url = config
        .database_url
        .ok_or("DATABASE_URL must be set to run migrations")?;

    let pool = init_db_pool(&database_url, 1).await?;
    run_migrations(&pool).await?;
    Ok(())
}

async fn create_user(login: &str, password: &str, admin: bool) -> Result<(), BoxError> {
    let config = OrderServiceConfig::from_env();
    if config.database_url.is_none() {
        return Err(
            "DATABASE_URL must be set; an in-memory server creates its admin from ADMIN_LOGIN and ADMIN_PASSWORD"
                .into(),
        );
    }

    let repo = open_repository(&config).await?;
    let user = OrderService::new(repo, config).create_user(login, password, admin).await?;
    info!("User {} created with id {}", user.login, user.id);
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown");
}

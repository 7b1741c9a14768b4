mod config;
mod db;
mod error;
mod models;
mod routes;
mod services;
mod state;
mod store;

use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::config::{AppConfig, ConfigError, StoreBackend};
use crate::error::KanbanError;
use crate::services::session::SessionContext;
use crate::services::{auth, board};
use crate::store::DocumentStore;
use crate::store::memory::MemoryStore;
use crate::store::postgres::PgStore;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("database init failed: {0}")]
    Database(#[from] sqlx::Error),
    #[error("store unreachable: {0}")]
    Store(#[from] store::StoreError),
    #[error(transparent)]
    Service(#[from] KanbanError),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Parser, Debug)]
#[command(name = "kanboard", about = "Kanban board server")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default).
    Serve,
    /// Create a test user with its board, then verify the board layout.
    Seed {
        #[arg(long, default_value = "testuser123@gmail.com")]
        email: String,
        #[arg(long, default_value = "testuser123")]
        password: String,
        /// Also add demo cards and a "Review" column.
        #[arg(long)]
        with_sample_cards: bool,
    },
}

async fn open_store(config: &AppConfig) -> Result<Arc<dyn DocumentStore>, CliError> {
    let store: Arc<dyn DocumentStore> = match (config.store, config.database_url.as_deref()) {
        (StoreBackend::Postgres, Some(url)) => Arc::new(PgStore::new(db::init_pool(url, config.db_max_connections).await?)),
        (StoreBackend::Postgres, None) => return Err(ConfigError::Missing { var: "DATABASE_URL" }.into()),
        (StoreBackend::Memory, _) => {
            tracing::warn!("using in-memory store; data is lost on exit");
            Arc::new(MemoryStore::new())
        }
    };
    store.ping().await?;
    Ok(store)
}

async fn serve(config: AppConfig) -> Result<(), CliError> {
    let store = open_store(&config).await?;
    let port = config.port;
    let state = state::AppState::new(store, config);
    state.readiness.mark_ready();

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;

    tracing::info!(%port, "kanboard listening");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn seed(config: AppConfig, email: &str, password: &str, with_sample_cards: bool) -> Result<(), CliError> {
    let store = open_store(&config).await?;
    let store = store.as_ref();

    let session = match auth::signup(store, &config.auth, email, password).await {
        Ok(session) => {
            tracing::info!(user_id = %session.user_id, %email, "test user created");
            session
        }
        Err(KanbanError::Validation(message)) if message == auth::EMAIL_IN_USE => {
            tracing::info!(%email, "test user exists; logging in");
            auth::login(store, &config.auth, email, password).await?
        }
        Err(e) => return Err(e.into()),
    };

    let ctx = SessionContext::authenticated(session);
    let board = board::get_board(store, &ctx).await?;
    tracing::info!(board_id = %board.id, name = %board.name, "board ready");

    for check in board::verify_board_structure(store, &ctx).await? {
        tracing::info!(title = %check.title, status = ?check.status, "column check");
    }

    if with_sample_cards {
        for card in board::create_sample_content(store, &ctx).await? {
            tracing::info!(card_id = %card.id, column_id = %card.column_id, content = %card.content, "sample card");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = AppConfig::from_env()?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Seed { email, password, with_sample_cards } => {
            seed(config, &email, &password, with_sample_cards).await
        }
    }
}

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use legacy_radio::app::{build_router, build_state};
use legacy_radio::config::Config;
use legacy_radio::db::{create_pool, queries};
use legacy_radio::models::Role;

#[derive(Parser)]
#[command(name = "legacy-radio", about = "Legacy Radio subscription backend", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Grant the admin role to an existing account
    PromoteAdmin {
        /// Email address of the account
        email: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "legacy_radio=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();
    config.validate()?;

    let pool = create_pool(&config.database_path, 10)?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config, pool).await,
        Command::PromoteAdmin { email } => {
            let conn = pool.get()?;
            if !queries::set_user_role(&conn, &email, Role::Admin)? {
                anyhow::bail!("No account found for {}", email);
            }
            tracing::info!(email = %queries::normalize_email(&email), "Promoted to admin");
            Ok(())
        }
    }
}

async fn serve(config: Config, pool: legacy_radio::db::DbPool) -> anyhow::Result<()> {
    if config.dev_mode {
        tracing::warn!("Running in dev mode: sandbox payments enabled for unconfigured providers");
    }

    let state = build_state(&config, pool)?;
    let app = build_router(state, &config.cors_origins);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Legacy Radio listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

use parimutuel_ledger::config::Config;
use parimutuel_ledger::ledger::Ledger;
use parimutuel_ledger::state::AppState;
use parimutuel_ledger::store::PgLedger;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load env
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
        .context("Failed to connect DB")?;

    sqlx::migrate!()
        .run(&pool)
        .await
        .context("Failed to run migrations")?;

    let ledger = Ledger::new(PgLedger::new(pool), config.rules.clone());
    let app = parimutuel_ledger::app(AppState::new(ledger));

    tracing::info!("Server running on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;

    axum::serve(listener, app).await?;

    Ok(())
}

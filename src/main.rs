//! ModaNova Storefront - HTTP server

use anyhow::{Context, Result};
use modanova_storefront::api::{router, AppState};
use modanova_storefront::auth::bootstrap_admin;
use modanova_storefront::{Config, PgStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let store = PgStore::connect(&config.database_url, config.max_connections)
        .await
        .context("connecting to the database")?;
    store.migrate().await.context("running migrations")?;

    let purged = store.purge_expired_sessions().await?;
    if purged > 0 {
        tracing::info!(purged, "expired sessions removed");
    }
    bootstrap_admin(&store, &config).await.context("bootstrapping the admin account")?;

    let port = config.port;
    let app = router(AppState::new(store, config));
    tracing::info!("ModaNova storefront listening on 0.0.0.0:{}", port);
    axum::serve(tokio::net::TcpListener::bind(("0.0.0.0", port)).await?, app).await?;
    Ok(())
}

use coffee_shop_server::{create_router, AppState, Authorizer, Config, Database, KeySet};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Before the subscriber, so `.env` can set RUST_LOG.
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Ok(path) = dotenv {
        tracing::info!("Loaded environment from {}", path.display());
    }

    let config = Config::from_env()?;

    let db = Database::open(&config.db_path)?;
    if config.reset_db {
        let seeded = db.reset()?;
        tracing::warn!(seeded = %seeded.title, "Drink store reset");
    }

    let http = reqwest::Client::builder()
        .timeout(config.jwks_fetch_timeout)
        .build()?;
    let keys = KeySet::remote(config.jwks_url(), http, config.jwks_cache_ttl)
        .with_min_refresh(config.jwks_min_refresh);
    let auth = Authorizer::new(keys, &config.issuer(), &config.audience, &config.algorithms);

    let state = AppState {
        db: Arc::new(db),
        auth: Arc::new(auth),
    };

    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

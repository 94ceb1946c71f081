use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ratings_recommender::{
    config::Config,
    create_router,
    db::{create_pool, create_redis_client, Cache, PgRatingStore},
    services::providers::WhatsAppSender,
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let settings = config.engine_settings()?;

    let pool = create_pool(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database ready");

    let (cache, cache_writer) = match config.redis_url.as_deref() {
        Some(url) => {
            let (cache, handle) = Cache::new(create_redis_client(url)?).await;
            tracing::info!("Redis cache enabled");
            (cache, Some(handle))
        }
        None => {
            tracing::info!("REDIS_URL not set, caching disabled");
            (Cache::disabled(), None)
        }
    };

    let mut state = AppState::new(Arc::new(PgRatingStore::new(pool)), cache, settings);

    match (&config.whatsapp_token, &config.whatsapp_phone_number_id) {
        (Some(token), Some(phone_number_id)) => {
            state = state.with_messenger(Arc::new(WhatsAppSender::new(
                config.whatsapp_api_url.clone(),
                phone_number_id.clone(),
                token.clone(),
            )));
            tracing::info!("WhatsApp replies enabled");
        }
        _ => tracing::info!("WhatsApp credentials not set, chat replies disabled"),
    }
    if let Some(token) = &config.whatsapp_verify_token {
        state = state.with_whatsapp_verify_token(token.clone());
    }

    tracing::info!(
        cache_enabled = state.cache.is_enabled(),
        chat_replies = state.messenger.is_some(),
        "Application state ready"
    );

    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(handle) = cache_writer {
        handle.shutdown().await;
    }
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}

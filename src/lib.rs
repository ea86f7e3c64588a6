pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::db::{create_pool, create_redis_client, Cache, CacheWriterHandle, PgMovieStore};
use crate::routes::{create_router, AppState};
use crate::services::recommender::{ArtifactSet, Recommender, RecommenderConfig};

/// Installs the global tracing subscriber, honoring `RUST_LOG`
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "movieconnect_api=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Connects the store, loads artifacts and wires up the optional cache
///
/// Artifact problems surface here, before any request is served.
pub async fn build_recommender(config: &Config) -> anyhow::Result<(Recommender, Option<CacheWriterHandle>)> {
    let pool = create_pool(&config.database_url)
        .await
        .context("Failed to connect to Postgres")?;

    if config.run_migrations {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("Failed to run migrations")?;
        tracing::info!("Database migrations applied");
    }

    let artifacts = ArtifactSet::load(&config.artifact_dir, &config.artifact_version)
        .with_context(|| format!("Failed to load artifacts from {}", config.artifact_dir.display()))?;

    let mut recommender = Recommender::new(
        Arc::new(PgMovieStore::new(pool)),
        Arc::new(artifacts),
        RecommenderConfig::from(config),
    );

    let mut cache_handle = None;
    if let Some(redis_url) = &config.redis_url {
        let client = create_redis_client(redis_url)?;
        let (cache, handle) = Cache::new(client).await;
        recommender = recommender.with_cache(cache);
        cache_handle = Some(handle);
        tracing::info!("Recommendation cache enabled");
    }

    Ok((recommender, cache_handle))
}

/// Runs the HTTP server until ctrl-c
pub async fn run(config: Config) -> anyhow::Result<()> {
    let (recommender, cache_handle) = build_recommender(&config).await?;
    let state = AppState::new(Arc::new(recommender), config.default_top_n);
    let app = create_router(state);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Server running on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(handle) = cache_handle {
        handle.shutdown().await;
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}

use anyhow::Context;
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use movie_reco_api::{
    config::Config,
    db,
    routes::{create_router, AppState},
    services::{
        providers::TmdbProvider, selection::CatalogSchema, ElasticsearchIndex, Enricher,
        PgWarehouse, RecommendationPipeline,
    },
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "movie_reco_api=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let pool = db::create_pool(
        &config.warehouse_url,
        config.warehouse_max_connections,
        config.query_timeout(),
    )
    .await
    .context("Failed to connect to the analytical warehouse")?;
    tracing::info!("Connected to analytical warehouse");

    let provider = TmdbProvider::new(
        config.tmdb_api_key.clone(),
        config.tmdb_api_url.clone(),
        config.enrichment_timeout(),
    );

    let state = Arc::new(AppState {
        pipeline: RecommendationPipeline::new(
            Arc::new(PgWarehouse::new(pool)),
            CatalogSchema::from_config(&config),
        ),
        enricher: Enricher::from_config(Arc::new(provider), &config),
        search_index: Arc::new(ElasticsearchIndex::from_config(&config)),
        suggestion_limit: config.suggestion_limit,
    });

    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    tracing::info!(addr = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("Received terminate signal, shutting down"),
    }
}

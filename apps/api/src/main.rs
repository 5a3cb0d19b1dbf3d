mod config;
mod errors;
mod models;
mod payload;
mod routes;
mod state;
mod stores;
mod views;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::routes::build_router;
use crate::state::AppState;
use crate::stores::{HandleRegistry, RedisKvStore, S3FileStore, StaticTokenAuth};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting resume viewer API v{}", env!("CARGO_PKG_VERSION"));

    // Key-value store (resume records)
    let redis = redis::Client::open(config.redis_url.clone())?;
    let kv = RedisKvStore::connect(&redis).await?;
    info!("Redis connection established");

    // File store (PDFs and preview images)
    let s3 = build_s3_client(&config).await;
    let files = S3FileStore::new(s3, config.s3_bucket.clone());
    info!("S3 client initialized for bucket {}", config.s3_bucket);

    let state = AppState::new(
        Arc::new(kv),
        Arc::new(files),
        Arc::new(HandleRegistry::new()),
        Arc::new(StaticTokenAuth::new(config.api_token.clone())),
        Duration::from_secs(config.view_idle_secs),
    );

    // Views a client abandoned without closing are torn down once idle.
    let _idle_sweep = state
        .sessions
        .spawn_idle_sweep(Duration::from_secs(config.view_sweep_secs.max(1)));

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "resume-viewer-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new(config.s3_region.clone()))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    // MinIO serves buckets at path-style URLs.
    let s3_config = aws_sdk_s3::config::Builder::from(&s3_config)
        .force_path_style(true)
        .build();

    aws_sdk_s3::Client::from_conf(s3_config)
}

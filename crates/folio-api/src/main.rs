//! folio-api - HTTP API server for folio

use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::Arc;

use anyhow::Context;
use axum::http::HeaderValue;
use governor::{Quota, RateLimiter};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use folio_api::{ApiRateLimiter, AppState};
use folio_core::defaults;
use folio_db::{Database, FilesystemStore};

/// Parse the CORS origin whitelist from `CORS_ALLOWED_ORIGINS`.
fn parse_allowed_origins() -> Vec<HeaderValue> {
    let origins_str = std::env::var("CORS_ALLOWED_ORIGINS")
        .unwrap_or_else(|_| "http://localhost:3000,http://localhost:5173".to_string());

    if origins_str.trim().is_empty() {
        // Default origins
        return vec![
            HeaderValue::from_static("http://localhost:3000"),
            HeaderValue::from_static("http://localhost:5173"),
        ];
    }

    origins_str
        .split(',')
        .filter_map(|s| {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            match trimmed.parse::<HeaderValue>() {
                Ok(v) => Some(v),
                Err(e) => {
                    tracing::warn!("Invalid CORS origin '{}': {}", trimmed, e);
                    None
                }
            }
        })
        .collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with configurable output
    //
    // Environment variables:
    //   LOG_FORMAT  - "json" or "text" (default: "text")
    //   LOG_FILE    - path to log file (optional, enables file logging)
    //   LOG_ANSI    - "true"/"false" override ANSI colors (auto-detected by default)
    //   RUST_LOG    - standard env filter (default: "folio_api=debug,tower_http=debug")
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "folio_api=debug,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(env_filter);

    // Optionally create a file appender with daily rotation
    let _file_guard = if let Some(ref path) = log_file {
        let file_dir = std::path::Path::new(path)
            .parent()
            .unwrap_or(std::path::Path::new("."));
        let file_name = std::path::Path::new(path)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("folio-api.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer().with_writer(non_blocking);
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            } else {
                layer = layer.with_ansi(false); // no ANSI in files
            }
            registry.with(layer).init();
        }
        Some(guard)
    } else {
        // Console-only output
        if log_format == "json" {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer();
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).init();
        }
        None
    };

    info!(
        log_format = %log_format,
        log_file = log_file.as_deref().unwrap_or("(stdout)"),
        "Logging initialized"
    );

    // Get configuration from environment
    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| "postgres://localhost/folio".to_string());
    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = std::env::var("PORT")
        .unwrap_or_else(|_| "3000".to_string())
        .parse()
        .unwrap_or(3000);

    // Base URL for blob links handed back by the upload endpoint
    let public_base_url = std::env::var("PUBLIC_BASE_URL")
        .unwrap_or_else(|_| format!("http://{}:{}", host, port));

    // The identity gateway must share this secret; refusing to start without
    // it beats minting sessions nobody can verify.
    let auth_shared_secret =
        std::env::var("AUTH_SHARED_SECRET").context("AUTH_SHARED_SECRET must be set")?;
    if auth_shared_secret.trim().is_empty() {
        anyhow::bail!("AUTH_SHARED_SECRET must not be empty");
    }

    // Logins with this open id get the admin role
    let owner_open_id = std::env::var("OWNER_OPEN_ID")
        .ok()
        .filter(|v| !v.is_empty());

    let session_ttl_days: i64 = std::env::var("SESSION_TTL_DAYS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(defaults::SESSION_TTL_DAYS);
    let login_max_skew_secs: i64 = std::env::var("LOGIN_MAX_SKEW_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(defaults::LOGIN_MAX_SKEW_SECS);
    let upload_max_bytes: usize = std::env::var("UPLOAD_MAX_BYTES")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(defaults::UPLOAD_MAX_BYTES);

    // Rate limiting configuration; RATE_LIMIT_RPS=0 disables limiting
    let rate_limit_rps: u32 = std::env::var("RATE_LIMIT_RPS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(defaults::RATE_LIMIT_RPS);
    let rate_limit_burst: u32 = std::env::var("RATE_LIMIT_BURST")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(defaults::RATE_LIMIT_BURST);

    // Connect to database
    info!("Connecting to database...");
    let db = Database::connect(&database_url)
        .await?
        .with_owner_open_id(owner_open_id.clone());
    info!("Database connected");

    // Run pending database migrations on startup
    info!("Running database migrations...");
    db.migrate().await?;
    info!("Database migrations complete");

    if let Some(ref owner) = owner_open_id {
        info!(owner_open_id = %owner, "Owner identity configured");
    }

    // Initialize blob storage and prove it can round-trip a write
    let storage_path =
        std::env::var("STORAGE_PATH").unwrap_or_else(|_| "/var/lib/folio/files".to_string());
    let store = FilesystemStore::new(&storage_path, &public_base_url);
    store.validate().await?;
    info!("Blob storage initialized at {}", storage_path);

    // Create rate limiter if enabled
    let rate_limiter: Option<Arc<ApiRateLimiter>> = match (
        NonZeroU32::new(rate_limit_rps),
        NonZeroU32::new(rate_limit_burst),
    ) {
        (Some(rps), Some(burst)) => {
            info!(
                "Rate limiting enabled ({} req/s per client, burst {})",
                rps, burst
            );
            let quota = Quota::per_second(rps).allow_burst(burst);
            Some(Arc::new(RateLimiter::keyed(quota)))
        }
        _ => {
            info!("Rate limiting disabled");
            None
        }
    };

    // Drop idle per-IP buckets so the limiter map stays bounded
    if let Some(ref limiter) = rate_limiter {
        let limiter = Arc::clone(limiter);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(std::time::Duration::from_secs(60));
            loop {
                interval.tick().await;
                limiter.retain_recent();
            }
        });
    }

    // Periodic pool health log
    let metrics_pool = db.pool().clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(60));
        loop {
            interval.tick().await;
            folio_db::log_pool_metrics(&metrics_pool);
        }
    });

    // Create app state
    let state = AppState {
        db,
        blobs: Arc::new(store),
        auth_shared_secret: Arc::new(auth_shared_secret),
        session_ttl: chrono::Duration::try_days(session_ttl_days)
            .unwrap_or_else(|| chrono::Duration::days(defaults::SESSION_TTL_DAYS)),
        login_max_skew: chrono::Duration::try_seconds(login_max_skew_secs)
            .unwrap_or_else(|| chrono::Duration::seconds(defaults::LOGIN_MAX_SKEW_SECS)),
        upload_max_bytes,
        rate_limiter,
    };

    // Build router
    let app = folio_api::router(state, parse_allowed_origins());

    // Start server
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to install shutdown handler");
            // Without a handler the server can only be killed externally
            std::future::pending::<()>().await;
        }
    }
}

//! # folio-api
//!
//! HTTP surface of folio: session-cookie authentication, category and note
//! CRUD, the image upload pipeline, and blob serving.
//!
//! The binary in `main.rs` only reads configuration and serves the router
//! built here; everything reachable from a request lives in this library so
//! the full stack can be driven in tests without a listening socket.

pub mod auth;
pub mod error;
pub mod handlers;

use std::net::IpAddr;
use std::sync::Arc;

use governor::RateLimiter;

use folio_db::{BlobStore, Database};

pub use error::ApiError;
pub use handlers::router;

/// Per-client rate limiter, keyed by peer IP.
pub type ApiRateLimiter = RateLimiter<
    IpAddr,
    governor::state::keyed::DefaultKeyedStateStore<IpAddr>,
    governor::clock::DefaultClock,
>;

/// Shared application state, cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    /// Database repositories.
    pub db: Database,
    /// Blob store behind image uploads and `/files/{key}`.
    pub blobs: Arc<dyn BlobStore>,
    /// Shared secret the identity gateway signs login assertions with.
    pub auth_shared_secret: Arc<String>,
    /// Lifetime of a minted session.
    pub session_ttl: chrono::Duration,
    /// Accepted clock skew on login assertion timestamps.
    pub login_max_skew: chrono::Duration,
    /// Cap on the decoded upload payload, in bytes.
    pub upload_max_bytes: usize,
    /// Request limiter; `None` disables limiting.
    pub rate_limiter: Option<Arc<ApiRateLimiter>>,
}

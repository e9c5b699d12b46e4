//! Route handlers and router assembly for the folio API.
//!
//! Every operation follows the same shape: deserialize a typed request,
//! resolve the session (optional for reads, required for mutations), call
//! the matching repository, and answer with the normalized JSON envelope.
//! Reads never leak existence: a missing or foreign row serializes as
//! `null` or an empty list instead of an error.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Path, Query, Request, State};
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use uuid::Uuid;

use folio_core::defaults;
use folio_core::{
    detect_content_type, storage_key, storage_suffix, validate_payload, CategoryRepository,
    CreateCategory, CreateNote, DataUri, NoteRepository, SessionRepository, UpdateNote,
    UpsertUser, UserRepository,
};

use crate::auth::{
    clear_session_cookie, session_cookie, session_token_from_headers, verify_assertion, Auth,
    RequireAuth,
};
use crate::error::ApiError;
use crate::AppState;

// =============================================================================
// REQUEST ID (UUIDv7)
// =============================================================================

/// Generates time-ordered UUIDv7 request correlation IDs.
///
/// UUIDv7 embeds a Unix timestamp, so request IDs sort chronologically in
/// log output without a separate sequence counter.
#[derive(Clone, Default)]
struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

// =============================================================================
// ROUTER
// =============================================================================

/// Build the full application router, middleware included.
///
/// `allowed_origins` is the CORS whitelist; credentials are always allowed
/// because the session travels in a cookie.
pub fn router(state: AppState, allowed_origins: Vec<HeaderValue>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Session management
        .route("/api/v1/auth/login", post(login))
        .route("/api/v1/auth/me", get(me))
        .route("/api/v1/auth/logout", post(logout))
        // Categories
        .route(
            "/api/v1/categories",
            get(list_categories).post(create_category),
        )
        .route("/api/v1/categories/:id", delete(delete_category))
        // Notes
        .route("/api/v1/notes", get(list_notes).post(create_note))
        .route(
            "/api/v1/notes/:id",
            get(get_note).patch(update_note).delete(delete_note),
        )
        // Image uploads
        .route("/api/v1/uploads/images", post(upload_image))
        // Stored blobs
        .route("/files/*key", get(serve_file))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .layer({
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(allowed_origins))
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PATCH,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
                .allow_credentials(true)
                .max_age(std::time::Duration::from_secs(3600))
        })
        .layer(RequestBodyLimitLayer::new(defaults::BODY_LIMIT_BYTES))
        .with_state(state)
}

// =============================================================================
// RATE LIMITING
// =============================================================================

async fn rate_limit_middleware(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Result<impl IntoResponse, (StatusCode, Json<serde_json::Value>)> {
    if let Some(limiter) = &state.rate_limiter {
        if limiter.check_key(&addr.ip()).is_err() {
            warn!(client_ip = %addr.ip(), "Rate limit exceeded");
            return Err((
                StatusCode::TOO_MANY_REQUESTS,
                Json(serde_json::json!({
                    "error": "Too many requests. Please wait before retrying."
                })),
            ));
        }
    }
    Ok(next.run(request).await)
}

// =============================================================================
// HEALTH CHECK
// =============================================================================

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// =============================================================================
// AUTH HANDLERS
// =============================================================================

/// Signed identity assertion posted by the fronting gateway.
///
/// The profile fields ride along unsigned; the signature covers the
/// `"{openId}.{timestamp}"` pair that establishes who is logging in and
/// when.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest {
    #[serde(flatten)]
    identity: UpsertUser,
    /// Unix seconds at which the gateway issued the assertion.
    timestamp: i64,
    /// Hex HMAC-SHA256 over `"{openId}.{timestamp}"`.
    signature: String,
}

/// Exchange a valid assertion for a user row and a session cookie.
async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let now = Utc::now().timestamp();
    if now.abs_diff(body.timestamp) > state.login_max_skew.num_seconds().unsigned_abs() {
        return Err(ApiError::Unauthorized(
            "Login assertion expired".to_string(),
        ));
    }

    if !verify_assertion(
        &state.auth_shared_secret,
        &body.identity.open_id,
        body.timestamp,
        &body.signature,
    ) {
        warn!(open_id = %body.identity.open_id, "Login assertion signature rejected");
        return Err(ApiError::Unauthorized(
            "Invalid login signature".to_string(),
        ));
    }

    let user = state.db.users.upsert(body.identity).await?;
    let (token, session) = state.db.sessions.create(user.id, state.session_ttl).await?;

    info!(
        subsystem = "api",
        user_id = %user.id,
        session_id = %session.id,
        "User logged in"
    );

    Ok((
        [(
            header::SET_COOKIE,
            session_cookie(&token, state.session_ttl.num_seconds()),
        )],
        Json(user),
    ))
}

/// Current user, or `null` without a valid session.
async fn me(auth: Auth) -> impl IntoResponse {
    Json(auth.user)
}

/// Revoke the session behind the cookie, if any, and clear the cookie.
/// Logging out without a session still succeeds.
async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(token) = session_token_from_headers(&headers) {
        state.db.sessions.revoke(&token).await?;
    }

    Ok((
        [(header::SET_COOKIE, clear_session_cookie())],
        Json(serde_json::json!({ "success": true })),
    ))
}

// =============================================================================
// CATEGORY HANDLERS
// =============================================================================

async fn list_categories(
    State(state): State<AppState>,
    auth: Auth,
) -> Result<impl IntoResponse, ApiError> {
    let categories = match auth.user {
        Some(user) => state.db.categories.list_for_user(user.id).await?,
        None => Vec::new(),
    };
    Ok(Json(categories))
}

async fn create_category(
    State(state): State<AppState>,
    auth: RequireAuth,
    Json(body): Json<CreateCategory>,
) -> Result<impl IntoResponse, ApiError> {
    if body.name.trim().is_empty() {
        return Err(ApiError::BadRequest("Invalid category name".to_string()));
    }

    let id = state.db.categories.create(auth.user.id, body).await?;
    info!(
        subsystem = "api",
        user_id = %auth.user.id,
        category_id = %id,
        "Category created"
    );
    Ok(Json(serde_json::json!({ "success": true })))
}

/// Deleting a category another user owns, or one that does not exist,
/// affects zero rows and still reports success.
async fn delete_category(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.db.categories.delete(id, auth.user.id).await?;
    Ok(Json(serde_json::json!({ "success": true })))
}

// =============================================================================
// NOTE HANDLERS
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListNotesQuery {
    #[serde(default, alias = "category_id")]
    category_id: Option<Uuid>,
}

async fn list_notes(
    State(state): State<AppState>,
    auth: Auth,
    Query(query): Query<ListNotesQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let notes = match auth.user {
        Some(user) => {
            state
                .db
                .notes
                .list_for_user(user.id, query.category_id)
                .await?
        }
        None => Vec::new(),
    };
    tracing::debug!(subsystem = "api", result_count = notes.len(), "Notes listed");
    Ok(Json(notes))
}

/// `null` covers both "does not exist" and "belongs to another user".
async fn get_note(
    State(state): State<AppState>,
    auth: Auth,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let note = match auth.user {
        Some(user) => state.db.notes.get_by_id(id, user.id).await?,
        None => None,
    };
    Ok(Json(note))
}

async fn create_note(
    State(state): State<AppState>,
    auth: RequireAuth,
    Json(body): Json<CreateNote>,
) -> Result<impl IntoResponse, ApiError> {
    if body.title.trim().is_empty() {
        return Err(ApiError::BadRequest("Invalid title".to_string()));
    }

    let id = state.db.notes.create(auth.user.id, body).await?;
    info!(
        subsystem = "api",
        user_id = %auth.user.id,
        note_id = %id,
        "Note created"
    );
    Ok(Json(serde_json::json!({ "success": true, "id": id })))
}

async fn update_note(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateNote>,
) -> Result<impl IntoResponse, ApiError> {
    state.db.notes.update(id, auth.user.id, body).await?;
    Ok(Json(serde_json::json!({ "success": true })))
}

async fn delete_note(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.db.notes.delete(id, auth.user.id).await?;
    Ok(Json(serde_json::json!({ "success": true })))
}

// =============================================================================
// UPLOAD & FILE HANDLERS
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadImageRequest {
    /// Full data-URI (`data:<mime>;base64,<payload>`).
    base64: String,
    /// Original filename; only its extension survives into the storage key.
    filename: String,
}

/// Decode an inline image and persist it, answering with the public URL
/// the client embeds in note content.
async fn upload_image(
    State(state): State<AppState>,
    auth: RequireAuth,
    Json(body): Json<UploadImageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if body.base64.is_empty() {
        return Err(ApiError::BadRequest("Invalid base64 data".to_string()));
    }
    if body.filename.is_empty() {
        return Err(ApiError::BadRequest("Invalid filename".to_string()));
    }

    let payload = DataUri::parse(&body.base64)?;
    validate_payload(&payload.data, state.upload_max_bytes)?;

    let key = storage_key(
        auth.user.id,
        &body.filename,
        Utc::now().timestamp_millis(),
        &storage_suffix(),
    );
    let url = state.blobs.put(&key, &payload.data).await?;

    info!(
        subsystem = "api",
        user_id = %auth.user.id,
        storage_key = %key,
        bytes = payload.data.len(),
        declared_mime = %payload.mime,
        "Image uploaded"
    );

    Ok(Json(serde_json::json!({ "url": url })))
}

/// Serve a stored blob. Content type comes from the stored bytes, not the
/// upload's declaration. Stored keys are write-once, and the response
/// carries a far-future cache header.
async fn serve_file(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let data = state.blobs.get(&key).await?;
    let content_type = detect_content_type(&key, &data);

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (
                header::CACHE_CONTROL,
                "public, max-age=31536000, immutable".to_string(),
            ),
        ],
        data,
    ))
}

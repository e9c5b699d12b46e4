//! Centralized default constants for the folio service.
//!
//! **This module is the single source of truth** for all shared default
//! values. The database and API crates reference these constants instead of
//! defining their own magic numbers.

// =============================================================================
// SESSIONS
// =============================================================================

/// Session lifetime in days.
pub const SESSION_TTL_DAYS: i64 = 30;

/// Random character count in a session token (after the prefix).
pub const SESSION_TOKEN_LEN: usize = 43;

/// Prefix identifying folio session tokens.
pub const SESSION_TOKEN_PREFIX: &str = "fol_sess_";

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "folio_session";

// =============================================================================
// LOGIN ASSERTIONS
// =============================================================================

/// Maximum accepted clock skew for a signed login assertion, in seconds.
pub const LOGIN_MAX_SKEW_SECS: i64 = 300;

// =============================================================================
// UPLOADS
// =============================================================================

/// Maximum decoded upload payload size in bytes (5 MiB).
pub const UPLOAD_MAX_BYTES: usize = 5 * 1024 * 1024;

/// Random suffix length in a storage key (same-millisecond collision guard).
pub const UPLOAD_SUFFIX_LEN: usize = 6;

/// Extension used when an uploaded filename carries none.
pub const UPLOAD_DEFAULT_EXT: &str = "jpg";

// =============================================================================
// HTTP
// =============================================================================

/// Request body cap in bytes (16 MiB; leaves room for base64 overhead
/// above the decoded upload cap).
pub const BODY_LIMIT_BYTES: usize = 16 * 1024 * 1024;

/// Sustained per-IP request rate (requests per second).
pub const RATE_LIMIT_RPS: u32 = 20;

/// Per-IP burst allowance.
pub const RATE_LIMIT_BURST: u32 = 60;

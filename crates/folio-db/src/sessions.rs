//! Cookie-session repository implementation.
//!
//! Raw tokens never touch the database: rows store a SHA-256 hash, and
//! validation looks the hash up joined to its user row.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use folio_core::defaults::{SESSION_TOKEN_LEN, SESSION_TOKEN_PREFIX};
use folio_core::{Error, Result, Session, SessionRepository, User};

use crate::users::map_user;

/// PostgreSQL implementation of SessionRepository.
pub struct PgSessionRepository {
    pool: Pool<Postgres>,
}

impl PgSessionRepository {
    /// Create a new PgSessionRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Generate a fresh session token: prefix plus random alphanumerics.
    fn generate_token() -> String {
        const CHARSET: &[u8] =
            b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
        let mut rng = rand::thread_rng();
        let secret: String = (0..SESSION_TOKEN_LEN)
            .map(|_| {
                let idx = rng.gen_range(0..CHARSET.len());
                CHARSET[idx] as char
            })
            .collect();
        format!("{}{}", SESSION_TOKEN_PREFIX, secret)
    }

    /// Hash a token using SHA256.
    fn hash_token(token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[async_trait]
impl SessionRepository for PgSessionRepository {
    async fn create(&self, user_id: Uuid, ttl: Duration) -> Result<(String, Session)> {
        let token = Self::generate_token();
        let hash = Self::hash_token(&token);
        let now = Utc::now();
        let session = Session {
            id: Uuid::now_v7(),
            user_id,
            created_at: now,
            expires_at: now + ttl,
            revoked_at: None,
        };

        sqlx::query(
            "INSERT INTO session (id, user_id, token_hash, created_at, expires_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(session.id)
        .bind(session.user_id)
        .bind(&hash)
        .bind(session.created_at)
        .bind(session.expires_at)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok((token, session))
    }

    async fn validate(&self, token: &str) -> Result<Option<User>> {
        let hash = Self::hash_token(token);

        let row = sqlx::query(
            "SELECT u.id, u.open_id, u.name, u.email, u.login_method, \
                    u.last_signed_in, u.role, u.created_at, u.updated_at \
             FROM session s \
             JOIN app_user u ON u.id = s.user_id \
             WHERE s.token_hash = $1 \
               AND s.revoked_at IS NULL \
               AND s.expires_at > $2",
        )
        .bind(&hash)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.as_ref().map(map_user).transpose()
    }

    async fn revoke(&self, token: &str) -> Result<bool> {
        let hash = Self::hash_token(token);

        let result = sqlx::query(
            "UPDATE session SET revoked_at = $1 \
             WHERE token_hash = $2 AND revoked_at IS NULL",
        )
        .bind(Utc::now())
        .bind(&hash)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_token_shape() {
        let token = PgSessionRepository::generate_token();
        assert!(token.starts_with(SESSION_TOKEN_PREFIX));
        assert_eq!(token.len(), SESSION_TOKEN_PREFIX.len() + SESSION_TOKEN_LEN);
        assert!(token[SESSION_TOKEN_PREFIX.len()..]
            .chars()
            .all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_generate_token_is_unique() {
        let a = PgSessionRepository::generate_token();
        let b = PgSessionRepository::generate_token();
        assert_ne!(a, b);
    }

    #[test]
    fn test_hash_token_is_hex_sha256() {
        let hash = PgSessionRepository::hash_token("fol_sess_abc");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(hash, PgSessionRepository::hash_token("fol_sess_abc"));
        assert_ne!(hash, PgSessionRepository::hash_token("fol_sess_abd"));
    }
}

//! User repository implementation.
//!
//! Users are keyed by the external open id and maintained with a single
//! upsert on every login. Merge rules: a field absent from the incoming
//! record leaves the stored value alone, a field present-but-null clears
//! it, and a record with nothing to merge still refreshes `last_signed_in`.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use folio_core::{Error, Result, UpsertUser, User, UserRepository, UserRole};

const USER_COLUMNS: &str =
    "id, open_id, name, email, login_method, last_signed_in, role, created_at, updated_at";

/// PostgreSQL implementation of UserRepository.
pub struct PgUserRepository {
    pool: Pool<Postgres>,
    owner_open_id: Option<String>,
}

impl PgUserRepository {
    /// Create a new PgUserRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            pool,
            owner_open_id: None,
        }
    }

    /// Configure the owner identity whose logins are granted the admin role.
    pub fn with_owner(mut self, open_id: Option<String>) -> Self {
        self.owner_open_id = open_id;
        self
    }
}

/// Build the `DO UPDATE SET` clauses for an upsert.
///
/// Fixed binds: `$7` is the insert-path role, `$8` the current time.
/// Dynamic params start at `$9` in the order name, email, login_method,
/// last_signed_in. A record with no profile fields falls back to
/// refreshing `last_signed_in` from `$8`.
fn upsert_update_clauses(record: &UpsertUser, is_owner: bool) -> Vec<String> {
    let mut updates: Vec<String> = vec!["updated_at = $8".to_string()];
    let mut param_idx = 9;

    if record.name.is_some() {
        updates.push(format!("name = ${}", param_idx));
        param_idx += 1;
    }
    if record.email.is_some() {
        updates.push(format!("email = ${}", param_idx));
        param_idx += 1;
    }
    if record.login_method.is_some() {
        updates.push(format!("login_method = ${}", param_idx));
        param_idx += 1;
    }
    if record.last_signed_in.is_some() {
        updates.push(format!("last_signed_in = ${}", param_idx));
    } else if !record.has_profile_fields() {
        updates.push("last_signed_in = $8".to_string());
    }
    if is_owner {
        updates.push("role = $7".to_string());
    }

    updates
}

/// Map a database row to a User.
pub(crate) fn map_user(row: &PgRow) -> Result<User> {
    let role: String = row.get("role");
    Ok(User {
        id: row.get("id"),
        open_id: row.get("open_id"),
        name: row.get("name"),
        email: row.get("email"),
        login_method: row.get("login_method"),
        last_signed_in: row.get("last_signed_in"),
        role: role.parse().map_err(Error::Internal)?,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn upsert(&self, record: UpsertUser) -> Result<User> {
        if record.open_id.is_empty() {
            return Err(Error::InvalidInput("openId is required".to_string()));
        }

        let now = Utc::now();
        let id = Uuid::now_v7();
        let is_owner = self
            .owner_open_id
            .as_deref()
            .is_some_and(|owner| owner == record.open_id);
        let role = if is_owner {
            UserRole::Admin
        } else {
            UserRole::User
        };
        let signed_in = record.last_signed_in.unwrap_or(now);

        let updates = upsert_update_clauses(&record, is_owner);
        let query = format!(
            "INSERT INTO app_user ({columns}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8) \
             ON CONFLICT (open_id) DO UPDATE SET {updates} \
             RETURNING {columns}",
            columns = USER_COLUMNS,
            updates = updates.join(", "),
        );

        let mut q = sqlx::query(&query)
            .bind(id)
            .bind(&record.open_id)
            .bind(record.name.clone().flatten())
            .bind(record.email.clone().flatten())
            .bind(record.login_method.clone().flatten())
            .bind(signed_in)
            .bind(role.to_string())
            .bind(now);
        if let Some(name) = record.name {
            q = q.bind(name);
        }
        if let Some(email) = record.email {
            q = q.bind(email);
        }
        if let Some(login_method) = record.login_method {
            q = q.bind(login_method);
        }
        if let Some(last_signed_in) = record.last_signed_in {
            q = q.bind(last_signed_in);
        }

        let row = q.fetch_one(&self.pool).await.map_err(Error::Database)?;
        map_user(&row)
    }

    async fn get_by_open_id(&self, open_id: &str) -> Result<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM app_user WHERE open_id = $1",
            USER_COLUMNS
        ))
        .bind(open_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.as_ref().map(map_user).transpose()
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM app_user WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.as_ref().map(map_user).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_clauses_bare_record_refreshes_sign_in() {
        let record = UpsertUser::new("u1");
        let updates = upsert_update_clauses(&record, false);
        assert_eq!(
            updates,
            vec!["updated_at = $8".to_string(), "last_signed_in = $8".to_string()]
        );
    }

    #[test]
    fn test_update_clauses_partial_record_leaves_sign_in_alone() {
        let record = UpsertUser {
            name: Some(Some("Ada".to_string())),
            ..UpsertUser::new("u1")
        };
        let updates = upsert_update_clauses(&record, false);
        assert_eq!(
            updates,
            vec!["updated_at = $8".to_string(), "name = $9".to_string()]
        );
    }

    #[test]
    fn test_update_clauses_null_field_still_applies() {
        // Present-but-null clears the column; the clause must appear.
        let record = UpsertUser {
            email: Some(None),
            ..UpsertUser::new("u1")
        };
        let updates = upsert_update_clauses(&record, false);
        assert!(updates.contains(&"email = $9".to_string()));
        assert!(!updates.iter().any(|u| u.starts_with("last_signed_in")));
    }

    #[test]
    fn test_update_clauses_param_order() {
        let record = UpsertUser {
            name: Some(Some("Ada".to_string())),
            email: Some(None),
            login_method: Some(Some("oauth".to_string())),
            last_signed_in: Some(Utc::now()),
            ..UpsertUser::new("u1")
        };
        let updates = upsert_update_clauses(&record, false);
        assert_eq!(
            updates,
            vec![
                "updated_at = $8".to_string(),
                "name = $9".to_string(),
                "email = $10".to_string(),
                "login_method = $11".to_string(),
                "last_signed_in = $12".to_string(),
            ]
        );
    }

    #[test]
    fn test_update_clauses_owner_forces_role() {
        let record = UpsertUser::new("owner-id");
        let updates = upsert_update_clauses(&record, true);
        assert!(updates.contains(&"role = $7".to_string()));

        let updates = upsert_update_clauses(&record, false);
        assert!(!updates.contains(&"role = $7".to_string()));
    }
}

//! Note repository implementation.
//!
//! Scoping matches the category repository: the `(id, user_id)` pair must
//! match, and a miss is indistinguishable from a row owned by someone else.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use folio_core::{CreateNote, Error, Note, NoteRepository, Result, UpdateNote};

const NOTE_COLUMNS: &str = "id, user_id, category_id, title, content, created_at, updated_at";

/// PostgreSQL implementation of NoteRepository.
pub struct PgNoteRepository {
    pool: Pool<Postgres>,
}

impl PgNoteRepository {
    /// Create a new PgNoteRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

/// Build the SET clauses for a partial note update.
///
/// Fixed binds: `$1` is the current time, `$2` the note id, `$3` the user
/// id. Dynamic params start at `$4` in the order title, content,
/// category_id. `updated_at` is always bumped, so an empty update is a
/// pure touch.
fn update_set_clauses(request: &UpdateNote) -> Vec<String> {
    let mut updates: Vec<String> = vec!["updated_at = $1".to_string()];
    let mut param_idx = 4;

    if request.title.is_some() {
        updates.push(format!("title = ${}", param_idx));
        param_idx += 1;
    }
    if request.content.is_some() {
        updates.push(format!("content = ${}", param_idx));
        param_idx += 1;
    }
    if request.category_id.is_some() {
        updates.push(format!("category_id = ${}", param_idx));
    }

    updates
}

fn map_note(row: &PgRow) -> Note {
    Note {
        id: row.get("id"),
        user_id: row.get("user_id"),
        category_id: row.get("category_id"),
        title: row.get("title"),
        content: row.get("content"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[async_trait]
impl NoteRepository for PgNoteRepository {
    async fn list_for_user(&self, user_id: Uuid, category_id: Option<Uuid>) -> Result<Vec<Note>> {
        let rows = if let Some(category_id) = category_id {
            sqlx::query(&format!(
                "SELECT {} FROM note \
                 WHERE user_id = $1 AND category_id = $2 \
                 ORDER BY updated_at DESC",
                NOTE_COLUMNS
            ))
            .bind(user_id)
            .bind(category_id)
            .fetch_all(&self.pool)
            .await
        } else {
            sqlx::query(&format!(
                "SELECT {} FROM note WHERE user_id = $1 ORDER BY updated_at DESC",
                NOTE_COLUMNS
            ))
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
        }
        .map_err(Error::Database)?;

        Ok(rows.iter().map(map_note).collect())
    }

    async fn get_by_id(&self, id: Uuid, user_id: Uuid) -> Result<Option<Note>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM note WHERE id = $1 AND user_id = $2",
            NOTE_COLUMNS
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.as_ref().map(map_note))
    }

    async fn create(&self, user_id: Uuid, request: CreateNote) -> Result<Uuid> {
        let id = Uuid::now_v7();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO note (id, user_id, category_id, title, content, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $6)",
        )
        .bind(id)
        .bind(user_id)
        .bind(request.category_id)
        .bind(&request.title)
        .bind(&request.content)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(id)
    }

    async fn update(&self, id: Uuid, user_id: Uuid, request: UpdateNote) -> Result<u64> {
        let updates = update_set_clauses(&request);
        let query = format!(
            "UPDATE note SET {} WHERE id = $2 AND user_id = $3",
            updates.join(", ")
        );

        let mut q = sqlx::query(&query).bind(Utc::now()).bind(id).bind(user_id);
        if let Some(title) = request.title {
            q = q.bind(title);
        }
        if let Some(content) = request.content {
            q = q.bind(content);
        }
        if let Some(category_id) = request.category_id {
            // The inner Option carries an explicit null that clears the
            // dangling-capable reference.
            q = q.bind(category_id);
        }

        let result = q.execute(&self.pool).await.map_err(Error::Database)?;
        Ok(result.rows_affected())
    }

    async fn delete(&self, id: Uuid, user_id: Uuid) -> Result<u64> {
        let result = sqlx::query("DELETE FROM note WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_clauses_empty_update_is_a_touch() {
        let request = UpdateNote::default();
        assert_eq!(update_set_clauses(&request), vec!["updated_at = $1".to_string()]);
    }

    #[test]
    fn test_set_clauses_full_update_param_order() {
        let request = UpdateNote {
            title: Some("t".to_string()),
            content: Some("c".to_string()),
            category_id: Some(Some(Uuid::now_v7())),
        };
        assert_eq!(
            update_set_clauses(&request),
            vec![
                "updated_at = $1".to_string(),
                "title = $4".to_string(),
                "content = $5".to_string(),
                "category_id = $6".to_string(),
            ]
        );
    }

    #[test]
    fn test_set_clauses_clear_category_only() {
        let request = UpdateNote {
            category_id: Some(None),
            ..Default::default()
        };
        assert_eq!(
            update_set_clauses(&request),
            vec!["updated_at = $1".to_string(), "category_id = $4".to_string()]
        );
    }
}

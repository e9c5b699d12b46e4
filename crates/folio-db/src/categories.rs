//! Category repository implementation.
//!
//! Every operation is scoped by the owning user id in the WHERE clause;
//! touching another user's row matches nothing and is not an error.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use folio_core::{Category, CategoryRepository, CreateCategory, Error, Result};

/// PostgreSQL implementation of CategoryRepository.
pub struct PgCategoryRepository {
    pool: Pool<Postgres>,
}

impl PgCategoryRepository {
    /// Create a new PgCategoryRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn map_category(row: &PgRow) -> Category {
    Category {
        id: row.get("id"),
        user_id: row.get("user_id"),
        name: row.get("name"),
        color: row.get("color"),
        created_at: row.get("created_at"),
    }
}

#[async_trait]
impl CategoryRepository for PgCategoryRepository {
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Category>> {
        let rows = sqlx::query(
            "SELECT id, user_id, name, color, created_at \
             FROM category WHERE user_id = $1 \
             ORDER BY created_at ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.iter().map(map_category).collect())
    }

    async fn create(&self, user_id: Uuid, request: CreateCategory) -> Result<Uuid> {
        let id = Uuid::now_v7();

        sqlx::query(
            "INSERT INTO category (id, user_id, name, color, created_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(id)
        .bind(user_id)
        .bind(&request.name)
        .bind(&request.color)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(id)
    }

    async fn delete(&self, id: Uuid, user_id: Uuid) -> Result<u64> {
        // No cascade and no null-out: notes referencing this category keep
        // their dangling category_id.
        let result = sqlx::query("DELETE FROM category WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(result.rows_affected())
    }
}

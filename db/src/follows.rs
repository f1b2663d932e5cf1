use chrono::{DateTime, Utc};
use color_eyre::Result;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{users::User, Page};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Follow {
    pub follow_id: Uuid,
    pub user_id: Uuid,
    pub author_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Follow {
    /// `None` when `user_id` already follows `author_id`.
    pub async fn create(pool: &PgPool, user_id: Uuid, author_id: Uuid) -> Result<Option<Self>> {
        let follow = sqlx::query_as::<_, Follow>(
            "
            INSERT INTO follows (user_id, author_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, author_id) DO NOTHING
            RETURNING *
            ",
        )
        .bind(user_id)
        .bind(author_id)
        .fetch_optional(pool)
        .await?;

        Ok(follow)
    }

    /// Returns whether a subscription was removed.
    pub async fn delete(pool: &PgPool, user_id: Uuid, author_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM follows WHERE user_id = $1 AND author_id = $2")
            .bind(user_id)
            .bind(author_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn exists(pool: &PgPool, user_id: Uuid, author_id: Uuid) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM follows WHERE user_id = $1 AND author_id = $2)",
        )
        .bind(user_id)
        .bind(author_id)
        .fetch_one(pool)
        .await?;

        Ok(exists)
    }

    /// Authors `user_id` is subscribed to.
    pub async fn list_authors(pool: &PgPool, user_id: Uuid, page: Page) -> Result<Vec<User>> {
        let authors = sqlx::query_as::<_, User>(
            "
            SELECT u.*
            FROM users u
            JOIN follows f ON f.author_id = u.user_id
            WHERE f.user_id = $1
            ORDER BY f.created_at DESC
            LIMIT $2 OFFSET $3
            ",
        )
        .bind(user_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(pool)
        .await?;

        Ok(authors)
    }

    pub async fn count_authors(pool: &PgPool, user_id: Uuid) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM follows WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(pool)
            .await?;

        Ok(count)
    }
}

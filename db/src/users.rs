use chrono::{DateTime, Utc};
use color_eyre::Result;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::Page;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub user_id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
}

impl User {
    pub async fn create(pool: &PgPool, new_user: NewUser) -> Result<Self> {
        let user = sqlx::query_as::<_, User>(
            "
            INSERT INTO users (email, username, first_name, last_name, password_hash)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            ",
        )
        .bind(new_user.email)
        .bind(new_user.username)
        .bind(new_user.first_name)
        .bind(new_user.last_name)
        .bind(new_user.password_hash)
        .fetch_one(pool)
        .await?;

        Ok(user)
    }

    pub async fn get_by_id(pool: &PgPool, user_id: Uuid) -> Result<Option<Self>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(pool)
            .await?;

        Ok(user)
    }

    pub async fn get_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE lower(email) = lower($1)")
            .bind(email)
            .fetch_optional(pool)
            .await?;

        Ok(user)
    }

    /// Whether the email or username is already registered.
    pub async fn is_taken(pool: &PgPool, email: &str, username: &str) -> Result<bool> {
        let taken: bool = sqlx::query_scalar(
            "
            SELECT EXISTS (
                SELECT 1 FROM users
                WHERE lower(email) = lower($1) OR username = $2
            )
            ",
        )
        .bind(email)
        .bind(username)
        .fetch_one(pool)
        .await?;

        Ok(taken)
    }

    pub async fn list(pool: &PgPool, page: Page) -> Result<Vec<Self>> {
        let users = sqlx::query_as::<_, User>(
            "
            SELECT * FROM users
            ORDER BY username
            LIMIT $1 OFFSET $2
            ",
        )
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(pool)
        .await?;

        Ok(users)
    }

    pub async fn count(pool: &PgPool) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(pool)
            .await?;

        Ok(count)
    }

    pub async fn set_password_hash(&self, pool: &PgPool, password_hash: String) -> Result<Self> {
        let user = sqlx::query_as::<_, User>(
            "
            UPDATE users
            SET password_hash = $2,
                updated_at = NOW()
            WHERE user_id = $1
            RETURNING *
            ",
        )
        .bind(self.user_id)
        .bind(password_hash)
        .fetch_one(pool)
        .await?;

        Ok(user)
    }
}

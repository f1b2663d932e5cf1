use chrono::{DateTime, Utc};
use color_eyre::Result;
use rand::{distributions::Alphanumeric, Rng};
use sqlx::PgPool;
use uuid::Uuid;

use crate::users::User;

const TOKEN_LENGTH: usize = 40;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AuthToken {
    pub token: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl AuthToken {
    /// Returns the user's existing token, or issues a new one.
    pub async fn issue(pool: &PgPool, user_id: Uuid) -> Result<Self> {
        if let Some(existing) = sqlx::query_as::<_, AuthToken>(
            "SELECT * FROM auth_tokens WHERE user_id = $1 ORDER BY created_at LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        {
            return Ok(existing);
        }

        let token: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(TOKEN_LENGTH)
            .map(char::from)
            .collect();

        let token = sqlx::query_as::<_, AuthToken>(
            "
            INSERT INTO auth_tokens (token, user_id)
            VALUES ($1, $2)
            RETURNING *
            ",
        )
        .bind(token)
        .bind(user_id)
        .fetch_one(pool)
        .await?;

        Ok(token)
    }

    pub async fn find_user(pool: &PgPool, token: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "
            SELECT u.*
            FROM users u
            JOIN auth_tokens t ON t.user_id = u.user_id
            WHERE t.token = $1
            ",
        )
        .bind(token)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Returns whether the token existed.
    pub async fn revoke(pool: &PgPool, token: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM auth_tokens WHERE token = $1")
            .bind(token)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

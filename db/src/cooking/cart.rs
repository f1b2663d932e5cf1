use chrono::{DateTime, Utc};
use color_eyre::Result;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// A recipe in a user's shopping cart. A recipe is in a cart at most once.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CartEntry {
    pub cart_entry_id: Uuid,
    pub user_id: Uuid,
    pub recipe_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl CartEntry {
    /// `None` when the recipe is already in the cart.
    pub async fn add(pool: &PgPool, user_id: Uuid, recipe_id: Uuid) -> Result<Option<Self>> {
        let entry = sqlx::query_as::<_, CartEntry>(
            "
            INSERT INTO cart_entries (user_id, recipe_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, recipe_id) DO NOTHING
            RETURNING *
            ",
        )
        .bind(user_id)
        .bind(recipe_id)
        .fetch_optional(pool)
        .await?;

        Ok(entry)
    }

    pub async fn remove(pool: &PgPool, user_id: Uuid, recipe_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM cart_entries WHERE user_id = $1 AND recipe_id = $2")
            .bind(user_id)
            .bind(recipe_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn exists(pool: &PgPool, user_id: Uuid, recipe_id: Uuid) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM cart_entries WHERE user_id = $1 AND recipe_id = $2)",
        )
        .bind(user_id)
        .bind(recipe_id)
        .fetch_one(pool)
        .await?;

        Ok(exists)
    }

    /// Recipes in the cart, oldest entry first.
    pub async fn recipe_ids_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Uuid>> {
        let recipe_ids: Vec<Uuid> = sqlx::query_scalar(
            "
            SELECT recipe_id FROM cart_entries
            WHERE user_id = $1
            ORDER BY created_at, cart_entry_id
            ",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(recipe_ids)
    }
}

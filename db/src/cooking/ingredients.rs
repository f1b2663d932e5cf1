use chrono::{DateTime, Utc};
use color_eyre::Result;
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Ingredient {
    pub ingredient_id: Uuid,
    pub name: String,
    pub measurement_unit: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Ingredient {
    pub async fn create(pool: &PgPool, name: String, measurement_unit: String) -> Result<Self> {
        let ingredient = sqlx::query_as::<_, Ingredient>(
            "
            INSERT INTO ingredients (name, measurement_unit)
            VALUES ($1, $2)
            RETURNING *
            ",
        )
        .bind(name)
        .bind(measurement_unit)
        .fetch_one(pool)
        .await?;

        Ok(ingredient)
    }

    /// Inserts a batch of catalog rows in one transaction, skipping pairs
    /// that already exist. Returns how many rows were added.
    pub async fn import(pool: &PgPool, rows: Vec<(String, String)>) -> Result<u64> {
        let mut transaction = pool.begin().await?;
        let mut inserted = 0;

        for (name, measurement_unit) in rows {
            let result = sqlx::query(
                "
                INSERT INTO ingredients (name, measurement_unit)
                SELECT $1, $2
                WHERE NOT EXISTS (
                    SELECT 1 FROM ingredients WHERE name = $1 AND measurement_unit = $2
                )
                ",
            )
            .bind(name)
            .bind(measurement_unit)
            .execute(&mut *transaction)
            .await?;

            inserted += result.rows_affected();
        }

        transaction.commit().await?;

        Ok(inserted)
    }

    pub async fn get_by_id(pool: &PgPool, ingredient_id: Uuid) -> Result<Option<Self>> {
        let ingredient =
            sqlx::query_as::<_, Ingredient>("SELECT * FROM ingredients WHERE ingredient_id = $1")
                .bind(ingredient_id)
                .fetch_optional(pool)
                .await?;

        Ok(ingredient)
    }

    /// Catalog ordered by name, optionally narrowed to names starting with
    /// `name_prefix` (case-insensitive).
    pub async fn list(pool: &PgPool, name_prefix: Option<&str>) -> Result<Vec<Self>> {
        let ingredients = match name_prefix.filter(|p| !p.is_empty()) {
            Some(prefix) => {
                sqlx::query_as::<_, Ingredient>(
                    "
                    SELECT * FROM ingredients
                    WHERE lower(name) LIKE lower($1) || '%'
                    ORDER BY name, measurement_unit
                    ",
                )
                .bind(escape_like(prefix))
                .fetch_all(pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Ingredient>(
                    "SELECT * FROM ingredients ORDER BY name, measurement_unit",
                )
                .fetch_all(pool)
                .await?
            }
        };

        Ok(ingredients)
    }

    /// Ids from `ingredient_ids` that are not in the catalog.
    pub async fn missing_ids(pool: &PgPool, ingredient_ids: &[Uuid]) -> Result<Vec<Uuid>> {
        let missing: Vec<Uuid> = sqlx::query_scalar(
            "
            SELECT id
            FROM UNNEST($1::uuid[]) AS requested (id)
            WHERE NOT EXISTS (
                SELECT 1 FROM ingredients WHERE ingredient_id = requested.id
            )
            ",
        )
        .bind(ingredient_ids)
        .fetch_all(pool)
        .await?;

        Ok(missing)
    }
}

fn escape_like(prefix: &str) -> String {
    prefix
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RecipeIngredient {
    pub recipe_ingredient_id: Uuid,
    pub recipe_id: Uuid,
    pub ingredient_id: Uuid,
    pub amount: i32,
    pub display_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A recipe's ingredient with the catalog name and unit joined in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct RecipeIngredientDetail {
    pub ingredient_id: Uuid,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

impl RecipeIngredient {
    /// Adds `amount` of an ingredient to a recipe. If the recipe already
    /// lists the ingredient the existing line's amount is increased instead.
    pub async fn add_or_increment(
        conn: &mut PgConnection,
        recipe_id: Uuid,
        ingredient_id: Uuid,
        amount: i32,
        display_order: i32,
    ) -> Result<Self> {
        let line = sqlx::query_as::<_, RecipeIngredient>(
            "
            INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount, display_order)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (recipe_id, ingredient_id) DO UPDATE
            SET amount = recipe_ingredients.amount + EXCLUDED.amount,
                updated_at = NOW()
            RETURNING *
            ",
        )
        .bind(recipe_id)
        .bind(ingredient_id)
        .bind(amount)
        .bind(display_order)
        .fetch_one(conn)
        .await?;

        Ok(line)
    }

    pub async fn clear_for_recipe(conn: &mut PgConnection, recipe_id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
            .bind(recipe_id)
            .execute(conn)
            .await?;

        Ok(())
    }

    pub async fn get_by_recipe(
        pool: &PgPool,
        recipe_id: Uuid,
    ) -> Result<Vec<RecipeIngredientDetail>> {
        let ingredients = sqlx::query_as::<_, RecipeIngredientDetail>(
            "
            SELECT
                ri.ingredient_id,
                i.name,
                i.measurement_unit,
                ri.amount
            FROM recipe_ingredients ri
            JOIN ingredients i ON i.ingredient_id = ri.ingredient_id
            WHERE ri.recipe_id = $1
            ORDER BY ri.display_order, ri.created_at
            ",
        )
        .bind(recipe_id)
        .fetch_all(pool)
        .await?;

        Ok(ingredients)
    }
}

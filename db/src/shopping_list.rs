use async_trait::async_trait;
use shopping_list::{CartSource, IngredientLine, SourceError};
use sqlx::PgPool;
use uuid::Uuid;

use crate::cooking::CartEntry;

/// Cart and recipe data read straight from Postgres.
#[derive(Debug, Clone)]
pub struct PgCartSource {
    pool: PgPool,
}

impl PgCartSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct LineRow {
    recipe_id: Uuid,
    ingredient_id: Uuid,
    name: Option<String>,
    measurement_unit: Option<String>,
    amount: i32,
}

impl From<LineRow> for IngredientLine {
    fn from(row: LineRow) -> Self {
        IngredientLine {
            recipe_id: row.recipe_id,
            ingredient_id: row.ingredient_id,
            name: row.name,
            measurement_unit: row.measurement_unit,
            // Non-positive amounts become 0 so the aggregator rejects them.
            amount: u32::try_from(row.amount).unwrap_or(0),
        }
    }
}

#[async_trait]
impl CartSource for PgCartSource {
    async fn cart_recipe_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>, SourceError> {
        CartEntry::recipe_ids_for_user(&self.pool, user_id)
            .await
            .map_err(Into::into)
    }

    async fn ingredient_lines(
        &self,
        recipe_ids: &[Uuid],
    ) -> Result<Vec<IngredientLine>, SourceError> {
        let rows = sqlx::query_as::<_, LineRow>(
            "
            SELECT
                ri.recipe_id,
                ri.ingredient_id,
                i.name,
                i.measurement_unit,
                ri.amount
            FROM recipe_ingredients ri
            LEFT JOIN ingredients i ON i.ingredient_id = ri.ingredient_id
            WHERE ri.recipe_id = ANY($1)
            ORDER BY array_position($1, ri.recipe_id), ri.display_order, ri.created_at
            ",
        )
        .bind(recipe_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(IngredientLine::from).collect())
    }
}

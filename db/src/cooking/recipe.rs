use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::ingredients::{RecipeIngredient, RecipeIngredientDetail};
use super::tags::Tag;
use crate::{users::User, Page};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Recipe {
    pub recipe_id: Uuid,
    pub author_user_id: Uuid,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32, // minutes
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngredientAmount {
    pub ingredient_id: Uuid,
    pub amount: i32,
}

#[derive(Debug, Clone)]
pub struct NewRecipe {
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
    pub ingredients: Vec<IngredientAmount>,
    pub tag_ids: Vec<Uuid>,
}

/// Partial update. `None` leaves the field untouched; `Some` for
/// `ingredients` or `tag_ids` replaces the whole set.
#[derive(Debug, Clone, Default)]
pub struct RecipeChanges {
    pub name: Option<String>,
    pub image: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i32>,
    pub ingredients: Option<Vec<IngredientAmount>>,
    pub tag_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Clone, Default)]
pub struct RecipeFilter {
    pub author_id: Option<Uuid>,
    /// Matches recipes carrying any of these tags.
    pub tag_slugs: Vec<String>,
    pub favorited_by: Option<Uuid>,
    pub in_cart_of: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeWithDetails {
    pub recipe: Recipe,
    pub author: User,
    pub ingredients: Vec<RecipeIngredientDetail>,
    pub tags: Vec<Tag>,
}

impl Recipe {
    /// Inserts the recipe with its ingredients and tags in one transaction.
    /// An ingredient listed twice ends up as one line with the amounts summed.
    pub async fn create(
        pool: &PgPool,
        author_user_id: Uuid,
        new_recipe: NewRecipe,
    ) -> Result<Self> {
        let mut transaction = pool.begin().await?;

        let recipe = sqlx::query_as::<_, Recipe>(
            "
            INSERT INTO recipes (author_user_id, name, image, text, cooking_time)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            ",
        )
        .bind(author_user_id)
        .bind(new_recipe.name)
        .bind(new_recipe.image)
        .bind(new_recipe.text)
        .bind(new_recipe.cooking_time)
        .fetch_one(&mut *transaction)
        .await?;

        write_ingredients(&mut transaction, recipe.recipe_id, &new_recipe.ingredients).await?;
        Tag::set_for_recipe(&mut transaction, recipe.recipe_id, &new_recipe.tag_ids).await?;

        transaction.commit().await?;

        Ok(recipe)
    }

    pub async fn update(&self, pool: &PgPool, changes: RecipeChanges) -> Result<Self> {
        let mut transaction = pool.begin().await?;

        let updated = sqlx::query_as::<_, Recipe>(
            "
            UPDATE recipes
            SET name = COALESCE($2, name),
                image = COALESCE($3, image),
                text = COALESCE($4, text),
                cooking_time = COALESCE($5, cooking_time),
                updated_at = NOW()
            WHERE recipe_id = $1
            RETURNING *
            ",
        )
        .bind(self.recipe_id)
        .bind(changes.name)
        .bind(changes.image)
        .bind(changes.text)
        .bind(changes.cooking_time)
        .fetch_one(&mut *transaction)
        .await?;

        if let Some(ingredients) = changes.ingredients {
            RecipeIngredient::clear_for_recipe(&mut transaction, self.recipe_id).await?;
            write_ingredients(&mut transaction, self.recipe_id, &ingredients).await?;
        }

        if let Some(tag_ids) = changes.tag_ids {
            Tag::set_for_recipe(&mut transaction, self.recipe_id, &tag_ids).await?;
        }

        transaction.commit().await?;

        Ok(updated)
    }

    /// Returns whether a recipe was deleted. Favorites and cart entries go
    /// with it.
    pub async fn delete(pool: &PgPool, recipe_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM recipes WHERE recipe_id = $1")
            .bind(recipe_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn get_by_id(pool: &PgPool, recipe_id: Uuid) -> Result<Option<Self>> {
        let recipe = sqlx::query_as::<_, Recipe>("SELECT * FROM recipes WHERE recipe_id = $1")
            .bind(recipe_id)
            .fetch_optional(pool)
            .await?;

        Ok(recipe)
    }

    /// Whether another recipe already uses `name`.
    pub async fn name_taken(pool: &PgPool, name: &str, except: Option<Uuid>) -> Result<bool> {
        let taken: bool = sqlx::query_scalar(
            "
            SELECT EXISTS (
                SELECT 1 FROM recipes
                WHERE name = $1 AND ($2::uuid IS NULL OR recipe_id <> $2)
            )
            ",
        )
        .bind(name)
        .bind(except)
        .fetch_one(pool)
        .await?;

        Ok(taken)
    }

    pub async fn list(pool: &PgPool, filter: &RecipeFilter, page: Page) -> Result<Vec<Self>> {
        let mut query = QueryBuilder::<Postgres>::new("SELECT r.* FROM recipes r WHERE TRUE");
        push_filter(&mut query, filter);
        query
            .push(" ORDER BY r.created_at DESC, r.recipe_id LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let recipes = query.build_query_as::<Recipe>().fetch_all(pool).await?;

        Ok(recipes)
    }

    pub async fn count(pool: &PgPool, filter: &RecipeFilter) -> Result<i64> {
        let mut query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM recipes r WHERE TRUE");
        push_filter(&mut query, filter);

        let count = query.build_query_scalar::<i64>().fetch_one(pool).await?;

        Ok(count)
    }

    /// Newest first. `limit` of `None` returns every recipe by the author.
    pub async fn list_by_author(
        pool: &PgPool,
        author_user_id: Uuid,
        limit: Option<i64>,
    ) -> Result<Vec<Self>> {
        let recipes = sqlx::query_as::<_, Recipe>(
            "
            SELECT * FROM recipes
            WHERE author_user_id = $1
            ORDER BY created_at DESC, recipe_id
            LIMIT $2
            ",
        )
        .bind(author_user_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(recipes)
    }

    pub async fn count_by_author(pool: &PgPool, author_user_id: Uuid) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "
            SELECT COUNT(*)
            FROM recipes
            WHERE author_user_id = $1
            ",
        )
        .bind(author_user_id)
        .fetch_one(pool)
        .await?;

        Ok(count)
    }

    pub async fn get_full(pool: &PgPool, recipe_id: Uuid) -> Result<Option<RecipeWithDetails>> {
        let recipe = Self::get_by_id(pool, recipe_id).await?;

        if let Some(recipe) = recipe {
            let author = User::get_by_id(pool, recipe.author_user_id)
                .await?
                .ok_or_else(|| eyre!("Recipe {recipe_id} has no author"))?;
            let ingredients = RecipeIngredient::get_by_recipe(pool, recipe_id).await?;
            let tags = Tag::get_by_recipe(pool, recipe_id).await?;

            Ok(Some(RecipeWithDetails {
                recipe,
                author,
                ingredients,
                tags,
            }))
        } else {
            Ok(None)
        }
    }
}

async fn write_ingredients(
    conn: &mut PgConnection,
    recipe_id: Uuid,
    ingredients: &[IngredientAmount],
) -> Result<()> {
    for (position, line) in ingredients.iter().enumerate() {
        let display_order = i32::try_from(position)?;
        RecipeIngredient::add_or_increment(
            &mut *conn,
            recipe_id,
            line.ingredient_id,
            line.amount,
            display_order,
        )
        .await?;
    }

    Ok(())
}

fn push_filter(query: &mut QueryBuilder<'_, Postgres>, filter: &RecipeFilter) {
    if let Some(author_id) = filter.author_id {
        query.push(" AND r.author_user_id = ").push_bind(author_id);
    }

    if !filter.tag_slugs.is_empty() {
        query
            .push(
                " AND EXISTS (
                    SELECT 1 FROM recipe_tags rt
                    JOIN tags t ON t.tag_id = rt.tag_id
                    WHERE rt.recipe_id = r.recipe_id AND t.slug = ANY(",
            )
            .push_bind(filter.tag_slugs.clone())
            .push("))");
    }

    if let Some(user_id) = filter.favorited_by {
        query
            .push(" AND EXISTS (SELECT 1 FROM favorites f")
            .push(" WHERE f.recipe_id = r.recipe_id AND f.user_id = ")
            .push_bind(user_id)
            .push(")");
    }

    if let Some(user_id) = filter.in_cart_of {
        query
            .push(" AND EXISTS (SELECT 1 FROM cart_entries c")
            .push(" WHERE c.recipe_id = r.recipe_id AND c.user_id = ")
            .push_bind(user_id)
            .push(")");
    }
}

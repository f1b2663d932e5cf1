use chrono::{DateTime, Utc};
use color_eyre::Result;
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tag {
    pub tag_id: Uuid,
    pub name: String,
    pub color: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tag {
    pub async fn create(pool: &PgPool, name: String, color: String, slug: String) -> Result<Self> {
        let tag = sqlx::query_as::<_, Tag>(
            "
            INSERT INTO tags (name, color, slug)
            VALUES ($1, $2, $3)
            RETURNING *
            ",
        )
        .bind(name)
        .bind(color)
        .bind(slug)
        .fetch_one(pool)
        .await?;

        Ok(tag)
    }

    pub async fn get_by_id(pool: &PgPool, tag_id: Uuid) -> Result<Option<Self>> {
        let tag = sqlx::query_as::<_, Tag>("SELECT * FROM tags WHERE tag_id = $1")
            .bind(tag_id)
            .fetch_optional(pool)
            .await?;

        Ok(tag)
    }

    pub async fn list_all(pool: &PgPool) -> Result<Vec<Self>> {
        let tags = sqlx::query_as::<_, Tag>("SELECT * FROM tags ORDER BY name")
            .fetch_all(pool)
            .await?;

        Ok(tags)
    }

    pub async fn get_by_recipe(pool: &PgPool, recipe_id: Uuid) -> Result<Vec<Self>> {
        let tags = sqlx::query_as::<_, Tag>(
            "
            SELECT t.*
            FROM tags t
            JOIN recipe_tags rt ON rt.tag_id = t.tag_id
            WHERE rt.recipe_id = $1
            ORDER BY t.name
            ",
        )
        .bind(recipe_id)
        .fetch_all(pool)
        .await?;

        Ok(tags)
    }

    /// Replaces the recipe's tags with `tag_ids`.
    pub async fn set_for_recipe(
        conn: &mut PgConnection,
        recipe_id: Uuid,
        tag_ids: &[Uuid],
    ) -> Result<()> {
        sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
            .bind(recipe_id)
            .execute(&mut *conn)
            .await?;

        sqlx::query(
            "
            INSERT INTO recipe_tags (recipe_id, tag_id)
            SELECT $1, tag_id FROM UNNEST($2::uuid[]) AS t (tag_id)
            ON CONFLICT DO NOTHING
            ",
        )
        .bind(recipe_id)
        .bind(tag_ids)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Ids from `tag_ids` that do not exist.
    pub async fn missing_ids(pool: &PgPool, tag_ids: &[Uuid]) -> Result<Vec<Uuid>> {
        let missing: Vec<Uuid> = sqlx::query_scalar(
            "
            SELECT id
            FROM UNNEST($1::uuid[]) AS requested (id)
            WHERE NOT EXISTS (SELECT 1 FROM tags WHERE tag_id = requested.id)
            ",
        )
        .bind(tag_ids)
        .fetch_all(pool)
        .await?;

        Ok(missing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_recipe, create_tag, create_user};

    #[sqlx::test(migrations = "./migrations")]
    async fn test_tag_create_and_list(pool: PgPool) {
        create_tag(&pool, "Завтрак", "breakfast").await;
        create_tag(&pool, "Ужин", "dinner").await;

        let tags = Tag::list_all(&pool).await.unwrap();
        let slugs: Vec<_> = tags.iter().map(|t| t.slug.as_str()).collect();
        assert_eq!(slugs, vec!["breakfast", "dinner"]);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_invalid_color_is_rejected(pool: PgPool) {
        let result = Tag::create(
            &pool,
            "Lunch".to_string(),
            "red".to_string(),
            "lunch".to_string(),
        )
        .await;

        assert!(result.is_err());
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_set_for_recipe_replaces_tags(pool: PgPool) {
        let author = create_user(&pool, "ann").await;
        let breakfast = create_tag(&pool, "Завтрак", "breakfast").await;
        let dinner = create_tag(&pool, "Ужин", "dinner").await;
        let recipe = create_recipe(&pool, &author, "Omelette", &[]).await;

        let mut conn = pool.acquire().await.unwrap();
        Tag::set_for_recipe(&mut conn, recipe.recipe_id, &[breakfast.tag_id])
            .await
            .unwrap();
        Tag::set_for_recipe(&mut conn, recipe.recipe_id, &[dinner.tag_id, dinner.tag_id])
            .await
            .unwrap();

        let tags = Tag::get_by_recipe(&pool, recipe.recipe_id).await.unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].slug, "dinner");

        let unknown = Uuid::new_v4();
        assert_eq!(
            Tag::missing_ids(&pool, &[breakfast.tag_id, unknown])
                .await
                .unwrap(),
            vec![unknown]
        );
    }
}

use axum::{
    extract::{Path, State},
    Json,
};
use color_eyre::eyre::Context;
use db::{cooking::Tag, PgPool};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::http_server::{errors::ServerError, ResponseResult};

#[derive(Debug, Serialize, Deserialize)]
pub struct TagResponse {
    pub id: Uuid,
    pub name: String,
    pub color: String,
    pub slug: String,
}

impl From<Tag> for TagResponse {
    fn from(tag: Tag) -> Self {
        Self {
            id: tag.tag_id,
            name: tag.name,
            color: tag.color,
            slug: tag.slug,
        }
    }
}

pub async fn list(State(pool): State<PgPool>) -> ResponseResult<Json<Vec<TagResponse>>> {
    let tags = Tag::list_all(&pool).await.context("Failed to list tags")?;

    Ok(Json(tags.into_iter().map(TagResponse::from).collect()))
}

pub async fn get(
    State(pool): State<PgPool>,
    Path(tag_id): Path<Uuid>,
) -> ResponseResult<Json<TagResponse>> {
    let tag = Tag::get_by_id(&pool, tag_id)
        .await
        .context("Failed to fetch tag")?
        .ok_or_else(|| ServerError::not_found("Страница не найдена."))?;

    Ok(Json(tag.into()))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use db::test_utils::create_tag;
    use sqlx::PgPool;
    use tower::ServiceExt;

    use super::*;
    use crate::http_server::test_helpers::{create_test_app, json_request, response_body_json};

    #[sqlx::test(migrations = "../db/migrations")]
    async fn test_list_and_get_tags(pool: PgPool) {
        let app = create_test_app(pool.clone());
        let breakfast = create_tag(&pool, "Завтрак", "breakfast").await;
        create_tag(&pool, "Ужин", "dinner").await;

        let response = app
            .clone()
            .oneshot(json_request("GET", "/api/tags/", None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let tags: Vec<TagResponse> = response_body_json(response).await;
        assert_eq!(tags.len(), 2);

        let response = app
            .oneshot(json_request(
                "GET",
                &format!("/api/tags/{}/", breakfast.tag_id),
                None,
                None,
            ))
            .await
            .unwrap();
        let tag: TagResponse = response_body_json(response).await;
        assert_eq!(tag.slug, "breakfast");
        assert!(tag.color.starts_with('#'));
    }
}

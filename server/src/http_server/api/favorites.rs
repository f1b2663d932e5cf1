use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use color_eyre::eyre::Context;
use db::{
    cooking::{Favorite, Recipe},
    PgPool,
};
use tracing::instrument;
use uuid::Uuid;

use super::recipes::RecipeShort;
use crate::{
    http_server::{current_user::CurrentUser, errors::ServerError, ResponseResult},
    AppState,
};

pub(crate) const ALREADY_ADDED: &str = "Рецепт уже добавлен!";
pub(crate) const ALREADY_REMOVED: &str = "Рецепт уже удален!";

pub(crate) async fn find_recipe(pool: &PgPool, recipe_id: Uuid) -> ResponseResult<Recipe> {
    Recipe::get_by_id(pool, recipe_id)
        .await
        .context("Failed to fetch recipe")?
        .ok_or_else(|| ServerError::not_found("Страница не найдена."))
}

#[instrument(skip_all, fields(user_id = %current.user.user_id, %recipe_id), err(Debug))]
pub async fn add(
    current: CurrentUser,
    State(state): State<AppState>,
    Path(recipe_id): Path<Uuid>,
) -> ResponseResult<(StatusCode, Json<RecipeShort>)> {
    let recipe = find_recipe(&state.db, recipe_id).await?;

    Favorite::add(&state.db, current.user.user_id, recipe_id)
        .await
        .context("Failed to add favorite")?
        .ok_or_else(|| ServerError::bad_request(ALREADY_ADDED))?;

    Ok((StatusCode::CREATED, Json(RecipeShort::from(&recipe))))
}

#[instrument(skip_all, fields(user_id = %current.user.user_id, %recipe_id), err(Debug))]
pub async fn remove(
    current: CurrentUser,
    State(state): State<AppState>,
    Path(recipe_id): Path<Uuid>,
) -> ResponseResult<StatusCode> {
    if !Favorite::remove(&state.db, current.user.user_id, recipe_id)
        .await
        .context("Failed to remove favorite")?
    {
        return Err(ServerError::bad_request(ALREADY_REMOVED));
    }

    Ok(StatusCode::NO_CONTENT)
}

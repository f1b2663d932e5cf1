use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use color_eyre::{eyre::Context, Report};
use db::cooking::CartEntry;
use tracing::instrument;
use uuid::Uuid;

use super::{
    favorites::{find_recipe, ALREADY_ADDED, ALREADY_REMOVED},
    recipes::RecipeShort,
};
use crate::{
    http_server::{
        current_user::CurrentUser,
        errors::{shopping_list_status, ServerError},
        ResponseResult,
    },
    AppState,
};

const TEXT_PLAIN_UTF8: &str = "text/plain; charset=utf-8";

#[instrument(skip_all, fields(user_id = %current.user.user_id, %recipe_id), err(Debug))]
pub async fn add(
    current: CurrentUser,
    State(state): State<AppState>,
    Path(recipe_id): Path<Uuid>,
) -> ResponseResult<(StatusCode, Json<RecipeShort>)> {
    let recipe = find_recipe(&state.db, recipe_id).await?;

    CartEntry::add(&state.db, current.user.user_id, recipe_id)
        .await
        .context("Failed to add recipe to cart")?
        .ok_or_else(|| ServerError::bad_request(ALREADY_ADDED))?;

    Ok((StatusCode::CREATED, Json(RecipeShort::from(&recipe))))
}

#[instrument(skip_all, fields(user_id = %current.user.user_id, %recipe_id), err(Debug))]
pub async fn remove(
    current: CurrentUser,
    State(state): State<AppState>,
    Path(recipe_id): Path<Uuid>,
) -> ResponseResult<StatusCode> {
    if !CartEntry::remove(&state.db, current.user.user_id, recipe_id)
        .await
        .context("Failed to remove recipe from cart")?
    {
        return Err(ServerError::bad_request(ALREADY_REMOVED));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// The merged ingredient list for everything in the cart, as a text
/// attachment.
#[instrument(skip_all, fields(user_id = %current.user.user_id), err(Debug))]
pub async fn download(
    current: CurrentUser,
    State(state): State<AppState>,
) -> ResponseResult<Response> {
    let lines = state
        .shopping_list
        .aggregate(current.user.user_id)
        .await
        .map_err(|err| {
            let status = shopping_list_status(&err);
            ServerError(
                Report::new(err).wrap_err("Failed to build shopping list"),
                status,
            )
        })?;

    let export = state.export_format.render(&lines);
    tracing::debug!(
        lines = lines.len(),
        bytes = export.payload.len(),
        "Rendered shopping list"
    );

    Ok((
        [
            (header::CONTENT_TYPE, TEXT_PLAIN_UTF8.to_string()),
            (
                header::CONTENT_DISPOSITION,
                state.export_format.content_disposition(),
            ),
        ],
        export.payload,
    )
        .into_response())
}

use axum::{
    extract::{Path, Query, State},
    Json,
};
use color_eyre::eyre::Context;
use db::{
    cooking::{Ingredient, RecipeIngredientDetail},
    PgPool,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::http_server::{errors::ServerError, ResponseResult};

#[derive(Debug, Serialize, Deserialize)]
pub struct IngredientResponse {
    pub id: Uuid,
    pub name: String,
    pub measurement_unit: String,
}

impl From<Ingredient> for IngredientResponse {
    fn from(ingredient: Ingredient) -> Self {
        Self {
            id: ingredient.ingredient_id,
            name: ingredient.name,
            measurement_unit: ingredient.measurement_unit,
        }
    }
}

/// An ingredient as listed inside a recipe.
#[derive(Debug, Serialize, Deserialize)]
pub struct RecipeIngredientResponse {
    pub id: Uuid,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

impl From<RecipeIngredientDetail> for RecipeIngredientResponse {
    fn from(detail: RecipeIngredientDetail) -> Self {
        Self {
            id: detail.ingredient_id,
            name: detail.name,
            measurement_unit: detail.measurement_unit,
            amount: detail.amount,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct IngredientSearch {
    name: Option<String>,
}

#[axum_macros::debug_handler(state = crate::AppState)]
pub async fn list(
    State(pool): State<PgPool>,
    Query(search): Query<IngredientSearch>,
) -> ResponseResult<Json<Vec<IngredientResponse>>> {
    let ingredients = Ingredient::list(&pool, search.name.as_deref())
        .await
        .context("Failed to list ingredients")?;

    let response = ingredients
        .into_iter()
        .map(IngredientResponse::from)
        .collect();

    Ok(Json(response))
}

pub async fn get(
    State(pool): State<PgPool>,
    Path(ingredient_id): Path<Uuid>,
) -> ResponseResult<Json<IngredientResponse>> {
    let ingredient = Ingredient::get_by_id(&pool, ingredient_id)
        .await
        .context("Failed to fetch ingredient")?
        .ok_or_else(|| ServerError::not_found("Страница не найдена."))?;

    Ok(Json(ingredient.into()))
}

use std::collections::HashSet;

use axum::{
    extract::{Path, State},
    http::{StatusCode, Uri},
    Json,
};
use axum_extra::extract::Query;
use base64::{engine::general_purpose::STANDARD, Engine};
use color_eyre::eyre::Context;
use db::{
    cooking::{
        CartEntry, Favorite, Ingredient, IngredientAmount, NewRecipe, Recipe, RecipeChanges,
        RecipeFilter, RecipeWithDetails, Tag,
    },
    PgPool,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use super::{ingredients::RecipeIngredientResponse, tags::TagResponse, users::UserResponse};
use crate::{
    http_server::{
        current_user::{CurrentUser, MaybeCurrentUser},
        errors::ServerError,
        pagination::{PageParams, Paginated},
        ResponseResult,
    },
    AppState,
};

const MIN_COOKING_TIME: i64 = 1;
const MAX_COOKING_TIME: i64 = 1440;
const MAX_RECIPE_NAME_LENGTH: usize = 200;
const INVALID_IMAGE: &str = "Загрузите корректное изображение.";

/// The short form used in favorites, cart and subscription responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeShort {
    pub id: Uuid,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

impl From<&Recipe> for RecipeShort {
    fn from(recipe: &Recipe) -> Self {
        Self {
            id: recipe.recipe_id,
            name: recipe.name.clone(),
            image: recipe.image.clone(),
            cooking_time: recipe.cooking_time,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecipeResponse {
    pub id: Uuid,
    pub tags: Vec<TagResponse>,
    pub author: UserResponse,
    pub ingredients: Vec<RecipeIngredientResponse>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
}

impl RecipeResponse {
    async fn build(
        pool: &PgPool,
        viewer: Option<Uuid>,
        details: RecipeWithDetails,
    ) -> color_eyre::Result<Self> {
        let RecipeWithDetails {
            recipe,
            author,
            ingredients,
            tags,
        } = details;

        let (is_favorited, is_in_shopping_cart) = match viewer {
            Some(viewer) => (
                Favorite::exists(pool, viewer, recipe.recipe_id).await?,
                CartEntry::exists(pool, viewer, recipe.recipe_id).await?,
            ),
            None => (false, false),
        };

        Ok(Self {
            id: recipe.recipe_id,
            tags: tags.into_iter().map(TagResponse::from).collect(),
            author: UserResponse::build(pool, viewer, author).await?,
            ingredients: ingredients
                .into_iter()
                .map(RecipeIngredientResponse::from)
                .collect(),
            is_favorited,
            is_in_shopping_cart,
            name: recipe.name,
            image: recipe.image,
            text: recipe.text,
            cooking_time: recipe.cooking_time,
        })
    }

    async fn load(pool: &PgPool, viewer: Option<Uuid>, recipe_id: Uuid) -> ResponseResult<Self> {
        let details = Recipe::get_full(pool, recipe_id)
            .await
            .context("Failed to load recipe")?
            .ok_or_else(|| ServerError::not_found("Страница не найдена."))?;

        Ok(Self::build(pool, viewer, details).await?)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RecipeParams {
    page: Option<u32>,
    limit: Option<u32>,
    author: Option<Uuid>,
    #[serde(default)]
    tags: Vec<String>,
    is_favorited: Option<u8>,
    is_in_shopping_cart: Option<u8>,
}

impl RecipeParams {
    /// Favorite and cart filters only apply to signed-in viewers and are
    /// ignored otherwise.
    fn filter(&self, viewer: Option<Uuid>) -> RecipeFilter {
        let only_viewer = |flag: Option<u8>| viewer.filter(|_| flag == Some(1));

        RecipeFilter {
            author_id: self.author,
            tag_slugs: self.tags.clone(),
            favorited_by: only_viewer(self.is_favorited),
            in_cart_of: only_viewer(self.is_in_shopping_cart),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct IngredientAmountPayload {
    id: Uuid,
    amount: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateRecipeRequest {
    ingredients: Vec<IngredientAmountPayload>,
    #[serde(default)]
    tags: Vec<Uuid>,
    image: String,
    name: String,
    text: String,
    cooking_time: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateRecipeRequest {
    ingredients: Option<Vec<IngredientAmountPayload>>,
    tags: Option<Vec<Uuid>>,
    image: Option<String>,
    name: Option<String>,
    text: Option<String>,
    cooking_time: Option<i64>,
}

fn validate_name(name: &str) -> Result<String, ServerError> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > MAX_RECIPE_NAME_LENGTH {
        return Err(ServerError::bad_request(
            "Название рецепта должно содержать от 1 до 200 символов.",
        ));
    }

    Ok(name.to_string())
}

fn validate_cooking_time(cooking_time: i64) -> Result<i32, ServerError> {
    if cooking_time < MIN_COOKING_TIME {
        return Err(ServerError::bad_request(
            "Время готовки должно быть не менее 1 минуты!",
        ));
    }
    if cooking_time > MAX_COOKING_TIME {
        return Err(ServerError::bad_request(
            "Время готовки не может превышать 1440 минут!",
        ));
    }

    Ok(i32::try_from(cooking_time).context("Cooking time out of range")?)
}

/// Accepts an inline `data:image/<type>;base64,<payload>` upload.
fn validate_image(image: &str) -> Result<String, ServerError> {
    let payload = image
        .strip_prefix("data:image/")
        .and_then(|rest| rest.split_once(";base64,"))
        .filter(|(format, _)| !format.is_empty())
        .map(|(_, payload)| payload);

    match payload.map(|payload| STANDARD.decode(payload)) {
        Some(Ok(bytes)) if !bytes.is_empty() => Ok(image.to_string()),
        _ => Err(ServerError::bad_request(INVALID_IMAGE)),
    }
}

/// Checks amounts and that every ingredient exists. Repeated ingredients
/// are kept; the store sums them into one line.
async fn validate_ingredients(
    pool: &PgPool,
    ingredients: &[IngredientAmountPayload],
) -> ResponseResult<Vec<IngredientAmount>> {
    if ingredients.is_empty() {
        return Err(ServerError::bad_request(
            "Не выбрано ни одного ингредиента!",
        ));
    }

    let mut amounts = Vec::with_capacity(ingredients.len());
    for line in ingredients {
        let Some(amount) = i32::try_from(line.amount).ok().filter(|a| *a > 0) else {
            return Err(ServerError::bad_request(
                "Количество ингредиента должно быть больше 0!",
            ));
        };

        amounts.push(IngredientAmount {
            ingredient_id: line.id,
            amount,
        });
    }

    let ids: Vec<Uuid> = amounts.iter().map(|a| a.ingredient_id).collect();
    let missing = Ingredient::missing_ids(pool, &ids)
        .await
        .context("Failed to check ingredients")?;
    if let Some(id) = missing.first() {
        return Err(ServerError::bad_request(format!(
            "Ингредиент {id} не существует."
        )));
    }

    Ok(amounts)
}

async fn validate_tags(pool: &PgPool, tags: &[Uuid]) -> ResponseResult<Vec<Uuid>> {
    let mut seen = HashSet::new();
    let tags: Vec<Uuid> = tags.iter().copied().filter(|id| seen.insert(*id)).collect();

    let missing = Tag::missing_ids(pool, &tags)
        .await
        .context("Failed to check tags")?;
    if let Some(id) = missing.first() {
        return Err(ServerError::bad_request(format!("Тег {id} не существует.")));
    }

    Ok(tags)
}

async fn ensure_unique_name(pool: &PgPool, name: &str, except: Option<Uuid>) -> ResponseResult<()> {
    if Recipe::name_taken(pool, name, except)
        .await
        .context("Failed to check recipe name")?
    {
        return Err(ServerError::bad_request(
            "Рецепт с таким названием уже существует.",
        ));
    }

    Ok(())
}

/// Loads a recipe the current user may edit.
async fn owned_recipe(
    pool: &PgPool,
    current: &CurrentUser,
    recipe_id: Uuid,
) -> ResponseResult<Recipe> {
    let recipe = Recipe::get_by_id(pool, recipe_id)
        .await
        .context("Failed to fetch recipe")?
        .ok_or_else(|| ServerError::not_found("Страница не найдена."))?;

    if recipe.author_user_id != current.user.user_id {
        return Err(ServerError::forbidden(
            "У вас недостаточно прав для выполнения данного действия.",
        ));
    }

    Ok(recipe)
}

#[instrument(skip_all, err(Debug))]
pub async fn list(
    viewer: MaybeCurrentUser,
    State(state): State<AppState>,
    Query(params): Query<RecipeParams>,
    uri: Uri,
) -> ResponseResult<Json<Paginated<RecipeResponse>>> {
    let page = PageParams {
        page: params.page,
        limit: params.limit,
    }
    .page(&state.app);
    let filter = params.filter(viewer.user_id());

    let recipes = Recipe::list(&state.db, &filter, page)
        .await
        .context("Failed to list recipes")?;
    let count = Recipe::count(&state.db, &filter)
        .await
        .context("Failed to count recipes")?;

    let mut results = Vec::with_capacity(recipes.len());
    for recipe in recipes {
        results.push(RecipeResponse::load(&state.db, viewer.user_id(), recipe.recipe_id).await?);
    }

    Ok(Json(Paginated::new(&state.app, &uri, page, count, results)))
}

pub async fn get(
    viewer: MaybeCurrentUser,
    State(state): State<AppState>,
    Path(recipe_id): Path<Uuid>,
) -> ResponseResult<Json<RecipeResponse>> {
    Ok(Json(
        RecipeResponse::load(&state.db, viewer.user_id(), recipe_id).await?,
    ))
}

#[instrument(skip_all, fields(user_id = %current.user.user_id), err(Debug))]
pub async fn create(
    current: CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateRecipeRequest>,
) -> ResponseResult<(StatusCode, Json<RecipeResponse>)> {
    let name = validate_name(&payload.name)?;
    let cooking_time = validate_cooking_time(payload.cooking_time)?;
    let image = validate_image(&payload.image)?;
    let ingredients = validate_ingredients(&state.db, &payload.ingredients).await?;
    let tag_ids = validate_tags(&state.db, &payload.tags).await?;
    ensure_unique_name(&state.db, &name, None).await?;

    let recipe = Recipe::create(
        &state.db,
        current.user.user_id,
        NewRecipe {
            name,
            image,
            text: payload.text,
            cooking_time,
            ingredients,
            tag_ids,
        },
    )
    .await
    .context("Failed to create recipe")?;
    tracing::info!(recipe_id = %recipe.recipe_id, "Created recipe");

    let response =
        RecipeResponse::load(&state.db, Some(current.user.user_id), recipe.recipe_id).await?;

    Ok((StatusCode::CREATED, Json(response)))
}

#[instrument(skip_all, fields(user_id = %current.user.user_id, %recipe_id), err(Debug))]
pub async fn update(
    current: CurrentUser,
    State(state): State<AppState>,
    Path(recipe_id): Path<Uuid>,
    Json(payload): Json<UpdateRecipeRequest>,
) -> ResponseResult<Json<RecipeResponse>> {
    let recipe = owned_recipe(&state.db, &current, recipe_id).await?;

    let name = payload.name.as_deref().map(validate_name).transpose()?;
    if let Some(name) = &name {
        ensure_unique_name(&state.db, name, Some(recipe_id)).await?;
    }
    let cooking_time = payload.cooking_time.map(validate_cooking_time).transpose()?;
    let image = payload.image.as_deref().map(validate_image).transpose()?;
    let ingredients = match &payload.ingredients {
        Some(ingredients) => Some(validate_ingredients(&state.db, ingredients).await?),
        None => None,
    };
    let tag_ids = match &payload.tags {
        Some(tags) => Some(validate_tags(&state.db, tags).await?),
        None => None,
    };

    recipe
        .update(
            &state.db,
            RecipeChanges {
                name,
                image,
                text: payload.text,
                cooking_time,
                ingredients,
                tag_ids,
            },
        )
        .await
        .context("Failed to update recipe")?;

    Ok(Json(
        RecipeResponse::load(&state.db, Some(current.user.user_id), recipe_id).await?,
    ))
}

#[instrument(skip_all, fields(user_id = %current.user.user_id, %recipe_id), err(Debug))]
pub async fn delete(
    current: CurrentUser,
    State(state): State<AppState>,
    Path(recipe_id): Path<Uuid>,
) -> ResponseResult<StatusCode> {
    owned_recipe(&state.db, &current, recipe_id).await?;

    Recipe::delete(&state.db, recipe_id)
        .await
        .context("Failed to delete recipe")?;

    Ok(StatusCode::NO_CONTENT)
}

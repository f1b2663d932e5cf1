use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use color_eyre::eyre::Context;
use db::PgPool;

use super::{
    api::{auth, favorites, ingredients, recipes, shopping_cart, tags, users},
    ResponseResult,
};
use crate::AppState;

pub(crate) fn make_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/api/auth/token/login/", post(auth::login))
        .route("/api/auth/token/logout/", post(auth::logout))
        .route("/api/users/", get(users::list).post(users::register))
        .route("/api/users/me/", get(users::me))
        .route("/api/users/set_password/", post(users::set_password))
        .route("/api/users/subscriptions/", get(users::subscriptions))
        .route("/api/users/{id}/", get(users::get))
        .route(
            "/api/users/{id}/subscribe/",
            post(users::subscribe).delete(users::unsubscribe),
        )
        .route("/api/ingredients/", get(ingredients::list))
        .route("/api/ingredients/{id}/", get(ingredients::get))
        .route("/api/tags/", get(tags::list))
        .route("/api/tags/{id}/", get(tags::get))
        .route("/api/recipes/", get(recipes::list).post(recipes::create))
        .route(
            "/api/recipes/download_shopping_cart/",
            get(shopping_cart::download),
        )
        .route(
            "/api/recipes/{id}/",
            get(recipes::get)
                .patch(recipes::update)
                .delete(recipes::delete),
        )
        .route(
            "/api/recipes/{id}/favorite/",
            post(favorites::add).delete(favorites::remove),
        )
        .route(
            "/api/recipes/{id}/shopping_cart/",
            post(shopping_cart::add).delete(shopping_cart::remove),
        )
}

async fn health(State(pool): State<PgPool>) -> ResponseResult<&'static str> {
    sqlx::query("SELECT 1")
        .execute(&pool)
        .await
        .context("Database is unreachable")?;

    Ok("OK")
}

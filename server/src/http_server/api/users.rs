use axum::{
    extract::{Path, Query, State},
    http::{StatusCode, Uri},
    Json,
};
use color_eyre::eyre::Context;
use db::{
    cooking::Recipe,
    follows::Follow,
    users::{NewUser, User},
    Page, PgPool,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use super::recipes::RecipeShort;
use crate::{
    http_server::{
        current_user::{CurrentUser, MaybeCurrentUser},
        errors::ServerError,
        pagination::{PageParams, Paginated},
        passwords::{hash_password, verify_password},
        ResponseResult,
    },
    AppState,
};

const MAX_NAME_LENGTH: usize = 150;
const MAX_EMAIL_LENGTH: usize = 254;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub email: String,
    pub id: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
}

impl UserResponse {
    /// `is_subscribed` is from `viewer`'s point of view and always false for
    /// anonymous viewers.
    pub async fn build(
        pool: &PgPool,
        viewer: Option<Uuid>,
        user: User,
    ) -> color_eyre::Result<Self> {
        let is_subscribed = match viewer {
            Some(viewer) if viewer != user.user_id => {
                Follow::exists(pool, viewer, user.user_id).await?
            }
            _ => false,
        };

        Ok(Self {
            email: user.email,
            id: user.user_id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            is_subscribed,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubscriptionResponse {
    pub email: String,
    pub id: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
    pub recipes: Vec<RecipeShort>,
    pub recipes_count: i64,
}

impl SubscriptionResponse {
    async fn build(pool: &PgPool, author: User, recipes_limit: u32) -> color_eyre::Result<Self> {
        let recipes =
            Recipe::list_by_author(pool, author.user_id, Some(i64::from(recipes_limit))).await?;
        let recipes_count = Recipe::count_by_author(pool, author.user_id).await?;

        Ok(Self {
            email: author.email,
            id: author.user_id,
            username: author.username,
            first_name: author.first_name,
            last_name: author.last_name,
            is_subscribed: true,
            recipes: recipes.iter().map(RecipeShort::from).collect(),
            recipes_count,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    email: String,
    username: String,
    first_name: String,
    last_name: String,
    password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisteredUser {
    pub email: String,
    pub id: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Deserialize)]
pub struct SetPasswordRequest {
    new_password: String,
    current_password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct SubscriptionParams {
    page: Option<u32>,
    limit: Option<u32>,
    recipes_limit: Option<u32>,
}

impl SubscriptionParams {
    fn page(&self, state: &AppState) -> Page {
        PageParams {
            page: self.page,
            limit: self.limit,
        }
        .page(&state.app)
    }

    fn recipes_limit(&self, state: &AppState) -> u32 {
        self.recipes_limit.unwrap_or(state.app.recipes_limit)
    }
}

fn validate_registration(payload: &RegisterRequest) -> Result<(), ServerError> {
    let email = payload.email.trim();
    if email.is_empty() || !email.contains('@') || email.len() > MAX_EMAIL_LENGTH {
        return Err(ServerError::bad_request(
            "Введите правильный адрес электронной почты.",
        ));
    }

    let username = payload.username.as_str();
    if username.is_empty() || username.chars().count() > MAX_NAME_LENGTH {
        return Err(ServerError::bad_request(
            "Имя пользователя должно содержать от 1 до 150 символов.",
        ));
    }
    if username == "me" {
        return Err(ServerError::bad_request(
            "Имя пользователя \"me\" недоступно.",
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '.' | '@' | '+' | '-' | '_'))
    {
        return Err(ServerError::bad_request(
            "Имя пользователя может содержать только буквы, цифры и символы @/./+/-/_.",
        ));
    }

    for name in [&payload.first_name, &payload.last_name] {
        if name.trim().is_empty() || name.chars().count() > MAX_NAME_LENGTH {
            return Err(ServerError::bad_request(
                "Имя и фамилия должны содержать от 1 до 150 символов.",
            ));
        }
    }

    if payload.password.is_empty() {
        return Err(ServerError::bad_request(
            "Пароль не может быть пустым.",
        ));
    }

    Ok(())
}

async fn find_user(pool: &PgPool, user_id: Uuid) -> ResponseResult<User> {
    User::get_by_id(pool, user_id)
        .await
        .context("Failed to fetch user")?
        .ok_or_else(|| ServerError::not_found("Страница не найдена."))
}

#[instrument(skip_all, err(Debug))]
pub async fn list(
    viewer: MaybeCurrentUser,
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
    uri: Uri,
) -> ResponseResult<Json<Paginated<UserResponse>>> {
    let page = params.page(&state.app);

    let users = User::list(&state.db, page)
        .await
        .context("Failed to list users")?;
    let count = User::count(&state.db)
        .await
        .context("Failed to count users")?;

    let mut results = Vec::with_capacity(users.len());
    for user in users {
        results.push(UserResponse::build(&state.db, viewer.user_id(), user).await?);
    }

    Ok(Json(Paginated::new(&state.app, &uri, page, count, results)))
}

#[instrument(skip_all, fields(username = %payload.username), err(Debug))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> ResponseResult<(StatusCode, Json<RegisteredUser>)> {
    validate_registration(&payload)?;

    let email = payload.email.trim().to_string();
    if User::is_taken(&state.db, &email, &payload.username)
        .await
        .context("Failed to check for existing user")?
    {
        return Err(ServerError::bad_request(
            "Пользователь с таким email или username уже существует.",
        ));
    }

    let user = User::create(
        &state.db,
        NewUser {
            email,
            username: payload.username,
            first_name: payload.first_name,
            last_name: payload.last_name,
            password_hash: hash_password(&payload.password)?,
        },
    )
    .await
    .context("Failed to create user")?;

    Ok((
        StatusCode::CREATED,
        Json(RegisteredUser {
            email: user.email,
            id: user.user_id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
        }),
    ))
}

pub async fn get(
    viewer: MaybeCurrentUser,
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> ResponseResult<Json<UserResponse>> {
    let user = find_user(&state.db, user_id).await?;

    Ok(Json(UserResponse::build(&state.db, viewer.user_id(), user).await?))
}

pub async fn me(
    current: CurrentUser,
    State(state): State<AppState>,
) -> ResponseResult<Json<UserResponse>> {
    let viewer = current.user.user_id;

    Ok(Json(UserResponse::build(&state.db, Some(viewer), current.user).await?))
}

#[instrument(skip_all, fields(user_id = %current.user.user_id), err(Debug))]
pub async fn set_password(
    current: CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<SetPasswordRequest>,
) -> ResponseResult<StatusCode> {
    if !verify_password(&payload.current_password, &current.user.password_hash)? {
        return Err(ServerError::bad_request("Неверный текущий пароль."));
    }
    if payload.new_password.is_empty() {
        return Err(ServerError::bad_request(
            "Пароль не может быть пустым.",
        ));
    }

    current
        .user
        .set_password_hash(&state.db, hash_password(&payload.new_password)?)
        .await
        .context("Failed to update password")?;

    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip_all, fields(user_id = %current.user.user_id), err(Debug))]
pub async fn subscriptions(
    current: CurrentUser,
    State(state): State<AppState>,
    Query(params): Query<SubscriptionParams>,
    uri: Uri,
) -> ResponseResult<Json<Paginated<SubscriptionResponse>>> {
    let page = params.page(&state);
    let recipes_limit = params.recipes_limit(&state);

    let authors = Follow::list_authors(&state.db, current.user.user_id, page)
        .await
        .context("Failed to list subscriptions")?;
    let count = Follow::count_authors(&state.db, current.user.user_id)
        .await
        .context("Failed to count subscriptions")?;

    let mut results = Vec::with_capacity(authors.len());
    for author in authors {
        results.push(SubscriptionResponse::build(&state.db, author, recipes_limit).await?);
    }

    Ok(Json(Paginated::new(&state.app, &uri, page, count, results)))
}

#[instrument(skip_all, fields(user_id = %current.user.user_id, %author_id), err(Debug))]
pub async fn subscribe(
    current: CurrentUser,
    State(state): State<AppState>,
    Path(author_id): Path<Uuid>,
    Query(params): Query<SubscriptionParams>,
) -> ResponseResult<(StatusCode, Json<SubscriptionResponse>)> {
    let author = find_user(&state.db, author_id).await?;

    if author.user_id == current.user.user_id {
        return Err(ServerError::bad_request("Нельзя подписаться на себя!"));
    }

    let follow = Follow::create(&state.db, current.user.user_id, author.user_id)
        .await
        .context("Failed to create subscription")?;
    if follow.is_none() {
        return Err(ServerError::bad_request(
            "Вы уже подписаны на этого автора!",
        ));
    }

    let recipes_limit = params.recipes_limit(&state);
    let response = SubscriptionResponse::build(&state.db, author, recipes_limit).await?;

    Ok((StatusCode::CREATED, Json(response)))
}

#[instrument(skip_all, fields(user_id = %current.user.user_id, %author_id), err(Debug))]
pub async fn unsubscribe(
    current: CurrentUser,
    State(state): State<AppState>,
    Path(author_id): Path<Uuid>,
) -> ResponseResult<StatusCode> {
    let author = find_user(&state.db, author_id).await?;

    if !Follow::delete(&state.db, current.user.user_id, author.user_id)
        .await
        .context("Failed to delete subscription")?
    {
        return Err(ServerError::not_found(
            "Вы не подписаны на этого автора.",
        ));
    }

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use db::test_utils::create_recipe;
    use serde_json::{json, Value};
    use sqlx::PgPool;
    use tower::ServiceExt;

    use super::*;
    use crate::http_server::test_helpers::{
        authed_user, create_test_app, json_request, response_body_json,
    };

    fn registration(username: &str) -> Value {
        json!({
            "email": format!("{username}@example.com"),
            "username": username,
            "first_name": "Вася",
            "last_name": "Пупкин",
            "password": "Qwerty123",
        })
    }

    #[sqlx::test(migrations = "../db/migrations")]
    async fn test_register_and_reject_duplicate(pool: PgPool) {
        let app = create_test_app(pool.clone());

        let response = app
            .clone()
            .oneshot(json_request("POST", "/api/users/", None, Some(registration("vasya"))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body: RegisteredUser = response_body_json(response).await;
        assert_eq!(body.username, "vasya");

        let stored = User::get_by_id(&pool, body.id).await.unwrap().unwrap();
        assert!(verify_password("Qwerty123", &stored.password_hash).unwrap());

        let duplicate = app
            .oneshot(json_request("POST", "/api/users/", None, Some(registration("vasya"))))
            .await
            .unwrap();
        assert_eq!(duplicate.status(), StatusCode::BAD_REQUEST);
    }

    #[sqlx::test(migrations = "../db/migrations")]
    async fn test_register_rejects_reserved_username(pool: PgPool) {
        let app = create_test_app(pool);

        let response = app
            .oneshot(json_request("POST", "/api/users/", None, Some(registration("me"))))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[sqlx::test(migrations = "../db/migrations")]
    async fn test_user_list_is_paginated(pool: PgPool) {
        let app = create_test_app(pool.clone());
        for name in ["u1", "u2", "u3"] {
            db::test_utils::create_user(&pool, name).await;
        }

        let response = app
            .oneshot(json_request("GET", "/api/users/?limit=2", None, None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body: Paginated<UserResponse> = response_body_json(response).await;
        assert_eq!(body.count, 3);
        assert_eq!(body.results.len(), 2);
        assert_eq!(
            body.next.as_deref(),
            Some("http://localhost:3000/api/users/?limit=2&page=2")
        );
        assert!(body.previous.is_none());
    }

    #[sqlx::test(migrations = "../db/migrations")]
    async fn test_me_requires_token(pool: PgPool) {
        let app = create_test_app(pool);

        let response = app
            .clone()
            .oneshot(json_request("GET", "/api/users/me/", None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app
            .oneshot(json_request("GET", "/api/users/me/", Some("bogus"), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[sqlx::test(migrations = "../db/migrations")]
    async fn test_set_password(pool: PgPool) {
        let app = create_test_app(pool.clone());
        let (user, token) = authed_user(&pool, "ann").await;
        let hash = hash_password("old-pass").unwrap();
        user.set_password_hash(&pool, hash).await.unwrap();

        let wrong = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/users/set_password/",
                Some(&token),
                Some(json!({"new_password": "new-pass", "current_password": "nope"})),
            ))
            .await
            .unwrap();
        assert_eq!(wrong.status(), StatusCode::BAD_REQUEST);

        let ok = app
            .oneshot(json_request(
                "POST",
                "/api/users/set_password/",
                Some(&token),
                Some(json!({"new_password": "new-pass", "current_password": "old-pass"})),
            ))
            .await
            .unwrap();
        assert_eq!(ok.status(), StatusCode::NO_CONTENT);

        let stored = User::get_by_id(&pool, user.user_id).await.unwrap().unwrap();
        assert!(verify_password("new-pass", &stored.password_hash).unwrap());
    }

    #[sqlx::test(migrations = "../db/migrations")]
    async fn test_subscribe_flow(pool: PgPool) {
        let app = create_test_app(pool.clone());
        let (ann, token) = authed_user(&pool, "ann").await;
        let bob = db::test_utils::create_user(&pool, "bob").await;
        for name in ["Soup", "Stew", "Salad", "Pie"] {
            create_recipe(&pool, &bob, name, &[]).await;
        }

        let subscribe_uri = format!("/api/users/{}/subscribe/?recipes_limit=2", bob.user_id);
        let response = app
            .clone()
            .oneshot(json_request("POST", &subscribe_uri, Some(&token), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body: SubscriptionResponse = response_body_json(response).await;
        assert!(body.is_subscribed);
        assert_eq!(body.recipes.len(), 2);
        assert_eq!(body.recipes_count, 4);

        let again = app
            .clone()
            .oneshot(json_request("POST", &subscribe_uri, Some(&token), None))
            .await
            .unwrap();
        assert_eq!(again.status(), StatusCode::BAD_REQUEST);
        let error: Value = response_body_json(again).await;
        assert_eq!(error["errors"], "Вы уже подписаны на этого автора!");

        let profile = app
            .clone()
            .oneshot(json_request(
                "GET",
                &format!("/api/users/{}/", bob.user_id),
                Some(&token),
                None,
            ))
            .await
            .unwrap();
        let profile: UserResponse = response_body_json(profile).await;
        assert!(profile.is_subscribed);

        let list = app
            .clone()
            .oneshot(json_request("GET", "/api/users/subscriptions/", Some(&token), None))
            .await
            .unwrap();
        let list: Paginated<SubscriptionResponse> = response_body_json(list).await;
        assert_eq!(list.count, 1);
        assert_eq!(list.results[0].id, bob.user_id);
        assert_eq!(list.results[0].recipes.len(), 3);

        let unsubscribe_uri = format!("/api/users/{}/subscribe/", bob.user_id);
        let response = app
            .clone()
            .oneshot(json_request("DELETE", &unsubscribe_uri, Some(&token), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app
            .oneshot(json_request("DELETE", &unsubscribe_uri, Some(&token), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(!Follow::exists(&pool, ann.user_id, bob.user_id).await.unwrap());
    }

    #[sqlx::test(migrations = "../db/migrations")]
    async fn test_cannot_subscribe_to_self(pool: PgPool) {
        let app = create_test_app(pool.clone());
        let (ann, token) = authed_user(&pool, "ann").await;

        let response = app
            .oneshot(json_request(
                "POST",
                &format!("/api/users/{}/subscribe/", ann.user_id),
                Some(&token),
                None,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error: Value = response_body_json(response).await;
        assert_eq!(error["errors"], "Нельзя подписаться на себя!");
    }
}

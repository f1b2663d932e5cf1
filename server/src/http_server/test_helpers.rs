use axum::{
    body::Body,
    http::{header, Request, Response},
    Router,
};
use db::{auth_tokens::AuthToken, users::User, PgPool};
use serde::de::DeserializeOwned;
use shopping_list::ExportFormat;
use url::Url;

use crate::{http_server::passwords::hash_password, AppConfig, AppState};

pub fn test_config() -> AppConfig {
    AppConfig {
        base_url: Url::parse("http://localhost:3000").unwrap(),
        page_size: 6,
        recipes_limit: 3,
    }
}

pub fn create_test_app(pool: PgPool) -> Router {
    let state = AppState::new(test_config(), pool, ExportFormat::default());

    crate::http_server::routes::make_router().with_state(state)
}

/// A user whose password is really hashed, for login tests.
pub async fn register_user(pool: &PgPool, username: &str, password: &str) -> User {
    let mut new_user = db::test_utils::new_user(username);
    new_user.password_hash = hash_password(password).unwrap();

    User::create(pool, new_user).await.unwrap()
}

/// A user plus a token to send as `Authorization: Token <token>`.
pub async fn authed_user(pool: &PgPool, username: &str) -> (User, String) {
    let user = db::test_utils::create_user(pool, username).await;
    let token = AuthToken::issue(pool, user.user_id).await.unwrap();

    (user, token.token)
}

pub fn json_request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);

    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Token {token}"));
    }

    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn response_body_json<T: DeserializeOwned>(response: Response<Body>) -> T {
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body_bytes).unwrap()
}

pub async fn response_body_text(response: Response<Body>) -> String {
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(body_bytes.to_vec()).unwrap()
}

use axum::{extract::State, http::StatusCode, Json};
use color_eyre::eyre::Context;
use db::{auth_tokens::AuthToken, users::User};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::{
    http_server::{
        current_user::CurrentUser,
        errors::{ServerError, WithStatus as _},
        passwords::verify_password,
        ResponseResult,
    },
    AppState,
};

const INVALID_CREDENTIALS: &str = "Невозможно войти с предоставленными учетными данными.";

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub auth_token: String,
}

#[instrument(skip_all, err(Debug))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> ResponseResult<Json<LoginResponse>> {
    let user = User::get_by_email(&state.db, payload.email.trim())
        .await
        .context("Failed to look up user")
        .with_status(StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or_else(|| ServerError::bad_request(INVALID_CREDENTIALS))?;

    if !verify_password(&payload.password, &user.password_hash)? {
        return Err(ServerError::bad_request(INVALID_CREDENTIALS));
    }

    let token = AuthToken::issue(&state.db, user.user_id)
        .await
        .context("Failed to issue token")?;

    Ok(Json(LoginResponse {
        auth_token: token.token,
    }))
}

#[instrument(skip_all, fields(user_id = %current.user.user_id), err(Debug))]
pub async fn logout(
    current: CurrentUser,
    State(state): State<AppState>,
) -> ResponseResult<StatusCode> {
    AuthToken::revoke(&state.db, &current.token)
        .await
        .context("Failed to revoke token")?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;
    use sqlx::PgPool;
    use tower::ServiceExt;

    use super::*;
    use crate::http_server::test_helpers::{
        create_test_app, json_request, register_user, response_body_json,
    };

    #[sqlx::test(migrations = "../db/migrations")]
    async fn test_login_and_logout(pool: PgPool) {
        let app = create_test_app(pool.clone());
        register_user(&pool, "ann", "s3cret-pass").await;

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/auth/token/login/",
                None,
                Some(json!({"email": "ann@example.com", "password": "s3cret-pass"})),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: LoginResponse = response_body_json(response).await;
        assert_eq!(body.auth_token.len(), 40);

        let me = app
            .clone()
            .oneshot(json_request("GET", "/api/users/me/", Some(&body.auth_token), None))
            .await
            .unwrap();
        assert_eq!(me.status(), StatusCode::OK);

        let logout = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/auth/token/logout/",
                Some(&body.auth_token),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(logout.status(), StatusCode::NO_CONTENT);

        let me_again = app
            .oneshot(json_request("GET", "/api/users/me/", Some(&body.auth_token), None))
            .await
            .unwrap();
        assert_eq!(me_again.status(), StatusCode::UNAUTHORIZED);
    }

    #[sqlx::test(migrations = "../db/migrations")]
    async fn test_login_with_wrong_password(pool: PgPool) {
        let app = create_test_app(pool.clone());
        register_user(&pool, "ann", "s3cret-pass").await;

        let response = app
            .oneshot(json_request(
                "POST",
                "/api/auth/token/login/",
                None,
                Some(json!({"email": "ann@example.com", "password": "wrong"})),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = response_body_json(response).await;
        assert_eq!(body["errors"], INVALID_CREDENTIALS);
    }
}

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap, StatusCode},
};
use color_eyre::eyre::eyre;
use db::{auth_tokens::AuthToken, users::User};

use super::errors::ServerError;
use crate::AppState;

const TOKEN_PREFIX: &str = "Token ";

/// The user behind an `Authorization: Token <key>` header. Rejects with
/// 401 when the header is missing or the token is unknown.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    pub token: String,
}

/// Like [`CurrentUser`] but lets anonymous requests through. A header with
/// an unknown token is still rejected.
#[derive(Debug, Clone)]
pub struct MaybeCurrentUser(pub Option<CurrentUser>);

impl MaybeCurrentUser {
    pub fn user_id(&self) -> Option<uuid::Uuid> {
        self.0.as_ref().map(|c| c.user.user_id)
    }
}

fn token_from_headers(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix(TOKEN_PREFIX)
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

async fn resolve(state: &AppState, token: &str) -> Result<CurrentUser, ServerError> {
    let user = AuthToken::find_user(&state.db, token)
        .await?
        .ok_or_else(|| {
            ServerError(
                eyre!("Недопустимый токен."),
                StatusCode::UNAUTHORIZED,
            )
        })?;

    Ok(CurrentUser {
        user,
        token: token.to_string(),
    })
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = token_from_headers(&parts.headers).ok_or_else(|| {
            ServerError(
                eyre!("Учетные данные не были предоставлены."),
                StatusCode::UNAUTHORIZED,
            )
        })?;

        resolve(state, token).await
    }
}

impl FromRequestParts<AppState> for MaybeCurrentUser {
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match token_from_headers(&parts.headers) {
            Some(token) => Ok(Self(Some(resolve(state, token).await?))),
            None => Ok(Self(None)),
        }
    }
}

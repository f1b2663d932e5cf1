use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use color_eyre::Report;
use serde_json::json;
use shopping_list::ShoppingListError;

/// A handler failure and the status it should be reported with.
///
/// Client errors echo the report's message back as `{"errors": ...}`.
/// Server errors are logged and answered with a generic message.
pub struct ServerError(pub(crate) Report, pub(crate) StatusCode);

impl std::fmt::Debug for ServerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("Status Code: {}\n", self.1))?;

        std::fmt::Debug::fmt(&self.0, f)
    }
}

impl ServerError {
    pub(crate) fn bad_request(message: impl Into<String>) -> Self {
        Self(Report::msg(message.into()), StatusCode::BAD_REQUEST)
    }

    pub(crate) fn forbidden(message: impl Into<String>) -> Self {
        Self(Report::msg(message.into()), StatusCode::FORBIDDEN)
    }

    pub(crate) fn not_found(message: impl Into<String>) -> Self {
        Self(Report::msg(message.into()), StatusCode::NOT_FOUND)
    }

    pub(crate) fn status(&self) -> StatusCode {
        self.1
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let report = self.0;

        if status.is_server_error() {
            tracing::error!(error = ?report, status = %status, "ServerError");

            let message = status.canonical_reason().unwrap_or("Internal Server Error");

            return (status, Json(json!({ "errors": message }))).into_response();
        }

        tracing::debug!(error = %report, status = %status, "Client error");

        (status, Json(json!({ "errors": report.to_string() }))).into_response()
    }
}

impl<E> From<E> for ServerError
where
    E: Into<Report>,
{
    fn from(err: E) -> Self {
        ServerError(err.into(), StatusCode::INTERNAL_SERVER_ERROR)
    }
}

pub(crate) trait WithStatus<T> {
    fn with_status(self, status: StatusCode) -> Result<T, ServerError>;
}

impl<T> WithStatus<T> for Result<T, Report> {
    fn with_status(self, status: StatusCode) -> Result<T, ServerError> {
        self.map_err(|err| ServerError(err, status))
    }
}

/// Status for a failed shopping list build: a store outage is worth
/// retrying, bad recipe data is not.
pub(crate) fn shopping_list_status(err: &ShoppingListError) -> StatusCode {
    if err.is_transient() {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

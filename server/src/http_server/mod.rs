use std::net::SocketAddr;

use axum::Router;
use color_eyre::eyre::WrapErr;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

pub(crate) mod api;
pub(crate) mod cmd;
mod config;
pub(crate) mod current_user;
pub mod errors;
pub(crate) mod pagination;
pub(crate) mod passwords;
pub(crate) mod routes;
mod trace;

#[cfg(test)]
pub(crate) mod test_helpers;

pub(crate) type ResponseResult<T> = Result<T, errors::ServerError>;

pub(crate) async fn run_server(routes: Router) -> color_eyre::Result<()> {
    let tracer = trace::Tracer;
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(tracer)
        .on_response(tracer);

    let app = routes.layer(trace_layer);

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let port: u16 = port.parse().wrap_err("PORT must be a valid port number")?;
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!("Starting server on port {}", port);
    let listener = TcpListener::bind(&addr)
        .await
        .wrap_err("Failed to open port")?;

    let addr = listener.local_addr()?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .await
        .wrap_err("Failed to run server")
}

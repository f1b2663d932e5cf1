use tracing::info;

use crate::{http_server::routes, AppState, Result};

pub(crate) async fn serve() -> Result<()> {
    let app_state = AppState::from_env().await?;

    info!("Starting HTTP server");
    super::run_server(routes::make_router().with_state(app_state)).await?;

    info!("Main Returning");

    Ok(())
}
